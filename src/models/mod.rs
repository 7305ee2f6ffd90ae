//! Records kept in the document store.

pub mod payments;
pub mod support;
