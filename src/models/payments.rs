//! Organizer payment records: payout bank details and KYC flag.
//!
//! One record per host account, stored at `organizer_payments/<uid>`.
//! Only the last four digits of an account number are ever persisted.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::store::{
    decode, encode_only, update_with_retry, DocumentStore, Precondition, StoreError,
};

pub const COLLECTION: &str = "organizer_payments";

const MIN_ACCOUNT_DIGITS: usize = 4;
const MAX_ACCOUNT_DIGITS: usize = 34;

#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayoutStatus {
    #[default]
    NotAdded,
    Added,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    pub account_holder_name: String,
    pub bank_name: String,
    pub routing_code: String,
    pub account_last4: String,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrganizerPayment {
    pub user_id: String,
    #[serde(default)]
    pub bank_details: Option<BankDetails>,
    #[serde(default)]
    pub payout_status: PayoutStatus,
    #[serde(default)]
    pub kyc_verified: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl OrganizerPayment {
    #[must_use]
    pub fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            bank_details: None,
            payout_status: PayoutStatus::NotAdded,
            kyc_verified: false,
            updated_at: None,
        }
    }
}

/// Fields written when bank details are saved. `kycVerified` is left alone.
const BANK_DETAILS_FIELDS: &[&str] = &["userId", "bankDetails", "payoutStatus", "updatedAt"];
const KYC_FIELDS: &[&str] = &["userId", "kycVerified", "updatedAt"];

/// Bank details as submitted by the host, full account number included.
#[derive(ToSchema, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct BankDetailsInput {
    pub account_holder_name: String,
    pub bank_name: String,
    pub routing_code: String,
    #[schema(value_type = String, default = "")]
    pub account_number: SecretString,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BankDetailsError {
    #[error("account holder, bank name, routing code and account number are required")]
    MissingFields,

    #[error("account number must contain between 4 and 34 digits")]
    InvalidAccountNumber,
}

#[derive(Debug, Error)]
pub enum PaymentsError {
    #[error(transparent)]
    Invalid(#[from] BankDetailsError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BankDetailsInput {
    /// Validate the submission and reduce the account number to its last four digits.
    ///
    /// # Errors
    /// Returns an error when a field is blank or the account number is not 4-34 digits.
    pub fn into_bank_details(self) -> Result<BankDetails, BankDetailsError> {
        let holder = self.account_holder_name.trim();
        let bank = self.bank_name.trim();
        let routing = self.routing_code.trim();
        if holder.is_empty() || bank.is_empty() || routing.is_empty() {
            return Err(BankDetailsError::MissingFields);
        }

        let digits: String = self
            .account_number
            .expose_secret()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-'))
            .collect();
        if digits.is_empty() {
            return Err(BankDetailsError::MissingFields);
        }
        if !digits.chars().all(|c| c.is_ascii_digit())
            || !(MIN_ACCOUNT_DIGITS..=MAX_ACCOUNT_DIGITS).contains(&digits.len())
        {
            return Err(BankDetailsError::InvalidAccountNumber);
        }

        Ok(BankDetails {
            account_holder_name: holder.to_string(),
            bank_name: bank.to_string(),
            routing_code: routing.to_uppercase(),
            account_last4: digits[digits.len() - 4..].to_string(),
        })
    }
}

/// Load a host's payment record, or an empty `NOT_ADDED` record if none exists.
///
/// # Errors
/// Returns an error if the store fails or the document cannot be decoded.
pub async fn load(store: &dyn DocumentStore, user_id: &str) -> Result<OrganizerPayment, StoreError> {
    match store.get(COLLECTION, user_id).await? {
        Some(document) => decode(COLLECTION, user_id, document),
        None => Ok(OrganizerPayment::empty(user_id)),
    }
}

/// Validate and store bank details, marking payouts as `ADDED`.
///
/// Only the bank detail fields are written, so a concurrent KYC toggle is kept.
///
/// # Errors
/// Returns `PaymentsError::Invalid` for bad input and `PaymentsError::Store` for backend failures.
#[instrument(skip(store, input))]
pub async fn save_bank_details(
    store: &dyn DocumentStore,
    user_id: &str,
    input: BankDetailsInput,
) -> Result<OrganizerPayment, PaymentsError> {
    let details = input.into_bank_details()?;

    let update = OrganizerPayment {
        bank_details: Some(details),
        payout_status: PayoutStatus::Added,
        updated_at: Some(Utc::now()),
        ..OrganizerPayment::empty(user_id)
    };
    let fields = encode_only(COLLECTION, user_id, &update, BANK_DETAILS_FIELDS)?;
    store
        .patch(COLLECTION, user_id, fields, Precondition::Any)
        .await?;

    info!("bank details saved");
    Ok(load(store, user_id).await?)
}

/// Flip the KYC flag for an organizer and return the updated record.
///
/// The flip is conditional on the record not changing between read and
/// write, and is retried otherwise.
///
/// # Errors
/// Returns an error if the store fails or the record stays contended.
#[instrument(skip(store))]
pub async fn toggle_kyc(
    store: &dyn DocumentStore,
    user_id: &str,
) -> Result<OrganizerPayment, StoreError> {
    let record = update_with_retry(store, COLLECTION, user_id, |current| {
        let mut record = match current {
            Some(document) => decode(COLLECTION, user_id, document)?,
            None => OrganizerPayment::empty(user_id),
        };
        record.kyc_verified = !record.kyc_verified;
        record.updated_at = Some(Utc::now());
        let fields = encode_only(COLLECTION, user_id, &record, KYC_FIELDS)?;
        Ok::<_, StoreError>((fields, record))
    })
    .await?;

    info!(kyc_verified = record.kyc_verified, "payout KYC toggled");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::GatedStore;
    use crate::store::MemoryStore;
    use anyhow::{Context, Result};

    fn input(account_number: &str) -> BankDetailsInput {
        BankDetailsInput {
            account_holder_name: "Ada Host".to_string(),
            bank_name: "First Bank".to_string(),
            routing_code: "fbnk0001234".to_string(),
            account_number: SecretString::from(account_number),
        }
    }

    #[tokio::test]
    async fn save_stores_only_last_four_digits() -> Result<()> {
        let store = MemoryStore::new();
        let record = save_bank_details(&store, "host-1", input("1234 5678 9012")).await?;
        assert_eq!(record.payout_status, PayoutStatus::Added);

        let stored = store
            .get(COLLECTION, "host-1")
            .await?
            .context("record not stored")?;
        let raw = stored.to_string();
        assert!(!raw.contains("123456789012"));
        assert!(!raw.contains("1234 5678 9012"));
        assert_eq!(stored["bankDetails"]["accountLast4"], "9012");
        assert_eq!(stored["payoutStatus"], "ADDED");
        Ok(())
    }

    #[test]
    fn rejects_bad_account_numbers() {
        assert_eq!(
            input("12a4").into_bank_details(),
            Err(BankDetailsError::InvalidAccountNumber)
        );
        assert_eq!(
            input("123").into_bank_details(),
            Err(BankDetailsError::InvalidAccountNumber)
        );
        assert_eq!(
            input(" - ").into_bank_details(),
            Err(BankDetailsError::MissingFields)
        );
    }

    #[test]
    fn rejects_blank_fields() {
        let mut blank = input("12345678");
        blank.bank_name = "  ".to_string();
        assert_eq!(blank.into_bank_details(), Err(BankDetailsError::MissingFields));
    }

    #[test]
    fn debug_redacts_account_number() {
        let rendered = format!("{:?}", input("99887766"));
        assert!(!rendered.contains("99887766"));
        assert!(rendered.contains("First Bank"));
    }

    #[test]
    fn account_number_deserializes_from_camel_case() -> Result<()> {
        let parsed: BankDetailsInput = serde_json::from_value(serde_json::json!({
            "accountHolderName": "Ada Host",
            "bankName": "First Bank",
            "routingCode": "fbnk0001234",
            "accountNumber": "4444-5555-6666"
        }))?;
        assert_eq!(parsed.account_number.expose_secret(), "4444-5555-6666");
        assert_eq!(parsed.into_bank_details()?.account_last4, "6666");
        Ok(())
    }

    #[tokio::test]
    async fn load_defaults_to_not_added() -> Result<()> {
        let store = MemoryStore::new();
        let record = load(&store, "new-host").await?;
        assert_eq!(record, OrganizerPayment::empty("new-host"));
        Ok(())
    }

    #[tokio::test]
    async fn toggle_kyc_flips_and_keeps_bank_details() -> Result<()> {
        let store = MemoryStore::new();
        save_bank_details(&store, "host-2", input("000011112222")).await?;

        let first = toggle_kyc(&store, "host-2").await?;
        assert!(first.kyc_verified);
        assert!(first.bank_details.is_some());

        let second = toggle_kyc(&store, "host-2").await?;
        assert!(!second.kyc_verified);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_save_and_kyc_toggle_keep_both_changes() -> Result<()> {
        let store = GatedStore::on_write(2);
        store.arm();

        let (saved, toggled) = tokio::join!(
            save_bank_details(&store, "host-3", input("123456789012")),
            toggle_kyc(&store, "host-3"),
        );
        saved?;
        toggled?;

        let record = load(&store, "host-3").await?;
        assert!(record.kyc_verified);
        assert_eq!(record.payout_status, PayoutStatus::Added);
        assert_eq!(
            record.bank_details.map(|details| details.account_last4),
            Some("9012".to_string())
        );
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_kyc_toggles_both_apply() -> Result<()> {
        let store = GatedStore::on_read(2);
        save_bank_details(&store, "host-4", input("000011112222")).await?;
        store.arm();

        let (first, second) = tokio::join!(toggle_kyc(&store, "host-4"), toggle_kyc(&store, "host-4"));
        let mut outcomes = vec![first?.kyc_verified, second?.kyc_verified];
        outcomes.sort_unstable();
        assert_eq!(outcomes, vec![false, true]);

        let record = load(&store, "host-4").await?;
        assert!(!record.kyc_verified);
        assert!(record.bank_details.is_some());
        Ok(())
    }
}
