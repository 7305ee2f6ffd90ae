use axum::{body::Bytes, extract::Extension, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use super::{
    auth::{
        principal::{authenticate, require_owner},
        AuthState,
    },
    non_empty, parse_body, ApiError, ErrorBody,
};
use crate::{
    models::payments::{self, BankDetailsError, BankDetailsInput, OrganizerPayment, PaymentsError},
    store::{SharedStore, StoreError},
};

#[derive(ToSchema, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ToggleKycRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ToggleKycResponse {
    pub success: bool,
    pub record: OrganizerPayment,
}

fn store_failure(err: &StoreError) -> ApiError {
    error!("document store failure: {err}");
    ApiError::Internal
}

#[utoipa::path(
    get,
    path = "/api/payments",
    responses(
        (status = 200, description = "Caller's payment record", body = OrganizerPayment),
        (status = 401, description = "No valid session", body = ErrorBody)
    ),
    tag = "payments"
)]
pub async fn payment_record(
    headers: HeaderMap,
    auth: Extension<Arc<AuthState>>,
    Extension(store): Extension<SharedStore>,
) -> Result<Json<OrganizerPayment>, ApiError> {
    let identity = authenticate(&headers, &auth).await?;
    payments::load(store.as_ref(), &identity.uid)
        .await
        .map(Json)
        .map_err(|err| store_failure(&err))
}

#[utoipa::path(
    post,
    path = "/api/payments/bank-details",
    request_body = BankDetailsInput,
    responses(
        (status = 200, description = "Bank details saved; only the last four digits are kept", body = OrganizerPayment),
        (status = 400, description = "Missing fields or invalid account number", body = ErrorBody),
        (status = 401, description = "No valid session", body = ErrorBody)
    ),
    tag = "payments"
)]
pub async fn save_bank_details(
    headers: HeaderMap,
    auth: Extension<Arc<AuthState>>,
    Extension(store): Extension<SharedStore>,
    body: Bytes,
) -> Result<Json<OrganizerPayment>, ApiError> {
    let identity = authenticate(&headers, &auth).await?;
    let input: BankDetailsInput = parse_body(&body)?;

    match payments::save_bank_details(store.as_ref(), &identity.uid, input).await {
        Ok(record) => Ok(Json(record)),
        Err(PaymentsError::Invalid(BankDetailsError::MissingFields)) => {
            Err(ApiError::missing_fields())
        }
        Err(PaymentsError::Invalid(err @ BankDetailsError::InvalidAccountNumber)) => {
            Err(ApiError::Validation {
                code: "invalid_account_number",
                message: Some(err.to_string()),
            })
        }
        Err(PaymentsError::Store(err)) => Err(store_failure(&err)),
    }
}

#[utoipa::path(
    post,
    path = "/api/owner/toggle-payout-kyc",
    request_body = ToggleKycRequest,
    responses(
        (status = 200, description = "KYC flag flipped", body = ToggleKycResponse),
        (status = 400, description = "Missing user id", body = ErrorBody),
        (status = 401, description = "No valid session", body = ErrorBody),
        (status = 403, description = "Caller is not an owner", body = ErrorBody)
    ),
    tag = "payments"
)]
pub async fn toggle_payout_kyc(
    headers: HeaderMap,
    auth: Extension<Arc<AuthState>>,
    Extension(store): Extension<SharedStore>,
    body: Bytes,
) -> Result<Json<ToggleKycResponse>, ApiError> {
    require_owner(&headers, &auth).await?;
    let request: ToggleKycRequest = parse_body(&body)?;
    let Some(user_id) = non_empty(request.user_id.as_deref()) else {
        return Err(ApiError::missing_fields());
    };

    let record = payments::toggle_kyc(store.as_ref(), user_id)
        .await
        .map_err(|err| store_failure(&err))?;
    Ok(Json(ToggleKycResponse {
        success: true,
        record,
    }))
}
