//! Firestore REST (v1) backend.
//!
//! Documents are plain JSON on our side and typed values on the wire:
//! `{"stringValue": ..}`, `{"integerValue": "42"}`, `{"mapValue": {"fields": ..}}`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Map, Number, Value};
use tracing::{debug, instrument};
use url::Url;

use super::{DocumentStore, Precondition, StoreError, Versioned};

#[derive(Clone, Debug)]
pub struct FirestoreConfig {
    base_url: String,
    project_id: String,
    access_token: SecretString,
}

impl FirestoreConfig {
    #[must_use]
    pub fn new(project_id: String, access_token: SecretString) -> Self {
        Self {
            base_url: "https://firestore.googleapis.com".to_string(),
            project_id,
            access_token,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[derive(Debug)]
pub struct FirestoreStore {
    client: Client,
    config: FirestoreConfig,
}

impl FirestoreStore {
    /// Build the store handle. Called once at startup and shared afterwards.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: FirestoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder().user_agent(crate::APP_USER_AGENT).build()?;
        Ok(Self { client, config })
    }

    /// `{base}/v1/projects/{project}/databases/(default)/{tail..}`
    fn database_url(&self, collection: &str, id: &str, tail: &[&str]) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.config.base_url).map_err(|err| {
            decode_error(collection, id, format!("invalid firestore base url: {err}"))
        })?;
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend([
                "v1",
                "projects",
                self.config.project_id.as_str(),
                "databases",
                "(default)",
            ]);
            path.extend(tail);
        }
        Ok(url)
    }

    fn document_url(&self, collection: &str, id: &str) -> Result<Url, StoreError> {
        self.database_url(collection, id, &["documents", collection, id])
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.config.access_token.expose_secret())
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    #[instrument(skip(self))]
    async fn get_versioned(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Versioned>, StoreError> {
        let url = self.document_url(collection, id)?;
        let response = self
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, self.bearer())
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let document: Value = check_status(response).await?.json().await?;
        let version = document
            .get("updateTime")
            .and_then(Value::as_str)
            .ok_or_else(|| decode_error(collection, id, "document has no updateTime"))?
            .to_string();
        let document =
            decode_document(&document).map_err(|reason| decode_error(collection, id, reason))?;
        Ok(Some(Versioned { document, version }))
    }

    #[instrument(skip(self, fields))]
    async fn patch(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
        precondition: Precondition,
    ) -> Result<(), StoreError> {
        let mut url = self.document_url(collection, id)?;
        {
            let mut query = url.query_pairs_mut();
            for key in fields.keys() {
                query.append_pair("updateMask.fieldPaths", &field_path(key));
            }
            match &precondition {
                Precondition::Any => {}
                Precondition::Missing => {
                    query.append_pair("currentDocument.exists", "false");
                }
                Precondition::Version(update_time) => {
                    query.append_pair("currentDocument.updateTime", update_time);
                }
            }
        }
        let encoded = encode_fields(&fields).map_err(|reason| StoreError::Encode {
            collection: collection.to_string(),
            id: id.to_string(),
            reason,
        })?;

        let response = self
            .client
            .patch(url)
            .header(reqwest::header::AUTHORIZATION, self.bearer())
            .json(&json!({ "fields": encoded }))
            .send()
            .await?;

        match check_status(response).await {
            Ok(_) => {
                debug!(fields = fields.len(), "patched document");
                Ok(())
            }
            Err(StoreError::Status { status, body })
                if precondition != Precondition::Any && is_precondition_failure(status, &body) =>
            {
                debug!(%status, "write precondition failed");
                Err(StoreError::Conflict {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })
            }
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self, value))]
    async fn query(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<(String, Value)>, StoreError> {
        let url = self.database_url(collection, "", &["documents:runQuery"])?;
        let value = encode_value(value).map_err(|reason| StoreError::Encode {
            collection: collection.to_string(),
            id: String::new(),
            reason,
        })?;
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": field_path(field) },
                        "op": "EQUAL",
                        "value": value
                    }
                }
            }
        });

        let response = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, self.bearer())
            .json(&body)
            .send()
            .await?;
        let results: Vec<Value> = check_status(response).await?.json().await?;

        // Results without a `document` only carry read progress.
        results
            .iter()
            .filter_map(|result| result.get("document"))
            .map(|document| {
                let id = document
                    .get("name")
                    .and_then(Value::as_str)
                    .and_then(|name| name.rsplit('/').next())
                    .unwrap_or_default()
                    .to_string();
                let decoded = decode_document(document)
                    .map_err(|reason| decode_error(collection, &id, reason))?;
                Ok((id, decoded))
            })
            .collect()
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status { status, body })
}

/// Firestore reports a failed `currentDocument` check as 409 (exists),
/// 404 (gone) or 400 `FAILED_PRECONDITION` (stale update time).
fn is_precondition_failure(status: StatusCode, body: &str) -> bool {
    status == StatusCode::CONFLICT
        || status == StatusCode::NOT_FOUND
        || (status == StatusCode::BAD_REQUEST && body.contains("FAILED_PRECONDITION"))
}

/// Field names outside `[A-Za-z_][A-Za-z0-9_]*` must be backquoted in field paths.
fn field_path(name: &str) -> String {
    let simple = name
        .chars()
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

fn decode_error(collection: &str, id: &str, reason: impl Into<String>) -> StoreError {
    StoreError::Decode {
        collection: collection.to_string(),
        id: id.to_string(),
        reason: reason.into(),
    }
}

fn encode_fields(fields: &Map<String, Value>) -> Result<Value, String> {
    fields
        .iter()
        .map(|(key, value)| encode_value(value).map(|encoded| (key.clone(), encoded)))
        .collect::<Result<Map<_, _>, _>>()
        .map(Value::Object)
}

fn encode_value(value: &Value) -> Result<Value, String> {
    Ok(match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(flag) => json!({ "booleanValue": flag }),
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                json!({ "integerValue": integer.to_string() })
            } else if number.is_u64() {
                return Err(format!("integer {number} does not fit in a signed 64-bit value"));
            } else {
                json!({ "doubleValue": number.as_f64().unwrap_or_default() })
            }
        }
        Value::String(text) => json!({ "stringValue": text }),
        Value::Array(items) => {
            let values = items.iter().map(encode_value).collect::<Result<Vec<_>, _>>()?;
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(fields) => json!({ "mapValue": { "fields": encode_fields(fields)? } }),
    })
}

fn decode_document(document: &Value) -> Result<Value, String> {
    match document.get("fields") {
        Some(fields) => decode_fields(fields),
        None => Ok(Value::Object(Map::new())),
    }
}

fn decode_fields(fields: &Value) -> Result<Value, String> {
    let Some(fields) = fields.as_object() else {
        return Err("fields must be an object".to_string());
    };
    fields
        .iter()
        .map(|(key, value)| decode_value(value).map(|decoded| (key.clone(), decoded)))
        .collect::<Result<Map<_, _>, _>>()
        .map(Value::Object)
}

fn decode_value(value: &Value) -> Result<Value, String> {
    let Some((kind, inner)) = value.as_object().and_then(|object| object.iter().next()) else {
        return Err("empty firestore value".to_string());
    };

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| "booleanValue must be a bool".to_string()),
        "integerValue" => inner
            .as_str()
            .and_then(|raw| raw.parse::<i64>().ok())
            .or_else(|| inner.as_i64())
            .map(|integer| Value::Number(integer.into()))
            .ok_or_else(|| "integerValue must be an integer".to_string()),
        "doubleValue" => inner
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| "doubleValue must be a finite number".to_string()),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner
            .as_str()
            .map(|text| Value::String(text.to_string()))
            .ok_or_else(|| format!("{kind} must be a string")),
        "arrayValue" => inner
            .get("values")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(decode_value).collect::<Result<Vec<_>, _>>())
            .unwrap_or_else(|| Ok(Vec::new()))
            .map(Value::Array),
        "mapValue" => inner
            .get("fields")
            .map_or_else(|| Ok(Value::Object(Map::new())), decode_fields),
        other => Err(format!("unsupported firestore value type: {other}")),
    }
}
