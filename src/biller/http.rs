//! A generic HTTP-backed [`MeteringClient`], bundled as a reference implementation —
//! not a specific CSP SDK (spec.md §1's "concrete CSP SDK calls" are out of scope).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AdapterError;
use crate::model::DimensionUnits;

use super::{MeterOutcome, MeterStatus, MeteringClient};

/// Talks to a metering endpoint that accepts a JSON POST and returns either a legacy
/// bare status string or a structured `{status, record_id, detail}` body.
#[derive(Debug, Clone)]
pub struct HttpMeteringClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpMeteringClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct MeterRequest<'a> {
    product_code: &'a str,
    dimensions: &'a [DimensionUnits],
    customer_csp_data: &'a Value,
    timestamp: DateTime<Utc>,
    dry_run: bool,
}

/// Either shape the CSP's metering endpoint may reply with.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawMeterResponse {
    Legacy(String),
    Structured {
        status: String,
        record_id: Option<String>,
        detail: Option<String>,
    },
}

fn normalize(raw: RawMeterResponse) -> MeterOutcome {
    match raw {
        RawMeterResponse::Legacy(status) => MeterOutcome {
            status: if status.eq_ignore_ascii_case("ok") {
                MeterStatus::Ok
            } else {
                MeterStatus::Failed
            },
            record_id: None,
            detail: if status.eq_ignore_ascii_case("ok") {
                None
            } else {
                Some(status)
            },
        },
        RawMeterResponse::Structured { status, record_id, detail } => MeterOutcome {
            status: if status.eq_ignore_ascii_case("ok") {
                MeterStatus::Ok
            } else {
                MeterStatus::Failed
            },
            record_id,
            detail,
        },
    }
}

impl MeteringClient for HttpMeteringClient {
    async fn meter_billing(
        &self,
        dimensions: &[DimensionUnits],
        product_code: &str,
        customer_csp_data: &Value,
        timestamp: DateTime<Utc>,
        dry_run: bool,
    ) -> Result<MeterOutcome, AdapterError> {
        let response = self
            .client
            .post(format!("{}/meter", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&MeterRequest {
                product_code,
                dimensions,
                customer_csp_data,
                timestamp,
                dry_run,
            })
            .send()
            .await
            .map_err(|e| AdapterError::Metering(e.to_string()))?
            .error_for_status()
            .map_err(|e| AdapterError::Metering(e.to_string()))?;

        let raw: RawMeterResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Metering(format!("malformed metering response: {e}")))?;

        Ok(normalize(raw))
    }

    async fn get_csp_config_metadata(&self) -> Result<Value, AdapterError> {
        self.client
            .get(format!("{}/config-metadata", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AdapterError::Metering(e.to_string()))?
            .json()
            .await
            .map_err(|e| AdapterError::Metering(e.to_string()))
    }

    async fn get_account_info(&self) -> Result<Value, AdapterError> {
        self.client
            .get(format!("{}/account", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| AdapterError::Metering(e.to_string()))?
            .json()
            .await
            .map_err(|e| AdapterError::Metering(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_legacy_ok_string() {
        let outcome = normalize(RawMeterResponse::Legacy("ok".to_string()));
        assert_eq!(outcome.status, MeterStatus::Ok);
    }

    #[test]
    fn normalizes_legacy_failure_string() {
        let outcome = normalize(RawMeterResponse::Legacy("rejected".to_string()));
        assert_eq!(outcome.status, MeterStatus::Failed);
        assert_eq!(outcome.detail.as_deref(), Some("rejected"));
    }

    #[test]
    fn normalizes_structured_response() {
        let outcome = normalize(RawMeterResponse::Structured {
            status: "ok".into(),
            record_id: Some("rec-1".into()),
            detail: None,
        });
        assert_eq!(outcome.record_id.as_deref(), Some("rec-1"));
    }
}
