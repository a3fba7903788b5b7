use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::risk_detection::{ClassificationSource, MonitorError, RiskTier, StoredTransaction};

/// `GET /api/transactions` query parameters
#[derive(Debug, Default, Deserialize)]
pub struct TransactionQuery {
    /// Tier name or `all`; omitted means all
    pub risk: Option<String>,
}

impl TransactionQuery {
    /// `None` for no filtering
    pub fn tier_filter(&self) -> Result<Option<RiskTier>, ApiError> {
        match self.risk.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(risk) if risk.eq_ignore_ascii_case("all") => Ok(None),
            Some(risk) => risk.parse::<RiskTier>().map(Some).map_err(|_| {
                ApiError::bad_request(format!(
                    "unknown risk filter '{}', expected low, medium, high, critical or all",
                    risk
                ))
            }),
        }
    }
}

/// Flattened transaction row for the frontend table
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub hash: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub value: Decimal,
    pub gas_price: Option<Decimal>,
    pub block_number: Option<u64>,
    pub decoded_function: Option<String>,
    pub risk_level: RiskTier,
    pub analysis: String,
    pub source: ClassificationSource,
    pub timestamp: DateTime<Utc>,
}

impl From<StoredTransaction> for TransactionView {
    fn from(stored: StoredTransaction) -> Self {
        let StoredTransaction {
            transaction,
            classification,
        } = stored;
        Self {
            hash: transaction.hash,
            from: transaction.from_address,
            to: transaction.to_address,
            value: transaction.value,
            gas_price: transaction.gas_price,
            block_number: transaction.block_number,
            decoded_function: transaction.decoded_function,
            risk_level: classification.tier,
            analysis: classification.message,
            source: classification.source,
            timestamp: classification.timestamp,
        }
    }
}

/// Envelope for mutating endpoints
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub analyzer: String,
    pub signatures: usize,
}

/// Error rendered as `{success: false, error}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<MonitorError> for ApiError {
    fn from(err: MonitorError) -> Self {
        match err {
            MonitorError::MalformedInput(_) => Self::bad_request(err.to_string()),
            other => Self::internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(risk: Option<&str>) -> TransactionQuery {
        TransactionQuery {
            risk: risk.map(str::to_string),
        }
    }

    #[test]
    fn test_tier_filter() {
        assert_eq!(query(None).tier_filter().unwrap(), None);
        assert_eq!(query(Some("all")).tier_filter().unwrap(), None);
        assert_eq!(query(Some("ALL")).tier_filter().unwrap(), None);
        assert_eq!(query(Some("high")).tier_filter().unwrap(), Some(RiskTier::High));
        assert_eq!(query(Some("Critical")).tier_filter().unwrap(), Some(RiskTier::Critical));

        let err = query(Some("severe")).tier_filter().unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_error_mapping() {
        let err: ApiError = MonitorError::MalformedInput("blank hash".into()).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err: ApiError = MonitorError::Report("disk full".into()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
