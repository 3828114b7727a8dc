use engine_core::types::Order;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteOrderRequest {
    #[serde(default)]
    pub token_in: String,
    #[serde(default)]
    pub token_out: String,
    #[serde(default)]
    pub amount_in: String,
    #[serde(default)]
    pub slippage_tolerance: Option<f64>,
    #[serde(default)]
    pub min_amount_out: Option<String>,
}

/// Validated order parameters
#[derive(Debug, Clone)]
pub struct ValidOrderRequest {
    pub token_in: String,
    pub token_out: String,
    pub amount_in: Decimal,
    pub slippage_tolerance: f64,
    pub min_amount_out: Option<Decimal>,
}

impl ExecuteOrderRequest {
    /// Field-by-field validation; every problem is reported, not just the
    /// first one.
    pub fn validate(&self) -> Result<ValidOrderRequest, Vec<String>> {
        let mut details = Vec::new();

        let token_in = self.token_in.trim().to_string();
        if token_in.is_empty() {
            details.push("tokenIn must be a non-empty string".to_string());
        }

        let token_out = self.token_out.trim().to_string();
        if token_out.is_empty() {
            details.push("tokenOut must be a non-empty string".to_string());
        }

        let amount_in = match self.amount_in.trim().parse::<Decimal>() {
            Ok(amount) if amount > Decimal::ZERO => Some(amount),
            Ok(_) => {
                details.push("amountIn must be a positive decimal string".to_string());
                None
            }
            Err(_) => {
                details.push("amountIn must be a decimal string".to_string());
                None
            }
        };

        let slippage_tolerance = match self.slippage_tolerance {
            Some(tolerance) if (0.0..=100.0).contains(&tolerance) => Some(tolerance),
            Some(_) => {
                details.push("slippageTolerance must be between 0 and 100".to_string());
                None
            }
            None => {
                details.push("slippageTolerance is required".to_string());
                None
            }
        };

        let min_amount_out = match self.min_amount_out.as_deref().map(str::trim) {
            Some(raw) => match raw.parse::<Decimal>() {
                Ok(min) if min >= Decimal::ZERO => Some(min),
                Ok(_) => {
                    details.push("minAmountOut must be non-negative".to_string());
                    None
                }
                Err(_) => {
                    details.push("minAmountOut must be a decimal string".to_string());
                    None
                }
            },
            None => None,
        };

        match (amount_in, slippage_tolerance, details.is_empty()) {
            (Some(amount_in), Some(slippage_tolerance), true) => Ok(ValidOrderRequest {
                token_in,
                token_out,
                amount_in,
                slippage_tolerance,
                min_amount_out,
            }),
            _ => Err(details),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub success: bool,
    pub order_id: Uuid,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct GetOrderResponse {
    pub success: bool,
    pub order: Order,
}

#[derive(Debug, Serialize)]
pub struct ListOrdersResponse {
    pub success: bool,
    pub orders: Vec<Order>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn validation(details: Vec<String>) -> Self {
        Self {
            success: false,
            error: "Validation error".to_string(),
            details: Some(details),
            message: None,
        }
    }

    pub fn internal(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            details: None,
            message: Some(message.into()),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: "Not found".to_string(),
            details: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request() -> ExecuteOrderRequest {
        ExecuteOrderRequest {
            token_in: "SOL".to_string(),
            token_out: "USDC".to_string(),
            amount_in: "1.5".to_string(),
            slippage_tolerance: Some(0.5),
            min_amount_out: None,
        }
    }

    #[test]
    fn test_valid_request_passes() {
        let valid = request().validate().unwrap();
        assert_eq!(valid.amount_in, dec!(1.5));
        assert_eq!(valid.token_in, "SOL");
        assert!(valid.min_amount_out.is_none());
    }

    #[test]
    fn test_zero_and_negative_amounts_rejected() {
        for bad in ["0", "-1.5"] {
            let mut req = request();
            req.amount_in = bad.to_string();
            let details = req.validate().unwrap_err();
            assert!(details.iter().any(|d| d.contains("amountIn")));
        }
    }

    #[test]
    fn test_non_decimal_amount_rejected() {
        let mut req = request();
        req.amount_in = "lots".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_slippage_bounds() {
        for bad in [-0.1, 100.5] {
            let mut req = request();
            req.slippage_tolerance = Some(bad);
            let details = req.validate().unwrap_err();
            assert!(details.iter().any(|d| d.contains("slippageTolerance")));
        }

        let mut req = request();
        req.slippage_tolerance = Some(0.0);
        assert!(req.validate().is_ok());
        req.slippage_tolerance = Some(100.0);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_missing_slippage_is_rejected() {
        let mut req = request();
        req.slippage_tolerance = None;
        let details = req.validate().unwrap_err();
        assert!(details.iter().any(|d| d.contains("slippageTolerance is required")));
    }

    #[test]
    fn test_empty_tokens_collect_every_problem() {
        let req = ExecuteOrderRequest {
            token_in: "  ".to_string(),
            token_out: String::new(),
            amount_in: "nope".to_string(),
            slippage_tolerance: Some(150.0),
            min_amount_out: Some("-3".to_string()),
        };
        let details = req.validate().unwrap_err();
        assert_eq!(details.len(), 5);
    }

    #[test]
    fn test_min_amount_out_parsed() {
        let mut req = request();
        req.min_amount_out = Some("140.25".to_string());
        let valid = req.validate().unwrap();
        assert_eq!(valid.min_amount_out, Some(dec!(140.25)));
    }
}
