// Request/response shapes for the trade API.
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::order;
use super::order::{OrderKind, OrderSide, OrderStatus};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[serde(rename = "type")]
    pub side: OrderSide,
    pub pair: String,
    #[validate(range(exclusive_min = 0.0, message = "Amount must be greater than 0"))]
    pub amount: f64,
    #[validate(range(exclusive_min = 0.0, message = "Price must be greater than 0"))]
    pub price: Option<f64>,
    #[serde(rename = "orderType")]
    pub kind: OrderKind,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: i32,
    pub user_id: i32,
    pub pair: String,
    #[serde(rename = "type")]
    pub side: OrderSide,
    #[serde(rename = "orderType")]
    pub kind: OrderKind,
    pub amount: f64,
    pub price: Option<f64>,
    pub status: OrderStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub filled_at: Option<chrono::DateTime<chrono::Utc>>,
    pub cancelled_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<order::Model> for OrderResponse {
    fn from(o: order::Model) -> Self {
        OrderResponse {
            id: o.id,
            user_id: o.user_id,
            pair: o.pair,
            side: o.side,
            kind: o.kind,
            amount: decimal_to_f64(o.amount),
            price: o.price.map(decimal_to_f64),
            status: o.status,
            created_at: o.created_at,
            filled_at: o.filled_at,
            cancelled_at: o.cancelled_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderBookResponse {
    pub pair: String,
    pub bids: Vec<OrderResponse>,
    pub asks: Vec<OrderResponse>,
}

// Helper to convert Decimal into f64 for JSON responses
pub fn decimal_to_f64(decimal: Decimal) -> f64 {
    decimal.to_string().parse::<f64>().unwrap_or(0.0)
}
