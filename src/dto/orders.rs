use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    models::{Order, Review},
    types::{
        payment::PaymentDetails, pricing::CheckoutQuote, status::OrderStatus,
    },
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub full_name: String,
    pub address: String,
    pub state: String,
    pub phone: String,
    pub payment: PaymentDetails,
    /// Total the customer was shown. When present and different from the
    /// freshly computed total, checkout is refused.
    pub expected_total: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub checkout_id: Uuid,
    pub quote: CheckoutQuote,
    pub orders: Vec<Order>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetail {
    pub order: Order,
    /// Statuses this order may move to next.
    pub next_states: Vec<OrderStatus>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithReview {
    pub order: Order,
    pub review: Option<Review>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveredOrderList {
    pub items: Vec<OrderWithReview>,
}
