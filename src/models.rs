use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::{orders, products, reviews},
    types::status::OrderStatus,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub category: String,
    pub name: String,
    pub brand: Option<String>,
    pub weight_g: Option<f64>,
    pub length_cm: Option<f64>,
    pub width_cm: Option<f64>,
    pub height_cm: Option<f64>,
    pub price: i64,
    pub stock: i32,
    pub image1: Option<String>,
    pub image2: Option<String>,
    pub image3: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct CartItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub checkout_id: Uuid,
    pub customer_id: Uuid,
    pub seller_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub status: OrderStatus,
    pub address: String,
    pub phone: String,
    pub total_charge: i64,
    pub payment_method: String,
    pub purchased_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Review {
    pub id: Uuid,
    pub order_id: Uuid,
    pub order_status: OrderStatus,
    pub score: i16,
    pub comment: String,
    pub sentiment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<products::Model> for Product {
    fn from(model: products::Model) -> Self {
        Self {
            id: model.id,
            seller_id: model.seller_id,
            category: model.category,
            name: model.name,
            brand: model.brand,
            weight_g: model.weight_g,
            length_cm: model.length_cm,
            width_cm: model.width_cm,
            height_cm: model.height_cm,
            price: model.price,
            stock: model.stock,
            image1: model.image1,
            image2: model.image2,
            image3: model.image3,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<orders::Model> for Order {
    fn from(model: orders::Model) -> Self {
        Self {
            id: model.id,
            checkout_id: model.checkout_id,
            customer_id: model.customer_id,
            seller_id: model.seller_id,
            product_id: model.product_id,
            quantity: model.quantity,
            status: model.status,
            address: model.address,
            phone: model.phone,
            total_charge: model.total_charge,
            payment_method: model.payment_method,
            purchased_at: model.purchased_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<reviews::Model> for Review {
    fn from(model: reviews::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            order_status: model.order_status,
            score: model.score,
            comment: model.comment,
            sentiment: model.sentiment,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
