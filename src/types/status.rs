//! Order lifecycle.
//!
//! Every order row starts in [`OrderStatus::Processing`] and ends in one of
//! the terminal states, [`OrderStatus::Delivered`] or
//! [`OrderStatus::Cancelled`]. The intermediate fulfilment states can be
//! visited in any order.

use sea_orm::Iterable;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Status of a single order row, stored as text.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum OrderStatus {
    #[sea_orm(string_value = "Processing")]
    Processing,
    #[sea_orm(string_value = "Created")]
    Created,
    #[sea_orm(string_value = "Approved")]
    Approved,
    #[sea_orm(string_value = "Invoiced")]
    Invoiced,
    #[sea_orm(string_value = "Shipped")]
    Shipped,
    #[sea_orm(string_value = "Unavailable")]
    Unavailable,
    #[sea_orm(string_value = "Delivered")]
    Delivered,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
}

const FULFILMENT: [OrderStatus; 5] = [
    OrderStatus::Created,
    OrderStatus::Approved,
    OrderStatus::Invoiced,
    OrderStatus::Shipped,
    OrderStatus::Unavailable,
];

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Processing => "Processing",
            OrderStatus::Created => "Created",
            OrderStatus::Approved => "Approved",
            OrderStatus::Invoiced => "Invoiced",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Unavailable => "Unavailable",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Whether the lifecycle allows `self -> next`. Staying in place is not a
    /// transition.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        if self == next || self.is_terminal() {
            return false;
        }
        match next {
            OrderStatus::Processing => false,
            OrderStatus::Cancelled => true,
            OrderStatus::Delivered => {
                !matches!(self, OrderStatus::Processing | OrderStatus::Unavailable)
            }
            _ => FULFILMENT.contains(&next),
        }
    }

    /// Every status reachable in one step, in declaration order.
    pub fn next_states(self) -> Vec<OrderStatus> {
        OrderStatus::iter()
            .filter(|next| self.can_transition_to(*next))
            .collect()
    }

    /// Statuses shown to customers as still in flight.
    pub fn active() -> Vec<OrderStatus> {
        OrderStatus::iter().filter(|s| !s.is_terminal()).collect()
    }

    pub fn terminal() -> Vec<OrderStatus> {
        OrderStatus::iter().filter(|s| s.is_terminal()).collect()
    }
}
