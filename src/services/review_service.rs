use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    Set, SqlErr,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::reviews::{ReviewBlock, ReviewEligibility, SubmitReviewRequest},
    entity::{
        orders::{Column as OrderCol, Entity as Orders, Model as OrderModel},
        reviews::{ActiveModel as ReviewActive, Column as ReviewCol, Entity as Reviews},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_customer},
    models::Review,
    response::{ApiResponse, Meta},
    state::AppState,
    types::status::OrderStatus,
};

/// An order can be reviewed once, after delivery.
pub fn review_gate(status: OrderStatus, already_reviewed: bool) -> Result<(), ReviewBlock> {
    if status != OrderStatus::Delivered {
        return Err(ReviewBlock::NotDelivered);
    }
    if already_reviewed {
        return Err(ReviewBlock::AlreadyReviewed);
    }
    Ok(())
}

async fn owned_order(state: &AppState, user: &AuthUser, order_id: Uuid) -> AppResult<OrderModel> {
    Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::Id.eq(order_id))
                .add(OrderCol::CustomerId.eq(user.user_id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

async fn has_review(state: &AppState, order_id: Uuid) -> AppResult<bool> {
    let count = Reviews::find()
        .filter(ReviewCol::OrderId.eq(order_id))
        .count(&state.orm)
        .await?;
    Ok(count > 0)
}

pub async fn can_review(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<ReviewEligibility>> {
    ensure_customer(user)?;
    let order = owned_order(state, user, order_id).await?;
    let reviewed = has_review(state, order.id).await?;

    let eligibility = match review_gate(order.status, reviewed) {
        Ok(()) => ReviewEligibility {
            can_review: true,
            reason: None,
        },
        Err(block) => ReviewEligibility {
            can_review: false,
            reason: Some(block),
        },
    };
    Ok(ApiResponse::success("OK", eligibility, Some(Meta::empty())))
}

pub async fn submit_review(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: SubmitReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    ensure_customer(user)?;
    if !(1..=5).contains(&payload.score) {
        return Err(AppError::BadRequest("score must be between 1 and 5".into()));
    }

    let order = owned_order(state, user, order_id).await?;
    let reviewed = has_review(state, order.id).await?;
    review_gate(order.status, reviewed).map_err(|block| match block {
        ReviewBlock::NotDelivered => AppError::Conflict("Order has not been delivered".into()),
        ReviewBlock::AlreadyReviewed => AppError::Conflict("Order was already reviewed".into()),
    })?;

    let comment = payload.comment.trim().to_string();
    let sentiment = if comment.is_empty() {
        None
    } else {
        Some(state.classifier.classify(&comment).await?.label)
    };

    let review = ReviewActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        order_status: Set(order.status),
        score: Set(payload.score),
        comment: Set(comment),
        sentiment: Set(sentiment),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await
    .map_err(duplicate_as_conflict)?;

    tracing::info!(
        user_id = %user.user_id,
        order_id = %order.id,
        score = review.score,
        sentiment = review.sentiment.as_deref().unwrap_or("-"),
        "review submitted"
    );
    audit::record(
        &state.pool,
        user.user_id,
        "review_submit",
        "reviews",
        serde_json::json!({ "order_id": order.id, "score": review.score }),
    )
    .await;

    Ok(ApiResponse::success(
        "Review submitted",
        Review::from(review),
        Some(Meta::empty()),
    ))
}

// Two submissions racing past the gate meet at the unique index on order_id.
fn duplicate_as_conflict(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("Order was already reviewed".into())
        }
        _ => AppError::OrmError(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_delivered_unreviewed_orders_pass() {
        assert_eq!(review_gate(OrderStatus::Delivered, false), Ok(()));
        assert_eq!(
            review_gate(OrderStatus::Delivered, true),
            Err(ReviewBlock::AlreadyReviewed)
        );
        for status in [
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Unavailable,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(review_gate(status, false), Err(ReviewBlock::NotDelivered));
        }
    }

    #[test]
    fn delivery_is_checked_before_duplicates() {
        assert_eq!(
            review_gate(OrderStatus::Shipped, true),
            Err(ReviewBlock::NotDelivered)
        );
    }
}
