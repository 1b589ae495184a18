use sea_orm::sea_query::LockType;
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{DeliveredOrderList, OrderList, OrderWithReview, UpdateOrderStatusRequest},
    entity::{
        orders::{Column as OrderCol, Entity as Orders},
        reviews::Entity as Reviews,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_any_role, ensure_role},
    models::Order,
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::order_service::transition_order,
    state::AppState,
    types::{role::Role, status::OrderStatus},
};

/// Every order the seller is fulfilling or has fulfilled, cancelled ones
/// excluded.
pub async fn list_seller_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_role(user, Role::Seller)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all()
        .add(OrderCol::SellerId.eq(user.user_id))
        .add(OrderCol::Status.ne(OrderStatus::Cancelled));
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::PurchasedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::PurchasedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    Ok(ApiResponse::success(
        "Orders",
        OrderList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn list_delivered_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<DeliveredOrderList>> {
    ensure_role(user, Role::Seller)?;
    let (page, limit, offset) = query.pagination().normalize();

    let finder = Orders::find().filter(
        Condition::all()
            .add(OrderCol::SellerId.eq(user.user_id))
            .add(OrderCol::Status.eq(OrderStatus::Delivered)),
    );
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .order_by_desc(OrderCol::UpdatedAt)
        .find_also_related(Reviews)
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|(order, review)| OrderWithReview {
            order: order.into(),
            review: review.map(Into::into),
        })
        .collect();

    Ok(ApiResponse::success(
        "Delivered orders",
        DeliveredOrderList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Sellers may only move their own orders; admins may move any. An order
/// belonging to another seller is reported as missing.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_any_role(user, &[Role::Seller, Role::Admin])?;

    let mut condition = Condition::all().add(OrderCol::Id.eq(id));
    if user.role == Role::Seller {
        condition = condition.add(OrderCol::SellerId.eq(user.user_id));
    }

    let txn = state.orm.begin().await?;
    let order = Orders::find()
        .filter(condition)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let from = order.status;
    let order = transition_order(&txn, order, payload.status).await?;
    txn.commit().await?;

    tracing::info!(
        user_id = %user.user_id,
        order_id = %order.id,
        from = from.as_str(),
        to = order.status.as_str(),
        "order status updated"
    );
    audit::record(
        &state.pool,
        user.user_id,
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "from": from, "status": order.status }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order updated",
        Order::from(order),
        Some(Meta::empty()),
    ))
}
