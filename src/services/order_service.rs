use chrono::Utc;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, FromQueryResult,
    JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{CheckoutRequest, CheckoutResponse, OrderDetail, OrderList},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems, Relation as CartRelation},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_customer},
    models::Order,
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, OrderScope, SortOrder},
    state::AppState,
    types::{
        pricing::{self, CheckoutQuote, PricedLine},
        role::Role,
        shipping_address::ShippingAddress,
        status::OrderStatus,
    },
};

#[derive(Debug, FromQueryResult)]
struct CheckoutLine {
    product_id: Uuid,
    quantity: i32,
    price: i64,
    seller_id: Uuid,
}

impl CheckoutLine {
    fn priced(&self) -> PricedLine {
        PricedLine {
            product_id: self.product_id,
            quantity: self.quantity,
            unit_price: self.price,
        }
    }
}

/// Cart lines joined to their live product rows, in product order so that
/// concurrent checkouts lock products in the same sequence.
async fn load_cart_lines<C: ConnectionTrait>(
    conn: &C,
    customer_id: Uuid,
    lock: bool,
) -> AppResult<Vec<CheckoutLine>> {
    let mut select = CartItems::find()
        .select_only()
        .column(CartCol::ProductId)
        .column(CartCol::Quantity)
        .column(ProdCol::Price)
        .column(ProdCol::SellerId)
        .join(JoinType::InnerJoin, CartRelation::Products.def())
        .filter(CartCol::UserId.eq(customer_id))
        .order_by_asc(CartCol::ProductId);
    if lock {
        select = select.lock(LockType::Update);
    }
    let lines = select.into_model::<CheckoutLine>().all(conn).await?;
    Ok(lines)
}

async fn prior_order_count<C: ConnectionTrait>(conn: &C, customer_id: Uuid) -> AppResult<i64> {
    let count = Orders::find()
        .filter(OrderCol::CustomerId.eq(customer_id))
        .count(conn)
        .await?;
    Ok(count as i64)
}

/// Price the caller's cart without touching it.
pub async fn checkout_quote(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<CheckoutQuote>> {
    ensure_customer(user)?;
    let lines = load_cart_lines(&state.orm, user.user_id, false).await?;
    let priced: Vec<PricedLine> = lines.iter().map(CheckoutLine::priced).collect();
    let prior = prior_order_count(&state.orm, user.user_id).await?;
    let quote = pricing::quote(&priced, prior, &state.shipping)?;
    Ok(ApiResponse::success("OK", quote, Some(Meta::empty())))
}

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    ensure_customer(user)?;
    let shipping_to = ShippingAddress::parse(
        &payload.full_name,
        &payload.address,
        &payload.state,
        &payload.phone,
    )?;
    let method = payload.payment.validate(Utc::now().date_naive())?;

    let txn = state.orm.begin().await?;

    let lines = load_cart_lines(&txn, user.user_id, true).await?;
    if lines.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let priced: Vec<PricedLine> = lines.iter().map(CheckoutLine::priced).collect();
    let prior = prior_order_count(&txn, user.user_id).await?;
    let quote = pricing::quote(&priced, prior, &state.shipping)?;

    if let Some(expected) = payload.expected_total {
        if expected != quote.total {
            tracing::info!(
                user_id = %user.user_id,
                expected,
                total = quote.total,
                "checkout total drifted"
            );
            return Err(AppError::Conflict(format!(
                "Cart total changed to {}",
                quote.total
            )));
        }
    }

    let checkout_id = Uuid::new_v4();
    let address = shipping_to.combined();
    let now = Utc::now();
    let mut orders: Vec<Order> = Vec::with_capacity(lines.len());

    for line in &lines {
        let decremented = Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(line.quantity))
            .filter(ProdCol::Id.eq(line.product_id))
            .filter(ProdCol::Stock.gte(line.quantity))
            .exec(&txn)
            .await?;
        if decremented.rows_affected == 0 {
            return Err(AppError::OutOfStock {
                product_id: line.product_id,
            });
        }

        let order = OrderActive {
            id: Set(Uuid::new_v4()),
            checkout_id: Set(checkout_id),
            customer_id: Set(user.user_id),
            seller_id: Set(line.seller_id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            status: Set(OrderStatus::Processing),
            address: Set(address.clone()),
            phone: Set(shipping_to.phone.clone()),
            total_charge: Set(quote.total),
            payment_method: Set(method.label().to_string()),
            purchased_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        orders.push(order.into());
    }

    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(
        user_id = %user.user_id,
        %checkout_id,
        rows = orders.len(),
        total = quote.total,
        shipping = quote.shipping,
        "checkout completed"
    );
    audit::record(
        &state.pool,
        user.user_id,
        "checkout",
        "orders",
        serde_json::json!({ "checkout_id": checkout_id, "total": quote.total }),
    )
    .await;

    Ok(ApiResponse::success(
        "Checkout success",
        CheckoutResponse {
            checkout_id,
            quote,
            orders,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_customer(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all().add(OrderCol::CustomerId.eq(user.user_id));
    match query.scope.unwrap_or_default() {
        OrderScope::Active => {
            condition = condition.add(OrderCol::Status.is_in(OrderStatus::active()))
        }
        OrderScope::History => {
            condition = condition.add(OrderCol::Status.is_in(OrderStatus::terminal()))
        }
        OrderScope::All => {}
    }
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

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

/// A single order as seen by the caller: customers see their own, sellers
/// the ones they sold, admins any.
pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetail>> {
    let mut condition = Condition::all().add(OrderCol::Id.eq(id));
    condition = match user.role {
        Role::Customer => condition.add(OrderCol::CustomerId.eq(user.user_id)),
        Role::Seller => condition.add(OrderCol::SellerId.eq(user.user_id)),
        Role::Admin => condition,
    };

    let order = Orders::find()
        .filter(condition)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let next_states = match user.role {
        // A customer's only move is cancelling.
        Role::Customer => order
            .status
            .next_states()
            .into_iter()
            .filter(|s| *s == OrderStatus::Cancelled)
            .collect(),
        _ => order.status.next_states(),
    };

    Ok(ApiResponse::success(
        "OK",
        OrderDetail {
            order: order.into(),
            next_states,
        },
        Some(Meta::empty()),
    ))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    ensure_customer(user)?;
    let txn = state.orm.begin().await?;

    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::Id.eq(id))
                .add(OrderCol::CustomerId.eq(user.user_id)),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let order = transition_order(&txn, order, OrderStatus::Cancelled).await?;
    txn.commit().await?;

    tracing::info!(user_id = %user.user_id, order_id = %order.id, "order cancelled by customer");
    audit::record(
        &state.pool,
        user.user_id,
        "order_cancel",
        "orders",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order cancelled",
        Order::from(order),
        Some(Meta::empty()),
    ))
}

/// Move a locked order row to `next`. Entering `Cancelled` puts the ordered
/// quantity back on the product in the same transaction.
pub(crate) async fn transition_order<C: ConnectionTrait>(
    conn: &C,
    order: OrderModel,
    next: OrderStatus,
) -> AppResult<OrderModel> {
    if !order.status.can_transition_to(next) {
        return Err(AppError::InvalidTransition {
            from: order.status,
            to: next,
        });
    }

    let product_id = order.product_id;
    let quantity = order.quantity;
    let from = order.status;

    let mut active: OrderActive = order.into();
    active.status = Set(next);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(conn).await?;

    if next == OrderStatus::Cancelled {
        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(quantity))
            .filter(ProdCol::Id.eq(product_id))
            .exec(conn)
            .await?;
    }

    tracing::debug!(
        order_id = %updated.id,
        from = from.as_str(),
        to = next.as_str(),
        "order status changed"
    );
    Ok(updated)
}
