use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit,
    db::DbPool,
    dto::cart::{AddToCartRequest, CartItemDto, CartList, CartSummary, UpdateCartItemRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_customer},
    models::{CartItem, Product},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    types::pricing::{self, PricedLine},
};

#[derive(FromRow)]
struct CartWithProductRow {
    cart_id: Uuid,
    quantity: i32,
    #[sqlx(flatten)]
    product: Product,
}

#[derive(FromRow)]
struct PriceRow {
    product_id: Uuid,
    quantity: i32,
    price: i64,
}

pub async fn list_cart(
    pool: &DbPool,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<CartList>> {
    ensure_customer(user)?;
    let (page, limit, offset) = pagination.normalize();
    let rows = sqlx::query_as::<_, CartWithProductRow>(
        r#"
        SELECT ci.id AS cart_id, ci.quantity, p.*
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.user_id = $1
        ORDER BY ci.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user.user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let summary = summarize(pool, user.user_id).await?;

    let items = rows
        .into_iter()
        .map(|row| {
            Ok(CartItemDto {
                id: row.cart_id,
                line_total: pricing::line_total(row.product.price, row.quantity)?,
                product: row.product,
                quantity: row.quantity,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, summary.line_count);
    Ok(ApiResponse::success(
        "OK",
        CartList { items, summary },
        Some(meta),
    ))
}

pub async fn cart_summary(pool: &DbPool, user: &AuthUser) -> AppResult<ApiResponse<CartSummary>> {
    ensure_customer(user)?;
    let summary = summarize(pool, user.user_id).await?;
    Ok(ApiResponse::success("OK", summary, Some(Meta::empty())))
}

/// Line count, item count and price of a cart at current product prices.
pub async fn summarize(pool: &DbPool, user_id: Uuid) -> AppResult<CartSummary> {
    let rows = sqlx::query_as::<_, PriceRow>(
        r#"
        SELECT ci.product_id, ci.quantity, p.price
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let lines: Vec<PricedLine> = rows
        .into_iter()
        .map(|row| PricedLine {
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price: row.price,
        })
        .collect();
    let (total_price, total_quantity) = pricing::subtotal(&lines)?;

    Ok(CartSummary {
        line_count: lines.len() as i64,
        total_quantity,
        total_price,
    })
}

pub async fn add_to_cart(
    pool: &DbPool,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    ensure_customer(user)?;
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let product_exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(payload.product_id)
        .fetch_optional(pool)
        .await?;
    if product_exist.is_none() {
        return Err(AppError::BadRequest("product not found".to_string()));
    }

    // A merge past i32::MAX matches no row.
    let cart_item = sqlx::query_as::<_, CartItem>(
        r#"
        INSERT INTO cart_items (id, user_id, product_id, quantity)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, product_id)
        DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
        WHERE cart_items.quantity::BIGINT + EXCLUDED.quantity <= $5
        RETURNING id, product_id, user_id, quantity, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(payload.product_id)
    .bind(payload.quantity)
    .bind(i64::from(i32::MAX))
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::BadRequest("cart quantity is too large".to_string()))?;

    tracing::info!(
        user_id = %user.user_id,
        product_id = %payload.product_id,
        added = payload.quantity,
        quantity = cart_item.quantity,
        "cart line added"
    );
    audit::record(
        pool,
        user.user_id,
        "cart_add",
        "cart_items",
        serde_json::json!({ "product_id": payload.product_id, "quantity": payload.quantity }),
    )
    .await;

    Ok(ApiResponse::success("OK", cart_item, None))
}

pub async fn update_cart_item(
    pool: &DbPool,
    user: &AuthUser,
    product_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartItem>> {
    ensure_customer(user)?;
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let cart_item = sqlx::query_as::<_, CartItem>(
        r#"
        UPDATE cart_items
        SET quantity = $3
        WHERE user_id = $1 AND product_id = $2
        RETURNING id, product_id, user_id, quantity, created_at
        "#,
    )
    .bind(user.user_id)
    .bind(product_id)
    .bind(payload.quantity)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound)?;

    audit::record(
        pool,
        user.user_id,
        "cart_update",
        "cart_items",
        serde_json::json!({ "product_id": product_id, "quantity": payload.quantity }),
    )
    .await;

    Ok(ApiResponse::success("OK", cart_item, None))
}

pub async fn remove_from_cart(
    pool: &DbPool,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_customer(user)?;
    let result = sqlx::query("DELETE FROM cart_items WHERE product_id = $1 AND user_id = $2")
        .bind(product_id)
        .bind(user.user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        pool,
        user.user_id,
        "cart_remove",
        "cart_items",
        serde_json::json!({ "product_id": product_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn clear_cart(
    pool: &DbPool,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_customer(user)?;
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user.user_id)
        .execute(pool)
        .await?;

    tracing::info!(user_id = %user.user_id, removed = result.rows_affected(), "cart cleared");

    Ok(ApiResponse::success(
        "Cart cleared",
        serde_json::json!({ "removed": result.rows_affected() }),
        Some(Meta::empty()),
    ))
}
