use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        orders::{CheckoutRequest, CheckoutResponse, OrderDetail, OrderList},
        reviews::{ReviewEligibility, SubmitReviewRequest},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Order, Review},
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::{order_service, review_service},
    state::AppState,
    types::pricing::CheckoutQuote,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/checkout", post(checkout))
        .route("/checkout/quote", get(checkout_quote))
        .route("/{id}", get(get_order))
        .route("/{id}/cancel", post(cancel_order))
        .route("/{id}/review-eligibility", get(review_eligibility))
        .route("/{id}/review", post(submit_review))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Caller's orders", body = ApiResponse<OrderList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/checkout/quote",
    responses(
        (status = 200, description = "Subtotal, shipping and total for the current cart", body = ApiResponse<CheckoutQuote>),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn checkout_quote(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CheckoutQuote>>> {
    let resp = order_service::checkout_quote(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "One order per cart line", body = ApiResponse<CheckoutResponse>),
        (status = 400, description = "Invalid address, payment or empty cart"),
        (status = 409, description = "Out of stock or total changed"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<CheckoutResponse>>> {
    let resp = order_service::checkout(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order with allowed next statuses", body = ApiResponse<OrderDetail>),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderDetail>>> {
    let resp = order_service::get_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order cancelled and stock restored", body = ApiResponse<Order>),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order already delivered or cancelled"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_service::cancel_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}/review-eligibility",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Whether the order can be reviewed", body = ApiResponse<ReviewEligibility>),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn review_eligibility(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ReviewEligibility>>> {
    let resp = review_service::can_review(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/review",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = SubmitReviewRequest,
    responses(
        (status = 200, description = "Review stored", body = ApiResponse<Review>),
        (status = 400, description = "Score out of range"),
        (status = 409, description = "Not delivered or already reviewed"),
        (status = 502, description = "Sentiment service failed"),
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn submit_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitReviewRequest>,
) -> AppResult<Json<ApiResponse<Review>>> {
    let resp = review_service::submit_review(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
