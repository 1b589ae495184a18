use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        cart::{AddToCartRequest, CartItemDto, CartList, CartSummary, UpdateCartItemRequest},
        orders::{
            CheckoutRequest, CheckoutResponse, DeliveredOrderList, OrderDetail, OrderList,
            OrderWithReview, UpdateOrderStatusRequest,
        },
        products::{CreateProductRequest, InventoryAdjustRequest, ProductList, UpdateProductRequest},
        reviews::{ReviewBlock, ReviewEligibility, SubmitReviewRequest},
    },
    models::{CartItem, Order, Product, Review},
    response::{ApiResponse, Meta},
    routes::{admin, cart, health, orders, params, products, seller},
    types::{
        payment::{CardDetails, PaymentDetails, PaymentMethod},
        pricing::CheckoutQuote,
        role::Role,
        status::OrderStatus,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        cart::cart_list,
        cart::cart_summary,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        cart::clear_cart,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        orders::list_orders,
        orders::checkout_quote,
        orders::checkout,
        orders::get_order,
        orders::cancel_order,
        orders::review_eligibility,
        orders::submit_review,
        seller::list_seller_orders,
        seller::list_delivered_orders,
        seller::update_order_status,
        admin::list_all_orders,
        admin::list_low_stock,
        admin::adjust_inventory
    ),
    components(
        schemas(
            Product,
            CartItem,
            Order,
            Review,
            OrderStatus,
            Role,
            PaymentMethod,
            PaymentDetails,
            CardDetails,
            CheckoutQuote,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartItemDto,
            CartList,
            CartSummary,
            CheckoutRequest,
            CheckoutResponse,
            UpdateOrderStatusRequest,
            OrderList,
            OrderDetail,
            OrderWithReview,
            DeliveredOrderList,
            SubmitReviewRequest,
            ReviewBlock,
            ReviewEligibility,
            CreateProductRequest,
            UpdateProductRequest,
            InventoryAdjustRequest,
            ProductList,
            params::SortOrder,
            params::ProductSortBy,
            params::OrderScope,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartList>,
            ApiResponse<OrderList>,
            ApiResponse<CheckoutResponse>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Catalogue endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Checkout and customer order endpoints"),
        (name = "Reviews", description = "Post-delivery review endpoints"),
        (name = "Seller", description = "Seller fulfilment endpoints"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/cart",
            "/api/cart/summary",
            "/api/cart/{product_id}",
            "/api/orders/checkout",
            "/api/orders/checkout/quote",
            "/api/orders/{id}/cancel",
            "/api/orders/{id}/review",
            "/api/seller/orders/{id}/status",
            "/api/admin/inventory/{id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
