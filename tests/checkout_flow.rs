use std::sync::Arc;

use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use supersales_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        cart::{AddToCartRequest, UpdateCartItemRequest},
        orders::{CheckoutRequest, UpdateOrderStatusRequest},
        products::InventoryAdjustRequest,
        reviews::{ReviewBlock, SubmitReviewRequest},
    },
    entity::{
        Products, products::ActiveModel as ProductActive, users::ActiveModel as UserActive,
    },
    error::AppError,
    middleware::auth::AuthUser,
    routes::params::{OrderListQuery, OrderScope, Pagination},
    sentiment::StaticSentiment,
    services::{admin_service, cart_service, order_service, review_service, seller_service},
    state::AppState,
    types::{payment::PaymentDetails, pricing::ShippingPolicy, role::Role, status::OrderStatus},
};
use uuid::Uuid;

// Cart -> checkout -> fulfilment -> review, against a real database.
#[tokio::test]
async fn checkout_lifecycle_and_review_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run checkout flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;

    let seller = AuthUser::new(create_user(&state, Role::Seller).await?, Role::Seller);
    let other_seller = AuthUser::new(create_user(&state, Role::Seller).await?, Role::Seller);
    let customer = AuthUser::new(create_user(&state, Role::Customer).await?, Role::Customer);
    let admin = AuthUser::new(create_user(&state, Role::Admin).await?, Role::Admin);

    let product_a = create_product(&state, seller.user_id, 50, 10).await?;
    let product_b = create_product(&state, seller.user_id, 30, 5).await?;
    let product_c = create_product(&state, seller.user_id, 20, 10).await?;

    // First purchase: no history, free shipping.
    add(&state, &customer, product_c, 1).await?;
    let first = order_service::checkout(&state, &customer, checkout_request(None))
        .await?
        .data
        .unwrap();
    assert_eq!(first.quote.shipping, 0);
    assert_eq!(first.quote.total, 20);
    assert_eq!(first.orders.len(), 1);

    // Adding the same product twice merges into one line.
    add(&state, &customer, product_a, 1).await?;
    let merged = add(&state, &customer, product_a, 1).await?;
    assert_eq!(merged, 2);
    add(&state, &customer, product_b, 1).await?;

    let quote = order_service::checkout_quote(&state, &customer)
        .await?
        .data
        .unwrap();
    assert_eq!((quote.subtotal, quote.shipping, quote.total), (130, 0, 130));
    assert_eq!((quote.item_count, quote.line_count), (3, 2));

    // One prior order row: still free shipping, one row per cart line.
    let second = order_service::checkout(&state, &customer, checkout_request(Some(130)))
        .await?
        .data
        .unwrap();
    assert_eq!(second.orders.len(), 2);
    assert!(second.orders.iter().all(|o| o.total_charge == 130));
    assert!(second.orders.iter().all(|o| o.checkout_id == second.checkout_id));
    assert!(second.orders.iter().all(|o| o.status == OrderStatus::Processing));
    assert_eq!(second.orders[0].address, "Ana Souza, Rua das Flores 10, RJ");
    assert_eq!(second.orders[0].payment_method, "Boleto");
    assert_eq!(stock(&state, product_a).await?, 8);
    assert_eq!(stock(&state, product_b).await?, 4);

    let summary = cart_service::summarize(&state.pool, customer.user_id).await?;
    assert_eq!(summary.line_count, 0);

    // Retrying finds an empty cart and leaves stock alone.
    let retry = order_service::checkout(&state, &customer, checkout_request(Some(130))).await;
    assert!(matches!(retry, Err(AppError::BadRequest(_))));
    assert_eq!(stock(&state, product_a).await?, 8);

    // Three prior rows: the flat fee applies, whatever the cart size.
    add(&state, &customer, product_c, 1).await?;
    let drifted = order_service::checkout(&state, &customer, checkout_request(Some(20))).await;
    assert!(matches!(drifted, Err(AppError::Conflict(_))));
    let third = order_service::checkout(&state, &customer, checkout_request(None))
        .await?
        .data
        .unwrap();
    assert_eq!(third.quote.shipping, ShippingPolicy::default().flat_fee);
    assert_eq!(third.quote.total, 20 + ShippingPolicy::default().flat_fee);

    // A line that cannot be filled rolls back the whole checkout.
    let c_before = stock(&state, product_c).await?;
    add(&state, &customer, product_c, 1).await?;
    add(&state, &customer, product_b, 10).await?;
    let short = order_service::checkout(&state, &customer, checkout_request(None)).await;
    assert!(matches!(short, Err(AppError::OutOfStock { product_id }) if product_id == product_b));
    assert_eq!(stock(&state, product_c).await?, c_before);
    assert_eq!(stock(&state, product_b).await?, 4);
    assert_eq!(
        cart_service::summarize(&state.pool, customer.user_id).await?.line_count,
        2
    );
    cart_service::clear_cart(&state.pool, &customer).await?;

    let order_a = second
        .orders
        .iter()
        .find(|o| o.product_id == product_a)
        .unwrap()
        .id;
    let order_b = second
        .orders
        .iter()
        .find(|o| o.product_id == product_b)
        .unwrap()
        .id;

    // Another seller cannot see the order at all.
    let foreign = set_status(&state, &other_seller, order_a, OrderStatus::Shipped).await;
    assert!(matches!(foreign, Err(AppError::NotFound)));

    // Delivery is terminal.
    set_status(&state, &seller, order_a, OrderStatus::Shipped).await?;
    set_status(&state, &seller, order_a, OrderStatus::Delivered).await?;
    let after_delivery = set_status(&state, &admin, order_a, OrderStatus::Shipped).await;
    assert!(matches!(
        after_delivery,
        Err(AppError::InvalidTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Shipped
        })
    ));
    let cancel_delivered = order_service::cancel_order(&state, &customer, order_a).await;
    assert!(matches!(cancel_delivered, Err(AppError::InvalidTransition { .. })));

    // Cancelling puts the quantity back, once.
    order_service::cancel_order(&state, &customer, order_b).await?;
    assert_eq!(stock(&state, product_b).await?, 5);
    let again = order_service::cancel_order(&state, &customer, order_b).await;
    assert!(matches!(again, Err(AppError::InvalidTransition { .. })));
    assert_eq!(stock(&state, product_b).await?, 5);

    // Another customer cannot cancel someone else's order.
    let stranger = AuthUser::new(create_user(&state, Role::Customer).await?, Role::Customer);
    let not_theirs = order_service::cancel_order(&state, &stranger, first.orders[0].id).await;
    assert!(matches!(not_theirs, Err(AppError::NotFound)));

    let history = order_service::list_orders(
        &state,
        &customer,
        OrderListQuery {
            scope: Some(OrderScope::History),
            ..Default::default()
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(history.items.len(), 2);

    // Review gate: delivered once, then closed.
    let blocked = review_service::can_review(&state, &customer, order_b)
        .await?
        .data
        .unwrap();
    assert_eq!(blocked.reason, Some(ReviewBlock::NotDelivered));

    let open = review_service::can_review(&state, &customer, order_a)
        .await?
        .data
        .unwrap();
    assert!(open.can_review);

    let review = review_service::submit_review(
        &state,
        &customer,
        order_a,
        SubmitReviewRequest {
            score: 5,
            comment: "Chegou rapido, recomendo".into(),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(review.sentiment.as_deref(), Some("POSITIVE"));
    assert_eq!(review.order_status, OrderStatus::Delivered);

    let duplicate = review_service::submit_review(
        &state,
        &customer,
        order_a,
        SubmitReviewRequest {
            score: 1,
            comment: String::new(),
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    for _ in 0..2 {
        let closed = review_service::can_review(&state, &customer, order_a)
            .await?
            .data
            .unwrap();
        assert!(!closed.can_review);
        assert_eq!(closed.reason, Some(ReviewBlock::AlreadyReviewed));
    }

    let delivered = seller_service::list_delivered_orders(&state, &seller, OrderListQuery::default())
        .await?
        .data
        .unwrap();
    assert_eq!(delivered.items.len(), 1);
    assert_eq!(delivered.items[0].order.id, order_a);
    assert!(delivered.items[0].review.is_some());

    let active = seller_service::list_seller_orders(&state, &seller, OrderListQuery::default())
        .await?
        .data
        .unwrap();
    assert!(active.items.iter().all(|o| o.status != OrderStatus::Cancelled));

    // Inventory can be topped up but never driven negative.
    let overdraw = admin_service::adjust_inventory(
        &state,
        &admin,
        product_a,
        InventoryAdjustRequest { delta: -100 },
    )
    .await;
    assert!(matches!(overdraw, Err(AppError::BadRequest(_))));
    admin_service::adjust_inventory(&state, &admin, product_a, InventoryAdjustRequest { delta: 2 })
        .await?;
    assert_eq!(stock(&state, product_a).await?, 10);

    cart_line_editing(&state, seller.user_id).await?;
    cart_totals_that_overflow_are_rejected(&state, seller.user_id).await?;
    concurrent_checkouts_do_not_oversell(&state, seller.user_id).await?;

    Ok(())
}

async fn cart_line_editing(state: &AppState, seller_id: Uuid) -> anyhow::Result<()> {
    let customer = AuthUser::new(create_user(state, Role::Customer).await?, Role::Customer);
    let lamp = create_product(state, seller_id, 40, 10).await?;
    let rug = create_product(state, seller_id, 15, 10).await?;
    add(state, &customer, lamp, 1).await?;
    add(state, &customer, rug, 2).await?;

    let updated = cart_service::update_cart_item(
        &state.pool,
        &customer,
        lamp,
        UpdateCartItemRequest { quantity: 3 },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(updated.quantity, 3);

    let missing = cart_service::update_cart_item(
        &state.pool,
        &customer,
        Uuid::new_v4(),
        UpdateCartItemRequest { quantity: 1 },
    )
    .await;
    assert!(matches!(missing, Err(AppError::NotFound)));

    let cart = cart_service::list_cart(&state.pool, &customer, Pagination::default())
        .await?
        .data
        .unwrap();
    assert_eq!(cart.items.len(), 2);
    let lamp_line = cart.items.iter().find(|i| i.product.id == lamp).unwrap();
    assert_eq!(lamp_line.line_total, 120);
    assert_eq!(cart.summary.total_quantity, 5);
    assert_eq!(cart.summary.total_price, 150);

    cart_service::remove_from_cart(&state.pool, &customer, rug).await?;
    let gone = cart_service::remove_from_cart(&state.pool, &customer, rug).await;
    assert!(matches!(gone, Err(AppError::NotFound)));

    let cart = cart_service::list_cart(&state.pool, &customer, Pagination::default())
        .await?
        .data
        .unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.summary.line_count, 1);

    // An absurd page still answers with an empty page.
    let far = cart_service::list_cart(
        &state.pool,
        &customer,
        Pagination {
            page: Some(i64::MAX),
            per_page: Some(100),
        },
    )
    .await?
    .data
    .unwrap();
    assert!(far.items.is_empty());
    assert_eq!(far.summary.line_count, 1);
    Ok(())
}

async fn cart_totals_that_overflow_are_rejected(
    state: &AppState,
    seller_id: Uuid,
) -> anyhow::Result<()> {
    let customer = AuthUser::new(create_user(state, Role::Customer).await?, Role::Customer);
    let bulk = create_product(state, seller_id, 1, 10).await?;
    add(state, &customer, bulk, i32::MAX).await?;
    let merged = cart_service::add_to_cart(
        &state.pool,
        &customer,
        AddToCartRequest {
            product_id: bulk,
            quantity: 1,
        },
    )
    .await;
    assert!(matches!(merged, Err(AppError::BadRequest(_))));
    cart_service::clear_cart(&state.pool, &customer).await?;

    let pricey = create_product(state, seller_id, i64::MAX / 2, 10).await?;
    add(state, &customer, pricey, 3).await?;
    let summary = cart_service::cart_summary(&state.pool, &customer).await;
    assert!(matches!(summary, Err(AppError::BadRequest(_))));
    let listed = cart_service::list_cart(&state.pool, &customer, Pagination::default()).await;
    assert!(matches!(listed, Err(AppError::BadRequest(_))));
    let quote = order_service::checkout_quote(state, &customer).await;
    assert!(matches!(quote, Err(AppError::BadRequest(_))));

    cart_service::update_cart_item(
        &state.pool,
        &customer,
        pricey,
        UpdateCartItemRequest { quantity: 1 },
    )
    .await?;
    let summary = cart_service::summarize(&state.pool, customer.user_id).await?;
    assert_eq!(summary.total_price, i64::MAX / 2);
    Ok(())
}

async fn concurrent_checkouts_do_not_oversell(
    state: &AppState,
    seller_id: Uuid,
) -> anyhow::Result<()> {
    const BUYERS: usize = 10;
    const UNITS: i32 = 3;

    let scarce = create_product(state, seller_id, 25, UNITS).await?;
    let mut buyers = Vec::with_capacity(BUYERS);
    for _ in 0..BUYERS {
        let buyer = AuthUser::new(create_user(state, Role::Customer).await?, Role::Customer);
        add(state, &buyer, scarce, 1).await?;
        buyers.push(buyer);
    }

    let handles: Vec<_> = buyers
        .into_iter()
        .map(|buyer| {
            let state = state.clone();
            tokio::spawn(async move {
                order_service::checkout(&state, &buyer, checkout_request(None))
                    .await
                    .map(|_| ())
            })
        })
        .collect();

    let mut placed = 0;
    let mut out_of_stock = 0;
    for handle in handles {
        match handle.await? {
            Ok(()) => placed += 1,
            Err(AppError::OutOfStock { product_id }) if product_id == scarce => out_of_stock += 1,
            Err(other) => anyhow::bail!("unexpected checkout error: {other}"),
        }
    }

    assert_eq!(placed, UNITS as usize);
    assert_eq!(out_of_stock, BUYERS - UNITS as usize);
    assert_eq!(stock(state, scarce).await?, 0);
    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;
    let pool = create_pool(database_url).await?;

    Ok(AppState {
        pool,
        orm,
        classifier: Arc::new(StaticSentiment::new("POSITIVE")),
        shipping: ShippingPolicy::default(),
    })
}

async fn create_user(state: &AppState, role: Role) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    let user = UserActive {
        id: Set(id),
        username: Set(format!("{}-{id}", role.as_str())),
        email: Set(format!("{id}@example.com")),
        role: Set(role.as_str().into()),
        residing_state: Set(Some("RJ".into())),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}

async fn create_product(
    state: &AppState,
    seller_id: Uuid,
    price: i64,
    stock: i32,
) -> anyhow::Result<Uuid> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        seller_id: Set(seller_id),
        category: Set("test".into()),
        name: Set(format!("Test product {price}")),
        brand: Set(None),
        weight_g: Set(None),
        length_cm: Set(None),
        width_cm: Set(None),
        height_cm: Set(None),
        price: Set(price),
        stock: Set(stock),
        image1: Set(None),
        image2: Set(None),
        image3: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(product.id)
}

async fn add(
    state: &AppState,
    customer: &AuthUser,
    product_id: Uuid,
    quantity: i32,
) -> anyhow::Result<i32> {
    let line = cart_service::add_to_cart(
        &state.pool,
        customer,
        AddToCartRequest {
            product_id,
            quantity,
        },
    )
    .await?
    .data
    .unwrap();
    Ok(line.quantity)
}

async fn stock(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    let product = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product {product_id} vanished"))?;
    Ok(product.stock)
}

async fn set_status(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    status: OrderStatus,
) -> Result<(), AppError> {
    seller_service::update_order_status(state, user, order_id, UpdateOrderStatusRequest { status })
        .await
        .map(|_| ())
}

fn checkout_request(expected_total: Option<i64>) -> CheckoutRequest {
    CheckoutRequest {
        full_name: "Ana Souza".into(),
        address: "Rua das Flores 10".into(),
        state: "RJ".into(),
        phone: "987654321".into(),
        payment: PaymentDetails::Boleto {
            boleto_number: "2".repeat(47),
            cpf: "12345678901".into(),
        },
        expected_total,
    }
}

