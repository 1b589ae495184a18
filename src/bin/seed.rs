use jsonwebtoken::{EncodingKey, Header, encode};
use supersales_api::{
    config::AppConfig,
    db::create_pool,
    dto::auth::Claims,
    types::role::Role,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user(&pool, "admin", "admin@example.com", Role::Admin, None).await?;
    let seller_id =
        ensure_user(&pool, "seller", "seller@example.com", Role::Seller, Some("SP")).await?;
    let customer_id = ensure_user(
        &pool,
        "customer",
        "customer@example.com",
        Role::Customer,
        Some("RJ"),
    )
    .await?;
    seed_products(&pool, seller_id).await?;

    println!("Seed completed.");
    match std::env::var("JWT_SECRET") {
        Ok(secret) => {
            for (id, role) in [
                (admin_id, Role::Admin),
                (seller_id, Role::Seller),
                (customer_id, Role::Customer),
            ] {
                println!("{:<8} {id}\n  Bearer {}", role.as_str(), dev_token(&secret, id, role)?);
            }
        }
        Err(_) => println!(
            "Admin ID: {admin_id}, Seller ID: {seller_id}, Customer ID: {customer_id} \
             (set JWT_SECRET to print bearer tokens)"
        ),
    }
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    username: &str,
    email: &str,
    role: Role,
    residing_state: Option<&str>,
) -> anyhow::Result<Uuid> {
    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, username, email, role, residing_state)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(email)
    .bind(role.as_str())
    .bind(residing_state)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={})", role.as_str());
    Ok(user_id)
}

async fn seed_products(pool: &sqlx::PgPool, seller_id: Uuid) -> anyhow::Result<()> {
    let existing: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products WHERE seller_id = $1")
        .bind(seller_id)
        .fetch_one(pool)
        .await?;
    if existing.0 > 0 {
        println!("Products already seeded");
        return Ok(());
    }

    let products = [
        ("beleza_saude", "Hidratante Facial", "Natura", 4_990, 40),
        ("informatica_acessorios", "Mouse sem fio", "Logitech", 12_900, 25),
        ("cama_mesa_banho", "Jogo de lencol queen", "Buddemeyer", 21_990, 8),
        ("esporte_lazer", "Garrafa termica 1L", "Stanley", 18_500, 3),
    ];

    for (category, name, brand, price, stock) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, seller_id, category, name, brand, price, stock)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(seller_id)
        .bind(category)
        .bind(name)
        .bind(brand)
        .bind(price as i64)
        .bind(stock as i32)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}

fn dev_token(secret: &str, user_id: Uuid, role: Role) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        role,
        exp: (chrono::Utc::now().timestamp() + 24 * 3600) as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}
