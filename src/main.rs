use std::net::{IpAddr, SocketAddr};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use supersales_api::{
    app::build_router,
    config::AppConfig,
    db::{create_orm_conn, create_pool},
    sentiment,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,supersales_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    // Read per request by the auth extractor.
    if std::env::var("JWT_SECRET").is_err() {
        anyhow::bail!("JWT_SECRET must be set");
    }

    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    let orm = create_orm_conn(&config.database_url).await?;

    let state = AppState {
        pool,
        orm,
        classifier: sentiment::from_config(&config.sentiment)?,
        shipping: config.shipping,
    };
    tracing::info!(
        flat_fee = state.shipping.flat_fee,
        free_order_limit = state.shipping.free_order_limit,
        "shipping policy loaded"
    );

    let app = build_router(state);

    let addr = SocketAddr::from((config.host.parse::<IpAddr>()?, config.port));
    tracing::info!("listening on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}
