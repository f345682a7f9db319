use mimalloc::MiMalloc;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use umbrella::{SessionAccessor, SqliteEngine, UserAccessor, config::Config, db::sqlite};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(database_url = %cfg.database_url, loglevel = %cfg.loglevel);

    let pool = sqlite::connect(&cfg.database_url).await?;
    let engine = SqliteEngine::new(pool);

    UserAccessor::new(engine.clone()).create_table().await?;
    SessionAccessor::new(engine.clone()).create_table().await?;
    info!("users and sessions tables ready");

    engine.pool().close().await;
    Ok(())
}
