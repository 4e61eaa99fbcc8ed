use anyhow::Result;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use api::jwt::{JwtConfig, JwtService};
use api::notify::{InvoiceClient, InvoiceConfig, Mailer};
use api::routes;
use api::service::BookingService;
use api::state::AppState;
use api::store::postgres::PgStore;
use common::database::{DatabaseConfig, init_pool};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting booking service");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    // Apply pending migrations (schema + room reference data)
    common::database::run_migrations(&pool, &MIGRATOR).await?;

    info!("Booking service initialized successfully");

    let jwt = JwtService::new(JwtConfig::from_env()?);
    let invoices = InvoiceClient::new(InvoiceConfig::from_env());
    let mailer = Mailer::from_env();
    let service = BookingService::new(PgStore::new(pool), invoices);

    let app_state = AppState {
        service,
        jwt,
        mailer,
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Booking service listening on 0.0.0.0:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}
