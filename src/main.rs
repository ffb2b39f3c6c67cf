use mpesa_checkout::api::{self, AppState};
use mpesa_checkout::application::{CallbackService, PaymentService};
use mpesa_checkout::domain::Currency;
use mpesa_checkout::infrastructure::{
    DarajaAdapter, InMemoryOrderRepository, MpesaConfig, MySqlOrderRepository, ServerConfig,
};
use mpesa_checkout::ports::{MobileMoneyPort, OrderRepositoryPort};
use sqlx::MySqlPool;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载环境变量
    dotenvy::dotenv().ok();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Starting M-Pesa checkout service...");

    let server_config = ServerConfig::from_env()?;

    // 初始化M-Pesa配置
    let mpesa_config = MpesaConfig::from_env()?;
    info!(
        "M-Pesa configuration loaded for short code {} against {}",
        mpesa_config.short_code, mpesa_config.base_url
    );
    let currency = Currency::parse(&mpesa_config.currency)?;

    // 创建M-Pesa适配器
    let mpesa_adapter = Arc::new(DarajaAdapter::new(mpesa_config)?);

    match server_config.database_url.as_deref() {
        Some(database_url) => {
            info!("Connecting to database...");
            let pool = MySqlPool::connect(database_url).await?;
            let repository = MySqlOrderRepository::new(Arc::new(pool));
            repository.migrate().await?;
            info!("Database connected and migrated");

            serve(&server_config, mpesa_adapter, Arc::new(repository), currency).await
        }
        None => {
            warn!("DATABASE_URL not set, orders are kept in memory only");
            serve(
                &server_config,
                mpesa_adapter,
                Arc::new(InMemoryOrderRepository::new()),
                currency,
            )
            .await
        }
    }
}

async fn serve<M, R>(
    server_config: &ServerConfig,
    mobile_money: Arc<M>,
    repository: Arc<R>,
    currency: Currency,
) -> anyhow::Result<()>
where
    M: MobileMoneyPort + 'static,
    R: OrderRepositoryPort + 'static,
{
    // 创建应用状态
    let app_state = AppState {
        payment_service: Arc::new(PaymentService::new(
            mobile_money,
            repository.clone(),
            currency,
        )),
        callback_service: Arc::new(CallbackService::new(repository)),
    };

    let app = api::create_router(app_state);

    let addr = server_config.addr();
    info!("Server listening on {}", addr);
    info!("Available endpoints:");
    info!("  GET  /health - Health check");
    info!("  POST /api/place-order - Place order and send STK push");
    info!("  GET  /api/order-status/:order_id - Query order status");
    info!("  POST /mpesa/callback - M-Pesa STK callback");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
