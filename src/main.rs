use dotenv::dotenv;
use market_data_service::api::{BinanceClient, BybitClient};
use market_data_service::coins::CoinsRepository;
use market_data_service::colors::ColorsRepository;
use market_data_service::config::Config;
use market_data_service::dispatch::FailureSink;
use market_data_service::handlers::{router, AppState};
use market_data_service::repository::KlineRepository;
use market_data_service::scheduler::spawn_kline_jobs;
use market_data_service::service::KlineService;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    dotenv().ok();

    let config = Arc::new(Config::from_env()?);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?;

    let coins = CoinsRepository::new(client.clone(), &config);
    let colors = ColorsRepository::new(client.clone(), &config);
    coins.initialize().await;
    colors.initialize().await;

    let repository = KlineRepository::new();
    let service = KlineService::new(
        config.clone(),
        BinanceClient::new(client.clone(), config.clone()),
        BybitClient::new(client.clone(), config.clone()),
        coins,
        colors,
        Arc::new(FailureSink::new(client, &config)),
        repository.clone(),
    );

    let settle_delay = Duration::from_secs(config.settle_delay_secs);
    let jobs = spawn_kline_jobs(service, settle_delay);
    info!("Scheduled {} kline jobs", jobs.len());

    let state = Arc::new(AppState { repository });
    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Market data service listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
