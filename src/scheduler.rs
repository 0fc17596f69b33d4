use crate::service::KlineService;
use crate::timeframe::Timeframe;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Spawns one long-lived job per timeframe. Each job does a staggered
/// warmup run, then fires just after every candle boundary so the
/// exchanges have settled the closing candle.
pub fn spawn_kline_jobs(service: Arc<KlineService>, settle_delay: Duration) -> Vec<JoinHandle<()>> {
    Timeframe::ALL
        .iter()
        .map(|&timeframe| {
            let service = service.clone();
            tokio::spawn(async move {
                let warmup = timeframe.startup_delay();
                info!(
                    "Kline job {} warms up in {}s",
                    timeframe,
                    warmup.as_secs()
                );
                tokio::time::sleep(warmup).await;
                run_once(&service, timeframe).await;

                loop {
                    let now = Utc::now();
                    let fire_at = timeframe.next_fire(now);
                    let until_boundary = (fire_at - now)
                        .to_std()
                        .unwrap_or(Duration::ZERO);
                    tokio::time::sleep(until_boundary + settle_delay).await;
                    run_once(&service, timeframe).await;
                }
            })
        })
        .collect()
}

async fn run_once(service: &KlineService, timeframe: Timeframe) {
    match service.run(timeframe).await {
        Ok(()) => info!("Kline job {} completed", timeframe),
        Err(e) => error!("Kline job {} failed: {}", timeframe, e),
    }
}
