use std::{
    env,
    future::Future,
    sync::OnceLock,
    time::{Duration, Instant},
};

use aws_config::{BehaviorVersion, SdkConfig};
use aws_config::environment::region::EnvironmentVariableRegionProvider;
use aws_config::meta::region::ProvideRegion;
use aws_smithy_types::error::display::DisplayErrorContext;
use color_eyre::eyre::{Result, eyre};
use tracing::Instrument;

const DEBUG_DELAY_ENV: &str = "CIRRUS_DEBUG_DELAY_MS";

pub struct Clients {
    pub dynamodb: aws_sdk_dynamodb::Client,
    pub logs: aws_sdk_cloudwatchlogs::Client,
}

/// Build both service clients from one shared SDK configuration. The region
/// must come from the environment; credentials follow the default chain.
pub async fn new_clients(endpoint_url: Option<&str>) -> Result<Clients> {
    let config = load_config(endpoint_url).await?;
    Ok(Clients {
        dynamodb: aws_sdk_dynamodb::Client::new(&config),
        logs: aws_sdk_cloudwatchlogs::Client::new(&config),
    })
}

pub async fn new_dynamodb_client(endpoint_url: Option<&str>) -> Result<aws_sdk_dynamodb::Client> {
    let config = load_config(endpoint_url).await?;
    Ok(aws_sdk_dynamodb::Client::new(&config))
}

async fn load_config(endpoint_url: Option<&str>) -> Result<SdkConfig> {
    let region = EnvironmentVariableRegionProvider::new()
        .region()
        .await
        .ok_or_else(|| eyre!("AWS region not set. Use AWS_REGION or AWS_DEFAULT_REGION."))?;

    let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region);
    if let Some(url) = endpoint_url {
        loader = loader.endpoint_url(url);
    }
    Ok(loader.load().await)
}

/// Run one SDK call inside `span`, recording how long it took and whether it
/// failed.
pub async fn send_request<F, Fut, T, E>(span: tracing::Span, send: F) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error + 'static,
{
    async move {
        debug_delay().await;
        let started = Instant::now();
        let result = send().await;
        let elapsed_ms = started.elapsed().as_millis();
        match &result {
            Ok(_) => tracing::trace!(elapsed_ms, "request completed"),
            Err(err) => tracing::warn!(
                elapsed_ms,
                error = %DisplayErrorContext(err),
                "request failed"
            ),
        }
        result
    }
    .instrument(span)
    .await
}

async fn debug_delay() {
    if let Some(delay) = debug_delay_duration() {
        tracing::trace!(delay_ms = delay.as_millis(), "Applying debug request delay");
        tokio::time::sleep(delay).await;
    }
}

fn debug_delay_duration() -> Option<Duration> {
    static DELAY: OnceLock<Option<Duration>> = OnceLock::new();
    *DELAY.get_or_init(|| {
        let Ok(raw) = env::var(DEBUG_DELAY_ENV) else {
            return None;
        };
        parse_delay(&raw)
    })
}

fn parse_delay(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<u64>() {
        Ok(0) => None,
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(_) => {
            tracing::warn!(env = DEBUG_DELAY_ENV, value = %raw, "Invalid debug request delay");
            None
        }
    }
}
