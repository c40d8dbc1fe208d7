use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_cloudwatchlogs::Client;
use chrono::{DateTime, Local, TimeZone, Utc};

use crate::{aws::send_request, error::StoreError};

/// Events are only fetched from this far back.
pub const EVENT_WINDOW: Duration = Duration::from_secs(10 * 60);
pub const EVENT_LIMIT: i32 = 500;
pub const GROUP_PAGE_SIZE: i32 = 50;
const LAMBDA_PREFIX: &str = "/aws/lambda/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogGroupPage {
    pub groups: Vec<String>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub timestamp_ms: i64,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl TimeWindow {
    /// The [`EVENT_WINDOW`] ending at `now`.
    pub fn recent(now: DateTime<Utc>) -> Self {
        let end_ms = now.timestamp_millis();
        Self {
            start_ms: end_ms - EVENT_WINDOW.as_millis() as i64,
            end_ms,
        }
    }
}

#[async_trait]
pub trait LogStore: Send + Sync {
    async fn list_log_groups(
        &self,
        pattern: Option<&str>,
        token: Option<String>,
    ) -> Result<LogGroupPage, StoreError>;

    async fn filter_log_events(
        &self,
        group: &str,
        window: TimeWindow,
        limit: i32,
    ) -> Result<Vec<LogEvent>, StoreError>;
}

pub struct CloudWatchStore {
    client: Client,
}

impl CloudWatchStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LogStore for CloudWatchStore {
    async fn list_log_groups(
        &self,
        pattern: Option<&str>,
        token: Option<String>,
    ) -> Result<LogGroupPage, StoreError> {
        let span = tracing::trace_span!(
            "DescribeLogGroups",
            pattern = ?pattern,
            token_present = token.is_some()
        );
        let output = send_request(span, || {
            self.client
                .describe_log_groups()
                .set_log_group_name_pattern(pattern.map(str::to_string))
                .limit(GROUP_PAGE_SIZE)
                .set_next_token(token)
                .send()
        })
        .await
        .map_err(StoreError::from_sdk)?;
        Ok(LogGroupPage {
            groups: output
                .log_groups()
                .iter()
                .filter_map(|group| group.log_group_name().map(str::to_string))
                .collect(),
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn filter_log_events(
        &self,
        group: &str,
        window: TimeWindow,
        limit: i32,
    ) -> Result<Vec<LogEvent>, StoreError> {
        let span = tracing::trace_span!(
            "FilterLogEvents",
            group = %group,
            start_ms = window.start_ms,
            end_ms = window.end_ms,
            limit
        );
        let output = send_request(span, || {
            self.client
                .filter_log_events()
                .log_group_name(group)
                .start_time(window.start_ms)
                .end_time(window.end_ms)
                .limit(limit)
                .send()
        })
        .await
        .map_err(StoreError::from_sdk)?;
        Ok(output
            .events()
            .iter()
            .filter_map(|event| {
                Some(LogEvent {
                    timestamp_ms: event.timestamp()?,
                    message: event.message()?.to_string(),
                })
            })
            .collect())
    }
}

/// Follows continuation tokens until the last page and returns every group in
/// page order.
pub async fn list_all_log_groups(
    store: &dyn LogStore,
    pattern: Option<&str>,
) -> Result<Vec<String>, StoreError> {
    let mut groups = Vec::new();
    let mut token = None;
    loop {
        let page = store.list_log_groups(pattern, token).await?;
        groups.extend(page.groups);
        match page.next_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }
    tracing::debug!(groups = groups.len(), "Listed log groups");
    Ok(groups)
}

/// One `HH:MM:SS.mmm message` line per event, in local time.
pub fn render_events(events: &[LogEvent]) -> String {
    render_events_in(events, &Local)
}

pub fn render_events_in<Tz>(events: &[LogEvent], tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::new();
    for event in events {
        let timestamp = tz
            .timestamp_millis_opt(event.timestamp_ms)
            .single()
            .map(|at| at.format("%H:%M:%S%.3f").to_string())
            .unwrap_or_else(|| "??:??:??.???".to_string());
        out.push_str(&timestamp);
        out.push(' ');
        out.push_str(event.message.trim());
        out.push('\n');
    }
    out
}

/// Name shown for a group; Lambda groups drop their common prefix.
pub fn display_name(group: &str) -> &str {
    group.strip_prefix(LAMBDA_PREFIX).unwrap_or(group)
}
