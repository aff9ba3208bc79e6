//! Live-data tool: GB carbon intensity for a half-hour block.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, Timelike, Utc};
use gridsage_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Public National Grid carbon intensity API.
pub const CARBON_INTENSITY_API: &str = "https://api.carbonintensity.org.uk";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const WINDOW_FORMAT: &str = "%Y-%m-%dT%H:%MZ";

/// One reading from a live-data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolReading {
    pub window_from: Option<String>,
    pub window_to: Option<String>,

    /// Forecast value, or the actual value when no forecast exists (gCO2/kWh)
    pub intensity: Option<i64>,

    /// Qualitative band such as "moderate"
    pub index: Option<String>,
    pub forecast: Option<i64>,
    pub actual: Option<i64>,

    /// Request URL, used as the citation
    pub source: String,
}

impl ToolReading {
    pub fn has_value(&self) -> bool {
        self.intensity.is_some()
    }

    /// Window as `HH:MM-HH:MM (UTC)`, or the raw bounds if they do not parse.
    pub fn humanized_window(&self) -> String {
        let from = self.window_from.as_deref().unwrap_or("?");
        let to = self.window_to.as_deref().unwrap_or("?");

        match (
            NaiveDateTime::parse_from_str(from, WINDOW_FORMAT),
            NaiveDateTime::parse_from_str(to, WINDOW_FORMAT),
        ) {
            (Ok(start), Ok(end)) => format!(
                "{}-{} (UTC)",
                start.format("%H:%M"),
                end.format("%H:%M")
            ),
            _ => format!("{} -> {}", from, to),
        }
    }

    /// Render the reading as the context block for the answer prompt.
    pub fn to_context(&self) -> String {
        let na = || "n/a".to_string();
        let index = self
            .index
            .as_deref()
            .filter(|i| !i.is_empty())
            .map(capitalize)
            .unwrap_or_else(na);

        format!(
            "Time window: {}\nCarbon intensity: {} gCO2/kWh (index: {})\nForecast: {}\nActual: {}\nSource: {}",
            self.humanized_window(),
            self.intensity.map(|v| v.to_string()).unwrap_or_else(na),
            index,
            self.forecast.map(|v| v.to_string()).unwrap_or_else(na),
            self.actual.map(|v| v.to_string()).unwrap_or_else(na),
            self.source
        )
    }
}

fn capitalize(s: &str) -> String {
    let lower = s.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// An external, time-windowed data source.
#[async_trait]
pub trait LiveDataTool: Send + Sync {
    fn name(&self) -> &str;

    /// Reading for the block containing `at`.
    async fn lookup(&self, at: DateTime<Utc>) -> AppResult<ToolReading>;
}

/// Half-hour UTC block containing `at`.
pub fn half_hour_window(at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let minute = if at.minute() < 30 { 0 } else { 30 };
    let start = at
        .with_minute(minute)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at);
    (start, start + ChronoDuration::minutes(30))
}

#[derive(Debug, Deserialize)]
struct IntensityResponse {
    #[serde(default)]
    data: Vec<IntensityBlock>,
}

#[derive(Debug, Deserialize)]
struct IntensityBlock {
    from: Option<String>,
    to: Option<String>,
    #[serde(default)]
    intensity: Option<IntensityValues>,
}

#[derive(Debug, Default, Deserialize)]
struct IntensityValues {
    forecast: Option<i64>,
    actual: Option<i64>,
    index: Option<String>,
}

/// Client for the carbon intensity `/intensity/{from}/{to}` endpoint.
#[derive(Debug, Clone)]
pub struct CarbonIntensityTool {
    base_url: String,
    client: Client,
}

impl CarbonIntensityTool {
    pub fn new() -> AppResult<Self> {
        Self::with_base_url(CARBON_INTENSITY_API, DEFAULT_TIMEOUT)
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Tool(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn window_url(&self, at: DateTime<Utc>) -> String {
        let (start, end) = half_hour_window(at);
        format!(
            "{}/intensity/{}/{}",
            self.base_url,
            start.format(WINDOW_FORMAT),
            end.format(WINDOW_FORMAT)
        )
    }
}

#[async_trait]
impl LiveDataTool for CarbonIntensityTool {
    fn name(&self) -> &str {
        "carbon-intensity"
    }

    async fn lookup(&self, at: DateTime<Utc>) -> AppResult<ToolReading> {
        let url = self.window_url(at);
        tracing::debug!("Fetching carbon intensity: {}", url);

        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                AppError::Timeout(format!("Carbon intensity request to {}", url))
            } else {
                AppError::Tool(format!("Carbon intensity request failed: {}", e))
            }
        };

        let response = self.client.get(&url).send().await.map_err(map_err)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Tool(format!(
                "Carbon intensity API returned {} for {}",
                status, url
            )));
        }

        let body: IntensityResponse = response.json().await.map_err(map_err)?;

        // The API returns a list; the last block is the one asked for.
        let Some(block) = body.data.into_iter().last() else {
            tracing::info!("Carbon intensity API returned no blocks for {}", url);
            return Ok(ToolReading {
                window_from: None,
                window_to: None,
                intensity: None,
                index: None,
                forecast: None,
                actual: None,
                source: url,
            });
        };

        let values = block.intensity.unwrap_or_default();

        Ok(ToolReading {
            window_from: block.from,
            window_to: block.to,
            intensity: values.forecast.or(values.actual),
            index: values.index,
            forecast: values.forecast,
            actual: values.actual,
            source: url,
        })
    }
}
