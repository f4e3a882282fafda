//! Geocoding client for imported address lists.
//!
//! Resolves [`AddressRow`]s to coordinates with the Google Geocoding API:
//! - Connection pooling with a shared client
//! - Dispatch rate limiting (spaces out request starts)
//! - Bounded concurrency, results kept in input order
//! - Retry with exponential backoff on 429 / `OVER_QUERY_LIMIT` / transport errors
//!
//! Order matters downstream: the route planner starts its tour at the first
//! row of the sheet.

use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::{AddressRow, AddressedPoint, GeoError, GeoPoint, Result};

const GOOGLE_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Environment variable read by [`GeocoderConfig::from_env`].
pub const API_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";

/// Geocoder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    pub api_key: String,
    /// Geocoding endpoint
    pub base_url: String,
    /// Coordinate substituted for addresses that fail to resolve.
    /// Default: central Paris. `None` drops unresolved rows instead.
    pub fallback: Option<GeoPoint>,
    /// Minimum spacing between request starts. Default: 25ms (40 req/s)
    pub dispatch_interval_ms: u64,
    /// Maximum requests in flight. Default: 16
    pub max_concurrency: u32,
    /// Retries per address on rate limiting or transport errors. Default: 3
    pub max_retries: u32,
    /// Per-request timeout. Default: 30s
    pub timeout_secs: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: GOOGLE_GEOCODE_URL.to_string(),
            fallback: Some(GeoPoint::new(48.8566, 2.3522)),
            dispatch_interval_ms: 25,
            max_concurrency: 16,
            max_retries: 3,
            timeout_secs: 30,
        }
    }
}

impl GeocoderConfig {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Default settings with the key taken from `GOOGLE_MAPS_API_KEY`.
    pub fn from_env() -> Option<Self> {
        std::env::var(API_KEY_ENV).ok().map(Self::with_api_key)
    }
}

/// Result of geocoding one row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodeOutcome {
    pub row: AddressRow,
    pub point: Option<GeoPoint>,
    pub error: Option<String>,
}

impl GeocodeOutcome {
    pub fn success(&self) -> bool {
        self.point.is_some()
    }
}

/// API response of the geocode endpoint
#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

/// Why a single attempt failed.
#[derive(Debug, PartialEq)]
enum AttemptError {
    /// Worth trying again after a backoff
    Retryable(String),
    /// The address will not resolve
    Fatal(String),
}

/// Turn a response body into a coordinate.
fn parse_geocode_response(bytes: &[u8]) -> std::result::Result<GeoPoint, AttemptError> {
    let data: GeocodeResponse = serde_json::from_slice(bytes)
        .map_err(|e| AttemptError::Fatal(format!("JSON parse error: {}", e)))?;

    match data.status.as_str() {
        "OK" => {
            let first = data
                .results
                .into_iter()
                .next()
                .ok_or_else(|| AttemptError::Fatal("OK status with no results".to_string()))?;
            let point = GeoPoint::new(first.geometry.location.lat, first.geometry.location.lng);
            if point.is_valid() {
                Ok(point)
            } else {
                Err(AttemptError::Fatal(format!(
                    "Out of range coordinate ({}, {})",
                    point.latitude, point.longitude
                )))
            }
        }
        "OVER_QUERY_LIMIT" => Err(AttemptError::Retryable("OVER_QUERY_LIMIT".to_string())),
        status => Err(AttemptError::Fatal(match data.error_message {
            Some(msg) => format!("Geocoding error: {} ({})", status, msg),
            None => format!("Geocoding error: {}", status),
        })),
    }
}

/// Dispatch rate limiter - spaces out when requests START,
/// one slot every `interval` regardless of how many are in flight.
struct DispatchRateLimiter {
    interval: Duration,
    next_dispatch: Mutex<Instant>,
    dispatched_count: AtomicU32,
    consecutive_limits: AtomicU32,
}

impl DispatchRateLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_dispatch: Mutex::new(Instant::now()),
            dispatched_count: AtomicU32::new(0),
            consecutive_limits: AtomicU32::new(0),
        }
    }

    /// Wait for our dispatch slot. Each caller gets a unique slot
    /// spaced `interval` apart.
    async fn wait_for_dispatch_slot(&self) -> u32 {
        let (wait_duration, dispatch_num) = {
            let mut next = self.next_dispatch.lock().await;
            let now = Instant::now();

            let dispatch_at = if *next > now { *next } else { now };

            // Reserve the next slot for the next caller
            *next = dispatch_at + self.interval;

            let num = self.dispatched_count.fetch_add(1, Ordering::Relaxed) + 1;
            (dispatch_at.saturating_duration_since(now), num)
        };

        // Wait outside the lock
        if wait_duration > Duration::from_millis(5) {
            debug!("[Dispatch #{}] Waiting {:?} for slot", dispatch_num, wait_duration);
            tokio::time::sleep(wait_duration).await;
        }

        dispatch_num
    }

    fn record_success(&self) {
        self.consecutive_limits.store(0, Ordering::Relaxed);
    }

    fn record_rate_limited(&self) -> Duration {
        let count = self.consecutive_limits.fetch_add(1, Ordering::Relaxed) + 1;
        // Exponential backoff: 1s, 2s, 4s max
        let backoff = Duration::from_millis(500 * (1 << count.min(3)));
        warn!(
            "[DispatchRateLimiter] Rate limited! Consecutive: {}, backing off {:?}",
            count, backoff
        );
        backoff
    }
}

/// Rate-limited address geocoder
pub struct Geocoder {
    client: Client,
    config: GeocoderConfig,
    rate_limiter: Arc<DispatchRateLimiter>,
}

impl Geocoder {
    pub fn new(config: GeocoderConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(config.max_concurrency as usize)
            .pool_idle_timeout(Duration::from_secs(60))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GeoError::Http(format!("Failed to create HTTP client: {}", e)))?;

        let rate_limiter = Arc::new(DispatchRateLimiter::new(Duration::from_millis(
            config.dispatch_interval_ms,
        )));

        Ok(Self {
            client,
            config,
            rate_limiter,
        })
    }

    pub fn config(&self) -> &GeocoderConfig {
        &self.config
    }

    /// Geocode every row concurrently. Output order matches `rows`.
    pub async fn geocode_rows(&self, rows: Vec<AddressRow>) -> Vec<GeocodeOutcome> {
        use futures::stream::{self, StreamExt};

        let total = rows.len();
        let start = Instant::now();

        info!(
            "[Geocoder] Geocoding {} addresses (dispatch interval: {}ms, max concurrent: {})",
            total, self.config.dispatch_interval_ms, self.config.max_concurrency
        );

        let outcomes: Vec<GeocodeOutcome> = stream::iter(rows)
            .map(|row| async move {
                self.rate_limiter.wait_for_dispatch_slot().await;
                match self.geocode(&row.address_label).await {
                    Ok(point) => GeocodeOutcome {
                        row,
                        point: Some(point),
                        error: None,
                    },
                    Err(e) => {
                        warn!("[Geocoder] Line {} \"{}\": {}", row.line, row.address_label, e);
                        GeocodeOutcome {
                            row,
                            point: None,
                            error: Some(e),
                        }
                    }
                }
            })
            // `buffered` (not `buffer_unordered`) keeps sheet order
            .buffered(self.config.max_concurrency.max(1) as usize)
            .collect()
            .await;

        let success_count = outcomes.iter().filter(|o| o.success()).count();
        info!(
            "[Geocoder] DONE: {}/{} resolved in {:.2}s",
            success_count,
            total,
            start.elapsed().as_secs_f64()
        );

        outcomes
    }

    /// Geocode one address, retrying on rate limits and transport errors.
    pub async fn geocode(&self, address: &str) -> std::result::Result<GeoPoint, String> {
        let mut retries = 0;

        loop {
            let wait = match self.attempt(address).await {
                Ok(point) => {
                    self.rate_limiter.record_success();
                    return Ok(point);
                }
                Err(AttemptError::Fatal(e)) => return Err(e),
                Err(AttemptError::Retryable(e)) => {
                    retries += 1;
                    if retries > self.config.max_retries {
                        return Err(format!("Max retries exceeded ({})", e));
                    }
                    let wait = self.rate_limiter.record_rate_limited();
                    warn!(
                        "[Geocode] {} for \"{}\", retry {} after {:?}",
                        e, address, retries, wait
                    );
                    wait
                }
            };
            tokio::time::sleep(wait).await;
        }
    }

    async fn attempt(&self, address: &str) -> std::result::Result<GeoPoint, AttemptError> {
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[("address", address), ("key", self.config.api_key.as_str())])
            .send()
            .await
            .map_err(|e| AttemptError::Retryable(format!("Request error: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AttemptError::Retryable("HTTP 429".to_string()));
        }
        if !status.is_success() {
            return Err(AttemptError::Fatal(format!("HTTP {}", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AttemptError::Retryable(format!("Body download error: {}", e)))?;

        parse_geocode_response(&bytes)
    }
}

/// Join outcomes into addressed points, in order.
///
/// Failed rows take the fallback coordinate when one is given and are
/// dropped otherwise.
pub fn resolve_outcomes(
    outcomes: Vec<GeocodeOutcome>,
    fallback: Option<GeoPoint>,
) -> Vec<AddressedPoint> {
    let mut dropped = 0usize;

    let points: Vec<AddressedPoint> = outcomes
        .into_iter()
        .filter_map(|o| match o.point.or(fallback) {
            Some(point) => Some(o.row.resolve(point)),
            None => {
                dropped += 1;
                None
            }
        })
        .collect();

    if dropped > 0 {
        warn!("[Geocoder] Dropped {} unresolved addresses", dropped);
    }

    points
}

/// Synchronous wrapper for FFI - runs the async code on a tokio runtime
#[cfg(feature = "ffi")]
pub fn geocode_rows_sync(
    config: GeocoderConfig,
    rows: Vec<AddressRow>,
) -> Result<Vec<AddressedPoint>> {
    use tokio::runtime::Builder;

    info!("[FFI] geocode_rows_sync called for {} rows", rows.len());

    let rt = Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .map_err(|e| GeoError::Http(format!("Runtime error: {}", e)))?;

    let fallback = config.fallback;
    let geocoder = Geocoder::new(config)?;
    let outcomes = rt.block_on(geocoder.geocode_rows(rows));

    Ok(resolve_outcomes(outcomes, fallback))
}
