//! Low-level HTTP client: `BinanceHttp`.
//!
//! One method per REST endpoint. Returns wire types; conversion happens in the
//! domain modules.

use crate::domain::ticker::wire::KlineRow;
use crate::error::HttpError;
use crate::http::retry::RetryPolicy;
use crate::shared::{Interval, Symbol};

use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Upper bound the exchange accepts for `limit` on `/api/v3/klines`.
pub const MAX_KLINE_LIMIT: usize = 1000;

/// Low-level HTTP client for the exchange's public REST API.
#[derive(Clone)]
pub struct BinanceHttp {
    base_url: String,
    client: Client,
}

impl BinanceHttp {
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(4)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            });

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ── Market data ──────────────────────────────────────────────────────

    /// `GET /api/v3/klines`: most recent `limit` candles, oldest first.
    pub async fn get_klines(
        &self,
        symbol: &Symbol,
        interval: Interval,
        limit: usize,
    ) -> Result<Vec<KlineRow>, HttpError> {
        let limit = limit.clamp(1, MAX_KLINE_LIMIT);
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url,
            symbol.as_str(),
            interval.as_str(),
            limit
        );
        self.get(&url, RetryPolicy::Idempotent).await
    }

    // ── Internal HTTP methods ────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, url: &str, retry: RetryPolicy) -> Result<T, HttpError> {
        self.request_with_retry(reqwest::Method::GET, url, retry).await
    }

    async fn request_with_retry<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        url: &str,
        retry: RetryPolicy,
    ) -> Result<T, HttpError> {
        let Some(config) = retry.config() else {
            return self.do_request(&method, url).await;
        };

        let mut last_error = None;

        for attempt in 0..=config.max_retries {
            match self.do_request::<T>(&method, url).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if config.is_retryable(&e) && attempt < config.max_retries {
                        let delay = config.delay_after(attempt, &e);
                        tracing::debug!(
                            attempt = attempt + 1,
                            max = config.max_retries,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Retrying request to {}",
                            url
                        );
                        futures_timer::Delay::new(delay).await;
                        last_error = Some(e);
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        Err(HttpError::MaxRetriesExceeded {
            attempts: config.max_retries + 1,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }

    async fn do_request<T: DeserializeOwned>(
        &self,
        method: &reqwest::Method,
        url: &str,
    ) -> Result<T, HttpError> {
        let resp = self.client.request(method.clone(), url).send().await?;
        let status = resp.status();

        if status.is_success() {
            let body = resp.text().await?;
            return serde_json::from_str::<T>(&body)
                .map_err(|e| HttpError::UnexpectedResponse(e.to_string()));
        }

        let status_code = status.as_u16();
        let retry_after_ms = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body_text = resp.text().await.unwrap_or_default();

        match status_code {
            // 418 is the exchange's escalation of repeated 429s (IP ban).
            429 | 418 => Err(HttpError::RateLimited { retry_after_ms }),
            400..=499 => Err(HttpError::BadRequest(body_text)),
            _ => Err(HttpError::ServerError {
                status: status_code,
                body: body_text,
            }),
        }
    }
}

/// `Retry-After` in whole seconds, as the exchange sends it.
fn parse_retry_after(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok().map(|secs| secs * 1000)
}
