//! HTTP backend client.

use super::traits::{BackendApi, EndpointResult};
use crate::config::EndpointConfig;
use crate::error::{EndpointErrorKind, GridError, Result};
use crate::model::{
    BackendBreakdown, BackendMetadata, BackendPatch, BackendQuery, Breakdown, Level, RowRef,
    SaveRequest,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Responses are wrapped in a `data` envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Serialize)]
struct SaveBody<'a> {
    row: &'a RowRef,
    #[serde(flatten)]
    request: &'a SaveRequest,
}

/// [`BackendApi`] talking to a grid backend over HTTP.
pub struct HttpBackend {
    client: Client,
    config: EndpointConfig,
    level: Level,
    entity_id: Option<u64>,
}

impl HttpBackend {
    /// Client for the grid at `level` (and entity, unless all accounts).
    pub fn new(config: &EndpointConfig, level: Level, entity_id: Option<u64>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| {
                GridError::config(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            config: config.clone(),
            level,
            entity_id,
        })
    }

    /// Expand a route template into a full URL.
    fn url(&self, template: &str, breakdown: &[Breakdown], row: Option<&str>) -> String {
        let id = self
            .entity_id
            .map_or_else(|| "all".to_string(), |id| id.to_string());
        let path = breakdown
            .iter()
            .map(Breakdown::name)
            .collect::<Vec<_>>()
            .join("/");
        let route = template
            .replace("{level}", self.level.name())
            .replace("{id}", &id)
            .replace("{breakdown}", &path)
            .replace("{row}", row.unwrap_or_default());
        format!("{}{}", self.config.base_url.trim_end_matches('/'), route)
    }

    /// Send with retries on network failures and server errors.
    async fn execute<T: DeserializeOwned>(
        &self,
        build: impl Fn() -> RequestBuilder,
        retries: u8,
        cancel: Option<&CancellationToken>,
    ) -> EndpointResult<T> {
        let mut last_error = None;

        for attempt in 0..=retries {
            if attempt > 0 {
                // Exponential backoff: 250ms, 500ms, 1s, ...
                let delay = Duration::from_millis(250 << (attempt - 1));
                tracing::debug!("Retry attempt {} after {:?}", attempt, delay);
                tokio::time::sleep(delay).await;
            }

            let outcome = match cancel {
                Some(cancel) => {
                    tokio::select! {
                        () = cancel.cancelled() => return Err(EndpointErrorKind::Aborted),
                        result = send_once::<T>(build()) => result,
                    }
                }
                None => send_once::<T>(build()).await,
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if is_retryable(&e) => {
                    tracing::debug!("Request attempt {} failed: {}", attempt + 1, e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| EndpointErrorKind::Network("no attempt made".into())))
    }
}

async fn send_once<T: DeserializeOwned>(request: RequestBuilder) -> EndpointResult<T> {
    let response = request
        .send()
        .await
        .map_err(|e| EndpointErrorKind::Network(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| EndpointErrorKind::InvalidResponse(e.to_string()))?;
        return Ok(envelope.data);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status.as_u16() {
        400 => EndpointErrorKind::Rejected(
            serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body)),
        ),
        404 => EndpointErrorKind::NotFound(body),
        code => EndpointErrorKind::Status {
            status: code,
            message: body,
        },
    })
}

const fn is_retryable(error: &EndpointErrorKind) -> bool {
    match error {
        EndpointErrorKind::Network(_) => true,
        EndpointErrorKind::Status { status, .. } => *status >= 500,
        _ => false,
    }
}

#[async_trait(?Send)]
impl BackendApi for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch_metadata(&self) -> EndpointResult<BackendMetadata> {
        let url = self.url(&self.config.routes.metadata, &[], None);
        self.execute(|| self.client.get(&url), self.config.max_retries, None)
            .await
    }

    async fn fetch_breakdowns(
        &self,
        query: &BackendQuery,
        cancel: &CancellationToken,
    ) -> EndpointResult<Vec<BackendBreakdown>> {
        let url = self.url(&self.config.routes.breakdown, &query.breakdown, None);
        tracing::debug!(
            "POST {} (offset {}, limit {}, {} parents)",
            url,
            query.offset,
            query.limit,
            query.parents.len()
        );
        self.execute(
            || self.client.post(&url).json(query),
            self.config.max_retries,
            Some(cancel),
        )
        .await
    }

    async fn save_stats(&self, row: &RowRef, request: &SaveRequest) -> EndpointResult<BackendPatch> {
        let url = self.url(&self.config.routes.save, &request.config.breakdown, None);
        let body = SaveBody { row, request };
        // Saves are not idempotent; never retried.
        self.execute(|| self.client.post(&url).json(&body), 0, None)
            .await
    }

    async fn edit_row(&self, row: &RowRef) -> EndpointResult<serde_json::Value> {
        let url = self.url(&self.config.routes.edit, &[], Some(&row.breakdown_id));
        self.execute(|| self.client.get(&url), self.config.max_retries, None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_expansion() {
        let config = EndpointConfig {
            base_url: "https://grid.example/".into(),
            ..EndpointConfig::default()
        };
        let backend = HttpBackend::new(&config, Level::Accounts, Some(3)).unwrap();
        assert_eq!(
            backend.url(
                &config.routes.breakdown,
                &[Breakdown::Campaign, Breakdown::Country],
                None
            ),
            "https://grid.example/api/grid/accounts/3/breakdown/campaign/country/"
        );

        let all = HttpBackend::new(&config, Level::AllAccounts, None).unwrap();
        assert_eq!(
            all.url(&config.routes.edit, &[], Some("1||2")),
            "https://grid.example/api/grid/all_accounts/all/edit/1||2/"
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(is_retryable(&EndpointErrorKind::Network("reset".into())));
        assert!(is_retryable(&EndpointErrorKind::Status {
            status: 503,
            message: String::new()
        }));
        assert!(!is_retryable(&EndpointErrorKind::Rejected(serde_json::Value::Null)));
    }
}
