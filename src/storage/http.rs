//! HTTP storage backends.
//!
//! - [`HttpPatternStore`] talks to a JSON document store: `GET` returns the
//!   whole `{domain: Pattern}` document and `PUT` replaces it. Requests carry
//!   the key in `X-Master-Key`.
//! - [`HttpAnalyticsSink`] talks to a PostgREST-style table: `POST` inserts a
//!   row and `GET ?created_at=gte.<iso>&domain=eq.<d>` filters rows. Requests
//!   carry the key in both `apikey` and `Authorization: Bearer`.
//!
//! Both use a blocking client with a bounded timeout and never retry.

use chrono::SecondsFormat;
use reqwest::blocking::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

use super::{AnalyticsSink, PatternStore};
use crate::models::{AnalyticsEvent, AnalyticsQuery, PatternSet};
use crate::{Error, Result};

const PATTERN_SERVICE: &str = "pattern store";
const ANALYTICS_SERVICE: &str = "analytics";

fn build_client(service: &str, timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(format!("PromptForge/{}", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .pool_max_idle_per_host(4)
        .build()
        .map_err(|e| Error::Configuration(format!("{service} HTTP client: {e}")))
}

fn check_status(service: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(Error::upstream(service, format!("HTTP {} response", status.as_u16())))
    }
}

/// Pattern store backed by a remote JSON document.
pub struct HttpPatternStore {
    client: Client,
    endpoint: String,
    api_key: Option<SecretString>,
}

impl HttpPatternStore {
    /// Creates a store for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(PATTERN_SERVICE, timeout)?,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    /// Returns the configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("X-Master-Key", key.expose_secret()),
            None => request,
        }
    }
}

impl PatternStore for HttpPatternStore {
    fn get_all(&self) -> Result<PatternSet> {
        let request = self
            .client
            .get(&self.endpoint)
            .header("X-Bin-Meta", "false");

        let response = self
            .authorize(request)
            .send()
            .map_err(|e| Error::upstream(PATTERN_SERVICE, e))?;

        check_status(PATTERN_SERVICE, response)?
            .json::<PatternSet>()
            .map_err(|e| Error::upstream(PATTERN_SERVICE, format!("malformed document: {e}")))
    }

    fn replace_all(&self, patterns: &PatternSet) -> Result<()> {
        let request = self.client.put(&self.endpoint).json(patterns);

        let response = self
            .authorize(request)
            .send()
            .map_err(|e| Error::upstream(PATTERN_SERVICE, e))?;

        check_status(PATTERN_SERVICE, response).map(|_| ())
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}

/// Analytics sink backed by a remote REST table.
pub struct HttpAnalyticsSink {
    client: Client,
    endpoint: String,
    api_key: Option<SecretString>,
}

impl HttpAnalyticsSink {
    /// Creates a sink for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(ANALYTICS_SERVICE, timeout)?,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request
                .header("apikey", key.expose_secret())
                .header("Authorization", format!("Bearer {}", key.expose_secret())),
            None => request,
        }
    }

    /// Builds the row filter for a query.
    fn query_params(query: &AnalyticsQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![(
            "created_at",
            format!("gte.{}", query.from.to_rfc3339_opts(SecondsFormat::Millis, true)),
        )];
        if let Some(domain) = &query.domain {
            params.push(("domain", format!("eq.{domain}")));
        }
        params
    }
}

impl AnalyticsSink for HttpAnalyticsSink {
    fn record(&self, event: &AnalyticsEvent) -> Result<()> {
        let request = self
            .client
            .post(&self.endpoint)
            .header("Prefer", "return=minimal")
            .json(event);

        let response = self
            .authorize(request)
            .send()
            .map_err(|e| Error::upstream(ANALYTICS_SERVICE, e))?;

        check_status(ANALYTICS_SERVICE, response).map(|_| ())
    }

    fn query(&self, query: &AnalyticsQuery) -> Result<Vec<AnalyticsEvent>> {
        let request = self
            .client
            .get(&self.endpoint)
            .query(&Self::query_params(query));

        let response = self
            .authorize(request)
            .send()
            .map_err(|e| Error::upstream(ANALYTICS_SERVICE, e))?;

        check_status(ANALYTICS_SERVICE, response)?
            .json::<Vec<AnalyticsEvent>>()
            .map_err(|e| Error::upstream(ANALYTICS_SERVICE, format!("malformed rows: {e}")))
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    // Nothing listens on port 1; connections are refused immediately.
    const DEAD_ENDPOINT: &str = "http://127.0.0.1:1/patterns";

    #[test]
    fn test_query_params() {
        let from = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let params = HttpAnalyticsSink::query_params(&AnalyticsQuery {
            from,
            domain: Some("tax_accounting".to_string()),
        });
        assert_eq!(
            params,
            vec![
                ("created_at", "gte.2024-01-02T03:04:05.000Z".to_string()),
                ("domain", "eq.tax_accounting".to_string()),
            ]
        );

        let params = HttpAnalyticsSink::query_params(&AnalyticsQuery { from, domain: None });
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_unreachable_store_is_upstream_error() {
        let store = HttpPatternStore::new(
            DEAD_ENDPOINT,
            Some(SecretString::from("key".to_string())),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(store.endpoint(), DEAD_ENDPOINT);
        let err = store.get_all().unwrap_err();
        assert!(matches!(err, Error::UpstreamUnavailable { ref service, .. } if service == PATTERN_SERVICE));
    }

    #[test]
    fn test_client_keeps_timeout() {
        assert!(build_client(PATTERN_SERVICE, Duration::from_millis(250)).is_ok());
    }

    #[test]
    fn test_unreachable_sink_is_upstream_error() {
        let sink = HttpAnalyticsSink::new(DEAD_ENDPOINT, None, Duration::from_secs(1)).unwrap();
        let err = sink.record(&AnalyticsEvent::new("general", 0.5)).unwrap_err();
        assert!(matches!(err, Error::UpstreamUnavailable { .. }));
    }
}
