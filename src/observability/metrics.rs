//! Prometheus metrics.
//!
//! Without a listener port no recorder is installed and the `metrics`
//! macros used across the crate are no-ops.

use crate::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::thread;

/// Metrics configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Address of the scrape listener; `None` disables metrics export.
    pub listen_addr: Option<SocketAddr>,
}

impl MetricsConfig {
    /// Exposes metrics on all interfaces at `port`.
    #[must_use]
    pub const fn from_port(port: Option<u16>) -> Self {
        match port {
            Some(port) => Self {
                listen_addr: Some(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port)),
            },
            None => Self { listen_addr: None },
        }
    }

    /// Returns true if a listener will be started.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.listen_addr.is_some()
    }
}

/// Handle to the installed recorder.
#[derive(Debug, Clone)]
pub struct MetricsHandle {
    prometheus: PrometheusHandle,
}

impl MetricsHandle {
    /// Renders the current metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.prometheus.render()
    }
}

/// Installs the Prometheus recorder and HTTP listener.
pub fn install_prometheus(config: &MetricsConfig) -> Result<Option<MetricsHandle>> {
    let Some(addr) = config.listen_addr else {
        return Ok(None);
    };

    let builder = PrometheusBuilder::new().with_http_listener(addr);
    let prometheus = install_listener(builder)?;
    tracing::info!(%addr, "Prometheus metrics listener started");

    Ok(Some(MetricsHandle { prometheus }))
}

/// Installs the exporter on the current runtime, or on a dedicated
/// single-threaded runtime when called outside one.
fn install_listener(builder: PrometheusBuilder) -> Result<PrometheusHandle> {
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        return install_with_runtime(builder, &handle);
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::OperationFailed {
            operation: "metrics_runtime_init".to_string(),
            cause: e.to_string(),
        })?;
    let handle = runtime.handle().clone();
    let prometheus = install_with_runtime(builder, &handle)?;
    thread::Builder::new()
        .name("metrics-exporter-prometheus-http".to_string())
        .spawn(move || runtime.block_on(async { std::future::pending::<()>().await }))
        .map_err(|e| Error::OperationFailed {
            operation: "metrics_runtime_thread".to_string(),
            cause: e.to_string(),
        })?;
    Ok(prometheus)
}

fn install_with_runtime(
    builder: PrometheusBuilder,
    runtime_handle: &tokio::runtime::Handle,
) -> Result<PrometheusHandle> {
    let (recorder, exporter) = {
        let _guard = runtime_handle.enter();
        builder.build().map_err(|e| Error::OperationFailed {
            operation: "metrics_exporter_build".to_string(),
            cause: e.to_string(),
        })?
    };
    let handle = recorder.handle();
    set_global_recorder(recorder)?;
    runtime_handle.spawn(exporter);
    Ok(handle)
}

fn set_global_recorder(recorder: PrometheusRecorder) -> Result<()> {
    metrics::set_global_recorder(recorder).map_err(|e| Error::OperationFailed {
        operation: "metrics_recorder_install".to_string(),
        cause: e.to_string(),
    })
}
