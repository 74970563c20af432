//! Tracing setup: console logging, optional OpenTelemetry export, and the
//! spans the gate records its decisions on.

use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    runtime,
    trace::{self, RandomIdGenerator, Sampler},
    Resource,
};
use std::time::Duration;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,usergate=debug";

/// Default OTLP collector endpoint
pub const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";

/// Telemetry settings read from the standard OTEL environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySettings {
    /// Export traces over OTLP
    pub enabled: bool,
    /// Collector endpoint
    pub endpoint: String,
    /// Fraction of traces to sample
    pub sample_rate: f64,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: DEFAULT_OTLP_ENDPOINT.to_string(),
            sample_rate: 1.0,
        }
    }
}

impl TelemetrySettings {
    /// Read `OTEL_ENABLED`, `OTEL_EXPORTER_OTLP_ENDPOINT` and
    /// `OTEL_TRACES_SAMPLER_ARG` from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`TelemetrySettings::from_env`] with an explicit lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            enabled: lookup("OTEL_ENABLED")
                .and_then(|v| v.parse::<bool>().ok())
                .unwrap_or(defaults.enabled),
            endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").unwrap_or(defaults.endpoint),
            sample_rate: lookup("OTEL_TRACES_SAMPLER_ARG")
                .and_then(|s| s.parse::<f64>().ok())
                .unwrap_or(defaults.sample_rate),
        }
    }
}

/// Map a sample rate onto a sampler
pub fn sampler_for(sample_rate: f64) -> Sampler {
    if sample_rate >= 1.0 {
        Sampler::AlwaysOn
    } else if sample_rate <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(sample_rate)
    }
}

/// Initialize OpenTelemetry with an OTLP exporter
pub fn init_telemetry(
    service_name: &str,
    settings: &TelemetrySettings,
) -> anyhow::Result<opentelemetry_sdk::trace::Tracer> {
    let resource = Resource::new(vec![
        KeyValue::new("service.name", service_name.to_string()),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
    ]);

    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(settings.endpoint.clone())
        .with_timeout(Duration::from_secs(3));

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(
            trace::config()
                .with_sampler(sampler_for(settings.sample_rate))
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(resource),
        )
        .install_batch(runtime::Tokio)?;

    Ok(tracer)
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize console logging plus OpenTelemetry export
pub fn init_tracing_stack(service_name: &str, settings: &TelemetrySettings) -> anyhow::Result<()> {
    let tracer = init_telemetry(service_name, settings)?;

    let otel_layer = OpenTelemetryLayer::new(tracer);
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_thread_ids(true)
        .with_thread_names(true);

    Registry::default()
        .with(env_filter())
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()?;

    Ok(())
}

/// Initialize console logging only
pub fn init_console() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install subscriber: {}", e))
}

/// Shutdown OpenTelemetry provider
pub fn shutdown_telemetry() {
    opentelemetry::global::shutdown_tracer_provider();
}

/// Span covering the gate check for one request
pub fn gate_span(method: &str, path: &str) -> tracing::Span {
    tracing::info_span!(
        "bearer_gate",
        http.method = %method,
        http.path = %path,
        otel.kind = "server",
        gate.outcome = tracing::field::Empty,
        otel.status_code = tracing::field::Empty,
    )
}

/// Record the gate decision on a span
pub fn record_gate_outcome(span: &tracing::Span, outcome: &str, allowed: bool) {
    span.record("gate.outcome", outcome);
    span.record("otel.status_code", if allowed { "OK" } else { "ERROR" });
}
