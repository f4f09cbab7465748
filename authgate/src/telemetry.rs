//! Tracing setup: console logging plus optional OpenTelemetry export.
//!
//! Console output is always on and filtered by `RUST_LOG` (default `info`). Setting
//! `enable_otel_export: true` in the config adds an OTLP/HTTP span exporter configured from the
//! standard environment variables:
//!
//! - `OTEL_SERVICE_NAME` (default `authgate`)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT` (default `http://localhost:4318`)
//! - `OTEL_EXPORTER_OTLP_PROTOCOL`: `http/protobuf` (default) or `http/json`
//! - `OTEL_EXPORTER_OTLP_HEADERS`: comma-separated `key=value` pairs, `%20` decodes to a space
//!
//! If the exporter cannot be built the gateway still starts, logging to the console only.

use opentelemetry::{KeyValue, trace::TracerProvider as _};
use opentelemetry_otlp::{Protocol, WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::trace::{SdkTracerProvider, Tracer};
use std::{collections::HashMap, sync::OnceLock};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_SERVICE_NAME: &str = "authgate";
const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4318";

/// Kept so spans still buffered in the batch exporter can be flushed on shutdown;
/// `tracing-opentelemetry` only holds the tracer.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Exporter settings read from the `OTEL_*` environment variables
#[derive(Debug, Clone, PartialEq)]
struct OtlpSettings {
    service_name: String,
    endpoint: String,
    protocol: Protocol,
    headers: HashMap<String, String>,
}

impl OtlpSettings {
    fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let protocol = match lookup("OTEL_EXPORTER_OTLP_PROTOCOL").as_deref() {
            Some("http/json") => Protocol::HttpJson,
            _ => Protocol::HttpBinary,
        };

        Self {
            service_name: lookup("OTEL_SERVICE_NAME").unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
            endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").unwrap_or_else(|| DEFAULT_OTLP_ENDPOINT.to_string()),
            protocol,
            headers: lookup("OTEL_EXPORTER_OTLP_HEADERS")
                .map(|raw| parse_headers(&raw))
                .unwrap_or_default(),
        }
    }
}

/// Parse `key=value,key2=value2`; pairs without `=` are skipped
fn parse_headers(raw: &str) -> HashMap<String, String> {
    raw.replace("%20", " ")
        .split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

/// Install the global tracing subscriber.
pub fn init_telemetry(enable_otel_export: bool) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (tracer, otel_status) = if enable_otel_export {
        match create_otlp_tracer(OtlpSettings::from_env()) {
            Ok(tracer) => (Some(tracer), "enabled".to_string()),
            Err(e) => (None, format!("unavailable: {e}")),
        }
    } else {
        (None, "disabled".to_string())
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer)))
        .try_init()?;

    info!("Telemetry initialized (OTLP export {})", otel_status);
    Ok(())
}

fn create_otlp_tracer(settings: OtlpSettings) -> anyhow::Result<Tracer> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(&settings.endpoint)
        .with_protocol(settings.protocol)
        .with_headers(settings.headers)
        .build()?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(
            opentelemetry_sdk::Resource::builder()
                .with_attribute(KeyValue::new("service.name", settings.service_name.clone()))
                .build(),
        )
        .build();

    let tracer = provider.tracer(settings.service_name);
    let _ = TRACER_PROVIDER.set(provider);
    Ok(tracer)
}

/// Flush pending spans. Call once before the process exits.
pub fn shutdown_telemetry() {
    if let Some(provider) = TRACER_PROVIDER.get()
        && let Err(e) = provider.shutdown()
    {
        tracing::error!("Failed to shutdown tracer provider: {}", e);
    }
}
