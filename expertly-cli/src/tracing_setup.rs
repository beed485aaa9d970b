//! Console logging for every command, plus span export when `--otel` is
//! given and the binary was built with the `telemetry` feature.
//!
//! `RUST_LOG` overrides the built-in filter (`info,sqlx=warn`, or
//! `debug,sqlx=info,hyper=info` under `--debug`). The exporter reads
//! `OTEL_EXPORTER_OTLP_ENDPOINT` (default `http://localhost:4317`) and
//! `OTEL_SERVICE_NAME` (default `expertly`).

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Logging switches taken from the global CLI flags
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Debug-level default filter and module targets in output
    pub debug: bool,
    pub otel: bool,
}

/// Default directives when RUST_LOG is unset
fn default_directives(debug: bool) -> &'static str {
    if debug {
        "debug,sqlx=info,hyper=info"
    } else {
        "info,sqlx=warn"
    }
}

/// RUST_LOG wins over `--debug` when set.
fn env_filter(config: &TracingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config.debug)))
}

/// Console output only.
pub fn init_tracing(config: &TracingConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_target(config.debug)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}

/// Where spans go and what they are labelled with.
#[cfg(feature = "telemetry")]
struct OtlpTarget {
    endpoint: String,
    service: String,
}

#[cfg(feature = "telemetry")]
impl OtlpTarget {
    fn from_env() -> Self {
        let var = |key: &str, fallback: &str| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| fallback.to_owned())
        };
        Self {
            endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT", "http://localhost:4317"),
            service: var("OTEL_SERVICE_NAME", "expertly"),
        }
    }

    /// Build a batch-exporting provider, install it globally and hand back
    /// a tracer from it. [`shutdown_otel`] flushes the installed provider.
    fn install_tracer(&self) -> Result<opentelemetry_sdk::trace::Tracer> {
        use anyhow::Context;
        use opentelemetry::trace::TracerProvider as _;
        use opentelemetry::KeyValue;
        use opentelemetry_otlp::WithExportConfig;
        use opentelemetry_sdk::{runtime, trace::TracerProvider, Resource};

        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&self.endpoint)
            .build()
            .with_context(|| format!("OTLP exporter for {}", self.endpoint))?;
        let provider = TracerProvider::builder()
            .with_batch_exporter(exporter, runtime::Tokio)
            .with_resource(Resource::new([KeyValue::new("service.name", self.service.clone())]))
            .build();
        let tracer = provider.tracer("expertly");
        let _ = opentelemetry::global::set_tracer_provider(provider);
        Ok(tracer)
    }
}

/// Console output plus an OTLP span layer.
#[cfg(feature = "telemetry")]
pub fn init_tracing_with_otel(config: &TracingConfig) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let target = OtlpTarget::from_env();
    let tracer = target.install_tracer()?;
    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(tracing_subscriber::fmt::layer().with_target(config.debug).compact())
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .try_init()
        .map_err(|err| anyhow!(err))?;

    tracing::info!(endpoint = %target.endpoint, service = %target.service, "exporting spans over OTLP");
    Ok(())
}

/// Flush spans still buffered in the global provider.
#[cfg(feature = "telemetry")]
pub fn shutdown_otel() {
    opentelemetry::global::shutdown_tracer_provider();
}

#[cfg(not(feature = "telemetry"))]
pub fn shutdown_otel() {}

/// Install the subscriber `config` asks for.
pub fn init(config: &TracingConfig) -> Result<()> {
    #[cfg(feature = "telemetry")]
    if config.otel {
        return init_tracing_with_otel(config);
    }

    init_tracing(config)?;
    if config.otel {
        tracing::warn!("--otel ignored: built without the telemetry feature");
    }
    Ok(())
}
