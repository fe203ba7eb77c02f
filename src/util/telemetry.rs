//! Tracing subscriber setup.
//!
//! Always installs a `fmt` layer filtered by `RUST_LOG` (default `info`). With the
//! `telemetry` feature enabled and any `OTEL_EXPORTER_OTLP_*` variable set, spans
//! and metrics are additionally exported over OTLP.

use tower_http::trace::{HttpMakeClassifier, TraceLayer};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[cfg(feature = "telemetry")]
use opentelemetry::{KeyValue, global, trace::TracerProvider as _};
#[cfg(feature = "telemetry")]
use opentelemetry_sdk::{
    Resource,
    metrics::{MeterProviderBuilder, PeriodicReader, SdkMeterProvider},
    trace::{RandomIdGenerator, Sampler, SdkTracerProvider},
};
#[cfg(feature = "telemetry")]
use opentelemetry_semantic_conventions::{
    SCHEMA_URL,
    attribute::{DEPLOYMENT_ENVIRONMENT_NAME, SERVICE_VERSION},
};
#[cfg(feature = "telemetry")]
use std::env;

/// OTLP transport, from `OTEL_EXPORTER_OTLP_PROTOCOL`.
#[cfg(feature = "telemetry")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OtlpProtocol {
    Http,
    Grpc,
}

#[cfg(feature = "telemetry")]
impl OtlpProtocol {
    /// `None` unless OTLP export is configured in the environment.
    fn from_env() -> Option<Self> {
        let configured = ["ENDPOINT", "HEADERS", "PROTOCOL"]
            .iter()
            .any(|suffix| env::var(format!("OTEL_EXPORTER_OTLP_{suffix}")).is_ok());
        if !configured {
            return None;
        }
        match env::var("OTEL_EXPORTER_OTLP_PROTOCOL").as_deref() {
            Ok("grpc") => Some(OtlpProtocol::Grpc),
            _ => Some(OtlpProtocol::Http),
        }
    }
}

/// Builder and shutdown guard for the process-wide subscriber.
///
/// Keep the value alive for the lifetime of the process: dropping it flushes and
/// shuts down the OTLP exporters.
pub struct Telemetry {
    name: &'static str,
    version: &'static str,
    #[cfg(feature = "telemetry")]
    tracer_provider: Option<SdkTracerProvider>,
    #[cfg(feature = "telemetry")]
    meter_provider: Option<SdkMeterProvider>,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl Telemetry {
    pub fn new() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            #[cfg(feature = "telemetry")]
            tracer_provider: None,
            #[cfg(feature = "telemetry")]
            meter_provider: None,
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn with_version(mut self, version: &'static str) -> Self {
        self.version = version;
        self
    }

    /// Installs the global subscriber. Calling it twice in one process is a no-op
    /// for the second call.
    #[cfg_attr(not(feature = "telemetry"), allow(unused_mut))]
    pub fn register(mut self) -> Self {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        #[cfg(feature = "telemetry")]
        if let Some(protocol) = OtlpProtocol::from_env() {
            match self.otlp_providers(protocol) {
                Ok((tracer_provider, meter_provider)) => {
                    let tracer = tracer_provider.tracer(self.name);
                    let installed = tracing_subscriber::registry()
                        .with(filter)
                        .with(tracing_subscriber::fmt::layer())
                        .with(tracing_opentelemetry::MetricsLayer::new(
                            meter_provider.clone(),
                        ))
                        .with(tracing_opentelemetry::OpenTelemetryLayer::new(tracer))
                        .try_init()
                        .is_ok();
                    if installed {
                        tracing::info!(
                            "OpenTelemetry tracing and metrics exporter is enabled via {:?}",
                            protocol
                        );
                    }
                    self.tracer_provider = Some(tracer_provider);
                    self.meter_provider = Some(meter_provider);
                    return self;
                }
                Err(e) => eprintln!("Failed to build OTLP exporters, falling back to local logging: {e}"),
            }
        }

        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .is_ok();
        if installed {
            tracing::info!(service = self.name, version = self.version, "Logging initialized");
        }
        self
    }

    /// Request/response tracing for the HTTP router.
    pub fn http_tracing(&self) -> TraceLayer<HttpMakeClassifier> {
        TraceLayer::new_for_http()
    }

    #[cfg(feature = "telemetry")]
    fn resource(&self) -> Resource {
        let deployment_env = env::var("DEPLOYMENT_ENV").unwrap_or_else(|_| "develop".to_string());
        Resource::builder()
            .with_service_name(self.name)
            .with_schema_url(
                [
                    KeyValue::new(SERVICE_VERSION, self.version),
                    KeyValue::new(DEPLOYMENT_ENVIRONMENT_NAME, deployment_env),
                ],
                SCHEMA_URL,
            )
            .build()
    }

    #[cfg(feature = "telemetry")]
    fn otlp_providers(
        &self,
        protocol: OtlpProtocol,
    ) -> Result<(SdkTracerProvider, SdkMeterProvider), opentelemetry_otlp::ExporterBuildError> {
        let spans = opentelemetry_otlp::SpanExporter::builder();
        let spans = match protocol {
            OtlpProtocol::Http => spans.with_http().build()?,
            OtlpProtocol::Grpc => spans.with_tonic().build()?,
        };
        let tracer_provider = SdkTracerProvider::builder()
            .with_sampler(Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
                1.0,
            ))))
            .with_id_generator(RandomIdGenerator::default())
            .with_resource(self.resource())
            .with_batch_exporter(spans)
            .build();

        let metrics = opentelemetry_otlp::MetricExporter::builder();
        let metrics = match protocol {
            OtlpProtocol::Http => metrics.with_http().build()?,
            OtlpProtocol::Grpc => metrics.with_tonic().build()?,
        };
        let reader = PeriodicReader::builder(metrics)
            .with_interval(std::time::Duration::from_secs(30))
            .build();
        let meter_provider = MeterProviderBuilder::default()
            .with_resource(self.resource())
            .with_reader(reader)
            .build();
        global::set_meter_provider(meter_provider.clone());

        Ok((tracer_provider, meter_provider))
    }
}

#[cfg(feature = "telemetry")]
impl Drop for Telemetry {
    fn drop(&mut self) {
        if let Some(tracer_provider) = self.tracer_provider.take() {
            if let Err(err) = tracer_provider.shutdown() {
                eprintln!("{err:?}");
            }
        }
        if let Some(meter_provider) = self.meter_provider.take() {
            if let Err(err) = meter_provider.shutdown() {
                eprintln!("{err:?}");
            }
        }
    }
}
