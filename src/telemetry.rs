use std::time::Instant;

use opentelemetry::{KeyValue, trace::TracerProvider as _};
use opentelemetry_otlp::{Protocol, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{
    Resource,
    trace::{RandomIdGenerator, Sampler, SdkTracerProvider},
};
use opentelemetry_semantic_conventions::{
    SCHEMA_URL,
    attribute::{SERVICE_NAME, SERVICE_VERSION},
    resource::DEPLOYMENT_ENVIRONMENT_NAME,
};
use rocket::{
    Data, Request, Response,
    fairing::{Fairing, Info, Kind},
};
use tonic::metadata::{MetadataKey, MetadataMap, MetadataValue};
use tracing::{Span, info_span};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_API_KEY_HEADER: &str = "x-honeycomb-team";

/// Span export settings, read from `TELEMETRY_*` variables.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub api_key_header: String,
    /// Fraction of traces kept; `None` keeps all of them.
    pub sample_ratio: Option<f64>,
    pub environment: String,
}

impl TelemetrySettings {
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    /// Returns `None` when no endpoint is configured, which disables export.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let endpoint = lookup("TELEMETRY_OTLP_ENDPOINT").filter(|e| !e.trim().is_empty())?;

        let sample_ratio = lookup("TELEMETRY_SAMPLE_RATIO")
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|ratio| (0.0..=1.0).contains(ratio));

        Some(Self {
            endpoint,
            api_key: lookup("TELEMETRY_API_KEY").filter(|k| !k.is_empty()),
            api_key_header: lookup("TELEMETRY_API_KEY_HEADER")
                .unwrap_or_else(|| DEFAULT_API_KEY_HEADER.to_string()),
            sample_ratio,
            environment: lookup("ROCKET_PROFILE").unwrap_or_else(|| "development".to_string()),
        })
    }

    fn sampler(&self) -> Sampler {
        match self.sample_ratio {
            Some(ratio) => Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(ratio))),
            None => Sampler::AlwaysOn,
        }
    }

    fn metadata(&self) -> Result<MetadataMap, Box<dyn std::error::Error>> {
        let mut metadata = MetadataMap::new();
        if let Some(api_key) = &self.api_key {
            let key = MetadataKey::from_bytes(self.api_key_header.as_bytes())?;
            metadata.insert(key, MetadataValue::try_from(api_key.as_str())?);
        }
        Ok(metadata)
    }

    fn resource(&self) -> Resource {
        Resource::builder()
            .with_schema_url(
                [
                    KeyValue::new(SERVICE_NAME, env!("CARGO_PKG_NAME")),
                    KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
                    KeyValue::new(DEPLOYMENT_ENVIRONMENT_NAME, self.environment.clone()),
                ],
                SCHEMA_URL,
            )
            .build()
    }

    fn tracer_provider(&self) -> Result<SdkTracerProvider, Box<dyn std::error::Error>> {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(self.endpoint.as_str())
            .with_tls_config(tonic::transport::ClientTlsConfig::new().with_native_roots())
            .with_protocol(Protocol::Grpc)
            .with_metadata(self.metadata()?)
            .build()?;

        Ok(SdkTracerProvider::builder()
            .with_sampler(self.sampler())
            .with_id_generator(RandomIdGenerator::default())
            .with_resource(self.resource())
            .with_batch_exporter(exporter)
            .build())
    }
}

/// Flushes exported spans when dropped at the end of `main`.
pub struct OtelGuard {
    tracer_provider: SdkTracerProvider,
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        if let Err(err) = self.tracer_provider.shutdown() {
            eprintln!("Failed to shut down tracer provider: {:?}", err);
        }
    }
}

pub fn init_tracing() -> Option<OtelGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // The subscriber is not installed yet, so exporter failures go to stderr.
    let tracer_provider = TelemetrySettings::from_env().and_then(|settings| {
        settings
            .tracer_provider()
            .inspect_err(|e| eprintln!("Span export disabled: {}", e))
            .ok()
    });

    let otel_layer = tracer_provider
        .as_ref()
        .map(|provider| OpenTelemetryLayer::new(provider.tracer(env!("CARGO_PKG_NAME"))));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(otel_layer)
        .init();

    tracer_provider.map(|tracer_provider| OtelGuard { tracer_provider })
}

struct RequestTiming {
    span: Span,
    started: Instant,
}

/// Opens one `http_request` span per request and closes it with the matched
/// route, status and latency.
pub struct TelemetryFairing;

#[rocket::async_trait]
impl Fairing for TelemetryFairing {
    fn info(&self) -> Info {
        Info {
            name: "Request tracing",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        let method = request.method().as_str();
        let path = request.uri().path().to_string();

        let span = info_span!(
            "http_request",
            otel.name = format!("{} {}", method, path),
            http.method = method,
            http.path = %path,
            http.route = tracing::field::Empty,
            http.status_code = tracing::field::Empty,
            http.duration_ms = tracing::field::Empty,
        );

        request.local_cache(|| RequestTiming {
            span,
            started: Instant::now(),
        });
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let timing = request.local_cache(|| RequestTiming {
            span: info_span!("http_request"),
            started: Instant::now(),
        });

        let elapsed_ms = timing.started.elapsed().as_millis() as i64;
        let status = response.status().code;

        if let Some(route) = request.route() {
            timing.span.record("http.route", tracing::field::display(&route.uri));
        }
        timing.span.record("http.status_code", status);
        timing.span.record("http.duration_ms", elapsed_ms);

        let _entered = timing.span.enter();
        if status >= 500 {
            tracing::warn!(status, elapsed_ms, "Request failed");
        } else {
            tracing::info!(status, elapsed_ms, "Request completed");
        }
    }
}
