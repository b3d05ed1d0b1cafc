//! Log output for the client, plus optional span export to an OTLP collector.
//!
//! Export only happens when `OTEL_EXPORTER_OTLP_ENDPOINT` is set. Exported spans
//! carry the locale and API base URL as resource attributes so traces from
//! clients pointed at different backends can be told apart. Tokens never end up
//! in span fields.

use crate::config::AppConfig;
use anyhow::{Context, Result, anyhow, bail};
use base64ct::{Base64, Encoding};
use opentelemetry::{KeyValue, global, trace::TracerProvider as _};
use opentelemetry_otlp::{Compression, SpanExporter, WithExportConfig, WithTonicConfig};
use opentelemetry_sdk::{Resource, propagation::TraceContextPropagator, trace::SdkTracerProvider};
use std::{env, time::Duration};
use tonic::{
    metadata::{
        AsciiMetadataKey, AsciiMetadataValue, BinaryMetadataKey, BinaryMetadataValue, MetadataMap,
    },
    transport::ClientTlsConfig,
};
use tracing::{Level, debug};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use ulid::Ulid;
use url::Url;

const ENDPOINT_VAR: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
const HEADERS_VAR: &str = "OTEL_EXPORTER_OTLP_HEADERS";
const INSTANCE_VAR: &str = "OTEL_SERVICE_INSTANCE_ID";

const EXPORT_TIMEOUT: Duration = Duration::from_secs(3);

/// Dependencies whose own logs drown out the client's at `debug` and above.
const QUIET_TARGETS: [&str; 5] = [
    "hyper=warn",
    "hyper_util=warn",
    "h2=warn",
    "reqwest=warn",
    "opentelemetry_sdk=warn",
];

/// Installed logging. Call [`Telemetry::shutdown`] before exit so buffered
/// spans reach the collector.
#[must_use]
pub struct Telemetry {
    provider: Option<SdkTracerProvider>,
}

impl Telemetry {
    #[must_use]
    pub const fn is_exporting(&self) -> bool {
        self.provider.is_some()
    }

    pub fn shutdown(self) {
        let Some(provider) = self.provider else {
            return;
        };
        if let Err(err) = provider.shutdown() {
            debug!("span exporter did not shut down cleanly: {err}");
        }
    }
}

/// OTLP collector settings read from the standard `OTEL_*` variables.
#[derive(Debug)]
struct Collector {
    endpoint: Url,
    metadata: MetadataMap,
}

impl Collector {
    fn from_env() -> Result<Option<Self>> {
        let Some(raw) = env::var(ENDPOINT_VAR)
            .ok()
            .filter(|value| !value.trim().is_empty())
        else {
            return Ok(None);
        };

        let endpoint = collector_url(&raw)?;
        let metadata = match env::var(HEADERS_VAR) {
            Ok(headers) => {
                collector_metadata(&headers).with_context(|| format!("invalid {HEADERS_VAR}"))?
            }
            Err(_) => MetadataMap::new(),
        };

        Ok(Some(Self { endpoint, metadata }))
    }

    fn exporter(self) -> Result<SpanExporter> {
        let mut builder = SpanExporter::builder()
            .with_tonic()
            .with_endpoint(self.endpoint.as_str().trim_end_matches('/'))
            .with_compression(Compression::Gzip)
            .with_timeout(EXPORT_TIMEOUT)
            .with_metadata(self.metadata);

        if self.endpoint.scheme() == "https"
            && let Some(host) = self.endpoint.host_str()
        {
            builder = builder.with_tls_config(
                ClientTlsConfig::new()
                    .domain_name(host)
                    .with_native_roots(),
            );
        }

        builder.build().context("failed to build OTLP span exporter")
    }
}

/// Bare `host:port` endpoints are taken to mean TLS.
fn collector_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };

    let url = Url::parse(&with_scheme).with_context(|| format!("invalid {ENDPOINT_VAR} '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("{ENDPOINT_VAR} must use http or https, got '{}'", url.scheme());
    }
    Ok(url)
}

/// Parses `key=value` pairs separated by commas into gRPC metadata. Keys ending
/// in `-bin` carry base64 values.
fn collector_metadata(raw: &str) -> Result<MetadataMap> {
    let mut metadata = MetadataMap::new();

    for pair in raw.split(',').map(str::trim).filter(|pair| !pair.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("header '{pair}' is missing '='"))?;
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        if key.ends_with("-bin") {
            let bytes = Base64::decode_vec(value)
                .map_err(|err| anyhow!("header '{key}' is not valid base64: {err}"))?;
            let key = BinaryMetadataKey::from_bytes(key.as_bytes())
                .with_context(|| format!("invalid header name '{key}'"))?;
            metadata.insert_bin(key, BinaryMetadataValue::from_bytes(&bytes));
        } else {
            let name = AsciiMetadataKey::from_bytes(key.as_bytes())
                .with_context(|| format!("invalid header name '{key}'"))?;
            let value = value
                .parse::<AsciiMetadataValue>()
                .with_context(|| format!("invalid value for header '{key}'"))?;
            metadata.insert(name, value);
        }
    }

    Ok(metadata)
}

fn resource(config: &AppConfig) -> Resource {
    let instance = env::var(INSTANCE_VAR).unwrap_or_else(|_| Ulid::new().to_string());

    Resource::builder_empty()
        .with_attributes([
            KeyValue::new("service.name", env!("CARGO_PKG_NAME")),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            KeyValue::new("service.instance.id", instance),
            KeyValue::new("lingo.api.base_url", config.api_base_url.to_string()),
            KeyValue::new("lingo.locale", config.locale.as_str()),
        ])
        .build()
}

/// Installs the global subscriber: compact logs on stderr filtered by `level`
/// (or `RUST_LOG`), and span export when a collector is configured.
///
/// # Errors
///
/// Returns an error if the collector settings are invalid or a subscriber is
/// already installed.
pub fn init(level: Option<Level>, config: &AppConfig) -> Result<Telemetry> {
    let mut filter = EnvFilter::builder()
        .with_default_directive(level.unwrap_or(Level::ERROR).into())
        .from_env_lossy();
    for directive in QUIET_TARGETS {
        filter = filter.add_directive(directive.parse()?);
    }

    let provider = match Collector::from_env()? {
        Some(collector) => Some(
            SdkTracerProvider::builder()
                .with_batch_exporter(collector.exporter()?)
                .with_resource(resource(config))
                .build(),
        ),
        None => None,
    };

    let export_layer = provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer(env!("CARGO_PKG_NAME")))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .with(export_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    if let Some(provider) = &provider {
        global::set_tracer_provider(provider.clone());
        global::set_text_map_propagator(TraceContextPropagator::new());
        debug!("exporting spans for {}", config.api_base_url);
    }

    Ok(Telemetry { provider })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::Locale;
    use std::path::PathBuf;

    #[test]
    fn collector_url_defaults_to_tls() {
        let url = collector_url("otel.lingo.dev:4317").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("otel.lingo.dev"));

        let url = collector_url(" http://localhost:4317 ").unwrap();
        assert_eq!(url.scheme(), "http");

        assert!(collector_url("ftp://otel.lingo.dev").is_err());
    }

    #[test]
    fn collector_metadata_reads_ascii_and_binary_headers() {
        // "lingo" in base64
        let metadata = collector_metadata(" x-api-key = k1 ,, trace-ctx-bin=bGluZ28=").unwrap();

        assert_eq!(
            metadata.get("x-api-key").map(|v| v.to_str().unwrap()),
            Some("k1")
        );
        assert_eq!(
            metadata
                .get_bin("trace-ctx-bin")
                .map(|v| v.to_bytes().unwrap().to_vec()),
            Some(b"lingo".to_vec())
        );
    }

    #[test]
    fn collector_metadata_rejects_malformed_pairs() {
        let err = collector_metadata("x-api-key").unwrap_err();
        assert!(err.to_string().contains("missing '='"));

        let err = collector_metadata("ctx-bin=not base64!").unwrap_err();
        assert!(err.to_string().contains("not valid base64"));
    }

    #[test]
    fn no_endpoint_means_no_export() {
        temp_env::with_vars([(ENDPOINT_VAR, None::<&str>)], || {
            assert!(Collector::from_env().unwrap().is_none());
        });
        temp_env::with_vars([(ENDPOINT_VAR, Some("  "))], || {
            assert!(Collector::from_env().unwrap().is_none());
        });
    }

    #[test]
    fn collector_from_env_reads_headers() {
        temp_env::with_vars(
            [
                (ENDPOINT_VAR, Some("https://otel.lingo.dev:4317")),
                (HEADERS_VAR, Some("authorization=Bearer t")),
            ],
            || {
                let collector = Collector::from_env().unwrap().unwrap();
                assert_eq!(collector.endpoint.port(), Some(4317));
                assert!(collector.metadata.contains_key("authorization"));
            },
        );
    }

    #[test]
    fn resource_describes_the_client() {
        let config = AppConfig::new(
            "https://api.lingo.dev",
            PathBuf::from("/tmp/lingo"),
            Locale::ZhCn,
            None,
        )
        .unwrap();

        temp_env::with_vars([(INSTANCE_VAR, Some("tab-1"))], || {
            let resource = resource(&config);
            let attribute = |name: &str| {
                resource
                    .iter()
                    .find(|(key, _)| key.as_str() == name)
                    .map(|(_, value)| value.as_str().into_owned())
            };

            assert_eq!(attribute("lingo.locale").as_deref(), Some("zh-CN"));
            assert_eq!(
                attribute("lingo.api.base_url").as_deref(),
                Some("https://api.lingo.dev/")
            );
            assert_eq!(attribute("service.instance.id").as_deref(), Some("tab-1"));
        });
    }

    #[test]
    fn shutdown_without_export_is_noop() {
        let telemetry = Telemetry { provider: None };
        assert!(!telemetry.is_exporting());
        telemetry.shutdown();
    }
}
