use std::collections::HashMap;

use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{trace, Resource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use tracing_tree::HierarchicalLayer;

/// Initialize Sentry when a DSN is configured.
///
/// The returned guard flushes pending events on drop, so keep it alive for the
/// lifetime of the process.
pub fn setup_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok()?;

    let traces_sample_rate = std::env::var("SENTRY_TRACES_SAMPLE_RATE")
        .ok()
        .and_then(|rate| rate.parse().ok())
        .unwrap_or(0.0);

    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            traces_sample_rate,
            ..Default::default()
        },
    )))
}

/// Install color-eyre and the global tracing subscriber.
///
/// Human readable output goes through `tracing-tree`. Spans are also exported over OTLP
/// when `HONEYCOMB_API_KEY` is set.
pub fn setup_tracing(service_name: &str) -> color_eyre::Result<()> {
    color_eyre::install()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let tree_layer = HierarchicalLayer::new(2)
        .with_targets(true)
        .with_bracketed_fields(true);

    let otel_layer = match std::env::var("HONEYCOMB_API_KEY") {
        Ok(api_key) => {
            let mut headers = HashMap::<String, String>::new();
            headers.insert("x-honeycomb-team".to_string(), api_key);

            let tracer = opentelemetry_otlp::new_pipeline()
                .tracing()
                .with_exporter(
                    opentelemetry_otlp::new_exporter()
                        .http()
                        .with_endpoint("https://api.honeycomb.io/v1/traces")
                        .with_headers(headers),
                )
                .with_trace_config(trace::config().with_resource(Resource::new(vec![
                    KeyValue::new("service.name", service_name.to_string()),
                ])))
                .install_batch(opentelemetry_sdk::runtime::Tokio)?;

            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        Err(_) => None,
    };

    tracing_subscriber::registry()
        .with(tree_layer.with_filter(env_filter))
        .with(otel_layer)
        .try_init()?;

    Ok(())
}
