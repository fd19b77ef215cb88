//! Log subscriber setup.

use std::sync::Once;

use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

use crate::config::ObservabilityConfig;

static INIT: Once = Once::new();

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `log_level` when set. `log_level` may be a bare
/// level or a full filter directive like `info,api_introspector=debug`.
pub fn init(config: &ObservabilityConfig) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("RUST_LOG")
            .or_else(|_| EnvFilter::try_new(&config.log_level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let fmt_layer = if config.json_logs {
            fmt::layer()
                .with_target(true)
                .json()
                .with_current_span(true)
                .boxed()
        } else {
            fmt::layer().with_target(true).boxed()
        };

        let subscriber = Registry::default().with(filter).with(fmt_layer);
        if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("tracing subscriber already installed: {e}");
        }
    });
}
