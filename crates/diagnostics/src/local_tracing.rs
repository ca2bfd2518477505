use std::{str::FromStr, sync::atomic::AtomicBool};

use tracing::Level;
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter, Layer};

static IS_TRACING_ENABLED: AtomicBool = AtomicBool::new(false);

/// Enable a `tracing` subscriber driven by the `TRACE` environment variable.
///
/// `TRACE=debug` enables a default level across the `pacm_*` crates; anything
/// else is parsed as a full `tracing-subscriber` `EnvFilter` directive string.
pub fn enable_tracing_by_env() {
    let Ok(trace_var) = std::env::var("TRACE") else {
        return;
    };

    if !IS_TRACING_ENABLED.swap(true, std::sync::atomic::Ordering::SeqCst) {
        use tracing_subscriber::{fmt, prelude::*};
        let layer = common_layer(&trace_var);

        tracing_subscriber::registry()
            .with(layer)
            .with(fmt::layer().pretty().with_file(true).with_span_events(FmtSpan::CLOSE))
            .init();
        tracing::trace!("enable_tracing_by_env");
    }
}

fn common_layer(trace_var: &str) -> Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync> {
    if let Ok(default_level) = Level::from_str(trace_var) {
        tracing_subscriber::filter::Targets::new()
            .with_targets([
                ("pacm_registry", default_level),
                ("pacm_cache", default_level),
                ("pacm_resolver", default_level),
                ("pacm_package_manager", default_level),
            ])
            .boxed()
    } else {
        // SAFETY: if we can't parse the directive, the tracing result would be
        // unexpected anyway, so panicking here is reasonable.
        EnvFilter::builder()
            .with_regex(true)
            .parse(trace_var)
            .expect("parse tracing directive syntax, see tracing-subscriber EnvFilter docs")
            .boxed()
    }
}
