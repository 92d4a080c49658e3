use tracing::Subscriber;
use tracing_subscriber::{fmt, prelude::*, registry::LookupSpan, EnvFilter};

/// Install the global subscriber: an `EnvFilter` read from `RUST_LOG` (defaulting to `info`)
/// and a compact formatter tagged with the service name.
pub fn setup_tracing<S>(subscriber: S, service_name: &str)
where
    S: Subscriber + for<'a> LookupSpan<'a> + Send + Sync,
{
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();

    let fmt_layer = fmt::layer().compact();

    subscriber.with(filter_layer).with(fmt_layer).init();

    tracing::debug!(service.name = service_name, "tracing initialised");
}
