//! Tracing setup for the CLI
//!
//! The subscriber is installed before configuration is loaded so that
//! loading is logged too. Once the `payara.debug` setting is known the
//! filter can be raised to `debug` through [`Logging::enable_debug`].

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

/// Handle to the installed filter
pub struct Logging {
    handle: reload::Handle<EnvFilter, Registry>,
    /// `RUST_LOG` was set and takes precedence over settings
    from_env: bool,
}

impl Logging {
    /// Switch to debug output unless `RUST_LOG` chose the filter
    pub fn enable_debug(&self) -> anyhow::Result<()> {
        if !self.from_env {
            self.handle.reload(EnvFilter::new("debug"))?;
        }
        Ok(())
    }
}

/// Build the subscriber writing to `writer`
pub fn subscriber<W>(
    verbose: bool,
    env_filter: Option<EnvFilter>,
    writer: W,
) -> (impl Subscriber + Send + Sync + 'static, Logging)
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let from_env = env_filter.is_some();
    let level = if verbose { "debug" } else { "info" };
    let filter = env_filter.unwrap_or_else(|| EnvFilter::new(level));
    let (filter, handle) = reload::Layer::new(filter);

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(writer));

    (subscriber, Logging { handle, from_env })
}

/// Install the global subscriber, honouring `RUST_LOG`
pub fn init(verbose: bool) -> anyhow::Result<Logging> {
    let (subscriber, logging) = subscriber(
        verbose,
        EnvFilter::try_from_default_env().ok(),
        std::io::stdout,
    );
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(logging)
}
