pub use tracing::Level;

/// Destination for reporter log lines.
///
/// The reporter never writes to a hidden global: whoever constructs a
/// [`Reporter`](crate::report::reporter::Reporter) chooses the sink, and the
/// default forwards to the `tracing` facade the rest of the process already
/// subscribes to.  Tests inject a capturing sink instead.
pub trait LogSink: Send + Sync {
    fn emit(&self, level: Level, message: &str);
}

/// Default sink: forwards each line to `tracing` at the requested level.
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, level: Level, message: &str) {
        if level == Level::ERROR {
            tracing::error!("{message}");
        } else if level == Level::WARN {
            tracing::warn!("{message}");
        } else if level == Level::INFO {
            tracing::info!("{message}");
        } else if level == Level::DEBUG {
            tracing::debug!("{message}");
        } else {
            tracing::trace!("{message}");
        }
    }
}
