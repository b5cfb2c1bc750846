//! Writer diagnostics bridge.
//!
//! The writer emits internal diagnostic messages as (component, message)
//! pairs. This bridge forwards them into `tracing` under a fixed target,
//! tagged with the index name, and only when trace-level logging is enabled
//! for that target. Closing the bridge is a no-op: the log sink has its own
//! lifecycle owned by the subscriber.

use tracing::Level;

use crate::EventContext;

/// Tracing target for writer diagnostics.
pub const WRITER_LOG_TARGET: &str = "quarry::writer";

/// Forwards writer diagnostics into the host's structured logging.
#[derive(Debug, Clone)]
pub struct DiagnosticsBridge {
    /// Index the diagnostics belong to.
    context: EventContext,
}

impl DiagnosticsBridge {
    /// Creates a bridge for one index.
    pub fn new(context: EventContext) -> Self {
        Self { context }
    }

    /// Whether messages would currently be emitted.
    pub fn enabled(&self) -> bool {
        tracing::enabled!(target: WRITER_LOG_TARGET, Level::TRACE)
    }

    /// Forwards one diagnostic message.
    pub fn message(&self, component: &str, message: &str) {
        if self.enabled() {
            tracing::trace!(
                target: WRITER_LOG_TARGET,
                index = self.context.index_name(),
                component,
                "{message}"
            );
        }
    }

    /// Closes the bridge. No-op: the subscriber owns the sink lifecycle.
    pub fn close(&self) {}
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn message_and_close_are_safe_without_a_subscriber() {
        let bridge = DiagnosticsBridge::new(EventContext::index("test"));
        bridge.message("merge", "considering 3 segments");
        bridge.close();
        bridge.message("commit", "after close, still a no-op sink");
    }
}
