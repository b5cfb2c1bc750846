//! Context attached to configuration errors and diagnostics.

use std::fmt;

/// Names the index a failure or diagnostic message belongs to.
///
/// Configuration errors detected deep inside the writer or tenancy layers
/// carry one of these so the message is actionable without a stack trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventContext {
    /// Name of the index the event relates to.
    index: String,
}

impl EventContext {
    /// Creates a context naming an index.
    pub fn index(name: impl Into<String>) -> Self {
        Self { index: name.into() }
    }

    /// Returns the index name.
    pub fn index_name(&self) -> &str {
        &self.index
    }
}

impl fmt::Display for EventContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index '{}'", self.index)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn displays_index_name() {
        let context = EventContext::index("products");
        assert_eq!(context.to_string(), "index 'products'");
        assert_eq!(context.index_name(), "products");
    }
}
