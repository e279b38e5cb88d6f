use serde_json::{Map, Value};
use std::fmt;

/// Structured context attached to a captured event.
pub type EventContext = Map<String, Value>;

/// Sink for failures that must leave a paper trail without interrupting the
/// user. Implementations must not block and must not panic.
pub trait EventSink: Send + Sync {
    /// Record a message with one named context block.
    fn capture_message(&self, message: &str, context_name: &str, context: EventContext);

    /// Record an error value.
    fn capture_exception(&self, error: &dyn fmt::Display);

    /// Attach a named context to every subsequent event.
    fn set_context(&self, name: &str, context: EventContext);
}

/// Builds an [`EventContext`] from `key => value` pairs.
#[macro_export]
macro_rules! event_context {
    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut context = $crate::events::EventContext::new();
        $(
            context.insert(
                $key.to_string(),
                ::serde_json::to_value(&$value).unwrap_or(::serde_json::Value::Null),
            );
        )*
        context
    }};
}

/// Default sink writing events to the process log.
#[derive(Debug, Default)]
pub struct LogEventSink {
    contexts: std::sync::Mutex<EventContext>,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn scope(&self) -> String {
        match self.contexts.lock() {
            Ok(contexts) => Value::Object(contexts.clone()).to_string(),
            Err(_) => "{}".to_string(),
        }
    }
}

impl EventSink for LogEventSink {
    fn capture_message(&self, message: &str, context_name: &str, context: EventContext) {
        log::error!(
            "{message} | {context_name}: {} | scope: {}",
            Value::Object(context),
            self.scope()
        );
    }

    fn capture_exception(&self, error: &dyn fmt::Display) {
        log::warn!("Captured exception: {error} | scope: {}", self.scope());
    }

    fn set_context(&self, name: &str, context: EventContext) {
        if let Ok(mut contexts) = self.contexts.lock() {
            contexts.insert(name.to_string(), Value::Object(context));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_context_macro() {
        let missing: Option<u64> = None;
        let context = event_context! {
            "key" => "o-abc-123-456",
            "campaignId" => 42u64,
            "cmaId" => missing,
        };

        assert_eq!(context["key"], "o-abc-123-456");
        assert_eq!(context["campaignId"], 42);
        assert_eq!(context["cmaId"], Value::Null);
    }

    #[test]
    fn test_log_sink_keeps_latest_context() {
        let sink = LogEventSink::new();
        sink.set_context("api_fallback", event_context! { "fallback" => false });
        sink.set_context("api_fallback", event_context! { "fallback" => true });

        assert_eq!(sink.scope(), r#"{"api_fallback":{"fallback":true}}"#);

        sink.capture_message("message", "ctx", EventContext::new());
        sink.capture_exception(&"boom");
    }
}
