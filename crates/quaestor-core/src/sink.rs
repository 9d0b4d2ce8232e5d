//! Fire-and-forget log sinks for training progress.
//!
//! A sink never fails the caller: delivery problems are reported through
//! `tracing` and dropped.

use crate::config::SinkConfig;
use crate::domain::{QuaestorError, Result};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

pub trait LogSink: Send + Sync {
    fn log(&self, message: &str);
}

impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn log(&self, message: &str) {
        (**self).log(message)
    }
}

impl<S: LogSink + ?Sized> LogSink for Box<S> {
    fn log(&self, message: &str) {
        (**self).log(message)
    }
}

/// Writes messages as info events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, message: &str) {
        info!(target: "quaestor::sink", "{}", message);
    }
}

/// Collects messages in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    messages: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        match self.messages.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl LogSink for MemorySink {
    fn log(&self, message: &str) {
        match self.messages.lock() {
            Ok(mut guard) => guard.push(message.to_string()),
            Err(poisoned) => poisoned.into_inner().push(message.to_string()),
        }
    }
}

/// Posts messages to a chat webhook (`{"username", "content"}` payload).
pub struct WebhookSink {
    client: reqwest::blocking::Client,
    url: String,
    username: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, username: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QuaestorError::Sink(format!("failed to build webhook client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
            username: username.into(),
        })
    }

    fn send(&self, message: &str) -> std::result::Result<(), reqwest::Error> {
        let payload = serde_json::json!({
            "username": self.username,
            "content": message,
        });
        self.client
            .post(&self.url)
            .json(&payload)
            .send()?
            .error_for_status()?;
        Ok(())
    }
}

impl LogSink for WebhookSink {
    fn log(&self, message: &str) {
        if let Err(e) = self.send(message) {
            warn!("Webhook log message failed to send: {}", e);
        }
    }
}

/// Forwards every message to each inner sink in order.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn LogSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl LogSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl LogSink for FanoutSink {
    fn log(&self, message: &str) {
        for sink in &self.sinks {
            sink.log(message);
        }
    }
}

/// Tracing always, plus the webhook when one is configured.
pub fn build_sink(config: &SinkConfig) -> Result<FanoutSink> {
    let mut sink = FanoutSink::new().with(TracingSink);
    if let Some(url) = config.webhook_url.as_deref().filter(|u| !u.trim().is_empty()) {
        let webhook = WebhookSink::new(
            url,
            config.bot_name.clone(),
            Duration::from_secs(config.timeout_seconds.max(1)),
        )?;
        sink = sink.with(webhook);
    }
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_collects_in_order() {
        let sink = MemorySink::new();
        sink.log("first");
        sink.log("second");
        assert_eq!(sink.messages(), vec!["first", "second"]);
    }

    #[test]
    fn test_fanout_reaches_every_sink() {
        let a = MemorySink::new();
        let b = MemorySink::new();
        let fanout = FanoutSink::new().with(a.clone()).with(b.clone());
        fanout.log("hello");
        assert_eq!(a.messages(), vec!["hello"]);
        assert_eq!(b.messages(), vec!["hello"]);
    }

    #[test]
    fn test_build_sink_without_webhook() {
        let sink = build_sink(&SinkConfig::default()).unwrap();
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_build_sink_with_webhook() {
        let config = SinkConfig {
            webhook_url: Some("http://127.0.0.1:9/hook".to_string()),
            ..SinkConfig::default()
        };
        let sink = build_sink(&config).unwrap();
        assert_eq!(sink.len(), 2);
    }

    #[test]
    fn test_webhook_failure_is_swallowed() {
        // Port 9 (discard) is closed on test hosts; the send fails and must not panic.
        let sink = WebhookSink::new("http://127.0.0.1:9/hook", "test", Duration::from_millis(200)).unwrap();
        sink.log("unreachable");
    }
}
