//! The long-lived watch loop.
//!
//! ```text
//! Connecting ──ok──▶ Connected ──▶ Receiving ⇄ emit
//!     ▲                                │ error / remote close
//!     └──── retry delay ◀── Disconnected
//!
//! cancel (any suspension point) ──▶ Stopped
//! ```
//!
//! [`Watcher::run`] is a supervisor: each pass runs one connection session to
//! completion, and any failure is reported and retried after a fixed delay.
//! It never gives up on its own; only the cancellation token ends it.

use std::time::Duration;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::WatchError;
use crate::event::RequestEvent;
use crate::feed::Feed;
use crate::render::Renderer;
use crate::session::CatcherEndpoint;
use crate::sink::{Output, SinkSet};

/// Delay between a connection failure and the next attempt.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);

pub const CONNECTED_LINE: &str = "Connected. Waiting for requests...";
pub const INTERRUPTED_LINE: &str = "Interrupted, exiting.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub retry_delay: Duration,
    pub renderer: Renderer,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            retry_delay: DEFAULT_RETRY_DELAY,
            renderer: Renderer::default(),
        }
    }
}

/// Counters reported when the watcher stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSummary {
    /// Messages decoded and rendered.
    pub events: u64,
    /// Messages shown as `[raw]` because they did not decode.
    pub raw_messages: u64,
    pub connection_attempts: u64,
    /// Sessions that ended in a connection error or remote close.
    pub failures: u64,
}

/// How one connection session ended.
enum SessionEnd {
    Cancelled,
    Failed(WatchError),
}

pub struct Watcher<F: Feed> {
    feed: F,
    sinks: SinkSet,
    options: WatchOptions,
    summary: WatchSummary,
}

impl<F: Feed> Watcher<F> {
    pub fn new(feed: F, sinks: SinkSet, options: WatchOptions) -> Self {
        Self {
            feed,
            sinks,
            options,
            summary: WatchSummary::default(),
        }
    }

    /// Emit the public URL and the feed being subscribed to.
    pub fn announce(&mut self, endpoint: &CatcherEndpoint) {
        let listening = format!("Listening on {}", endpoint.public_url());
        let connecting = format!(
            "Connecting to {} for live requests...",
            self.feed.endpoint()
        );
        self.sinks.emit(&Output::Status(&listening));
        self.sinks.emit(&Output::Status(&connecting));
    }

    /// Watch until `cancel` fires, then close every sink and return counters.
    pub async fn run(mut self, cancel: CancellationToken) -> WatchSummary {
        loop {
            let err = match self.session(&cancel).await {
                SessionEnd::Cancelled => break,
                SessionEnd::Failed(err) => err,
            };
            self.summary.failures += 1;
            self.report_failure(&err);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.options.retry_delay) => {}
            }
        }

        self.stop();
        self.summary
    }

    /// Connect once and pump messages until the connection fails or `cancel`
    /// fires.
    async fn session(&mut self, cancel: &CancellationToken) -> SessionEnd {
        self.summary.connection_attempts += 1;
        info!(
            url = %self.feed.endpoint(),
            attempt = self.summary.connection_attempts,
            "connecting to feed"
        );

        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => return SessionEnd::Cancelled,
            res = self.feed.connect() => res,
        };
        let mut messages = match connected {
            Ok(stream) => stream,
            Err(e) => return SessionEnd::Failed(e),
        };

        info!(url = %self.feed.endpoint(), "feed connected");
        self.sinks.emit(&Output::Status(CONNECTED_LINE));

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return SessionEnd::Cancelled,
                next = messages.next() => next,
            };
            match next {
                Some(Ok(text)) => self.handle_message(&text),
                Some(Err(e)) => return SessionEnd::Failed(e),
                None => return SessionEnd::Failed(WatchError::Closed),
            }
        }
    }

    fn handle_message(&mut self, text: &str) {
        match RequestEvent::from_json(text) {
            Ok(event) => {
                self.summary.events += 1;
                debug!(method = %event.method, path = %event.path, "request received");
                let block = self.options.renderer.render(&event);
                self.sinks.emit(&Output::Request(&block));
            }
            Err(e) => {
                self.summary.raw_messages += 1;
                debug!(error = %e, len = text.len(), "feed message did not decode");
                self.sinks.emit(&Output::Raw(text));
            }
        }
    }

    fn report_failure(&mut self, err: &WatchError) {
        warn!(
            error = %err,
            unreachable = err.is_unreachable(),
            retry_in = ?self.options.retry_delay,
            "feed connection lost"
        );
        let error_line = format!("Connection error: {err}");
        let retry_line = format!(
            "Reconnecting in {}...",
            describe_delay(self.options.retry_delay)
        );
        self.sinks.emit(&Output::Diagnostic(&error_line));
        self.sinks.emit(&Output::Diagnostic(&retry_line));
    }

    fn stop(&mut self) {
        self.sinks.emit(&Output::Status(INTERRUPTED_LINE));
        self.sinks.close();
        info!(
            events = self.summary.events,
            raw = self.summary.raw_messages,
            attempts = self.summary.connection_attempts,
            failures = self.summary.failures,
            "watcher stopped"
        );
    }
}

/// "3 seconds", "1 second", "250ms".
fn describe_delay(delay: Duration) -> String {
    if delay.subsec_nanos() != 0 {
        return format!("{}ms", delay.as_millis());
    }
    match delay.as_secs() {
        1 => "1 second".to_string(),
        n => format!("{n} seconds"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_delay() {
        assert_eq!(describe_delay(Duration::from_secs(3)), "3 seconds");
        assert_eq!(describe_delay(Duration::from_secs(1)), "1 second");
        assert_eq!(describe_delay(Duration::from_millis(250)), "250ms");
        assert_eq!(describe_delay(Duration::from_millis(1500)), "1500ms");
    }

    #[test]
    fn test_default_options() {
        let opts = WatchOptions::default();
        assert_eq!(opts.retry_delay, Duration::from_secs(3));
        assert_eq!(opts.renderer, Renderer::default());
    }
}
