//! Catcher Watch - live transcript of requests hitting a request-catcher subdomain
//!
//! The catching service pushes one JSON notification per inbound HTTP request
//! over a websocket scoped to a subdomain. This crate keeps that subscription
//! alive forever, renders every notification as a readable text block, and
//! fans it out to the console and/or an append-only log file.
//!
//! # Example
//!
//! ```no_run
//! use catcher_watch::{
//!     CatcherEndpoint, ConsoleSink, SessionId, SinkSet, WatchOptions, Watcher, WebSocketFeed,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let endpoint = CatcherEndpoint::new(SessionId::generate(8), "requestcatcher.com");
//!
//!     let mut sinks = SinkSet::new();
//!     sinks.push(ConsoleSink::stdio(None));
//!
//!     let feed = WebSocketFeed::new(endpoint.feed_url());
//!     let mut watcher = Watcher::new(feed, sinks, WatchOptions::default());
//!     watcher.announce(&endpoint);
//!
//!     let cancel = CancellationToken::new();
//!     let summary = watcher.run(cancel).await;
//!     println!("rendered {} requests", summary.events);
//! }
//! ```

pub mod config;
mod error;
pub mod event;
pub mod feed;
pub mod render;
pub mod session;
pub mod sink;
pub mod watcher;

pub use config::WatchConfig;
pub use error::{DecodeError, WatchError};
pub use event::{HeaderValue, RequestEvent};
pub use feed::{Feed, WebSocketFeed};
pub use render::{Highlighter, Renderer};
pub use session::{CatcherEndpoint, SessionId};
pub use sink::{ConsoleSink, LogSink, Output, Sink, SinkOptions, SinkSet};
pub use watcher::{WatchOptions, WatchSummary, Watcher};
