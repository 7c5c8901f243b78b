//! # Client Reader
//!
//! Viewer-side consumer of the bridge's event stream.
//!
//! Responsibilities:
//! - Connect to the SSE endpoint and decode each `data:` payload as JSON
//! - Hand every message to registered handlers, in order
//! - Reconnect after errors with bounded, jittered exponential backoff
//!
//! ## Usage Example
//!
//! ```ignore
//! use client_reader::{ClientReader, HttpEventSource, ViewerState};
//!
//! let source = HttpEventSource::new(&config.url)?;
//! let reader = Arc::new(ClientReader::new(source, config));
//! let state = ViewerState::new();
//! reader.add_handler(|msg| println!("{msg:?}"));
//! let handle = reader.clone().start();
//! ```

mod error;
mod message;
mod mock;
mod reader;
mod source;
mod state;

pub use error::{ReaderError, Result};
pub use message::ViewerMessage;
pub use mock::{data_event, ScriptedConnection, ScriptedEventSource};
pub use reader::{ClientReader, Handler, ReaderHandle};
pub use source::{decode_events, HttpEventSource};
pub use state::{ViewerSnapshot, ViewerState};
