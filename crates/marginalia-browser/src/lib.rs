//! Browser DOM layer for marginalia note anchoring.
//!
//! This crate implements `DocumentTree` over live `web_sys` nodes and exposes
//! the overlay to JavaScript. It assumes a `wasm32-unknown-unknown` target
//! environment.
//!
//! # Architecture
//!
//! - `dom`: `BrowserDocument`, UTF-16 offset conversion and host state
//! - `annotator`: the `Annotator` JS class, event listeners and timers
//! - `logging`: panic hook and `tracing` console output
//!
//! # Re-exports
//!
//! This crate re-exports `marginalia-core` for convenience, so consumers
//! only need to depend on `marginalia-browser`.

pub use marginalia_core;
pub use marginalia_core::*;

pub mod annotator;
pub mod dom;
pub mod error;
pub mod logging;

pub use annotator::JsAnnotator;
pub use dom::{BrowserDocument, char_to_utf16_offset, utf16_to_char_offset};
pub use error::BrowserError;
