//! Errors raised by the browser layer.
//!
//! Everything crossing the `wasm_bindgen` boundary is converted into a
//! `JsError` by `?`, which works for any `std::error::Error`.

use marginalia_core::{AnchorError, TreeError};
use wasm_bindgen::JsValue;

#[derive(thiserror::Error, Debug)]
pub enum BrowserError {
    #[error("no global window")]
    NoWindow,

    #[error("no document on window")]
    NoDocument,

    #[error("document has no body")]
    NoBody,

    /// A DOM call threw.
    #[error("DOM error: {0}")]
    Dom(String),

    /// A value from JavaScript did not have the expected shape.
    #[error("invalid value from JavaScript: {0}")]
    Deserialize(String),

    #[error(transparent)]
    Anchor(#[from] AnchorError),
}

impl BrowserError {
    pub fn dom(err: JsValue) -> Self {
        BrowserError::Dom(describe(&err))
    }
}

impl From<serde_wasm_bindgen::Error> for BrowserError {
    fn from(err: serde_wasm_bindgen::Error) -> Self {
        BrowserError::Deserialize(err.to_string())
    }
}

/// Map a thrown DOM exception into the tree error the core understands.
pub(crate) fn tree_err(err: JsValue) -> TreeError {
    TreeError::Platform(describe(&err))
}

fn describe(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}
