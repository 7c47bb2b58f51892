//! Error types for the anchoring engine.
//!
//! A locate miss is deliberately absent from this module: text that can no
//! longer be found is an expected outcome, modelled as
//! [`LocateMiss`](crate::locate::LocateMiss), not as an error.

use miette::Diagnostic;
use smol_str::SmolStr;

/// Errors raised by [`DocumentTree`](crate::tree::DocumentTree) mutations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Diagnostic)]
#[non_exhaustive]
pub enum TreeError {
    /// The node is no longer reachable from the document root.
    #[error("node is detached from the document")]
    #[diagnostic(code(marginalia::tree::detached))]
    Detached,

    /// A text operation was attempted on a non-text node.
    #[error("expected a text node")]
    #[diagnostic(code(marginalia::tree::not_text))]
    NotText,

    /// A structural operation was attempted on a node that cannot have children.
    #[error("expected an element node")]
    #[diagnostic(code(marginalia::tree::not_element))]
    NotElement,

    /// A char offset points past the end of a text node.
    #[error("offset {offset} is out of bounds for text of length {len}")]
    #[diagnostic(code(marginalia::tree::offset))]
    OffsetOutOfBounds { offset: usize, len: usize },

    /// A reference node is not a child of the given parent.
    #[error("reference node is not a child of the given parent")]
    #[diagnostic(code(marginalia::tree::not_a_child))]
    NotAChild,

    /// Text nodes to be joined are not adjacent siblings.
    #[error("text nodes are not adjacent siblings")]
    #[diagnostic(code(marginalia::tree::not_adjacent))]
    NotAdjacent,

    /// Failure reported by the host platform (e.g. a DOM exception).
    #[error("platform error: {0}")]
    #[diagnostic(code(marginalia::tree::platform))]
    Platform(String),
}

/// Main error type for anchoring operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Diagnostic)]
#[non_exhaustive]
pub enum AnchorError {
    /// The quote is missing required fields and cannot be anchored.
    #[error("cannot anchor this note: {reason}")]
    #[diagnostic(
        code(marginalia::invalid_quote),
        help("notes need non-empty quote text and a region id")
    )]
    InvalidQuote { reason: SmolStr },

    /// The range was detached (or its text changed) between locate and
    /// apply. Re-locate and retry.
    #[error("range is no longer attached to the document")]
    #[diagnostic(code(marginalia::stale_range))]
    StaleRange,

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    #[diagnostic(code(marginalia::config))]
    Config(String),

    /// Underlying tree mutation failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Tree(#[from] TreeError),
}

impl AnchorError {
    pub fn invalid_quote(reason: &str) -> Self {
        AnchorError::InvalidQuote {
            reason: SmolStr::new(reason),
        }
    }
}
