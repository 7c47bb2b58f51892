//! marginalia-core: Text anchoring and highlight overlays without a DOM.
//!
//! This crate provides:
//! - `DocumentTree` trait for the element/text tree abstraction
//! - `ArenaDocument` - in-memory implementation
//! - Offset mapping, quote location and highlight wrapping, all generic over `DocumentTree`
//! - `SelectionTracker`, `HoverController` and `AnnotationOverlayManager` state machines

pub mod affordance;
pub mod arena;
pub mod config;
pub mod debounce;
pub mod error;
pub mod highlight;
pub mod hover;
pub mod locate;
pub mod manager;
pub mod note;
pub mod offset_map;
pub mod region;
pub mod selection;
pub mod tree;

#[cfg(test)]
mod testing;

pub use affordance::{Position, Rect, place_above};
pub use arena::{ArenaDocument, MarkupError, NodeId};
pub use config::AnnotatorConfig;
pub use debounce::Debouncer;
pub use error::{AnchorError, TreeError};
pub use highlight::{Highlight, HighlightKind, MarkerStyle};
pub use hover::{HoverController, ViewAffordance};
pub use locate::{LiveRange, LocateMiss, find_occurrences, locate, locate_quote};
pub use manager::{AddOutcome, AnnotationOverlayManager, ContentSignal, ContextTarget, ShowSummary};
pub use note::{Note, NoteDraft, NoteId, Quote, RegionId, RegionParts};
pub use offset_map::{Bias, flattened_text, offset_of, point_at_offset, text_leaves};
pub use region::{enclosing_region, find_region, regions};
pub use selection::{
    PendingSelection, SelectionSnapshot, SelectionTracker, TrackerEffect, TrackerState,
};
pub use smol_str::SmolStr;
pub use tree::{DocumentTree, DomPoint, HostSnapshot, HostStateGuard, NodeKind};
pub use web_time::Instant;
