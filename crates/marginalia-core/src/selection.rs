//! Tracking user selections inside content regions.
//!
//! Every selection change hides the "add note" affordance straight away and
//! cancels whatever capture was waiting. A non-empty selection inside a
//! region is then debounced; only once the selection has been quiet for the
//! configured period is it turned into a [`PendingSelection`].
//!
//! ```text
//!            change (in region)          quiet period elapsed
//!   Idle ───────────────────▶ Debouncing ───────────────────▶ Pending
//!    ▲                             │                             │
//!    └──── change (empty/outside) ─┴─────────────────────────────┘
//! ```

use smol_str::SmolStr;
use web_time::Instant;

use crate::affordance::Rect;
use crate::config::AnnotatorConfig;
use crate::debounce::Debouncer;
use crate::error::AnchorError;
use crate::note::{NoteDraft, Quote};
use crate::offset_map::{flattened_text, offset_of};
use crate::region::enclosing_region;
use crate::tree::{DocumentTree, DomPoint, NodeKind};

/// What the host observed when the selection changed.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectionSnapshot<N> {
    /// Selected text, as the host stringifies it.
    pub text: String,
    pub start: DomPoint<N>,
    pub common_ancestor: N,
    /// Bounding box of the selection in viewport coordinates.
    pub bounds: Rect,
}

/// A captured quote waiting for the creation form.
///
/// Handed to the creation handler by [`SelectionTracker::take_pending`] and
/// owned by it until submission.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingSelection {
    pub quote: Quote,
    pub bounds: Rect,
    /// Where the "add note" affordance links to, when the region id is a
    /// composite key.
    pub add_url: Option<String>,
}

impl PendingSelection {
    /// Build the creation request from this selection and the user's text.
    pub fn into_draft(
        self,
        note_body: impl Into<String>,
        max_quote_len: usize,
    ) -> Result<NoteDraft, AnchorError> {
        NoteDraft::new(self.quote, note_body, max_quote_len)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Debouncing,
    Pending,
}

/// What the host should do after a selection change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackerEffect {
    /// Hide the affordance. Nothing is scheduled.
    Hide,
    /// Hide the affordance and call [`SelectionTracker::fire`] with this
    /// generation once the quiet period has passed.
    Debounce { generation: u64 },
}

pub struct SelectionTracker<N> {
    region_attribute: SmolStr,
    add_url_template: String,
    debouncer: Debouncer<SelectionSnapshot<N>>,
    pending: Option<PendingSelection>,
    captures: u64,
}

impl<N: Clone + PartialEq + std::fmt::Debug> SelectionTracker<N> {
    pub fn new(config: &AnnotatorConfig) -> Self {
        Self {
            region_attribute: config.region_attribute.clone(),
            add_url_template: config.add_note_url_template.clone(),
            debouncer: Debouncer::new(config.selection_quiet_period()),
            pending: None,
            captures: 0,
        }
    }

    pub fn state(&self) -> TrackerState {
        if self.debouncer.is_pending() {
            TrackerState::Debouncing
        } else if self.pending.is_some() {
            TrackerState::Pending
        } else {
            TrackerState::Idle
        }
    }

    /// Feed a selection change. `None` means the selection is now empty.
    pub fn on_selection_change<T: DocumentTree<Node = N> + ?Sized>(
        &mut self,
        tree: &T,
        selection: Option<SelectionSnapshot<N>>,
        now: Instant,
    ) -> TrackerEffect {
        self.debouncer.cancel();
        self.pending = None;

        let Some(selection) = selection.filter(|s| !s.text.is_empty()) else {
            return TrackerEffect::Hide;
        };
        if enclosing_region(tree, &selection.common_ancestor, &self.region_attribute).is_none() {
            tracing::trace!(target: "marginalia::selection", "selection outside any region");
            return TrackerEffect::Hide;
        }
        let generation = self.debouncer.schedule(selection, now);
        TrackerEffect::Debounce { generation }
    }

    /// Capture the debounced selection if its quiet period has elapsed.
    pub fn poll<T: DocumentTree<Node = N> + ?Sized>(
        &mut self,
        tree: &T,
        now: Instant,
    ) -> Option<PendingSelection> {
        let selection = self.debouncer.poll(now)?;
        self.capture(tree, selection)
    }

    /// Capture the debounced selection from a host timer callback.
    /// Superseded generations do nothing.
    pub fn fire<T: DocumentTree<Node = N> + ?Sized>(
        &mut self,
        tree: &T,
        generation: u64,
    ) -> Option<PendingSelection> {
        let selection = self.debouncer.fire(generation)?;
        self.capture(tree, selection)
    }

    fn capture<T: DocumentTree<Node = N> + ?Sized>(
        &mut self,
        tree: &T,
        selection: SelectionSnapshot<N>,
    ) -> Option<PendingSelection> {
        self.captures += 1;
        if !start_is_live(tree, &selection.start) {
            tracing::debug!(target: "marginalia::selection", "selection start went stale while debouncing");
            return None;
        }
        let (region, region_id) =
            enclosing_region(tree, &selection.common_ancestor, &self.region_attribute)?;
        let offset = offset_of(tree, &region, &selection.start)?;
        // The tree may have been rewrapped during the quiet period.
        let at_offset: String = flattened_text(tree, &region)
            .chars()
            .skip(offset)
            .take(selection.text.chars().count())
            .collect();
        if at_offset != selection.text {
            tracing::debug!(
                target: "marginalia::selection",
                offset,
                "selection text no longer at its offset, dropping capture"
            );
            return None;
        }
        let add_url = region_id.expand_template(&self.add_url_template);
        let quote = match Quote::new(selection.text, offset, region_id) {
            Ok(quote) => quote,
            Err(err) => {
                tracing::debug!(target: "marginalia::selection", %err, "selection not quotable");
                return None;
            }
        };
        tracing::debug!(
            target: "marginalia::selection",
            region = %quote.region_id,
            offset,
            "selection captured"
        );
        let pending = PendingSelection {
            quote,
            bounds: selection.bounds,
            add_url,
        };
        self.pending = Some(pending.clone());
        Some(pending)
    }

    pub fn pending(&self) -> Option<&PendingSelection> {
        self.pending.as_ref()
    }

    /// Hand the pending selection to the creation handler.
    pub fn take_pending(&mut self) -> Option<PendingSelection> {
        self.pending.take()
    }

    /// Drop any waiting capture and the pending selection.
    pub fn cancel(&mut self) {
        self.debouncer.cancel();
        self.pending = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Number of captures computed so far.
    pub fn captures(&self) -> u64 {
        self.captures
    }
}

/// Whether a point captured earlier still addresses a position in the tree.
fn start_is_live<T: DocumentTree + ?Sized>(tree: &T, point: &DomPoint<T::Node>) -> bool {
    if !tree.is_attached(&point.node) {
        return false;
    }
    match tree.kind(&point.node) {
        NodeKind::Text => point.offset <= tree.text_len(&point.node),
        NodeKind::Element | NodeKind::Other => point.offset <= tree.children(&point.node).len(),
    }
}
