//! The set of live highlights for the current page.
//!
//! The manager owns the last known note set and one [`Highlight`] per
//! displayed note. Reconciliation always works from that set, never from
//! deltas layered on whatever happens to be in the tree, so replaying a
//! full reload any number of times gives the same result.

use std::collections::{HashMap, HashSet};

use crate::config::AnnotatorConfig;
use crate::error::AnchorError;
use crate::highlight::{self, Highlight, HighlightKind, MarkerStyle};
use crate::locate::{LocateMiss, locate_quote};
use crate::note::{Note, NoteId, Quote};
use crate::tree::DocumentTree;

/// Result of showing a single note.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Highlighted,
    /// The quote could not be anchored. The note stays known but unshown.
    NotFound(LocateMiss),
    AlreadyShown,
}

/// Tally of a bulk reconciliation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShowSummary {
    pub highlighted: usize,
    pub already_shown: usize,
    pub not_found: usize,
    /// Notes whose quote fields were missing or empty.
    pub invalid: usize,
}

/// Content-replacement signal from external editing tooling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentSignal {
    /// An inline editor took over the content.
    EditingActivated,
    /// The editor was closed without saving.
    EditingDeactivated,
    /// The editor saved and the content was re-rendered.
    EditingCommitted,
}

/// What a contextual highlight should focus.
#[derive(Clone, Debug, PartialEq)]
pub enum ContextTarget {
    /// An already displayed note.
    Note(NoteId),
    /// A quote that has no note yet, e.g. while the creation form is open.
    Quote(Quote),
}

#[derive(Debug)]
enum ContextHighlight<N> {
    Existing(NoteId),
    Preview(Highlight<N>),
}

pub struct AnnotationOverlayManager<N> {
    config: AnnotatorConfig,
    persisted: MarkerStyle,
    preview: MarkerStyle,
    notes: Vec<Note>,
    highlights: HashMap<NoteId, Highlight<N>>,
    removed: HashSet<NoteId>,
    context: Option<ContextHighlight<N>>,
    suspended: bool,
}

impl<N: Clone + PartialEq + std::fmt::Debug> AnnotationOverlayManager<N> {
    pub fn new(config: AnnotatorConfig) -> Self {
        Self {
            persisted: MarkerStyle::persisted(&config),
            preview: MarkerStyle::preview(&config),
            config,
            notes: Vec::new(),
            highlights: HashMap::new(),
            removed: HashSet::new(),
            context: None,
            suspended: false,
        }
    }

    pub fn config(&self) -> &AnnotatorConfig {
        &self.config
    }

    /// Last known note set.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn highlight(&self, id: &NoteId) -> Option<&Highlight<N>> {
        self.highlights.get(id)
    }

    /// Ids of displayed notes, sorted.
    pub fn shown(&self) -> Vec<NoteId> {
        let mut ids: Vec<_> = self.highlights.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of displayed notes.
    pub fn len(&self) -> usize {
        self.highlights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.highlights.is_empty()
    }

    /// Whether an inline editor currently owns the content.
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Replace the last known note set and show every note in it.
    ///
    /// Highlights of notes missing from the new set are removed. Notes that
    /// cannot be anchored are skipped. While editing is active the set is
    /// only recorded. Removal tombstones are kept only for ids the new set
    /// still carries.
    pub fn show_all<T: DocumentTree<Node = N> + ?Sized>(
        &mut self,
        tree: &mut T,
        notes: Vec<Note>,
    ) -> ShowSummary {
        let incoming: HashSet<&NoteId> = notes.iter().map(|n| &n.id).collect();
        self.removed.retain(|id| incoming.contains(id));

        self.notes = notes
            .into_iter()
            .filter(|n| !self.removed.contains(&n.id))
            .collect();

        let kept: HashSet<&NoteId> = self.notes.iter().map(|n| &n.id).collect();
        let gone: Vec<NoteId> = self
            .highlights
            .keys()
            .filter(|id| !kept.contains(id))
            .cloned()
            .collect();
        for id in gone {
            if let Err(err) = self.unshow(tree, &id) {
                tracing::warn!(target: "marginalia::overlay", note = %id, %err, "failed to remove stale highlight");
            }
        }
        self.show_known(tree)
    }

    fn show_known<T: DocumentTree<Node = N> + ?Sized>(&mut self, tree: &mut T) -> ShowSummary {
        let mut summary = ShowSummary::default();
        if self.suspended {
            tracing::debug!(
                target: "marginalia::overlay",
                notes = self.notes.len(),
                "editing active, deferring highlights"
            );
            return summary;
        }

        let notes = std::mem::take(&mut self.notes);
        for note in &notes {
            let quote = match note.quote() {
                Ok(quote) => quote,
                Err(err) => {
                    tracing::warn!(target: "marginalia::overlay", note = %note.id, %err, "skipping note");
                    summary.invalid += 1;
                    continue;
                }
            };
            match self.show_note(tree, &note.id, &quote) {
                Ok(AddOutcome::Highlighted) => summary.highlighted += 1,
                Ok(AddOutcome::AlreadyShown) => summary.already_shown += 1,
                Ok(AddOutcome::NotFound(_)) => summary.not_found += 1,
                Err(err) => {
                    tracing::warn!(target: "marginalia::overlay", note = %note.id, %err, "failed to highlight note");
                    summary.not_found += 1;
                }
            }
        }
        self.notes = notes;

        tracing::debug!(
            target: "marginalia::overlay",
            highlighted = summary.highlighted,
            already_shown = summary.already_shown,
            not_found = summary.not_found,
            invalid = summary.invalid,
            "notes shown"
        );
        summary
    }

    /// Show a note confirmed by the persistence service.
    ///
    /// Malformed quotes are rejected before anything changes.
    pub fn add<T: DocumentTree<Node = N> + ?Sized>(
        &mut self,
        tree: &mut T,
        note: Note,
    ) -> Result<AddOutcome, AnchorError> {
        let quote = note.quote()?;
        self.clear_context(tree)?;
        self.removed.remove(&note.id);

        let id = note.id.clone();
        match self.notes.iter_mut().find(|n| n.id == id) {
            Some(existing) => *existing = note,
            None => self.notes.push(note),
        }
        if self.suspended {
            return Ok(AddOutcome::NotFound(LocateMiss::Detached));
        }
        self.show_note(tree, &id, &quote)
    }

    fn show_note<T: DocumentTree<Node = N> + ?Sized>(
        &mut self,
        tree: &mut T,
        id: &NoteId,
        quote: &Quote,
    ) -> Result<AddOutcome, AnchorError> {
        if let Some(existing) = self.highlights.get(id) {
            if existing.is_attached(&*tree) {
                return Ok(AddOutcome::AlreadyShown);
            }
            // The content under this highlight was replaced without a signal.
            self.highlights.remove(id);
        }

        let root = tree.root();
        let range = match locate_quote(&*tree, &root, &self.config.region_attribute, quote) {
            Ok(range) => range,
            Err(miss) => {
                tracing::debug!(target: "marginalia::overlay", note = %id, ?miss, "note not anchored");
                return Ok(AddOutcome::NotFound(miss));
            }
        };
        match highlight::apply(
            tree,
            &range,
            HighlightKind::Persisted(id.clone()),
            &self.persisted,
        ) {
            Ok(hl) => {
                self.highlights.insert(id.clone(), hl);
                Ok(AddOutcome::Highlighted)
            }
            Err(AnchorError::StaleRange) => {
                tracing::debug!(target: "marginalia::overlay", note = %id, "range went stale before wrapping");
                Ok(AddOutcome::NotFound(LocateMiss::Detached))
            }
            Err(err) => Err(err),
        }
    }

    /// Forget a deleted note and remove its highlight. Returns whether a
    /// highlight was removed.
    ///
    /// If the tree refuses the removal, the note and its highlight stay
    /// tracked so a later call can retry.
    pub fn remove<T: DocumentTree<Node = N> + ?Sized>(
        &mut self,
        tree: &mut T,
        id: &NoteId,
    ) -> Result<bool, AnchorError> {
        let removed = self.unshow(tree, id)?;
        self.notes.retain(|n| &n.id != id);
        self.removed.insert(id.clone());
        if matches!(&self.context, Some(ContextHighlight::Existing(focused)) if focused == id) {
            self.context = None;
        }
        if removed {
            tracing::debug!(target: "marginalia::overlay", note = %id, "note removed");
        }
        Ok(removed)
    }

    /// Remove every highlight, keeping the last known note set.
    ///
    /// Highlights the tree refuses to remove stay tracked.
    pub fn remove_all<T: DocumentTree<Node = N> + ?Sized>(&mut self, tree: &mut T) {
        if let Err(err) = self.clear_context(tree) {
            tracing::warn!(target: "marginalia::overlay", %err, "failed to clear context highlight");
        }
        let ids: Vec<NoteId> = self.highlights.keys().cloned().collect();
        let mut count = 0;
        for id in ids {
            match self.unshow(tree, &id) {
                Ok(_) => count += 1,
                Err(err) => {
                    tracing::warn!(target: "marginalia::overlay", note = %id, %err, "failed to remove highlight");
                }
            }
        }
        tracing::debug!(
            target: "marginalia::overlay",
            count,
            remaining = self.highlights.len(),
            "all highlights removed"
        );
    }

    /// Take down one note's highlight. The mapping is dropped only once the
    /// markers are gone.
    fn unshow<T: DocumentTree<Node = N> + ?Sized>(
        &mut self,
        tree: &mut T,
        id: &NoteId,
    ) -> Result<bool, AnchorError> {
        let Some(hl) = self.highlights.get(id).cloned() else {
            return Ok(false);
        };
        highlight::remove(tree, hl)?;
        self.highlights.remove(id);
        if matches!(&self.context, Some(ContextHighlight::Existing(focused)) if focused == id) {
            self.context = None;
        }
        Ok(true)
    }

    /// Rebuild every highlight from the last known note set.
    pub fn refresh<T: DocumentTree<Node = N> + ?Sized>(&mut self, tree: &mut T) -> ShowSummary {
        self.remove_all(tree);
        self.show_known(tree)
    }

    pub fn handle_signal<T: DocumentTree<Node = N> + ?Sized>(
        &mut self,
        tree: &mut T,
        signal: ContentSignal,
    ) -> ShowSummary {
        tracing::debug!(target: "marginalia::overlay", ?signal, "content signal");
        match signal {
            ContentSignal::EditingActivated => {
                self.remove_all(tree);
                self.suspended = true;
                ShowSummary::default()
            }
            ContentSignal::EditingDeactivated | ContentSignal::EditingCommitted => {
                self.suspended = false;
                self.refresh(tree)
            }
        }
    }

    /// Focus a note or a pending quote, replacing any previous focus.
    ///
    /// Returns whether anything could be focused.
    pub fn show_context<T: DocumentTree<Node = N> + ?Sized>(
        &mut self,
        tree: &mut T,
        target: ContextTarget,
    ) -> Result<bool, AnchorError> {
        self.clear_context(tree)?;
        match target {
            ContextTarget::Note(id) => {
                let Some(hl) = self.highlights.get(&id) else {
                    return Ok(false);
                };
                highlight::add_classes(tree, hl, &self.config.context_classes(true))?;
                self.context = Some(ContextHighlight::Existing(id));
                Ok(true)
            }
            ContextTarget::Quote(quote) => {
                let quote = Quote::new(quote.text, quote.offset, quote.region_id)?;
                if self.suspended {
                    return Ok(false);
                }
                let root = tree.root();
                let Ok(range) = locate_quote(&*tree, &root, &self.config.region_attribute, &quote)
                else {
                    return Ok(false);
                };
                match highlight::apply(tree, &range, HighlightKind::Preview, &self.preview) {
                    Ok(hl) => {
                        self.context = Some(ContextHighlight::Preview(hl));
                        Ok(true)
                    }
                    Err(AnchorError::StaleRange) => Ok(false),
                    Err(err) => Err(err),
                }
            }
        }
    }

    /// Drop the contextual highlight, if any.
    pub fn clear_context<T: DocumentTree<Node = N> + ?Sized>(
        &mut self,
        tree: &mut T,
    ) -> Result<(), AnchorError> {
        match self.context.take() {
            Some(ContextHighlight::Existing(id)) => {
                if let Some(hl) = self.highlights.get(&id) {
                    highlight::remove_classes(tree, hl, &self.config.context_classes(true))?;
                }
            }
            Some(ContextHighlight::Preview(hl)) => highlight::remove(tree, hl)?,
            None => {}
        }
        Ok(())
    }

    /// Note of the highlight marker enclosing `node`, innermost first.
    pub fn note_for_node<T: DocumentTree<Node = N> + ?Sized>(
        &self,
        tree: &T,
        node: &N,
    ) -> Option<NoteId> {
        let attribute = self.config.highlight_id_attribute.as_str();
        let mut current = Some(node.clone());
        while let Some(n) = current {
            let marker = tree.closest_with_attribute(&n, attribute)?;
            if let Some(value) = tree.attribute(&marker, attribute) {
                let id = NoteId::new(value);
                if self.highlights.contains_key(&id) {
                    return Some(id);
                }
            }
            current = tree.parent(&marker);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{ArenaDocument, NodeId};
    use crate::note::RegionId;
    use crate::offset_map::flattened_text;
    use crate::testing::FaultyTree;

    const REGION: &str = "node/1/body/en/full";

    fn doc(body: &str) -> ArenaDocument {
        ArenaDocument::parse(&format!(
            r#"<div data-note-region-id="{REGION}">{body}</div>"#
        ))
        .unwrap()
    }

    fn note(id: u64, text: &str, offset: usize) -> Note {
        Note::new(id, Quote::new(text, offset, RegionId::new(REGION)).unwrap())
    }

    fn manager() -> AnnotationOverlayManager<NodeId> {
        AnnotationOverlayManager::new(AnnotatorConfig::default())
    }

    #[test]
    fn test_show_all_highlights_and_skips_misses() {
        let mut d = doc("<p>The qucik brown fox</p>");
        let mut m = manager();
        let bad: Note = serde_json::from_str(r#"{"id": 9, "region_id": "node/1/body/en/full"}"#).unwrap();
        let summary = m.show_all(
            &mut d,
            vec![note(1, "qucik", 4), note(2, "lazy dog", 0), bad],
        );
        assert_eq!(
            summary,
            ShowSummary {
                highlighted: 1,
                already_shown: 0,
                not_found: 1,
                invalid: 1
            }
        );
        assert_eq!(m.shown(), vec![NoteId::from(1u64)]);
        assert_eq!(m.notes().len(), 3);
    }

    #[test]
    fn test_reconciliation_is_idempotent() {
        let mut d = doc("<p>one <b>two</b> three</p><p>four five</p>");
        let mut m = manager();
        let notes = vec![note(1, "two thr", 4), note(2, "five", 15), note(3, "six", 0)];

        m.remove_all(&mut d);
        m.show_all(&mut d, notes.clone());
        let once = d.inner_markup(d.root());
        let shown_once = m.shown();

        for _ in 0..2 {
            m.remove_all(&mut d);
            m.show_all(&mut d, notes.clone());
        }
        assert_eq!(d.inner_markup(d.root()), once);
        assert_eq!(m.shown(), shown_once);
    }

    #[test]
    fn test_show_all_twice_does_not_duplicate() {
        let mut d = doc("<p>a fox</p>");
        let mut m = manager();
        m.show_all(&mut d, vec![note(1, "fox", 2)]);
        let summary = m.show_all(&mut d, vec![note(1, "fox", 2)]);
        assert_eq!(summary.already_shown, 1);
        assert_eq!(m.highlight(&NoteId::from(1u64)).unwrap().markers.len(), 1);
        let region = d.children(&d.root())[0];
        assert_eq!(d.descendant_elements(&region).len(), 3);
    }

    #[test]
    fn test_add_rejects_invalid_quote_without_state_change() {
        let mut d = doc("<p>text</p>");
        let mut m = manager();
        let bad: Note = serde_json::from_str(r#"{"id": 1, "quote_text": "text"}"#).unwrap();
        assert!(matches!(m.add(&mut d, bad), Err(AnchorError::InvalidQuote { .. })));
        assert!(m.notes().is_empty());
    }

    #[test]
    fn test_add_outcomes() {
        let mut d = doc("<p>hello world</p>");
        let mut m = manager();
        assert_eq!(m.add(&mut d, note(1, "world", 6)).unwrap(), AddOutcome::Highlighted);
        assert_eq!(m.add(&mut d, note(1, "world", 6)).unwrap(), AddOutcome::AlreadyShown);
        assert_eq!(
            m.add(&mut d, note(2, "planet", 6)).unwrap(),
            AddOutcome::NotFound(LocateMiss::NoOccurrence)
        );
        let elsewhere = Note::new(3u64, Quote::new("hello", 0, RegionId::new("x/1/y/en/full")).unwrap());
        assert_eq!(
            m.add(&mut d, elsewhere).unwrap(),
            AddOutcome::NotFound(LocateMiss::RegionMissing)
        );
    }

    #[test]
    fn test_remove_restores_and_is_noop_when_absent() {
        let mut d = doc("<p>hello <i>big</i> world</p>");
        let before = d.inner_markup(d.root());
        let mut m = manager();
        m.add(&mut d, note(1, "lo big wo", 3)).unwrap();
        assert_ne!(d.inner_markup(d.root()), before);

        assert!(m.remove(&mut d, &NoteId::from(1u64)).unwrap());
        assert_eq!(d.inner_markup(d.root()), before);
        assert!(!m.remove(&mut d, &NoteId::from(1u64)).unwrap());
        assert!(m.notes().is_empty());
    }

    #[test]
    fn test_late_remove_is_not_resurrected() {
        let mut d = doc("<p>alpha beta</p>");
        let mut m = manager();
        let notes = vec![note(1, "alpha", 0), note(2, "beta", 6)];
        m.show_all(&mut d, notes.clone());

        m.remove(&mut d, &NoteId::from(2u64)).unwrap();
        m.refresh(&mut d);
        assert_eq!(m.shown(), vec![NoteId::from(1u64)]);

        // A reload that raced the deletion still carries the note.
        m.show_all(&mut d, notes);
        assert_eq!(m.shown(), vec![NoteId::from(1u64)]);
    }

    #[test]
    fn test_show_all_drops_notes_missing_from_new_set() {
        let mut d = doc("<p>alpha beta</p>");
        let mut m = manager();
        m.show_all(&mut d, vec![note(1, "alpha", 0), note(2, "beta", 6)]);
        m.show_context(&mut d, ContextTarget::Note(NoteId::from(1u64)))
            .unwrap();

        let summary = m.show_all(&mut d, vec![note(2, "beta", 6)]);
        assert_eq!(summary.already_shown, 1);
        assert_eq!(m.shown(), vec![NoteId::from(2u64)]);
        assert!(m.context.is_none());
        let region = d.children(&d.root())[0];
        insta::assert_snapshot!(
            d.inner_markup(region),
            @r#"<p>alpha <span class="note-highlight" data-note-highlight-id="2">beta</span></p>"#
        );
    }

    #[test]
    fn test_tombstone_cleared_once_note_leaves_the_set() {
        let mut d = doc("<p>alpha beta</p>");
        let mut m = manager();
        m.show_all(&mut d, vec![note(1, "alpha", 0)]);
        m.remove(&mut d, &NoteId::from(1u64)).unwrap();

        m.show_all(&mut d, vec![note(2, "beta", 6)]);
        assert!(m.removed.is_empty());

        // The id comes back in a later load and is shown again.
        m.show_all(&mut d, vec![note(1, "alpha", 0), note(2, "beta", 6)]);
        assert_eq!(m.shown(), vec![NoteId::from(1u64), NoteId::from(2u64)]);
    }

    #[test]
    fn test_failed_remove_keeps_highlight_tracked() {
        let mut d = FaultyTree::new(doc("<p>hello world</p>"));
        let before = d.inner.inner_markup(d.inner.root());
        let mut m = manager();
        m.add(&mut d, note(1, "world", 6)).unwrap();
        let id = NoteId::from(1u64);

        d.fail_detach = true;
        assert!(m.remove(&mut d, &id).is_err());
        assert_eq!(m.shown(), vec![id.clone()]);
        assert_eq!(m.notes().len(), 1);
        m.remove_all(&mut d);
        assert_eq!(m.shown(), vec![id.clone()]);

        d.fail_detach = false;
        assert!(m.remove(&mut d, &id).unwrap());
        assert!(m.is_empty());
        assert_eq!(d.inner.inner_markup(d.inner.root()), before);
    }

    #[test]
    fn test_editing_signals_reconcile() {
        let mut d = doc("<p>The qucik brown fox</p>");
        let mut m = manager();
        m.show_all(&mut d, vec![note(1, "qucik", 4)]);

        m.handle_signal(&mut d, ContentSignal::EditingActivated);
        assert!(m.is_empty());
        assert!(m.is_suspended());
        let region = d.children(&d.root())[0];
        assert_eq!(d.inner_markup(region), "<p>The qucik brown fox</p>");

        // Notes arriving mid-edit are recorded but not drawn.
        assert_eq!(m.show_all(&mut d, vec![note(1, "qucik", 4)]), ShowSummary::default());
        assert!(m.is_empty());

        let summary = m.handle_signal(&mut d, ContentSignal::EditingDeactivated);
        assert_eq!(summary.highlighted, 1);
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn test_commit_with_fixed_typo_drops_highlight() {
        let mut d = doc("<p>The qucik brown fox</p>");
        let mut m = manager();
        m.show_all(&mut d, vec![note(1, "qucik", 4)]);
        m.handle_signal(&mut d, ContentSignal::EditingActivated);

        // The editor saves and the region is re-rendered with the fix.
        let region = d.children(&d.root())[0];
        let p = d.children(&region)[0];
        let text = d.children(&p)[0];
        d.detach(&text).unwrap();
        let fixed = d.create_text("The quick brown fox");
        d.append(p, fixed).unwrap();

        let summary = m.handle_signal(&mut d, ContentSignal::EditingCommitted);
        assert_eq!(summary.not_found, 1);
        assert!(m.is_empty());
        assert_eq!(m.notes().len(), 1);
        assert_eq!(flattened_text(&d, &region), "The quick brown fox");
    }

    #[test]
    fn test_replaced_content_is_reanchored_without_signal() {
        let mut d = doc("<p>keep this</p>");
        let mut m = manager();
        m.show_all(&mut d, vec![note(1, "this", 5)]);

        let region = d.children(&d.root())[0];
        let p = d.children(&region)[0];
        d.detach(&p).unwrap();
        let fresh = d.create_element("p").unwrap();
        let text = d.create_text("keep this");
        d.append(fresh, text).unwrap();
        d.append(region, fresh).unwrap();

        let summary = m.show_all(&mut d, vec![note(1, "this", 5)]);
        assert_eq!(summary.highlighted, 1);
        let hl = m.highlight(&NoteId::from(1u64)).unwrap();
        assert!(hl.is_attached(&d));
    }

    #[test]
    fn test_context_on_existing_note() {
        let mut d = doc("<p>hello world</p>");
        let mut m = manager();
        m.add(&mut d, note(1, "world", 6)).unwrap();
        let marker = m.highlight(&NoteId::from(1u64)).unwrap().markers[0];

        assert!(m.show_context(&mut d, ContextTarget::Note(NoteId::from(1u64))).unwrap());
        assert!(d.has_class(&marker, "note-contextual-highlight"));
        assert!(d.has_class(&marker, "existing"));

        m.clear_context(&mut d).unwrap();
        assert!(!d.has_class(&marker, "note-contextual-highlight"));
        assert!(d.has_class(&marker, "note-highlight"));
    }

    #[test]
    fn test_context_preview_for_pending_quote() {
        let mut d = doc("<p>hello world</p>");
        let before = d.inner_markup(d.root());
        let mut m = manager();
        let quote = Quote::new("hello", 0, RegionId::new(REGION)).unwrap();

        assert!(m.show_context(&mut d, ContextTarget::Quote(quote)).unwrap());
        assert!(d.inner_markup(d.root()).contains(r#"<span class="note-contextual-highlight new">hello</span>"#));

        // Adding the saved note clears the preview first.
        m.add(&mut d, note(1, "hello", 0)).unwrap();
        assert!(!d.inner_markup(d.root()).contains("new"));
        m.remove_all(&mut d);
        assert_eq!(d.inner_markup(d.root()), before);
    }

    #[test]
    fn test_context_on_unknown_note_is_false() {
        let mut d = doc("<p>x</p>");
        let mut m = manager();
        assert!(!m.show_context(&mut d, ContextTarget::Note(NoteId::new("7"))).unwrap());
    }

    #[test]
    fn test_note_for_node() {
        let mut d = doc("<p>hello world</p>");
        let mut m = manager();
        m.add(&mut d, note(4, "world", 6)).unwrap();
        let marker = m.highlight(&NoteId::from(4u64)).unwrap().markers[0];
        let inner = d.children(&marker)[0];
        assert_eq!(m.note_for_node(&d, &inner), Some(NoteId::from(4u64)));

        let region = d.children(&d.root())[0];
        let p = d.children(&region)[0];
        let plain = d.children(&p)[0];
        assert_eq!(m.note_for_node(&d, &plain), None);
    }
}
