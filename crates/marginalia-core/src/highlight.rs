//! Wrapping located ranges in highlight markers and unwrapping them again.
//!
//! Wrapping is done with explicit tree operations only:
//!
//! 1. Split the text nodes at the range boundaries so the range starts and
//!    ends on node edges. Every split is recorded.
//! 2. Lift each covered text leaf to its highest ancestor that lies entirely
//!    inside the range, stopping at the region root. Only phrasing elements
//!    are lifted, so a marker never lands between list items, table cells
//!    or block children.
//! 3. Wrap each run of adjacent lifted siblings in one marker element.
//!
//! A range crossing element boundaries therefore produces several marker
//! fragments, all owned by one [`Highlight`]. Removal moves the children of
//! each marker back into place and re-joins the recorded splits in reverse,
//! restoring the original text nodes.

use smol_str::SmolStr;

use crate::config::AnnotatorConfig;
use crate::error::AnchorError;
use crate::locate::LiveRange;
use crate::note::NoteId;
use crate::offset_map::{flattened_text, offset_of, text_leaves};
use crate::tree::{DocumentTree, HostStateGuard, NodeKind};

/// What a highlight stands for.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HighlightKind {
    /// Marks the quote of a stored note.
    Persisted(NoteId),
    /// Marks a pending quote while its creation form is open.
    Preview,
}

impl HighlightKind {
    pub fn note_id(&self) -> Option<&NoteId> {
        match self {
            HighlightKind::Persisted(id) => Some(id),
            HighlightKind::Preview => None,
        }
    }
}

/// How marker elements are built.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerStyle {
    pub tag: SmolStr,
    /// Attribute carrying the note id on persisted markers.
    pub id_attribute: SmolStr,
    pub classes: Vec<SmolStr>,
}

impl MarkerStyle {
    /// Style for persisted note highlights.
    pub fn persisted(config: &AnnotatorConfig) -> Self {
        Self {
            tag: config.marker_tag.clone(),
            id_attribute: config.highlight_id_attribute.clone(),
            classes: config.highlight_classes.clone(),
        }
    }

    /// Style for the preview of a quote that has no note yet.
    pub fn preview(config: &AnnotatorConfig) -> Self {
        Self {
            tag: config.marker_tag.clone(),
            id_attribute: config.highlight_id_attribute.clone(),
            classes: config.context_classes(false).to_vec(),
        }
    }
}

/// A live highlight: the markers wrapping one located range.
#[derive(Clone, Debug, PartialEq)]
pub struct Highlight<N> {
    pub kind: HighlightKind,
    /// Region root the highlight lives in.
    pub region: N,
    /// Marker elements in document order.
    pub markers: Vec<N>,
    /// Text splits made while wrapping, as `(left, right)` pairs.
    splits: Vec<(N, N)>,
}

impl<N: Clone + PartialEq> Highlight<N> {
    pub fn note_id(&self) -> Option<&NoteId> {
        self.kind.note_id()
    }

    /// Whether any marker is still in the document.
    pub fn is_attached<T: DocumentTree<Node = N> + ?Sized>(&self, tree: &T) -> bool {
        self.markers.iter().any(|m| tree.is_attached(m))
    }

    /// Whether `node` lies inside one of this highlight's markers.
    pub fn contains<T: DocumentTree<Node = N> + ?Sized>(&self, tree: &T, node: &N) -> bool {
        self.markers.iter().any(|m| tree.contains(m, node))
    }

    /// Concatenated text under the markers.
    pub fn text<T: DocumentTree<Node = N> + ?Sized>(&self, tree: &T) -> String {
        self.markers
            .iter()
            .map(|m| flattened_text(tree, m))
            .collect()
    }
}

/// Wrap `range` in marker elements.
///
/// Fails with [`AnchorError::StaleRange`] when the range no longer describes
/// the live tree: a detached endpoint, an endpoint outside the region, or
/// text that changed since the range was located.
pub fn apply<T: DocumentTree + ?Sized>(
    tree: &mut T,
    range: &LiveRange<T::Node>,
    kind: HighlightKind,
    style: &MarkerStyle,
) -> Result<Highlight<T::Node>, AnchorError> {
    if range.is_empty() {
        return Err(AnchorError::invalid_quote("range is empty"));
    }
    let (start, end) = validate_range(&*tree, range)?;

    let mut tree = HostStateGuard::acquire(tree);
    let mut splits = Vec::new();

    // End first: splitting keeps the left handle, so the start point stays valid.
    split_at(&mut *tree, &range.end.node, range.end.offset, &mut splits)?;
    split_at(&mut *tree, &range.start.node, range.start.offset, &mut splits)?;

    let covered = covered_leaves(&*tree, &range.region, start, end);
    let tops = lift(&*tree, &range.region, &covered);
    let runs = sibling_runs(&*tree, tops);

    let mut markers = Vec::with_capacity(runs.len());
    for run in runs {
        markers.push(wrap_run(&mut *tree, &run, &kind, style)?);
    }

    tracing::debug!(
        target: "marginalia::highlight",
        kind = ?kind,
        offset = range.offset,
        fragments = markers.len(),
        splits = splits.len(),
        "highlight applied"
    );
    Ok(Highlight {
        kind,
        region: range.region.clone(),
        markers,
        splits,
    })
}

/// Remove a highlight's markers and restore the text nodes it split.
///
/// Markers that are already gone (content replaced underneath) are skipped.
pub fn remove<T: DocumentTree + ?Sized>(
    tree: &mut T,
    highlight: Highlight<T::Node>,
) -> Result<(), AnchorError> {
    let mut tree = HostStateGuard::acquire(tree);

    for marker in &highlight.markers {
        if !tree.is_attached(marker) {
            continue;
        }
        let Some(parent) = tree.parent(marker) else {
            continue;
        };
        for child in tree.children(marker) {
            tree.insert_before(&parent, &child, Some(marker))?;
        }
        tree.detach(marker)?;
    }

    let mut rejoined = 0;
    for (left, right) in highlight.splits.iter().rev() {
        // Another highlight may still sit between the halves.
        let adjacent = tree.is_attached(left)
            && tree.kind(left) == NodeKind::Text
            && tree.kind(right) == NodeKind::Text
            && tree.next_sibling(left).as_ref() == Some(right);
        if adjacent {
            tree.join_text(left, right)?;
            rejoined += 1;
        }
    }

    tracing::debug!(
        target: "marginalia::highlight",
        kind = ?highlight.kind,
        fragments = highlight.markers.len(),
        rejoined,
        "highlight removed"
    );
    Ok(())
}

pub fn add_classes<T: DocumentTree + ?Sized>(
    tree: &mut T,
    highlight: &Highlight<T::Node>,
    classes: &[SmolStr],
) -> Result<(), AnchorError> {
    for marker in &highlight.markers {
        if !tree.is_attached(marker) {
            continue;
        }
        for class in classes {
            tree.add_class(marker, class)?;
        }
    }
    Ok(())
}

pub fn remove_classes<T: DocumentTree + ?Sized>(
    tree: &mut T,
    highlight: &Highlight<T::Node>,
    classes: &[SmolStr],
) -> Result<(), AnchorError> {
    for marker in &highlight.markers {
        if !tree.is_attached(marker) {
            continue;
        }
        for class in classes {
            tree.remove_class(marker, class)?;
        }
    }
    Ok(())
}

/// Check the range against the live tree, returning its flattened bounds.
fn validate_range<T: DocumentTree + ?Sized>(
    tree: &T,
    range: &LiveRange<T::Node>,
) -> Result<(usize, usize), AnchorError> {
    let endpoints_live = [&range.start, &range.end].iter().all(|p| {
        tree.is_attached(&p.node)
            && tree.contains(&range.region, &p.node)
            && (tree.kind(&p.node) != NodeKind::Text || p.offset <= tree.text_len(&p.node))
    });
    if !tree.is_attached(&range.region) || !endpoints_live {
        return Err(AnchorError::StaleRange);
    }

    let start = offset_of(tree, &range.region, &range.start).ok_or(AnchorError::StaleRange)?;
    let end = offset_of(tree, &range.region, &range.end).ok_or(AnchorError::StaleRange)?;
    let current: String = flattened_text(tree, &range.region)
        .chars()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect();
    if end <= start || current != range.text {
        tracing::debug!(
            target: "marginalia::highlight",
            start,
            end,
            "range text changed since locate"
        );
        return Err(AnchorError::StaleRange);
    }
    Ok((start, end))
}

fn split_at<T: DocumentTree + ?Sized>(
    tree: &mut T,
    node: &T::Node,
    offset: usize,
    splits: &mut Vec<(T::Node, T::Node)>,
) -> Result<(), AnchorError> {
    if tree.kind(node) != NodeKind::Text || offset == 0 || offset >= tree.text_len(node) {
        return Ok(());
    }
    let right = tree.split_text(node, offset)?;
    splits.push((node.clone(), right));
    Ok(())
}

/// Non-empty text leaves lying entirely within `[start, end)`.
fn covered_leaves<T: DocumentTree + ?Sized>(
    tree: &T,
    region: &T::Node,
    start: usize,
    end: usize,
) -> Vec<T::Node> {
    let mut covered = Vec::new();
    let mut pos = 0;
    for leaf in text_leaves(tree, region) {
        let len = tree.text_len(&leaf);
        if len > 0 && pos >= start && pos + len <= end {
            covered.push(leaf);
        }
        pos += len;
        if pos >= end {
            break;
        }
    }
    covered
}

/// Whether every non-empty text leaf under `node` is covered, and there is one.
fn fully_covered<T: DocumentTree + ?Sized>(tree: &T, node: &T::Node, covered: &[T::Node]) -> bool {
    let mut any = false;
    for leaf in text_leaves(tree, node) {
        if tree.text_len(&leaf) == 0 {
            continue;
        }
        if !covered.contains(&leaf) {
            return false;
        }
        any = true;
    }
    any
}

/// Elements a marker may wrap without changing the parent's content model.
const PHRASING_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "br", "cite", "code", "data", "del", "dfn", "em", "font",
    "i", "img", "ins", "kbd", "mark", "q", "s", "samp", "small", "span", "strong", "sub", "sup",
    "time", "u", "var", "wbr",
];

fn is_phrasing<T: DocumentTree + ?Sized>(tree: &T, node: &T::Node) -> bool {
    match tree.kind(node) {
        NodeKind::Element => tree
            .tag_name(node)
            .is_some_and(|tag| PHRASING_TAGS.contains(&tag.as_str())),
        NodeKind::Text | NodeKind::Other => true,
    }
}

/// Highest fully covered phrasing ancestor of each covered leaf,
/// deduplicated, in document order.
fn lift<T: DocumentTree + ?Sized>(
    tree: &T,
    region: &T::Node,
    covered: &[T::Node],
) -> Vec<T::Node> {
    let mut tops: Vec<T::Node> = Vec::new();
    for leaf in covered {
        let mut node = leaf.clone();
        while let Some(parent) = tree.parent(&node) {
            if &parent == region
                || !is_phrasing(tree, &parent)
                || !fully_covered(tree, &parent, covered)
            {
                break;
            }
            node = parent;
        }
        if tops.last() != Some(&node) {
            tops.push(node);
        }
    }
    tops
}

/// Group lifted nodes into runs of siblings. Nodes between two members of a
/// run must be phrasing content carrying no text (comments, `<br/>`, empty
/// text) and join the run.
fn sibling_runs<T: DocumentTree + ?Sized>(tree: &T, tops: Vec<T::Node>) -> Vec<Vec<T::Node>> {
    let mut runs: Vec<Vec<T::Node>> = Vec::new();
    for node in tops {
        let gap = runs
            .last()
            .and_then(|run| textless_gap(tree, run.last(), &node));
        match (gap, runs.last_mut()) {
            (Some(between), Some(run)) => {
                run.extend(between);
                run.push(node);
            }
            _ => runs.push(vec![node]),
        }
    }
    runs
}

/// Siblings strictly between `prev` and `next`, if they share a parent and
/// none of the in-between nodes carries text.
fn textless_gap<T: DocumentTree + ?Sized>(
    tree: &T,
    prev: Option<&T::Node>,
    next: &T::Node,
) -> Option<Vec<T::Node>> {
    let prev = prev?;
    let parent = tree.parent(prev)?;
    if tree.parent(next).as_ref() != Some(&parent) {
        return None;
    }
    let siblings = tree.children(&parent);
    let from = siblings.iter().position(|c| c == prev)?;
    let to = siblings.iter().position(|c| c == next)?;
    if to <= from {
        return None;
    }
    let between = &siblings[from + 1..to];
    between
        .iter()
        .all(|n| {
            is_phrasing(tree, n) && text_leaves(tree, n).iter().all(|l| tree.text_len(l) == 0)
        })
        .then(|| between.to_vec())
}

fn wrap_run<T: DocumentTree + ?Sized>(
    tree: &mut T,
    run: &[T::Node],
    kind: &HighlightKind,
    style: &MarkerStyle,
) -> Result<T::Node, AnchorError> {
    let Some(first) = run.first() else {
        return Err(AnchorError::StaleRange);
    };
    let parent = tree.parent(first).ok_or(AnchorError::StaleRange)?;

    let marker = tree.create_element(&style.tag)?;
    for class in &style.classes {
        tree.add_class(&marker, class)?;
    }
    if let HighlightKind::Persisted(id) = kind {
        tree.set_attribute(&marker, &style.id_attribute, id.as_str())?;
    }
    tree.insert_before(&parent, &marker, Some(first))?;
    for node in run {
        tree.insert_before(&marker, node, None)?;
    }
    Ok(marker)
}
