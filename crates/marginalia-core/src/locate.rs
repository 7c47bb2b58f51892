//! Re-locating quoted text inside a content region.
//!
//! The stored offset is only a hint. Every exact occurrence of the quote in
//! the region's flattened text is a candidate and the one nearest the hint
//! wins; equidistant candidates resolve to the earliest in document order.

use crate::note::Quote;
use crate::offset_map::{Bias, flattened_text, point_at_offset};
use crate::region::find_region;
use crate::tree::{DocumentTree, DomPoint};

/// A located span. Valid only until the next mutation of the tree.
#[derive(Clone, Debug, PartialEq)]
pub struct LiveRange<N> {
    /// Region root the range was located in.
    pub region: N,
    pub start: DomPoint<N>,
    pub end: DomPoint<N>,
    /// The matched text, equal to the needle.
    pub text: String,
    /// Flattened char offset of `start` within `region`.
    pub offset: usize,
}

impl<N> LiveRange<N> {
    /// Char length of the matched text.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Why a quote could not be located. An expected outcome, not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocateMiss {
    EmptyNeedle,
    /// No element carries the quote's region id.
    RegionMissing,
    /// The needle does not occur in the region's text.
    NoOccurrence,
    /// The best occurrence resolved to a point outside the region.
    OutsideRegion,
    /// The region root is no longer in the document.
    Detached,
}

/// Char offsets of every occurrence of `needle` in `haystack`, overlapping
/// matches included. Exact and case-sensitive.
pub fn find_occurrences(haystack: &str, needle: &str) -> Vec<usize> {
    if needle.is_empty() {
        return Vec::new();
    }
    haystack
        .char_indices()
        .enumerate()
        .filter(|(_, (byte, _))| haystack[*byte..].starts_with(needle))
        .map(|(char_idx, _)| char_idx)
        .collect()
}

/// The occurrence nearest `target`. Ties go to the first one.
pub fn nearest(occurrences: &[usize], target: usize) -> Option<usize> {
    occurrences
        .iter()
        .copied()
        .min_by_key(|offset| offset.abs_diff(target))
}

/// Find the live range in `region` best matching `needle` near `target_offset`.
///
/// Reads the tree only; host selection and editing state are left alone.
pub fn locate<T: DocumentTree + ?Sized>(
    tree: &T,
    region: &T::Node,
    needle: &str,
    target_offset: usize,
) -> Result<LiveRange<T::Node>, LocateMiss> {
    if needle.is_empty() {
        return Err(LocateMiss::EmptyNeedle);
    }
    if !tree.is_attached(region) {
        return Err(LocateMiss::Detached);
    }

    let haystack = flattened_text(tree, region);
    let occurrences = find_occurrences(&haystack, needle);
    let Some(offset) = nearest(&occurrences, target_offset) else {
        tracing::debug!(
            target: "marginalia::locate",
            needle_len = needle.chars().count(),
            target_offset,
            "quote not found in region"
        );
        return Err(LocateMiss::NoOccurrence);
    };

    let end_offset = offset + needle.chars().count();
    let start = point_at_offset(tree, region, offset, Bias::Forward);
    let end = point_at_offset(tree, region, end_offset, Bias::Backward);
    let (Some(start), Some(end)) = (start, end) else {
        return Err(LocateMiss::OutsideRegion);
    };
    if !tree.contains(region, &start.node) || !tree.contains(region, &end.node) {
        return Err(LocateMiss::OutsideRegion);
    }

    tracing::trace!(
        target: "marginalia::locate",
        offset,
        target_offset,
        candidates = occurrences.len(),
        "quote located"
    );
    Ok(LiveRange {
        region: region.clone(),
        start,
        end,
        text: needle.to_string(),
        offset,
    })
}

/// Resolve the quote's region under `root`, then [`locate`] inside it.
pub fn locate_quote<T: DocumentTree + ?Sized>(
    tree: &T,
    root: &T::Node,
    region_attribute: &str,
    quote: &Quote,
) -> Result<LiveRange<T::Node>, LocateMiss> {
    let Some(region) = find_region(tree, root, region_attribute, &quote.region_id) else {
        tracing::debug!(
            target: "marginalia::locate",
            region = %quote.region_id,
            "region not rendered"
        );
        return Err(LocateMiss::RegionMissing);
    };
    locate(tree, &region, &quote.text, quote.offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaDocument;
    use crate::note::RegionId;
    use crate::offset_map::offset_of;

    fn region(d: &ArenaDocument) -> crate::arena::NodeId {
        d.children(&d.root())[0]
    }

    #[test]
    fn test_find_occurrences_overlapping() {
        assert_eq!(find_occurrences("aaaa", "aa"), vec![0, 1, 2]);
        assert_eq!(find_occurrences("Cat cat", "cat"), vec![4]);
        assert_eq!(find_occurrences("abc", ""), Vec::<usize>::new());
    }

    #[test]
    fn test_find_occurrences_counts_chars() {
        assert_eq!(find_occurrences("héllo wörld wö", "wö"), vec![6, 12]);
    }

    #[test]
    fn test_nearest_prefers_closest() {
        assert_eq!(nearest(&[5, 20, 40], 22), Some(20));
        assert_eq!(nearest(&[5, 20, 40], 35), Some(40));
        assert_eq!(nearest(&[], 3), None);
    }

    #[test]
    fn test_nearest_tie_goes_to_first() {
        assert_eq!(nearest(&[10, 20], 15), Some(10));
    }

    #[test]
    fn test_locate_picks_occurrence_nearest_offset() {
        // "cat" at flattened offsets 5, 20 and 40.
        let text = format!("{}cat{}cat{}cat", "x".repeat(5), "y".repeat(12), "z".repeat(17));
        let d = ArenaDocument::parse(&format!("<div>{text}</div>")).unwrap();
        let r = region(&d);
        let range = locate(&d, &r, "cat", 22).unwrap();
        assert_eq!(range.offset, 20);
        assert_eq!(offset_of(&d, &r, &range.start), Some(20));
        assert_eq!(offset_of(&d, &r, &range.end), Some(23));
    }

    #[test]
    fn test_locate_across_markup() {
        let d = ArenaDocument::parse("<div><p>The <em>qu</em>ick</p><p> brown</p></div>").unwrap();
        let r = region(&d);
        let range = locate(&d, &r, "quick brown", 0).unwrap();
        assert_eq!(range.offset, 4);
        assert_eq!(d.text(&range.start.node).as_deref(), Some("qu"));
        assert_eq!(range.start.offset, 0);
        assert_eq!(d.text(&range.end.node).as_deref(), Some(" brown"));
        assert_eq!(range.end.offset, 6);
    }

    #[test]
    fn test_locate_is_idempotent() {
        let d = ArenaDocument::parse("<div>a fox, a fox, a fox</div>").unwrap();
        let r = region(&d);
        let first = locate(&d, &r, "fox", 9).unwrap();
        let second = locate(&d, &r, "fox", 9).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.offset, 9);
    }

    #[test]
    fn test_locate_miss_leaves_document_alone() {
        let d = ArenaDocument::parse("<div>The quick brown fox</div>").unwrap();
        let before = d.inner_markup(d.root());
        let r = region(&d);
        assert_eq!(locate(&d, &r, "qucik", 4), Err(LocateMiss::NoOccurrence));
        assert_eq!(d.inner_markup(d.root()), before);
    }

    #[test]
    fn test_locate_is_case_sensitive() {
        let d = ArenaDocument::parse("<div>The Fox</div>").unwrap();
        assert_eq!(locate(&d, &region(&d), "fox", 0), Err(LocateMiss::NoOccurrence));
    }

    #[test]
    fn test_locate_empty_needle_and_detached() {
        let mut d = ArenaDocument::parse("<div>abc</div>").unwrap();
        let r = region(&d);
        assert_eq!(locate(&d, &r, "", 0), Err(LocateMiss::EmptyNeedle));
        d.detach(&r).unwrap();
        assert_eq!(locate(&d, &r, "abc", 0), Err(LocateMiss::Detached));
    }

    #[test]
    fn test_locate_quote_resolves_region() {
        let d = ArenaDocument::parse(
            r#"<div data-note-region-id="a">the fox</div><div data-note-region-id="b">a fox</div>"#,
        )
        .unwrap();
        let quote = Quote::new("fox", 0, RegionId::new("b")).unwrap();
        let range = locate_quote(&d, &d.root(), "data-note-region-id", &quote).unwrap();
        assert_eq!(range.offset, 2);
        assert_eq!(range.region, d.find_by_attribute("data-note-region-id", "b").unwrap());

        let missing = Quote::new("fox", 0, RegionId::new("c")).unwrap();
        assert_eq!(
            locate_quote(&d, &d.root(), "data-note-region-id", &missing),
            Err(LocateMiss::RegionMissing)
        );
    }
}
