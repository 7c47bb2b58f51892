//! Conversion between tree positions and flattened text offsets.
//!
//! A region's flattened text is the concatenation of all its text leaves in
//! document order. Element boundaries contribute nothing, so an offset is a
//! pure function of text content regardless of markup depth.

use crate::tree::{DocumentTree, DomPoint, NodeKind};

/// Which leaf owns an offset that falls exactly between two text leaves.
///
/// Range starts resolve forward (into the next leaf), range ends resolve
/// backward (to the end of the previous leaf), so a resolved range never
/// drags in an empty edge of a neighbouring node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Bias {
    #[default]
    Forward,
    Backward,
}

/// Text leaves under `root` (inclusive) in document order.
pub fn text_leaves<T: DocumentTree + ?Sized>(tree: &T, root: &T::Node) -> Vec<T::Node> {
    let mut leaves = Vec::new();
    let mut stack = vec![root.clone()];
    while let Some(node) = stack.pop() {
        match tree.kind(&node) {
            NodeKind::Text => leaves.push(node),
            NodeKind::Element => stack.extend(tree.children(&node).into_iter().rev()),
            NodeKind::Other => {}
        }
    }
    leaves
}

/// Concatenated text content of `root`.
pub fn flattened_text<T: DocumentTree + ?Sized>(tree: &T, root: &T::Node) -> String {
    text_leaves(tree, root)
        .iter()
        .filter_map(|leaf| tree.text(leaf))
        .collect()
}

/// Char length of everything under `node`.
fn subtree_len<T: DocumentTree + ?Sized>(tree: &T, node: &T::Node) -> usize {
    text_leaves(tree, node)
        .iter()
        .map(|leaf| tree.text_len(leaf))
        .sum()
}

/// Number of chars in `root`'s flattened text strictly before `point`.
///
/// Returns `None` when `point` does not lie inside `root`.
pub fn offset_of<T: DocumentTree + ?Sized>(
    tree: &T,
    root: &T::Node,
    point: &DomPoint<T::Node>,
) -> Option<usize> {
    if !tree.contains(root, &point.node) {
        return None;
    }
    let mut count = 0;
    walk_to_point(tree, root, point, &mut count).then_some(count)
}

fn walk_to_point<T: DocumentTree + ?Sized>(
    tree: &T,
    node: &T::Node,
    point: &DomPoint<T::Node>,
    count: &mut usize,
) -> bool {
    let kind = tree.kind(node);
    if *node == point.node {
        match kind {
            NodeKind::Text => *count += point.offset.min(tree.text_len(node)),
            NodeKind::Element | NodeKind::Other => {
                for child in tree.children(node).iter().take(point.offset) {
                    *count += subtree_len(tree, child);
                }
            }
        }
        return true;
    }
    match kind {
        NodeKind::Text => *count += tree.text_len(node),
        NodeKind::Element => {
            for child in tree.children(node) {
                if walk_to_point(tree, &child, point, count) {
                    return true;
                }
            }
        }
        NodeKind::Other => {}
    }
    false
}

/// Resolve a flattened offset under `root` to a point inside a text leaf.
///
/// Offsets past the end clamp to the end of the last leaf. A region without
/// text resolves to the start of `root` itself.
pub fn point_at_offset<T: DocumentTree + ?Sized>(
    tree: &T,
    root: &T::Node,
    offset: usize,
    bias: Bias,
) -> Option<DomPoint<T::Node>> {
    let leaves = text_leaves(tree, root);
    let Some(last) = leaves.last() else {
        return Some(DomPoint::new(root.clone(), 0));
    };

    let mut start = 0;
    for leaf in &leaves {
        let len = tree.text_len(leaf);
        let end = start + len;
        let owns = match bias {
            Bias::Forward => offset < end,
            Bias::Backward => offset <= end && (offset > start || offset == 0),
        };
        if owns {
            return Some(DomPoint::new(leaf.clone(), offset.saturating_sub(start)));
        }
        start = end;
    }

    tracing::trace!(
        target: "marginalia::offset",
        offset,
        text_len = start,
        "offset past end of region, clamping"
    );
    Some(DomPoint::new(last.clone(), tree.text_len(last)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaDocument;

    fn doc(markup: &str) -> ArenaDocument {
        ArenaDocument::parse(markup).unwrap()
    }

    #[test]
    fn test_flattened_text_ignores_markup() {
        let d = doc("<p>The <em>qu<b>ick</b></em> fox<!-- note --></p>");
        assert_eq!(flattened_text(&d, &d.root()), "The quick fox");
    }

    #[test]
    fn test_offset_of_text_point() {
        let d = doc("<p>The <em>quick</em> fox</p>");
        let p = d.children(&d.root())[0];
        let em = d.children(&p)[1];
        let quick = d.children(&em)[0];
        assert_eq!(offset_of(&d, &p, &DomPoint::new(quick, 0)), Some(4));
        assert_eq!(offset_of(&d, &p, &DomPoint::new(quick, 3)), Some(7));
    }

    #[test]
    fn test_offset_of_element_point() {
        let d = doc("<p>The <em>quick</em> fox</p>");
        let p = d.children(&d.root())[0];
        assert_eq!(offset_of(&d, &p, &DomPoint::new(p, 0)), Some(0));
        assert_eq!(offset_of(&d, &p, &DomPoint::new(p, 2)), Some(9));
        assert_eq!(offset_of(&d, &p, &DomPoint::new(p, 3)), Some(13));
    }

    #[test]
    fn test_offset_of_outside_root() {
        let d = doc("<p>one</p><p>two</p>");
        let paras = d.children(&d.root());
        let two = d.children(&paras[1])[0];
        assert_eq!(offset_of(&d, &paras[0], &DomPoint::new(two, 1)), None);
        assert_eq!(offset_of(&d, &d.root(), &DomPoint::new(two, 1)), Some(4));
    }

    #[test]
    fn test_offset_clamps_inside_text() {
        let d = doc("<p>abc</p>");
        let p = d.children(&d.root())[0];
        let text = d.children(&p)[0];
        assert_eq!(offset_of(&d, &p, &DomPoint::new(text, 99)), Some(3));
    }

    #[test]
    fn test_point_at_offset_bias_on_boundary() {
        let d = doc("<p>The <em>quick</em></p>");
        let p = d.children(&d.root())[0];
        let the = d.children(&p)[0];
        let quick = d.children(&d.children(&p)[1])[0];

        assert_eq!(
            point_at_offset(&d, &p, 4, Bias::Forward),
            Some(DomPoint::new(quick, 0))
        );
        assert_eq!(
            point_at_offset(&d, &p, 4, Bias::Backward),
            Some(DomPoint::new(the, 4))
        );
        assert_eq!(
            point_at_offset(&d, &p, 0, Bias::Backward),
            Some(DomPoint::new(the, 0))
        );
    }

    #[test]
    fn test_point_at_offset_clamps_past_end() {
        let d = doc("<p>ab<i>cd</i></p>");
        let p = d.children(&d.root())[0];
        let cd = d.children(&d.children(&p)[1])[0];
        assert_eq!(
            point_at_offset(&d, &p, 50, Bias::Forward),
            Some(DomPoint::new(cd, 2))
        );
    }

    #[test]
    fn test_point_at_offset_empty_region() {
        let d = doc("<p><br/></p>");
        let p = d.children(&d.root())[0];
        assert_eq!(
            point_at_offset(&d, &p, 3, Bias::Forward),
            Some(DomPoint::new(p, 0))
        );
    }

    #[test]
    fn test_round_trip_every_point() {
        let d = doc("<div>Hé<b>llo <i>wö</i></b>rld <span>🌍</span>!</div>");
        let root = d.children(&d.root())[0];
        for leaf in text_leaves(&d, &root) {
            for k in 0..=d.text_len(&leaf) {
                let point = DomPoint::new(leaf, k);
                let offset = offset_of(&d, &root, &point).unwrap();
                for bias in [Bias::Forward, Bias::Backward] {
                    let back = point_at_offset(&d, &root, offset, bias).unwrap();
                    assert_eq!(offset_of(&d, &root, &back), Some(offset));
                }
            }
        }
    }

    #[test]
    fn test_round_trip_same_leaf_inside_text() {
        let d = doc("<div>ab<b>cd</b>ef</div>");
        let root = d.children(&d.root())[0];
        let cd = d.children(&d.children(&root)[1])[0];
        let point = DomPoint::new(cd, 1);
        let offset = offset_of(&d, &root, &point).unwrap();
        assert_eq!(point_at_offset(&d, &root, offset, Bias::Forward), Some(point));
    }
}
