//! Content region discovery.
//!
//! Regions are created by the renderer and marked with a region-id
//! attribute. Nothing here ever writes that attribute.

use crate::note::RegionId;
use crate::tree::DocumentTree;

/// First element under `root` (inclusive) whose `attribute` is `region`.
pub fn find_region<T: DocumentTree + ?Sized>(
    tree: &T,
    root: &T::Node,
    attribute: &str,
    region: &RegionId,
) -> Option<T::Node> {
    tree.descendant_elements(root)
        .into_iter()
        .find(|n| tree.attribute(n, attribute).as_deref() == Some(region.as_str()))
}

/// Nearest region enclosing `node` (inclusive), with its id.
pub fn enclosing_region<T: DocumentTree + ?Sized>(
    tree: &T,
    node: &T::Node,
    attribute: &str,
) -> Option<(T::Node, RegionId)> {
    let region = tree.closest_with_attribute(node, attribute)?;
    let id = tree.attribute(&region, attribute)?;
    if id.is_empty() {
        return None;
    }
    Some((region, RegionId::new(id)))
}

/// Every region under `root` in document order.
pub fn regions<T: DocumentTree + ?Sized>(
    tree: &T,
    root: &T::Node,
    attribute: &str,
) -> Vec<(T::Node, RegionId)> {
    tree.descendant_elements(root)
        .into_iter()
        .filter_map(|n| {
            let id = tree.attribute(&n, attribute)?;
            (!id.is_empty()).then(|| (n, RegionId::new(id)))
        })
        .collect()
}
