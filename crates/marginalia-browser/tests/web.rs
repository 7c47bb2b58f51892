//! WASM browser tests for marginalia-browser.
//!
//! Run with: `wasm-pack test --headless --firefox` or `--chrome`

use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

use marginalia_browser::{
    AnnotationOverlayManager, AnnotatorConfig, BrowserDocument, DocumentTree, HighlightKind,
    HostStateGuard, MarkerStyle, Note, highlight, locate, locate_quote,
};
use web_sys::{Element, HtmlElement, Node};

/// Mount `html` in a fresh container under `body` and return the container.
fn mount(html: &str) -> HtmlElement {
    let document = web_sys::window().unwrap().document().unwrap();
    let container = document
        .create_element("div")
        .unwrap()
        .dyn_into::<HtmlElement>()
        .unwrap();
    container.set_inner_html(html);
    document.body().unwrap().append_child(&container).unwrap();
    container
}

fn region(container: &HtmlElement) -> Node {
    container
        .query_selector("[data-note-region-id]")
        .unwrap()
        .unwrap()
        .into()
}

// === Tree primitives ===

#[wasm_bindgen_test]
fn test_split_text_counts_chars_not_utf16() {
    let container = mount("<p>a🦀bc</p>");
    let mut doc = BrowserDocument::new(container.clone().into()).unwrap();
    let p: Node = container.first_child().unwrap();
    let text = p.first_child().unwrap();

    let right = doc.split_text(&text, 2).unwrap();
    assert_eq!(doc.text(&text).as_deref(), Some("a🦀"));
    assert_eq!(doc.text(&right).as_deref(), Some("bc"));

    doc.join_text(&text, &right).unwrap();
    assert_eq!(doc.text(&text).as_deref(), Some("a🦀bc"));
    assert_eq!(doc.children(&p).len(), 1);
    container.remove();
}

#[wasm_bindgen_test]
fn test_join_requires_adjacent() {
    let container = mount("<p>one<em>two</em>three</p>");
    let mut doc = BrowserDocument::new(container.clone().into()).unwrap();
    let p: Node = container.first_child().unwrap();
    let children = doc.children(&p);
    assert!(doc.join_text(&children[0], &children[2]).is_err());
    container.remove();
}

#[wasm_bindgen_test]
fn test_detach_leaves_tree() {
    let container = mount("<p>text</p>");
    let mut doc = BrowserDocument::new(container.clone().into()).unwrap();
    let p: Node = container.first_child().unwrap();
    assert!(doc.is_attached(&p));
    doc.detach(&p).unwrap();
    assert!(!doc.is_attached(&p));
    container.remove();
}

// === Highlight round trips ===

#[wasm_bindgen_test]
fn test_highlight_across_elements_and_remove() {
    let container = mount(
        r#"<div data-note-region-id="node/1/body/en/full">The <em>qu😀ick</em> brown fox</div>"#,
    );
    let before = container.inner_html();
    let mut doc = BrowserDocument::new(container.clone().into()).unwrap();
    let region = region(&container);

    let range = locate(&doc, &region, "😀ick brown", 0).unwrap();
    assert_eq!(range.offset, 6);
    let style = MarkerStyle::persisted(&AnnotatorConfig::default());
    let hl = highlight::apply(&mut doc, &range, HighlightKind::Persisted("1".into()), &style)
        .unwrap();
    assert_eq!(hl.markers.len(), 2);
    assert_eq!(hl.text(&doc), "😀ick brown");

    highlight::remove(&mut doc, hl).unwrap();
    assert_eq!(container.inner_html(), before);
    container.remove();
}

#[wasm_bindgen_test]
fn test_overlay_show_all_and_remove_all() {
    let container = mount(
        r#"<div data-note-region-id="node/1/body/en/full"><p>It was speled out.</p></div>"#,
    );
    let before = container.inner_html();
    let mut doc = BrowserDocument::new(container.clone().into()).unwrap();
    let mut overlay = AnnotationOverlayManager::new(AnnotatorConfig::default());
    let notes: Vec<Note> = serde_json::from_str(
        r#"[{"id": 3, "region_id": "node/1/body/en/full", "quote_text": "speled", "quote_offset": 7}]"#,
    )
    .unwrap();

    let summary = overlay.show_all(&mut doc, notes);
    assert_eq!(summary.highlighted, 1);
    let marker = container
        .query_selector("[data-note-highlight-id=\"3\"]")
        .unwrap()
        .unwrap();
    assert_eq!(marker.text_content().as_deref(), Some("speled"));

    overlay.remove_all(&mut doc);
    assert_eq!(container.inner_html(), before);
    container.remove();
}

#[wasm_bindgen_test]
fn test_region_lookup_in_live_dom() {
    let container = mount(
        r#"<h1 data-note-region-id="node/2/title/en/full">Title</h1><div data-note-region-id="node/2/body/en/full">Body text</div>"#,
    );
    let doc = BrowserDocument::new(container.clone().into()).unwrap();
    let quote = marginalia_browser::Quote::new("text", 5, "node/2/body/en/full".into()).unwrap();
    let range = locate_quote(&doc, &doc.root(), "data-note-region-id", &quote).unwrap();
    let region: Element = range.region.dyn_into().unwrap();
    assert_eq!(region.tag_name(), "DIV");
    container.remove();
}

// === Host state ===

#[wasm_bindgen_test]
fn test_host_state_restored_after_guard() {
    let container = mount("<p>restore me</p>");
    let document = web_sys::window().unwrap().document().unwrap();
    let body = document.body().unwrap();
    body.set_spellcheck(true);

    let mut doc = BrowserDocument::new(container.clone().into()).unwrap();
    {
        let guard = HostStateGuard::acquire(&mut doc);
        assert!(!guard.document().body().unwrap().spellcheck());
    }
    assert!(body.spellcheck());
    container.remove();
}
