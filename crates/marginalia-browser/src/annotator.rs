//! JavaScript-facing annotator.
//!
//! Wires DOM events and timers to the core state machines. Callbacks into
//! JavaScript are always made after the state borrow is released, so a
//! callback may call straight back into the annotator.

use std::cell::{RefCell, RefMut};
use std::rc::{Rc, Weak};

use gloo_events::EventListener;
use gloo_timers::callback::Timeout;
use marginalia_core::{
    AddOutcome, AnnotationOverlayManager, AnnotatorConfig, ContentSignal, ContextTarget,
    DocumentTree, HoverController, Instant, Note, NoteId, PendingSelection, Rect,
    SelectionTracker, ShowSummary, TrackerEffect, place_above,
};
use serde::Serialize;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, HtmlElement, Node};

use crate::dom::BrowserDocument;
use crate::error::BrowserError;

fn millis(ms: u64) -> u32 {
    u32::try_from(ms).unwrap_or(u32::MAX)
}

/// Bulk reconciliation result as seen from JavaScript.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryJs {
    highlighted: usize,
    already_shown: usize,
    not_found: usize,
    invalid: usize,
}

impl From<ShowSummary> for SummaryJs {
    fn from(s: ShowSummary) -> Self {
        Self {
            highlighted: s.highlighted,
            already_shown: s.already_shown,
            not_found: s.not_found,
            invalid: s.invalid,
        }
    }
}

/// A captured selection as handed to the creation form.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PendingJs {
    quote_text: String,
    quote_offset: usize,
    region_id: String,
    add_url: Option<String>,
}

impl From<PendingSelection> for PendingJs {
    fn from(p: PendingSelection) -> Self {
        Self {
            quote_text: p.quote.text,
            quote_offset: p.quote.offset,
            region_id: p.quote.region_id.as_str().to_string(),
            add_url: p.add_url,
        }
    }
}

/// A deferred call into JavaScript, made once the state is released.
type Callback = Option<(js_sys::Function, JsValue)>;

fn invoke(callback: Callback) {
    if let Some((f, arg)) = callback {
        if let Err(e) = f.call1(&JsValue::NULL, &arg) {
            tracing::warn!(target: "marginalia::overlay", error = ?e, "callback threw");
        }
    }
}

struct State {
    doc: BrowserDocument,
    config: AnnotatorConfig,
    overlay: AnnotationOverlayManager<Node>,
    tracker: SelectionTracker<Node>,
    hover: HoverController,
    add_affordance: HtmlElement,
    view_affordance: HtmlElement,
    selection_timer: Option<Timeout>,
    hover_timer: Option<Timeout>,
    on_add: Option<js_sys::Function>,
    on_view: Option<js_sys::Function>,
}

impl State {
    fn create_affordance(
        doc: &BrowserDocument,
        class: &str,
        label: &str,
    ) -> Result<HtmlElement, BrowserError> {
        let el = doc
            .document()
            .create_element("a")
            .map_err(BrowserError::dom)?
            .dyn_into::<HtmlElement>()
            .map_err(|_| BrowserError::Dom("affordance is not an HTML element".into()))?;
        el.set_class_name(class);
        el.set_text_content(Some(label));
        let style = el.style();
        style
            .set_property("position", "absolute")
            .map_err(BrowserError::dom)?;
        style
            .set_property("display", "none")
            .map_err(BrowserError::dom)?;
        let body = doc.document().body().ok_or(BrowserError::NoBody)?;
        body.append_child(&el).map_err(BrowserError::dom)?;
        Ok(el)
    }

    fn hide(el: &HtmlElement) {
        let _ = el.style().set_property("display", "none");
    }

    /// Show `el` centred above `anchor`.
    fn show_above(&self, el: &HtmlElement, href: Option<&str>, anchor: Rect) {
        match href {
            Some(href) => {
                let _ = el.set_attribute("href", href);
            }
            None => {
                let _ = el.remove_attribute("href");
            }
        }
        let style = el.style();
        let _ = style.set_property("display", "block");
        let popup = (el.offset_width() as f64, el.offset_height() as f64);
        let pos = place_above(
            anchor,
            popup,
            self.doc.scroll_offset(),
            self.config.affordance_gap_px,
        );
        let _ = style.set_property("top", &format!("{}px", pos.top));
        let _ = style.set_property("left", &format!("{}px", pos.left));
    }

    fn on_selection_change(&mut self, weak: Weak<RefCell<State>>) {
        let snapshot = self.doc.selection_snapshot();
        let effect = self
            .tracker
            .on_selection_change(&self.doc, snapshot, Instant::now());
        self.selection_timer = None;
        Self::hide(&self.add_affordance);
        if let TrackerEffect::Debounce { generation } = effect {
            let delay = millis(self.config.selection_quiet_period_ms);
            self.selection_timer = Some(Timeout::new(delay, move || {
                let Some(state) = weak.upgrade() else { return };
                let Ok(mut state) = state.try_borrow_mut() else { return };
                state.on_selection_settled(generation);
            }));
        }
    }

    fn on_selection_settled(&mut self, generation: u64) {
        let Some(pending) = self.tracker.fire(&self.doc, generation) else {
            return;
        };
        let add = self.add_affordance.clone();
        self.show_above(&add, pending.add_url.as_deref(), pending.bounds);
    }

    fn on_add_click(&mut self, event: &web_sys::Event) -> Callback {
        Self::hide(&self.add_affordance);
        let on_add = self.on_add.clone()?;
        event.prevent_default();
        let pending = self.tracker.take_pending()?;
        let target = ContextTarget::Quote(pending.quote.clone());
        if let Err(err) = self.overlay.show_context(&mut self.doc, target) {
            tracing::warn!(target: "marginalia::overlay", %err, "could not preview quote");
        }
        let arg = serde_wasm_bindgen::to_value(&PendingJs::from(pending)).ok()?;
        Some((on_add, arg))
    }

    fn on_mouse_over(&mut self, event: &web_sys::Event) {
        let Some(node) = event.target().and_then(|t| t.dyn_into::<Node>().ok()) else {
            return;
        };
        let Some(id) = self.overlay.note_for_node(&self.doc, &node) else {
            return;
        };
        self.hover_timer = None;
        let marker = self
            .overlay
            .highlight(&id)
            .and_then(|hl| hl.markers.first())
            .and_then(|m| m.dyn_ref::<Element>().cloned());
        let affordance = self.hover.enter_highlight(id);
        if let Some(marker) = marker {
            let rect = self.doc.client_rect(&marker);
            let view = self.view_affordance.clone();
            self.show_above(&view, Some(&affordance.url), rect);
        }
    }

    fn on_mouse_out(&mut self, event: &web_sys::Event, weak: Weak<RefCell<State>>) {
        let Some(node) = event.target().and_then(|t| t.dyn_into::<Node>().ok()) else {
            return;
        };
        if self.overlay.note_for_node(&self.doc, &node).is_none() {
            return;
        }
        let generation = self.hover.leave_highlight(Instant::now());
        self.schedule_hover_hide(generation, weak);
    }

    fn schedule_hover_hide(&mut self, generation: Option<u64>, weak: Weak<RefCell<State>>) {
        let Some(generation) = generation else { return };
        let delay = millis(self.config.hover_hide_delay_ms);
        self.hover_timer = Some(Timeout::new(delay, move || {
            let Some(state) = weak.upgrade() else { return };
            let Ok(mut state) = state.try_borrow_mut() else { return };
            if state.hover.fire(generation) {
                Self::hide(&state.view_affordance);
            }
        }));
    }

    fn on_view_click(&mut self, event: &web_sys::Event) -> Callback {
        Self::hide(&self.view_affordance);
        self.hover_timer = None;
        let id = self.hover.click_affordance()?;
        if let Err(err) = self
            .overlay
            .show_context(&mut self.doc, ContextTarget::Note(id.clone()))
        {
            tracing::warn!(target: "marginalia::overlay", %err, note = %id, "could not focus note");
        }
        let on_view = self.on_view.clone()?;
        event.prevent_default();
        Some((on_view, JsValue::from_str(id.as_str())))
    }

    fn drop_affordances(&mut self) {
        self.selection_timer = None;
        self.hover_timer = None;
        self.hover.reset();
        self.tracker.cancel();
        self.add_affordance.remove();
        self.view_affordance.remove();
    }
}

/// Note-anchoring overlay for a rendered page.
#[wasm_bindgen(js_name = Annotator)]
pub struct JsAnnotator {
    state: Rc<RefCell<State>>,
    listeners: Vec<EventListener>,
}

impl JsAnnotator {
    fn state(&self) -> Result<RefMut<'_, State>, BrowserError> {
        self.state
            .try_borrow_mut()
            .map_err(|_| BrowserError::Dom("annotator is busy".into()))
    }
}

fn parse_config(config: &JsValue) -> Result<AnnotatorConfig, BrowserError> {
    if config.is_undefined() || config.is_null() {
        return Ok(AnnotatorConfig::default());
    }
    let json = stringify(config)?;
    Ok(AnnotatorConfig::from_json(&json)?)
}

fn stringify(value: &JsValue) -> Result<String, BrowserError> {
    js_sys::JSON::stringify(value)
        .map_err(BrowserError::dom)?
        .as_string()
        .ok_or_else(|| BrowserError::Deserialize("value is not JSON-serialisable".into()))
}

fn note_id(value: &JsValue) -> Result<NoteId, BrowserError> {
    if let Some(s) = value.as_string() {
        return Ok(NoteId::new(s));
    }
    match value.as_f64() {
        Some(n) if n.fract() == 0.0 && n >= 0.0 => Ok(NoteId::from(n as u64)),
        _ => Err(BrowserError::Deserialize(
            "note id must be a string or an integer".into(),
        )),
    }
}

fn parse_signal(kind: &str) -> Result<ContentSignal, BrowserError> {
    match kind {
        "activated" => Ok(ContentSignal::EditingActivated),
        "deactivated" => Ok(ContentSignal::EditingDeactivated),
        "committed" => Ok(ContentSignal::EditingCommitted),
        other => Err(BrowserError::Deserialize(format!(
            "unknown editor signal {other:?}"
        ))),
    }
}

#[wasm_bindgen(js_class = Annotator)]
impl JsAnnotator {
    /// Attach to `root` (or `document.body`).
    ///
    /// `onAdd` receives the captured selection when the "add note" affordance
    /// is clicked; `onView` receives the note id when "view note" is clicked.
    /// Without a callback the affordance behaves as a plain link.
    #[wasm_bindgen(constructor)]
    pub fn new(
        root: Option<HtmlElement>,
        config: JsValue,
        on_add: Option<js_sys::Function>,
        on_view: Option<js_sys::Function>,
    ) -> Result<JsAnnotator, JsError> {
        let config = parse_config(&config)?;
        let doc = match root {
            Some(root) => BrowserDocument::new(root.into())?,
            None => BrowserDocument::from_body()?,
        };
        let add_affordance =
            State::create_affordance(&doc, &config.affordance_class, &config.add_note_label)?;
        let view_affordance =
            State::create_affordance(&doc, &config.affordance_class, &config.view_note_label)?;

        let root = doc.root();
        let document = doc.document().clone();
        let state = Rc::new(RefCell::new(State {
            overlay: AnnotationOverlayManager::new(config.clone()),
            tracker: SelectionTracker::new(&config),
            hover: HoverController::new(&config),
            doc,
            config,
            add_affordance: add_affordance.clone(),
            view_affordance: view_affordance.clone(),
            selection_timer: None,
            hover_timer: None,
            on_add,
            on_view,
        }));

        let listeners = vec![
            listen(&state, &document, "selectionchange", |s, _, weak| {
                s.on_selection_change(weak);
                None
            }),
            listen(&state, &root, "mouseover", |s, e, _| {
                s.on_mouse_over(e);
                None
            }),
            listen(&state, &root, "mouseout", |s, e, weak| {
                s.on_mouse_out(e, weak);
                None
            }),
            listen(&state, &add_affordance, "click", |s, e, _| s.on_add_click(e)),
            listen(&state, &view_affordance, "mouseenter", |s, _, _| {
                s.hover_timer = None;
                s.hover.enter_affordance();
                None
            }),
            listen(&state, &view_affordance, "mouseleave", |s, _, weak| {
                let generation = s.hover.leave_affordance(Instant::now());
                s.schedule_hover_hide(generation, weak);
                None
            }),
            listen(&state, &view_affordance, "click", |s, e, _| s.on_view_click(e)),
        ];

        tracing::info!(target: "marginalia::overlay", "annotator attached");
        Ok(JsAnnotator { state, listeners })
    }

    /// Reconcile against the full note list from the persistence service.
    ///
    /// Notes that fail to deserialise are skipped and counted as invalid.
    #[wasm_bindgen(js_name = showAll)]
    pub fn show_all(&self, notes: JsValue) -> Result<JsValue, JsError> {
        let raw: Vec<serde_json::Value> = serde_json::from_str(&stringify(&notes)?)?;
        let mut skipped = 0;
        let notes: Vec<Note> = raw
            .into_iter()
            .filter_map(|v| match serde_json::from_value::<Note>(v) {
                Ok(note) => Some(note),
                Err(err) => {
                    tracing::warn!(target: "marginalia::overlay", %err, "skipping malformed note");
                    skipped += 1;
                    None
                }
            })
            .collect();

        let mut state = self.state()?;
        let state = &mut *state;
        let mut summary = state.overlay.show_all(&mut state.doc, notes);
        summary.invalid += skipped;
        Ok(serde_wasm_bindgen::to_value(&SummaryJs::from(summary))?)
    }

    /// Show a single note, e.g. right after the creation form succeeded.
    ///
    /// Returns `"highlighted"`, `"alreadyShown"` or `"notFound"`.
    pub fn add(&self, note: JsValue) -> Result<String, JsError> {
        let note: Note = serde_json::from_str(&stringify(&note)?)?;
        let mut state = self.state()?;
        let state = &mut *state;
        let outcome = state.overlay.add(&mut state.doc, note)?;
        Ok(match outcome {
            AddOutcome::Highlighted => "highlighted",
            AddOutcome::AlreadyShown => "alreadyShown",
            AddOutcome::NotFound(_) => "notFound",
        }
        .to_string())
    }

    /// Remove a note's highlight. Returns whether one was shown.
    pub fn remove(&self, id: JsValue) -> Result<bool, JsError> {
        let id = note_id(&id)?;
        let mut state = self.state()?;
        let state = &mut *state;
        if state.hover.visible() == Some(&id) {
            state.hover.reset();
            State::hide(&state.view_affordance);
        }
        Ok(state.overlay.remove(&mut state.doc, &id)?)
    }

    #[wasm_bindgen(js_name = removeAll)]
    pub fn remove_all(&self) -> Result<(), JsError> {
        let mut state = self.state()?;
        let state = &mut *state;
        state.hover.reset();
        State::hide(&state.view_affordance);
        state.overlay.remove_all(&mut state.doc);
        Ok(())
    }

    /// Content replacement from inline editing: `"activated"`,
    /// `"deactivated"` or `"committed"`.
    #[wasm_bindgen(js_name = editorSignal)]
    pub fn editor_signal(&self, kind: &str) -> Result<JsValue, JsError> {
        let signal = parse_signal(kind)?;
        let mut state = self.state()?;
        let state = &mut *state;
        if signal == ContentSignal::EditingActivated {
            state.hover.reset();
            State::hide(&state.view_affordance);
            State::hide(&state.add_affordance);
        }
        let summary = state.overlay.handle_signal(&mut state.doc, signal);
        Ok(serde_wasm_bindgen::to_value(&SummaryJs::from(summary))?)
    }

    /// Claim the captured selection, if any. `null` otherwise.
    #[wasm_bindgen(js_name = takePendingSelection)]
    pub fn take_pending_selection(&self) -> Result<JsValue, JsError> {
        let mut state = self.state()?;
        match state.tracker.take_pending() {
            Some(pending) => Ok(serde_wasm_bindgen::to_value(&PendingJs::from(pending))?),
            None => Ok(JsValue::NULL),
        }
    }

    /// Focus a displayed note, e.g. when its detail dialog opens.
    #[wasm_bindgen(js_name = showContext)]
    pub fn show_context(&self, id: JsValue) -> Result<bool, JsError> {
        let id = note_id(&id)?;
        let mut state = self.state()?;
        let state = &mut *state;
        Ok(state
            .overlay
            .show_context(&mut state.doc, ContextTarget::Note(id))?)
    }

    /// Drop any focus or preview, e.g. when a dialog closes.
    #[wasm_bindgen(js_name = clearContext)]
    pub fn clear_context(&self) -> Result<(), JsError> {
        let mut state = self.state()?;
        let state = &mut *state;
        Ok(state.overlay.clear_context(&mut state.doc)?)
    }

    /// Ids of the notes currently highlighted.
    pub fn shown(&self) -> Result<Vec<String>, JsError> {
        let state = self.state()?;
        Ok(state
            .overlay
            .shown()
            .iter()
            .map(|id| id.as_str().to_string())
            .collect())
    }

    /// Detach listeners, remove every highlight and the affordances.
    pub fn destroy(&mut self) -> Result<(), JsError> {
        self.listeners.clear();
        let mut state = self.state()?;
        let state = &mut *state;
        state.overlay.remove_all(&mut state.doc);
        state.drop_affordances();
        tracing::info!(target: "marginalia::overlay", "annotator detached");
        Ok(())
    }
}

/// Register `handler` for `event` on `target`. The handler gets the state,
/// the event and a weak handle for scheduling timers; its callback, if
/// any, runs after the state is released.
fn listen<F>(
    state: &Rc<RefCell<State>>,
    target: &web_sys::EventTarget,
    event: &'static str,
    handler: F,
) -> EventListener
where
    F: Fn(&mut State, &web_sys::Event, Weak<RefCell<State>>) -> Callback + 'static,
{
    let weak = Rc::downgrade(state);
    EventListener::new(target, event, move |e| {
        let Some(state) = weak.upgrade() else { return };
        let callback = match state.try_borrow_mut() {
            Ok(mut s) => handler(&mut s, e, weak.clone()),
            Err(_) => {
                tracing::trace!(target: "marginalia::overlay", event, "state busy, event dropped");
                return;
            }
        };
        invoke(callback);
    })
}
