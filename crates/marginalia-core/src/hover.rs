//! The "view note" affordance shown while hovering a highlight.
//!
//! Leaving either the highlight or the affordance only schedules the hide.
//! Re-entering either one before the delay elapses cancels it, so the pointer
//! can cross the gap between them without the affordance flickering.

use web_time::Instant;

use crate::config::AnnotatorConfig;
use crate::debounce::Debouncer;
use crate::note::NoteId;

/// What to show when a highlight is hovered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewAffordance {
    pub note_id: NoteId,
    pub url: String,
}

pub struct HoverController {
    hide: Debouncer<()>,
    visible: Option<NoteId>,
    view_url_template: String,
}

impl HoverController {
    pub fn new(config: &AnnotatorConfig) -> Self {
        Self {
            hide: Debouncer::new(config.hover_hide_delay()),
            visible: None,
            view_url_template: config.view_note_url_template.clone(),
        }
    }

    /// Note whose affordance is currently shown.
    pub fn visible(&self) -> Option<&NoteId> {
        self.visible.as_ref()
    }

    pub fn hide_pending(&self) -> bool {
        self.hide.is_pending()
    }

    /// Pointer entered the highlight of `note_id`.
    pub fn enter_highlight(&mut self, note_id: NoteId) -> ViewAffordance {
        self.hide.cancel();
        let url = self.view_url_template.replace("{id}", note_id.as_str());
        self.visible = Some(note_id.clone());
        ViewAffordance { note_id, url }
    }

    /// Pointer left a highlight. Returns the generation of the scheduled
    /// hide, or `None` when nothing is shown.
    pub fn leave_highlight(&mut self, now: Instant) -> Option<u64> {
        self.schedule_hide(now)
    }

    /// Pointer is over the affordance itself.
    pub fn enter_affordance(&mut self) {
        if self.visible.is_some() {
            self.hide.cancel();
        }
    }

    pub fn leave_affordance(&mut self, now: Instant) -> Option<u64> {
        self.schedule_hide(now)
    }

    fn schedule_hide(&mut self, now: Instant) -> Option<u64> {
        self.visible.as_ref()?;
        Some(self.hide.schedule((), now))
    }

    /// Hide if the delay has elapsed. Returns whether the affordance was hidden.
    pub fn poll(&mut self, now: Instant) -> bool {
        self.hide.poll(now).is_some() && self.visible.take().is_some()
    }

    /// Hide from a host timer callback. Stale generations do nothing.
    pub fn fire(&mut self, generation: u64) -> bool {
        self.hide.fire(generation).is_some() && self.visible.take().is_some()
    }

    /// The affordance was clicked: hide it at once and return the note to
    /// focus.
    pub fn click_affordance(&mut self) -> Option<NoteId> {
        self.hide.cancel();
        let note = self.visible.take();
        if let Some(id) = &note {
            tracing::debug!(target: "marginalia::overlay", note = %id, "view affordance clicked");
        }
        note
    }

    /// Hide immediately, e.g. because the highlight itself went away.
    pub fn reset(&mut self) {
        self.hide.cancel();
        self.visible = None;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn controller() -> HoverController {
        HoverController::new(&AnnotatorConfig::default())
    }

    #[test]
    fn test_enter_shows_view_link() {
        let mut hover = controller();
        let shown = hover.enter_highlight(NoteId::new("12"));
        assert_eq!(shown.url, "/note/12");
        assert_eq!(hover.visible(), Some(&NoteId::new("12")));
    }

    #[test]
    fn test_trailing_hide_after_delay() {
        let mut hover = controller();
        let t0 = Instant::now();
        hover.enter_highlight(NoteId::new("1"));
        hover.leave_highlight(t0).unwrap();
        assert!(!hover.poll(t0 + Duration::from_millis(499)));
        assert!(hover.visible().is_some());
        assert!(hover.poll(t0 + Duration::from_millis(500)));
        assert!(hover.visible().is_none());
    }

    #[test]
    fn test_transit_to_affordance_keeps_it_visible() {
        let mut hover = controller();
        let t0 = Instant::now();
        hover.enter_highlight(NoteId::new("1"));
        let generation = hover.leave_highlight(t0).unwrap();
        hover.enter_affordance();
        assert!(!hover.fire(generation));
        assert!(!hover.poll(t0 + Duration::from_secs(1)));
        assert_eq!(hover.visible(), Some(&NoteId::new("1")));

        let generation = hover.leave_affordance(t0 + Duration::from_secs(2)).unwrap();
        assert!(hover.fire(generation));
        assert!(hover.visible().is_none());
    }

    #[test]
    fn test_moving_between_highlights_switches_note() {
        let mut hover = controller();
        let t0 = Instant::now();
        hover.enter_highlight(NoteId::new("1"));
        let generation = hover.leave_highlight(t0).unwrap();
        hover.enter_highlight(NoteId::new("2"));
        assert!(!hover.fire(generation));
        assert_eq!(hover.visible(), Some(&NoteId::new("2")));
    }

    #[test]
    fn test_click_hides_and_returns_note() {
        let mut hover = controller();
        hover.enter_highlight(NoteId::new("5"));
        assert_eq!(hover.click_affordance(), Some(NoteId::new("5")));
        assert!(hover.visible().is_none());
        assert_eq!(hover.click_affordance(), None);
    }

    #[test]
    fn test_leave_without_visible_schedules_nothing() {
        let mut hover = controller();
        assert_eq!(hover.leave_highlight(Instant::now()), None);
        assert!(!hover.hide_pending());
    }
}
