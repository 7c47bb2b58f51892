//! Annotator configuration.
//!
//! Every field has a default, so a host only needs to supply what it changes:
//!
//! ```
//! use marginalia_core::AnnotatorConfig;
//!
//! let config = AnnotatorConfig::from_json(r#"{ "selection_quiet_period_ms": 250 }"#).unwrap();
//! assert_eq!(config.selection_quiet_period_ms, 250);
//! assert_eq!(config.marker_tag, "span");
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::AnchorError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    /// Attribute the renderer writes on each content region, holding its id.
    pub region_attribute: SmolStr,
    /// Attribute written on persisted highlight markers, holding the note id.
    pub highlight_id_attribute: SmolStr,
    /// Element used for highlight markers.
    pub marker_tag: SmolStr,
    /// Classes on every persisted highlight marker.
    pub highlight_classes: Vec<SmolStr>,
    /// Class marking a highlight as the focus of an open note view or form.
    pub context_class: SmolStr,
    /// Added alongside `context_class` on a persisted highlight.
    pub context_existing_class: SmolStr,
    /// Added alongside `context_class` on a preview highlight.
    pub context_new_class: SmolStr,
    /// Quiet period before a selection becomes a pending quote.
    pub selection_quiet_period_ms: u64,
    /// Trailing delay before the "view note" affordance hides.
    pub hover_hide_delay_ms: u64,
    /// Vertical gap between an affordance and what it points at, in px.
    pub affordance_gap_px: f64,
    /// Link for the "add note" affordance. Region id parts fill
    /// `{entity_type}`, `{entity_id}`, `{field_name}`, `{langcode}` and `{view_mode}`.
    pub add_note_url_template: String,
    /// Link for the "view note" affordance. `{id}` is the note id.
    pub view_note_url_template: String,
    /// Longest quote the persistence service accepts, in chars.
    pub max_quote_len: usize,
    /// Class on the floating affordance links.
    pub affordance_class: SmolStr,
    pub add_note_label: String,
    pub view_note_label: String,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            region_attribute: SmolStr::new_static("data-note-region-id"),
            highlight_id_attribute: SmolStr::new_static("data-note-highlight-id"),
            marker_tag: SmolStr::new_static("span"),
            highlight_classes: vec![SmolStr::new_static("note-highlight")],
            context_class: SmolStr::new_static("note-contextual-highlight"),
            context_existing_class: SmolStr::new_static("existing"),
            context_new_class: SmolStr::new_static("new"),
            selection_quiet_period_ms: 500,
            hover_hide_delay_ms: 500,
            affordance_gap_px: 5.0,
            add_note_url_template:
                "/note/add/{entity_type}/{entity_id}/{field_name}/{langcode}/{view_mode}".into(),
            view_note_url_template: "/note/{id}".into(),
            max_quote_len: 255,
            affordance_class: SmolStr::new_static("note-tooltip"),
            add_note_label: "Add note".into(),
            view_note_label: "View note".into(),
        }
    }
}

impl AnnotatorConfig {
    /// Parse and validate a JSON configuration object.
    pub fn from_json(json: &str) -> Result<Self, AnchorError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| AnchorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnchorError> {
        let required = [
            ("region_attribute", &self.region_attribute),
            ("highlight_id_attribute", &self.highlight_id_attribute),
            ("marker_tag", &self.marker_tag),
            ("context_class", &self.context_class),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(AnchorError::Config(format!("{name} must not be empty")));
            }
        }
        if self.highlight_id_attribute == self.region_attribute {
            return Err(AnchorError::Config(
                "highlight_id_attribute and region_attribute must differ".into(),
            ));
        }
        if self.max_quote_len == 0 {
            return Err(AnchorError::Config("max_quote_len must be positive".into()));
        }
        Ok(())
    }

    pub fn selection_quiet_period(&self) -> Duration {
        Duration::from_millis(self.selection_quiet_period_ms)
    }

    pub fn hover_hide_delay(&self) -> Duration {
        Duration::from_millis(self.hover_hide_delay_ms)
    }

    /// Classes applied to a contextual highlight of the given flavour.
    pub fn context_classes(&self, existing: bool) -> [SmolStr; 2] {
        let flavour = if existing {
            &self.context_existing_class
        } else {
            &self.context_new_class
        };
        [self.context_class.clone(), flavour.clone()]
    }
}
