//! Note records and quotes as consumed from the persistence boundary.
//!
//! The core only ever reads a note's id, region id and quote fields. Every
//! other field is carried through untouched in [`Note::extra`].

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use smol_str::{SmolStr, ToSmolStr};

use crate::error::AnchorError;

/// Note identifier. The wire format may use a string or an integer; both
/// normalise to the same string form so `1` and `"1"` are one key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NoteId(SmolStr);

impl NoteId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for NoteId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum WireId {
            Int(i64),
            Str(SmolStr),
        }

        Ok(match WireId::deserialize(deserializer)? {
            WireId::Int(n) => NoteId(n.to_smolstr()),
            WireId::Str(s) => NoteId(s),
        })
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NoteId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<u64> for NoteId {
    fn from(n: u64) -> Self {
        Self(n.to_smolstr())
    }
}

/// Content region id, as written by the renderer into the region attribute.
///
/// Usually a composite `entity_type/entity_id/field_name/langcode/view_mode`
/// key. Only meaningful for the current render session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(SmolStr);

/// The components of a composite region id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionParts {
    pub entity_type: SmolStr,
    pub entity_id: SmolStr,
    pub field_name: SmolStr,
    pub langcode: SmolStr,
    pub view_mode: SmolStr,
}

impl RegionId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split a composite id. `None` unless there are exactly five
    /// non-empty segments.
    pub fn parts(&self) -> Option<RegionParts> {
        let segments: Vec<&str> = self.0.split('/').collect();
        let [entity_type, entity_id, field_name, langcode, view_mode] = segments.as_slice() else {
            return None;
        };
        if segments.iter().any(|s| s.is_empty()) {
            return None;
        }
        Some(RegionParts {
            entity_type: SmolStr::new(entity_type),
            entity_id: SmolStr::new(entity_id),
            field_name: SmolStr::new(field_name),
            langcode: SmolStr::new(langcode),
            view_mode: SmolStr::new(view_mode),
        })
    }

    /// Fill `{entity_type}`, `{entity_id}`, `{field_name}`, `{langcode}` and
    /// `{view_mode}` placeholders in a URL template.
    pub fn expand_template(&self, template: &str) -> Option<String> {
        let parts = self.parts()?;
        Some(
            template
                .replace("{entity_type}", &parts.entity_type)
                .replace("{entity_id}", &parts.entity_id)
                .replace("{field_name}", &parts.field_name)
                .replace("{langcode}", &parts.langcode)
                .replace("{view_mode}", &parts.view_mode),
        )
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Captured text plus where it was captured.
///
/// `offset` is advisory: the live text may have drifted since capture.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub text: String,
    pub offset: usize,
    pub region_id: RegionId,
}

impl Quote {
    /// Build a quote, rejecting empty text or an empty region id.
    pub fn new(
        text: impl Into<String>,
        offset: usize,
        region_id: RegionId,
    ) -> Result<Self, AnchorError> {
        let text = text.into();
        if text.is_empty() {
            return Err(AnchorError::invalid_quote("quote text is empty"));
        }
        if region_id.as_str().is_empty() {
            return Err(AnchorError::invalid_quote("region id is empty"));
        }
        Ok(Self {
            text,
            offset,
            region_id,
        })
    }
}

/// A note record from the persistence service.
///
/// Quote fields are optional on the wire; a note missing them simply cannot
/// be anchored. Older services send `field_id` and `quote` instead of
/// `region_id` and `quote_text`; those land in `extra` and are read as a
/// fallback.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_id: Option<RegionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_offset: Option<u64>,
    /// Everything else the service sent, carried through as-is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Note {
    pub fn new(id: impl Into<NoteId>, quote: Quote) -> Self {
        Self {
            id: id.into(),
            region_id: Some(quote.region_id),
            quote_text: Some(quote.text),
            quote_offset: Some(quote.offset as u64),
            extra: serde_json::Map::new(),
        }
    }

    /// The anchorable part of this note. A missing offset means "start of
    /// region"; missing text or region is an invalid quote.
    pub fn quote(&self) -> Result<Quote, AnchorError> {
        let region_id = self
            .region_id
            .clone()
            .or_else(|| self.legacy_str("field_id").map(RegionId::new))
            .ok_or_else(|| AnchorError::invalid_quote("note has no region id"))?;
        let text = self
            .quote_text
            .clone()
            .or_else(|| self.legacy_str("quote").map(str::to_string))
            .ok_or_else(|| AnchorError::invalid_quote("note has no quote text"))?;
        let offset = self
            .quote_offset
            .map(|o| usize::try_from(o).unwrap_or(usize::MAX))
            .unwrap_or(0);
        Quote::new(text, offset, region_id)
    }

    fn legacy_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(serde_json::Value::as_str)
    }
}

/// Creation request assembled from a pending selection and user input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub quote_text: String,
    pub quote_offset: usize,
    pub region_id: RegionId,
    pub note_body: String,
}

impl NoteDraft {
    /// Build a draft. Quotes longer than `max_quote_len` chars cannot be
    /// stored by the service and are rejected up front.
    pub fn new(
        quote: Quote,
        note_body: impl Into<String>,
        max_quote_len: usize,
    ) -> Result<Self, AnchorError> {
        let quote = Quote::new(quote.text, quote.offset, quote.region_id)?;
        if quote.text.chars().count() > max_quote_len {
            return Err(AnchorError::invalid_quote("quote is too long"));
        }
        Ok(Self {
            quote_text: quote.text,
            quote_offset: quote.offset,
            region_id: quote.region_id,
            note_body: note_body.into(),
        })
    }

    pub fn quote(&self) -> Quote {
        Quote {
            text: self.quote_text.clone(),
            offset: self.quote_offset,
            region_id: self.region_id.clone(),
        }
    }
}
