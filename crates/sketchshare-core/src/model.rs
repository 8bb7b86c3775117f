//! Drawing data handed to the export pipeline.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// One drawn shape as the drawing engine serializes it.
///
/// The attributes belong to the engine. The exporter only relies on the
/// `id` field being a runtime handle that must not leak into shared files.
pub type ShapeRecord = Value;

/// Attribute holding the runtime identifier of a shape.
pub const TRANSIENT_ID_KEY: &str = "id";

/// Ordered save-point of the canvas (back to front).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrawingSnapshot {
    records: Vec<ShapeRecord>,
}

impl DrawingSnapshot {
    /// Create a snapshot from records in render order.
    pub fn new(records: Vec<ShapeRecord>) -> Self {
        Self { records }
    }

    /// Create an empty snapshot.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a snapshot from a JSON array.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn records(&self) -> &[ShapeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Copy of the snapshot with the transient `id` removed from every record.
    ///
    /// Attribute order and record order are preserved. Records that are not
    /// JSON objects are copied as they are.
    pub fn without_ids(&self) -> Self {
        let records = self
            .records
            .iter()
            .map(|record| match record {
                Value::Object(map) => Value::Object(
                    map.iter()
                        .filter(|(key, _)| key.as_str() != TRANSIENT_ID_KEY)
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect(),
                ),
                other => other.clone(),
            })
            .collect();
        Self { records }
    }

    /// Pretty-printed (2-space) JSON array of the id-free records.
    ///
    /// `</` is written as `<\/` so the payload can sit inside a `<script>`
    /// element without closing it early. Both forms decode to the same JSON.
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string_pretty(&self.without_ids())?;
        Ok(json.replace("</", "<\\/"))
    }
}

impl From<Vec<ShapeRecord>> for DrawingSnapshot {
    fn from(records: Vec<ShapeRecord>) -> Self {
        Self::new(records)
    }
}

/// Which flavour of shared page to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShareMode {
    /// Recipient can keep drawing and editing code.
    #[default]
    Editable,
    /// Toolbar hidden, canvas and editor locked.
    ViewOnly,
}

impl ShareMode {
    /// Default download name for this mode.
    pub fn default_file_name(self) -> &'static str {
        match self {
            ShareMode::Editable => "sketch-editable.html",
            ShareMode::ViewOnly => "sketch-view-only.html",
        }
    }

    pub fn is_view_only(self) -> bool {
        matches!(self, ShareMode::ViewOnly)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShareMode::Editable => "editable",
            ShareMode::ViewOnly => "view-only",
        }
    }
}

impl fmt::Display for ShareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShareMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "editable" | "edit" => Ok(ShareMode::Editable),
            "view-only" | "view_only" | "viewonly" | "view" => Ok(ShareMode::ViewOnly),
            other => Err(format!("Unknown share mode: {}", other)),
        }
    }
}
