//! Embedding drawing data and editor text into the page markup.
//!
//! The splice runs in three passes over the page source:
//! the `premadeSketch` payload goes in through the first matching
//! [`InsertionStrategy`], the editor text replaces the code textarea content,
//! and view-only pages get their locking assets.

mod escape;
mod strategies;
mod view_only;

pub use escape::escape_html;
pub use strategies::{
    BodyEnd, CommentedDeclaration, InitCall, InsertionStrategy, LooseDeclaration, ScriptBoundary,
    StrictDeclaration, default_chain, insert_payload,
};
pub use view_only::{BADGE_TEXT, SCRIPT_MARKER, STYLE_MARKER};

use crate::model::{DrawingSnapshot, ShareMode};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static TEXTAREA_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<textarea\b[^>]*>").expect("valid textarea pattern"));

static TEXTAREA_CLOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</textarea\s*>").expect("valid textarea close pattern")
});

/// Warning shown when the payload could not be anchored anywhere.
pub const ANCHOR_MISSING_MESSAGE: &str = "Warning: Could not properly integrate shapes into the \
     shared file. The drawing may not appear correctly.";

/// Where the payload ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// Replaced a balanced `const premadeSketch = [...];`.
    StrictDeclaration,
    /// Replaced a declaration whose body only holds comments.
    CommentedDeclaration,
    /// Replaced a declaration up to its first `];`.
    LooseDeclaration,
    /// Inserted before `openDB().then(`.
    InitCall,
    /// Inserted at the end of the script preceding the share script tag.
    ScriptBoundary,
    /// New script block before `</body>`.
    BodyEnd,
}

impl Anchor {
    pub fn describe(self) -> &'static str {
        match self {
            Anchor::StrictDeclaration => "existing premadeSketch declaration",
            Anchor::CommentedDeclaration => "commented premadeSketch declaration",
            Anchor::LooseDeclaration => "premadeSketch declaration (first terminator)",
            Anchor::InitCall => "openDB() initialization",
            Anchor::ScriptBoundary => "end of main script",
            Anchor::BodyEnd => "closing body tag",
        }
    }
}

/// Element ids and tags the splicer recognises in the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpliceOptions {
    /// `id` of the textarea backing the code editor.
    pub code_container_id: String,
    /// Hidden in view-only pages.
    pub toolbar_id: String,
    /// Drawing surface that stops receiving pointer events.
    pub canvas_id: String,
    /// Pulled up to the top once the toolbar is hidden.
    pub editor_container_id: String,
    /// `src` of the script tag that loads the share script itself.
    pub include_script_src: String,
}

impl Default for SpliceOptions {
    fn default() -> Self {
        Self {
            code_container_id: "code".to_string(),
            toolbar_id: "toolbar".to_string(),
            canvas_id: "overlayCanvas".to_string(),
            editor_container_id: "editor-container".to_string(),
            include_script_src: "js/share.js".to_string(),
        }
    }
}

/// Result of a splice.
#[derive(Debug, Clone, PartialEq)]
pub struct SpliceOutput {
    /// The shareable page.
    pub markup: String,
    /// Strategy that placed the payload, `None` if no anchor existed.
    pub anchor: Option<Anchor>,
    /// Whether the editor text replaced the textarea content.
    pub editor_embedded: bool,
}

/// Build the shareable page from the original markup.
///
/// Never fails on missing anchors: a page without any recognised anchor gets
/// the declaration appended at the end and `anchor` is `None`.
pub fn splice(
    markup: &str,
    snapshot: &DrawingSnapshot,
    editor_text: &str,
    mode: ShareMode,
    options: &SpliceOptions,
) -> Result<SpliceOutput, serde_json::Error> {
    log::info!("Creating shareable markup with {} shapes ({})", snapshot.len(), mode);
    if snapshot.is_empty() {
        log::warn!("No shapes to export");
    }

    let payload = snapshot.to_payload()?;
    log::debug!("Formatted payload length: {}", payload.len());

    let chain = default_chain(options);
    let (mut html, anchor) = match insert_payload(&chain, markup, &payload) {
        Some((html, anchor)) => {
            log::info!("Inserted shapes at {}", anchor.describe());
            (html, Some(anchor))
        }
        None => {
            log::error!("Failed to find an insertion point for premadeSketch");
            let mut html = markup.to_string();
            html.push_str(&strategies::declaration_block(&payload));
            (html, None)
        }
    };

    let mut editor_embedded = false;
    if !editor_text.is_empty() {
        match embed_editor_text(&html, editor_text, &options.code_container_id) {
            Some(updated) => {
                html = updated;
                editor_embedded = true;
            }
            None => log::debug!(
                "No textarea#{} found; editor text not embedded",
                options.code_container_id
            ),
        }
    }

    if mode.is_view_only() {
        html = view_only::inject_styles(&html, options);
        html = view_only::inject_script(&html, options);
    }

    Ok(SpliceOutput { markup: html, anchor, editor_embedded })
}

/// Replace the content of `<textarea id="{container_id}">` with escaped text.
///
/// The opening tag and its attributes are kept.
pub fn embed_editor_text(markup: &str, editor_text: &str, container_id: &str) -> Option<String> {
    let id_attr = Regex::new(&format!(
        r#"\s(?i:id)\s*=\s*(?:"{id}"|'{id}'|{id}[\s/>])"#,
        id = regex::escape(container_id)
    ))
    .ok()?;
    let open = TEXTAREA_OPEN
        .find_iter(markup)
        .find(|tag| id_attr.is_match(tag.as_str()))?;
    let close = TEXTAREA_CLOSE.find_at(markup, open.end())?;

    let escaped = escape_html(editor_text);
    let mut out = String::with_capacity(markup.len() + escaped.len());
    out.push_str(&markup[..open.end()]);
    out.push_str(&escaped);
    out.push_str(&markup[close.start()..]);
    Some(out)
}
