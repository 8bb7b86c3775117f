//! Assets that lock a shared page into view-only mode.

use super::SpliceOptions;
use super::strategies::last_body_close;
use regex::Regex;
use std::sync::LazyLock;

/// Marker opening the injected style block.
pub const STYLE_MARKER: &str = "<!-- View-only mode styles -->";

/// Marker opening the injected script body.
pub const SCRIPT_MARKER: &str = "// View-only mode: disable editing";

/// Text shown in the badge.
pub const BADGE_TEXT: &str = "View Only Mode";

static HEAD_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</head\s*>").expect("valid head pattern"));

/// Style block hiding the toolbar and the editor cursor.
pub fn style_block(options: &SpliceOptions) -> String {
    format!(
        r#"
    {marker}
    <style>
      #{toolbar} {{
        display: none !important;
      }}

      .CodeMirror {{
        cursor: default !important;
      }}

      .CodeMirror-cursor {{
        display: none !important;
      }}

      .view-only-indicator {{
        position: fixed;
        top: 5px;
        right: 10px;
        background: rgba(0,0,0,0.5);
        color: white;
        padding: 5px 10px;
        border-radius: 3px;
        font-size: 12px;
        z-index: 1000;
      }}
    </style>
"#,
        marker = STYLE_MARKER,
        toolbar = options.toolbar_id,
    )
}

/// Script block that locks the editor and canvas once the page has loaded.
pub fn script_block(options: &SpliceOptions) -> String {
    format!(
        r#"
    <script>
      {marker}
      document.addEventListener('DOMContentLoaded', function() {{
        if (window.editor) {{
          window.editor.setOption('readOnly', true);
        }}

        const canvas = document.getElementById('{canvas}');
        if (canvas) {{
          canvas.style.pointerEvents = 'none';
        }}

        const badge = document.createElement('div');
        badge.className = 'view-only-indicator';
        badge.textContent = '{badge}';
        document.body.appendChild(badge);

        const editorContainer = document.getElementById('{editor_container}');
        if (editorContainer) {{
          editorContainer.style.top = '0';
        }}
      }});
    </script>
"#,
        marker = SCRIPT_MARKER,
        canvas = options.canvas_id,
        badge = BADGE_TEXT,
        editor_container = options.editor_container_id,
    )
}

/// Insert the style block before `</head>` unless it is already there.
///
/// Only the complete block counts as present. Marker text inside escaped
/// editor content or the JSON payload never matches it.
pub fn inject_styles(markup: &str, options: &SpliceOptions) -> String {
    let block = style_block(options);
    if markup.contains(&block) {
        return markup.to_string();
    }
    match HEAD_CLOSE.find(markup) {
        Some(m) => insert_at(markup, m.start(), &block),
        None => {
            log::warn!("No </head> tag found; view-only styles not injected");
            markup.to_string()
        }
    }
}

/// Insert the locking script before `</body>` unless it is already there.
pub fn inject_script(markup: &str, options: &SpliceOptions) -> String {
    let block = script_block(options);
    if markup.contains(&block) {
        return markup.to_string();
    }
    match last_body_close(markup) {
        Some(at) => insert_at(markup, at, &block),
        None => {
            log::warn!("No </body> tag found; view-only script not injected");
            markup.to_string()
        }
    }
}

fn insert_at(markup: &str, at: usize, block: &str) -> String {
    let mut out = String::with_capacity(markup.len() + block.len());
    out.push_str(&markup[..at]);
    out.push_str(block);
    out.push_str(&markup[at..]);
    out
}
