//! Insertion strategies for the `premadeSketch` declaration.
//!
//! Each strategy looks for one kind of anchor in the page and either returns
//! the rewritten markup or `None` so the next strategy can try.

use super::{Anchor, SpliceOptions};
use regex::Regex;
use std::sync::LazyLock;

/// Comment written above inserted declarations.
pub const INSERTED_COMMENT: &str = "// Inserted premadeSketch for shared version";

static DECLARATION_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"const\s+premadeSketch\s*=\s*\[").expect("valid declaration pattern")
});

static LOOSE_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"const\s+premadeSketch\s*=\s*(\[[\s\S]*?\];)")
        .expect("valid loose declaration pattern")
});

static COMMENTED_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"const\s+premadeSketch\s*=\s*(\[(?:\s|//[^\n]*\n)*\];)")
        .expect("valid commented declaration pattern")
});

static INIT_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"openDB\(\)\.then\(").expect("valid init call pattern"));

static BODY_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</body\s*>").expect("valid body pattern"));

/// One way of placing the payload into the page.
pub trait InsertionStrategy {
    /// The anchor this strategy recognises.
    fn anchor(&self) -> Anchor;

    /// Rewrite `markup` so it declares `premadeSketch = payload`.
    fn apply(&self, markup: &str, payload: &str) -> Option<String>;
}

/// Ordered strategy chain; the first strategy that applies wins.
pub fn default_chain(options: &SpliceOptions) -> Vec<Box<dyn InsertionStrategy>> {
    vec![
        Box::new(StrictDeclaration),
        Box::new(CommentedDeclaration),
        Box::new(LooseDeclaration),
        Box::new(InitCall),
        Box::new(ScriptBoundary::new(&options.include_script_src)),
        Box::new(BodyEnd),
    ]
}

/// Run `chain` in order and report which anchor was used.
pub fn insert_payload(
    chain: &[Box<dyn InsertionStrategy>],
    markup: &str,
    payload: &str,
) -> Option<(String, Anchor)> {
    chain.iter().find_map(|strategy| {
        strategy
            .apply(markup, payload)
            .map(|rewritten| (rewritten, strategy.anchor()))
    })
}

/// Script block holding a freshly declared `premadeSketch`.
pub fn declaration_block(payload: &str) -> String {
    format!(
        "<script>\n  {}\n  const premadeSketch = {};\n</script>\n",
        INSERTED_COMMENT, payload
    )
}

/// Offset of the last closing body tag.
pub(crate) fn last_body_close(markup: &str) -> Option<usize> {
    BODY_CLOSE.find_iter(markup).last().map(|m| m.start())
}

/// An existing `const premadeSketch = [...];` with a balanced array literal.
pub struct StrictDeclaration;

impl InsertionStrategy for StrictDeclaration {
    fn anchor(&self) -> Anchor {
        Anchor::StrictDeclaration
    }

    fn apply(&self, markup: &str, payload: &str) -> Option<String> {
        DECLARATION_OPEN.find_iter(markup).find_map(|m| {
            let open = m.end() - 1;
            let close = matching_bracket(markup, open)?;
            let rest = &markup[close + 1..];
            let trimmed = rest.trim_start();
            if !trimmed.starts_with(';') {
                return None;
            }
            let end = close + 1 + (rest.len() - trimmed.len()) + 1;
            Some(replace_range(markup, open, end, &format!("{};", payload)))
        })
    }
}

/// A declaration whose body only holds whitespace and `//` comments.
pub struct CommentedDeclaration;

impl InsertionStrategy for CommentedDeclaration {
    fn anchor(&self) -> Anchor {
        Anchor::CommentedDeclaration
    }

    fn apply(&self, markup: &str, payload: &str) -> Option<String> {
        let body = COMMENTED_DECLARATION.captures(markup)?.get(1)?;
        Some(replace_range(markup, body.start(), body.end(), &format!("{};", payload)))
    }
}

/// Any `const premadeSketch = [` up to the first `];`.
///
/// Last resort for declarations the bracket scan cannot follow, so an
/// existing declaration is replaced rather than declared a second time.
pub struct LooseDeclaration;

impl InsertionStrategy for LooseDeclaration {
    fn anchor(&self) -> Anchor {
        Anchor::LooseDeclaration
    }

    fn apply(&self, markup: &str, payload: &str) -> Option<String> {
        let body = LOOSE_DECLARATION.captures(markup)?.get(1)?;
        Some(replace_range(markup, body.start(), body.end(), &format!("{};", payload)))
    }
}

/// The page's storage bootstrap, `openDB().then(`.
pub struct InitCall;

impl InsertionStrategy for InitCall {
    fn anchor(&self) -> Anchor {
        Anchor::InitCall
    }

    fn apply(&self, markup: &str, payload: &str) -> Option<String> {
        let at = INIT_CALL.find(markup)?.start();
        let declaration =
            format!("{}\nconst premadeSketch = {};\n\n    ", INSERTED_COMMENT, payload);
        Some(replace_range(markup, at, at, &declaration))
    }
}

/// The `</script>` that directly precedes the share script's own tag.
pub struct ScriptBoundary {
    pattern: Option<Regex>,
}

impl ScriptBoundary {
    pub fn new(include_script_src: &str) -> Self {
        let source = format!(
            r#"(?i)</script\s*>\s*<script\s+src\s*=\s*["']{}["']\s*>\s*</script\s*>"#,
            regex::escape(include_script_src)
        );
        let pattern = match Regex::new(&source) {
            Ok(re) => Some(re),
            Err(e) => {
                log::warn!("Ignoring script boundary anchor for {:?}: {}", include_script_src, e);
                None
            }
        };
        Self { pattern }
    }
}

impl InsertionStrategy for ScriptBoundary {
    fn anchor(&self) -> Anchor {
        Anchor::ScriptBoundary
    }

    fn apply(&self, markup: &str, payload: &str) -> Option<String> {
        let at = self.pattern.as_ref()?.find(markup)?.start();
        let declaration =
            format!("\n  {}\n  const premadeSketch = {};\n  ", INSERTED_COMMENT, payload);
        Some(replace_range(markup, at, at, &declaration))
    }
}

/// A new script block right before `</body>`.
pub struct BodyEnd;

impl InsertionStrategy for BodyEnd {
    fn anchor(&self) -> Anchor {
        Anchor::BodyEnd
    }

    fn apply(&self, markup: &str, payload: &str) -> Option<String> {
        let at = last_body_close(markup)?;
        Some(replace_range(markup, at, at, &declaration_block(payload)))
    }
}

fn replace_range(markup: &str, start: usize, end: usize, replacement: &str) -> String {
    let mut out = String::with_capacity(markup.len() - (end - start) + replacement.len());
    out.push_str(&markup[..start]);
    out.push_str(replacement);
    out.push_str(&markup[end..]);
    out
}

/// Index of the `]` closing the `[` at `open`.
///
/// String literals and `//` or `/* */` comments are skipped. Gives up at a
/// `</script` so a malformed literal never swallows the rest of the page.
fn matching_bracket(markup: &str, open: usize) -> Option<usize> {
    let bytes = markup.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = open;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' | b'`' => quote = Some(b),
                b'[' => depth += 1,
                b']' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                b'/' if bytes[i..].starts_with(b"//") => {
                    i = skip_until(markup, i + 2, "\n")?;
                    continue;
                }
                b'/' if bytes[i..].starts_with(b"/*") => {
                    i = skip_until(markup, i + 2, "*/")?;
                    continue;
                }
                b'<' if bytes[i..].starts_with(b"</script") => return None,
                _ => {}
            },
        }
        i += 1;
    }
    None
}

/// Offset just past the next `terminator` at or after `from`.
///
/// `None` when the comment runs into `</script` or the end of the markup.
fn skip_until(markup: &str, from: usize, terminator: &str) -> Option<usize> {
    let rest = &markup[from..];
    let end = rest.find(terminator)?;
    if rest[..end].contains("</script") {
        return None;
    }
    Some(from + end + terminator.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAYLOAD: &str = "[\n  {\n    \"type\": \"dot\"\n  }\n]";

    #[test]
    fn test_strict_replaces_array() {
        let markup = "<script>const premadeSketch = [{\"a\": [1, [2]]}];\nrun();</script>";
        let out = StrictDeclaration.apply(markup, "[]").unwrap();
        assert_eq!(out, "<script>const premadeSketch = [];\nrun();</script>");
    }

    #[test]
    fn test_strict_ignores_brackets_in_strings() {
        let markup = r#"const premadeSketch = [{"label": "]; oops ["}];"#;
        let out = StrictDeclaration.apply(markup, PAYLOAD).unwrap();
        assert_eq!(out, format!("const premadeSketch = {};", PAYLOAD));
    }

    #[test]
    fn test_strict_allows_space_before_semicolon() {
        let out = StrictDeclaration.apply("const  premadeSketch=[1,2] ;x", "[]").unwrap();
        assert_eq!(out, "const  premadeSketch=[];x");
    }

    #[test]
    fn test_strict_skips_line_comments() {
        let markup = "const premadeSketch = [\n  // see [notes\n];\n</script>";
        let out = StrictDeclaration.apply(markup, "[]").unwrap();
        assert_eq!(out, "const premadeSketch = [];\n</script>");
    }

    #[test]
    fn test_strict_apostrophe_in_comment() {
        let markup = "const premadeSketch = [\n  // don't edit by hand\n  \
                      {\"type\": \"line\"}\n];\nopenDB().then(init);";
        let out = StrictDeclaration.apply(markup, "[]").unwrap();
        assert_eq!(out, "const premadeSketch = [];\nopenDB().then(init);");
    }

    #[test]
    fn test_strict_closing_bracket_in_comment() {
        let markup = "const premadeSketch = [\n  {\"type\": \"line\"} // ends with ]\n];\nrun();";
        let out = StrictDeclaration.apply(markup, "[]").unwrap();
        assert_eq!(out, "const premadeSketch = [];\nrun();");
    }

    #[test]
    fn test_strict_skips_block_comments() {
        let markup = "const premadeSketch = [ /* ] it's */ {\"a\": 1} ];";
        let out = StrictDeclaration.apply(markup, "[]").unwrap();
        assert_eq!(out, "const premadeSketch = [];");
    }

    #[test]
    fn test_strict_unterminated_comment_gives_up() {
        let markup = "const premadeSketch = [ /* never closed ];\n</script><p>]</p>";
        assert!(StrictDeclaration.apply(markup, "[]").is_none());
    }

    #[test]
    fn test_loose_declaration_replaces_up_to_first_terminator() {
        let markup = "const premadeSketch = [\n  /* unclosed\n];\nopenDB().then(init);";
        let out = LooseDeclaration.apply(markup, "[]").unwrap();
        assert_eq!(out, "const premadeSketch = [];\nopenDB().then(init);");
    }

    #[test]
    fn test_chain_never_declares_twice() {
        let markup = "<script>\nconst premadeSketch = [\n  /* unclosed\n];\n\
                      openDB().then(init);\n</script>\n</body>";
        let chain = default_chain(&SpliceOptions::default());
        let (out, anchor) = insert_payload(&chain, markup, PAYLOAD).unwrap();
        assert_eq!(anchor, Anchor::LooseDeclaration);
        assert_eq!(out.matches("const premadeSketch").count(), 1);
    }

    #[test]
    fn test_commented_declaration() {
        let markup = "const premadeSketch = [\n  // see [notes\n];\n</script>";
        let out = CommentedDeclaration.apply(markup, "[]").unwrap();
        assert_eq!(out, "const premadeSketch = [];\n</script>");
    }

    #[test]
    fn test_init_call_inserts_before_anchor() {
        let markup = "<script>\n    openDB().then(() => load());\n</script>";
        let out = InitCall.apply(markup, "[]").unwrap();
        assert_eq!(
            out,
            "<script>\n    // Inserted premadeSketch for shared version\n\
             const premadeSketch = [];\n\n    openDB().then(() => load());\n</script>"
        );
    }

    #[test]
    fn test_script_boundary() {
        let markup =
            "<script>\n  draw();\n</script>\n  <script src=\"js/share.js\"></script>\n</body>";
        let out = ScriptBoundary::new("js/share.js").apply(markup, "[]").unwrap();
        assert_eq!(
            out,
            "<script>\n  draw();\n\n  // Inserted premadeSketch for shared version\n  \
             const premadeSketch = [];\n  </script>\n  \
             <script src=\"js/share.js\"></script>\n</body>"
        );
    }

    #[test]
    fn test_script_boundary_requires_share_tag() {
        let markup = "<script>draw();</script><script src=\"js/app.js\"></script>";
        assert!(ScriptBoundary::new("js/share.js").apply(markup, "[]").is_none());
    }

    #[test]
    fn test_body_end_uses_last_body_tag() {
        let markup = "<body><script>var s = '</body>';</script></BODY>";
        let out = BodyEnd.apply(markup, "[]").unwrap();
        assert!(out.ends_with(&format!("{}</BODY>", declaration_block("[]"))));
    }

    #[test]
    fn test_body_end_without_body() {
        assert!(BodyEnd.apply("<p>fragment</p>", "[]").is_none());
    }

    #[test]
    fn test_chain_prefers_declaration_over_init_call() {
        let markup = "const premadeSketch = [];\nopenDB().then(start);\n</body>";
        let chain = default_chain(&SpliceOptions::default());
        let (_, anchor) = insert_payload(&chain, markup, PAYLOAD).unwrap();
        assert_eq!(anchor, Anchor::StrictDeclaration);
    }

    #[test]
    fn test_payload_with_dollar_signs_is_literal() {
        let out = StrictDeclaration
            .apply("const premadeSketch = [];", r#"[{"t": "$1 $0"}]"#)
            .unwrap();
        assert_eq!(out, r#"const premadeSketch = [{"t": "$1 $0"}];"#);
    }
}
