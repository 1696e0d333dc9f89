// Code extraction from raw model output
//
// Models wrap documents in code fences and sometimes prepend commentary.
// Extraction never fails; a response with no usable document is left for
// the validator to reject.

use once_cell::sync::Lazy;
use regex::Regex;

static DOCTYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<!doctype\s+html").expect("static pattern"));

// Opening fence: three backticks, optional language tag, then end of line.
static OPENING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```[A-Za-z0-9_+.\-]*[ \t]*(?:\r?\n|$)").expect("static pattern"));

// Closing fence: three backticks alone on their line.
static CLOSING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*```[ \t]*\r?$").expect("static pattern"));

static HTML_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</html\s*>").expect("static pattern"));

const FENCE: &str = "```";

/// Recover the HTML document from a raw chat response.
///
/// Idempotent: `extract_code(&extract_code(s)) == extract_code(s)`.
pub fn extract_code(raw: &str) -> String {
    let mut current = raw.trim().to_string();
    loop {
        let next = extract_once(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn extract_once(raw: &str) -> String {
    let mut text = raw.trim();
    let doctype_at = DOCTYPE.find(text).map(|m| m.start());

    // Only a fence that opens before the document counts; backticks inside
    // the page (a script's template literal) are left alone.
    if let Some(fence) = OPENING_FENCE.find(text) {
        if doctype_at.map_or(true, |at| fence.start() < at) {
            text = &text[fence.end()..];
            if let Some(close) = closing_fence(text) {
                text = &text[..close];
            }
            text = text.trim();
        }
    }

    if let Some(at) = DOCTYPE.find(text).map(|m| m.start()) {
        if at > 0 {
            text = &text[at..];
        }
    }

    if let Some(stripped) = text.strip_suffix(FENCE) {
        text = stripped;
    }

    text.trim().to_string()
}

/// Start of the fence closing the block whose body is `body`.
///
/// The block ends at the first fence past the document's `</html>`, so a
/// later block (or commentary) is dropped while a fence line inside a
/// script survives.
fn closing_fence(body: &str) -> Option<usize> {
    let doc_end = HTML_END.find(body).map_or(0, |m| m.end());
    CLOSING_FENCE
        .find_iter(body)
        .map(|m| m.start())
        .find(|&at| at >= doc_end)
        .or_else(|| body[doc_end..].find(FENCE).map(|at| doc_end + at))
}
