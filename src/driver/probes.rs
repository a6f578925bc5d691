//! JavaScript expressions evaluated in the page by the scenarios.
//!
//! Each probe returns a JSON-serializable value so results come back through
//! `BrowserDriver::evaluate` unchanged, whichever driver is running.

/// Window property the XSS payload sets when it executes.
pub const XSS_CANARY: &str = "__authprobe_xss__";

/// Current document markup, for reflection checks.
pub const PAGE_HTML: &str = "document.documentElement.outerHTML";

/// True when content is wider than the viewport.
pub const HORIZONTAL_OVERFLOW: &str =
    "document.documentElement.scrollWidth > document.documentElement.clientWidth";

/// Declared document language, empty string when missing.
pub const DOCUMENT_LANG: &str = "document.documentElement.lang || ''";

/// Number of images without an alt attribute.
pub const IMAGES_WITHOUT_ALT: &str =
    "Array.from(document.querySelectorAll('img')).filter(i => !i.hasAttribute('alt')).length";

/// Scheme of the current page, e.g. "https:".
pub const PAGE_PROTOCOL: &str = "window.location.protocol";

/// Injection payload that flips the canary if the page executes it.
pub fn xss_payload() -> String {
    format!("<img src=x onerror=\"window.{}=true\">", XSS_CANARY)
}

/// Whether the canary was flipped.
pub fn xss_executed() -> String {
    format!("Boolean(window.{})", XSS_CANARY)
}

/// Rendered height of the first match, 0 when absent.
pub fn element_height(selector: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({sel}); \
         return el ? el.getBoundingClientRect().height : 0; }})()",
        sel = js_string(selector)
    )
}

/// Whether the element has an accessible label: aria-label, aria-labelledby,
/// a `label[for]` pointing at it, or a wrapping `<label>`.
pub fn has_accessible_label(selector: &str) -> String {
    format!(
        "(() => {{ const el = document.querySelector({sel}); \
         if (!el) return false; \
         if (el.getAttribute('aria-label')) return true; \
         if (el.getAttribute('aria-labelledby')) return true; \
         if (el.id && document.querySelector('label[for=\"' + el.id + '\"]')) return true; \
         return el.closest('label') !== null; }})()",
        sel = js_string(selector)
    )
}

/// Quote an arbitrary string as a JS string literal.
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}
