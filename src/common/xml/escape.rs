use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;
use std::borrow::Cow;

// Static initialization: automata are built only once, thread-safe
static TEXT_ESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::new(["&", "<", ">", "\r"]).expect("Failed to build XML text escaper")
});

static ATTR_ESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::new(["&", "<", ">", "\"", "\n", "\r", "\t"])
        .expect("Failed to build XML attribute escaper")
});

const TEXT_REPLACEMENTS: [&str; 4] = ["&amp;", "&lt;", "&gt;", "&#13;"];
const ATTR_REPLACEMENTS: [&str; 7] = ["&amp;", "&lt;", "&gt;", "&quot;", "&#10;", "&#13;", "&#9;"];

/// Escape character data for use between tags.
///
/// Quotes are left alone; a carriage return is written as a character
/// reference so it survives end-of-line normalization on re-parse.
///
/// # Examples
///
/// ```
/// use pptx_oxml::common::xml::escape_text;
/// assert_eq!(escape_text("a & b"), "a &amp; b");
/// assert_eq!(escape_text("<tag>\"hi\"</tag>"), "&lt;tag&gt;\"hi\"&lt;/tag&gt;");
/// assert_eq!(escape_text("fØØbÅr"), "fØØbÅr");
/// ```
#[inline]
pub fn escape_text(s: &str) -> Cow<'_, str> {
    if TEXT_ESCAPER.is_match(s) {
        Cow::Owned(TEXT_ESCAPER.replace_all(s, &TEXT_REPLACEMENTS))
    } else {
        Cow::Borrowed(s)
    }
}

/// Escape an attribute value for use inside double quotes.
///
/// Whitespace other than the plain space is written as character references
/// so attribute-value normalization does not fold it on re-parse.
///
/// # Examples
///
/// ```
/// use pptx_oxml::common::xml::escape_attr;
/// assert_eq!(escape_attr("say \"hi\""), "say &quot;hi&quot;");
/// assert_eq!(escape_attr("a\tb\nc"), "a&#9;b&#10;c");
/// assert_eq!(escape_attr("it's"), "it's");
/// ```
#[inline]
pub fn escape_attr(s: &str) -> Cow<'_, str> {
    if ATTR_ESCAPER.is_match(s) {
        Cow::Owned(ATTR_ESCAPER.replace_all(s, &ATTR_REPLACEMENTS))
    } else {
        Cow::Borrowed(s)
    }
}
