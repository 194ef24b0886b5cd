//! Text, filename and HTML sanitizers.
//!
//! # Responsibility
//! - `HtmlSanitizer`: filter cell values before they land in a page body.
//! - `sanitize_text_field`: plain-text cleanup for titles and SEO fields.
//! - `sanitize_file_name`: stable provenance label for a CSV upload.
//! - `escape_html`: escaping for values emitted into head markup.
//!
//! # Invariants
//! - `PostHtmlSanitizer` output contains only tags it rebuilt itself from the
//!   tag and attribute allow-lists; every other `<` is escaped.
//! - Attribute values are entity-decoded, checked, then re-escaped inside
//!   double quotes. URL attributes keep only http, https, mailto, tel or
//!   relative targets.
//! - `<script>` and `<style>` blocks are dropped with their content.
//! - `sanitize_text_field` output contains no tags, tabs or line breaks.

use once_cell::sync::Lazy;
use regex::Regex;

static SCRIPT_STYLE_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(?:script|style)\b[^>]*>.*?</(?:script|style)\s*>")
        .expect("valid script/style regex")
});
static ANY_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid any-tag regex"));
static TEXT_WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\r\n\t ]+").expect("valid whitespace regex"));
static SPACE_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" +").expect("valid space run regex"));
static PERCENT_OCTET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%[a-fA-F0-9]{2}").expect("valid percent octet regex"));
static FILE_NAME_DASH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\r\n\t -]+").expect("valid file name dash regex"));

/// Tags kept by `PostHtmlSanitizer`.
const ALLOWED_TAGS: &[&str] = &[
    "a", "abbr", "address", "article", "b", "blockquote", "br", "caption", "cite", "code", "dd",
    "del", "div", "dl", "dt", "em", "figcaption", "figure", "footer", "h1", "h2", "h3", "h4",
    "h5", "h6", "header", "hr", "i", "img", "ins", "li", "mark", "ol", "p", "pre", "q", "s",
    "section", "small", "span", "strike", "strong", "sub", "sup", "table", "tbody", "td",
    "tfoot", "th", "thead", "time", "tr", "u", "ul",
];

/// Attributes kept on every allowed tag.
const GLOBAL_ATTRIBUTES: &[&str] = &["class", "dir", "id", "lang", "title"];

/// Attributes whose value is followed as a link and must pass `is_safe_url`.
const URL_ATTRIBUTES: &[&str] = &["cite", "href", "src"];

const SAFE_URL_SCHEMES: &[&str] = &["http", "https", "mailto", "tel"];

const NAMED_ENTITIES: &[(&str, char)] = &[
    ("amp", '&'),
    ("apos", '\''),
    ("colon", ':'),
    ("gt", '>'),
    ("lpar", '('),
    ("lt", '<'),
    ("nbsp", '\u{A0}'),
    ("NewLine", '\n'),
    ("quot", '"'),
    ("rpar", ')'),
    ("sol", '/'),
    ("Tab", '\t'),
];

const FILE_NAME_SPECIAL_CHARS: &[char] = &[
    '?', '[', ']', '/', '\\', '=', '<', '>', ':', ';', ',', '\'', '"', '&', '$', '#', '*', '(',
    ')', '|', '~', '`', '!', '{', '}', '%', '+', '\u{2019}', '\u{AB}', '\u{BB}', '\u{201D}',
    '\u{201C}',
];

/// Filters untrusted HTML down to a safe subset.
pub trait HtmlSanitizer {
    fn sanitize(&self, raw: &str) -> String;
}

/// Allow-list sanitizer for post-body content.
///
/// Tags are tokenized with quote-aware attribute parsing, then rebuilt from
/// the allow-lists. Text between tags is copied as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostHtmlSanitizer;

impl HtmlSanitizer for PostHtmlSanitizer {
    fn sanitize(&self, raw: &str) -> String {
        let without_blocks = SCRIPT_STYLE_BLOCK_RE.replace_all(raw, "");
        let mut cleaned = String::with_capacity(without_blocks.len());
        let mut rest: &str = &without_blocks;

        while let Some(start) = rest.find('<') {
            cleaned.push_str(&rest[..start]);
            rest = &rest[start..];
            match parse_tag(rest) {
                Some(tag) => {
                    if let Some(rebuilt) = rebuild_tag(&tag) {
                        cleaned.push_str(&rebuilt);
                    }
                    rest = &rest[tag.len..];
                }
                None => {
                    cleaned.push_str("&lt;");
                    rest = &rest[1..];
                }
            }
        }
        cleaned.push_str(rest);
        cleaned
    }
}

impl<T: HtmlSanitizer + ?Sized> HtmlSanitizer for &T {
    fn sanitize(&self, raw: &str) -> String {
        (**self).sanitize(raw)
    }
}

/// One start or end tag as written in the input.
struct ParsedTag<'a> {
    /// Lowercased tag name.
    name: String,
    closing: bool,
    /// Lowercased attribute names with their raw, still-encoded values.
    attributes: Vec<(String, &'a str)>,
    /// Bytes consumed, including both angle brackets.
    len: usize,
}

fn ends_name(byte: u8) -> bool {
    byte.is_ascii_whitespace() || matches!(byte, b'/' | b'>')
}

/// Parses the tag starting at `input[0] == '<'`.
///
/// Returns `None` when the `<` does not open a tag (no letter after it, or
/// the input ends before the closing `>`), in which case it is plain text.
fn parse_tag(input: &str) -> Option<ParsedTag<'_>> {
    let bytes = input.as_bytes();
    let mut pos = 1;
    let closing = bytes.get(pos) == Some(&b'/');
    if closing {
        pos += 1;
    }
    if !bytes.get(pos)?.is_ascii_alphabetic() {
        return None;
    }
    let name_start = pos;
    while pos < bytes.len() && !ends_name(bytes[pos]) {
        pos += 1;
    }
    let name = input[name_start..pos].to_ascii_lowercase();

    let mut attributes = Vec::new();
    loop {
        while pos < bytes.len() && (bytes[pos].is_ascii_whitespace() || bytes[pos] == b'/') {
            pos += 1;
        }
        if bytes.get(pos).copied()? == b'>' {
            return Some(ParsedTag {
                name,
                closing,
                attributes,
                len: pos + 1,
            });
        }

        // The first character always belongs to the name, even `=` or a quote.
        let attr_start = pos;
        pos += 1;
        while pos < bytes.len() && !ends_name(bytes[pos]) && bytes[pos] != b'=' {
            pos += 1;
        }
        let attr_name = input[attr_start..pos].to_ascii_lowercase();

        let mut after_name = pos;
        while after_name < bytes.len() && bytes[after_name].is_ascii_whitespace() {
            after_name += 1;
        }
        let mut value = "";
        if bytes.get(after_name) == Some(&b'=') {
            pos = after_name + 1;
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            match bytes.get(pos).copied()? {
                quote @ (b'"' | b'\'') => {
                    let value_start = pos + 1;
                    let value_len = input[value_start..].find(char::from(quote))?;
                    value = &input[value_start..value_start + value_len];
                    pos = value_start + value_len + 1;
                }
                _ => {
                    let value_start = pos;
                    while pos < bytes.len()
                        && !bytes[pos].is_ascii_whitespace()
                        && bytes[pos] != b'>'
                    {
                        pos += 1;
                    }
                    value = &input[value_start..pos];
                }
            }
        }
        attributes.push((attr_name, value));
    }
}

fn attribute_allowed(tag: &str, attribute: &str) -> bool {
    GLOBAL_ATTRIBUTES.contains(&attribute)
        || matches!(
            (tag, attribute),
            ("a", "href" | "name" | "rel" | "target")
                | ("img", "alt" | "height" | "src" | "width")
                | ("td" | "th", "colspan" | "rowspan")
                | ("time", "datetime")
                | ("blockquote" | "del" | "ins" | "q", "cite")
        )
}

/// Emits the canonical form of an allowed tag, or `None` to drop it.
fn rebuild_tag(tag: &ParsedTag<'_>) -> Option<String> {
    if !ALLOWED_TAGS.contains(&tag.name.as_str()) {
        return None;
    }
    if tag.closing {
        return Some(format!("</{}>", tag.name));
    }

    let mut rebuilt = format!("<{}", tag.name);
    let mut seen: Vec<&str> = Vec::with_capacity(tag.attributes.len());
    for (name, raw_value) in &tag.attributes {
        // Browsers keep the first of duplicated attributes.
        if seen.contains(&name.as_str()) {
            continue;
        }
        seen.push(name);
        if !attribute_allowed(&tag.name, name) {
            continue;
        }
        let value = decode_entities(raw_value);
        if URL_ATTRIBUTES.contains(&name.as_str()) && !is_safe_url(&value) {
            continue;
        }
        rebuilt.push(' ');
        rebuilt.push_str(name);
        rebuilt.push_str("=\"");
        rebuilt.push_str(&escape_html(&value));
        rebuilt.push('"');
    }
    rebuilt.push('>');
    Some(rebuilt)
}

/// Resolves numeric references and the named references that can spell a
/// URL scheme. Unknown references are kept literally.
fn decode_entities(value: &str) -> String {
    let mut decoded = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(amp) = rest.find('&') {
        decoded.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match decode_entity(rest) {
            Some((ch, consumed)) => {
                decoded.push(ch);
                rest = &rest[consumed..];
            }
            None => {
                decoded.push('&');
                rest = &rest[1..];
            }
        }
    }
    decoded.push_str(rest);
    decoded
}

/// Decodes the reference at `input[0] == '&'`. Numeric references may omit
/// the trailing `;`, as browsers accept.
fn decode_entity(input: &str) -> Option<(char, usize)> {
    let body = &input[1..];
    if let Some(numeric) = body.strip_prefix('#') {
        let hex = numeric.strip_prefix(|ch: char| ch == 'x' || ch == 'X');
        let (digits, radix, prefix_len) = match hex {
            Some(hex) => (hex, 16, 2),
            None => (numeric, 10, 1),
        };
        let digits_len = digits
            .find(|ch: char| !ch.is_digit(radix))
            .unwrap_or(digits.len());
        if digits_len == 0 {
            return None;
        }
        let ch = u32::from_str_radix(&digits[..digits_len], radix)
            .ok()
            .and_then(char::from_u32)
            .filter(|ch| *ch != '\0')
            .unwrap_or('\u{FFFD}');
        let semicolon = usize::from(digits[digits_len..].starts_with(';'));
        return Some((ch, 1 + prefix_len + digits_len + semicolon));
    }

    let end = body.find(';')?;
    let name = &body[..end];
    NAMED_ENTITIES
        .iter()
        .find(|(entity, _)| *entity == name)
        .map(|(_, ch)| (*ch, end + 2))
}

/// Accepts relative references and the schemes in `SAFE_URL_SCHEMES`.
/// Whitespace and control characters are ignored, as browsers do when
/// reading a scheme.
fn is_safe_url(url: &str) -> bool {
    let compact: String = url
        .chars()
        .filter(|ch| !ch.is_whitespace() && !ch.is_control())
        .flat_map(char::to_lowercase)
        .collect();
    match compact.find(|ch: char| matches!(ch, ':' | '/' | '?' | '#')) {
        Some(index) if compact[index..].starts_with(':') => {
            SAFE_URL_SCHEMES.contains(&&compact[..index])
        }
        _ => true,
    }
}

/// Reduces a value to single-line plain text.
pub fn sanitize_text_field(value: &str) -> String {
    let without_blocks = SCRIPT_STYLE_BLOCK_RE.replace_all(value, "");
    let without_tags = ANY_TAG_RE.replace_all(&without_blocks, "");
    let mut filtered = TEXT_WHITESPACE_RE
        .replace_all(&without_tags, " ")
        .into_owned();

    let mut found_octets = false;
    while PERCENT_OCTET_RE.is_match(&filtered) {
        filtered = PERCENT_OCTET_RE.replace_all(&filtered, "").into_owned();
        found_octets = true;
    }
    if found_octets {
        filtered = SPACE_RUN_RE.replace_all(&filtered, " ").into_owned();
    }

    filtered.trim().to_string()
}

/// Produces a filesystem- and URL-safe label from an uploaded file name.
pub fn sanitize_file_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|ch| !FILE_NAME_SPECIAL_CHARS.contains(ch) && !ch.is_control())
        .collect();
    let dashed = FILE_NAME_DASH_RE.replace_all(&kept, "-");
    dashed
        .trim_matches(|ch| matches!(ch, '.' | '-' | '_'))
        .to_string()
}

/// Escapes a value for HTML text or double/single-quoted attributes.
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            other => escaped.push(other),
        }
    }
    escaped
}
