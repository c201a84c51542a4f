//! Minimal HTML scanning for the watch page.
//!
//! Only two things are needed: locating a start tag by its `id` attribute and
//! decoding character references in an attribute value.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Start tags of `div` elements; quoted attribute values may contain `>`.
#[allow(clippy::expect_used)]
static DIV_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<div\b((?:[^>"']|"[^"]*"|'[^']*')*)>"#).expect("div regex is valid") // Static pattern, safe to panic
});

/// `name="value"`, `name='value'` or `name=value` inside a start tag.
#[allow(clippy::expect_used)]
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+))"#)
        .expect("attribute regex is valid") // Static pattern, safe to panic
});

/// Named, decimal and hexadecimal character references.
#[allow(clippy::expect_used)]
static CHAR_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#([0-9]{1,7})|#[xX]([0-9a-fA-F]{1,6})|([A-Za-z]+));")
        .expect("character reference regex is valid") // Static pattern, safe to panic
});

/// Returns the decoded value of `attribute` on the first `div` whose `id` is `id`.
///
/// `None` when no such `div` exists or it lacks the attribute.
#[must_use]
pub fn div_attribute(html: &str, id: &str, attribute: &str) -> Option<String> {
    DIV_TAG.captures_iter(html).find_map(|tag| {
        let attributes = tag.get(1)?.as_str();
        let mut found_id = false;
        let mut value = None;
        for attr in ATTRIBUTE.captures_iter(attributes) {
            let name = attr.get(1)?.as_str();
            let raw = attr
                .get(2)
                .or_else(|| attr.get(3))
                .or_else(|| attr.get(4))
                .map_or("", |m| m.as_str());
            if name.eq_ignore_ascii_case("id") && raw == id {
                found_id = true;
            } else if name.eq_ignore_ascii_case(attribute) {
                value = Some(raw);
            }
        }
        if found_id {
            value.map(|raw| unescape(raw).into_owned())
        } else {
            None
        }
    })
}

/// Decodes HTML character references.
///
/// Unknown named references are left as they are.
#[must_use]
pub fn unescape(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    CHAR_REF.replace_all(text, |caps: &Captures<'_>| {
        let decoded = if let Some(dec) = caps.get(1) {
            dec.as_str().parse::<u32>().ok().and_then(char::from_u32)
        } else if let Some(hex) = caps.get(2) {
            u32::from_str_radix(hex.as_str(), 16)
                .ok()
                .and_then(char::from_u32)
        } else {
            caps.get(3).and_then(|name| named_reference(name.as_str()))
        };
        decoded.map_or_else(|| caps[0].to_string(), String::from)
    })
}

fn named_reference(name: &str) -> Option<char> {
    match name {
        "quot" => Some('"'),
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_named_and_numeric() {
        assert_eq!(
            unescape("{&quot;a&quot;:&#34;&lt;b&gt;&#x27;&amp;&#39;&quot;}"),
            "{\"a\":\"<b>'&'\"}"
        );
    }

    #[test]
    fn test_unescape_leaves_unknown_references() {
        assert_eq!(unescape("&bogus; &amp"), "&bogus; &amp");
    }

    #[test]
    fn test_unescape_without_ampersand_borrows() {
        assert!(matches!(unescape("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn test_div_attribute_found() {
        let html = r#"<html><body>
<div id="other" data-api-data="nope"></div>
<div id="js-initial-watch-data" data-api-data="{&quot;x&quot;:&quot;a&gt;b&quot;}" data-environment="{}"></div>
</body></html>"#;
        assert_eq!(
            div_attribute(html, "js-initial-watch-data", "data-api-data").as_deref(),
            Some(r#"{"x":"a>b"}"#)
        );
    }

    #[test]
    fn test_div_attribute_order_independent() {
        let html = r#"<div data-api-data='{"k":1}' class="c" id="js-initial-watch-data">"#;
        assert_eq!(
            div_attribute(html, "js-initial-watch-data", "data-api-data").as_deref(),
            Some(r#"{"k":1}"#)
        );
    }

    #[test]
    fn test_div_attribute_missing() {
        let html = r#"<div id="js-other" data-api-data="{}"></div>"#;
        assert!(div_attribute(html, "js-initial-watch-data", "data-api-data").is_none());
        assert!(div_attribute("<p>flash player</p>", "js-initial-watch-data", "data-api-data").is_none());
    }
}
