//! Minimal XML helpers for SOAP bodies.
//!
//! TV responses are small and flat, so elements are located by local name
//! with a linear scan instead of building a document tree.

use viera_core::error::FramingError;

/// Escape text for use as element content.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Reverse `escape`. Unknown entities are left as they are.
pub fn unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let replaced = [
            ("&amp;", '&'),
            ("&lt;", '<'),
            ("&gt;", '>'),
            ("&quot;", '"'),
            ("&apos;", '\''),
        ]
        .iter()
        .find(|(entity, _)| rest.starts_with(entity));

        match replaced {
            Some((entity, c)) => {
                out.push(*c);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Raw content of the first element whose local name is `name`.
///
/// Namespace prefixes are ignored, so `u:GetVolumeResponse` matches
/// `GetVolumeResponse`. A self-closing element yields an empty string.
pub fn find_element<'a>(xml: &'a str, name: &str) -> Option<&'a str> {
    let mut offset = 0;
    while let Some(rel) = xml[offset..].find('<') {
        let start = offset + rel + 1;
        let tag_end = start + xml[start..].find('>')?;
        let tag = &xml[start..tag_end];
        offset = tag_end + 1;

        if tag.starts_with('/') || tag.starts_with('?') || tag.starts_with('!') {
            continue;
        }

        let qname = tag
            .split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or("");
        let local = qname.rsplit(':').next().unwrap_or(qname);
        if local != name {
            continue;
        }

        if tag.ends_with('/') {
            return Some("");
        }

        let close = format!("</{}>", qname);
        let content_end = offset + xml[offset..].find(&close)?;
        return Some(&xml[offset..content_end]);
    }
    None
}

/// Unescaped text of a required element.
pub fn element_text(xml: &str, name: &str) -> Result<String, FramingError> {
    find_element(xml, name)
        .map(|raw| unescape(raw.trim()))
        .ok_or_else(|| FramingError::MissingElement(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    mod escaping {
        use super::*;

        #[test]
        fn escape_then_unescape() {
            let text = r#"<a href="x">Tom & Jerry's</a>"#;
            let escaped = escape(text);
            assert!(!escaped.contains('<'));
            assert_eq!(unescape(&escaped), text);
        }

        #[test]
        fn unknown_entity_is_kept() {
            assert_eq!(unescape("a &nbsp; b &amp; c"), "a &nbsp; b & c");
        }

        #[test]
        fn plain_text_is_untouched() {
            assert_eq!(escape("NRC_EPG-ONOFF"), "NRC_EPG-ONOFF");
        }
    }

    mod find_element {
        use super::*;

        const RESPONSE: &str = concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">"#,
            r#"<s:Body><u:GetVolumeResponse xmlns:u="urn:schemas-upnp-org:service:RenderingControl:1">"#,
            r#"<CurrentVolume>18</CurrentVolume>"#,
            r#"</u:GetVolumeResponse></s:Body></s:Envelope>"#
        );

        #[test]
        fn finds_unprefixed_element() {
            assert_eq!(find_element(RESPONSE, "CurrentVolume"), Some("18"));
        }

        #[test]
        fn matches_local_name_of_prefixed_element() {
            let body = find_element(RESPONSE, "Body").unwrap();
            assert!(body.starts_with("<u:GetVolumeResponse"));
            assert!(find_element(RESPONSE, "GetVolumeResponse")
                .unwrap()
                .contains("<CurrentVolume>"));
        }

        #[test]
        fn does_not_match_name_prefix() {
            let xml = "<X_KeyEventExtra>1</X_KeyEventExtra><X_KeyEvent>2</X_KeyEvent>";
            assert_eq!(find_element(xml, "X_KeyEvent"), Some("2"));
        }

        #[test]
        fn self_closing_is_empty() {
            assert_eq!(find_element("<a><X_SendKeyResponse/></a>", "X_SendKeyResponse"), Some(""));
        }

        #[test]
        fn missing_element_is_none() {
            assert_eq!(find_element(RESPONSE, "CurrentMute"), None);
            assert_eq!(find_element("<open>no close", "open"), None);
        }

        #[test]
        fn element_text_reports_missing_name() {
            let err = element_text(RESPONSE, "X_EncResult").unwrap_err();
            assert!(matches!(err, FramingError::MissingElement(ref n) if n == "X_EncResult"));
        }

        #[test]
        fn element_text_unescapes() {
            let xml = "<X_EncResult> a&amp;b </X_EncResult>";
            assert_eq!(element_text(xml, "X_EncResult").unwrap(), "a&b");
        }
    }
}
