use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::ExtractError;

static INPUT_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<input\b[^>]*>").unwrap());

static FORM_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<form\b[^>]*>").unwrap());

static ATTRIBUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)([A-Za-z_:][-\w:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());

static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|amp|lt|gt|quot|apos);").unwrap());

/// Value of the first `<input type="hidden">` named `name`, entity-decoded.
pub fn hidden_field(body: &str, name: &str) -> Result<String, ExtractError> {
    INPUT_TAG
        .find_iter(body)
        .map(|tag| attributes(tag.as_str()))
        .find(|attrs| {
            attr(attrs, "type").is_some_and(|t| t.eq_ignore_ascii_case("hidden"))
                && attr(attrs, "name") == Some(name)
        })
        .and_then(|attrs| attr(&attrs, "value").map(|v| decode_entities(v).into_owned()))
        .ok_or_else(|| ExtractError::FieldMissing(name.to_string()))
}

/// The base64 SAML assertion carried by the identity provider's auto-submit form.
pub fn extract_assertion(body: &str) -> Result<String, ExtractError> {
    hidden_field(body, "SAMLResponse")
}

/// Target of the first `method="post"` form, with `&#x2f;`-style escapes decoded.
pub fn extract_form_action(body: &str) -> Result<String, ExtractError> {
    FORM_TAG
        .find_iter(body)
        .map(|tag| attributes(tag.as_str()))
        .find(|attrs| attr(attrs, "method").is_some_and(|m| m.eq_ignore_ascii_case("post")))
        .and_then(|attrs| attr(&attrs, "action").map(|a| decode_entities(a).into_owned()))
        .filter(|action| !action.is_empty())
        .ok_or(ExtractError::FormMissing)
}

/// Decode numeric character references and the five XML entities.
///
/// Unknown or malformed references are left as they are.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    ENTITY.replace_all(text, |caps: &Captures| {
        let entity = &caps[1];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => {
                let number = &entity[1..];
                let code = match number.strip_prefix(['x', 'X']) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => number.parse().ok(),
                };
                code.and_then(char::from_u32)
            }
        };
        decoded.map_or_else(|| caps[0].to_string(), String::from)
    })
}

/// Whether the page still asks for a password, i.e. the login was refused.
pub(crate) fn is_login_form(body: &str) -> bool {
    INPUT_TAG
        .find_iter(body)
        .map(|tag| attributes(tag.as_str()))
        .any(|attrs| attr(&attrs, "name") == Some("j_password"))
}

fn attributes(tag: &str) -> Vec<(String, &str)> {
    ATTRIBUTE
        .captures_iter(tag)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = caps.get(2).or_else(|| caps.get(3))?.as_str();
            Some((name, value))
        })
        .collect()
}

fn attr<'a>(attrs: &[(String, &'a str)], name: &str) -> Option<&'a str> {
    attrs.iter().find(|(k, _)| k == name).map(|(_, v)| *v)
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDP_RESPONSE: &str = r#"<html><body onload="document.forms[0].submit()">
<form action="https&#x3a;&#x2f;&#x2f;canvas.auckland.ac.nz&#x2f;login&#x2f;saml" method="post">
<div>
<input type="hidden" name="RelayState" value="cookie&#x3a;1700000000_ab12"/>
<input type="hidden" name="SAMLResponse" value="PHNhbWxwOlJlc3BvbnNlPg&#x3d;&#x3d;"/>
</div>
</form></body></html>"#;

    #[test]
    fn extracts_assertion() {
        assert_eq!(extract_assertion(IDP_RESPONSE).unwrap(), "PHNhbWxwOlJlc3BvbnNlPg==");
    }

    #[test]
    fn extracts_and_decodes_form_action() {
        assert_eq!(
            extract_form_action(IDP_RESPONSE).unwrap(),
            "https://canvas.auckland.ac.nz/login/saml"
        );
    }

    #[test]
    fn relay_state_is_optional_but_found() {
        assert_eq!(hidden_field(IDP_RESPONSE, "RelayState").unwrap(), "cookie:1700000000_ab12");
    }

    #[test]
    fn missing_assertion_is_typed_error() {
        let body = r#"<form action="/x" method="post"><input type="text" name="SAMLResponse"></form>"#;
        assert_eq!(
            extract_assertion(body),
            Err(ExtractError::FieldMissing("SAMLResponse".into()))
        );
    }

    #[test]
    fn get_forms_are_ignored() {
        let body = r#"<form action="/search" method="get"></form>"#;
        assert_eq!(extract_form_action(body), Err(ExtractError::FormMissing));
    }

    #[test]
    fn attribute_order_does_not_matter() {
        let body = r#"<INPUT value='abc' NAME="SAMLResponse" type="HIDDEN">"#;
        assert_eq!(extract_assertion(body).unwrap(), "abc");
    }

    #[test]
    fn decodes_entities() {
        assert_eq!(decode_entities("a&amp;b&#47;c&#x2F;&lt;&bogus;"), "a&b/c/<&bogus;");
    }

    #[test]
    fn detects_login_form() {
        let body = r#"<form method="post"><input name="j_username"><input type="password" name="j_password"></form>"#;
        assert!(is_login_form(body));
        assert!(!is_login_form(IDP_RESPONSE));
    }
}
