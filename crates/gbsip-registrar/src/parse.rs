// gbsip-rs - GB28181 SIP services for Rust
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Header-value extraction helpers for REGISTER processing.
//!
//! These operate on already-parsed messages; wire parsing belongs to the
//! transport layer.

use gbsip_core::{Request, SipUri};
use smol_str::SmolStr;

/// Extracts the URI from an address header value, tolerating display
/// names, angle brackets, and trailing header parameters.
pub fn addr_uri(value: &str) -> Option<SipUri> {
    let trimmed = value.trim();

    let uri_text = if let Some(start) = trimmed.find('<') {
        let rest = &trimmed[start + 1..];
        let end = rest.find('>')?;
        &rest[..end]
    } else {
        // Without brackets, everything from the first semicolon on is a
        // header parameter, not part of the URI.
        match trimmed.find(';') {
            Some(pos) => &trimmed[..pos],
            None => trimmed,
        }
    };

    SipUri::parse(uri_text).ok()
}

/// Parses the To header's URI, if the header is present and well formed.
pub fn to_uri(request: &Request) -> Option<SipUri> {
    request.headers().get("To").and_then(|v| addr_uri(v))
}

/// All Contact header values with non-empty content, in order.
pub fn contact_values(request: &Request) -> Vec<SmolStr> {
    request
        .headers()
        .all("Contact")
        .filter(|v| !v.trim().is_empty())
        .map(SmolStr::new)
        .collect()
}

/// Extracts the bare URI text from a Contact header value.
pub fn contact_uri(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed == "*" {
        return Some("*");
    }

    if let Some(start) = trimmed.find('<') {
        let rest = &trimmed[start + 1..];
        let end = rest.find('>')?;
        let uri = rest[..end].trim();
        return (!uri.is_empty()).then_some(uri);
    }

    let uri = match trimmed.find(';') {
        Some(pos) => trimmed[..pos].trim(),
        None => trimmed,
    };
    (!uri.is_empty()).then_some(uri)
}

/// Looks up a `;name=value` parameter in the part of a Contact value that
/// follows the URI.
pub fn contact_param<'a>(value: &'a str, name: &str) -> Option<&'a str> {
    let trimmed = value.trim();
    if trimmed == "*" {
        return None;
    }

    let params_section = if let Some(start) = trimmed.find('<') {
        let rest = &trimmed[start + 1..];
        let end = rest.find('>')?;
        &rest[end + 1..]
    } else {
        match trimmed.find(';') {
            Some(pos) => &trimmed[pos..],
            None => return None,
        }
    };

    for param in params_section.split(';') {
        let param = param.trim();
        if param.is_empty() {
            continue;
        }
        if let Some((key, value)) = param.split_once('=') {
            if key.trim().eq_ignore_ascii_case(name) {
                let value = value.trim();
                return (!value.is_empty()).then_some(value);
            }
        }
    }

    None
}

/// The expiry the device asked for: the first Contact's `expires`
/// parameter, else the top-level Expires header, else -1 (unspecified).
pub fn requested_expiry(request: &Request) -> i64 {
    if let Some(contact) = request.headers().get("Contact") {
        if let Some(value) = contact_param(contact, "expires") {
            if let Ok(value) = value.parse::<i64>() {
                return value;
            }
        }
    }

    request
        .headers()
        .get("Expires")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(-1)
}

/// The User-Agent header value, or empty when absent.
pub fn user_agent(request: &Request) -> &str {
    request.headers().get("User-Agent").unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use gbsip_core::{Headers, Method, RequestLine};

    fn register_request(headers: Headers) -> Request {
        Request::new(
            RequestLine::new(
                Method::Register,
                SipUri::parse("sip:3402000000").unwrap(),
            ),
            headers,
            Bytes::new(),
        )
        .unwrap()
    }

    #[test]
    fn addr_uri_handles_name_addr_forms() {
        let uri = addr_uri("\"Cam 1\" <sip:34020000001320000001@3402000000>;tag=abc").unwrap();
        assert_eq!(uri.user(), Some("34020000001320000001"));

        let uri = addr_uri("sip:alice@example.com;tag=xyz").unwrap();
        assert_eq!(uri.user(), Some("alice"));
        // the tag is a header parameter, not a URI parameter
        assert_eq!(uri.parameter("tag"), None);
    }

    #[test]
    fn contact_uri_variants() {
        assert_eq!(
            contact_uri("<sip:cam@192.168.1.64:5060>;expires=3600"),
            Some("sip:cam@192.168.1.64:5060")
        );
        assert_eq!(
            contact_uri("sip:cam@192.168.1.64;transport=udp"),
            Some("sip:cam@192.168.1.64")
        );
        assert_eq!(contact_uri("*"), Some("*"));
        assert_eq!(contact_uri("   "), None);
    }

    #[test]
    fn contact_param_lookup() {
        let value = "<sip:cam@192.168.1.64>;q=0.8;expires=1800";
        assert_eq!(contact_param(value, "expires"), Some("1800"));
        assert_eq!(contact_param(value, "EXPIRES"), Some("1800"));
        assert_eq!(contact_param(value, "q"), Some("0.8"));
        assert_eq!(contact_param(value, "missing"), None);
    }

    #[test]
    fn contact_expires_wins_over_header() {
        let mut headers = Headers::new();
        headers.push("Contact", "<sip:cam@192.168.1.64>;expires=120");
        headers.push("Expires", "3600");
        assert_eq!(requested_expiry(&register_request(headers)), 120);
    }

    #[test]
    fn header_expires_is_the_fallback() {
        let mut headers = Headers::new();
        headers.push("Contact", "<sip:cam@192.168.1.64>");
        headers.push("Expires", "3600");
        assert_eq!(requested_expiry(&register_request(headers)), 3600);
    }

    #[test]
    fn unspecified_expiry_is_minus_one() {
        let mut headers = Headers::new();
        headers.push("Contact", "<sip:cam@192.168.1.64>");
        assert_eq!(requested_expiry(&register_request(headers)), -1);
    }
}
