// gbsip-rs - GB28181 SIP services for Rust
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! SIP response construction for the registrar.
//!
//! Responses echo the request's Via set, From, To, Call-ID and CSeq per
//! RFC 3261 §8.2.6; a To tag is minted when the request carried none.
//! Max-Forwards is never emitted on responses.

use bytes::Bytes;
use chrono::Utc;
use gbsip_core::{Headers, MessageError, Request, Response, StatusLine};
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use smol_str::SmolStr;

/// Canonical reason phrase for the status codes the registrar sends.
fn default_reason(code: u16) -> &'static str {
    match code {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        423 => "Interval Too Brief",
        480 => "Temporarily Unavailable",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

fn fresh_tag() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect()
}

/// Adds a tag to a To header value unless one is already present.
pub fn ensure_to_tag(to: &str) -> SmolStr {
    let has_tag = to
        .split(';')
        .skip(1)
        .any(|param| {
            param
                .trim()
                .split_once('=')
                .map(|(key, _)| key.trim().eq_ignore_ascii_case("tag"))
                .unwrap_or(false)
        });
    if has_tag {
        SmolStr::new(to)
    } else {
        SmolStr::new(format!("{};tag={}", to.trim(), fresh_tag()))
    }
}

/// Builds a response to `request` with the given status.
///
/// A custom `reason` replaces the canonical phrase; 2xx responses carry a
/// Date header.
pub fn get_response(
    request: &Request,
    code: u16,
    reason: Option<&str>,
    server_agent: &str,
) -> Result<Response, MessageError> {
    let reason = reason.unwrap_or_else(|| default_reason(code));
    let mut headers = Headers::new();

    for via in request.headers().all("Via") {
        headers.push("Via", via);
    }
    if let Some(from) = request.headers().get("From") {
        headers.push("From", from);
    }
    if let Some(to) = request.headers().get("To") {
        headers.push("To", ensure_to_tag(to));
    }
    if let Some(call_id) = request.headers().get("Call-ID") {
        headers.push("Call-ID", call_id);
    }
    if let Some(cseq) = request.headers().get("CSeq") {
        headers.push("CSeq", cseq);
    }

    headers.push("User-Agent", server_agent);
    if (200..300).contains(&code) {
        headers.push("Date", Utc::now().to_rfc2822());
    }
    headers.push("Content-Length", "0");

    Response::new(StatusLine::new(code, reason)?, headers, Bytes::new())
}

/// 423 Interval Too Brief carrying the registrar's expiry floor.
pub fn interval_too_brief(
    request: &Request,
    server_agent: &str,
    min_expires: u32,
) -> Result<Response, MessageError> {
    let mut response = get_response(request, 423, None, server_agent)?;
    response
        .headers_mut()
        .push("Min-Expires", min_expires.to_string());
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gbsip_core::{Method, RequestLine, SipUri};

    fn register_request() -> Request {
        let mut headers = Headers::new();
        headers.push("Via", "SIP/2.0/UDP 192.168.1.64:5060;branch=z9hG4bKcam1");
        headers.push("Via", "SIP/2.0/UDP 10.0.0.2:5060;branch=z9hG4bKhop2");
        headers.push("From", "<sip:34020000001320000001@3402000000>;tag=123");
        headers.push("To", "<sip:34020000001320000001@3402000000>");
        headers.push("Call-ID", "20210930@192.168.1.64");
        headers.push("CSeq", "1 REGISTER");
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
    fn echoes_all_vias_and_dialog_headers() {
        let response = get_response(&register_request(), 200, None, "gbsip/0.3").unwrap();

        assert_eq!(response.code(), 200);
        assert_eq!(response.headers().all("Via").count(), 2);
        assert!(response.headers().contains("From"));
        assert_eq!(
            response.headers().get("Call-ID"),
            Some("20210930@192.168.1.64")
        );
        assert_eq!(response.headers().get("CSeq"), Some("1 REGISTER"));
        assert_eq!(response.headers().get("User-Agent"), Some("gbsip/0.3"));
        assert!(!response.headers().contains("Max-Forwards"));
    }

    #[test]
    fn ok_responses_carry_a_date() {
        let response = get_response(&register_request(), 200, None, "gbsip/0.3").unwrap();
        assert!(response.headers().get("Date").is_some());

        let response = get_response(&register_request(), 400, None, "gbsip/0.3").unwrap();
        assert!(response.headers().get("Date").is_none());
    }

    #[test]
    fn generates_to_tag_when_absent() {
        let response = get_response(&register_request(), 200, None, "gbsip/0.3").unwrap();
        let to = response.headers().get("To").unwrap();
        assert!(to.contains(";tag="));
    }

    #[test]
    fn preserves_existing_to_tag() {
        assert_eq!(
            ensure_to_tag("<sip:a@b>;tag=xyz"),
            SmolStr::new("<sip:a@b>;tag=xyz")
        );
    }

    #[test]
    fn custom_reason_replaces_default() {
        let response =
            get_response(&register_request(), 400, Some("Missing To header"), "gbsip/0.3")
                .unwrap();
        assert_eq!(response.reason(), "Missing To header");
    }

    #[test]
    fn interval_too_brief_carries_floor() {
        let response = interval_too_brief(&register_request(), "gbsip/0.3", 60).unwrap();
        assert_eq!(response.code(), 423);
        assert_eq!(response.reason(), "Interval Too Brief");
        assert_eq!(response.headers().get("Min-Expires"), Some("60"));
    }
}
