// gbsip-rs - GB28181 SIP services for Rust
// SPDX-License-Identifier: Apache-2.0 OR MIT

use bytes::Bytes;
use smol_str::SmolStr;

use crate::{headers::Headers, method::Method, uri::SipUri};

const MAX_REASON_LENGTH: usize = 256;
const MAX_BODY_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    InvalidStatusCode { code: u16 },
    ReasonTooLong { max: usize, actual: usize },
    InvalidReason(String),
    BodyTooLarge { max: usize, actual: usize },
}

impl std::fmt::Display for MessageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidStatusCode { code } => {
                write!(f, "invalid SIP status code: {} (must be 100-699)", code)
            }
            Self::ReasonTooLong { max, actual } => {
                write!(f, "reason phrase too long (max {}, got {})", max, actual)
            }
            Self::InvalidReason(msg) => write!(f, "invalid reason phrase: {}", msg),
            Self::BodyTooLarge { max, actual } => {
                write!(f, "body too large (max {}, got {})", max, actual)
            }
        }
    }
}

impl std::error::Error for MessageError {}

/// SIP protocol version. Only SIP/2.0 exists in the wild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SipVersion {
    #[default]
    V2,
}

impl SipVersion {
    pub fn as_str(&self) -> &'static str {
        "SIP/2.0"
    }
}

/// First line of a SIP request: `Method SP Request-URI SP SIP-Version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    method: Method,
    uri: SipUri,
    version: SipVersion,
}

impl RequestLine {
    /// Creates a request line for the given method and target URI.
    pub fn new(method: Method, uri: SipUri) -> Self {
        Self {
            method,
            uri,
            version: SipVersion::V2,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &SipUri {
        &self.uri
    }

    pub fn version(&self) -> &SipVersion {
        &self.version
    }
}

/// First line of a SIP response: `SIP-Version SP Status-Code SP Reason-Phrase`.
///
/// Status codes are constrained to the SIP range (100-699) and reason
/// phrases may not carry control characters, which blocks CRLF injection
/// into serialized responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    version: SipVersion,
    code: u16,
    reason: SmolStr,
}

impl StatusLine {
    /// Creates a status line with the provided code and reason phrase.
    pub fn new(code: u16, reason: impl AsRef<str>) -> Result<Self, MessageError> {
        if !(100..=699).contains(&code) {
            return Err(MessageError::InvalidStatusCode { code });
        }

        let reason = reason.as_ref();
        validate_reason_phrase(reason)?;

        Ok(Self {
            version: SipVersion::V2,
            code,
            reason: SmolStr::new(reason),
        })
    }

    pub fn version(&self) -> &SipVersion {
        &self.version
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.code)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.code)
    }
}

/// Immutable in-memory representation of a SIP request message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    start: RequestLine,
    headers: Headers,
    body: Bytes,
}

impl Request {
    /// Builds a request from its components, rejecting oversized bodies.
    pub fn new(start: RequestLine, headers: Headers, body: Bytes) -> Result<Self, MessageError> {
        validate_body_size(&body)?;
        Ok(Self {
            start,
            headers,
            body,
        })
    }

    pub fn start_line(&self) -> &RequestLine {
        &self.start
    }

    pub fn method(&self) -> &Method {
        self.start.method()
    }

    pub fn uri(&self) -> &SipUri {
        self.start.uri()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn has_body(&self) -> bool {
        !self.body.is_empty()
    }
}

/// Immutable in-memory representation of a SIP response message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    start: StatusLine,
    headers: Headers,
    body: Bytes,
}

impl Response {
    /// Builds a response from its components, rejecting oversized bodies.
    pub fn new(start: StatusLine, headers: Headers, body: Bytes) -> Result<Self, MessageError> {
        validate_body_size(&body)?;
        Ok(Self {
            start,
            headers,
            body,
        })
    }

    pub fn start_line(&self) -> &StatusLine {
        &self.start
    }

    pub fn code(&self) -> u16 {
        self.start.code()
    }

    pub fn reason(&self) -> &str {
        self.start.reason()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn is_success(&self) -> bool {
        self.start.is_success()
    }
}

/// Either a SIP request or response message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SipMessage {
    Request(Request),
    Response(Response),
}

impl SipMessage {
    pub fn is_request(&self) -> bool {
        matches!(self, Self::Request(_))
    }

    pub fn as_request(&self) -> Option<&Request> {
        match self {
            Self::Request(req) => Some(req),
            _ => None,
        }
    }

    pub fn as_response(&self) -> Option<&Response> {
        match self {
            Self::Response(res) => Some(res),
            _ => None,
        }
    }

    pub fn headers(&self) -> &Headers {
        match self {
            Self::Request(req) => req.headers(),
            Self::Response(res) => res.headers(),
        }
    }
}

fn validate_reason_phrase(reason: &str) -> Result<(), MessageError> {
    if reason.len() > MAX_REASON_LENGTH {
        return Err(MessageError::ReasonTooLong {
            max: MAX_REASON_LENGTH,
            actual: reason.len(),
        });
    }

    if reason.chars().any(|c| c.is_ascii_control()) {
        return Err(MessageError::InvalidReason(
            "contains control characters".to_string(),
        ));
    }

    Ok(())
}

fn validate_body_size(body: &Bytes) -> Result<(), MessageError> {
    if body.len() > MAX_BODY_SIZE {
        return Err(MessageError::BodyTooLarge {
            max: MAX_BODY_SIZE,
            actual: body.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device_uri() -> SipUri {
        SipUri::parse("sip:34020000001320000001@3402000000").expect("valid URI")
    }

    #[test]
    fn create_request() {
        let request = Request::new(
            RequestLine::new(Method::Register, device_uri()),
            Headers::new(),
            Bytes::new(),
        )
        .unwrap();

        assert_eq!(request.method(), &Method::Register);
        assert!(!request.has_body());
    }

    #[test]
    fn create_response() {
        let response = Response::new(
            StatusLine::new(200, "OK").unwrap(),
            Headers::new(),
            Bytes::new(),
        )
        .unwrap();

        assert_eq!(response.code(), 200);
        assert_eq!(response.reason(), "OK");
        assert!(response.is_success());
    }

    #[test]
    fn reject_invalid_status_codes() {
        assert!(StatusLine::new(99, "Too Low").is_err());
        assert!(StatusLine::new(700, "Too High").is_err());
        assert!(StatusLine::new(100, "Trying").is_ok());
        assert!(StatusLine::new(699, "Unknown").is_ok());
    }

    #[test]
    fn reject_crlf_in_reason() {
        assert!(StatusLine::new(200, "OK\r\nInjected: evil").is_err());
        assert!(StatusLine::new(200, "OK\x00null").is_err());
    }

    #[test]
    fn reject_oversized_reason() {
        let long_reason = "x".repeat(MAX_REASON_LENGTH + 1);
        assert!(StatusLine::new(200, &long_reason).is_err());
    }

    #[test]
    fn reject_oversized_body() {
        let huge = Bytes::from(vec![0u8; MAX_BODY_SIZE + 1]);
        let result = Request::new(
            RequestLine::new(Method::Message, device_uri()),
            Headers::new(),
            huge,
        );
        assert!(result.is_err());
    }

    #[test]
    fn sip_message_accessors() {
        let request = Request::new(
            RequestLine::new(Method::Register, device_uri()),
            Headers::new(),
            Bytes::new(),
        )
        .unwrap();
        let message = SipMessage::Request(request);

        assert!(message.is_request());
        assert!(message.as_request().is_some());
        assert!(message.as_response().is_none());
    }
}
