// gbsip-rs - GB28181 SIP services for Rust
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core SIP message model shared by the gbsip stack.
//!
//! Holds the immutable request/response types, the header collection, a
//! compact URI parser, and the endpoint/account records the registrar
//! consumes. Wire parsing and serialization live in the transport layer,
//! not here.

mod account;
mod endpoint;
mod headers;
mod method;
mod msg;
mod uri;

pub use account::{LocalSipAccount, SipAccount};
pub use endpoint::{SipEndpoint, TransportKind};
pub use headers::Headers;
pub use method::Method;
pub use msg::{
    MessageError, Request, RequestLine, Response, SipMessage, SipVersion, StatusLine,
};
pub use uri::{SipUri, UriError};
