// gbsip-rs - GB28181 SIP services for Rust
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use gbsip_core::{Request, Response, SipEndpoint};

/// One inbound REGISTER bound to its endpoints.
///
/// The transaction layer owns retransmission; the registrar core sends at
/// most one final response per transaction through
/// [`RegisterTransaction::send_final_response`].
#[async_trait]
pub trait RegisterTransaction: Send + Sync {
    fn request(&self) -> &Request;
    fn local(&self) -> &SipEndpoint;
    fn remote(&self) -> &SipEndpoint;
    async fn send_final_response(&self, response: Response) -> Result<()>;
}

/// Seam to the SIP transport layer.
///
/// The transport parses and serializes wire messages, runs RFC 3261
/// transaction timers, and owns the sockets. The registrar only asks it
/// to ship responses and to mint non-INVITE server transactions.
#[async_trait]
pub trait RegistrarTransport: Send + Sync {
    /// Sends a response outside any transaction (intake fast-path
    /// rejections).
    async fn send_response(&self, remote: &SipEndpoint, response: Response) -> Result<()>;

    /// Creates a non-INVITE server transaction for the request.
    fn create_transaction(
        &self,
        request: Request,
        remote: SipEndpoint,
        local: SipEndpoint,
    ) -> Arc<dyn RegisterTransaction>;
}
