// gbsip-rs - GB28181 SIP services for Rust
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Synchronous REGISTER fast path.
//!
//! The transport's delivery callback hands every REGISTER here. Malformed
//! and policy-violating requests are rejected immediately without a
//! transaction; everything else becomes a non-INVITE transaction on the
//! bounded queue, whose send doubles as the worker wake-up.

use std::sync::Arc;

use anyhow::{bail, Result};
use gbsip_core::{Method, Request, SipEndpoint};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::parse;
use crate::response;
use crate::transport::RegisterTransaction;
use crate::RegistrarShared;

/// What the intake did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeOutcome {
    /// Not a REGISTER; nothing to do here.
    Ignored,
    /// Rejected synchronously with this status code.
    Rejected(u16),
    /// Queued for the register worker.
    Enqueued,
}

/// Producer half of the registrar: validates and enqueues.
pub struct RegisterIntake {
    pub(crate) queue: mpsc::Sender<Arc<dyn RegisterTransaction>>,
    pub(crate) shared: Arc<RegistrarShared>,
}

impl RegisterIntake {
    /// Handles one inbound REGISTER from the transport.
    pub async fn receive(
        &self,
        local: SipEndpoint,
        remote: SipEndpoint,
        request: Request,
    ) -> Result<IntakeOutcome> {
        if request.method() != &Method::Register {
            return Ok(IntakeOutcome::Ignored);
        }

        let requested_expiry = parse::requested_expiry(&request);

        if !request.headers().contains("To") {
            return self
                .reject(&remote, &request, 400, "Missing To header")
                .await;
        }

        let has_user = parse::to_uri(&request)
            .and_then(|uri| uri.user().map(|user| !user.is_empty()))
            .unwrap_or(false);
        if !has_user {
            return self
                .reject(&remote, &request, 400, "Missing username on To header")
                .await;
        }

        if parse::contact_values(&request).is_empty() {
            return self
                .reject(&remote, &request, 400, "Missing Contact header")
                .await;
        }

        let minimum_expiry = self.shared.config.minimum_expiry;
        if requested_expiry > 0 && (requested_expiry as u64) < u64::from(minimum_expiry) {
            warn!(
                remote = %remote,
                requested_expiry,
                minimum_expiry,
                "register expiry below floor"
            );
            let response = response::interval_too_brief(
                &request,
                &self.shared.config.server_agent,
                minimum_expiry,
            )?;
            self.shared.transport.send_response(&remote, response).await?;
            return Ok(IntakeOutcome::Rejected(423));
        }

        let transaction = self
            .shared
            .transport
            .create_transaction(request, remote, local);

        match self.queue.try_send(transaction) {
            Ok(()) => {
                debug!(remote = %remote, "register enqueued");
                Ok(IntakeOutcome::Enqueued)
            }
            Err(mpsc::error::TrySendError::Full(transaction)) => {
                warn!(remote = %remote, "register queue full");
                let response = response::get_response(
                    transaction.request(),
                    480,
                    Some("Registrar overloaded, please try again shortly"),
                    &self.shared.config.server_agent,
                )?;
                self.shared.transport.send_response(&remote, response).await?;
                Ok(IntakeOutcome::Rejected(480))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                bail!("register queue closed");
            }
        }
    }

    async fn reject(
        &self,
        remote: &SipEndpoint,
        request: &Request,
        code: u16,
        reason: &str,
    ) -> Result<IntakeOutcome> {
        warn!(remote = %remote, code, reason, "register rejected");
        let response =
            response::get_response(request, code, Some(reason), &self.shared.config.server_agent)?;
        self.shared.transport.send_response(remote, response).await?;
        Ok(IntakeOutcome::Rejected(code))
    }
}
