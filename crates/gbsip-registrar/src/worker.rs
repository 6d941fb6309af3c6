// gbsip-rs - GB28181 SIP services for Rust
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The register worker: single consumer of the register queue.
//!
//! Exactly one worker drains the queue. The registrar has no per-account
//! locks; serial processing is the consistency guarantee, so never run
//! two of these against one queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use gbsip_core::SipAccount;
use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::cache::CameraRecord;
use crate::config::WORKER_WAIT;
use crate::events::RegistrarEvent;
use crate::parse;
use crate::response;
use crate::store::binding_expiry;
use crate::transport::RegisterTransaction;
use crate::RegistrarShared;

/// Outcome of processing one REGISTER transaction.
///
/// The full tag set of the original registrar is kept so downstream
/// consumers keep compiling; the worker itself produces only a subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterResult {
    Unknown,
    Trying,
    Forbidden,
    Authenticated,
    AuthenticationRequired,
    Failed,
    Error,
    RequestWithNoUser,
    RemoveAllRegistrations,
    DuplicateRequest,
    AuthenticatedFromCache,
    RequestWithNoContact,
    NonRegisterMethod,
    DomainNotServiced,
    IntervalTooBrief,
    SwitchboardPaymentRequired,
}

/// Cooperative stop signal for the worker loop.
///
/// The worker finishes the transaction in hand before exiting; nothing is
/// abandoned mid-response.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Consumer half of the registrar: runs the registration state machine.
pub struct RegisterWorker {
    pub(crate) queue: mpsc::Receiver<Arc<dyn RegisterTransaction>>,
    pub(crate) shared: Arc<RegistrarShared>,
    pub(crate) stop: StopHandle,
}

impl RegisterWorker {
    /// Handle used to ask the loop to wind down.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Runs until stopped or until every intake handle is dropped.
    pub async fn run(mut self) {
        info!("register worker started");
        loop {
            if self.stop.is_stopped() {
                break;
            }
            // The bounded wait keeps the loop responsive to the stop flag
            // even if a queue signal is lost.
            match time::timeout(WORKER_WAIT, self.queue.recv()).await {
                Ok(Some(transaction)) => {
                    let result = self.process(transaction).await;
                    debug!(?result, "register transaction processed");
                }
                Ok(None) => break,
                Err(_) => continue,
            }
        }
        info!("register worker stopped");
    }

    /// Processes one transaction, converting any failure into a 500.
    pub async fn process(&self, transaction: Arc<dyn RegisterTransaction>) -> RegisterResult {
        match self.register(&transaction).await {
            Ok(result) => result,
            Err(register_error) => {
                error!(%register_error, remote = %transaction.remote(), "register processing failed");
                match response::get_response(
                    transaction.request(),
                    500,
                    None,
                    &self.shared.config.server_agent,
                ) {
                    Ok(resp) => {
                        if let Err(send_error) = transaction.send_final_response(resp).await {
                            warn!(%send_error, "failed to send 500 response");
                        }
                    }
                    Err(build_error) => warn!(%build_error, "failed to build 500 response"),
                }
                RegisterResult::Error
            }
        }
    }

    async fn register(&self, transaction: &Arc<dyn RegisterTransaction>) -> Result<RegisterResult> {
        let request = transaction.request();
        let shared = &self.shared;

        // The To host is the canonical domain; strict-realm mapping is a
        // pass-through here.
        let Some(to) = parse::to_uri(request) else {
            let resp =
                response::get_response(request, 403, Some("Domain not serviced"), &shared.config.server_agent)?;
            transaction.send_final_response(resp).await?;
            info!(remote = %transaction.remote(), "register rejected: no serviced domain");
            return Ok(RegisterResult::DomainNotServiced);
        };
        let domain = to.host().to_owned();
        let user = to.user().unwrap_or_default().to_owned();

        let account = SipAccount::synthesize(&user, &domain);
        let local_account = shared.accounts.local_sip_account();

        if !local_account.authentication_enabled {
            let result = self.accept(transaction, &account).await?;
            shared.events.emit(RegistrarEvent::RpcRegisterReceived {
                transaction: Arc::clone(transaction),
                account: local_account,
            });
            shared.events.emit(RegistrarEvent::AlarmSubscribe {
                transaction: Arc::clone(transaction),
            });
            return Ok(result);
        }

        let decision = shared
            .authenticator
            .authenticate(transaction.local(), transaction.remote(), request, &account)
            .await;

        if !decision.authenticated {
            if decision.error_code == 403 {
                let mut resp =
                    response::get_response(request, 403, None, &shared.config.server_agent)?;
                if let Some(challenge) = decision.challenge {
                    resp.headers_mut().push(challenge.header, challenge.value);
                }
                transaction.send_final_response(resp).await?;
                info!(aor = %account.aor(), "register forbidden");
                return Ok(RegisterResult::Forbidden);
            }

            let mut resp = response::get_response(request, 401, None, &shared.config.server_agent)?;
            match decision.challenge {
                Some(challenge) => resp.headers_mut().push(challenge.header, challenge.value),
                None => {
                    resp.headers_mut().push(
                        "WWW-Authenticate",
                        shared.nonces.challenge_header(&shared.config.realm),
                    );
                }
            }
            transaction.send_final_response(resp).await?;
            info!(aor = %account.aor(), "register challenged");
            return Ok(RegisterResult::AuthenticationRequired);
        }

        let result = self.accept(transaction, &account).await?;
        shared.events.emit(RegistrarEvent::AlarmSubscribe {
            transaction: Arc::clone(transaction),
        });
        Ok(result)
    }

    /// Success path: bindings, response shape per user-agent policy,
    /// device cache.
    async fn accept(
        &self,
        transaction: &Arc<dyn RegisterTransaction>,
        account: &SipAccount,
    ) -> Result<RegisterResult> {
        let request = transaction.request();
        let shared = &self.shared;

        let contacts = parse::contact_values(request);
        let user_agent = parse::user_agent(request).to_owned();
        let requested_expiry = parse::requested_expiry(request);
        let max_expiry = shared.policy.max_expiry_for(&user_agent);

        let mut result = RegisterResult::Authenticated;
        let mut resp = response::get_response(request, 200, None, &shared.config.server_agent)?;

        if contacts.is_empty() {
            // The intake guarantees a Contact, but this path defends
            // against callers that bypass it. No bindings are echoed.
            debug!(aor = %account.aor(), "register accepted without contact");
        } else if contacts.len() == 1 && contacts[0].trim() == "*" {
            shared.bindings.remove_all(&account.aor()).await?;
            resp.headers_mut().push("Contact", "*");
            result = RegisterResult::RemoveAllRegistrations;
        } else {
            let contact = &contacts[0];
            let contact_uri = parse::contact_uri(contact).unwrap_or_default();
            let resolved = resolve_expiry(requested_expiry, max_expiry);

            match shared
                .bindings
                .update(
                    &account.aor(),
                    contact_uri,
                    Duration::from_secs(u64::from(resolved)),
                )
                .await
            {
                Ok(bindings) => {
                    if shared.policy.contact_list_supported_for(&user_agent) {
                        for binding in &bindings {
                            resp.headers_mut().push(
                                "Contact",
                                format!(
                                    "<{}>;expires={}",
                                    binding.contact,
                                    binding.expires.as_secs()
                                ),
                            );
                        }
                    } else {
                        let echoed =
                            binding_expiry(&bindings, contact_uri).unwrap_or(resolved);
                        resp.headers_mut()
                            .push("Contact", format!("<{}>;expires={}", contact_uri, echoed));
                    }
                }
                Err(store_error) => {
                    // Answer 200 anyway with a short expiry so the device
                    // retries once the store is back.
                    warn!(%store_error, aor = %account.aor(), "binding store unavailable, forcing short expiry");
                    resp.headers_mut().push(
                        "Contact",
                        format!(
                            "<{}>;expires={}",
                            contact_uri, shared.config.minimum_expiry
                        ),
                    );
                }
            }
        }

        transaction.send_final_response(resp).await?;

        let remote = transaction.remote();
        shared.cache.place_in(
            request.uri().host(),
            CameraRecord {
                device_id: account.username.clone(),
                ip: remote.ip(),
                port: remote.port(),
            },
        );

        info!(aor = %account.aor(), user_agent = %user_agent, "register success");
        Ok(result)
    }
}

/// Expiry granted for a request: the device's ask bounded by the policy
/// ceiling; an unspecified ask gets the ceiling.
fn resolve_expiry(requested: i64, max_expiry: u32) -> u32 {
    if requested < 0 {
        max_expiry
    } else {
        (requested as u64).min(u64::from(max_expiry)) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_expiry_bounds() {
        assert_eq!(resolve_expiry(-1, 3600), 3600);
        assert_eq!(resolve_expiry(0, 3600), 0);
        assert_eq!(resolve_expiry(1800, 3600), 1800);
        assert_eq!(resolve_expiry(7200, 3600), 3600);
    }
}
