use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use gbsip_core::{Request, SipAccount, SipEndpoint};
use rand::{thread_rng, Rng};
use smol_str::SmolStr;

/// Challenge header an authenticator wants attached to its rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    pub header: SmolStr,
    pub value: SmolStr,
}

/// Outcome of an authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthDecision {
    pub authenticated: bool,
    /// Status code to reject with when not authenticated (401 or 403).
    pub error_code: u16,
    pub challenge: Option<AuthChallenge>,
}

impl AuthDecision {
    pub fn accept() -> Self {
        Self {
            authenticated: true,
            error_code: 0,
            challenge: None,
        }
    }

    pub fn unauthorized(challenge: Option<AuthChallenge>) -> Self {
        Self {
            authenticated: false,
            error_code: 401,
            challenge,
        }
    }

    pub fn forbidden(challenge: Option<AuthChallenge>) -> Self {
        Self {
            authenticated: false,
            error_code: 403,
            challenge,
        }
    }
}

/// Digest (or other) credential verification seam.
///
/// The cryptographic validation itself lives outside the registrar core;
/// implementations see the full request plus the account synthesized from
/// the To header and decide accept, challenge, or forbid.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(
        &self,
        local: &SipEndpoint,
        remote: &SipEndpoint,
        request: &Request,
        account: &SipAccount,
    ) -> AuthDecision;
}

/// Authenticator that accepts everything. Useful on closed networks and
/// in tests; production deployments wire a digest implementation instead.
#[derive(Debug, Default)]
pub struct AcceptAll;

#[async_trait]
impl Authenticator for AcceptAll {
    async fn authenticate(
        &self,
        _local: &SipEndpoint,
        _remote: &SipEndpoint,
        _request: &Request,
        _account: &SipAccount,
    ) -> AuthDecision {
        AuthDecision::accept()
    }
}

/// How long a camera has to answer a challenge before its nonce lapses.
const NONCE_TTL: Duration = Duration::from_secs(300);

/// Single-use nonces backing WWW-Authenticate challenges.
///
/// A 401 hands the camera a freshly issued nonce; when the retried
/// REGISTER comes back, the digest collaborator redeems it. Redeeming
/// consumes the entry, so a replayed Authorization header finds nothing,
/// and anything unredeemed past its deadline is swept on the next issue.
#[derive(Debug)]
pub struct ChallengeNonces {
    live: DashMap<SmolStr, Instant>,
    ttl: Duration,
}

impl ChallengeNonces {
    pub fn new(ttl: Duration) -> Self {
        Self {
            live: DashMap::new(),
            ttl,
        }
    }

    /// Mints and records a fresh nonce.
    pub fn issue(&self) -> SmolStr {
        self.sweep();
        let nonce = SmolStr::new(format!("{:032x}", thread_rng().gen::<u128>()));
        self.live.insert(nonce.clone(), Instant::now() + self.ttl);
        nonce
    }

    /// Complete WWW-Authenticate value for a 401, carrying a fresh nonce.
    pub fn challenge_header(&self, realm: &str) -> SmolStr {
        SmolStr::new(format!(
            "Digest realm=\"{}\", nonce=\"{}\"",
            realm,
            self.issue()
        ))
    }

    /// Consumes the nonce. True exactly once per unexpired issue.
    pub fn redeem(&self, nonce: &str) -> bool {
        match self.live.remove(nonce) {
            Some((_, deadline)) => deadline > Instant::now(),
            None => false,
        }
    }

    /// Drops entries past their deadline.
    pub fn sweep(&self) {
        let now = Instant::now();
        self.live.retain(|_, deadline| *deadline > now);
    }

    /// Nonces issued but not yet redeemed or swept.
    pub fn outstanding(&self) -> usize {
        self.live.len()
    }
}

impl Default for ChallengeNonces {
    fn default() -> Self {
        Self::new(NONCE_TTL)
    }
}
