// gbsip-rs - GB28181 SIP services for Rust
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use gbsip_core::LocalSipAccount;
use smol_str::SmolStr;

/// Registration binding for an address-of-record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub aor: SmolStr,
    pub contact: SmolStr,
    pub expires: Duration,
}

/// Persistence seam for registration bindings.
///
/// The worker survives a failing store: a persistence error still draws a
/// 200 OK, with the Contact expiry coerced down so the device retries
/// promptly.
#[async_trait]
pub trait BindingStore: Send + Sync {
    /// Inserts, refreshes, or (with a zero expiry) removes one binding,
    /// returning the AOR's bindings after the update.
    async fn update(&self, aor: &str, contact: &str, expires: Duration) -> Result<Vec<Binding>>;

    /// Removes every binding for the AOR (wildcard deregistration).
    async fn remove_all(&self, aor: &str) -> Result<()>;

    /// Current unexpired bindings for the AOR.
    async fn bindings(&self, aor: &str) -> Result<Vec<Binding>>;
}

/// Resolved expiry of `contact` within a binding list.
///
/// An empty list means no binding, never a zero expiry.
pub fn binding_expiry(bindings: &[Binding], contact: &str) -> Option<u32> {
    if bindings.is_empty() {
        return None;
    }
    bindings
        .iter()
        .find(|b| b.contact.as_str() == contact)
        .map(|b| b.expires.as_secs() as u32)
}

/// In-memory binding store with expiry tracking.
#[derive(Default, Clone)]
pub struct MemoryBindingStore {
    inner: Arc<DashMap<SmolStr, Vec<StoredBinding>>>,
}

#[derive(Debug, Clone)]
struct StoredBinding {
    contact: SmolStr,
    expires_at: Instant,
}

impl MemoryBindingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn purge_expired(&self, aor: &SmolStr) {
        if let Some(mut entry) = self.inner.get_mut(aor) {
            entry.retain(|b| b.expires_at > Instant::now());
        }
    }

    fn snapshot(&self, aor: &SmolStr) -> Vec<Binding> {
        let now = Instant::now();
        match self.inner.get(aor) {
            Some(entry) => entry
                .iter()
                .filter(|b| b.expires_at > now)
                .map(|b| {
                    let remaining = b.expires_at.saturating_duration_since(now);
                    // round up so a just-granted n-second binding reads n
                    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
                    Binding {
                        aor: aor.clone(),
                        contact: b.contact.clone(),
                        expires: Duration::from_secs(secs),
                    }
                })
                .collect(),
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl BindingStore for MemoryBindingStore {
    async fn update(&self, aor: &str, contact: &str, expires: Duration) -> Result<Vec<Binding>> {
        let aor_key = SmolStr::new(aor);
        self.purge_expired(&aor_key);

        {
            let mut list = self.inner.entry(aor_key.clone()).or_default();
            list.retain(|b| b.contact.as_str() != contact);
            if !expires.is_zero() {
                list.push(StoredBinding {
                    contact: SmolStr::new(contact),
                    expires_at: Instant::now() + expires,
                });
            }
        }

        Ok(self.snapshot(&aor_key))
    }

    async fn remove_all(&self, aor: &str) -> Result<()> {
        self.inner.remove(&SmolStr::new(aor));
        Ok(())
    }

    async fn bindings(&self, aor: &str) -> Result<Vec<Binding>> {
        let aor_key = SmolStr::new(aor);
        self.purge_expired(&aor_key);
        Ok(self.snapshot(&aor_key))
    }
}

/// Source of the registrar's own SIP identity.
pub trait AccountStore: Send + Sync {
    fn local_sip_account(&self) -> LocalSipAccount;
}

/// Account store returning one fixed account, the usual arrangement for a
/// single-domain GB28181 platform.
#[derive(Debug, Clone)]
pub struct StaticAccountStore {
    account: LocalSipAccount,
}

impl StaticAccountStore {
    pub fn new(account: LocalSipAccount) -> Self {
        Self { account }
    }
}

impl AccountStore for StaticAccountStore {
    fn local_sip_account(&self) -> LocalSipAccount {
        self.account.clone()
    }
}
