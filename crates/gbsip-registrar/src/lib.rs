// gbsip-rs - GB28181 SIP services for Rust
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! GB28181 REGISTER server core.
//!
//! Cameras register over SIP; this crate validates their REGISTER
//! requests, authenticates them, answers on the wire, and feeds accepted
//! devices to the platform's device cache and event hooks. The wire
//! transport, digest validation, and persistent stores are collaborators
//! behind traits — the crate owns the decision machine, not the sockets.
//!
//! The shape is one producer and one consumer: [`RegisterIntake`] runs in
//! the transport's delivery context and does fast-path rejection plus a
//! bounded enqueue; a single [`RegisterWorker`] drains the queue and runs
//! the per-transaction state machine. Serial processing by that one
//! worker is the registrar's consistency guarantee.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use gbsip_registrar::{RegistrarConfig, RegistrarCore, UserAgentPolicy};
//! # use gbsip_registrar::{AcceptAll, StaticAccountStore};
//! # use gbsip_core::{LocalSipAccount, TransportKind};
//! # use smol_str::SmolStr;
//! # fn transport() -> Arc<dyn gbsip_registrar::RegistrarTransport> { unimplemented!() }
//!
//! # async fn example() -> anyhow::Result<()> {
//! let account = LocalSipAccount {
//!     username: SmolStr::new("34020000002000000001"),
//!     domain: SmolStr::new("3402000000"),
//!     local_ip: "0.0.0.0".parse()?,
//!     local_port: 5060,
//!     msg_protocol: TransportKind::Udp,
//!     authentication_enabled: false,
//! };
//! let core = RegistrarCore::new(
//!     RegistrarConfig::default(),
//!     UserAgentPolicy::empty(),
//!     transport(),
//!     Arc::new(AcceptAll),
//!     Arc::new(StaticAccountStore::new(account)),
//! );
//! let (intake, worker) = core.split();
//! tokio::spawn(worker.run());
//! // transport delivery callback: intake.receive(local, remote, request).await
//! # Ok(())
//! # }
//! ```

mod auth;
mod cache;
mod config;
mod events;
mod intake;
mod parse;
mod policy;
mod response;
mod store;
mod subscribe;
mod transport;
mod worker;

use std::sync::Arc;

use tokio::sync::mpsc;

pub use auth::{AcceptAll, AuthChallenge, AuthDecision, Authenticator, ChallengeNonces};
pub use cache::{CameraRecord, DeviceCache, MemoryDeviceCache};
pub use config::{
    RegistrarConfig, DEFAULT_MAX_EXPIRY, DEFAULT_MINIMUM_EXPIRY, REGISTER_QUEUE_CAPACITY,
    WORKER_WAIT,
};
pub use events::{EventHub, RegistrarEvent};
pub use intake::{IntakeOutcome, RegisterIntake};
pub use policy::UserAgentPolicy;
pub use response::{ensure_to_tag, get_response, interval_too_brief};
pub use store::{
    binding_expiry, AccountStore, Binding, BindingStore, MemoryBindingStore, StaticAccountStore,
};
pub use subscribe::{AlarmSubscription, EventSubscription, MonitorEvent};
pub use transport::{RegisterTransaction, RegistrarTransport};
pub use worker::{RegisterResult, RegisterWorker, StopHandle};

/// Everything both halves of the registrar share.
pub(crate) struct RegistrarShared {
    pub(crate) config: RegistrarConfig,
    pub(crate) policy: UserAgentPolicy,
    pub(crate) transport: Arc<dyn RegistrarTransport>,
    pub(crate) authenticator: Arc<dyn Authenticator>,
    pub(crate) accounts: Arc<dyn AccountStore>,
    pub(crate) bindings: Arc<dyn BindingStore>,
    pub(crate) cache: Arc<dyn DeviceCache>,
    pub(crate) events: Arc<EventHub>,
    pub(crate) nonces: ChallengeNonces,
}

/// Assembles a registrar and splits it into intake and worker halves.
pub struct RegistrarCore {
    config: RegistrarConfig,
    policy: UserAgentPolicy,
    transport: Arc<dyn RegistrarTransport>,
    authenticator: Arc<dyn Authenticator>,
    accounts: Arc<dyn AccountStore>,
    bindings: Arc<dyn BindingStore>,
    cache: Arc<dyn DeviceCache>,
    events: Arc<EventHub>,
}

impl RegistrarCore {
    /// Builds a registrar over the required collaborators. Binding store
    /// and device cache default to the in-memory implementations.
    pub fn new(
        config: RegistrarConfig,
        policy: UserAgentPolicy,
        transport: Arc<dyn RegistrarTransport>,
        authenticator: Arc<dyn Authenticator>,
        accounts: Arc<dyn AccountStore>,
    ) -> Self {
        Self {
            config,
            policy,
            transport,
            authenticator,
            accounts,
            bindings: Arc::new(MemoryBindingStore::new()),
            cache: Arc::new(MemoryDeviceCache::new()),
            events: Arc::new(EventHub::new()),
        }
    }

    /// Replaces the binding store.
    pub fn with_bindings(mut self, bindings: Arc<dyn BindingStore>) -> Self {
        self.bindings = bindings;
        self
    }

    /// Replaces the device cache.
    pub fn with_cache(mut self, cache: Arc<dyn DeviceCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Subscribes to registrar events (RPC register, alarm follow-up).
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<RegistrarEvent> {
        self.events.subscribe()
    }

    /// Splits into the producer and consumer halves, connected by the
    /// bounded register queue.
    pub fn split(self) -> (RegisterIntake, RegisterWorker) {
        let shared = Arc::new(RegistrarShared {
            config: self.config,
            policy: self.policy,
            transport: self.transport,
            authenticator: self.authenticator,
            accounts: self.accounts,
            bindings: self.bindings,
            cache: self.cache,
            events: self.events,
            nonces: ChallengeNonces::default(),
        });

        let (tx, rx) = mpsc::channel(REGISTER_QUEUE_CAPACITY);
        let intake = RegisterIntake {
            queue: tx,
            shared: Arc::clone(&shared),
        };
        let worker = RegisterWorker {
            queue: rx,
            shared,
            stop: StopHandle::default(),
        };
        (intake, worker)
    }
}
