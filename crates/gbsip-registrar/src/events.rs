use std::sync::Arc;

use gbsip_core::LocalSipAccount;
use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::transport::RegisterTransaction;

/// Registrar lifecycle events fanned out to subscribers.
#[derive(Clone)]
pub enum RegistrarEvent {
    /// An unauthenticated registration was accepted; the downstream
    /// device-management service should be told.
    RpcRegisterReceived {
        transaction: Arc<dyn RegisterTransaction>,
        account: LocalSipAccount,
    },

    /// A registration succeeded; alarm subscription follow-up may start.
    AlarmSubscribe {
        transaction: Arc<dyn RegisterTransaction>,
    },
}

impl std::fmt::Debug for RegistrarEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RpcRegisterReceived { transaction, .. } => f
                .debug_struct("RpcRegisterReceived")
                .field("remote", transaction.remote())
                .finish_non_exhaustive(),
            Self::AlarmSubscribe { transaction } => f
                .debug_struct("AlarmSubscribe")
                .field("remote", transaction.remote())
                .finish_non_exhaustive(),
        }
    }
}

/// Zero-or-more-subscriber event fan-out.
///
/// Delivery is fire-and-forget over unbounded channels; a subscriber that
/// went away is dropped on the next emit.
#[derive(Default)]
pub struct EventHub {
    subscribers: RwLock<Vec<mpsc::UnboundedSender<RegistrarEvent>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber and returns its receiving end.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<RegistrarEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Delivers the event to every live subscriber.
    pub fn emit(&self, event: RegistrarEvent) {
        self.subscribers
            .write()
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}
