use std::time::Duration;

use smol_str::SmolStr;

/// Register queue capacity. The intake rejects with 480 once this many
/// transactions are pending.
pub const REGISTER_QUEUE_CAPACITY: usize = 1000;

/// Upper bound on the worker's wait for a queue signal. A lost signal
/// stalls the loop for at most this long before it re-checks the queue
/// and the stop flag.
pub const WORKER_WAIT: Duration = Duration::from_millis(10_000);

/// Expiry granted when neither the request nor the policy table says
/// otherwise.
pub const DEFAULT_MAX_EXPIRY: u32 = 3600;

/// Default floor under which requested expiries draw a 423.
pub const DEFAULT_MINIMUM_EXPIRY: u32 = 60;

/// Registrar tuning knobs fixed at startup.
#[derive(Debug, Clone)]
pub struct RegistrarConfig {
    /// Value of the User-Agent header on every response.
    pub server_agent: SmolStr,

    /// Realm advertised in WWW-Authenticate challenges.
    pub realm: SmolStr,

    /// Minimum REGISTER expiry accepted; lower positive requests get 423
    /// with this value in Min-Expires.
    pub minimum_expiry: u32,
}

impl Default for RegistrarConfig {
    fn default() -> Self {
        Self {
            server_agent: SmolStr::new("gbsip/0.3"),
            realm: SmolStr::new("gbsip.local"),
            minimum_expiry: DEFAULT_MINIMUM_EXPIRY,
        }
    }
}
