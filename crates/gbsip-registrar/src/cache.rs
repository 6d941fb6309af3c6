use std::net::IpAddr;
use std::sync::Arc;

use dashmap::DashMap;
use smol_str::SmolStr;

/// Camera identity recorded on every accepted registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraRecord {
    pub device_id: SmolStr,
    pub ip: IpAddr,
    pub port: u16,
}

/// Seam to the platform's device cache.
///
/// The worker calls [`DeviceCache::place_in`] with the request-URI host as
/// the key on every successful accept, so downstream catalog and invite
/// flows can find the camera without a registrar round-trip.
pub trait DeviceCache: Send + Sync {
    fn place_in(&self, key: &str, camera: CameraRecord);
    fn find(&self, key: &str) -> Option<CameraRecord>;
}

/// In-memory device cache.
#[derive(Default, Clone)]
pub struct MemoryDeviceCache {
    inner: Arc<DashMap<SmolStr, CameraRecord>>,
}

impl MemoryDeviceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl DeviceCache for MemoryDeviceCache {
    fn place_in(&self, key: &str, camera: CameraRecord) {
        self.inner.insert(SmolStr::new(key), camera);
    }

    fn find(&self, key: &str) -> Option<CameraRecord> {
        self.inner.get(key).map(|entry| entry.clone())
    }
}
