// gbsip-rs - GB28181 SIP services for Rust
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::frame::{FrameKind, RtpFrame};
use crate::packet::RtpPacket;

const DEFAULT_MAX_FRAME_AGE: Duration = Duration::from_secs(2);

struct Slot {
    frame: RtpFrame,
    first_seen: Instant,
}

/// Groups incoming RTP packets into frames keyed by timestamp.
///
/// `push` hands back each frame exactly once, at the moment it becomes
/// complete. Frames whose tail never arrives are dropped by
/// [`FrameAssembler::evict_stale`], which the owner calls from its
/// housekeeping tick. Single-producer/single-consumer by convention; the
/// assembler does not lock.
pub struct FrameAssembler {
    frames: HashMap<u32, Slot>,
    max_age: Duration,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::with_max_age(DEFAULT_MAX_FRAME_AGE)
    }

    pub fn with_max_age(max_age: Duration) -> Self {
        Self {
            frames: HashMap::new(),
            max_age,
        }
    }

    /// Adds one packet, returning the reassembled frame when it completes.
    pub fn push(&mut self, packet: RtpPacket) -> Option<RtpFrame> {
        let timestamp = packet.timestamp();
        let slot = self.frames.entry(timestamp).or_insert_with(|| Slot {
            frame: RtpFrame::new(timestamp, FrameKind::from_payload_type(packet.payload_type())),
            first_seen: Instant::now(),
        });
        slot.frame.add_packet(packet);

        if slot.frame.is_complete() {
            let mut slot = self.frames.remove(&timestamp)?;
            slot.frame.mark_processed();
            return Some(slot.frame);
        }
        None
    }

    /// Number of frames still waiting for packets.
    pub fn pending(&self) -> usize {
        self.frames.len()
    }

    /// Drops frames older than the configured maximum age, returning how
    /// many were evicted.
    pub fn evict_stale(&mut self) -> usize {
        let now = Instant::now();
        let max_age = self.max_age;
        let before = self.frames.len();
        self.frames
            .retain(|_, slot| now.duration_since(slot.first_seen) <= max_age);
        let evicted = before - self.frames.len();
        if evicted > 0 {
            debug!(evicted, "dropped stale partial frames");
        }
        evicted
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}
