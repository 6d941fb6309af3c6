// gbsip-rs - GB28181 SIP services for Rust
// SPDX-License-Identifier: Apache-2.0 OR MIT

use bytes::{Bytes, BytesMut};

use crate::depacketize::PayloadAdapter;
use crate::packet::RtpPacket;

const HALF_RANGE: u16 = 0x8000;

/// Media class of a reassembled frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    H264,
    Vp8,
    Audio,
    Other,
}

impl FrameKind {
    /// Maps the common GB28181 payload-type assignments.
    ///
    /// 98 is H.264 per the national standard's SDP conventions; 0 and 8
    /// are the G.711 audio types. Dynamic types the map does not know
    /// come back as `Other`.
    pub fn from_payload_type(payload_type: u8) -> Self {
        match payload_type {
            98 => FrameKind::H264,
            0 | 8 => FrameKind::Audio,
            _ => FrameKind::Other,
        }
    }
}

/// All RTP packets sharing one media timestamp, i.e. one video frame or
/// audio sample group.
///
/// The frame is a plain accumulator: packets go in unordered, and the
/// ordering/completeness queries work over 16-bit sequence numbers with
/// wrap-around handled by shortest forward distance. The frame does not
/// lock; producer and consumer hand it off per the single-producer,
/// single-consumer convention of the media path.
#[derive(Debug, Clone)]
pub struct RtpFrame {
    timestamp: u32,
    kind: FrameKind,
    has_marker: bool,
    processed: bool,
    packets: Vec<RtpPacket>,
}

impl RtpFrame {
    pub fn new(timestamp: u32, kind: FrameKind) -> Self {
        Self {
            timestamp,
            kind,
            has_marker: false,
            processed: false,
            packets: Vec::new(),
        }
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// True once any enqueued packet carried the marker bit.
    pub fn has_marker(&self) -> bool {
        self.has_marker
    }

    /// True after the consumer has taken the payload.
    pub fn is_processed(&self) -> bool {
        self.processed
    }

    pub fn mark_processed(&mut self) {
        self.processed = true;
    }

    /// Appends a packet. O(1); ordering happens at query time.
    pub fn add_packet(&mut self, packet: RtpPacket) {
        debug_assert_eq!(packet.timestamp(), self.timestamp);
        if packet.is_marker() {
            self.has_marker = true;
        }
        self.packets.push(packet);
    }

    /// Number of packets held.
    pub fn count(&self) -> usize {
        self.packets.len()
    }

    /// Lowest sequence number in modular order, or 0 for an empty frame.
    pub fn start_sequence(&self) -> u16 {
        let Some(pivot) = self.sort_pivot() else {
            return 0;
        };
        self.packets
            .iter()
            .map(|p| p.sequence())
            .min_by_key(|s| s.wrapping_sub(pivot))
            .unwrap_or(0)
    }

    /// Highest sequence number in modular order, or 0 for an empty frame.
    pub fn end_sequence(&self) -> u16 {
        let Some(pivot) = self.sort_pivot() else {
            return 0;
        };
        self.packets
            .iter()
            .map(|p| p.sequence())
            .max_by_key(|s| s.wrapping_sub(pivot))
            .unwrap_or(0)
    }

    /// True when the marker has arrived and the held sequence numbers form
    /// a contiguous run (every modular-adjacent pair differs by exactly 1).
    ///
    /// Duplicate sequence numbers (retransmits) fail the check, as do
    /// gaps. A single packet with the marker is a complete frame.
    pub fn is_complete(&self) -> bool {
        if !self.has_marker || self.packets.is_empty() {
            return false;
        }

        let seqs = self.sorted_sequences();
        seqs.windows(2)
            .all(|pair| pair[1].wrapping_sub(pair[0]) == 1)
    }

    /// Concatenation of all packet payloads in ascending sequence order.
    pub fn payload(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(
            self.packets.iter().map(|p| p.payload().len()).sum(),
        );
        for packet in self.sorted_packets() {
            out.extend_from_slice(packet.payload());
        }
        out.freeze()
    }

    /// Payload concatenation with a per-packet descriptor header stripped
    /// by the supplied adapter (e.g. VP8).
    pub fn payload_with(&self, adapter: &dyn PayloadAdapter) -> Bytes {
        let mut out = BytesMut::new();
        for packet in self.sorted_packets() {
            out.extend_from_slice(&adapter.strip(packet.payload()));
        }
        out.freeze()
    }

    /// Packets in ascending modular sequence order.
    pub fn sorted_packets(&self) -> Vec<&RtpPacket> {
        let Some(pivot) = self.sort_pivot() else {
            return Vec::new();
        };
        let mut packets: Vec<&RtpPacket> = self.packets.iter().collect();
        packets.sort_by_key(|p| p.sequence().wrapping_sub(pivot));
        packets
    }

    fn sorted_sequences(&self) -> Vec<u16> {
        self.sorted_packets()
            .into_iter()
            .map(|p| p.sequence())
            .collect()
    }

    /// Sequence number every other one is measured forward from.
    ///
    /// A raw span larger than half the sequence space means the frame
    /// straddles the 16-bit wrap, in which case ordering restarts at the
    /// smallest upper-half value rather than the raw minimum.
    fn sort_pivot(&self) -> Option<u16> {
        let min = self.packets.iter().map(|p| p.sequence()).min()?;
        let max = self.packets.iter().map(|p| p.sequence()).max()?;
        if max - min > HALF_RANGE {
            self.packets
                .iter()
                .map(|p| p.sequence())
                .filter(|s| *s >= HALF_RANGE)
                .min()
        } else {
            Some(min)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(sequence: u16, marker: bool, payload: &'static [u8]) -> RtpPacket {
        RtpPacket::new(sequence, 900_000, marker, Bytes::from_static(payload))
    }

    fn frame_with(packets: Vec<RtpPacket>) -> RtpFrame {
        let mut frame = RtpFrame::new(900_000, FrameKind::H264);
        for p in packets {
            frame.add_packet(p);
        }
        frame
    }

    #[test]
    fn empty_frame_is_degenerate() {
        let frame = RtpFrame::new(900_000, FrameKind::H264);
        assert_eq!(frame.count(), 0);
        assert_eq!(frame.start_sequence(), 0);
        assert_eq!(frame.end_sequence(), 0);
        assert!(!frame.is_complete());
        assert!(frame.payload().is_empty());
    }

    #[test]
    fn single_packet_with_marker_is_complete() {
        let frame = frame_with(vec![packet(42, true, b"only")]);
        assert!(frame.is_complete());
        assert_eq!(frame.start_sequence(), 42);
        assert_eq!(frame.end_sequence(), 42);
        assert_eq!(&frame.payload()[..], b"only");
    }

    #[test]
    fn two_contiguous_packets_complete() {
        let frame = frame_with(vec![
            packet(100, false, b"first-"),
            packet(101, true, b"second"),
        ]);
        assert!(frame.is_complete());
        assert_eq!(&frame.payload()[..], b"first-second");
    }

    #[test]
    fn gap_leaves_frame_incomplete() {
        let frame = frame_with(vec![
            packet(100, false, b"a"),
            packet(102, false, b"b"),
            packet(103, true, b"c"),
        ]);
        assert!(frame.has_marker());
        assert!(!frame.is_complete());
    }

    #[test]
    fn missing_marker_leaves_frame_incomplete() {
        let frame = frame_with(vec![packet(100, false, b"a"), packet(101, false, b"b")]);
        assert!(!frame.is_complete());
    }

    #[test]
    fn duplicate_sequence_numbers_fail_completeness() {
        let frame = frame_with(vec![
            packet(100, false, b"a"),
            packet(100, false, b"a"),
            packet(101, true, b"b"),
        ]);
        assert!(!frame.is_complete());
    }

    #[test]
    fn payload_orders_out_of_order_arrivals() {
        let frame = frame_with(vec![
            packet(101, false, b"2"),
            packet(103, true, b"4"),
            packet(100, false, b"1"),
            packet(102, false, b"3"),
        ]);
        assert!(frame.is_complete());
        assert_eq!(&frame.payload()[..], b"1234");
    }

    #[test]
    fn wrapped_sequences_order_by_forward_distance() {
        let frame = frame_with(vec![
            packet(1, true, b"d"),
            packet(65534, false, b"a"),
            packet(0, false, b"c"),
            packet(65535, false, b"b"),
        ]);
        assert_eq!(frame.start_sequence(), 65534);
        assert_eq!(frame.end_sequence(), 1);
        assert!(frame.is_complete());
        assert_eq!(&frame.payload()[..], b"abcd");
    }

    #[test]
    fn wrapped_gap_is_still_detected() {
        let frame = frame_with(vec![
            packet(65535, false, b"a"),
            packet(1, true, b"b"),
        ]);
        assert!(!frame.is_complete());
    }

    #[test]
    fn split_and_reassemble_round_trips() {
        let original: Vec<u8> = (0u16..600).map(|i| (i % 251) as u8).collect();
        let mut frame = RtpFrame::new(900_000, FrameKind::Other);
        let chunks: Vec<&[u8]> = original.chunks(100).collect();
        let last = chunks.len() - 1;
        for (i, chunk) in chunks.iter().enumerate() {
            frame.add_packet(RtpPacket::new(
                7000 + i as u16,
                900_000,
                i == last,
                Bytes::copy_from_slice(chunk),
            ));
        }
        assert!(frame.is_complete());
        assert_eq!(&frame.payload()[..], &original[..]);
    }

    #[test]
    fn processed_flag_latches() {
        let mut frame = frame_with(vec![packet(5, true, b"x")]);
        assert!(!frame.is_processed());
        frame.mark_processed();
        assert!(frame.is_processed());
    }

    #[test]
    fn payload_type_mapping() {
        assert_eq!(FrameKind::from_payload_type(98), FrameKind::H264);
        assert_eq!(FrameKind::from_payload_type(0), FrameKind::Audio);
        assert_eq!(FrameKind::from_payload_type(8), FrameKind::Audio);
        assert_eq!(FrameKind::from_payload_type(96), FrameKind::Other);
    }
}
