// gbsip-rs - GB28181 SIP services for Rust
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! RTP frame reassembly for GB28181 media streams.
//!
//! The media transport feeds parsed [`RtpPacket`]s into a
//! [`FrameAssembler`], which groups them by timestamp into [`RtpFrame`]s
//! and hands each frame over exactly once when its marker packet and a
//! contiguous sequence run have arrived. Payload descriptor headers
//! (e.g. VP8) are stripped by a [`PayloadAdapter`] chosen per stream.
//!
//! # Example
//! ```
//! use bytes::Bytes;
//! use gbsip_rtp::{FrameAssembler, RtpPacket};
//!
//! let mut assembler = FrameAssembler::new();
//! let partial = assembler.push(RtpPacket::new(100, 900_000, false, Bytes::from_static(b"part1")));
//! assert!(partial.is_none());
//! let frame = assembler
//!     .push(RtpPacket::new(101, 900_000, true, Bytes::from_static(b"part2")))
//!     .expect("marker completes the frame");
//! assert_eq!(&frame.payload()[..], b"part1part2");
//! ```

mod assembler;
mod depacketize;
mod frame;
mod packet;

pub use assembler::FrameAssembler;
pub use depacketize::{PayloadAdapter, RawAdapter, Vp8Adapter};
pub use frame::{FrameKind, RtpFrame};
pub use packet::{RtpHeader, RtpPacket};
