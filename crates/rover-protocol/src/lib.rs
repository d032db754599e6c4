//! # rover-protocol
//!
//! Wire protocol for the rover's two TCP ports.
//!
//! - Streaming port: one frame per message, a 6-byte header (JPEG SOI
//!   marker plus big-endian length) followed by the raw JPEG bytes.
//! - Control port: newline-terminated ASCII command lines, parsed into a
//!   closed [`Command`] enumeration.
//!
//! The framing is this system's own - it is not a plain JPEG stream - and
//! must be replicated exactly for compatibility with existing viewers.

pub mod command;
pub mod framing;

pub use command::{parse_command, Command, CommandParseError, STEER_MAX, STEER_MIN};
pub use framing::{
    decode_frame_header, encode_frame_header, CodecError, FRAME_HEADER_LEN, FRAME_MARKER,
};
