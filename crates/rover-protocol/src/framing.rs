//! Stream-port frame codec.
//!
//! Each camera frame is sent as `[0xFF][0xD8][len: u32 big-endian]`
//! followed by `len` bytes of JPEG. The marker bytes happen to equal the
//! JPEG SOI marker but belong to this framing, not to the payload.

use thiserror::Error;

/// Marker bytes opening every frame header.
pub const FRAME_MARKER: [u8; 2] = [0xFF, 0xD8];

/// Total header length: 2 marker bytes + 4 length bytes.
pub const FRAME_HEADER_LEN: usize = 6;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Frame payload exceeds what the 4-byte length field can carry.
    #[error("frame of {0} bytes exceeds the u32 length field")]
    FrameTooLarge(usize),

    /// Header is shorter than [`FRAME_HEADER_LEN`].
    #[error("truncated frame header: {0} bytes")]
    TruncatedHeader(usize),

    /// Header does not start with the marker bytes.
    #[error("bad frame marker: {0:02X} {1:02X}")]
    BadMarker(u8, u8),
}

/// Encode the 6-byte header for a payload of `len` bytes.
pub fn encode_frame_header(len: usize) -> Result<[u8; FRAME_HEADER_LEN], CodecError> {
    let len_u32 = u32::try_from(len).map_err(|_| CodecError::FrameTooLarge(len))?;
    let mut header = [0u8; FRAME_HEADER_LEN];
    header[..2].copy_from_slice(&FRAME_MARKER);
    header[2..].copy_from_slice(&len_u32.to_be_bytes());
    Ok(header)
}

/// Decode a frame header, returning the payload length.
///
/// Used by test clients and host-side viewers; the device itself only
/// encodes.
pub fn decode_frame_header(header: &[u8]) -> Result<u32, CodecError> {
    if header.len() < FRAME_HEADER_LEN {
        return Err(CodecError::TruncatedHeader(header.len()));
    }
    if header[..2] != FRAME_MARKER {
        return Err(CodecError::BadMarker(header[0], header[1]));
    }
    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&header[2..FRAME_HEADER_LEN]);
    Ok(u32::from_be_bytes(len_bytes))
}
