//! Frame fan-out to streaming clients.
//!
//! Broadcast is producer-paced and best-effort: no queueing, no
//! retransmission, no per-client backlog. The newest frame always wins and
//! an unserved client simply does not receive it. A client that makes no
//! progress is released on the spot so it never blocks delivery to the
//! others.

use rover_core::Frame;
use rover_protocol::encode_frame_header;
use std::io;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::slots::SlotTable;

/// Upper bound on a single write syscall.
pub const WRITE_CHUNK: usize = 1024;

/// Handle for pushing camera frames into the server's streaming slots.
///
/// Cheap to clone; the camera task holds one and calls
/// [`broadcast`](Self::broadcast) once per captured frame.
#[derive(Clone)]
pub struct FrameBroadcaster {
    slots: Arc<Mutex<SlotTable<TcpStream>>>,
}

impl FrameBroadcaster {
    pub(crate) fn new(slots: Arc<Mutex<SlotTable<TcpStream>>>) -> Self {
        Self { slots }
    }

    /// Number of currently live viewers.
    pub async fn viewer_count(&self) -> usize {
        self.slots.lock().await.live_count()
    }

    /// Send one frame to every live streaming slot, in slot order.
    ///
    /// The frame buffer is only borrowed for this call; nothing is
    /// retained. Non-JPEG frames are logged and dropped. A slot whose
    /// write fails or stops making progress is released and the fan-out
    /// continues.
    pub async fn broadcast(&self, frame: &Frame<'_>) {
        if !frame.is_jpeg() {
            warn!(format = ?frame.format, "dropping non-JPEG camera frame");
            return;
        }

        let header = match encode_frame_header(frame.len()) {
            Ok(header) => header,
            Err(e) => {
                warn!("dropping frame: {}", e);
                return;
            }
        };

        let mut slots = self.slots.lock().await;
        for index in slots.live_indices() {
            let Some(stream) = slots.get_mut(index) else {
                continue;
            };
            if let Err(e) = send_frame(stream, &header, frame.data) {
                debug!(slot = index, "releasing stream client: {}", e);
                slots.release(index);
            }
        }
    }
}

/// Write header plus payload without ever awaiting on the socket. Each
/// piece goes out through `try_write`; a viewer whose kernel buffer stays
/// full stops the frame mid-send and is reported as an error so the caller
/// releases its slot.
fn send_frame(stream: &TcpStream, header: &[u8], data: &[u8]) -> io::Result<()> {
    write_now(stream, header)?;
    for chunk in data.chunks(WRITE_CHUNK) {
        write_now(stream, chunk)?;
    }
    Ok(())
}

/// Push a buffer with non-blocking writes until it is fully sent or the
/// socket refuses to take more. Zero progress is treated the same as peer
/// loss: a partially written frame cannot be resumed, so the connection is
/// unusable either way.
fn write_now(stream: &TcpStream, mut buf: &[u8]) -> io::Result<()> {
    while !buf.is_empty() {
        match stream.try_write(buf) {
            Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
            Ok(n) => buf = &buf[n..],
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                return Err(io::Error::new(io::ErrorKind::WouldBlock, "send buffer full"))
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
