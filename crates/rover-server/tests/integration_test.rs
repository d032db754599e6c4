//! Integration tests for the rover session server.
//!
//! These tests start an actual server and connect with raw TCP clients to
//! verify the streaming wire format, slot capacity, and command dispatch
//! end-to-end.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use rover_core::{
    Actuator, DriftMode, DriveDirection, Frame, Light, PixelFormat, StatusDisplay,
};
use rover_server::{FrameBroadcaster, RoverServer, ServerConfig};

/// Actuator that records every call as a line of text.
#[derive(Default)]
struct RecordingActuator {
    calls: Mutex<Vec<String>>,
}

impl RecordingActuator {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Actuator for RecordingActuator {
    fn drive(&self, direction: DriveDirection, speed: u8) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("drive {:?} {}", direction, speed));
    }

    fn stop(&self) {
        self.calls.lock().unwrap().push("stop".to_string());
    }

    fn drift(&self, mode: DriftMode) {
        self.calls.lock().unwrap().push(format!("drift {:?}", mode));
    }

    fn steer(&self, angle: u8) {
        self.calls.lock().unwrap().push(format!("steer {}", angle));
    }

    fn set_light(&self, light: Light, on: bool) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("light {:?} {}", light, on));
    }
}

/// Display that records every message shown.
#[derive(Default)]
struct RecordingDisplay {
    messages: Mutex<Vec<String>>,
}

impl RecordingDisplay {
    fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl StatusDisplay for RecordingDisplay {
    fn show(&self, text: &str) {
        self.messages.lock().unwrap().push(text.to_string());
    }

    fn show_large(&self, text: &str) {
        self.messages.lock().unwrap().push(text.to_string());
    }

    fn show_status(&self, ip_or_message: &str) {
        self.messages.lock().unwrap().push(ip_or_message.to_string());
    }
}

/// Find an available port for testing.
async fn find_available_port() -> SocketAddr {
    // Bind to port 0 to get an available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Start a test server with the given per-port capacity.
async fn start_test_server(
    max_clients: usize,
) -> (
    SocketAddr,
    SocketAddr,
    FrameBroadcaster,
    Arc<RecordingActuator>,
    Arc<RecordingDisplay>,
    tokio::task::JoinHandle<()>,
) {
    let stream_addr = find_available_port().await;
    let control_addr = find_available_port().await;

    let config = ServerConfig {
        name: "test-rover".to_string(),
        stream_addr,
        control_addr,
        max_clients,
        tick_interval: Duration::from_millis(5),
    };

    let actuator = Arc::new(RecordingActuator::default());
    let display = Arc::new(RecordingDisplay::default());

    let server = RoverServer::new(config, actuator.clone(), display.clone());
    let broadcaster = server.broadcaster();

    let handle = tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    (stream_addr, control_addr, broadcaster, actuator, display, handle)
}

/// Read exactly `len` bytes with a timeout.
async fn read_exact(stream: &mut TcpStream, len: usize) -> Result<Vec<u8>, &'static str> {
    let mut buf = vec![0u8; len];
    match timeout(Duration::from_secs(5), stream.read_exact(&mut buf)).await {
        Ok(Ok(_)) => Ok(buf),
        Ok(Err(_)) => Err("read error"),
        Err(_) => Err("timeout"),
    }
}

#[tokio::test]
async fn test_frame_wire_format() {
    let (stream_addr, _control, broadcaster, _actuator, _display, handle) =
        start_test_server(5).await;

    let mut viewer = TcpStream::connect(stream_addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let payload = vec![0xAB_u8; 3000];
    broadcaster
        .broadcast(&Frame::new(&payload, PixelFormat::Jpeg))
        .await;

    let header = read_exact(&mut viewer, 6).await.expect("Should read header");
    assert_eq!(header[0], 0xFF);
    assert_eq!(header[1], 0xD8);
    assert_eq!(u32::from_be_bytes([header[2], header[3], header[4], header[5]]), 3000);

    let body = read_exact(&mut viewer, 3000).await.expect("Should read payload");
    assert_eq!(body, payload);

    handle.abort();
}

#[tokio::test]
async fn test_stream_capacity_rejects_extra_client() {
    let (stream_addr, _control, broadcaster, _actuator, _display, handle) =
        start_test_server(2).await;

    let mut v1 = TcpStream::connect(stream_addr).await.unwrap();
    let mut v2 = TcpStream::connect(stream_addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Third connection is accepted at the TCP level, then dropped.
    let mut v3 = TcpStream::connect(stream_addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let payload = vec![1_u8, 2, 3, 4];
    broadcaster
        .broadcast(&Frame::new(&payload, PixelFormat::Jpeg))
        .await;

    // The two admitted viewers each receive the frame.
    assert_eq!(read_exact(&mut v1, 10).await.unwrap().len(), 10);
    assert_eq!(read_exact(&mut v2, 10).await.unwrap().len(), 10);

    // The rejected client sees EOF, never a frame.
    let mut probe = [0u8; 1];
    match timeout(Duration::from_secs(2), v3.read(&mut probe)).await {
        Ok(Ok(0)) => {}
        other => panic!("Rejected client should see EOF, got {:?}", other),
    }

    assert_eq!(broadcaster.viewer_count().await, 2);

    handle.abort();
}

#[tokio::test]
async fn test_slot_freed_after_viewer_disconnect() {
    let (stream_addr, _control, broadcaster, _actuator, _display, handle) =
        start_test_server(1).await;

    let v1 = TcpStream::connect(stream_addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(broadcaster.viewer_count().await, 1);

    drop(v1);
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The freed slot admits a new viewer.
    let mut v2 = TcpStream::connect(stream_addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let payload = vec![9_u8; 16];
    broadcaster
        .broadcast(&Frame::new(&payload, PixelFormat::Jpeg))
        .await;

    let frame = read_exact(&mut v2, 22).await.expect("New viewer should receive");
    assert_eq!(&frame[6..], &payload[..]);

    handle.abort();
}

#[tokio::test]
async fn test_broadcast_continues_past_dead_client() {
    let (stream_addr, _control, broadcaster, _actuator, _display, handle) =
        start_test_server(5).await;

    let v1 = TcpStream::connect(stream_addr).await.unwrap();
    let mut v2 = TcpStream::connect(stream_addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Kill the first (lower-indexed) viewer, then broadcast immediately so
    // the fan-out itself hits the dead socket.
    drop(v1);
    tokio::time::sleep(Duration::from_millis(20)).await;

    let payload = vec![7_u8; 64];
    // A dead socket may absorb one write before erroring; send twice.
    broadcaster
        .broadcast(&Frame::new(&payload, PixelFormat::Jpeg))
        .await;
    broadcaster
        .broadcast(&Frame::new(&payload, PixelFormat::Jpeg))
        .await;

    // The surviving viewer still receives both frames intact.
    let frames = read_exact(&mut v2, 2 * (6 + 64))
        .await
        .expect("Surviving viewer should receive");
    assert_eq!(frames[0], 0xFF);
    assert_eq!(frames[1], 0xD8);

    handle.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stalled_viewer_does_not_block_the_fanout() {
    let (stream_addr, _control, broadcaster, _actuator, _display, handle) =
        start_test_server(5).await;

    // Slot 0 connects and never reads a byte; its kernel buffers fill up.
    let stalled = TcpStream::connect(stream_addr).await.unwrap();
    let mut healthy = TcpStream::connect(stream_addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The healthy viewer drains its socket concurrently, counting frames.
    let frames_seen = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&frames_seen);
    let reader = tokio::spawn(async move {
        loop {
            let mut header = [0u8; 6];
            if healthy.read_exact(&mut header).await.is_err() {
                break;
            }
            let len =
                u32::from_be_bytes([header[2], header[3], header[4], header[5]]) as usize;
            let mut body = vec![0u8; len];
            if healthy.read_exact(&mut body).await.is_err() {
                break;
            }
            seen.fetch_add(1, Ordering::SeqCst);
        }
    });

    // Push well past any kernel buffering. If one unread socket could stall
    // the fan-out, this loop would never finish.
    let payload = vec![0x42_u8; 1024 * 1024];
    let push = async {
        for _ in 0..32 {
            broadcaster
                .broadcast(&Frame::new(&payload, PixelFormat::Jpeg))
                .await;
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    timeout(Duration::from_secs(10), push)
        .await
        .expect("Fan-out must not block on a viewer that stops reading");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        broadcaster.viewer_count().await,
        1,
        "Stalled viewer should be released"
    );
    assert!(
        frames_seen.load(Ordering::SeqCst) > 0,
        "Healthy viewer should keep receiving frames"
    );

    drop(stalled);
    reader.abort();
    handle.abort();
}

#[tokio::test]
async fn test_non_jpeg_frames_are_not_sent() {
    let (stream_addr, _control, broadcaster, _actuator, _display, handle) =
        start_test_server(5).await;

    let mut viewer = TcpStream::connect(stream_addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let raw = vec![0_u8; 128];
    broadcaster
        .broadcast(&Frame::new(&raw, PixelFormat::Rgb565))
        .await;

    // Nothing arrives.
    let mut probe = [0u8; 1];
    match timeout(Duration::from_millis(200), viewer.read(&mut probe)).await {
        Err(_) => {}
        other => panic!("Should not receive non-JPEG frame, got {:?}", other),
    }

    handle.abort();
}

#[tokio::test]
async fn test_command_dispatch() {
    let (_stream, control_addr, _broadcaster, actuator, _display, handle) =
        start_test_server(5).await;

    let mut client = TcpStream::connect(control_addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    client.write_all(b"go\n").await.unwrap();
    client.write_all(b"goSlow\n").await.unwrap();
    client.write_all(b"back\n").await.unwrap();
    client.write_all(b"steer:90\n").await.unwrap();
    client.write_all(b"stop\n").await.unwrap();
    client.flush().await.unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;

    let calls = actuator.calls();
    assert!(calls.contains(&"drive Forward 255".to_string()));
    assert!(calls.contains(&"drive Forward 100".to_string()));
    assert!(calls.contains(&"drive Reverse 150".to_string()));
    assert!(calls.contains(&"steer 90".to_string()));
    assert!(calls.contains(&"stop".to_string()));

    handle.abort();
}

#[tokio::test]
async fn test_steer_angle_is_clamped() {
    let (_stream, control_addr, _broadcaster, actuator, _display, handle) =
        start_test_server(5).await;

    let mut client = TcpStream::connect(control_addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    client.write_all(b"steer:200\n").await.unwrap();
    client.write_all(b"steer:-40\n").await.unwrap();
    client.flush().await.unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;

    let calls = actuator.calls();
    assert!(calls.contains(&"steer 130".to_string()));
    assert!(calls.contains(&"steer 30".to_string()));

    handle.abort();
}

#[tokio::test]
async fn test_malformed_line_does_not_close_connection() {
    let (_stream, control_addr, _broadcaster, actuator, _display, handle) =
        start_test_server(5).await;

    let mut client = TcpStream::connect(control_addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    client.write_all(b"wibble\n").await.unwrap();
    client.write_all(b"steer:sideways\n").await.unwrap();
    client.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The connection is still usable after garbage input.
    client.write_all(b"GO\n").await.unwrap();
    client.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let calls = actuator.calls();
    assert!(calls.contains(&"drive Forward 255".to_string()));
    // The garbage dispatched nothing.
    assert!(!calls.iter().any(|c| c.starts_with("steer")));

    handle.abort();
}

#[tokio::test]
async fn test_commands_interleaved_from_two_clients() {
    let (_stream, control_addr, _broadcaster, actuator, _display, handle) =
        start_test_server(5).await;

    let mut c1 = TcpStream::connect(control_addr).await.unwrap();
    let mut c2 = TcpStream::connect(control_addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    c1.write_all(b"onHeadlights\n").await.unwrap();
    c2.write_all(b"drift\n").await.unwrap();
    c1.flush().await.unwrap();
    c2.flush().await.unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;

    let calls = actuator.calls();
    assert!(calls.contains(&"light Head true".to_string()));
    assert!(calls.contains(&"drift Clockwise".to_string()));

    handle.abort();
}

#[tokio::test]
async fn test_final_command_before_disconnect_is_dispatched() {
    let (_stream, control_addr, _broadcaster, actuator, _display, handle) =
        start_test_server(5).await;

    let mut client = TcpStream::connect(control_addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    client.write_all(b"go\n").await.unwrap();
    client.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Send the stop and close in the same breath. The motors are running;
    // losing this command would leave the rover driving with nobody
    // connected.
    client.write_all(b"stop\n").await.unwrap();
    client.flush().await.unwrap();
    drop(client);

    tokio::time::sleep(Duration::from_millis(200)).await;

    let calls = actuator.calls();
    assert!(calls.contains(&"drive Forward 255".to_string()));
    assert!(
        calls.contains(&"stop".to_string()),
        "Command sent just before close must still be dispatched"
    );

    handle.abort();
}

#[tokio::test]
async fn test_control_slot_reclaimed_for_immediate_successor() {
    let (_stream, control_addr, _broadcaster, actuator, _display, handle) =
        start_test_server(1).await;

    let c1 = TcpStream::connect(control_addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The replacement connects right behind the disconnect, without
    // leaving the acceptor time for a sweep tick.
    drop(c1);
    let mut c2 = TcpStream::connect(control_addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    c2.write_all(b"go\n").await.unwrap();
    c2.flush().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(
        actuator.calls().contains(&"drive Forward 255".to_string()),
        "Successor should be admitted into the freed slot"
    );

    handle.abort();
}

#[tokio::test]
async fn test_no_clients_event_fires_exactly_once() {
    let (_stream, control_addr, _broadcaster, _actuator, display, handle) =
        start_test_server(5).await;

    let client = TcpStream::connect(control_addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(display
        .messages()
        .contains(&"Client connected".to_string()));

    drop(client);
    // Leave the server ticking well past the disconnect.
    tokio::time::sleep(Duration::from_millis(300)).await;

    let standby_count = display
        .messages()
        .iter()
        .filter(|m| m.as_str() == "No clients connected")
        .count();
    assert_eq!(standby_count, 1, "Standby event should fire once, not per tick");

    handle.abort();
}

#[tokio::test]
async fn test_no_clients_event_waits_for_last_disconnect() {
    let (_stream, control_addr, _broadcaster, _actuator, display, handle) =
        start_test_server(5).await;

    let c1 = TcpStream::connect(control_addr).await.unwrap();
    let c2 = TcpStream::connect(control_addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    drop(c1);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(
        !display
            .messages()
            .contains(&"No clients connected".to_string()),
        "Standby must not fire while a client remains"
    );

    drop(c2);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(display
        .messages()
        .contains(&"No clients connected".to_string()));

    handle.abort();
}
