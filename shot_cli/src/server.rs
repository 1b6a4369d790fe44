//! Line-oriented TCP transport for the control plane.
//!
//! Each accepted connection becomes an observer: inbound lines are forwarded
//! to the control loop as `Inbound::Message`, and status frames coming back
//! from the loop are written one JSON object per line. The loop thread never
//! touches a socket.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, bounded};
use eyre::WrapErr;
use shot_core::{Inbound, ObserverId};

/// Frames queued for one client before it counts as stalled and is dropped.
pub const FRAME_BACKLOG: usize = 64;

/// Bound listener; call `spawn` to start accepting.
pub struct ControlServer {
    listener: TcpListener,
}

impl ControlServer {
    pub fn bind(addr: &str) -> eyre::Result<Self> {
        let listener =
            TcpListener::bind(addr).wrap_err_with(|| format!("bind control plane on {addr}"))?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> eyre::Result<SocketAddr> {
        self.listener
            .local_addr()
            .wrap_err("control plane local address")
    }

    /// Accept connections on a background thread until the inbox closes.
    pub fn spawn(self, inbox: Sender<Inbound>) -> eyre::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("shot-accept".into())
            .spawn(move || accept_loop(&self.listener, &inbox))
            .wrap_err("spawn accept thread")
    }
}

fn accept_loop(listener: &TcpListener, inbox: &Sender<Inbound>) {
    let next_id = AtomicU64::new(1);
    for conn in listener.incoming() {
        let stream = match conn {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
                continue;
            }
        };
        let id = next_id.fetch_add(1, Ordering::Relaxed);
        let (frames_tx, frames_rx) = bounded::<String>(FRAME_BACKLOG);
        let connected = Inbound::Connected {
            id,
            observer: Box::new(frames_tx),
        };
        if inbox.send(connected).is_err() {
            tracing::debug!("control loop gone; accept loop exiting");
            return;
        }
        if let Err(e) = serve(id, stream, frames_rx, inbox.clone()) {
            tracing::warn!(client = id, error = %e, "dropping connection");
            let _ = inbox.send(Inbound::Disconnected { id });
        }
    }
}

fn serve(
    id: ObserverId,
    stream: TcpStream,
    frames: Receiver<String>,
    inbox: Sender<Inbound>,
) -> eyre::Result<()> {
    let peer = stream.peer_addr().ok();
    let reader = stream.try_clone().wrap_err("clone client stream")?;
    tracing::debug!(client = id, ?peer, "client accepted");

    thread::Builder::new()
        .name(format!("shot-tx-{id}"))
        .spawn(move || write_frames(id, stream, &frames))
        .wrap_err("spawn writer thread")?;
    thread::Builder::new()
        .name(format!("shot-rx-{id}"))
        .spawn(move || read_lines(id, reader, &inbox))
        .wrap_err("spawn reader thread")?;
    Ok(())
}

fn write_frames(id: ObserverId, mut stream: TcpStream, frames: &Receiver<String>) {
    for frame in frames {
        let sent = stream
            .write_all(frame.as_bytes())
            .and_then(|()| stream.write_all(b"\n"))
            .and_then(|()| stream.flush());
        if let Err(e) = sent {
            tracing::debug!(client = id, error = %e, "write failed");
            break;
        }
    }
    let _ = stream.shutdown(std::net::Shutdown::Both);
}

fn read_lines(id: ObserverId, stream: TcpStream, inbox: &Sender<Inbound>) {
    for line in BufReader::new(stream).lines() {
        let text = match line {
            Ok(t) => t,
            Err(e) => {
                tracing::debug!(client = id, error = %e, "read failed");
                break;
            }
        };
        if text.trim().is_empty() {
            continue;
        }
        if inbox.send(Inbound::Message { id, text }).is_err() {
            return;
        }
    }
    let _ = inbox.send(Inbound::Disconnected { id });
}
