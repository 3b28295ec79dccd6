pub mod socket;

use std::io::ErrorKind;
use socket2::Socket;
use tokio_util::sync::CancellationToken;
use anyhow::{Context, Result};
use crate::config::ListenerConfig;
use crate::ingest::Datagram;
use self::socket::InterfaceNames;

/// Blocking receive loop; run it with `spawn_blocking`.
///
/// Ends cleanly on cancellation or when the receiving side of `tx` is gone.
/// Any read error other than a timeout ends it with that error.
pub fn run_listener(
    config: ListenerConfig,
    tx: flume::Sender<Datagram>,
    cancel: CancellationToken,
) -> Result<()> {
    let socket = socket::open(&config)?;
    tracing::info!(
        "Listening for NDP/MLD on [{}]{}",
        config.listen,
        config.interface.as_deref().map(|i| format!(" via {}", i)).unwrap_or_default()
    );

    receive_loop(&socket, config.interface.as_deref(), &tx, &cancel)
}

/// `interface` is used for datagrams that arrive without IPV6_PKTINFO.
fn receive_loop(
    socket: &Socket,
    interface: Option<&str>,
    tx: &flume::Sender<Datagram>,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut buf = vec![0u8; socket::RECV_BUFFER_LEN];
    let mut names = InterfaceNames::default();

    while !cancel.is_cancelled() {
        let received = match socket::recv(socket, &mut buf) {
            Ok(received) => received,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted) => {
                continue;
            }
            Err(e) => return Err(e).context("Failed to read from ICMPv6 socket"),
        };

        if received.len == 0 {
            continue;
        }

        let arrived_on = received
            .ifindex
            .and_then(|index| names.get(index))
            .or_else(|| interface.map(str::to_string));

        let datagram = Datagram {
            bytes: buf[..received.len].to_vec(),
            source: received.source.to_string(),
            hop_limit: received.hop_limit,
            interface: arrived_on,
        };

        if tx.send(datagram).is_err() {
            tracing::debug!("Datagram channel closed, listener stopping");
            break;
        }
    }

    tracing::info!("Listener shutting down");
    Ok(())
}
