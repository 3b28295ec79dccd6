use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use anyhow::Result;
use crate::config::StatsConfig;
use crate::ingest::{ingest, Datagram};
use crate::stats::NdpStats;

/// Stats manager event loop - bridges listener datagrams to the store and
/// prunes it on a timer.
pub async fn run(
    stats: Arc<NdpStats>,
    rx: flume::Receiver<Datagram>,
    config: StatsConfig,
    cancel: CancellationToken,
) -> Result<()> {
    let mut prune_interval = tokio::time::interval(config.prune_interval());

    loop {
        tokio::select! {
            received = rx.recv_async() => {
                let Ok(datagram) = received else {
                    tracing::info!("Listener channel closed, stats manager stopping");
                    break;
                };
                match ingest(&stats, &datagram) {
                    Some(kind) => tracing::debug!(
                        "{} from {} ({} bytes)",
                        kind,
                        datagram.source,
                        datagram.bytes.len()
                    ),
                    None => tracing::trace!(
                        "Ignored ICMPv6 type {:?} from {}",
                        datagram.bytes.first(),
                        datagram.source
                    ),
                }
            }
            _ = prune_interval.tick() => {
                let removed = stats.prune();
                if removed > 0 {
                    tracing::debug!("Pruned {} idle peers, {} remain", removed, stats.peer_count());
                }
            }
            _ = cancel.cancelled() => {
                tracing::info!("Stats manager shutting down");
                break;
            }
        }
    }

    Ok(())
}
