use std::sync::Arc;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use shared::protocol::API_PREFIX;
use shared::types::{PeerSummary, RouterRecord};
use crate::stats::{hash, NdpStats};

#[derive(Clone)]
pub struct AppState {
    pub stats: Arc<NdpStats>,
    pub interface: Option<String>,
    pub hostname: String,
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub window_secs: u64,
    pub interface: Option<String>,
    pub hostname: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(&format!("{}/config", API_PREFIX), get(get_config))
        .route(&format!("{}/peers", API_PREFIX), get(get_peers))
        .route(&format!("{}/peers/:address", API_PREFIX), get(get_peer))
        .route(&format!("{}/routers", API_PREFIX), get(get_routers))
        .route(&format!("{}/hash", API_PREFIX), get(get_hash))
        .with_state(state)
}

async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        window_secs: state.stats.window().as_secs(),
        interface: state.interface.clone(),
        hostname: state.hostname.clone(),
    })
}

async fn get_peers(State(state): State<AppState>) -> Json<Vec<PeerSummary>> {
    Json(state.stats.snapshot())
}

async fn get_peer(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<PeerSummary>, StatusCode> {
    state
        .stats
        .peer(&address)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn get_routers(State(state): State<AppState>) -> Json<Vec<RouterRecord>> {
    Json(state.stats.routers_snapshot())
}

async fn get_hash(State(state): State<AppState>) -> Result<String, StatusCode> {
    hash::compute_hash(&state.stats.snapshot(), &state.stats.routers_snapshot()).map_err(|e| {
        tracing::error!("Failed to compute inventory hash: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use shared::types::MessageKind;

    fn state() -> AppState {
        AppState {
            stats: Arc::new(NdpStats::new(Duration::from_secs(900))),
            interface: Some("eth0".to_string()),
            hostname: "monitor".to_string(),
        }
    }

    fn test_router(address: &str) -> RouterRecord {
        RouterRecord {
            address: address.to_string(),
            mac: None,
            interface: None,
            hop_limit: 64,
            managed: false,
            other: false,
            lifetime: Duration::from_secs(1800),
            mtu: None,
            prefixes: Vec::new(),
            rdnss: Vec::new(),
            routes: Vec::new(),
            last_seen: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_get_config() {
        let Json(config) = get_config(State(state())).await;
        assert_eq!(config.window_secs, 900);
        assert_eq!(config.interface.as_deref(), Some("eth0"));
        assert_eq!(config.hostname, "monitor");
    }

    #[tokio::test]
    async fn test_get_peers() {
        let state = state();
        state.stats.record_message("fe80::2", MessageKind::NeighborSolicitation);
        state.stats.record_message("fe80::1", MessageKind::RouterSolicitation);
        state.stats.record_message("fe80::1", MessageKind::RouterSolicitation);

        let Json(peers) = get_peers(State(state)).await;
        assert_eq!(peers.len(), 2);
        assert_eq!(peers[0].address, "fe80::1");
        assert_eq!(peers[0].total, 2);
    }

    #[tokio::test]
    async fn test_get_peer_found_and_missing() {
        let state = state();
        state.stats.record_mac("fe80::1", "aa:bb:cc:dd:ee:01");

        let Json(peer) = get_peer(State(state.clone()), Path("fe80::1".to_string())).await.unwrap();
        assert_eq!(peer.mac.as_deref(), Some("aa:bb:cc:dd:ee:01"));

        let missing = get_peer(State(state), Path("fe80::9".to_string())).await;
        assert_eq!(missing.unwrap_err(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_routers() {
        let state = state();
        state.stats.record_router(test_router("fe80::2"));
        state.stats.record_router(test_router("fe80::1"));

        let Json(routers) = get_routers(State(state)).await;
        let addresses: Vec<&str> = routers.iter().map(|r| r.address.as_str()).collect();
        assert_eq!(addresses, vec!["fe80::1", "fe80::2"]);
    }

    #[tokio::test]
    async fn test_get_hash_tracks_inventory() {
        let state = state();
        let empty = get_hash(State(state.clone())).await.unwrap();

        state.stats.record_message("fe80::1", MessageKind::RouterSolicitation);
        let one = get_hash(State(state.clone())).await.unwrap();
        assert_ne!(empty, one);

        state.stats.record_message("fe80::1", MessageKind::RouterSolicitation);
        let again = get_hash(State(state)).await.unwrap();
        assert_eq!(one, again, "another packet of a known kind is not an inventory change");
    }

    #[tokio::test]
    async fn test_router_builds() {
        let _app = router(state());
    }
}
