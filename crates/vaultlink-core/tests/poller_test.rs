#![allow(clippy::unwrap_used)]
// Integration tests for `RosterPoller` and `Router` using wiremock as the router.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use vaultlink_api::RouterClient;
use vaultlink_core::{
    CacheError, ConnectionState, CoreError, MemoryCache, PollStage, RosterPayload, RosterPoller,
    Router, RouterConfig, SkipReason, SnapshotCache, SnapshotSource, TickOutcome,
};

const CACHE_KEY: &str = "router_clients:";

// ── Helpers ─────────────────────────────────────────────────────────

/// Matches a JSON-RPC POST by method name, and for `call` by target.
struct Rpc {
    method: &'static str,
    target: Option<(&'static str, &'static str)>,
}

impl Match for Rpc {
    fn matches(&self, request: &Request) -> bool {
        let Ok(body) = serde_json::from_slice::<Value>(&request.body) else {
            return false;
        };
        if body["method"] != self.method {
            return false;
        }
        match self.target {
            None => true,
            Some((module, func)) => body["params"][1] == module && body["params"][2] == func,
        }
    }
}

fn rpc(method: &'static str) -> Rpc {
    Rpc {
        method,
        target: None,
    }
}

fn get_list() -> Rpc {
    Rpc {
        method: "call",
        target: Some(("clients", "get_list")),
    }
}

fn ok(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 0, "result": result }))
}

fn denied() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 0,
        "error": { "code": -32000, "message": "Access denied" }
    }))
}

fn roster() -> Value {
    json!({
        "clients": [
            { "mac": "AA:BB:CC:DD:EE:01", "ip": "192.168.8.101", "online": true, "iface": "5G WiFi" },
            { "mac": "AA:BB:CC:DD:EE:02", "ip": "192.168.8.102", "online": false, "iface": "cable" }
        ]
    })
}

async fn mount_handshake(server: &MockServer, sid: &str) {
    Mock::given(rpc("challenge"))
        .respond_with(ok(json!({ "alg": "1", "salt": "saltsalt", "nonce": "nonce123" })))
        .mount(server)
        .await;
    Mock::given(rpc("login"))
        .respond_with(ok(json!({ "sid": sid })))
        .mount(server)
        .await;
}

async fn mount_healthy(server: &MockServer) {
    Mock::given(rpc("alive"))
        .respond_with(ok(json!({})))
        .mount(server)
        .await;
    Mock::given(get_list())
        .respond_with(ok(roster()))
        .mount(server)
        .await;
}

fn client(server: &MockServer) -> Arc<RouterClient> {
    let url = Url::parse(&format!("{}/rpc", server.uri())).unwrap();
    Arc::new(RouterClient::with_client(reqwest::Client::new(), url, "root"))
}

fn password() -> SecretString {
    "password".to_string().into()
}

fn poller_with(
    server: &MockServer,
    cache: Arc<dyn SnapshotCache>,
    ttl: Duration,
) -> Arc<RosterPoller> {
    Arc::new(RosterPoller::new(client(server), password(), cache, CACHE_KEY, ttl))
}

async fn bootstrapped(
    server: &MockServer,
    cache: Arc<MemoryCache>,
    ttl: Duration,
) -> Arc<RosterPoller> {
    mount_handshake(server, "S1").await;
    let poller = poller_with(server, cache, ttl);
    poller.bootstrap().await.unwrap();
    server.reset().await;
    poller
}

async fn cached_payload(cache: &MemoryCache) -> Option<RosterPayload> {
    cache
        .get(CACHE_KEY)
        .await
        .unwrap()
        .map(|text| serde_json::from_str(&text).unwrap())
}

async fn calls_to(server: &MockServer, matcher: &Rpc) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| matcher.matches(r))
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

struct UnavailableCache;

#[async_trait]
impl SnapshotCache for UnavailableCache {
    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
}

// ── Poll cycle ──────────────────────────────────────────────────────

#[tokio::test]
async fn tick_before_bootstrap_is_skipped() {
    let server = MockServer::start().await;
    let poller = poller_with(&server, Arc::new(MemoryCache::new()), Duration::from_secs(10));

    assert_eq!(poller.tick().await, TickOutcome::Skipped(SkipReason::NotBootstrapped));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
    assert_eq!(poller.snapshot().source, SnapshotSource::Stale);
}

#[tokio::test]
async fn healthy_tick_publishes_and_caches() {
    let server = MockServer::start().await;
    let cache = Arc::new(MemoryCache::new());
    let poller = bootstrapped(&server, Arc::clone(&cache), Duration::from_secs(10)).await;
    mount_healthy(&server).await;

    assert_eq!(poller.tick().await, TickOutcome::Published { devices: 2 });

    let snapshot = poller.snapshot();
    assert_eq!(snapshot.source, SnapshotSource::Live);
    assert_eq!(snapshot.devices[0].mac.as_str(), "aa:bb:cc:dd:ee:01");
    assert_eq!(poller.connection_state(), ConnectionState::Connected);

    let payload = cached_payload(&cache).await.unwrap();
    assert_eq!(payload.total_clients, 2);
    assert_eq!(payload.clients, snapshot.devices);
}

#[tokio::test]
async fn failing_fetch_degrades_in_process_view_but_not_cache() {
    let server = MockServer::start().await;
    let cache = Arc::new(MemoryCache::new());
    let ttl = Duration::from_millis(800);
    let poller = bootstrapped(&server, Arc::clone(&cache), ttl).await;
    mount_healthy(&server).await;
    assert_eq!(poller.tick().await, TickOutcome::Published { devices: 2 });

    server.reset().await;
    Mock::given(rpc("alive"))
        .respond_with(ok(json!({})))
        .mount(&server)
        .await;
    Mock::given(get_list())
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    for attempt in 1..=3 {
        assert_eq!(
            poller.tick().await,
            TickOutcome::Failed {
                stage: PollStage::Fetch
            }
        );
        assert_eq!(poller.connection_state(), ConnectionState::Reconnecting { attempt });

        let snapshot = poller.snapshot();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.source, SnapshotSource::Stale);
    }

    let payload = cached_payload(&cache).await.unwrap();
    assert_eq!(payload.total_clients, 2);

    tokio::time::sleep(ttl).await;
    assert!(cached_payload(&cache).await.is_none());
}

#[tokio::test]
async fn recovers_after_failed_ticks() {
    let server = MockServer::start().await;
    let poller = bootstrapped(&server, Arc::new(MemoryCache::new()), Duration::from_secs(10)).await;

    Mock::given(rpc("alive"))
        .respond_with(ok(json!({})))
        .mount(&server)
        .await;
    Mock::given(get_list())
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(get_list())
        .respond_with(ok(roster()))
        .mount(&server)
        .await;

    assert!(matches!(poller.tick().await, TickOutcome::Failed { .. }));
    assert_eq!(poller.tick().await, TickOutcome::Published { devices: 2 });
    assert_eq!(poller.connection_state(), ConnectionState::Connected);
}

// ── Re-authentication ───────────────────────────────────────────────

#[tokio::test]
async fn lost_session_is_renewed_within_the_same_tick() {
    let server = MockServer::start().await;
    let poller = bootstrapped(&server, Arc::new(MemoryCache::new()), Duration::from_secs(10)).await;

    Mock::given(rpc("alive"))
        .respond_with(denied())
        .mount(&server)
        .await;
    mount_handshake(&server, "S2").await;
    Mock::given(get_list())
        .respond_with(ok(roster()))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(poller.tick().await, TickOutcome::Published { devices: 2 });
    assert_eq!(poller.client().session_id().as_deref(), Some("S2"));

    let fetches = calls_to(&server, &get_list()).await;
    assert_eq!(fetches[0]["params"][0], "S2");
}

#[tokio::test]
async fn failed_relogin_ends_tick_before_fetch() {
    let server = MockServer::start().await;
    let cache = Arc::new(MemoryCache::new());
    let poller = bootstrapped(&server, Arc::clone(&cache), Duration::from_secs(10)).await;

    Mock::given(rpc("alive"))
        .respond_with(denied())
        .mount(&server)
        .await;
    Mock::given(rpc("challenge"))
        .respond_with(ok(json!({ "alg": "1", "salt": "saltsalt", "nonce": "n" })))
        .mount(&server)
        .await;
    Mock::given(rpc("login"))
        .respond_with(denied())
        .mount(&server)
        .await;
    Mock::given(get_list())
        .respond_with(ok(roster()))
        .expect(0)
        .mount(&server)
        .await;

    assert_eq!(
        poller.tick().await,
        TickOutcome::Failed {
            stage: PollStage::Login
        }
    );
    assert_eq!(poller.connection_state(), ConnectionState::Reconnecting { attempt: 1 });
    assert!(poller.snapshot().is_empty());
    assert!(poller.client().session_id().is_none());
    assert!(cached_payload(&cache).await.is_none());
}

// ── Single-flight ───────────────────────────────────────────────────

#[tokio::test]
async fn overlapping_tick_is_skipped() {
    let server = MockServer::start().await;
    let poller = bootstrapped(&server, Arc::new(MemoryCache::new()), Duration::from_secs(10)).await;

    Mock::given(rpc("alive"))
        .respond_with(ok(json!({})))
        .mount(&server)
        .await;
    Mock::given(get_list())
        .respond_with(ok(roster()).set_delay(Duration::from_millis(500)))
        .expect(1)
        .mount(&server)
        .await;

    let slow = tokio::spawn({
        let poller = Arc::clone(&poller);
        async move { poller.tick().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(poller.is_busy());
    assert_eq!(poller.tick().await, TickOutcome::Skipped(SkipReason::Busy));

    assert_eq!(slow.await.unwrap(), TickOutcome::Published { devices: 2 });
    assert!(!poller.is_busy());
    assert_eq!(calls_to(&server, &rpc("alive")).await.len(), 1);
}

// ── Cache failures ──────────────────────────────────────────────────

#[tokio::test]
async fn cache_write_failure_fails_the_tick() {
    let server = MockServer::start().await;
    mount_handshake(&server, "S1").await;
    let poller = poller_with(&server, Arc::new(UnavailableCache), Duration::from_secs(10));
    poller.bootstrap().await.unwrap();
    mount_healthy(&server).await;

    assert_eq!(
        poller.tick().await,
        TickOutcome::Failed {
            stage: PollStage::Cache
        }
    );
    assert!(poller.snapshot().is_empty());
}

// ── Router facade ───────────────────────────────────────────────────

fn router_config(server: &MockServer) -> RouterConfig {
    let url = Url::parse(&format!("{}/rpc", server.uri())).unwrap();
    let mut config = RouterConfig::new(url, "root", password());
    config.poll_interval = Duration::from_secs(60);
    config
}

#[tokio::test]
async fn router_connect_publishes_initial_roster() {
    let server = MockServer::start().await;
    mount_handshake(&server, "S1").await;
    mount_healthy(&server).await;
    Mock::given(rpc("logout"))
        .respond_with(ok(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let cache = Arc::new(MemoryCache::new());
    let router = Router::new(router_config(&server), cache).unwrap();
    router.connect().await.unwrap();

    let roster = router.current_roster();
    assert_eq!(roster.source, SnapshotSource::Live);
    assert!(router.is_device_active("aa-bb-cc-dd-ee-02"));
    assert!(!router.is_device_active("aa:bb:cc:dd:ee:03"));

    let status = router.status();
    assert!(status.connected);
    assert_eq!(status.device_count, 2);
    assert_eq!(status.online_count, 1);
    assert!(status.last_update.is_some());

    let cached = router.cached_roster().await;
    assert_eq!(cached.source, SnapshotSource::Cached);
    assert_eq!(cached.devices, roster.devices);

    router.disconnect().await;
    assert_eq!(*router.connection_state().borrow(), ConnectionState::Disconnected);
    assert!(router.current_roster().is_empty());
    assert!(router.poller().client().session_id().is_none());
}

#[tokio::test]
async fn router_connect_fails_on_rejected_login() {
    let server = MockServer::start().await;
    Mock::given(rpc("challenge"))
        .respond_with(ok(json!({ "alg": "6", "salt": "s", "nonce": "n" })))
        .mount(&server)
        .await;

    let router = Router::new(router_config(&server), Arc::new(MemoryCache::new())).unwrap();
    let err = router.connect().await.unwrap_err();

    assert!(matches!(err, CoreError::AuthenticationFailed { .. }), "got {err:?}");
    assert_eq!(*router.connection_state().borrow(), ConnectionState::Failed);
    assert_eq!(router.refresh_now().await, TickOutcome::Skipped(SkipReason::NotBootstrapped));
}

#[tokio::test]
async fn cached_roster_falls_back_to_memory() {
    let server = MockServer::start().await;
    mount_handshake(&server, "S1").await;
    mount_healthy(&server).await;

    let router = Router::new(router_config(&server), Arc::new(UnavailableCache)).unwrap();
    router.connect().await.unwrap();

    let roster = router.cached_roster().await;
    assert_eq!(roster.source, SnapshotSource::Stale);
    assert!(roster.is_empty());
}

#[tokio::test]
async fn roster_stream_sees_manual_refresh() {
    let server = MockServer::start().await;
    mount_handshake(&server, "S1").await;
    mount_healthy(&server).await;

    let router = Router::new(router_config(&server), Arc::new(MemoryCache::new())).unwrap();
    router.connect().await.unwrap();

    let mut stream = router.subscribe_roster();
    assert_eq!(stream.current().len(), 2);

    assert_eq!(router.refresh_now().await, TickOutcome::Published { devices: 2 });
    let next = stream.changed().await.unwrap();
    assert_eq!(next.source, SnapshotSource::Live);
}

#[tokio::test]
async fn unreadable_cache_entry_falls_back_to_memory() {
    let server = MockServer::start().await;
    mount_handshake(&server, "S1").await;
    mount_healthy(&server).await;

    let cache = Arc::new(MemoryCache::new());
    let router = Router::new(router_config(&server), cache.clone()).unwrap();
    router.connect().await.unwrap();
    cache
        .set(CACHE_KEY, "{not json".into(), Duration::from_secs(10))
        .await
        .unwrap();

    let roster = router.cached_roster().await;
    assert_eq!(roster.source, SnapshotSource::Live);
    assert_eq!(roster.len(), 2);
}

#[tokio::test]
async fn second_connect_replaces_the_poll_task() {
    let server = MockServer::start().await;
    mount_handshake(&server, "S1").await;
    mount_healthy(&server).await;
    Mock::given(rpc("logout"))
        .respond_with(ok(json!({})))
        .mount(&server)
        .await;

    let router = Router::new(router_config(&server), Arc::new(MemoryCache::new())).unwrap();
    router.connect().await.unwrap();
    router.connect().await.unwrap();

    let finished = tokio::time::timeout(Duration::from_secs(3), router.disconnect()).await;
    assert!(finished.is_ok(), "disconnect hung after a second connect");
    assert_eq!(*router.connection_state().borrow(), ConnectionState::Disconnected);
}

// ── Timer-driven polling ────────────────────────────────────────────

fn fast_router_config(server: &MockServer) -> RouterConfig {
    let mut config = router_config(server);
    config.poll_interval = Duration::from_millis(50);
    config
}

#[tokio::test]
async fn timer_never_overlaps_a_slow_fetch() {
    let server = MockServer::start().await;
    mount_handshake(&server, "S1").await;
    Mock::given(rpc("alive"))
        .respond_with(ok(json!({})))
        .mount(&server)
        .await;
    Mock::given(get_list())
        .respond_with(ok(roster()).set_delay(Duration::from_millis(150)))
        .mount(&server)
        .await;
    Mock::given(rpc("logout"))
        .respond_with(ok(json!({})))
        .mount(&server)
        .await;

    let router = Router::new(fast_router_config(&server), Arc::new(MemoryCache::new())).unwrap();
    router.connect().await.unwrap();

    // The first timed tick fires 50ms in and holds the guard for 150ms.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(router.poller().is_busy());
    assert_eq!(router.refresh_now().await, TickOutcome::Skipped(SkipReason::Busy));

    tokio::time::sleep(Duration::from_millis(700)).await;
    router.disconnect().await;

    // Sequential fetches fit at most once per 150ms; overlapping ones
    // would start on every 50ms firing.
    let fetches = calls_to(&server, &get_list()).await.len();
    assert!((3..=7).contains(&fetches), "{fetches} fetches in 800ms");
    assert_eq!(calls_to(&server, &rpc("alive")).await.len(), fetches);
}

#[tokio::test]
async fn timer_retries_after_failed_ticks() {
    let server = MockServer::start().await;
    mount_handshake(&server, "S1").await;
    mount_healthy(&server).await;
    Mock::given(rpc("logout"))
        .respond_with(ok(json!({})))
        .mount(&server)
        .await;

    let router = Router::new(fast_router_config(&server), Arc::new(MemoryCache::new())).unwrap();
    router.connect().await.unwrap();
    let mut state = router.connection_state();
    let roster_updates = router.subscribe_roster();

    Mock::given(get_list())
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;

    let degraded = tokio::time::timeout(
        Duration::from_secs(2),
        state.wait_for(|s| matches!(s, ConnectionState::Reconnecting { .. })),
    )
    .await;
    assert!(degraded.is_ok(), "timer never ran a failing tick");
    drop(degraded);

    let restored = tokio::time::timeout(
        Duration::from_secs(2),
        state.wait_for(|s| *s == ConnectionState::Connected),
    )
    .await;
    assert!(restored.is_ok(), "timer never ran a recovering tick");
    drop(restored);

    let latest = roster_updates.latest();
    assert_eq!(latest.source, SnapshotSource::Live);
    assert_eq!(latest.len(), 2);

    router.disconnect().await;
}
