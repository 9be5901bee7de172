// Request router behaviour per route policy
// Author: kelexine (https://github.com/kelexine)

mod common;

use axum::http::{header, Method, StatusCode};
use common::{active_router, epoch, get_key, url, BrokenStore, StubFetcher};
use lebrq_offline::fetch::{HttpResponse, InterceptedRequest};
use lebrq_offline::metrics::ROUTED_REQUESTS;
use lebrq_offline::policy::RoutePolicy;
use lebrq_offline::router::RouteOutcome;
use lebrq_offline::store::{CacheStore, CachedResponse, MemoryStore};
use std::sync::Arc;

const EPOCH: &str = "lebrq-v1";

fn cached(body: &'static str, path: &str) -> CachedResponse {
    CachedResponse::new(HttpResponse::new(StatusCode::OK, body).with_url(url(path)))
}

#[tokio::test]
async fn test_index_is_fetched_once_then_served_from_cache() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = StubFetcher::new();
    let router = active_router(EPOCH, store.clone(), fetcher.clone()).await;
    let baseline = fetcher.call_count();

    let first = router
        .handle(InterceptedRequest::get(url("/index.html")))
        .await
        .unwrap();
    assert_eq!(first.policy, RoutePolicy::CacheFirst);
    assert_eq!(first.outcome, RouteOutcome::FetchedAndCached);
    assert_eq!(first.response.status, StatusCode::OK);
    assert_eq!(fetcher.call_count(), baseline + 1);

    let stored = store
        .get(&epoch(EPOCH), &get_key("/index.html"))
        .await
        .unwrap()
        .expect("entry stored under (GET, <origin>/index.html)");
    assert_eq!(stored.response.body, "live /index.html");

    let second = router
        .handle(InterceptedRequest::get(url("/index.html")))
        .await
        .unwrap();
    assert_eq!(second.outcome, RouteOutcome::ServedFromCache);
    assert_eq!(second.response.body, "live /index.html");
    assert_eq!(fetcher.call_count(), baseline + 1, "no second network call");
}

#[tokio::test]
async fn test_cache_hit_is_never_revalidated() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = StubFetcher::new();
    let router = active_router(EPOCH, store.clone(), fetcher.clone()).await;

    store
        .put(&epoch(EPOCH), get_key("/app.js"), cached("old bundle", "/app.js"))
        .await
        .unwrap();
    fetcher.respond("/app.js", StatusCode::OK, "new bundle");
    let baseline = fetcher.call_count();

    let routed = router
        .handle(InterceptedRequest::get(url("/app.js")))
        .await
        .unwrap();
    assert_eq!(routed.response.body, "old bundle");
    assert_eq!(fetcher.call_count(), baseline);
}

#[tokio::test]
async fn test_api_get_offline_returns_json_503() {
    let fetcher = StubFetcher::new();
    let router = active_router(EPOCH, Arc::new(MemoryStore::new()), fetcher.clone()).await;
    fetcher.set_offline(true);

    let routed = router
        .handle(InterceptedRequest::get(url("/api/bookings")))
        .await
        .unwrap();

    assert_eq!(routed.policy, RoutePolicy::NeverCache);
    assert_eq!(routed.outcome, RouteOutcome::Failed);
    assert_eq!(routed.response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        routed.response.headers[header::CONTENT_TYPE],
        "application/json"
    );
    let body: serde_json::Value = serde_json::from_slice(&routed.response.body).unwrap();
    assert_eq!(body["error"], "Network error");
    assert_eq!(body["message"], "Unable to connect to server");
}

#[tokio::test]
async fn test_api_never_served_from_cache_even_when_present() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = StubFetcher::new();
    let router = active_router(EPOCH, store.clone(), fetcher.clone()).await;

    store
        .put(
            &epoch(EPOCH),
            get_key("/api/bookings"),
            cached("stale bookings", "/api/bookings"),
        )
        .await
        .unwrap();
    let baseline = fetcher.call_count();

    let online = router
        .handle(InterceptedRequest::get(url("/api/bookings")))
        .await
        .unwrap();
    assert_eq!(online.response.body, "live /api/bookings");
    assert_eq!(online.outcome, RouteOutcome::FetchedUncached);
    assert_eq!(fetcher.call_count(), baseline + 1);

    fetcher.set_offline(true);
    let offline = router
        .handle(InterceptedRequest::get(url("/api/bookings")))
        .await
        .unwrap();
    assert_eq!(offline.response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_ne!(offline.response.body, "stale bookings");
    assert_eq!(fetcher.call_count(), baseline + 2);
}

#[tokio::test]
async fn test_api_responses_are_not_stored() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = StubFetcher::new();
    let router = active_router(EPOCH, store.clone(), fetcher.clone()).await;
    let before = store.len(&epoch(EPOCH)).await.unwrap();

    router
        .handle(InterceptedRequest::get(url("/api/programs")))
        .await
        .unwrap();

    assert_eq!(store.len(&epoch(EPOCH)).await.unwrap(), before);
    assert!(store
        .get(&epoch(EPOCH), &get_key("/api/programs"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_post_api_goes_straight_to_network() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = StubFetcher::new();
    let router = active_router(EPOCH, store.clone(), fetcher.clone()).await;
    let before = store.len(&epoch(EPOCH)).await.unwrap();
    let baseline = fetcher.call_count();

    let request = InterceptedRequest::new(Method::POST, url("/api/bookings"))
        .with_body(r#"{"venue":42}"#);
    let routed = router.handle(request).await.unwrap();

    assert_eq!(routed.outcome, RouteOutcome::FetchedUncached);
    assert_eq!(fetcher.call_count(), baseline + 1);
    assert_eq!(fetcher.calls().last().unwrap().0, Method::POST);
    assert_eq!(store.len(&epoch(EPOCH)).await.unwrap(), before);
}

#[tokio::test]
async fn test_non_get_static_path_bypasses_cache() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = StubFetcher::new();
    let router = active_router(EPOCH, store.clone(), fetcher.clone()).await;
    let before = store.len(&epoch(EPOCH)).await.unwrap();

    let routed = router
        .handle(InterceptedRequest::new(Method::POST, url("/contact-form")))
        .await
        .unwrap();
    assert_eq!(routed.policy, RoutePolicy::CacheFirst);
    assert_eq!(routed.outcome, RouteOutcome::FetchedUncached);
    assert_eq!(store.len(&epoch(EPOCH)).await.unwrap(), before);

    // Offline, the failure propagates instead of becoming a synthetic 503.
    fetcher.set_offline(true);
    let result = router
        .handle(InterceptedRequest::new(Method::POST, url("/contact-form")))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_venue_detail_always_fetched_despite_stale_entry() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = StubFetcher::new();
    let router = active_router(EPOCH, store.clone(), fetcher.clone()).await;

    store
        .put(&epoch(EPOCH), get_key("/venue/42"), cached("stale venue", "/venue/42"))
        .await
        .unwrap();
    let baseline = fetcher.call_count();

    let routed = router
        .handle(InterceptedRequest::get(url("/venue/42")))
        .await
        .unwrap();
    assert_eq!(routed.policy, RoutePolicy::AlwaysFresh);
    assert_eq!(routed.response.body, "live /venue/42");
    assert_eq!(fetcher.call_count(), baseline + 1);

    // Offline: the raw failure surfaces, the stale entry is still not used.
    fetcher.set_offline(true);
    let result = router.handle(InterceptedRequest::get(url("/venue/42"))).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_offline_cache_miss_returns_plain_503() {
    let fetcher = StubFetcher::new();
    let router = active_router(EPOCH, Arc::new(MemoryStore::new()), fetcher.clone()).await;
    fetcher.set_offline(true);

    let routed = router
        .handle(InterceptedRequest::get(url("/images/hero.png")))
        .await
        .unwrap();
    assert_eq!(routed.outcome, RouteOutcome::Failed);
    assert_eq!(routed.response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(routed.response.body, "Network error");
}

#[tokio::test]
async fn test_offline_shell_served_from_precache() {
    let fetcher = StubFetcher::new();
    fetcher.respond("/", StatusCode::OK, "<html>shell</html>");
    let router = active_router(EPOCH, Arc::new(MemoryStore::new()), fetcher.clone()).await;
    fetcher.set_offline(true);

    let routed = router.handle(InterceptedRequest::get(url("/"))).await.unwrap();
    assert_eq!(routed.outcome, RouteOutcome::ServedFromCache);
    assert_eq!(routed.response.body, "<html>shell</html>");
}

#[tokio::test]
async fn test_error_status_not_stored() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = StubFetcher::new();
    fetcher.respond("/missing.css", StatusCode::NOT_FOUND, "nope");
    let router = active_router(EPOCH, store.clone(), fetcher.clone()).await;

    let routed = router
        .handle(InterceptedRequest::get(url("/missing.css")))
        .await
        .unwrap();
    assert_eq!(routed.response.status, StatusCode::NOT_FOUND);
    assert_eq!(routed.outcome, RouteOutcome::FetchedUncached);
    assert!(store
        .get(&epoch(EPOCH), &get_key("/missing.css"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_cross_origin_response_not_stored() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = StubFetcher::new();
    fetcher.redirect("/fonts/inter.woff2", "https://cdn.elsewhere.test/inter.woff2");
    let router = active_router(EPOCH, store.clone(), fetcher.clone()).await;

    let routed = router
        .handle(InterceptedRequest::get(url("/fonts/inter.woff2")))
        .await
        .unwrap();
    assert_eq!(routed.response.status, StatusCode::OK);
    assert_eq!(routed.outcome, RouteOutcome::FetchedUncached);
    assert!(store
        .get(&epoch(EPOCH), &get_key("/fonts/inter.woff2"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_cache_write_failure_is_swallowed() {
    let fetcher = StubFetcher::new();
    let router = active_router(EPOCH, BrokenStore::failing_writes(), fetcher.clone()).await;

    let routed = router
        .handle(InterceptedRequest::get(url("/index.html")))
        .await
        .unwrap();
    assert_eq!(routed.response.status, StatusCode::OK);
    assert_eq!(routed.response.body, "live /index.html");
    assert_eq!(routed.outcome, RouteOutcome::FetchedUncached);
}

#[tokio::test]
async fn test_cache_read_failure_treated_as_miss() {
    let fetcher = StubFetcher::new();
    let router = active_router(
        EPOCH,
        BrokenStore::failing_reads_and_writes(),
        fetcher.clone(),
    )
    .await;
    let baseline = fetcher.call_count();

    let routed = router
        .handle(InterceptedRequest::get(url("/index.html")))
        .await
        .unwrap();
    assert_eq!(routed.response.body, "live /index.html");
    assert_eq!(fetcher.call_count(), baseline + 1);
}

#[tokio::test]
async fn test_requests_pass_through_before_activation() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = StubFetcher::new();
    let router =
        lebrq_offline::app::build(&common::config(EPOCH), store.clone(), fetcher.clone()).unwrap();

    let routed = router
        .handle(InterceptedRequest::get(url("/index.html")))
        .await
        .unwrap();
    assert_eq!(routed.outcome, RouteOutcome::FetchedUncached);
    assert_eq!(store.len(&epoch(EPOCH)).await.unwrap(), 0);

    fetcher.set_offline(true);
    assert!(router
        .handle(InterceptedRequest::get(url("/api/bookings")))
        .await
        .is_err());
}

#[tokio::test]
async fn test_cache_hit_does_not_replay_set_cookie() {
    let store = Arc::new(MemoryStore::new());
    let fetcher = StubFetcher::new();
    fetcher.header("/index.html", "set-cookie", "session=user{n}");
    let router = active_router(EPOCH, store.clone(), fetcher.clone()).await;

    let first = router
        .handle(InterceptedRequest::get(url("/index.html")))
        .await
        .unwrap();
    assert_eq!(first.outcome, RouteOutcome::FetchedAndCached);
    assert!(first.response.headers.contains_key(header::SET_COOKIE));

    let second = router
        .handle(InterceptedRequest::get(url("/index.html")))
        .await
        .unwrap();
    assert_eq!(second.outcome, RouteOutcome::ServedFromCache);
    assert!(second.response.headers.get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_propagated_failures_are_counted() {
    let failed = |policy: &str| {
        ROUTED_REQUESTS
            .with_label_values(&[policy, RouteOutcome::Failed.as_str()])
            .get()
    };
    let fetcher = StubFetcher::new();
    let router = active_router(EPOCH, Arc::new(MemoryStore::new()), fetcher.clone()).await;
    fetcher.set_offline(true);

    let fresh_before = failed(RoutePolicy::AlwaysFresh.as_str());
    let cache_first_before = failed(RoutePolicy::CacheFirst.as_str());

    assert!(router.handle(InterceptedRequest::get(url("/venue/7"))).await.is_err());
    assert!(router
        .handle(InterceptedRequest::new(Method::POST, url("/contact-form")))
        .await
        .is_err());

    assert!(failed(RoutePolicy::AlwaysFresh.as_str()) >= fresh_before + 1.0);
    assert!(failed(RoutePolicy::CacheFirst.as_str()) >= cache_first_before + 1.0);
}

#[tokio::test]
async fn test_passthrough_before_activation_is_counted() {
    let uncached = || {
        ROUTED_REQUESTS
            .with_label_values(&[
                RoutePolicy::CacheFirst.as_str(),
                RouteOutcome::FetchedUncached.as_str(),
            ])
            .get()
    };
    let fetcher = StubFetcher::new();
    let router = lebrq_offline::app::build(
        &common::config(EPOCH),
        Arc::new(MemoryStore::new()),
        fetcher.clone(),
    )
    .unwrap();

    let before = uncached();
    router
        .handle(InterceptedRequest::get(url("/index.html")))
        .await
        .unwrap();
    assert!(uncached() >= before + 1.0);
}
