//! Coalescing, caching and fallback through the public façade.

mod common;

use ai_gen_pipeline::cache::{CacheKey, RequestCache, RequestKind};
use ai_gen_pipeline::clock::ManualClock;
use ai_gen_pipeline::{Error, GenerationRequest};
use common::{monitor, service, StubBackend, VALID_ARTICLE};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[tokio::test]
async fn concurrent_identical_requests_share_one_upstream_call() {
    let gate = Arc::new(Notify::new());
    let backend = StubBackend::gated(VALID_ARTICLE, gate.clone());
    let monitor = monitor(true);
    let service = service(backend.clone(), &monitor);

    let mut handles = Vec::new();
    for topic in ["Remote Work Tips", "remote work tips", "  REMOTE work tips "] {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.generate_article(&GenerationRequest::new(topic)).await
        }));
    }

    for _ in 0..50 {
        if backend.generate_calls() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    gate.notify_waiters();

    let mut titles = Vec::new();
    for handle in handles {
        titles.push(handle.await.unwrap().unwrap().title);
    }
    assert_eq!(backend.generate_calls(), 1);
    assert!(titles.iter().all(|t| t == "Remote Work Tips"));
}

#[tokio::test]
async fn unparseable_response_yields_fallback_article() {
    let raw = "Here are some thoughts on remote work. Stay organized and take breaks";
    let backend = StubBackend::returning(raw);
    let monitor = monitor(true);
    let service = service(backend, &monitor);

    let article = service
        .generate_article(&GenerationRequest::new("remote work tips"))
        .await
        .unwrap();
    assert!(article.degraded);
    assert!(!article.title.is_empty());
    assert!(!article.faq.is_empty());
    assert_eq!(article.word_count, raw.split_whitespace().count());
}

#[tokio::test]
async fn transient_failures_are_retried_transparently() {
    let backend = StubBackend::failing_first(VALID_ARTICLE, 2);
    let monitor = monitor(true);
    let service = service(backend.clone(), &monitor);

    let article = service
        .generate_article(&GenerationRequest::new("retries"))
        .await
        .unwrap();
    assert_eq!(article.title, "Remote Work Tips");
    assert_eq!(backend.generate_calls(), 3);
}

#[tokio::test]
async fn offline_calls_fail_fast_with_network_error() {
    let backend = StubBackend::returning(VALID_ARTICLE);
    let monitor = monitor(false);
    let service = service(backend.clone(), &monitor);

    let err = service
        .generate_article(&GenerationRequest::new("anything"))
        .await
        .unwrap_err();
    assert!(err.is_network_error());
    assert!(!err.is_retryable());
    assert_eq!(backend.generate_calls(), 0);
}

#[tokio::test]
async fn cache_entries_expire_after_ttl() {
    let clock = Arc::new(ManualClock::new(0));
    let cache: RequestCache<u32> = RequestCache::with_clock(Duration::from_secs(60), clock.clone());
    let calls = Arc::new(AtomicUsize::new(0));
    let key = CacheKey::new(RequestKind::Article, "abc");

    for expected in [1, 1, 2] {
        if expected == 2 {
            clock.advance(Duration::from_secs(60));
        }
        let counter = calls.clone();
        cache
            .get_or_compute(key.clone(), move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Error>(7)
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), expected);
    }
}
