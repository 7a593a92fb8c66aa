use ferrous_forwarder_application::ports::ResponseCachePort;
use ferrous_forwarder_domain::Question;
use ferrous_forwarder_infrastructure::dns::ResponseCache;
use hickory_proto::op::{Message, ResponseCode};
use std::net::Ipv4Addr;
use std::time::Duration;

mod helpers;
use helpers::{a_response, nxdomain_response};

fn question(name: &str) -> Question {
    Question::new(name, 1, 1)
}

fn answer(name: &str, ttl: u32) -> Message {
    a_response(name, ttl, Ipv4Addr::new(192, 0, 2, 1))
}

#[tokio::test(start_paused = true)]
async fn test_entry_lives_exactly_its_ttl() {
    let cache = ResponseCache::new(100, 300);
    let q = question("example.com.");
    cache.put(&q, &answer("example.com.", 300));

    tokio::time::advance(Duration::from_secs(100)).await;
    let hit = cache.get(&q).expect("hit at t0+100s");
    assert_eq!(hit.answers().len(), 1);

    tokio::time::advance(Duration::from_secs(201)).await;
    assert!(cache.get(&q).is_none());
    assert_eq!(cache.len(), 0);

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.expirations, 1);
    assert_eq!(stats.hit_rate(), 50.0);
}

#[tokio::test(start_paused = true)]
async fn test_get_returns_independent_copy() {
    let cache = ResponseCache::new(10, 300);
    let q = question("example.com.");
    cache.put(&q, &answer("example.com.", 60));

    let mut first = cache.get(&q).unwrap();
    first.set_id(999);
    let second = cache.get(&q).unwrap();
    assert_ne!(second.id(), 999);
}

#[tokio::test(start_paused = true)]
async fn test_sweep_drops_only_expired_and_keeps_order() {
    let cache = ResponseCache::new(4, 300);
    cache.put(&question("a."), &answer("a.", 600));
    cache.put(&question("b."), &answer("b.", 10));
    cache.put(&question("c."), &answer("c.", 600));
    cache.put(&question("d."), &answer("d.", 10));

    tokio::time::advance(Duration::from_secs(11)).await;
    cache.put(&question("e."), &answer("e.", 600));

    let order: Vec<String> = cache
        .ordered_questions()
        .into_iter()
        .map(|q| q.name.to_string())
        .collect();
    assert_eq!(order, vec!["a.", "c.", "e."]);
    assert_eq!(cache.stats().expirations, 2);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_at_capacity_sweeps_expired() {
    let cache = ResponseCache::new(2, 300);
    cache.put(&question("a."), &answer("a.", 10));
    cache.put(&question("b."), &answer("b.", 600));

    tokio::time::advance(Duration::from_secs(11)).await;
    cache.put(&question("b."), &answer("b.", 600));

    assert_eq!(cache.len(), 1);
    assert!(!cache.contains(&question("a.")));
    let stats = cache.stats();
    assert_eq!(stats.expirations, 1);
    assert_eq!(stats.evictions, 0);
}

#[tokio::test(start_paused = true)]
async fn test_sweep_runs_before_live_entries_are_evicted() {
    let cache = ResponseCache::new(2, 300);
    cache.put(&question("a."), &answer("a.", 600));
    cache.put(&question("b."), &answer("b.", 10));

    tokio::time::advance(Duration::from_secs(11)).await;
    cache.put(&question("c."), &answer("c.", 600));

    assert!(cache.contains(&question("a.")));
    assert!(cache.contains(&question("c.")));
    let stats = cache.stats();
    assert_eq!(stats.expirations, 1);
    assert_eq!(stats.evictions, 0);
}

#[tokio::test(start_paused = true)]
async fn test_full_of_live_entries_evicts_oldest() {
    let cache = ResponseCache::new(2, 300);
    cache.put(&question("a."), &answer("a.", 600));
    cache.put(&question("b."), &answer("b.", 600));
    cache.put(&question("c."), &answer("c.", 600));

    assert_eq!(cache.len(), 2);
    assert!(!cache.contains(&question("a.")));
    assert!(cache.contains(&question("b.")));
    assert!(cache.contains(&question("c.")));
    assert_eq!(cache.stats().evictions, 1);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_moves_entry_to_newest() {
    let cache = ResponseCache::new(2, 300);
    cache.put(&question("a."), &answer("a.", 600));
    cache.put(&question("b."), &answer("b.", 600));
    cache.put(&question("a."), &answer("a.", 600));
    cache.put(&question("c."), &answer("c.", 600));

    assert!(cache.contains(&question("a.")));
    assert!(!cache.contains(&question("b.")));
}

#[tokio::test(start_paused = true)]
async fn test_uncacheable_responses_ignored() {
    let cache = ResponseCache::new(10, 300);

    let mut servfail = answer("a.", 600);
    servfail.set_response_code(ResponseCode::ServFail);
    cache.put(&question("a."), &servfail);

    let mut truncated = answer("b.", 600);
    truncated.set_truncated(true);
    cache.put(&question("b."), &truncated);

    cache.put(&question("c."), &answer("c.", 0));

    assert!(cache.is_empty());
    assert_eq!(cache.stats().insertions, 0);
}

#[tokio::test(start_paused = true)]
async fn test_negative_answer_uses_capped_soa_ttl() {
    let cache = ResponseCache::new(10, 120);
    let q = question("nope.example.com.");
    cache.put(&q, &nxdomain_response("nope.example.com.", 3600, 900));

    tokio::time::advance(Duration::from_secs(119)).await;
    assert!(cache.get(&q).is_some());
    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(cache.get(&q).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_question_key_distinguishes_type_and_class() {
    let cache = ResponseCache::new(10, 300);
    cache.put(&Question::new("example.com.", 1, 1), &answer("example.com.", 60));

    assert!(cache.get(&Question::new("example.com.", 1, 28)).is_none());
    assert!(cache.get(&Question::new("example.com.", 3, 1)).is_none());
    assert!(cache.get(&Question::new("example.com.", 1, 1)).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_purge_empties_cache() {
    let cache = ResponseCache::new(10, 300);
    cache.put(&question("a."), &answer("a.", 60));
    cache.put(&question("b."), &answer("b.", 60));

    cache.purge();

    assert!(cache.is_empty());
    assert!(cache.get(&question("a.")).is_none());
    assert!(cache.ordered_questions().is_empty());
}
