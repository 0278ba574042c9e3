mod helpers;

use helpers::make_query;
use hickory_proto::op::{Message, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{RData, Record, RecordType};
use relay_dns_infrastructure::dns::{Fingerprint, ResponseCache, ServerMetrics};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn make_cache(capacity: usize, ttl_secs: u64) -> (ResponseCache, Arc<ServerMetrics>) {
    let metrics = Arc::new(ServerMetrics::default());
    (
        ResponseCache::new(capacity, Duration::from_secs(ttl_secs), Arc::clone(&metrics)),
        metrics,
    )
}

fn make_response(name: &str, rcode: ResponseCode) -> Message {
    let query = make_query(name, RecordType::A);
    let mut response = Message::new();
    response.set_id(query.id());
    response.set_message_type(MessageType::Response);
    response.set_op_code(OpCode::Query);
    response.set_response_code(rcode);
    response.add_queries(query.queries().to_vec());
    if rcode == ResponseCode::NoError {
        let question = query.queries()[0].clone();
        response.add_answer(Record::from_rdata(
            question.name().clone(),
            300,
            RData::A(A("192.0.2.1".parse().unwrap())),
        ));
    }
    response
}

fn fp(name: &str) -> Fingerprint {
    Fingerprint::of_query(&make_query(name, RecordType::A)).unwrap()
}

#[test]
fn test_hit_is_stable_for_the_whole_ttl() {
    let (cache, metrics) = make_cache(16, 60);
    let response = make_response("example.com.", ResponseCode::NoError);
    let t0 = Instant::now();

    cache.put_at(fp("example.com."), &response, t0);

    let early = cache.get_at(&fp("example.com."), 0x1111, t0).unwrap();
    let late = cache
        .get_at(&fp("example.com."), 0x1111, t0 + Duration::from_secs(59))
        .unwrap();
    assert_eq!(
        early.to_vec().unwrap(),
        late.to_vec().unwrap(),
        "a cached answer must not change within the TTL"
    );
    assert_eq!(metrics.cache_hits.load(Ordering::Relaxed), 2);
}

#[test]
fn test_entry_expires_after_ttl() {
    let (cache, _) = make_cache(16, 60);
    let t0 = Instant::now();
    cache.put_at(fp("example.com."), &make_response("example.com.", ResponseCode::NoError), t0);

    assert!(cache
        .get_at(&fp("example.com."), 1, t0 + Duration::from_secs(60))
        .is_none());
    assert!(cache.is_empty(), "stale entry must be removed on lookup");
}

#[test]
fn test_transaction_id_is_rewritten() {
    let (cache, _) = make_cache(16, 60);
    let t0 = Instant::now();
    cache.put_at(fp("example.com."), &make_response("example.com.", ResponseCode::NoError), t0);

    let hit = cache.get_at(&fp("example.com."), 0xbeef, t0).unwrap();
    assert_eq!(hit.id(), 0xbeef);

    let other = cache.get_at(&fp("example.com."), 0x1234, t0).unwrap();
    assert_eq!(other.id(), 0x1234);
}

#[test]
fn test_error_rcodes_are_never_cached() {
    let (cache, _) = make_cache(16, 60);
    let t0 = Instant::now();

    for rcode in [
        ResponseCode::ServFail,
        ResponseCode::Refused,
        ResponseCode::NotImp,
    ] {
        cache.put_at(fp("example.com."), &make_response("example.com.", rcode), t0);
        assert!(
            cache.get_at(&fp("example.com."), 1, t0).is_none(),
            "{rcode:?} must not be stored"
        );
    }

    cache.put_at(fp("nx.example."), &make_response("nx.example.", ResponseCode::NXDomain), t0);
    assert!(
        cache.get_at(&fp("nx.example."), 1, t0).is_some(),
        "NXDOMAIN is cached"
    );
}

#[test]
fn test_fifo_eviction_at_capacity() {
    let (cache, metrics) = make_cache(2, 60);
    let t0 = Instant::now();

    cache.put_at(fp("a.example."), &make_response("a.example.", ResponseCode::NoError), t0);
    cache.put_at(fp("b.example."), &make_response("b.example.", ResponseCode::NoError), t0);
    cache.put_at(fp("c.example."), &make_response("c.example.", ResponseCode::NoError), t0);

    assert_eq!(cache.len(), 2);
    assert!(cache.get_at(&fp("a.example."), 1, t0).is_none(), "oldest evicted");
    assert!(cache.get_at(&fp("b.example."), 1, t0).is_some());
    assert!(cache.get_at(&fp("c.example."), 1, t0).is_some());
    assert_eq!(metrics.cache_evictions.load(Ordering::Relaxed), 1);
}

#[test]
fn test_overwrite_does_not_evict_the_fresh_entry() {
    let (cache, _) = make_cache(2, 60);
    let t0 = Instant::now();

    cache.put_at(fp("a.example."), &make_response("a.example.", ResponseCode::NoError), t0);
    cache.put_at(fp("a.example."), &make_response("a.example.", ResponseCode::NoError), t0);
    cache.put_at(fp("b.example."), &make_response("b.example.", ResponseCode::NoError), t0);
    cache.put_at(fp("c.example."), &make_response("c.example.", ResponseCode::NoError), t0);

    // The overwritten slot for "a" is stale in the order queue; eviction
    // must skip it and still land on "a" via its second insertion.
    assert_eq!(cache.len(), 2);
    assert!(cache.get_at(&fp("a.example."), 1, t0).is_none());
    assert!(cache.get_at(&fp("b.example."), 1, t0).is_some());
    assert!(cache.get_at(&fp("c.example."), 1, t0).is_some());
}

#[test]
fn test_capacity_zero_disables_everything() {
    let (cache, metrics) = make_cache(0, 60);
    let t0 = Instant::now();

    cache.put_at(fp("example.com."), &make_response("example.com.", ResponseCode::NoError), t0);
    assert!(cache.get_at(&fp("example.com."), 1, t0).is_none());
    assert!(cache.is_disabled());
    assert_eq!(metrics.cache_inserts.load(Ordering::Relaxed), 0);
}

#[test]
fn test_lookup_is_case_and_dot_insensitive() {
    let (cache, _) = make_cache(16, 60);
    let t0 = Instant::now();
    cache.put_at(
        Fingerprint::of_query(&make_query("Example.COM.", RecordType::A)).unwrap(),
        &make_response("example.com.", ResponseCode::NoError),
        t0,
    );

    assert!(cache.get_at(&fp("example.com."), 1, t0).is_some());
}
