use hickory_proto::op::{Message, ResponseCode};
use hickory_proto::rr::RData;

/// Seconds `response` may be cached for, or `None` if it must not be cached.
///
/// Only NOERROR and NXDOMAIN are cached, and never truncated responses. With
/// answers the TTL is the smallest answer TTL. Without answers it is the SOA
/// negative TTL from the authority section, capped at `negative_ttl_cap`; no
/// SOA means no caching.
pub fn cacheable_ttl(response: &Message, negative_ttl_cap: u32) -> Option<u32> {
    if response.truncated() {
        return None;
    }
    if !matches!(
        response.response_code(),
        ResponseCode::NoError | ResponseCode::NXDomain
    ) {
        return None;
    }

    let ttl = match response.answers().iter().map(|record| record.ttl()).min() {
        Some(min_ttl) => min_ttl,
        None => negative_ttl(response)?.min(negative_ttl_cap),
    };

    (ttl > 0).then_some(ttl)
}

fn negative_ttl(response: &Message) -> Option<u32> {
    response
        .name_servers()
        .iter()
        .find_map(|record| match record.data() {
            RData::SOA(soa) => Some(record.ttl().min(soa.minimum())),
            _ => None,
        })
}
