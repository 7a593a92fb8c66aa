#![allow(dead_code)]
pub mod dns_server_mock;
pub mod http_server_mock;
pub mod ss_server_mock;

pub use dns_server_mock::{MockDnsServer, MockMode};
pub use http_server_mock::{HttpReply, MockHttpServer};
pub use ss_server_mock::MockShadowsocksServer;

use hickory_proto::op::{Message, MessageType, Query, ResponseCode};
use hickory_proto::rr::rdata::{A, SOA};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use std::net::Ipv4Addr;
use std::str::FromStr;

pub fn query_message(id: u16, names: &[&str]) -> Message {
    let mut message = Message::new();
    message.set_id(id);
    message.set_recursion_desired(true);
    for name in names {
        message.add_query(Query::query(Name::from_str(name).unwrap(), RecordType::A));
    }
    message
}

pub fn a_response(name: &str, ttl: u32, ip: Ipv4Addr) -> Message {
    let mut message = query_message(0, &[name]);
    message.set_message_type(MessageType::Response);
    message.add_answer(Record::from_rdata(
        Name::from_str(name).unwrap(),
        ttl,
        RData::A(A::from(ip)),
    ));
    message
}

pub fn nxdomain_response(name: &str, soa_ttl: u32, minimum: u32) -> Message {
    let mut message = query_message(0, &[name]);
    message.set_message_type(MessageType::Response);
    message.set_response_code(ResponseCode::NXDomain);
    message.add_name_server(Record::from_rdata(
        Name::from_str("example.com.").unwrap(),
        soa_ttl,
        RData::SOA(SOA::new(
            Name::from_str("ns.example.com.").unwrap(),
            Name::from_str("hostmaster.example.com.").unwrap(),
            1,
            7200,
            900,
            1_209_600,
            minimum,
        )),
    ));
    message
}
