//! DNS-over-HTTPS against a JSON resolve endpoint in the style of
//! `https://dns.google.com/resolve`.

mod rdata;
mod wire;

pub use rdata::{parse_answer, parse_authority, RDataParser};

use async_trait::async_trait;
use ferrous_forwarder_application::ports::{Exchanged, Upstream};
use ferrous_forwarder_domain::{DomainError, SubnetPrefix};
use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::opt::{EdnsCode, EdnsOption};
use hickory_proto::rr::{DNSClass, RData, Record, RecordType};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct JsonQuestion {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(rename = "type", alias = "Type")]
    pub rtype: u16,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct JsonRecord {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(rename = "type", alias = "Type")]
    pub rtype: u16,
    #[serde(rename = "TTL", alias = "ttl")]
    pub ttl: u32,
    #[serde(alias = "Data")]
    pub data: String,
}

/// Body of a JSON resolve response. Unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct JsonResponse {
    #[serde(rename = "Status", alias = "status")]
    pub status: u16,
    #[serde(rename = "TC", alias = "tc")]
    pub truncated: bool,
    #[serde(rename = "RD", alias = "rd")]
    pub recursion_desired: bool,
    #[serde(rename = "RA", alias = "ra")]
    pub recursion_available: bool,
    #[serde(rename = "AD", alias = "ad")]
    pub authentic_data: bool,
    #[serde(rename = "CD", alias = "cd")]
    pub checking_disabled: bool,
    #[serde(rename = "Question", alias = "question")]
    pub question: Vec<JsonQuestion>,
    #[serde(rename = "Answer", alias = "answer")]
    pub answer: Vec<JsonRecord>,
    #[serde(rename = "Authority", alias = "authority")]
    pub authority: Vec<JsonRecord>,
}

pub struct HttpsJsonUpstream {
    url: Arc<str>,
    client: reqwest::Client,
}

impl HttpsJsonUpstream {
    pub fn new(url: Arc<str>, client: reqwest::Client) -> Self {
        Self { url, client }
    }

    fn request_failed(&self, e: reqwest::Error) -> DomainError {
        if e.is_timeout() {
            DomainError::TransportTimeout {
                server: self.url.to_string(),
            }
        } else if e.is_connect() {
            DomainError::TransportConnectionRefused {
                server: self.url.to_string(),
                reason: e.to_string(),
            }
        } else {
            DomainError::TransportReadFailed {
                server: self.url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

/// Query-string parameters for `query`'s first question.
pub fn request_params(query: &Message) -> Result<Vec<(&'static str, String)>, DomainError> {
    let question = query.queries().first().ok_or(DomainError::EmptyQuestion)?;

    let mut params = vec![
        ("name", question.name().to_ascii()),
        ("type", u16::from(question.query_type()).to_string()),
    ];
    if let Some(subnet) = client_subnet(query) {
        params.push(("edns_client_subnet", subnet.to_string()));
    }
    Ok(params)
}

fn client_subnet(query: &Message) -> Option<SubnetPrefix> {
    let edns: &Edns = query.extensions().as_ref()?;
    match edns.option(EdnsCode::Subnet)? {
        EdnsOption::Subnet(subnet) => {
            SubnetPrefix::new(subnet.addr(), subnet.source_prefix()).ok()
        }
        _ => None,
    }
}

/// Builds a response message from a decoded JSON body.
///
/// Records whose data cannot be translated are dropped; only SOA is kept from
/// the authority section. When the body carries no question the query's own
/// questions are echoed.
pub fn into_message(body: JsonResponse, query: &Message) -> Message {
    let mut message = Message::new();
    message.set_id(query.id());
    message.set_message_type(MessageType::Response);
    message.set_op_code(OpCode::Query);
    let rcode: ResponseCode = body.status.into();
    message.set_response_code(rcode);
    message.set_truncated(body.truncated);
    message.set_recursion_desired(body.recursion_desired);
    message.set_recursion_available(body.recursion_available);
    message.set_authentic_data(body.authentic_data);
    message.set_checking_disabled(body.checking_disabled);

    if body.question.is_empty() {
        message.add_queries(query.queries().iter().cloned());
    }
    for question in &body.question {
        match wire::parse_name(&question.name) {
            Some(name) => {
                let mut parsed = Query::query(name, RecordType::from(question.rtype));
                parsed.set_query_class(DNSClass::IN);
                message.add_query(parsed);
            }
            None => debug!(name = %question.name, "Skipping unparsable JSON question"),
        }
    }

    for record in &body.answer {
        if let Some(record) = translate(record, parse_answer) {
            message.add_answer(record);
        }
    }
    for record in &body.authority {
        if let Some(record) = translate(record, parse_authority) {
            message.add_name_server(record);
        }
    }

    message
}

fn translate(record: &JsonRecord, parse: fn(u16, &str) -> Option<RData>) -> Option<Record> {
    let translated = wire::parse_name(&record.name).and_then(|name| {
        parse(record.rtype, &record.data)
            .map(|rdata| Record::from_rdata(name, record.ttl, rdata))
    });

    if translated.is_none() {
        debug!(
            name = %record.name,
            rtype = record.rtype,
            data = %record.data,
            "Skipping untranslatable JSON record"
        );
    }
    translated
}

#[async_trait]
impl Upstream for HttpsJsonUpstream {
    fn name(&self) -> &str {
        &self.url
    }

    fn uses_https(&self) -> bool {
        true
    }

    async fn exchange(&self, query: &Message) -> Result<Exchanged, DomainError> {
        let started = Instant::now();
        let params = request_params(query)?;

        debug!(url = %self.url, ?params, "Sending DoH-JSON query");

        let response = self
            .client
            .get(&*self.url)
            .query(&params)
            .header(reqwest::header::ACCEPT, "application/dns-json")
            .send()
            .await
            .map_err(|e| self.request_failed(e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(DomainError::TransportHttpStatus {
                server: self.url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.request_failed(e))?;
        let body: JsonResponse =
            serde_json::from_slice(&bytes).map_err(|e| DomainError::TransportDecodeFailed {
                server: self.url.to_string(),
                reason: e.to_string(),
            })?;

        let message = into_message(body, query);
        let elapsed = started.elapsed();
        debug!(
            url = %self.url,
            answers = message.answers().len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "DoH-JSON response received"
        );

        Ok(Exchanged {
            response: message,
            elapsed,
        })
    }
}
