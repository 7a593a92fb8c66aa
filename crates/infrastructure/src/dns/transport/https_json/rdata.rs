use super::wire::{
    bounded_character_strings, character_strings, decode_base32hex, decode_base64, decode_hex,
    decode_salt, fields, parse_name, parse_sig_time, push_character_string, push_name,
    record_type, record_types,
};
use hickory_proto::dnssec::rdata::{DNSSECRData, DNSKEY, DS, NSEC, NSEC3, NSEC3PARAM, RRSIG};
use hickory_proto::dnssec::{Algorithm, DigestType, Nsec3HashAlgorithm, PublicKeyBuf};
use hickory_proto::rr::rdata::{sshfp, A, AAAA, CNAME, MX, NS, NULL, PTR, SOA, SRV, SSHFP, TXT};
use hickory_proto::rr::{RData, RecordType};
use rustc_hash::FxHashMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

/// Turns the `data` string of one JSON record into rdata.
pub type RDataParser = fn(&str) -> Option<RData>;

mod code {
    pub const A: u16 = 1;
    pub const NS: u16 = 2;
    pub const MD: u16 = 3;
    pub const MF: u16 = 4;
    pub const CNAME: u16 = 5;
    pub const SOA: u16 = 6;
    pub const MB: u16 = 7;
    pub const MG: u16 = 8;
    pub const MR: u16 = 9;
    pub const PTR: u16 = 12;
    pub const MX: u16 = 15;
    pub const TXT: u16 = 16;
    pub const RP: u16 = 17;
    pub const AAAA: u16 = 28;
    pub const SRV: u16 = 33;
    pub const DS: u16 = 43;
    pub const SSHFP: u16 = 44;
    pub const RRSIG: u16 = 46;
    pub const NSEC: u16 = 47;
    pub const DNSKEY: u16 = 48;
    pub const NSEC3: u16 = 50;
    pub const NSEC3PARAM: u16 = 51;
    pub const SPF: u16 = 99;
}

static ANSWER_PARSERS: LazyLock<FxHashMap<u16, RDataParser>> = LazyLock::new(|| {
    let entries: [(u16, RDataParser); 22] = [
        (code::A, parse_a),
        (code::AAAA, parse_aaaa),
        (code::NS, parse_ns),
        (code::CNAME, parse_cname),
        (code::PTR, parse_ptr),
        (code::MD, |data| parse_opaque_name(code::MD, data)),
        (code::MF, |data| parse_opaque_name(code::MF, data)),
        (code::MB, |data| parse_opaque_name(code::MB, data)),
        (code::MG, |data| parse_opaque_name(code::MG, data)),
        (code::MR, |data| parse_opaque_name(code::MR, data)),
        (code::MX, parse_mx),
        (code::TXT, parse_txt),
        (code::SPF, parse_spf),
        (code::RP, parse_rp),
        (code::SRV, parse_srv),
        (code::DS, parse_ds),
        (code::SSHFP, parse_sshfp),
        (code::RRSIG, parse_rrsig),
        (code::NSEC, parse_nsec),
        (code::DNSKEY, parse_dnskey),
        (code::NSEC3, parse_nsec3),
        (code::NSEC3PARAM, parse_nsec3param),
    ];

    entries.into_iter().collect()
});

/// Rdata for an Answer record, or `None` for malformed data and types
/// without a parser.
pub fn parse_answer(rtype: u16, data: &str) -> Option<RData> {
    ANSWER_PARSERS.get(&rtype).and_then(|parse| parse(data))
}

/// Only SOA is understood in the Authority section.
pub fn parse_authority(rtype: u16, data: &str) -> Option<RData> {
    match rtype {
        code::SOA => parse_soa(data),
        _ => None,
    }
}

fn opaque(rtype: u16, rdata: Vec<u8>) -> RData {
    RData::Unknown {
        code: RecordType::from(rtype),
        rdata: NULL::with(rdata),
    }
}

/// Fields of `data`, or `None` when there are fewer than `min`.
fn at_least(data: &str, min: usize) -> Option<Vec<&str>> {
    let parts = fields(data);
    (parts.len() >= min).then_some(parts)
}

fn parse_a(data: &str) -> Option<RData> {
    data.trim()
        .parse::<Ipv4Addr>()
        .ok()
        .map(|ip| RData::A(A::from(ip)))
}

fn parse_aaaa(data: &str) -> Option<RData> {
    data.trim()
        .parse::<Ipv6Addr>()
        .ok()
        .map(|ip| RData::AAAA(AAAA::from(ip)))
}

fn parse_ns(data: &str) -> Option<RData> {
    parse_name(data.trim()).map(|name| RData::NS(NS(name)))
}

fn parse_cname(data: &str) -> Option<RData> {
    parse_name(data.trim()).map(|name| RData::CNAME(CNAME(name)))
}

fn parse_ptr(data: &str) -> Option<RData> {
    parse_name(data.trim()).map(|name| RData::PTR(PTR(name)))
}

fn parse_opaque_name(rtype: u16, data: &str) -> Option<RData> {
    let name = parse_name(data.trim())?;
    let mut buf = Vec::new();
    push_name(&mut buf, &name);
    Some(opaque(rtype, buf))
}

fn parse_mx(data: &str) -> Option<RData> {
    let parts = at_least(data, 2)?;
    let preference = parts[0].parse().ok()?;
    let exchange = parse_name(parts[1])?;
    Some(RData::MX(MX::new(preference, exchange)))
}

fn parse_txt(data: &str) -> Option<RData> {
    bounded_character_strings(data).map(|strings| RData::TXT(TXT::new(strings)))
}

fn parse_spf(data: &str) -> Option<RData> {
    let mut buf = Vec::new();
    for text in character_strings(data) {
        push_character_string(&mut buf, &text)?;
    }
    Some(opaque(code::SPF, buf))
}

fn parse_rp(data: &str) -> Option<RData> {
    let parts = at_least(data, 2)?;
    let mut buf = Vec::new();
    push_name(&mut buf, &parse_name(parts[0])?);
    push_name(&mut buf, &parse_name(parts[1])?);
    Some(opaque(code::RP, buf))
}

fn parse_srv(data: &str) -> Option<RData> {
    let parts = at_least(data, 4)?;
    Some(RData::SRV(SRV::new(
        parts[0].parse().ok()?,
        parts[1].parse().ok()?,
        parts[2].parse().ok()?,
        parse_name(parts[3])?,
    )))
}

fn dnssec(rdata: DNSSECRData) -> RData {
    RData::DNSSEC(rdata)
}

fn parse_ds(data: &str) -> Option<RData> {
    let parts = at_least(data, 4)?;
    Some(dnssec(DNSSECRData::DS(DS::new(
        parts[0].parse().ok()?,
        Algorithm::from_u8(parts[1].parse().ok()?),
        DigestType::from(parts[2].parse::<u8>().ok()?),
        decode_hex(&parts[3..].concat())?,
    ))))
}

fn parse_sshfp(data: &str) -> Option<RData> {
    let parts = at_least(data, 3)?;
    let algorithm: u8 = parts[0].parse().ok()?;
    let fingerprint_type: u8 = parts[1].parse().ok()?;
    let fingerprint = decode_hex(&parts[2..].concat())?;
    Some(RData::SSHFP(SSHFP::new(
        sshfp::Algorithm::from(algorithm),
        sshfp::FingerprintType::from(fingerprint_type),
        fingerprint,
    )))
}

fn parse_rrsig(data: &str) -> Option<RData> {
    let parts = at_least(data, 9)?;
    Some(dnssec(DNSSECRData::RRSIG(RRSIG::new(
        record_type(parts[0])?,
        Algorithm::from_u8(parts[1].parse().ok()?),
        parts[2].parse().ok()?,
        parts[3].parse().ok()?,
        parse_sig_time(parts[4])?,
        parse_sig_time(parts[5])?,
        parts[6].parse().ok()?,
        parse_name(parts[7])?,
        decode_base64(&parts[8..].concat())?,
    ))))
}

fn parse_nsec(data: &str) -> Option<RData> {
    let parts = at_least(data, 1)?;
    Some(dnssec(DNSSECRData::NSEC(NSEC::new(
        parse_name(parts[0])?,
        record_types(&parts[1..]),
    ))))
}

fn parse_dnskey(data: &str) -> Option<RData> {
    let parts = at_least(data, 4)?;
    let flags: u16 = parts[0].parse().ok()?;
    // RFC 4034 fixes the protocol field at 3.
    if parts[1] != "3" {
        return None;
    }
    let algorithm = Algorithm::from_u8(parts[2].parse().ok()?);
    let public_key = decode_base64(&parts[3..].concat())?;
    Some(dnssec(DNSSECRData::DNSKEY(DNSKEY::with_flags(
        flags,
        PublicKeyBuf::new(public_key, algorithm),
    ))))
}

/// Hash algorithm, opt-out flag, iterations and salt shared by NSEC3 and
/// NSEC3PARAM.
struct Nsec3Params {
    hash: Nsec3HashAlgorithm,
    opt_out: bool,
    iterations: u16,
    salt: Vec<u8>,
}

impl Nsec3Params {
    fn parse(parts: &[&str]) -> Option<Self> {
        let flags: u8 = parts[1].parse().ok()?;
        Some(Self {
            hash: Nsec3HashAlgorithm::from_u8(parts[0].parse().ok()?).ok()?,
            opt_out: flags & 0x01 != 0,
            iterations: parts[2].parse().ok()?,
            salt: decode_salt(parts[3])?,
        })
    }
}

fn parse_nsec3(data: &str) -> Option<RData> {
    let parts = at_least(data, 5)?;
    let params = Nsec3Params::parse(&parts)?;
    Some(dnssec(DNSSECRData::NSEC3(NSEC3::new(
        params.hash,
        params.opt_out,
        params.iterations,
        params.salt,
        decode_base32hex(parts[4])?,
        record_types(&parts[5..]),
    ))))
}

fn parse_nsec3param(data: &str) -> Option<RData> {
    let parts = at_least(data, 4)?;
    let params = Nsec3Params::parse(&parts)?;
    Some(dnssec(DNSSECRData::NSEC3PARAM(NSEC3PARAM::new(
        params.hash,
        params.opt_out,
        params.iterations,
        params.salt,
    ))))
}

fn parse_soa(data: &str) -> Option<RData> {
    let parts = at_least(data, 7)?;
    Some(RData::SOA(SOA::new(
        parse_name(parts[0])?,
        parse_name(parts[1])?,
        parts[2].parse().ok()?,
        parts[3].parse().ok()?,
        parts[4].parse().ok()?,
        parts[5].parse().ok()?,
        parts[6].parse().ok()?,
    )))
}
