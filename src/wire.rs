//! Thin adapter over the DNS wire codec.
//!
//! The server walks the Update section of a message several times, so record
//! reading is exposed as small functions over a [`BinDecoder`] positioned in
//! the raw datagram, keeping byte offsets visible (SIG(0) verification hashes
//! specific message ranges). Name compression is the codec's problem, not
//! ours: decoders are always created over the whole message so pointers
//! resolve.

use std::net::Ipv6Addr;
use trust_dns_proto::op::Header;
use trust_dns_proto::rr::{Name, RecordType};
use trust_dns_proto::serialize::binary::{BinDecodable, BinDecoder, BinEncodable, BinEncoder};

use crate::crypto::{ALGORITHM_ECDSA_P256_SHA256, ECDSA_P256_KEY_SIZE};
use crate::error::Error;

/// Size of the fixed DNS message header.
pub const HEADER_LEN: usize = 12;

pub const CLASS_IN: u16 = 1;
pub const CLASS_NONE: u16 = 254;
pub const CLASS_ANY: u16 = 255;

/// EDNS(0) option code for the SRP Update Lease option.
pub const UPDATE_LEASE_OPTION_CODE: u16 = 2;
/// Wire size of the Update Lease option including its option header.
pub const UPDATE_LEASE_OPTION_LEN: u16 = 12;

/// Payload size advertised in OPT records we emit.
const UDP_PAYLOAD_SIZE: u16 = 512;
/// The DNSSEC OK bit in an OPT record's ttl field.
const OPT_DNSSEC_OK: u32 = 0x0000_8000;

/// Size of the fixed (pre-signer-name) portion of SIG RDATA.
pub const SIG_FIXED_LEN: usize = 18;

/// A record's owner name and fixed header fields, with the rdata location
/// in the underlying message.
#[derive(Debug, Clone)]
pub struct RecordHeader {
    pub name: Name,
    pub rtype: RecordType,
    pub class: u16,
    pub ttl: u32,
    pub rdlength: u16,
    /// Byte offset of the rdata within the message.
    pub rdata_offset: usize,
}

impl RecordHeader {
    /// A "Delete All RRsets from a name" update record (RFC 2136 §2.5.3).
    pub fn is_delete_all(&self) -> bool {
        self.class == CLASS_ANY
            && self.rtype == RecordType::ANY
            && self.ttl == 0
            && self.rdlength == 0
    }
}

/// The parsed SRP Update Lease option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseOption {
    pub lease: u32,
    pub key_lease: u32,
}

/// An ECDSA P-256 KEY record body. Key records are compared as whole
/// records: two keys match only if every field matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub flags: u16,
    pub protocol: u8,
    pub algorithm: u8,
    pub key: [u8; ECDSA_P256_KEY_SIZE],
}

/// The fixed fields of SIG RDATA, before the signer name.
#[derive(Debug, Clone, Copy)]
pub struct SigFixed {
    pub type_covered: u16,
    pub algorithm: u8,
    pub labels: u8,
    pub original_ttl: u32,
    pub expiration: u32,
    pub inception: u32,
    pub key_tag: u16,
}

/// A decoder over `message`, advanced to `offset`.
pub fn decoder_at(message: &[u8], offset: usize) -> Result<BinDecoder<'_>, Error> {
    let mut decoder = BinDecoder::new(message);
    if offset > 0 {
        decoder.read_slice(offset)?;
    }
    Ok(decoder)
}

pub fn read_message_header(decoder: &mut BinDecoder<'_>) -> Result<Header, Error> {
    Ok(Header::read(decoder)?)
}

/// Reads the single zone-section entry (question format): name, type, class.
pub fn read_zone(decoder: &mut BinDecoder<'_>) -> Result<(Name, RecordType, u16), Error> {
    let name = Name::read(decoder)?;
    let rtype = RecordType::from(decoder.read_u16()?.unverified());
    let class = decoder.read_u16()?.unverified();
    Ok((name, rtype, class))
}

/// Reads a record's owner name and fixed header, leaving the decoder at the
/// start of its rdata.
pub fn read_record_header(decoder: &mut BinDecoder<'_>) -> Result<RecordHeader, Error> {
    let name = Name::read(decoder)?;
    let rtype = RecordType::from(decoder.read_u16()?.unverified());
    let class = decoder.read_u16()?.unverified();
    let ttl = decoder.read_u32()?.unverified();
    let rdlength = decoder.read_u16()?.unverified();
    Ok(RecordHeader {
        name,
        rtype,
        class,
        ttl,
        rdlength,
        rdata_offset: decoder.index(),
    })
}

/// Advances the decoder past `record`'s rdata.
pub fn skip_rdata(decoder: &mut BinDecoder<'_>, record: &RecordHeader) -> Result<(), Error> {
    if record.rdlength > 0 {
        decoder.read_slice(record.rdlength as usize)?;
    }
    Ok(())
}

pub fn read_aaaa(decoder: &mut BinDecoder<'_>, record: &RecordHeader) -> Result<Ipv6Addr, Error> {
    if record.rdlength != 16 {
        return Err(Error::Parse);
    }
    let octets: [u8; 16] = decoder
        .read_slice(16)?
        .unverified()
        .try_into()
        .map_err(|_| Error::Parse)?;
    Ok(Ipv6Addr::from(octets))
}

pub fn read_key(decoder: &mut BinDecoder<'_>, record: &RecordHeader) -> Result<KeyRecord, Error> {
    if record.rdlength as usize != 4 + ECDSA_P256_KEY_SIZE {
        return Err(Error::Parse);
    }
    let flags = decoder.read_u16()?.unverified();
    let protocol = decoder.read_u8()?.unverified();
    let algorithm = decoder.read_u8()?.unverified();
    let key: [u8; ECDSA_P256_KEY_SIZE] = decoder
        .read_slice(ECDSA_P256_KEY_SIZE)?
        .unverified()
        .try_into()
        .map_err(|_| Error::Parse)?;
    if algorithm != ALGORITHM_ECDSA_P256_SHA256 {
        return Err(Error::Parse);
    }
    Ok(KeyRecord {
        flags,
        protocol,
        algorithm,
        key,
    })
}

/// Reads PTR rdata: the pointed-to (instance) name.
pub fn read_ptr(decoder: &mut BinDecoder<'_>) -> Result<Name, Error> {
    Ok(Name::read(decoder)?)
}

/// Reads SRV rdata: priority, weight, port and the target name.
pub fn read_srv(decoder: &mut BinDecoder<'_>) -> Result<(u16, u16, u16, Name), Error> {
    let priority = decoder.read_u16()?.unverified();
    let weight = decoder.read_u16()?.unverified();
    let port = decoder.read_u16()?.unverified();
    let target = Name::read(decoder)?;
    Ok((priority, weight, port, target))
}

/// Reads TXT rdata as raw bytes, verifying it is well-formed and non-empty.
pub fn read_txt(decoder: &mut BinDecoder<'_>, record: &RecordHeader) -> Result<Vec<u8>, Error> {
    let data = decoder.read_slice(record.rdlength as usize)?.unverified().to_vec();
    if !well_formed_txt(&data) {
        return Err(Error::Parse);
    }
    Ok(data)
}

/// TXT rdata is a non-empty sequence of length-prefixed character strings
/// covering the rdata exactly.
pub fn well_formed_txt(data: &[u8]) -> bool {
    if data.is_empty() {
        return false;
    }
    let mut cursor = 0usize;
    while cursor < data.len() {
        cursor += 1 + data[cursor] as usize;
    }
    cursor == data.len()
}

/// Reads an OPT record's rdata as the Update Lease option. The rdata must
/// hold exactly one lease option with both intervals.
pub fn read_lease_option(
    decoder: &mut BinDecoder<'_>,
    record: &RecordHeader,
) -> Result<LeaseOption, Error> {
    let code = decoder.read_u16()?.unverified();
    let len = decoder.read_u16()?.unverified();
    let lease = decoder.read_u32()?.unverified();
    let key_lease = decoder.read_u32()?.unverified();
    if code != UPDATE_LEASE_OPTION_CODE || len != 8 {
        return Err(Error::Failed);
    }
    if record.rdlength != UPDATE_LEASE_OPTION_LEN {
        return Err(Error::Parse);
    }
    Ok(LeaseOption { lease, key_lease })
}

pub fn read_sig_fixed(decoder: &mut BinDecoder<'_>) -> Result<SigFixed, Error> {
    Ok(SigFixed {
        type_covered: decoder.read_u16()?.unverified(),
        algorithm: decoder.read_u8()?.unverified(),
        labels: decoder.read_u8()?.unverified(),
        original_ttl: decoder.read_u32()?.unverified(),
        expiration: decoder.read_u32()?.unverified(),
        inception: decoder.read_u32()?.unverified(),
        key_tag: decoder.read_u16()?.unverified(),
    })
}

/// The canonical (uncompressed, lowercase) wire form of a name, as hashed
/// during SIG(0) verification.
pub fn canonical_name(name: &Name) -> Result<Vec<u8>, Error> {
    let mut bytes = Vec::with_capacity(name.len() + 1);
    {
        let mut encoder = BinEncoder::new(&mut bytes);
        encoder.set_canonical_names(true);
        name.emit(&mut encoder)?;
    }
    Ok(bytes)
}

/// The 12 header bytes of `header`.
pub fn header_bytes(header: &Header) -> Result<Vec<u8>, Error> {
    let mut bytes = Vec::with_capacity(HEADER_LEN);
    {
        let mut encoder = BinEncoder::new(&mut bytes);
        header.emit(&mut encoder)?;
    }
    Ok(bytes)
}

fn response_header(request: &Header) -> Header {
    use trust_dns_proto::op::MessageType;

    let mut header = Header::new();
    header.set_id(request.id());
    header.set_message_type(MessageType::Response);
    header.set_op_code(request.op_code());
    header
}

/// A bare response: the request's id and opcode, the given RCODE, no body.
pub fn encode_response(
    request: &Header,
    response_code: trust_dns_proto::op::ResponseCode,
) -> Result<Vec<u8>, Error> {
    let mut header = response_header(request);
    header.set_response_code(response_code);
    header_bytes(&header)
}

/// A success response echoing the granted lease and key lease in an
/// Update Lease OPT record.
pub fn encode_lease_response(
    request: &Header,
    lease: u32,
    key_lease: u32,
) -> Result<Vec<u8>, Error> {
    use trust_dns_proto::op::ResponseCode;

    let mut header = response_header(request);
    header.set_response_code(ResponseCode::NoError);
    header.set_additional_count(1);

    let mut bytes = header_bytes(&header)?;
    bytes.push(0); // root owner name
    bytes.extend_from_slice(&u16::from(RecordType::OPT).to_be_bytes());
    bytes.extend_from_slice(&UDP_PAYLOAD_SIZE.to_be_bytes());
    bytes.extend_from_slice(&OPT_DNSSEC_OK.to_be_bytes());
    bytes.extend_from_slice(&UPDATE_LEASE_OPTION_LEN.to_be_bytes());
    bytes.extend_from_slice(&UPDATE_LEASE_OPTION_CODE.to_be_bytes());
    bytes.extend_from_slice(&8u16.to_be_bytes());
    bytes.extend_from_slice(&lease.to_be_bytes());
    bytes.extend_from_slice(&key_lease.to_be_bytes());
    Ok(bytes)
}
