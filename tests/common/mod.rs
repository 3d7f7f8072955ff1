//! Shared test support: building signed SRP UPDATE messages the way a
//! client would, and decoding the server's responses.

use p256::ecdsa::signature::hazmat::PrehashSigner;
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use sha2::Digest;
use std::net::Ipv6Addr;
use std::str::FromStr;
use trust_dns_proto::op::{Header, MessageType, OpCode, ResponseCode};
use trust_dns_proto::rr::{Name, RecordType};
use trust_dns_proto::serialize::binary::{BinEncodable, BinEncoder};

use srpd::wire;

pub const CLASS_IN: u16 = 1;
pub const CLASS_ANY: u16 = 255;

const ALGORITHM_ECDSA_P256_SHA256: u8 = 13;

/// A client's ECDSA P-256 identity key.
pub struct ClientKey {
    signing: SigningKey,
    public: [u8; 64],
}

impl ClientKey {
    pub fn generate() -> Self {
        let signing = SigningKey::random(&mut OsRng);
        let point = VerifyingKey::from(&signing).to_encoded_point(false);
        let mut public = [0u8; 64];
        public.copy_from_slice(&point.as_bytes()[1..]);
        Self { signing, public }
    }

    /// KEY RR rdata: flags, protocol, algorithm, public key.
    fn key_rdata(&self) -> Vec<u8> {
        let mut rdata = Vec::with_capacity(4 + 64);
        rdata.extend_from_slice(&0x0200u16.to_be_bytes());
        rdata.push(3);
        rdata.push(ALGORITHM_ECDSA_P256_SHA256);
        rdata.extend_from_slice(&self.public);
        rdata
    }
}

fn emit_name(bytes: &mut Vec<u8>, name: &Name) {
    let mut encoded = Vec::new();
    {
        let mut encoder = BinEncoder::new(&mut encoded);
        encoder.set_canonical_names(true);
        name.emit(&mut encoder).unwrap();
    }
    bytes.extend_from_slice(&encoded);
}

fn name(s: &str) -> Name {
    Name::from_str(s).unwrap()
}

/// Builds SRP UPDATE messages record by record.
pub struct UpdateBuilder {
    id: u16,
    zone: Name,
    update_records: Vec<u8>,
    update_count: u16,
}

impl UpdateBuilder {
    pub fn new(id: u16, domain: &str) -> Self {
        Self {
            id,
            zone: name(domain),
            update_records: Vec::new(),
            update_count: 0,
        }
    }

    fn record(&mut self, owner: &Name, rtype: u16, class: u16, ttl: u32, rdata: &[u8]) {
        emit_name(&mut self.update_records, owner);
        self.update_records.extend_from_slice(&rtype.to_be_bytes());
        self.update_records.extend_from_slice(&class.to_be_bytes());
        self.update_records.extend_from_slice(&ttl.to_be_bytes());
        self.update_records
            .extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        self.update_records.extend_from_slice(rdata);
        self.update_count += 1;
    }

    pub fn ptr(&mut self, service: &str, instance: &str, class: u16) -> &mut Self {
        let mut rdata = Vec::new();
        emit_name(&mut rdata, &name(instance));
        self.record(&name(service), RecordType::PTR.into(), class, 7200, &rdata);
        self
    }

    pub fn delete_all(&mut self, owner: &str) -> &mut Self {
        self.record(&name(owner), 255, CLASS_ANY, 0, &[]);
        self
    }

    pub fn aaaa(&mut self, host: &str, address: Ipv6Addr) -> &mut Self {
        self.record(
            &name(host),
            RecordType::AAAA.into(),
            CLASS_IN,
            7200,
            &address.octets(),
        );
        self
    }

    pub fn key(&mut self, host: &str, key: &ClientKey) -> &mut Self {
        self.record(
            &name(host),
            RecordType::KEY.into(),
            CLASS_IN,
            7200,
            &key.key_rdata(),
        );
        self
    }

    pub fn srv(&mut self, instance: &str, target: &str, priority: u16, weight: u16, port: u16) -> &mut Self {
        let mut rdata = Vec::new();
        rdata.extend_from_slice(&priority.to_be_bytes());
        rdata.extend_from_slice(&weight.to_be_bytes());
        rdata.extend_from_slice(&port.to_be_bytes());
        emit_name(&mut rdata, &name(target));
        self.record(&name(instance), RecordType::SRV.into(), CLASS_IN, 7200, &rdata);
        self
    }

    pub fn txt(&mut self, instance: &str, txt_data: &[u8]) -> &mut Self {
        self.record(&name(instance), RecordType::TXT.into(), CLASS_IN, 7200, txt_data);
        self
    }

    /// Assembles the message and signs it with `key` as `signer`, appending
    /// the Update Lease OPT and the SIG(0) record.
    pub fn build(&self, signer: &str, key: &ClientKey, lease: u32, key_lease: u32) -> Vec<u8> {
        let mut header = Header::new();
        header.set_id(self.id);
        header.set_message_type(MessageType::Query);
        header.set_op_code(OpCode::Update);
        header.set_query_count(1);
        header.set_name_server_count(self.update_count);
        header.set_additional_count(2);

        let mut message = header_bytes(&header);

        // Zone section.
        emit_name(&mut message, &self.zone);
        message.extend_from_slice(&u16::from(RecordType::SOA).to_be_bytes());
        message.extend_from_slice(&CLASS_IN.to_be_bytes());

        // Update section.
        message.extend_from_slice(&self.update_records);

        // Update Lease OPT.
        message.push(0); // root owner
        message.extend_from_slice(&u16::from(RecordType::OPT).to_be_bytes());
        message.extend_from_slice(&512u16.to_be_bytes());
        message.extend_from_slice(&0u32.to_be_bytes());
        message.extend_from_slice(&12u16.to_be_bytes());
        message.extend_from_slice(&2u16.to_be_bytes());
        message.extend_from_slice(&8u16.to_be_bytes());
        message.extend_from_slice(&lease.to_be_bytes());
        message.extend_from_slice(&key_lease.to_be_bytes());

        let sig_offset = message.len();

        // SIG(0) RDATA, less the signature.
        let signer_name = name(signer);
        let mut signer_bytes = Vec::new();
        emit_name(&mut signer_bytes, &signer_name);

        let mut sig_fixed = Vec::with_capacity(18);
        sig_fixed.extend_from_slice(&0u16.to_be_bytes()); // type covered
        sig_fixed.push(ALGORITHM_ECDSA_P256_SHA256);
        sig_fixed.push(signer_name.num_labels());
        sig_fixed.extend_from_slice(&0u32.to_be_bytes()); // original ttl
        sig_fixed.extend_from_slice(&0u32.to_be_bytes()); // expiration
        sig_fixed.extend_from_slice(&0u32.to_be_bytes()); // inception
        sig_fixed.extend_from_slice(&0u16.to_be_bytes()); // key tag

        // The signature covers the SIG RDATA (sans signature) followed by
        // the message as it stood before the SIG RR, with the additional
        // count decremented.
        let mut hasher = sha2::Sha256::new();
        hasher.update(&sig_fixed);
        hasher.update(&signer_bytes);
        let mut unsigned_header = header.clone();
        unsigned_header.set_additional_count(1);
        hasher.update(&header_bytes(&unsigned_header));
        hasher.update(&message[12..sig_offset]);
        let digest: [u8; 32] = hasher.finalize().into();

        let signature: Signature = key.signing.sign_prehash(&digest).unwrap();
        let signature = signature.to_vec();

        // SIG(0) record.
        message.push(0); // root owner
        message.extend_from_slice(&u16::from(RecordType::SIG).to_be_bytes());
        message.extend_from_slice(&CLASS_ANY.to_be_bytes());
        message.extend_from_slice(&0u32.to_be_bytes());
        let rdlength = (sig_fixed.len() + signer_bytes.len() + signature.len()) as u16;
        message.extend_from_slice(&rdlength.to_be_bytes());
        message.extend_from_slice(&sig_fixed);
        message.extend_from_slice(&signer_bytes);
        message.extend_from_slice(&signature);

        message
    }
}

fn header_bytes(header: &Header) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(12);
    {
        let mut encoder = BinEncoder::new(&mut bytes);
        header.emit(&mut encoder).unwrap();
    }
    bytes
}

/// A decoded server response: the RCODE and any echoed lease option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedResponse {
    pub id: u16,
    pub response_code: ResponseCode,
    pub lease: Option<(u32, u32)>,
}

pub fn decode_response(payload: &[u8]) -> DecodedResponse {
    let mut decoder = wire::decoder_at(payload, 0).unwrap();
    let header = wire::read_message_header(&mut decoder).unwrap();
    assert_eq!(header.message_type(), MessageType::Response);

    let lease = (header.additional_count() == 1).then(|| {
        let record = wire::read_record_header(&mut decoder).unwrap();
        assert_eq!(record.rtype, RecordType::OPT);
        let option = wire::read_lease_option(&mut decoder, &record).unwrap();
        (option.lease, option.key_lease)
    });

    DecodedResponse {
        id: header.id(),
        response_code: header.response_code(),
        lease,
    }
}
