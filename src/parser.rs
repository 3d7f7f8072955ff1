//! The SRP UPDATE parser.
//!
//! An UPDATE is interpreted in several passes over the same section, and the
//! order is load-bearing: Service Discovery (PTR) instructions are read
//! first so that a later "Delete All RRsets from a name" can be told apart
//! as naming a service instance rather than the host. After the Update
//! section is assembled into a candidate [`Host`], names are checked for
//! conflicts against the registry, and only then is the Additional section
//! (lease option and SIG(0)) processed and the signature verified.

use std::net::SocketAddr;
use std::time::Instant;
use trust_dns_proto::op::{Header, OpCode};
use trust_dns_proto::rr::{Name, RecordType};

use crate::config::{LeaseConfig, Limits};
use crate::crypto::{self, Sha256, ECDSA_P256_SIGNATURE_SIZE};
use crate::error::Error;
use crate::name;
use crate::registry::{Host, Registry};
use crate::wire::{self, CLASS_NONE, HEADER_LEN, SIG_FIXED_LEN};

/// Everything the server tracks about one received message while it is
/// being parsed and, for deferred updates, while a decision is pending.
#[derive(Debug, Clone)]
pub(crate) struct MessageMetadata {
    pub header: Header,
    pub zone_class: u16,
    /// Byte offset of the next unread section.
    pub offset: usize,
    pub rx_time: Instant,
    pub lease_config: LeaseConfig,
    /// The client's endpoint; `None` for replicated updates, which get no
    /// response.
    pub peer: Option<SocketAddr>,
}

impl MessageMetadata {
    pub fn is_direct_rx_from_client(&self) -> bool {
        self.peer.is_some()
    }
}

/// Reads and gates the message header: anything that is not a DNS UPDATE
/// query is dropped without response.
pub(crate) fn read_update_header(message: &[u8]) -> Result<Header, Error> {
    use trust_dns_proto::op::MessageType;

    let mut decoder = wire::decoder_at(message, 0)?;
    let header = wire::read_message_header(&mut decoder)?;
    if header.message_type() != MessageType::Query || header.op_code() != OpCode::Update {
        return Err(Error::Drop);
    }
    Ok(header)
}

pub(crate) struct UpdateParser<'a> {
    message: &'a [u8],
    domain: &'a Name,
    limits: &'a Limits,
    registry: &'a Registry,
}

impl<'a> UpdateParser<'a> {
    pub fn new(
        message: &'a [u8],
        domain: &'a Name,
        limits: &'a Limits,
        registry: &'a Registry,
    ) -> Self {
        Self {
            message,
            domain,
            limits,
            registry,
        }
    }

    /// Validates the Zone section: exactly one SOA for our domain. Leaves
    /// `metadata.offset` at the start of the Update section and records the
    /// zone class.
    pub fn process_zone_section(&self, metadata: &mut MessageMetadata) -> Result<(), Error> {
        if metadata.header.query_count() != 1 {
            return Err(Error::Parse);
        }

        let mut decoder = wire::decoder_at(self.message, metadata.offset)?;
        let (zone_name, zone_type, zone_class) = wire::read_zone(&mut decoder)?;

        if &zone_name != self.domain {
            return Err(Error::Security);
        }
        if zone_type != RecordType::SOA {
            return Err(Error::Parse);
        }

        metadata.zone_class = zone_class;
        metadata.offset = decoder.index();
        Ok(())
    }

    /// Builds the candidate host from the Update and Additional sections.
    pub fn process_update(&self, metadata: &mut MessageMetadata) -> Result<Host, Error> {
        // Per the SRP profile, an update carries no prerequisites.
        if metadata.header.answer_count() != 0 {
            return Err(Error::Failed);
        }

        let mut host = Host::new(metadata.rx_time);

        self.process_service_discovery(&mut host, metadata)?;
        self.process_host_description(&mut host, metadata)?;
        self.process_service_description(&mut host, metadata)?;

        if self.registry.has_name_conflicts_with(&host) {
            return Err(Error::Duplicated);
        }

        self.process_additional_section(&mut host, metadata)?;

        Ok(host)
    }

    /// Pass over the Update section collecting PTR (Service Discovery)
    /// instructions. Every record's owner is also checked for domain
    /// membership here, PTR or not.
    fn process_service_discovery(
        &self,
        host: &mut Host,
        metadata: &MessageMetadata,
    ) -> Result<(), Error> {
        let mut decoder = wire::decoder_at(self.message, metadata.offset)?;

        for _ in 0..metadata.header.name_server_count() {
            let record = wire::read_record_header(&mut decoder)?;
            wire::skip_rdata(&mut decoder, &record)?;

            if !name::is_sub_domain_of(&record.name, self.domain) {
                return Err(Error::Security);
            }
            if record.rtype != RecordType::PTR {
                continue;
            }
            if record.class != CLASS_NONE && record.class != metadata.zone_class {
                return Err(Error::Failed);
            }

            let mut rdata = wire::decoder_at(self.message, record.rdata_offset)?;
            let instance_name = wire::read_ptr(&mut rdata)?;

            // A sub-type owner is `<sub-label>._sub.<service>.<domain>.`;
            // the instance must belong to the base service either way.
            let (is_sub_type, base_service) = match name::split_sub_type(&record.name) {
                Some((_, base)) => (true, base),
                None => (false, record.name.clone()),
            };
            if !name::is_sub_domain_of(&instance_name, &base_service) {
                return Err(Error::Failed);
            }

            if host.find_service(&record.name, &instance_name).is_some() {
                return Err(Error::Failed);
            }

            let index = host.add_service(
                record.name.clone(),
                instance_name,
                is_sub_type,
                metadata.rx_time,
                self.limits,
            )?;

            // CLASS NONE marks a "Delete an RR from an RRset" instruction.
            if record.class == CLASS_NONE {
                host.mark_service_deleted(index);
            }
        }

        Ok(())
    }

    /// Pass over the Update section collecting the Host Description: AAAA
    /// and KEY records, plus "Delete All RRsets" on the host name.
    fn process_host_description(
        &self,
        host: &mut Host,
        metadata: &MessageMetadata,
    ) -> Result<(), Error> {
        let mut decoder = wire::decoder_at(self.message, metadata.offset)?;

        for _ in 0..metadata.header.name_server_count() {
            let record = wire::read_record_header(&mut decoder)?;
            wire::skip_rdata(&mut decoder, &record)?;

            if record.class == wire::CLASS_ANY {
                if !record.is_delete_all() {
                    return Err(Error::Failed);
                }
                // Delete-all on a name that is not a service instance binds
                // (or must re-state) the host name.
                if host.find_description(&record.name).is_none() {
                    host.set_full_name(&record.name)?;
                    host.clear_resources();
                }
            } else if record.rtype == RecordType::AAAA {
                if record.class != metadata.zone_class {
                    return Err(Error::Failed);
                }
                host.set_full_name(&record.name)?;

                let mut rdata = wire::decoder_at(self.message, record.rdata_offset)?;
                let address = wire::read_aaaa(&mut rdata, &record)?;
                // Unusable address categories are dropped, not fatal.
                match host.add_address(address, self.limits) {
                    Err(Error::NoBufs) => return Err(Error::NoBufs),
                    _ => {}
                }
            } else if record.rtype == RecordType::KEY {
                if record.class != metadata.zone_class {
                    return Err(Error::Failed);
                }
                let mut rdata = wire::decoder_at(self.message, record.rdata_offset)?;
                let key = wire::read_key(&mut rdata, &record)?;
                match host.key() {
                    Some(existing) if existing != &key => return Err(Error::Security),
                    _ => host.set_key(key),
                }
            }
        }

        // A complete Host Description names the host and carries its key.
        // The address count is checked later, once the Lease option tells us
        // whether the host is being removed.
        if host.full_name().is_none() || host.key().is_none() {
            return Err(Error::Failed);
        }

        Ok(())
    }

    /// Pass over the Update section collecting Service Descriptions: SRV and
    /// TXT records and per-instance "Delete All RRsets". Leaves
    /// `metadata.offset` at the start of the Additional section.
    fn process_service_description(
        &self,
        host: &mut Host,
        metadata: &mut MessageMetadata,
    ) -> Result<(), Error> {
        let mut decoder = wire::decoder_at(self.message, metadata.offset)?;

        for _ in 0..metadata.header.name_server_count() {
            let record = wire::read_record_header(&mut decoder)?;
            wire::skip_rdata(&mut decoder, &record)?;

            if record.class == wire::CLASS_ANY {
                if !record.is_delete_all() {
                    return Err(Error::Failed);
                }
                if let Some(description) = host.find_description_mut(&record.name) {
                    description.clear_resources();
                    description.update_time = Some(metadata.rx_time);
                }
            } else if record.rtype == RecordType::SRV {
                if record.class != metadata.zone_class {
                    return Err(Error::Failed);
                }

                let mut rdata = wire::decoder_at(self.message, record.rdata_offset)?;
                let (priority, weight, port, target) = wire::read_srv(&mut rdata)?;

                if !name::is_sub_domain_of(&record.name, self.domain) {
                    return Err(Error::Security);
                }
                if !host.matches(&target) {
                    return Err(Error::Failed);
                }

                let description = host
                    .find_description_mut(&record.name)
                    .ok_or(Error::Failed)?;
                // Only one SRV per service description.
                if description.port != 0 {
                    return Err(Error::Failed);
                }
                description.priority = priority;
                description.weight = weight;
                description.port = port;
                description.update_time = Some(metadata.rx_time);
            } else if record.rtype == RecordType::TXT {
                if record.class != metadata.zone_class {
                    return Err(Error::Failed);
                }
                if record.rdlength as usize > self.limits.max_txt_len {
                    return Err(Error::NoBufs);
                }
                if host.find_description(&record.name).is_none() {
                    return Err(Error::Failed);
                }

                let mut rdata = wire::decoder_at(self.message, record.rdata_offset)?;
                let txt_data = wire::read_txt(&mut rdata, &record)?;
                let description = host
                    .find_description_mut(&record.name)
                    .ok_or(Error::Failed)?;
                description.txt_data = txt_data;
            }
        }

        // Every description present must have been touched by this update,
        // and SRV and TXT come as a pair or not at all.
        for description in host.descriptions() {
            if description.update_time != Some(metadata.rx_time) {
                return Err(Error::Failed);
            }
            if (description.port == 0) != description.txt_data.is_empty() {
                return Err(Error::Failed);
            }
        }

        metadata.offset = decoder.index();
        Ok(())
    }

    /// The Additional section: exactly an EDNS(0) Update Lease option and a
    /// SIG(0) covering the whole message.
    fn process_additional_section(
        &self,
        host: &mut Host,
        metadata: &mut MessageMetadata,
    ) -> Result<(), Error> {
        if metadata.header.additional_count() != 2 {
            return Err(Error::Failed);
        }

        let mut decoder = wire::decoder_at(self.message, metadata.offset)?;

        // EDNS(0) Update Lease option.
        let opt = wire::read_record_header(&mut decoder)?;
        wire::skip_rdata(&mut decoder, &opt)?;
        if !opt.name.is_root() || opt.rtype != RecordType::OPT {
            return Err(Error::Parse);
        }
        let mut rdata = wire::decoder_at(self.message, opt.rdata_offset)?;
        let lease_option = wire::read_lease_option(&mut rdata, &opt)?;

        host.set_leases(lease_option.lease, lease_option.key_lease);

        // A registration (as opposed to a removal) must carry at least one
        // usable address.
        if host.lease() > 0 && host.addresses().is_empty() {
            return Err(Error::Failed);
        }

        // SIG(0).
        let sig_offset = decoder.index();
        let sig = wire::read_record_header(&mut decoder)?;
        wire::skip_rdata(&mut decoder, &sig)?;
        if !sig.name.is_root() || sig.rtype != RecordType::SIG {
            return Err(Error::Parse);
        }

        let sig_rdata_offset = sig.rdata_offset;
        let mut rdata = wire::decoder_at(self.message, sig_rdata_offset)?;
        let sig_fixed = wire::read_sig_fixed(&mut rdata)?;
        let signer_name = wire::read_ptr(&mut rdata)?;
        let signer_name_end = rdata.index();

        let signature_len = (sig.rdlength as usize)
            .checked_sub(signer_name_end - sig_rdata_offset)
            .ok_or(Error::Parse)?;

        // Signature validity windows are not enforced: constrained clients
        // rarely have synchronized wall-clock time.

        if sig_fixed.algorithm != crypto::ALGORITHM_ECDSA_P256_SHA256 {
            return Err(Error::Failed);
        }
        if sig_fixed.type_covered != 0 {
            return Err(Error::Failed);
        }
        if signature_len != ECDSA_P256_SIGNATURE_SIZE {
            return Err(Error::Parse);
        }

        self.verify_signature(host, metadata, sig_offset, sig_rdata_offset, &sig, &signer_name)?;

        metadata.offset = decoder.index();
        Ok(())
    }

    /// SIG(0) verification (RFC 2931 §3.1): SHA-256 over the SIG RDATA less
    /// the signature (with the signer name in canonical, uncompressed form)
    /// followed by the message as it was before the SIG RR was appended —
    /// the header with its additional count decremented, then everything up
    /// to the SIG record. The signature is checked against the KEY carried
    /// in this same update.
    fn verify_signature(
        &self,
        host: &Host,
        metadata: &MessageMetadata,
        sig_offset: usize,
        sig_rdata_offset: usize,
        sig: &wire::RecordHeader,
        signer_name: &Name,
    ) -> Result<(), Error> {
        let rdata_end = sig_rdata_offset + sig.rdlength as usize;
        if rdata_end > self.message.len() || sig_rdata_offset + SIG_FIXED_LEN > rdata_end {
            return Err(Error::Parse);
        }

        let mut hasher = Sha256::new();
        hasher.update(&self.message[sig_rdata_offset..sig_rdata_offset + SIG_FIXED_LEN]);
        hasher.update(&wire::canonical_name(signer_name)?);

        let mut header = metadata.header.clone();
        header.set_additional_count(header.additional_count() - 1);
        hasher.update(&wire::header_bytes(&header)?);
        hasher.update(&self.message[HEADER_LEN..sig_offset]);

        let digest = hasher.finish();
        let signature = &self.message[rdata_end - ECDSA_P256_SIGNATURE_SIZE..rdata_end];
        let key = host.key().ok_or(Error::Failed)?;

        crypto::verify_ecdsa_p256(&key.key, &digest, signature)
    }
}
