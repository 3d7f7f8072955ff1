//! The in-memory registration registry.
//!
//! A [`Registry`] owns committed [`Host`]s. A host owns its [`Service`]s and
//! their [`ServiceDescription`]s; a service refers to its description by
//! instance name (descriptions are shared between a base service and all of
//! its sub-types). A host whose lease reaches zero is *deleted*: its name
//! and service names remain reserved until the key lease elapses.

use std::fmt;
use std::mem;
use std::net::Ipv6Addr;
use std::time::{Duration, Instant};
use trust_dns_proto::rr::Name;

use crate::config::Limits;
use crate::error::Error;
use crate::name;
use crate::wire::KeyRecord;

/// What happened to a service, for the registration log.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ServiceAction {
    AddNew,
    UpdateExisting,
    RemoveRetainName,
    FullyRemove,
    LeaseExpired,
    KeyLeaseExpired,
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceAction::AddNew => "add new",
            ServiceAction::UpdateExisting => "update existing",
            ServiceAction::RemoveRetainName => "remove (retain name)",
            ServiceAction::FullyRemove => "fully remove",
            ServiceAction::LeaseExpired => "LEASE expired for",
            ServiceAction::KeyLeaseExpired => "KEY LEASE expired for",
        };
        f.write_str(s)
    }
}

/// One registered service: a (service name, instance name) pair. Sub-types
/// carry `is_sub_type` and share the base type's description.
#[derive(Debug, Clone)]
pub struct Service {
    pub(crate) service_name: Name,
    pub(crate) instance_name: Name,
    pub(crate) is_sub_type: bool,
    pub(crate) is_deleted: bool,
    pub(crate) is_committed: bool,
    pub(crate) update_time: Instant,
}

impl Service {
    pub fn service_name(&self) -> &Name {
        &self.service_name
    }

    pub fn instance_name(&self) -> &Name {
        &self.instance_name
    }

    pub fn is_sub_type(&self) -> bool {
        self.is_sub_type
    }

    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    pub fn is_committed(&self) -> bool {
        self.is_committed
    }

    /// The sub-type label, e.g. `_printer` for
    /// `_printer._sub._ipps._tcp.default.service.arpa.`.
    pub fn sub_type_label(&self) -> Option<String> {
        name::split_sub_type(&self.service_name).map(|(label, _)| label)
    }

    fn matches(&self, service_name: &Name, instance_name: &Name) -> bool {
        &self.service_name == service_name && &self.instance_name == instance_name
    }

    /// Committed services are logged; candidates being torn down are not.
    pub(crate) fn log(&self, action: ServiceAction) {
        if self.is_committed {
            match self.sub_type_label() {
                Some(label) => tracing::info!(
                    "{action} service '{}' subtype: {label}",
                    self.instance_name
                ),
                None => tracing::info!("{action} service '{}'", self.instance_name),
            }
        }
    }
}

/// Per-instance SRV/TXT state, shared by a base service and its sub-types.
#[derive(Debug, Clone)]
pub struct ServiceDescription {
    pub(crate) instance_name: Name,
    pub(crate) priority: u16,
    pub(crate) weight: u16,
    pub(crate) port: u16,
    pub(crate) txt_data: Vec<u8>,
    pub(crate) lease: u32,
    pub(crate) key_lease: u32,
    pub(crate) update_time: Option<Instant>,
}

impl ServiceDescription {
    fn new(instance_name: Name) -> Self {
        Self {
            instance_name,
            priority: 0,
            weight: 0,
            port: 0,
            txt_data: Vec::new(),
            lease: 0,
            key_lease: 0,
            update_time: None,
        }
    }

    pub fn instance_name(&self) -> &Name {
        &self.instance_name
    }

    pub fn priority(&self) -> u16 {
        self.priority
    }

    pub fn weight(&self) -> u16 {
        self.weight
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn txt_data(&self) -> &[u8] {
        &self.txt_data
    }

    pub(crate) fn clear_resources(&mut self) {
        self.port = 0;
        self.txt_data.clear();
    }

    pub(crate) fn take_resources_from(&mut self, other: &mut ServiceDescription, now: Instant) {
        self.txt_data = mem::take(&mut other.txt_data);
        self.priority = other.priority;
        self.weight = other.weight;
        self.port = other.port;
        self.lease = other.lease;
        self.key_lease = other.key_lease;
        self.update_time = Some(now);
    }
}

/// A registered host: its name, addresses, key, leases, and services.
///
/// During parsing a `Host` is the candidate being assembled from an UPDATE;
/// once committed it lives in the [`Registry`].
#[derive(Debug, Clone)]
pub struct Host {
    pub(crate) full_name: Option<Name>,
    pub(crate) addresses: Vec<Ipv6Addr>,
    pub(crate) key: Option<KeyRecord>,
    pub(crate) lease: u32,
    pub(crate) key_lease: u32,
    pub(crate) update_time: Instant,
    pub(crate) services: Vec<Service>,
    pub(crate) descriptions: Vec<ServiceDescription>,
}

impl Host {
    pub fn new(update_time: Instant) -> Self {
        Self {
            full_name: None,
            addresses: Vec::new(),
            key: None,
            lease: 0,
            key_lease: 0,
            update_time,
            services: Vec::new(),
            descriptions: Vec::new(),
        }
    }

    pub fn full_name(&self) -> Option<&Name> {
        self.full_name.as_ref()
    }

    pub fn addresses(&self) -> &[Ipv6Addr] {
        &self.addresses
    }

    pub fn key(&self) -> Option<&KeyRecord> {
        self.key.as_ref()
    }

    pub fn lease(&self) -> u32 {
        self.lease
    }

    pub fn key_lease(&self) -> u32 {
        self.key_lease
    }

    /// A deleted host keeps its name reserved but publishes nothing.
    pub fn is_deleted(&self) -> bool {
        self.lease == 0
    }

    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.services.iter()
    }

    pub fn descriptions(&self) -> impl Iterator<Item = &ServiceDescription> {
        self.descriptions.iter()
    }

    pub(crate) fn descriptions_mut(&mut self) -> impl Iterator<Item = &mut ServiceDescription> {
        self.descriptions.iter_mut()
    }

    /// Marks every service committed, logging each as newly added.
    pub(crate) fn commit_services(&mut self) {
        for service in &mut self.services {
            service.is_committed = true;
            service.log(ServiceAction::AddNew);
        }
    }

    pub fn expire_time(&self) -> Instant {
        self.update_time + Duration::from_secs(u64::from(self.lease))
    }

    pub fn key_expire_time(&self) -> Instant {
        self.update_time + Duration::from_secs(u64::from(self.key_lease))
    }

    pub fn matches(&self, full_name: &Name) -> bool {
        self.full_name.as_ref() == Some(full_name)
    }

    /// The host name is immutable once set: a second, different name is a
    /// semantic failure.
    pub(crate) fn set_full_name(&mut self, full_name: &Name) -> Result<(), Error> {
        match &self.full_name {
            None => {
                self.full_name = Some(full_name.clone());
                Ok(())
            }
            Some(existing) if existing == full_name => Ok(()),
            Some(_) => Err(Error::Failed),
        }
    }

    /// Appends an address. Multicast, unspecified and loopback addresses and
    /// duplicates are dropped without failing the update; a full address
    /// list is `NoBufs`.
    pub(crate) fn add_address(&mut self, address: Ipv6Addr, limits: &Limits) -> Result<(), Error> {
        if address.is_multicast() || address.is_unspecified() || address.is_loopback() {
            return Err(Error::Drop);
        }
        if self.addresses.contains(&address) {
            return Err(Error::Drop);
        }
        if self.addresses.len() >= limits.max_addresses_per_host {
            tracing::warn!("too many addresses for host {}", DisplayName(&self.full_name));
            return Err(Error::NoBufs);
        }
        self.addresses.push(address);
        Ok(())
    }

    pub(crate) fn set_key(&mut self, key: KeyRecord) {
        self.key = Some(key);
    }

    pub(crate) fn set_leases(&mut self, lease: u32, key_lease: u32) {
        self.lease = lease;
        self.key_lease = key_lease;
    }

    pub(crate) fn mark_service_deleted(&mut self, index: usize) {
        self.services[index].is_deleted = true;
    }

    pub(crate) fn clear_resources(&mut self) {
        self.addresses.clear();
    }

    pub fn find_service(&self, service_name: &Name, instance_name: &Name) -> Option<&Service> {
        self.services
            .iter()
            .find(|service| service.matches(service_name, instance_name))
    }

    fn position_service(&self, service_name: &Name, instance_name: &Name) -> Option<usize> {
        self.services
            .iter()
            .position(|service| service.matches(service_name, instance_name))
    }

    pub fn find_description(&self, instance_name: &Name) -> Option<&ServiceDescription> {
        self.descriptions
            .iter()
            .find(|description| &description.instance_name == instance_name)
    }

    pub(crate) fn find_description_mut(
        &mut self,
        instance_name: &Name,
    ) -> Option<&mut ServiceDescription> {
        self.descriptions
            .iter_mut()
            .find(|description| &description.instance_name == instance_name)
    }

    /// Adds a service, allocating a description for its instance name unless
    /// one is already shared. Returns the service's index.
    pub(crate) fn add_service(
        &mut self,
        service_name: Name,
        instance_name: Name,
        is_sub_type: bool,
        update_time: Instant,
        limits: &Limits,
    ) -> Result<usize, Error> {
        if self.services.len() >= limits.max_services_per_host {
            return Err(Error::NoBufs);
        }

        if self.find_description(&instance_name).is_none() {
            self.descriptions.push(ServiceDescription::new(instance_name.clone()));
        }

        self.services.push(Service {
            service_name,
            instance_name,
            is_sub_type,
            is_deleted: false,
            is_committed: false,
            update_time,
        });
        Ok(self.services.len() - 1)
    }

    /// Marks the service at `index` deleted. Without `retain_name` the
    /// service is dropped entirely and its description freed when no other
    /// service shares it.
    pub(crate) fn remove_service(&mut self, index: usize, retain_name: bool) {
        let service = &mut self.services[index];
        service.is_deleted = true;
        service.log(if retain_name {
            ServiceAction::RemoveRetainName
        } else {
            ServiceAction::FullyRemove
        });

        if !retain_name {
            self.services.remove(index);
            self.prune_descriptions();
        }
    }

    fn prune_descriptions(&mut self) {
        let services = &self.services;
        self.descriptions.retain(|description| {
            services
                .iter()
                .any(|service| service.instance_name == description.instance_name)
        });
    }

    /// When the service's lease elapses.
    pub(crate) fn service_expire_time(&self, service: &Service) -> Instant {
        let lease = self
            .find_description(&service.instance_name)
            .map_or(0, |description| description.lease);
        service.update_time + Duration::from_secs(u64::from(lease))
    }

    /// When the service's reserved name elapses.
    pub(crate) fn service_key_expire_time(&self, service: &Service) -> Instant {
        let key_lease = self
            .find_description(&service.instance_name)
            .map_or(0, |description| description.key_lease);
        service.update_time + Duration::from_secs(u64::from(key_lease))
    }

    /// Merges a committed update into this host: the candidate's addresses,
    /// key and leases replace ours, its services are folded in one by one.
    /// Services the candidate does not mention are left untouched.
    pub(crate) fn merge_from(
        &mut self,
        mut candidate: Host,
        now: Instant,
        limits: &Limits,
    ) -> Result<(), Error> {
        tracing::info!("update host {}", DisplayName(&self.full_name));

        self.addresses = mem::take(&mut candidate.addresses);
        self.key = candidate.key.take();
        self.lease = candidate.lease;
        self.key_lease = candidate.key_lease;
        self.update_time = now;

        for service in mem::take(&mut candidate.services) {
            let existing = self.position_service(&service.service_name, &service.instance_name);

            if service.is_deleted {
                if let Some(index) = existing {
                    self.remove_service(index, true);
                }
                continue;
            }

            let index = match existing {
                Some(index) => index,
                None => self.add_service(
                    service.service_name.clone(),
                    service.instance_name.clone(),
                    service.is_sub_type,
                    service.update_time,
                    limits,
                )?,
            };

            {
                let merged = &mut self.services[index];
                merged.is_deleted = false;
                merged.is_committed = true;
                merged.update_time = now;
            }

            // The description is shared across the base type and all of its
            // sub-types; resources move exactly once, with the base type.
            if !service.is_sub_type {
                if let Some(from) = candidate.find_description_mut(&service.instance_name) {
                    if let Some(into) = self.find_description_mut(&service.instance_name) {
                        into.take_resources_from(from, now);
                    }
                }
            }

            self.services[index].log(match existing {
                Some(_) => ServiceAction::UpdateExisting,
                None => ServiceAction::AddNew,
            });
        }

        Ok(())
    }
}

pub(crate) struct DisplayName<'a>(pub(crate) &'a Option<Name>);

impl fmt::Display for DisplayName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(name) => write!(f, "'{name}'"),
            None => f.write_str("(unnamed)"),
        }
    }
}

/// The set of committed hosts.
#[derive(Debug, Default)]
pub struct Registry {
    hosts: Vec<Host>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.iter()
    }

    pub(crate) fn hosts_mut(&mut self) -> &mut Vec<Host> {
        &mut self.hosts
    }

    pub fn find_host(&self, full_name: &Name) -> Option<&Host> {
        self.hosts.iter().find(|host| host.matches(full_name))
    }

    pub(crate) fn find_host_mut(&mut self, full_name: &Name) -> Option<&mut Host> {
        self.hosts.iter_mut().find(|host| host.matches(full_name))
    }

    /// Adds a host. The caller must have established there is no existing
    /// host with the same name.
    pub(crate) fn add_host(&mut self, host: Host, limits: &Limits) -> Result<(), Error> {
        debug_assert!(host
            .full_name()
            .map_or(false, |name| self.find_host(name).is_none()));
        if self.hosts.len() >= limits.max_hosts {
            return Err(Error::NoBufs);
        }
        self.hosts.push(host);
        Ok(())
    }

    /// Detaches the named host from the registry.
    pub(crate) fn take_host(&mut self, full_name: &Name) -> Option<Host> {
        let index = self.hosts.iter().position(|host| host.matches(full_name))?;
        Some(self.hosts.remove(index))
    }

    /// Whether committing `candidate` would collide with a name registered
    /// under a different key: its host name, or any of its service instance
    /// names anywhere in the registry.
    pub fn has_name_conflicts_with(&self, candidate: &Host) -> bool {
        let candidate_name = match candidate.full_name() {
            Some(name) => name,
            None => return false,
        };

        if let Some(existing) = self.find_host(candidate_name) {
            if existing.key() != candidate.key() {
                return true;
            }
        }

        for description in candidate.descriptions() {
            for host in &self.hosts {
                if host.find_description(&description.instance_name).is_some()
                    && host.key() != candidate.key()
                {
                    return true;
                }
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn nm(s: &str) -> Name {
        Name::from_str(s).unwrap()
    }

    fn key(fill: u8) -> KeyRecord {
        KeyRecord {
            flags: 0x0200,
            protocol: 3,
            algorithm: 13,
            key: [fill; 64],
        }
    }

    fn limits() -> Limits {
        Limits::default()
    }

    fn host_with_service(now: Instant, host_name: &str, instance: &str, fill: u8) -> Host {
        let mut host = Host::new(now);
        host.set_full_name(&nm(host_name)).unwrap();
        host.set_key(key(fill));
        host.lease = 3600;
        host.key_lease = 7200;
        host.add_address(Ipv6Addr::from_str("fd00::1").unwrap(), &limits())
            .unwrap();
        let index = host
            .add_service(
                nm("_ipps._tcp.default.service.arpa."),
                nm(instance),
                false,
                now,
                &limits(),
            )
            .unwrap();
        host.services[index].is_committed = true;
        let description = host.find_description_mut(&nm(instance)).unwrap();
        description.port = 9100;
        description.txt_data = b"\x0crp=ipp/print".to_vec();
        description.lease = 3600;
        description.key_lease = 7200;
        description.update_time = Some(now);
        host
    }

    #[test]
    fn host_name_is_immutable() {
        let mut host = Host::new(Instant::now());
        host.set_full_name(&nm("printer.default.service.arpa.")).unwrap();
        assert!(host.set_full_name(&nm("PRINTER.default.service.arpa.")).is_ok());
        assert!(matches!(
            host.set_full_name(&nm("other.default.service.arpa.")),
            Err(Error::Failed)
        ));
    }

    #[test]
    fn unusable_addresses_are_dropped_not_fatal() {
        let mut host = Host::new(Instant::now());
        for bad in ["::", "::1", "ff02::fb"] {
            assert!(matches!(
                host.add_address(Ipv6Addr::from_str(bad).unwrap(), &limits()),
                Err(Error::Drop)
            ));
        }
        host.add_address(Ipv6Addr::from_str("fd00::1").unwrap(), &limits())
            .unwrap();
        assert!(matches!(
            host.add_address(Ipv6Addr::from_str("fd00::1").unwrap(), &limits()),
            Err(Error::Drop)
        ));
        assert_eq!(host.addresses().len(), 1);
    }

    #[test]
    fn address_slots_are_bounded() {
        let limits = Limits {
            max_addresses_per_host: 1,
            ..Limits::default()
        };
        let mut host = Host::new(Instant::now());
        host.add_address(Ipv6Addr::from_str("fd00::1").unwrap(), &limits)
            .unwrap();
        assert!(matches!(
            host.add_address(Ipv6Addr::from_str("fd00::2").unwrap(), &limits),
            Err(Error::NoBufs)
        ));
    }

    #[test]
    fn sub_type_shares_description() {
        let now = Instant::now();
        let mut host = Host::new(now);
        host.add_service(
            nm("_ipps._tcp.default.service.arpa."),
            nm("my-printer._ipps._tcp.default.service.arpa."),
            false,
            now,
            &limits(),
        )
        .unwrap();
        host.add_service(
            nm("_printer._sub._ipps._tcp.default.service.arpa."),
            nm("my-printer._ipps._tcp.default.service.arpa."),
            true,
            now,
            &limits(),
        )
        .unwrap();
        assert_eq!(host.services.len(), 2);
        assert_eq!(host.descriptions.len(), 1);
    }

    #[test]
    fn full_removal_prunes_unshared_descriptions() {
        let now = Instant::now();
        let mut host = host_with_service(
            now,
            "printer.default.service.arpa.",
            "my-printer._ipps._tcp.default.service.arpa.",
            1,
        );
        host.remove_service(0, false);
        assert!(host.services.is_empty());
        assert!(host.descriptions.is_empty());
    }

    #[test]
    fn retained_removal_keeps_name_and_description() {
        let now = Instant::now();
        let mut host = host_with_service(
            now,
            "printer.default.service.arpa.",
            "my-printer._ipps._tcp.default.service.arpa.",
            1,
        );
        host.remove_service(0, true);
        assert_eq!(host.services.len(), 1);
        assert!(host.services[0].is_deleted);
        assert_eq!(host.descriptions.len(), 1);
    }

    #[test]
    fn merge_replaces_resources_and_updates_services() {
        let now = Instant::now();
        let later = now + Duration::from_secs(10);
        let mut existing = host_with_service(
            now,
            "printer.default.service.arpa.",
            "my-printer._ipps._tcp.default.service.arpa.",
            1,
        );

        let mut candidate = Host::new(later);
        candidate
            .set_full_name(&nm("printer.default.service.arpa."))
            .unwrap();
        candidate.set_key(key(1));
        candidate.lease = 1800;
        candidate.key_lease = 3600;
        candidate
            .add_address(Ipv6Addr::from_str("fd00::2").unwrap(), &limits())
            .unwrap();
        candidate
            .add_service(
                nm("_ipps._tcp.default.service.arpa."),
                nm("my-printer._ipps._tcp.default.service.arpa."),
                false,
                later,
                &limits(),
            )
            .unwrap();
        {
            let description = candidate
                .find_description_mut(&nm("my-printer._ipps._tcp.default.service.arpa."))
                .unwrap();
            description.port = 631;
            description.txt_data = b"\x04rp=x".to_vec();
            description.lease = 1800;
            description.key_lease = 3600;
            description.update_time = Some(later);
        }

        existing.merge_from(candidate, later, &limits()).unwrap();

        assert_eq!(existing.addresses(), &[Ipv6Addr::from_str("fd00::2").unwrap()]);
        assert_eq!(existing.lease(), 1800);
        assert_eq!(existing.services.len(), 1);
        assert!(existing.services[0].is_committed);
        assert!(!existing.services[0].is_deleted);
        let description = existing
            .find_description(&nm("my-printer._ipps._tcp.default.service.arpa."))
            .unwrap();
        assert_eq!(description.port(), 631);
        assert_eq!(description.txt_data(), b"\x04rp=x");
    }

    #[test]
    fn merge_removes_services_the_candidate_deletes() {
        let now = Instant::now();
        let later = now + Duration::from_secs(10);
        let mut existing = host_with_service(
            now,
            "printer.default.service.arpa.",
            "my-printer._ipps._tcp.default.service.arpa.",
            1,
        );

        let mut candidate = Host::new(later);
        candidate
            .set_full_name(&nm("printer.default.service.arpa."))
            .unwrap();
        candidate.set_key(key(1));
        candidate.lease = 1800;
        candidate.key_lease = 3600;
        let index = candidate
            .add_service(
                nm("_ipps._tcp.default.service.arpa."),
                nm("my-printer._ipps._tcp.default.service.arpa."),
                false,
                later,
                &limits(),
            )
            .unwrap();
        candidate.services[index].is_deleted = true;

        existing.merge_from(candidate, later, &limits()).unwrap();

        assert_eq!(existing.services.len(), 1);
        assert!(existing.services[0].is_deleted);
    }

    #[test]
    fn merge_leaves_unmentioned_services_untouched() {
        let now = Instant::now();
        let later = now + Duration::from_secs(10);
        let mut existing = host_with_service(
            now,
            "printer.default.service.arpa.",
            "my-printer._ipps._tcp.default.service.arpa.",
            1,
        );

        let mut candidate = Host::new(later);
        candidate
            .set_full_name(&nm("printer.default.service.arpa."))
            .unwrap();
        candidate.set_key(key(1));
        candidate.lease = 1800;
        candidate.key_lease = 3600;

        existing.merge_from(candidate, later, &limits()).unwrap();

        assert_eq!(existing.services.len(), 1);
        assert!(!existing.services[0].is_deleted);
        let description = existing
            .find_description(&nm("my-printer._ipps._tcp.default.service.arpa."))
            .unwrap();
        assert_eq!(description.port(), 9100);
    }

    #[test]
    fn conflicts_require_a_different_key() {
        let now = Instant::now();
        let mut registry = Registry::new();
        registry
            .add_host(
                host_with_service(
                    now,
                    "printer.default.service.arpa.",
                    "my-printer._ipps._tcp.default.service.arpa.",
                    1,
                ),
                &limits(),
            )
            .unwrap();

        // Same name, same key: a refresh, not a conflict.
        let same_key = host_with_service(
            now,
            "printer.default.service.arpa.",
            "my-printer._ipps._tcp.default.service.arpa.",
            1,
        );
        assert!(!registry.has_name_conflicts_with(&same_key));

        // Same host name, different key.
        let other_key = host_with_service(
            now,
            "printer.default.service.arpa.",
            "other._ipps._tcp.default.service.arpa.",
            2,
        );
        assert!(registry.has_name_conflicts_with(&other_key));

        // Different host name but a claimed instance name, different key.
        let instance_theft = host_with_service(
            now,
            "intruder.default.service.arpa.",
            "my-printer._ipps._tcp.default.service.arpa.",
            2,
        );
        assert!(registry.has_name_conflicts_with(&instance_theft));
    }

    #[test]
    fn registry_host_slots_are_bounded() {
        let limits = Limits {
            max_hosts: 1,
            ..Limits::default()
        };
        let now = Instant::now();
        let mut registry = Registry::new();
        registry
            .add_host(
                host_with_service(
                    now,
                    "a.default.service.arpa.",
                    "a._ipps._tcp.default.service.arpa.",
                    1,
                ),
                &limits,
            )
            .unwrap();
        assert!(matches!(
            registry.add_host(
                host_with_service(
                    now,
                    "b.default.service.arpa.",
                    "b._ipps._tcp.default.service.arpa.",
                    2,
                ),
                &limits,
            ),
            Err(Error::NoBufs)
        ));
    }
}
