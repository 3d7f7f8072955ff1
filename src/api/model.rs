use serde::Serialize;
use std::net::Ipv6Addr;

use crate::registry::Host;

/// A host as reported by `GET /hosts`.
#[derive(Serialize, Debug, Clone)]
pub struct HostSnapshot {
    pub full_name: String,
    pub addresses: Vec<Ipv6Addr>,
    pub deleted: bool,
    pub lease: u32,
    pub key_lease: u32,
    pub services: Vec<ServiceSnapshot>,
}

#[derive(Serialize, Debug, Clone)]
pub struct ServiceSnapshot {
    pub service_name: String,
    pub instance_name: String,
    pub is_sub_type: bool,
    pub deleted: bool,
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
}

impl From<&Host> for HostSnapshot {
    fn from(host: &Host) -> Self {
        let services = host
            .services()
            .map(|service| {
                let description = host.find_description(service.instance_name());
                ServiceSnapshot {
                    service_name: service.service_name().to_string(),
                    instance_name: service.instance_name().to_string(),
                    is_sub_type: service.is_sub_type(),
                    deleted: service.is_deleted(),
                    priority: description.map_or(0, |d| d.priority()),
                    weight: description.map_or(0, |d| d.weight()),
                    port: description.map_or(0, |d| d.port()),
                }
            })
            .collect();

        Self {
            full_name: host
                .full_name()
                .map(|name| name.to_string())
                .unwrap_or_default(),
            addresses: host.addresses().to_vec(),
            deleted: host.is_deleted(),
            lease: host.lease(),
            key_lease: host.key_lease(),
            services,
        }
    }
}
