//! DNS name helpers for SRP.
//!
//! Sub-type service names use the form `<sub-label>._sub.<service>.<domain>.`
//! (RFC 6763 §7.1); [`split_sub_type`] recovers the base service name and the
//! sub-type label from one. Equality on [`Name`] is case-insensitive, which
//! is what SRP name matching requires throughout.

use lazy_static::lazy_static;
use std::str::FromStr;
use trust_dns_proto::rr::Name;

/// The label that marks a service name as a sub-type.
pub const SUB_TYPE_LABEL: &[u8] = b"_sub";

/// The default SRP registration domain.
pub const DEFAULT_DOMAIN: &str = "default.service.arpa.";

lazy_static! {
    static ref DEFAULT_DOMAIN_NAME: Name = Name::from_str(DEFAULT_DOMAIN).unwrap();
}

/// The default registration domain as a parsed [`Name`].
pub fn default_domain() -> &'static Name {
    &DEFAULT_DOMAIN_NAME
}

/// Whether `name` is equal to or a subdomain of `domain`.
pub fn is_sub_domain_of(name: &Name, domain: &Name) -> bool {
    domain.zone_of(name)
}

/// Splits a sub-type service name into `(sub_label, base_service_name)`.
///
/// Returns `None` when `name` carries no `_sub` label. The base service name
/// is everything after the `_sub` label; the sub label is everything before
/// it (a single label for well-formed names).
pub fn split_sub_type(name: &Name) -> Option<(String, Name)> {
    let position = name.iter().position(|label| label == SUB_TYPE_LABEL)?;

    let base = name.trim_to(name.num_labels() as usize - position - 1);
    let sub_label = name
        .iter()
        .take(position)
        .map(|label| String::from_utf8_lossy(label).into_owned())
        .collect::<Vec<_>>()
        .join(".");

    Some((sub_label, base))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        Name::from_str(s).unwrap()
    }

    #[test]
    fn sub_type_name_splits_into_label_and_base() {
        let (label, base) = split_sub_type(&name("_printer._sub._ipps._tcp.default.service.arpa."))
            .expect("should be a sub-type name");
        assert_eq!(label, "_printer");
        assert_eq!(base, name("_ipps._tcp.default.service.arpa."));
    }

    #[test]
    fn base_type_name_has_no_sub_label() {
        assert!(split_sub_type(&name("_ipps._tcp.default.service.arpa.")).is_none());
    }

    #[test]
    fn sub_domain_checks() {
        let domain = default_domain();
        assert!(is_sub_domain_of(&name("_ipps._tcp.default.service.arpa."), domain));
        assert!(is_sub_domain_of(&name("default.service.arpa."), domain));
        assert!(!is_sub_domain_of(&name("_ipps._tcp.other.arpa."), domain));
    }

    #[test]
    fn name_equality_ignores_case() {
        assert_eq!(name("Printer.Default.Service.Arpa."), name("printer.default.service.arpa."));
    }
}
