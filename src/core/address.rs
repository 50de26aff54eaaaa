//! Address-carrying record scaffolding.
//!
//! The generic shapes here compose into every entity record: a located
//! value ([`RefInfo`]), a value that must remember its raw encoding
//! ([`UnresolvedInfo`]), and a list member that must remember its list
//! ([`ListEntryInfo`]). An address of zero always means "absent" and is
//! never dereferenced.

use serde::{Deserialize, Serialize};

/// An unsigned 64-bit image-relative address.
pub type Address = u64;

/// A description of an address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInfo {
    pub address: Address,
}

impl AddressInfo {
    pub fn new(address: Address) -> Self {
        Self { address }
    }
}

impl From<Address> for AddressInfo {
    fn from(address: Address) -> Self {
        Self { address }
    }
}

/// A located value: an address plus the decoded payload found through it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefInfo<T> {
    pub address: Address,
    pub referenced: T,
}

impl<T> RefInfo<T> {
    pub fn new(address: Address, referenced: T) -> Self {
        Self { address, referenced }
    }
}

/// A description of an address reference.
pub type AddressRefInfo = RefInfo<AddressInfo>;

/// A resolved value that preserves the raw (possibly tagged) encoding it
/// was resolved from.
///
/// Some consumers must match on the raw bit pattern as it appears in a
/// register, so decoding cannot discard it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedInfo<T> {
    pub unresolved_address: Address,
    pub resolved: T,
}

impl<T> UnresolvedInfo<T> {
    pub fn new(unresolved_address: Address, resolved: T) -> Self {
        Self {
            unresolved_address,
            resolved,
        }
    }
}

/// A list entry plus the address of the list it belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntryInfo<T> {
    pub list: AddressInfo,
    pub entry: T,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ref_info_holds_address_and_payload() {
        let info = RefInfo::new(0x1000, "init".to_string());
        assert_eq!(info.address, 0x1000);
        assert_eq!(info.referenced, "init");
    }

    #[test]
    fn unresolved_info_keeps_raw_encoding() {
        let raw = 0x8000_0000_0000_1234u64;
        let info = UnresolvedInfo::new(raw, AddressInfo::new(0x1_0000_1234));
        assert_eq!(info.unresolved_address, raw);
        assert_eq!(info.resolved.address, 0x1_0000_1234);
    }

    #[test]
    fn defaults_are_absent() {
        let info = RefInfo::<String>::default();
        assert_eq!(info.address, 0);
        assert!(info.referenced.is_empty());
    }
}
