//! Entity records for every kind of recovered Objective-C metadata.

use std::cell::RefCell;
use std::rc::Rc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize, Serializer};

use super::address::{Address, AddressInfo, ListEntryInfo, RefInfo};
use super::UnresolvedInfo;

/// A description of a CFString instance.
///
/// The isa and flag words are decoded but not retained; `data` and `size`
/// locate the character buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CFStringInfo {
    pub address: Address,
    pub data: AddressInfo,
    pub size: u64,
}

/// A description of a selector name.
pub type SelectorNameInfo = RefInfo<String>;

/// A description of a selector reference.
///
/// `referenced.resolved.address` is the selector name's real (untagged)
/// address; `referenced.unresolved_address` is the raw slot content before
/// ABI decoding.
pub type SelectorRefInfo = RefInfo<UnresolvedInfo<SelectorNameInfo>>;

/// A selector reference shared between the flat list and the lookup table.
pub type SharedSelectorRefInfo = Rc<SelectorRefInfo>;

bitflags! {
    /// Flag bits of a method or property list header.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ListFlags: u16 {
        /// Entries encode fields as signed 32-bit self-relative offsets.
        const RELATIVE_OFFSETS = 0x8000;
        /// Selector fields point directly at the name, not at a selector
        /// reference slot.
        const DIRECT_SELECTORS = 0x4000;
    }
}

/// A description of an Objective-C method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodInfo {
    pub address: Address,
    pub selector_name: RefInfo<String>,
    pub type_encoding: RefInfo<String>,
    pub imp: AddressInfo,
    pub extended_type: ListEntryInfo<RefInfo<String>>,
}

impl MethodInfo {
    /// Get the selector as a series of tokens, split at ':' characters.
    pub fn selector_tokens(&self) -> Vec<String> {
        let name = &self.selector_name.referenced;
        if name.is_empty() {
            return Vec::new();
        }
        let mut tokens: Vec<String> = name.split(':').map(str::to_owned).collect();
        if name.ends_with(':') {
            tokens.pop();
        }
        tokens
    }

    /// Get the method's type as a series of C-style tokens.
    ///
    /// The type-encoding tokenizer is an external dependency, supplied by
    /// the caller as a pure function over the encoded type string.
    pub fn decoded_type_tokens<F>(&self, tokenize: F) -> Vec<String>
    where
        F: FnOnce(&str) -> Vec<String>,
    {
        tokenize(&self.type_encoding.referenced)
    }
}

/// A description of an Objective-C method list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodListInfo {
    pub address: Address,
    pub entsize: u16,
    pub flags: u16,
    pub methods: Vec<MethodInfo>,
}

impl MethodListInfo {
    /// Tells whether the method list uses relative offsets or not.
    pub fn has_relative_offsets(&self) -> bool {
        ListFlags::from_bits_truncate(self.flags).contains(ListFlags::RELATIVE_OFFSETS)
    }

    /// Tells whether the method list uses direct selectors or not.
    pub fn has_direct_selectors(&self) -> bool {
        ListFlags::from_bits_truncate(self.flags).contains(ListFlags::DIRECT_SELECTORS)
    }
}

/// A description of an Objective-C property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyInfo {
    pub address: Address,
    pub name: RefInfo<String>,
    pub attributes: RefInfo<String>,
}

/// A description of an Objective-C property list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyListInfo {
    pub address: Address,
    pub entsize: u16,
    pub flags: u16,
    pub properties: Vec<PropertyInfo>,
}

impl PropertyListInfo {
    /// Tells whether the property list uses relative offsets or not.
    pub fn has_relative_offsets(&self) -> bool {
        ListFlags::from_bits_truncate(self.flags).contains(ListFlags::RELATIVE_OFFSETS)
    }
}

/// A description of an Objective-C class.
///
/// `data.address` is the class_ro pointer after tagged-pointer decoding and
/// fast-pointer-flag masking.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClassInfo {
    pub address: Address,
    pub name: RefInfo<String>,
    pub data: AddressInfo,
    pub method_list: RefInfo<MethodListInfo>,
    pub protocol_list: RefInfo<ProtocolListInfo>,
    pub property_list: RefInfo<PropertyListInfo>,
}

/// A description of an Objective-C class reference.
pub type ClassRefInfo = RefInfo<ClassInfo>;

/// A description of an Objective-C category.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryInfo {
    pub address: Address,
    pub name: RefInfo<String>,
    /// The extended class, decoded but not resolved against known classes.
    pub class_pointer: AddressInfo,
    pub instance_method_list: RefInfo<MethodListInfo>,
    pub class_method_list: RefInfo<MethodListInfo>,
    pub protocol_list: RefInfo<ProtocolListInfo>,
    pub property_list: RefInfo<PropertyListInfo>,
}

/// A description of an Objective-C category reference.
pub type CategoryRefInfo = RefInfo<CategoryInfo>;

/// A description of an Objective-C protocol.
///
/// Protocols reference other protocols and can be reached from several
/// entry points, so they are decoded at most once and shared by handle; see
/// [`SharedProtocolInfo`].
#[derive(Debug, Default, Serialize)]
pub struct ProtocolInfo {
    pub address: Address,
    pub isa: AddressInfo,
    pub name: RefInfo<String>,
    pub protocol_list: RefInfo<ProtocolListInfo>,
    pub instance_method_list: RefInfo<MethodListInfo>,
    pub class_method_list: RefInfo<MethodListInfo>,
    pub optional_instance_method_list: RefInfo<MethodListInfo>,
    pub optional_class_method_list: RefInfo<MethodListInfo>,
    pub property_list: RefInfo<PropertyListInfo>,
    pub size: u32,
    pub flags: u32,
    pub extended_method_type_list: AddressInfo,
    pub demangled_name: RefInfo<String>,
    pub class_property_list: RefInfo<PropertyListInfo>,
}

/// A shared, interior-mutable handle to a protocol record.
///
/// Analysis is single-threaded, so `Rc<RefCell<_>>` rather than a locked
/// handle; the cell is only borrowed mutably while the record is being
/// filled in.
pub type SharedProtocolInfo = Rc<RefCell<ProtocolInfo>>;

/// A description of an Objective-C protocol list.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProtocolListInfo {
    pub address: Address,
    /// Entries pair the list slot's address with the shared record for the
    /// protocol it points to.
    #[serde(serialize_with = "serialize_protocol_refs")]
    pub protocols: Vec<RefInfo<SharedProtocolInfo>>,
}

/// Serialize shared protocol handles as `(slot, protocol address)` pairs.
///
/// The full records live in the analysis graph's protocol table; repeating
/// them here would recurse forever on cyclic protocol graphs.
pub(crate) fn serialize_protocol_refs<S>(
    refs: &[RefInfo<SharedProtocolInfo>],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    use serde::ser::SerializeSeq;

    let mut seq = serializer.serialize_seq(Some(refs.len()))?;
    for r in refs {
        seq.serialize_element(&(r.address, r.referenced.borrow().address))?;
    }
    seq.end()
}
