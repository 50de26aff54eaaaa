//! The shared analysis-info graph.

use std::collections::HashMap;

use serde::Serialize;

use super::address::{Address, AddressInfo, AddressRefInfo, RefInfo};
use super::records::{
    serialize_protocol_refs, CFStringInfo, CategoryRefInfo, ClassRefInfo,
    SharedProtocolInfo, SharedSelectorRefInfo,
};

/// Analysis info storage.
///
/// `AnalysisInfo` is the common structure all analyzers populate during a
/// run. It is created empty by the provider, grows monotonically while the
/// analyzers execute (entries are only ever added), and is handed to
/// consumers once the run completes. The lookup tables double as
/// deduplication caches: an entry present in `protocols_by_key` is never
/// decoded a second time.
#[derive(Debug, Default, Serialize)]
pub struct AnalysisInfo {
    pub cf_strings: Vec<CFStringInfo>,

    pub class_refs: Vec<AddressRefInfo>,
    pub super_class_refs: Vec<AddressRefInfo>,

    pub classes: Vec<ClassRefInfo>,
    pub categories: Vec<CategoryRefInfo>,

    /// Selector name address to first known implementation.
    ///
    /// "First known" is a heuristic: when several classes implement the
    /// same selector, the first one discovered wins and later candidates
    /// are ignored. Consumers must not treat the mapping as certain.
    pub method_impls: HashMap<Address, AddressInfo>,

    /// Property name address to attribute string.
    pub properties_by_key: HashMap<Address, RefInfo<String>>,

    pub selector_refs: Vec<SharedSelectorRefInfo>,
    /// Selector references keyed twice: by the raw (possibly tagged) slot
    /// content and by the slot's own address. Downstream lookups may hold
    /// either form.
    #[serde(skip)]
    pub selector_refs_by_key: HashMap<Address, SharedSelectorRefInfo>,

    /// Protocols in discovery order; entries found through nested protocol
    /// lists carry a slot address of zero.
    #[serde(serialize_with = "serialize_protocol_refs")]
    pub protocols: Vec<RefInfo<SharedProtocolInfo>>,
    /// Protocol records memoized by address. Consulted before any decode so
    /// that each distinct protocol is analyzed exactly once and cyclic
    /// protocol graphs terminate.
    pub protocols_by_key: HashMap<Address, SharedProtocolInfo>,
}

impl AnalysisInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the populated graph as pretty-printed JSON.
    pub fn dump(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|err| format!("<dump failed: {err}>"))
    }
}
