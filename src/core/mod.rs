//! Core data model for recovered Objective-C metadata.
//!
//! Every record follows the same pattern: it carries the address it was
//! decoded from alongside the data it represents, so consumers can both use
//! the recovered values and annotate the locations they came from.

pub mod address;
pub mod info;
pub mod records;

pub use address::{Address, AddressInfo, AddressRefInfo, ListEntryInfo, RefInfo, UnresolvedInfo};
pub use info::AnalysisInfo;
pub use records::{
    CFStringInfo, CategoryInfo, CategoryRefInfo, ClassInfo, ClassRefInfo, ListFlags,
    MethodInfo, MethodListInfo, PropertyInfo, PropertyListInfo, ProtocolInfo,
    ProtocolListInfo, SelectorNameInfo, SelectorRefInfo, SharedProtocolInfo,
    SharedSelectorRefInfo,
};
