//! Analyzer for selector references.

use std::rc::Rc;

use super::scan_section;
use crate::abi;
use crate::core::{AnalysisInfo, Address, SelectorNameInfo, SelectorRefInfo, UnresolvedInfo};
use crate::error::Result;
use crate::io::AddressableFile;

const SECTION: &str = "__objc_selrefs";
const STRIDE: u64 = 0x8;

fn analyze_selector_name(
    file: &mut dyn AddressableFile,
    address: Address,
) -> Result<SelectorNameInfo> {
    Ok(SelectorNameInfo::new(address, file.read_string_at(address, 0)?))
}

pub fn run(info: &mut AnalysisInfo, file: &mut dyn AddressableFile) -> Result<()> {
    scan_section(file, "Selector", SECTION, STRIDE, |file, address| {
        let raw = file.read_long_at(address)?;
        let name_address = abi::decode_pointer(raw, file.image_base());
        let name = analyze_selector_name(file, name_address)?;

        let selector_ref = Rc::new(SelectorRefInfo::new(
            address,
            UnresolvedInfo::new(raw, name),
        ));
        info.selector_refs.push(Rc::clone(&selector_ref));

        // Keyed twice: downstream lookups may hold either the raw slot
        // content (as seen in a register) or the slot's address.
        info.selector_refs_by_key
            .insert(selector_ref.referenced.unresolved_address, Rc::clone(&selector_ref));
        info.selector_refs_by_key
            .insert(selector_ref.address, selector_ref);
        Ok(())
    })
}
