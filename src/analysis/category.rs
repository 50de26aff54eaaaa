//! Analyzer for Objective-C category information.

use super::{lists, protocol, scan_section};
use crate::abi;
use crate::core::{AnalysisInfo, Address, CategoryInfo, CategoryRefInfo};
use crate::error::Result;
use crate::io::AddressableFile;

const SECTION: &str = "__objc_catlist";
const STRIDE: u64 = 0x8;

fn analyze_category(
    info: &mut AnalysisInfo,
    file: &mut dyn AddressableFile,
    address: Address,
) -> Result<CategoryInfo> {
    let image_base = file.image_base();
    let mut ci = CategoryInfo {
        address,
        ..Default::default()
    };

    ci.name.address = abi::decode_pointer(file.read_long_at(ci.address)?, image_base);
    ci.name.referenced = file.read_string_at(ci.name.address, 0)?;

    // The extended class may live in another image; the pointer is kept
    // for consumers to resolve against the recovered class addresses.
    ci.class_pointer.address =
        abi::decode_pointer(file.read_long_at(ci.address + 0x8)?, image_base);

    ci.instance_method_list.address =
        abi::decode_pointer(file.read_long_at(ci.address + 0x10)?, image_base);
    if ci.instance_method_list.address != 0 {
        ci.instance_method_list.referenced =
            lists::analyze_method_list(info, file, ci.instance_method_list.address)?;
    }

    ci.class_method_list.address =
        abi::decode_pointer(file.read_long_at(ci.address + 0x18)?, image_base);
    if ci.class_method_list.address != 0 {
        ci.class_method_list.referenced =
            lists::analyze_method_list(info, file, ci.class_method_list.address)?;
    }

    ci.protocol_list.address =
        abi::decode_pointer(file.read_long_at(ci.address + 0x20)?, image_base);
    if ci.protocol_list.address != 0 {
        ci.protocol_list.referenced =
            protocol::analyze_protocol_list(info, file, ci.protocol_list.address)?;
    }

    ci.property_list.address =
        abi::decode_pointer(file.read_long_at(ci.address + 0x28)?, image_base);
    if ci.property_list.address != 0 {
        ci.property_list.referenced =
            lists::analyze_property_list(info, file, ci.property_list.address)?;
    }

    Ok(ci)
}

pub fn run(info: &mut AnalysisInfo, file: &mut dyn AddressableFile) -> Result<()> {
    scan_section(file, "Category", SECTION, STRIDE, |file, address| {
        let category_address = abi::decode_pointer(file.read_long_at(address)?, file.image_base());
        let ci = analyze_category(info, file, category_address)?;
        info.categories.push(CategoryRefInfo::new(address, ci));
        Ok(())
    })
}
