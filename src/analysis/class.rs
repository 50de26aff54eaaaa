//! Analyzer for Objective-C class information.

use super::{lists, protocol, scan_section};
use crate::abi;
use crate::core::{AnalysisInfo, Address, ClassInfo, ClassRefInfo};
use crate::error::Result;
use crate::io::AddressableFile;

const SECTION: &str = "__objc_classlist";
const STRIDE: u64 = 0x8;

fn analyze_class(
    info: &mut AnalysisInfo,
    file: &mut dyn AddressableFile,
    address: Address,
) -> Result<ClassInfo> {
    let image_base = file.image_base();
    let mut ci = ClassInfo {
        address,
        ..Default::default()
    };

    ci.data.address = abi::decode_pointer(file.read_long_at(ci.address + 0x20)?, image_base);

    // Swift-interop classes repurpose the low two bits of the data pointer
    // as flags; the class_ro structure lives at the masked address.
    ci.data.address = abi::strip_fast_pointer_flags(ci.data.address);

    ci.name.address = abi::decode_pointer(file.read_long_at(ci.data.address + 0x18)?, image_base);
    ci.name.referenced = file.read_string_at(ci.name.address, 0)?;

    ci.method_list.address =
        abi::decode_pointer(file.read_long_at(ci.data.address + 0x20)?, image_base);
    if ci.method_list.address != 0 {
        ci.method_list.referenced = lists::analyze_method_list(info, file, ci.method_list.address)?;
    }

    ci.protocol_list.address =
        abi::decode_pointer(file.read_long_at(ci.data.address + 0x28)?, image_base);
    if ci.protocol_list.address != 0 {
        ci.protocol_list.referenced =
            protocol::analyze_protocol_list(info, file, ci.protocol_list.address)?;
    }

    ci.property_list.address =
        abi::decode_pointer(file.read_long_at(ci.data.address + 0x40)?, image_base);
    if ci.property_list.address != 0 {
        ci.property_list.referenced =
            lists::analyze_property_list(info, file, ci.property_list.address)?;
    }

    Ok(ci)
}

pub fn run(info: &mut AnalysisInfo, file: &mut dyn AddressableFile) -> Result<()> {
    scan_section(file, "Class", SECTION, STRIDE, |file, address| {
        let class_address = abi::decode_pointer(file.read_long_at(address)?, file.image_base());
        let ci = analyze_class(info, file, class_address)?;
        info.classes.push(ClassRefInfo::new(address, ci));
        Ok(())
    })
}
