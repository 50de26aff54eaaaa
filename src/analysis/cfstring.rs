//! Analyzer for constant CFString instances.

use super::scan_section;
use crate::abi;
use crate::core::{AddressInfo, AnalysisInfo, Address, CFStringInfo};
use crate::error::Result;
use crate::io::AddressableFile;

const SECTION: &str = "__cfstring";

/// CFString objects are 0x20 bytes: isa, flags, data pointer, length.
const STRIDE: u64 = 0x20;

fn analyze_cf_string(file: &mut dyn AddressableFile, address: Address) -> Result<CFStringInfo> {
    let data = abi::decode_pointer(file.read_long_at(address + 0x10)?, file.image_base());
    let size = file.read_long_at(address + 0x18)?;
    Ok(CFStringInfo {
        address,
        data: AddressInfo::new(data),
        size,
    })
}

pub fn run(info: &mut AnalysisInfo, file: &mut dyn AddressableFile) -> Result<()> {
    scan_section(file, "CFString", SECTION, STRIDE, |file, address| {
        let cf_string = analyze_cf_string(file, address)?;
        info.cf_strings.push(cf_string);
        Ok(())
    })
}
