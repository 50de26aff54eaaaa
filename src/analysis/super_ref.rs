//! Analyzer for super-class reference slots.

use super::class_ref::STRIDE;
use super::scan_section;
use crate::core::{AddressInfo, AddressRefInfo, AnalysisInfo};
use crate::error::Result;
use crate::io::AddressableFile;

const SECTION: &str = "__objc_superrefs";

pub fn run(info: &mut AnalysisInfo, file: &mut dyn AddressableFile) -> Result<()> {
    scan_section(file, "SuperClassRef", SECTION, STRIDE, |file, address| {
        let raw = file.read_long_at(address)?;
        info.super_class_refs
            .push(AddressRefInfo::new(address, AddressInfo::new(raw)));
        Ok(())
    })
}
