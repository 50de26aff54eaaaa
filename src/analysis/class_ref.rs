//! Analyzers for class and super-class reference sections.
//!
//! Reference slots are recorded with their raw 8-byte content, undecoded:
//! consumers resolve them later by matching against the addresses of
//! analyzed classes.

use super::scan_section;
use crate::core::{AddressInfo, AddressRefInfo, AnalysisInfo};
use crate::error::Result;
use crate::io::AddressableFile;

const SECTION: &str = "__objc_classrefs";
pub(crate) const STRIDE: u64 = 0x8;

pub fn run(info: &mut AnalysisInfo, file: &mut dyn AddressableFile) -> Result<()> {
    scan_section(file, "ClassRef", SECTION, STRIDE, |file, address| {
        let raw = file.read_long_at(address)?;
        info.class_refs.push(AddressRefInfo::new(address, AddressInfo::new(raw)));
        Ok(())
    })
}
