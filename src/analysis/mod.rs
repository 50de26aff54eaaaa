//! Entity analyzers and the analysis provider.
//!
//! Every analyzer shares one shape: resolve the bounds of its target
//! section, iterate it at a fixed stride, and decode each entry inside an
//! isolated failure boundary. [`scan_section`] is that shape expressed
//! once; the per-entity modules supply only the decode logic and a stride.
//!
//! Failure handling is two-tiered. An entry that fails to decode is logged
//! and skipped; the scan continues. A failure in the scaffolding itself
//! (or anything the provider cannot attribute to a single entry) aborts the
//! analyzer and is surfaced to the caller chained with the analyzer's
//! identity. A partially populated graph is still usable: results from
//! analyzers that completed remain valid.

pub mod category;
pub mod cfstring;
pub mod class;
pub mod class_ref;
pub mod lists;
pub mod protocol;
pub mod selector;
pub mod super_ref;

use tracing::{debug, info, warn};

use crate::core::{AnalysisInfo, Address};
use crate::error::{log_chain, Result};
use crate::io::AddressableFile;

/// Iterate a named section at a fixed stride, decoding each entry with
/// per-entry failure isolation.
///
/// Absent sections (bounds of zero) mean "nothing to analyze here" and
/// return success immediately.
pub(crate) fn scan_section<F>(
    file: &mut dyn AddressableFile,
    analyzer: &'static str,
    section: &str,
    stride: u64,
    mut decode: F,
) -> Result<()>
where
    F: FnMut(&mut dyn AddressableFile, Address) -> Result<()>,
{
    let start = file.section_start(section);
    let end = file.section_end(section);
    if start == 0 || end == 0 {
        debug!(analyzer, section, "section absent; nothing to analyze");
        return Ok(());
    }

    let mut address = start;
    while address < end {
        if let Err(err) = decode(file, address) {
            warn!(
                analyzer,
                address = format_args!("{address:#x}"),
                "analysis failed; skipping: {err}"
            );
            log_chain(&err);
        }
        address += stride;
    }
    Ok(())
}

/// Run every analyzer over `file` and return the populated graph.
///
/// On an analyzer-level failure the partially populated graph is dropped;
/// callers that want to keep it should use [`analyze_into`] with their own
/// [`AnalysisInfo`].
pub fn analyze(file: &mut dyn AddressableFile) -> Result<AnalysisInfo> {
    let mut info = AnalysisInfo::new();
    analyze_into(&mut info, file)?;
    Ok(info)
}

/// Run every analyzer over `file`, populating `info`.
///
/// Analyzers run in a fixed order, but correctness does not depend on it:
/// classes and protocols can be reached from several triggers and rely on
/// the graph's deduplication tables instead of ordering. An error aborts
/// the run, chained with the identity of the analyzer that failed;
/// everything already written to `info` remains valid.
pub fn analyze_into(info: &mut AnalysisInfo, file: &mut dyn AddressableFile) -> Result<()> {
    cfstring::run(info, file).map_err(|err| err.in_analyzer("CFString"))?;
    selector::run(info, file).map_err(|err| err.in_analyzer("Selector"))?;
    class_ref::run(info, file).map_err(|err| err.in_analyzer("ClassRef"))?;
    super_ref::run(info, file).map_err(|err| err.in_analyzer("SuperClassRef"))?;
    class::run(info, file).map_err(|err| err.in_analyzer("Class"))?;
    category::run(info, file).map_err(|err| err.in_analyzer("Category"))?;
    protocol::run(info, file).map_err(|err| err.in_analyzer("Protocol"))?;

    info!(
        cf_strings = info.cf_strings.len(),
        selector_refs = info.selector_refs.len(),
        classes = info.classes.len(),
        categories = info.categories.len(),
        protocols = info.protocols_by_key.len(),
        "structure analysis complete"
    );
    Ok(())
}
