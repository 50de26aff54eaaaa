//! Analyzer for Objective-C protocol information.
//!
//! Protocols form a reference graph that is not guaranteed acyclic: a
//! protocol's own protocol list may, directly or transitively, point back
//! at it. Every path into protocol analysis therefore goes through
//! [`analyze_protocol`], which consults the graph's memoization table
//! before touching the file and publishes the shared record before
//! descending into nested lists.

use std::cell::RefCell;
use std::rc::Rc;

use super::{lists, scan_section};
use crate::abi;
use crate::core::{
    AnalysisInfo, Address, MethodListInfo, ProtocolInfo, ProtocolListInfo, RefInfo,
    SharedProtocolInfo,
};
use crate::error::Result;
use crate::io::AddressableFile;

const SECTION: &str = "__objc_protolist";
const STRIDE: u64 = 0x8;

/// Analyze a protocol, decoding it at most once per address.
pub(crate) fn analyze_protocol(
    info: &mut AnalysisInfo,
    file: &mut dyn AddressableFile,
    address: Address,
) -> Result<SharedProtocolInfo> {
    if let Some(existing) = info.protocols_by_key.get(&address) {
        return Ok(Rc::clone(existing));
    }

    let image_base = file.image_base();
    file.seek(address)?;

    let mut pi = ProtocolInfo {
        address,
        ..Default::default()
    };
    pi.isa.address = abi::decode_pointer(file.read_long()?, image_base);
    pi.name.address = abi::decode_pointer(file.read_long()?, image_base);
    pi.protocol_list.address = abi::decode_pointer(file.read_long()?, image_base);
    pi.instance_method_list.address = abi::decode_pointer(file.read_long()?, image_base);
    pi.class_method_list.address = abi::decode_pointer(file.read_long()?, image_base);
    pi.optional_instance_method_list.address = abi::decode_pointer(file.read_long()?, image_base);
    pi.optional_class_method_list.address = abi::decode_pointer(file.read_long()?, image_base);
    pi.property_list.address = abi::decode_pointer(file.read_long()?, image_base);
    pi.size = file.read_int()?;
    pi.flags = file.read_int()?;
    pi.extended_method_type_list.address = abi::decode_pointer(file.read_long()?, image_base);
    pi.demangled_name.address = abi::decode_pointer(file.read_long()?, image_base);
    pi.class_property_list.address = abi::decode_pointer(file.read_long()?, image_base);

    // Publish the shared record before descending into the nested protocol
    // list; a cycle reaching this address again gets the same handle
    // instead of recursing forever.
    let shared = Rc::new(RefCell::new(pi));
    info.protocols_by_key.insert(address, Rc::clone(&shared));

    if let Err(err) = fill_protocol(info, file, &shared) {
        // A half-decoded record must not stay visible through the table.
        info.protocols_by_key.remove(&address);
        return Err(err);
    }

    Ok(shared)
}

/// Decode everything behind a protocol's header pointers.
///
/// The cell is never borrowed across a recursive call: addresses are copied
/// out, the nested structure is decoded, and the result is written back.
fn fill_protocol(
    info: &mut AnalysisInfo,
    file: &mut dyn AddressableFile,
    shared: &SharedProtocolInfo,
) -> Result<()> {
    let image_base = file.image_base();

    let name_address = shared.borrow().name.address;
    let name = file.read_string_at(name_address, 0)?;
    shared.borrow_mut().name.referenced = name;

    let protocol_list_address = shared.borrow().protocol_list.address;
    if protocol_list_address != 0 {
        let pli = analyze_protocol_list(info, file, protocol_list_address)?;
        shared.borrow_mut().protocol_list.referenced = pli;
    }

    let method_lists: [fn(&mut ProtocolInfo) -> &mut RefInfo<MethodListInfo>; 4] = [
        |p| &mut p.instance_method_list,
        |p| &mut p.class_method_list,
        |p| &mut p.optional_instance_method_list,
        |p| &mut p.optional_class_method_list,
    ];
    for pick in method_lists {
        let list_address = pick(&mut shared.borrow_mut()).address;
        if list_address != 0 {
            let mli = lists::analyze_method_list(info, file, list_address)?;
            pick(&mut shared.borrow_mut()).referenced = mli;
        }
    }

    let property_list_address = shared.borrow().property_list.address;
    if property_list_address != 0 {
        let pli = lists::analyze_property_list(info, file, property_list_address)?;
        shared.borrow_mut().property_list.referenced = pli;
    }

    let extended_list_address = shared.borrow().extended_method_type_list.address;
    if extended_list_address != 0 {
        // Extended type strings are assigned to the methods of all four
        // lists in a fixed order, one 8-byte slot each.
        let mut slot = extended_list_address;
        let mut p = shared.borrow_mut();
        let ProtocolInfo {
            instance_method_list,
            class_method_list,
            optional_instance_method_list,
            optional_class_method_list,
            ..
        } = &mut *p;
        for list in [
            instance_method_list,
            class_method_list,
            optional_instance_method_list,
            optional_class_method_list,
        ] {
            for mi in &mut list.referenced.methods {
                mi.extended_type.list.address = slot;
                mi.extended_type.entry.address =
                    abi::decode_pointer(file.read_long_at(slot)?, image_base);
                mi.extended_type.entry.referenced =
                    file.read_string_at(mi.extended_type.entry.address, 0)?;
                slot += 0x8;
            }
        }
    }

    let demangled_name_address = shared.borrow().demangled_name.address;
    if demangled_name_address != 0 {
        let demangled = file.read_string_at(demangled_name_address, 0)?;
        shared.borrow_mut().demangled_name.referenced = demangled;
    }

    let class_property_list_address = shared.borrow().class_property_list.address;
    if class_property_list_address != 0 {
        let pli = lists::analyze_property_list(info, file, class_property_list_address)?;
        shared.borrow_mut().class_property_list.referenced = pli;
    }

    Ok(())
}

/// Analyze a protocol list, routing every member through the memoized
/// entry point.
pub(crate) fn analyze_protocol_list(
    info: &mut AnalysisInfo,
    file: &mut dyn AddressableFile,
    address: Address,
) -> Result<ProtocolListInfo> {
    let mut pli = ProtocolListInfo {
        address,
        protocols: Vec::new(),
    };

    let count = file.read_long_at(pli.address)?;
    for i in 0..count {
        let slot = pli.address + 0x8 + i * 0x8;
        let target = abi::decode_pointer(file.read_long_at(slot)?, file.image_base());
        let pi = analyze_protocol(info, file, target)?;
        // List-discovered protocols carry no section slot of their own.
        info.protocols.push(RefInfo::new(0, Rc::clone(&pi)));
        pli.protocols.push(RefInfo::new(slot, pi));
    }

    Ok(pli)
}

pub fn run(info: &mut AnalysisInfo, file: &mut dyn AddressableFile) -> Result<()> {
    scan_section(file, "Protocol", SECTION, STRIDE, |file, address| {
        let target = abi::decode_pointer(file.read_long_at(address)?, file.image_base());
        let pi = analyze_protocol(info, file, target)?;
        info.protocols.push(RefInfo::new(address, pi));
        Ok(())
    })
}
