//! Shared method-list and property-list decoding.
//!
//! Both list kinds share the header shape (entsize, flags, count) and the
//! relative/absolute field encodings; method lists additionally
//! distinguish direct from indirect selector fields. Classes, categories
//! and protocols all decode their lists through this module.

use crate::abi;
use crate::core::{
    AnalysisInfo, Address, MethodInfo, MethodListInfo, PropertyInfo, PropertyListInfo,
    RefInfo,
};
use crate::error::{Error, Result};
use crate::io::AddressableFile;

/// Apply a signed 32-bit displacement to the address it was read from.
fn relative(field_address: Address, displacement: u32) -> Address {
    field_address.wrapping_add(displacement as i32 as i64 as u64)
}

fn analyze_method(
    info: &mut AnalysisInfo,
    file: &mut dyn AddressableFile,
    address: Address,
    has_relative_offsets: bool,
    has_direct_selectors: bool,
) -> Result<MethodInfo> {
    let image_base = file.image_base();
    let mut mi = MethodInfo {
        address,
        ..Default::default()
    };

    file.seek(mi.address)?;

    if has_relative_offsets {
        // Each displacement is relative to the address of the field that
        // holds it, not to the entry's base.
        mi.selector_name.address = relative(mi.address, file.read_int()?);
        mi.type_encoding.address = relative(mi.address + 0x4, file.read_int()?);
        mi.imp.address = relative(mi.address + 0x8, file.read_int()?);
    } else {
        mi.selector_name.address = abi::decode_pointer(file.read_pointer()?, image_base);
        mi.type_encoding.address = abi::decode_pointer(file.read_pointer()?, image_base);
        mi.imp.address = abi::decode_pointer(file.read_pointer()?, image_base);
    }

    if !has_relative_offsets || has_direct_selectors {
        mi.selector_name.referenced = file.read_string_at(mi.selector_name.address, 0)?;
    } else {
        // Relative lists without direct selectors point at a selector
        // reference slot; one more dereference reaches the name.
        let name_pointer =
            abi::decode_pointer(file.read_long_at(mi.selector_name.address)?, image_base);
        mi.selector_name.referenced = file.read_string_at(name_pointer, 0)?;
    }

    mi.type_encoding.referenced = file.read_string_at(mi.type_encoding.address, 0)?;

    // First discovered implementation wins; colliding selectors are an
    // accepted ambiguity, resolved by consumers at their own risk.
    info.method_impls
        .entry(mi.selector_name.address)
        .or_insert(mi.imp);

    Ok(mi)
}

/// Decode a method list and index every method's implementation.
pub(crate) fn analyze_method_list(
    info: &mut AnalysisInfo,
    file: &mut dyn AddressableFile,
    address: Address,
) -> Result<MethodListInfo> {
    let mut mli = MethodListInfo {
        address,
        entsize: file.read_short_at(address)?,
        flags: file.read_short_at(address + 0x2)?,
        methods: Vec::new(),
    };

    // A zero entsize would pin the iteration to the first entry forever.
    if mli.entsize == 0 {
        return Err(Error::ZeroEntsize { addr: address });
    }

    let count = file.read_int_at(address + 0x4)?;
    let has_relative_offsets = mli.has_relative_offsets();
    let has_direct_selectors = mli.has_direct_selectors();

    for i in 0..u64::from(count) {
        let entry = mli.address + 0x8 + i * u64::from(mli.entsize);
        mli.methods.push(analyze_method(
            info,
            file,
            entry,
            has_relative_offsets,
            has_direct_selectors,
        )?);
    }

    Ok(mli)
}

/// Decode a property list and index every property by name address.
pub(crate) fn analyze_property_list(
    info: &mut AnalysisInfo,
    file: &mut dyn AddressableFile,
    address: Address,
) -> Result<PropertyListInfo> {
    let image_base = file.image_base();
    let mut pli = PropertyListInfo {
        address,
        entsize: file.read_short_at(address)?,
        flags: file.read_short_at(address + 0x2)?,
        properties: Vec::new(),
    };

    if pli.entsize == 0 {
        return Err(Error::ZeroEntsize { addr: address });
    }

    let count = file.read_int_at(address + 0x4)?;
    let has_relative_offsets = pli.has_relative_offsets();

    for i in 0..u64::from(count) {
        let entry = pli.address + 0x8 + i * u64::from(pli.entsize);
        let mut pi = PropertyInfo {
            address: entry,
            ..Default::default()
        };

        file.seek(pi.address)?;

        if has_relative_offsets {
            pi.name.address = relative(pi.address, file.read_int()?);
            pi.attributes.address = relative(pi.address + 0x4, file.read_int()?);
        } else {
            pi.name.address = abi::decode_pointer(file.read_pointer()?, image_base);
            pi.attributes.address = abi::decode_pointer(file.read_pointer()?, image_base);
        }

        pi.name.referenced = file.read_string_at(pi.name.address, 0)?;
        pi.attributes.referenced = file.read_string_at(pi.attributes.address, 0)?;

        info.properties_by_key.insert(
            pi.name.address,
            RefInfo::new(pi.attributes.address, pi.attributes.referenced.clone()),
        );

        pli.properties.push(pi);
    }

    Ok(pli)
}
