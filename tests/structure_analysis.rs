//! End-to-end structure recovery over synthetic images.

mod common;

use common::{ImageBuilder, BASE};
use objlift::abi::encode_pointer_tagged;
use objlift::{analyze, Address};

/// Lay out a class object, its class_ro data, one method and one property,
/// and a classlist slot pointing at the class.
///
/// `data_flag_bits` is ORed into the class_ro pointer to simulate the
/// Swift-interop flag bits some compilers set there.
fn build_class_image(data_flag_bits: u64) -> (objlift::MemoryFile, Address, Address, Address) {
    let mut b = ImageBuilder::new();

    let class_name = b.str("ViewController");
    let sel = b.str("viewDidLoad");
    let ty = b.str("v16@0:8");
    let prop_name = b.str("title");
    let prop_attrs = b.str("T@\"NSString\",C,N");
    b.zeros(8 - (b.pos() % 8) as usize); // align

    let imp = BASE + 0x4000;

    let method_list = b.pos();
    b.u16(0x18);
    b.u16(0); // absolute pointers
    b.u32(1);
    b.u64(encode_pointer_tagged(sel, BASE));
    b.u64(ty);
    b.u64(imp);

    let property_list = b.pos();
    b.u16(0x10);
    b.u16(0);
    b.u32(1);
    b.u64(prop_name);
    b.u64(prop_attrs);

    // class_ro: name at +0x18, method list at +0x20, protocols at +0x28,
    // properties at +0x40.
    let class_ro = b.pos();
    b.zeros(0x48);
    b.patch_u64(class_ro + 0x18, encode_pointer_tagged(class_name, BASE));
    b.patch_u64(class_ro + 0x20, method_list);
    b.patch_u64(class_ro + 0x40, property_list);

    // Class object with the data pointer at +0x20.
    let class = b.pos();
    b.zeros(0x28);
    b.patch_u64(class + 0x20, class_ro | data_flag_bits);

    let classlist = b.pos();
    b.u64(encode_pointer_tagged(class, BASE));
    b.section("__objc_classlist", classlist, classlist + 8);

    (b.build(), class, class_ro, sel)
}

#[test]
fn recovers_a_class_with_methods_and_properties() {
    let (mut file, class, class_ro, sel) = build_class_image(0);
    let info = analyze(&mut file).unwrap();

    assert_eq!(info.classes.len(), 1);
    let ci = &info.classes[0].referenced;
    assert_eq!(ci.address, class);
    assert_eq!(ci.data.address, class_ro);
    assert_eq!(ci.name.referenced, "ViewController");

    assert_eq!(ci.method_list.referenced.methods.len(), 1);
    let mi = &ci.method_list.referenced.methods[0];
    assert_eq!(mi.selector_name.referenced, "viewDidLoad");
    assert_eq!(mi.type_encoding.referenced, "v16@0:8");
    assert_eq!(mi.imp.address, BASE + 0x4000);
    assert_eq!(info.method_impls[&sel].address, BASE + 0x4000);

    assert_eq!(ci.property_list.referenced.properties.len(), 1);
    let pi = &ci.property_list.referenced.properties[0];
    assert_eq!(pi.name.referenced, "title");
    assert!(info.properties_by_key.contains_key(&pi.name.address));
}

#[test]
fn masks_fast_pointer_flag_bits_on_the_class_data_pointer() {
    // The class_ro pointer carries the Swift-interop bits; analysis must
    // dereference the masked, aligned address.
    let (mut file, _, class_ro, _) = build_class_image(0b11);
    let info = analyze(&mut file).unwrap();

    assert_eq!(info.classes.len(), 1);
    let ci = &info.classes[0].referenced;
    assert_eq!(ci.data.address, class_ro);
    assert_eq!(ci.name.referenced, "ViewController");
}

#[test]
fn tagged_selref_slot_is_reachable_under_both_keys() {
    let mut b = ImageBuilder::new();
    let name = b.str("initWithPath:");
    b.zeros(8 - (b.pos() % 8) as usize);

    let slot = b.pos();
    let raw = encode_pointer_tagged(name, BASE);
    b.u64(raw);
    b.section("__objc_selrefs", slot, slot + 8);

    let mut file = b.build();
    let info = analyze(&mut file).unwrap();

    let by_raw = info.selector_refs_by_key.get(&raw).expect("raw key");
    let by_slot = info.selector_refs_by_key.get(&slot).expect("slot key");
    assert!(std::rc::Rc::ptr_eq(by_raw, by_slot));
    assert_eq!(by_raw.referenced.unresolved_address, raw);
    assert_eq!(by_raw.referenced.resolved.address, name);
    assert_eq!(by_raw.referenced.resolved.referenced, "initWithPath:");
}

#[test]
fn malformed_entry_is_skipped_without_discarding_the_rest() {
    let mut b = ImageBuilder::new();
    let first = b.str("first");
    let third = b.str("third");
    b.zeros(8 - (b.pos() % 8) as usize);

    let slots = b.pos();
    b.u64(first);
    b.u64(BASE + 0x100_0000); // points out of bounds
    b.u64(third);
    b.section("__objc_selrefs", slots, slots + 24);

    let mut file = b.build();
    let (info, warnings) = common::capture_warnings(|| analyze(&mut file));
    let info = info.unwrap();

    assert_eq!(info.selector_refs.len(), 2);
    let names: Vec<&str> = info
        .selector_refs
        .iter()
        .map(|s| s.referenced.resolved.referenced.as_str())
        .collect();
    assert_eq!(names, vec!["first", "third"]);

    // Exactly one warning, naming the analyzer and the failing slot.
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("Selector"));
    assert!(warnings[0].contains(&format!("{:#x}", slots + 8)));
}

#[test]
fn recovers_cfstrings_class_refs_and_super_refs_together() {
    let mut b = ImageBuilder::new();
    let text = b.str("hello");
    b.zeros(8 - (b.pos() % 8) as usize);

    let cfstrings = b.pos();
    b.u64(0); // isa
    b.u64(0x7C8); // flags
    b.u64(encode_pointer_tagged(text, BASE));
    b.u64(5);
    b.section("__cfstring", cfstrings, cfstrings + 0x20);

    let class_refs = b.pos();
    b.u64(0xDEAD_0000);
    b.section("__objc_classrefs", class_refs, class_refs + 8);

    let super_refs = b.pos();
    b.u64(0xBEEF_0000);
    b.section("__objc_superrefs", super_refs, super_refs + 8);

    let mut file = b.build();
    let info = analyze(&mut file).unwrap();

    assert_eq!(info.cf_strings.len(), 1);
    assert_eq!(info.cf_strings[0].data.address, text);
    assert_eq!(info.cf_strings[0].size, 5);
    assert_eq!(info.class_refs.len(), 1);
    assert_eq!(info.class_refs[0].referenced.address, 0xDEAD_0000);
    assert_eq!(info.super_class_refs.len(), 1);
    assert_eq!(info.super_class_refs[0].referenced.address, 0xBEEF_0000);
}

#[test]
fn recovers_a_category_with_instance_methods() {
    let mut b = ImageBuilder::new();
    let cat_name = b.str("Additions");
    let sel = b.str("objl_hash");
    let ty = b.str("Q16@0:8");
    b.zeros(8 - (b.pos() % 8) as usize);

    let method_list = b.pos();
    b.u16(0x18);
    b.u16(0);
    b.u32(1);
    b.u64(sel);
    b.u64(ty);
    b.u64(BASE + 0x5000);

    let category = b.pos();
    b.zeros(0x30);
    b.patch_u64(category, encode_pointer_tagged(cat_name, BASE));
    b.patch_u64(category + 0x8, BASE + 0x9000); // class in another image
    b.patch_u64(category + 0x10, method_list);

    let catlist = b.pos();
    b.u64(category);
    b.section("__objc_catlist", catlist, catlist + 8);

    let mut file = b.build();
    let info = analyze(&mut file).unwrap();

    assert_eq!(info.categories.len(), 1);
    let ci = &info.categories[0].referenced;
    assert_eq!(ci.name.referenced, "Additions");
    assert_eq!(ci.class_pointer.address, BASE + 0x9000);
    assert_eq!(ci.instance_method_list.referenced.methods.len(), 1);
    assert_eq!(
        ci.instance_method_list.referenced.methods[0]
            .selector_name
            .referenced,
        "objl_hash"
    );
    assert!(ci.class_method_list.referenced.methods.is_empty());
}

#[test]
fn relative_method_list_with_indirect_selectors_recovers_selector_text() {
    let mut b = ImageBuilder::new();
    let class_name = b.str("Worker");
    let sel_name = b.str("run");
    let ty = b.str("v16@0:8");
    b.zeros(8 - (b.pos() % 8) as usize);

    let selref = b.pos();
    b.u64(encode_pointer_tagged(sel_name, BASE));

    let method_list = b.pos();
    b.u16(12);
    b.u16(0x8000); // relative offsets, indirect selectors
    b.u32(1);
    let entry = b.pos();
    b.u32(selref.wrapping_sub(entry) as u32);
    b.u32(ty.wrapping_sub(entry + 4) as u32);
    b.u32((BASE + 0x6000).wrapping_sub(entry + 8) as u32);

    let class_ro = b.pos();
    b.zeros(0x48);
    b.patch_u64(class_ro + 0x18, class_name);
    b.patch_u64(class_ro + 0x20, method_list);

    let class = b.pos();
    b.zeros(0x28);
    b.patch_u64(class + 0x20, class_ro);

    let classlist = b.pos();
    b.u64(class);
    b.section("__objc_classlist", classlist, classlist + 8);

    let mut file = b.build();
    let info = analyze(&mut file).unwrap();

    let mi = &info.classes[0].referenced.method_list.referenced.methods[0];
    // The selector field lands on the reference cell, and the recovered
    // text comes from the extra dereference, not from the cell's bytes.
    assert_eq!(mi.selector_name.address, selref);
    assert_eq!(mi.selector_name.referenced, "run");
    assert_eq!(mi.imp.address, BASE + 0x6000);
    assert_eq!(mi.selector_tokens(), vec!["run"]);
}

#[test]
fn dump_includes_recovered_entities() {
    let (mut file, _, _, _) = build_class_image(0);
    let info = analyze(&mut file).unwrap();
    let dump = info.dump();
    let value: serde_json::Value = serde_json::from_str(&dump).unwrap();
    assert_eq!(value["classes"][0]["referenced"]["name"]["referenced"], "ViewController");
}
