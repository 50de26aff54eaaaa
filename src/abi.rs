//! Pointer-decoding rules for the Objective-C runtime ABI.
//!
//! Two encodings have to be undone before metadata pointers can be
//! dereferenced. Tagged pointers keep an image-relative offset in their low
//! 32 bits and set the top bit as a discriminant. Class data pointers may
//! carry Swift-interop flags in their low two bits, which must be masked
//! off or the class_ro structure is read from a misaligned address.

use crate::core::Address;

/// Low bits of a class's data pointer that may be repurposed as
/// Swift/Objective-C interop flags.
pub const FAST_POINTER_DATA_MASK: u64 = 0b11;

/// Discriminant bit marking a pointer as tagged.
const TAG_BIT: u64 = 1 << 63;

/// Portion of a tagged pointer holding the image-relative offset.
const OFFSET_MASK: u64 = 0xFFFF_FFFF;

/// Decode a (possibly) tagged pointer.
///
/// Untagged pointers are returned unchanged, so decoding is idempotent.
pub fn decode_pointer(pointer: u64, image_base: Address) -> Address {
    if pointer & TAG_BIT != 0 {
        image_base.wrapping_add(pointer & OFFSET_MASK)
    } else {
        pointer
    }
}

/// Encode an address as a tagged pointer relative to `image_base`.
///
/// Inverse of [`decode_pointer`] for addresses whose offset from the image
/// base fits in 32 bits.
pub fn encode_pointer_tagged(address: Address, image_base: Address) -> u64 {
    TAG_BIT | (address.wrapping_sub(image_base) & OFFSET_MASK)
}

/// Mask the fast-pointer flag bits off a class data pointer.
pub fn strip_fast_pointer_flags(address: Address) -> Address {
    address & !FAST_POINTER_DATA_MASK
}
