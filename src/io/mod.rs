//! Byte-level access to a loaded binary image.
//!
//! Analyzers only depend on the [`AddressableFile`] contract: fixed-width
//! little-endian reads at image-relative addresses, NUL-terminated string
//! reads, and section-bounds lookup by name. [`MemoryFile`] implements the
//! contract over an in-memory buffer; [`ImageFile`] implements it over a
//! parsed Mach-O image. Hosts embedding the engine inside a disassembler
//! provide their own implementation backed by the host's data view.

pub mod image;

pub use image::ImageFile;

use std::collections::HashMap;

use crate::core::Address;
use crate::error::{Error, Result};

/// Random-access byte reading over a loaded binary image.
///
/// Implementations are stateful (they carry a seek position) and are not
/// safe for concurrent use; each analysis run owns its file exclusively.
///
/// The positioned `*_at` forms wrap any failure in a chained error naming
/// the call and the address, so a failed decode can be narrated all the way
/// down to the read that caused it.
pub trait AddressableFile {
    /// Move the read cursor to an address. Validity is checked on read.
    fn seek(&mut self, address: Address) -> Result<()>;

    fn read_byte(&mut self) -> Result<u8>;
    fn read_short(&mut self) -> Result<u16>;
    fn read_int(&mut self) -> Result<u32>;
    fn read_long(&mut self) -> Result<u64>;

    /// The image's preferred load address.
    fn image_base(&self) -> Address;

    /// Pointer width in bytes, 4 or 8.
    fn pointer_size(&self) -> u64;

    /// Start address of a named section, or 0 if the section is absent.
    fn section_start(&self, name: &str) -> Address;

    /// End address of a named section, or 0 if the section is absent.
    fn section_end(&self, name: &str) -> Address;

    /// Read one pointer-width value.
    fn read_pointer(&mut self) -> Result<u64> {
        if self.pointer_size() == 4 {
            Ok(u64::from(self.read_int()?))
        } else {
            self.read_long()
        }
    }

    fn read_byte_at(&mut self, address: Address) -> Result<u8> {
        self.seek(address)
            .and_then(|_| self.read_byte())
            .map_err(|err| Error::read("read_byte_at", address, err))
    }

    fn read_short_at(&mut self, address: Address) -> Result<u16> {
        self.seek(address)
            .and_then(|_| self.read_short())
            .map_err(|err| Error::read("read_short_at", address, err))
    }

    fn read_int_at(&mut self, address: Address) -> Result<u32> {
        self.seek(address)
            .and_then(|_| self.read_int())
            .map_err(|err| Error::read("read_int_at", address, err))
    }

    fn read_long_at(&mut self, address: Address) -> Result<u64> {
        self.seek(address)
            .and_then(|_| self.read_long())
            .map_err(|err| Error::read("read_long_at", address, err))
    }

    fn read_pointer_at(&mut self, address: Address) -> Result<u64> {
        self.seek(address)
            .and_then(|_| self.read_pointer())
            .map_err(|err| Error::read("read_pointer_at", address, err))
    }

    /// Read bytes until a NUL or `max_length` is reached; `0` means no
    /// limit. Invalid UTF-8 is replaced rather than rejected.
    fn read_string(&mut self, max_length: usize) -> Result<String> {
        let mut bytes = Vec::new();
        loop {
            if max_length != 0 && bytes.len() >= max_length {
                break;
            }
            let byte = self.read_byte()?;
            if byte == 0 {
                break;
            }
            bytes.push(byte);
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn read_string_at(&mut self, address: Address, max_length: usize) -> Result<String> {
        self.seek(address)
            .and_then(|_| self.read_string(max_length))
            .map_err(|err| Error::read("read_string_at", address, err))
    }
}

/// An [`AddressableFile`] over an in-memory byte buffer.
///
/// The buffer is addressed starting at `base`; named sections are plain
/// address ranges registered by the caller. This is the embedding path for
/// hosts that hand the engine raw section bytes, and the standard test
/// double.
#[derive(Debug, Clone)]
pub struct MemoryFile {
    data: Vec<u8>,
    base: Address,
    pointer_size: u64,
    cursor: Address,
    sections: HashMap<String, (Address, Address)>,
}

impl MemoryFile {
    pub fn new(data: Vec<u8>, base: Address, pointer_size: u64) -> Self {
        Self {
            data,
            base,
            pointer_size,
            cursor: base,
            sections: HashMap::new(),
        }
    }

    /// Register a named section covering `[start, end)`.
    pub fn add_section(&mut self, name: impl Into<String>, start: Address, end: Address) {
        self.sections.insert(name.into(), (start, end));
    }

    /// Translate an address to a buffer offset, bounds-checking `len` bytes.
    fn offset_of(&self, address: Address, len: u64) -> Result<usize> {
        let oob = Error::OutOfBounds { addr: address, size: len };
        let offset = address.checked_sub(self.base).ok_or(oob)?;
        match offset.checked_add(len) {
            Some(end) if end <= self.data.len() as u64 => Ok(offset as usize),
            _ => Err(Error::OutOfBounds { addr: address, size: len }),
        }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let offset = self.offset_of(self.cursor, N as u64)?;
        let bytes: [u8; N] = self.data[offset..offset + N]
            .try_into()
            .map_err(|_| Error::OutOfBounds { addr: self.cursor, size: N as u64 })?;
        self.cursor += N as u64;
        Ok(bytes)
    }
}

impl AddressableFile for MemoryFile {
    fn seek(&mut self, address: Address) -> Result<()> {
        self.cursor = address;
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    fn read_short(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    fn read_int(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    fn read_long(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take()?))
    }

    fn image_base(&self) -> Address {
        self.base
    }

    fn pointer_size(&self) -> u64 {
        self.pointer_size
    }

    fn section_start(&self, name: &str) -> Address {
        self.sections.get(name).map_or(0, |range| range.0)
    }

    fn section_end(&self, name: &str) -> Address {
        self.sections.get(name).map_or(0, |range| range.1)
    }

    fn read_string(&mut self, max_length: usize) -> Result<String> {
        let offset = self.offset_of(self.cursor, 1)?;
        let mut haystack = &self.data[offset..];
        if max_length != 0 && max_length < haystack.len() {
            haystack = &haystack[..max_length];
        }
        let end = memchr::memchr(0, haystack).unwrap_or(haystack.len());
        // Step past the terminator when one was found.
        let consumed = if end < haystack.len() { end + 1 } else { end };
        self.cursor += consumed as u64;
        Ok(String::from_utf8_lossy(&haystack[..end]).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Address = 0x1_0000_0000;

    fn file_with(bytes: &[u8]) -> MemoryFile {
        MemoryFile::new(bytes.to_vec(), BASE, 8)
    }

    #[test]
    fn fixed_width_reads_are_little_endian() {
        let mut file = file_with(&[0x78, 0x56, 0x34, 0x12, 0xEF, 0xCD, 0xAB, 0x89]);
        assert_eq!(file.read_short_at(BASE).unwrap(), 0x5678);
        assert_eq!(file.read_int_at(BASE).unwrap(), 0x1234_5678);
        assert_eq!(file.read_long_at(BASE).unwrap(), 0x89AB_CDEF_1234_5678);
    }

    #[test]
    fn sequential_reads_advance_the_cursor() {
        let mut file = file_with(&[1, 0, 2, 0, 3, 0, 0, 0]);
        file.seek(BASE).unwrap();
        assert_eq!(file.read_short().unwrap(), 1);
        assert_eq!(file.read_short().unwrap(), 2);
        assert_eq!(file.read_int().unwrap(), 3);
    }

    #[test]
    fn out_of_bounds_read_is_chained_with_call_and_offset() {
        let mut file = file_with(&[0u8; 4]);
        let err = file.read_long_at(BASE + 2).unwrap_err();
        assert_eq!(err.to_string(), format!("read_long_at({:#x}) failed", BASE + 2));
        let chain: Vec<String> = err.chain().map(|e| e.to_string()).collect();
        assert_eq!(chain.len(), 2);
        assert!(chain[1].contains("out of bounds"));
    }

    #[test]
    fn read_before_base_fails() {
        let mut file = file_with(&[0u8; 16]);
        assert!(file.read_byte_at(BASE - 1).is_err());
    }

    #[test]
    fn read_string_stops_at_nul() {
        let mut file = file_with(b"init\0with");
        assert_eq!(file.read_string_at(BASE, 0).unwrap(), "init");
        // Cursor sits past the terminator.
        assert_eq!(file.read_string(0).unwrap(), "with");
    }

    #[test]
    fn read_string_honors_max_length() {
        let mut file = file_with(b"selector\0");
        assert_eq!(file.read_string_at(BASE, 3).unwrap(), "sel");
    }

    #[test]
    fn read_string_at_invalid_address_fails() {
        let mut file = file_with(b"ok\0");
        assert!(file.read_string_at(BASE + 0x100, 0).is_err());
    }

    #[test]
    fn absent_section_reports_zero_bounds() {
        let mut file = file_with(&[0u8; 8]);
        assert_eq!(file.section_start("__objc_classlist"), 0);
        assert_eq!(file.section_end("__objc_classlist"), 0);
        file.add_section("__objc_classlist", BASE, BASE + 8);
        assert_eq!(file.section_start("__objc_classlist"), BASE);
        assert_eq!(file.section_end("__objc_classlist"), BASE + 8);
    }

    #[test]
    fn read_pointer_respects_pointer_size() {
        let bytes = [0x44, 0x33, 0x22, 0x11, 0x00, 0x00, 0x00, 0x00];
        let mut wide = MemoryFile::new(bytes.to_vec(), BASE, 8);
        assert_eq!(wide.read_pointer_at(BASE).unwrap(), 0x1122_3344);

        let mut narrow = MemoryFile::new(bytes.to_vec(), BASE, 4);
        narrow.seek(BASE).unwrap();
        assert_eq!(narrow.read_pointer().unwrap(), 0x1122_3344);
        // Only four bytes consumed.
        assert_eq!(narrow.read_int().unwrap(), 0);
    }
}
