//! Mach-O image frontend backed by the `object` crate.
//!
//! [`ImageFile`] lets analysis run over a plain binary on disk, outside any
//! host disassembler: sections are loaded by name with their virtual
//! address ranges, and reads are translated from virtual addresses to
//! section bytes.

use std::path::Path;

use object::{Object, ObjectSection};

use super::AddressableFile;
use crate::core::Address;
use crate::error::{Error, Result};

#[derive(Debug)]
struct LoadedSection {
    name: String,
    start: Address,
    data: Vec<u8>,
}

/// An [`AddressableFile`] over a parsed Mach-O image.
#[derive(Debug)]
pub struct ImageFile {
    sections: Vec<LoadedSection>,
    base: Address,
    pointer_size: u64,
    cursor: Address,
}

impl ImageFile {
    /// Parse an image from raw file bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let file = object::File::parse(data).map_err(|err| Error::Image(err.to_string()))?;
        let pointer_size = if file.is_64() { 8 } else { 4 };
        let base = file.relative_address_base();

        let mut sections = Vec::new();
        for section in file.sections() {
            let Ok(name) = section.name() else { continue };
            // Zero-fill sections (e.g. __bss) have no file bytes to decode.
            let Ok(data) = section.data() else { continue };
            sections.push(LoadedSection {
                name: name.to_string(),
                start: section.address(),
                data: data.to_vec(),
            });
        }

        Ok(Self {
            sections,
            base,
            pointer_size,
            cursor: base,
        })
    }

    /// Map a file from disk and parse it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        // The mapping is read-only and dropped before this returns.
        let map = unsafe { memmap2::Mmap::map(&file)? };
        Self::parse(&map)
    }

    /// Find the section containing `len` bytes at `address`.
    fn locate(&self, address: Address, len: u64) -> Result<(&LoadedSection, usize)> {
        for section in &self.sections {
            let Some(offset) = address.checked_sub(section.start) else {
                continue;
            };
            if offset.saturating_add(len) <= section.data.len() as u64 {
                return Ok((section, offset as usize));
            }
        }
        Err(Error::Unmapped { addr: address })
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let (section, offset) = self.locate(self.cursor, N as u64)?;
        let bytes: [u8; N] = section.data[offset..offset + N]
            .try_into()
            .map_err(|_| Error::Unmapped { addr: self.cursor })?;
        self.cursor += N as u64;
        Ok(bytes)
    }
}

impl AddressableFile for ImageFile {
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
        self.sections
            .iter()
            .find(|s| s.name == name)
            .map_or(0, |s| s.start)
    }

    fn section_end(&self, name: &str) -> Address {
        self.sections
            .iter()
            .find(|s| s.name == name)
            .map_or(0, |s| s.start + s.data.len() as u64)
    }

    fn read_string(&mut self, max_length: usize) -> Result<String> {
        let (section, offset) = self.locate(self.cursor, 1)?;
        let mut haystack = &section.data[offset..];
        if max_length != 0 && max_length < haystack.len() {
            haystack = &haystack[..max_length];
        }
        let end = memchr::memchr(0, haystack).unwrap_or(haystack.len());
        let consumed = if end < haystack.len() { end + 1 } else { end };
        let result = String::from_utf8_lossy(&haystack[..end]).into_owned();
        self.cursor += consumed as u64;
        Ok(result)
    }
}
