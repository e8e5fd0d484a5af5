//! Minimal 64-bit ELF views: header validation and the program
//! header table. Only what loading a static executable needs.

use thiserror::Error;

// ELF identification
const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];
const ELFCLASS64: u8 = 2;
const ELFDATA2LSB: u8 = 1;

// Program header types
pub const PT_LOAD: u32 = 1;

pub const EHDR_SIZE: usize = 64;
pub const PHDR_SIZE: usize = 56;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ElfError {
    #[error("file too small")]
    TooSmall,
    #[error("invalid ELF magic")]
    InvalidMagic,
    #[error("not ELF64")]
    UnsupportedClass,
    #[error("not little-endian")]
    UnsupportedEndian,
    #[error("invalid program header table")]
    InvalidPhdr,
}

#[derive(Debug, Clone, Copy)]
pub struct Elf64Ehdr {
    pub e_entry: u64,
    pub e_phoff: u64,
    pub e_phentsize: u16,
    pub e_phnum: u16,
}

#[derive(Debug, Clone, Copy)]
pub struct Elf64Phdr {
    pub p_type: u32,
    pub p_flags: u32,
    pub p_offset: u64,
    pub p_vaddr: u64,
    pub p_filesz: u64,
    pub p_memsz: u64,
    pub p_align: u64,
}

fn read_u16(data: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([data[off], data[off + 1]])
}

fn read_u32(data: &[u8], off: usize) -> u32 {
    u32::from_le_bytes(data[off..off + 4].try_into().unwrap())
}

fn read_u64(data: &[u8], off: usize) -> u64 {
    u64::from_le_bytes(data[off..off + 8].try_into().unwrap())
}

impl Elf64Ehdr {
    /// Parse and validate the file header. The architecture field is
    /// deliberately not checked.
    pub fn parse(data: &[u8]) -> Result<Self, ElfError> {
        if data.len() < EHDR_SIZE {
            return Err(ElfError::TooSmall);
        }
        if data[0..4] != ELF_MAGIC {
            return Err(ElfError::InvalidMagic);
        }
        if data[4] != ELFCLASS64 {
            return Err(ElfError::UnsupportedClass);
        }
        if data[5] != ELFDATA2LSB {
            return Err(ElfError::UnsupportedEndian);
        }
        Ok(Self {
            e_entry: read_u64(data, 24),
            e_phoff: read_u64(data, 32),
            e_phentsize: read_u16(data, 54),
            e_phnum: read_u16(data, 56),
        })
    }

    pub fn program_headers(
        &self,
        data: &[u8],
    ) -> Result<Vec<Elf64Phdr>, ElfError> {
        let ent = self.e_phentsize as usize;
        if ent < PHDR_SIZE {
            return Err(ElfError::InvalidPhdr);
        }
        let num = self.e_phnum as usize;
        let off = self.e_phoff as usize;
        let end = off
            .checked_add(num.checked_mul(ent).ok_or(ElfError::InvalidPhdr)?)
            .ok_or(ElfError::InvalidPhdr)?;
        if end > data.len() {
            return Err(ElfError::InvalidPhdr);
        }
        let mut phdrs = Vec::with_capacity(num);
        for i in 0..num {
            let p = off + i * ent;
            phdrs.push(Elf64Phdr {
                p_type: read_u32(data, p),
                p_flags: read_u32(data, p + 4),
                p_offset: read_u64(data, p + 8),
                p_vaddr: read_u64(data, p + 16),
                p_filesz: read_u64(data, p + 32),
                p_memsz: read_u64(data, p + 40),
                p_align: read_u64(data, p + 48),
            });
        }
        Ok(phdrs)
    }
}
