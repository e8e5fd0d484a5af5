//! Sparse guest memory.
//!
//! The guest address space is materialized only where the loader or
//! the guest has mapped it. Each mapping is a contiguous block of
//! bytes keyed by its base virtual address. An access must fall
//! entirely within one block; anything else is a diagnosable guest
//! bug, not a simulator failure, so faults log and fall back to zero.

use thiserror::Error;

/// Reason a memory access could not be satisfied.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemError {
    #[error("access outside of allocated memory: va={va:#x} size={size}")]
    Unmapped { va: u64, size: u32 },
    #[error("access crosses a block boundary: va={va:#x} size={size}")]
    CrossBlock { va: u64, size: u32 },
    #[error("block at {va:#x} overlaps an existing block")]
    Overlap { va: u64 },
}

struct MemBlock {
    va: u64,
    mem: Vec<u8>,
}

impl MemBlock {
    fn end(&self) -> u64 {
        self.va + self.mem.len() as u64
    }
}

/// Sparse-array implementation of the guest memory image.
#[derive(Default)]
pub struct SparseMem {
    blocks: Vec<MemBlock>,
}

impl SparseMem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `data` at `va`.
    ///
    /// If `va` is exactly the end of an existing block the block is
    /// grown in place instead, so adjacent mappings (loader segments,
    /// sbrk growth) stay accessible as one block. Any other overlap
    /// with an existing block is rejected.
    pub fn add_block(&mut self, va: u64, data: Vec<u8>) -> Result<(), MemError> {
        let size = data.len() as u64;
        if let Some(b) = self.blocks.iter_mut().find(|b| b.end() == va) {
            b.mem.extend_from_slice(&data);
            return Ok(());
        }
        if self
            .blocks
            .iter()
            .any(|b| va < b.end() && va + size > b.va)
        {
            return Err(MemError::Overlap { va });
        }
        self.blocks.push(MemBlock { va, mem: data });
        Ok(())
    }

    /// Map `size` zero bytes at `va` (grow-append applies).
    pub fn add_zero_block(&mut self, va: u64, size: usize) -> Result<(), MemError> {
        self.add_block(va, vec![0u8; size])
    }

    fn access(&self, va: u64, size: u32) -> Result<(usize, usize), MemError> {
        for (i, b) in self.blocks.iter().enumerate() {
            if b.va <= va && va < b.end() {
                if va + size as u64 <= b.end() {
                    return Ok((i, (va - b.va) as usize));
                }
                return Err(MemError::CrossBlock { va, size });
            }
        }
        Err(MemError::Unmapped { va, size })
    }

    /// Read `size` (1, 2, 4 or 8) bytes at `va`, little-endian, into
    /// the low bytes of the result. Faults log and return zero.
    pub fn read(&self, va: u64, size: u32) -> u64 {
        match self.try_read(va, size) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("read fault: {e}");
                0
            }
        }
    }

    /// `read` without the fault diagnostic. Instruction fetch probes
    /// and syscall buffer copies use this.
    pub fn read_quiet(&self, va: u64, size: u32) -> u64 {
        self.try_read(va, size).unwrap_or(0)
    }

    pub fn try_read(&self, va: u64, size: u32) -> Result<u64, MemError> {
        let (bi, off) = self.access(va, size)?;
        let mem = &self.blocks[bi].mem;
        let mut bytes = [0u8; 8];
        bytes[..size as usize].copy_from_slice(&mem[off..off + size as usize]);
        Ok(u64::from_le_bytes(bytes))
    }

    /// Write the low `size` bytes of `val` at `va`, little-endian.
    /// Faults log and drop the store.
    pub fn write(&mut self, va: u64, size: u32, val: u64) {
        if let Err(e) = self.try_write(va, size, val) {
            log::warn!("write fault: {e}");
        }
    }

    pub fn try_write(&mut self, va: u64, size: u32, val: u64) -> Result<(), MemError> {
        let (bi, off) = self.access(va, size)?;
        let mem = &mut self.blocks[bi].mem;
        mem[off..off + size as usize]
            .copy_from_slice(&val.to_le_bytes()[..size as usize]);
        Ok(())
    }
}
