//! Process image construction: PT_LOAD segments and the initial
//! stack.

use rvsim_core::{reg, ArchState};
use thiserror::Error;

use crate::elf::{Elf64Ehdr, ElfError, PT_LOAD};

/// Fixed base of the guest stack block.
pub const STACK_BASE: u64 = 0x1000_0000;
/// Guest stack size: 4 MiB.
pub const STACK_SIZE: u64 = 4 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("ELF: {0}")]
    Elf(#[from] ElfError),
    #[error("no PT_LOAD segment")]
    NoLoadSegment,
    #[error("segment overlaps an existing mapping at {0:#x}")]
    SegmentOverlap(u64),
}

/// Result of loading the segments.
pub struct LoadInfo {
    pub entry: u64,
    /// Highest in-use virtual address (inclusive).
    pub top_of_mem: u64,
}

/// Map every PT_LOAD segment of `data` into guest memory and set
/// the PC to the entry point.
///
/// Each segment is expanded from `p_filesz` to `p_memsz` (the BSS
/// tail stays zero) and its upper end is rounded up to `p_align`,
/// which keeps consecutive segments contiguous in the sparse image.
pub fn load_segments(
    state: &mut ArchState,
    data: &[u8],
) -> Result<LoadInfo, LoadError> {
    let ehdr = Elf64Ehdr::parse(data)?;
    let phdrs = ehdr.program_headers(data)?;

    let mut top_of_mem: u64 = 0;
    let mut has_load = false;

    for ph in &phdrs {
        if ph.p_type != PT_LOAD {
            continue;
        }
        has_load = true;

        let align = ph.p_align.max(1);
        let end = ph
            .p_vaddr
            .checked_add(ph.p_memsz)
            .ok_or(ElfError::InvalidPhdr)?;
        let aligned_end = end.div_ceil(align) * align;
        let block_size = (aligned_end - ph.p_vaddr) as usize;

        let mut block = vec![0u8; block_size];
        let file_sz = ph.p_filesz as usize;
        let src = ph.p_offset as usize;
        let src_end = src
            .checked_add(file_sz)
            .filter(|&e| e <= data.len())
            .ok_or(ElfError::InvalidPhdr)?;
        block[..file_sz].copy_from_slice(&data[src..src_end]);

        log::info!(
            "load segment: {file_sz:#x} file bytes ({:#x} in memory) \
             from {:#x} to va {:#x}",
            block_size,
            ph.p_offset,
            ph.p_vaddr,
        );

        state
            .mem
            .add_block(ph.p_vaddr, block)
            .map_err(|_| LoadError::SegmentOverlap(ph.p_vaddr))?;

        let end_of_block = ph.p_vaddr + block_size as u64 - 1;
        if end_of_block > top_of_mem {
            top_of_mem = end_of_block;
        }
    }

    if !has_load {
        return Err(LoadError::NoLoadSegment);
    }

    log::info!("top of memory is {top_of_mem:#x}");
    state.set_pc(ehdr.e_entry);

    Ok(LoadInfo { entry: ehdr.e_entry, top_of_mem })
}

/// Map the stack block and build the startup frame.
///
/// argv strings (argv[0] = program name) are packed downward from
/// the block top, each 16-byte aligned. The argc word and the argv
/// pointer array sit at the block midpoint, which becomes SP.
/// a0 = argc and a1 = the address of the argc word, matching the
/// startup convention of the target libc.
pub fn build_stack(
    state: &mut ArchState,
    argv: &[&str],
) -> Result<(), LoadError> {
    state
        .mem
        .add_zero_block(STACK_BASE, STACK_SIZE as usize)
        .map_err(|_| LoadError::SegmentOverlap(STACK_BASE))?;

    // Strings, from the top down.
    let mut pos = STACK_BASE + STACK_SIZE;
    let mut addrs = Vec::with_capacity(argv.len());
    for s in argv.iter().rev() {
        let bytes = s.as_bytes();
        pos -= bytes.len() as u64 + 1;
        pos &= !15;
        for (i, &b) in bytes.iter().enumerate() {
            state.write_mem(pos + i as u64, 1, b as u64);
        }
        // NUL terminator is already zero.
        addrs.push(pos);
    }
    addrs.reverse();

    // argc + argv pointers at the midpoint.
    let mid = STACK_BASE + STACK_SIZE / 2;
    state.write_mem(mid, 8, argv.len() as u64);
    for (i, &addr) in addrs.iter().enumerate() {
        state.write_mem(mid + 8 + i as u64 * 8, 8, addr);
    }
    state.write_mem(mid + 8 + argv.len() as u64 * 8, 8, 0);

    state.set_reg(reg::SP, mid);
    state.set_reg(reg::A0, argv.len() as u64);
    state.set_reg(reg::A1, mid);

    Ok(())
}
