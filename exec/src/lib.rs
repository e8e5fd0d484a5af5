//! rvsim-exec — the synchronous fetch/decode/execute loop.

use rvsim_core::{ArchState, System};
use rvsim_frontend::{decode16, decode32, is_compressed};

/// PCs below this are treated as a return to the shell: nothing is
/// ever mapped there, and `ra` starts at zero, so a `ret` from the
/// outermost frame lands in this region.
const SHELL_REGION_END: u64 = 0x40;

/// Reason the execution loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The guest issued an exit syscall (or hit EBREAK).
    GuestExit,
    /// The PC fell into the return-to-shell region.
    Shell,
    /// The caller-supplied instruction budget ran out.
    InsnLimit,
}

/// Execute a single instruction at the current PC.
///
/// Decode failures log and skip the opcode by its own width, so a
/// misbehaving guest keeps making progress and can be observed.
pub fn step(state: &mut ArchState, sys: &mut dyn System) {
    let pc = state.pc();
    let half = state.read_imem(pc, 2) as u16;

    if is_compressed(half) {
        match decode16(half) {
            Some(op) => {
                log::debug!(
                    "{pc:#010x}  {:04x}      {}",
                    half,
                    op.disasm(pc)
                );
                op.execute(state, sys);
            }
            None => {
                log::warn!("no decode for {half:#06x} at pc={pc:#x}");
                state.inc_pc(2);
            }
        }
    } else {
        let word = state.read_imem(pc, 4) as u32;
        match decode32(word) {
            Some(op) => {
                log::debug!("{pc:#010x}  {word:08x}  {}", op.disasm(pc));
                op.execute(state, sys);
            }
            None => {
                log::warn!("no decode for {word:#010x} at pc={pc:#x}");
                state.inc_pc(4);
            }
        }
    }
}

/// Run until the guest exits, the PC returns to the shell region,
/// or `max_insns` (0 = unlimited) instructions have executed.
/// Returns the exit reason and the number of instructions executed.
pub fn run(
    state: &mut ArchState,
    sys: &mut dyn System,
    max_insns: u64,
) -> (ExitReason, u64) {
    let mut icount: u64 = 0;
    loop {
        if sys.exited() {
            return (ExitReason::GuestExit, icount);
        }
        if state.pc() < SHELL_REGION_END {
            return (ExitReason::Shell, icount);
        }
        step(state, sys);
        icount += 1;
        if max_insns != 0 && icount >= max_insns {
            return (ExitReason::InsnLimit, icount);
        }
    }
}
