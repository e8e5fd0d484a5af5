//! rvsim-linux-user — guest process emulation.
//!
//! Loads a statically-linked RV64 ELF, reconstructs the process
//! image (segments, stack, argv, fd table) and services the guest's
//! syscalls against the host.

pub mod elf;
pub mod loader;
pub mod system;

pub use loader::{LoadError, LoadInfo};
pub use system::HostSystem;
