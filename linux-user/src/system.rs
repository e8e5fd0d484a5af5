//! The virtualized operating system: process image, file
//! descriptor table and syscall dispatch.

use std::ffi::CString;
use std::path::{Path, PathBuf};

use rvsim_core::{reg, ArchState, System};

use crate::loader::{self, LoadError, STACK_BASE, STACK_SIZE};

// RISC-V Linux syscall numbers.
const SYS_OPENAT: u64 = 56;
const SYS_CLOSE: u64 = 57;
const SYS_WRITE: u64 = 64;
const SYS_WRITEV: u64 = 66;
const SYS_READLINKAT: u64 = 78;
const SYS_FSTAT: u64 = 80;
const SYS_EXIT: u64 = 93;
const SYS_EXIT_GROUP: u64 = 94;
const SYS_UNAME: u64 = 160;
const SYS_GETUID: u64 = 174;
const SYS_GETEUID: u64 = 175;
const SYS_GETGID: u64 = 176;
const SYS_GETEGID: u64 = 177;
const SYS_BRK: u64 = 214;
const SYS_MMAP: u64 = 222;

const NEG1: u64 = u64::MAX;

/// Host-backed implementation of the guest's operating system.
///
/// Owns the process identity (program name, argv), the memory-image
/// watermarks for brk/mmap, and the guest fd table. Guest memory is
/// reached through the `ArchState` passed into each call.
pub struct HostSystem {
    prog_name: String,
    args: Vec<String>,
    /// Guest fd -> host fd; -1 marks a blocked descriptor.
    fds: Vec<i32>,
    /// Highest in-use virtual address (inclusive).
    top_of_mem: u64,
    /// Next free region for mmap placements.
    mmap_next: u64,
    stdin_path: Option<PathBuf>,
    exited: bool,
    exit_status: i64,
}

impl HostSystem {
    pub fn new(prog_name: &str) -> Self {
        Self {
            prog_name: prog_name.to_string(),
            args: Vec::new(),
            fds: Vec::new(),
            top_of_mem: 0,
            mmap_next: 0,
            stdin_path: None,
            exited: false,
            exit_status: 0,
        }
    }

    /// Append a guest argv entry (argv[0] is always the program
    /// name).
    pub fn add_arg(&mut self, arg: &str) {
        self.args.push(arg.to_string());
    }

    /// Configure the file mapped onto guest stdin.
    pub fn set_stdin(&mut self, path: PathBuf) {
        self.stdin_path = Some(path);
    }

    pub fn exit_status(&self) -> i64 {
        self.exit_status
    }

    pub fn top_of_mem(&self) -> u64 {
        self.top_of_mem
    }

    /// Load the program and construct its process image: segments,
    /// stack with argv, entry PC, brk/mmap watermarks.
    pub fn load_elf(&mut self, state: &mut ArchState) -> Result<(), LoadError> {
        let data = std::fs::read(&self.prog_name)?;
        let info = loader::load_segments(state, &data)?;
        self.top_of_mem = info.top_of_mem;

        let mut argv: Vec<&str> = vec![&self.prog_name];
        argv.extend(self.args.iter().map(|s| s.as_str()));
        loader::build_stack(state, &argv)?;

        // mmap placements start above the stack block.
        self.mmap_next = STACK_BASE + STACK_SIZE;
        Ok(())
    }

    /// Populate guest fds 0..2. stdout and stderr are redirected to
    /// per-pid files in `dir`; stdin maps the configured file or is
    /// blocked.
    pub fn open_std_streams(&mut self, dir: &Path) {
        let pid = std::process::id();
        let stdin_fd = match &self.stdin_path {
            Some(p) => host_open(p, libc::O_RDONLY, 0),
            None => -1,
        };
        self.fds.push(stdin_fd);
        for name in ["stdout", "stderr"] {
            let path = dir.join(format!("{name}.{pid}"));
            let fd = host_open(
                &path,
                libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC,
                0o644,
            );
            if fd < 0 {
                log::warn!("cannot create {}", path.display());
            }
            self.fds.push(fd);
        }
    }

    fn host_fd(&self, guest_fd: u64) -> Option<i32> {
        let fd = *self.fds.get(guest_fd as usize)?;
        if fd < 0 {
            None
        } else {
            Some(fd)
        }
    }

    // -- Syscall implementations ---------------------------

    fn sys_openat(&mut self, state: &mut ArchState) -> u64 {
        let path_p = state.get_reg(reg::A1);
        let flags = state.get_reg(reg::A2) as i32;
        let Some(path) = read_guest_str(state, path_p) else {
            return NEG1;
        };

        if path == "/dev/tty" {
            return 1;
        }

        // Writable opens are redirected beside the original path so
        // guest runs don't clobber host files.
        let writable =
            flags & (libc::O_WRONLY | libc::O_RDWR | libc::O_CREAT) != 0;
        let host_path = if writable {
            format!("{path}.{}", std::process::id())
        } else {
            path.clone()
        };

        let fd = host_open(Path::new(&host_path), flags, 0o644);
        if fd < 0 {
            log::warn!("openat {path} failed");
            return NEG1;
        }
        self.fds.push(fd);
        (self.fds.len() - 1) as u64
    }

    fn sys_write(&mut self, state: &mut ArchState) -> u64 {
        let guest_fd = state.get_reg(reg::A0);
        let buf = state.get_reg(reg::A1);
        let count = state.get_reg(reg::A2);
        let Some(fd) = self.host_fd(guest_fd) else {
            log::warn!("write to bad fd {guest_fd}");
            return NEG1;
        };
        let mut bytes = Vec::with_capacity(count as usize);
        for i in 0..count {
            bytes.push(state.read_imem(buf + i, 1) as u8);
        }
        let ret = unsafe {
            libc::write(fd, bytes.as_ptr() as *const libc::c_void, bytes.len())
        };
        if ret < 0 {
            NEG1
        } else {
            ret as u64
        }
    }

    fn sys_writev(&mut self, state: &mut ArchState) -> u64 {
        let guest_fd = state.get_reg(reg::A0);
        let iov = state.get_reg(reg::A1);
        let iovcnt = state.get_reg(reg::A2);
        let fd = self.host_fd(guest_fd);
        if fd.is_none() {
            log::warn!("writev to bad fd {guest_fd}");
        }
        let mut total: u64 = 0;
        for i in 0..iovcnt {
            // Each guest iovec is an (address, length) pair.
            let base = state.read_imem(iov + i * 16, 8);
            let len = state.read_imem(iov + i * 16 + 8, 8);
            if let Some(fd) = fd {
                let mut bytes = Vec::with_capacity(len as usize);
                for j in 0..len {
                    bytes.push(state.read_imem(base + j, 1) as u8);
                }
                unsafe {
                    libc::write(
                        fd,
                        bytes.as_ptr() as *const libc::c_void,
                        bytes.len(),
                    );
                }
            }
            total += len;
        }
        total
    }

    fn sys_readlinkat(&mut self, state: &mut ArchState) -> u64 {
        let path_p = state.get_reg(reg::A1);
        let buf = state.get_reg(reg::A2);
        let buf_sz = state.get_reg(reg::A3);
        let Some(path) = read_guest_str(state, path_p) else {
            return NEG1;
        };
        if path != "/proc/self/exe" {
            log::warn!("readlinkat: unsupported path {path}");
            return NEG1;
        }
        let name = self.prog_name.as_bytes();
        let n = name.len().min(buf_sz as usize);
        for (i, &b) in name[..n].iter().enumerate() {
            state.write_mem(buf + i as u64, 1, b as u64);
        }
        n as u64
    }

    fn sys_fstat(&mut self, state: &mut ArchState) -> u64 {
        let guest_fd = state.get_reg(reg::A0);
        let buf = state.get_reg(reg::A1);

        // The riscv64 LP64 struct stat is 128 bytes.
        for i in 0..16 {
            state.write_mem(buf + i * 8, 8, 0);
        }

        if guest_fd == 1 {
            // stdout pretends to be a character device.
            state.write_mem(buf + 16, 4, 0o020666); // st_mode
            state.write_mem(buf + 56, 4, 8192); // st_blksize
            return 0;
        }

        let Some(fd) = self.host_fd(guest_fd) else {
            return NEG1;
        };
        let mut st: libc::stat = unsafe { std::mem::zeroed() };
        if unsafe { libc::fstat(fd, &mut st) } < 0 {
            return NEG1;
        }
        state.write_mem(buf, 8, st.st_dev);
        state.write_mem(buf + 8, 8, st.st_ino);
        state.write_mem(buf + 16, 4, st.st_mode as u64);
        state.write_mem(buf + 20, 4, st.st_nlink as u64);
        state.write_mem(buf + 24, 4, st.st_uid as u64);
        state.write_mem(buf + 28, 4, st.st_gid as u64);
        state.write_mem(buf + 32, 8, st.st_rdev);
        state.write_mem(buf + 48, 8, st.st_size as u64);
        state.write_mem(buf + 56, 4, st.st_blksize as u64);
        state.write_mem(buf + 64, 8, st.st_blocks as u64);
        state.write_mem(buf + 72, 8, st.st_atime as u64);
        state.write_mem(buf + 88, 8, st.st_mtime as u64);
        state.write_mem(buf + 104, 8, st.st_ctime as u64);
        0
    }

    fn sys_uname(&mut self, state: &mut ArchState) -> u64 {
        // new_utsname: 6 fields of 65 bytes.
        const UTS_LEN: u64 = 65;
        let buf = state.get_reg(reg::A0);
        if buf == 0 {
            return NEG1;
        }
        for i in 0..6 * UTS_LEN {
            state.write_mem(buf + i, 1, 0);
        }
        for (i, &b) in b"Linux".iter().enumerate() {
            state.write_mem(buf + i as u64, 1, b as u64);
        }
        // Third field: release.
        for (i, &b) in b"4.15.0".iter().enumerate() {
            state.write_mem(buf + 2 * UTS_LEN + i as u64, 1, b as u64);
        }
        0
    }

    /// Syscall 214 with sbrk semantics: the requested top of memory
    /// arrives in x15; 0 queries, growth appends a zero block.
    fn sys_brk(&mut self, state: &mut ArchState) -> u64 {
        let new_top = state.get_reg(reg::A5);
        if new_top == 0 || new_top <= self.top_of_mem {
            return self.top_of_mem;
        }
        let delta = new_top - self.top_of_mem;
        if let Err(e) =
            state.mem.add_zero_block(self.top_of_mem + 1, delta as usize)
        {
            log::warn!("brk grow failed: {e}");
            return self.top_of_mem;
        }
        self.top_of_mem = new_top;
        self.top_of_mem
    }

    fn sys_mmap(&mut self, state: &mut ArchState) -> u64 {
        let addr = state.get_reg(reg::A0);
        let len = state.get_reg(reg::A1);
        let aligned_len = len.div_ceil(4096) * 4096;
        let guest_addr = if addr != 0 {
            addr
        } else {
            let a = self.mmap_next;
            self.mmap_next += aligned_len;
            a
        };
        match state.mem.add_zero_block(guest_addr, aligned_len as usize) {
            Ok(()) => guest_addr,
            Err(e) => {
                log::warn!("mmap failed: {e}");
                NEG1
            }
        }
    }

    fn sys_exit(&mut self, state: &mut ArchState) -> u64 {
        let status = state.get_reg(reg::A0) as i64;
        if status != 0 {
            log::error!("program exited with non-zero status: {status}");
        }
        self.exit_status = status;
        self.exited = true;
        state.get_reg(reg::A0)
    }
}

impl System for HostSystem {
    fn ecall(&mut self, state: &mut ArchState) {
        let nr = state.get_reg(reg::A7);
        let ret = match nr {
            SYS_OPENAT => self.sys_openat(state),
            SYS_CLOSE => 0,
            SYS_WRITE => self.sys_write(state),
            SYS_WRITEV => self.sys_writev(state),
            SYS_READLINKAT => self.sys_readlinkat(state),
            SYS_FSTAT => self.sys_fstat(state),
            SYS_EXIT | SYS_EXIT_GROUP => self.sys_exit(state),
            SYS_UNAME => self.sys_uname(state),
            SYS_GETUID | SYS_GETEUID | SYS_GETGID | SYS_GETEGID => 3,
            SYS_BRK => self.sys_brk(state),
            SYS_MMAP => self.sys_mmap(state),
            _ => {
                log::warn!("unimplemented syscall {nr}");
                0
            }
        };
        state.set_reg(reg::A0, ret);
    }

    fn exited(&self) -> bool {
        self.exited
    }

    fn request_exit(&mut self, status: i64) {
        self.exit_status = status;
        self.exited = true;
    }
}

impl Drop for HostSystem {
    fn drop(&mut self) {
        for &fd in &self.fds {
            // 0..2 belong to the host process.
            if fd > 2 {
                unsafe { libc::close(fd) };
            }
        }
    }
}

/// Copy a NUL-terminated string out of guest memory.
fn read_guest_str(state: &ArchState, mut va: u64) -> Option<String> {
    if va == 0 {
        return None;
    }
    let mut bytes = Vec::new();
    loop {
        let b = state.read_imem(va, 1) as u8;
        if b == 0 {
            break;
        }
        bytes.push(b);
        va += 1;
        if bytes.len() > 4096 {
            return None;
        }
    }
    String::from_utf8(bytes).ok()
}

fn host_open(path: &Path, flags: i32, mode: u32) -> i32 {
    let Ok(cpath) = CString::new(path.to_string_lossy().as_bytes()) else {
        return -1;
    };
    unsafe { libc::open(cpath.as_ptr(), flags, mode as libc::c_uint) }
}
