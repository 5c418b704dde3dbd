//! Cross-process memory primitive.
//!
//! Mirrors `Injection::read_memory`/`write_memory` in the original source: two `struct iovec`
//! descriptors, one local (this process) and one remote (the child), handed to
//! `process_vm_readv`/`process_vm_writev`. Both calls are synchronous and blocking; atomicity
//! across a read-then-write pair is not required so no locking is attempted here.
//!
//! The OS surface is hidden behind [`ChildMemory`] so a non-Linux backend could be added at this
//! seam without touching callers; only the Linux backend is implemented here.

use fault_injector_error::{Error, MemoryOp};

/// Reads and writes raw bytes at an absolute address in another process's address space.
pub trait ChildMemory {
    /// Read `buf.len()` bytes from `addr` in process `pid` into `buf`.
    fn read(&self, pid: i32, addr: usize, buf: &mut [u8]) -> Result<(), Error>;

    /// Write `buf` to `addr` in process `pid`.
    fn write(&self, pid: i32, addr: usize, buf: &[u8]) -> Result<(), Error>;
}

/// Convenience: read exactly one byte.
pub fn read_byte(mem: &dyn ChildMemory, pid: i32, addr: usize) -> Result<u8, Error> {
    let mut buf = [0u8; 1];
    mem.read(pid, addr, &mut buf)?;
    Ok(buf[0])
}

/// Convenience: write exactly one byte.
pub fn write_byte(mem: &dyn ChildMemory, pid: i32, addr: usize, value: u8) -> Result<(), Error> {
    mem.write(pid, addr, &[value])
}

/// `process_vm_readv`/`process_vm_writev`-backed implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxChildMemory;

impl ChildMemory for LinuxChildMemory {
    fn read(&self, pid: i32, addr: usize, buf: &mut [u8]) -> Result<(), Error> {
        let local = libc::iovec {
            iov_base: buf.as_mut_ptr() as *mut libc::c_void,
            iov_len: buf.len(),
        };
        let remote = libc::iovec {
            iov_base: addr as *mut libc::c_void,
            iov_len: buf.len(),
        };

        // SAFETY: `local` points at `buf`, which outlives this call; `remote` is merely an
        // address value handed to the kernel, never dereferenced by this process.
        let nread = unsafe { libc::process_vm_readv(pid, &local, 1, &remote, 1, 0) };
        if nread == -1 || nread as usize != buf.len() {
            return Err(Error::ChildMemory {
                op: MemoryOp::Read,
                pid,
                addr,
                len: buf.len(),
            });
        }
        Ok(())
    }

    fn write(&self, pid: i32, addr: usize, buf: &[u8]) -> Result<(), Error> {
        let local = libc::iovec {
            iov_base: buf.as_ptr() as *mut libc::c_void,
            iov_len: buf.len(),
        };
        let remote = libc::iovec {
            iov_base: addr as *mut libc::c_void,
            iov_len: buf.len(),
        };

        // SAFETY: same as `read`; `local` points at `buf` for the duration of the call.
        let nwrite = unsafe { libc::process_vm_writev(pid, &local, 1, &remote, 1, 0) };
        if nwrite == -1 || nwrite as usize != buf.len() {
            return Err(Error::ChildMemory {
                op: MemoryOp::Write,
                pid,
                addr,
                len: buf.len(),
            });
        }
        Ok(())
    }
}

/// In-process fake standing in for another process's address space, keyed by address. Lets the
/// injection unit and classifier tests exercise the read-flip-write sequence without a real child
/// process or root/ptrace privileges. Not gated behind `#[cfg(test)]` so sibling crates can depend
/// on it as a dev-dependency.
pub mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    pub struct FakeChildMemory {
        bytes: RefCell<HashMap<usize, u8>>,
    }

    impl FakeChildMemory {
        pub fn new(initial: impl IntoIterator<Item = (usize, u8)>) -> Self {
            FakeChildMemory {
                bytes: RefCell::new(initial.into_iter().collect()),
            }
        }

        pub fn get(&self, addr: usize) -> u8 {
            *self.bytes.borrow().get(&addr).unwrap_or(&0)
        }
    }

    impl ChildMemory for FakeChildMemory {
        fn read(&self, _pid: i32, addr: usize, buf: &mut [u8]) -> Result<(), Error> {
            let bytes = self.bytes.borrow();
            for (i, slot) in buf.iter_mut().enumerate() {
                *slot = *bytes.get(&(addr + i)).unwrap_or(&0);
            }
            Ok(())
        }

        fn write(&self, _pid: i32, addr: usize, buf: &[u8]) -> Result<(), Error> {
            let mut bytes = self.bytes.borrow_mut();
            for (i, value) in buf.iter().enumerate() {
                bytes.insert(addr + i, *value);
            }
            Ok(())
        }
    }
}
