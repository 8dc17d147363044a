//! System Call Module (Unix-specific)
//!
//! Thin wrappers over the line-discipline, file-status and ioctl calls used by
//! the serial port handle. Every wrapper is a single system call; errors come
//! back as `nix::errno::Errno` and nothing is retried.

use std::os::unix::io::RawFd;

use entities_serial_settings::TermiosSnapshot;
use nix::errno::Errno;

/// Kernel queue(s) to discard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Queue {
    /// Data received but not read
    Input,
    /// Data written but not transmitted
    Output,
    Both,
}

/// Read the device's current line-discipline settings (`tcgetattr`)
pub fn query_settings(fd: RawFd) -> Result<TermiosSnapshot, Errno> {
    let mut raw = TermiosSnapshot::zeroed().into_raw();
    // SAFETY: raw is a valid, writable termios for the duration of the call.
    Errno::result(unsafe { libc::tcgetattr(fd, &mut raw) })?;
    Ok(TermiosSnapshot::from_raw(raw))
}

/// Apply line-discipline settings immediately (`tcsetattr` with `TCSANOW`)
pub fn apply_settings(fd: RawFd, snapshot: &TermiosSnapshot) -> Result<(), Errno> {
    // SAFETY: the snapshot outlives the call and is only read.
    Errno::result(unsafe { libc::tcsetattr(fd, libc::TCSANOW, snapshot.as_raw()) })?;
    Ok(())
}

/// Discard queued data (`tcflush`)
pub fn flush_queue(fd: RawFd, queue: Queue) -> Result<(), Errno> {
    let selector = match queue {
        Queue::Input => libc::TCIFLUSH,
        Queue::Output => libc::TCOFLUSH,
        Queue::Both => libc::TCIOFLUSH,
    };
    // SAFETY: plain integer arguments.
    Errno::result(unsafe { libc::tcflush(fd, selector) })?;
    Ok(())
}

/// File status flags (`F_GETFL`)
pub fn status_flags(fd: RawFd) -> Result<libc::c_int, Errno> {
    // SAFETY: plain integer arguments.
    Errno::result(unsafe { libc::fcntl(fd, libc::F_GETFL) })
}

/// Replace the file status flags (`F_SETFL`)
pub fn set_status_flags(fd: RawFd, flags: libc::c_int) -> Result<(), Errno> {
    // SAFETY: plain integer arguments.
    Errno::result(unsafe { libc::fcntl(fd, libc::F_SETFL, flags) })?;
    Ok(())
}

/// True unless `O_NONBLOCK` is set
pub fn is_blocking(fd: RawFd) -> Result<bool, Errno> {
    Ok(status_flags(fd)? & libc::O_NONBLOCK == 0)
}

/// Set or clear `O_NONBLOCK`
pub fn set_blocking(fd: RawFd, blocking: bool) -> Result<(), Errno> {
    let flags = status_flags(fd)?;
    let flags = if blocking {
        flags & !libc::O_NONBLOCK
    } else {
        flags | libc::O_NONBLOCK
    };
    set_status_flags(fd, flags)
}

/// Bytes received and waiting to be read (`FIONREAD`)
pub fn bytes_queued(fd: RawFd) -> Result<usize, Errno> {
    let mut count: libc::c_int = 0;
    // SAFETY: FIONREAD writes a single c_int through the pointer.
    Errno::result(unsafe { libc::ioctl(fd, libc::FIONREAD, &mut count as *mut libc::c_int) })?;
    Ok(usize::try_from(count).unwrap_or(0))
}

/// One `read(2)` call
pub fn read_bytes(fd: RawFd, buf: &mut [u8]) -> Result<usize, Errno> {
    nix::unistd::read(fd, buf)
}

/// One `write(2)` call
pub fn write_bytes(fd: RawFd, buf: &[u8]) -> Result<usize, Errno> {
    nix::unistd::write(fd, buf)
}

/// Scoped switch to non-blocking mode
///
/// Sets `O_NONBLOCK` on entry and puts the original status flags back on
/// [`restore`](NonBlockingGuard::restore). A guard dropped without an explicit
/// restore (early return, panic) restores on drop and ignores the result, so
/// the descriptor never stays in the probe's mode. Callers that must report a
/// failed restore call `restore` themselves.
#[derive(Debug)]
pub struct NonBlockingGuard {
    fd: RawFd,
    original_flags: libc::c_int,
    restored: bool,
}

impl NonBlockingGuard {
    /// Switch `fd` to non-blocking mode
    ///
    /// # Errors
    ///
    /// Returns the errno of the failing `fcntl`; the descriptor is unchanged.
    pub fn enter(fd: RawFd) -> Result<Self, Errno> {
        let original_flags = status_flags(fd)?;
        set_status_flags(fd, original_flags | libc::O_NONBLOCK)?;
        Ok(Self {
            fd,
            original_flags,
            restored: false,
        })
    }

    /// Put the original status flags back
    pub fn restore(mut self) -> Result<(), Errno> {
        self.restored = true;
        set_status_flags(self.fd, self.original_flags)
    }
}

impl Drop for NonBlockingGuard {
    fn drop(&mut self) {
        if !self.restored {
            let _ = set_status_flags(self.fd, self.original_flags);
        }
    }
}
