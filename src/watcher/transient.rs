//! Classification of retry-safe I/O errors.
//!
//! A writer can hold a log file open in a way that makes a concurrent read
//! fail for a moment (sharing violations on Windows, `EAGAIN` on a file with
//! a mandatory lock). Those failures are skipped and retried on the next
//! change notification instead of being reported.

use std::io;

#[cfg(unix)]
use nix::errno::Errno;

/// Categories of I/O errors that are safe to retry later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientError {
    /// Another process opened the file without read sharing.
    SharingViolation,
    /// Another process locked the byte range being read.
    LockViolation,
    /// The operation would block on a locked file.
    WouldBlock,
    /// The resource is busy.
    Busy,
    /// The call was interrupted by a signal.
    Interrupted,
}

/// OS error codes that map to a transient category on this platform.
#[cfg(windows)]
const TRANSIENT_OS_ERRORS: &[(i32, TransientError)] = &[
    // ERROR_SHARING_VIOLATION
    (32, TransientError::SharingViolation),
    // ERROR_LOCK_VIOLATION
    (33, TransientError::LockViolation),
];

#[cfg(unix)]
const TRANSIENT_OS_ERRORS: &[(i32, TransientError)] = &[
    (Errno::EAGAIN as i32, TransientError::WouldBlock),
    (Errno::EBUSY as i32, TransientError::Busy),
    (Errno::EINTR as i32, TransientError::Interrupted),
];

#[cfg(not(any(unix, windows)))]
const TRANSIENT_OS_ERRORS: &[(i32, TransientError)] = &[];

/// Map an I/O error to its transient category, if it has one.
#[must_use]
pub fn transient_kind(err: &io::Error) -> Option<TransientError> {
    if let Some(code) = err.raw_os_error() {
        if let Some((_, kind)) = TRANSIENT_OS_ERRORS.iter().find(|(c, _)| *c == code) {
            return Some(*kind);
        }
    }

    match err.kind() {
        io::ErrorKind::WouldBlock => Some(TransientError::WouldBlock),
        io::ErrorKind::Interrupted => Some(TransientError::Interrupted),
        _ => None,
    }
}

/// Returns `true` if the error is a retry-safe lock or sharing failure.
#[must_use]
pub fn is_transient(err: &io::Error) -> bool {
    transient_kind(err).is_some()
}
