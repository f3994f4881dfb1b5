//! Wire formats shared by the job server and its clients: the request line
//! grammar, the folder-message framing of directory trees, and the
//! one-request-per-connection transport.

pub mod error;
pub mod folder;
pub mod request;
pub mod transport;
pub mod tree;

pub use error::{Result, WireError};
pub use folder::{EntryKind, FolderEntry, FolderMessage};
pub use request::{Request, STATUS_NONE};

/// Megabytes to bytes, the unit message limits are configured in.
///
/// `None` when the byte count, plus room for a request's command word, does
/// not fit in a `usize`.
pub fn mebibytes(mb: usize) -> Option<usize> {
    mb.checked_mul(1024 * 1024)
        .filter(|bytes| bytes.checked_add(transport::REQUEST_OVERHEAD).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mebibytes_refuses_to_overflow() {
        assert_eq!(mebibytes(10), Some(10 * 1024 * 1024));
        assert_eq!(mebibytes(0), Some(0));
        assert_eq!(mebibytes(usize::MAX), None);
        assert_eq!(mebibytes(usize::MAX / (1024 * 1024) + 1), None);
    }
}
