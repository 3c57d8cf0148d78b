//! Error kinds shared by the remote client, the bridge and the filesystem adapter

use thiserror::Error;

/// Discord error code for "Unknown Message"
const UNKNOWN_MESSAGE: u32 = 10008;
/// Discord error code for "Unknown Channel"
const UNKNOWN_CHANNEL: u32 = 10003;

/// Errors reported by an `ObjectStoreClient` implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("remote store unreachable: {0}")]
    Unavailable(String),

    #[error("remote store rejected the request (HTTP {status}, code {code}): {message}")]
    Rejected {
        status: u16,
        code: u32,
        message: String,
    },

    #[error("unexpected response from remote store: {0}")]
    Malformed(String),
}

/// Filesystem-facing error taxonomy. Callers branch on the variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FsError {
    #[error("no such file or directory")]
    NotFound,

    #[error("file exists")]
    AlreadyExists,

    #[error("remote store unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("remote call timed out; its effect is unknown")]
    Timeout,

    #[error("remote store rejected the request (HTTP {status}, code {code})")]
    RemoteRejected { status: u16, code: u32 },

    /// The remote answered with something the client could not interpret; retrying won't help.
    #[error("unexpected response from remote store: {0}")]
    RemoteMalformed(String),

    #[error("concurrent modification detected")]
    Conflict,

    #[error("operation not supported")]
    NotSupported,

    #[error("is a directory")]
    IsDirectory,

    #[error("object of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },
}

impl FsError {
    /// Map onto the errno convention expected by the kernel.
    pub fn errno(&self) -> i32 {
        match self {
            FsError::NotFound => libc::ENOENT,
            FsError::AlreadyExists => libc::EEXIST,
            FsError::RemoteUnavailable(_) => libc::EAGAIN,
            FsError::Timeout => libc::ETIMEDOUT,
            FsError::RemoteRejected { status: 429, .. } => libc::EAGAIN,
            FsError::RemoteRejected {
                status: 401 | 403, ..
            } => libc::EACCES,
            FsError::RemoteRejected { .. } => libc::EIO,
            FsError::RemoteMalformed(_) => libc::EIO,
            FsError::Conflict => libc::EBUSY,
            FsError::NotSupported => libc::EPERM,
            FsError::IsDirectory => libc::EISDIR,
            FsError::TooLarge { .. } => libc::EFBIG,
        }
    }

    /// True when the remote store says the target no longer exists.
    pub fn is_remote_missing(&self) -> bool {
        matches!(
            self,
            FsError::RemoteRejected { status: 404, .. }
                | FsError::RemoteRejected {
                    code: UNKNOWN_MESSAGE | UNKNOWN_CHANNEL,
                    ..
                }
        )
    }
}

impl From<RemoteError> for FsError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Unavailable(reason) => FsError::RemoteUnavailable(reason),
            RemoteError::Rejected { status, code, .. } => FsError::RemoteRejected { status, code },
            RemoteError::Malformed(reason) => FsError::RemoteMalformed(reason),
        }
    }
}

pub type FsResult<T> = Result<T, FsError>;
