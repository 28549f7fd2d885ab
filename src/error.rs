use core::alloc::Layout;

use thiserror::Error;

/// The ways an ownership operation on a [`Shrc`](crate::Shrc) can fail.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The allocator could not provide memory for a control block or a fused allocation.
    #[error("failed to allocate {} bytes aligned to {}", .layout.size(), .layout.align())]
    AllocationFailed {
        /// The layout that was requested
        layout: Layout,
    },
    /// The combined size of a control block and its payload overflows `isize`.
    #[error("fused allocation layout overflows")]
    LayoutOverflow,
    /// `shared_from_this` was called on an object that no `Shrc` owns yet.
    #[error("object is not owned by any Shrc yet")]
    NotYetOwned,
    /// `shared_from_this` was called while the owning control block was being destroyed.
    #[error("the owning control block has already expired")]
    Expired,
    /// The payload of an empty handle was requested.
    #[error("handle is empty")]
    EmptyHandle,
}

/// A `Result` with [`Error`] as the default error type.
pub type Result<T, E = Error> = core::result::Result<T, E>;
