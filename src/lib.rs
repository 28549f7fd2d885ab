//! `Shrc<T>` is a heap-allocated smart pointer for sharing data across threads, in the spirit of `Arc<T>`.
//! `Shrc<T>` stands for: Shared Reference Counted.
//!
//! Unlike `Arc<T>`, a `Shrc<T>` keeps its reference count in a separate, type-erased control block.
//! The control block either sits in the same allocation as the data ([`Shrc::make`]), or owns data
//! allocated elsewhere together with a deleter for it ([`Shrc::from_box`],
//! [`Shrc::from_raw_with_deleter`]). Because every handle carries both a block pointer and a data
//! pointer, a handle can view a part of the data, or the data under another type, while sharing
//! ownership of the whole ([`Shrc::alias`], [`cast`]).
//!
//! Objects that need to hand out owners of themselves implement [`SharedFromThis`], which stores a
//! back-reference to the owning control block in a [`ThisSlot`].
//!
//! There is no weak pointer: a cycle of `Shrc` pointers is never freed.
//!
//! ```
//! use shrc::{impl_shared_from_this, SharedFromThis, Shrc, ThisSlot};
//!
//! struct Task {
//!     this: ThisSlot,
//!     name: &'static str,
//! }
//! impl_shared_from_this!(Task, this);
//!
//! impl Task {
//!     fn spawn_handle(&self) -> Shrc<Task> {
//!         self.shared_from_this().expect("task is owned")
//!     }
//! }
//!
//! let task = Shrc::make_enabled(Task { this: ThisSlot::new(), name: "index" });
//! let handle = task.spawn_handle();
//! drop(task);
//! assert_eq!(handle.name, "index");
//! assert_eq!(Shrc::use_count(&handle), 1);
//! ```
//!
//! With the `nostd` feature the crate builds without the standard library, using `alloc`.

#![cfg_attr(all(feature = "nostd", not(test)), no_std)]
#![warn(missing_docs)]

extern crate alloc;

mod address;
mod block;
pub mod cast;
mod error;
mod from_this;
mod layout;
pub mod shrc;

pub use crate::address::Address;
pub use crate::block::BlockKind;
pub use crate::cast::{
    const_pointer_cast, dynamic_pointer_cast, reinterpret_pointer_cast, static_pointer_cast, Const,
};
pub use crate::error::{Error, Result};
pub use crate::from_this::{SharedFromThis, ThisSlot};
pub use crate::layout::FusedLayout;
pub use crate::shrc::{Shrc, ShrcUninit};

#[cfg(test)]
mod tests;
