use alloc::alloc::{alloc, dealloc, Layout};
use alloc::boxed::Box;
use core::{
    mem::ManuallyDrop,
    ptr::{self, NonNull},
    sync::atomic::{fence, AtomicBool, AtomicUsize, Ordering},
};

use crate::{
    error::{Error, Result},
    layout::FusedLayout,
};

const MAX_REFCOUNT: usize = (isize::MAX) as usize;

/// The storage strategy behind a control block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// The payload lives in its own heap allocation and is released through a deleter.
    Separate,
    /// The payload lives in the same allocation as the control block.
    Fused,
}

/// Type-erased header shared by every control block.
///
/// Concrete blocks are `#[repr(C)]` with the header as their first field, so a
/// `NonNull<ControlBlock>` can point at any of them and `destroy` recovers the concrete type.
#[repr(C)]
pub(crate) struct ControlBlock {
    count: AtomicUsize,
    kind: BlockKind,
    destroy: unsafe fn(NonNull<ControlBlock>),
}

impl ControlBlock {
    fn new(kind: BlockKind, destroy: unsafe fn(NonNull<ControlBlock>)) -> Self {
        Self {
            count: AtomicUsize::new(1),
            kind,
            destroy,
        }
    }

    #[inline]
    pub(crate) fn increment(&self) {
        let prev = self.count.fetch_add(1, Ordering::Relaxed);
        if prev > MAX_REFCOUNT {
            panic!("Overflow of maximum strong reference count.");
        }
    }

    /// Increments the count unless it already reached zero.
    #[inline]
    pub(crate) fn try_increment(&self) -> bool {
        self.count
            .fetch_update(Ordering::Acquire, Ordering::Relaxed, |n| {
                // A zero count never leaves zero: the block is being destroyed.
                if n == 0 {
                    return None;
                }
                assert!(
                    n <= MAX_REFCOUNT,
                    "Overflow of maximum strong reference count."
                );
                Some(n + 1)
            })
            .is_ok()
    }

    /// Drops one reference, destroying the block if it was the last one.
    ///
    /// # Safety
    /// `block` must point to a live block and the caller must own one of its references.
    #[inline]
    pub(crate) unsafe fn decrement(block: NonNull<ControlBlock>) {
        if unsafe { block.as_ref() }
            .count
            .fetch_sub(1, Ordering::Release)
            != 1
        {
            return;
        }

        fence(Ordering::Acquire);
        let destroy = unsafe { block.as_ref() }.destroy;
        unsafe { destroy(block) };
    }

    #[inline]
    pub(crate) fn current_count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn is_unique(&self) -> bool {
        self.count.load(Ordering::Acquire) == 1
    }

    #[inline]
    pub(crate) fn kind(&self) -> BlockKind {
        self.kind
    }
}

/// A non-owning reference to a control block that can be stored across threads.
#[derive(Clone, Copy)]
pub(crate) struct BlockRef(pub(crate) NonNull<ControlBlock>);

// The count is atomic and the header is otherwise immutable after construction.
unsafe impl Send for BlockRef {}
unsafe impl Sync for BlockRef {}

/// Releases a payload that was allocated as a `Box<T>`.
pub(crate) fn default_delete<T: ?Sized>(ptr: NonNull<T>) {
    // Only installed by constructors whose callers handed over a pointer from `Box::into_raw`.
    drop(unsafe { Box::from_raw(ptr.as_ptr()) });
}

#[repr(C)]
pub(crate) struct SeparateBlock<T: ?Sized, D> {
    header: ControlBlock,
    payload: NonNull<T>,
    deleter: ManuallyDrop<D>,
}

impl<T: ?Sized, D: FnOnce(NonNull<T>)> SeparateBlock<T, D> {
    /// Allocates a block taking ownership of `payload`.
    ///
    /// If the block cannot be allocated, `deleter` is run on `payload` before the error is
    /// returned, so ownership of the payload never leaks.
    pub(crate) fn allocate(payload: NonNull<T>, deleter: D) -> Result<NonNull<ControlBlock>> {
        let layout = Layout::new::<Self>();
        let Some(block) = NonNull::new(unsafe { alloc(layout) }.cast::<Self>()) else {
            log::error!("failed to allocate a {} byte control block", layout.size());
            deleter(payload);
            return Err(Error::AllocationFailed { layout });
        };

        unsafe {
            block.as_ptr().write(Self {
                header: ControlBlock::new(BlockKind::Separate, Self::destroy),
                payload,
                deleter: ManuallyDrop::new(deleter),
            })
        };
        log::trace!("allocated separate control block at {:p}", block);

        Ok(block.cast())
    }

    unsafe fn destroy(block: NonNull<ControlBlock>) {
        log::trace!("destroying separate control block at {:p}", block);
        let block = block.cast::<Self>().as_ptr();
        let (payload, deleter) = unsafe {
            (
                (*block).payload,
                ManuallyDrop::take(&mut (*block).deleter),
            )
        };

        // The block stays allocated while the payload is released, so a reentrant
        // `shared_from_this` still observes the zero count.
        deleter(payload);
        unsafe { dealloc(block.cast(), Layout::new::<Self>()) };
    }
}

#[repr(C)]
pub(crate) struct FusedBlock<T> {
    header: ControlBlock,
    payload: NonNull<T>,
    allocation: NonNull<u8>,
    layout: Layout,
    live: AtomicBool,
}

impl<T> FusedBlock<T> {
    /// Allocates a block together with uninitialized storage for its payload.
    ///
    /// The payload is not dropped on destruction until [`FusedBlock::mark_live`] is called.
    pub(crate) fn allocate() -> Result<(NonNull<ControlBlock>, NonNull<T>)> {
        let FusedLayout { offset, layout } = FusedLayout::new::<T, Self>()?;
        let Some(allocation) = NonNull::new(unsafe { alloc(layout) }) else {
            log::error!(
                "failed to allocate a fused block of {} bytes aligned to {}",
                layout.size(),
                layout.align()
            );
            return Err(Error::AllocationFailed { layout });
        };

        let block = allocation.cast::<Self>();
        let payload = unsafe { NonNull::new_unchecked(allocation.as_ptr().add(offset)) }.cast::<T>();
        unsafe {
            block.as_ptr().write(Self {
                header: ControlBlock::new(BlockKind::Fused, Self::destroy),
                payload,
                allocation,
                layout,
                live: AtomicBool::new(false),
            })
        };
        log::trace!(
            "allocated fused block at {:p}: {} bytes, align {}, payload offset {}",
            allocation,
            layout.size(),
            layout.align(),
            offset
        );

        Ok((block.cast(), payload))
    }

    /// Records that the payload slot now holds an initialized value.
    ///
    /// # Safety
    /// `block` must have been returned by [`FusedBlock::<T>::allocate`] and still be alive,
    /// and its payload must be initialized.
    pub(crate) unsafe fn mark_live(block: NonNull<ControlBlock>) {
        unsafe { block.cast::<Self>().as_ref() }
            .live
            .store(true, Ordering::Release);
    }

    unsafe fn destroy(block: NonNull<ControlBlock>) {
        log::trace!("destroying fused control block at {:p}", block);
        let block = block.cast::<Self>().as_ptr();
        unsafe {
            if (*block).live.load(Ordering::Acquire) {
                ptr::drop_in_place((*block).payload.as_ptr());
            }
            // The header is plain data; the allocation goes back with the layout it came from.
            let allocation = (*block).allocation;
            let layout = (*block).layout;
            dealloc(allocation.as_ptr(), layout);
        }
    }
}
