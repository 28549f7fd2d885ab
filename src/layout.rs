use core::alloc::Layout;

use crate::error::{Error, Result};

/// Placement of a control block and its payload inside one allocation.
///
/// The control block sits at offset 0. The payload starts at `offset`, the first multiple of the
/// payload's alignment that is not below the end of the control block. The whole allocation is
/// requested with the stricter of the two alignments, so both objects land on valid boundaries.
///
/// ```
/// use core::alloc::Layout;
/// use shrc::FusedLayout;
///
/// #[repr(align(32))]
/// struct Wide([u8; 32]);
///
/// let fused = FusedLayout::compute(Layout::from_size_align(40, 8).unwrap(), Layout::new::<Wide>()).unwrap();
/// assert_eq!(fused.offset, 64);
/// assert_eq!(fused.layout.align(), 32);
/// assert_eq!(fused.layout.size(), 96);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FusedLayout {
    /// Byte offset of the payload from the start of the allocation
    pub offset: usize,
    /// Layout of the entire allocation, used both to allocate and to free it
    pub layout: Layout,
}

impl FusedLayout {
    /// Computes the fused layout for a payload of type `T` behind a control block of type `B`.
    pub fn new<T, B>() -> Result<Self> {
        Self::compute(Layout::new::<B>(), Layout::new::<T>())
    }

    /// Computes the fused layout from the layouts of the control block and the payload.
    pub fn compute(block: Layout, payload: Layout) -> Result<Self> {
        let step = payload.align();
        let mut offset = step;
        while offset < block.size() {
            offset = offset.checked_add(step).ok_or(Error::LayoutOverflow)?;
        }

        let size = offset
            .checked_add(payload.size())
            .ok_or(Error::LayoutOverflow)?;
        let align = payload.align().max(block.align());
        let layout = Layout::from_size_align(size, align).map_err(|_| Error::LayoutOverflow)?;

        Ok(Self { offset, layout })
    }
}
