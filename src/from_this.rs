use core::{fmt, marker::PhantomPinned, ptr::NonNull};

use spin::Once;

use crate::{
    block::{BlockRef, ControlBlock},
    cast::Const,
    error::{Error, Result},
    shrc::Shrc,
};

/// The back-reference an object keeps to the control block that owns it.
///
/// A `ThisSlot` starts out unwired. The `_enabled` constructors of [`Shrc`] wire it exactly once,
/// when the first handle takes ownership of the object. Cloning or defaulting a slot always
/// yields an unwired one, so a copied object never claims its original's owner.
///
/// The slot is `!Unpin`, which keeps objects carrying it from being moved out of their handle.
pub struct ThisSlot {
    owner: Once<BlockRef>,
    _pinned: PhantomPinned,
}

impl ThisSlot {
    /// Creates an unwired slot.
    pub const fn new() -> Self {
        Self {
            owner: Once::new(),
            _pinned: PhantomPinned,
        }
    }

    /// Returns true once a `Shrc` has taken ownership of the object holding this slot.
    pub fn is_owned(&self) -> bool {
        self.owner.is_completed()
    }

    pub(crate) fn wire(&self, block: NonNull<ControlBlock>) {
        let mut fresh = false;
        self.owner.call_once(|| {
            fresh = true;
            BlockRef(block)
        });
        debug_assert!(fresh, "ThisSlot wired twice");
    }

    pub(crate) fn block(&self) -> Option<NonNull<ControlBlock>> {
        self.owner.get().map(|owner| owner.0)
    }
}

impl Default for ThisSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ThisSlot {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl fmt::Debug for ThisSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThisSlot")
            .field("owned", &self.is_owned())
            .finish()
    }
}

/// Lets an object owned by a [`Shrc`] mint new handles to itself.
///
/// Implement it with [`impl_shared_from_this!`](crate::impl_shared_from_this), and construct the
/// object with one of the `_enabled` constructors (for example [`Shrc::make_enabled`]) so that its
/// [`ThisSlot`] gets wired.
///
/// ```
/// use shrc::{impl_shared_from_this, Error, SharedFromThis, Shrc, ThisSlot};
///
/// struct Widget {
///     this: ThisSlot,
///     id: u32,
/// }
/// impl_shared_from_this!(Widget, this);
///
/// let loose = Widget { this: ThisSlot::new(), id: 1 };
/// assert_eq!(loose.shared_from_this().err(), Some(Error::NotYetOwned));
///
/// let owned = Shrc::make_enabled(Widget { this: ThisSlot::new(), id: 2 });
/// let again = owned.shared_from_this().unwrap();
/// assert!(Shrc::owner_equal(&owned, &again));
/// assert_eq!(Shrc::use_count(&owned), 2);
/// assert_eq!(again.id, 2);
/// ```
///
/// # Safety
/// `this_slot` must return a slot stored inside `self` and used by no other object. The slot is
/// trusted to name the control block that keeps `self` alive.
pub unsafe trait SharedFromThis {
    /// Returns the slot wired to this object's owner.
    fn this_slot(&self) -> &ThisSlot;

    /// Returns a new handle sharing ownership of `self`.
    ///
    /// Fails with [`Error::NotYetOwned`] if no handle owns the object yet, and with
    /// [`Error::Expired`] if it is called while the object is being destroyed.
    fn shared_from_this(&self) -> Result<Shrc<Self>> {
        let Some(block) = self.this_slot().block() else {
            log::debug!("shared_from_this called on an unowned object");
            return Err(Error::NotYetOwned);
        };

        // A wired slot lives inside the payload of `block`, and the block outlives its payload.
        if !unsafe { block.as_ref() }.try_increment() {
            return Err(Error::Expired);
        }
        Ok(unsafe { Shrc::adopt_parts(block, NonNull::from(self), false) })
    }

    /// Returns a new handle sharing ownership of `self` that only allows immutable access.
    fn shared_from_this_const(&self) -> Result<Shrc<Const<Self>>> {
        self.shared_from_this().map(Shrc::into_const)
    }
}

pub(crate) type Wiring<T> = Option<fn(NonNull<T>, NonNull<ControlBlock>)>;

pub(crate) fn wire<T: ?Sized + SharedFromThis>(payload: NonNull<T>, block: NonNull<ControlBlock>) {
    unsafe { payload.as_ref() }.this_slot().wire(block);
}

/// Implements [`SharedFromThis`] for a type using one of its [`ThisSlot`] fields.
///
/// ```
/// use shrc::{impl_shared_from_this, ThisSlot};
///
/// struct Session {
///     this: ThisSlot,
/// }
/// impl_shared_from_this!(Session, this);
/// ```
#[macro_export]
macro_rules! impl_shared_from_this {
    ($ty:ty, $field:ident) => {
        // The slot is a field of `self`, so it is unique to each object.
        unsafe impl $crate::SharedFromThis for $ty {
            fn this_slot(&self) -> &$crate::ThisSlot {
                &self.$field
            }
        }
    };
}
