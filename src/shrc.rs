//! The shared handle and its construct-for-overwrite counterpart.

use alloc::{alloc::handle_alloc_error, boxed::Box, vec::Vec};
use core::{
    fmt::{self, Debug, Display, Pointer},
    hash::{Hash, Hasher},
    marker::PhantomData,
    mem::{ManuallyDrop, MaybeUninit},
    ops::Deref,
    panic::{RefUnwindSafe, UnwindSafe},
    pin::Pin,
    ptr::NonNull,
};

use crate::{
    address::Address,
    block::{default_delete, BlockKind, ControlBlock, FusedBlock, SeparateBlock},
    error::{Error, Result},
    from_this::{self, SharedFromThis, Wiring},
};

/// `Shrc` is a heap-allocated smart pointer providing shared ownership of a `T` across threads.
/// `Shrc` stands for: Shared Reference Counted.
///
/// Every `Shrc<T>` is made of two pointers: one to a control block holding the atomic reference
/// count and knowing how to destroy the payload, and one to the payload as seen through `T`.
/// When the last owner of a control block goes away, the payload is destroyed and the block is
/// freed, exactly once.
///
/// ## Construction
/// - [`Shrc::make`] places the control block and the payload in a single allocation (a fused
///   block). [`Shrc::make_for_overwrite`] does the same but leaves the payload for the caller to
///   write.
/// - [`Shrc::from_box`] and [`Shrc::from_raw_with_deleter`] adopt a payload allocated elsewhere,
///   allocating a separate control block with a deleter for it.
/// - [`Shrc::alias`] and the functions in [`cast`](crate::cast) create owners of an existing block
///   that view the payload (or a part of it) under another type.
///
/// A `Shrc` can also be empty: [`Shrc::null`], the [`Default`] value, a handle emptied by
/// [`Shrc::take`] or [`Shrc::reset`], or the result of a failed dynamic cast.
///
/// ## Shared from this
/// A type implementing [`SharedFromThis`] can mint new owners of itself. It must be constructed
/// through one of the `_enabled` constructors, which wire the object to its control block at the
/// moment ownership is established.
///
/// ## Identity
/// `==`, `<` and [`Hash`] compare the payload address. [`Shrc::owner_equal`] and
/// [`Shrc::owner_before`] compare the control block instead. The two can disagree after a cast.
///
/// To prevent name clashes with the payload's methods, `Shrc<T>`'s functions are associated.
///
/// ## Examples
///
/// ```
/// use shrc::Shrc;
///
/// let shrc = Shrc::make(100);
/// let shrc2 = shrc.clone();
/// assert_eq!(*shrc2, 100);
/// assert_eq!(Shrc::use_count(&shrc), 2);
/// ```
///
/// Example with multiple threads:
/// ```
/// use std::thread;
/// use shrc::Shrc;
///
/// let shrc = Shrc::make(100);
/// let shared = shrc.clone();
/// let handle = thread::spawn(move || {
///     assert_eq!(*shared, 100);
/// });
///
/// handle.join().unwrap();
/// assert_eq!(Shrc::use_count(&shrc), 1);
/// ```
pub struct Shrc<T: ?Sized> {
    parts: Option<Parts<T>>,
    _marker: PhantomData<T>,
}

struct Parts<T: ?Sized> {
    block: NonNull<ControlBlock>,
    ptr: NonNull<T>,
    // Set when `ptr` is the payload pointer the block was built around, which may be written
    // through. Views made from a shared reference never grant `&mut`.
    root: bool,
}

impl<T: ?Sized> Clone for Parts<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Parts<T> {}

unsafe impl<T: ?Sized + Sync + Send> Send for Shrc<T> {}
unsafe impl<T: ?Sized + Sync + Send> Sync for Shrc<T> {}

/// Unwraps the result of an infallible constructor, reporting allocation failure the way the
/// global allocator does.
fn or_alloc_error<T>(result: Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(Error::AllocationFailed { layout }) => handle_alloc_error(layout),
        Err(error) => panic!("{error}"),
    }
}

impl<T> Shrc<T> {
    /// Creates a new `Shrc<T>`, placing the control block and `value` in one allocation.
    /// ```
    /// use shrc::{BlockKind, Shrc};
    ///
    /// let shrc = Shrc::make(100);
    /// assert_eq!(*shrc, 100);
    /// assert_eq!(Shrc::block_kind(&shrc), Some(BlockKind::Fused));
    /// ```
    #[inline]
    pub fn make(value: T) -> Self {
        or_alloc_error(Self::try_make(value))
    }

    /// Like [`Shrc::make`], but reports allocation failure as an error.
    #[inline]
    pub fn try_make(value: T) -> Result<Self> {
        Ok(Self::try_make_for_overwrite()?.write(value))
    }

    /// Allocates a fused block whose payload is left uninitialized.
    ///
    /// Write the payload through the returned [`ShrcUninit`] to obtain a `Shrc<T>`.
    /// ```
    /// use shrc::Shrc;
    ///
    /// let slot = Shrc::<[u64; 4]>::make_for_overwrite();
    /// let shrc = slot.write([1, 2, 3, 4]);
    /// assert_eq!(shrc[3], 4);
    /// ```
    #[inline]
    pub fn make_for_overwrite() -> ShrcUninit<T> {
        or_alloc_error(Self::try_make_for_overwrite())
    }

    /// Like [`Shrc::make_for_overwrite`], but reports allocation failure as an error.
    pub fn try_make_for_overwrite() -> Result<ShrcUninit<T>> {
        let (block, ptr) = FusedBlock::<T>::allocate()?;
        Ok(ShrcUninit {
            block,
            ptr,
            _marker: PhantomData,
        })
    }
}

impl<T: SharedFromThis> Shrc<T> {
    /// Like [`Shrc::make`], and wires `value` so it can call
    /// [`shared_from_this`](SharedFromThis::shared_from_this).
    #[inline]
    pub fn make_enabled(value: T) -> Self {
        or_alloc_error(Self::try_make_enabled(value))
    }

    /// Like [`Shrc::make_enabled`], but reports allocation failure as an error.
    #[inline]
    pub fn try_make_enabled(value: T) -> Result<Self> {
        Ok(Self::try_make_for_overwrite()?.write_enabled(value))
    }
}

impl<T: ?Sized> Shrc<T> {
    /// Creates an empty `Shrc<T>` that owns nothing.
    /// ```
    /// use shrc::Shrc;
    ///
    /// let shrc = Shrc::<i32>::null();
    /// assert!(Shrc::is_null(&shrc));
    /// assert_eq!(Shrc::use_count(&shrc), 0);
    /// ```
    #[inline]
    pub const fn null() -> Self {
        Shrc {
            parts: None,
            _marker: PhantomData,
        }
    }

    /// Takes over an already-counted reference to `block`.
    ///
    /// # Safety
    /// The caller must own one reference to the live `block`, and `ptr` must stay valid for as
    /// long as the block is alive. `root` may only be set if `ptr` is the block's own payload
    /// pointer, derived without passing through a shared reference.
    #[inline]
    pub(crate) unsafe fn adopt_parts(
        block: NonNull<ControlBlock>,
        ptr: NonNull<T>,
        root: bool,
    ) -> Self {
        Shrc {
            parts: Some(Parts { block, ptr, root }),
            _marker: PhantomData,
        }
    }

    /// Creates another owner of this handle's block that views `ptr`.
    ///
    /// With `keep_root`, the new handle stays writable if this one is.
    ///
    /// # Safety
    /// `ptr` must stay valid for as long as the block is alive. `keep_root` may only be set if
    /// `ptr` is a cast of this handle's own pointer to a type with the same layout.
    pub(crate) unsafe fn rebind<U: ?Sized>(
        this: &Self,
        ptr: NonNull<U>,
        keep_root: bool,
    ) -> Shrc<U> {
        match this.parts {
            Some(parts) => {
                unsafe { parts.block.as_ref() }.increment();
                unsafe { Shrc::adopt_parts(parts.block, ptr, keep_root && parts.root) }
            }
            None => Shrc::null(),
        }
    }

    /// Moves this handle's ownership to a handle that views `ptr`.
    ///
    /// # Safety
    /// As for [`Shrc::rebind`].
    pub(crate) unsafe fn rebind_into<U: ?Sized>(
        mut this: Self,
        ptr: NonNull<U>,
        keep_root: bool,
    ) -> Shrc<U> {
        match this.parts.take() {
            Some(parts) => unsafe {
                Shrc::adopt_parts(parts.block, ptr, keep_root && parts.root)
            },
            None => Shrc::null(),
        }
    }

    unsafe fn try_adopt<D>(ptr: NonNull<T>, deleter: D, wiring: Wiring<T>) -> Result<Self>
    where
        D: FnOnce(NonNull<T>) + Send,
    {
        let block = SeparateBlock::allocate(ptr, deleter)?;
        if let Some(wire) = wiring {
            wire(ptr, block);
        }
        Ok(unsafe { Shrc::adopt_parts(block, ptr, true) })
    }

    /// Creates a new `Shrc<T>` owning the boxed value, with a separately allocated control block.
    /// ```
    /// use shrc::{BlockKind, Shrc};
    ///
    /// let shrc: Shrc<[i32]> = Shrc::from_box(vec![1, 2, 3].into_boxed_slice());
    /// assert_eq!(shrc[1], 2);
    /// assert_eq!(Shrc::block_kind(&shrc), Some(BlockKind::Separate));
    /// ```
    #[inline]
    pub fn from_box(value: Box<T>) -> Self {
        or_alloc_error(Self::try_from_box(value))
    }

    /// Like [`Shrc::from_box`], but reports allocation failure as an error. The value is dropped
    /// if the control block cannot be allocated.
    pub fn try_from_box(value: Box<T>) -> Result<Self> {
        let ptr = NonNull::from(Box::leak(value));
        unsafe { Self::try_adopt(ptr, default_delete::<T> as fn(NonNull<T>), None) }
    }

    /// Creates a new `Shrc<T>` owning the value behind `ptr`. A null `ptr` gives an empty handle.
    ///
    /// # Safety
    /// A non-null `ptr` must come from [`Box::into_raw`] and must not be used by the caller
    /// afterwards.
    /// ```
    /// use shrc::Shrc;
    ///
    /// let raw = Box::into_raw(Box::new(5));
    /// let shrc = unsafe { Shrc::from_raw(raw) };
    /// assert_eq!(*shrc, 5);
    /// ```
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        match NonNull::new(ptr) {
            Some(ptr) => unsafe { Self::from_box(Box::from_raw(ptr.as_ptr())) },
            None => Shrc::null(),
        }
    }

    /// Creates a new `Shrc<T>` that releases the value behind `ptr` by calling `deleter`.
    ///
    /// The deleter runs exactly once, on whichever thread drops the last owner. It also runs if
    /// the control block cannot be allocated.
    ///
    /// # Safety
    /// `ptr` must stay valid, and must not be mutated elsewhere, until `deleter` is called.
    /// ```
    /// use std::ptr::NonNull;
    /// use shrc::Shrc;
    ///
    /// let raw = NonNull::from(Box::leak(Box::new(String::from("scratch"))));
    /// let shrc = unsafe {
    ///     Shrc::from_raw_with_deleter(raw, |ptr: NonNull<String>| {
    ///         drop(Box::from_raw(ptr.as_ptr()));
    ///     })
    /// };
    /// assert_eq!(shrc.as_str(), "scratch");
    /// ```
    pub unsafe fn from_raw_with_deleter<D>(ptr: NonNull<T>, deleter: D) -> Self
    where
        D: FnOnce(NonNull<T>) + Send + 'static,
    {
        or_alloc_error(unsafe { Self::try_adopt(ptr, deleter, None) })
    }

    /// Like [`Shrc::from_raw_with_deleter`], but reports allocation failure as an error, after
    /// running `deleter` on `ptr`.
    ///
    /// # Safety
    /// As for [`Shrc::from_raw_with_deleter`].
    pub unsafe fn try_from_raw_with_deleter<D>(ptr: NonNull<T>, deleter: D) -> Result<Self>
    where
        D: FnOnce(NonNull<T>) + Send + 'static,
    {
        unsafe { Self::try_adopt(ptr, deleter, None) }
    }

    /// Releases this handle's ownership, leaving it empty. Does nothing on an empty handle.
    /// ```
    /// use shrc::Shrc;
    ///
    /// let mut shrc = Shrc::make(1);
    /// Shrc::reset(&mut shrc);
    /// assert!(Shrc::is_null(&shrc));
    /// Shrc::reset(&mut shrc);
    /// ```
    #[inline]
    pub fn reset(this: &mut Self) {
        drop(Shrc::take(this));
    }

    /// Releases this handle's ownership, then makes it own the boxed value.
    pub fn reset_box(this: &mut Self, value: Box<T>) {
        Shrc::reset(this);
        *this = Shrc::from_box(value);
    }

    /// Releases this handle's ownership, then makes it own `ptr`, released through `deleter`.
    ///
    /// # Safety
    /// As for [`Shrc::from_raw_with_deleter`].
    pub unsafe fn reset_with_deleter<D>(this: &mut Self, ptr: NonNull<T>, deleter: D)
    where
        D: FnOnce(NonNull<T>) + Send + 'static,
    {
        Shrc::reset(this);
        *this = unsafe { Shrc::from_raw_with_deleter(ptr, deleter) };
    }

    /// Moves ownership out of this handle, leaving it empty.
    /// ```
    /// use shrc::Shrc;
    ///
    /// let mut a = Shrc::make(1);
    /// let b = Shrc::take(&mut a);
    /// assert!(Shrc::is_null(&a));
    /// assert_eq!(Shrc::use_count(&b), 1);
    /// ```
    #[inline]
    pub fn take(this: &mut Self) -> Self {
        Shrc {
            parts: this.parts.take(),
            _marker: PhantomData,
        }
    }

    /// Exchanges what two handles own without changing any count.
    #[inline]
    pub fn swap(this: &mut Self, other: &mut Self) {
        core::mem::swap(&mut this.parts, &mut other.parts);
    }

    /// Returns a reference to the payload, or `None` if the handle is empty.
    #[inline]
    pub fn get(this: &Self) -> Option<&T> {
        this.parts.map(|parts| unsafe { &*parts.ptr.as_ptr() })
    }

    /// Returns a reference to the payload, or [`Error::EmptyHandle`] if the handle is empty.
    /// ```
    /// use shrc::{Error, Shrc};
    ///
    /// assert_eq!(Shrc::try_get(&Shrc::make(3)), Ok(&3));
    /// assert_eq!(Shrc::try_get(&Shrc::<i32>::null()), Err(Error::EmptyHandle));
    /// ```
    #[inline]
    pub fn try_get(this: &Self) -> Result<&T> {
        Shrc::get(this).ok_or(Error::EmptyHandle)
    }

    /// Returns the payload pointer, or `None` if the handle is empty.
    #[inline]
    pub fn as_ptr(this: &Self) -> Option<NonNull<T>> {
        this.parts.map(|parts| parts.ptr)
    }

    /// Returns true if the handle owns nothing.
    #[inline]
    pub fn is_null(this: &Self) -> bool {
        this.parts.is_none()
    }

    /// Gets a `&mut` reference to the payload if no other handle shares its control block.
    ///
    /// Only handles that view the whole payload as it was constructed can be written through.
    /// Handles made by [`Shrc::alias`], [`SharedFromThis::shared_from_this`] or a pointer cast
    /// return `None` even when unique.
    /// ```
    /// use shrc::Shrc;
    ///
    /// let mut shrc = Shrc::make(100);
    /// *Shrc::get_mut(&mut shrc).unwrap() = 300;
    /// assert_eq!(*shrc, 300);
    ///
    /// let other = shrc.clone();
    /// assert!(Shrc::get_mut(&mut shrc).is_none());
    /// ```
    #[inline]
    pub fn get_mut(this: &mut Self) -> Option<&mut T>
    where
        T: Unpin,
    {
        Shrc::get_pin_mut(this).map(Pin::into_inner)
    }

    /// Gets a pinned `&mut` reference to the payload if no other handle shares its control block.
    /// The same restriction to whole-payload handles applies as for [`Shrc::get_mut`].
    ///
    /// The payload never moves while it is owned, so it is always safe to pin.
    ///
    /// Replacing a [`SharedFromThis`] payload with [`Pin::set`] also replaces its [`ThisSlot`].
    /// The new slot is unwired, so `shared_from_this` on the replaced object returns
    /// [`Error::NotYetOwned`] until the handle is reset through an `_enabled` constructor.
    ///
    /// [`ThisSlot`]: crate::ThisSlot
    pub fn get_pin_mut(this: &mut Self) -> Option<Pin<&mut T>> {
        let parts = this.parts?;
        if !parts.root || !unsafe { parts.block.as_ref() }.is_unique() {
            return None;
        }
        Some(unsafe { Pin::new_unchecked(&mut *parts.ptr.as_ptr()) })
    }

    /// Return the number of handles sharing this handle's control block, or 0 if it is empty.
    ///
    /// The count may change as soon as it is read; use it for diagnostics only.
    /// ```
    /// use shrc::Shrc;
    ///
    /// let shrc = Shrc::make(100);
    /// let shrc2 = shrc.clone();
    /// assert_eq!(Shrc::use_count(&shrc), 2);
    /// drop(shrc2);
    /// assert_eq!(Shrc::use_count(&shrc), 1);
    /// ```
    #[inline]
    pub fn use_count(this: &Self) -> usize {
        match this.parts {
            Some(parts) => unsafe { parts.block.as_ref() }.current_count(),
            None => 0,
        }
    }

    /// Returns true if this handle is the only owner of its control block, or if it is empty.
    #[inline]
    pub fn is_unique(this: &Self) -> bool {
        match this.parts {
            Some(parts) => unsafe { parts.block.as_ref() }.current_count() == 1,
            None => true,
        }
    }

    /// Returns how the control block stores the payload, or `None` if the handle is empty.
    #[inline]
    pub fn block_kind(this: &Self) -> Option<BlockKind> {
        this.parts.map(|parts| unsafe { parts.block.as_ref() }.kind())
    }

    /// Returns the payload address, used by `==`, `<` and [`Hash`].
    #[inline]
    pub fn address(this: &Self) -> Address {
        match this.parts {
            Some(parts) => Address::from(parts.ptr.as_ptr() as *const T),
            None => Address::NULL,
        }
    }

    /// Returns the control block address, used by [`Shrc::owner_equal`] and [`Shrc::owner_before`].
    #[inline]
    pub fn owner(this: &Self) -> Address {
        match this.parts {
            Some(parts) => Address::from(parts.block.as_ptr() as *const ControlBlock),
            None => Address::NULL,
        }
    }

    /// Returns true if both handles share the same control block (or are both empty).
    /// ```
    /// use shrc::Shrc;
    ///
    /// let a = Shrc::make((1, 2));
    /// let second = Shrc::alias(&a, |pair| &pair.1);
    /// assert!(Shrc::owner_equal(&a, &second));
    /// assert!(a != second);
    /// ```
    #[inline]
    pub fn owner_equal<U: ?Sized>(this: &Self, other: &Shrc<U>) -> bool {
        Shrc::owner(this) == Shrc::owner(other)
    }

    /// Orders handles by control block address.
    #[inline]
    pub fn owner_before<U: ?Sized>(this: &Self, other: &Shrc<U>) -> bool {
        Shrc::owner(this) < Shrc::owner(other)
    }

    /// Creates another owner of the same control block that views a part of the payload, or the
    /// payload under another type.
    ///
    /// The new handle keeps the whole payload alive, and the last handle to go away destroys it
    /// on its own thread, so the payload must be `Send + Sync` whatever `U` is. An empty handle
    /// gives an empty handle. The new handle never grants `&mut U`.
    /// ```
    /// use shrc::Shrc;
    ///
    /// struct Config {
    ///     name: String,
    /// }
    ///
    /// let config = Shrc::make(Config { name: String::from("main") });
    /// let name: Shrc<str> = Shrc::alias(&config, |c| c.name.as_str());
    /// drop(config);
    /// assert_eq!(&*name, "main");
    /// ```
    ///
    /// A view cannot carry a payload that must stay on one thread:
    /// ```compile_fail
    /// use std::{rc::Rc, thread};
    /// use shrc::Shrc;
    ///
    /// let owner = Shrc::make((Rc::new(1u8), 5u32));
    /// let number = Shrc::alias(&owner, |pair| &pair.1);
    /// drop(owner);
    /// thread::spawn(move || drop(number)).join().unwrap();
    /// ```
    pub fn alias<U: ?Sized>(this: &Self, project: impl FnOnce(&T) -> &U) -> Shrc<U>
    where
        T: Send + Sync + 'static,
    {
        match Shrc::get(this) {
            Some(payload) => {
                let ptr = NonNull::from(project(payload));
                unsafe { Shrc::rebind(this, ptr, false) }
            }
            None => Shrc::null(),
        }
    }

    /// Like [`Shrc::alias`], but moves this handle's ownership instead of adding an owner.
    pub fn alias_into<U: ?Sized>(this: Self, project: impl FnOnce(&T) -> &U) -> Shrc<U>
    where
        T: Send + Sync + 'static,
    {
        let Some(payload) = Shrc::get(&this) else {
            return Shrc::null();
        };
        let ptr = NonNull::from(project(payload));
        unsafe { Shrc::rebind_into(this, ptr, false) }
    }
}

impl<T: ?Sized + SharedFromThis> Shrc<T> {
    /// Like [`Shrc::from_box`], and wires the value so it can call
    /// [`shared_from_this`](SharedFromThis::shared_from_this).
    #[inline]
    pub fn from_box_enabled(value: Box<T>) -> Self {
        or_alloc_error(Self::try_from_box_enabled(value))
    }

    /// Like [`Shrc::from_box_enabled`], but reports allocation failure as an error.
    pub fn try_from_box_enabled(value: Box<T>) -> Result<Self> {
        let ptr = NonNull::from(Box::leak(value));
        unsafe {
            Self::try_adopt(
                ptr,
                default_delete::<T> as fn(NonNull<T>),
                Some(from_this::wire::<T>),
            )
        }
    }

    /// Like [`Shrc::from_raw`], and wires the value.
    ///
    /// # Safety
    /// As for [`Shrc::from_raw`].
    pub unsafe fn from_raw_enabled(ptr: *mut T) -> Self {
        match NonNull::new(ptr) {
            Some(ptr) => unsafe { Self::from_box_enabled(Box::from_raw(ptr.as_ptr())) },
            None => Shrc::null(),
        }
    }

    /// Like [`Shrc::from_raw_with_deleter`], and wires the value.
    ///
    /// # Safety
    /// As for [`Shrc::from_raw_with_deleter`]. In addition, the value must not be owned by any
    /// other `Shrc`.
    pub unsafe fn from_raw_with_deleter_enabled<D>(ptr: NonNull<T>, deleter: D) -> Self
    where
        D: FnOnce(NonNull<T>) + Send + 'static,
    {
        or_alloc_error(unsafe { Self::try_adopt(ptr, deleter, Some(from_this::wire::<T>)) })
    }

    /// Like [`Shrc::reset_box`], and wires the new value.
    pub fn reset_box_enabled(this: &mut Self, value: Box<T>) {
        Shrc::reset(this);
        *this = Shrc::from_box_enabled(value);
    }

    /// Like [`Shrc::reset_with_deleter`], and wires the new value.
    ///
    /// # Safety
    /// As for [`Shrc::from_raw_with_deleter_enabled`].
    pub unsafe fn reset_with_deleter_enabled<D>(this: &mut Self, ptr: NonNull<T>, deleter: D)
    where
        D: FnOnce(NonNull<T>) + Send + 'static,
    {
        Shrc::reset(this);
        *this = unsafe { Shrc::from_raw_with_deleter_enabled(ptr, deleter) };
    }
}

impl<T: ?Sized> Deref for Shrc<T> {
    type Target = T;

    /// Get an immutable reference to the payload.
    ///
    /// # Panics
    /// Panics if the handle is empty. Use [`Shrc::get`] to check first.
    #[inline]
    fn deref(&self) -> &Self::Target {
        match Shrc::get(self) {
            Some(payload) => payload,
            None => panic!("dereferenced an empty Shrc"),
        }
    }
}

impl<T: ?Sized> Drop for Shrc<T> {
    #[inline]
    fn drop(&mut self) {
        if let Some(parts) = self.parts.take() {
            unsafe { ControlBlock::decrement(parts.block) };
        }
    }
}

impl<T: ?Sized> Clone for Shrc<T> {
    /// Clone a `Shrc<T>`, incrementing the count of its control block.
    /// Cloning an empty handle gives an empty handle.
    /// It will panic if the count overflows.
    /// ```
    /// use shrc::Shrc;
    ///
    /// let shrc = Shrc::make(100);
    /// let shrc2 = shrc.clone();
    /// assert!(Shrc::owner_equal(&shrc, &shrc2));
    /// ```
    #[inline]
    fn clone(&self) -> Self {
        if let Some(parts) = self.parts {
            unsafe { parts.block.as_ref() }.increment();
        }
        Shrc {
            parts: self.parts,
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> Default for Shrc<T> {
    /// An empty handle.
    fn default() -> Self {
        Shrc::null()
    }
}

impl<T: ?Sized> AsRef<T> for Shrc<T> {
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T: ?Sized + Debug> Debug for Shrc<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Shrc::get(self) {
            Some(payload) => Debug::fmt(payload, f),
            None => f.write_str("(empty)"),
        }
    }
}

impl<T: ?Sized + Display> Display for Shrc<T> {
    /// Formats the payload.
    ///
    /// # Panics
    /// Panics if the handle is empty.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&**self, f)
    }
}

impl<T: ?Sized> Pointer for Shrc<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ptr = match self.parts {
            Some(parts) => parts.ptr.as_ptr() as *const (),
            None => core::ptr::null(),
        };
        Pointer::fmt(&ptr, f)
    }
}

impl<T> From<T> for Shrc<T> {
    /// Create a new `Shrc<T>` from the provided data. This is equivalent to calling `Shrc::make`.
    /// ```
    /// use shrc::Shrc;
    ///
    /// let shrc = Shrc::from(100);
    /// assert_eq!(*shrc, 100);
    /// ```
    fn from(value: T) -> Self {
        Self::make(value)
    }
}

impl<T: ?Sized> From<Box<T>> for Shrc<T> {
    fn from(value: Box<T>) -> Self {
        Self::from_box(value)
    }
}

impl<T> From<Vec<T>> for Shrc<[T]> {
    fn from(value: Vec<T>) -> Self {
        Self::from_box(value.into_boxed_slice())
    }
}

impl<T: Clone> From<&[T]> for Shrc<[T]> {
    /// From conversion from a reference to a slice of type `T` (&[T]) to a `Shrc<[T]>`.
    ///
    /// ```
    /// use shrc::Shrc;
    ///
    /// let vec = (1..100).collect::<Vec<i32>>();
    /// let slice = &vec[2..5];
    /// let shrc = Shrc::<[i32]>::from(slice);
    /// assert_eq!(&*shrc, slice);
    /// ```
    fn from(value: &[T]) -> Self {
        Self::from_box(Box::from(value))
    }
}

impl<T: ?Sized> Hash for Shrc<T> {
    /// Hash the payload address.
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        Shrc::address(self).hash(state);
    }
}

impl<T: ?Sized, U: ?Sized> PartialEq<Shrc<U>> for Shrc<T> {
    /// Equality of payload addresses, even between different payload types.
    /// ```
    /// use shrc::Shrc;
    ///
    /// let shrc1 = Shrc::make(100);
    /// let shrc2 = Shrc::make(100);
    /// assert!(shrc1 != shrc2);
    /// assert!(shrc1 == shrc1.clone());
    /// ```
    #[inline]
    fn eq(&self, other: &Shrc<U>) -> bool {
        Shrc::address(self) == Shrc::address(other)
    }
}

impl<T: ?Sized> Eq for Shrc<T> {}

impl<T: ?Sized, U: ?Sized> PartialOrd<Shrc<U>> for Shrc<T> {
    /// Ordering of payload addresses. Empty handles order first.
    #[inline]
    fn partial_cmp(&self, other: &Shrc<U>) -> Option<core::cmp::Ordering> {
        Some(Shrc::address(self).cmp(&Shrc::address(other)))
    }
}

impl<T: ?Sized> Ord for Shrc<T> {
    #[inline]
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        Shrc::address(self).cmp(&Shrc::address(other))
    }
}

impl<T: ?Sized> Unpin for Shrc<T> {}

impl<T: ?Sized + RefUnwindSafe> UnwindSafe for Shrc<T> {}

/// A unique handle to a fused block whose payload has not been written yet.
///
/// Created by [`Shrc::make_for_overwrite`]. Writing the payload turns it into a [`Shrc<T>`].
/// Dropping it frees the block without running any destructor for the payload.
/// ```
/// use shrc::Shrc;
///
/// let mut slot = Shrc::<u32>::make_for_overwrite();
/// slot.as_uninit_mut().write(9);
/// let shrc = unsafe { slot.assume_init() };
/// assert_eq!(*shrc, 9);
/// ```
pub struct ShrcUninit<T> {
    block: NonNull<ControlBlock>,
    ptr: NonNull<T>,
    _marker: PhantomData<T>,
}

unsafe impl<T: Send> Send for ShrcUninit<T> {}
unsafe impl<T: Sync> Sync for ShrcUninit<T> {}

impl<T> ShrcUninit<T> {
    /// Returns a pointer to the payload slot.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Returns the payload slot.
    #[inline]
    pub fn as_uninit_mut(&mut self) -> &mut MaybeUninit<T> {
        unsafe { &mut *self.ptr.as_ptr().cast::<MaybeUninit<T>>() }
    }

    /// Writes the payload and returns the first owner of it.
    #[inline]
    pub fn write(self, value: T) -> Shrc<T> {
        unsafe {
            self.ptr.as_ptr().write(value);
            self.assume_init()
        }
    }

    /// Returns the first owner of the payload.
    ///
    /// # Safety
    /// The payload slot must have been fully initialized.
    pub unsafe fn assume_init(self) -> Shrc<T> {
        let this = ManuallyDrop::new(self);
        unsafe {
            FusedBlock::<T>::mark_live(this.block);
            Shrc::adopt_parts(this.block, this.ptr, true)
        }
    }
}

impl<T: SharedFromThis> ShrcUninit<T> {
    /// Like [`ShrcUninit::write`], and wires the payload.
    #[inline]
    pub fn write_enabled(self, value: T) -> Shrc<T> {
        unsafe {
            self.ptr.as_ptr().write(value);
            self.assume_init_enabled()
        }
    }

    /// Like [`ShrcUninit::assume_init`], and wires the payload.
    ///
    /// # Safety
    /// As for [`ShrcUninit::assume_init`].
    pub unsafe fn assume_init_enabled(self) -> Shrc<T> {
        let this = ManuallyDrop::new(self);
        unsafe {
            FusedBlock::<T>::mark_live(this.block);
            from_this::wire(this.ptr, this.block);
            Shrc::adopt_parts(this.block, this.ptr, true)
        }
    }
}

impl<T> Drop for ShrcUninit<T> {
    fn drop(&mut self) {
        unsafe { ControlBlock::decrement(self.block) };
    }
}
