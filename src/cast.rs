//! Conversions between handles that share one control block.
//!
//! Every successful cast produces a new owner of the same block: the count is incremented and the
//! payload pointer is recomputed for the target type. Handles compare by payload address and by
//! owner separately, so a cast handle is [`Shrc::owner_equal`] to its source even when the
//! addresses differ.

use core::{any::Any, fmt, ops::Deref, ptr::NonNull};

use crate::shrc::Shrc;

/// An immutable view of a `T`.
///
/// `Shrc<Const<T>>` shares ownership of a `T` without ever granting `&mut T`, not even through
/// [`Shrc::get_mut`] on a unique handle. Convert with [`Shrc::as_const`] and
/// [`const_pointer_cast`].
#[repr(transparent)]
pub struct Const<T: ?Sized>(T);

impl<T: ?Sized> Deref for Const<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Const<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl<T: ?Sized> Shrc<T> {
    /// Returns a new owner of the same object that only allows immutable access.
    /// ```
    /// use shrc::Shrc;
    ///
    /// let shrc = Shrc::make(String::from("fixed"));
    /// let view = Shrc::as_const(&shrc);
    /// assert_eq!(view.len(), 5);
    /// assert!(Shrc::owner_equal(&shrc, &view));
    /// ```
    pub fn as_const(this: &Self) -> Shrc<Const<T>> {
        match Shrc::as_ptr(this) {
            Some(ptr) => unsafe { Shrc::rebind(this, const_view(ptr), true) },
            None => Shrc::null(),
        }
    }

    /// Converts this handle into an immutable view without touching the count.
    pub fn into_const(this: Self) -> Shrc<Const<T>> {
        match Shrc::as_ptr(&this) {
            Some(ptr) => unsafe { Shrc::rebind_into(this, const_view(ptr), true) },
            None => Shrc::null(),
        }
    }
}

impl Shrc<dyn Any> {
    /// Casts to the concrete type `U`, or returns an empty handle if the payload is not a `U`.
    /// ```
    /// use std::any::Any;
    /// use shrc::{static_pointer_cast, Shrc};
    ///
    /// let shrc = Shrc::make(7u32);
    /// let any = static_pointer_cast(&shrc, |v| v as &dyn Any);
    /// assert_eq!(*any.downcast::<u32>(), 7);
    /// assert!(Shrc::is_null(&any.downcast::<i64>()));
    /// ```
    pub fn downcast<U: Any>(&self) -> Shrc<U> {
        downcast_any(self, |v| v.is::<U>())
    }
}

impl Shrc<dyn Any + Send + Sync> {
    /// Casts to the concrete type `U`, or returns an empty handle if the payload is not a `U`.
    pub fn downcast<U: Any>(&self) -> Shrc<U> {
        downcast_any(self, |v| v.is::<U>())
    }
}

/// The payload is exactly a `U`, so a writable handle stays writable.
fn downcast_any<A: ?Sized, U>(any: &Shrc<A>, is: impl FnOnce(&A) -> bool) -> Shrc<U> {
    let Some(ptr) = Shrc::as_ptr(any) else {
        return Shrc::null();
    };
    if !is(unsafe { ptr.as_ref() }) {
        return Shrc::null();
    }
    unsafe { Shrc::rebind(any, ptr.cast::<U>(), true) }
}

fn const_view<T: ?Sized>(ptr: NonNull<T>) -> NonNull<Const<T>> {
    // `Const<T>` is a transparent wrapper around `T`.
    unsafe { NonNull::new_unchecked(ptr.as_ptr() as *mut Const<T>) }
}

/// Shares ownership under a type the compiler can check statically, such as a trait object or a
/// field of the payload.
///
/// As with [`Shrc::alias`], the payload must be `Send + Sync` and the result is read-only.
/// ```
/// use std::fmt::Display;
/// use shrc::{static_pointer_cast, Shrc};
///
/// let shrc = Shrc::make(42);
/// let shown = static_pointer_cast(&shrc, |v| v as &dyn Display);
/// assert_eq!(shown.to_string(), "42");
/// assert_eq!(Shrc::use_count(&shrc), 2);
/// ```
pub fn static_pointer_cast<T, U>(ptr: &Shrc<T>, cast: impl FnOnce(&T) -> &U) -> Shrc<U>
where
    T: ?Sized + Send + Sync + 'static,
    U: ?Sized,
{
    Shrc::alias(ptr, cast)
}

/// Removes the immutable view added by [`Shrc::as_const`].
/// ```
/// use shrc::{const_pointer_cast, Shrc};
///
/// let view = Shrc::into_const(Shrc::make(vec![1, 2]));
/// let mut shrc = const_pointer_cast(&view);
/// drop(view);
/// Shrc::get_mut(&mut shrc).unwrap().push(3);
/// assert_eq!(*shrc, [1, 2, 3]);
/// ```
pub fn const_pointer_cast<T: ?Sized>(ptr: &Shrc<Const<T>>) -> Shrc<T> {
    match Shrc::as_ptr(ptr) {
        Some(view) => unsafe {
            Shrc::rebind(ptr, NonNull::new_unchecked(view.as_ptr() as *mut T), true)
        },
        None => Shrc::null(),
    }
}

/// Shares ownership while reinterpreting the payload as a `U`.
///
/// The result is read-only, like any view.
///
/// # Safety
/// The payload must be valid to read as a `U` for as long as the returned handle lives. If `U`
/// is `Send` or `Sync`, the payload must be safe to destroy on another thread.
/// ```
/// use shrc::{reinterpret_pointer_cast, Shrc};
///
/// #[repr(transparent)]
/// struct Meters(f64);
///
/// let shrc = Shrc::make(Meters(2.5));
/// let raw = unsafe { reinterpret_pointer_cast::<_, f64>(&shrc) };
/// assert_eq!(*raw, 2.5);
/// ```
pub unsafe fn reinterpret_pointer_cast<T: ?Sized, U>(ptr: &Shrc<T>) -> Shrc<U> {
    match Shrc::as_ptr(ptr) {
        Some(payload) => unsafe { Shrc::rebind(ptr, payload.cast::<U>(), false) },
        None => Shrc::null(),
    }
}

/// Shares ownership under a type that is checked at runtime.
///
/// If `check` rejects the payload, the result is an empty handle and the count is untouched.
/// As with [`Shrc::alias`], the payload must be `Send + Sync` and the result is read-only.
/// ```
/// use std::any::Any;
/// use shrc::{dynamic_pointer_cast, static_pointer_cast, Shrc};
///
/// let shrc = Shrc::make(String::from("text"));
/// let any = static_pointer_cast(&shrc, |v| v as &(dyn Any + Send + Sync));
/// let back = dynamic_pointer_cast(&any, |v| v.downcast_ref::<String>());
/// assert_eq!(back.len(), 4);
/// assert!(Shrc::is_null(&dynamic_pointer_cast(&any, |v| v.downcast_ref::<u8>())));
/// ```
pub fn dynamic_pointer_cast<T, U>(ptr: &Shrc<T>, check: impl FnOnce(&T) -> Option<&U>) -> Shrc<U>
where
    T: ?Sized + Send + Sync + 'static,
    U: ?Sized,
{
    let Some(target) = Shrc::get(ptr).and_then(check).map(NonNull::from) else {
        return Shrc::null();
    };
    unsafe { Shrc::rebind(ptr, target, false) }
}
