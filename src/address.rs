use core::fmt;

/// A pointer address, used to compare and hash handles by identity rather than by value.
///
/// The address of an empty handle is [`Address::NULL`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(usize);

impl Address {
    /// The address of nothing
    pub const NULL: Address = Address(0);

    /// Returns true if this is the address of nothing
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Returns the address as an integer
    pub fn get(self) -> usize {
        self.0
    }
}

impl<T: ?Sized> From<*const T> for Address {
    fn from(pointer: *const T) -> Self {
        Self(pointer as *const () as usize)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
