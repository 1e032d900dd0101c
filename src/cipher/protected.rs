use std::fmt::{Debug, Formatter, Result};
use std::ops::Deref;

use zeroize::Zeroize;

/// Scoped key material. The wrapped value is overwritten with zeros when the
/// wrapper goes out of scope, on success and on every error path alike.
pub struct Protected<T>
where
    T: Zeroize,
{
    data: T,
}

impl<T> Deref for Protected<T>
where
    T: Zeroize,
{
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl<T> Protected<T>
where
    T: Zeroize,
{
    pub fn new(value: T) -> Self {
        Protected { data: value }
    }

    pub fn expose(&self) -> &T {
        &self.data
    }

    pub(crate) fn expose_mut(&mut self) -> &mut T {
        &mut self.data
    }
}

impl<T> Drop for Protected<T>
where
    T: Zeroize,
{
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

impl<T> Debug for Protected<T>
where
    T: Zeroize,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_str("[REDACTED]")
    }
}
