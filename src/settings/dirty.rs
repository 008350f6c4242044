use crate::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::ops::{Deref, DerefMut};

/// Value paired with a change flag, driving incremental pipeline updates.
///
/// Mutable access through `DerefMut` raises the flag; `Dirty::clean` lowers
/// it once a pipeline has consumed the value. Newly created, cloned and
/// deserialized values always start flagged, so a fresh pipeline picks
/// everything up on its first update.
///
/// The flag tracks one pipeline's view of the value; sharing a flagged
/// value between several pipelines would clean it for all of them at once.
#[derive(Copy, Debug, Default)]
pub struct Dirty<T> {
    synced: bool,
    inner: T,
}

impl<T> Dirty<T> {
    pub fn new(inner: T) -> Self {
        Self {
            synced: false,
            inner,
        }
    }

    /// Raises the change flag without touching the value.
    pub fn dirty(this: &mut Self) {
        this.synced = false;
    }

    /// The value, only while its change flag is raised.
    pub fn as_dirty(this: &Self) -> Option<&T> {
        if this.synced {
            return None;
        }

        Some(&this.inner)
    }

    /// Hands the value to `apply` if it changed since the last clean, and
    /// reports whether `apply` ran.
    ///
    /// An error from `apply` leaves the flag raised, so the same value is
    /// offered again on the next update.
    pub fn clean(
        this: &mut Self,
        apply: impl FnOnce(&T) -> Result<(), Error>,
    ) -> Result<bool, Error> {
        if this.synced {
            return Ok(false);
        }

        apply(&this.inner)?;
        this.synced = true;

        Ok(true)
    }
}

impl<T: Clone + PartialEq> Dirty<T> {
    /// Edits the value through a callback, raising the flag only if the
    /// edit actually changed something.
    pub fn modify(this: &mut Self, edit: impl FnOnce(&mut T)) {
        let mut edited = this.inner.clone();

        edit(&mut edited);

        if edited != this.inner {
            this.inner = edited;
            this.synced = false;
        }
    }
}

impl<T: Clone> Clone for Dirty<T> {
    fn clone(&self) -> Self {
        Self::new(self.inner.clone())
    }
}

impl<T: PartialEq> PartialEq for Dirty<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T> Deref for Dirty<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> DerefMut for Dirty<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.synced = false;

        &mut self.inner
    }
}

impl<T: Serialize> Serialize for Dirty<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.inner.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Dirty<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::new(T::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_runs_once_per_change() {
        let mut value = Dirty::new(7);

        assert_eq!(Dirty::clean(&mut value, |_| Ok(())).unwrap(), true);
        assert_eq!(Dirty::clean(&mut value, |_| Ok(())).unwrap(), false);

        *value = 8;

        assert_eq!(Dirty::clean(&mut value, |_| Ok(())).unwrap(), true);
    }

    #[test]
    fn a_failed_clean_keeps_the_flag_raised() {
        let mut value = Dirty::new(7);

        let result = Dirty::clean(&mut value, |_| Err(Error::setup("nope")));

        assert!(result.is_err());
        assert!(Dirty::as_dirty(&value).is_some());
    }

    #[test]
    fn modify_ignores_edits_that_change_nothing() {
        let mut value = Dirty::new(7);

        let _ = Dirty::clean(&mut value, |_| Ok(()));

        Dirty::modify(&mut value, |inner| *inner = 7);
        assert!(Dirty::as_dirty(&value).is_none());

        Dirty::modify(&mut value, |inner| *inner = 9);
        assert!(Dirty::as_dirty(&value).is_some());
    }
}
