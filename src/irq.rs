//! Handing a device context to the interrupt vector.
//!
//! The vector is a plain function with no arguments, so the context it
//! dispatches to lives in a static slot. Binding happens once, from
//! mainline code, before the interrupt is unmasked.

use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

use crate::error::Error;

pub struct IrqSlot<T> {
    target: AtomicPtr<T>,
}

impl<T> Default for IrqSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IrqSlot<T> {
    pub const fn new() -> Self {
        Self {
            target: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Bind `target`; a slot can be bound only once.
    pub fn bind(&self, target: &'static T) -> Result<(), Error> {
        self.target
            .compare_exchange(
                ptr::null_mut(),
                target as *const T as *mut T,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(|_| Error::AlreadyBound)
    }
}

impl<T: Sync> IrqSlot<T> {
    /// The bound context, `None` for a spurious interrupt before binding.
    pub fn get(&self) -> Option<&'static T> {
        let target = self.target.load(Ordering::Acquire);
        // SAFETY: the pointer is null or came from a `&'static T` in `bind`,
        // and it is never replaced afterwards. Only shared references are
        // handed out, and `T: Sync` makes that sound across contexts.
        unsafe { target.as_ref() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static SLOT: IrqSlot<u32> = IrqSlot::new();
    static FIRST: u32 = 1;
    static SECOND: u32 = 2;

    #[test]
    fn binds_once_and_keeps_first_target() {
        let local: IrqSlot<u32> = IrqSlot::new();
        assert!(local.get().is_none());

        assert_eq!(local.bind(&FIRST), Ok(()));
        assert_eq!(local.bind(&SECOND), Err(Error::AlreadyBound));
        assert_eq!(local.get(), Some(&1));
    }

    #[test]
    fn static_slot_is_visible_from_other_threads() {
        SLOT.bind(&FIRST).unwrap();
        let seen = std::thread::spawn(|| SLOT.get().copied()).join().unwrap();
        assert_eq!(seen, Some(1));
    }
}
