//! Unified error type for lpc-hid.
//!
//! We avoid `alloc` - all error variants are fieldless and `Copy`.
//! Implements `defmt::Format` (with the `defmt` feature) for on-target logging.

/// Top-level error type used across the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Control pipe
    /// Malformed setup packet or a request this device does not recognise.
    /// The control pipe is stalled; the host restarts with a fresh SETUP.
    Protocol,

    /// A data length disagrees with what was declared: an OUT packet larger
    /// than the remaining transfer, a handler/host `wLength` mismatch, or an
    /// input report payload above the maximum.
    TransferSize,

    /// Well-formed request for a feature this device deliberately lacks
    /// (alternate settings, remote wakeup, SET_DESCRIPTOR, string descriptors).
    Unsupported,

    // Reports
    /// The host deconfigured the device while a report was in flight.
    NotConfigured,

    /// Character has no entry in the 128-entry keymap.
    UnmappedCharacter,

    // Platform
    /// An interrupt context is already bound to the USB vector.
    AlreadyBound,
}
