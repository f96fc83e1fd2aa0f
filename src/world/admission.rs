use std::sync::atomic::{AtomicBool, Ordering};

/// Capacity-1 admission slot serializing world creation and loading
/// system-wide.
///
/// Admission is two-phased: [`AdmissionSlot::is_busy`] is a cheap optimistic
/// check callers use to bail out early, [`AdmissionSlot::try_acquire`] is
/// the authoritative compare-exchange. A caller that passes the optimistic
/// check can still lose the exchange to a concurrent caller and must treat
/// that as busy. The slot stays held through the asynchronous phase of the
/// admitted operation and is returned by [`AdmissionSlot::release`].
pub struct AdmissionSlot {
    engaged: AtomicBool,
}

impl AdmissionSlot {
    pub fn new() -> Self {
        Self {
            engaged: AtomicBool::new(false),
        }
    }

    /// Optimistic fast-path check; may race with concurrent acquisition.
    pub fn is_busy(&self) -> bool {
        self.engaged.load(Ordering::Acquire)
    }

    /// Take the slot without blocking. Exactly one of any set of concurrent
    /// callers succeeds.
    pub fn try_acquire(&self) -> bool {
        self.engaged
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Return the slot, admitting the next operation. Called exactly once
    /// per successful `try_acquire`.
    pub fn release(&self) {
        self.engaged.store(false, Ordering::Release);
    }
}

impl Default for AdmissionSlot {
    fn default() -> Self {
        Self::new()
    }
}
