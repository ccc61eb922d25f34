//! Exclusive ownership of a publication slot.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lenscast_common::error::{LenscastError, LenscastResult};

/// A logical publication slot ("camera"). Clones share the same claim
/// state, so one `CameraSlot` per logical camera is handed to every
/// pipeline that may target it.
#[derive(Debug, Clone)]
pub struct CameraSlot {
    name: Arc<str>,
    claimed: Arc<AtomicBool>,
}

impl CameraSlot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            claimed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::SeqCst)
    }

    /// Take exclusive ownership, failing if another pipeline holds it.
    pub fn claim(&self) -> LenscastResult<SlotClaim> {
        self.claimed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| LenscastError::slot_busy(self.name()))?;
        Ok(SlotClaim {
            slot: self.clone(),
            released: false,
        })
    }
}

impl fmt::Display for CameraSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Held by an active pipeline. Released on drop.
#[derive(Debug)]
pub struct SlotClaim {
    slot: CameraSlot,
    released: bool,
}

impl SlotClaim {
    pub fn slot(&self) -> &CameraSlot {
        &self.slot
    }

    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.slot.claimed.store(false, Ordering::SeqCst);
        }
    }
}

impl Drop for SlotClaim {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_is_rejected_until_release() {
        let slot = CameraSlot::new("camera");
        let mut first = slot.claim().unwrap();
        assert!(slot.is_claimed());
        assert!(matches!(
            slot.clone().claim(),
            Err(LenscastError::SlotBusy { .. })
        ));

        first.release();
        assert!(!slot.is_claimed());
        let _second = slot.claim().unwrap();
    }

    #[test]
    fn dropping_claim_releases() {
        let slot = CameraSlot::new("camera");
        drop(slot.claim().unwrap());
        assert!(!slot.is_claimed());
    }
}
