//! Per-locator serialization of saves
//!
//! Two saves of the same source must not interleave their overwrite and
//! delete steps. Saves of different sources run freely.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::state::Locator;

type Slot = AsyncMutex<()>;

#[derive(Debug, Default)]
pub struct LocatorLocks {
    slots: Mutex<HashMap<Locator, Weak<Slot>>>,
}

impl LocatorLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other save holds `locator`. The guard releases it on drop.
    pub async fn acquire(&self, locator: &Locator) -> OwnedMutexGuard<()> {
        let slot = self.slot(locator);
        slot.lock_owned().await
    }

    /// Number of locators with a live lock (held or awaited)
    pub fn active(&self) -> usize {
        match self.slots.lock() {
            Ok(slots) => slots.values().filter(|w| w.strong_count() > 0).count(),
            Err(poisoned) => poisoned
                .into_inner()
                .values()
                .filter(|w| w.strong_count() > 0)
                .count(),
        }
    }

    fn slot(&self, locator: &Locator) -> Arc<Slot> {
        // The map only holds weak handles; a poisoned map is still usable
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.retain(|_, weak| weak.strong_count() > 0);

        if let Some(slot) = slots.get(locator).and_then(Weak::upgrade) {
            return slot;
        }
        let slot = Arc::new(AsyncMutex::new(()));
        slots.insert(locator.clone(), Arc::downgrade(&slot));
        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_locator_is_exclusive() {
        let locks = Arc::new(LocatorLocks::new());
        let a = Locator::new("a");

        let guard = locks.acquire(&a).await;
        let waiter = {
            let locks = Arc::clone(&locks);
            let a = a.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&a).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_locators_do_not_block() {
        let locks = LocatorLocks::new();
        let _a = locks.acquire(&Locator::new("a")).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(&Locator::new("b"))).await;
        assert!(b.is_ok());
        assert_eq!(locks.active(), 2);
    }

    #[tokio::test]
    async fn test_released_slots_are_pruned() {
        let locks = LocatorLocks::new();
        drop(locks.acquire(&Locator::new("a")).await);
        assert_eq!(locks.active(), 0);
    }
}
