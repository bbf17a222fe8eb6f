use std::sync::atomic::{AtomicUsize, Ordering};

/// A process-wide counter of live monitored items, for diagnostics.
///
/// Registration happens when a sampler binds (entering `Sampling` or
/// `Reporting`), deregistration when it unbinds (`terminate`, or a
/// transition to `Disabled`). Double-unregister is tolerated: the source
/// may call it from both `terminate` and a subsequent `Drop`.
#[derive(Debug, Default)]
pub struct MonitoredItemRegistry {
    count: AtomicUsize,
}

impl MonitoredItemRegistry {
    pub const fn new() -> Self {
        Self {
            count: AtomicUsize::new(0),
        }
    }

    /// Record a sampler binding. Returns the new live count.
    pub fn register(&self) -> usize {
        self.count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Record a sampler unbind. Idempotent: unregistering twice in a row
    /// (e.g. from `terminate` then a later no-op) saturates at zero
    /// instead of wrapping.
    pub fn unregister(&self) {
        let _ = self
            .count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
                Some(c.saturating_sub(1))
            });
    }

    /// The current number of live (sampler-bound) monitored items.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_unregister_track_count() {
        let registry = MonitoredItemRegistry::new();
        assert_eq!(registry.count(), 0);
        registry.register();
        registry.register();
        assert_eq!(registry.count(), 2);
        registry.unregister();
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn double_unregister_is_tolerated() {
        let registry = MonitoredItemRegistry::new();
        registry.unregister();
        registry.unregister();
        assert_eq!(registry.count(), 0);
    }
}
