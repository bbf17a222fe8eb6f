//! The host-facing collaborator trait: stands in for the address space
//! and event dispatch a real OPC UA server provides.

use async_trait::async_trait;

use crate::types::{AttributeId, DataValue};

/// An opaque handle to an event subscription registered via
/// [`NodeSource::on_value_changed`] or [`NodeSource::on_attribute_changed`],
/// released with [`NodeSource::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(pub u64);

/// Invoked with a freshly observed reading whenever a subscribed event
/// fires. Must not block; the call happens synchronously from whatever
/// context produced the change.
pub type ChangeHandler = Box<dyn Fn(DataValue) + Send + Sync>;

/// The node attribute collaborator a [`crate::monitored_item::MonitoredItem`]
/// binds to. A host implements this over its real address space; this
/// crate only ever holds an `Arc<dyn NodeSource>` and never owns node
/// lifetime.
#[async_trait]
pub trait NodeSource: Send + Sync {
    /// Synchronous read of a non-`Value` attribute, used for the
    /// initial sample on bind when `attribute_id != Value`.
    fn read_attribute(&self, attribute_id: AttributeId) -> DataValue;

    /// Asynchronous read of the `Value` attribute, used for the initial
    /// sample of an exception-based (`sampling_interval == 0`) item.
    async fn read_value(&self) -> DataValue;

    /// The node's engineering-unit range, if it has one. Required for
    /// `DeadbandType::Percent` filters; absent on non-analog nodes.
    fn eu_range(&self) -> Option<(f64, f64)>;

    /// Subscribe to the node's `value_changed` event. Returns a token to
    /// pass to [`NodeSource::off`] on unbind.
    fn on_value_changed(&self, handler: ChangeHandler) -> SubscriptionToken;

    /// Subscribe to the per-attribute change event for `attribute_id`.
    fn on_attribute_changed(
        &self,
        attribute_id: AttributeId,
        handler: ChangeHandler,
    ) -> SubscriptionToken;

    /// Release a subscription previously returned by `on_value_changed`
    /// or `on_attribute_changed`.
    fn off(&self, token: SubscriptionToken);
}

/// An in-memory [`NodeSource`] for tests, gated behind the `test-util`
/// feature so it is available both to this crate's own unit tests and to
/// the black-box integration suite under `tests/`.
#[cfg(any(test, feature = "test-util"))]
pub mod testing {
    use std::sync::atomic::{AtomicU64, Ordering};

    use hashbrown::HashMap;
    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct Listeners {
        value: HashMap<u64, ChangeHandler>,
        attribute: HashMap<AttributeId, HashMap<u64, ChangeHandler>>,
    }

    /// A node backed by plain in-memory state: a current value, optional
    /// EURange, and per-attribute readings, with listener bookkeeping
    /// that fires synchronously when values are pushed through
    /// [`TestNode::set_value`] / [`TestNode::set_attribute`].
    pub struct TestNode {
        value: Mutex<DataValue>,
        eu_range: Option<(f64, f64)>,
        attributes: Mutex<HashMap<AttributeId, DataValue>>,
        listeners: Mutex<Listeners>,
        next_token: AtomicU64,
    }

    impl TestNode {
        pub fn new(initial_value: DataValue) -> Self {
            Self {
                value: Mutex::new(initial_value),
                eu_range: None,
                attributes: Mutex::new(HashMap::new()),
                listeners: Mutex::new(Listeners::default()),
                next_token: AtomicU64::new(1),
            }
        }

        pub fn with_eu_range(mut self, low: f64, high: f64) -> Self {
            self.eu_range = Some((low, high));
            self
        }

        /// Push a new `Value` reading, firing any registered value
        /// listener.
        pub fn set_value(&self, value: DataValue) {
            *self.value.lock() = value.clone();
            for handler in self.listeners.lock().value.values() {
                handler(value.clone());
            }
        }

        /// Push a new reading for a non-`Value` attribute, firing any
        /// registered listener for that attribute.
        pub fn set_attribute(&self, attribute_id: AttributeId, value: DataValue) {
            self.attributes
                .lock()
                .insert(attribute_id, value.clone());
            if let Some(handlers) = self.listeners.lock().attribute.get(&attribute_id) {
                for handler in handlers.values() {
                    handler(value.clone());
                }
            }
        }

        fn next_token(&self) -> u64 {
            self.next_token.fetch_add(1, Ordering::Relaxed)
        }
    }

    #[async_trait]
    impl NodeSource for TestNode {
        fn read_attribute(&self, attribute_id: AttributeId) -> DataValue {
            self.attributes
                .lock()
                .get(&attribute_id)
                .cloned()
                .unwrap_or_default()
        }

        async fn read_value(&self) -> DataValue {
            self.value.lock().clone()
        }

        fn eu_range(&self) -> Option<(f64, f64)> {
            self.eu_range
        }

        fn on_value_changed(&self, handler: ChangeHandler) -> SubscriptionToken {
            let token = self.next_token();
            self.listeners.lock().value.insert(token, handler);
            SubscriptionToken(token)
        }

        fn on_attribute_changed(
            &self,
            attribute_id: AttributeId,
            handler: ChangeHandler,
        ) -> SubscriptionToken {
            let token = self.next_token();
            self.listeners
                .lock()
                .attribute
                .entry(attribute_id)
                .or_default()
                .insert(token, handler);
            SubscriptionToken(token)
        }

        fn off(&self, token: SubscriptionToken) {
            let mut listeners = self.listeners.lock();
            listeners.value.remove(&token.0);
            for handlers in listeners.attribute.values_mut() {
                handlers.remove(&token.0);
            }
        }
    }
}
