//! The observer at the center of the engine: holds parameters, queue,
//! filter and state, and binds to a node attribute via a [`Sampler`].

use std::mem;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use tracing_futures::Instrument;

use crate::filter;
use crate::node_source::NodeSource;
use crate::normalize::{NormalizeError, ParameterNormaliser};
use crate::queue::NotificationQueue;
use crate::registry::MonitoredItemRegistry;
use crate::sampler::Sampler;
use crate::sync::Mutex;
use crate::types::{
    DataChangeFilter, DataValue, MonitoredItemNotification, MonitoringMode, MonitoringParameters,
    NumericRange, ReadValueId, StatusCode, TimestampsToReturn,
};

/// The periodic-sampling callback supplied by the owning subscription at
/// creation time, invoked by the `Timer` strategy. Reads "the
/// current value" (or whatever the subscription's sampling policy is)
/// and resolves with the result; the engine alone decides whether the
/// result is reportable.
pub type SamplingFn = Arc<dyn Fn() -> BoxFuture<'static, DataValue> + Send + Sync>;

/// The outcome of a [`MonitoredItem::modify`] call. A
/// `DataChangeFilter` carries no result structure of its own, so unlike
/// the OPC UA wire message this has no `filter_result` field at all
/// rather than a field that is always null.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModifyResult {
    pub status: StatusCode,
    pub revised_sampling_interval_ms: f64,
    pub revised_queue_size: usize,
}

struct Inner {
    client_handle: u32,
    sampling_interval_ms: f64,
    discard_oldest: bool,
    filter: Option<DataChangeFilter>,
    monitoring_mode: Option<MonitoringMode>,
    timestamps_to_return: TimestampsToReturn,
    queue: NotificationQueue,
    old_reading: DataValue,
    sampler: Sampler,
    is_sampling: bool,
    pending_unbind: bool,
}

/// The per-subscription observer of one `(node, attribute, index range)`
/// triple.
///
/// Always held as `Arc<MonitoredItem>`: the periodic timer sampler spawns
/// a task that needs a weak handle back into the item, so the item must
/// outlive any single owner. Internal state lives behind a
/// [`crate::sync::Mutex`], so every public method takes `&self`.
pub struct MonitoredItem {
    monitored_item_id: u32,
    item_to_monitor: ReadValueId,
    node: Arc<dyn NodeSource>,
    sampling_fn: SamplingFn,
    registry: Arc<MonitoredItemRegistry>,
    inner: Mutex<Inner>,
}

impl MonitoredItem {
    /// Create a new item in the internal `Invalid` state
    /// (`monitoring_mode() == None`). There is deliberately no way to
    /// pass a `MonitoringMode` here: `MonitoringParameters` has no such
    /// field, so a monitored item can never be constructed already in an
    /// active mode; that is enforced by the type rather than by a runtime
    /// check.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        monitored_item_id: u32,
        params: MonitoringParameters,
        item_to_monitor: ReadValueId,
        timestamps_to_return: TimestampsToReturn,
        node: Arc<dyn NodeSource>,
        sampling_fn: SamplingFn,
        normaliser: &ParameterNormaliser,
        registry: Arc<MonitoredItemRegistry>,
    ) -> Result<Arc<Self>, StatusCode> {
        let eu_range = node.eu_range();
        let normalised = normaliser
            .normalize(&params, item_to_monitor.attribute_id, eu_range)
            .map_err(NormalizeError::status_code)?;

        let inner = Inner {
            client_handle: params.client_handle,
            sampling_interval_ms: normalised.sampling_interval_ms,
            discard_oldest: normalised.discard_oldest,
            filter: normalised.filter,
            monitoring_mode: None,
            timestamps_to_return,
            queue: NotificationQueue::new(normalised.queue_size),
            old_reading: DataValue::new_status(StatusCode::BAD_DATA_UNAVAILABLE, chrono::Utc::now()),
            sampler: Sampler::Unbound,
            is_sampling: false,
            pending_unbind: false,
        };

        Ok(Arc::new(Self {
            monitored_item_id,
            item_to_monitor,
            node,
            sampling_fn,
            registry,
            inner: Mutex::new(inner),
        }))
    }

    pub fn monitored_item_id(&self) -> u32 {
        self.monitored_item_id
    }

    pub fn client_handle(&self) -> u32 {
        self.inner.lock().client_handle
    }

    pub fn is_sampling(&self) -> bool {
        self.inner.lock().is_sampling
    }

    pub fn queue_length(&self) -> usize {
        self.inner.lock().queue.len()
    }

    pub fn overflow(&self) -> bool {
        self.inner.lock().queue.has_overflowed()
    }

    pub fn monitoring_mode(&self) -> Option<MonitoringMode> {
        self.inner.lock().monitoring_mode
    }

    /// Transition the state machine. `Invalid` (the internal `None`
    /// sentinel) is not reachable as a target: there is no variant for it
    /// to pass.
    pub fn set_monitoring_mode(self: &Arc<Self>, new_mode: MonitoringMode) {
        let mut inner = self.inner.lock();
        if inner.monitoring_mode == Some(new_mode) {
            return;
        }

        let was_active = matches!(
            inner.monitoring_mode,
            Some(MonitoringMode::Sampling | MonitoringMode::Reporting)
        );
        let becomes_active = matches!(
            new_mode,
            MonitoringMode::Sampling | MonitoringMode::Reporting
        );

        if !was_active && becomes_active {
            inner.monitoring_mode = Some(new_mode);
            self.bind_sampler(&mut inner);
        } else if was_active && !becomes_active {
            inner.monitoring_mode = Some(MonitoringMode::Disabled);
            self.unbind_sampler(&mut inner);
            let capacity = inner.queue.capacity();
            inner.queue = NotificationQueue::new(capacity);
        } else {
            // Sampling <-> Reporting (sampler untouched), or a
            // Disabled/Invalid item moved straight to Disabled.
            inner.monitoring_mode = Some(new_mode);
        }

        debug!(item = self.monitored_item_id, ?new_mode, "monitoring mode set");
    }

    /// Apply revised parameters. Resizes the queue in place and,
    /// if the sampling interval changed while a timer is bound, restarts
    /// it with the new period.
    pub fn modify(
        self: &Arc<Self>,
        timestamps_to_return: TimestampsToReturn,
        params: MonitoringParameters,
        normaliser: &ParameterNormaliser,
    ) -> Result<ModifyResult, StatusCode> {
        let eu_range = self.node.eu_range();
        let normalised = normaliser
            .normalize(&params, self.item_to_monitor.attribute_id, eu_range)
            .map_err(NormalizeError::status_code)?;

        let mut inner = self.inner.lock();
        let interval_changed = inner.sampling_interval_ms != normalised.sampling_interval_ms;

        inner.client_handle = params.client_handle;
        inner.timestamps_to_return = timestamps_to_return;
        inner.discard_oldest = normalised.discard_oldest;
        inner.filter = normalised.filter;
        inner.sampling_interval_ms = normalised.sampling_interval_ms;
        let discard_oldest = inner.discard_oldest;
        inner.queue.resize(normalised.queue_size, discard_oldest);

        if interval_changed && matches!(inner.sampler, Sampler::Timer(_)) {
            if let Sampler::Timer(old) = mem::replace(&mut inner.sampler, Sampler::Unbound) {
                old.abort();
            }
            let handle = self.spawn_timer(inner.sampling_interval_ms, false);
            inner.sampler = Sampler::Timer(handle);
        }

        Ok(ModifyResult {
            status: StatusCode::GOOD,
            revised_sampling_interval_ms: inner.sampling_interval_ms,
            revised_queue_size: inner.queue.capacity(),
        })
    }

    /// Idempotent: unbind the sampler. The queue, if any readings remain
    /// unread, is left in place but no longer fed.
    pub fn terminate(self: &Arc<Self>) {
        let mut inner = self.inner.lock();
        self.unbind_sampler(&mut inner);
    }

    /// Drain and return pending notifications with timestamps normalised
    /// per `timestamps_to_return`. Returns empty (and does not drain)
    /// unless the item is in `Reporting` mode.
    pub fn extract_notifications(&self) -> Vec<MonitoredItemNotification> {
        let mut inner = self.inner.lock();
        if inner.monitoring_mode != Some(MonitoringMode::Reporting) {
            return Vec::new();
        }
        let client_handle = inner.client_handle;
        let timestamps_to_return = inner.timestamps_to_return;
        inner
            .queue
            .extract()
            .into_iter()
            .map(|value| MonitoredItemNotification {
                client_handle,
                value: value.with_timestamps_to_return(timestamps_to_return),
            })
            .collect()
    }

    /// The single ingestion path from any sampler.
    pub fn record_value(&self, reading: DataValue, index_range: NumericRange) {
        let mut inner = self.inner.lock();
        self.ingest_locked(&mut inner, reading, index_range, false);
    }

    /// Core of `record_value`, operating on an already-locked `inner` so
    /// it can be shared between callers that take the lock themselves
    /// (`record_value`, `finish_sample`) and callers that already hold it
    /// (the synchronous initial read inside `bind_sampler`).
    fn ingest_locked(
        &self,
        inner: &mut Inner,
        reading: DataValue,
        index_range: NumericRange,
        bypass_filter: bool,
    ) {
        if !index_range.overlaps(&self.item_to_monitor.index_range) {
            trace!(item = self.monitored_item_id, "index range does not overlap, discarding");
            return;
        }
        if !matches!(
            inner.monitoring_mode,
            Some(MonitoringMode::Sampling | MonitoringMode::Reporting)
        ) {
            return;
        }

        let narrowed_value = match &reading.value {
            Some(v) => match self.item_to_monitor.index_range.apply(v) {
                Ok(sliced) => Some(sliced),
                Err(status) => {
                    warn!(item = self.monitored_item_id, %status, "malformed reading dropped");
                    return;
                }
            },
            None => None,
        };
        let narrowed = DataValue {
            value: narrowed_value,
            ..reading
        };

        let should_report = bypass_filter
            || filter::should_report(
                &narrowed,
                &inner.old_reading,
                inner.filter.as_ref(),
                self.node.eu_range(),
            );
        if !should_report {
            return;
        }

        let discard_oldest = inner.discard_oldest;
        inner.queue.push(narrowed.clone(), discard_oldest);
        inner.old_reading = narrowed;
    }

    fn begin_sample(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.is_sampling {
            warn!(
                item = self.monitored_item_id,
                "sampler tick observed an in-flight sample; skipping"
            );
            false
        } else {
            inner.is_sampling = true;
            true
        }
    }

    fn finish_sample(&self, reading: DataValue, bypass_filter: bool) {
        let mut inner = self.inner.lock();
        self.ingest_locked(&mut inner, reading, NumericRange::None, bypass_filter);
        inner.is_sampling = false;
        if inner.pending_unbind {
            inner.pending_unbind = false;
            self.release_sampler(&mut inner);
        }
    }

    /// Bind the sampler strategy appropriate to this item's attribute
    /// and sampling interval, and deliver the initial sample
    /// unconditionally.
    fn bind_sampler(self: &Arc<Self>, inner: &mut Inner) {
        let attribute_id = self.item_to_monitor.attribute_id;

        if !attribute_id.is_value() {
            inner.sampling_interval_ms = 0.0;
            let weak = Arc::downgrade(self);
            let token = self.node.on_attribute_changed(
                attribute_id,
                Box::new(move |reading| {
                    if let Some(item) = weak.upgrade() {
                        item.record_value(reading, NumericRange::None);
                    }
                }),
            );
            inner.sampler = Sampler::AttributeEvent(token);
            self.registry.register();

            if self.begin_sample_locked(inner) {
                let initial = self.node.read_attribute(attribute_id);
                self.ingest_locked(inner, initial, NumericRange::None, true);
                inner.is_sampling = false;
            }
        } else if inner.sampling_interval_ms == 0.0 {
            let weak = Arc::downgrade(self);
            let token = self.node.on_value_changed(Box::new(move |reading| {
                if let Some(item) = weak.upgrade() {
                    item.record_value(reading, NumericRange::None);
                }
            }));
            inner.sampler = Sampler::ValueEvent(token);
            self.registry.register();

            let node = self.node.clone();
            let weak = Arc::downgrade(self);
            let span = tracing::debug_span!("initial_sample", item = self.monitored_item_id);
            tokio::task::spawn(
                async move {
                    if let Some(item) = weak.upgrade() {
                        if item.begin_sample() {
                            let reading = node.read_value().await;
                            item.finish_sample(reading, true);
                        }
                    }
                }
                .instrument(span),
            );
        } else {
            let handle = self.spawn_timer(inner.sampling_interval_ms, true);
            inner.sampler = Sampler::Timer(handle);
            self.registry.register();
        }
    }

    /// Like [`MonitoredItem::begin_sample`], but for use while `inner`'s
    /// lock is already held by the caller (bind happens under the lock).
    fn begin_sample_locked(&self, inner: &mut Inner) -> bool {
        if inner.is_sampling {
            false
        } else {
            inner.is_sampling = true;
            true
        }
    }

    fn spawn_timer(self: &Arc<Self>, sampling_interval_ms: f64, bypass_first: bool) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let sampling_fn = self.sampling_fn.clone();
        let period = Duration::from_millis(sampling_interval_ms.max(1.0) as u64);
        let span = tracing::debug_span!("sampling_timer", item = self.monitored_item_id);
        tokio::task::spawn(
            async move {
                let mut ticker = tokio::time::interval(period);
                let mut first = bypass_first;
                loop {
                    ticker.tick().await;
                    let Some(item) = weak.upgrade() else {
                        break;
                    };
                    if item.begin_sample() {
                        let reading = (sampling_fn)().await;
                        item.finish_sample(reading, first);
                    }
                    first = false;
                }
            }
            .instrument(span),
        )
    }

    fn unbind_sampler(&self, inner: &mut Inner) {
        if !inner.sampler.is_bound() {
            return;
        }
        if inner.is_sampling {
            inner.pending_unbind = true;
            return;
        }
        self.release_sampler(inner);
    }

    fn release_sampler(&self, inner: &mut Inner) {
        match mem::replace(&mut inner.sampler, Sampler::Unbound) {
            Sampler::Unbound => return,
            Sampler::Timer(handle) => handle.abort(),
            Sampler::AttributeEvent(token) | Sampler::ValueEvent(token) => self.node.off(token),
        }
        self.registry.unregister();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_source::testing::TestNode;
    use crate::normalize::ServerLimits;
    use crate::types::{AttributeId, DataChangeTrigger, DeadbandType, NodeId};

    fn read_value_id(attribute_id: AttributeId) -> ReadValueId {
        ReadValueId {
            node_id: NodeId::numeric(1, 1),
            attribute_id,
            index_range: NumericRange::None,
            data_encoding: None,
        }
    }

    fn params() -> MonitoringParameters {
        MonitoringParameters {
            client_handle: 42,
            sampling_interval: Some(0.0),
            filter: None,
            queue_size: 3,
            discard_oldest: true,
        }
    }

    fn no_op_sampling_fn() -> SamplingFn {
        Arc::new(|| Box::pin(async { DataValue::default() }))
    }

    #[tokio::test]
    async fn initial_sample_on_enable() {
        let node: Arc<dyn NodeSource> = Arc::new(TestNode::new(DataValue::new_now(7i32, chrono::Utc::now())));
        let normaliser = ParameterNormaliser::new(ServerLimits::default());
        let registry = Arc::new(MonitoredItemRegistry::new());
        let item = MonitoredItem::create(
            1,
            params(),
            read_value_id(AttributeId::Value),
            TimestampsToReturn::Both,
            node,
            no_op_sampling_fn(),
            &normaliser,
            registry,
        )
        .unwrap();

        assert_eq!(item.monitoring_mode(), None);
        item.set_monitoring_mode(MonitoringMode::Reporting);
        // Let the spawned initial-read task run.
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let notifications = item.extract_notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].client_handle, 42);
    }

    #[tokio::test]
    async fn disable_clears_queue_and_unbinds_sampler() {
        let node: Arc<dyn NodeSource> = Arc::new(TestNode::new(DataValue::new_now(1i32, chrono::Utc::now())));
        let normaliser = ParameterNormaliser::new(ServerLimits::default());
        let registry = Arc::new(MonitoredItemRegistry::new());
        let item = MonitoredItem::create(
            1,
            params(),
            read_value_id(AttributeId::Value),
            TimestampsToReturn::Both,
            node,
            no_op_sampling_fn(),
            &normaliser,
            registry.clone(),
        )
        .unwrap();

        item.set_monitoring_mode(MonitoringMode::Reporting);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(registry.count(), 1);

        item.set_monitoring_mode(MonitoringMode::Disabled);
        assert_eq!(item.queue_length(), 0);
        assert!(!item.overflow());
        assert_eq!(registry.count(), 0);
    }

    #[tokio::test]
    async fn same_mode_transition_is_a_no_op() {
        let node: Arc<dyn NodeSource> = Arc::new(TestNode::new(DataValue::new_now(1i32, chrono::Utc::now())));
        let normaliser = ParameterNormaliser::new(ServerLimits::default());
        let registry = Arc::new(MonitoredItemRegistry::new());
        let item = MonitoredItem::create(
            1,
            params(),
            read_value_id(AttributeId::Value),
            TimestampsToReturn::Both,
            node,
            no_op_sampling_fn(),
            &normaliser,
            registry.clone(),
        )
        .unwrap();

        item.set_monitoring_mode(MonitoringMode::Reporting);
        tokio::time::sleep(Duration::from_millis(10)).await;
        let _ = item.extract_notifications();
        item.set_monitoring_mode(MonitoringMode::Reporting);
        assert_eq!(registry.count(), 1);
    }

    #[tokio::test]
    async fn write_out_of_range_passthrough() {
        let node: Arc<dyn NodeSource> = Arc::new(TestNode::new(DataValue::new_now(1.0, chrono::Utc::now())));
        let normaliser = ParameterNormaliser::new(ServerLimits::default());
        let registry = Arc::new(MonitoredItemRegistry::new());
        let item = MonitoredItem::create(
            1,
            params(),
            read_value_id(AttributeId::Value),
            TimestampsToReturn::Both,
            node,
            no_op_sampling_fn(),
            &normaliser,
            registry,
        )
        .unwrap();

        item.set_monitoring_mode(MonitoringMode::Reporting);
        tokio::time::sleep(Duration::from_millis(10)).await;
        let _ = item.extract_notifications();

        let rejected = DataValue::new_status(StatusCode::BAD_OUT_OF_RANGE, chrono::Utc::now());
        item.record_value(rejected, NumericRange::None);
        let notifications = item.extract_notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].value.status, StatusCode::BAD_OUT_OF_RANGE);
    }

    #[tokio::test]
    async fn deadband_filter_suppresses_small_changes() {
        let node: Arc<dyn NodeSource> = Arc::new(TestNode::new(DataValue::new_now(10.0, chrono::Utc::now())));
        let normaliser = ParameterNormaliser::new(ServerLimits::default());
        let registry = Arc::new(MonitoredItemRegistry::new());
        let mut p = params();
        p.filter = Some(DataChangeFilter {
            trigger: DataChangeTrigger::StatusValue,
            deadband_type: DeadbandType::Absolute,
            deadband_value: 5.0,
        });
        let item = MonitoredItem::create(
            1,
            p,
            read_value_id(AttributeId::Value),
            TimestampsToReturn::Both,
            node,
            no_op_sampling_fn(),
            &normaliser,
            registry,
        )
        .unwrap();

        item.set_monitoring_mode(MonitoringMode::Reporting);
        tokio::time::sleep(Duration::from_millis(10)).await;
        let _ = item.extract_notifications();

        item.record_value(DataValue::new_now(12.0, chrono::Utc::now()), NumericRange::None);
        assert_eq!(item.queue_length(), 0);

        item.record_value(DataValue::new_now(16.0, chrono::Utc::now()), NumericRange::None);
        assert_eq!(item.queue_length(), 1);
    }
}
