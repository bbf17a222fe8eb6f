use super::{data_value::DataValue, node_id::AttributeId, node_id::NodeId, numeric_range::NumericRange};

/// The three states of the monitored item state machine.
///
/// There is a fourth, internal-only value: a freshly created item has no
/// mode at all until [`crate::monitored_item::MonitoredItem::set_monitoring_mode`]
/// is first called. That "Invalid" sentinel is represented as
/// `Option<MonitoringMode> == None` on the item rather than as a variant
/// here, so that `Invalid` can never be passed back in as a target mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitoringMode {
    Disabled,
    Sampling,
    Reporting,
}

/// When a data change filter considers a new reading reportable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataChangeTrigger {
    Status,
    #[default]
    StatusValue,
    StatusValueTimestamp,
}

/// The deadband algorithm applied to a value comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeadbandType {
    #[default]
    None,
    Absolute,
    Percent,
}

/// A data-change filter: when to report, and by how much a value must
/// move to count as a change.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DataChangeFilter {
    pub trigger: DataChangeTrigger,
    pub deadband_type: DeadbandType,
    pub deadband_value: f64,
}

/// The node attribute a monitored item observes: node, attribute, and
/// optional index range / data encoding restriction.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadValueId {
    pub node_id: NodeId,
    pub attribute_id: AttributeId,
    pub index_range: NumericRange,
    pub data_encoding: Option<String>,
}

/// The client-supplied parameters for creating or modifying a monitored
/// item, prior to normalisation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MonitoringParameters {
    pub client_handle: u32,
    /// Milliseconds; `0` requests exception-based sampling.
    pub sampling_interval: Option<f64>,
    pub filter: Option<DataChangeFilter>,
    pub queue_size: u32,
    pub discard_oldest: bool,
}

/// An entry extracted from a monitored item's notification queue: the
/// client handle it was created with, and the (timestamp-normalised)
/// reading.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredItemNotification {
    pub client_handle: u32,
    pub value: DataValue,
}
