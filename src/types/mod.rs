//! A minimal OPC UA type model: just enough of `NodeId`, `StatusCode`,
//! `Variant` and friends for the monitored item engine's filter math and
//! queue discipline. A host that embeds this crate alongside a complete
//! address space / wire-codec implementation is expected to convert at
//! the boundary rather than depend on these types directly.

mod data_value;
mod monitoring;
mod node_id;
mod numeric_range;
mod status_code;
mod variant;

pub use data_value::{DataValue, TimestampsToReturn};
pub use monitoring::{
    DataChangeFilter, DataChangeTrigger, DeadbandType, MonitoredItemNotification,
    MonitoringMode, MonitoringParameters, ReadValueId,
};
pub use node_id::{AttributeId, Identifier, NodeId};
pub use numeric_range::NumericRange;
pub use status_code::StatusCode;
pub use variant::{ArrayElements, Variant};
