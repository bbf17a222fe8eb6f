//! Server-side monitored-item engine for an OPC UA server.
//!
//! This crate implements the part of an OPC UA (IEC 62541) server that
//! observes a node's attribute over time on behalf of a subscription:
//! lifecycle (`Disabled`/`Sampling`/`Reporting`), the three sampling
//! disciplines (periodic timer, attribute-change event, value-change
//! event), data-change filtering (status/value/timestamp triggers with
//! absolute and percent deadband), a bounded notification queue with
//! discard-oldest/discard-newest overflow policies, and the parameter
//! normalisation that clamps client-requested sampling intervals and
//! queue sizes into server limits.
//!
//! Wire framing, session/secure-channel handling, address-space storage
//! and event-type monitored items are out of scope; a host embeds this
//! crate behind the narrow [`node_source::NodeSource`] trait the same
//! way its own node managers sit behind trait objects.
//!
//! ```text
//! timer tick / node event / explicit write
//!   -> Sampler delivers reading to MonitoredItem::record_value
//!   -> narrowed to the configured index range
//!   -> Filter Evaluator accepts/rejects
//!   -> Notification Queue enqueues
//!   -> subscription drains via MonitoredItem::extract_notifications
//! ```

mod filter;
mod normalize;
mod queue;
mod registry;
mod sampler;
mod sync;

pub mod monitored_item;
pub mod node_source;
pub mod types;

pub use monitored_item::{ModifyResult, MonitoredItem, SamplingFn};
pub use normalize::{NormalizeError, NormalisedParameters, ParameterNormaliser, ServerLimits};
pub use node_source::{ChangeHandler, NodeSource, SubscriptionToken};
pub use registry::MonitoredItemRegistry;
