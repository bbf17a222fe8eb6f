//! The three sampling strategies a monitored item can bind to, modeled
//! as one tagged enum dispatched by `match` rather than a struct of
//! per-instance callback handlers.

use tokio::task::JoinHandle;

use crate::node_source::SubscriptionToken;

/// The sampler binding currently held by a
/// [`crate::monitored_item::MonitoredItem`]. At most one variant is ever
/// live at a time.
pub(crate) enum Sampler {
    /// No sampler bound: the item is `Disabled` or freshly created.
    Unbound,
    /// A periodic timer, used when `attribute_id == Value` and
    /// `sampling_interval > 0`. Dropping/aborting the handle stops the
    /// loop; it holds no other resources.
    Timer(JoinHandle<()>),
    /// A per-attribute change subscription, used when
    /// `attribute_id != Value` (always exception-based).
    AttributeEvent(SubscriptionToken),
    /// A `value_changed` subscription, used when `attribute_id == Value`
    /// and `sampling_interval == 0`.
    ValueEvent(SubscriptionToken),
}

impl Sampler {
    pub(crate) fn is_bound(&self) -> bool {
        !matches!(self, Sampler::Unbound)
    }
}
