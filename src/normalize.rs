use crate::types::{AttributeId, DataChangeFilter, DeadbandType, MonitoringParameters, StatusCode};

/// Server-configured bounds the [`ParameterNormaliser`] clamps requested
/// parameters into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServerLimits {
    pub min_sampling_interval_ms: f64,
    pub max_sampling_interval_ms: f64,
    pub default_sampling_interval_ms: f64,
    pub max_queue_size: u32,
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            min_sampling_interval_ms: 50.0,
            max_sampling_interval_ms: 60.0 * 60.0 * 1000.0,
            default_sampling_interval_ms: 1500.0,
            max_queue_size: 5000,
        }
    }
}

/// A validation failure in filter or parameter normalisation, raised
/// synchronously from `create`/`modify`. Every variant collapses to
/// `BadDeadbandFilterInvalid` at the API boundary; the variants exist so
/// diagnostics can log *why*.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum NormalizeError {
    #[error("percent deadband requires an EURange property on the monitored node")]
    PercentDeadbandWithoutEuRange,
    #[error("deadband value {0} is out of the valid [0, 100] range for percent deadband")]
    DeadbandValueOutOfRange(f64),
    #[error("filter deadband value must be finite")]
    NonFiniteDeadbandValue,
}

impl NormalizeError {
    /// The status code this error surfaces to the client as.
    pub fn status_code(self) -> StatusCode {
        StatusCode::BAD_DEADBAND_FILTER_INVALID
    }
}

/// Parameters after clamping into server limits and filter validation,
/// ready to be applied to a [`crate::monitored_item::MonitoredItem`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalisedParameters {
    pub sampling_interval_ms: f64,
    pub queue_size: usize,
    pub discard_oldest: bool,
    pub filter: Option<DataChangeFilter>,
}

/// Clamps sampling interval and queue size into server bounds, and
/// validates filter constraints.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterNormaliser {
    pub limits: ServerLimits,
}

impl ParameterNormaliser {
    pub fn new(limits: ServerLimits) -> Self {
        Self { limits }
    }

    /// Normalise `params` for an item observing `attribute_id`, given the
    /// node's engineering-unit range if percent deadband needs one.
    pub fn normalize(
        &self,
        params: &MonitoringParameters,
        attribute_id: AttributeId,
        eu_range: Option<(f64, f64)>,
    ) -> Result<NormalisedParameters, NormalizeError> {
        let filter = params
            .filter
            .map(|f| self.validate_filter(f, eu_range).map(|()| f))
            .transpose()?;

        let sampling_interval_ms = self.normalize_sampling_interval(
            params.sampling_interval,
            attribute_id,
        );

        let queue_size = params.queue_size.clamp(1, self.limits.max_queue_size) as usize;

        Ok(NormalisedParameters {
            sampling_interval_ms,
            queue_size,
            discard_oldest: params.discard_oldest,
            filter,
        })
    }

    fn normalize_sampling_interval(
        &self,
        requested: Option<f64>,
        attribute_id: AttributeId,
    ) -> f64 {
        // Non-Value attributes are always exception-based.
        if !attribute_id.is_value() {
            return 0.0;
        }

        let requested = requested.unwrap_or(self.limits.default_sampling_interval_ms);
        if requested == 0.0 {
            0.0
        } else {
            requested.clamp(
                self.limits.min_sampling_interval_ms,
                self.limits.max_sampling_interval_ms,
            )
        }
    }

    fn validate_filter(
        &self,
        filter: DataChangeFilter,
        eu_range: Option<(f64, f64)>,
    ) -> Result<(), NormalizeError> {
        if !filter.deadband_value.is_finite() {
            return Err(NormalizeError::NonFiniteDeadbandValue);
        }
        match filter.deadband_type {
            DeadbandType::None | DeadbandType::Absolute => Ok(()),
            DeadbandType::Percent => {
                if !(0.0..=100.0).contains(&filter.deadband_value) {
                    return Err(NormalizeError::DeadbandValueOutOfRange(
                        filter.deadband_value,
                    ));
                }
                if eu_range.is_none() {
                    return Err(NormalizeError::PercentDeadbandWithoutEuRange);
                }
                Ok(())
            }
        }
    }
}
