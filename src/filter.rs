//! Decides whether a new reading is a reportable change given the
//! configured filter and the item's prior reading.
//!
//! An item with no filter configured still has a change rule: report if
//! status changed OR the value changed under `DeadbandType::None`. That
//! is kept explicit here rather than folded into a shortcut comparison,
//! so "no filter" can never quietly drift into a status-only check.

use crate::types::{DataChangeFilter, DataChangeTrigger, DataValue, DeadbandType, Variant};

/// Evaluate whether `new` should be reported given the previous reading
/// `old` and the item's configured filter.
///
/// `eu_range` is the monitored node's engineering-unit range, needed only
/// for `DeadbandType::Percent`; percent deadband without a usable range
/// is rejected earlier by [`crate::normalize::ParameterNormaliser`], so by
/// the time a filter reaches this function it is assumed valid.
pub(crate) fn should_report(
    new: &DataValue,
    old: &DataValue,
    filter: Option<&DataChangeFilter>,
    eu_range: Option<(f64, f64)>,
) -> bool {
    let status_changed = new.status != old.status;

    match filter {
        None => status_changed || value_changed(new, old, DeadbandType::None, 0.0, eu_range),
        Some(f) => match f.trigger {
            DataChangeTrigger::Status => status_changed,
            DataChangeTrigger::StatusValue => {
                status_changed || value_changed(new, old, f.deadband_type, f.deadband_value, eu_range)
            }
            DataChangeTrigger::StatusValueTimestamp => {
                status_changed
                    || value_changed(new, old, f.deadband_type, f.deadband_value, eu_range)
                    || new.source_timestamp != old.source_timestamp
            }
        },
    }
}

fn value_changed(
    new: &DataValue,
    old: &DataValue,
    deadband_type: DeadbandType,
    deadband_value: f64,
    eu_range: Option<(f64, f64)>,
) -> bool {
    match (&new.value, &old.value) {
        (None, None) => false,
        (Some(_), None) | (None, Some(_)) => true,
        (Some(nv), Some(ov)) => {
            let n = nv.elements();
            let o = ov.elements();
            if n.len() != o.len() {
                return true;
            }
            // Array values are compared element-wise; the whole array is
            // reported if any element changed.
            (0..n.len()).any(|i| {
                element_changed(
                    n.get(i).expect("index < len"),
                    o.get(i).expect("index < len"),
                    deadband_type,
                    deadband_value,
                    eu_range,
                )
            })
        }
    }
}

fn element_changed(
    new: &Variant,
    old: &Variant,
    deadband_type: DeadbandType,
    deadband_value: f64,
    eu_range: Option<(f64, f64)>,
) -> bool {
    if let (Some(n_words), Some(o_words)) = (new.as_i64_words(), old.as_i64_words()) {
        return int64_changed(n_words, o_words, deadband_type, deadband_value, eu_range);
    }

    match (new.as_f64_lossy(), old.as_f64_lossy()) {
        (Some(n), Some(o)) => numeric_changed(n, o, deadband_type, deadband_value, eu_range),
        // Non-numeric variants (booleans, strings): deadband does not
        // apply, any inequality is a change.
        _ => new != old,
    }
}

fn numeric_changed(
    new: f64,
    old: f64,
    deadband_type: DeadbandType,
    deadband_value: f64,
    eu_range: Option<(f64, f64)>,
) -> bool {
    let diff = (new - old).abs();
    match deadband_type {
        DeadbandType::None => diff != 0.0,
        DeadbandType::Absolute => diff > deadband_value,
        DeadbandType::Percent => diff > percent_absolute(deadband_value, eu_range),
    }
}

/// Subtraction for 64-bit integer variants, treating the value as a
/// (high, low) word pair: if the high words differ, the reading is
/// always treated as changed (avoiding a silent wraparound from casting
/// to `f64`); otherwise only the low-word difference is compared against
/// the deadband.
fn int64_changed(
    new: (i32, u32),
    old: (i32, u32),
    deadband_type: DeadbandType,
    deadband_value: f64,
    eu_range: Option<(f64, f64)>,
) -> bool {
    let (new_high, new_low) = new;
    let (old_high, old_low) = old;
    if new_high != old_high {
        return true;
    }
    let diff = (new_low as i64 - old_low as i64).unsigned_abs() as f64;
    match deadband_type {
        DeadbandType::None => diff != 0.0,
        DeadbandType::Absolute => diff > deadband_value,
        DeadbandType::Percent => diff > percent_absolute(deadband_value, eu_range),
    }
}

fn percent_absolute(deadband_value: f64, eu_range: Option<(f64, f64)>) -> f64 {
    let (low, high) = eu_range.unwrap_or((0.0, 0.0));
    (deadband_value / 100.0) * (high - low)
}
