use super::{status_code::StatusCode, variant::Variant};

/// A parsed OPC UA index range: the part of an array (or scalar) value a
/// reading or subscription request addresses.
///
/// Only single-dimension ranges are modeled; this engine never needs to
/// parse the wire-format index range string itself (that belongs to the
/// type system the host supplies), only to compare and slice with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumericRange {
    /// No range: the whole value.
    #[default]
    None,
    /// A single element.
    Index(u32),
    /// An inclusive `[low, high]` range of elements.
    Range(u32, u32),
}

impl NumericRange {
    /// Whether `self` and `other` address any common element.
    ///
    /// `None` is treated as covering everything, so it always overlaps.
    pub fn overlaps(&self, other: &NumericRange) -> bool {
        match (self, other) {
            (NumericRange::None, _) | (_, NumericRange::None) => true,
            (NumericRange::Index(a), NumericRange::Index(b)) => a == b,
            (NumericRange::Index(a), NumericRange::Range(lo, hi))
            | (NumericRange::Range(lo, hi), NumericRange::Index(a)) => *a >= *lo && *a <= *hi,
            (NumericRange::Range(a_lo, a_hi), NumericRange::Range(b_lo, b_hi)) => {
                a_lo <= b_hi && b_lo <= a_hi
            }
        }
    }

    /// Extract the slice of `value` addressed by this range.
    pub fn apply(&self, value: &Variant) -> Result<Variant, StatusCode> {
        match self {
            NumericRange::None => Ok(value.clone()),
            NumericRange::Index(i) => match value {
                Variant::Array(arr) => arr
                    .get(*i as usize)
                    .cloned()
                    .ok_or(StatusCode::BAD_INDEX_RANGE_NO_DATA),
                _ => Err(StatusCode::BAD_INDEX_RANGE_INVALID),
            },
            NumericRange::Range(lo, hi) => match value {
                Variant::Array(arr) => {
                    let lo = *lo as usize;
                    let hi = *hi as usize;
                    if lo > hi || lo >= arr.len() {
                        return Err(StatusCode::BAD_INDEX_RANGE_NO_DATA);
                    }
                    let hi = hi.min(arr.len() - 1);
                    Ok(Variant::Array(arr[lo..=hi].to_vec()))
                }
                _ => Err(StatusCode::BAD_INDEX_RANGE_INVALID),
            },
        }
    }
}
