use std::fmt;

/// A 32-bit OPC UA status code.
///
/// The top two bits classify the code as `Good` (`00`), `Uncertain` (`01`)
/// or `Bad` (`10`). Only the subset of codes this crate produces or
/// passes through are given names here; unrecognized codes round-trip
/// through [`StatusCode::from_bits`]/[`StatusCode::bits`] unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(u32);

macro_rules! status_codes {
    ($($name:ident = $value:expr),* $(,)?) => {
        impl StatusCode {
            $(
                #[allow(missing_docs)]
                pub const $name: StatusCode = StatusCode($value);
            )*
        }
    };
}

status_codes! {
    GOOD = 0x0000_0000,
    GOOD_WITH_OVERFLOW_BIT = 0x0000_0480,
    BAD_DATA_UNAVAILABLE = 0x8002_9000,
    BAD_OUT_OF_RANGE = 0x803B_0000,
    BAD_DEADBAND_FILTER_INVALID = 0x8082_4000,
    BAD_MONITORED_ITEM_ID_INVALID = 0x8042_3000,
    BAD_FILTER_NOT_ALLOWED = 0x8045_0000,
    BAD_INDEX_RANGE_INVALID = 0x8032_0000,
    BAD_INDEX_RANGE_NO_DATA = 0x8033_0000,
    BAD_NODE_ID_UNKNOWN = 0x8003_3000,
}

/// InfoType=DataValue (`0x400`) with the Overflow info bit (`0x80`) set,
/// matching the real OPC UA `GoodWithOverflowBit` code so a
/// queue-promoted status compares equal to the named constant.
const OVERFLOW_BIT: u32 = 0x0000_0480;

impl StatusCode {
    /// Build a status code from its raw bit representation.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// The raw bit representation of this status code.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// `true` for `Good` and `Uncertain` severities (top bit clear).
    pub const fn is_good(self) -> bool {
        self.0 & 0xC000_0000 == 0
    }

    /// `true` for `Bad` severity (top bit set).
    pub const fn is_bad(self) -> bool {
        !self.is_good()
    }

    /// `true` if the overflow bit (bit 26) is set.
    pub const fn has_overflow_bit(self) -> bool {
        self.0 & OVERFLOW_BIT != 0
    }

    /// Return this status code with the overflow bit set.
    ///
    /// Mirrors the server promoting a `Good` reading to
    /// `GoodWithOverflowBit` when the notification queue drops data.
    pub const fn with_overflow_bit(self) -> Self {
        Self(self.0 | OVERFLOW_BIT)
    }

    /// Return this status code with the overflow bit cleared.
    pub const fn without_overflow_bit(self) -> Self {
        Self(self.0 & !OVERFLOW_BIT)
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        Self::GOOD
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_bit_roundtrips() {
        let promoted = StatusCode::GOOD.with_overflow_bit();
        assert!(promoted.has_overflow_bit());
        assert_eq!(promoted, StatusCode::GOOD_WITH_OVERFLOW_BIT);
        assert_eq!(promoted.without_overflow_bit(), StatusCode::GOOD);
    }

    #[test]
    fn severity_classification() {
        assert!(StatusCode::GOOD.is_good());
        assert!(StatusCode::GOOD_WITH_OVERFLOW_BIT.is_good());
        assert!(StatusCode::BAD_DATA_UNAVAILABLE.is_bad());
    }
}
