use chrono::{DateTime, Utc};

use super::{status_code::StatusCode, variant::Variant};

/// Which timestamp(s) a client asked to have returned with notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampsToReturn {
    Source,
    Server,
    #[default]
    Both,
    Neither,
}

/// A single observed value: the payload, its status, and up to two
/// timestamps (source and server), each with sub-nanosecond picosecond
/// residue as OPC UA's `DateTime` only has 100ns resolution.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataValue {
    pub value: Option<Variant>,
    pub status: StatusCode,
    pub source_timestamp: Option<DateTime<Utc>>,
    pub source_picoseconds: Option<u16>,
    pub server_timestamp: Option<DateTime<Utc>>,
    pub server_picoseconds: Option<u16>,
}

impl DataValue {
    /// A value with `Good` status and both timestamps set to `at`.
    pub fn new_at(value: impl Into<Variant>, at: DateTime<Utc>) -> Self {
        Self {
            value: Some(value.into()),
            status: StatusCode::GOOD,
            source_timestamp: Some(at),
            source_picoseconds: None,
            server_timestamp: Some(at),
            server_picoseconds: None,
        }
    }

    /// A value with `Good` status and both timestamps set to `now`.
    pub fn new_now(value: impl Into<Variant>, now: DateTime<Utc>) -> Self {
        Self::new_at(value, now)
    }

    /// A value carrying no payload and the given status, timestamped `at`.
    /// Used for the synthetic `BadDataUnavailable` baseline reading and for
    /// pass-through rejection statuses such as `BadOutOfRange`.
    pub fn new_status(status: StatusCode, at: DateTime<Utc>) -> Self {
        Self {
            value: None,
            status,
            source_timestamp: Some(at),
            source_picoseconds: None,
            server_timestamp: Some(at),
            server_picoseconds: None,
        }
    }

    /// Return a copy with timestamps cleared per `timestamps_to_return`,
    /// as required when normalising a notification before delivery.
    pub fn with_timestamps_to_return(&self, which: TimestampsToReturn) -> Self {
        let mut out = self.clone();
        match which {
            TimestampsToReturn::Source => {
                out.server_timestamp = None;
                out.server_picoseconds = None;
            }
            TimestampsToReturn::Server => {
                out.source_timestamp = None;
                out.source_picoseconds = None;
            }
            TimestampsToReturn::Both => {}
            TimestampsToReturn::Neither => {
                out.source_timestamp = None;
                out.source_picoseconds = None;
                out.server_timestamp = None;
                out.server_picoseconds = None;
            }
        }
        out
    }

    /// Return a copy with `status` replaced.
    pub fn with_status(&self, status: StatusCode) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_to_return_neither_clears_both() {
        let now = Utc::now();
        let dv = DataValue::new_now(1i32, now);
        let out = dv.with_timestamps_to_return(TimestampsToReturn::Neither);
        assert!(out.source_timestamp.is_none());
        assert!(out.server_timestamp.is_none());
    }

    #[test]
    fn timestamps_to_return_source_keeps_only_source() {
        let now = Utc::now();
        let dv = DataValue::new_now(1i32, now);
        let out = dv.with_timestamps_to_return(TimestampsToReturn::Source);
        assert!(out.source_timestamp.is_some());
        assert!(out.server_timestamp.is_none());
    }
}
