//! Re-exports of the locks used internally, so lock types stay
//! consistent across the crate without every module depending on
//! `parking_lot` directly.

/// Mutually exclusive lock. Use this if you need both read and write often.
pub type Mutex<T> = parking_lot::Mutex<T>;
/// Read-write lock. Use this if you usually only need to read the value.
pub type RwLock<T> = parking_lot::RwLock<T>;
