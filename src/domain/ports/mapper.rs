//! Ports for normalising request data.

use crate::domain::entities::{RequestData, Size};

/// Maps one kind of request data into another.
pub trait Mapper: Send + Sync {
    /// Returns true if this mapper applies to `data`.
    fn handles(&self, data: &RequestData) -> bool;

    /// Maps `data`. Only called when [`handles`](Self::handles) returned true.
    fn map(&self, data: &RequestData) -> RequestData;
}

/// A mapper that needs the resolved target size.
pub trait MeasuredMapper: Send + Sync {
    /// Returns true if this mapper applies to `data`.
    fn handles(&self, data: &RequestData) -> bool;

    /// Maps `data` for the given size.
    fn map(&self, data: &RequestData, size: Size) -> RequestData;
}
