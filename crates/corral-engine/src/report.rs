//! Per-object results of bulk operations and reducers over them.

use corral_common::error::{CorralError, Result};

/// Outcome of a bulk operation for one object.
#[derive(Debug)]
pub struct OperationReport {
    /// Full ID of the object.
    pub id: String,
    /// The exact string the caller supplied, or the ID when there was none.
    pub raw_input: String,
    /// Failure, if the object's transition failed.
    pub err: Option<CorralError>,
    /// Bytes reclaimed, for prune-style operations.
    pub size: Option<u64>,
}

impl OperationReport {
    /// Creates a successful report.
    #[must_use]
    pub fn ok(id: impl Into<String>, raw_input: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            raw_input: raw_input.into(),
            err: None,
            size: None,
        }
    }

    /// Creates a failed report.
    #[must_use]
    pub fn failed(id: impl Into<String>, raw_input: impl Into<String>, err: CorralError) -> Self {
        Self {
            err: Some(err),
            ..Self::ok(id, raw_input)
        }
    }

    /// Creates a report from the result of the object's transition.
    #[must_use]
    pub fn from_result(
        id: impl Into<String>,
        raw_input: impl Into<String>,
        result: Result<()>,
    ) -> Self {
        match result {
            Ok(()) => Self::ok(id, raw_input),
            Err(err) => Self::failed(id, raw_input, err),
        }
    }

    /// Attaches the number of bytes reclaimed.
    #[must_use]
    pub const fn with_size(mut self, size: Option<u64>) -> Self {
        self.size = size;
        self
    }

    /// Returns `true` if the transition succeeded.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.err.is_none()
    }
}

/// Anything a reducer can read a report from.
///
/// Slices handed to the reducers may contain placeholder entries
/// (`None`) which are skipped.
pub trait AsReport {
    /// Returns the report, or `None` for a placeholder.
    fn as_report(&self) -> Option<&OperationReport>;
}

impl AsReport for OperationReport {
    fn as_report(&self) -> Option<&OperationReport> {
        Some(self)
    }
}

impl AsReport for Option<OperationReport> {
    fn as_report(&self) -> Option<&OperationReport> {
        self.as_ref()
    }
}

impl<T: AsReport + ?Sized> AsReport for Box<T> {
    fn as_report(&self) -> Option<&OperationReport> {
        (**self).as_report()
    }
}

impl<T: AsReport + ?Sized> AsReport for &T {
    fn as_report(&self) -> Option<&OperationReport> {
        (**self).as_report()
    }
}

/// Returns the non-empty IDs of all reports, failed ones included.
pub fn collect_ids<R: AsReport>(reports: &[R]) -> Vec<&str> {
    reports
        .iter()
        .filter_map(AsReport::as_report)
        .map(|r| r.id.as_str())
        .filter(|id| !id.is_empty())
        .collect()
}

/// Returns every error carried by the reports, in order.
pub fn collect_errors<R: AsReport>(reports: &[R]) -> Vec<&CorralError> {
    reports
        .iter()
        .filter_map(AsReport::as_report)
        .filter_map(|r| r.err.as_ref())
        .collect()
}

/// Sums the reclaimed sizes. Reports without a size count as zero.
pub fn sum_size<R: AsReport>(reports: &[R]) -> u64 {
    reports
        .iter()
        .filter_map(AsReport::as_report)
        .filter_map(|r| r.size)
        .fold(0, u64::saturating_add)
}

/// Returns `true` if any report carries an error.
pub fn has_errors<R: AsReport>(reports: &[R]) -> bool {
    reports
        .iter()
        .filter_map(AsReport::as_report)
        .any(|r| r.err.is_some())
}
