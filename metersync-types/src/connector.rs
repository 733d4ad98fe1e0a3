//! Wire-level response shapes returned by the period-values collaborator.

use serde::{Deserialize, Serialize};

/// Status string the upstream reports for a successful response.
pub const STATUS_OK: &str = "OK";

/// A single hourly record exactly as the upstream returned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Local hour label, formatted `YYYYMMDDHH`.
    pub time: String,
    /// Decimal consumption value.
    pub value: String,
}

impl RawRecord {
    /// Convenience constructor.
    pub fn new(time: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            value: value.into(),
        }
    }
}

/// Successful response of a period-values call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PeriodValues {
    /// Upstream status; `"OK"` on success.
    pub status: String,
    /// Records in upstream order (not necessarily sorted or unique).
    pub records: Vec<RawRecord>,
}

impl PeriodValues {
    /// An `"OK"` response carrying the given records.
    pub fn ok(records: Vec<RawRecord>) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            records,
        }
    }

    /// Returns true if the upstream reported success.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}
