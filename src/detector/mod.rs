pub mod anomaly;
pub mod pattern;

pub use anomaly::{detect_anomalies, AnomalyDetector};
pub use pattern::{detect_rapid_growth, PatternDetector};

use crate::window::WindowSnapshot;

/// A snapshot whose running sums went non-finite can't be scanned; the
/// caller skips that window and carries on with the rest.
pub(crate) fn scannable(snapshot: &WindowSnapshot) -> bool {
    snapshot.engagement_sum.is_finite() && snapshot.engagement_sum_sq.is_finite()
}
