pub mod keyword_activity;
pub mod recent_events;
pub mod snapshot_store;

pub use keyword_activity::{KeywordActivity, VolumeTrend};
pub use recent_events::RecentEvents;
pub use snapshot_store::SnapshotStore;
