//! Append-only per-entity snapshot histories.
//!
//! Every log line that mentions an entity produces a new snapshot; older
//! snapshots stay valid so "as of time T" questions can be answered long
//! after the fact. Lookups are strictly causal: a query at T never sees a
//! snapshot stamped later than T.

use chrono::NaiveDateTime;

use crate::combat_log::Position;

/// One timestamped observation of an entity's situational state.
#[derive(Debug, Clone)]
pub struct EntitySnapshot {
    pub timestamp: NaiveDateTime,
    pub health: (i32, i32),
    pub alive: bool,
    /// Current target's log id; 0 = no target
    pub target_id: i64,
    pub class_id: i64,
    pub discipline_id: i64,
    pub pvp_opponent: bool,
    pub position: Position,
}

impl Default for EntitySnapshot {
    fn default() -> Self {
        Self {
            timestamp: NaiveDateTime::UNIX_EPOCH,
            health: (0, 0),
            // Entities are presumed alive until a death event is seen
            alive: true,
            target_id: 0,
            class_id: 0,
            discipline_id: 0,
            pvp_opponent: false,
            position: Position::default(),
        }
    }
}

/// Ordered snapshot history for one entity.
#[derive(Debug, Clone, Default)]
pub struct EntityTimeline {
    snapshots: Vec<EntitySnapshot>,
}

impl EntityTimeline {
    pub fn latest(&self) -> Option<&EntitySnapshot> {
        self.snapshots.last()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Append a snapshot at `timestamp`, carrying the previous snapshot
    /// forward and letting `apply` overlay what this line changed.
    ///
    /// Updates must arrive in non-decreasing timestamp order; historical
    /// replays go through the rectifier first.
    pub fn record<F>(&mut self, timestamp: NaiveDateTime, apply: F)
    where
        F: FnOnce(&mut EntitySnapshot),
    {
        debug_assert!(
            self.snapshots
                .last()
                .is_none_or(|last| last.timestamp <= timestamp),
            "timeline updates must be applied in timestamp order"
        );

        let mut snapshot = self.snapshots.last().cloned().unwrap_or_default();
        snapshot.timestamp = timestamp;
        apply(&mut snapshot);
        self.snapshots.push(snapshot);
    }

    /// The most recent snapshot at or before `t`, or None when no snapshot
    /// precedes it.
    pub fn at(&self, t: NaiveDateTime) -> Option<&EntitySnapshot> {
        let idx = self.snapshots.partition_point(|s| s.timestamp <= t);
        if idx == 0 {
            None
        } else {
            Some(&self.snapshots[idx - 1])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(secs: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 12, 10)
            .unwrap()
            .and_hms_opt(18, 0, secs)
            .unwrap()
    }

    #[test]
    fn lookup_is_causal() {
        let mut timeline = EntityTimeline::default();
        timeline.record(ts(10), |s| s.target_id = 1);
        timeline.record(ts(20), |s| s.target_id = 2);

        assert_eq!(timeline.at(ts(10)).unwrap().target_id, 1);
        assert_eq!(timeline.at(ts(15)).unwrap().target_id, 1);
        assert_eq!(timeline.at(ts(20)).unwrap().target_id, 2);
        assert_eq!(timeline.at(ts(25)).unwrap().target_id, 2);
    }

    #[test]
    fn query_before_first_snapshot_is_unknown() {
        let mut timeline = EntityTimeline::default();
        timeline.record(ts(10), |s| s.target_id = 1);
        assert!(timeline.at(ts(9)).is_none());
    }

    #[test]
    fn snapshots_carry_state_forward() {
        let mut timeline = EntityTimeline::default();
        timeline.record(ts(1), |s| s.discipline_id = 77);
        timeline.record(ts(2), |s| s.target_id = 5);

        let latest = timeline.at(ts(2)).unwrap();
        assert_eq!(latest.discipline_id, 77);
        assert_eq!(latest.target_id, 5);
        assert!(latest.alive);
    }

    #[test]
    fn death_and_revive_over_time() {
        let mut timeline = EntityTimeline::default();
        timeline.record(ts(0), |_| {});
        timeline.record(ts(10), |s| s.alive = false);
        timeline.record(ts(30), |s| s.alive = true);

        assert!(timeline.at(ts(5)).unwrap().alive);
        assert!(!timeline.at(ts(10)).unwrap().alive);
        assert!(!timeline.at(ts(29)).unwrap().alive);
        assert!(timeline.at(ts(30)).unwrap().alive);
    }
}
