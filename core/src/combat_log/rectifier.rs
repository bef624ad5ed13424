//! Timestamp rectification for batches of decoded events.
//!
//! Parallel decode loses line-to-line temporal locality, the log clock is
//! coarse enough that many entries share a stamp, and time-of-day stamps
//! wrap at midnight. Rectification restores a deterministic order:
//! file position first, midnight rollover folded into the dates, then a
//! global sort by `(corrected timestamp, line number)`.
//!
//! The pass is stable (entries with distinct timestamps never invert),
//! deterministic, and idempotent.

use chrono::TimeDelta;

use super::CombatEvent;

/// A clock regression bigger than this is a midnight wrap, not jitter.
const ROLLOVER_THRESHOLD_HOURS: i64 = 12;

/// Rectify a batch in place.
pub fn rectify(events: &mut [CombatEvent]) {
    if events.is_empty() {
        return;
    }

    // Restore file order lost by the parallel decode
    events.sort_by_key(|e| e.line_number);

    // Fold midnight rollover into the dates: the time-of-day clock resets
    // while the file position keeps advancing.
    let mut rollover = TimeDelta::zero();
    let mut prev_raw = events[0].timestamp;
    for event in events.iter_mut() {
        let raw = event.timestamp;
        if raw < prev_raw - TimeDelta::hours(ROLLOVER_THRESHOLD_HOURS) {
            rollover += TimeDelta::days(1);
        }
        prev_raw = raw;
        event.timestamp = raw + rollover;
    }

    // Global order: corrected timestamp, ties broken by original line index
    events.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.line_number.cmp(&b.line_number))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat_log::{Action, Details, Effect, Entity};
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(h: u32, m: u32, s: u32, ms: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 12, 10)
            .unwrap()
            .and_hms_milli_opt(h, m, s, ms)
            .unwrap()
    }

    fn event(line_number: u64, timestamp: NaiveDateTime) -> CombatEvent {
        CombatEvent {
            line_number,
            timestamp,
            source_entity: Entity::default(),
            target_entity: Entity::default(),
            action: Action::default(),
            effect: Effect::default(),
            details: Details::default(),
            combat_time_secs: None,
        }
    }

    #[test]
    fn colliding_timestamps_are_sub_ordered_by_line_index() {
        // Decoded out of order by the parallel pass
        let mut batch = vec![
            event(2, ts(18, 0, 0, 0)),
            event(1, ts(18, 0, 0, 0)),
            event(3, ts(18, 0, 0, 0)),
        ];
        rectify(&mut batch);
        let lines: Vec<u64> = batch.iter().map(|e| e.line_number).collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }

    #[test]
    fn distinct_timestamps_never_invert() {
        let mut batch = vec![
            event(1, ts(18, 0, 5, 0)),
            event(2, ts(18, 0, 1, 0)),
            event(3, ts(18, 0, 3, 0)),
        ];
        rectify(&mut batch);
        let lines: Vec<u64> = batch.iter().map(|e| e.line_number).collect();
        // Ordered by timestamp regardless of file position
        assert_eq!(lines, vec![2, 3, 1]);
    }

    #[test]
    fn midnight_rollover_advances_the_date() {
        let mut batch = vec![
            event(1, ts(23, 59, 59, 500)),
            event(2, ts(0, 0, 1, 0)),
            event(3, ts(0, 0, 2, 0)),
        ];
        rectify(&mut batch);
        assert_eq!(batch[0].line_number, 1);
        assert_eq!(batch[1].line_number, 2);
        assert!(batch[1].timestamp > batch[0].timestamp);
        assert_eq!(
            batch[1].timestamp.date(),
            NaiveDate::from_ymd_opt(2025, 12, 11).unwrap()
        );
    }

    #[test]
    fn rectify_is_idempotent() {
        let mut batch = vec![
            event(4, ts(23, 59, 59, 0)),
            event(1, ts(18, 0, 0, 0)),
            event(5, ts(0, 0, 1, 0)),
            event(2, ts(18, 0, 0, 0)),
            event(3, ts(19, 30, 0, 250)),
        ];
        rectify(&mut batch);
        let first_pass: Vec<(u64, NaiveDateTime)> =
            batch.iter().map(|e| (e.line_number, e.timestamp)).collect();

        rectify(&mut batch);
        let second_pass: Vec<(u64, NaiveDateTime)> =
            batch.iter().map(|e| (e.line_number, e.timestamp)).collect();

        assert_eq!(first_pass, second_pass);
    }

    #[test]
    fn deterministic_across_runs() {
        let make = || {
            vec![
                event(3, ts(18, 0, 0, 0)),
                event(1, ts(18, 0, 0, 0)),
                event(2, ts(17, 59, 59, 999)),
            ]
        };
        let mut a = make();
        let mut b = make();
        rectify(&mut a);
        rectify(&mut b);
        let order_a: Vec<u64> = a.iter().map(|e| e.line_number).collect();
        let order_b: Vec<u64> = b.iter().map(|e| e.line_number).collect();
        assert_eq!(order_a, order_b);
        assert_eq!(order_a, vec![2, 1, 3]);
    }
}
