//! Free-slot algorithms.

use chrono::Duration;

use crate::types::{BusyInterval, OpenSlot, TimeWindow};

/// Complement of `busy` inside `window`, keeping windows of at least `min_duration`.
///
/// Every busy interval splits each open window it overlaps into the parts
/// before and after it. Splits preserve order, so the result is sorted by
/// start time.
pub fn available_slots(
    window: TimeWindow,
    busy: &[BusyInterval],
    min_duration: Duration,
) -> Vec<OpenSlot> {
    let mut open = vec![window];

    for interval in busy {
        open = open
            .into_iter()
            .flat_map(|free| split(free, interval))
            .collect();
    }

    open.retain(|slot| slot.duration() >= min_duration);
    open
}

fn split(free: TimeWindow, busy: &BusyInterval) -> Vec<TimeWindow> {
    if !free.overlaps(busy) {
        return vec![free];
    }

    let before = TimeWindow::new(free.start(), busy.start()).ok();
    let after = TimeWindow::new(busy.end(), free.end()).ok();
    before.into_iter().chain(after).collect()
}

/// Candidate windows of `duration`, stepped by `step` from the window start.
///
/// A candidate is kept when it overlaps no busy interval. Candidates may
/// overlap each other when `duration` exceeds `step`.
pub fn suggest_available_slots(
    window: TimeWindow,
    busy: &[BusyInterval],
    duration: Duration,
    step: Duration,
) -> Vec<OpenSlot> {
    let mut slots = Vec::new();
    if step <= Duration::zero() {
        return slots;
    }

    let mut cursor = window.start();
    while cursor + duration <= window.end() {
        if let Ok(candidate) = TimeWindow::starting_at(cursor, duration) {
            if is_window_free(&candidate, busy) {
                slots.push(candidate);
            }
        }
        cursor = cursor + step;
    }

    slots
}

/// A requested window is free iff no existing window overlaps it.
pub fn is_window_free(requested: &TimeWindow, existing: &[TimeWindow]) -> bool {
    !existing.iter().any(|other| requested.overlaps(other))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::localize;
    use chrono::{NaiveDate, NaiveTime};
    use chrono_tz::Asia::Kolkata;

    fn window(start: (u32, u32), end: (u32, u32)) -> TimeWindow {
        let date = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();
        let at = |(h, m): (u32, u32)| {
            localize(Kolkata, date, NaiveTime::from_hms_opt(h, m, 0).unwrap()).unwrap()
        };
        TimeWindow::new(at(start), at(end)).unwrap()
    }

    fn work_day() -> TimeWindow {
        window((9, 0), (18, 0))
    }

    fn half_hour() -> Duration {
        Duration::minutes(30)
    }

    #[test]
    fn test_no_busy_gives_whole_window() {
        assert_eq!(available_slots(work_day(), &[], half_hour()), vec![work_day()]);
    }

    #[test]
    fn test_busy_whole_window_gives_nothing() {
        assert!(available_slots(work_day(), &[work_day()], half_hour()).is_empty());
    }

    #[test]
    fn test_busy_hour_splits_window() {
        let slots = available_slots(work_day(), &[window((10, 0), (11, 0))], half_hour());
        assert_eq!(slots, vec![window((9, 0), (10, 0)), window((11, 0), (18, 0))]);
    }

    #[test]
    fn test_short_gaps_are_dropped() {
        let busy = [window((9, 0), (10, 0)), window((10, 15), (17, 0))];
        let slots = available_slots(work_day(), &busy, half_hour());
        assert_eq!(slots, vec![window((17, 0), (18, 0))]);
    }

    #[test]
    fn test_busy_outside_window_is_ignored() {
        let busy = [window((6, 0), (8, 0)), window((18, 0), (20, 0))];
        assert_eq!(available_slots(work_day(), &busy, half_hour()), vec![work_day()]);
    }

    #[test]
    fn test_overlapping_busy_intervals() {
        let busy = [window((8, 0), (10, 30)), window((10, 0), (12, 0)), window((16, 0), (19, 0))];
        let slots = available_slots(work_day(), &busy, half_hour());
        assert_eq!(slots, vec![window((12, 0), (16, 0))]);
    }

    #[test]
    fn test_suggestions_step_every_half_hour() {
        let slots = suggest_available_slots(
            window((9, 0), (11, 0)),
            &[window((9, 30), (10, 0))],
            half_hour(),
            half_hour(),
        );
        assert_eq!(
            slots,
            vec![window((9, 0), (9, 30)), window((10, 0), (10, 30)), window((10, 30), (11, 0))]
        );
    }

    #[test]
    fn test_suggestions_may_overlap() {
        let slots = suggest_available_slots(
            window((9, 0), (11, 0)),
            &[],
            Duration::hours(1),
            half_hour(),
        );
        assert_eq!(
            slots,
            vec![window((9, 0), (10, 0)), window((9, 30), (10, 30)), window((10, 0), (11, 0))]
        );
    }

    #[test]
    fn test_window_free_is_half_open() {
        let existing = [window((10, 0), (11, 0))];
        assert!(is_window_free(&window((11, 0), (12, 0)), &existing));
        assert!(is_window_free(&window((9, 0), (10, 0)), &existing));
        assert!(!is_window_free(&window((10, 30), (11, 30)), &existing));
        assert!(is_window_free(&window((10, 30), (11, 30)), &[]));
    }
}
