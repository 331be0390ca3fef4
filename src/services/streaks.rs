//! Streak primitives shared by the achievement rules and the statistics
//! endpoints. Input slices may be unsorted and contain duplicates; both
//! functions normalize internally.

use chrono::{Duration, NaiveDate};
use std::collections::BTreeSet;

/// Consecutive completed days ending at `today`, walking backward one day at
/// a time. If `today` itself has no completion the streak is 0.
pub fn current_streak(dates: &[NaiveDate], today: NaiveDate) -> i32 {
    let set: BTreeSet<NaiveDate> = dates.iter().copied().collect();
    let mut streak = 0;
    let mut day = today;
    while set.contains(&day) {
        streak += 1;
        day -= Duration::days(1);
    }
    streak
}

/// Longest run of consecutive days anywhere in the history. A gap of exactly
/// one day extends the run, any other gap resets it. Empty input is 0.
pub fn longest_streak(dates: &[NaiveDate]) -> i32 {
    let sorted: BTreeSet<NaiveDate> = dates.iter().copied().collect();
    let mut longest = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;
    for date in sorted {
        run = match prev {
            Some(p) if date == p + Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(date);
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    // ── current_streak ───────────────────────────────────────────────────

    #[test]
    fn test_current_streak_empty() {
        assert_eq!(current_streak(&[], d(2026, 5, 10)), 0);
    }

    #[test]
    fn test_current_streak_today_only() {
        assert_eq!(current_streak(&[d(2026, 5, 10)], d(2026, 5, 10)), 1);
    }

    #[test]
    fn test_current_streak_today_missing_is_zero() {
        // yesterday and before, but not today
        let dates = [d(2026, 5, 8), d(2026, 5, 9)];
        assert_eq!(current_streak(&dates, d(2026, 5, 10)), 0);
    }

    #[test]
    fn test_current_streak_stops_at_first_gap() {
        let dates = [d(2026, 5, 6), d(2026, 5, 8), d(2026, 5, 9), d(2026, 5, 10)];
        assert_eq!(current_streak(&dates, d(2026, 5, 10)), 3);
    }

    #[test]
    fn test_current_streak_unsorted_with_duplicates() {
        let dates = [d(2026, 5, 10), d(2026, 5, 9), d(2026, 5, 9), d(2026, 5, 8)];
        assert_eq!(current_streak(&dates, d(2026, 5, 10)), 3);
    }

    // ── longest_streak ───────────────────────────────────────────────────

    #[test]
    fn test_longest_streak_empty() {
        assert_eq!(longest_streak(&[]), 0);
    }

    #[test]
    fn test_longest_streak_single_day() {
        assert_eq!(longest_streak(&[d(2026, 5, 10)]), 1);
    }

    #[test]
    fn test_longest_streak_closes_final_run() {
        // the longest run is the one that ends the history
        let dates = [d(2026, 5, 1), d(2026, 5, 5), d(2026, 5, 6), d(2026, 5, 7)];
        assert_eq!(longest_streak(&dates), 3);
    }

    #[test]
    fn test_longest_streak_run_in_the_middle() {
        let dates = [
            d(2026, 5, 1),
            d(2026, 5, 2),
            d(2026, 5, 3),
            d(2026, 5, 4),
            d(2026, 5, 20),
        ];
        assert_eq!(longest_streak(&dates), 4);
    }

    // ── gapped history: {D, D+1, D+2, D+5, D+6} ──────────────────────────

    #[test]
    fn test_gapped_history() {
        let base = d(2026, 5, 1);
        let dates = [
            base,
            base + Duration::days(1),
            base + Duration::days(2),
            base + Duration::days(5),
            base + Duration::days(6),
        ];
        assert_eq!(longest_streak(&dates), 3);
        // "today" = D+6: the current run is D+5, D+6
        assert_eq!(current_streak(&dates, base + Duration::days(6)), 2);
    }
}
