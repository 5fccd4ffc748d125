use crate::model::LyricCue;
use std::time::{Duration, Instant};

/// Wall-clock window during which a manual lyric scroll suppresses
/// auto-centering on the active cue.
pub const SCROLL_HOLD: Duration = Duration::from_secs(5);

/// Grace window: before the first timestamp, the first timed cue is shown
/// as provisionally active while playback is still under one second in.
const PRE_ROLL_SECONDS: f64 = 1.0;

/// Parses a track's raw lyric text into cues, in source line order.
///
/// Timed mode expects a `[mm:ss]` or `[mm:ss.fff]` prefix per line; the
/// fractional group is read as thousandths of a second. Timed lines with no
/// trailing text are dropped. Lines that miss the grammar degrade to
/// untimed display-only cues instead of failing the parse. The output is
/// not re-sorted; sources are trusted to be chronological.
pub fn parse_timeline(raw: Option<&str>, has_timed: bool) -> Vec<LyricCue> {
    let Some(raw) = raw.filter(|text| !text.trim().is_empty()) else {
        return Vec::new();
    };

    let mut cues = Vec::new();
    for line in raw.lines().map(str::trim_end) {
        if line.trim().is_empty() {
            continue;
        }

        if has_timed {
            if let Some((time_seconds, text)) = parse_timed_line(line) {
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                cues.push(LyricCue {
                    time_seconds: Some(time_seconds),
                    text: text.to_string(),
                });
                continue;
            }
        }

        cues.push(LyricCue {
            time_seconds: None,
            text: line.to_string(),
        });
    }

    cues
}

fn parse_timed_line(line: &str) -> Option<(f64, &str)> {
    let body = line.strip_prefix('[')?;
    let closing = body.find(']')?;
    let stamp = &body[..closing];
    let rest = &body[closing + 1..];

    let (minutes_raw, seconds_raw) = stamp.split_once(':')?;
    let minutes = minutes_raw.parse::<u32>().ok()?;

    let (whole_raw, fraction_raw) = match seconds_raw.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (seconds_raw, None),
    };
    let seconds = whole_raw.parse::<u32>().ok()?;
    let thousandths = match fraction_raw {
        Some(digits) => digits.parse::<u32>().ok()?,
        None => 0,
    };

    let time = f64::from(minutes) * 60.0 + f64::from(seconds) + f64::from(thousandths) / 1000.0;
    Some((time, rest))
}

/// Index of the last timed cue whose timestamp is at or before
/// `current_time`. A cue stays active until the next timestamp is reached,
/// including over silence gaps; untimed cues are skipped.
pub fn resolve_active_cue(cues: &[LyricCue], current_time: f64) -> Option<usize> {
    for index in (0..cues.len()).rev() {
        let Some(time) = cues[index].time_seconds else {
            continue;
        };
        if time <= current_time {
            return Some(index);
        }
    }

    if current_time < PRE_ROLL_SECONDS {
        return cues.iter().position(|cue| cue.time_seconds.is_some());
    }

    None
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CueUpdate {
    pub active: Option<usize>,
    pub changed: bool,
    /// Whether the consumer may re-center the view on the active cue.
    pub auto_follow: bool,
}

/// Tracks the active cue for the loaded track and the manual-scroll hold
/// window. Invalidated (reset) on every track change.
#[derive(Debug, Default)]
pub struct LyricCursor {
    active: Option<usize>,
    hold_until: Option<Instant>,
}

impl LyricCursor {
    pub fn reset(&mut self) {
        self.active = None;
        self.hold_until = None;
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    /// A manual scroll opens the hold window; another one rearms it. Only
    /// one outstanding deadline exists at a time.
    pub fn note_manual_scroll(&mut self, now: Instant) {
        self.hold_until = Some(now + SCROLL_HOLD);
    }

    pub fn hold_active(&self, now: Instant) -> bool {
        self.hold_until.is_some_and(|deadline| now < deadline)
    }

    pub fn resolve(&mut self, cues: &[LyricCue], current_time: f64, now: Instant) -> CueUpdate {
        if let Some(deadline) = self.hold_until
            && now >= deadline
        {
            self.hold_until = None;
        }

        let active = resolve_active_cue(cues, current_time);
        let changed = active != self.active;
        self.active = active;

        CueUpdate {
            active,
            changed,
            auto_follow: self.hold_until.is_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timed(stamp_text: &[(&str, &str)]) -> String {
        stamp_text
            .iter()
            .map(|(stamp, text)| format!("{stamp}{text}\n"))
            .collect()
    }

    #[test]
    fn parses_minute_second_fraction_prefix() {
        let cues = parse_timeline(Some("[01:02.500]hello"), true);
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].time_seconds, Some(62.5));
        assert_eq!(cues[0].text, "hello");
    }

    #[test]
    fn timed_line_without_text_is_dropped() {
        let cues = parse_timeline(Some("[00:10]"), true);
        assert!(cues.is_empty());
    }

    #[test]
    fn unmatched_lines_degrade_to_untimed_in_source_order() {
        let raw = timed(&[("[00:01]", "first"), ("", "composer credit"), ("[00:05]", "second")]);
        let cues = parse_timeline(Some(&raw), true);
        assert_eq!(cues.len(), 3);
        assert_eq!(cues[0].time_seconds, Some(1.0));
        assert_eq!(cues[1].time_seconds, None);
        assert_eq!(cues[1].text, "composer credit");
        assert_eq!(cues[2].time_seconds, Some(5.0));
    }

    #[test]
    fn plain_mode_yields_one_untimed_cue_per_line() {
        let cues = parse_timeline(Some("one\n\ntwo\n"), false);
        assert_eq!(cues.len(), 2);
        assert!(cues.iter().all(|cue| cue.time_seconds.is_none()));
    }

    #[test]
    fn plain_mode_keeps_timestamps_as_text() {
        let cues = parse_timeline(Some("[00:01]still text"), false);
        assert_eq!(cues[0].time_seconds, None);
        assert_eq!(cues[0].text, "[00:01]still text");
    }

    #[test]
    fn empty_input_yields_no_cues() {
        assert!(parse_timeline(None, true).is_empty());
        assert!(parse_timeline(Some("   \n"), true).is_empty());
    }

    #[test]
    fn source_order_is_preserved_even_when_timestamps_regress() {
        // Out-of-order sources are kept as-is; the backward scan assumes
        // chronological input, so resolution over such data is undefined
        // by contract and only order preservation is checked here.
        let cues = parse_timeline(Some("[00:30]late\n[00:10]early"), true);
        assert_eq!(cues[0].time_seconds, Some(30.0));
        assert_eq!(cues[1].time_seconds, Some(10.0));
    }

    #[test]
    fn active_cue_is_last_not_after_current_time() {
        let cues = parse_timeline(Some("[00:05]a\n[00:10]b\n[00:20]c"), true);
        assert_eq!(resolve_active_cue(&cues, 5.0), Some(0));
        assert_eq!(resolve_active_cue(&cues, 9.9), Some(0));
        assert_eq!(resolve_active_cue(&cues, 10.0), Some(1));
        // Holds across the silence gap until the next timestamp.
        assert_eq!(resolve_active_cue(&cues, 19.9), Some(1));
        assert_eq!(resolve_active_cue(&cues, 60.0), Some(2));
    }

    #[test]
    fn before_first_timestamp_resolves_none_except_pre_roll() {
        let cues = parse_timeline(Some("[00:05]a\n[00:10]b"), true);
        assert_eq!(resolve_active_cue(&cues, 0.5), Some(0));
        assert_eq!(resolve_active_cue(&cues, 3.0), None);
    }

    #[test]
    fn untimed_cues_never_become_active() {
        let cues = parse_timeline(Some("just text\nmore text"), false);
        assert_eq!(resolve_active_cue(&cues, 0.0), None);
        assert_eq!(resolve_active_cue(&cues, 100.0), None);
    }

    #[test]
    fn manual_scroll_suspends_auto_follow_until_hold_elapses() {
        let cues = parse_timeline(Some("[00:01]a\n[00:02]b"), true);
        let mut cursor = LyricCursor::default();
        let start = Instant::now();

        let update = cursor.resolve(&cues, 1.0, start);
        assert!(update.auto_follow);

        cursor.note_manual_scroll(start);
        let update = cursor.resolve(&cues, 1.5, start + Duration::from_secs(2));
        assert!(!update.auto_follow);

        // A further manual scroll rearms the window.
        cursor.note_manual_scroll(start + Duration::from_secs(4));
        let update = cursor.resolve(&cues, 2.0, start + Duration::from_secs(6));
        assert!(!update.auto_follow);

        let update = cursor.resolve(&cues, 2.5, start + Duration::from_secs(9));
        assert!(update.auto_follow);
        assert_eq!(update.active, Some(1));
    }

    #[test]
    fn cursor_reports_changes_only_on_transitions() {
        let cues = parse_timeline(Some("[00:01]a\n[00:02]b"), true);
        let mut cursor = LyricCursor::default();
        let now = Instant::now();

        assert!(cursor.resolve(&cues, 1.0, now).changed);
        assert!(!cursor.resolve(&cues, 1.5, now).changed);
        assert!(cursor.resolve(&cues, 2.0, now).changed);
    }

    proptest::proptest! {
        #[test]
        fn resolution_is_monotonic_for_sorted_cues(samples in proptest::collection::vec(0.0f64..300.0, 2..40)) {
            let mut stamps = samples.clone();
            stamps.sort_by(|a, b| a.partial_cmp(b).expect("finite"));
            let cues: Vec<LyricCue> = stamps
                .iter()
                .map(|secs| LyricCue { time_seconds: Some(*secs), text: String::from("x") })
                .collect();

            let mut previous = None;
            for step in 0..600 {
                let t = step as f64 * 0.5;
                let active = resolve_active_cue(&cues, t);
                if let (Some(prev), Some(current)) = (previous, active) {
                    proptest::prop_assert!(current >= prev);
                }
                if active.is_some() {
                    previous = active;
                }
            }
        }
    }
}
