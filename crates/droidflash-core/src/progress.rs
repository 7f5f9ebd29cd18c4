//! Install progress parsing
//!
//! The external tools report progress in inconsistent ways: `adb sideload`
//! annotates lines with an explicit `(~NN%)`, while other phases only emit
//! sentinel strings when they finish. [`ProgressTracker`] scans streamed
//! output line by line and normalizes whatever it finds into a
//! [`ProgressSignal`].
//!
//! Two observable states are deliberately kept apart: a determinate
//! percentage (render a bar) and "work is ongoing but nothing numeric is
//! available" (render a spinner). Consumers must not blend the two.

use std::sync::LazyLock;

use regex::Regex;

/// Percentage annotation emitted by `adb sideload`, e.g.
/// `serving: 'lineage.zip'  (~47%)`
static PERCENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(~\s*(\d+)%\)").expect("Invalid percent regex"));

/// Lines that mean "the transfer just finished" even though no percentage is
/// printed. The `failed to read command` warnings are what adb prints when
/// TWRP closes the sideload connection after a successful install.
const FINISHED_MARKERS: &[&str] = &[
    "Total xfer:",
    "adb: failed to read command: Success",
    "adb: failed to read command: No error",
];

/// Normalized progress extracted from one output line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressSignal {
    /// A percentage in [1, 100] is known; render a determinate bar
    Determinate(u8),

    /// No numeric signal in this line; render a busy/spinner indicator
    Indeterminate,
}

/// Scans streamed tool output for progress markers
///
/// Mid-stream percentages are clamped to [1, 99]: 0% would look like nothing
/// has started and 100% would claim completion before the pipeline's terminal
/// signal confirms it. Only [`ProgressTracker::finish`] (called by the
/// controller after the whole operation succeeds) reports 100.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    percent: Option<u8>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one output line and get the resulting signal
    pub fn feed(&mut self, line: &str) -> ProgressSignal {
        if let Some(percent) = parse_percent(line) {
            let clamped = percent.clamp(1, 99) as u8;
            self.percent = Some(clamped);
            return ProgressSignal::Determinate(clamped);
        }
        if FINISHED_MARKERS.iter().any(|m| line.contains(m)) {
            self.percent = Some(99);
            return ProgressSignal::Determinate(99);
        }
        ProgressSignal::Indeterminate
    }

    /// Explicitly set the percentage, e.g. to 100 once the operation succeeds
    pub fn set(&mut self, percent: u8) {
        self.percent = Some(percent.min(100));
    }

    /// Mark the tracked operation complete
    pub fn finish(&mut self) {
        self.set(100);
    }

    /// Last known percentage, if any numeric signal was ever seen
    pub fn percent(&self) -> Option<u8> {
        self.percent
    }
}

fn parse_percent(line: &str) -> Option<u64> {
    let captures = PERCENT_REGEX.captures(line)?;
    captures.get(1)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sideload_percentages_are_parsed() {
        let mut tracker = ProgressTracker::new();
        for percent in 1..=47u8 {
            let line = format!("serving: 'lineage-19.1-nightly-sargo-signed.zip'  (~{percent}%)");
            assert_eq!(tracker.feed(&line), ProgressSignal::Determinate(percent));
            assert_eq!(tracker.percent(), Some(percent));
        }
    }

    #[test]
    fn test_boundary_percentages_are_clamped() {
        let mut tracker = ProgressTracker::new();
        assert_eq!(
            tracker.feed("serving: 'x.zip'  (~0%)"),
            ProgressSignal::Determinate(1)
        );
        assert_eq!(
            tracker.feed("serving: 'x.zip'  (~100%)"),
            ProgressSignal::Determinate(99)
        );
        assert_eq!(
            tracker.feed("serving: 'x.zip'  (~150%)"),
            ProgressSignal::Determinate(99)
        );
    }

    #[test]
    fn test_finished_markers_map_to_99() {
        let mut tracker = ProgressTracker::new();
        assert_eq!(
            tracker.feed("Total xfer: 1.00x"),
            ProgressSignal::Determinate(99)
        );
        assert_eq!(
            tracker.feed("adb: failed to read command: Success"),
            ProgressSignal::Determinate(99)
        );
        assert_eq!(
            tracker.feed("adb: failed to read command: No error"),
            ProgressSignal::Determinate(99)
        );
    }

    #[test]
    fn test_unparseable_line_is_indeterminate() {
        let mut tracker = ProgressTracker::new();
        assert_eq!(
            tracker.feed("Failed to mount '/data' (Device or resource busy)"),
            ProgressSignal::Indeterminate
        );
        // Nothing numeric seen yet
        assert_eq!(tracker.percent(), None);

        // A noise line after a percentage keeps the last known value around
        tracker.feed("serving: 'x.zip'  (~42%)");
        assert_eq!(tracker.feed("some unrelated output"), ProgressSignal::Indeterminate);
        assert_eq!(tracker.percent(), Some(42));
    }

    #[test]
    fn test_explicit_finish_reaches_100() {
        let mut tracker = ProgressTracker::new();
        tracker.feed("Total xfer: 1.00x");
        assert_eq!(tracker.percent(), Some(99));
        tracker.finish();
        assert_eq!(tracker.percent(), Some(100));
    }

    #[test]
    fn test_set_is_capped_at_100() {
        let mut tracker = ProgressTracker::new();
        tracker.set(250);
        assert_eq!(tracker.percent(), Some(100));
    }
}
