//! Timeline partitioning.
//!
//! Every window is a "core" slice of `target - overlap` seconds padded by half
//! the overlap on each side, so adjacent windows share exactly `overlap`
//! seconds and the last one is clipped to the video duration.

use tracing::debug;

use crate::{
    error::{Result, VidsumError},
    types::Window,
};

/// Windows shorter than this are treated as a negligible tail and dropped.
pub const MIN_CHUNK_SECONDS: f64 = 1.0;

/// Upper bound on windows per video; more means the probed duration is bogus.
pub const MAX_CHUNKS: usize = 10_000;

/// Compute the ordered windows covering `[0, duration)`.
///
/// A non-positive `target` or a video no longer than `target` yields a single
/// window spanning the whole video. An `overlap` that leaves no core content
/// is reported as [`VidsumError::InvalidConfiguration`]; callers fall back to
/// a single window. More than [`MAX_CHUNKS`] windows is
/// [`VidsumError::TooManyChunks`].
pub fn plan(duration: f64, target: f64, overlap: f64) -> Result<Vec<Window>> {
    if !duration.is_finite() || duration <= 0.0 {
        return Ok(Vec::new());
    }

    if target <= 0.0 || duration <= target {
        return Ok(vec![whole(duration)]);
    }

    let core = target - overlap;
    if core <= 0.0 {
        return Err(VidsumError::InvalidConfiguration { target, overlap });
    }

    let padding = overlap.max(0.0) / 2.0;
    let count = (duration / core).ceil();
    if count > MAX_CHUNKS as f64 {
        return Err(VidsumError::TooManyChunks { duration, core });
    }
    let count = count as usize;
    let mut windows: Vec<Window> = Vec::new();

    for k in 0..count {
        let core_start = k as f64 * core;
        let core_end = ((k + 1) as f64 * core).min(duration);
        if core_start >= duration || core_start >= core_end {
            break;
        }

        let start = (core_start - padding).max(0.0);
        let end = (core_end + padding).min(duration);
        if end - start < MIN_CHUNK_SECONDS {
            debug!(
                segment = k + 1,
                length = end - start,
                "dropping sub-threshold tail window"
            );
            continue;
        }

        // Padding wider than the core clamps several leading windows to 0;
        // keep only the widest of them so starts stay strictly increasing.
        if let Some(last) = windows.last_mut()
            && start <= last.start
        {
            last.end = last.end.max(end);
            continue;
        }

        windows.push(Window {
            index: windows.len() + 1,
            start,
            end,
        });
    }

    Ok(windows)
}

/// The single window used when chunking is disabled or not needed.
pub fn whole(duration: f64) -> Window {
    Window {
        index: 1,
        start: 0.0,
        end: duration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(windows: &[Window]) -> Vec<(f64, f64)> {
        windows.iter().map(|w| (w.start, w.end)).collect()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn thousand_seconds_in_five_minute_chunks() {
        let windows = plan(1000.0, 300.0, 60.0).unwrap();
        let expected = [
            (0.0, 270.0),
            (210.0, 510.0),
            (450.0, 750.0),
            (690.0, 990.0),
            (930.0, 1000.0),
        ];

        assert_eq!(windows.len(), expected.len());
        for (window, (start, end)) in windows.iter().zip(expected) {
            assert_close(window.start, start);
            assert_close(window.end, end);
        }
        assert_eq!(
            windows.iter().map(|w| w.index).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn short_video_is_a_single_window() {
        assert_eq!(spans(&plan(100.0, 900.0, 60.0).unwrap()), vec![(0.0, 100.0)]);
        assert_eq!(spans(&plan(900.0, 900.0, 60.0).unwrap()), vec![(0.0, 900.0)]);
    }

    #[test]
    fn disabled_chunking_is_a_single_window() {
        assert_eq!(spans(&plan(5000.0, 0.0, 60.0).unwrap()), vec![(0.0, 5000.0)]);
        assert_eq!(spans(&plan(5000.0, -1.0, 0.0).unwrap()), vec![(0.0, 5000.0)]);
    }

    #[test]
    fn overlap_swallowing_the_chunk_is_rejected() {
        let err = plan(1000.0, 60.0, 60.0).unwrap_err();
        assert!(matches!(err, VidsumError::InvalidConfiguration { .. }));
        assert!(plan(1000.0, 60.0, 90.0).is_err());
    }

    #[test]
    fn absurd_duration_is_refused() {
        let err = plan(1.0e15, 300.0, 60.0).unwrap_err();
        assert!(matches!(err, VidsumError::TooManyChunks { .. }));
        assert!(plan(f64::INFINITY, 300.0, 60.0).unwrap().is_empty());
    }

    #[test]
    fn empty_or_bogus_duration_plans_nothing() {
        assert!(plan(0.0, 300.0, 60.0).unwrap().is_empty());
        assert!(plan(f64::NAN, 300.0, 60.0).unwrap().is_empty());
    }

    #[test]
    fn negligible_tail_is_dropped_without_overlap() {
        // core 100s, tail of 0.5s after ten full windows
        let windows = plan(1000.5, 100.0, 0.0).unwrap();
        assert_eq!(windows.len(), 10);
        assert_close(windows.last().unwrap().end, 1000.0);
    }

    #[test]
    fn windows_are_gap_free_ordered_and_end_at_duration() {
        let durations = [61.0, 333.3, 1000.0, 3599.9, 7200.0];
        let layouts = [(60.0, 0.0), (60.0, 10.0), (300.0, 60.0), (900.0, 60.0), (45.0, 44.0)];

        for duration in durations {
            for (target, overlap) in layouts {
                let windows = plan(duration, target, overlap).unwrap();
                assert!(!windows.is_empty());
                assert_close(windows[0].start, 0.0);
                assert_close(windows.last().unwrap().end, duration);

                for pair in windows.windows(2) {
                    let (prev, next) = (pair[0], pair[1]);
                    assert!(next.start > prev.start, "starts must increase");
                    assert!(next.start <= prev.end, "gap between {prev:?} and {next:?}");
                    let shared = prev.end - next.start;
                    assert!(shared >= 0.0 && shared <= overlap + 1e-9);
                    assert_eq!(next.index, prev.index + 1);
                }
                for window in &windows {
                    assert!(window.start >= 0.0 && window.start < window.end);
                    assert!(window.end <= duration);
                }
            }
        }
    }
}
