//! Media timeline as observed from outside the decoder
//!
//! Mirrors what a media element exposes: how far loading has progressed,
//! the playback position and which time ranges are already downloaded.

/// Loading progress, ordered from least to most data available
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ReadyState {
    #[default]
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

/// Half-open span of media time in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t <= self.end
    }
}

/// Gaps up to this size still extend the current range
const MERGE_TOLERANCE_SECS: f64 = 1.0;

#[derive(Debug, Clone, Default)]
pub struct MediaTimeline {
    pub ready_state: ReadyState,
    pub current_time: f64,
    pub buffered: Vec<TimeRange>,
    pub paused: bool,
}

impl MediaTimeline {
    /// Seconds downloaded ahead of the playback position; 0 when the
    /// position lies outside every buffered range
    pub fn buffered_depth(&self) -> f64 {
        self.buffered
            .iter()
            .find(|range| range.contains(self.current_time))
            .map(|range| range.end - self.current_time)
            .unwrap_or(0.0)
    }

    /// End of the range holding the playback position
    pub fn buffered_end(&self) -> Option<f64> {
        self.buffered
            .iter()
            .find(|range| range.contains(self.current_time))
            .map(|range| range.end)
    }

    /// Record that media up to `end` has been downloaded
    pub fn extend_buffered(&mut self, start: f64, end: f64) {
        if end < start {
            return;
        }
        match self.buffered.last_mut() {
            Some(last) if start >= last.start && start <= last.end + MERGE_TOLERANCE_SECS => {
                last.end = last.end.max(end);
            }
            _ => self.buffered.push(TimeRange { start, end }),
        }
    }

    /// Forget ranges that end before `t`
    pub fn discard_before(&mut self, t: f64) {
        self.buffered.retain(|range| range.end >= t);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_from_range_containing_position() {
        let timeline = MediaTimeline {
            ready_state: ReadyState::HaveEnoughData,
            current_time: 12.0,
            buffered: vec![
                TimeRange { start: 0.0, end: 5.0 },
                TimeRange { start: 10.0, end: 22.5 },
            ],
            paused: false,
        };
        assert_eq!(timeline.buffered_depth(), 10.5);
        assert_eq!(timeline.buffered_end(), Some(22.5));
    }

    #[test]
    fn test_depth_zero_outside_ranges() {
        let timeline = MediaTimeline {
            current_time: 7.0,
            buffered: vec![TimeRange { start: 0.0, end: 5.0 }],
            ..MediaTimeline::default()
        };
        assert_eq!(timeline.buffered_depth(), 0.0);
        assert_eq!(MediaTimeline::default().buffered_depth(), 0.0);
    }

    #[test]
    fn test_extend_merges_contiguous_packets() {
        let mut timeline = MediaTimeline::default();
        timeline.extend_buffered(0.0, 0.04);
        timeline.extend_buffered(0.04, 0.08);
        timeline.extend_buffered(0.5, 2.0);
        assert_eq!(timeline.buffered, vec![TimeRange { start: 0.0, end: 2.0 }]);

        timeline.extend_buffered(30.0, 31.0);
        assert_eq!(timeline.buffered.len(), 2);

        timeline.discard_before(10.0);
        assert_eq!(timeline.buffered, vec![TimeRange { start: 30.0, end: 31.0 }]);
    }

    #[test]
    fn test_ready_state_ordering() {
        assert!(ReadyState::HaveCurrentData >= ReadyState::HaveCurrentData);
        assert!(ReadyState::HaveEnoughData > ReadyState::HaveCurrentData);
        assert!(ReadyState::HaveMetadata < ReadyState::HaveCurrentData);
    }
}
