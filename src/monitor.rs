//! Stream monitoring
//!
//! Pure-logic trackers for the player dashboard. Every operation takes the
//! current `Instant` explicitly; nothing here touches I/O.
//!
//! The bitrate figure is a proxy: growth of the buffered depth between two
//! ticks multiplied by a fixed factor. It is not derived from transferred
//! bytes and must not be read as a real bitrate.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::monitor::{
    BITRATE_FACTOR, BLINK_PERIOD, CAUTION_BITRATE, HEALTHY_BITRATE, HISTORY_CAPACITY, LOW_BITRATE,
    LOW_BITRATE_RELOAD_AFTER, SCALE_FLOOR, SCALE_WINDOW,
};

/// Fixed-capacity FIFO of samples; the oldest sample is evicted first
#[derive(Debug, Clone)]
pub struct SampleRing {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl Default for SampleRing {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

impl SampleRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, value: f64) {
        self.samples.push_back(value);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    /// Samples in arrival order
    pub fn to_vec(&self) -> Vec<f64> {
        self.iter().collect()
    }

    /// The `n` most recent samples, oldest first
    pub fn recent(&self, n: usize) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().skip(self.samples.len().saturating_sub(n)).copied()
    }

    pub fn max(&self) -> Option<f64> {
        self.iter().reduce(f64::max)
    }

    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            None
        } else {
            Some(self.iter().sum::<f64>() / self.samples.len() as f64)
        }
    }
}

/// Colour band of the current estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitrateHealth {
    Healthy,
    Caution,
    Critical,
}

impl BitrateHealth {
    pub fn classify(rate: f64) -> Self {
        if rate >= HEALTHY_BITRATE {
            BitrateHealth::Healthy
        } else if rate >= CAUTION_BITRATE {
            BitrateHealth::Caution
        } else {
            BitrateHealth::Critical
        }
    }
}

/// Proxy rate for a growth of `delta_secs` seconds of buffered media,
/// rounded to one decimal like the dashboard shows it
pub fn estimate_rate(delta_secs: f64) -> f64 {
    (delta_secs * BITRATE_FACTOR * 10.0).round() / 10.0
}

/// Smallest multiple of 100 covering `values`, never below the floor
pub fn scale_to_hundreds(values: impl Iterator<Item = f64>) -> f64 {
    let max = values.fold(SCALE_FLOOR, f64::max);
    (max / 100.0).ceil() * 100.0
}

/// Buffered-depth based bitrate tracker
#[derive(Debug, Default)]
pub struct BitrateMonitor {
    previous: Option<(Instant, f64)>,
    buffered_depth: f64,
    latest: Option<f64>,
    history: SampleRing,
    max: Option<f64>,
    min: Option<f64>,
}

impl BitrateMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the buffered depth observed at `now`. Returns the estimate for
    /// this tick, or `None` when the buffer did not grow.
    pub fn record(&mut self, now: Instant, depth: f64) -> Option<f64> {
        let estimate = match self.previous {
            Some((then, previous_depth)) if now > then => {
                let delta = depth - previous_depth;
                let elapsed = now.duration_since(then).as_secs_f64();
                (delta > 0.0 && elapsed > 0.0).then(|| estimate_rate(delta))
            }
            _ => None,
        };

        self.previous = Some((now, depth));
        self.buffered_depth = depth;
        self.latest = estimate;

        if let Some(rate) = estimate {
            self.history.push(rate);
            self.max = Some(self.max.map_or(rate, |m| m.max(rate)));
            self.min = Some(self.min.map_or(rate, |m| m.min(rate)));
            debug!(rate, depth, "bitrate sample");
        }
        estimate
    }

    pub fn buffered_depth(&self) -> f64 {
        self.buffered_depth
    }

    /// Estimate from the last tick (`None` if it was undefined)
    pub fn latest(&self) -> Option<f64> {
        self.latest
    }

    /// Most recent valid estimate
    pub fn last_valid(&self) -> Option<f64> {
        self.history.last()
    }

    pub fn history(&self) -> &SampleRing {
        &self.history
    }

    pub fn average(&self) -> Option<f64> {
        self.history.mean()
    }

    /// Largest estimate seen since the session started
    pub fn max(&self) -> Option<f64> {
        self.max
    }

    /// Smallest estimate seen since the session started
    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn health(&self) -> Option<BitrateHealth> {
        self.last_valid().map(BitrateHealth::classify)
    }

    /// Graph scale from the most recent samples only
    pub fn scale_max(&self) -> f64 {
        scale_to_hundreds(self.history.recent(SCALE_WINDOW))
    }
}

/// What the dashboard must do after an alarm observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmAction {
    None,
    PlaySound,
    Reload,
}

/// Low-bitrate alarm with one sound per episode and a reload after a
/// sustained episode
#[derive(Debug, Default)]
pub struct LowBitrateAlarm {
    episode_start: Option<Instant>,
    sound_played: bool,
    reload_requested: bool,
}

impl LowBitrateAlarm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, now: Instant, rate: f64) -> AlarmAction {
        if rate >= LOW_BITRATE {
            if self.episode_start.is_some() {
                debug!(rate, "bitrate recovered");
            }
            *self = Self::default();
            return AlarmAction::None;
        }

        let mut action = AlarmAction::None;
        if !self.sound_played {
            self.sound_played = true;
            action = AlarmAction::PlaySound;
        }

        match self.episode_start {
            None => {
                warn!(rate, "bitrate below alarm threshold");
                self.episode_start = Some(now);
            }
            Some(start) => {
                let sustained = now.saturating_duration_since(start);
                if sustained > LOW_BITRATE_RELOAD_AFTER && !self.reload_requested {
                    warn!(secs = sustained.as_secs_f64(), "sustained low bitrate, reloading");
                    self.reload_requested = true;
                    action = AlarmAction::Reload;
                }
            }
        }
        action
    }

    pub fn is_active(&self) -> bool {
        self.episode_start.is_some()
    }

    /// Indicator visibility for a blink with a 500 ms half-period
    pub fn indicator_visible(&self, now: Instant) -> bool {
        match self.episode_start {
            Some(start) => {
                let elapsed = now.saturating_duration_since(start).as_millis();
                (elapsed / BLINK_PERIOD.as_millis()) % 2 == 0
            }
            None => false,
        }
    }
}

/// Origin reachability as last observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerStatus {
    #[default]
    Unknown,
    Available,
    Unavailable,
    /// The stream URL has no usable origin
    Error,
}

impl ServerStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ServerStatus::Unknown => "-",
            ServerStatus::Available => "Available",
            ServerStatus::Unavailable => "Unavailable",
            ServerStatus::Error => "Error",
        }
    }
}

/// Result of one ping attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingOutcome {
    Answered(Duration),
    Failed,
    BadUrl,
}

/// Round-trip history of the origin ping
#[derive(Debug, Default)]
pub struct PingMonitor {
    samples: SampleRing,
    status: ServerStatus,
    last_ms: Option<u64>,
}

impl PingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: PingOutcome) {
        match outcome {
            PingOutcome::Answered(rtt) => {
                let ms = (rtt.as_secs_f64() * 1000.0).round() as u64;
                self.samples.push(ms as f64);
                self.status = ServerStatus::Available;
                self.last_ms = Some(ms);
            }
            PingOutcome::Failed => {
                self.status = ServerStatus::Unavailable;
                self.last_ms = None;
            }
            PingOutcome::BadUrl => {
                self.status = ServerStatus::Error;
            }
        }
    }

    pub fn status(&self) -> ServerStatus {
        self.status
    }

    pub fn last_ms(&self) -> Option<u64> {
        self.last_ms
    }

    pub fn samples(&self) -> &SampleRing {
        &self.samples
    }

    /// Largest sample or the floor, whichever is larger
    pub fn scale_max(&self) -> f64 {
        self.samples.max().unwrap_or(SCALE_FLOOR).max(SCALE_FLOOR)
    }
}

/// Fixed-interval timer polled from the UI loop
#[derive(Debug, Clone)]
pub struct Cadence {
    interval: Duration,
    next: Instant,
}

impl Cadence {
    /// First tick fires one interval after `start`
    pub fn new(start: Instant, interval: Duration) -> Self {
        Self {
            interval,
            next: start + interval,
        }
    }

    /// True once per elapsed interval; missed ticks are not replayed
    pub fn due(&mut self, now: Instant) -> bool {
        if now < self.next {
            return false;
        }
        self.next += self.interval;
        if self.next <= now {
            self.next = now + self.interval;
        }
        true
    }

    pub fn until_next(&self, now: Instant) -> Duration {
        self.next.saturating_duration_since(now)
    }
}
