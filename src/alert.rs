//! Low-bitrate alert sound
//!
//! With the `alert-sound` feature a short tone is played on the default
//! output device; without it the alert is only logged.

use tracing::warn;

/// Tone played once per low-bitrate episode
#[derive(Debug, Clone, Copy)]
pub struct AlertSound {
    enabled: bool,
}

impl AlertSound {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Fire and forget; never blocks the caller
    pub fn play_once(&self) {
        if !self.enabled {
            return;
        }
        warn!("low bitrate alert");
        #[cfg(feature = "alert-sound")]
        tone::spawn();
    }
}

#[cfg(feature = "alert-sound")]
mod tone {
    use std::thread;
    use std::time::Duration;

    use rodio::source::{SineWave, Source};
    use rodio::{OutputStream, Sink};
    use tracing::debug;

    const FREQUENCY_HZ: f32 = 880.0;
    const LENGTH: Duration = Duration::from_millis(400);
    const VOLUME: f32 = 0.25;

    pub(super) fn spawn() {
        thread::spawn(|| {
            // The output stream must outlive the sink, so both stay on this thread
            let (_stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    debug!(error = %e, "no audio output for alert");
                    return;
                }
            };
            let sink = match Sink::try_new(&handle) {
                Ok(sink) => sink,
                Err(e) => {
                    debug!(error = %e, "cannot open alert sink");
                    return;
                }
            };
            sink.append(SineWave::new(FREQUENCY_HZ).take_duration(LENGTH).amplify(VOLUME));
            sink.sleep_until_end();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_alert_is_silent() {
        let alert = AlertSound::new(false);
        assert!(!alert.is_enabled());
        alert.play_once();
    }
}
