//! Player session
//!
//! One session per opened station. Everything the player view mutates
//! lives here and is dropped with it; a reload builds a fresh session
//! from the same parameters.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::alert::AlertSound;
use crate::config::monitor::{PING_INTERVAL, STATS_INTERVAL};
use crate::config::network::PING_TIMEOUT;
use crate::config::AppConfig;
use crate::ffmpeg_player::PlayerWindow;
use crate::media::{MediaTimeline, ReadyState};
use crate::models::{PlayerParams, Station};
use crate::monitor::{AlarmAction, BitrateMonitor, Cadence, LowBitrateAlarm, PingMonitor, PingOutcome};
use crate::ping;
use crate::player::{self, MediaKind, PlayerStatus, Quality, DEFAULT_TITLE};

/// What the view must do after a session tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    None,
    Reload,
}

/// Both periodic monitors and their cadences
pub struct StreamMonitor {
    pub bitrate: BitrateMonitor,
    pub alarm: LowBitrateAlarm,
    pub ping: PingMonitor,
    stats_cadence: Cadence,
    ping_cadence: Cadence,
}

impl StreamMonitor {
    pub fn new(start: Instant) -> Self {
        Self {
            bitrate: BitrateMonitor::new(),
            alarm: LowBitrateAlarm::new(),
            ping: PingMonitor::new(),
            stats_cadence: Cadence::new(start, STATS_INTERVAL),
            ping_cadence: Cadence::new(start, PING_INTERVAL),
        }
    }

    /// One stats tick. Skipped while the media has no current data.
    pub fn sample(&mut self, now: Instant, timeline: &MediaTimeline) -> AlarmAction {
        if timeline.ready_state < ReadyState::HaveCurrentData {
            return AlarmAction::None;
        }
        match self.bitrate.record(now, timeline.buffered_depth()) {
            Some(rate) => self.alarm.observe(now, rate),
            None => AlarmAction::None,
        }
    }

    pub fn stats_due(&mut self, now: Instant) -> bool {
        self.stats_cadence.due(now)
    }

    pub fn ping_due(&mut self, now: Instant) -> bool {
        self.ping_cadence.due(now)
    }

    /// Time until either cadence fires next
    pub fn until_next(&self, now: Instant) -> Duration {
        self.stats_cadence
            .until_next(now)
            .min(self.ping_cadence.until_next(now))
    }
}

pub struct PlayerSession {
    params: PlayerParams,
    kind: MediaKind,
    quality: Option<Quality>,
    status: PlayerStatus,
    playlist: Vec<Station>,
    monitor: StreamMonitor,
    ping_tx: Sender<PingOutcome>,
    ping_rx: Receiver<PingOutcome>,
    user_agent: String,
    alert: AlertSound,
    window: PlayerWindow,
}

impl PlayerSession {
    /// Build the session and attach the stream
    pub fn start(params: PlayerParams, playlist: Vec<Station>, config: &AppConfig) -> Self {
        let kind = MediaKind::classify(&params.url);
        let quality = Quality::classify(&params.url);
        let (ping_tx, ping_rx) = channel();

        let mut window = PlayerWindow::new();
        window.play(kind, &params.url, &config.user_agent);
        info!(name = %params.name, url = %params.url, ?kind, "player session started");

        Self {
            params,
            kind,
            quality,
            status: PlayerStatus::Idle,
            playlist,
            monitor: StreamMonitor::new(Instant::now()),
            ping_tx,
            ping_rx,
            user_agent: config.user_agent.clone(),
            alert: AlertSound::new(config.alert_sound),
            window,
        }
    }

    pub fn params(&self) -> &PlayerParams {
        &self.params
    }

    pub fn title(&self) -> &str {
        if self.params.name.is_empty() {
            DEFAULT_TITLE
        } else {
            &self.params.name
        }
    }

    /// Logo URL, only when it looks like a web address
    pub fn logo(&self) -> Option<&str> {
        let logo = self.params.logo.as_str();
        logo.starts_with("http").then_some(logo)
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn quality(&self) -> Option<Quality> {
        self.quality
    }

    pub fn status(&self) -> &PlayerStatus {
        &self.status
    }

    pub fn monitor(&self) -> &StreamMonitor {
        &self.monitor
    }

    pub fn timeline(&self) -> MediaTimeline {
        self.window.player.timeline()
    }

    pub fn share_link(&self) -> String {
        self.params.share_link()
    }

    /// Parameters of the neighbouring station in the playlist snapshot
    pub fn go_to(&self, offset: isize) -> Option<PlayerParams> {
        player::navigate(&self.params, &self.playlist, offset)
    }

    /// Drive the status machine and both monitors up to `now`
    pub fn tick(&mut self, now: Instant) -> SessionAction {
        for event in self.window.player.poll_events() {
            self.status = self.status.on_event(&event);
        }

        let mut action = SessionAction::None;
        if self.monitor.stats_due(now) {
            let timeline = self.window.player.timeline();
            match self.monitor.sample(now, &timeline) {
                AlarmAction::PlaySound => self.alert.play_once(),
                AlarmAction::Reload => action = SessionAction::Reload,
                AlarmAction::None => {}
            }
        }

        if self.monitor.ping_due(now) {
            ping::spawn_ping(&self.params.url, &self.user_agent, PING_TIMEOUT, self.ping_tx.clone());
        }
        while let Ok(outcome) = self.ping_rx.try_recv() {
            if outcome == PingOutcome::BadUrl {
                warn!(url = %self.params.url, "stream url has no origin to ping");
            }
            self.monitor.ping.record(outcome);
        }

        action
    }

    pub fn until_next_tick(&self, now: Instant) -> Duration {
        self.monitor.until_next(now)
    }

    /// Render the media surface
    pub fn show_media(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        self.window.show(ctx, ui, &self.status);
    }

    pub fn stop(&mut self) {
        self.window.stop();
    }
}
