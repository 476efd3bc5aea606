// Internal media pipeline using ffmpeg-next
// Requires FFmpeg libraries: libavcodec, libavformat, libavutil, libswscale
//
// To install FFmpeg development libraries:
// - Ubuntu/Debian: sudo apt install libavcodec-dev libavformat-dev libavutil-dev libswscale-dev libavdevice-dev
// - Fedora: sudo dnf install ffmpeg-devel
// - macOS: brew install ffmpeg
// - Windows: Download from https://ffmpeg.org and set FFMPEG_DIR environment variable
//
// The pipeline reads ahead of a wall-clock playback position and publishes
// the result as a `MediaTimeline` plus `MediaEvent`s, which is all the
// stream monitor looks at. Video packets are decoded to RGB frames when
// their presentation time comes up; audio is timed but not rendered.

use crate::player::{MediaKind, PlayerStatus};

/// Decoded video frame for rendering
pub struct DecodedFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGB24 data
    pub pts: i64,
}

#[cfg(feature = "internal-player")]
mod player_impl {
    use std::collections::VecDeque;
    use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
    use std::sync::{Arc, Mutex, MutexGuard};
    use std::thread;
    use std::time::{Duration, Instant};

    extern crate ffmpeg_next as ffmpeg;
    use ffmpeg::format::Pixel;
    use ffmpeg::media::Type;
    use ffmpeg::software::scaling::{context::Context as ScalingContext, flag::Flags};
    use ffmpeg::util::frame::video::Video as VideoFrame;
    use ffmpeg::Packet;
    use tracing::{debug, info};

    use super::DecodedFrame;
    use crate::error::{AppError, Result};
    use crate::media::{MediaTimeline, ReadyState};
    use crate::player::{MediaEvent, MediaKind};

    /// Stop reading once this much media is buffered ahead of the position
    const READ_AHEAD_SECS: f64 = 30.0;
    /// Buffered depth needed before playback (re)starts
    const START_THRESHOLD_SECS: f64 = 2.0;
    /// Buffered ranges further behind the position are forgotten
    const KEEP_BEHIND_SECS: f64 = 30.0;
    const IDLE_SLEEP: Duration = Duration::from_millis(10);
    const MAX_WIDTH: u32 = 1280;
    const MAX_HEIGHT: u32 = 720;

    /// Commands to send to the pipeline thread
    enum PlayerCommand {
        Stop,
        Pause,
        Resume,
    }

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn player_error(context: &'static str) -> impl Fn(ffmpeg::Error) -> AppError {
        move |e| AppError::Player(format!("{}: {}", context, e))
    }

    /// Media position driven by the wall clock while running
    #[derive(Default)]
    struct PlaybackClock {
        position: f64,
        running_since: Option<Instant>,
    }

    impl PlaybackClock {
        fn position(&self, now: Instant) -> f64 {
            match self.running_since {
                Some(since) => self.position + now.saturating_duration_since(since).as_secs_f64(),
                None => self.position,
            }
        }

        fn is_running(&self) -> bool {
            self.running_since.is_some()
        }

        fn run(&mut self, now: Instant) {
            if self.running_since.is_none() {
                self.running_since = Some(now);
            }
        }

        /// Freeze at `position`
        fn halt_at(&mut self, position: f64) {
            self.position = position;
            self.running_since = None;
        }
    }

    /// Video decoder plus RGB scaler
    struct VideoOutput {
        decoder: ffmpeg::decoder::Video,
        scaler: ScalingContext,
        width: u32,
        height: u32,
    }

    impl VideoOutput {
        fn open(parameters: ffmpeg::codec::Parameters) -> Result<Self> {
            let context = ffmpeg::codec::context::Context::from_parameters(parameters)
                .map_err(player_error("Failed to read codec parameters"))?;
            let decoder = context
                .decoder()
                .video()
                .map_err(player_error("Failed to create decoder"))?;

            let (width, height) = (decoder.width(), decoder.height());
            // Scale to reasonable size if too large
            let (target_width, target_height) = if width > MAX_WIDTH || height > MAX_HEIGHT {
                let scale = f64::min(MAX_WIDTH as f64 / width as f64, MAX_HEIGHT as f64 / height as f64);
                ((width as f64 * scale) as u32, (height as f64 * scale) as u32)
            } else {
                (width, height)
            };

            let scaler = ScalingContext::get(
                decoder.format(),
                width,
                height,
                Pixel::RGB24,
                target_width,
                target_height,
                Flags::BILINEAR,
            )
            .map_err(player_error("Failed to create scaler"))?;

            Ok(Self {
                decoder,
                scaler,
                width: target_width,
                height: target_height,
            })
        }

        /// Decode one packet; returns the last frame it produced
        fn decode(&mut self, packet: &Packet) -> Option<DecodedFrame> {
            if self.decoder.send_packet(packet).is_err() {
                return None;
            }

            let mut latest = None;
            let mut decoded = VideoFrame::empty();
            while self.decoder.receive_frame(&mut decoded).is_ok() {
                let mut rgb_frame = VideoFrame::empty();
                if self.scaler.run(&decoded, &mut rgb_frame).is_err() {
                    continue;
                }
                // Copy frame data (handling stride)
                let data = rgb_frame.data(0);
                let stride = rgb_frame.stride(0);
                let row_len = self.width as usize * 3;
                let mut frame_data = Vec::with_capacity(row_len * self.height as usize);
                for y in 0..self.height as usize {
                    let row_start = y * stride;
                    frame_data.extend_from_slice(&data[row_start..row_start + row_len]);
                }
                latest = Some(DecodedFrame {
                    width: self.width,
                    height: self.height,
                    data: frame_data,
                    pts: decoded.pts().unwrap_or(0),
                });
            }
            latest
        }
    }

    /// Internal media player
    pub struct InternalPlayer {
        timeline: Arc<Mutex<MediaTimeline>>,
        current_frame: Arc<Mutex<Option<DecodedFrame>>>,
        command_sender: Option<Sender<PlayerCommand>>,
        event_receiver: Option<Receiver<MediaEvent>>,
        paused: bool,
    }

    impl InternalPlayer {
        pub fn new() -> Self {
            // Initialize FFmpeg
            ffmpeg::init().ok();

            Self {
                timeline: Arc::new(Mutex::new(MediaTimeline::default())),
                current_frame: Arc::new(Mutex::new(None)),
                command_sender: None,
                event_receiver: None,
                paused: false,
            }
        }

        /// Snapshot of the current timeline
        pub fn timeline(&self) -> MediaTimeline {
            lock(&self.timeline).clone()
        }

        /// Get the latest decoded frame
        pub fn take_frame(&self) -> Option<DecodedFrame> {
            lock(&self.current_frame).take()
        }

        /// Drain events reported by the pipeline thread
        pub fn poll_events(&mut self) -> Vec<MediaEvent> {
            let mut events = Vec::new();
            if let Some(ref receiver) = self.event_receiver {
                loop {
                    match receiver.try_recv() {
                        Ok(event) => events.push(event),
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => {
                            self.event_receiver = None;
                            break;
                        }
                    }
                }
            }
            events
        }

        /// Start the pipeline for `url`
        pub fn play(&mut self, kind: MediaKind, url: &str, user_agent: &str) {
            self.stop();
            // Fresh shared state so a thread still winding down cannot touch it
            self.timeline = Arc::new(Mutex::new(MediaTimeline::default()));
            self.current_frame = Arc::new(Mutex::new(None));

            let (cmd_tx, cmd_rx) = channel();
            let (event_tx, event_rx) = channel();
            self.command_sender = Some(cmd_tx);
            self.event_receiver = Some(event_rx);

            let url = url.to_string();
            let user_agent = user_agent.to_string();
            let timeline = Arc::clone(&self.timeline);
            let current_frame = Arc::clone(&self.current_frame);

            thread::spawn(move || {
                info!(url = %url, ?kind, "pipeline started");
                let pipeline = Pipeline {
                    timeline,
                    current_frame,
                    cmd_rx,
                    event_tx: event_tx.clone(),
                };
                if let Err(e) = pipeline.run(kind, &url, &user_agent) {
                    let _ = event_tx.send(MediaEvent::Errored(e.to_string()));
                }
                debug!(url = %url, "pipeline finished");
            });
        }

        /// Stop playback
        pub fn stop(&mut self) {
            if let Some(ref sender) = self.command_sender {
                let _ = sender.send(PlayerCommand::Stop);
            }
            self.command_sender = None;
            self.event_receiver = None;
            self.paused = false;
            lock(&self.timeline).reset();
            *lock(&self.current_frame) = None;
        }

        /// Toggle pause
        pub fn toggle_pause(&mut self) {
            if let Some(ref sender) = self.command_sender {
                let command = if self.paused { PlayerCommand::Resume } else { PlayerCommand::Pause };
                if sender.send(command).is_ok() {
                    self.paused = !self.paused;
                }
            }
        }

        pub fn is_paused(&self) -> bool {
            self.paused
        }
    }

    impl Drop for InternalPlayer {
        fn drop(&mut self) {
            self.stop();
        }
    }

    /// State owned by the pipeline thread
    struct Pipeline {
        timeline: Arc<Mutex<MediaTimeline>>,
        current_frame: Arc<Mutex<Option<DecodedFrame>>>,
        cmd_rx: Receiver<PlayerCommand>,
        event_tx: Sender<MediaEvent>,
    }

    impl Pipeline {
        fn emit(&self, event: MediaEvent) {
            let _ = self.event_tx.send(event);
        }

        fn set_ready(&self, state: ReadyState) {
            lock(&self.timeline).ready_state = state;
        }

        fn run(&self, kind: MediaKind, url: &str, user_agent: &str) -> Result<()> {
            // Set options for network streams
            let mut options = ffmpeg::Dictionary::new();
            options.set("user_agent", user_agent);
            options.set("reconnect", "1");
            options.set("reconnect_streamed", "1");
            options.set("reconnect_delay_max", "5");
            options.set("timeout", "5000000"); // 5 second timeout

            let mut ictx = ffmpeg::format::input_with_dictionary(url, options)
                .map_err(player_error("Failed to open stream"))?;

            let wanted = match kind {
                MediaKind::Audio => Type::Audio,
                MediaKind::Video => Type::Video,
            };
            // The selected stream drives both the clock and the buffered ranges
            let (clock_index, time_base, mut video) = {
                let stream = ictx
                    .streams()
                    .best(wanted)
                    .or_else(|| ictx.streams().best(Type::Audio))
                    .ok_or_else(|| AppError::Player("No playable stream found".to_string()))?;
                let video = if stream.parameters().medium() == Type::Video {
                    Some(VideoOutput::open(stream.parameters())?)
                } else {
                    None
                };
                (stream.index(), f64::from(stream.time_base()), video)
            };
            self.set_ready(ReadyState::HaveMetadata);

            let mut clock = PlaybackClock::default();
            let mut pending: VecDeque<(f64, Packet)> = VecDeque::new();
            let mut first_pts: Option<i64> = None;
            let mut loaded = false;
            let mut started = false;
            let mut paused = false;
            let mut eof = false;

            loop {
                let now = Instant::now();
                match self.cmd_rx.try_recv() {
                    Ok(PlayerCommand::Stop) | Err(TryRecvError::Disconnected) => break,
                    Ok(PlayerCommand::Pause) => {
                        paused = true;
                        clock.halt_at(clock.position(now));
                        lock(&self.timeline).paused = true;
                    }
                    Ok(PlayerCommand::Resume) => {
                        paused = false;
                        lock(&self.timeline).paused = false;
                    }
                    Err(TryRecvError::Empty) => {}
                }

                let position = clock.position(now);
                let (depth, buffered_end) = {
                    let mut timeline = lock(&self.timeline);
                    timeline.current_time = position;
                    timeline.discard_before(position - KEEP_BEHIND_SECS);
                    (timeline.buffered_depth(), timeline.buffered_end())
                };

                if !paused && loaded {
                    if clock.is_running() && depth <= 0.0 && !eof {
                        // Ran dry: freeze at the end of what we have
                        clock.halt_at(buffered_end.unwrap_or(position));
                        self.set_ready(ReadyState::HaveCurrentData);
                        self.emit(MediaEvent::Waiting);
                    } else if !clock.is_running() && (depth >= START_THRESHOLD_SECS || (eof && depth > 0.0)) {
                        if !started {
                            started = true;
                            self.set_ready(ReadyState::HaveFutureData);
                            self.emit(MediaEvent::CanPlay);
                        }
                        clock.run(now);
                        self.set_ready(ReadyState::HaveEnoughData);
                        self.emit(MediaEvent::Playing);
                    }
                }

                if eof && depth <= 0.0 {
                    if !loaded {
                        return Err(AppError::Player("Stream ended before any data arrived".to_string()));
                    }
                    break;
                }

                if let Some(output) = video.as_mut() {
                    let mut frame = None;
                    while pending.front().is_some_and(|(t, _)| *t <= position) {
                        if let Some((_, packet)) = pending.pop_front() {
                            frame = output.decode(&packet).or(frame);
                        }
                    }
                    if let Some(frame) = frame {
                        *lock(&self.current_frame) = Some(frame);
                    }
                }

                let ahead = buffered_end.map_or(0.0, |end| end - position);
                if eof || ahead >= READ_AHEAD_SECS {
                    thread::sleep(IDLE_SLEEP);
                    continue;
                }

                let mut packet = Packet::empty();
                match packet.read(&mut ictx) {
                    Ok(()) => {}
                    Err(ffmpeg::Error::Eof) => {
                        eof = true;
                        continue;
                    }
                    Err(e) => return Err(player_error("Read failed")(e)),
                }
                if packet.stream() != clock_index {
                    continue;
                }
                let Some(pts) = packet.pts().or(packet.dts()) else {
                    continue;
                };

                let base = *first_pts.get_or_insert(pts);
                let start = (pts - base) as f64 * time_base;
                let end = start + packet.duration().max(0) as f64 * time_base;
                lock(&self.timeline).extend_buffered(start, end);

                if !loaded {
                    loaded = true;
                    self.set_ready(ReadyState::HaveCurrentData);
                    self.emit(MediaEvent::LoadedData);
                }
                if video.is_some() {
                    pending.push_back((start, packet));
                }
            }
            Ok(())
        }
    }
}

// Stub implementation when internal-player feature is disabled
#[cfg(not(feature = "internal-player"))]
mod player_impl {
    use super::DecodedFrame;
    use crate::media::MediaTimeline;
    use crate::player::{MediaEvent, MediaKind};

    pub struct InternalPlayer {
        pending: Vec<MediaEvent>,
    }

    impl InternalPlayer {
        pub fn new() -> Self {
            Self { pending: Vec::new() }
        }

        pub fn timeline(&self) -> MediaTimeline {
            MediaTimeline::default()
        }

        pub fn take_frame(&self) -> Option<DecodedFrame> {
            None
        }

        pub fn poll_events(&mut self) -> Vec<MediaEvent> {
            std::mem::take(&mut self.pending)
        }

        pub fn play(&mut self, _kind: MediaKind, _url: &str, _user_agent: &str) {
            self.pending.push(MediaEvent::Errored(crate::player::MSG_PLAYBACK_DISABLED.to_string()));
        }

        pub fn stop(&mut self) {
            self.pending.clear();
        }

        pub fn toggle_pause(&mut self) {}
        pub fn is_paused(&self) -> bool { false }
    }
}

// Re-export
pub use player_impl::*;

/// Player surface embedded in the player view
pub struct PlayerWindow {
    pub player: InternalPlayer,
    pub texture: Option<egui::TextureHandle>,
    kind: MediaKind,
}

impl PlayerWindow {
    pub fn new() -> Self {
        Self {
            player: InternalPlayer::new(),
            texture: None,
            kind: MediaKind::Video,
        }
    }

    /// Play a stream
    pub fn play(&mut self, kind: MediaKind, url: &str, user_agent: &str) {
        self.texture = None;
        self.kind = kind;
        self.player.play(kind, url, user_agent);
    }

    /// Stop playback
    pub fn stop(&mut self) {
        self.player.stop();
        self.texture = None;
    }

    /// Render the media surface with the spinner or error overlay for `status`
    pub fn show(&mut self, ctx: &egui::Context, ui: &mut egui::Ui, status: &PlayerStatus) {
        // Check for new frames
        if let Some(frame) = self.player.take_frame() {
            let image = egui::ColorImage::from_rgb([frame.width as usize, frame.height as usize], &frame.data);
            self.texture = Some(ctx.load_texture("video_frame", image, egui::TextureOptions::LINEAR));
        }

        ui.vertical_centered(|ui| {
            if let Some(error) = status.error_message() {
                ui.add_space(50.0);
                ui.colored_label(egui::Color32::RED, error);
                return;
            }

            if let Some(ref texture) = self.texture {
                let available = ui.available_size();
                let tex_size = texture.size_vec2();
                let aspect = tex_size.x / tex_size.y;

                let (width, height) = if available.x / available.y > aspect {
                    (available.y * aspect * 0.9, available.y * 0.9)
                } else {
                    (available.x * 0.9, available.x / aspect * 0.9)
                };
                ui.image((texture.id(), egui::vec2(width, height)));
            } else {
                ui.add_space(50.0);
                if self.kind == MediaKind::Audio {
                    ui.label(egui::RichText::new("♪ Audio stream").size(18.0));
                }
            }

            if let Some(message) = status.spinner_message() {
                ui.add_space(10.0);
                ui.spinner();
                ui.label(message);
            }
        });

        ui.horizontal(|ui| {
            let pause_text = if self.player.is_paused() { "▶ Play" } else { "⏸ Pause" };
            if ui
                .add_enabled(status.error_message().is_none(), egui::Button::new(pause_text))
                .clicked()
            {
                self.player.toggle_pause();
            }
        });

        // Request continuous repaint while the pipeline is alive
        if status.error_message().is_none() {
            ctx.request_repaint();
        }
    }
}
