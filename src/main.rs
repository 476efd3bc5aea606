//! IPTV Grid
//! Desktop playlist manager with a live stream health monitor

// Hide console window on Windows release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

// Use mimalloc for faster memory allocation (Linux, macOS)
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::Parser;
use eframe::egui;
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

mod alert;
mod config;
mod error;
mod ffmpeg_player;
mod graph;
mod grid;
mod library;
mod logo;
mod m3u_parser;
mod media;
mod models;
mod monitor;
mod ping;
mod player;
mod probe;
mod session;
mod storage;

use config::ui::{CONSOLE_LOG_LIMIT, EXPORT_FILE_NAME};
use config::AppConfig;
use graph::Series;
use grid::{GroupFilter, TileView};
use library::{LocalImport, StationLibrary};
use logo::LogoCache;
use models::{PlayerParams, Station, View};
use monitor::{BitrateHealth, ServerStatus};
use player::Startup;
use probe::HttpProber;
use session::{PlayerSession, SessionAction};
use storage::FileStore;

const TILE_WIDTH: f32 = 150.0;
const LOGO_SIZE: [f32; 2] = [140.0, 80.0];
const GRAPH_HEIGHT: f32 = 120.0;
const STATS_PANEL_WIDTH: f32 = 320.0;

const COLOR_HEALTHY: egui::Color32 = egui::Color32::from_rgb(0x00, 0xff, 0x88);
const COLOR_CAUTION: egui::Color32 = egui::Color32::from_rgb(0xff, 0xff, 0x55);
const COLOR_CRITICAL: egui::Color32 = egui::Color32::from_rgb(0xff, 0x44, 0x44);
const COLOR_GRAPH_BG: egui::Color32 = egui::Color32::from_rgb(0x11, 0x11, 0x11);
const COLOR_BADGE: egui::Color32 = egui::Color32::from_rgb(0x66, 0x7e, 0xea);

#[derive(Parser, Debug)]
#[command(name = "iptv-grid")]
#[command(version)]
#[command(about = "IPTV playlist manager with a live stream monitor", long_about = None)]
#[command(after_help = "Stream playback and the live monitor need a build with `--features internal-player`.")]
struct Args {
    /// Start in the player with a share link or `name=..&url=..` query
    #[arg(long, value_name = "QUERY")]
    open: Option<String>,

    /// Directory holding the saved playlist
    #[arg(long, value_name = "PATH")]
    store_dir: Option<PathBuf>,
}

/// Application icon: a 3x3 channel grid on a rounded square
fn load_icon() -> egui::IconData {
    let size: usize = 64;
    let mut rgba = vec![0u8; size * size * 4];

    let lerp = |a: f32, b: f32, t: f32| (a + (b - a) * t) as u8;

    for y in 0..size {
        for x in 0..size {
            let idx = (y * size + x) * 4;
            let nx = x as f32 / size as f32;
            let ny = y as f32 / size as f32;

            // Outside the rounded square stays transparent
            let radius = 0.15;
            let dx = (radius - nx).max(nx - (1.0 - radius)).max(0.0);
            let dy = (radius - ny).max(ny - (1.0 - radius)).max(0.0);
            if dx * dx + dy * dy > radius * radius {
                continue;
            }

            // Dark blue to teal background
            let t = nx * 0.5 + ny * 0.5;
            let mut pixel = [lerp(18.0, 10.0, t), lerp(24.0, 70.0, t), lerp(60.0, 90.0, t), 255];

            // Tiles: three cells of 0.24 starting at 0.16, each with a gap
            let gx = (nx - 0.16) / 0.24;
            let gy = (ny - 0.16) / 0.24;
            if (0.0..3.0).contains(&gx) && (0.0..3.0).contains(&gy) && gx.fract() < 0.8 && gy.fract() < 0.8 {
                pixel = match (gx as u32, gy as u32) {
                    (1, 1) => [0x00, 0xf0, 0xff, 255],
                    (2, 2) => [0x70, 0x40, 0x48, 255],
                    _ => [225, 230, 240, 255],
                };
            }

            rgba[idx..idx + 4].copy_from_slice(&pixel);
        }
    }

    egui::IconData {
        rgba,
        width: size as u32,
        height: size as u32,
    }
}

/// Register the first system emoji font found, if any
fn install_emoji_font(fonts: &mut egui::FontDefinitions) {
    #[cfg(target_os = "windows")]
    let candidates: &[&str] = &["C:\\Windows\\Fonts\\seguiemj.ttf"];
    #[cfg(target_os = "linux")]
    let candidates: &[&str] = &[
        "/usr/share/fonts/truetype/noto/NotoColorEmoji.ttf",
        "/usr/share/fonts/noto-emoji/NotoColorEmoji.ttf",
        "/usr/share/fonts/google-noto-emoji/NotoColorEmoji.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    ];
    #[cfg(target_os = "macos")]
    let candidates: &[&str] = &["/System/Library/Fonts/Apple Color Emoji.ttc"];
    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    let candidates: &[&str] = &[];

    for path in candidates {
        if let Ok(font_data) = fs::read(path) {
            fonts
                .font_data
                .insert("emoji".to_owned(), egui::FontData::from_owned(font_data).into());
            fonts
                .families
                .entry(egui::FontFamily::Proportional)
                .or_default()
                .push("emoji".to_owned());
            break;
        }
    }
}

fn main() -> Result<(), eframe::Error> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("iptv_grid=info")))
        .init();

    // Force X11 backend on Linux before any windowing code runs
    #[cfg(target_os = "linux")]
    {
        std::env::set_var("WINIT_UNIX_BACKEND", "x11");
        std::env::remove_var("WAYLAND_DISPLAY");
    }

    let config = AppConfig::load();
    let store_dir = args.store_dir.clone().unwrap_or_else(|| config.store_dir());
    info!(store = %store_dir.display(), "starting");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1250.0, 760.0])
            .with_min_inner_size([900.0, 550.0])
            .with_icon(load_icon()),
        vsync: true,
        hardware_acceleration: eframe::HardwareAcceleration::Preferred,
        ..Default::default()
    };

    eframe::run_native(
        "IPTV Grid",
        options,
        Box::new(move |cc| {
            let mut fonts = egui::FontDefinitions::default();
            install_emoji_font(&mut fonts);
            cc.egui_ctx.set_fonts(fonts);
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
            Ok(Box::new(IptvGridApp::new(config, store_dir, args.open)))
        }),
    )
}

/// Background task messages
enum TaskResult {
    /// Parsed and probed playlist, ready to replace the collection
    Imported { stations: Vec<Station>, source: String },
    /// Contents of an exported backup file
    BackupLoaded { json: String, source: String },
    /// Local file could not be read; logged only
    LocalReadFailed(String),
    /// Remote playlist could not be fetched; shown to the user
    RemoteFailed(String),
}

/// UI requests raised while drawing the player view
enum PlayerAction {
    Back,
    Navigate(isize),
    ToggleFullscreen,
    Share,
    Diagnostics,
}

struct IptvGridApp {
    config: AppConfig,
    library: StationLibrary<FileStore>,
    view: View,

    // Manager state
    group_filter: GroupFilter,
    url_input: String,
    show_sidebar: bool,
    loading: bool,
    status_message: String,

    // Background task channel
    task_receiver: Receiver<TaskResult>,
    task_sender: Sender<TaskResult>,

    // Player state
    session: Option<PlayerSession>,
    logos: LogoCache,

    // Dialogs
    alert: Option<String>,
    share_link: Option<String>,
    show_diagnostics: bool,

    console_log: Vec<String>,
}

impl IptvGridApp {
    fn new(config: AppConfig, store_dir: PathBuf, open: Option<String>) -> Self {
        let (task_sender, task_receiver) = channel();
        let library = StationLibrary::open(FileStore::new(store_dir));
        let logos = LogoCache::new(&config.user_agent);

        let mut app = Self {
            config,
            library,
            view: View::Manager,
            group_filter: GroupFilter::All,
            url_input: String::new(),
            show_sidebar: true,
            loading: false,
            status_message: "Ready".to_string(),
            task_receiver,
            task_sender,
            session: None,
            logos,
            alert: None,
            share_link: None,
            show_diagnostics: false,
            console_log: Vec::new(),
        };

        let count = app.library.len();
        let dir = app.library.store().dir().display().to_string();
        app.log(
            Level::INFO,
            &format!("IPTV Grid started, {} saved stations in {}", count, dir),
        );
        if count > 0 {
            app.status_message = format!("{} channels", count);
        }
        if let Some(notice) = player::playback_notice() {
            app.log(Level::WARN, notice);
        }

        if let Some(query) = open {
            app.start_player(PlayerParams::from_query(&query));
        }
        app
    }

    /// Append to the console log and mirror the line to tracing
    fn log(&mut self, level: Level, message: &str) {
        if level == Level::ERROR {
            error!("{}", message);
        } else if level == Level::WARN {
            warn!("{}", message);
        } else {
            info!("{}", message);
        }
        let timestamp = chrono::Local::now().format("%H:%M:%S");
        self.console_log.push(format!("[{}] [{}] {}", timestamp, level, message));
        if self.console_log.len() > CONSOLE_LOG_LIMIT {
            self.console_log.remove(0);
        }
    }

    fn show_alert(&mut self, message: impl Into<String>) {
        self.alert = Some(message.into());
    }

    // ---- Import / export ----

    fn import_file(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .set_title("Open Playlist")
            .add_filter("Playlists", &["m3u", "m3u8", "txt", "json"])
            .add_filter("All Files", &["*"])
            .pick_file()
        else {
            return;
        };

        self.loading = true;
        self.status_message = "Checking channels...".to_string();
        self.show_sidebar = false;

        let sender = self.task_sender.clone();
        let timeout = self.config.probe_timeout();
        let user_agent = self.config.user_agent.clone();

        thread::spawn(move || {
            let source = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let prober = HttpProber::new(timeout, &user_agent);
            let result = match library::read_local_import(&path, &prober) {
                Ok(LocalImport::Backup(json)) => TaskResult::BackupLoaded { json, source },
                Ok(LocalImport::Playlist(stations)) => TaskResult::Imported { stations, source },
                Err(e) => TaskResult::LocalReadFailed(format!("{}: {}", path.display(), e)),
            };
            let _ = sender.send(result);
        });
    }

    fn import_url(&mut self) {
        let url = self.url_input.trim().to_string();
        if url.is_empty() {
            self.show_alert("Enter a playlist link.");
            return;
        }

        self.loading = true;
        self.status_message = "Downloading playlist...".to_string();
        self.log(Level::INFO, &format!("Downloading playlist {}", url));

        let sender = self.task_sender.clone();
        let timeout = self.config.probe_timeout();
        let user_agent = self.config.user_agent.clone();

        thread::spawn(move || match m3u_parser::download_text(&url, &user_agent) {
            Ok(content) => {
                let parsed = m3u_parser::parse_playlist(&content, &url);
                let prober = HttpProber::new(timeout, &user_agent);
                let stations = probe::probe_all(&prober, parsed);
                let _ = sender.send(TaskResult::Imported { stations, source: url });
            }
            Err(e) => {
                let _ = sender.send(TaskResult::RemoteFailed(e.to_string()));
            }
        });
    }

    fn export_playlist(&mut self) {
        match self.library.export_json() {
            Ok(Some(_)) => {}
            Ok(None) => {
                self.show_alert("Nothing to export.");
                return;
            }
            Err(e) => {
                self.log(Level::ERROR, &format!("Export failed: {}", e));
                self.show_alert(format!("Export failed: {}", e));
                return;
            }
        }

        let Some(path) = rfd::FileDialog::new()
            .set_title("Export Playlist")
            .set_file_name(EXPORT_FILE_NAME)
            .add_filter("JSON", &["json"])
            .save_file()
        else {
            return;
        };

        match self.library.export_to(&path) {
            Ok(true) => {
                self.log(Level::INFO, &format!("Exported playlist to {}", path.display()));
                self.status_message = format!("Exported to {}", path.display());
            }
            Ok(false) => self.show_alert("Nothing to export."),
            Err(e) => {
                self.log(Level::ERROR, &format!("Export failed: {}", e));
                self.show_alert(format!("Export failed: {}", e));
            }
        }
    }

    fn clear_playlist(&mut self) {
        match self.library.clear() {
            Ok(()) => {
                self.group_filter = GroupFilter::All;
                self.status_message = "Ready".to_string();
                self.log(Level::INFO, "Playlist cleared");
                self.show_alert("Playlist cleared.");
            }
            Err(e) => {
                self.log(Level::ERROR, &format!("Could not clear the playlist: {}", e));
                self.show_alert(format!("Could not clear the playlist: {}", e));
            }
        }
    }

    fn process_tasks(&mut self) {
        while let Ok(result) = self.task_receiver.try_recv() {
            self.loading = false;
            match result {
                TaskResult::Imported { stations, source } => {
                    let total = stations.len();
                    let unreachable = stations.iter().filter(|s| s.is_unreachable()).count();
                    match self.library.replace_all(stations) {
                        Ok(()) => {
                            self.group_filter = GroupFilter::All;
                            if self.url_input.trim() == source {
                                self.url_input.clear();
                            }
                            self.log(
                                Level::INFO,
                                &format!("Loaded {} channels from {} ({} unreachable)", total, source, unreachable),
                            );
                            self.status_message = format!("Loaded {} channels", total);
                        }
                        Err(e) => {
                            self.log(Level::ERROR, &format!("Could not save the playlist: {}", e));
                            self.show_alert(format!("Could not save the playlist: {}", e));
                        }
                    }
                }
                TaskResult::BackupLoaded { json, source } => match self.library.restore_backup(&json) {
                    Ok(count) => {
                        self.group_filter = GroupFilter::All;
                        self.log(Level::INFO, &format!("Restored {} channels from {}", count, source));
                        self.status_message = format!("Loaded {} channels", count);
                    }
                    Err(e) => {
                        self.log(Level::ERROR, &format!("Invalid backup {}: {}", source, e));
                        self.show_alert(format!("Invalid backup file: {}", e));
                    }
                },
                TaskResult::LocalReadFailed(msg) => {
                    self.log(Level::ERROR, &format!("Could not read playlist file {}", msg));
                    self.status_message = "Could not read the file".to_string();
                }
                TaskResult::RemoteFailed(msg) => {
                    self.log(Level::ERROR, &format!("Playlist download failed: {}", msg));
                    self.status_message = "Download failed".to_string();
                    self.show_alert(format!("Could not load the playlist: {}", msg));
                }
            }
        }
    }

    // ---- Player lifecycle ----

    /// Enter the player from navigation parameters, falling back to the
    /// last opened station when they carry no stream
    fn start_player(&mut self, params: PlayerParams) {
        match player::resolve_startup(params, self.library.stations(), self.library.last_opened()) {
            Startup::Play(params) => self.open_player(params),
            Startup::Redirect(params) => {
                self.log(Level::INFO, &format!("No stream given, reopening '{}'", params.name));
                self.open_player(params);
            }
            Startup::Empty => {
                self.log(Level::WARN, "No station to play");
                self.status_message = "No station to play".to_string();
            }
        }
    }

    fn open_station(&mut self, index: usize) {
        let params = match self.library.open_station(index) {
            Ok(params) => params,
            Err(e) => {
                self.log(Level::WARN, &format!("Could not remember last station: {}", e));
                self.library.params_for(index)
            }
        };
        if let Some(params) = params {
            self.open_player(params);
        }
    }

    /// Start a fresh session; any previous one is discarded
    fn open_player(&mut self, params: PlayerParams) {
        if let Some(mut old) = self.session.take() {
            old.stop();
        }
        self.log(Level::INFO, &format!("Opening '{}' {}", params.name, params.url));
        let playlist = self.library.stations().to_vec();
        self.session = Some(PlayerSession::start(params, playlist, &self.config));
        self.view = View::Player;
    }

    fn reload_player(&mut self) {
        if let Some(params) = self.session.as_ref().map(|s| s.params().clone()) {
            self.log(Level::WARN, &format!("Sustained low bitrate on '{}', reloading", params.name));
            self.open_player(params);
        }
    }

    fn close_player(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stop();
        }
        self.share_link = None;
        self.view = View::Manager;
    }

    fn apply_player_action(&mut self, ctx: &egui::Context, action: PlayerAction) {
        match action {
            PlayerAction::Back => self.close_player(),
            PlayerAction::Navigate(offset) => {
                if let Some(params) = self.session.as_ref().and_then(|s| s.go_to(offset)) {
                    self.open_player(params);
                }
            }
            PlayerAction::ToggleFullscreen => {
                let fullscreen = ctx.input(|i| i.viewport().fullscreen.unwrap_or(false));
                ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(!fullscreen));
            }
            PlayerAction::Share => {
                if let Some(session) = &self.session {
                    let link = session.share_link();
                    ctx.copy_text(link.clone());
                    self.log(Level::INFO, "Share link copied to clipboard");
                    self.share_link = Some(link);
                }
            }
            PlayerAction::Diagnostics => self.show_diagnostics = !self.show_diagnostics,
        }
    }

    // ---- Manager view ----

    fn show_manager(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.add_space(5.0);
            ui.horizontal(|ui| {
                if ui.button("☰").on_hover_text("Playlist menu").clicked() {
                    self.show_sidebar = !self.show_sidebar;
                }
                ui.heading("📺 IPTV Grid");
                ui.separator();

                ui.label("Group:");
                let options = self.library.group_options();
                let selected = self.group_filter.label().to_string();
                egui::ComboBox::from_id_salt("group_filter")
                    .selected_text(selected)
                    .show_ui(ui, |ui| {
                        for option in options {
                            let label = option.label().to_string();
                            ui.selectable_value(&mut self.group_filter, option, label);
                        }
                    });

                ui.separator();
                if ui
                    .add_enabled(!self.library.is_empty(), egui::Button::new("▶ Last channel"))
                    .on_hover_text("Reopen the last station you watched")
                    .clicked()
                {
                    self.start_player(PlayerParams::default());
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("🛠 Diagnostics").clicked() {
                        self.show_diagnostics = !self.show_diagnostics;
                    }
                    ui.checkbox(&mut self.config.dark_mode, "🌙 Dark");
                });
            });
            ui.add_space(5.0);
        });

        egui::TopBottomPanel::bottom("bottom_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if self.loading {
                    ui.spinner();
                }
                ui.label(&self.status_message);
                if let Some(notice) = player::playback_notice() {
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.label(egui::RichText::new(format!("⚠ {}", notice)).color(COLOR_CAUTION));
                    });
                }
            });
        });

        if self.show_sidebar {
            egui::SidePanel::left("sidebar")
                .resizable(false)
                .default_width(260.0)
                .show(ctx, |ui| self.show_sidebar_contents(ui));
        }

        egui::CentralPanel::default().show(ctx, |ui| self.show_grid(ui));
    }

    fn show_sidebar_contents(&mut self, ui: &mut egui::Ui) {
        ui.add_space(8.0);
        ui.heading("Playlist");
        ui.add_space(4.0);

        ui.add_enabled_ui(!self.loading, |ui| {
            if ui
                .button("📂 Open file...")
                .on_hover_text("M3U, M3U8, plain text or an exported .json backup")
                .clicked()
            {
                self.import_file();
            }

            ui.add_space(6.0);
            ui.label("From link:");
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.url_input)
                    .hint_text("https://example.com/playlist.m3u")
                    .desired_width(f32::INFINITY),
            );
            let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("⬇ Load").clicked() || submitted {
                self.import_url();
            }
        });

        ui.add_space(6.0);
        ui.separator();
        ui.horizontal(|ui| {
            if ui.button("💾 Export").clicked() {
                self.export_playlist();
            }
            if ui.button("🗑 Clear").clicked() {
                self.clear_playlist();
            }
        });

        ui.add_space(6.0);
        ui.separator();
        ui.heading("Settings");
        ui.label("User agent:");
        ui.add(egui::TextEdit::singleline(&mut self.config.user_agent).desired_width(f32::INFINITY));
        ui.horizontal(|ui| {
            ui.label("Probe timeout:");
            ui.add(
                egui::DragValue::new(&mut self.config.probe_timeout_ms)
                    .range(500..=30_000)
                    .suffix(" ms"),
            );
        });
        ui.checkbox(&mut self.config.alert_sound, "🔔 Low bitrate alert sound");
        if ui.button("💾 Save settings").clicked() {
            match self.config.save() {
                Ok(()) => {
                    self.log(Level::INFO, "Settings saved");
                    self.status_message = "Settings saved".to_string();
                }
                Err(e) => {
                    self.log(Level::ERROR, &format!("Could not save settings: {}", e));
                    self.show_alert(format!("Could not save settings: {}", e));
                }
            }
        }
    }

    fn show_grid(&mut self, ui: &mut egui::Ui) {
        if self.library.is_empty() {
            ui.vertical_centered(|ui| {
                ui.add_space(100.0);
                ui.heading("No channels yet");
                ui.add_space(10.0);
                ui.label("Open a playlist file or load one from a link in the side menu.");
            });
            return;
        }

        let mut clicked = None;
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.horizontal_wrapped(|ui| {
                    ui.spacing_mut().item_spacing = egui::vec2(10.0, 10.0);
                    for tile in self.library.visible(&self.group_filter) {
                        if show_tile(ui, &tile, &mut self.logos).clicked() {
                            clicked = Some(tile.index);
                        }
                    }
                });
            });

        if let Some(index) = clicked {
            self.open_station(index);
        }
    }

    // ---- Player view ----

    fn show_player(&mut self, ctx: &egui::Context) {
        let Some(session) = self.session.as_mut() else {
            self.view = View::Manager;
            return;
        };
        let now = Instant::now();
        let mut action = None;

        egui::TopBottomPanel::top("player_top").show(ctx, |ui| {
            ui.add_space(5.0);
            ui.horizontal(|ui| {
                if ui.button("⬅ Back").clicked() {
                    action = Some(PlayerAction::Back);
                }
                ui.separator();
                ui.heading(session.title());
                if let Some(logo) = session.logo() {
                    let (rect, response) = ui.allocate_exact_size(egui::vec2(48.0, 28.0), egui::Sense::hover());
                    logo::paint_logo(ui.painter(), rect, self.logos.texture(logo));
                    response.on_hover_text(logo);
                }
                if let Some(quality) = session.quality() {
                    ui.label(
                        egui::RichText::new(format!(" {} ", quality.badge()))
                            .strong()
                            .color(egui::Color32::WHITE)
                            .background_color(COLOR_BADGE),
                    );
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("🛠 Diagnostics").clicked() {
                        action = Some(PlayerAction::Diagnostics);
                    }
                    if ui.button("🔗 Share").clicked() {
                        action = Some(PlayerAction::Share);
                    }
                    if ui.button("⛶ Fullscreen").clicked() {
                        action = Some(PlayerAction::ToggleFullscreen);
                    }
                    if ui.button("⏭ Next").clicked() {
                        action = Some(PlayerAction::Navigate(1));
                    }
                    if ui.button("⏮ Prev").clicked() {
                        action = Some(PlayerAction::Navigate(-1));
                    }
                });
            });
            ui.add_space(5.0);
        });

        egui::SidePanel::right("stats_panel")
            .resizable(false)
            .exact_width(STATS_PANEL_WIDTH)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| show_stats(ui, session, now));
            });

        egui::CentralPanel::default().show(ctx, |ui| session.show_media(ctx, ui));

        if let Some(action) = action {
            self.apply_player_action(ctx, action);
        }
    }

    // ---- Dialogs ----

    fn show_dialogs(&mut self, ctx: &egui::Context) {
        if let Some(message) = self.alert.clone() {
            egui::Window::new("IPTV Grid")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.add_space(10.0);
                    ui.label(message);
                    ui.add_space(10.0);
                    if ui.button("OK").clicked() {
                        self.alert = None;
                    }
                });
        }

        if let Some(link) = self.share_link.clone() {
            let mut open = true;
            egui::Window::new("🔗 Share")
                .collapsible(false)
                .resizable(false)
                .open(&mut open)
                .show(ctx, |ui| {
                    ui.label("Link copied to clipboard:");
                    let mut text = link.as_str();
                    ui.add(egui::TextEdit::singleline(&mut text).desired_width(420.0));
                });
            if !open {
                self.share_link = None;
            }
        }

        if self.show_diagnostics {
            let mut open = true;
            egui::Window::new("🛠 Diagnostics")
                .default_size([560.0, 420.0])
                .open(&mut open)
                .show(ctx, |ui| self.show_diagnostics_contents(ui));
            self.show_diagnostics = open;
        }
    }

    fn show_diagnostics_contents(&mut self, ui: &mut egui::Ui) {
        if let Some(session) = &self.session {
            let timeline = session.timeline();
            egui::Grid::new("stream_info").num_columns(2).show(ui, |ui| {
                ui.label("URL:");
                ui.label(&session.params().url);
                ui.end_row();

                ui.label("Media:");
                ui.label(format!("{:?}", session.kind()));
                ui.end_row();

                ui.label("Status:");
                ui.label(format!("{:?}", session.status()));
                ui.end_row();

                ui.label("Ready state:");
                ui.label(format!("{:?}", timeline.ready_state));
                ui.end_row();

                ui.label("Position:");
                ui.label(format!("{:.1} s", timeline.current_time));
                ui.end_row();

                ui.label("Buffered:");
                let ranges: Vec<String> = timeline
                    .buffered
                    .iter()
                    .map(|r| format!("{:.1}-{:.1}", r.start, r.end))
                    .collect();
                ui.label(if ranges.is_empty() { "-".to_string() } else { ranges.join(", ") });
                ui.end_row();

                ui.label("Samples:");
                let monitor = session.monitor();
                ui.label(format!(
                    "bitrate {}, ping {}",
                    monitor.bitrate.history().len(),
                    monitor.ping.samples().len()
                ));
                ui.end_row();
            });
            ui.separator();
        }

        ui.horizontal(|ui| {
            ui.heading("Console Log");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("🗑 Clear").clicked() {
                    self.console_log.clear();
                }
            });
        });

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in &self.console_log {
                    let color = if line.contains("[ERROR]") {
                        egui::Color32::RED
                    } else if line.contains("[WARN]") {
                        egui::Color32::YELLOW
                    } else if line.contains("[INFO]") {
                        egui::Color32::LIGHT_BLUE
                    } else {
                        egui::Color32::GRAY
                    };
                    ui.label(egui::RichText::new(line).monospace().color(color));
                }
            });
    }
}

/// One station tile; dimmed and marked when the last probe failed
fn show_tile(ui: &mut egui::Ui, tile: &TileView, logos: &mut LogoCache) -> egui::Response {
    let response = ui
        .scope(|ui| {
            if tile.dimmed {
                ui.multiply_opacity(0.4);
            }
            egui::Frame::group(ui.style())
                .inner_margin(8.0)
                .show(ui, |ui| {
                    ui.set_width(TILE_WIDTH);
                    ui.vertical_centered(|ui| {
                        let (rect, _) = ui.allocate_exact_size(egui::vec2(LOGO_SIZE[0], LOGO_SIZE[1]), egui::Sense::hover());
                        // Only tiles on screen start a download
                        let texture = if ui.is_rect_visible(rect) { logos.texture(tile.logo) } else { None };
                        logo::paint_logo(ui.painter(), rect, texture);
                        ui.label(egui::RichText::new(tile.name).strong());
                        if let Some(group) = tile.group {
                            ui.label(egui::RichText::new(group).size(12.0).weak());
                        }
                        if let Some(marker) = tile.marker {
                            ui.label(egui::RichText::new(marker).size(12.0).color(COLOR_CRITICAL));
                        }
                    });
                })
                .response
        })
        .inner;

    let hover = if tile.dimmed {
        format!("Channel unavailable\n{}", tile.logo)
    } else {
        tile.logo.to_string()
    };
    response
        .interact(egui::Sense::click())
        .on_hover_cursor(egui::CursorIcon::PointingHand)
        .on_hover_text(hover)
}

fn format_rate(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.1}", v))
}

fn health_color(health: BitrateHealth) -> egui::Color32 {
    match health {
        BitrateHealth::Healthy => COLOR_HEALTHY,
        BitrateHealth::Caution => COLOR_CAUTION,
        BitrateHealth::Critical => COLOR_CRITICAL,
    }
}

fn graph_area(ui: &mut egui::Ui, samples: &[f64], max: f64, series: Series) {
    let (rect, _) = ui.allocate_exact_size(egui::vec2(ui.available_width(), GRAPH_HEIGHT), egui::Sense::hover());
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 4.0, COLOR_GRAPH_BG);
    graph::draw_line_graph(&painter, rect, samples, max, series);
}

/// Bitrate and ping dashboard
fn show_stats(ui: &mut egui::Ui, session: &PlayerSession, now: Instant) {
    let monitor = session.monitor();
    let bitrate = &monitor.bitrate;

    if let Some(notice) = player::playback_notice() {
        ui.add_space(6.0);
        ui.label(egui::RichText::new(format!("⚠ {}", notice)).color(COLOR_CAUTION));
    }
    ui.add_space(6.0);
    ui.heading("📊 Bitrate");
    egui::Grid::new("bitrate_stats").num_columns(2).show(ui, |ui| {
        ui.label("Current:");
        let text = egui::RichText::new(format!("{} bit/s", format_rate(bitrate.latest()))).strong();
        match bitrate.latest().map(BitrateHealth::classify) {
            Some(health) => ui.label(text.color(health_color(health))),
            None => ui.label(text),
        };
        ui.end_row();

        ui.label("Average:");
        ui.label(format_rate(bitrate.average()));
        ui.end_row();

        ui.label("Max:");
        ui.label(format_rate(bitrate.max()));
        ui.end_row();

        ui.label("Min:");
        ui.label(format_rate(bitrate.min()));
        ui.end_row();

        ui.label("Buffer:");
        ui.label(format!("{:.1} s", bitrate.buffered_depth()));
        ui.end_row();
    });

    // Keep the row height stable while the indicator blinks
    let warning = if monitor.alarm.indicator_visible(now) { "⚠ Low bitrate!" } else { " " };
    if monitor.alarm.is_active() {
        ui.label(egui::RichText::new(warning).strong().color(COLOR_CRITICAL));
    }

    graph_area(ui, &bitrate.history().to_vec(), bitrate.scale_max(), Series::Bitrate);

    ui.add_space(10.0);
    ui.heading("📡 Server");
    let ping = &monitor.ping;
    egui::Grid::new("ping_stats").num_columns(2).show(ui, |ui| {
        ui.label("Status:");
        let color = match ping.status() {
            ServerStatus::Available => COLOR_HEALTHY,
            ServerStatus::Unavailable | ServerStatus::Error => COLOR_CRITICAL,
            ServerStatus::Unknown => egui::Color32::GRAY,
        };
        ui.label(egui::RichText::new(ping.status().label()).color(color));
        ui.end_row();

        ui.label("Ping:");
        ui.label(ping.last_ms().map_or_else(|| "-".to_string(), |ms| format!("{} ms", ms)));
        ui.end_row();
    });

    graph_area(ui, &ping.samples().to_vec(), ping.scale_max(), Series::Ping);
}

impl eframe::App for IptvGridApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Process background task results (non-blocking)
        self.process_tasks();
        if self.logos.poll(ctx) {
            ctx.request_repaint();
        }

        // Drive the monitors before drawing so the panel shows this tick
        if let Some(session) = self.session.as_mut() {
            let now = Instant::now();
            let action = session.tick(now);
            let mut wait = session.until_next_tick(now);
            if session.monitor().alarm.is_active() {
                wait = wait.min(Duration::from_millis(100));
            }
            ctx.request_repaint_after(wait);
            if action == SessionAction::Reload {
                self.reload_player();
            }
        }

        // Apply theme
        if self.config.dark_mode {
            ctx.set_visuals(egui::Visuals::dark());
        } else {
            ctx.set_visuals(egui::Visuals::light());
        }

        match self.view {
            View::Manager => self.show_manager(ctx),
            View::Player => self.show_player(ctx),
        }

        self.show_dialogs(ctx);

        if self.loading || self.logos.is_loading() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}
