//! Player bootstrap, stream classification and playback status

use crate::models::{PlayerParams, Station};

pub const DEFAULT_TITLE: &str = "Channel";

const AUDIO_EXTENSIONS: &[&str] = &[".mp3", ".aac", ".ogg", ".m4a"];
const HD_TOKENS: &[&str] = &["1080", "720", "hd"];
const SD_TOKENS: &[&str] = &["480", "360", "sd"];

pub const MSG_BUFFERING: &str = "Buffering...";
pub const MSG_LOADING: &str = "Loading stream...";
pub const MSG_WAITING: &str = "Waiting for playback...";
pub const MSG_PLAYBACK_FAILED: &str =
    "Could not play the stream. Check the link and stream availability.";
pub const MSG_PLAYBACK_DISABLED: &str =
    "Playback is not built in. Rebuild with --features internal-player to play streams and run the monitor.";

/// Warning shown while this build cannot play streams
pub fn playback_notice() -> Option<&'static str> {
    (!cfg!(feature = "internal-player")).then_some(MSG_PLAYBACK_DISABLED)
}

/// Which kind of media element the stream gets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    /// Audio only for a known audio file extension, video otherwise
    pub fn classify(url: &str) -> Self {
        let lower = url.to_ascii_lowercase();
        if AUDIO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
            MediaKind::Audio
        } else {
            MediaKind::Video
        }
    }
}

/// Apparent quality guessed from tokens in the URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Hd,
    Sd,
}

impl Quality {
    pub fn classify(url: &str) -> Option<Self> {
        let lower = url.to_ascii_lowercase();
        if HD_TOKENS.iter().any(|t| lower.contains(t)) {
            Some(Quality::Hd)
        } else if SD_TOKENS.iter().any(|t| lower.contains(t)) {
            Some(Quality::Sd)
        } else {
            None
        }
    }

    pub fn badge(&self) -> &'static str {
        match self {
            Quality::Hd => "HD",
            Quality::Sd => "SD",
        }
    }
}

/// Circular neighbour of `index`; `None` for an empty collection
pub fn neighbor(index: usize, offset: isize, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let len = len as isize;
    let current = (index as isize).rem_euclid(len);
    Some((current + offset).rem_euclid(len) as usize)
}

/// Parameters of the station `offset` steps away from the current one.
/// No-op (`None`) when the current parameters carry no index.
pub fn navigate(current: &PlayerParams, stations: &[Station], offset: isize) -> Option<PlayerParams> {
    let index = current.index?;
    let target = neighbor(index, offset, stations.len())?;
    Some(PlayerParams::for_station(&stations[target], target))
}

/// How the player should start from its navigation parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Startup {
    /// Parameters carry a stream; play it
    Play(PlayerParams),
    /// No stream given; re-enter with the last opened station
    Redirect(PlayerParams),
    /// Nothing to play
    Empty,
}

/// Resolve the startup parameters. Without a stream URL, fall back to the
/// last opened index (0 when none was persisted).
pub fn resolve_startup(params: PlayerParams, stations: &[Station], last_index: Option<usize>) -> Startup {
    if params.has_stream() {
        return Startup::Play(params);
    }

    let index = last_index.unwrap_or(0);
    match stations.get(index) {
        Some(station) => Startup::Redirect(PlayerParams::for_station(station, index)),
        None => Startup::Empty,
    }
}

/// Events reported by the media pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    Waiting,
    LoadedData,
    CanPlay,
    Playing,
    CanPlayThrough,
    Errored(String),
}

/// Player status; drives spinner and error message visibility
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlayerStatus {
    #[default]
    Idle,
    Buffering(&'static str),
    Playing,
    /// Terminal until the session is reloaded
    Errored(String),
}

impl PlayerStatus {
    pub fn on_event(&self, event: &MediaEvent) -> PlayerStatus {
        if let PlayerStatus::Errored(_) = self {
            return self.clone();
        }
        match event {
            MediaEvent::Waiting => PlayerStatus::Buffering(MSG_BUFFERING),
            MediaEvent::LoadedData => PlayerStatus::Buffering(MSG_LOADING),
            MediaEvent::CanPlay => PlayerStatus::Buffering(MSG_WAITING),
            MediaEvent::Playing | MediaEvent::CanPlayThrough => PlayerStatus::Playing,
            MediaEvent::Errored(detail) => {
                tracing::error!(detail = %detail, "playback failed");
                PlayerStatus::Errored(MSG_PLAYBACK_FAILED.to_string())
            }
        }
    }

    pub fn spinner_message(&self) -> Option<&'static str> {
        match self {
            PlayerStatus::Buffering(message) => Some(*message),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            PlayerStatus::Errored(message) => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_notice_tracks_build() {
        assert_eq!(playback_notice().is_some(), !cfg!(feature = "internal-player"));
        if let Some(notice) = playback_notice() {
            assert!(notice.contains("--features internal-player"));
        }
    }

    fn playlist(n: usize) -> Vec<Station> {
        (0..n)
            .map(|i| Station::new(&format!("S{}", i), &format!("http://a/{}.ts", i), "", ""))
            .collect()
    }

    #[test]
    fn test_media_kind() {
        assert_eq!(MediaKind::classify("http://radio/stream.MP3"), MediaKind::Audio);
        assert_eq!(MediaKind::classify("http://radio/a.m4a"), MediaKind::Audio);
        assert_eq!(MediaKind::classify("http://tv/live.m3u8"), MediaKind::Video);
        assert_eq!(MediaKind::classify("http://radio/mp3/stream"), MediaKind::Video);
    }

    #[test]
    fn test_quality_badge() {
        assert_eq!(Quality::classify("http://tv/ch1_1080p.m3u8"), Some(Quality::Hd));
        assert_eq!(Quality::classify("http://tv/HD/ch1.ts"), Some(Quality::Hd));
        assert_eq!(Quality::classify("http://tv/ch1_480.ts"), Some(Quality::Sd));
        assert_eq!(Quality::classify("http://tv/ch1.ts"), None);
        assert_eq!(Quality::Sd.badge(), "SD");
    }

    #[test]
    fn test_neighbor_wraps() {
        assert_eq!(neighbor(4, 1, 5), Some(0));
        assert_eq!(neighbor(0, -1, 5), Some(4));
        assert_eq!(neighbor(2, 1, 5), Some(3));
        assert_eq!(neighbor(0, 1, 0), None);
        assert_eq!(neighbor(0, 1, 1), Some(0));
    }

    #[test]
    fn test_navigate_requires_index() {
        let stations = playlist(3);
        let last = PlayerParams::for_station(&stations[2], 2);
        let next = navigate(&last, &stations, 1).unwrap();
        assert_eq!(next.index, Some(0));
        assert_eq!(next.name, "S0");

        let prev = navigate(&next, &stations, -1).unwrap();
        assert_eq!(prev.index, Some(2));

        let unindexed = PlayerParams { index: None, ..last };
        assert_eq!(navigate(&unindexed, &stations, 1), None);
        assert_eq!(navigate(&next, &[], 1), None);
    }

    #[test]
    fn test_startup_resolution() {
        let stations = playlist(3);
        let direct = PlayerParams::for_station(&stations[1], 1);
        assert_eq!(
            resolve_startup(direct.clone(), &stations, Some(2)),
            Startup::Play(direct)
        );

        match resolve_startup(PlayerParams::default(), &stations, Some(2)) {
            Startup::Redirect(params) => {
                assert_eq!(params.index, Some(2));
                assert_eq!(params.url, "http://a/2.ts");
            }
            other => panic!("unexpected {:?}", other),
        }

        match resolve_startup(PlayerParams::default(), &stations, None) {
            Startup::Redirect(params) => assert_eq!(params.index, Some(0)),
            other => panic!("unexpected {:?}", other),
        }

        assert_eq!(resolve_startup(PlayerParams::default(), &stations, Some(7)), Startup::Empty);
        assert_eq!(resolve_startup(PlayerParams::default(), &[], None), Startup::Empty);
    }

    #[test]
    fn test_status_transitions() {
        let status = PlayerStatus::Idle.on_event(&MediaEvent::LoadedData);
        assert_eq!(status.spinner_message(), Some(MSG_LOADING));

        let status = status.on_event(&MediaEvent::CanPlay);
        assert_eq!(status.spinner_message(), Some(MSG_WAITING));

        let status = status.on_event(&MediaEvent::Playing);
        assert_eq!(status, PlayerStatus::Playing);
        assert_eq!(status.spinner_message(), None);

        let status = status.on_event(&MediaEvent::Waiting);
        assert_eq!(status.spinner_message(), Some(MSG_BUFFERING));

        let status = status.on_event(&MediaEvent::CanPlayThrough);
        assert_eq!(status, PlayerStatus::Playing);
    }

    #[test]
    fn test_error_is_sticky() {
        let status = PlayerStatus::Playing.on_event(&MediaEvent::Errored("decoder".to_string()));
        assert_eq!(status.error_message(), Some(MSG_PLAYBACK_FAILED));
        assert_eq!(status.spinner_message(), None);

        let status = status.on_event(&MediaEvent::Playing);
        assert!(matches!(status, PlayerStatus::Errored(_)));
    }
}
