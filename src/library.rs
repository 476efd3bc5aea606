//! Station library: the playlist manager's controller
//!
//! Owns the in-memory station list and keeps the injected store in sync.
//! Every change persists a complete snapshot, never a delta.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::config::keys;
use crate::error::Result;
use crate::grid::{self, GroupFilter, TileView};
use crate::m3u_parser;
use crate::models::{PlayerParams, Station};
use crate::probe::{self, Prober};
use crate::storage::KeyValueStore;

/// What a local import file turned into
#[derive(Debug)]
pub enum LocalImport {
    /// Export backup, restored verbatim without probing
    Backup(String),
    /// Parsed playlist with fresh probe verdicts
    Playlist(Vec<Station>),
}

/// Whether a file name is an export backup rather than a playlist
pub fn is_backup_name(file_name: &str) -> bool {
    file_name.to_ascii_lowercase().ends_with(".json")
}

/// Read a local import file: backups come back untouched, anything else
/// is parsed by name and probed.
pub fn read_local_import<P: Prober + ?Sized>(path: &Path, prober: &P) -> Result<LocalImport> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let content = fs::read_to_string(path)?;

    if is_backup_name(&file_name) {
        return Ok(LocalImport::Backup(content));
    }
    let parsed = m3u_parser::parse_playlist(&content, &file_name);
    Ok(LocalImport::Playlist(probe::probe_all(prober, parsed)))
}

pub struct StationLibrary<S: KeyValueStore> {
    store: S,
    stations: Vec<Station>,
}

impl<S: KeyValueStore> StationLibrary<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            stations: Vec::new(),
        }
    }

    /// Create a library and immediately load the saved collection
    pub fn open(store: S) -> Self {
        let mut library = Self::new(store);
        library.load_saved();
        library
    }

    /// Load the persisted collection; unreadable data leaves the list empty
    pub fn load_saved(&mut self) -> usize {
        self.stations = match self.store.load(keys::STATIONS) {
            Ok(Some(blob)) => match serde_json::from_str(&blob) {
                Ok(stations) => stations,
                Err(e) => {
                    warn!(error = %e, "saved station list is corrupt, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "cannot read saved station list");
                Vec::new()
            }
        };
        self.stations.len()
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Replace the whole collection and persist it
    pub fn replace_all(&mut self, stations: Vec<Station>) -> Result<()> {
        let blob = serde_json::to_string(&stations)?;
        self.store.save(keys::STATIONS, &blob)?;
        info!(count = stations.len(), "station list replaced");
        self.stations = stations;
        Ok(())
    }

    pub fn group_options(&self) -> Vec<GroupFilter> {
        grid::group_options(&self.stations)
    }

    pub fn visible(&self, filter: &GroupFilter) -> Vec<TileView<'_>> {
        grid::visible_tiles(&self.stations, filter)
    }

    pub fn params_for(&self, index: usize) -> Option<PlayerParams> {
        self.stations
            .get(index)
            .map(|station| PlayerParams::for_station(station, index))
    }

    /// Remember `index` as last opened and build the player parameters
    pub fn open_station(&mut self, index: usize) -> Result<Option<PlayerParams>> {
        let Some(params) = self.params_for(index) else {
            return Ok(None);
        };
        self.store.save(keys::LAST_INDEX, &index.to_string())?;
        info!(index, name = %params.name, "opening station");
        Ok(Some(params))
    }

    /// Persisted last-opened index, if any
    pub fn last_opened(&self) -> Option<usize> {
        match self.store.load(keys::LAST_INDEX) {
            Ok(Some(blob)) => blob.trim().parse().ok(),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "cannot read last opened index");
                None
            }
        }
    }

    /// Drop the collection and both persisted keys
    pub fn clear(&mut self) -> Result<()> {
        self.store.clear(keys::STATIONS)?;
        self.store.clear(keys::LAST_INDEX)?;
        self.stations.clear();
        info!("station list cleared");
        Ok(())
    }

    /// The persisted snapshot as JSON, or `None` when nothing is saved
    pub fn export_json(&self) -> Result<Option<String>> {
        self.store.load(keys::STATIONS)
    }

    /// Write the persisted snapshot to `path`; `false` when nothing is saved
    pub fn export_to(&self, path: &Path) -> Result<bool> {
        match self.export_json()? {
            Some(blob) => {
                fs::write(path, blob)?;
                info!(path = %path.display(), "playlist exported");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Restore an exported snapshot verbatim
    pub fn restore_backup(&mut self, json: &str) -> Result<usize> {
        let stations: Vec<Station> = serde_json::from_str(json)?;
        let count = stations.len();
        self.replace_all(stations)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, MemoryStore};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample() -> Vec<Station> {
        let mut offline = Station::new("Two", "http://b/2.ts", "http://b/logo.png", "Music");
        offline.online = Some(false);
        let mut online = Station::new("One", "http://a/1.ts", "", "News");
        online.online = Some(true);
        vec![online, offline, Station::new("One", "http://a/1.ts", "", "News")]
    }

    #[test]
    fn test_replace_all_persists_full_snapshot() {
        let mut library = StationLibrary::new(MemoryStore::new());
        library.replace_all(sample()).unwrap();

        let mut reloaded = StationLibrary::new(MemoryStore::new());
        reloaded
            .store()
            .save(keys::STATIONS, &library.export_json().unwrap().unwrap())
            .unwrap();
        assert_eq!(reloaded.load_saved(), 3);
        assert_eq!(reloaded.stations(), library.stations());

        library.replace_all(vec![Station::new("Only", "http://c/3.ts", "", "")]).unwrap();
        let blob = library.export_json().unwrap().unwrap();
        let saved: Vec<Station> = serde_json::from_str(&blob).unwrap();
        assert_eq!(saved.len(), 1);
    }

    #[test]
    fn test_open_station_persists_last_index() {
        let mut library = StationLibrary::new(MemoryStore::new());
        library.replace_all(sample()).unwrap();
        assert_eq!(library.last_opened(), None);

        let params = library.open_station(1).unwrap().unwrap();
        assert_eq!(params.name, "Two");
        assert_eq!(params.logo, "http://b/logo.png");
        assert_eq!(params.index, Some(1));
        assert_eq!(library.last_opened(), Some(1));

        assert_eq!(library.open_station(9).unwrap(), None);
        assert_eq!(library.last_opened(), Some(1));
    }

    #[test]
    fn test_clear_removes_both_keys() {
        let mut library = StationLibrary::new(MemoryStore::new());
        library.replace_all(sample()).unwrap();
        library.open_station(0).unwrap();

        library.clear().unwrap();
        assert!(library.is_empty());
        assert_eq!(library.export_json().unwrap(), None);
        assert_eq!(library.last_opened(), None);
    }

    #[test]
    fn test_corrupt_snapshot_loads_empty() {
        let store = MemoryStore::new();
        store.save(keys::STATIONS, "{not json").unwrap();
        let library = StationLibrary::open(store);
        assert!(library.is_empty());
    }

    #[test]
    fn test_export_then_restore_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backup = dir.path().join("playlist_backup.json");

        let mut source = StationLibrary::new(FileStore::new(dir.path().join("a")));
        assert!(!source.export_to(&backup).unwrap());
        source.replace_all(sample()).unwrap();
        assert!(source.export_to(&backup).unwrap());

        let mut target = StationLibrary::new(FileStore::new(dir.path().join("b")));
        let json = std::fs::read_to_string(&backup).unwrap();
        assert_eq!(target.restore_backup(&json).unwrap(), 3);
        assert_eq!(target.stations(), source.stations());

        let reopened = StationLibrary::open(FileStore::new(dir.path().join("b")));
        assert_eq!(reopened.stations(), source.stations());
    }

    #[derive(Default)]
    struct CountingProber(AtomicUsize);

    impl Prober for CountingProber {
        fn is_reachable(&self, _url: &str) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    struct DownHost(&'static str);

    impl Prober for DownHost {
        fn is_reachable(&self, url: &str) -> bool {
            !url.contains(self.0)
        }
    }

    #[test]
    fn test_backup_names() {
        assert!(is_backup_name("playlist_backup.json"));
        assert!(is_backup_name("EXPORT.JSON"));
        assert!(!is_backup_name("list.m3u8"));
        assert!(!is_backup_name("json.txt"));
    }

    #[test]
    fn test_exported_file_imports_losslessly() {
        let dir = tempfile::tempdir().unwrap();
        let backup = dir.path().join("playlist_backup.json");

        let mut source = StationLibrary::new(MemoryStore::new());
        source.replace_all(sample()).unwrap();
        assert!(source.export_to(&backup).unwrap());

        let prober = CountingProber::default();
        let json = match read_local_import(&backup, &prober).unwrap() {
            LocalImport::Backup(json) => json,
            other => panic!("expected a backup, got {:?}", other),
        };
        assert_eq!(prober.0.load(Ordering::SeqCst), 0);

        let mut target = StationLibrary::new(MemoryStore::new());
        target.restore_backup(&json).unwrap();
        assert_eq!(target.stations(), source.stations());
    }

    #[test]
    fn test_playlist_file_is_parsed_and_probed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.m3u");
        std::fs::write(
            &path,
            "#EXTM3U\n#EXTINF:-1 group-title=\"News\",One\nhttp://a/1.ts\n#EXTINF:-1,Two\nhttp://down/2.ts\n",
        )
        .unwrap();

        let stations = match read_local_import(&path, &DownHost("down")).unwrap() {
            LocalImport::Playlist(stations) => stations,
            other => panic!("expected a playlist, got {:?}", other),
        };
        let verdicts: Vec<(&str, Option<bool>)> = stations.iter().map(|s| (s.name.as_str(), s.online)).collect();
        assert_eq!(verdicts, [("One", Some(true)), ("Two", Some(false))]);
    }

    #[test]
    fn test_missing_import_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_local_import(&dir.path().join("gone.m3u"), &CountingProber::default()).is_err());
    }

    #[test]
    fn test_restore_rejects_invalid_backup() {
        let mut library = StationLibrary::new(MemoryStore::new());
        library.replace_all(sample()).unwrap();
        assert!(library.restore_backup("[{\"name\": 1}]").is_err());
        assert_eq!(library.len(), 3);
    }
}
