//! Reachability probing
//!
//! A probe only asks whether *something* answers at the URL within the
//! time budget. Any HTTP response counts, error statuses included, so a
//! positive verdict says nothing about whether the stream itself is valid.

use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::network::PROBE_STACK_SIZE;
use crate::models::Station;

/// Existence check against a URL
pub trait Prober: Sync {
    fn is_reachable(&self, url: &str) -> bool;
}

/// HEAD request with a global timeout
pub struct HttpProber {
    agent: ureq::Agent,
    user_agent: String,
}

impl HttpProber {
    pub fn new(timeout: Duration, user_agent: &str) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self {
            agent,
            user_agent: user_agent.to_string(),
        }
    }
}

impl Prober for HttpProber {
    fn is_reachable(&self, url: &str) -> bool {
        match self.agent.head(url).header("User-Agent", &self.user_agent).call() {
            Ok(_) => true,
            Err(ureq::Error::StatusCode(code)) => {
                debug!(url, code, "probe answered with error status");
                true
            }
            Err(e) => {
                debug!(url, error = %e, "probe failed");
                false
            }
        }
    }
}

/// Probe every station concurrently and record the verdicts.
///
/// Every probe gets its own thread so the batch settles within one probe
/// budget however long the playlist is. Returns once all probes have
/// settled; order is preserved. A probe that panics counts as unreachable.
pub fn probe_all<P: Prober + ?Sized>(prober: &P, stations: Vec<Station>) -> Vec<Station> {
    let total = stations.len();
    if total == 0 {
        return stations;
    }

    let check = |url: &str| panic::catch_unwind(AssertUnwindSafe(|| prober.is_reachable(url))).unwrap_or(false);

    let verdicts: Vec<bool> = thread::scope(|scope| {
        let pending: Vec<_> = stations
            .iter()
            .map(|station| {
                let url = station.url.as_str();
                thread::Builder::new()
                    .stack_size(PROBE_STACK_SIZE)
                    .spawn_scoped(scope, move || check(url))
                    .map_err(|e| {
                        warn!(url, error = %e, "cannot spawn probe thread, probing inline");
                        check(url)
                    })
            })
            .collect();

        pending
            .into_iter()
            .map(|probe| match probe {
                Ok(handle) => handle.join().unwrap_or(false),
                Err(verdict) => verdict,
            })
            .collect()
    });

    let online = verdicts.iter().filter(|v| **v).count();
    debug!(total, online, "probe batch settled");

    stations
        .into_iter()
        .zip(verdicts)
        .map(|(mut station, reachable)| {
            station.online = Some(reachable);
            station
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Instant;

    struct FakeProber {
        down: HashSet<String>,
        delay: Duration,
        seen: Mutex<Vec<String>>,
    }

    impl FakeProber {
        fn new(down: &[&str], delay: Duration) -> Self {
            Self {
                down: down.iter().map(|s| s.to_string()).collect(),
                delay,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl Prober for FakeProber {
        fn is_reachable(&self, url: &str) -> bool {
            thread::sleep(self.delay);
            self.seen.lock().unwrap().push(url.to_string());
            if url.contains("panic") {
                panic!("probe blew up");
            }
            !self.down.contains(url)
        }
    }

    fn stations(urls: &[&str]) -> Vec<Station> {
        urls.iter().map(|u| Station::new(u, u, "", "")).collect()
    }

    #[test]
    fn test_verdicts_follow_station_order() {
        let prober = FakeProber::new(&["http://b/2"], Duration::ZERO);
        let result = probe_all(&prober, stations(&["http://a/1", "http://b/2", "http://c/3"]));
        let online: Vec<Option<bool>> = result.iter().map(|s| s.online).collect();
        assert_eq!(online, [Some(true), Some(false), Some(true)]);
        assert_eq!(result[1].url, "http://b/2");
        assert_eq!(prober.seen.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_probes_run_concurrently() {
        let prober = FakeProber::new(&[], Duration::from_millis(200));
        let urls: Vec<String> = (0..10).map(|i| format!("http://host/{}", i)).collect();
        let refs: Vec<&str> = urls.iter().map(String::as_str).collect();

        let start = Instant::now();
        let result = probe_all(&prober, stations(&refs));
        assert_eq!(result.len(), 10);
        assert!(start.elapsed() < Duration::from_millis(1500));
    }

    #[test]
    fn test_large_batch_settles_within_one_budget() {
        let prober = FakeProber::new(&[], Duration::from_millis(400));
        let urls: Vec<String> = (0..600).map(|i| format!("http://host/{}", i)).collect();
        let refs: Vec<&str> = urls.iter().map(String::as_str).collect();

        let start = Instant::now();
        let result = probe_all(&prober, stations(&refs));
        let elapsed = start.elapsed();

        assert_eq!(result.len(), 600);
        assert!(result.iter().all(|s| s.online == Some(true)));
        assert!(elapsed < Duration::from_millis(800), "batch took {:?}", elapsed);
    }

    #[test]
    fn test_panicking_probe_counts_as_unreachable() {
        let prober = FakeProber::new(&[], Duration::ZERO);
        let result = probe_all(&prober, stations(&["http://panic/1"]));
        assert_eq!(result[0].online, Some(false));
    }

    #[test]
    fn test_empty_batch() {
        let prober = FakeProber::new(&[], Duration::ZERO);
        assert!(probe_all(&prober, Vec::new()).is_empty());
    }

    #[test]
    fn test_unroutable_url_is_unreachable() {
        let prober = HttpProber::new(Duration::from_millis(500), "test");
        assert!(!prober.is_reachable("not a url"));
    }
}
