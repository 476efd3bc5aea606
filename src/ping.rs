//! Server ping against the origin of the playing stream

use std::sync::mpsc::Sender;
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;
use url::Url;

use crate::error::{AppError, Result};
use crate::monitor::PingOutcome;

/// `scheme://host[:port]` of `stream_url`
pub fn origin_of(stream_url: &str) -> Result<String> {
    let parsed = Url::parse(stream_url).map_err(|e| AppError::InvalidUrl(format!("{}: {}", stream_url, e)))?;
    let origin = parsed.origin();
    if !origin.is_tuple() {
        return Err(AppError::InvalidUrl(stream_url.to_string()));
    }
    Ok(origin.ascii_serialization())
}

/// Time a HEAD request against `origin`. Any HTTP answer counts, the status
/// code is not inspected.
pub fn ping_origin(agent: &ureq::Agent, origin: &str, user_agent: &str) -> PingOutcome {
    let started = Instant::now();
    match agent.head(origin).header("User-Agent", user_agent).call() {
        Ok(_) | Err(ureq::Error::StatusCode(_)) => {
            let rtt = started.elapsed();
            debug!(origin, ms = rtt.as_millis() as u64, "ping answered");
            PingOutcome::Answered(rtt)
        }
        Err(e) => {
            debug!(origin, error = %e, "ping failed");
            PingOutcome::Failed
        }
    }
}

/// Ping the origin of `stream_url` on a background thread and report the
/// outcome on `sender`
pub fn spawn_ping(stream_url: &str, user_agent: &str, timeout: Duration, sender: Sender<PingOutcome>) {
    let origin = match origin_of(stream_url) {
        Ok(origin) => origin,
        Err(e) => {
            debug!(error = %e, "no origin to ping");
            let _ = sender.send(PingOutcome::BadUrl);
            return;
        }
    };
    let user_agent = user_agent.to_string();

    thread::spawn(move || {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        let _ = sender.send(ping_origin(&agent, &origin, &user_agent));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn test_origin_strips_path_and_query() {
        assert_eq!(
            origin_of("http://cdn.example.com:8080/live/ch1.m3u8?token=x").unwrap(),
            "http://cdn.example.com:8080"
        );
        assert_eq!(origin_of("https://example.com/a/b.ts").unwrap(), "https://example.com");
    }

    #[test]
    fn test_origin_omits_default_port() {
        assert_eq!(origin_of("http://example.com:80/x").unwrap(), "http://example.com");
    }

    #[test]
    fn test_origin_rejects_unusable_urls() {
        assert!(matches!(origin_of("not a url"), Err(AppError::InvalidUrl(_))));
        assert!(origin_of("data:text/plain,hello").is_err());
    }

    #[test]
    fn test_bad_url_reports_without_request() {
        let (tx, rx) = channel();
        spawn_ping("::::", "test", Duration::from_millis(100), tx);
        assert_eq!(rx.recv().unwrap(), PingOutcome::BadUrl);
    }
}
