//! Playlist parser for M3U/M3U8 and plain `name - url` lists

use crate::config::network::PLAYLIST_TIMEOUT;
use crate::config::ui::PLACEHOLDER_LOGO;
use crate::error::{AppError, Result};
use crate::models::Station;

/// Name used when an `#EXTINF` line carries no title
pub const UNTITLED: &str = "Untitled";

const SEPARATOR: &str = " - ";

/// Whether a file name (or URL) points at an M3U/M3U8 playlist
pub fn is_m3u_name(file_name: &str) -> bool {
    let path = file_name
        .split(['?', '#'])
        .next()
        .unwrap_or(file_name)
        .to_ascii_lowercase();
    path.ends_with(".m3u") || path.ends_with(".m3u8")
}

/// Parse playlist text; the file name decides which format is expected.
///
/// Never fails: unrecognized lines are skipped and empty input yields an
/// empty list. Output keeps input order, duplicates included.
pub fn parse_playlist(content: &str, file_name: &str) -> Vec<Station> {
    if is_m3u_name(file_name) {
        parse_m3u(content)
    } else {
        parse_plain(content)
    }
}

/// Last path segment of a URL, used as a display name fallback
pub fn fallback_name(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}

fn bare_url_station(url: &str) -> Station {
    Station::new(&fallback_name(url), url, PLACEHOLDER_LOGO, "")
}

/// Pending metadata from the last `#EXTINF` line
#[derive(Default)]
struct PendingInfo {
    name: String,
    logo: String,
    group: String,
}

impl PendingInfo {
    fn from_extinf(line: &str) -> Self {
        let name = line
            .rfind(',')
            .map(|pos| line[pos + 1..].trim())
            .filter(|title| !title.is_empty())
            .unwrap_or(UNTITLED)
            .to_string();

        let logo = extract_quoted(line, "tvg-logo")
            .filter(|logo| logo.starts_with("http"))
            .unwrap_or_default()
            .to_string();

        let group = extract_quoted(line, "group-title")
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        Self { name, logo, group }
    }

    fn into_station(self, url: &str) -> Station {
        let logo = if self.logo.is_empty() { PLACEHOLDER_LOGO.to_string() } else { self.logo };
        Station {
            name: self.name,
            url: url.to_string(),
            logo,
            group: self.group,
            online: None,
        }
    }
}

fn parse_m3u(content: &str) -> Vec<Station> {
    let mut stations = Vec::new();
    let mut pending: Option<PendingInfo> = None;

    for line in content.lines() {
        let line = line.trim();

        if line.starts_with("#EXTINF") {
            pending = Some(PendingInfo::from_extinf(line));
        } else if !line.is_empty() && !line.starts_with('#') {
            let station = match pending.take() {
                Some(info) => info.into_station(line),
                None => bare_url_station(line),
            };
            stations.push(station);
        }
    }

    stations
}

fn parse_plain(content: &str) -> Vec<Station> {
    let mut stations = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        let parts: Vec<&str> = line.split(SEPARATOR).collect();

        if let [name, url] = parts.as_slice() {
            let (name, url) = (name.trim(), url.trim());
            if !name.is_empty() && !url.is_empty() {
                stations.push(Station::new(name, url, PLACEHOLDER_LOGO, ""));
                continue;
            }
        }

        if line.starts_with("http") {
            stations.push(bare_url_station(line));
        }
    }

    stations
}

/// Value of `attr="..."` in a directive line
fn extract_quoted<'a>(line: &'a str, attr: &str) -> Option<&'a str> {
    let needle = format!("{}=\"", attr);
    let start = line.find(&needle)? + needle.len();
    let rest = &line[start..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}

/// Download playlist text (supports HTTP and HTTPS)
pub fn download_text(url: &str, user_agent: &str) -> Result<String> {
    let agent = ureq::Agent::config_builder()
        .timeout_global(Some(PLAYLIST_TIMEOUT))
        .build()
        .new_agent();

    let mut response = agent
        .get(url)
        .header("User-Agent", user_agent)
        .call()
        .map_err(|e| match e {
            ureq::Error::StatusCode(code) => AppError::Status(code),
            other => AppError::Http(other),
        })?;

    if !response.status().is_success() {
        return Err(AppError::Status(response.status().as_u16()));
    }

    Ok(response.body_mut().read_to_string()?)
}

#[cfg(test)]
#[path = "m3u_parser_tests.rs"]
mod tests;
