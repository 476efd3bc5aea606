//! Data models for IPTV Grid

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::config::ui::SHARE_LINK_PREFIX;

/// Active top-level view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Manager,
    Player,
}

/// One playlist entry (persisted to JSON)
///
/// Identity is positional: two entries with the same name and URL are
/// still distinct stations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub group: String,
    /// Result of the last reachability probe; absent until probed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online: Option<bool>,
}

impl Station {
    pub fn new(name: &str, url: &str, logo: &str, group: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            logo: logo.to_string(),
            group: group.to_string(),
            online: None,
        }
    }

    /// True only when a probe ran and failed
    pub fn is_unreachable(&self) -> bool {
        self.online == Some(false)
    }
}

/// Parameters handed to the player view, mirrored as a query string
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlayerParams {
    pub name: String,
    pub url: String,
    pub logo: String,
    pub index: Option<usize>,
}

impl PlayerParams {
    pub fn for_station(station: &Station, index: usize) -> Self {
        Self {
            name: station.name.clone(),
            url: station.url.clone(),
            logo: station.logo.clone(),
            index: Some(index),
        }
    }

    pub fn has_stream(&self) -> bool {
        !self.url.is_empty()
    }

    /// Percent-encoded `name=..&url=..&logo=..&index=..`
    pub fn to_query(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("name", &self.name)
            .append_pair("url", &self.url)
            .append_pair("logo", &self.logo);
        if let Some(index) = self.index {
            query.append_pair("index", &index.to_string());
        }
        query.finish()
    }

    /// Parse a query string or a full link; unknown keys are ignored
    pub fn from_query(input: &str) -> Self {
        let query = match input.find('?') {
            Some(pos) => &input[pos + 1..],
            None => input,
        };

        let mut params = Self::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "name" => params.name = value.into_owned(),
                "url" => params.url = value.into_owned(),
                "logo" => params.logo = value.into_owned(),
                "index" => params.index = value.trim().parse().ok(),
                _ => {}
            }
        }
        params
    }

    /// Link for sharing the current station; carries no playlist index
    pub fn share_link(&self) -> String {
        let shared = Self { index: None, ..self.clone() };
        format!("{}{}", SHARE_LINK_PREFIX, shared.to_query())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_json_omits_unprobed_flag() {
        let station = Station::new("News", "http://example.com/news.m3u8", "", "Info");
        let json = serde_json::to_string(&station).unwrap();
        assert!(!json.contains("online"));

        let probed = Station { online: Some(false), ..station };
        let json = serde_json::to_string(&probed).unwrap();
        assert!(json.contains("\"online\":false"));
    }

    #[test]
    fn test_station_json_tolerates_missing_fields() {
        let station: Station =
            serde_json::from_str(r#"{"name":"A","url":"http://a/1.ts"}"#).unwrap();
        assert_eq!(station.logo, "");
        assert_eq!(station.group, "");
        assert_eq!(station.online, None);
    }

    #[test]
    fn test_query_encodes_reserved_characters() {
        let params = PlayerParams {
            name: "Rock & Roll / 24".to_string(),
            url: "http://example.com/live?id=5&token=a b".to_string(),
            logo: String::new(),
            index: Some(3),
        };
        let query = params.to_query();
        assert!(!query.contains(" "));
        assert!(query.contains("index=3"));
        assert_eq!(PlayerParams::from_query(&query), params);
    }

    #[test]
    fn test_from_full_link_and_missing_index() {
        let params = PlayerParams::from_query("iptv-grid://player?name=One&url=http%3A%2F%2Fa%2F1.ts&index=x");
        assert_eq!(params.name, "One");
        assert_eq!(params.url, "http://a/1.ts");
        assert_eq!(params.index, None);
        assert!(params.has_stream());
    }

    #[test]
    fn test_share_link_drops_index() {
        let station = Station::new("One", "http://a/1.ts", "http://a/logo.png", "");
        let link = PlayerParams::for_station(&station, 7).share_link();
        assert!(link.starts_with(SHARE_LINK_PREFIX));
        assert!(!link.contains("index"));
        let parsed = PlayerParams::from_query(&link);
        assert_eq!(parsed.logo, "http://a/logo.png");
        assert_eq!(parsed.index, None);
    }
}
