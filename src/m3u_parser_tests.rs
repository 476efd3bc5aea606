//! Tests for M3U/M3U8 and plain-text playlist parsing

#[cfg(test)]
mod tests {
    use crate::config::ui::PLACEHOLDER_LOGO;
    use crate::m3u_parser::*;

    #[test]
    fn test_extinf_followed_by_url() {
        let content = r#"#EXTM3U
#EXTINF:-1 tvg-id="news1" tvg-logo="http://example.com/news.png" group-title="News",World News
http://example.com/live/news.m3u8
"#;
        let stations = parse_playlist(content, "channels.m3u");
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].name, "World News");
        assert_eq!(stations[0].url, "http://example.com/live/news.m3u8");
        assert_eq!(stations[0].logo, "http://example.com/news.png");
        assert_eq!(stations[0].group, "News");
        assert_eq!(stations[0].online, None);
    }

    #[test]
    fn test_url_without_metadata_uses_fallbacks() {
        let content = "#EXTM3U\nhttp://example.com/radio/jazz.mp3\n";
        let stations = parse_playlist(content, "list.m3u8");
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].name, "jazz.mp3");
        assert_eq!(stations[0].logo, PLACEHOLDER_LOGO);
        assert_eq!(stations[0].group, "");
    }

    #[test]
    fn test_name_is_text_after_last_comma() {
        let content = r#"#EXTM3U
#EXTINF:-1 tvg-name="a,b" group-title="Movies",Movies, Classics
http://example.com/1.ts
"#;
        let stations = parse_playlist(content, "a.m3u");
        assert_eq!(stations[0].name, "Classics");
        assert_eq!(stations[0].group, "Movies");
    }

    #[test]
    fn test_extinf_without_title() {
        let content = "#EXTINF:-1 group-title=\"Music\"\nhttp://example.com/stream/radio.aac\n";
        let stations = parse_playlist(content, "a.m3u");
        assert_eq!(stations[0].name, UNTITLED);

        let content = "#EXTINF:-1,   \nhttp://example.com/stream/radio.aac\n";
        let stations = parse_playlist(content, "a.m3u");
        assert_eq!(stations[0].name, UNTITLED);

        let content = "#EXTINF:-1,\nhttp://example.com/stream/radio.aac\nhttp://example.com/stream/bare.ts\n";
        let stations = parse_playlist(content, "a.m3u");
        assert_eq!(stations[0].name, UNTITLED);
        assert_eq!(stations[1].name, "bare.ts");
    }

    #[test]
    fn test_non_http_logo_is_rejected() {
        let content = r#"#EXTINF:-1 tvg-logo="logos/local.png",Local
http://example.com/local.ts
"#;
        let stations = parse_playlist(content, "a.m3u");
        assert_eq!(stations[0].logo, PLACEHOLDER_LOGO);
    }

    #[test]
    fn test_metadata_is_cleared_after_use() {
        let content = r#"#EXTM3U
#EXTINF:-1 tvg-logo="https://example.com/one.png" group-title="Sports",One
http://example.com/one.ts
http://example.com/two.ts
"#;
        let stations = parse_playlist(content, "a.m3u");
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[1].name, "two.ts");
        assert_eq!(stations[1].group, "");
        assert_eq!(stations[1].logo, PLACEHOLDER_LOGO);
    }

    #[test]
    fn test_comments_and_directives_are_skipped() {
        let content = "#EXTM3U\n#EXTVLCOPT:http-user-agent=x\n\n#EXTGRP:Foo\n";
        assert!(parse_playlist(content, "a.m3u").is_empty());
    }

    #[test]
    fn test_crlf_line_endings() {
        let content = "#EXTM3U\r\n#EXTINF:-1,First\r\nhttp://example.com/1.ts\r\n";
        let stations = parse_playlist(content, "a.m3u");
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].name, "First");
        assert_eq!(stations[0].url, "http://example.com/1.ts");
    }

    #[test]
    fn test_duplicates_are_preserved_in_order() {
        let content = "#EXTINF:-1,Same\nhttp://a/1.ts\n#EXTINF:-1,Same\nhttp://a/1.ts\n#EXTINF:-1,Other\nhttp://a/2.ts\n";
        let stations = parse_playlist(content, "a.m3u");
        let names: Vec<&str> = stations.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Same", "Same", "Other"]);
        assert_eq!(stations[0], stations[1]);
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let content = "#EXTINF:-1 group-title=\"B\",Two\nhttp://a/2.ts\nhttp://a/3.ts\n";
        assert_eq!(parse_playlist(content, "x.m3u"), parse_playlist(content, "x.m3u"));
    }

    #[test]
    fn test_plain_name_url_pairs() {
        let content = "Jazz FM - http://example.com/jazz\nhttp://example.com/live/rock.mp3\nnot a station\n";
        let stations = parse_playlist(content, "stations.txt");
        assert_eq!(stations.len(), 2);
        assert_eq!(stations[0].name, "Jazz FM");
        assert_eq!(stations[0].url, "http://example.com/jazz");
        assert_eq!(stations[0].logo, PLACEHOLDER_LOGO);
        assert_eq!(stations[1].name, "rock.mp3");
        assert_eq!(stations[1].url, "http://example.com/live/rock.mp3");
    }

    #[test]
    fn test_plain_format_ignores_extinf_pairing() {
        let content = "#EXTINF:-1,Ignored\nhttp://example.com/a.ts\n";
        let stations = parse_playlist(content, "list.txt");
        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].name, "a.ts");
    }

    #[test]
    fn test_plain_line_with_extra_separators_falls_back_to_url_rule() {
        let content = "A - B - http://example.com/x\n";
        assert!(parse_playlist(content, "list.txt").is_empty());
    }

    #[test]
    fn test_unrecognized_text_yields_empty_list() {
        assert!(parse_playlist("", "a.m3u").is_empty());
        assert!(parse_playlist("hello\nworld\n", "notes.txt").is_empty());
        assert!(parse_playlist("#EXTM3U\n#EXTINF:-1,Dangling\n", "a.m3u").is_empty());
    }

    #[test]
    fn test_m3u_detection() {
        assert!(is_m3u_name("list.m3u"));
        assert!(is_m3u_name("LIST.M3U8"));
        assert!(is_m3u_name("https://example.com/get/list.m3u8?token=abc"));
        assert!(!is_m3u_name("list.txt"));
        assert!(!is_m3u_name("https://example.com/playlist"));
    }

    #[test]
    fn test_fallback_name() {
        assert_eq!(fallback_name("http://example.com/a/b/stream.ts"), "stream.ts");
        assert_eq!(fallback_name("http://example.com/a/"), "");
        assert_eq!(fallback_name("plain"), "plain");
    }
}
