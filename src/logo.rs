//! Station logo fetching and texture cache
//!
//! Logos are downloaded on background threads, decoded and scaled down,
//! then uploaded once per URL. Until a logo is ready, or when it fails,
//! callers draw the placeholder box instead.

use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;

use eframe::egui::{self, Color32, Pos2, Rect, TextureHandle, Vec2};
use tracing::debug;

use crate::config::network::{LOGO_TIMEOUT, MAX_LOGO_BYTES, MAX_LOGO_FETCHES};
use crate::config::ui::{LOGO_MAX_SIDE, PLACEHOLDER_LOGO};
use crate::error::{AppError, Result};

/// Download raw logo bytes
pub fn fetch_logo(agent: &ureq::Agent, url: &str, user_agent: &str) -> Result<Vec<u8>> {
    let mut response = agent
        .get(url)
        .header("User-Agent", user_agent)
        .call()
        .map_err(|e| match e {
            ureq::Error::StatusCode(code) => AppError::Status(code),
            other => AppError::Http(other),
        })?;

    Ok(response.body_mut().with_config().limit(MAX_LOGO_BYTES).read_to_vec()?)
}

/// Decode image bytes into an RGBA image no larger than `LOGO_MAX_SIDE`
pub fn decode_logo(bytes: &[u8]) -> Result<egui::ColorImage> {
    let mut image = image::load_from_memory(bytes)?;
    if image.width() > LOGO_MAX_SIDE || image.height() > LOGO_MAX_SIDE {
        image = image.thumbnail(LOGO_MAX_SIDE, LOGO_MAX_SIDE);
    }
    let rgba = image.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}

/// Largest rect with the image's aspect ratio centred inside `bounds`
pub fn fit_within(image_size: Vec2, bounds: Rect) -> Rect {
    if image_size.x <= 0.0 || image_size.y <= 0.0 {
        return bounds;
    }
    let scale = (bounds.width() / image_size.x).min(bounds.height() / image_size.y);
    Rect::from_center_size(bounds.center(), image_size * scale)
}

/// Paint a logo texture into `rect`, or the placeholder box without one
pub fn paint_logo(painter: &egui::Painter, rect: Rect, texture: Option<&TextureHandle>) {
    painter.rect_filled(rect, 4.0, Color32::from_gray(40));
    match texture {
        Some(texture) => {
            let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
            painter.image(texture.id(), fit_within(texture.size_vec2(), rect), uv, Color32::WHITE);
        }
        None => {
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "📺",
                egui::FontId::proportional((rect.height() * 0.4).max(12.0)),
                Color32::GRAY,
            );
        }
    }
}

enum LogoState {
    Loading,
    Ready(TextureHandle),
    Failed,
}

type Delivery = (String, Result<egui::ColorImage>);

/// Per-URL logo textures, filled in from background downloads
pub struct LogoCache {
    entries: HashMap<String, LogoState>,
    agent: ureq::Agent,
    user_agent: String,
    sender: Sender<Delivery>,
    receiver: Receiver<Delivery>,
    in_flight: usize,
}

impl LogoCache {
    pub fn new(user_agent: &str) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(LOGO_TIMEOUT))
            .build()
            .new_agent();
        let (sender, receiver) = channel();
        Self {
            entries: HashMap::new(),
            agent,
            user_agent: user_agent.to_string(),
            sender,
            receiver,
            in_flight: 0,
        }
    }

    /// Texture for `url`, requesting it the first time it is seen.
    ///
    /// `None` while loading, after a failure, or for URLs that are not
    /// fetched at all (non-web and the stock placeholder).
    pub fn texture(&mut self, url: &str) -> Option<&TextureHandle> {
        if !url.starts_with("http") || url == PLACEHOLDER_LOGO {
            return None;
        }
        if !self.entries.contains_key(url) && self.in_flight < MAX_LOGO_FETCHES {
            self.request(url);
        }
        match self.entries.get(url) {
            Some(LogoState::Ready(texture)) => Some(texture),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    /// Upload finished downloads. Returns true when anything arrived.
    pub fn poll(&mut self, ctx: &egui::Context) -> bool {
        let mut arrived = false;
        while let Ok((url, result)) = self.receiver.try_recv() {
            self.store(ctx, url, result);
            arrived = true;
        }
        arrived
    }

    fn request(&mut self, url: &str) {
        self.entries.insert(url.to_string(), LogoState::Loading);
        self.in_flight += 1;

        let agent = self.agent.clone();
        let user_agent = self.user_agent.clone();
        let sender = self.sender.clone();
        let url = url.to_string();
        thread::spawn(move || {
            let result = fetch_logo(&agent, &url, &user_agent).and_then(|bytes| decode_logo(&bytes));
            let _ = sender.send((url, result));
        });
    }

    fn store(&mut self, ctx: &egui::Context, url: String, result: Result<egui::ColorImage>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let state = match result {
            Ok(image) => {
                let texture = ctx.load_texture(format!("logo:{}", url), image, egui::TextureOptions::LINEAR);
                LogoState::Ready(texture)
            }
            Err(e) => {
                debug!(url = %url, error = %e, "logo unavailable");
                LogoState::Failed
            }
        };
        self.entries.insert(url, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::{Duration, Instant};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 10, 10, 255]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_decode_keeps_small_logos() {
        let image = decode_logo(&png_bytes(40, 20)).unwrap();
        assert_eq!(image.size, [40, 20]);
    }

    #[test]
    fn test_decode_scales_large_logos() {
        let image = decode_logo(&png_bytes(1024, 512)).unwrap();
        assert_eq!(image.size, [256, 128]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_logo(b"<html>not an image</html>"), Err(AppError::Image(_))));
    }

    #[test]
    fn test_fit_within_keeps_aspect() {
        let bounds = Rect::from_min_size(Pos2::ZERO, Vec2::new(140.0, 80.0));
        let fitted = fit_within(Vec2::new(100.0, 100.0), bounds);
        assert_eq!(fitted.size(), Vec2::new(80.0, 80.0));
        assert_eq!(fitted.center(), bounds.center());

        let wide = fit_within(Vec2::new(280.0, 40.0), bounds);
        assert_eq!(wide.size(), Vec2::new(140.0, 20.0));
    }

    #[test]
    fn test_placeholder_and_local_urls_are_not_fetched() {
        let mut cache = LogoCache::new("test");
        assert!(cache.texture(PLACEHOLDER_LOGO).is_none());
        assert!(cache.texture("logos/local.png").is_none());
        assert!(!cache.is_loading());
        assert!(cache.entries.is_empty());
    }

    #[test]
    fn test_delivered_logo_becomes_texture() {
        let ctx = egui::Context::default();
        let mut cache = LogoCache::new("test");
        let url = "http://logos.example/one.png";
        cache.entries.insert(url.to_string(), LogoState::Loading);
        cache.in_flight = 1;

        let image = decode_logo(&png_bytes(8, 4)).unwrap();
        cache.sender.send((url.to_string(), Ok(image))).unwrap();
        assert!(cache.poll(&ctx));

        assert!(!cache.is_loading());
        let texture = cache.texture(url).expect("texture uploaded");
        assert_eq!(texture.size(), [8, 4]);
    }

    #[test]
    fn test_failed_logo_is_not_retried() {
        let ctx = egui::Context::default();
        let mut cache = LogoCache::new("test");
        let url = "http://127.0.0.1:1/logo.png";

        assert!(cache.texture(url).is_none());
        assert!(cache.is_loading());

        let deadline = Instant::now() + Duration::from_secs(10);
        while cache.is_loading() && Instant::now() < deadline {
            cache.poll(&ctx);
            thread::sleep(Duration::from_millis(20));
        }

        assert!(matches!(cache.entries.get(url), Some(LogoState::Failed)));
        assert!(cache.texture(url).is_none());
        assert!(!cache.is_loading());
    }
}
