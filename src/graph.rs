//! Stepped line graph shared by the bitrate and ping monitors

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Stroke};

const GRID_COLOR: Color32 = Color32::from_rgb(0x33, 0x33, 0x33);
const LABEL_COLOR: Color32 = Color32::from_rgb(0xaa, 0xaa, 0xaa);
const LABEL_SIZE: f32 = 10.0;
const LINE_WIDTH: f32 = 2.0;
const DOT_RADIUS: f32 = 3.0;

/// Which monitor a graph belongs to; fixes its colours and unit label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Series {
    Bitrate,
    Ping,
}

impl Series {
    pub fn unit(&self) -> &'static str {
        match self {
            Series::Bitrate => "bit/s",
            Series::Ping => "ms",
        }
    }

    pub fn line_color(&self) -> Color32 {
        match self {
            Series::Bitrate => Color32::from_rgb(0x00, 0xf0, 0xff),
            Series::Ping => Color32::from_rgb(0xff, 0xdd, 0x55),
        }
    }

    pub fn dot_color(&self) -> Color32 {
        match self {
            Series::Bitrate => Color32::from_rgb(0x00, 0xff, 0xff),
            Series::Ping => Color32::from_rgb(0xff, 0xee, 0x88),
        }
    }
}

/// Gridline spacing: a fifth of the scale rounded up to a multiple of 50
pub fn grid_step(max: f64) -> f64 {
    ((max / 5.0 / 50.0).ceil() * 50.0).max(50.0)
}

/// Gridline values from one step up to `max` inclusive
pub fn gridlines(max: f64) -> Vec<f64> {
    let step = grid_step(max);
    let mut values = Vec::new();
    let mut value = step;
    while value <= max {
        values.push(value);
        value += step;
    }
    values
}

/// Vertical pixel offset of `value` in a graph of `height` (0 is the top)
pub fn value_to_y(value: f64, max: f64, height: f32) -> f32 {
    if max <= 0.0 {
        return height;
    }
    height - (value / max) as f32 * height
}

/// Polyline for a stepped graph: horizontal to the next sample's x, then
/// vertical to its value. Needs at least two samples.
pub fn stepped_points(samples: &[f64], max: f64, width: f32, height: f32) -> Vec<Pos2> {
    if samples.len() < 2 {
        return Vec::new();
    }
    let step_x = width / (samples.len() - 1) as f32;
    let mut y = value_to_y(samples[0], max, height);
    let mut points = Vec::with_capacity(samples.len() * 2 - 1);
    points.push(Pos2::new(0.0, y));

    for (i, &sample) in samples.iter().enumerate().skip(1) {
        let x = i as f32 * step_x;
        let next_y = value_to_y(sample, max, height);
        points.push(Pos2::new(x, y));
        points.push(Pos2::new(x, next_y));
        y = next_y;
    }
    points
}

/// Draw gridlines, labels, the stepped line and the latest-sample dot
pub fn draw_line_graph(painter: &egui::Painter, rect: Rect, samples: &[f64], max: f64, series: Series) {
    let w = rect.width();
    let h = rect.height();
    let origin = rect.min.to_vec2();

    for value in gridlines(max) {
        let y = rect.top() + value_to_y(value, max, h);
        painter.line_segment(
            [Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)],
            Stroke::new(1.0, GRID_COLOR),
        );
        painter.text(
            Pos2::new(rect.left() + 8.0, y - 4.0),
            Align2::LEFT_BOTTOM,
            format!("{:.0} {}", value, series.unit()),
            FontId::proportional(LABEL_SIZE),
            LABEL_COLOR,
        );
    }

    let points: Vec<Pos2> = stepped_points(samples, max, w, h)
        .into_iter()
        .map(|p| p + origin)
        .collect();
    let Some(last) = points.last().copied() else {
        return;
    };
    painter.add(egui::Shape::line(points, Stroke::new(LINE_WIDTH, series.line_color())));
    painter.circle_filled(last, DOT_RADIUS, series.dot_color());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_step() {
        assert_eq!(grid_step(100.0), 50.0);
        assert_eq!(grid_step(300.0), 100.0);
        assert_eq!(grid_step(1000.0), 200.0);
        assert_eq!(grid_step(1100.0), 250.0);
        assert_eq!(grid_step(0.0), 50.0);
    }

    #[test]
    fn test_gridlines_stop_at_scale() {
        assert_eq!(gridlines(100.0), [50.0, 100.0]);
        assert_eq!(gridlines(300.0), [100.0, 200.0, 300.0]);
        assert_eq!(gridlines(1100.0), [250.0, 500.0, 750.0, 1000.0]);
    }

    #[test]
    fn test_value_to_y() {
        assert_eq!(value_to_y(0.0, 200.0, 100.0), 100.0);
        assert_eq!(value_to_y(200.0, 200.0, 100.0), 0.0);
        assert_eq!(value_to_y(50.0, 200.0, 100.0), 75.0);
    }

    #[test]
    fn test_stepped_points() {
        let points = stepped_points(&[0.0, 100.0, 50.0], 100.0, 200.0, 100.0);
        assert_eq!(
            points,
            [
                Pos2::new(0.0, 100.0),
                Pos2::new(100.0, 100.0),
                Pos2::new(100.0, 0.0),
                Pos2::new(200.0, 0.0),
                Pos2::new(200.0, 50.0),
            ]
        );
    }

    #[test]
    fn test_single_sample_draws_nothing() {
        assert!(stepped_points(&[], 100.0, 200.0, 100.0).is_empty());
        assert!(stepped_points(&[42.0], 100.0, 200.0, 100.0).is_empty());
    }

    #[test]
    fn test_series_styles_differ() {
        assert_ne!(Series::Bitrate.line_color(), Series::Ping.line_color());
        assert_eq!(Series::Ping.unit(), "ms");
    }
}
