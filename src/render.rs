//! Minimal PNG time-series renderer.
//!
//! Rasterizes one series per chart: a light grid, axes, a connecting
//! polyline, and a filled marker per point whose color encodes the day's
//! exposure severity. Kept deliberately small; axis tick text is out of
//! scope for these charts.

use std::path::Path;

use image::{Rgb, RgbImage};
use tracing::debug;

use crate::error::PipelineError;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);
const AXIS: Rgb<u8> = Rgb([90, 90, 90]);
const LINE: Rgb<u8> = Rgb([31, 119, 180]);

/// Marker colors by severity rank, mildest to worst. Ranks beyond the
/// palette clamp to the last entry.
const SEVERITY_PALETTE: [Rgb<u8>; 5] = [
    Rgb([44, 160, 44]),
    Rgb([255, 193, 7]),
    Rgb([255, 127, 14]),
    Rgb([214, 39, 40]),
    Rgb([128, 0, 128]),
];

const UNKNOWN_COLOR: Rgb<u8> = Rgb([150, 150, 150]);

/// Maps a severity rank to a marker color; `None` (unclassifiable) is grey.
pub fn severity_color(severity: Option<usize>) -> Rgb<u8> {
    match severity {
        Some(rank) => SEVERITY_PALETTE[rank.min(SEVERITY_PALETTE.len() - 1)],
        None => UNKNOWN_COLOR,
    }
}

/// One plotted day: the y value and the marker color.
#[derive(Debug, Clone, Copy)]
pub struct SeriesPoint {
    pub value: f64,
    pub color: Rgb<u8>,
}

/// Chart geometry. Defaults approximate a 10x4.5 inch figure at 150 dpi.
#[derive(Debug, Clone, Copy)]
pub struct ChartStyle {
    pub width: u32,
    pub height: u32,
    pub margin_left: u32,
    pub margin_right: u32,
    pub margin_top: u32,
    pub margin_bottom: u32,
}

impl Default for ChartStyle {
    fn default() -> Self {
        ChartStyle {
            width: 1500,
            height: 675,
            margin_left: 60,
            margin_right: 25,
            margin_top: 25,
            margin_bottom: 45,
        }
    }
}

fn put_pixel_clamped(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// Bresenham line segment.
fn draw_line(img: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);

    loop {
        put_pixel_clamped(img, x, y, color);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn draw_disc(img: &mut RgbImage, cx: i64, cy: i64, radius: i64, color: Rgb<u8>) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_pixel_clamped(img, cx + dx, cy + dy, color);
            }
        }
    }
}

/// Value bounds with 5% headroom; a flat series gets a unit of padding so
/// projection never divides by zero.
fn y_bounds(points: &[SeriesPoint]) -> (f64, f64) {
    let min = points.iter().map(|p| p.value).fold(f64::INFINITY, f64::min);
    let max = points
        .iter()
        .map(|p| p.value)
        .fold(f64::NEG_INFINITY, f64::max);
    let pad = if max > min { (max - min) * 0.05 } else { 1.0 };
    (min - pad, max + pad)
}

/// Renders the series to a PNG file at `path`.
///
/// # Errors
///
/// [`PipelineError::Plot`] when there are no points to draw, or when
/// encoding the image fails.
pub fn render_time_series(
    path: &Path,
    points: &[SeriesPoint],
    style: &ChartStyle,
) -> Result<(), PipelineError> {
    if points.is_empty() {
        return Err(PipelineError::Plot("no data points to plot".into()));
    }

    let mut img = RgbImage::from_pixel(style.width, style.height, BACKGROUND);

    let left = style.margin_left as i64;
    let right = (style.width - style.margin_right) as i64;
    let top = style.margin_top as i64;
    let bottom = (style.height - style.margin_bottom) as i64;

    let (y_min, y_max) = y_bounds(points);

    let project_x = |i: usize| -> i64 {
        if points.len() == 1 {
            (left + right) / 2
        } else {
            left + (right - left) * i as i64 / (points.len() as i64 - 1)
        }
    };
    let project_y = |v: f64| -> i64 {
        let t = (v - y_min) / (y_max - y_min);
        bottom - ((bottom - top) as f64 * t).round() as i64
    };

    // Horizontal gridlines.
    for i in 0..=4 {
        let y = top + (bottom - top) * i / 4;
        draw_line(&mut img, left, y, right, y, GRID);
    }

    // Axes.
    draw_line(&mut img, left, top, left, bottom, AXIS);
    draw_line(&mut img, left, bottom, right, bottom, AXIS);

    for (i, pair) in points.windows(2).enumerate() {
        draw_line(
            &mut img,
            project_x(i),
            project_y(pair[0].value),
            project_x(i + 1),
            project_y(pair[1].value),
            LINE,
        );
    }

    for (i, point) in points.iter().enumerate() {
        draw_disc(&mut img, project_x(i), project_y(point.value), 4, point.color);
    }

    img.save(path)
        .map_err(|e| PipelineError::Plot(format!("cannot write {}: {e}", path.display())))?;
    debug!(path = %path.display(), points = points.len(), "plot rendered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(value: f64) -> SeriesPoint {
        SeriesPoint {
            value,
            color: severity_color(Some(0)),
        }
    }

    #[test]
    fn test_render_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("series.png");
        let points: Vec<_> = [24.0, 26.5, 31.2, 29.8].iter().map(|&v| point(v)).collect();

        render_time_series(&path, &points, &ChartStyle::default()).unwrap();

        let meta = std::fs::metadata(&path).unwrap();
        assert!(meta.len() > 0);
    }

    #[test]
    fn test_render_single_point_and_flat_series() {
        let dir = tempfile::tempdir().unwrap();
        let style = ChartStyle::default();

        render_time_series(&dir.path().join("one.png"), &[point(30.0)], &style).unwrap();
        render_time_series(
            &dir.path().join("flat.png"),
            &[point(5.0), point(5.0), point(5.0)],
            &style,
        )
        .unwrap();
    }

    #[test]
    fn test_render_empty_is_plot_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = render_time_series(&dir.path().join("x.png"), &[], &ChartStyle::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Plot(_)));
    }

    #[test]
    fn test_severity_color_clamps() {
        assert_eq!(severity_color(Some(99)), severity_color(Some(4)));
        assert_eq!(severity_color(None), Rgb([150, 150, 150]));
    }
}
