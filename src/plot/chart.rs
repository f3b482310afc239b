use image::{Rgb, RgbImage};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 480;
const MARGIN: u32 = 40;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([40, 40, 40]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);

/// One color per stream, cycled when a chart compares more than eight.
const PALETTE: [Rgb<u8>; 8] = [
    Rgb([31, 119, 180]),
    Rgb([255, 127, 14]),
    Rgb([44, 160, 44]),
    Rgb([214, 39, 40]),
    Rgb([148, 103, 189]),
    Rgb([140, 86, 75]),
    Rgb([227, 119, 194]),
    Rgb([127, 127, 127]),
];

/// Renders an epoch-indexed line chart comparing one stat key across
/// streams.
///
/// Each entry of `series` is `(stream name, values for epochs 1..=epochs)`;
/// non-finite values break the polyline.  Streams are distinguished by color
/// (legend swatches top-right, in series order); every finite point gets an
/// x-shaped marker.
pub fn render_line_chart(series: &[(String, Vec<f64>)], epochs: usize) -> RgbImage {
    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);

    let (y_min, y_max) = value_range(series);

    draw_grid(&mut img, epochs);

    // Axes last so they stay on top of the grid.
    let (left, right) = (MARGIN as i64, (WIDTH - MARGIN) as i64);
    let (top, bottom) = (MARGIN as i64, (HEIGHT - MARGIN) as i64);
    draw_line(&mut img, left, top, left, bottom, AXIS);
    draw_line(&mut img, left, bottom, right, bottom, AXIS);

    for (i, (_, ys)) in series.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        let mut prev: Option<(i64, i64)> = None;
        for (j, y) in ys.iter().enumerate() {
            if !y.is_finite() {
                prev = None;
                continue;
            }
            let p = (x_pixel(j, epochs), y_pixel(*y, y_min, y_max));
            if let Some(q) = prev {
                draw_line(&mut img, q.0, q.1, p.0, p.1, color);
            }
            draw_marker(&mut img, p.0, p.1, color);
            prev = Some(p);
        }

        // Legend swatch.
        let sy = top + 6 + 14 * i as i64;
        fill_rect(&mut img, right - 16, sy, 10, 10, color);
    }

    img
}

/// Finite min/max over every series, padded so a flat line doesn't collapse
/// the y-range.
fn value_range(series: &[(String, Vec<f64>)]) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for (_, ys) in series {
        for y in ys {
            if y.is_finite() {
                min = min.min(*y);
                max = max.max(*y);
            }
        }
    }
    if min > max {
        return (0.0, 1.0);
    }
    if min == max {
        return (min - 0.5, max + 0.5);
    }
    (min, max)
}

fn draw_grid(img: &mut RgbImage, epochs: usize) {
    let (left, right) = (MARGIN as i64, (WIDTH - MARGIN) as i64);
    let (top, bottom) = (MARGIN as i64, (HEIGHT - MARGIN) as i64);

    for div in 1..=4 {
        let y = top + (bottom - top) * div / 5;
        draw_line(img, left, y, right, y, GRID);
    }

    // Integer x-ticks; thin out when there are many epochs.
    let step = (epochs / 20).max(1);
    for e in (1..=epochs).step_by(step) {
        let x = x_pixel(e - 1, epochs);
        draw_line(img, x, top, x, bottom, GRID);
    }
}

fn x_pixel(index: usize, epochs: usize) -> i64 {
    let span = (WIDTH - 2 * MARGIN) as f64;
    let slots = epochs.saturating_sub(1).max(1) as f64;
    MARGIN as i64 + (index as f64 / slots * span).round() as i64
}

fn y_pixel(y: f64, y_min: f64, y_max: f64) -> i64 {
    let span = (HEIGHT - 2 * MARGIN) as f64;
    let t = (y - y_min) / (y_max - y_min);
    (HEIGHT - MARGIN) as i64 - (t * span).round() as i64
}

/// Bresenham segment; pixels outside the canvas are dropped.
fn draw_line(img: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);
    loop {
        put_pixel(img, x, y, color);
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

/// X-shaped sample marker, matching the series color.
fn draw_marker(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    for d in -3..=3 {
        put_pixel(img, x + d, y + d, color);
        put_pixel(img, x + d, y - d, color);
    }
}

fn fill_rect(img: &mut RgbImage, x: i64, y: i64, w: i64, h: i64, color: Rgb<u8>) {
    for dy in 0..h {
        for dx in 0..w {
            put_pixel(img, x + dx, y + dy, color);
        }
    }
}

fn put_pixel(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}
