// Stripe renderer: lays out evenly spaced vertical bars and paints them on a
// copy of the source image. Layout and painting are split so the geometry can
// be checked without touching pixels.

use crate::error::RenderError;
use image::{Rgba, RgbaImage};
use log::{debug, warn};

/// Horizontal extent of one stripe. `x` may be negative or run past the
/// right edge when the stripes do not fit; painting clips it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub x: i64,
    pub width: u32,
}

impl Span {
    pub fn end(&self) -> i64 {
        self.x + self.width as i64
    }
}

/// Colour and width shared by every stripe job of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripeStyle {
    pub color: Rgba<u8>,
    /// Stripe width as a percentage of the image width, 1..=100.
    pub width_percent: u8,
}

impl StripeStyle {
    pub fn new(color: &str, width_percent: u8) -> Result<Self, RenderError> {
        if !(1..=100).contains(&width_percent) {
            return Err(RenderError::InvalidWidth(width_percent));
        }
        Ok(StripeStyle {
            color: parse_hex_color(color)?,
            width_percent,
        })
    }

    pub fn width_fraction(&self) -> f64 {
        self.width_percent as f64 / 100.0
    }
}

/// Parse `#RGB` or `#RRGGBB` (the `#` is optional) into an opaque colour.
pub fn parse_hex_color(input: &str) -> Result<Rgba<u8>, RenderError> {
    let digits = input.trim().trim_start_matches('#');
    let expanded = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect::<String>(),
        6 => digits.to_string(),
        _ => return Err(RenderError::InvalidColor(input.to_string())),
    };

    let rgb = hex::decode(&expanded).map_err(|_| RenderError::InvalidColor(input.to_string()))?;
    Ok(Rgba([rgb[0], rgb[1], rgb[2], 255]))
}

/// Pixel width of a stripe: `round(image_width * percent / 100)`, never
/// less than one pixel.
pub fn stripe_width(image_width: u32, width_percent: u8) -> u32 {
    let rounded = (image_width as u64 * width_percent as u64 + 50) / 100;
    rounded.max(1) as u32
}

/// Compute the spans of `count` stripes across an image `image_width` pixels
/// wide.
///
/// The gap is `floor((W - n*w) / (n + 1))`; the first stripe starts one gap in
/// and each following stripe starts one gap after the previous one ends. When
/// the stripes do not fit the gap goes negative and the spans overlap; that
/// arithmetic is kept as is.
pub fn stripe_layout(image_width: u32, count: u32, width_percent: u8) -> Vec<Span> {
    let width = stripe_width(image_width, width_percent);
    let n = count as i64;
    let w = width as i64;
    let gap = (image_width as i64 - n * w).div_euclid(n + 1);

    let mut x = gap;
    (0..n)
        .map(|_| {
            let span = Span { x, width };
            x += w + gap;
            span
        })
        .collect()
}

/// Draw `count` full-height stripes on a copy of `image`. The source image is
/// left untouched.
pub fn render_stripes(
    image: &RgbaImage,
    count: u32,
    style: &StripeStyle,
) -> Result<RgbaImage, RenderError> {
    if count == 0 {
        return Err(RenderError::InvalidCount(count));
    }

    let (width, height) = image.dimensions();
    let spans = stripe_layout(width, count, style.width_percent);
    if count as u64 * stripe_width(width, style.width_percent) as u64 >= width as u64 {
        warn!(
            "{count} stripes at {}% do not fit in {width}px, stripes will overlap",
            style.width_percent
        );
    }

    let mut out = image.clone();
    for span in &spans {
        let x0 = span.x.clamp(0, width as i64) as u32;
        let x1 = span.end().clamp(0, width as i64) as u32;
        for x in x0..x1 {
            for y in 0..height {
                out.put_pixel(x, y, style.color);
            }
        }
    }

    debug!("rendered {count} stripes on {width}x{height} image");
    Ok(out)
}
