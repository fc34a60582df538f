//! Tattoo preview compositing: an overlay design positioned over a body photo with a
//! translate / uniform scale / rotate / flip transform, driven by pointer gestures and
//! exported at the photo's native resolution.

use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::{
    error::{StudioError, StudioResult},
    upload::{self, UploadKind},
};

pub const MIN_SCALE: f64 = 0.05;
pub const MAX_SCALE: f64 = 3.0;
pub const RESET_SCALE: f64 = 0.3;
pub const DEFAULT_OPACITY: f64 = 0.85;
pub const MIN_BACKGROUND_SCALE: f64 = 0.5;
pub const MAX_BACKGROUND_SCALE: f64 = 2.0;

pub fn clamp_scale(scale: f64) -> f64 {
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    /// Degrees, clockwise in screen space.
    pub rotation: f64,
    #[serde(default)]
    pub flip_x: bool,
    #[serde(default)]
    pub flip_y: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            rotation: 0.0,
            flip_x: false,
            flip_y: false,
        }
    }
}

impl Transform {
    pub fn centered(canvas: CanvasSize) -> Self {
        Self {
            x: canvas.width / 2.0,
            y: canvas.height / 2.0,
            scale: RESET_SCALE,
            ..Self::default()
        }
    }

    pub fn nudge_scale(&mut self, delta: f64) {
        self.scale = clamp_scale(self.scale + delta);
    }

    pub fn rotate(&mut self, degrees: f64) {
        self.rotation += degrees;
    }

    pub fn toggle_flip_x(&mut self) {
        self.flip_x = !self.flip_x;
    }

    pub fn toggle_flip_y(&mut self) {
        self.flip_y = !self.flip_y;
    }

    pub fn pinch(&mut self, distance_ratio: f64, angle_delta: f64) {
        if distance_ratio.is_finite() && distance_ratio > 0.0 {
            self.scale = clamp_scale(self.scale * distance_ratio);
        }
        self.rotation += angle_delta;
    }

    fn axis_scales(&self, ratio: f64) -> (f64, f64) {
        let sx = if self.flip_x { -1.0 } else { 1.0 };
        let sy = if self.flip_y { -1.0 } else { 1.0 };
        (sx * self.scale * ratio, sy * self.scale * ratio)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

pub fn distance(a: Point, b: Point) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Angle of the line from `a` to `b`, in degrees.
pub fn angle(a: Point, b: Point) -> f64 {
    (b.y - a.y).atan2(b.x - a.x).to_degrees()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Idle,
    Dragging { anchor: Point },
    Pinching { distance: f64, angle: f64 },
}

/// Pointer state machine; every change in pointer count restarts the gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureTracker {
    state: Gesture,
}

impl Default for GestureTracker {
    fn default() -> Self {
        Self {
            state: Gesture::Idle,
        }
    }
}

impl GestureTracker {
    pub fn state(&self) -> Gesture {
        self.state
    }

    pub fn pointers_down(&mut self, pointers: &[Point], transform: &Transform) {
        self.restart(pointers, transform);
    }

    pub fn pointers_up(&mut self, remaining: &[Point], transform: &Transform) {
        self.restart(remaining, transform);
    }

    pub fn pointers_moved(&mut self, pointers: &[Point], transform: &mut Transform) {
        match (self.state, pointers) {
            (Gesture::Dragging { anchor }, [pointer]) => {
                transform.x = pointer.x - anchor.x;
                transform.y = pointer.y - anchor.y;
            }
            (Gesture::Pinching { distance: last_distance, angle: last_angle }, [a, b]) => {
                let current_distance = distance(*a, *b);
                let current_angle = angle(*a, *b);
                let ratio = if last_distance > f64::EPSILON {
                    current_distance / last_distance
                } else {
                    1.0
                };
                transform.pinch(ratio, current_angle - last_angle);
                self.state = Gesture::Pinching {
                    distance: current_distance,
                    angle: current_angle,
                };
            }
            _ => {}
        }
    }

    fn restart(&mut self, pointers: &[Point], transform: &Transform) {
        self.state = match pointers {
            [pointer] => Gesture::Dragging {
                anchor: Point::new(pointer.x - transform.x, pointer.y - transform.y),
            },
            [a, b, ..] => Gesture::Pinching {
                distance: distance(*a, *b),
                angle: angle(*a, *b),
            },
            [] => Gesture::Idle,
        };
    }
}

/// Flattens `overlay` onto `background` at the background's native size. The transform
/// is expressed in on-screen canvas pixels and is rescaled by `background.width / canvas.width`.
pub fn export(
    background: &RgbaImage,
    overlay: Option<&RgbaImage>,
    transform: &Transform,
    canvas: CanvasSize,
    background_scale: f64,
    opacity: f64,
) -> RgbaImage {
    let (width, height) = background.dimensions();
    let mut output = draw_background(background, background_scale);

    let Some(overlay) = overlay else {
        return output;
    };
    if width == 0 || height == 0 || overlay.width() == 0 || overlay.height() == 0 {
        return output;
    }

    let ratio = if canvas.width > 0.0 {
        width as f64 / canvas.width
    } else {
        1.0
    };
    let (scale_x, scale_y) = transform.axis_scales(ratio);
    if scale_x.abs() < f64::EPSILON || scale_y.abs() < f64::EPSILON {
        return output;
    }

    let origin = Point::new(transform.x * ratio, transform.y * ratio);
    let theta = transform.rotation.to_radians();
    let (sin, cos) = theta.sin_cos();
    let half_w = overlay.width() as f64 / 2.0;
    let half_h = overlay.height() as f64 / 2.0;
    let opacity = opacity.clamp(0.0, 1.0);

    let corners = [(-half_w, -half_h), (half_w, -half_h), (half_w, half_h), (-half_w, half_h)];
    let mut min = Point::new(f64::MAX, f64::MAX);
    let mut max = Point::new(f64::MIN, f64::MIN);
    for (u, v) in corners {
        let (u, v) = (u * scale_x, v * scale_y);
        let x = origin.x + u * cos - v * sin;
        let y = origin.y + u * sin + v * cos;
        min = Point::new(min.x.min(x), min.y.min(y));
        max = Point::new(max.x.max(x), max.y.max(y));
    }
    let x0 = min.x.floor().max(0.0) as u32;
    let y0 = min.y.floor().max(0.0) as u32;
    let x1 = (max.x.ceil().max(0.0) as u32).min(width);
    let y1 = (max.y.ceil().max(0.0) as u32).min(height);

    for py in y0..y1 {
        for px in x0..x1 {
            let dx = px as f64 + 0.5 - origin.x;
            let dy = py as f64 + 0.5 - origin.y;
            let u = (dx * cos + dy * sin) / scale_x + half_w;
            let v = (-dx * sin + dy * cos) / scale_y + half_h;
            if u < 0.0 || v < 0.0 || u >= overlay.width() as f64 || v >= overlay.height() as f64 {
                continue;
            }
            let source = overlay.get_pixel(u as u32, v as u32);
            let blended = blend(*output.get_pixel(px, py), *source, opacity);
            output.put_pixel(px, py, blended);
        }
    }

    output
}

fn draw_background(background: &RgbaImage, background_scale: f64) -> RgbaImage {
    let scale = background_scale.clamp(MIN_BACKGROUND_SCALE, MAX_BACKGROUND_SCALE);
    if (scale - 1.0).abs() < f64::EPSILON {
        return background.clone();
    }
    let (width, height) = background.dimensions();
    let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);
    RgbaImage::from_fn(width, height, |px, py| {
        let sx = (px as f64 + 0.5 - cx) / scale + cx;
        let sy = (py as f64 + 0.5 - cy) / scale + cy;
        if sx < 0.0 || sy < 0.0 || sx >= width as f64 || sy >= height as f64 {
            Rgba([0, 0, 0, 0])
        } else {
            *background.get_pixel(sx as u32, sy as u32)
        }
    })
}

/// Source-over with straight alpha.
fn blend(dst: Rgba<u8>, src: Rgba<u8>, opacity: f64) -> Rgba<u8> {
    let sa = src[3] as f64 / 255.0 * opacity;
    let da = dst[3] as f64 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let channel = |i: usize| {
        let value = (src[i] as f64 * sa + dst[i] as f64 * da * (1.0 - sa)) / out_a;
        value.round().clamp(0.0, 255.0) as u8
    };
    Rgba([
        channel(0),
        channel(1),
        channel(2),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    pub background: String,
    pub overlay: Option<String>,
    #[serde(default)]
    pub transform: Transform,
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub background_scale: Option<f64>,
    pub opacity: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewResponse {
    pub image: String,
    pub width: u32,
    pub height: u32,
}

fn load_layer(data_url: &str, kind: UploadKind, max_bytes: usize) -> StudioResult<RgbaImage> {
    let (mime, bytes) = upload::decode_data_url(data_url)?;
    let mime = mime.unwrap_or_else(|| "image/png".to_string());
    upload::validate(kind, &mime, bytes.len(), max_bytes)?;
    Ok(upload::decode(&bytes)?.to_rgba8())
}

pub fn render_preview(request: &PreviewRequest, max_bytes: usize) -> StudioResult<PreviewResponse> {
    if request.canvas_width <= 0.0 || request.canvas_height <= 0.0 {
        return Err(StudioError::Preview("canvas size must be positive".to_string()));
    }
    let background = load_layer(&request.background, UploadKind::Photo, max_bytes)?;
    let overlay = request
        .overlay
        .as_deref()
        .filter(|data| !data.trim().is_empty())
        .map(|data| load_layer(data, UploadKind::Overlay, max_bytes))
        .transpose()?;

    let composite = export(
        &background,
        overlay.as_ref(),
        &request.transform,
        CanvasSize {
            width: request.canvas_width,
            height: request.canvas_height,
        },
        request.background_scale.unwrap_or(1.0),
        request.opacity.unwrap_or(DEFAULT_OPACITY),
    );

    let mut bytes = Vec::new();
    composite
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|err| StudioError::Preview(err.to_string()))?;

    Ok(PreviewResponse {
        image: upload::encode_data_url("image/png", &bytes),
        width: composite.width(),
        height: composite.height(),
    })
}
