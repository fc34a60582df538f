use std::{fs, io::Cursor, path::Path};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{codecs::jpeg::JpegEncoder, DynamicImage, GenericImageView, ImageFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::new_id;

pub const ALLOWED_IMAGE_TYPES: [&str; 5] =
    ["image/jpeg", "image/jpg", "image/png", "image/gif", "image/webp"];
pub const ALLOWED_OVERLAY_TYPES: [&str; 1] = ["image/png"];

pub const PHOTO_MAX_WIDTH: u32 = 1200;
pub const PHOTO_JPEG_QUALITY: u8 = 80;
pub const OVERLAY_MAX_WIDTH: u32 = 800;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Unsupported file type {0}. Allowed: {1}")]
    UnsupportedType(String, String),

    #[error("File too large: {size} bytes (max {max} bytes)")]
    TooLarge { size: usize, max: usize },

    #[error("Invalid image encoding: {0}")]
    InvalidEncoding(String),

    #[error("Image could not be decoded: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Image could not be re-encoded: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Image could not be stored: {0}")]
    Store(#[from] std::io::Error),
}

/// Portfolio photos are flattened to JPEG; overlays keep their transparency as PNG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UploadKind {
    Photo,
    Overlay,
}

impl UploadKind {
    fn allowed_types(self) -> &'static [&'static str] {
        match self {
            UploadKind::Photo => &ALLOWED_IMAGE_TYPES,
            UploadKind::Overlay => &ALLOWED_OVERLAY_TYPES,
        }
    }

    fn max_width(self) -> u32 {
        match self {
            UploadKind::Photo => PHOTO_MAX_WIDTH,
            UploadKind::Overlay => OVERLAY_MAX_WIDTH,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            UploadKind::Photo => "jpg",
            UploadKind::Overlay => "png",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub kind: UploadKind,
    pub content_type: String,
    /// Base64 payload, with or without a `data:` prefix.
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredImage {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub extension: &'static str,
}

/// Splits `data:<mime>;base64,<payload>` (or a bare base64 string) into its mime type and bytes.
pub fn decode_data_url(input: &str) -> Result<(Option<String>, Vec<u8>), UploadError> {
    let input = input.trim();
    let (mime, payload) = match input.strip_prefix("data:") {
        Some(rest) => {
            let (meta, payload) = rest
                .split_once(',')
                .ok_or_else(|| UploadError::InvalidEncoding("missing data URL payload".into()))?;
            let Some(mime) = meta.strip_suffix(";base64") else {
                return Err(UploadError::InvalidEncoding("data URL is not base64".into()));
            };
            (Some(mime.to_string()), payload)
        }
        None => (None, input),
    };

    let bytes = STANDARD
        .decode(payload)
        .map_err(|err| UploadError::InvalidEncoding(err.to_string()))?;
    Ok((mime, bytes))
}

pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

pub fn validate(
    kind: UploadKind,
    content_type: &str,
    size: usize,
    max_bytes: usize,
) -> Result<(), UploadError> {
    let content_type = content_type.trim().to_ascii_lowercase();
    let allowed = kind.allowed_types();
    if !allowed.contains(&content_type.as_str()) {
        let names = allowed
            .iter()
            .map(|mime| mime.trim_start_matches("image/"))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(UploadError::UnsupportedType(content_type, names));
    }
    if size > max_bytes {
        return Err(UploadError::TooLarge {
            size,
            max: max_bytes,
        });
    }
    Ok(())
}

pub fn decode(bytes: &[u8]) -> Result<DynamicImage, UploadError> {
    image::load_from_memory(bytes).map_err(UploadError::Decode)
}

/// Shrinks to `max_width` keeping the aspect ratio; narrower images pass through untouched.
pub fn fit_width(image: DynamicImage, max_width: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    if width <= max_width {
        return image;
    }
    let new_height = ((height as f64 * max_width as f64) / width as f64).round().max(1.0) as u32;
    image.resize_exact(max_width, new_height, image::imageops::FilterType::Triangle)
}

pub fn reencode(image: &DynamicImage, kind: UploadKind) -> Result<EncodedImage, UploadError> {
    let (width, height) = image.dimensions();
    let mut bytes = Vec::new();
    match kind {
        UploadKind::Photo => {
            let rgb = image.to_rgb8();
            let encoder = JpegEncoder::new_with_quality(&mut bytes, PHOTO_JPEG_QUALITY);
            rgb.write_with_encoder(encoder).map_err(UploadError::Encode)?;
        }
        UploadKind::Overlay => {
            image
                .to_rgba8()
                .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
                .map_err(UploadError::Encode)?;
        }
    }
    Ok(EncodedImage {
        bytes,
        width,
        height,
        extension: kind.extension(),
    })
}

pub fn store(dir: &Path, encoded: &EncodedImage) -> Result<String, UploadError> {
    fs::create_dir_all(dir)?;
    let file_name = format!("{}.{}", new_id(), encoded.extension);
    fs::write(dir.join(&file_name), &encoded.bytes)?;
    Ok(file_name)
}

/// validate -> decode -> resize -> re-encode -> store.
pub fn process(request: &UploadRequest, dir: &Path, max_bytes: usize) -> Result<StoredImage, UploadError> {
    let (data_mime, bytes) = decode_data_url(&request.data)?;
    if let Some(mime) = data_mime.as_deref() {
        if !mime.eq_ignore_ascii_case(request.content_type.trim()) {
            log::warn!(
                "Upload declared {} but data URL says {mime}",
                request.content_type
            );
        }
    }
    validate(request.kind, &request.content_type, bytes.len(), max_bytes)?;
    let image = fit_width(decode(&bytes)?, request.kind.max_width());
    let encoded = reencode(&image, request.kind)?;
    let file_name = store(dir, &encoded)?;

    Ok(StoredImage {
        url: format!("/uploads/{file_name}"),
        width: encoded.width,
        height: encoded.height,
    })
}
