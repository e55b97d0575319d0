use std::path::Path;

use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

pub const PNG_MIME: &str = "image/png";
pub const JPEG_MIME: &str = "image/jpeg";

/// Raw bytes of a user-selected image plus its detected mime type.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// Read an image file, sniffing the mime type from content first and the
/// file extension second.
pub fn load_image_attachment(path: &Path) -> Result<ImageAttachment> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read image file: {}", path.display()))?;
    let mime = sniff_image_mime(&bytes)
        .or_else(|| extension_mime(path))
        .ok_or_else(|| anyhow!("'{}' is not a recognized image", path.display()))?;
    Ok(ImageAttachment { bytes, mime })
}

/// Detect an image mime type from magic bytes. Non-image content yields None.
pub fn sniff_image_mime(bytes: &[u8]) -> Option<String> {
    let kind = infer::get(bytes)?;
    let detected = kind.mime_type();
    if detected.starts_with("image/") {
        return Some(detected.to_string());
    }
    None
}

/// Build the `data:<mime>;base64,<payload>` form used for caption image
/// submissions and feed responses.
pub fn encode_data_url(bytes: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}

/// Split a data URL back into bytes and mime type.
pub fn decode_data_url(value: &str) -> Result<(Vec<u8>, String)> {
    let rest = value
        .strip_prefix("data:")
        .ok_or_else(|| anyhow!("image payload is not a data URL"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| anyhow!("image data URL has no payload"))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| anyhow!("image data URL is not base64 encoded"))?;
    if mime.is_empty() {
        return Err(anyhow!("image data URL has no mime type"));
    }
    let bytes = BASE64
        .decode(payload.trim())
        .with_context(|| "failed to decode image data URL payload")?;
    Ok((bytes, mime.to_string()))
}

fn extension_mime(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    let mime = match ext.as_str() {
        "png" => PNG_MIME,
        "jpg" | "jpeg" => JPEG_MIME,
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => return None,
    };
    Some(mime.to_string())
}
