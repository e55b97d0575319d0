use std::path::Path;

use anyhow::{Context, Result, anyhow};

pub mod compose;
pub mod data;
pub mod language;
pub mod logging;
pub mod server;
pub mod settings;
pub mod store;
pub mod submit;

pub use compose::{CaptionStyle, SourceImage};
pub use language::Language;

/// Font size slider range from the upload form.
pub const MIN_FONT_SIZE_PX: f32 = 20.0;
pub const MAX_FONT_SIZE_PX: f32 = 100.0;

#[derive(Debug, Clone)]
pub struct Config {
    pub text: Option<String>,
    pub language: String,
    pub category: Option<String>,
    pub data: Option<String>,
    pub output: Option<String>,
    pub output_mime: String,
    pub font_size: f32,
    pub color: Option<String>,
    pub position: f32,
    pub no_shadow: bool,
    pub post: Option<String>,
    pub settings_path: Option<String>,
}

pub async fn run(config: Config, input: Option<String>) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;

    let language: Language = config.language.parse()?;
    let text = config
        .text
        .clone()
        .or(input)
        .map(|value| value.trim().to_string())
        .unwrap_or_default();

    if config.post.is_some() && text.is_empty() {
        return Err(anyhow!("caption text is empty"));
    }
    if config.data.is_none() {
        if config.output.is_some() {
            return Err(anyhow!("--output requires a source image (--data)"));
        }
        let Some(base_url) = config.post.as_deref() else {
            return Err(anyhow!("nothing to do: pass --data to compose or --post to submit"));
        };
        let id = submit::post_caption(
            base_url,
            &submit::CaptionSubmission {
                text,
                language,
                category: config.category.clone(),
                image: None,
            },
        )
        .await?;
        return Ok(format!("caption posted: {}", id));
    }

    let style = CaptionStyle {
        font_size_px: config.font_size.clamp(MIN_FONT_SIZE_PX, MAX_FONT_SIZE_PX),
        color: config
            .color
            .clone()
            .unwrap_or_else(|| settings.text_color.clone()),
        vertical_position_percent: config.position.clamp(0.0, 100.0),
        shadow: !config.no_shadow,
        language,
    };

    let data_path = config.data.as_deref().map(Path::new).ok_or_else(|| {
        anyhow!("an image is required to compose a caption (pass --data)")
    })?;
    let attachment = data::load_image_attachment(data_path)?;
    let image = SourceImage::new(attachment.bytes, Some(&attachment.mime))?;
    tracing::debug!(
        language = %language,
        width = image.pixel_width(),
        height = image.pixel_height(),
        "composing caption"
    );

    let font = compose::resolve_caption_font(
        settings.font_path.as_deref().map(Path::new),
        settings.family_for(language),
    )
    .with_context(|| "failed to resolve a caption font")?;

    let bytes = compose::compose(
        &image,
        &text,
        &style,
        Some(&font),
        &config.output_mime,
        settings.jpeg_quality,
    )?;

    let mut summary = Vec::new();
    if let Some(output) = config.output.as_deref() {
        std::fs::write(output, &bytes)
            .with_context(|| format!("failed to write composed image: {}", output))?;
        summary.push(format!("composed image written to {}", output));
    }

    if let Some(base_url) = config.post.as_deref() {
        let image_url = data::encode_data_url(&bytes, &config.output_mime);
        let id = submit::post_caption(
            base_url,
            &submit::CaptionSubmission {
                text,
                language,
                category: config.category.clone(),
                image: Some(image_url),
            },
        )
        .await?;
        summary.push(format!("caption posted: {}", id));
    }

    if summary.is_empty() {
        return Err(anyhow!("nothing to do: pass --output or --post"));
    }
    Ok(summary.join("\n"))
}
