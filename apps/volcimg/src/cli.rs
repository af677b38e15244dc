//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use volcimg_core::VolcError;
use volcimg_model::{AspectRatio, Dimensions};

/// Generate images from a text prompt.
#[derive(Debug, Parser)]
#[command(name = "volcimg", version, about = "Generate images with the Volcengine visual API")]
pub struct Cli {
    /// Text prompt describing the image.
    pub prompt: String,

    /// Aspect-ratio preset: 1:1, 4:3, 3:4, 3:2, 2:3, 16:9, 9:16 or 21:9.
    #[arg(long, value_parser = parse_ratio)]
    pub ratio: Option<AspectRatio>,

    /// Width in pixels; overrides the preset width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Height in pixels; overrides the preset height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Directory generated images are written to.
    #[arg(long, default_value = ".")]
    pub out: PathBuf,

    /// Print the gallery without writing any files.
    #[arg(long)]
    pub no_save: bool,
}

impl Cli {
    /// Requested size and the preset it came from.
    ///
    /// An explicit width or height turns the size into a custom one, so the
    /// preset label is dropped. Every value passes through the clamp.
    pub fn size(&self) -> (Dimensions, Option<AspectRatio>) {
        let preset = self.ratio.unwrap_or_default();
        let base = preset.dimensions();
        if self.width.is_none() && self.height.is_none() {
            return (base, Some(preset));
        }
        let dimensions = Dimensions::clamped(
            self.width.unwrap_or(base.width()),
            self.height.unwrap_or(base.height()),
        );
        (dimensions, None)
    }
}

fn parse_ratio(value: &str) -> Result<AspectRatio, String> {
    value.parse().map_err(|e: VolcError| e.to_string())
}
