//! Per-image rendering with the JPEG-then-PNG decode fallback.
//!
//! Base64 payloads do not declare their format. Each one is tried as JPEG,
//! then the identical bytes as PNG; if both fail the entry is broken, shows
//! [`PLACEHOLDER_GLYPH`] and cannot be downloaded. A broken entry never
//! affects its siblings.

use std::borrow::Cow;
use std::fmt;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use tracing::{debug, warn};
use volcimg_core::VolcError;
use volcimg_model::{ImageDescriptor, ImageEncoding};

/// Red error glyph shown in place of an image that could not be decoded.
pub const PLACEHOLDER_GLYPH: &str = "data:image/svg+xml;utf8,<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"24\" height=\"24\" viewBox=\"0 0 24 24\"><path fill=\"%23f44336\" d=\"M12 2C6.48 2 2 6.48 2 12s4.48 10 10 10 10-4.48 10-10S17.52 2 12 2zm1 15h-2v-2h2v2zm0-4h-2V7h2v6z\"/></svg>";

/// Standard-alphabet decoder that accepts payloads with or without `=` padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode a base64 payload the way browsers decode `data:` URIs: ASCII
/// whitespace anywhere is ignored and padding is optional.
fn decode_payload(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    LENIENT_BASE64.decode(compact)
}

/// Formats a base64 payload is tried as, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeFormat {
    /// `image/jpeg`.
    Jpeg,
    /// `image/png`.
    Png,
}

impl DecodeFormat {
    /// MIME type used in data URIs.
    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
        }
    }
}

impl fmt::Display for DecodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        })
    }
}

/// How a rendered entry ended up displayable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolvedAs {
    /// Local bytes decoded in this format.
    Decoded(DecodeFormat),
    /// A URL, left for the consumer to fetch.
    Remote,
}

/// Decode progress of one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DecodeState {
    /// Nothing tried yet.
    #[default]
    Unresolved,
    /// Trying JPEG.
    JpegAttempted,
    /// JPEG failed, trying PNG.
    PngAttempted,
    /// Displayable.
    Resolved(ResolvedAs),
    /// Both attempts failed.
    Broken,
}

impl DecodeState {
    /// Start decoding: `Unresolved` moves to the JPEG attempt.
    #[must_use]
    pub fn begin(self) -> Self {
        match self {
            Self::Unresolved => Self::JpegAttempted,
            other => other,
        }
    }

    /// Format the current attempt is for, or `None` outside an attempt.
    #[must_use]
    pub fn pending_format(self) -> Option<DecodeFormat> {
        match self {
            Self::JpegAttempted => Some(DecodeFormat::Jpeg),
            Self::PngAttempted => Some(DecodeFormat::Png),
            _ => None,
        }
    }

    /// Record the result of the current attempt.
    ///
    /// Terminal states are left unchanged.
    #[must_use]
    pub fn advance(self, succeeded: bool) -> Self {
        match (self, succeeded) {
            (Self::Unresolved, _) => self.begin(),
            (Self::JpegAttempted, true) => Self::Resolved(ResolvedAs::Decoded(DecodeFormat::Jpeg)),
            (Self::JpegAttempted, false) => Self::PngAttempted,
            (Self::PngAttempted, true) => Self::Resolved(ResolvedAs::Decoded(DecodeFormat::Png)),
            (Self::PngAttempted, false) => Self::Broken,
            (Self::Resolved(_) | Self::Broken, _) => self,
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved(_) | Self::Broken)
    }
}

/// Interprets raw bytes as one specific image format.
pub trait ImageDecoder: Send + Sync {
    /// Decode `bytes` as `format`, returning the pixel size.
    fn decode(&self, bytes: &[u8], format: DecodeFormat) -> Result<(u32, u32), String>;
}

/// [`ImageDecoder`] backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, bytes: &[u8], format: DecodeFormat) -> Result<(u32, u32), String> {
        image::load_from_memory_with_format(bytes, format.image_format())
            .map(|img| (img.width(), img.height()))
            .map_err(|e| e.to_string())
    }
}

/// One gallery entry after decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    index: usize,
    descriptor: ImageDescriptor,
    state: DecodeState,
    bytes: Option<Vec<u8>>,
    size: Option<(u32, u32)>,
    error: Option<String>,
}

impl RenderedImage {
    /// Position in the batch.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Descriptor this entry was rendered from.
    #[must_use]
    pub fn descriptor(&self) -> &ImageDescriptor {
        &self.descriptor
    }

    /// Final decode state.
    #[must_use]
    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Whether both decode attempts failed.
    #[must_use]
    pub fn is_broken(&self) -> bool {
        self.state == DecodeState::Broken
    }

    /// Broken entries cannot be downloaded.
    #[must_use]
    pub fn download_enabled(&self) -> bool {
        matches!(self.state, DecodeState::Resolved(_))
    }

    /// What to display: a data URI, the remote URL, or the placeholder glyph.
    #[must_use]
    pub fn display_source(&self) -> Cow<'_, str> {
        match self.state {
            DecodeState::Resolved(ResolvedAs::Decoded(format)) => Cow::Owned(format!(
                "data:{};base64,{}",
                format.mime_type(),
                self.descriptor.payload()
            )),
            DecodeState::Resolved(ResolvedAs::Remote) => Cow::Borrowed(self.descriptor.payload()),
            _ => Cow::Borrowed(PLACEHOLDER_GLYPH),
        }
    }

    /// Alternative text; broken entries say so.
    #[must_use]
    pub fn display_alt(&self) -> Cow<'_, str> {
        if self.is_broken() {
            Cow::Owned(format!("{} (failed to load)", self.descriptor.alt_text()))
        } else {
            Cow::Borrowed(self.descriptor.alt_text())
        }
    }

    /// File extension for saving, or `None` when download is disabled.
    #[must_use]
    pub fn file_extension(&self) -> Option<&'static str> {
        match self.state {
            DecodeState::Resolved(ResolvedAs::Decoded(DecodeFormat::Png)) => Some("png"),
            DecodeState::Resolved(_) => Some("jpg"),
            _ => None,
        }
    }

    /// Decoded bytes for base64 entries that resolved.
    #[must_use]
    pub fn bytes(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }

    /// Pixel size, when decoded locally.
    #[must_use]
    pub fn size(&self) -> Option<(u32, u32)> {
        self.size
    }

    /// The decode failure for a broken entry.
    #[must_use]
    pub fn decode_error(&self) -> Option<VolcError> {
        if !self.is_broken() {
            return None;
        }
        Some(VolcError::Decode {
            index: self.index,
            message: self.error.clone().unwrap_or_default(),
        })
    }
}

/// Resolve one descriptor into a displayable entry.
pub fn render(index: usize, descriptor: ImageDescriptor, decoder: &dyn ImageDecoder) -> RenderedImage {
    if descriptor.encoding() == ImageEncoding::Url {
        return RenderedImage {
            index,
            descriptor,
            state: DecodeState::Resolved(ResolvedAs::Remote),
            bytes: None,
            size: None,
            error: None,
        };
    }

    let raw = decode_payload(descriptor.payload());
    let mut state = DecodeState::Unresolved.begin();
    let mut size = None;
    let mut error = None;

    while let Some(format) = state.pending_format() {
        let attempt = match &raw {
            Ok(bytes) => decoder.decode(bytes, format),
            Err(e) => Err(format!("invalid base64: {e}")),
        };
        match attempt {
            Ok(dimensions) => {
                size = Some(dimensions);
                state = state.advance(true);
            }
            Err(message) => {
                state = state.advance(false);
                if state == DecodeState::PngAttempted {
                    warn!(index, error = %message, "JPEG decode failed, retrying as PNG");
                } else {
                    warn!(index, error = %message, "Image could not be decoded");
                }
                error = Some(message);
            }
        }
    }
    debug!(index, ?state, "Rendered image");

    let bytes = match (state, raw) {
        (DecodeState::Resolved(_), Ok(bytes)) => Some(bytes),
        _ => None,
    };
    RenderedImage {
        index,
        descriptor,
        state,
        bytes,
        size,
        error: if state == DecodeState::Broken { error } else { None },
    }
}

/// Entries of the latest generation run.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    entries: Vec<RenderedImage>,
}

impl Gallery {
    /// Create an empty gallery.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replace the contents with a fresh batch. Earlier results are never merged.
    pub fn show(
        &mut self,
        images: Vec<ImageDescriptor>,
        decoder: &dyn ImageDecoder,
    ) -> &[RenderedImage] {
        self.clear();
        self.entries = images
            .into_iter()
            .enumerate()
            .map(|(index, descriptor)| render(index, descriptor, decoder))
            .collect();
        &self.entries
    }

    /// Current entries.
    #[must_use]
    pub fn entries(&self) -> &[RenderedImage] {
        &self.entries
    }

    /// Number of broken entries.
    #[must_use]
    pub fn broken_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_broken()).count()
    }

    /// Whether the gallery is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
