//! Generation request model.
//!
//! A [`GenerationRequest`] is built fresh for every user action and never
//! mutated afterwards. Its JSON body is serialized exactly once; those bytes
//! are hashed, signed, and sent.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use volcimg_core::{VolcError, VolcResult};

/// Smallest accepted width or height.
pub const MIN_DIMENSION: u32 = 512;

/// Largest accepted width or height.
pub const MAX_DIMENSION: u32 = 2048;

/// Both dimensions must be multiples of this step.
pub const DIMENSION_STEP: u32 = 8;

/// `seed` value asking the backend for a random seed.
pub const RANDOM_SEED: i64 = -1;

/// Default prompt adherence (`scale`).
pub const DEFAULT_SCALE: f64 = 2.5;

/// Clamp a dimension to `[512, 2048]`, then floor it to a multiple of 8.
///
/// Clamping happens first so the result always stays within range.
///
/// # Examples
///
/// ```
/// use volcimg_model::request::clamp_dimension;
///
/// assert_eq!(clamp_dimension(3000), 2048);
/// assert_eq!(clamp_dimension(513), 512);
/// assert_eq!(clamp_dimension(100), 512);
/// ```
#[must_use]
pub fn clamp_dimension(value: u32) -> u32 {
    let clamped = value.clamp(MIN_DIMENSION, MAX_DIMENSION);
    (clamped / DIMENSION_STEP) * DIMENSION_STEP
}

/// A width/height pair that already satisfies the backend's constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    width: u32,
    height: u32,
}

impl Dimensions {
    /// Build dimensions from user input, clamping both sides.
    #[must_use]
    pub fn clamped(width: u32, height: u32) -> Self {
        Self {
            width: clamp_dimension(width),
            height: clamp_dimension(height),
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        AspectRatio::default().dimensions()
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Aspect-ratio presets with the sizes the model is tuned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AspectRatio {
    /// 1:1, 1328x1328.
    #[default]
    Square,
    /// 4:3, 1472x1104.
    Landscape4x3,
    /// 3:4, 1104x1472.
    Portrait3x4,
    /// 3:2, 1584x1056.
    Landscape3x2,
    /// 2:3, 1056x1584.
    Portrait2x3,
    /// 16:9, 1664x936.
    Widescreen16x9,
    /// 9:16, 936x1664.
    Portrait9x16,
    /// 21:9, 2016x864.
    Ultrawide21x9,
}

impl AspectRatio {
    /// Every preset, in display order.
    pub const ALL: [Self; 8] = [
        Self::Square,
        Self::Landscape4x3,
        Self::Portrait3x4,
        Self::Landscape3x2,
        Self::Portrait2x3,
        Self::Widescreen16x9,
        Self::Portrait9x16,
        Self::Ultrawide21x9,
    ];

    /// Ratio label such as `16:9`.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Landscape4x3 => "4:3",
            Self::Portrait3x4 => "3:4",
            Self::Landscape3x2 => "3:2",
            Self::Portrait2x3 => "2:3",
            Self::Widescreen16x9 => "16:9",
            Self::Portrait9x16 => "9:16",
            Self::Ultrawide21x9 => "21:9",
        }
    }

    /// Preset size, passed through the usual clamp.
    #[must_use]
    pub fn dimensions(self) -> Dimensions {
        let (width, height) = match self {
            Self::Square => (1328, 1328),
            Self::Landscape4x3 => (1472, 1104),
            Self::Portrait3x4 => (1104, 1472),
            Self::Landscape3x2 => (1584, 1056),
            Self::Portrait2x3 => (1056, 1584),
            Self::Widescreen16x9 => (1664, 936),
            Self::Portrait9x16 => (936, 1664),
            Self::Ultrawide21x9 => (2016, 864),
        };
        Dimensions::clamped(width, height)
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AspectRatio {
    type Err = VolcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|ratio| ratio.label() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|r| r.label()).collect();
                VolcError::Validation(format!(
                    "unknown aspect ratio {wanted:?} (expected one of {})",
                    known.join(", ")
                ))
            })
    }
}

/// One generation action: prompt, size, and model parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    prompt: String,
    dimensions: Dimensions,
    aspect_ratio: Option<AspectRatio>,
    req_key: String,
    seed: i64,
    scale: f64,
}

impl GenerationRequest {
    /// Build a request, rejecting empty or whitespace-only prompts.
    pub fn new(
        prompt: &str,
        dimensions: Dimensions,
        req_key: impl Into<String>,
    ) -> VolcResult<Self> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(VolcError::Validation("prompt must not be empty".to_owned()));
        }

        Ok(Self {
            prompt: prompt.to_owned(),
            dimensions,
            aspect_ratio: None,
            req_key: req_key.into(),
            seed: RANDOM_SEED,
            scale: DEFAULT_SCALE,
        })
    }

    /// Record which preset produced the dimensions (for logging only).
    #[must_use]
    pub fn with_aspect_ratio(mut self, aspect_ratio: Option<AspectRatio>) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    /// Trimmed prompt text, also used as alt text for most image shapes.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Requested size.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Preset label, or `None` for a custom size.
    #[must_use]
    pub fn aspect_ratio(&self) -> Option<AspectRatio> {
        self.aspect_ratio
    }

    /// Wire body for this request.
    #[must_use]
    pub fn body(&self) -> RequestBody<'_> {
        RequestBody {
            req_key: &self.req_key,
            prompt: &self.prompt,
            seed: self.seed,
            scale: self.scale,
            width: self.dimensions.width,
            height: self.dimensions.height,
        }
    }

    /// Serialize the wire body once; these exact bytes must be signed and sent.
    pub fn to_json_bytes(&self) -> VolcResult<Vec<u8>> {
        serde_json::to_vec(&self.body())
            .map_err(|e| VolcError::Validation(format!("cannot serialize request body: {e}")))
    }
}

/// JSON body of a `CVProcess` call. Field order is the wire order.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RequestBody<'a> {
    /// Model identifier.
    pub req_key: &'a str,
    /// Prompt text.
    pub prompt: &'a str,
    /// Random seed, `-1` for random.
    pub seed: i64,
    /// Prompt adherence.
    pub scale: f64,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}
