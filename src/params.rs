// Parameter collector: the prompt and generation settings edited in the
// form, plus the request built from them when the user triggers a run.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ParamError;

pub const MIN_STEPS: u32 = 20;
pub const MAX_STEPS: u32 = 50;
pub const DEFAULT_STEPS: u32 = 28;

pub const MIN_GUIDANCE: f64 = 1.0;
pub const MAX_GUIDANCE: f64 = 20.0;
pub const GUIDANCE_STEP: f64 = 0.5;
pub const DEFAULT_GUIDANCE: f64 = 3.5;

/// Output aspect presets understood by the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSize {
    #[default]
    #[serde(rename = "landscape_4_3")]
    Landscape4x3,
    #[serde(rename = "landscape_16_9")]
    Landscape16x9,
    #[serde(rename = "portrait_4_3")]
    Portrait4x3,
    #[serde(rename = "portrait_16_9")]
    Portrait16x9,
    Square,
    SquareHd,
}

impl ImageSize {
    /// Every preset, in the order the form lists them.
    pub const ALL: [ImageSize; 6] = [
        ImageSize::Landscape4x3,
        ImageSize::Landscape16x9,
        ImageSize::Portrait4x3,
        ImageSize::Portrait16x9,
        ImageSize::Square,
        ImageSize::SquareHd,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ImageSize::Landscape4x3 => "landscape_4_3",
            ImageSize::Landscape16x9 => "landscape_16_9",
            ImageSize::Portrait4x3 => "portrait_4_3",
            ImageSize::Portrait16x9 => "portrait_16_9",
            ImageSize::Square => "square",
            ImageSize::SquareHd => "square_hd",
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageSize {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ImageSize::ALL
            .into_iter()
            .find(|size| size.as_str() == wanted)
            .ok_or_else(|| ParamError::UnknownImageSize(s.to_string()))
    }
}

/// Clamp a raw step count into `[MIN_STEPS, MAX_STEPS]`.
pub fn clamp_steps(raw: i64) -> u32 {
    raw.clamp(MIN_STEPS as i64, MAX_STEPS as i64) as u32
}

/// Clamp into `[MIN_GUIDANCE, MAX_GUIDANCE]` and snap to the 0.5 grid.
/// Non-finite input falls back to the default.
pub fn clamp_guidance(raw: f64) -> f64 {
    if !raw.is_finite() {
        return DEFAULT_GUIDANCE;
    }
    let clamped = raw.clamp(MIN_GUIDANCE, MAX_GUIDANCE);
    (clamped / GUIDANCE_STEP).round() * GUIDANCE_STEP
}

/// Current values of the form. Setters enforce each field's range, so the
/// getters always return values that are valid to send.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterCollector {
    prompt: String,
    image_size: ImageSize,
    num_steps: u32,
    guidance_scale: f64,
}

impl Default for ParameterCollector {
    fn default() -> Self {
        ParameterCollector {
            prompt: String::new(),
            image_size: ImageSize::default(),
            num_steps: DEFAULT_STEPS,
            guidance_scale: DEFAULT_GUIDANCE,
        }
    }
}

impl ParameterCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn image_size(&self) -> ImageSize {
        self.image_size
    }

    pub fn num_steps(&self) -> u32 {
        self.num_steps
    }

    pub fn guidance_scale(&self) -> f64 {
        self.guidance_scale
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn set_image_size(&mut self, size: ImageSize) {
        self.image_size = size;
    }

    pub fn set_num_steps(&mut self, raw: i64) {
        self.num_steps = clamp_steps(raw);
    }

    pub fn set_guidance_scale(&mut self, raw: f64) {
        self.guidance_scale = clamp_guidance(raw);
    }

    /// True when the prompt has something other than whitespace in it.
    pub fn has_prompt(&self) -> bool {
        !self.prompt.trim().is_empty()
    }

    /// Snapshot the current values into a fresh request.
    pub fn to_request(&self) -> GenerationRequest {
        GenerationRequest {
            prompt: self.prompt.clone(),
            image_size: self.image_size,
            num_steps: self.num_steps,
            guidance_scale: self.guidance_scale,
        }
    }
}

/// One generation attempt's parameters. The remaining wire fields are fixed.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub image_size: ImageSize,
    pub num_steps: u32,
    pub guidance_scale: f64,
}

impl GenerationRequest {
    pub const NUM_IMAGES: u32 = 1;
    pub const ENABLE_SAFETY_CHECKER: bool = false;
    pub const OUTPUT_FORMAT: &'static str = "jpeg";

    /// JSON body sent to the endpoint.
    pub fn to_body(&self) -> Value {
        json!({
            "prompt": self.prompt,
            "negative_prompt": "",
            "image_size": self.image_size,
            "num_inference_steps": self.num_steps,
            "guidance_scale": self.guidance_scale,
            "num_images": Self::NUM_IMAGES,
            "enable_safety_checker": Self::ENABLE_SAFETY_CHECKER,
            "output_format": Self::OUTPUT_FORMAT,
        })
    }

    /// Parameters shown next to a rendered image.
    pub fn summary(&self) -> Value {
        json!({
            "image_size": self.image_size,
            "steps": self.num_steps,
            "guidance_scale": self.guidance_scale,
            "prompt": self.prompt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_form() {
        let p = ParameterCollector::default();
        assert_eq!(p.prompt(), "");
        assert_eq!(p.image_size(), ImageSize::Landscape4x3);
        assert_eq!(p.num_steps(), 28);
        assert_eq!(p.guidance_scale(), 3.5);
    }

    #[test]
    fn steps_are_clamped() {
        assert_eq!(clamp_steps(-5), 20);
        assert_eq!(clamp_steps(0), 20);
        assert_eq!(clamp_steps(19), 20);
        assert_eq!(clamp_steps(20), 20);
        assert_eq!(clamp_steps(37), 37);
        assert_eq!(clamp_steps(50), 50);
        assert_eq!(clamp_steps(51), 50);
        assert_eq!(clamp_steps(i64::MAX), 50);
    }

    #[test]
    fn guidance_is_clamped_and_quantized() {
        assert_eq!(clamp_guidance(0.0), 1.0);
        assert_eq!(clamp_guidance(-3.0), 1.0);
        assert_eq!(clamp_guidance(25.0), 20.0);
        assert_eq!(clamp_guidance(3.3), 3.5);
        assert_eq!(clamp_guidance(3.7), 3.5);
        assert_eq!(clamp_guidance(3.8), 4.0);
        assert_eq!(clamp_guidance(7.0), 7.0);
        assert_eq!(clamp_guidance(f64::NAN), DEFAULT_GUIDANCE);
        assert_eq!(clamp_guidance(f64::INFINITY), DEFAULT_GUIDANCE);
    }

    #[test]
    fn setters_apply_ranges_before_request() {
        let mut p = ParameterCollector::new();
        p.set_prompt("a lighthouse");
        p.set_num_steps(500);
        p.set_guidance_scale(0.2);
        let req = p.to_request();
        assert_eq!(req.num_steps, 50);
        assert_eq!(req.guidance_scale, 1.0);
    }

    #[test]
    fn image_size_parses_wire_names() {
        for size in ImageSize::ALL {
            assert_eq!(size.as_str().parse::<ImageSize>().unwrap(), size);
        }
        assert_eq!(" Square_HD ".parse::<ImageSize>().unwrap(), ImageSize::SquareHd);
        assert!(matches!(
            "panorama".parse::<ImageSize>(),
            Err(ParamError::UnknownImageSize(_))
        ));
    }

    #[test]
    fn image_size_serializes_like_as_str() {
        for size in ImageSize::ALL {
            assert_eq!(serde_json::to_value(size).unwrap(), json!(size.as_str()));
        }
    }

    #[test]
    fn body_carries_fixed_fields() {
        let mut p = ParameterCollector::new();
        p.set_prompt("koi pond at dusk");
        p.set_image_size(ImageSize::Portrait16x9);
        let body = p.to_request().to_body();
        assert_eq!(
            body,
            json!({
                "prompt": "koi pond at dusk",
                "negative_prompt": "",
                "image_size": "portrait_16_9",
                "num_inference_steps": 28,
                "guidance_scale": 3.5,
                "num_images": 1,
                "enable_safety_checker": false,
                "output_format": "jpeg",
            })
        );
    }

    #[test]
    fn whitespace_prompt_is_not_a_prompt() {
        let mut p = ParameterCollector::new();
        assert!(!p.has_prompt());
        p.set_prompt("  \n ");
        assert!(!p.has_prompt());
        p.set_prompt("x");
        assert!(p.has_prompt());
    }
}
