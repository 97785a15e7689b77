// Command-line flags. Any flag given seeds the form; `--prompt` switches to
// a single run without the menu.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueHint};

use crate::config::AppConfig;
use crate::params::{ImageSize, ParameterCollector};

/// Generate images with a hosted fal model from the terminal.
///
/// Without `--prompt` an interactive form opens; with it, one image is
/// generated and the program exits.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "falgen", version)]
pub struct Cli {
    /// Prompt to generate from (runs once and exits).
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Aspect preset: landscape_4_3, landscape_16_9, portrait_4_3,
    /// portrait_16_9, square or square_hd.
    #[arg(long, value_name = "PRESET")]
    pub image_size: Option<ImageSize>,

    /// Inference steps (clamped to 20..=50).
    #[arg(long, allow_negative_numbers = true)]
    pub steps: Option<i64>,

    /// Guidance scale (clamped to 1.0..=20.0, 0.5 increments).
    #[arg(long, allow_negative_numbers = true)]
    pub guidance_scale: Option<f64>,

    /// Model identifier on the queue (overrides FAL_MODEL).
    #[arg(long)]
    pub model: Option<String>,

    /// Queue base URL (overrides FAL_QUEUE_URL).
    #[arg(long, value_hint = ValueHint::Url)]
    pub queue_url: Option<String>,

    /// Write the generated image to this file or directory.
    #[arg(long, value_hint = ValueHint::AnyPath)]
    pub save: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn apply_to_config(&self, mut config: AppConfig) -> AppConfig {
        if let Some(model) = &self.model {
            config = config.with_model(model.clone());
        }
        if let Some(url) = &self.queue_url {
            config = config.with_queue_url(url.clone());
        }
        config
    }

    /// Form values seeded from flags; unspecified fields keep defaults.
    pub fn initial_params(&self) -> ParameterCollector {
        let mut params = ParameterCollector::new();
        if let Some(prompt) = &self.prompt {
            params.set_prompt(prompt.clone());
        }
        if let Some(size) = self.image_size {
            params.set_image_size(size);
        }
        if let Some(steps) = self.steps {
            params.set_num_steps(steps);
        }
        if let Some(scale) = self.guidance_scale {
            params.set_guidance_scale(scale);
        }
        params
    }

    pub fn is_one_shot(&self) -> bool {
        self.prompt.is_some()
    }
}
