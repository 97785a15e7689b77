// UI layer: the interactive form, built with `dialoguer` menus like a small
// settings screen, plus the one-shot flow used when a prompt is passed on
// the command line. All generation logic goes through `Session`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use crossterm::style::Stylize;
use dialoguer::{Input, Password, Select};

use crate::api::{GenerationClient, ImageFetcher, QueueTransport};
use crate::params::{ImageSize, GUIDANCE_STEP, MAX_GUIDANCE, MAX_STEPS, MIN_GUIDANCE, MIN_STEPS};
use crate::render::{RenderedOutput, NO_IMAGE_MESSAGE};
use crate::session::{Session, SkipReason, TriggerOutcome};

const MISSING_KEY_WARNING: &str = "⚠️ Please enter your FAL API key to generate images";
const TIPS: &str = "\
Tips for better results:
  - Be specific about style and details
  - Mention lighting and atmosphere
  - Include artistic references
  - Specify camera angles/shots";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuItem {
    SetKey,
    ClearKey,
    Prompt,
    ImageSize,
    Steps,
    Guidance,
    Generate,
    Download,
    Tips,
    Exit,
}

fn menu_items(session: &Session) -> Vec<(MenuItem, String)> {
    let params = session.params();
    let prompt = if params.has_prompt() {
        truncate(params.prompt(), 48)
    } else {
        "(empty)".to_string()
    };
    let generate = if session.trigger_enabled() {
        "🎨 Generate Image".to_string()
    } else {
        "🎨 Generate Image (disabled: no API key)".to_string()
    };

    let mut items = vec![
        (MenuItem::SetKey, "Enter your FAL API Key".to_string()),
        (MenuItem::ClearKey, "Clear API Key".to_string()),
        (MenuItem::Prompt, format!("Prompt: {prompt}")),
        (MenuItem::ImageSize, format!("Image Size: {}", params.image_size())),
        (MenuItem::Steps, format!("Number of Steps: {}", params.num_steps())),
        (MenuItem::Guidance, format!("Guidance Scale: {}", params.guidance_scale())),
        (MenuItem::Generate, generate),
    ];
    if session.last_output().is_some() {
        items.push((MenuItem::Download, "Download last image".to_string()));
    }
    items.push((MenuItem::Tips, "Tips".to_string()));
    items.push((MenuItem::Exit, "Exit".to_string()));
    items
}

fn truncate(text: &str, max: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= max {
        return single_line;
    }
    let cut: String = single_line.chars().take(max).collect();
    format!("{cut}…")
}

/// Main interactive loop. Runs until the user picks "Exit".
pub fn main_menu<T, F>(mut session: Session, client: &GenerationClient<T>, fetcher: &F) -> Result<()>
where
    T: QueueTransport,
    F: ImageFetcher,
{
    println!("{}", "🎨 AI Image Generator".bold());
    println!("Generate images using {}", client.model());
    println!("Get your API key at https://fal.ai\n");

    loop {
        if !session.trigger_enabled() {
            println!("{}", MISSING_KEY_WARNING.yellow());
        }
        let items = menu_items(&session);
        let labels: Vec<&str> = items.iter().map(|(_, label)| label.as_str()).collect();
        let selection = Select::new().items(&labels).default(0).interact()?;

        match items[selection].0 {
            MenuItem::SetKey => {
                let key: String = Password::new()
                    .with_prompt("FAL API Key")
                    .allow_empty_password(true)
                    .interact()?;
                if session.set_credential(&key) {
                    println!("{}", "API Key set! ✅".green());
                }
            }
            MenuItem::ClearKey => {
                session.clear_credential();
                println!("API Key cleared.");
            }
            MenuItem::Prompt => {
                let prompt: String = Input::new()
                    .with_prompt("Enter your prompt")
                    .with_initial_text(session.params().prompt())
                    .allow_empty(true)
                    .interact_text()?;
                session.params_mut().set_prompt(prompt);
            }
            MenuItem::ImageSize => {
                let names: Vec<&str> = ImageSize::ALL.iter().map(|s| s.as_str()).collect();
                let current = ImageSize::ALL
                    .iter()
                    .position(|s| *s == session.params().image_size())
                    .unwrap_or(0);
                let idx = Select::new()
                    .with_prompt("Image Size")
                    .items(&names)
                    .default(current)
                    .interact()?;
                session.params_mut().set_image_size(ImageSize::ALL[idx]);
            }
            MenuItem::Steps => {
                let steps: i64 = Input::new()
                    .with_prompt(format!(
                        "Number of Steps ({MIN_STEPS}-{MAX_STEPS}, more steps = better quality but slower)"
                    ))
                    .default(session.params().num_steps() as i64)
                    .interact_text()?;
                session.params_mut().set_num_steps(steps);
            }
            MenuItem::Guidance => {
                let scale: f64 = Input::new()
                    .with_prompt(format!(
                        "Guidance Scale ({MIN_GUIDANCE}-{MAX_GUIDANCE}, step {GUIDANCE_STEP}, how closely to follow the prompt)"
                    ))
                    .default(session.params().guidance_scale())
                    .interact_text()?;
                session.params_mut().set_guidance_scale(scale);
            }
            MenuItem::Generate => {
                let outcome = session.trigger(client, fetcher);
                print_outcome(&session, &outcome);
            }
            MenuItem::Download => {
                if let Some(output) = session.last_output() {
                    download_with_dialog(output);
                }
            }
            MenuItem::Tips => println!("{TIPS}\n"),
            MenuItem::Exit => break,
        }
    }
    Ok(())
}

/// Generate once with the flag-seeded session; errors if nothing was shown.
pub fn run_once<T, F>(
    mut session: Session,
    client: &GenerationClient<T>,
    fetcher: &F,
    save: Option<&Path>,
) -> Result<()>
where
    T: QueueTransport,
    F: ImageFetcher,
{
    let outcome = session.trigger(client, fetcher);
    print_outcome(&session, &outcome);
    match outcome {
        TriggerOutcome::Rendered => {
            if let (Some(path), Some(output)) = (save, session.last_output()) {
                let saved = output.save_to(path)?;
                println!("Saved to {}", saved.display());
            }
            Ok(())
        }
        TriggerOutcome::Skipped(SkipReason::MissingCredential) => {
            bail!("no API key: set FAL_KEY or enter one in the interactive form")
        }
        TriggerOutcome::Skipped(SkipReason::EmptyPrompt) => bail!("prompt is empty"),
        TriggerOutcome::NoImage => bail!("no image was generated"),
        TriggerOutcome::DisplayFailed(e) => bail!("could not display image: {e}"),
        TriggerOutcome::Failed(_) => bail!("generation failed"),
    }
}

fn print_outcome(session: &Session, outcome: &TriggerOutcome) {
    match outcome {
        TriggerOutcome::Skipped(SkipReason::MissingCredential) => {
            println!("{}", MISSING_KEY_WARNING.yellow());
        }
        TriggerOutcome::Skipped(SkipReason::EmptyPrompt) => {
            println!("{}", "Enter a prompt first.".yellow());
        }
        TriggerOutcome::Rendered => {
            if let Some(output) = session.last_output() {
                print_rendered(output);
            }
        }
        TriggerOutcome::NoImage => println!("{}", NO_IMAGE_MESSAGE.red()),
        TriggerOutcome::DisplayFailed(e) => {
            println!("{}", format!("Could not display image: {e}").red());
        }
        TriggerOutcome::Failed(report) => {
            for line in report.lines() {
                println!("{}", line.red());
            }
        }
    }
}

fn print_rendered(output: &RenderedOutput) {
    let format = output
        .format
        .map(|f| format!("{f:?}").to_uppercase())
        .unwrap_or_else(|| "image".to_string());
    println!("🖼  {}x{} {format} ({} bytes)", output.width, output.height, output.bytes.len());
    println!("Download Image: {}", output.download_url().underlined());
    println!("Generation Details:\n{}\n", output.parameters_pretty());
}

fn download_with_dialog(output: &RenderedOutput) {
    let start_dir = dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    let picked = rfd::FileDialog::new()
        .set_directory(&start_dir)
        .set_file_name(&output.suggested_file_name())
        .save_file();
    let Some(path) = picked else {
        return;
    };
    match output.save_to(&path) {
        Ok(saved) => println!("Saved to {}", saved.display()),
        Err(e) => println!("{}", format!("Save failed: {e}").red()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::CredentialHolder;
    use crate::params::ParameterCollector;

    #[test]
    fn truncate_flattens_and_shortens() {
        assert_eq!(truncate("a  b\nc", 10), "a b c");
        assert_eq!(truncate("abcdefghij", 4), "abcd…");
    }

    #[test]
    fn generate_entry_shows_disabled_without_key() {
        let session = Session::new(CredentialHolder::default(), ParameterCollector::new());
        let items = menu_items(&session);
        let (_, label) = items.iter().find(|(i, _)| *i == MenuItem::Generate).unwrap();
        assert!(label.contains("disabled"));
        assert!(!items.iter().any(|(i, _)| *i == MenuItem::Download));

        let session = Session::new(
            CredentialHolder::from_env_value(Some("k".into())),
            ParameterCollector::new(),
        );
        let items = menu_items(&session);
        let (_, label) = items.iter().find(|(i, _)| *i == MenuItem::Generate).unwrap();
        assert!(!label.contains("disabled"));
    }
}
