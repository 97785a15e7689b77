// Session context: everything the form mutates lives here, owned by one
// value instead of globals. The credential holder owns the key, the
// progress reporter owns the status line, and `trigger` drives one
// generation through Idle -> InFlight -> {Rendered | NoImage | Errored}.

use tracing::{info, warn};

use crate::api::{GenerationClient, ImageFetcher, QueueTransport};
use crate::credential::CredentialHolder;
use crate::error::FetchError;
use crate::params::ParameterCollector;
use crate::progress::{ProgressReporter, STATUS_COMPLETE, STATUS_STARTING};
use crate::render::{self, RenderOutcome, RenderedOutput};
use crate::report::{self, ErrorReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    InFlight,
    Rendered,
    NoImage,
    Errored,
}

/// Why a trigger did not start a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingCredential,
    EmptyPrompt,
}

#[derive(Debug)]
pub enum TriggerOutcome {
    Skipped(SkipReason),
    Rendered,
    NoImage,
    /// Generation succeeded but the image could not be fetched or decoded.
    DisplayFailed(FetchError),
    Failed(ErrorReport),
}

#[derive(Debug)]
pub struct Session {
    credential: CredentialHolder,
    params: ParameterCollector,
    reporter: ProgressReporter,
    phase: Phase,
    last_output: Option<RenderedOutput>,
    show_spinner: bool,
}

impl Session {
    pub fn new(credential: CredentialHolder, params: ParameterCollector) -> Self {
        Session {
            credential,
            params,
            reporter: ProgressReporter::new(),
            phase: Phase::Idle,
            last_output: None,
            show_spinner: false,
        }
    }

    /// Mirror the status line onto a terminal spinner while in flight.
    pub fn with_spinner(mut self, enabled: bool) -> Self {
        self.show_spinner = enabled;
        self
    }

    pub fn credential(&self) -> &CredentialHolder {
        &self.credential
    }

    pub fn params(&self) -> &ParameterCollector {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ParameterCollector {
        &mut self.params
    }

    pub fn status(&self) -> &str {
        self.reporter.status()
    }

    pub fn last_output(&self) -> Option<&RenderedOutput> {
        self.last_output.as_ref()
    }

    /// Current phase. Reads as `Idle` whenever the trigger is unavailable.
    pub fn phase(&self) -> Phase {
        if self.can_trigger() {
            self.phase
        } else {
            Phase::Idle
        }
    }

    pub fn set_credential(&mut self, value: &str) -> bool {
        self.credential.set(value)
    }

    pub fn clear_credential(&mut self) {
        self.credential.clear();
    }

    /// Whether the generate control is enabled (a key is present).
    pub fn trigger_enabled(&self) -> bool {
        self.credential.is_set()
    }

    /// Whether a trigger would actually issue a request.
    pub fn can_trigger(&self) -> bool {
        self.trigger_enabled() && self.params.has_prompt()
    }

    /// Run one generation with the current form values. Borrowing `self`
    /// mutably keeps a second trigger from starting while this one runs.
    pub fn trigger<T, F>(&mut self, client: &GenerationClient<T>, fetcher: &F) -> TriggerOutcome
    where
        T: QueueTransport,
        F: ImageFetcher + ?Sized,
    {
        if !self.credential.is_set() {
            return TriggerOutcome::Skipped(SkipReason::MissingCredential);
        }
        if !self.params.has_prompt() {
            return TriggerOutcome::Skipped(SkipReason::EmptyPrompt);
        }

        let request = self.params.to_request();
        self.phase = Phase::InFlight;
        self.reporter.set_status(STATUS_STARTING);
        if self.show_spinner {
            self.reporter.start_spinner();
        }
        info!(
            image_size = %request.image_size,
            steps = request.num_steps,
            guidance_scale = request.guidance_scale,
            "starting generation"
        );

        let reporter = &mut self.reporter;
        let generated = client.generate(&request, self.credential.get(), &mut |event| {
            reporter.on_progress(event)
        });

        let result = match generated {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "generation failed");
                self.reporter.finish_spinner();
                self.last_output = None;
                self.phase = Phase::Errored;
                return TriggerOutcome::Failed(report::report(&e));
            }
        };

        self.reporter.set_status(STATUS_COMPLETE);
        self.reporter.finish_spinner();

        match render::render(&result, &request, fetcher) {
            RenderOutcome::Rendered(output) => {
                self.last_output = Some(output);
                self.phase = Phase::Rendered;
                TriggerOutcome::Rendered
            }
            RenderOutcome::NoImage => {
                self.last_output = None;
                self.phase = Phase::NoImage;
                TriggerOutcome::NoImage
            }
            RenderOutcome::DisplayFailed(e) => {
                self.last_output = None;
                self.phase = Phase::Errored;
                TriggerOutcome::DisplayFailed(e)
            }
        }
    }
}
