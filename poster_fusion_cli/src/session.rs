//! One user's poster session and the controller that drives it.
//!
//! Every action follows the same shape: refuse if another action is still in
//! flight, clear the previous error, run, then record either the new state or
//! the error message. State is only touched inside short critical sections;
//! remote calls run with the lock released, so snapshots stay readable while
//! a request is pending and never show half-applied updates.
//!
//! A remote action whose future is dropped before the service answers (a
//! client that disconnects, an aborted task) still clears the loading flag,
//! see `InFlight`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ai::CreativeService;
use crate::posters::{GeneratedPoster, PosterCollection};
use crate::workflow::{StepProgress, Workflow, WorkflowStep};
use crate::{is_image_media_type, AspectRatio, FusionError, ImagePayload, Language};

pub const UPLOAD_MESSAGE: &str = "Uploading and processing image...";
pub const GENERATE_MESSAGE: &str = "Generating your poster...";
pub const UPLOAD_FALLBACK: &str = "An unknown error occurred during image processing.";
pub const GENERATE_FALLBACK: &str = "An unknown error occurred while generating the poster.";

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub workflow: Workflow,
    pub original_image: Option<ImagePayload>,
    pub processed_image: Option<ImagePayload>,
    pub selected_ratio: AspectRatio,
    pub prompt: String,
    pub posters: PosterCollection,
    pub is_loading: bool,
    pub loading_message: String,
    pub error: Option<String>,
}

impl SessionState {
    pub fn current_step(&self) -> WorkflowStep {
        self.workflow.current()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            current_step: self.workflow.current(),
            completed_steps: self.workflow.completed().iter().copied().collect(),
            steps: self.workflow.progress(),
            original_image: self.original_image.clone(),
            processed_image: self.processed_image.clone(),
            selected_ratio: self.selected_ratio,
            prompt: self.prompt.clone(),
            posters: self.posters.as_slice().to_vec(),
            active_poster_id: self.posters.active_id().map(str::to_string),
            active_image: self
                .posters
                .active_image(self.processed_image.as_ref())
                .cloned(),
            is_loading: self.is_loading,
            loading_message: self.loading_message.clone(),
            error: self.error.clone(),
        }
    }
}

/// Serializable view of a session, images as data URIs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub current_step: WorkflowStep,
    pub completed_steps: Vec<WorkflowStep>,
    pub steps: Vec<StepProgress>,
    pub original_image: Option<ImagePayload>,
    pub processed_image: Option<ImagePayload>,
    pub selected_ratio: AspectRatio,
    pub prompt: String,
    pub posters: Vec<GeneratedPoster>,
    pub active_poster_id: Option<String>,
    pub active_image: Option<ImagePayload>,
    pub is_loading: bool,
    pub loading_message: String,
    pub error: Option<String>,
}

pub struct SessionController {
    service: Arc<dyn CreativeService>,
    state: Mutex<SessionState>,
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a remote action as running. Dropping it without calling
/// [`InFlight::finish`] clears `is_loading` and leaves everything else as it
/// was before the action started.
struct InFlight<'a> {
    state: &'a Mutex<SessionState>,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn start(state: &'a Mutex<SessionState>, locked: &mut SessionState, message: String) -> Self {
        locked.error = None;
        locked.is_loading = true;
        locked.loading_message = message;
        Self { state, armed: true }
    }

    /// Clears loading and records the outcome of the remote call.
    fn finish<T>(
        mut self,
        outcome: Result<T, FusionError>,
        fallback: &str,
        apply: impl FnOnce(&mut SessionState, T),
    ) -> Result<(), FusionError> {
        self.armed = false;
        let mut state = lock(self.state);
        state.is_loading = false;
        state.loading_message.clear();
        match outcome {
            Ok(value) => {
                apply(&mut *state, value);
                Ok(())
            }
            Err(e) => {
                state.error = Some(e.user_message(fallback));
                Err(e)
            }
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = lock(self.state);
            state.is_loading = false;
            state.loading_message.clear();
            warn!("remote action abandoned before it finished");
        }
    }
}

impl SessionController {
    pub fn new(service: Arc<dyn CreativeService>) -> Self {
        Self {
            service,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        lock(&self.state).snapshot()
    }

    /// Runs `f` against the current state without changing it.
    pub async fn inspect<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        f(&*lock(&self.state))
    }

    /// Local action: applied in one critical section, no remote call.
    async fn local<R>(
        &self,
        f: impl FnOnce(&mut SessionState) -> Result<R, FusionError>,
    ) -> Result<R, FusionError> {
        let mut state = lock(&self.state);
        if state.is_loading {
            return Err(FusionError::Busy);
        }
        state.error = None;
        let result = f(&mut *state);
        if let Err(e) = &result {
            state.error = Some(e.to_string());
        }
        result
    }

    pub async fn upload(&self, bytes: Vec<u8>, media_type: &str) -> Result<(), FusionError> {
        let in_flight = {
            let mut state = lock(&self.state);
            if state.is_loading {
                return Err(FusionError::Busy);
            }
            if !is_image_media_type(media_type) {
                warn!(media_type, "rejected non-image upload");
                let err = FusionError::InvalidFileType;
                state.error = Some(err.to_string());
                return Err(err);
            }
            InFlight::start(&self.state, &mut state, UPLOAD_MESSAGE.to_string())
        };
        let image = ImagePayload::new(media_type, bytes);

        info!(media_type, size = image.len(), "removing background");
        let outcome = self.service.remove_background(image).await;
        if let Err(e) = &outcome {
            warn!(error = %e, "background removal failed");
        }

        in_flight.finish(outcome, UPLOAD_FALLBACK, |state, processed| {
            state.original_image = Some(processed.original);
            state.processed_image = Some(processed.no_bg);
            state.workflow.on_image_processed();
            info!(step = %state.workflow.current(), "product image ready");
        })
    }

    pub async fn select_ratio(&self, value: &str) -> Result<(), FusionError> {
        self.local(|state| {
            let ratio = AspectRatio::find(value)
                .ok_or_else(|| FusionError::UnknownRatio(value.to_string()))?;
            state.selected_ratio = ratio;
            if state.workflow.on_ratio_selected() {
                debug!(ratio = ratio.value, "ratio chosen, moving to concept");
            }
            Ok(())
        })
        .await
    }

    pub async fn set_prompt(&self, prompt: impl Into<String>) -> Result<(), FusionError> {
        let prompt = prompt.into();
        self.local(move |state| {
            state.prompt = prompt;
            Ok(())
        })
        .await
    }

    /// Generates a poster from the cut-out product, the prompt and the
    /// selected ratio. Returns the new poster's id.
    pub async fn generate(&self) -> Result<String, FusionError> {
        let (in_flight, product, prompt, ratio) = {
            let mut state = lock(&self.state);
            if state.is_loading {
                return Err(FusionError::Busy);
            }
            state.error = None;
            let product = match state.processed_image.clone() {
                Some(image) if !state.prompt.is_empty() => image,
                _ => {
                    let err = FusionError::MissingInput;
                    state.error = Some(err.to_string());
                    return Err(err);
                }
            };
            let (prompt, ratio) = (state.prompt.clone(), state.selected_ratio);
            let in_flight = InFlight::start(&self.state, &mut state, GENERATE_MESSAGE.to_string());
            (in_flight, product, prompt, ratio)
        };

        info!(ratio = ratio.value, "generating poster");
        let outcome = self.service.generate_poster(&product, &prompt, &ratio).await;
        if let Err(e) = &outcome {
            warn!(error = %e, "poster generation failed");
        }

        let mut new_id = String::new();
        in_flight.finish(outcome, GENERATE_FALLBACK, |state, poster| {
            new_id = state.posters.push_image(poster);
            state.workflow.on_poster_generated();
            info!(id = %new_id, step = %state.workflow.current(), "poster added");
        })?;
        Ok(new_id)
    }

    /// Replaces the prompt with its translation. Does nothing for an empty
    /// prompt.
    pub async fn translate(&self, language: Language) -> Result<(), FusionError> {
        let (in_flight, text) = {
            let mut state = lock(&self.state);
            if state.is_loading {
                return Err(FusionError::Busy);
            }
            if state.prompt.is_empty() {
                return Ok(());
            }
            let text = state.prompt.clone();
            let message = format!("Translating to {language}...");
            (InFlight::start(&self.state, &mut state, message), text)
        };

        info!(%language, "translating prompt");
        let outcome = self.service.translate(&text, language).await.map_err(|e| {
            warn!(error = %e, "translation failed");
            FusionError::Translation
        });

        in_flight.finish(outcome, "Translation failed.", |state, translated| {
            state.prompt = translated;
        })
    }

    /// Shows a previously generated poster. Unknown ids leave the selection
    /// as it was and return `false`.
    pub async fn select_poster(&self, id: &str) -> Result<bool, FusionError> {
        self.local(|state| Ok(state.posters.set_active(id))).await
    }

    /// The active poster, for saving to disk.
    pub async fn download(&self) -> Result<GeneratedPoster, FusionError> {
        lock(&self.state)
            .posters
            .active()
            .cloned()
            .ok_or(FusionError::NothingToDownload)
    }
}
