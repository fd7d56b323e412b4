//! Upload → process → download flow as an explicit state machine
//!
//! [`FlowController`] owns everything the user is currently working on: the
//! uploaded file and its preview, the processed result, the last error and
//! the drag-over flag. Every change goes through [`FlowController::handle`].
//!
//! Removal is split into two events so the controller never has to be
//! borrowed across an `.await`: `RemoveRequested` hands out a
//! [`RemovalTicket`], and the caller reports back with `RemovalFinished`.
//! Tickets carry the generation they were issued for; a result for any other
//! generation (for example one that lands after a reset) is discarded.

use crate::{
    error::BgRemovalError,
    remote::BackgroundRemover,
    services::SelectedFile,
    tracing_config::events,
    types::{download_file_name, Download, ImageDataUri},
};
use log::{debug, info, warn};
use thiserror::Error;

/// Message shown when the remote removal fails for any reason
pub const REMOVAL_FAILED_MESSAGE: &str = "Failed to remove background. Please try again.";

/// Failures the controller reports directly to the user
///
/// None of these leave the controller in a non-interactive state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// Selected file does not declare an image content type
    #[error("Please upload a valid image file (PNG, JPG, GIF, etc.).")]
    Validation { content_type: String },

    /// Selected file could not be read or encoded
    #[error("Could not load image preview.")]
    Preview { reason: String },

    /// Removal was triggered with nothing uploaded
    #[error("Please upload an image first.")]
    NoImage,

    /// A removal is already in flight
    #[error("Background removal is already in progress.")]
    Busy,

    /// Download requested before a result exists
    #[error("There is no processed image to download yet.")]
    NothingToDownload,

    /// The stored result could not be turned back into bytes
    #[error("Could not prepare the download.")]
    Download { reason: String },
}

/// The image currently loaded into the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub preview: ImageDataUri,
}

/// Coarse phase of the flow, for display and assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Empty,
    Previewing,
    Processing,
    Done,
    Error,
}

/// Controller state; each variant holds exactly what that phase needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    /// Nothing uploaded; may show why the last selection was refused
    Empty { error: Option<FlowError> },
    /// Upload encoded and shown, waiting for the user
    Previewing { upload: Upload },
    /// Removal in flight for the given generation
    Processing { upload: Upload, generation: u64 },
    /// Removal finished with a result; a refused selection is shown beside it
    Done {
        upload: Upload,
        result: ImageDataUri,
        error: Option<FlowError>,
    },
    /// Upload kept, last attempt failed; the user may retry
    Error {
        upload: Upload,
        message: String,
        cause: String,
    },
}

impl Default for FlowState {
    fn default() -> Self {
        Self::Empty { error: None }
    }
}

impl FlowState {
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self {
            Self::Empty { .. } => Phase::Empty,
            Self::Previewing { .. } => Phase::Previewing,
            Self::Processing { .. } => Phase::Processing,
            Self::Done { .. } => Phase::Done,
            Self::Error { .. } => Phase::Error,
        }
    }

    #[must_use]
    pub fn upload(&self) -> Option<&Upload> {
        match self {
            Self::Empty { .. } => None,
            Self::Previewing { upload }
            | Self::Processing { upload, .. }
            | Self::Done { upload, .. }
            | Self::Error { upload, .. } => Some(upload),
        }
    }
}

/// Work the caller must perform after an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEffect {
    /// Nothing to do
    Idle,
    /// Send `ticket.image()` to a [`BackgroundRemover`] and report back
    StartRemoval(RemovalTicket),
    /// A removal result arrived for a superseded request and was dropped
    Discarded,
}

/// Handle for one in-flight removal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalTicket {
    generation: u64,
    image: ImageDataUri,
}

impl RemovalTicket {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Image to send to the remover
    #[must_use]
    pub fn image(&self) -> &ImageDataUri {
        &self.image
    }
}

/// Inputs to the state machine
#[derive(Debug)]
pub enum FlowEvent {
    /// File chosen through the picker
    FileSelected(SelectedFile),
    /// Something is being dragged over the drop zone
    DragOver,
    /// Drag left the drop zone
    DragLeave,
    /// File dropped onto the drop zone
    Dropped(SelectedFile),
    /// User asked for the background to be removed
    RemoveRequested,
    /// A removal started from `ticket` completed
    RemovalFinished {
        ticket: RemovalTicket,
        outcome: crate::Result<ImageDataUri>,
    },
    /// User removed the image
    Reset,
}

/// Single-owner controller for one upload at a time
#[derive(Debug, Default)]
pub struct FlowController {
    state: FlowState,
    dragging: bool,
    pending_selection: Option<String>,
    generation: u64,
}

impl FlowController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &FlowState {
        &self.state
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Name of the file the picker currently holds, cleared by reset
    #[must_use]
    pub fn pending_selection(&self) -> Option<&str> {
        self.pending_selection.as_deref()
    }

    #[must_use]
    pub fn preview(&self) -> Option<&ImageDataUri> {
        self.state.upload().map(|upload| &upload.preview)
    }

    #[must_use]
    pub fn result(&self) -> Option<&ImageDataUri> {
        match &self.state {
            FlowState::Done { result, .. } => Some(result),
            _ => None,
        }
    }

    /// User-visible error text, if an error is showing
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        match &self.state {
            FlowState::Empty { error } | FlowState::Done { error, .. } => {
                error.as_ref().map(ToString::to_string)
            },
            FlowState::Error { message, .. } => Some(message.clone()),
            _ => None,
        }
    }

    /// Whether the remove action should be enabled
    #[must_use]
    pub fn can_remove(&self) -> bool {
        matches!(
            self.state,
            FlowState::Previewing { .. } | FlowState::Done { .. } | FlowState::Error { .. }
        )
    }

    /// Apply one event
    ///
    /// # Errors
    /// Returns the [`FlowError`] the user should see. The state has already
    /// been updated to show it where applicable; remote failures are not
    /// errors here, they move the controller to [`Phase::Error`].
    pub fn handle(&mut self, event: FlowEvent) -> Result<FlowEffect, FlowError> {
        match event {
            FlowEvent::FileSelected(file) => self.select(file),
            FlowEvent::DragOver => {
                self.dragging = true;
                Ok(FlowEffect::Idle)
            },
            FlowEvent::DragLeave => {
                self.dragging = false;
                Ok(FlowEffect::Idle)
            },
            FlowEvent::Dropped(file) => {
                self.dragging = false;
                self.select(file)
            },
            FlowEvent::RemoveRequested => self.request_removal(),
            FlowEvent::RemovalFinished { ticket, outcome } => {
                Ok(self.finish_removal(&ticket, outcome))
            },
            FlowEvent::Reset => {
                self.reset();
                Ok(FlowEffect::Idle)
            },
        }
    }

    /// Run one removal end to end with `remover`
    ///
    /// # Errors
    /// Same as handling [`FlowEvent::RemoveRequested`]; remote failures are
    /// recorded in the state instead.
    pub async fn remove_background(
        &mut self,
        remover: &dyn BackgroundRemover,
    ) -> Result<(), FlowError> {
        let FlowEffect::StartRemoval(ticket) = self.handle(FlowEvent::RemoveRequested)? else {
            return Ok(());
        };

        debug!("Sending image to {}", remover.name());
        let outcome = remover.remove_background(ticket.image()).await;
        self.handle(FlowEvent::RemovalFinished { ticket, outcome })?;
        Ok(())
    }

    /// Build the download for the processed image; does not change state
    ///
    /// # Errors
    /// `NothingToDownload` unless the flow is done
    pub fn download(&self) -> Result<Download, FlowError> {
        let FlowState::Done { upload, result, .. } = &self.state else {
            return Err(FlowError::NothingToDownload);
        };

        let bytes = result.decode().map_err(|e| FlowError::Download {
            reason: e.to_string(),
        })?;

        Ok(Download {
            file_name: download_file_name(&upload.file_name),
            mime_type: result.mime_type().to_string(),
            bytes,
        })
    }

    fn select(&mut self, file: SelectedFile) -> Result<FlowEffect, FlowError> {
        if matches!(self.state, FlowState::Processing { .. }) {
            warn!("Ignoring selection of {} while processing", file.name());
            return Err(FlowError::Busy);
        }
        self.pending_selection = Some(file.name().to_string());

        if !file.is_image() {
            let error = FlowError::Validation {
                content_type: file.content_type().to_string(),
            };
            warn!("Rejected {} ({})", file.name(), file.content_type());
            return Err(self.refuse_selection(error));
        }

        let preview = match file.encode() {
            Ok(preview) => preview,
            Err(e) => {
                warn!("Could not encode {}: {}", file.name(), e);
                let error = FlowError::Preview {
                    reason: e.to_string(),
                };
                return Err(self.refuse_selection(error));
            },
        };

        info!(
            "Loaded {} as {} ({} bytes)",
            file.name(),
            preview.mime_type(),
            preview.decoded_len()
        );
        self.state = FlowState::Previewing {
            upload: Upload {
                file_name: file.name().to_string(),
                content_type: file.content_type().to_string(),
                preview,
            },
        };
        Ok(FlowEffect::Idle)
    }

    /// Record a refused selection, keeping any upload already loaded
    fn refuse_selection(&mut self, error: FlowError) -> FlowError {
        self.state = match std::mem::take(&mut self.state) {
            FlowState::Empty { .. } => FlowState::Empty {
                error: Some(error.clone()),
            },
            // The finished result stays downloadable
            FlowState::Done { upload, result, .. } => FlowState::Done {
                upload,
                result,
                error: Some(error.clone()),
            },
            FlowState::Previewing { upload }
            | FlowState::Processing { upload, .. }
            | FlowState::Error { upload, .. } => {
                let cause = match &error {
                    FlowError::Validation { content_type } => {
                        format!("unsupported content type {content_type}")
                    },
                    FlowError::Preview { reason } => reason.clone(),
                    other => other.to_string(),
                };
                FlowState::Error {
                    upload,
                    message: error.to_string(),
                    cause,
                }
            },
        };
        error
    }

    fn request_removal(&mut self) -> Result<FlowEffect, FlowError> {
        match std::mem::take(&mut self.state) {
            FlowState::Empty { .. } => {
                self.state = FlowState::Empty {
                    error: Some(FlowError::NoImage),
                };
                Err(FlowError::NoImage)
            },
            processing @ FlowState::Processing { .. } => {
                self.state = processing;
                Err(FlowError::Busy)
            },
            FlowState::Previewing { upload }
            | FlowState::Done { upload, .. }
            | FlowState::Error { upload, .. } => {
                self.generation += 1;
                let ticket = RemovalTicket {
                    generation: self.generation,
                    image: upload.preview.clone(),
                };
                info!(
                    "Removing background from {} (request {})",
                    upload.file_name, self.generation
                );
                self.state = FlowState::Processing {
                    upload,
                    generation: self.generation,
                };
                Ok(FlowEffect::StartRemoval(ticket))
            },
        }
    }

    fn finish_removal(
        &mut self,
        ticket: &RemovalTicket,
        outcome: crate::Result<ImageDataUri>,
    ) -> FlowEffect {
        let upload = match std::mem::take(&mut self.state) {
            FlowState::Processing { upload, generation } if generation == ticket.generation => {
                upload
            },
            other => {
                debug!(
                    "Discarding result of request {} while {:?}",
                    ticket.generation,
                    other.phase()
                );
                self.state = other;
                return FlowEffect::Discarded;
            },
        };

        self.state = match outcome {
            Ok(result) => {
                info!("Background removed from {}", upload.file_name);
                FlowState::Done {
                    upload,
                    result,
                    error: None,
                }
            },
            Err(e) => {
                events::error_with_context(&e, removal_context(&e));
                FlowState::Error {
                    upload,
                    message: REMOVAL_FAILED_MESSAGE.to_string(),
                    cause: e.to_string(),
                }
            },
        };
        FlowEffect::Idle
    }

    fn reset(&mut self) {
        debug!("Resetting flow from {:?}", self.phase());
        self.state = FlowState::default();
        self.dragging = false;
        self.pending_selection = None;
        // Anything still in flight belongs to the old generation.
        self.generation += 1;
    }
}

fn removal_context(error: &BgRemovalError) -> &'static str {
    if error.is_configuration() {
        "background removal is not configured"
    } else if error.is_network() {
        "could not reach the background removal service"
    } else {
        "background removal failed"
    }
}
