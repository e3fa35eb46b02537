//! Form state types and the serialisable snapshot the page renders.

use std::fmt;

use bytes::Bytes;
use rp_core::{ResourceId, RunId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Step of the engine sequence a run is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Loading,
    Writing,
    Transcoding,
    Reading,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Loading => "loading",
            RunPhase::Writing => "writing",
            RunPhase::Transcoding => "transcoding",
            RunPhase::Reading => "reading",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of the form.
///
/// `Idle -> Running(Loading -> Writing -> Transcoding -> Reading) ->
/// Completed | Failed`. The terminal states are left only through a reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TaskState {
    #[default]
    Idle,
    Running { phase: RunPhase },
    Completed,
    Failed { phase: RunPhase, error: String },
}

impl TaskState {
    /// True once a run has started, including after it finished. The file
    /// picker and Start button stay disabled for as long as this holds.
    pub fn is_running(&self) -> bool {
        !matches!(self, TaskState::Idle)
    }

    /// True while the engine sequence is still executing.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, TaskState::Running { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed { .. })
    }
}

/// The file the user picked.
#[derive(Clone)]
pub struct SelectedInput {
    pub name: String,
    pub data: Bytes,
}

impl SelectedInput {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl fmt::Debug for SelectedInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedInput")
            .field("name", &self.name)
            .field("size", &self.data.len())
            .finish()
    }
}

/// Name and size of the selected file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FileSummary {
    pub name: String,
    pub size: usize,
}

/// Where the produced output can be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OutputSummary {
    #[schema(value_type = String)]
    pub resource_id: ResourceId,
    pub url: String,
    pub mime: String,
    pub file_name: String,
    pub size: usize,
}

/// Everything the page needs to render the form.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FormSnapshot {
    pub file: Option<FileSummary>,
    pub options: String,
    pub extension: String,
    pub state: TaskState,
    /// Mirrors [`TaskState::is_running`].
    pub running: bool,
    pub can_start: bool,
    pub can_reset: bool,
    pub status: String,
    pub log: Vec<String>,
    pub output: Option<OutputSummary>,
    #[schema(value_type = Option<String>)]
    pub run_id: Option<RunId>,
}
