//! The transcode form controller.
//!
//! [`FormController`] owns the form state and drives one engine per run
//! through `load -> write -> transcode -> read`, reflecting every step in the
//! status message, the log and the event bus. Starting is a synchronous
//! check-and-set ([`FormController::begin`]) so a second start can never slip
//! in while the first one awaits the engine.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use rp_core::config::FormConfig;
use rp_core::events::{Event, EventBus, EventPayload};
use rp_core::{Error, Result, RunId};
use rp_engine::{Engine, EngineFactory, LogEntry, Logger};
use tokio::sync::broadcast;

use crate::resource::{OutputResource, ResourceStore};
use crate::state::{
    FileSummary, FormSnapshot, OutputSummary, RunPhase, SelectedInput, TaskState,
};

pub const INITIAL_STATUS: &str = "Click Start to transcode";
pub const LOADING_STATUS: &str = "Loading engine";
pub const TRANSCODING_STATUS: &str = "Start transcoding...";
pub const COMPLETE_STATUS: &str =
    "Complete transcoding! To transcode again, reset the form";

#[derive(Debug)]
struct FormState {
    input: Option<SelectedInput>,
    options: String,
    extension: String,
    task: TaskState,
    status: String,
    log: Vec<String>,
    output: Option<Arc<OutputResource>>,
    run_id: Option<RunId>,
}

/// What a started run works on, captured when the run was admitted.
#[derive(Debug, Clone)]
pub struct RunTicket {
    pub run_id: RunId,
    input: SelectedInput,
    options: String,
    extension: String,
}

#[derive(Clone)]
pub struct FormController {
    state: Arc<RwLock<FormState>>,
    factory: Arc<dyn EngineFactory>,
    events: Arc<EventBus>,
    resources: Arc<ResourceStore>,
}

impl FormController {
    pub fn new(
        factory: Arc<dyn EngineFactory>,
        events: Arc<EventBus>,
        resources: Arc<ResourceStore>,
        config: &FormConfig,
    ) -> Self {
        let state = FormState {
            input: None,
            options: config.default_options.clone(),
            extension: config.default_extension.clone(),
            task: TaskState::Idle,
            status: INITIAL_STATUS.to_string(),
            log: Vec::new(),
            output: None,
            run_id: None,
        };
        Self {
            state: Arc::new(RwLock::new(state)),
            factory,
            events,
            resources,
        }
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn resources(&self) -> &Arc<ResourceStore> {
        &self.resources
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    // ---- Edits ----

    /// Replace the selected file. A selection event without a file is ignored.
    pub fn select_file(&self, file: Option<SelectedInput>) -> Result<()> {
        let Some(file) = file else {
            return Ok(());
        };
        self.edit(|st| {
            tracing::info!(name = %file.name, size = file.size(), "File selected");
            st.input = Some(file);
        })
    }

    /// Replace the option text verbatim.
    pub fn edit_options(&self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        self.edit(|st| st.options = text)
    }

    /// Replace the output extension verbatim.
    pub fn edit_extension(&self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        self.edit(|st| st.extension = text)
    }

    fn edit(&self, apply: impl FnOnce(&mut FormState)) -> Result<()> {
        {
            let mut st = self.state.write();
            if st.task.is_running() {
                return Err(Error::Conflict(
                    "the form is locked once a transcode has started".into(),
                ));
            }
            apply(&mut st);
        }
        self.events.broadcast(EventPayload::FormChanged);
        Ok(())
    }

    // ---- Queries ----

    pub fn can_start(&self) -> bool {
        let st = self.state.read();
        st.input.is_some() && !st.task.is_running()
    }

    pub fn task_state(&self) -> TaskState {
        self.state.read().task.clone()
    }

    pub fn status(&self) -> String {
        self.state.read().status.clone()
    }

    pub fn log_lines(&self) -> Vec<String> {
        self.state.read().log.clone()
    }

    /// The log as text, one line each, every line terminated.
    pub fn render_log(&self) -> String {
        let st = self.state.read();
        let mut out = String::with_capacity(st.log.iter().map(|l| l.len() + 1).sum());
        for line in &st.log {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    pub fn output(&self) -> Option<Arc<OutputResource>> {
        self.state.read().output.clone()
    }

    pub fn snapshot(&self) -> FormSnapshot {
        let st = self.state.read();
        FormSnapshot {
            file: st.input.as_ref().map(|i| FileSummary {
                name: i.name.clone(),
                size: i.size(),
            }),
            options: st.options.clone(),
            extension: st.extension.clone(),
            state: st.task.clone(),
            running: st.task.is_running(),
            can_start: st.input.is_some() && !st.task.is_running(),
            can_reset: !st.task.is_in_flight(),
            status: st.status.clone(),
            log: st.log.clone(),
            output: st.output.as_ref().map(|r| OutputSummary {
                resource_id: r.id,
                url: r.url(),
                mime: r.mime.clone(),
                file_name: r.file_name.clone(),
                size: r.len(),
            }),
            run_id: st.run_id,
        }
    }

    // ---- Run ----

    /// Run the whole sequence and return the published output.
    pub async fn start(&self) -> Result<Arc<OutputResource>> {
        let ticket = self.begin()?;
        self.execute(ticket).await
    }

    /// Admit a run: check the precondition and move to Running in one step.
    ///
    /// # Errors
    ///
    /// [`Error::Conflict`] when no file is selected or a run already started.
    /// The form is left untouched in that case.
    pub fn begin(&self) -> Result<RunTicket> {
        let ticket = {
            let mut st = self.state.write();
            if st.task.is_running() {
                return Err(Error::Conflict("a transcode has already been started".into()));
            }
            let Some(input) = st.input.clone() else {
                return Err(Error::Conflict("no input file selected".into()));
            };

            let run_id = RunId::new();
            st.task = TaskState::Running {
                phase: RunPhase::Loading,
            };
            st.run_id = Some(run_id);
            st.log.clear();
            st.status = LOADING_STATUS.to_string();

            RunTicket {
                run_id,
                input,
                options: st.options.clone(),
                extension: st.extension.clone(),
            }
        };

        tracing::info!(run_id = %ticket.run_id, input = %ticket.input.name, "Run started");
        self.events.broadcast(EventPayload::PhaseChanged {
            run_id: ticket.run_id,
            phase: RunPhase::Loading.to_string(),
        });
        self.events.broadcast(EventPayload::StatusChanged {
            run_id: Some(ticket.run_id),
            status: LOADING_STATUS.to_string(),
        });
        Ok(ticket)
    }

    /// Drive the engine sequence for an admitted run.
    ///
    /// Any engine failure ends the run in [`TaskState::Failed`] and is
    /// returned unchanged.
    pub async fn execute(&self, ticket: RunTicket) -> Result<Arc<OutputResource>> {
        let run_id = ticket.run_id;
        let engine = self.factory.create(self.logger(run_id));

        match self.drive(engine, &ticket).await {
            Ok(resource) => {
                {
                    let mut st = self.state.write();
                    st.task = TaskState::Completed;
                    st.output = Some(Arc::clone(&resource));
                }
                tracing::info!(
                    run_id = %run_id,
                    resource_id = %resource.id,
                    size = resource.len(),
                    "Run completed"
                );
                self.events.broadcast(EventPayload::OutputReady {
                    run_id,
                    resource_id: resource.id,
                    url: resource.url(),
                    mime: resource.mime.clone(),
                });
                Ok(resource)
            }
            Err((phase, err)) => {
                self.state.write().task = TaskState::Failed {
                    phase,
                    error: err.to_string(),
                };
                tracing::error!(run_id = %run_id, phase = %phase, "Run failed: {err}");
                self.events.broadcast(EventPayload::RunFailed {
                    run_id,
                    phase: phase.to_string(),
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        mut engine: Box<dyn Engine>,
        ticket: &RunTicket,
    ) -> std::result::Result<Arc<OutputResource>, (RunPhase, Error)> {
        let run_id = ticket.run_id;

        engine.load().await.map_err(|e| (RunPhase::Loading, e))?;

        self.set_status(run_id, TRANSCODING_STATUS);
        let input_name = uuid::Uuid::new_v4().to_string();
        let output_name = format!("{}.{}", uuid::Uuid::new_v4(), ticket.extension);

        self.enter(run_id, RunPhase::Writing);
        engine
            .write(&input_name, &ticket.input.data)
            .await
            .map_err(|e| (RunPhase::Writing, e))?;

        self.enter(run_id, RunPhase::Transcoding);
        let args = ticket.options.split('\n').collect::<Vec<_>>().join(" ");
        engine
            .transcode(&input_name, &output_name, &args)
            .await
            .map_err(|e| (RunPhase::Transcoding, e))?;

        self.set_status(run_id, COMPLETE_STATUS);
        self.enter(run_id, RunPhase::Reading);
        let data = engine
            .read(&output_name)
            .await
            .map_err(|e| (RunPhase::Reading, e))?;

        let file_name = download_name(&ticket.input.name, &ticket.extension);
        Ok(self
            .resources
            .publish(data, format!("video/{}", ticket.extension), file_name))
    }

    fn enter(&self, run_id: RunId, phase: RunPhase) {
        self.state.write().task = TaskState::Running { phase };
        tracing::debug!(run_id = %run_id, phase = %phase, "Phase changed");
        self.events.broadcast(EventPayload::PhaseChanged {
            run_id,
            phase: phase.to_string(),
        });
    }

    fn set_status(&self, run_id: RunId, status: &str) {
        self.state.write().status = status.to_string();
        self.events.broadcast(EventPayload::StatusChanged {
            run_id: Some(run_id),
            status: status.to_string(),
        });
    }

    /// Log callback for the engine of `run_id`. Empty messages are dropped;
    /// messages arriving after the run was reset away are ignored.
    fn logger(&self, run_id: RunId) -> Logger {
        let state = Arc::clone(&self.state);
        let events = Arc::clone(&self.events);
        Arc::new(move |entry: LogEntry| {
            if entry.message.is_empty() {
                return;
            }
            {
                let mut st = state.write();
                if st.run_id != Some(run_id) {
                    return;
                }
                st.log.push(entry.message.clone());
            }
            tracing::trace!(run_id = %run_id, kind = ?entry.kind, "{}", entry.message);
            events.broadcast(EventPayload::LogLine {
                run_id,
                line: entry.message,
            });
        })
    }

    // ---- Reset ----

    /// Return a finished form to Idle.
    ///
    /// The selected file, options and extension are kept. The log is cleared,
    /// the status restored and the previous output revoked. The next start
    /// creates a fresh engine.
    ///
    /// # Errors
    ///
    /// [`Error::Conflict`] while a run is in flight.
    pub fn reset(&self) -> Result<()> {
        let revoked = {
            let mut st = self.state.write();
            if st.task.is_in_flight() {
                return Err(Error::Conflict(
                    "cannot reset while a transcode is running".into(),
                ));
            }
            st.task = TaskState::Idle;
            st.status = INITIAL_STATUS.to_string();
            st.log.clear();
            st.run_id = None;
            st.output.take()
        };

        if let Some(resource) = revoked {
            self.resources.revoke(resource.id);
        }
        self.events.clear_recent();
        self.events.broadcast(EventPayload::FormReset);
        tracing::info!("Form reset");
        Ok(())
    }
}

/// `<input stem>.<extension>`, falling back to `output` for odd names.
fn download_name(input_name: &str, extension: &str) -> String {
    let stem = Path::new(input_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "output".to_string());
    format!("{stem}.{extension}")
}
