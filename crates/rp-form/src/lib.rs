//! # rp-form
//!
//! The single-page transcode form, independent of how it is presented.
//!
//! - [`FormController`] holds the selected file, option text, extension,
//!   task state, status and log, and runs the engine sequence on start.
//! - [`ResourceStore`] keeps produced outputs addressable by URL until they
//!   are revoked.

pub mod controller;
pub mod resource;
pub mod state;

pub use controller::{
    FormController, RunTicket, COMPLETE_STATUS, INITIAL_STATUS, LOADING_STATUS,
    TRANSCODING_STATUS,
};
pub use resource::{resource_url, OutputResource, ResourceStore, RESOURCE_PREFIX};
pub use state::{
    FileSummary, FormSnapshot, OutputSummary, RunPhase, SelectedInput, TaskState,
};
