//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use glsched::prelude::*;
//! ```

// Core
pub use crate::core::errors::{GlsError, Result};

// Domain records
pub use crate::models::{
    Pipeline, PipelineJob, PipelineStatus, PipelineWithStages, Profile, Schedule, ScheduleDraft,
    User, Variable,
};

// Collaborators
pub use crate::services::gitlab::{GitLabClient, ScheduleApi};
pub use crate::services::profiles::{ProfileStore, TomlProfileStore};

// Dashboard
pub use crate::tui::model::{AppModel, Cmd, Msg, Screen};
pub use crate::tui::theme::Theme;
pub use crate::tui::{Services, run};
