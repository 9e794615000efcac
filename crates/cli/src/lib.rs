//! GitHub Actions step that installs a released tool binary.
//!
//! The binary reads its inputs from flags or the runner's `INPUT_*`
//! variables, installs the tool through [`setup_tool_core::Installer`], puts
//! it on `PATH`, registers problem matchers and runs `<tool> bootstrap`.

pub mod actions;
pub mod cli;
pub mod tracing;
pub mod workflow;

pub use actions::WorkflowCommands;
pub use cli::Cli;
pub use workflow::{Settings, Workflow, installer_config};
