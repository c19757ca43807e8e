//! Assay Init
//!
//! Interactive setup of an assay project as an explicit state machine:
//!
//! - [`WizardState`] with [`allowed_transitions`] / [`validate_transition`]
//! - [`Session`]: progress threaded through every step
//! - [`Prompter`]: console and scripted operator interaction
//! - [`InitWizard`]: the flow over injected collaborators
//!
//! Unreadable sample files send the operator around a retry loop; declining
//! the retry ends the run gracefully with the scaffold kept.
//!
//! # Example
//!
//! ```no_run
//! use assay_init::{ConsolePrompter, InitWizard};
//!
//! let mut wizard = InitWizard::file_backed(".");
//! let outcome = wizard.run(&mut ConsolePrompter::stdio())?;
//! std::process::exit(outcome.exit_code());
//! # Ok::<(), assay_init::WizardError>(())
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod prompt;
pub mod session;
pub mod state;
pub mod wizard;

pub use error::{Result, WizardError};
pub use prompt::{ConsolePrompter, Prompter, ScriptedPrompter};
pub use session::Session;
pub use state::{allowed_transitions, validate_transition, WizardState};
pub use wizard::{InitWizard, WizardOptions, WizardOutcome};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
