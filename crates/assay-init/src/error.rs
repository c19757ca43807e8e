//! Wizard error types

use std::io;

use assay_generator::GeneratorError;
use assay_project::ProjectError;

use crate::state::WizardState;

/// Structural failure of the init flow
///
/// Data-content problems never surface here: they are recovered inside the
/// flow through the retry prompt.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    /// Transition outside the state table
    #[error("illegal wizard transition: {from:?} -> {to:?}")]
    IllegalTransition { from: WizardState, to: WizardState },

    /// A step ran without what an earlier step should have produced
    #[error("wizard reached {state:?} without {missing}")]
    Incomplete {
        state: WizardState,
        missing: &'static str,
    },

    /// Input ended before the flow finished
    #[error("input closed while waiting for an answer")]
    InputClosed,

    /// Terminal read or write failure
    #[error("terminal io error: {0}")]
    Io(#[from] io::Error),

    /// Project store or collaborator failure
    #[error(transparent)]
    Project(#[from] ProjectError),

    /// Datasource or generator failure
    #[error(transparent)]
    Generator(#[from] GeneratorError),
}

impl WizardError {
    /// Check if the error comes from configuration
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        match self {
            Self::Project(e) => e.is_config_error(),
            Self::Generator(e) => e.is_config_error(),
            _ => false,
        }
    }

    /// Check if the operator ended the session by closing input
    #[inline]
    #[must_use]
    pub fn is_input_closed(&self) -> bool {
        matches!(self, Self::InputClosed)
    }
}

/// Result alias for wizard operations
pub type Result<T> = std::result::Result<T, WizardError>;
