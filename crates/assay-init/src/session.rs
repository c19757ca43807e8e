//! Progress of one wizard run

use std::path::PathBuf;

use assay_generator::DatasourceKind;
use assay_project::{Batch, DocsSite, LoadError, SuiteId, SuiteOutcome};
use tracing::info;

use crate::error::{Result, WizardError};
use crate::state::{validate_transition, WizardState};

/// Everything the wizard has learned so far
///
/// Owned by the run and threaded through every step; transitions go through
/// [`Session::advance`] so the state table is enforced in one place.
#[derive(Debug)]
pub struct Session {
    state: WizardState,
    history: Vec<WizardState>,
    /// Backend chosen for the files datasource
    pub kind: DatasourceKind,
    /// Datasource the sample file is read through
    pub datasource: Option<String>,
    /// Last path the operator entered, offered again on retry
    pub last_path: Option<String>,
    /// Resolved sample file
    pub data_file: Option<PathBuf>,
    /// Batch loaded from the sample file
    pub batch: Option<Batch>,
    /// Most recent load failure
    pub load_error: Option<LoadError>,
    /// Number of failed loads
    pub load_errors: usize,
    /// Suite name the operator accepted
    pub suite_name: Option<SuiteId>,
    /// Generated suite
    pub suite: Option<SuiteOutcome>,
    /// Project had a datasource and suites when the run began
    pub complete: bool,
    /// Docs sites built during the run
    pub sites: Vec<DocsSite>,
    /// URL handed to the browser
    pub opened_url: Option<String>,
}

impl Session {
    /// Fresh session in [`WizardState::Start`]
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: WizardState::Start,
            history: vec![WizardState::Start],
            kind: DatasourceKind::Pandas,
            datasource: None,
            last_path: None,
            data_file: None,
            batch: None,
            load_error: None,
            load_errors: 0,
            suite_name: None,
            suite: None,
            complete: false,
            sites: Vec::new(),
            opened_url: None,
        }
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> WizardState {
        self.state
    }

    /// Every state visited, in order
    #[inline]
    #[must_use]
    pub fn history(&self) -> &[WizardState] {
        &self.history
    }

    /// Move to `to`
    ///
    /// # Errors
    /// Returns error if the transition is not in the state table
    pub fn advance(&mut self, to: WizardState) -> Result<()> {
        validate_transition(self.state, to)?;
        info!(from = ?self.state, ?to, "wizard transition");
        self.state = to;
        self.history.push(to);
        Ok(())
    }

    pub(crate) fn incomplete(&self, missing: &'static str) -> WizardError {
        WizardError::Incomplete {
            state: self.state,
            missing,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
