//! Wizard states and the transition table
//!
//! ```text
//! Start -> SelectDatasourceType -> SelectFile -> ConfirmOrBuildSuite
//!       -> GenerateSuite -> BuildDocs -> Done
//! SelectFile -> LoadError -> RetryPrompt -> { SelectFile | Abort }
//! Start -> SelectFile            (datasource present, no suites)
//! Start -> BuildDocs             (project appears complete)
//! Start | SelectDatasourceType -> Abort
//! ```

use crate::error::{Result, WizardError};

/// Step of the init flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WizardState {
    Start,
    SelectDatasourceType,
    SelectFile,
    ConfirmOrBuildSuite,
    GenerateSuite,
    BuildDocs,
    LoadError,
    RetryPrompt,
    Abort,
    Done,
}

impl WizardState {
    /// Every state, in flow order
    pub const ALL: [Self; 10] = [
        Self::Start,
        Self::SelectDatasourceType,
        Self::SelectFile,
        Self::ConfirmOrBuildSuite,
        Self::GenerateSuite,
        Self::BuildDocs,
        Self::LoadError,
        Self::RetryPrompt,
        Self::Abort,
        Self::Done,
    ];

    /// Check if the flow has ended
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        allowed_transitions(self).is_empty()
    }

    /// Check if ending in this state counts as success
    ///
    /// A declined retry is a graceful abort, not a failure.
    #[inline]
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Done | Self::Abort)
    }
}

/// Validates a state transition.
///
/// # Errors
/// Returns [`WizardError::IllegalTransition`] when `to` is not reachable
/// from `from` in one step
pub fn validate_transition(from: WizardState, to: WizardState) -> Result<()> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(WizardError::IllegalTransition { from, to })
    }
}

pub fn allowed_transitions(from: WizardState) -> Vec<WizardState> {
    use WizardState::*;
    match from {
        Start => vec![SelectDatasourceType, SelectFile, BuildDocs, Abort],
        SelectDatasourceType => vec![SelectFile, Abort],
        SelectFile => vec![ConfirmOrBuildSuite, LoadError],
        LoadError => vec![RetryPrompt],
        RetryPrompt => vec![SelectFile, Abort],
        ConfirmOrBuildSuite => vec![GenerateSuite],
        GenerateSuite => vec![BuildDocs],
        BuildDocs => vec![Done],
        Abort | Done => vec![],
    }
}

fn allowed(from: WizardState, to: WizardState) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn happy_path_is_allowed() {
        use WizardState::*;
        let path = [
            Start,
            SelectDatasourceType,
            SelectFile,
            ConfirmOrBuildSuite,
            GenerateSuite,
            BuildDocs,
            Done,
        ];
        for pair in path.windows(2) {
            assert!(validate_transition(pair[0], pair[1]).is_ok(), "{pair:?}");
        }
    }

    #[test]
    fn retry_loop_is_allowed() {
        use WizardState::*;
        assert!(validate_transition(SelectFile, LoadError).is_ok());
        assert!(validate_transition(LoadError, RetryPrompt).is_ok());
        assert!(validate_transition(RetryPrompt, SelectFile).is_ok());
        assert!(validate_transition(RetryPrompt, Abort).is_ok());

        // A load error always goes through the prompt
        assert!(validate_transition(LoadError, SelectFile).is_err());
        assert!(validate_transition(LoadError, Abort).is_err());
    }

    #[test]
    fn terminal_states() {
        let terminal: Vec<_> = WizardState::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminal, vec![WizardState::Abort, WizardState::Done]);
        assert!(terminal.iter().all(|s| s.is_success()));
    }

    #[test]
    fn every_state_reaches_a_terminal_state() {
        for start in WizardState::ALL {
            let mut seen = vec![start];
            let mut frontier = vec![start];
            while let Some(state) = frontier.pop() {
                for next in allowed_transitions(state) {
                    if !seen.contains(&next) {
                        seen.push(next);
                        frontier.push(next);
                    }
                }
            }
            assert!(seen.iter().any(|s| s.is_terminal()), "{start:?}");
        }
    }

    fn any_state() -> impl Strategy<Value = WizardState> {
        prop::sample::select(WizardState::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_validation_matches_table(from in any_state(), to in any_state()) {
            let res = validate_transition(from, to);
            let allowed = allowed_transitions(from);
            prop_assert_eq!(res.is_ok(), allowed.contains(&to));
        }

        #[test]
        fn prop_nothing_returns_to_start(from in any_state()) {
            prop_assert!(validate_transition(from, WizardState::Start).is_err());
        }
    }
}
