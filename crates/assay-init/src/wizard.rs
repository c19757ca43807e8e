//! The init flow
//!
//! [`InitWizard`] owns its collaborators and drives a [`Session`] through the
//! state table until a terminal state. Every step reads the session, talks to
//! the operator through a [`Prompter`], and names the next state.

use std::env;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use assay_generator::{Datasource, DatasourceKind, GeneratorError};
use assay_project::{
    validation_page, Browser, DocsBuilder, DocsSite, ExampleSuiteGenerator, FileLoader,
    FileProject, LoadError, LoadErrorCategory, Loader, LocalSiteBuilder, ProjectStore,
    SuiteGenerator, SuiteId, SystemBrowser, ValidationId,
};
use tracing::{info, warn};

use crate::error::Result;
use crate::prompt::Prompter;
use crate::session::Session;
use crate::state::WizardState;

const BANNER: &str = "Always know what to expect from your data.";

const COMPLETE: &str =
    "This looks like an existing project that appears complete! You are ready to roll.";

const CONNECT_QUESTION: &str = "What data would you like assay to connect to?";
const FILES_CHOICE: &str = "Files on a filesystem (for processing with Pandas or Spark)";
const SQL_CHOICE: &str = "Relational database (SQL)";

const PROCESSING_QUESTION: &str = "What are you processing your files with?";
const PROCESSING_CHOICES: [&str; 2] = ["Pandas", "PySpark"];

const PATH_QUESTION: &str = "Enter the path (relative or absolute) of a data file";

const SUITE_QUESTION: &str = "Name the new expectation suite";

const DOCS_QUESTION: &str = "Would you like to build & view this project's Data Docs!?";

/// Knobs of the init flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardOptions {
    /// Name of the datasource the flow creates
    pub datasource_name: String,
    /// Command shown in re-run hints
    pub command_name: String,
    /// Directory relative data paths resolve against
    pub working_dir: PathBuf,
}

impl Default for WizardOptions {
    fn default() -> Self {
        Self {
            datasource_name: "files_datasource".to_string(),
            command_name: "assay".to_string(),
            working_dir: env::current_dir().unwrap_or_default(),
        }
    }
}

impl WizardOptions {
    /// Default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the datasource name
    #[inline]
    #[must_use]
    pub fn with_datasource_name(mut self, name: impl Into<String>) -> Self {
        self.datasource_name = name.into();
        self
    }

    /// Set the command shown in hints
    #[inline]
    #[must_use]
    pub fn with_command_name(mut self, name: impl Into<String>) -> Self {
        self.command_name = name.into();
        self
    }

    /// Set the directory relative paths resolve against
    #[inline]
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq)]
pub struct WizardOutcome {
    /// `Done` or `Abort`
    pub final_state: WizardState,
    /// Suite generated during the run
    pub suite: Option<SuiteId>,
    /// Validation result stored with the suite
    pub validation: Option<ValidationId>,
    /// URL handed to the browser
    pub opened_url: Option<String>,
    /// Docs sites built during the run
    pub sites: Vec<DocsSite>,
    /// Failed sample loads before success or abort
    pub load_errors: usize,
    /// Every state visited, in order
    pub history: Vec<WizardState>,
}

impl WizardOutcome {
    fn from_session(session: Session) -> Self {
        let final_state = session.state();
        let history = session.history().to_vec();
        let (suite, validation) = match session.suite {
            Some(outcome) => (Some(outcome.suite), outcome.validation),
            None => (None, None),
        };
        Self {
            final_state,
            history,
            suite,
            validation,
            opened_url: session.opened_url,
            sites: session.sites,
            load_errors: session.load_errors,
        }
    }

    /// Process exit code: 0 for completion and graceful abort
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.final_state.is_success())
    }
}

/// Interactive project initialization
pub struct InitWizard {
    store: Box<dyn ProjectStore>,
    loader: Box<dyn Loader>,
    suites: Box<dyn SuiteGenerator>,
    docs: Box<dyn DocsBuilder>,
    browser: Box<dyn Browser>,
    options: WizardOptions,
}

impl InitWizard {
    /// Wizard over explicit collaborators
    pub fn new<S, L, G, D, B>(store: S, loader: L, suites: G, docs: D, browser: B) -> Self
    where
        S: ProjectStore + 'static,
        L: Loader + 'static,
        G: SuiteGenerator + 'static,
        D: DocsBuilder + 'static,
        B: Browser + 'static,
    {
        Self {
            store: Box::new(store),
            loader: Box::new(loader),
            suites: Box::new(suites),
            docs: Box::new(docs),
            browser: Box::new(browser),
            options: WizardOptions::default(),
        }
    }

    /// Wizard with the file-backed collaborators for a project under `root`
    pub fn file_backed(root: impl AsRef<Path>) -> Self {
        let project = FileProject::new(root);
        Self::new(
            project.clone(),
            FileLoader::new(),
            ExampleSuiteGenerator::new(project.clone()),
            LocalSiteBuilder::new(project),
            SystemBrowser,
        )
    }

    /// Replace the options
    #[inline]
    #[must_use]
    pub fn with_options(mut self, options: WizardOptions) -> Self {
        self.options = options;
        self
    }

    /// Run the flow to a terminal state
    ///
    /// Load failures are reported to the operator and retried; they never
    /// surface as errors.
    ///
    /// # Errors
    /// Returns error on structural failures: project persistence,
    /// configuration, terminal io, or input ending mid-flow
    pub fn run(&mut self, prompter: &mut dyn Prompter) -> Result<WizardOutcome> {
        let mut session = Session::new();
        while !session.state().is_terminal() {
            let next = match session.state() {
                WizardState::Start => self.start(&mut session, prompter)?,
                WizardState::SelectDatasourceType => {
                    self.select_datasource_type(&mut session, prompter)?
                }
                WizardState::SelectFile => self.select_file(&mut session, prompter)?,
                WizardState::LoadError => Self::report_load_error(&session, prompter)?,
                WizardState::RetryPrompt => self.retry_prompt(prompter)?,
                WizardState::ConfirmOrBuildSuite => Self::name_suite(&mut session, prompter)?,
                WizardState::GenerateSuite => self.generate_suite(&mut session, prompter)?,
                WizardState::BuildDocs => self.build_docs(&mut session, prompter)?,
                WizardState::Abort | WizardState::Done => break,
            };
            session.advance(next)?;
        }
        info!(state = ?session.state(), "init finished");
        Ok(WizardOutcome::from_session(session))
    }

    fn start(&mut self, session: &mut Session, p: &mut dyn Prompter) -> Result<WizardState> {
        p.say(BANNER)?;
        if !self.store.is_initialized() {
            p.say(&intro(&self.options.command_name))?;
            if !p.confirm("OK to proceed?", true)? {
                p.say(&format!(
                    "OK - run {} init again when ready. Exiting...",
                    self.options.command_name
                ))?;
                return Ok(WizardState::Abort);
            }
        }
        self.store.scaffold()?;

        let datasources = self.store.list_datasources()?;
        let Some(first) = datasources.first() else {
            return Ok(WizardState::SelectDatasourceType);
        };
        if !self.store.list_expectation_suites()?.is_empty() {
            session.complete = true;
            p.say(COMPLETE)?;
            return Ok(WizardState::BuildDocs);
        }

        let kind = DatasourceKind::from_class_name(&first.class_name)?;
        if kind == DatasourceKind::Sql {
            p.say(&sql_unsupported(&self.options.command_name))?;
            return Ok(WizardState::Abort);
        }
        info!(datasource = %first.name, "reusing datasource without suites");
        session.kind = kind;
        session.datasource = Some(first.name.clone());
        Ok(WizardState::SelectFile)
    }

    fn select_datasource_type(
        &self,
        session: &mut Session,
        p: &mut dyn Prompter,
    ) -> Result<WizardState> {
        if p.choose(CONNECT_QUESTION, &[FILES_CHOICE, SQL_CHOICE], 0)? == 1 {
            p.say(&sql_unsupported(&self.options.command_name))?;
            return Ok(WizardState::Abort);
        }
        session.kind = match p.choose(PROCESSING_QUESTION, &PROCESSING_CHOICES, 0)? {
            0 => DatasourceKind::Pandas,
            _ => DatasourceKind::Spark,
        };
        Ok(WizardState::SelectFile)
    }

    fn select_file(&mut self, session: &mut Session, p: &mut dyn Prompter) -> Result<WizardState> {
        let answer = loop {
            let answer = p.prompt(PATH_QUESTION, session.last_path.as_deref())?;
            if !answer.is_empty() {
                break answer;
            }
            p.say("Error: a data file path is required")?;
        };
        let path = self.options.working_dir.join(&answer);
        session.last_path = Some(answer);

        let datasource = self.ensure_datasource(session, &path)?;
        let loaded = datasource
            .batch_kwargs_for_file(&path)
            .map_err(|e| catalog_miss(&datasource, &path, &e))
            .and_then(|kwargs| self.loader.load(&kwargs));
        match loaded {
            Ok(batch) => {
                info!(path = %path.display(), rows = batch.row_count(), "loaded sample batch");
                session.batch = Some(batch);
                session.data_file = Some(path);
                session.load_error = None;
                Ok(WizardState::ConfirmOrBuildSuite)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot load sample file");
                session.load_error = Some(e);
                session.load_errors += 1;
                Ok(WizardState::LoadError)
            }
        }
    }

    /// Datasource the sample is read through, created on first use
    ///
    /// Created before the first load so a declined retry still leaves it in
    /// the project.
    fn ensure_datasource(&mut self, session: &mut Session, path: &Path) -> Result<Datasource> {
        if let Some(name) = &session.datasource {
            return Ok(self.store.get_datasource(name)?);
        }
        let base = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = self.options.datasource_name.clone();
        let generators = Datasource::files_config(session.kind, base).generators;
        let datasource = self.store.add_datasource(&name, session.kind, generators)?;
        session.datasource = Some(name);
        Ok(datasource)
    }

    fn report_load_error(session: &Session, p: &mut dyn Prompter) -> Result<WizardState> {
        let error = session
            .load_error
            .as_ref()
            .ok_or_else(|| session.incomplete("a load error"))?;
        p.say(&format!(
            "\nCannot load file.\n  - Please check the file and try again or select a different data file.\n  - Error: {error}"
        ))?;
        Ok(WizardState::RetryPrompt)
    }

    fn retry_prompt(&self, p: &mut dyn Prompter) -> Result<WizardState> {
        if p.confirm("Try again?", true)? {
            return Ok(WizardState::SelectFile);
        }
        p.say(&format!(
            "We have saved your setup progress. When you are ready, run {} init to continue.",
            self.options.command_name
        ))?;
        Ok(WizardState::Abort)
    }

    fn name_suite(session: &mut Session, p: &mut dyn Prompter) -> Result<WizardState> {
        let stem = session
            .data_file
            .as_deref()
            .and_then(Path::file_stem)
            .map_or_else(|| "data".to_string(), |s| s.to_string_lossy().into_owned());
        let default = format!("{stem}.warning");

        let suite = loop {
            let answer = p.prompt(SUITE_QUESTION, Some(&default))?;
            match answer.parse::<SuiteId>() {
                Ok(id) => break id,
                Err(e) => p.say(&format!("Error: {e}"))?,
            }
        };
        p.say(
            "\nassay will choose a couple of columns and generate expectations about them\n\
             to demonstrate some examples of assertions you can make about your data.",
        )?;
        p.prompt("Press Enter to continue", None)?;
        session.suite_name = Some(suite);
        Ok(WizardState::GenerateSuite)
    }

    fn generate_suite(&mut self, session: &mut Session, p: &mut dyn Prompter) -> Result<WizardState> {
        let batch = session
            .batch
            .as_ref()
            .ok_or_else(|| session.incomplete("a loaded batch"))?;
        let suite = session
            .suite_name
            .as_ref()
            .ok_or_else(|| session.incomplete("a suite name"))?;

        p.say("\nGenerating example Expectation Suite...")?;
        let outcome = self.suites.generate_example_suite(batch, suite)?;
        p.say(&format!(
            "A new Expectation suite '{}' was added to your project",
            outcome.suite
        ))?;
        session.suite = Some(outcome);
        Ok(WizardState::BuildDocs)
    }

    fn build_docs(&mut self, session: &mut Session, p: &mut dyn Prompter) -> Result<WizardState> {
        if p.confirm(DOCS_QUESTION, true)? {
            p.say("\nBuilding Data Docs...")?;
            let sites = self.docs.build_docs()?;
            let mut built = String::from("The following Data Docs sites were built:");
            for site in &sites {
                let _ = write!(built, "\n- {}: {}", site.site_name, site.url);
            }
            p.say(&built)?;

            if let Some(url) = docs_url(session, &sites) {
                match self.browser.open(&url) {
                    Ok(()) => session.opened_url = Some(url),
                    Err(e) => {
                        warn!(error = %e, "cannot open browser");
                        p.say(&format!("Open {url} in a browser to view your Data Docs."))?;
                    }
                }
            }
            session.sites = sites;
        }

        if !session.complete {
            p.say("\nassay is now set up.")?;
        }
        Ok(WizardState::Done)
    }
}

/// Load error for a file the datasource's catalog does not serve
fn catalog_miss(datasource: &Datasource, path: &Path, error: &GeneratorError) -> LoadError {
    if !path.is_file() {
        return LoadError::new(
            LoadErrorCategory::NotFound,
            format!("No such file: '{}'", path.display()),
        );
    }
    if error.is_unknown_asset() {
        return LoadError::new(
            LoadErrorCategory::UnsupportedSource,
            format!(
                "'{}' is not a data asset of datasource '{}'",
                path.display(),
                datasource.name()
            ),
        );
    }
    LoadError::new(LoadErrorCategory::UnsupportedSource, error.to_string())
}

/// Page to show after a build: the new validation result when there is one
fn docs_url(session: &Session, sites: &[DocsSite]) -> Option<String> {
    let site = sites.first()?;
    let validation = session
        .suite
        .as_ref()
        .and_then(|outcome| outcome.validation.as_ref());
    Some(match validation {
        Some(id) => site.page_url(&validation_page(id)),
        None => site.url.clone(),
    })
}

fn intro(command: &str) -> String {
    format!(
        "\nLet's add {command} to your project by scaffolding a new assay directory:\n\n    \
         assay\n    \
         ├── assay.yml\n    \
         ├── expectations\n    \
         └── uncommitted\n        \
         ├── config_variables.yml\n        \
         ├── data_docs\n        \
         └── validations\n"
    )
}

fn sql_unsupported(command: &str) -> String {
    format!(
        "Relational databases are not supported by this setup flow yet. Add a datasource \
         to assay.yml by hand, then run {command} init again."
    )
}
