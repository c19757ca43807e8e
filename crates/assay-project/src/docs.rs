//! Static data docs
//!
//! [`LocalSiteBuilder`] renders stored suites and validation results as
//! plain HTML pages under the project's `local_site` directory.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::LOCAL_SITE;
use crate::error::{ProjectError, Result};
use crate::store::{FileProject, ProjectStore};
use crate::suite::{ExpectationSuite, SuiteId, ValidationId, ValidationResult};

/// A built docs site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocsSite {
    pub site_name: String,
    /// URL of the site's index page
    pub url: String,
}

impl DocsSite {
    /// URL of a page relative to the site root
    #[must_use]
    pub fn page_url(&self, relative: &str) -> String {
        let root = self.url.strip_suffix("index.html").unwrap_or(&self.url);
        format!("{}/{}", root.trim_end_matches('/'), relative)
    }
}

/// Page of a suite, relative to a site root
#[must_use]
pub fn suite_page(id: &SuiteId) -> String {
    format!("expectations/{}.html", id.relative_path())
}

/// Page of a validation result, relative to a site root
#[must_use]
pub fn validation_page(id: &ValidationId) -> String {
    format!("validations/{}.html", id.relative_path())
}

/// Renders documentation sites
pub trait DocsBuilder {
    /// Rebuild every site
    ///
    /// # Errors
    /// Returns error if stored documents cannot be read or pages written
    fn build_docs(&mut self) -> Result<Vec<DocsSite>>;
}

/// Builds the project's local HTML site
#[derive(Debug, Clone)]
pub struct LocalSiteBuilder {
    project: FileProject,
}

impl LocalSiteBuilder {
    /// Builder for `project`
    #[must_use]
    pub fn new(project: FileProject) -> Self {
        Self { project }
    }
}

impl DocsBuilder for LocalSiteBuilder {
    fn build_docs(&mut self) -> Result<Vec<DocsSite>> {
        let site_dir = self.project.docs_site_dir(LOCAL_SITE)?;
        let suites = self.project.list_expectation_suites()?;
        let validations = self.project.list_validations()?;

        for id in &suites {
            let suite = self.project.load_suite(id)?;
            write_page(&site_dir.join(suite_page(id)), &render_suite(id, &suite))?;
        }
        for id in &validations {
            let result = self.project.load_validation(id)?;
            write_page(
                &site_dir.join(validation_page(id)),
                &render_validation(id, &result),
            )?;
        }
        let index = site_dir.join("index.html");
        write_page(&index, &render_index(&suites, &validations))?;

        let url = file_url(&index);
        info!(site = LOCAL_SITE, %url, suites = suites.len(), validations = validations.len(), "built data docs");
        Ok(vec![DocsSite {
            site_name: LOCAL_SITE.to_string(),
            url,
        }])
    }
}

fn write_page(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ProjectError::io(parent, e))?;
    }
    fs::write(path, html).map_err(|e| ProjectError::io(path, e))
}

fn file_url(path: &Path) -> String {
    let absolute: PathBuf = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let text = absolute.to_string_lossy().replace('\\', "/");
    if text.starts_with('/') {
        format!("file://{text}")
    } else {
        format!("file:///{text}")
    }
}

fn page(title: &str, depth: usize, body: &str) -> String {
    let home = "../".repeat(depth);
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n<p><a href=\"{home}index.html\">Home</a></p>\n<h1>{title}</h1>\n{body}</body>\n</html>\n",
        title = escape(title),
    )
}

fn render_index(suites: &[SuiteId], validations: &[ValidationId]) -> String {
    let mut body = String::from("<h2>Expectation Suites</h2>\n<ul>\n");
    for id in suites {
        let _ = writeln!(body, "<li><a href=\"{}\">{}</a></li>", suite_page(id), escape(&id.to_string()));
    }
    body.push_str("</ul>\n<h2>Validation Results</h2>\n<ul>\n");
    for id in validations {
        let _ = writeln!(
            body,
            "<li><a href=\"{}\">{} ({})</a></li>",
            validation_page(id),
            escape(&id.suite.to_string()),
            escape(&id.run_id)
        );
    }
    body.push_str("</ul>\n");
    page("Data Docs", 0, &body)
}

fn render_suite(id: &SuiteId, suite: &ExpectationSuite) -> String {
    let mut body = format!(
        "<p>Data asset: {}</p>\n<table>\n<tr><th>Expectation</th><th>Arguments</th></tr>\n",
        escape(&suite.data_asset_name)
    );
    for expectation in &suite.expectations {
        let _ = writeln!(
            body,
            "<tr><td>{}</td><td><code>{}</code></td></tr>",
            escape(&expectation.expectation_type),
            escape(&serde_json::Value::Object(expectation.kwargs.clone()).to_string())
        );
    }
    body.push_str("</table>\n");
    page(&suite.expectation_suite_name, id.depth(), &body)
}

fn render_validation(id: &ValidationId, result: &ValidationResult) -> String {
    let stats = &result.statistics;
    let mut body = format!(
        "<p>Run: {}</p>\n<p>Status: {}</p>\n<p>{} of {} expectations met ({:.1}%)</p>\n<table>\n<tr><th>Expectation</th><th>Success</th><th>Observed</th></tr>\n",
        escape(&id.run_id),
        if result.success { "Succeeded" } else { "Failed" },
        stats.successful_expectations,
        stats.evaluated_expectations,
        stats.success_percent,
    );
    for r in &result.results {
        let observed = r
            .result
            .get("observed_value")
            .map(ToString::to_string)
            .unwrap_or_default();
        let _ = writeln!(
            body,
            "<tr><td>{}</td><td>{}</td><td><code>{}</code></td></tr>",
            escape(&r.expectation_config.expectation_type),
            r.success,
            escape(&observed)
        );
    }
    body.push_str("</table>\n");
    page(&id.suite.to_string(), 2 + id.suite.depth(), &body)
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
