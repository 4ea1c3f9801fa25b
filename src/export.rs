use std::path::{Component, Path, PathBuf};

use crate::config::{ConfigError, Settings};
use crate::convert::MarkupConverter;
use crate::jira::{Issue, IssueTracker, JiraClient, JiraError, PAGE_SIZE};
use crate::logging;
use crate::markup::{normalize_image_sources, LinkStyle};
use crate::pdf::{PdfOptions, PdfRenderer};
use crate::render::render_issue_html;
use crate::tool::ToolError;

pub const ATTACHMENT_ERROR_SUFFIX: &str = "ATT_ERROR";
pub const PDF_ERROR_SUFFIX: &str = "ERROR.pdf";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{} exists and is not a directory; remove the file or change export_path", .0.display())]
    PathConflict(PathBuf),
    #[error("failed to create export directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("incorrect jira url format: {0}")]
    InvalidServerAddress(String),
    #[error("cannot connect to jira; check jira_base_url: {0}")]
    UnreachableServer(#[source] JiraError),
    #[error("failed to authenticate with jira: {0}")]
    AuthenticationFailed(#[source] JiraError),
    #[error("failed to find issues for project {project}: {source}")]
    IssueQueryFailed { project: String, source: JiraError },
    #[error("failed to convert markup of {issue}: {source}")]
    Conversion { issue: String, source: ToolError },
    #[error("markup converter unavailable: {0}")]
    MissingConverter(#[source] ToolError),
    #[error("failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ExportError {
    pub fn exit_code(&self) -> u8 {
        match self {
            ExportError::Config(ConfigError::NeedsReview { .. })
            | ExportError::MissingConverter(_) => 0,
            _ => 1,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub pages: usize,
    pub issues: usize,
    pub html_written: usize,
    pub pdf_written: usize,
    pub attachments_written: usize,
    pub attachment_failures: usize,
    pub pdf_failures: usize,
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub export_dir: PathBuf,
    pub project: String,
    pub save_to_html: bool,
    pub save_to_pdf: bool,
    pub page_size: usize,
}

impl ExportOptions {
    pub fn from_settings(settings: &Settings, export_dir: PathBuf) -> Self {
        Self {
            export_dir,
            project: settings.jira_project.clone(),
            save_to_html: settings.save_to_html,
            save_to_pdf: settings.save_to_pdf,
            page_size: PAGE_SIZE,
        }
    }
}

pub fn prepare_export_dir(path: &Path) -> Result<(), ExportError> {
    if path.exists() {
        if !path.is_dir() {
            return Err(ExportError::PathConflict(path.to_path_buf()));
        }
        return Ok(());
    }

    std::fs::create_dir_all(path).map_err(|source| ExportError::CreateDir {
        path: path.to_path_buf(),
        source,
    })?;
    logging::info(format!("created export folder {}", path.display()));
    Ok(())
}

pub fn connect(settings: &Settings) -> Result<JiraClient, ExportError> {
    let client = JiraClient::new(
        settings.jira_base_url.clone(),
        settings.jira_username.clone(),
        settings.jira_api_token.clone(),
    )
    .map_err(|err| match err {
        JiraError::InvalidBaseUrl(url) => ExportError::InvalidServerAddress(url),
        other => ExportError::UnreachableServer(other),
    })?;

    client.check_reachable().map_err(|err| match err {
        JiraError::InvalidBaseUrl(url) => ExportError::InvalidServerAddress(url),
        other => ExportError::UnreachableServer(other),
    })?;

    let me = client
        .get_myself()
        .map_err(ExportError::AuthenticationFailed)?;
    logging::info(format!(
        "authenticated to {} as display_name={:?} email={:?}",
        client.base_url, me.display_name, me.email_address
    ));
    Ok(client)
}

pub struct Exporter<'a, T: ?Sized, C: ?Sized, R: ?Sized> {
    tracker: &'a T,
    converter: &'a C,
    renderer: &'a R,
    options: ExportOptions,
}

impl<'a, T, C, R> Exporter<'a, T, C, R>
where
    T: IssueTracker + ?Sized,
    C: MarkupConverter + ?Sized,
    R: PdfRenderer + ?Sized,
{
    pub fn new(tracker: &'a T, converter: &'a C, renderer: &'a R, options: ExportOptions) -> Self {
        Self {
            tracker,
            converter,
            renderer,
            options,
        }
    }

    // Offsets are only stable while nobody creates or deletes issues in the
    // project; a concurrent change can skip or repeat an issue.
    pub fn run(&self) -> Result<ExportSummary, ExportError> {
        let mut summary = ExportSummary::default();
        let mut start_at = 0;

        loop {
            let page = self
                .tracker
                .search_issues(&self.options.project, start_at, self.options.page_size)
                .map_err(|source| ExportError::IssueQueryFailed {
                    project: self.options.project.clone(),
                    source,
                })?;
            if page.is_empty() {
                break;
            }

            summary.pages += 1;
            logging::debug(format!(
                "page at offset {} holds {} issues",
                start_at,
                page.len()
            ));

            for issue in &page {
                self.export_issue(issue, &mut summary)?;
                summary.issues += 1;
            }

            start_at += self.options.page_size;
        }

        if summary.issues == 0 {
            logging::warn(format!(
                "project {} returned zero issues; verify the project key and Browse Project permission",
                self.options.project
            ));
        }
        Ok(summary)
    }

    pub fn export_issue(
        &self,
        issue: &Issue,
        summary: &mut ExportSummary,
    ) -> Result<(), ExportError> {
        let attachments = self.download_attachments(issue, summary);
        let html = render_issue_html(issue, &attachments, self.converter).map_err(|source| {
            ExportError::Conversion {
                issue: issue.key.clone(),
                source,
            }
        })?;

        let dir = &self.options.export_dir;
        if self.options.save_to_html {
            let page = normalize_image_sources(&html, dir, &issue.key, LinkStyle::Relative);
            let path = dir.join(format!("{}.html", issue.key));
            std::fs::write(&path, page).map_err(|source| ExportError::WriteFailed {
                path: path.clone(),
                source,
            })?;
            summary.html_written += 1;
            logging::info(format!("HTML generated for {}", issue.key));
        }

        if self.options.save_to_pdf {
            let page = normalize_image_sources(&html, dir, &issue.key, LinkStyle::Absolute);
            if self.write_pdf(&issue.key, &page)? {
                summary.pdf_written += 1;
                logging::info(format!("PDF generated for {}", issue.key));
            } else {
                summary.pdf_failures += 1;
            }
        }

        Ok(())
    }

    pub fn download_attachments(&self, issue: &Issue, summary: &mut ExportSummary) -> Vec<String> {
        let dir = &self.options.export_dir;
        let marker = dir.join(format!("{}-{}", issue.key, ATTACHMENT_ERROR_SUFFIX));
        let mut saved = Vec::new();

        for attachment in &issue.attachments {
            let content = match self.tracker.fetch_attachment(attachment) {
                Ok(content) => content,
                Err(err) => {
                    logging::warn(format!(
                        "failed to download attachment {} for {}: {}",
                        attachment.filename, issue.key, err
                    ));
                    summary.attachment_failures += 1;
                    write_marker(&marker, &[]);
                    continue;
                }
            };

            let name = format!("{}-{}", issue.key, attachment.filename);
            match save_attachment(dir, &name, &content) {
                Ok(()) => {
                    logging::info(format!(
                        "attachment {} for issue {} downloaded",
                        attachment.filename, issue.key
                    ));
                    summary.attachments_written += 1;
                    saved.push(name);
                }
                Err(err) => {
                    logging::warn(format!(
                        "cannot save attachment {:?} for {}: {}; writing {}",
                        attachment.filename,
                        issue.key,
                        err,
                        marker.display()
                    ));
                    summary.attachment_failures += 1;
                    write_marker(&marker, &content);
                }
            }
        }

        saved
    }

    // Ok(false): rendering failed and the placeholder was written instead.
    fn write_pdf(&self, key: &str, html: &str) -> Result<bool, ExportError> {
        let dir = &self.options.export_dir;
        let output = dir.join(format!("{key}.pdf"));
        let options = PdfOptions::for_export_dir(dir);

        match self.renderer.render(html, &output, &options) {
            Ok(()) => Ok(true),
            Err(err) => {
                let placeholder = dir.join(format!("{key}-{PDF_ERROR_SUFFIX}"));
                logging::warn(format!(
                    "PDF rendering failed for {}: {}; writing {}",
                    key,
                    err,
                    placeholder.display()
                ));
                std::fs::write(&placeholder, "ERROR").map_err(|source| {
                    ExportError::WriteFailed {
                        path: placeholder.clone(),
                        source,
                    }
                })?;
                Ok(false)
            }
        }
    }
}

fn save_attachment(dir: &Path, name: &str, content: &[u8]) -> std::io::Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => std::fs::write(dir.join(name), content),
        _ => Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "attachment name is not a plain file name",
        )),
    }
}

fn write_marker(path: &Path, content: &[u8]) {
    if let Err(err) = std::fs::write(path, content) {
        logging::error(format!(
            "failed to write attachment marker {}: {}",
            path.display(),
            err
        ));
    }
}
