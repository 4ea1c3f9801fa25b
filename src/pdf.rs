use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::logging;
use crate::tool::{self, ToolError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfOptions {
    pub enable_local_file_access: bool,
    pub keep_relative_links: bool,
    pub allow: PathBuf,
    pub cache_dir: PathBuf,
    pub encoding: String,
}

impl PdfOptions {
    pub fn for_export_dir(export_dir: &Path) -> Self {
        Self {
            enable_local_file_access: true,
            keep_relative_links: true,
            allow: export_dir.to_path_buf(),
            cache_dir: export_dir.to_path_buf(),
            encoding: "utf-8".to_string(),
        }
    }
}

pub trait PdfRenderer {
    fn render(&self, html: &str, output: &Path, options: &PdfOptions) -> Result<(), ToolError>;
}

#[derive(Debug, Clone)]
pub struct Wkhtmltopdf {
    pub program: PathBuf,
}

impl Default for Wkhtmltopdf {
    fn default() -> Self {
        Self {
            program: PathBuf::from("wkhtmltopdf"),
        }
    }
}

impl Wkhtmltopdf {
    pub fn probe(&self) -> Result<String, ToolError> {
        tool::probe_version(&self.program)
    }
}

impl PdfRenderer for Wkhtmltopdf {
    fn render(&self, html: &str, output: &Path, options: &PdfOptions) -> Result<(), ToolError> {
        let result = tool::run(
            &self.program,
            command_args(options, output),
            html.as_bytes(),
        )?;
        if !result.stderr.is_empty() {
            logging::debug(format!("wkhtmltopdf: {}", result.stderr));
        }
        Ok(())
    }
}

// The page is read from stdin (`-`).
fn command_args(options: &PdfOptions, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["--quiet".into()];
    if options.enable_local_file_access {
        args.push("--enable-local-file-access".into());
    }
    if options.keep_relative_links {
        args.push("--keep-relative-links".into());
    }
    args.push("--allow".into());
    args.push(options.allow.clone().into_os_string());
    args.push("--cache-dir".into());
    args.push(options.cache_dir.clone().into_os_string());
    args.push("--encoding".into());
    args.push(options.encoding.clone().into());
    args.push("-".into());
    args.push(output.as_os_str().to_owned());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_wkhtmltopdf_arguments() {
        let options = PdfOptions::for_export_dir(Path::new("/srv/export"));
        let args = command_args(&options, Path::new("/srv/export/P-1.pdf"));
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();

        assert_eq!(
            args,
            vec![
                "--quiet",
                "--enable-local-file-access",
                "--keep-relative-links",
                "--allow",
                "/srv/export",
                "--cache-dir",
                "/srv/export",
                "--encoding",
                "utf-8",
                "-",
                "/srv/export/P-1.pdf",
            ]
        );
    }

    #[test]
    fn disabled_switches_are_omitted() {
        let options = PdfOptions {
            enable_local_file_access: false,
            keep_relative_links: false,
            ..PdfOptions::for_export_dir(Path::new("out"))
        };
        let args = command_args(&options, Path::new("out/P-1.pdf"));
        assert!(!args.iter().any(|a| a == "--enable-local-file-access"));
        assert!(!args.iter().any(|a| a == "--keep-relative-links"));
    }

    #[test]
    fn missing_renderer_is_not_found() {
        let renderer = Wkhtmltopdf {
            program: PathBuf::from("/nonexistent/wkhtmltopdf"),
        };
        let err = renderer
            .render("<p>x</p>", Path::new("x.pdf"), &PdfOptions::for_export_dir(Path::new(".")))
            .expect_err("missing binary should fail");
        assert!(matches!(err, ToolError::NotFound { .. }));
    }
}
