use std::io;
use std::process::ExitCode;

use jira_export::config::{self, SETTINGS_FILE};
use jira_export::convert::Pandoc;
use jira_export::export::{self, ExportError, ExportOptions, Exporter};
use jira_export::logging;
use jira_export::markup::absolute_path;
use jira_export::pdf::Wkhtmltopdf;
use jira_export::prompt;

fn run() -> Result<(), ExportError> {
    let settings = config::load()?;

    let pandoc = Pandoc::default();
    let version = pandoc.probe().map_err(ExportError::MissingConverter)?;
    logging::info(format!("using {}", version));

    let renderer = Wkhtmltopdf::default();
    let mut save_to_pdf = settings.save_to_pdf;
    if save_to_pdf {
        match renderer.probe() {
            Ok(version) => logging::info(format!("using {}", version)),
            Err(err) => {
                logging::warn(format!(
                    "{}; export to PDF is disabled for this run",
                    err
                ));
                save_to_pdf = false;
            }
        }
    }

    let question = format!(
        "Program will begin to export issues from JIRA based on values provided in {}. Continue? [y/n] :",
        SETTINGS_FILE
    );
    let confirmed = prompt::confirm(&mut io::stdin().lock(), &mut io::stdout(), &question)
        .unwrap_or_else(|err| {
            logging::warn(format!("failed to read answer: {}", err));
            false
        });
    if !confirmed {
        println!("Aborted");
        return Ok(());
    }

    export::prepare_export_dir(&settings.export_path)?;
    let export_dir = absolute_path(&settings.export_path);

    let client = export::connect(&settings)?;

    let mut options = ExportOptions::from_settings(&settings, export_dir);
    options.save_to_pdf = save_to_pdf;
    logging::info(format!(
        "exporting project {} to {} html={} pdf={}",
        options.project,
        options.export_dir.display(),
        options.save_to_html,
        options.save_to_pdf
    ));

    let summary = Exporter::new(&client, &pandoc, &renderer, options).run()?;
    logging::info(format!(
        "export finished issues={} pages={} html={} pdf={} attachments={} attachment_errors={} pdf_errors={}",
        summary.issues,
        summary.pages,
        summary.html_written,
        summary.pdf_written,
        summary.attachments_written,
        summary.attachment_failures,
        summary.pdf_failures
    ));
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            if code == 0 {
                logging::info(err.to_string());
            } else {
                logging::error(err.to_string());
            }
            ExitCode::from(code)
        }
    }
}
