use chrono::DateTime;

use crate::convert::MarkupConverter;
use crate::jira::Issue;
use crate::tool::ToolError;

const EMPTY_DESCRIPTION: &str = "DESCRIPTION EMPTY";

// Image sources are left as the converter produced them; each sink normalizes
// them for its own output.
pub fn render_issue_html<C: MarkupConverter + ?Sized>(
    issue: &Issue,
    attachments: &[String],
    converter: &C,
) -> Result<String, ToolError> {
    let summary = issue.summary.clone().unwrap_or_default();
    let description = match issue.description.as_deref() {
        Some(markup) => converter.to_html(markup)?,
        None => EMPTY_DESCRIPTION.to_string(),
    };

    let mut out = String::new();
    out.push_str(&format!("<h1>{}</h1><h2>{}</h2>{}", issue.key, summary, description));

    out.push_str("<h3>COMMENTS:</h3>");
    for comment in &issue.comments {
        let created = comment
            .created
            .as_deref()
            .map(format_timestamp)
            .unwrap_or_else(|| "Unknown".to_string());
        let author = comment
            .author_display_name
            .clone()
            .unwrap_or_else(|| "Unknown".to_string());
        let body = converter.to_html(&comment.body)?;

        out.push_str(&format!("{} <br> {} <br>{} <br>", created, author, body));
    }

    out.push_str("<h3>ATTACHMENTS:</h3>");
    for name in attachments {
        out.push_str(&format!(r#"<a href="{name}">{name}</a><br>"#));
    }

    Ok(out)
}

/// Shortens Jira timestamps (`2026-02-21T01:00:00.000+0000`) to minutes.
pub fn format_timestamp(raw: &str) -> String {
    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}
