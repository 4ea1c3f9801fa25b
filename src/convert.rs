use std::path::PathBuf;

use crate::tool::{self, ToolError};

pub trait MarkupConverter {
    fn to_html(&self, markup: &str) -> Result<String, ToolError>;
}

#[derive(Debug, Clone)]
pub struct Pandoc {
    pub program: PathBuf,
}

impl Default for Pandoc {
    fn default() -> Self {
        Self {
            program: PathBuf::from("pandoc"),
        }
    }
}

impl Pandoc {
    pub fn probe(&self) -> Result<String, ToolError> {
        tool::probe_version(&self.program)
    }
}

impl MarkupConverter for Pandoc {
    fn to_html(&self, markup: &str) -> Result<String, ToolError> {
        let output = tool::run(
            &self.program,
            ["--from", "jira", "--to", "html"],
            markup.as_bytes(),
        )?;
        String::from_utf8(output.stdout).map_err(|_| ToolError::InvalidOutput {
            program: self.program.display().to_string(),
        })
    }
}
