use std::fmt;
use std::path::{Path, PathBuf};

use toml::{Table, Value};

use crate::logging;

pub const SETTINGS_FILE: &str = "settings.toml";
const LEGACY_SETTINGS_FILE: &str = "settings.ini";

pub const ACCESS_GROUP: &str = "JIRA_ACCESS";
pub const EXPORT_GROUP: &str = "EXPORT_OPTIONS";
pub const FILTER_GROUP: &str = "ISSUE_FILTER";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Flag,
}

#[derive(Debug, Clone, Copy)]
pub struct SettingDefault {
    pub group: &'static str,
    pub key: &'static str,
    pub default: &'static str,
    pub kind: ValueKind,
}

pub const DEFAULTS: &[SettingDefault] = &[
    SettingDefault {
        group: ACCESS_GROUP,
        key: "jira_base_url",
        default: "https://your_jira_instance/",
        kind: ValueKind::Text,
    },
    SettingDefault {
        group: ACCESS_GROUP,
        key: "jira_username",
        default: "your_jira@username",
        kind: ValueKind::Text,
    },
    SettingDefault {
        group: ACCESS_GROUP,
        key: "jira_api_token",
        default: "your_jira_api_token",
        kind: ValueKind::Text,
    },
    SettingDefault {
        group: EXPORT_GROUP,
        key: "export_path",
        default: "EXPORT",
        kind: ValueKind::Text,
    },
    SettingDefault {
        group: EXPORT_GROUP,
        key: "save_to_html",
        default: "True",
        kind: ValueKind::Flag,
    },
    SettingDefault {
        group: EXPORT_GROUP,
        key: "save_to_pdf",
        default: "True",
        kind: ValueKind::Flag,
    },
    SettingDefault {
        group: FILTER_GROUP,
        key: "jira_project",
        default: "TEST",
        kind: ValueKind::Text,
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub jira_base_url: String,
    pub jira_username: String,
    pub jira_api_token: String,
    pub export_path: PathBuf,
    pub save_to_html: bool,
    pub save_to_pdf: bool,
    pub jira_project: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionReason {
    Missing,
    NotText,
    NotBoolean,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub group: &'static str,
    pub key: &'static str,
    pub reason: CorrectionReason,
}

impl fmt::Display for Correction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.reason {
            CorrectionReason::Missing => "missing",
            CorrectionReason::NotText => "not a string",
            CorrectionReason::NotBoolean => "not a boolean",
        };
        write!(f, "{}.{} ({}), default written", self.group, self.key, reason)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "{} was created or updated with default values ({}). Review it and rerun",
        .path.display(),
        describe(.corrections)
    )]
    NeedsReview {
        path: PathBuf,
        corrections: Vec<Correction>,
    },
    #[error("failed to read settings file at {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse TOML settings at {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to write settings file at {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid settings: {0}")]
    Invalid(String),
}

fn describe(corrections: &[Correction]) -> String {
    corrections
        .iter()
        .map(|c| format!("{}.{}", c.group, c.key))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn load() -> Result<Settings, ConfigError> {
    load_from(Path::new(SETTINGS_FILE))
}

/// Loads settings from `path`, filling in defaults. When any key had to be
/// added or reset the merged file is written back and
/// [`ConfigError::NeedsReview`] is returned instead of the settings.
pub fn load_from(path: &Path) -> Result<Settings, ConfigError> {
    let mut doc = match std::fs::read_to_string(path) {
        Ok(raw) => toml::from_str::<Table>(&raw).map_err(|source| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source,
        })?,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            logging::debug(format!("no settings file at {}", path.display()));
            if let Some(hint) = legacy_settings_hint(path) {
                logging::warn(hint);
            }
            Table::new()
        }
        Err(source) => {
            return Err(ConfigError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let corrections = apply_defaults(&mut doc);
    if !corrections.is_empty() {
        for correction in &corrections {
            logging::warn(format!("settings: {correction}"));
        }
        save(path, &doc)?;
        return Err(ConfigError::NeedsReview {
            path: path.to_path_buf(),
            corrections,
        });
    }

    Settings::from_table(&doc)
}

pub fn apply_defaults(doc: &mut Table) -> Vec<Correction> {
    let mut corrections = Vec::new();

    for entry in DEFAULTS {
        if !matches!(doc.get(entry.group), Some(Value::Table(_))) {
            doc.insert(entry.group.to_string(), Value::Table(Table::new()));
        }
        let Some(Value::Table(group)) = doc.get_mut(entry.group) else {
            continue;
        };

        let reason = match group.get(entry.key) {
            None => Some(CorrectionReason::Missing),
            Some(value) => match entry.kind {
                ValueKind::Text if !value.is_str() => Some(CorrectionReason::NotText),
                ValueKind::Flag if parse_flag(value).is_none() => {
                    Some(CorrectionReason::NotBoolean)
                }
                _ => None,
            },
        };

        if let Some(reason) = reason {
            group.insert(
                entry.key.to_string(),
                Value::String(entry.default.to_string()),
            );
            corrections.push(Correction {
                group: entry.group,
                key: entry.key,
                reason,
            });
        }
    }

    corrections
}

pub fn parse_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Boolean(flag) => Some(*flag),
        Value::String(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "yes" | "true" | "on" => Some(true),
            "0" | "no" | "false" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn legacy_settings_hint(path: &Path) -> Option<String> {
    let legacy = path.with_file_name(LEGACY_SETTINGS_FILE);
    legacy.is_file().then(|| {
        format!(
            "{} is no longer read; move its values into {}",
            legacy.display(),
            path.display()
        )
    })
}

fn save(path: &Path, doc: &Table) -> Result<(), ConfigError> {
    let rendered = toml::to_string(doc)?;
    std::fs::write(path, rendered).map_err(|source| ConfigError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })?;
    logging::info(format!("wrote settings to {}", path.display()));
    Ok(())
}

impl Settings {
    fn from_table(doc: &Table) -> Result<Self, ConfigError> {
        Ok(Self {
            jira_base_url: text(doc, ACCESS_GROUP, "jira_base_url")?,
            jira_username: text(doc, ACCESS_GROUP, "jira_username")?,
            jira_api_token: text(doc, ACCESS_GROUP, "jira_api_token")?,
            export_path: PathBuf::from(text(doc, EXPORT_GROUP, "export_path")?),
            save_to_html: flag(doc, EXPORT_GROUP, "save_to_html")?,
            save_to_pdf: flag(doc, EXPORT_GROUP, "save_to_pdf")?,
            jira_project: text(doc, FILTER_GROUP, "jira_project")?,
        })
    }
}

fn lookup<'a>(doc: &'a Table, group: &str, key: &str) -> Result<&'a Value, ConfigError> {
    doc.get(group)
        .and_then(Value::as_table)
        .and_then(|g| g.get(key))
        .ok_or_else(|| ConfigError::Invalid(format!("{group}.{key} is missing")))
}

fn text(doc: &Table, group: &str, key: &str) -> Result<String, ConfigError> {
    lookup(doc, group, key)?
        .as_str()
        .map(ToString::to_string)
        .ok_or_else(|| ConfigError::Invalid(format!("{group}.{key} must be a string")))
}

fn flag(doc: &Table, group: &str, key: &str) -> Result<bool, ConfigError> {
    parse_flag(lookup(doc, group, key)?)
        .ok_or_else(|| ConfigError::Invalid(format!("{group}.{key} must be a boolean")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPLETE: &str = r#"
[JIRA_ACCESS]
jira_base_url = "https://example.atlassian.net"
jira_username = "you@example.com"
jira_api_token = "token"

[EXPORT_OPTIONS]
export_path = "out"
save_to_html = "False"
save_to_pdf = true

[ISSUE_FILTER]
jira_project = "PROJ"
"#;

    fn settings_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join(SETTINGS_FILE)
    }

    #[test]
    fn missing_file_writes_defaults_and_requests_review() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = settings_path(&dir);

        let err = load_from(&path).expect_err("first load must stop for review");
        match err {
            ConfigError::NeedsReview { corrections, .. } => {
                assert_eq!(corrections.len(), DEFAULTS.len());
                assert!(corrections
                    .iter()
                    .all(|c| c.reason == CorrectionReason::Missing));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(path.is_file());

        let settings = load_from(&path).expect("second load should succeed");
        assert_eq!(settings.jira_base_url, "https://your_jira_instance/");
        assert_eq!(settings.jira_username, "your_jira@username");
        assert_eq!(settings.jira_api_token, "your_jira_api_token");
        assert_eq!(settings.export_path, PathBuf::from("EXPORT"));
        assert!(settings.save_to_html);
        assert!(settings.save_to_pdf);
        assert_eq!(settings.jira_project, "TEST");
    }

    #[test]
    fn written_defaults_use_literal_true() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = settings_path(&dir);
        let _ = load_from(&path);

        let raw = std::fs::read_to_string(&path).expect("read back");
        assert!(raw.contains("[JIRA_ACCESS]"));
        assert!(raw.contains("[EXPORT_OPTIONS]"));
        assert!(raw.contains("[ISSUE_FILTER]"));
        assert!(raw.contains(r#"save_to_html = "True""#));
    }

    #[test]
    fn partial_file_keeps_existing_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = settings_path(&dir);
        std::fs::write(
            &path,
            "[JIRA_ACCESS]\njira_base_url = \"https://mine.atlassian.net\"\n",
        )
        .expect("write");

        let err = load_from(&path).expect_err("missing keys must be reviewed");
        let ConfigError::NeedsReview { corrections, .. } = err else {
            panic!("expected NeedsReview");
        };
        assert_eq!(corrections.len(), DEFAULTS.len() - 1);
        assert!(!corrections.iter().any(|c| c.key == "jira_base_url"));

        let settings = load_from(&path).expect("complete after rewrite");
        assert_eq!(settings.jira_base_url, "https://mine.atlassian.net");
        assert_eq!(settings.jira_project, "TEST");
    }

    #[test]
    fn invalid_boolean_is_reset_to_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = settings_path(&dir);
        let broken = COMPLETE.replace("save_to_html = \"False\"", "save_to_html = \"maybe\"");
        std::fs::write(&path, broken).expect("write");

        let err = load_from(&path).expect_err("bad boolean must be reviewed");
        let ConfigError::NeedsReview { corrections, .. } = err else {
            panic!("expected NeedsReview");
        };
        assert_eq!(
            corrections,
            vec![Correction {
                group: EXPORT_GROUP,
                key: "save_to_html",
                reason: CorrectionReason::NotBoolean,
            }]
        );

        let settings = load_from(&path).expect("second load succeeds");
        assert!(settings.save_to_html);
        assert_eq!(settings.jira_project, "PROJ");
    }

    #[test]
    fn non_string_text_value_is_reset() {
        let raw = COMPLETE.replace("jira_project = \"PROJ\"", "jira_project = 7");
        let mut doc: Table = toml::from_str(&raw).expect("toml should parse");
        let corrections = apply_defaults(&mut doc);
        assert_eq!(corrections.len(), 1);
        assert_eq!(corrections[0].reason, CorrectionReason::NotText);
    }

    #[test]
    fn complete_file_loads_without_rewrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = settings_path(&dir);
        std::fs::write(&path, COMPLETE).expect("write");

        let settings = load_from(&path).expect("complete file loads");
        assert_eq!(settings.jira_base_url, "https://example.atlassian.net");
        assert_eq!(settings.export_path, PathBuf::from("out"));
        assert!(!settings.save_to_html);
        assert!(settings.save_to_pdf);

        let raw = std::fs::read_to_string(&path).expect("read back");
        assert_eq!(raw, COMPLETE);
    }

    #[test]
    fn unparsable_file_is_left_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = settings_path(&dir);
        std::fs::write(&path, "[JIRA_ACCESS\njira_base_url = ").expect("write");

        let err = load_from(&path).expect_err("broken toml should fail");
        assert!(matches!(err, ConfigError::ParseFailed { .. }));
        let raw = std::fs::read_to_string(&path).expect("read back");
        assert_eq!(raw, "[JIRA_ACCESS\njira_base_url = ");
    }

    #[test]
    fn parses_ini_style_flags() {
        for (raw, expected) in [
            ("yes", true),
            ("On", true),
            ("1", true),
            ("off", false),
            ("NO", false),
            ("0", false),
        ] {
            assert_eq!(
                parse_flag(&Value::String(raw.into())),
                Some(expected),
                "{raw}"
            );
        }
        assert_eq!(parse_flag(&Value::Boolean(false)), Some(false));
        assert_eq!(parse_flag(&Value::Integer(1)), None);
        assert_eq!(parse_flag(&Value::String("maybe".into())), None);
    }

    #[test]
    fn leftover_ini_file_produces_a_hint() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = settings_path(&dir);
        assert_eq!(legacy_settings_hint(&path), None);

        std::fs::write(dir.path().join("settings.ini"), "[JIRA_ACCESS]
").expect("write");
        let hint = legacy_settings_hint(&path).expect("hint for settings.ini");
        assert!(hint.contains("settings.ini is no longer read"));
        assert!(hint.contains(SETTINGS_FILE));

        let err = load_from(&path).expect_err("defaults still written");
        assert!(matches!(err, ConfigError::NeedsReview { .. }));
    }

    #[test]
    fn group_that_is_not_a_table_is_rebuilt() {
        let mut doc: Table =
            toml::from_str("ISSUE_FILTER = \"PROJ\"").expect("toml should parse");
        let corrections = apply_defaults(&mut doc);
        assert!(corrections
            .iter()
            .any(|c| c.group == FILTER_GROUP && c.key == "jira_project"));
        assert!(doc.get(FILTER_GROUP).and_then(Value::as_table).is_some());
    }
}
