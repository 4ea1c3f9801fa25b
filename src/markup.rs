use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::logging;

pub const IMAGE_WIDTH: u32 = 300;
pub const IMAGE_HEIGHT: u32 = 200;

const REMOTE_SCHEMES: [&str; 3] = ["http://", "https://", "file://"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStyle {
    Relative,
    // wkhtmltopdf reads the page from stdin and has no base to resolve against.
    Absolute,
}

fn image_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"<img\s+[^>]*src="([^"]+)"[^>]*>"#).expect("image pattern is valid")
    })
}

/// Points every `<img>` source that is not `http://`, `https://` or `file://`
/// at `{issue_key}-{src}` and pins the size to 300x200. The pass is only a
/// no-op on its own output once no unrewritten local sources remain.
pub fn normalize_image_sources(
    html: &str,
    export_dir: &Path,
    issue_key: &str,
    style: LinkStyle,
) -> String {
    image_pattern()
        .replace_all(html, |caps: &Captures<'_>| {
            let src = &caps[1];
            if is_remote(src) {
                return caps[0].to_string();
            }

            let file_name = format!("{issue_key}-{src}");
            let rewritten = match style {
                LinkStyle::Relative => file_name,
                LinkStyle::Absolute => absolute_path(&export_dir.join(&file_name))
                    .display()
                    .to_string(),
            };
            logging::debug(format!("image source {src} -> {rewritten}"));
            format!(r#"<img src="{rewritten}" width="{IMAGE_WIDTH}" height="{IMAGE_HEIGHT}">"#)
        })
        .into_owned()
}

fn is_remote(src: &str) -> bool {
    REMOTE_SCHEMES.iter().any(|scheme| src.starts_with(scheme))
}

pub fn absolute_path(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(err) => {
                logging::warn(format!(
                    "cannot resolve working directory for {}: {}",
                    path.display(),
                    err
                ));
                path.to_path_buf()
            }
        }
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
