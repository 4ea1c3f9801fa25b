use std::net::ToSocketAddrs;

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;

use crate::logging;

pub const PAGE_SIZE: usize = 50;

const SEARCH_FIELDS: &str = "summary,description,comment,attachment";

#[derive(Debug, Clone)]
pub struct JiraIdentity {
    pub account_id: Option<String>,
    pub display_name: Option<String>,
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueComment {
    pub author_display_name: Option<String>,
    pub created: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub key: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub comments: Vec<IssueComment>,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, thiserror::Error)]
pub enum JiraError {
    #[error("jira request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("jira returned HTTP {status}: {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("failed to decode jira response: {source}; body: {body}")]
    Decode {
        source: serde_json::Error,
        body: String,
    },
    #[error("invalid jira base url '{0}'")]
    InvalidBaseUrl(String),
    #[error("cannot resolve jira host '{host}': {source}")]
    Unreachable {
        host: String,
        source: std::io::Error,
    },
}

pub trait IssueTracker {
    fn search_issues(
        &self,
        project: &str,
        start_at: usize,
        max_results: usize,
    ) -> Result<Vec<Issue>, JiraError>;

    fn fetch_attachment(&self, attachment: &Attachment) -> Result<Vec<u8>, JiraError>;
}

#[derive(Debug, Clone)]
pub struct JiraClient {
    pub base_url: String,
    pub email: String,
    pub api_token: String,
    pub http: Client,
}

impl JiraClient {
    pub fn new(base_url: String, email: String, api_token: String) -> Result<Self, JiraError> {
        let http = Client::builder().build()?;
        let normalized_base_url = normalize_base_url(&base_url)?;
        Ok(Self {
            base_url: normalized_base_url,
            email,
            api_token,
            http,
        })
    }

    pub fn check_reachable(&self) -> Result<(), JiraError> {
        let url = reqwest::Url::parse(&self.base_url)
            .map_err(|_| JiraError::InvalidBaseUrl(self.base_url.clone()))?;
        let host = url
            .host_str()
            .ok_or_else(|| JiraError::InvalidBaseUrl(self.base_url.clone()))?
            .to_string();
        let port = url.port_or_known_default().unwrap_or(443);

        let mut addrs = (host.as_str(), port)
            .to_socket_addrs()
            .map_err(|source| JiraError::Unreachable {
                host: host.clone(),
                source,
            })?;
        match addrs.next() {
            Some(addr) => {
                logging::debug(format!("jira host {} resolved to {}", host, addr));
                Ok(())
            }
            None => Err(JiraError::Unreachable {
                host,
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no addresses returned",
                ),
            }),
        }
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.http
            .get(url)
            .basic_auth(&self.email, Some(&self.api_token))
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, JiraError> {
        let response = request.send()?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            logging::warn(format!("jira request completed with status {}", status));
            return Err(JiraError::Http { status, body });
        }
        Ok(response)
    }

    // Jira accepts anonymous requests on many endpoints; only this one proves
    // the credentials.
    pub fn get_myself(&self) -> Result<JiraIdentity, JiraError> {
        let url = format!("{}/rest/api/2/myself", self.base_url);
        let response = self.send(self.get(&url))?;

        let body = response.text()?;
        let payload: MyselfResponse =
            serde_json::from_str(&body).map_err(|source| JiraError::Decode { source, body })?;

        Ok(JiraIdentity {
            account_id: payload.account_id,
            display_name: payload.display_name,
            email_address: payload.email_address,
        })
    }
}

impl IssueTracker for JiraClient {
    fn search_issues(
        &self,
        project: &str,
        start_at: usize,
        max_results: usize,
    ) -> Result<Vec<Issue>, JiraError> {
        let url = format!("{}/rest/api/2/search", self.base_url);
        let jql = format!("project={}", project);
        let response = self.send(self.get(&url).query(&[
            ("jql", jql.clone()),
            ("startAt", start_at.to_string()),
            ("maxResults", max_results.to_string()),
            ("fields", SEARCH_FIELDS.to_string()),
        ]))?;

        let body = response.text()?;
        let payload: SearchResponse = serde_json::from_str(&body).map_err(|source| {
            let short_body = shorten(&body, 1000);
            logging::warn(format!(
                "failed decoding Jira search response for project {}: {}",
                project, short_body
            ));
            JiraError::Decode {
                source,
                body: short_body,
            }
        })?;

        logging::debug(format!(
            "jira search jql='{}' start_at={} page_count={} total={:?}",
            jql,
            start_at,
            payload.issues.len(),
            payload.total
        ));

        Ok(payload.issues.into_iter().map(Issue::from).collect())
    }

    fn fetch_attachment(&self, attachment: &Attachment) -> Result<Vec<u8>, JiraError> {
        let response = self.send(self.get(&attachment.content_url))?;
        Ok(response.bytes()?.to_vec())
    }
}

fn shorten(body: &str, limit: usize) -> String {
    match body.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

// Scheme slips seen in hand-edited settings, mapped to the scheme they meant.
const SCHEME_TYPOS: [(&str, &str); 4] = [
    ("https://https//", "https://"),
    ("http://http//", "http://"),
    ("https//", "https://"),
    ("http//", "http://"),
];

pub fn normalize_base_url(raw: &str) -> Result<String, JiraError> {
    let invalid = || JiraError::InvalidBaseUrl(raw.to_string());
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }

    let candidate = SCHEME_TYPOS
        .iter()
        .find_map(|(typo, scheme)| trimmed.strip_prefix(typo).map(|rest| format!("{scheme}{rest}")))
        .unwrap_or_else(|| {
            if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
                trimmed.to_string()
            } else {
                format!("https://{trimmed}")
            }
        });

    let url = reqwest::Url::parse(&candidate).map_err(|_| invalid())?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url.as_str().trim_end_matches('/').to_string()),
        _ => Err(invalid()),
    }
}

impl From<SearchIssue> for Issue {
    fn from(issue: SearchIssue) -> Self {
        let fields = issue.fields;
        let comments = fields
            .comment
            .map(|c| {
                c.comments
                    .into_iter()
                    .map(|comment| IssueComment {
                        author_display_name: comment.author.and_then(|a| a.display_name),
                        created: comment.created,
                        body: comment.body.unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        let attachments = fields
            .attachment
            .into_iter()
            .map(|a| Attachment {
                filename: a.filename,
                content_url: a.content,
            })
            .collect();

        Issue {
            key: issue.key,
            summary: fields.summary,
            description: fields.description.filter(|d| !d.trim().is_empty()),
            comments,
            attachments,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total: Option<usize>,
    #[serde(default)]
    issues: Vec<SearchIssue>,
}

#[derive(Debug, Deserialize)]
struct SearchIssue {
    key: String,
    fields: IssueFields,
}

#[derive(Debug, Deserialize)]
struct IssueFields {
    summary: Option<String>,
    description: Option<String>,
    comment: Option<CommentContainer>,
    #[serde(default)]
    attachment: Vec<AttachmentObj>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserObj {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentContainer {
    #[serde(default)]
    comments: Vec<CommentObj>,
}

#[derive(Debug, Deserialize)]
struct CommentObj {
    author: Option<UserObj>,
    body: Option<String>,
    created: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AttachmentObj {
    filename: String,
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MyselfResponse {
    account_id: Option<String>,
    display_name: Option<String>,
    email_address: Option<String>,
}
