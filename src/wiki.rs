//! MediaWiki access: media uploads and page text.
//!
//! The pipeline talks to the wiki through two traits:
//!
//! - [`MediaSink`]: upload a file with a description comment.
//! - [`PageStore`]: read and replace a page's wikitext.
//!
//! [`MediaWikiClient`] implements both against the Action API (`api.php`)
//! with a blocking `reqwest` client and a cookie jar:
//!
//! | Operation | API call |
//! |---|---|
//! | Login | `meta=tokens&type=login`, then `action=login` (bot password) |
//! | Edit token | `meta=tokens` → `csrftoken` |
//! | Upload | `action=upload`, multipart `file` part |
//! | Read page | `prop=revisions&rvslots=main&rvprop=content` |
//! | Write page | `action=edit` |
//!
//! All requests use `format=json&formatversion=2`. Response interpretation
//! lives in small pure functions so it can be tested without a server.

use crate::config::WikiConfig;
use reqwest::blocking::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum WikiError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),
    #[error("{info}")]
    Api { code: String, info: String },
    #[error("Login failed: {0}")]
    Login(String),
    #[error("Upload not accepted: {0}")]
    UploadWarning(String),
    #[error("Page {0:?} does not exist")]
    MissingPage(String),
    #[error("Unexpected API response: {0}")]
    UnexpectedResponse(String),
    #[error("No edit token; call connect() first")]
    NotConnected,
}

impl From<reqwest::Error> for WikiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || (e.is_request() && !e.is_timeout()) {
            WikiError::Connection(e.to_string())
        } else {
            WikiError::Http(e)
        }
    }
}

impl WikiError {
    /// True for failures where re-sending the same request may succeed.
    pub fn is_connection(&self) -> bool {
        matches!(self, WikiError::Connection(_))
    }
}

/// Extra fields sent with an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadMeta {
    /// File description page text / upload comment.
    pub comment: String,
    /// Re-upload over duplicate or existing-file warnings.
    pub ignore_warnings: bool,
}

/// Destination for uploaded media files.
pub trait MediaSink {
    fn upload(&self, filename: &str, bytes: &[u8], meta: &UploadMeta) -> Result<(), WikiError>;
}

/// Read/write access to page wikitext.
pub trait PageStore {
    fn read_page(&self, title: &str) -> Result<String, WikiError>;
    fn write_page(&self, title: &str, text: &str, summary: &str) -> Result<(), WikiError>;
}

/// Bot-password credentials (`User@BotName` + generated password).
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Blocking MediaWiki Action API client.
pub struct MediaWikiClient {
    api_url: String,
    client: reqwest::blocking::Client,
    csrf_token: Option<String>,
}

impl MediaWikiClient {
    pub fn new(config: &WikiConfig) -> Result<Self, WikiError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .cookie_store(true)
            .build()
            .map_err(WikiError::Http)?;

        Ok(Self {
            api_url: config.api_url.trim().to_string(),
            client,
            csrf_token: None,
        })
    }

    /// Log in (when credentials are given) and fetch the edit token.
    ///
    /// Without credentials the wiki hands out an anonymous token, which is
    /// only useful on wikis that allow anonymous uploads and edits.
    pub fn connect(&mut self, credentials: Option<&Credentials>) -> Result<(), WikiError> {
        if let Some(creds) = credentials {
            self.login(creds)?;
        }
        let tokens = self.get(&[("action", "query"), ("meta", "tokens")])?;
        self.csrf_token = Some(token_from(&tokens, "csrftoken")?);
        debug!("edit token acquired");
        Ok(())
    }

    fn login(&self, creds: &Credentials) -> Result<(), WikiError> {
        let tokens = self.get(&[("action", "query"), ("meta", "tokens"), ("type", "login")])?;
        let login_token = token_from(&tokens, "logintoken")?;

        let response = self.post_form(&[
            ("action", "login"),
            ("lgname", creds.username.as_str()),
            ("lgpassword", creds.password.as_str()),
            ("lgtoken", login_token.as_str()),
        ])?;
        check_login(&response)?;
        info!(user = %creds.username, "logged in");
        Ok(())
    }

    fn token(&self) -> Result<&str, WikiError> {
        self.csrf_token.as_deref().ok_or(WikiError::NotConnected)
    }

    fn get(&self, params: &[(&str, &str)]) -> Result<Value, WikiError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[("format", "json"), ("formatversion", "2")])
            .query(params)
            .send()?
            .error_for_status()?;
        check_api_error(response.json()?)
    }

    fn post_form(&self, params: &[(&str, &str)]) -> Result<Value, WikiError> {
        let mut form: Vec<(&str, &str)> = vec![("format", "json"), ("formatversion", "2")];
        form.extend_from_slice(params);
        let response = self
            .client
            .post(&self.api_url)
            .form(&form)
            .send()?
            .error_for_status()?;
        check_api_error(response.json()?)
    }
}

impl MediaSink for MediaWikiClient {
    fn upload(&self, filename: &str, bytes: &[u8], meta: &UploadMeta) -> Result<(), WikiError> {
        let token = self.token()?.to_string();
        let file = Part::bytes(bytes.to_vec())
            .file_name(filename.to_string())
            .mime_str("image/png")
            .map_err(WikiError::Http)?;
        let mut form = Form::new()
            .text("action", "upload")
            .text("format", "json")
            .text("formatversion", "2")
            .text("filename", filename.to_string())
            .text("comment", meta.comment.clone())
            .text("token", token);
        // Boolean API flags are true whenever present, whatever the value.
        if meta.ignore_warnings {
            form = form.text("ignorewarnings", "1");
        }
        let form = form.part("file", file);

        debug!(filename, size = bytes.len(), "uploading");
        let response = self
            .client
            .post(&self.api_url)
            .multipart(form)
            .send()?
            .error_for_status()?;
        check_upload(&check_api_error(response.json()?)?)
    }
}

impl PageStore for MediaWikiClient {
    fn read_page(&self, title: &str) -> Result<String, WikiError> {
        let response = self.get(&[
            ("action", "query"),
            ("prop", "revisions"),
            ("rvprop", "content"),
            ("rvslots", "main"),
            ("titles", title),
        ])?;
        page_content(&response, title)
    }

    fn write_page(&self, title: &str, text: &str, summary: &str) -> Result<(), WikiError> {
        let token = self.token()?;
        let response = self.post_form(&[
            ("action", "edit"),
            ("title", title),
            ("text", text),
            ("summary", summary),
            ("nocreate", "1"),
            ("token", token),
        ])?;
        check_edit(&response)
    }
}

// =============================================================================
// Response interpretation
// =============================================================================

#[derive(Deserialize)]
struct ApiErrorBody {
    code: String,
    info: String,
}

/// Turn a top-level `error` object into [`WikiError::Api`].
fn check_api_error(response: Value) -> Result<Value, WikiError> {
    match response.get("error") {
        Some(err) => {
            let body: ApiErrorBody = serde_json::from_value(err.clone()).unwrap_or(ApiErrorBody {
                code: "unknown".into(),
                info: "Unknown API error".into(),
            });
            Err(WikiError::Api {
                code: body.code,
                info: body.info,
            })
        }
        None => Ok(response),
    }
}

fn token_from(response: &Value, name: &str) -> Result<String, WikiError> {
    response
        .pointer(&format!("/query/tokens/{name}"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| WikiError::UnexpectedResponse(format!("missing {name}")))
}

fn check_login(response: &Value) -> Result<(), WikiError> {
    let login = response
        .get("login")
        .ok_or_else(|| WikiError::UnexpectedResponse("missing login result".into()))?;
    match login.get("result").and_then(Value::as_str) {
        Some("Success") => Ok(()),
        other => {
            let reason = login
                .get("reason")
                .and_then(Value::as_str)
                .or(other)
                .unwrap_or("unknown reason");
            Err(WikiError::Login(reason.to_string()))
        }
    }
}

fn check_upload(response: &Value) -> Result<(), WikiError> {
    let upload = response
        .get("upload")
        .ok_or_else(|| WikiError::UnexpectedResponse("missing upload result".into()))?;
    match upload.get("result").and_then(Value::as_str) {
        Some("Success") => Ok(()),
        Some("Warning") => {
            let warnings = upload
                .get("warnings")
                .and_then(Value::as_object)
                .map(|w| {
                    let mut keys: Vec<&str> = w.keys().map(String::as_str).collect();
                    keys.sort_unstable();
                    keys.join(", ")
                })
                .unwrap_or_else(|| "unspecified warning".to_string());
            Err(WikiError::UploadWarning(warnings))
        }
        other => Err(WikiError::UnexpectedResponse(format!(
            "upload result {}",
            other.unwrap_or("missing")
        ))),
    }
}

fn check_edit(response: &Value) -> Result<(), WikiError> {
    match response.pointer("/edit/result").and_then(Value::as_str) {
        Some("Success") => Ok(()),
        Some(other) => Err(WikiError::UnexpectedResponse(format!("edit result {other}"))),
        None => Err(WikiError::UnexpectedResponse("missing edit result".into())),
    }
}

fn page_content(response: &Value, title: &str) -> Result<String, WikiError> {
    let page = response
        .pointer("/query/pages/0")
        .ok_or_else(|| WikiError::UnexpectedResponse("missing pages".into()))?;
    if page.get("missing").is_some() || page.get("invalid").is_some() {
        return Err(WikiError::MissingPage(title.to_string()));
    }
    page.pointer("/revisions/0/slots/main/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| WikiError::UnexpectedResponse("missing page content".into()))
}
