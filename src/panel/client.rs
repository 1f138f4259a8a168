//! Shared HTTP client for the panel.
//!
//! One `reqwest::Client` for the whole process, 8 s per-request timeout,
//! redirects followed (the session id appears in the final URL after login).
//! Bodies are decoded lossily as UTF-8 regardless of the declared charset —
//! the panel lies about its encoding on some firmware. The cookie jar is
//! injected on every request and re-saved best-effort after every successful
//! one.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::header::COOKIE;
use url::Url;

use crate::core::config::{ConfigError, SpcConfig};
use crate::panel::cookies::CookieJar;
use crate::panel::PanelError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

/// A fetched panel page: decoded body plus the final URL after redirects.
#[derive(Debug, Clone)]
pub struct Page {
    pub final_url: Url,
    pub status: u16,
    pub body: String,
}

pub struct PanelClient {
    http: reqwest::Client,
    base: Url,
    jar: Mutex<CookieJar>,
    jar_path: PathBuf,
}

impl PanelClient {
    pub fn new(config: &SpcConfig) -> Result<Self, ConfigError> {
        let base = config.base_url()?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("http client: {}", e)))?;
        let jar_path = config.cookie_jar_file();
        let jar = Mutex::new(CookieJar::load(&jar_path));
        Ok(PanelClient {
            http,
            base,
            jar,
            jar_path,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// GET a path-and-query relative to the panel base (or an absolute URL).
    pub async fn get(&self, path: &str) -> Result<Page, PanelError> {
        let url = self.resolve(path)?;
        self.execute(self.http.get(url)).await
    }

    /// POST a form body, following redirects. Used for login and for the
    /// form submissions the web UI's action buttons issue.
    pub async fn post_form(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<Page, PanelError> {
        let url = self.resolve(path)?;
        self.execute(self.http.post(url).form(form)).await
    }

    /// GET a fully-resolved URL (discovered action links).
    pub async fn get_url(&self, url: Url) -> Result<Page, PanelError> {
        self.execute(self.http.get(url)).await
    }

    /// POST a form to a fully-resolved URL (discovered action forms).
    pub async fn post_form_url(
        &self,
        url: Url,
        form: &[(String, String)],
    ) -> Result<Page, PanelError> {
        self.execute(self.http.post(url).form(form)).await
    }

    /// Persist the cookie jar now. Called by the session manager after a
    /// successful login; also happens best-effort after every fetch.
    pub fn save_jar(&self) {
        let jar = match self.jar.lock() {
            Ok(j) => j.clone(),
            Err(_) => return,
        };
        jar.save(&self.jar_path);
    }

    fn resolve(&self, path: &str) -> Result<Url, PanelError> {
        Ok(self.base.join(path)?)
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Page, PanelError> {
        let header = self.jar.lock().ok().and_then(|jar| jar.header_value());
        let request = match header {
            Some(value) => request.header(COOKIE, value),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().clone();
        if let Ok(mut jar) = self.jar.lock() {
            jar.store_response(response.headers());
        }
        if status >= 400 {
            return Err(PanelError::Http(status));
        }
        let bytes = response.bytes().await?;
        let body = String::from_utf8_lossy(&bytes).into_owned();
        self.save_jar();
        Ok(Page {
            final_url,
            status,
            body,
        })
    }
}
