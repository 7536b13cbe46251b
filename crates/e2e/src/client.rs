//! HTTP client for the platform's REST API

use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::Credentials;
use crate::error::{E2eError, E2eResult};

/// Response of `POST /auth/login`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user_id: Value,
    #[serde(default)]
    pub name: Option<String>,
}

impl LoginResponse {
    /// User id as a path segment, whether the API sends a number or a string
    pub fn user_ref(&self) -> String {
        match &self.user_id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Thin wrapper over `reqwest` that remembers the bearer token
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, use_system_proxy: bool) -> E2eResult<Self> {
        let mut builder = reqwest::Client::builder().timeout(timeout);
        if !use_system_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            http: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        if path.is_empty() || path == "/" {
            return self.base_url.clone();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    /// Log in and keep the token for subsequent requests
    pub async fn login(&mut self, credentials: &Credentials) -> E2eResult<LoginResponse> {
        let response = self.try_login(credentials).await?;
        self.token = Some(response.token.clone());
        Ok(response)
    }

    /// Log in without touching this client's session
    pub async fn try_login(&self, credentials: &Credentials) -> E2eResult<LoginResponse> {
        let body = LoginRequest {
            email: &credentials.email,
            password: &credentials.password,
        };
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&body)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> E2eResult<T> {
        let response = self.request(Method::GET, path).query(query).send().await?;
        Self::decode(response).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> E2eResult<T> {
        let response = self.request(Method::POST, path).json(body).send().await?;
        Self::decode(response).await
    }

    /// Fetch a page as text without judging the status
    pub async fn get_text(&self, path: &str) -> E2eResult<(StatusCode, String)> {
        let response = self.request(Method::GET, path).send().await?;
        let status = response.status();
        Ok((status, response.text().await?))
    }

    /// Status code of a GET, ignoring the body
    pub async fn status_of(&self, path: &str) -> E2eResult<u16> {
        let response = self.request(Method::GET, path).send().await?;
        Ok(response.status().as_u16())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!("{} {}", method, url);
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> E2eResult<T> {
        let status = response.status();
        let url = response.url().to_string();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(E2eError::UnexpectedStatus {
                url,
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

/// Audit events as returned by `GET /audit/events`: either a flat list or a
/// page object with `content` and `totalElements`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditPage {
    pub events: Vec<Value>,
    pub total: u64,
}

impl AuditPage {
    pub fn from_value(value: Value) -> E2eResult<Self> {
        match value {
            Value::Array(events) => Ok(Self {
                total: events.len() as u64,
                events,
            }),
            Value::Object(mut page) => {
                let events = match page.remove("content") {
                    Some(Value::Array(events)) => events,
                    Some(other) => {
                        return Err(E2eError::failure(format!(
                            "audit page 'content' is not a list: {}",
                            other
                        )))
                    }
                    None => Vec::new(),
                };
                let total = page
                    .get("totalElements")
                    .and_then(Value::as_u64)
                    .unwrap_or(events.len() as u64);
                Ok(Self { events, total })
            }
            other => Err(E2eError::failure(format!(
                "unexpected audit events payload: {}",
                other
            ))),
        }
    }
}

/// Names of `required` keys absent from a JSON object
pub fn missing_fields(record: &Value, required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|field| record.get(**field).is_none())
        .map(|field| field.to_string())
        .collect()
}

/// Fail with [`E2eError::MissingFields`] unless every required key is present
pub fn require_fields(entity: &str, record: &Value, required: &[&str]) -> E2eResult<()> {
    let missing = missing_fields(record, required);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(E2eError::MissingFields {
            entity: entity.to_string(),
            fields: missing,
        })
    }
}
