use std::path::Path;

use anyhow::{anyhow, Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde_json::Value;

/// Thin HTTP client for a facerecd server.
pub struct FacerecClient {
    base: String,
    http: reqwest::Client,
}

impl FacerecClient {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn identify(&self, image: &Path) -> Result<Value> {
        let form = upload_form(image).await?;
        let resp = self.http.post(self.url("/")).multipart(form).send().await?;
        json_or_error(resp).await
    }

    pub async fn list(&self) -> Result<Value> {
        let resp = self.http.get(self.url("/faces")).send().await?;
        json_or_error(resp).await
    }

    pub async fn enroll(&self, id: &str, image: &Path) -> Result<Value> {
        let form = upload_form(image).await?;
        let resp = self
            .http
            .post(self.url("/faces"))
            .query(&[("id", id)])
            .multipart(form)
            .send()
            .await?;
        json_or_error(resp).await
    }

    pub async fn remove(&self, id: &str) -> Result<Value> {
        let resp = self
            .http
            .delete(self.url("/faces"))
            .query(&[("id", id)])
            .send()
            .await?;
        json_or_error(resp).await
    }

    pub async fn status(&self) -> Result<Value> {
        let resp = self.http.get(self.url("/status")).send().await?;
        json_or_error(resp).await
    }
}

async fn upload_form(image: &Path) -> Result<Form> {
    let bytes = tokio::fs::read(image)
        .await
        .with_context(|| format!("reading {}", image.display()))?;
    let filename = image
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("{} has no usable file name", image.display()))?
        .to_string();
    Ok(Form::new().part("file", Part::bytes(bytes).file_name(filename)))
}

async fn json_or_error(resp: Response) -> Result<Value> {
    let status = resp.status();
    let body: Value = resp.json().await.unwrap_or(Value::Null);
    if status.is_success() {
        Ok(body)
    } else {
        Err(anyhow!(error_message(status, &body)))
    }
}

/// Human-readable message for a failed request, preferring the server's `error` field.
fn error_message(status: StatusCode, body: &Value) -> String {
    match body.get("error").and_then(Value::as_str) {
        Some(message) => format!("server returned {status}: {message}"),
        None => format!("server returned {status}"),
    }
}
