//! Shared HTTP plumbing for the WeChat Official Account API.
//!
//! Every API response is a JSON object that either carries the payload or
//! an `errcode`/`errmsg` pair (success sometimes includes `errcode: 0`
//! alongside the payload). [`WeChatResponse`] models that envelope and
//! [`WeChatResponse::into_result`] converts it into a crate [`Result`].

use std::fs;
use std::path::Path;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, WeChatError};

/// Root of the WeChat Official Account API.
pub const BASE_URL: &str = "https://api.weixin.qq.com";

/// Envelope every API endpoint answers with.
#[derive(Debug)]
pub struct WeChatResponse<T> {
    pub errcode: i64,
    pub errmsg: String,
    data: Option<T>,
}

impl<T: DeserializeOwned> WeChatResponse<T> {
    /// Splits a raw response body into the error pair and the payload.
    ///
    /// The payload is only parsed when `errcode` is zero; a success body
    /// that does not match `T` leaves `data` empty, which
    /// [`into_result`](Self::into_result) reports as an unexpected response.
    pub fn from_value(value: Value) -> Self {
        let errcode = value.get("errcode").and_then(Value::as_i64).unwrap_or(0);
        let errmsg = value
            .get("errmsg")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let data = if errcode == 0 {
            serde_json::from_value(value).ok()
        } else {
            None
        };
        Self {
            errcode,
            errmsg,
            data,
        }
    }
}

impl<T> WeChatResponse<T> {
    /// Converts the envelope into a `Result`, translating API errors into
    /// diagnostics attributed to `context` (for example `"创建草稿"`).
    pub fn into_result(self, context: &'static str) -> Result<T> {
        if self.errcode != 0 {
            return Err(WeChatError::from_api(self.errcode, &self.errmsg, context));
        }
        self.data
            .ok_or(WeChatError::UnexpectedResponse { context })
    }
}

/// Blocking HTTP client wired with the API base URL.
///
/// Cloning is cheap through [`std::sync::Arc`]; the client is shared by the
/// token manager, the image uploader and the draft manager.
#[derive(Debug)]
pub struct WeChatHttpClient {
    client: Client,
    base_url: String,
}

impl WeChatHttpClient {
    /// Creates a client pointed at the production API.
    pub fn new() -> Result<Self> {
        Self::with_base_url(BASE_URL)
    }

    /// Creates a client pointed at `base_url`, kept separate so tests can
    /// aim at a local server.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET with query parameters, parsed into the response envelope.
    pub fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<WeChatResponse<T>> {
        let url = self.endpoint(path);
        debug!("GET {url}");
        let value: Value = self.client.get(&url).query(query).send()?.json()?;
        Ok(WeChatResponse::from_value(value))
    }

    /// POST a JSON body to an endpoint that authenticates via the
    /// `access_token` query parameter.
    pub fn post_json_with_token<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        access_token: &str,
        body: &B,
    ) -> Result<WeChatResponse<T>> {
        let url = self.endpoint(path);
        debug!("POST {url}");
        let value: Value = self
            .client
            .post(&url)
            .query(&[("access_token", access_token)])
            .json(body)
            .send()?
            .json()?;
        Ok(WeChatResponse::from_value(value))
    }

    /// POST a file as the `media` field of a multipart form.
    pub fn upload_media<T: DeserializeOwned>(
        &self,
        path: &str,
        access_token: &str,
        media_type: &str,
        file: &Path,
    ) -> Result<WeChatResponse<T>> {
        let bytes = fs::read(file)?;
        let file_name = file
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("media")
            .to_string();
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(crate::utils::image_mime(file))?;
        let form = Form::new().part("media", part);

        let url = self.endpoint(path);
        debug!("POST {} multipart: {}", url, file.display());
        let value: Value = self
            .client
            .post(&url)
            .query(&[("access_token", access_token), ("type", media_type)])
            .multipart(form)
            .send()?
            .json()?;
        Ok(WeChatResponse::from_value(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        media_id: String,
    }

    #[test]
    fn test_success_envelope_carries_payload() {
        let response: WeChatResponse<Payload> =
            WeChatResponse::from_value(json!({"media_id": "MEDIA_1"}));
        assert_eq!(response.errcode, 0);
        let payload = response.into_result("上传图片").unwrap();
        assert_eq!(payload.media_id, "MEDIA_1");
    }

    #[test]
    fn test_success_envelope_with_explicit_zero_errcode() {
        let response: WeChatResponse<Payload> = WeChatResponse::from_value(
            json!({"errcode": 0, "errmsg": "ok", "media_id": "MEDIA_2"}),
        );
        let payload = response.into_result("上传图片").unwrap();
        assert_eq!(payload.media_id, "MEDIA_2");
    }

    #[test]
    fn test_error_envelope_becomes_api_error() {
        let response: WeChatResponse<Payload> = WeChatResponse::from_value(
            json!({"errcode": 45009, "errmsg": "reach max api daily quota limit"}),
        );
        assert_eq!(response.errcode, 45009);
        let err = response.into_result("上传图片").unwrap_err();
        match err {
            WeChatError::Api { code, context, .. } => {
                assert_eq!(code, 45009);
                assert_eq!(context, "上传图片");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_success_envelope_missing_fields_is_unexpected() {
        let response: WeChatResponse<Payload> =
            WeChatResponse::from_value(json!({"errmsg": "ok"}));
        let err = response.into_result("上传图片").unwrap_err();
        assert!(matches!(err, WeChatError::UnexpectedResponse { .. }));
    }

    #[test]
    fn test_endpoint_joins_base_and_path() {
        let client = WeChatHttpClient::new().unwrap();
        assert_eq!(
            client.endpoint("/cgi-bin/token"),
            "https://api.weixin.qq.com/cgi-bin/token"
        );

        let local = WeChatHttpClient::with_base_url("http://127.0.0.1:8080").unwrap();
        assert_eq!(local.endpoint("/cgi-bin/token"), "http://127.0.0.1:8080/cgi-bin/token");
    }
}
