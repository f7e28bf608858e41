//! Outbound HTTP: one `reqwest::Client` with the base-URL policy, bearer
//! injection and 401 routing applied to every call.

use std::sync::Arc;

use reqwest::{multipart, Method, RequestBuilder, StatusCode};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use tracing::{debug, error, warn};
use url::Url;

use crate::auth::{AuthCoordinator, Credential};
use crate::config::{BaseUrl, ClientConfig};
use crate::error::ApiError;

pub struct HttpClient {
    client: reqwest::Client,
    base_url: BaseUrl,
    origin: Url,
    auth: Arc<AuthCoordinator>,
}

impl HttpClient {
    pub fn new(config: &ClientConfig, auth: Arc<AuthCoordinator>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::config(format!("failed to build HTTP client: {}", e)))?;

        let base_url = config.base_url()?;
        debug!("API base URL: {}", base_url);

        Ok(Self {
            client,
            base_url,
            origin: config.origin_url()?,
            auth,
        })
    }

    pub fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    pub fn auth(&self) -> &Arc<AuthCoordinator> {
        &self.auth
    }

    pub(crate) fn inner(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url.endpoint(&self.origin, path)
    }

    /// Send `method path` with an optional JSON body and decode the JSON
    /// response.
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path)?;
        let mut builder = self.client.request(method.clone(), url.clone());
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.dispatch(builder, &method, &url).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::GET, path, None).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::PUT, path, Some(body)).await
    }

    /// DELETE, discarding whatever confirmation body the backend sends.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.request::<IgnoredAny, ()>(Method::DELETE, path, None)
            .await
            .map(|_| ())
    }

    /// Multipart upload of a single file under the `file` field.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        let part = multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = multipart::Form::new().part("file", part);
        let builder = self.client.post(url.clone()).multipart(form);
        self.dispatch(builder, &Method::POST, &url).await
    }

    async fn dispatch<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        method: &Method,
        url: &Url,
    ) -> Result<T, ApiError> {
        self.auth
            .guarded_request(|credential| send(builder, credential, method, url))
            .await
    }
}

/// Send one request and map the response to a decoded body or an [`ApiError`].
/// A 401 comes back as [`ApiError::Unauthorized`] for the coordinator to handle.
async fn send<T: DeserializeOwned>(
    builder: RequestBuilder,
    credential: Credential,
    method: &Method,
    url: &Url,
) -> Result<T, ApiError> {
    let builder = match credential.bearer() {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    };

    debug!("[API Request] {} {}", method, url);
    let response = builder.send().await.map_err(|e| {
        warn!("{} {} failed without a response: {}", method, url, e);
        ApiError::network()
    })?;

    let status = response.status();
    let bytes = response.bytes().await.map_err(|e| {
        warn!("{} {}: failed to read body: {}", method, url, e);
        ApiError::network()
    })?;

    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized {
            body: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }

    if !status.is_success() {
        let body = String::from_utf8_lossy(&bytes).into_owned();
        error!("API Error: {} {} -> {} {}", method, url, status.as_u16(), body);
        return Err(ApiError::Http {
            status: status.as_u16(),
            body,
        });
    }

    decode(&bytes)
}

/// Decode a JSON body; an empty body decodes as `null`.
fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        Ok(serde_json::from_str("null")?)
    } else {
        Ok(serde_json::from_slice(bytes)?)
    }
}
