use crate::error::RemoteError;
use crate::remote::discord_models::ApiErrorBody;
use log::debug;
use reqwest::multipart::Form;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// HTTP client for Discord REST API operations
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    auth_header: String,
}

impl HttpClient {
    pub fn new(bot_token: &str) -> Self {
        Self {
            client: Client::new(),
            auth_header: format!("Bot {}", bot_token),
        }
    }

    /// Get full URL by prepending the API base if needed
    pub fn get_full_url(&self, url: &str) -> String {
        if url.starts_with("http") {
            url.to_string()
        } else {
            format!("{}{}", DISCORD_API_BASE, url)
        }
    }

    pub async fn get<T>(&self, url: &str) -> Result<T, RemoteError>
    where
        T: DeserializeOwned,
    {
        let url = self.get_full_url(url);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", &self.auth_header)
            .send()
            .await
            .map_err(transport_error)?;

        decode(check_status(response).await?).await
    }

    pub async fn post<T, B>(&self, url: &str, body: &B) -> Result<T, RemoteError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let url = self.get_full_url(url);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", &self.auth_header)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        decode(check_status(response).await?).await
    }

    /// POST a multipart form (used for attachments)
    pub async fn post_multipart<T>(&self, url: &str, form: Form) -> Result<T, RemoteError>
    where
        T: DeserializeOwned,
    {
        let url = self.get_full_url(url);
        debug!("POST multipart {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", &self.auth_header)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        decode(check_status(response).await?).await
    }

    pub async fn delete(&self, url: &str) -> Result<(), RemoteError> {
        let url = self.get_full_url(url);
        debug!("DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .header("Authorization", &self.auth_header)
            .send()
            .await
            .map_err(transport_error)?;

        check_status(response).await?;
        Ok(())
    }

    /// Download attachment bytes from a CDN url (no authorization header)
    pub async fn download(&self, download_url: &str) -> Result<Vec<u8>, RemoteError> {
        let response = self
            .client
            .get(download_url)
            .send()
            .await
            .map_err(transport_error)?;

        let bytes = check_status(response)
            .await?
            .bytes()
            .await
            .map_err(transport_error)?;
        Ok(bytes.to_vec())
    }
}

fn transport_error(err: reqwest::Error) -> RemoteError {
    if err.is_decode() {
        RemoteError::Malformed(err.to_string())
    } else {
        RemoteError::Unavailable(err.to_string())
    }
}

async fn check_status(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body: ApiErrorBody = serde_json::from_str(&text).unwrap_or_default();
    Err(RemoteError::Rejected {
        status: status.as_u16(),
        code: body.code,
        message: if body.message.is_empty() { text } else { body.message },
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    response
        .json::<T>()
        .await
        .map_err(|e| RemoteError::Malformed(e.to_string()))
}
