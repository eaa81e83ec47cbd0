use crate::wire::{
    self, Envelope, InstanceListQuery, InstancePage, LoginData, LoginFailedCountRequest,
    LoginRequest, PassportData, PassportRequest, PowerOffRequest, PowerOnRequest,
};
use crate::{LoginReply, PlatformError, RentalPlatform, POWER_ON_PAYLOAD};
use anyhow::Context;
use async_trait::async_trait;
use keeper_common::{InstanceListing, Session};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

pub struct AutoDlPlatform {
    client: Client,
    base_url: String,
}

impl AutoDlPlatform {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        // Default reqwest client has no overall timeout. If the API stalls, a run can hang forever.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build()
            .context("failed to build AutoDL HTTP client")?;
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            anyhow::bail!("AutoDL base URL is empty");
        }
        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn headers(&self, session: Option<&Session>) -> Result<HeaderMap, PlatformError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(session) = session {
            // The platform expects the raw token, without a `Bearer ` prefix.
            let value = HeaderValue::from_str(session.token()).map_err(|_| {
                PlatformError::Transport("session token is not a valid header value".to_string())
            })?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        session: Option<&Session>,
    ) -> Result<T, PlatformError> {
        let url = self.url(path);
        debug!(url = %url, "[AutoDL API] POST");
        let request = self
            .client
            .post(&url)
            .headers(self.headers(session)?)
            .json(body);
        Self::send(request, &url).await
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder, url: &str) -> Result<T, PlatformError> {
        let resp = request
            .send()
            .await
            .map_err(|e| PlatformError::Transport(e.to_string()))?;
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| PlatformError::Transport(e.to_string()))?;
        // The API reports failures in the body; the HTTP status is only logged.
        debug!(url = %url, status = status.as_u16(), bytes = bytes.len(), "[AutoDL API] response");
        serde_json::from_slice(&bytes).map_err(|e| {
            PlatformError::Decode(format!(
                "{} returned status={} with undecodable body: {}",
                url, status, e
            ))
        })
    }
}

#[async_trait]
impl RentalPlatform for AutoDlPlatform {
    async fn login_failed_count(&self, phone: &str) -> Result<serde_json::Value, PlatformError> {
        self.post(
            wire::PATH_LOGIN_FAILED_COUNT,
            &LoginFailedCountRequest { phone },
            None,
        )
        .await
    }

    async fn login(&self, phone: &str, password: &str) -> Result<LoginReply, PlatformError> {
        let env: Envelope<LoginData> = self
            .post(wire::PATH_LOGIN, &LoginRequest::new(phone, password), None)
            .await?;
        Ok(LoginReply {
            code: env.code,
            ticket: wire::non_empty(env.data.and_then(|d| d.ticket)),
        })
    }

    async fn exchange_ticket(&self, ticket: &str) -> Result<Option<String>, PlatformError> {
        let env: Envelope<PassportData> = self
            .post(wire::PATH_PASSPORT, &PassportRequest { ticket }, None)
            .await?;
        Ok(wire::non_empty(env.data.and_then(|d| d.token)))
    }

    async fn list_instances(&self, session: &Session) -> Result<InstanceListing, PlatformError> {
        let url = self.url(wire::PATH_INSTANCES);
        debug!(url = %url, "[AutoDL API] GET");
        let request = self
            .client
            .get(&url)
            .headers(self.headers(Some(session))?)
            .query(&InstanceListQuery::default());
        let env: Envelope<InstancePage> = Self::send(request, &url).await?;
        let page = env.data.ok_or_else(|| {
            PlatformError::Malformed(format!(
                "no 'data' in instance listing (code={})",
                env.code.as_deref().unwrap_or("none")
            ))
        })?;
        Ok(page.into())
    }

    async fn power_on(
        &self,
        session: &Session,
        instance_uuid: &str,
    ) -> Result<serde_json::Value, PlatformError> {
        self.post(
            wire::PATH_POWER_ON,
            &PowerOnRequest {
                instance_uuid,
                payload: POWER_ON_PAYLOAD,
            },
            Some(session),
        )
        .await
    }

    async fn power_off(
        &self,
        session: &Session,
        instance_uuid: &str,
    ) -> Result<serde_json::Value, PlatformError> {
        self.post(
            wire::PATH_POWER_OFF,
            &PowerOffRequest { instance_uuid },
            Some(session),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let p = AutoDlPlatform::new(" https://example.test/ ").unwrap();
        assert_eq!(p.url(wire::PATH_LOGIN), "https://example.test/api/v1/new_login");
        assert!(AutoDlPlatform::new("  ").is_err());
    }

    #[test]
    fn authorization_is_raw_token() {
        let p = AutoDlPlatform::new(wire::DEFAULT_BASE_URL).unwrap();
        let headers = p.headers(Some(&Session::new("tok-123"))).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "tok-123");
        assert!(p.headers(None).unwrap().get(AUTHORIZATION).is_none());
        assert!(p.headers(Some(&Session::new("bad\ntoken"))).is_err());
    }
}
