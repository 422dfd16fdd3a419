use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Url;

use super::{ApiRequest, Method, RawResponse, Transport, TransportError};

/// Source of the bearer credential attached to every request.
///
/// Issuing and refreshing tokens belongs to the auth collaborator; the
/// transport only asks for the current one.
pub trait TokenProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// A fixed token, e.g. read from configuration.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(***)")
    }
}

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

#[derive(Clone)]
pub struct HttpTransport {
    base_url: Url,
    http: reqwest::Client,
    credentials: Option<Arc<dyn TokenProvider>>,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        credentials: Option<Arc<dyn TokenProvider>>,
    ) -> Result<Self, TransportError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|err| TransportError::InvalidRequest(format!("invalid base_url: {err}")))?;
        // `Url::join` replaces the last segment unless the path ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::InvalidRequest(err.to_string()))?;

        Ok(Self {
            base_url,
            http,
            credentials,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<RawResponse, TransportError> {
        let endpoint = self
            .base_url
            .join(request.path.trim_start_matches('/'))
            .map_err(|err| TransportError::InvalidRequest(format!("invalid path: {err}")))?;

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut req = self.http.request(method, endpoint);
        if let Some(token) = self
            .credentials
            .as_ref()
            .and_then(|provider| provider.bearer_token())
        {
            req = req.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            req = req.json(body);
        }

        let res = req.send().await.map_err(|err| {
            if err.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Connection(err.to_string())
            }
        })?;

        let status = res.status().as_u16();
        let body = res
            .bytes()
            .await
            .map_err(|err| TransportError::Connection(err.to_string()))?;

        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let transport =
            HttpTransport::new("https://api.example.com/v1", Duration::from_secs(1), None)
                .unwrap();
        assert_eq!(transport.base_url().as_str(), "https://api.example.com/v1/");
        assert_eq!(
            transport.base_url().join("groups/3").unwrap().as_str(),
            "https://api.example.com/v1/groups/3"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = HttpTransport::new("not a url", Duration::from_secs(1), None).unwrap_err();
        assert!(matches!(err, TransportError::InvalidRequest(_)));
    }

    #[test]
    fn static_token_is_not_printed() {
        assert_eq!(format!("{:?}", StaticToken::new("secret")), "StaticToken(***)");
    }
}
