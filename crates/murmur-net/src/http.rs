//! [`FeedApi`] over HTTP with bearer authentication.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use tracing::{debug, warn};

use murmur_shared::constants::APP_NAME;
use murmur_shared::{
    ApiError, FeedApi, IdentitySession, Item, ItemId, NewPost, Page, PageCursor, UserId,
};

use crate::wire::{items_from_wire, CreateBody, ItemEnvelope, ItemsEnvelope};

/// HTTP client for the feed server.
///
/// Every request carries the credential currently held by the
/// [`IdentitySession`], so logging in or out takes effect immediately.
pub struct HttpFeedApi {
    client: reqwest::Client,
    base_url: String,
    session: Arc<IdentitySession>,
}

impl HttpFeedApi {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        session: Arc<IdentitySession>,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent())
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    /// Absolute URL of a path under the tweets service.
    pub fn url(&self, path: &str) -> String {
        format!("{}/tweets/tweets{}", self.base_url, path)
    }

    /// Absolute URL of a user's timeline.
    pub fn user_url(&self, user: &UserId) -> String {
        format!("{}/tweets/users/{}", self.base_url, user)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.credential() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        if response.status().is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = error_for_status(status, &body);
        warn!(status, error = %error, "Request rejected");
        Err(error)
    }

    async fn decode_items(&self, response: Response) -> Result<Vec<Item>, ApiError> {
        let envelope: ItemsEnvelope = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        let viewer = self.session.current_identity().map(|i| i.subject_id);
        items_from_wire(envelope.tweets, viewer.as_ref())
    }

    async fn decode_item(&self, response: Response) -> Result<Item, ApiError> {
        let envelope: ItemEnvelope = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        let viewer = self.session.current_identity().map(|i| i.subject_id);
        envelope.into_wire().into_item(viewer.as_ref())
    }
}

#[async_trait]
impl FeedApi for HttpFeedApi {
    async fn fetch_page(&self, cursor: Option<PageCursor>) -> Result<Page, ApiError> {
        let mut request = self.client.get(self.url("/"));
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor.to_param())]);
        }
        debug!(cursor = ?cursor.map(|c| c.to_param()), "Fetching page");

        let response = self.send(request).await?;
        Ok(Page::new(self.decode_items(response).await?))
    }

    async fn fetch_item(&self, item: &ItemId) -> Result<Item, ApiError> {
        let request = self.client.get(self.url(&format!("/{item}")));
        let response = self.send(request).await?;
        self.decode_item(response).await
    }

    async fn fetch_user_items(&self, user: &UserId) -> Result<Vec<Item>, ApiError> {
        debug!(user = %user, "Fetching user timeline");
        let response = self.send(self.client.get(self.user_url(user))).await?;
        self.decode_items(response).await
    }

    async fn fetch_create(&self, post: &NewPost) -> Result<Item, ApiError> {
        let request = self
            .client
            .post(self.url("/"))
            .json(&CreateBody::new(post, None));
        let response = self.send(request).await?;
        self.decode_item(response).await
    }

    async fn fetch_set_like(&self, item: &ItemId, liked: bool) -> Result<(), ApiError> {
        let url = self.url(&format!("/{item}/likes"));
        let request = if liked {
            self.client.post(url)
        } else {
            self.client.delete(url)
        };
        self.send(request).await?;
        Ok(())
    }

    async fn fetch_replies(&self, parent: &ItemId) -> Result<Vec<Item>, ApiError> {
        let request = self.client.get(self.url(&format!("/{parent}/replies")));
        let response = self.send(request).await?;
        self.decode_items(response).await
    }

    async fn fetch_create_reply(&self, parent: &ItemId, post: &NewPost) -> Result<Item, ApiError> {
        let request = self
            .client
            .post(self.url(&format!("/{parent}/replies")))
            .json(&CreateBody::new(post, Some(parent)));
        let response = self.send(request).await?;
        self.decode_item(response).await
    }
}

fn transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Network(e.to_string())
    }
}

/// `User-Agent` sent with every request.
pub fn user_agent() -> String {
    format!("{}/{}", APP_NAME, env!("CARGO_PKG_VERSION"))
}

/// Map a non-success HTTP status onto the error taxonomy.
pub fn error_for_status(status: u16, body: &str) -> ApiError {
    let message = if body.trim().is_empty() {
        format!("HTTP {status}")
    } else {
        body.trim().to_string()
    };

    match status {
        401 | 403 => ApiError::Unauthorized,
        404 | 409 | 410 => ApiError::Conflict(message),
        500..=599 => ApiError::Server { status, message },
        _ => ApiError::InvalidResponse(format!("HTTP {status}: {message}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_shared::MemorySessionStore;

    fn api(base: &str) -> HttpFeedApi {
        let session = Arc::new(IdentitySession::new(Arc::new(MemorySessionStore::new())));
        HttpFeedApi::new(base, Duration::from_secs(1), session).unwrap()
    }

    #[test]
    fn test_url_building() {
        let api = api("http://localhost:8000/");
        assert_eq!(api.url("/"), "http://localhost:8000/tweets/tweets/");
        assert_eq!(
            api.url("/abc/likes"),
            "http://localhost:8000/tweets/tweets/abc/likes"
        );
    }

    #[test]
    fn test_item_and_user_urls() {
        let api = api("https://murmur.example");
        assert_eq!(
            api.url(&format!("/{}", ItemId::new("65f0"))),
            "https://murmur.example/tweets/tweets/65f0"
        );
        assert_eq!(
            api.user_url(&UserId::new("42")),
            "https://murmur.example/tweets/users/42"
        );
    }

    #[test]
    fn test_user_agent_names_the_app() {
        let agent = user_agent();
        assert!(agent.starts_with("Murmur/"));
        assert!(agent.ends_with(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(error_for_status(401, ""), ApiError::Unauthorized);
        assert_eq!(
            error_for_status(409, "gone"),
            ApiError::Conflict("gone".into())
        );
        assert_eq!(
            error_for_status(503, ""),
            ApiError::Server {
                status: 503,
                message: "HTTP 503".into()
            }
        );
        assert!(matches!(
            error_for_status(422, "bad"),
            ApiError::InvalidResponse(_)
        ));
        assert!(error_for_status(502, "").is_retryable());
        assert!(!error_for_status(404, "").is_retryable());
    }
}
