use fitchatly_types::api::{
    AssistantReplyRequest, ChannelResponse, ErrorResponse, FavoriteResponse, LoginRequest,
    LoginResponse, MessageResponse, RegisterRequest, RegisterResponse, SubmitMessageRequest,
    UpdateProfileRequest, UserResponse,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ClientError;

/// Typed wrapper over the REST surface. Holds the bearer token once
/// `register` or `login` succeeds; every later call sends it.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// `base_url` is the server origin without a trailing slash, e.g.
    /// `http://127.0.0.1:4000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Adopt a token obtained elsewhere (a stored session, another client).
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    // -- Auth --

    pub async fn register(&mut self, req: &RegisterRequest) -> Result<RegisterResponse, ClientError> {
        let resp: RegisterResponse = self.post("/auth/register", req).await?;
        self.token = Some(resp.token.clone());
        Ok(resp)
    }

    pub async fn login(&mut self, login: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let req = LoginRequest { login: login.to_string(), password: password.to_string() };
        let resp: LoginResponse = self.post("/auth/login", &req).await?;
        self.token = Some(resp.token.clone());
        Ok(resp)
    }

    pub async fn me(&self) -> Result<UserResponse, ClientError> {
        self.get("/auth/me").await
    }

    pub async fn update_profile(
        &self,
        req: &UpdateProfileRequest,
    ) -> Result<UserResponse, ClientError> {
        let builder = self.http.put(self.url("/profile")).json(req);
        read_json(self.authorize(builder).send().await?).await
    }

    // -- Channels --

    pub async fn channels(&self) -> Result<Vec<ChannelResponse>, ClientError> {
        self.get("/channels").await
    }

    pub async fn channel(&self, channel_id: &str) -> Result<ChannelResponse, ClientError> {
        self.get(&format!("/channels/{channel_id}")).await
    }

    // -- Messages --

    pub async fn messages(&self, channel_id: &str) -> Result<Vec<MessageResponse>, ClientError> {
        self.get(&format!("/messages/{channel_id}")).await
    }

    /// Step A: persist the user's message.
    pub async fn send_message(
        &self,
        channel_id: &str,
        content: &str,
    ) -> Result<MessageResponse, ClientError> {
        let req = SubmitMessageRequest {
            channel_id: channel_id.to_string(),
            content: content.to_string(),
        };
        self.post("/messages", &req).await
    }

    /// Step B: generate and persist the assistant's reply to `content`.
    pub async fn assistant_reply(
        &self,
        channel_id: &str,
        content: &str,
    ) -> Result<MessageResponse, ClientError> {
        let req = AssistantReplyRequest {
            channel_id: channel_id.to_string(),
            content: content.to_string(),
        };
        self.post("/assistant/reply", &req).await
    }

    // -- Favorites --

    pub async fn favorites(&self) -> Result<Vec<FavoriteResponse>, ClientError> {
        self.get("/favorites").await
    }

    pub async fn add_favorite(&self, channel_id: &str) -> Result<FavoriteResponse, ClientError> {
        let builder = self.http.post(self.url(&format!("/favorites/{channel_id}")));
        read_json(self.authorize(builder).send().await?).await
    }

    /// Returns whether a favorite row was actually deleted.
    pub async fn remove_favorite(&self, channel_id: &str) -> Result<bool, ClientError> {
        let builder = self.http.delete(self.url(&format!("/favorites/{channel_id}")));
        let body: serde_json::Value = read_json(self.authorize(builder).send().await?).await?;
        Ok(body.get("removed").and_then(|v| v.as_bool()).unwrap_or(false))
    }

    // -- Plumbing --

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let builder = self.http.get(self.url(path));
        read_json(self.authorize(builder).send().await?).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, ClientError> {
        let builder = self.http.post(self.url(path)).json(body);
        read_json(self.authorize(builder).send().await?).await
    }
}

/// Decode a success body, or surface the server's `{"error": ...}` text.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => format!("HTTP {status}"),
    };
    Err(ClientError::Api { status: status.as_u16(), message })
}
