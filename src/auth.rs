use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use spdlog::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid login credentials")]
    InvalidCredentials,
    #[error("Session expired")]
    Expired,
    #[error("Auth request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Auth service returned {status}: {message}")]
    Service { status: u16, message: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
}

/// Signed in admin. Acquired at sign in, handed explicitly to every write.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[async_trait]
pub trait AuthClient: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// Checks the session against the auth service
    async fn current_user(&self, session: &Session) -> Result<User, AuthError>;

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError>;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
    user: User,
}

#[derive(Deserialize)]
struct AuthErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

/// Password sign in against a GoTrue style API (`{url}/auth/v1/...`)
pub struct RestAuthClient {
    base_url: String,
    anon_key: String,
    http_client: reqwest::Client,
}

impl RestAuthClient {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    async fn service_error(response: reqwest::Response) -> AuthError {
        let status = response.status().as_u16();
        let message = match response.json::<AuthErrorBody>().await {
            Ok(body) => body.error_description
                .or(body.msg)
                .or(body.message)
                .unwrap_or_else(|| "Unknown error".to_string()),
            Err(_) => "Unknown error".to_string(),
        };
        AuthError::Service { status, message }
    }
}

#[async_trait]
impl AuthClient for RestAuthClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let response = self.http_client
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        match response.status().as_u16() {
            200 => {
                let token: TokenResponse = response.json().await?;
                let expires_in = token.expires_in.unwrap_or(3600);
                Ok(Session {
                    access_token: token.access_token,
                    user: token.user,
                    expires_at: Utc::now() + Duration::seconds(expires_in),
                })
            }
            400 | 401 => Err(AuthError::InvalidCredentials),
            _ => Err(Self::service_error(response).await),
        }
    }

    async fn current_user(&self, session: &Session) -> Result<User, AuthError> {
        let response = self.http_client
            .get(self.auth_url("user"))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", session.access_token))
            .send()
            .await?;

        match response.status().as_u16() {
            200 => Ok(response.json().await?),
            401 | 403 => Err(AuthError::Expired),
            _ => Err(Self::service_error(response).await),
        }
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        let response = self.http_client
            .post(self.auth_url("logout"))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", session.access_token))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::service_error(response).await)
        }
    }
}

/// Sessions of the admins signed in through this server, keyed by the
/// random token stored in their cookie.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Session>>,
    max_age: Duration,
}

impl SessionRegistry {
    pub fn new(max_age: Duration) -> Self {
        SessionRegistry {
            sessions: Mutex::new(HashMap::new()),
            max_age,
        }
    }

    /// Stores the session and returns the cookie token for it. The session
    /// never outlives the registry max age. Expired sessions are swept here,
    /// since browsers stop sending their cookies.
    pub fn open(&self, mut session: Session) -> String {
        let now = Utc::now();
        let limit = now + self.max_age;
        if session.expires_at > limit {
            session.expires_at = limit;
        }
        let token = Uuid::new_v4().to_string();
        info!("Session opened for {}", session.user.email.as_deref().unwrap_or(&session.user.id));

        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        if sessions.len() < before {
            debug!("Dropped {} expired sessions", before - sessions.len());
        }
        sessions.insert(token.clone(), session);
        token
    }

    /// Live session for a cookie token. Expired sessions are dropped.
    pub fn get(&self, token: &str) -> Option<Session> {
        let mut sessions = self.sessions.lock().unwrap();
        let expired = match sessions.get(token) {
            None => return None,
            Some(session) => session.is_expired(Utc::now()),
        };

        if expired {
            warn!("Session expired for token {}", token);
            sessions.remove(token);
            return None;
        }
        sessions.get(token).cloned()
    }

    pub fn close(&self, token: &str) -> Option<Session> {
        self.sessions.lock().unwrap().remove(token)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

/// Auth for the in-process backend: a single admin account from the config
pub struct LocalAuthClient {
    email: String,
    password: String,
    token_ttl: Duration,
}

impl LocalAuthClient {
    pub fn new(email: &str, password: &str, token_ttl: Duration) -> Self {
        LocalAuthClient {
            email: email.to_string(),
            password: password.to_string(),
            token_ttl,
        }
    }
}

#[async_trait]
impl AuthClient for LocalAuthClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        if self.email.is_empty() || email != self.email || password != self.password {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(Session {
            access_token: Uuid::new_v4().to_string(),
            user: User { id: "local-admin".to_string(), email: Some(email.to_string()) },
            expires_at: Utc::now() + self.token_ttl,
        })
    }

    async fn current_user(&self, session: &Session) -> Result<User, AuthError> {
        if session.is_expired(Utc::now()) {
            return Err(AuthError::Expired);
        }
        Ok(session.user.clone())
    }

    async fn sign_out(&self, _session: &Session) -> Result<(), AuthError> {
        Ok(())
    }
}
