// src/services/google_oauth.rs
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use reqwest::Client;
use anyhow::{Context, Result};
use log::debug;
use tokio::sync::Mutex;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// The fields of a service account JSON key we actually need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl ServiceAccountKey {
    pub fn from_file(path: &str) -> Result<Self> {
        let json_bytes = std::fs::read(path)
            .with_context(|| format!("reading service account key {}", path))?;
        serde_json::from_slice(&json_bytes)
            .with_context(|| format!("parsing service account key {}", path))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    exp: i64,
    iat: i64,
}

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Still usable for at least another minute.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now > Duration::minutes(1)
    }
}

/// Signs a JWT with the service account key and exchanges it for a bearer token.
pub async fn fetch_access_token(client: &Client, key: &ServiceAccountKey) -> Result<AccessToken> {
    let iat = Utc::now();
    let exp = iat + Duration::minutes(59);
    let claims = Claims {
        iss: key.client_email.clone(),
        scope: SHEETS_SCOPE.to_string(),
        aud: key.token_uri.clone(),
        exp: exp.timestamp(),
        iat: iat.timestamp(),
    };

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .context("service account private key is not a valid RSA PEM")?;
    let jwt = encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)?;

    #[derive(Debug, Serialize)]
    struct TokenRequest<'a> {
        grant_type: &'a str,
        assertion: &'a str,
    }
    let req_body = TokenRequest {
        grant_type: "urn:ietf:params:oauth:grant-type:jwt-bearer",
        assertion: &jwt,
    };

    #[derive(Debug, Deserialize)]
    struct TokenResponse {
        access_token: String,
        expires_in: i64,
    }

    let resp = client
        .post(&key.token_uri)
        .json(&req_body)
        .send()
        .await?
        .error_for_status()
        .context("token exchange rejected")?
        .json::<TokenResponse>()
        .await?;

    Ok(AccessToken {
        token: resp.access_token,
        expires_at: iat + Duration::seconds(resp.expires_in),
    })
}

/// Keeps the last bearer token around until it is about to expire.
pub struct TokenProvider {
    key: ServiceAccountKey,
    client: Client,
    current: Mutex<Option<AccessToken>>,
}

impl TokenProvider {
    pub fn new(key: ServiceAccountKey, client: Client) -> Self {
        TokenProvider {
            key,
            client,
            current: Mutex::new(None),
        }
    }

    pub fn service_account(&self) -> &str {
        &self.key.client_email
    }

    pub async fn token(&self) -> Result<String> {
        let mut current = self.current.lock().await;
        if let Some(token) = current.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.token.clone());
        }

        debug!("Requesting a new access token for {}", self.key.client_email);
        let token = fetch_access_token(&self.client, &self.key).await?;
        let value = token.token.clone();
        *current = Some(token);
        Ok(value)
    }

    /// Drops the cached token, e.g. after a 401.
    pub async fn reset(&self) {
        *self.current.lock().await = None;
    }
}
