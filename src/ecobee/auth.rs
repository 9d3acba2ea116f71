/// ecobee PIN authorization and OAuth token cache
use log::debug;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use time::OffsetDateTime;

use crate::ecobee::client::{read_json, API_BASE};
use crate::ecobee::types::{PinResponse, TokenResponse};
use crate::error::EcobeeError;

// Refresh a little before the token actually runs out
const REFRESH_MARGIN_SECS: i64 = 60;
const SCOPE: &str = "smartRead";

/// Tokens persisted between runs so the PIN flow only happens once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenCache {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds
    pub expires_at: i64,
}

impl TokenCache {
    pub(crate) fn from_response(response: TokenResponse, now: OffsetDateTime) -> Self {
        TokenCache {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at: now.unix_timestamp() + response.expires_in.max(0),
        }
    }

    pub fn needs_refresh(&self, now: OffsetDateTime) -> bool {
        now.unix_timestamp() >= self.expires_at - REFRESH_MARGIN_SECS
    }

    /// Read the cache file, `None` if it doesn't exist yet
    pub fn load(path: &Path) -> Result<Option<Self>, EcobeeError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(EcobeeError::TokenCache {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Write through a temporary file so a crash never leaves a half written cache
    pub fn save(&self, path: &Path) -> Result<(), EcobeeError> {
        let contents = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, contents)
            .and_then(|_| std::fs::rename(&tmp, path))
            .map_err(|source| EcobeeError::TokenCache {
                path: path.to_path_buf(),
                source,
            })
    }
}

/// Ask ecobee for a PIN the user enters in the ecobee portal
pub async fn request_pin(http: &reqwest::Client, app_id: &str) -> Result<PinResponse, EcobeeError> {
    let response = http
        .get(format!("{}/authorize", API_BASE))
        .query(&[
            ("response_type", "ecobeePin"),
            ("client_id", app_id),
            ("scope", SCOPE),
        ])
        .send()
        .await?;
    read_json(response).await
}

/// Trade the code that came with an authorized PIN for access and refresh tokens
pub async fn exchange_code(
    http: &reqwest::Client,
    app_id: &str,
    code: &str,
) -> Result<TokenCache, EcobeeError> {
    token_request(
        http,
        &[
            ("grant_type", "ecobeePin"),
            ("code", code),
            ("client_id", app_id),
        ],
    )
    .await
}

pub async fn refresh(
    http: &reqwest::Client,
    app_id: &str,
    refresh_token: &str,
) -> Result<TokenCache, EcobeeError> {
    debug!("Refreshing ecobee access token");
    token_request(
        http,
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", app_id),
        ],
    )
    .await
}

async fn token_request(
    http: &reqwest::Client,
    params: &[(&str, &str)],
) -> Result<TokenCache, EcobeeError> {
    let response = http
        .post(format!("{}/token", API_BASE))
        .query(params)
        .send()
        .await?;
    let tokens: TokenResponse = read_json(response).await?;
    Ok(TokenCache::from_response(
        tokens,
        OffsetDateTime::now_utc(),
    ))
}

/// Exchange `code` for tokens and store them at `cache_path`
pub async fn save_token(app_id: &str, cache_path: &Path, code: &str) -> Result<(), EcobeeError> {
    let http = reqwest::Client::new();
    let tokens = exchange_code(&http, app_id, code).await?;
    tokens.save(cache_path)
}
