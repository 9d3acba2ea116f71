/// Authenticated client for the ecobee thermostat API
use log::{debug, warn};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tokio::time::Duration;

use crate::ecobee::auth::{self, TokenCache};
use crate::ecobee::types::{
    parse_summary, OAuthError, Selection, SelectionRequest, StatusEnvelope, SummaryResponse,
    Thermostat, ThermostatResponse, ThermostatSummary,
};
use crate::ecobee::ThermostatApi;
use crate::error::EcobeeError;

pub const API_BASE: &str = "https://api.ecobee.com";
const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct EcobeeClient {
    http: reqwest::Client,
    app_id: String,
    cache_path: PathBuf,
    tokens: Mutex<Option<TokenCache>>,
}

impl EcobeeClient {
    pub fn new(app_id: &str, cache_path: PathBuf) -> Result<Self, EcobeeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(EcobeeClient {
            http,
            app_id: app_id.to_string(),
            cache_path,
            tokens: Mutex::new(None),
        })
    }

    /// Current access token, refreshing it when close to expiry or when `force_refresh` is set
    async fn access_token(&self, force_refresh: bool) -> Result<String, EcobeeError> {
        let mut tokens = self.tokens.lock().await;
        if tokens.is_none() {
            *tokens = TokenCache::load(&self.cache_path)?;
        }

        let current = tokens.as_ref().ok_or_else(|| {
            EcobeeError::NotAuthorized(format!(
                "no token cache at {}",
                self.cache_path.display()
            ))
        })?;

        if !force_refresh && !current.needs_refresh(OffsetDateTime::now_utc()) {
            return Ok(current.access_token.clone());
        }

        let fresh = auth::refresh(&self.http, &self.app_id, &current.refresh_token).await?;
        fresh.save(&self.cache_path)?;
        let access_token = fresh.access_token.clone();
        *tokens = Some(fresh);
        Ok(access_token)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        selection: &Selection,
    ) -> Result<T, EcobeeError> {
        let body = serde_json::to_string(&SelectionRequest { selection })?;

        match self.get_once(path, &body, false).await {
            Err(e) if e.is_token_expired() => {
                warn!("ecobee rejected the access token, refreshing and retrying");
                self.get_once(path, &body, true).await
            }
            other => other,
        }
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &str,
        force_refresh: bool,
    ) -> Result<T, EcobeeError> {
        let token = self.access_token(force_refresh).await?;
        debug!("GET {}{} {}", API_BASE, path, body);

        let response = self
            .http
            .get(format!("{}{}", API_BASE, path))
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/json;charset=UTF-8")
            .query(&[("json", body)])
            .send()
            .await?;
        read_json(response).await
    }
}

impl ThermostatApi for EcobeeClient {
    async fn thermostat_summary(
        &self,
        thermostat_id: &str,
    ) -> Result<ThermostatSummary, EcobeeError> {
        let mut selection = Selection::thermostat(thermostat_id);
        selection.include_equipment_status = true;

        let response: SummaryResponse = self.get("/1/thermostatSummary", &selection).await?;
        parse_summary(&response, thermostat_id)
    }

    async fn thermostat(&self, thermostat_id: &str) -> Result<Thermostat, EcobeeError> {
        let mut selection = Selection::thermostat(thermostat_id);
        selection.include_runtime = true;
        selection.include_program = true;
        selection.include_events = true;
        selection.include_sensors = true;

        let response: ThermostatResponse = self.get("/1/thermostat", &selection).await?;
        response
            .thermostat_list
            .into_iter()
            .next()
            .ok_or_else(|| EcobeeError::ThermostatNotFound(thermostat_id.to_string()))
    }
}

/// Decode a response body, turning ecobee and OAuth error payloads into `EcobeeError::Api`
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, EcobeeError> {
    let http_status = response.status();
    let body = response.text().await?;
    check_body(http_status.as_u16(), http_status.is_success(), &body)?;
    Ok(serde_json::from_str(&body)?)
}

fn check_body(http_code: u16, success: bool, body: &str) -> Result<(), EcobeeError> {
    if let Ok(StatusEnvelope {
        status: Some(status),
    }) = serde_json::from_str::<StatusEnvelope>(body)
    {
        if status.code != 0 {
            return Err(EcobeeError::Api {
                code: status.code,
                message: status.message,
            });
        }
    }

    if success {
        return Ok(());
    }

    let message = match serde_json::from_str::<OAuthError>(body) {
        Ok(oauth) if oauth.error_description.is_empty() => oauth.error,
        Ok(oauth) => format!("{}: {}", oauth.error, oauth.error_description),
        Err(_) => body.to_string(),
    };
    Err(EcobeeError::Api {
        code: i64::from(http_code),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_token_status_is_recognised() {
        let body = r#"{"status":{"code":14,"message":"Authentication token has expired."}}"#;
        let err = check_body(500, false, body).unwrap_err();
        assert!(err.is_token_expired());
    }

    #[test]
    fn oauth_errors_keep_http_code() {
        let body = r#"{"error":"invalid_grant","error_description":"The authorization grant is invalid"}"#;
        match check_body(400, false, body) {
            Err(EcobeeError::Api { code, message }) => {
                assert_eq!(code, 400);
                assert_eq!(message, "invalid_grant: The authorization grant is invalid");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn successful_status_passes() {
        assert!(check_body(200, true, r#"{"status":{"code":0,"message":""}}"#).is_ok());
        assert!(check_body(200, true, r#"{"access_token":"a"}"#).is_ok());
        assert!(check_body(502, false, "Bad Gateway").is_err());
    }
}
