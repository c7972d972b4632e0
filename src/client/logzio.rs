//! Logz.io login handshake
//!
//! The hosted variant does not accept Basic auth. Before the first request
//! the handler walks through:
//!
//! 1. `GET {logz}/#/login` to pick up a CSRF token from `Set-Cookie`
//! 2. a form-encoded resource-owner grant against Auth0 (with an optional
//!    TOTP code) that yields an identity token
//! 3. `POST {logz}/login/jwt` exchanging the identity token for a session token
//!
//! The session token is then reused for the lifetime of the handler.

use super::auth::AuthenticationHandler;
use super::error::{Error, Result};
use super::transport::{HttpAgent, KBN_VERSION};
use crate::config::{Config, DEFAULT_KIBANA_VERSION_553};
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tokio::sync::Mutex;
use totp_rs::{Algorithm, Secret, TOTP};

const CSRF_COOKIE_PATTERNS: [&str; 2] = ["Logzio-Csrf=([^;]+)", "Logzio-Csrf-V2=([^;]+)"];
const AUTH_TOKEN_HEADER: &str = "x-auth-token";
const CSRF_TOKEN_HEADER: &str = "x-logz-csrf-token";

/// Where the handshake currently stands.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    HasCsrfToken {
        csrf_token: String,
    },
    HasSessionToken {
        csrf_token: String,
        session_token: String,
    },
}

/// Source of one-time MFA codes.
pub trait OneTimeCode: Send + Sync {
    fn generate(&self) -> Result<String>;
}

/// RFC 6238 code generator (SHA1, 6 digits, 30 second step) over a base32 secret.
pub struct Totp {
    totp: TOTP,
}

impl Totp {
    pub fn from_base32(secret: &str) -> Result<Self> {
        let bytes = Secret::Encoded(secret.trim().to_uppercase())
            .to_bytes()
            .map_err(|e| Error::Auth(format!("invalid MFA secret: {}", e)))?;
        Ok(Self {
            totp: TOTP::new_unchecked(Algorithm::SHA1, 6, 1, 30, bytes),
        })
    }
}

impl OneTimeCode for Totp {
    fn generate(&self) -> Result<String> {
        self.totp
            .generate_current()
            .map_err(|e| Error::Auth(format!("could not generate MFA code: {}", e)))
    }
}

#[derive(Deserialize)]
struct Auth0Response {
    #[serde(default)]
    id_token: String,
}

#[derive(Deserialize)]
struct SessionResponse {
    #[serde(rename = "sessionToken", default)]
    session_token: String,
}

pub struct LogzioAuthenticationHandler {
    auth0_uri: String,
    logz_uri: String,
    client_id: String,
    username: String,
    password: String,
    one_time_code: Option<Box<dyn OneTimeCode>>,
    http: Client,
    state: Mutex<SessionState>,
}

impl LogzioAuthenticationHandler {
    pub fn new(
        auth0_uri: impl AsRef<str>,
        logz_uri: impl AsRef<str>,
        client_id: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            auth0_uri: auth0_uri.as_ref().trim_end_matches('/').to_string(),
            logz_uri: logz_uri.as_ref().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            username: username.into(),
            password: password.into(),
            one_time_code: None,
            http: Client::new(),
            state: Mutex::new(SessionState::Unauthenticated),
        }
    }

    /// Handler for the configured base uri, with TOTP enabled when an MFA
    /// secret is present.
    pub fn from_config(config: &Config) -> Result<Self> {
        let credentials = &config.credentials;
        let mut handler = Self::new(
            &config.auth0_uri,
            &config.kibana_base_uri,
            &credentials.logzio_client_id,
            &credentials.username,
            &credentials.password,
        );
        handler.http = Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .build()?;
        if credentials.has_mfa() {
            handler.one_time_code = Some(Box::new(Totp::from_base32(
                &credentials.logzio_mfa_secret,
            )?));
        }
        Ok(handler)
    }

    pub fn with_one_time_code(mut self, one_time_code: Box<dyn OneTimeCode>) -> Self {
        self.one_time_code = Some(one_time_code);
        self
    }

    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    /// Run whatever part of the handshake is still missing.
    async fn login(&self, state: &mut SessionState) -> Result<()> {
        let csrf_token = match state {
            SessionState::HasCsrfToken { csrf_token } => csrf_token.clone(),
            _ => {
                let csrf_token = self.fetch_csrf_token().await?;
                *state = SessionState::HasCsrfToken {
                    csrf_token: csrf_token.clone(),
                };
                csrf_token
            }
        };

        let id_token = self.identity_token().await?;
        let session_token = self.jwt_login(&csrf_token, &id_token).await?;
        *state = SessionState::HasSessionToken {
            csrf_token,
            session_token,
        };
        log::info!("Logged in to {} as {}", self.logz_uri, self.username);
        Ok(())
    }

    async fn fetch_csrf_token(&self) -> Result<String> {
        let url = format!("{}/#/login", self.logz_uri);
        log::debug!("Fetching CSRF token from {}", url);
        let response = self.http.get(&url).send().await?;
        let status = response.status().as_u16();
        if status >= 400 {
            return Err(Error::Auth(format!(
                "login page {} returned status {}",
                url, status
            )));
        }
        let cookies = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok());
        extract_csrf_token(cookies)
    }

    async fn identity_token(&self) -> Result<String> {
        let Some(one_time_code) = &self.one_time_code else {
            return self.resource_owner_grant(None).await;
        };

        let code = one_time_code.generate()?;
        match self.resource_owner_grant(Some(&code)).await {
            Err(Error::MfaRejected) => {
                log::warn!("The MFA code was rejected, generating a new one and trying again");
                let code = one_time_code.generate()?;
                self.resource_owner_grant(Some(&code)).await
            }
            other => other,
        }
    }

    async fn resource_owner_grant(&self, mfa_code: Option<&str>) -> Result<String> {
        let url = format!("{}/oauth/ro", self.auth0_uri);
        let mut form = vec![
            ("scope", "openid email connection"),
            ("response_type", "code"),
            ("connection", "Username-Password-Authentication"),
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
            ("grant_type", "password"),
            ("client_id", self.client_id.as_str()),
        ];
        if let Some(code) = mfa_code {
            form.push(("mfa_code", code));
        }

        let response = self
            .http
            .post(&url)
            .header(KBN_VERSION, DEFAULT_KIBANA_VERSION_553)
            .form(&form)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        if status == 401 && mfa_code.is_some() {
            return Err(Error::MfaRejected);
        }
        if status >= 300 {
            return Err(Error::Auth(format!(
                "identity provider rejected login. Status: {}, {}",
                status, body
            )));
        }

        let parsed: Auth0Response = serde_json::from_str(&body)
            .map_err(|e| Error::decode("could not parse identity provider response", &body, e))?;
        if parsed.id_token.is_empty() {
            return Err(Error::Auth(
                "identity provider response did not contain an id_token".to_string(),
            ));
        }
        Ok(parsed.id_token)
    }

    async fn jwt_login(&self, csrf_token: &str, id_token: &str) -> Result<String> {
        let url = format!("{}/login/jwt", self.logz_uri);
        let response = self
            .http
            .post(&url)
            .header(CSRF_TOKEN_HEADER, csrf_token)
            .header(COOKIE, format!("Logzio-Csrf={}", csrf_token))
            .json(&serde_json::json!({ "jwt": id_token }))
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        if status >= 300 {
            return Err(Error::Auth(format!(
                "jwt login failed. Status: {}, {}",
                status, body
            )));
        }

        let parsed: SessionResponse = serde_json::from_str(&body)
            .map_err(|e| Error::decode("could not parse jwt login response", &body, e))?;
        if parsed.session_token.is_empty() {
            return Err(Error::Auth(
                "jwt login response did not contain a sessionToken".to_string(),
            ));
        }
        Ok(parsed.session_token)
    }
}

impl std::fmt::Debug for LogzioAuthenticationHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogzioAuthenticationHandler")
            .field("auth0_uri", &self.auth0_uri)
            .field("logz_uri", &self.logz_uri)
            .field("username", &self.username)
            .field("mfa", &self.one_time_code.is_some())
            .finish()
    }
}

#[async_trait]
impl AuthenticationHandler for LogzioAuthenticationHandler {
    fn name(&self) -> &'static str {
        "logzio"
    }

    async fn initialize(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        // Held across the handshake so concurrent first requests log in once.
        let mut state = self.state.lock().await;
        if !matches!(*state, SessionState::HasSessionToken { .. }) {
            self.login(&mut state).await?;
        }

        match &*state {
            SessionState::HasSessionToken {
                csrf_token,
                session_token,
            } => Ok(request
                .header(AUTH_TOKEN_HEADER, session_token.as_str())
                .header(CSRF_TOKEN_HEADER, csrf_token.as_str())
                .header(COOKIE, format!("Logzio-Csrf={}", csrf_token))),
            _ => Err(Error::Auth("login did not produce a session token".to_string())),
        }
    }

    async fn change_account(&self, account_id: &str, agent: &HttpAgent) -> Result<()> {
        let url = format!("{}/user/session/replace/{}", self.logz_uri, account_id);
        let response = agent.get(url).end().await?;
        if response.status >= 400 {
            return Err(response.error(format!("Could not switch to account {}", account_id)));
        }
        let parsed: SessionResponse = response.json("could not parse account switch response")?;

        let mut state = self.state.lock().await;
        match &mut *state {
            SessionState::HasSessionToken { session_token, .. } => {
                *session_token = parsed.session_token;
                log::info!("Switched logz.io session to account {}", account_id);
                Ok(())
            }
            _ => Err(Error::Auth(
                "cannot switch account before logging in".to_string(),
            )),
        }
    }
}

/// Pull the CSRF token out of a set of `Set-Cookie` values, trying both the
/// current and the older cookie name against every cookie.
pub fn extract_csrf_token<'a>(cookies: impl IntoIterator<Item = &'a str>) -> Result<String> {
    let patterns = CSRF_COOKIE_PATTERNS
        .iter()
        .map(|pattern| Regex::new(pattern))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Auth(format!("invalid CSRF cookie pattern: {}", e)))?;

    for cookie in cookies {
        for pattern in &patterns {
            if let Some(token) = pattern.captures(cookie).and_then(|c| c.get(1)) {
                return Ok(token.as_str().to_string());
            }
        }
    }
    Err(Error::Auth(
        "could not retrieve CSRF token from logz.io cookie".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_csrf_token() {
        let token = extract_csrf_token(["Logzio-Csrf=abc123; Path=/; Secure"]).unwrap();
        assert_eq!(token, "abc123");
    }

    #[test]
    fn test_extract_csrf_token_v2() {
        let token = extract_csrf_token(["Logzio-Csrf-V2=xyz789; Path=/; HttpOnly"]).unwrap();
        assert_eq!(token, "xyz789");
    }

    #[test]
    fn test_extract_csrf_token_checks_every_cookie() {
        let token = extract_csrf_token([
            "AWSALB=abcdef; Path=/",
            "session=1; HttpOnly",
            "Logzio-Csrf-V2=later; Path=/",
        ])
        .unwrap();
        assert_eq!(token, "later");
    }

    #[test]
    fn test_extract_csrf_token_missing() {
        let err = extract_csrf_token(["AWSALB=abcdef; Path=/"]).unwrap_err();
        assert!(err.is_auth_error());

        let err = extract_csrf_token(std::iter::empty()).unwrap_err();
        assert!(err.is_auth_error());
    }

    #[test]
    fn test_totp_generates_six_digits() {
        let totp = Totp::from_base32("JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP").unwrap();
        let code = totp.generate().unwrap();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_totp_rejects_bad_secret() {
        assert!(Totp::from_base32("not base32 !!").is_err());
    }

    #[tokio::test]
    async fn test_starts_unauthenticated() {
        let handler = LogzioAuthenticationHandler::new(
            "https://logzio.auth0.com",
            "https://app-eu.logz.io/",
            "client",
            "user",
            "pass",
        );
        assert_eq!(handler.state().await, SessionState::Unauthenticated);
        assert_eq!(handler.logz_uri, "https://app-eu.logz.io");
    }
}
