//! Signed, expiring session tokens.
//!
//! Access and refresh tokens are both HMAC-signed JWTs carrying the user id in
//! `sub`. A refresh token is marked with `type: "refresh"`; an access token
//! carries no type claim. Nothing is stored server side, so a token is valid
//! exactly when its signature checks out, it has not expired, and its type
//! matches the slot it is presented in.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Value of the `type` claim on refresh tokens.
pub const REFRESH_TOKEN_TYPE: &str = "refresh";

/// Token rejection reasons.
///
/// These are kept distinct for logging and tests; the HTTP layer collapses
/// all of them into a single 401.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token is of the wrong type")]
    WrongType,

    #[error("token is malformed")]
    Malformed,

    /// Encoding failed; only happens with a misconfigured key
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    /// The configured lifetime pushes the expiry past the representable range
    #[error("token lifetime out of range")]
    LifetimeOutOfRange,
}

/// Which slot a token is being presented in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims shared by both token kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub exp: i64,    // Expiration timestamp
    pub iat: i64,    // Issued at timestamp
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

/// Signing settings for [`TokenService`].
#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub algorithm: Algorithm,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl TokenSettings {
    /// Settings with the default lifetimes: 24 hours for access tokens,
    /// 7 days for refresh tokens, signed with HS256.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            algorithm: Algorithm::HS256,
            access_ttl: Duration::hours(24),
            refresh_ttl: Duration::days(7),
        }
    }
}

/// Issues and validates access and refresh tokens
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(settings: TokenSettings) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            algorithm: settings.algorithm,
            access_ttl: settings.access_ttl,
            refresh_ttl: settings.refresh_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Issue an access token for `subject`, valid for the access lifetime.
    pub fn issue_access(&self, subject: &str) -> Result<String, TokenError> {
        self.issue_access_at(subject, Utc::now())
    }

    /// Issue a refresh token for `subject`, valid for the refresh lifetime.
    pub fn issue_refresh(&self, subject: &str) -> Result<String, TokenError> {
        self.issue_refresh_at(subject, Utc::now())
    }

    pub fn issue_access_at(
        &self,
        subject: &str,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        self.sign(Claims {
            sub: subject.to_string(),
            exp: expiry(now, self.access_ttl)?,
            iat: now.timestamp(),
            token_type: None,
        })
    }

    pub fn issue_refresh_at(
        &self,
        subject: &str,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        self.sign(Claims {
            sub: subject.to_string(),
            exp: expiry(now, self.refresh_ttl)?,
            iat: now.timestamp(),
            token_type: Some(REFRESH_TOKEN_TYPE.to_string()),
        })
    }

    /// Validate `token` for the `expected` slot and return its subject.
    pub fn validate(&self, token: &str, expected: TokenKind) -> Result<String, TokenError> {
        self.validate_at(token, expected, Utc::now())
    }

    /// Validate against an explicit reference instant.
    ///
    /// Checks run in a fixed order: signature, then expiry, then type.
    pub fn validate_at(
        &self,
        token: &str,
        expected: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = self.decode_claims(token)?;

        if now.timestamp() > claims.exp {
            return Err(TokenError::Expired);
        }

        let is_refresh = claims.token_type.as_deref() == Some(REFRESH_TOKEN_TYPE);
        match expected {
            TokenKind::Refresh if !is_refresh => return Err(TokenError::WrongType),
            TokenKind::Access if is_refresh => return Err(TokenError::WrongType),
            _ => {}
        }

        if claims.sub.is_empty() {
            return Err(TokenError::Malformed);
        }

        Ok(claims.sub)
    }

    fn sign(&self, claims: Claims) -> Result<String, TokenError> {
        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)
    }

    /// Verify the signature and decode the payload. Expiry is checked by the
    /// caller against its own clock.
    fn decode_claims(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::InvalidSignature
                }
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })
    }
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> Result<i64, TokenError> {
    now.checked_add_signed(ttl)
        .map(|exp| exp.timestamp())
        .ok_or(TokenError::LifetimeOutOfRange)
}

/// Parse a signing algorithm name, accepting only the HMAC family.
pub fn parse_hmac_algorithm(name: &str) -> Option<Algorithm> {
    match name.trim().to_ascii_uppercase().as_str() {
        "HS256" => Some(Algorithm::HS256),
        "HS384" => Some(Algorithm::HS384),
        "HS512" => Some(Algorithm::HS512),
        _ => None,
    }
}
