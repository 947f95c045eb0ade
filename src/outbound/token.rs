use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use jsonwebtoken::{EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;

/// Lifetime of every issued token, in seconds.
///
/// Deliberately short: a fresh token is minted per send, so the replay window
/// stays small even when the send interval exceeds the token lifetime.
pub const TOKEN_TTL_SECS: u64 = 60;

/// Errors raised while building a token. Caught per tick, never fatal to the
/// dispatch loop.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("extension secret is not valid base64: {0}")]
    SecretDecode(#[from] base64::DecodeError),

    #[error("system clock is before the unix epoch: {0}")]
    Clock(#[from] std::time::SystemTimeError),

    #[error("failed to sign claims: {0}")]
    Sign(#[from] jsonwebtoken::errors::Error),
}

/// Claims signed into each broadcast authorization token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Absolute expiry, unix seconds.
    pub exp: u64,
    pub user_id: String,
    pub role: String,
    pub channel_id: String,
    pub pubsub_perms: PubsubPerms,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PubsubPerms {
    pub send: Vec<String>,
}

impl Claims {
    /// Build the claim set for one send.
    ///
    /// Ids are coerced to strings here whatever their source type; the remote
    /// rejects tokens carrying numeric ids.
    pub fn new(user_id: impl ToString, channel_id: impl ToString, exp: u64) -> Self {
        Self {
            exp,
            user_id: user_id.to_string(),
            role: "external".to_string(),
            channel_id: channel_id.to_string(),
            pubsub_perms: PubsubPerms {
                send: vec!["*".to_string()],
            },
        }
    }
}

/// Issues one short-lived HS256 token per send.
///
/// The base64 secret is decoded once at construction; issuing is cheap enough
/// to run on every tick. Claims are built fresh per token and discarded after
/// signing.
pub struct TokenIssuer {
    key: EncodingKey,
    user_id: String,
    channel_id: String,
}

impl TokenIssuer {
    pub fn new(
        base64_secret: &str,
        user_id: impl ToString,
        channel_id: impl ToString,
    ) -> Result<Self, SigningError> {
        let secret = BASE64.decode(base64_secret)?;
        Ok(Self {
            key: EncodingKey::from_secret(&secret),
            user_id: user_id.to_string(),
            channel_id: channel_id.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, SigningError> {
        Self::new(&config.secret, &config.owner, &config.channel)
    }

    /// Issue a token expiring [`TOKEN_TTL_SECS`] from now.
    pub fn issue(&self) -> Result<String, SigningError> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        self.issue_at(now)
    }

    /// Issue a token as of a specific unix timestamp.
    pub fn issue_at(&self, issued_at: u64) -> Result<String, SigningError> {
        let claims = Claims::new(&self.user_id, &self.channel_id, issued_at + TOKEN_TTL_SECS);
        Ok(jsonwebtoken::encode(&Header::default(), &claims, &self.key)?)
    }
}
