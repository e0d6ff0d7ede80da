//! Authentication service implementation
//!
//! Verifies bearer tokens into an `Identity` and provides the role checks every
//! engine runs before touching storage. Ownership checks ("leader of
//! this event's club") stay inside the engines.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::models::Role;
use crate::utils::errors::{ClubHubError, Result};

/// Verified caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
    pub club_id: Option<Uuid>,
}

impl Identity {
    pub fn new(user_id: Uuid, role: Role, club_id: Option<Uuid>) -> Self {
        Self {
            user_id,
            role,
            club_id,
        }
    }

    fn require(&self, role: Role) -> Result<()> {
        if self.role != role {
            return Err(ClubHubError::Authorization(format!("{} role required", role)));
        }
        Ok(())
    }

    pub fn require_admin(&self) -> Result<()> {
        self.require(Role::Admin)
    }

    pub fn require_leader(&self) -> Result<()> {
        self.require(Role::Leader)
    }

    pub fn require_student(&self) -> Result<()> {
        self.require(Role::Student)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    club_id: Option<Uuid>,
    exp: i64,
    iat: i64,
}

/// Issues and verifies HS256 bearer tokens
#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl: Duration::hours(config.token_ttl_hours),
        }
    }

    /// Sign a token for `identity`; used by tooling and tests
    pub fn issue_token(&self, identity: &Identity) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: identity.user_id,
            role: identity.role,
            club_id: identity.club_id,
            exp: (now + self.ttl).timestamp(),
            iat: now.timestamp(),
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    /// Verify a bearer token and return the identity it carries
    pub fn verify(&self, token: &str) -> Result<Identity> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::new(Algorithm::HS256))
            .map_err(|e| {
                debug!(error = %e, "Rejected bearer token");
                ClubHubError::Unauthenticated("invalid or expired token".to_string())
            })?;

        let claims = data.claims;
        Ok(Identity::new(claims.sub, claims.role, claims.club_id))
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}
