use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::TokenConfig;
use crate::models::{Principal, PrincipalKind, Role};
use crate::services::error::AuthError;

/// Intended audience of a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Web,
    Mobile,
}

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::Web => "web",
            Audience::Mobile => "mobile",
        }
    }
}

impl std::str::FromStr for Audience {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "web" => Ok(Audience::Web),
            "mobile" => Ok(Audience::Mobile),
            _ => Err(format!("Invalid audience: {}", s)),
        }
    }
}

/// Discriminates access from refresh credentials inside the payload, so a
/// refresh token can never pass an access-token check or vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
    Refresh,
}

/// Signed credential payload.
///
/// Access tokens carry the full authorization snapshot (kind, role,
/// overrides); refresh tokens carry only the principal id, kind and their
/// own jti.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Principal id.
    pub sub: Uuid,
    pub kind: PrincipalKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Permission-override snapshot taken at issuance.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<String, bool>,
    pub token_use: TokenUse,
    /// Unique credential id, the revocation key.
    pub jti: String,
    pub aud: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// Credential pair returned after a successful login.
#[derive(Debug, Serialize)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Lone access credential returned by the refresh flow (the refresh
/// credential is reused, not rotated).
#[derive(Debug, Serialize)]
pub struct AccessCredential {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Encodes and decodes signed, expiring bearer credentials (HMAC-SHA256).
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_token_expiry_hours: i64,
    refresh_token_expiry_days: i64,
}

impl TokenCodec {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            access_token_expiry_hours: config.access_token_expiry_hours,
            refresh_token_expiry_days: config.refresh_token_expiry_days,
        }
    }

    /// Issue an access + refresh credential pair for a principal. Each token
    /// gets a fresh jti. Fails only when signing itself fails, which is a
    /// key-configuration problem, not a per-request condition.
    pub fn issue(
        &self,
        principal: &Principal,
        audience: Audience,
    ) -> Result<CredentialPair, AuthError> {
        let access_token = self.issue_access(principal, audience)?;
        let refresh_token = self.issue_refresh(principal, audience)?;

        Ok(CredentialPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry_seconds(),
        })
    }

    /// Issue an access credential carrying the full authorization snapshot.
    pub fn issue_access(
        &self,
        principal: &Principal,
        audience: Audience,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now + Duration::hours(self.access_token_expiry_hours);

        let claims = Claims {
            sub: principal.id,
            kind: principal.kind,
            role: principal.role,
            overrides: principal.overrides.clone(),
            token_use: TokenUse::Access,
            jti: Uuid::new_v4().to_string(),
            aud: audience.as_str().to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        self.sign(&claims)
    }

    /// Issue a refresh credential. Deliberately minimal payload: the
    /// authorization snapshot is re-read from the store when it is redeemed.
    pub fn issue_refresh(
        &self,
        principal: &Principal,
        audience: Audience,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now + Duration::days(self.refresh_token_expiry_days);

        let claims = Claims {
            sub: principal.id,
            kind: principal.kind,
            role: None,
            overrides: BTreeMap::new(),
            token_use: TokenUse::Refresh,
            jti: Uuid::new_v4().to_string(),
            aud: audience.as_str().to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(anyhow::anyhow!("Failed to sign credential: {}", e)))
    }

    /// Validate signature, issuer, audience and expiry, and assert the
    /// token's declared use.
    ///
    /// Errors stay distinct: a correctly signed token past its expiry yields
    /// [`AuthError::Expired`], never [`AuthError::SignatureInvalid`].
    pub fn verify(&self, token: &str, expected_use: TokenUse) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[Audience::Web.as_str(), Audience::Mobile.as_str()]);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(map_jwt_error)?;

        if data.claims.token_use != expected_use {
            return Err(AuthError::Malformed);
        }

        Ok(data.claims)
    }

    /// Decode a credential WITHOUT verifying its signature or expiry.
    ///
    /// For UX hints only (e.g. "session expiring soon"); never an input to
    /// an authorization decision.
    pub fn peek(token: &str) -> Option<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
            .ok()
            .map(|data| data.claims)
    }

    /// Whether the credential's expiry falls within the next
    /// `threshold_minutes`. Pure over [`TokenCodec::peek`]; an undecodable
    /// token is not "expiring soon", it is garbage.
    pub fn is_expiring_soon(token: &str, threshold_minutes: i64) -> bool {
        match Self::peek(token) {
            Some(claims) => {
                let threshold = Utc::now() + Duration::minutes(threshold_minutes);
                claims.exp <= threshold.timestamp()
            }
            None => false,
        }
    }

    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.access_token_expiry_hours * 3600
    }
}

fn map_jwt_error(e: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;

    match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidSignature => AuthError::SignatureInvalid,
        _ => AuthError::Malformed,
    }
}
