//! Authentication
//!
//! - Salted, iterated SHA-256 password hashes
//! - ed25519-signed session tokens carrying the principal's claims
//! - Login, token verification and first-admin bootstrap

use crate::context::Context;
use chrono::{DateTime, Duration, TimeZone, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use internhub_core::validation;
use internhub_core::*;
use internhub_store::AuditRecord;
use rand::distributions::{Alphanumeric, DistString};
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

const HASH_SCHEME: &str = "sha256";
const SALT_LEN: usize = 16;

/// Hash a password as `sha256$<rounds>$<salt hex>$<hash hex>`
#[must_use]
pub fn hash_password(password: &str, rounds: u32) -> String {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let digest = stretch(password, &salt, rounds);
    format!(
        "{HASH_SCHEME}${rounds}${}${}",
        hex::encode(salt),
        hex::encode(digest)
    )
}

/// Check a password against a stored hash; malformed hashes never match
#[must_use]
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(HASH_SCHEME), Some(rounds), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    let (Ok(rounds), Ok(salt), Ok(expected)) =
        (rounds.parse::<u32>(), hex::decode(salt), hex::decode(expected))
    else {
        return false;
    };
    constant_time_eq(&stretch(password, &salt, rounds), &expected)
}

/// One-time password handed out with a freshly created intern account.
///
/// Always passes [`validation::password`].
#[must_use]
pub fn temporary_password() -> String {
    let mut rng = OsRng;
    let mut pw = Alphanumeric.sample_string(&mut rng, 10);
    pw.push(char::from(b'a' + rng.gen_range(0..26)));
    pw.push(char::from(b'0' + rng.gen_range(0..10)));
    pw
}

fn stretch(password: &str, salt: &[u8], rounds: u32) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    let mut digest: [u8; 32] = hasher.finalize().into();
    for _ in 1..rounds.max(1) {
        let mut hasher = Sha256::new();
        hasher.update(digest);
        hasher.update(salt);
        digest = hasher.finalize().into();
    }
    digest
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub role: Role,
    pub university_id: Option<UniversityId>,
    /// Unix seconds
    pub iat: i64,
    /// Unix seconds
    pub exp: i64,
}

impl Claims {
    #[must_use]
    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.sub,
            role: self.role,
            university_id: self.university_id,
        }
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_default()
    }
}

/// Issues and verifies `hex(claims).hex(signature)` tokens
#[derive(Debug, Clone)]
pub struct TokenSigner {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(signing_key: SigningKey, ttl: Duration) -> Self {
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
            ttl,
        }
    }

    /// Signer with a fresh random key; tokens do not survive a restart
    pub fn generate(ttl: Duration) -> Self {
        Self::new(SigningKey::generate(&mut OsRng), ttl)
    }

    /// Signer from a 32-byte hex seed
    pub fn from_hex_seed(seed_hex: &str, ttl: Duration) -> DomainResult<Self> {
        let bytes = hex::decode(seed_hex.trim())
            .map_err(|e| DomainError::validation(format!("signing key is not hex: {e}")))?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| DomainError::validation("signing key must be 32 bytes"))?;
        Ok(Self::new(SigningKey::from_bytes(&seed), ttl))
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user: &User, now: DateTime<Utc>) -> DomainResult<(String, Claims)> {
        let claims = Claims {
            sub: user.id,
            role: user.role,
            university_id: user.university_id,
            iat: now.timestamp(),
            exp: now
                .checked_add_signed(self.ttl)
                .ok_or_else(|| DomainError::Internal("token expiry out of range".into()))?
                .timestamp(),
        };
        let payload = serde_json::to_vec(&claims)
            .map_err(|e| DomainError::Internal(format!("encode claims: {e}")))?;
        let signature: Signature = self.signing_key.sign(&payload);
        let token = format!(
            "{}.{}",
            hex::encode(&payload),
            hex::encode(signature.to_bytes())
        );
        Ok((token, claims))
    }

    /// Signature and expiry check only; the account itself is checked by [`AuthService`]
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> DomainResult<Claims> {
        let invalid = || DomainError::Unauthorized("invalid token".into());
        let (payload_hex, sig_hex) = token.split_once('.').ok_or_else(invalid)?;
        let payload = hex::decode(payload_hex).map_err(|_| invalid())?;
        let sig_bytes: [u8; 64] = hex::decode(sig_hex)
            .map_err(|_| invalid())?
            .try_into()
            .map_err(|_| invalid())?;
        let signature = Signature::from_bytes(&sig_bytes);
        self.verifying_key
            .verify(&payload, &signature)
            .map_err(|_| invalid())?;

        let claims: Claims = serde_json::from_slice(&payload).map_err(|_| invalid())?;
        if claims.exp <= now.timestamp() {
            return Err(DomainError::Unauthorized("token expired".into()));
        }
        Ok(claims)
    }
}

/// Login request
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Successful login
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserView,
}

pub struct AuthService<'a> {
    ctx: &'a Context,
}

impl<'a> AuthService<'a> {
    pub(crate) fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    pub fn login(&self, req: &LoginRequest) -> DomainResult<LoginResponse> {
        let rejected = || DomainError::Unauthorized("invalid email or password".into());
        let email = req.email.trim().to_lowercase();
        let store = &self.ctx.store;

        let Some(user) = store.users.list(|u| u.email == email).into_iter().next() else {
            debug!(%email, "login for unknown email");
            // same stretch cost as a known account
            std::hint::black_box(stretch(
                &req.password,
                &[0u8; SALT_LEN],
                self.ctx.settings.password_rounds,
            ));
            return Err(rejected());
        };
        if !verify_password(&req.password, &user.password_hash) {
            warn!(user_id = %user.id, "login with wrong password");
            return Err(rejected());
        }
        if !user.is_active {
            warn!(user_id = %user.id, "login for inactive account");
            return Err(rejected());
        }

        let now = Utc::now();
        let (user, ()) = store.users.update(user.id, now, |u| {
            u.last_login_at = Some(now);
            Ok(())
        })?;
        let (token, claims) = self.ctx.tokens.issue(&user, now)?;
        info!(user_id = %user.id, role = %user.role, "login");

        Ok(LoginResponse {
            token,
            expires_at: claims.expires_at(),
            user: user.view(),
        })
    }

    /// Resolve a bearer token to the principal of a still-active account
    pub fn authenticate(&self, token: &str) -> DomainResult<Principal> {
        let claims = self.ctx.tokens.verify(token, Utc::now())?;
        let user = self
            .ctx
            .store
            .users
            .find(claims.sub)
            .filter(|u| u.is_active)
            .ok_or_else(|| DomainError::Unauthorized("account is no longer active".into()))?;
        // role or university may have changed since issue
        Ok(Principal {
            user_id: user.id,
            role: user.role,
            university_id: user.university_id,
        })
    }

    pub fn me(&self, principal: &Principal) -> DomainResult<UserView> {
        Ok(self.ctx.store.users.get(principal.user_id)?.view())
    }

    /// Create the first ADMIN when there are no users yet.
    ///
    /// Returns `None` when users already exist.
    pub fn bootstrap_admin(&self, email: &str, password: &str) -> DomainResult<Option<UserView>> {
        let store = &self.ctx.store;
        let _guard = store.writer();
        if !store.users.is_empty() {
            return Ok(None);
        }
        let email = validation::email(email)?;
        validation::password(password)?;

        let user = User {
            id: UserId::new(),
            email,
            password_hash: hash_password(password, self.ctx.settings.password_rounds),
            full_name: "Administrator".into(),
            role: Role::Admin,
            university_id: None,
            is_active: true,
            last_login_at: None,
            timestamps: Timestamps::new(Utc::now()),
        };
        store.users.insert(user.clone())?;
        store.record(AuditRecord::new(EntityKind::User, user.id, "bootstrap_admin"));
        info!(user_id = %user.id, email = %user.email, "bootstrapped admin account");
        Ok(Some(user.view()))
    }
}
