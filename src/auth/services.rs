use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use regex::Regex;
use sqlx::SqlitePool;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, info, warn};

use super::{
    claims::{Claims, TokenKind},
    dto::JwtKeys,
    password::{hash_password, verify_password},
    repo_types::User,
};
use crate::{config::JwtConfig, db::namespace_key, state::AppState};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("username already exists")]
    AlreadyExists,
    #[error("username must be 1-64 characters of letters, digits, '.', '_' or '-' and not start with '.'")]
    InvalidUsername,
    #[error("password must not be empty")]
    EmptyPassword,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Usernames double as pantry file names, so they are restricted to a safe alphabet.
pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_\-][A-Za-z0-9_.\-]{0,63}$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

pub async fn register(db: &SqlitePool, username: &str, password: &str) -> Result<User, AuthError> {
    let username = username.trim();
    if !is_valid_username(username) {
        return Err(AuthError::InvalidUsername);
    }
    if password.is_empty() {
        return Err(AuthError::EmptyPassword);
    }

    let namespace = namespace_key(username);
    if User::is_taken(db, username, &namespace).await? {
        warn!(%username, "username already registered");
        return Err(AuthError::AlreadyExists);
    }

    let hash = hash_password(password)?;
    match User::create(db, username, &namespace, &hash).await {
        Ok(user) => {
            info!(username = %user.username, "user registered");
            Ok(user)
        }
        // lost a race against a concurrent registration
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AuthError::AlreadyExists),
        Err(e) => Err(AuthError::Internal(anyhow::Error::new(e).context("create user"))),
    }
}

/// Returns the user when `username` exists and `password` matches its stored hash.
pub async fn authenticate(
    db: &SqlitePool,
    username: &str,
    password: &str,
) -> anyhow::Result<Option<User>> {
    let Some(user) = User::find_by_username(db, username.trim()).await? else {
        warn!(%username, "login unknown username");
        return Ok(None);
    };
    if !verify_password(password, &user.password_hash)? {
        warn!(%username, "login invalid password");
        return Ok(None);
    }
    Ok(Some(user))
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
            ttl_minutes,
            refresh_ttl_minutes,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            access_ttl: Duration::from_secs((ttl_minutes.max(0) as u64) * 60),
            refresh_ttl: Duration::from_secs((refresh_ttl_minutes.max(0) as u64) * 60),
        }
    }
}

impl JwtKeys {
    fn sign_with_kind(&self, username: &str, kind: TokenKind) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: username.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(%username, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, username: &str) -> anyhow::Result<String> {
        self.sign_with_kind(username, TokenKind::Access)
    }
    pub fn sign_refresh(&self, username: &str) -> anyhow::Result<String> {
        self.sign_with_kind(username, TokenKind::Refresh)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(username = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    pub fn verify_refresh(&self, token: &str) -> anyhow::Result<Claims> {
        let claims = self.verify(token)?;
        if claims.kind != TokenKind::Refresh {
            anyhow::bail!("not a refresh token");
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod credential_tests {
    use super::*;
    use crate::db::open_credentials;

    async fn credentials() -> (SqlitePool, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let pool = open_credentials(&dir.path().join("users.db")).await.unwrap();
        (pool, dir)
    }

    #[tokio::test]
    async fn second_registration_of_same_name_fails() {
        let (db, _dir) = credentials().await;
        register(&db, "chef", "hunter2").await.expect("first registration");
        let err = register(&db, "chef", "other").await.unwrap_err();
        assert!(matches!(err, AuthError::AlreadyExists));

        assert!(authenticate(&db, "chef", "hunter2").await.unwrap().is_some());
        assert!(authenticate(&db, "chef", "wrong").await.unwrap().is_none());
        assert!(authenticate(&db, "nobody", "hunter2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn names_sharing_a_namespace_are_taken() {
        let (db, _dir) = credentials().await;
        register(&db, "Chef", "pw").await.unwrap();
        let err = register(&db, "chef", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::AlreadyExists));
        // login stays case-sensitive
        assert!(authenticate(&db, "chef", "pw").await.unwrap().is_none());
        assert!(authenticate(&db, "Chef", "pw").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn invalid_input_is_rejected() {
        let (db, _dir) = credentials().await;
        assert!(matches!(register(&db, "", "pw").await, Err(AuthError::InvalidUsername)));
        assert!(matches!(register(&db, "../etc", "pw").await, Err(AuthError::InvalidUsername)));
        assert!(matches!(register(&db, ".hidden", "pw").await, Err(AuthError::InvalidUsername)));
        assert!(matches!(register(&db, "chef", "").await, Err(AuthError::EmptyPassword)));
    }

    #[tokio::test]
    async fn login_right_after_register_succeeds() {
        let (db, _dir) = credentials().await;
        for i in 0..20 {
            let name = format!("cook{i}");
            register(&db, &name, "pw").await.unwrap();
            assert!(authenticate(&db, &name, "pw").await.unwrap().is_some());
            assert!(User::find_by_username(&db, &name).await.unwrap().is_some());
        }
    }

    #[test]
    fn username_alphabet() {
        assert!(is_valid_username("chef"));
        assert!(is_valid_username("Chef_01.home-2"));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username("slash/name"));
        assert!(!is_valid_username(&"a".repeat(65)));
        assert!(is_valid_username(&"a".repeat(64)));
    }
}

#[cfg(test)]
mod jwt_tests {
    use super::*;
    use crate::state::testing::test_config;
    use jsonwebtoken::{DecodingKey, EncodingKey};

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        let mut jwt = test_config(std::path::Path::new(".")).jwt;
        jwt.secret = secret.into();
        jwt.issuer = issuer.into();
        jwt.audience = audience.into();
        JwtKeys {
            encoding: EncodingKey::from_secret(jwt.secret.as_bytes()),
            decoding: DecodingKey::from_secret(jwt.secret.as_bytes()),
            issuer: jwt.issuer,
            audience: jwt.audience,
            access_ttl: Duration::from_secs(jwt.ttl_minutes as u64 * 60),
            refresh_ttl: Duration::from_secs(jwt.refresh_ttl_minutes as u64 * 60),
        }
    }

    #[test]
    fn sign_and_verify_access_token() {
        let keys = make_keys("dev-secret", "test-issuer", "test-aud");
        let token = keys.sign_access("chef").expect("sign access");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.sub, "chef");
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.kind, TokenKind::Access);
    }

    #[test]
    fn verify_refresh_rejects_access_token() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let refresh = keys.sign_refresh("chef").expect("sign refresh");
        assert_eq!(keys.verify_refresh(&refresh).unwrap().kind, TokenKind::Refresh);

        let access = keys.sign_access("chef").expect("sign access");
        let err = keys.verify_refresh(&access).unwrap_err();
        assert!(err.to_string().contains("not a refresh token"));
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let good_keys = make_keys("same-secret", "good-iss", "good-aud");
        let bad_keys = make_keys("same-secret", "bad-iss", "bad-aud");
        let token = good_keys.sign_access("chef").expect("sign access");
        assert!(bad_keys.verify(&token).is_err());
    }
}
