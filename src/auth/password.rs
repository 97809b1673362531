use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

use super::AuthError;

/// Hashes a plaintext password with Argon2id and a fresh random salt.
///
/// The returned PHC string embeds the salt and parameters, so it can be stored
/// as-is and later checked with [`verify_password`].
pub fn hash_password(plain: &str) -> Result<String, AuthError> {
    if plain.is_empty() {
        return Err(AuthError::InvalidInput("password must not be empty".into()));
    }
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            AuthError::Hashing(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Checks `plain` against a stored PHC hash.
///
/// A mismatch is `Ok(false)`. Only a hash that cannot be parsed at all is an error;
/// every hash produced by [`hash_password`] parses.
pub fn verify_password(plain: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        AuthError::Hashing(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Runs [`hash_password`] on the blocking pool so request workers are not stalled.
pub async fn hash_password_blocking(plain: String) -> anyhow::Result<Result<String, AuthError>> {
    Ok(tokio::task::spawn_blocking(move || hash_password(&plain)).await?)
}

/// Runs [`verify_password`] on the blocking pool.
pub async fn verify_password_blocking(
    plain: String,
    hash: String,
) -> anyhow::Result<Result<bool, AuthError>> {
    Ok(tokio::task::spawn_blocking(move || verify_password(&plain, &hash)).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn same_input_hashes_differently_and_both_verify() {
        let first = hash_password("secret123").unwrap();
        let second = hash_password("secret123").unwrap();
        assert_ne!(first, "secret123");
        assert_ne!(first, second);
        assert!(verify_password("secret123", &first).unwrap());
        assert!(verify_password("secret123", &second).unwrap());
    }

    #[test]
    fn hash_uses_argon2id_phc_format() {
        let hash = hash_password("secret123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn verify_is_case_sensitive() {
        let hash = hash_password("CaseSensitive1").unwrap();
        assert!(!verify_password("casesensitive1", &hash).unwrap());
    }

    #[test]
    fn empty_password_is_rejected_before_hashing() {
        let err = hash_password("").unwrap_err();
        assert!(matches!(err, AuthError::InvalidInput(_)));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(matches!(err, AuthError::Hashing(_)));
    }

    #[tokio::test]
    async fn blocking_wrappers_agree_with_sync_versions() {
        let hash = hash_password_blocking("pa55word".into()).await.unwrap().unwrap();
        assert!(verify_password_blocking("pa55word".into(), hash.clone())
            .await
            .unwrap()
            .unwrap());
        assert!(!verify_password_blocking("other".into(), hash).await.unwrap().unwrap());
    }
}
