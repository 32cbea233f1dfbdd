use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Newtype for plaintext passwords. Deliberately has no `Debug` or
/// `Display` impl so the plaintext can never end up in a log line.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: String) -> Self {
        Self(password)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Hash a password with Argon2id. Cost parameters are the library
/// defaults and are not operator-tunable; the salt is generated per
/// hash and embedded in the output.
pub fn hash_password(password: &Password) -> Result<String, anyhow::Error> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = argon2
        .hash_password(password.as_str().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(password_hash)
}

/// Verify a password against a stored hash. A malformed stored hash
/// counts as a mismatch rather than an error: the caller only ever
/// needs a yes/no.
pub fn verify_password(password: &Password, stored_hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(stored_hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_str().as_bytes(), &parsed_hash)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let password = Password::new("correct horse battery staple".to_string());
        let hash = hash_password(&password).expect("hashing failed");

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&password, &hash));
    }

    #[test]
    fn wrong_password_fails() {
        let password = Password::new("original".to_string());
        let hash = hash_password(&password).expect("hashing failed");

        assert!(!verify_password(&Password::new("not the one".to_string()), &hash));
    }

    #[test]
    fn malformed_hash_is_a_mismatch() {
        let password = Password::new("whatever".to_string());
        assert!(!verify_password(&password, "not-a-phc-string"));
    }

    #[test]
    fn same_password_hashes_differently() {
        let password = Password::new("repeatable".to_string());
        let hash1 = hash_password(&password).unwrap();
        let hash2 = hash_password(&password).unwrap();

        assert_ne!(hash1, hash2);
        assert!(verify_password(&password, &hash1));
        assert!(verify_password(&password, &hash2));
    }
}
