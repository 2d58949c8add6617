/// Hash a plaintext password for storage.
pub fn hash(plaintext: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(plaintext, bcrypt::DEFAULT_COST)
}

/// Verify a plaintext password against a stored hash - constant-time via bcrypt.
pub fn verify(plaintext: &str, stored_hash: &str) -> bool {
    bcrypt::verify(plaintext, stored_hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_password_verifies() {
        let hashed = hash("hunter2").unwrap();
        assert!(verify("hunter2", &hashed));
    }

    #[test]
    fn wrong_password_rejected() {
        let hashed = hash("hunter2").unwrap();
        assert!(!verify("hunter3", &hashed));
        assert!(!verify("", &hashed));
    }

    #[test]
    fn garbage_hash_rejected_not_panicking() {
        assert!(!verify("hunter2", "not-a-bcrypt-hash"));
    }
}
