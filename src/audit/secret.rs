//! Audit signing key providers

use crate::config::AuditConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecretError {
    #[error("audit secret environment variable `{0}` is not set")]
    Missing(String),

    #[error("audit secret from `{source_name}` is {len} bytes, need at least {min}")]
    TooShort {
        source_name: String,
        len: usize,
        min: usize,
    },
}

/// Supplies the HMAC key used to sign and verify audit entries.
pub trait SecretProvider: Send + Sync {
    fn audit_key(&self) -> Result<Vec<u8>, SecretError>;
}

/// Fixed in-process key, for tests and embedded use.
#[derive(Clone)]
pub struct StaticSecret {
    key: Vec<u8>,
}

impl StaticSecret {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }
}

impl std::fmt::Debug for StaticSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticSecret").field("len", &self.key.len()).finish()
    }
}

impl SecretProvider for StaticSecret {
    fn audit_key(&self) -> Result<Vec<u8>, SecretError> {
        Ok(self.key.clone())
    }
}

/// Key read from an environment variable on every request.
#[derive(Debug, Clone)]
pub struct EnvSecret {
    var: String,
    min_len: usize,
}

impl EnvSecret {
    pub fn new(var: impl Into<String>, min_len: usize) -> Self {
        Self {
            var: var.into(),
            min_len,
        }
    }

    pub fn from_config(config: &AuditConfig) -> Self {
        Self::new(config.secret_env.clone(), config.min_secret_len)
    }

    pub fn var(&self) -> &str {
        &self.var
    }
}

impl SecretProvider for EnvSecret {
    fn audit_key(&self) -> Result<Vec<u8>, SecretError> {
        let value = std::env::var(&self.var).map_err(|_| SecretError::Missing(self.var.clone()))?;
        if value.len() < self.min_len {
            return Err(SecretError::TooShort {
                source_name: self.var.clone(),
                len: value.len(),
                min: self.min_len,
            });
        }
        Ok(value.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_secret_returns_key() {
        let secret = StaticSecret::new("a-static-test-key");
        assert_eq!(secret.audit_key().unwrap(), b"a-static-test-key".to_vec());
        assert!(!format!("{secret:?}").contains("static-test"));
    }

    #[test]
    fn env_secret_reports_missing_variable() {
        let secret = EnvSecret::new("BLUEPATH_TEST_SECRET_THAT_IS_NEVER_SET", 16);
        assert_eq!(
            secret.audit_key(),
            Err(SecretError::Missing("BLUEPATH_TEST_SECRET_THAT_IS_NEVER_SET".into()))
        );
    }

    #[test]
    fn env_secret_enforces_minimum_length() {
        std::env::set_var("BLUEPATH_TEST_SHORT_SECRET", "short");
        let secret = EnvSecret::new("BLUEPATH_TEST_SHORT_SECRET", 16);
        assert!(matches!(secret.audit_key(), Err(SecretError::TooShort { len: 5, .. })));

        let relaxed = EnvSecret::new("BLUEPATH_TEST_SHORT_SECRET", 4);
        assert_eq!(relaxed.audit_key().unwrap(), b"short".to_vec());
    }
}
