// Credential holder: keeps the single fal API key for the session. The key
// only ever lives in memory; it is borrowed by the generation client for the
// duration of a call and never written anywhere.

use std::fmt;

/// Opaque API key. `Debug` never prints the secret.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Credential(value.into().trim().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw secret, for building the authorization header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("Credential(<empty>)")
        } else {
            f.write_str("Credential(<redacted>)")
        }
    }
}

/// Owns the session's credential. Only this type mutates it.
#[derive(Debug, Clone, Default)]
pub struct CredentialHolder {
    value: Credential,
}

impl CredentialHolder {
    /// Seed the holder from configuration (e.g. `FAL_KEY`).
    pub fn from_env_value(value: Option<String>) -> Self {
        CredentialHolder {
            value: value.map(Credential::new).unwrap_or_default(),
        }
    }

    pub fn get(&self) -> &Credential {
        &self.value
    }

    /// Store a key typed by the user. Returns true when the holder now has a
    /// usable key, so the caller can show a confirmation. A blank value
    /// leaves the current key untouched.
    pub fn set(&mut self, value: &str) -> bool {
        let credential = Credential::new(value);
        if credential.is_empty() {
            return self.is_set();
        }
        self.value = credential;
        tracing::info!("API key set interactively");
        true
    }

    /// Reset to empty. Safe to call repeatedly.
    pub fn clear(&mut self) {
        self.value = Credential::default();
        tracing::info!("API key cleared");
    }

    pub fn is_set(&self) -> bool {
        !self.value.is_empty()
    }
}
