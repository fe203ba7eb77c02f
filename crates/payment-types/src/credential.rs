use std::fmt;
use std::fmt::{Debug, Formatter};

/// Pass/fail check applied to the credential carried by a payment request.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, credential: &str) -> bool;
}

impl<F> CredentialVerifier for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn verify(&self, credential: &str) -> bool {
        self(credential)
    }
}

/// Accepts exactly one configured secret.
#[derive(Clone, PartialEq, Eq)]
pub struct StaticCredential(String);

impl StaticCredential {
    pub fn new<S: Into<String>>(secret: S) -> Self {
        Self(secret.into())
    }
}

impl Debug for StaticCredential {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("StaticCredential(<redacted>)")
    }
}

impl CredentialVerifier for StaticCredential {
    fn verify(&self, credential: &str) -> bool {
        // An empty configured secret must not match an empty header.
        !self.0.is_empty() && self.0 == credential
    }
}
