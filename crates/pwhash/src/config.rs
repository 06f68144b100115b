use core::time::Duration;

/// Form field holding the password to digest.
pub const PASSWORD_FIELD: &str = "password";

/// Default artificial delay before a digest becomes available.
pub const DEFAULT_HASH_DELAY: Duration = Duration::from_secs(5);

/// Default maximum length, in bytes, of a submitted form field.
pub const DEFAULT_MAX_PASSWORD_LEN: usize = 128;

/// Tunables of a [`Service`](crate::Service).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// How long a background task waits before computing the digest.
    pub hash_delay: Duration,
    /// Maximum length, in bytes, of every required form field.
    pub max_password_len: usize,
    /// Field whose value is digested. Always required.
    pub password_field: String,
    /// Further fields that must be present and non-empty on submission.
    pub extra_fields: Vec<String>,
}

impl ServiceConfig {
    /// All fields a submission must carry, the password field first.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        core::iter::once(self.password_field.as_str())
            .chain(self.extra_fields.iter().map(String::as_str))
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            hash_delay: DEFAULT_HASH_DELAY,
            max_password_len: DEFAULT_MAX_PASSWORD_LEN,
            password_field: PASSWORD_FIELD.to_string(),
            extra_fields: Vec::new(),
        }
    }
}
