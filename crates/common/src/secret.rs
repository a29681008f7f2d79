//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports [`secrecy`] so the validator's configuration can hold key
//! material (a key set may carry symmetric `oct` secrets) without it ever
//! showing up in `{:?}` output or tracing fields. Access requires an explicit
//! `expose_secret()` call, which keeps every read site greppable.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct KeySource {
//!     name: String,
//!     document: SecretString,
//! }
//!
//! let source = KeySource {
//!     name: "JWTKS".to_string(),
//!     document: SecretString::from(r#"{"keys":[{"kty":"oct","k":"c2VjcmV0"}]}"#),
//! };
//!
//! assert!(!format!("{source:?}").contains("c2VjcmV0"));
//! assert!(source.document.expose_secret().contains("oct"));
//! ```

pub use secrecy::{ExposeSecret, SecretString};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let secret = SecretString::from("hunter2");
        let debug_str = format!("{secret:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("hunter2"));
    }

    #[test]
    fn test_expose_secret_returns_inner_value() {
        let secret = SecretString::from(r#"{"keys":[]}"#);
        assert_eq!(secret.expose_secret(), r#"{"keys":[]}"#);
    }

    #[test]
    fn test_clone_works() {
        let secret = SecretString::from("cloneable");
        let cloned = secret.clone();
        assert_eq!(cloned.expose_secret(), "cloneable");
    }
}
