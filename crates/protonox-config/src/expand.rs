//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in a string.
///
/// Bare `$VAR` is left alone: only the braced form triggers expansion.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, LookupError> {
        match std::env::var(var) {
            Ok(val) => Ok(Some(val)),
            Err(_) => Err(LookupError {
                var_name: var.to_owned(),
            }),
        }
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{0}}} not set", e.cause.var_name),
    })
}

/// Environment variable lookup failure.
struct LookupError {
    var_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_with_default_falls_back() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("PROTONOX_UNSET_PORT_TEST");
        }
        let result = expand_env("/${PROTONOX_UNSET_PORT_TEST:-__studio}/client.js", "f").unwrap();
        assert_eq!(result, "/__studio/client.js");
    }

    #[test]
    fn test_expand_set_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("PROTONOX_HOST_TEST", "0.0.0.0");
        }
        let result = expand_env("${PROTONOX_HOST_TEST}", "server.host").unwrap();
        assert_eq!(result, "0.0.0.0");
        unsafe {
            std::env::remove_var("PROTONOX_HOST_TEST");
        }
    }

    #[test]
    fn test_expand_missing_var_names_field() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("PROTONOX_MISSING_TEST");
        }
        let err = expand_env("${PROTONOX_MISSING_TEST}", "bridge.overlay_path").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("PROTONOX_MISSING_TEST"));
        assert!(err.to_string().contains("bridge.overlay_path"));
    }

    #[test]
    fn test_bare_dollar_not_expanded() {
        assert_eq!(expand_env("$HOME", "server.host").unwrap(), "$HOME");
    }
}
