//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in `value`.
///
/// Variables are resolved through `lookup`. A reference without a default to
/// an unset variable is an error naming `field`. Bare `$VAR` is left alone.
pub(crate) fn expand_env(
    value: &str,
    field: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, LookupError> {
        match lookup(var) {
            Some(val) => Ok(Some(val)),
            None => Err(LookupError {
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

/// Expand a leading `~` to the user's home directory.
pub(crate) fn expand_home(value: &str) -> String {
    shellexpand::tilde(value).into_owned()
}

struct LookupError {
    var_name: String,
}
