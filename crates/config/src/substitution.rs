use anyhow::{Context, Result};
use regex::Regex;
use std::env;
use tracing::{debug, warn};

/// `${VAR}` or `${VAR:-fallback}`
const PLACEHOLDER: &str = r"\$\{(\w+)(?::-([^}]*))?\}";

fn placeholder_regex() -> Result<Regex> {
    Regex::new(PLACEHOLDER).context("Invalid placeholder pattern")
}

/// Substitute environment variables written as `${VAR_NAME}` or
/// `${VAR_NAME:-fallback}`.
///
/// A variable that is unset and has no fallback keeps its placeholder;
/// the validator reports it.
pub fn substitute_env_vars(content: &str) -> Result<String> {
    let re = placeholder_regex()?;
    let mut missing_vars = Vec::new();

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        match (env::var(var_name), caps.get(2)) {
            (Ok(value), _) => {
                debug!("Substituting environment variable: {}", var_name);
                value
            }
            (Err(_), Some(fallback)) => {
                debug!("Environment variable '{}' not set, using fallback", var_name);
                fallback.as_str().to_string()
            }
            (Err(_), None) => {
                warn!("Environment variable '{}' not set", var_name);
                missing_vars.push(var_name.to_string());
                caps[0].to_string()
            }
        }
    });

    if !missing_vars.is_empty() {
        debug!(
            "Environment variables not set (placeholders kept): {:?}",
            missing_vars
        );
    }

    Ok(result.into_owned())
}

/// Names of placeholders left in a string after substitution
pub fn unresolved_env_vars(content: &str) -> Result<Vec<String>> {
    let re = placeholder_regex()?;
    Ok(re
        .captures_iter(content)
        .map(|caps| caps[1].to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitutes_set_variable() {
        env::set_var("OIWATCH_TEST_HOST", "10.0.0.7");
        let out = substitute_env_vars("host: ${OIWATCH_TEST_HOST}").unwrap();
        assert_eq!(out, "host: 10.0.0.7");
    }

    #[test]
    fn test_fallback_used_when_unset() {
        env::remove_var("OIWATCH_TEST_UNSET_PORT");
        let out = substitute_env_vars("http_port: ${OIWATCH_TEST_UNSET_PORT:-8080}").unwrap();
        assert_eq!(out, "http_port: 8080");
    }

    #[test]
    fn test_missing_variable_keeps_placeholder() {
        env::remove_var("OIWATCH_TEST_MISSING_URL");
        let out = substitute_env_vars("export_url: ${OIWATCH_TEST_MISSING_URL}").unwrap();
        assert_eq!(out, "export_url: ${OIWATCH_TEST_MISSING_URL}");
        assert_eq!(
            unresolved_env_vars(&out).unwrap(),
            vec!["OIWATCH_TEST_MISSING_URL"]
        );
    }

    #[test]
    fn test_plain_dollar_is_left_alone() {
        let out = substitute_env_vars("note: costs $5").unwrap();
        assert_eq!(out, "note: costs $5");
        assert!(unresolved_env_vars(&out).unwrap().is_empty());
    }
}
