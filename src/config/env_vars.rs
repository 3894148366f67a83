use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    /// `${VAR}` or `$VAR`
    static ref ENV_VAR_PATTERN: Regex =
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)").unwrap();
}

/// Expand `${VAR}` and `$VAR` references from the process environment.
///
/// Unset variables are left as written so a misconfiguration shows up
/// verbatim in the logs instead of silently turning into an empty string.
pub fn expand_env_vars(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

fn expand_with<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if !input.contains('$') {
        return input.to_string();
    }

    ENV_VAR_PATTERN
        .replace_all(input, |caps: &Captures| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            match lookup(name) {
                Some(value) => Cow::Owned(value),
                None => Cow::Owned(caps[0].to_string()),
            }
        })
        .into_owned()
}
