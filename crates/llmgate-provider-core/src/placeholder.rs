//! `${VAR}` placeholders in operator configuration.

/// Sentinel meaning "the end user supplies this value".
pub const USER_PROVIDED: &str = "user_provided";

pub fn is_user_provided(value: &str) -> bool {
    value == USER_PROVIDED
}

/// True when the whole value is still a `${VAR}` reference.
pub fn is_unresolved_placeholder(value: &str) -> bool {
    placeholder_name(value).is_some()
}

/// Substitutes environment values into `raw`.
pub fn resolve_placeholder(raw: &str) -> String {
    resolve_placeholder_with(raw, |name| std::env::var(name).ok())
}

/// Substitution with an explicit lookup.
///
/// A value that is entirely `${VAR}` becomes the variable's value, or stays verbatim
/// (trimmed) when the variable is unset or empty. Embedded references are replaced
/// one by one; unknown ones are left as written.
pub fn resolve_placeholder_with<F>(raw: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if raw.is_empty() {
        return String::new();
    }
    let trimmed = raw.trim();
    if let Some(name) = placeholder_name(trimmed) {
        return lookup(name)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| trimmed.to_string());
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        match lookup(name).filter(|_| !name.is_empty()) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[start..start + 2 + end + 1]),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

fn placeholder_name(value: &str) -> Option<&str> {
    value
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(name: &str) -> Option<String> {
        match name {
            "OPENROUTER_KEY" => Some("sk-or-123".to_string()),
            "HOST" => Some("api.example.com".to_string()),
            "EMPTY" => Some(String::new()),
            _ => None,
        }
    }

    #[test]
    fn whole_value_placeholder_resolves() {
        assert_eq!(resolve_placeholder_with("${OPENROUTER_KEY}", env), "sk-or-123");
        assert_eq!(resolve_placeholder_with("  ${OPENROUTER_KEY} ", env), "sk-or-123");
    }

    #[test]
    fn unset_placeholder_stays_unresolved() {
        let value = resolve_placeholder_with("${MISSING_ENV_VAR}", env);
        assert_eq!(value, "${MISSING_ENV_VAR}");
        assert!(is_unresolved_placeholder(&value));

        let empty = resolve_placeholder_with("${EMPTY}", env);
        assert!(is_unresolved_placeholder(&empty));
    }

    #[test]
    fn embedded_placeholders_are_substituted() {
        assert_eq!(
            resolve_placeholder_with("https://${HOST}/v1", env),
            "https://api.example.com/v1"
        );
        assert_eq!(
            resolve_placeholder_with("https://${NOPE}/v1/${HOST}", env),
            "https://${NOPE}/v1/api.example.com"
        );
        assert_eq!(resolve_placeholder_with("broken ${HOST", env), "broken ${HOST");
    }

    #[test]
    fn plain_values_pass_through() {
        assert_eq!(resolve_placeholder_with("sk-plain", env), "sk-plain");
        assert_eq!(resolve_placeholder_with("", env), "");
        assert!(!is_unresolved_placeholder("sk-plain"));
        assert!(!is_unresolved_placeholder("${}"));
        assert!(is_user_provided("user_provided"));
        assert!(!is_user_provided("USER_PROVIDED"));
    }
}
