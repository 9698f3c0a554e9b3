use std::collections::BTreeMap;

pub type Headers = Vec<(String, String)>;

/// Replaces the first header matching `name` (ASCII case-insensitive) or appends one.
pub fn header_set(headers: &mut Headers, name: impl Into<String>, value: impl Into<String>) {
    let name = name.into();
    let value = value.into();
    if let Some((_, existing)) = headers
        .iter_mut()
        .find(|(key, _)| key.eq_ignore_ascii_case(&name))
    {
        *existing = value;
        return;
    }
    headers.push((name, value));
}

/// Sets the header only when no header with that name exists yet.
pub fn header_set_default(headers: &mut Headers, name: &str, value: impl Into<String>) {
    if header_get(headers, name).is_none() {
        headers.push((name.to_string(), value.into()));
    }
}

pub fn header_get<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

pub fn headers_from_map(map: &BTreeMap<String, String>) -> Headers {
    let mut headers = Headers::with_capacity(map.len());
    for (name, value) in map {
        header_set(&mut headers, name.clone(), value.clone());
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_ignore_case() {
        let mut headers = Headers::new();
        header_set(&mut headers, "Content-Type", "application/json");
        header_set(&mut headers, "content-type", "text/event-stream");
        assert_eq!(headers.len(), 1);
        assert_eq!(header_get(&headers, "CONTENT-TYPE"), Some("text/event-stream"));

        header_set_default(&mut headers, "content-type", "ignored");
        header_set_default(&mut headers, "x-title", "llmgate");
        assert_eq!(header_get(&headers, "content-type"), Some("text/event-stream"));
        assert_eq!(header_get(&headers, "x-title"), Some("llmgate"));
    }
}
