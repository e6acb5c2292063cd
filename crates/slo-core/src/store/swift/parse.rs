//! Response header and body helpers.

const EXCERPT_LEN: usize = 200;

/// `ETag` value from collected header lines, without surrounding quotes.
pub(super) fn etag(lines: &[String]) -> Option<String> {
    lines.iter().rev().find_map(|line| {
        let (name, value) = line.trim().split_once(':')?;
        if name.trim().eq_ignore_ascii_case("etag") {
            let value = value.trim().trim_matches('"');
            (!value.is_empty()).then(|| value.to_string())
        } else {
            None
        }
    })
}

/// First few hundred characters of a response body, for error messages.
pub(super) fn body_excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    match text.char_indices().nth(EXCERPT_LEN) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
