//! Field-name hints.
//!
//! A bare string whose property is called `created_at` or `avatar_url` is
//! very likely a timestamp or a link even when the sampled value does not
//! look like one. These hints only refine the generic `string` rule.

use once_cell::sync::Lazy;
use regex::Regex;

use super::ContentType;

static CAMEL_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z])([A-Z])").unwrap());

/// Split an identifier on camelCase humps, `_`, `-` and whitespace.
pub fn tokenize(name: &str) -> Vec<String> {
    CAMEL_BOUNDARY
        .replace_all(name, "$1 $2")
        .to_lowercase()
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
        .collect()
}

/// The rule a string field called `name` should be upgraded to, if any.
pub fn hint(name: &str) -> Option<ContentType> {
    let tokens = tokenize(name);
    let last = tokens.last()?.as_str();

    if tokens.len() >= 2 && last == "at" {
        return Some(ContentType::DateTime);
    }
    match last {
        "url" | "uri" => Some(ContentType::Uri),
        "id" => Some(ContentType::Id),
        _ => None,
    }
}
