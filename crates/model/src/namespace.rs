//! Textual namespace stripping for remote model documents.

use std::sync::OnceLock;

use regex::Regex;

/// Ordered (pattern, replacement) pairs applied by [`strip_namespaces`].
const TRANSFORMS: [(&str, &str); 4] = [
    // processing instructions, including the XML declaration
    (r"(?s)<\?.*?\?>", ""),
    // default and prefixed namespace declarations
    (r#"\s+xmlns(?::[\w.-]+)?\s*=\s*"[^"]*""#, ""),
    // prefixes on opening tags
    (r"<[\w.-]+:", "<"),
    // prefixes on closing tags
    (r"</[\w.-]+:", "</"),
];

fn transforms() -> &'static [(Regex, &'static str)] {
    static COMPILED: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        TRANSFORMS
            .iter()
            .filter_map(|(pattern, replacement)| {
                Regex::new(pattern).ok().map(|re| (re, *replacement))
            })
            .collect()
    })
}

/// Drop the XML preamble, namespace declarations and element prefixes so the
/// document can be queried by plain element names. Idempotent.
pub fn strip_namespaces(xml: &str) -> String {
    let mut out = xml.to_string();
    for (re, replacement) in transforms() {
        out = re.replace_all(&out, *replacement).into_owned();
    }
    out.trim().to_string()
}
