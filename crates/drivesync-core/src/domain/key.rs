//! Storage key builder
//!
//! Keys have the shape `<prefix>/<segment>/.../<leaf>`. Every folder segment
//! and the leaf are sanitized independently, and the entity identifier is
//! folded into the leaf (`<stem>__<id><.ext>`) so that two source files with
//! the same name and folder never share a key. Updating a file overwrites the
//! same key; no history is kept.
//!
//! Distinct raw names may still sanitize to the same text (`a/b` and `a_b`);
//! the identifier suffix is what keeps keys unique.

use super::newtypes::StorageKey;

/// Maximum length of a folder segment, in characters
pub const MAX_SEGMENT_CHARS: usize = 100;

/// Maximum length of a sanitized leaf name, in characters
pub const MAX_LEAF_CHARS: usize = 150;

/// Longest suffix still treated as an extension when truncating a leaf
const MAX_EXTENSION_CHARS: usize = 16;

/// Placeholder for names that sanitize to nothing
const EMPTY_PLACEHOLDER: &str = "_";

/// Separator between a leaf stem and the entity identifier
const ID_SEPARATOR: &str = "__";

fn is_allowed(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '-' | ' ' | '(' | ')')
}

/// Replace disallowed characters, then collapse runs of spaces
///
/// Only a plain space is allowed; tabs, newlines and other whitespace inside
/// the name become `_` like any other disallowed character.
fn clean(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        let c = if is_allowed(c) { c } else { '_' };
        if c == ' ' && out.ends_with(' ') {
            continue;
        }
        out.push(c);
    }
    out
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Split a leaf into stem and extension (with the dot)
///
/// Leading-dot names like `.env` have no extension.
fn split_extension(leaf: &str) -> (&str, &str) {
    match leaf.rfind('.') {
        Some(idx) if idx > 0 && leaf[idx..].chars().count() <= MAX_EXTENSION_CHARS => {
            (&leaf[..idx], &leaf[idx..])
        }
        _ => (leaf, ""),
    }
}

/// Sanitize one folder segment
///
/// Idempotent: sanitizing an already sanitized segment returns it unchanged.
pub fn sanitize_segment(raw: &str) -> String {
    let cleaned = clean(raw);
    let truncated = truncate_chars(&cleaned, MAX_SEGMENT_CHARS);
    let trimmed = truncated.trim_matches(|c| c == ' ' || c == '.');
    if trimmed.is_empty() {
        EMPTY_PLACEHOLDER.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Sanitize a leaf (file) name
///
/// When truncation is needed, a short extension is kept and the stem is
/// shortened instead. Idempotent like [`sanitize_segment`].
pub fn sanitize_leaf(raw: &str) -> String {
    let cleaned = clean(raw);
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        return EMPTY_PLACEHOLDER.to_string();
    }
    if cleaned.chars().count() <= MAX_LEAF_CHARS {
        return cleaned;
    }

    let (stem, extension) = split_extension(&cleaned);
    let budget = MAX_LEAF_CHARS - extension.chars().count();
    let stem = truncate_chars(stem, budget).trim_end();
    let leaf = format!("{stem}{extension}");
    if leaf.chars().all(|c| c == '.') {
        EMPTY_PLACEHOLDER.to_string()
    } else {
        leaf
    }
}

/// Fold an entity identifier into a sanitized leaf
fn leaf_with_id(leaf: &str, entity_id: &str) -> String {
    let id = sanitize_segment(entity_id);
    let (stem, extension) = split_extension(leaf);
    format!("{stem}{ID_SEPARATOR}{id}{extension}")
}

/// Build the storage key for one object
///
/// `prefix` is trimmed of slashes and omitted when empty; it may itself
/// contain `/`-separated parts, each sanitized like a folder segment.
pub fn build_key(
    prefix: &str,
    folder_segments: &[String],
    leaf_name: &str,
    entity_id: Option<&str>,
) -> StorageKey {
    let mut parts: Vec<String> = prefix
        .split('/')
        .filter(|p| !p.trim().is_empty())
        .map(sanitize_segment)
        .collect();
    parts.extend(folder_segments.iter().map(|s| sanitize_segment(s)));

    let leaf = sanitize_leaf(leaf_name);
    let leaf = match entity_id.filter(|id| !id.is_empty()) {
        Some(id) => leaf_with_id(&leaf, id),
        None => leaf,
    };
    parts.push(leaf);

    // Every part is non-empty and never "." or ".." after sanitization.
    StorageKey::from_sanitized(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sanitize_segment_rules() {
        assert_eq!(sanitize_segment("  Projects  "), "Projects");
        assert_eq!(sanitize_segment("a/b\\c:d"), "a_b_c_d");
        assert_eq!(sanitize_segment("two   spaces here"), "two spaces here");
        assert_eq!(sanitize_segment("a\tb"), "a_b");
        assert_eq!(sanitize_segment("line\nbreak \u{a0}nbsp"), "line_break _nbsp");
        assert_eq!(sanitize_segment("Notes (2024) v1.2-final"), "Notes (2024) v1.2-final");
        assert_eq!(sanitize_segment("trailing. . "), "trailing");
        assert_eq!(sanitize_segment(""), "_");
        assert_eq!(sanitize_segment(".."), "_");
        assert_eq!(sanitize_segment("Über Ordner"), "Über Ordner");
    }

    #[test]
    fn test_sanitize_segment_truncates() {
        let long = "x".repeat(250);
        assert_eq!(sanitize_segment(&long).chars().count(), MAX_SEGMENT_CHARS);

        // truncation exposing a trailing dot is trimmed too
        let tricky = format!("{}.{}", "a".repeat(99), "b".repeat(20));
        assert_eq!(sanitize_segment(&tricky), "a".repeat(99));
    }

    #[test]
    fn test_sanitize_leaf_rules() {
        assert_eq!(sanitize_leaf(" my file?.pdf "), "my file_.pdf");
        assert_eq!(sanitize_leaf("..."), "_");
        assert_eq!(sanitize_leaf(""), "_");
        assert_eq!(sanitize_leaf(".env"), ".env");
        assert_eq!(sanitize_leaf("x\ny.txt"), "x_y.txt");
        assert_eq!(sanitize_leaf("\tpadded\n"), "padded");
    }

    #[test]
    fn test_sanitize_leaf_truncation_keeps_extension() {
        let long = format!("{}.docx", "r".repeat(300));
        let leaf = sanitize_leaf(&long);
        assert_eq!(leaf.chars().count(), MAX_LEAF_CHARS);
        assert!(leaf.ends_with(".docx"));
    }

    #[test]
    fn test_build_key_shape() {
        let key = build_key(
            "drivesync",
            &segs(&["My Drive", "Work/2024"]),
            "Report.docx",
            Some("abc123"),
        );
        assert_eq!(key.as_str(), "drivesync/My Drive/Work_2024/Report__abc123.docx");
    }

    #[test]
    fn test_build_key_without_id_or_extension() {
        let key = build_key("/backup/", &segs(&["My Drive"]), "README", None);
        assert_eq!(key.as_str(), "backup/My Drive/README");

        let key = build_key("", &segs(&["My Drive"]), "README", Some("id9"));
        assert_eq!(key.as_str(), "My Drive/README__id9");
    }

    #[test]
    fn test_build_key_nested_prefix() {
        let key = build_key("org/drive sync", &[], "a.txt", Some("x"));
        assert_eq!(key.as_str(), "org/drive sync/a__x.txt");
    }

    #[test]
    fn test_build_key_idempotent_on_sanitized_input() {
        let raw_segments = segs(&["  My Drive ", "Q3: plans..", "a/b"]);
        let raw_leaf = "budget  final?.xlsx";
        let first = build_key("drivesync", &raw_segments, raw_leaf, Some("id-1"));

        let clean_segments: Vec<String> =
            raw_segments.iter().map(|s| sanitize_segment(s)).collect();
        let clean_leaf = sanitize_leaf(raw_leaf);
        let second = build_key("drivesync", &clean_segments, &clean_leaf, Some("id-1"));

        assert_eq!(first, second);
    }

    #[test]
    fn test_build_key_is_deterministic() {
        let a = build_key("p", &segs(&["x"]), "y.bin", Some("1"));
        let b = build_key("p", &segs(&["x"]), "y.bin", Some("1"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_build_key_never_escapes() {
        let key = build_key("..", &segs(&["..", "."]), "..", Some(".."));
        assert!(key.components().all(|c| c != ".." && c != "."));
    }

    mod properties {
        use proptest::prelude::*;

        use super::super::*;

        /// Arbitrary Unicode plus names dense in the characters the rules care about
        fn raw_name() -> impl Strategy<Value = String> {
            prop_oneof![
                any::<String>(),
                "[ a-zA-Z0-9._()\\-/?:\t\n\u{a0}\u{3000}]{0,260}",
            ]
        }

        /// Drive identifiers are URL-safe base64-like tokens
        fn drive_id() -> impl Strategy<Value = String> {
            "[A-Za-z0-9_-]{1,44}"
        }

        proptest! {
            #[test]
            fn sanitize_segment_is_idempotent(raw in raw_name()) {
                let once = sanitize_segment(&raw);
                prop_assert_eq!(sanitize_segment(&once), once.clone());
                prop_assert!(once.chars().count() <= MAX_SEGMENT_CHARS);
                prop_assert!(once.chars().all(is_allowed));
            }

            #[test]
            fn sanitize_leaf_is_idempotent(raw in raw_name()) {
                let once = sanitize_leaf(&raw);
                prop_assert_eq!(sanitize_leaf(&once), once.clone());
                prop_assert!(once.chars().count() <= MAX_LEAF_CHARS);
                prop_assert!(!once.contains("  "));
            }

            #[test]
            fn build_key_is_idempotent_on_sanitized_parts(
                segments in prop::collection::vec(raw_name(), 0..4),
                leaf in raw_name(),
                id in drive_id(),
            ) {
                let first = build_key("drivesync", &segments, &leaf, Some(&id));
                let clean_segments: Vec<String> =
                    segments.iter().map(|s| sanitize_segment(s)).collect();
                let second =
                    build_key("drivesync", &clean_segments, &sanitize_leaf(&leaf), Some(&id));
                prop_assert_eq!(first.clone(), second);
                prop_assert!(first.components().all(|c| !c.is_empty() && c != "." && c != ".."));
            }

            #[test]
            fn build_key_is_unique_per_entity(
                segments in prop::collection::vec(raw_name(), 0..4),
                leaf in raw_name(),
                id_a in drive_id(),
                id_b in drive_id(),
            ) {
                prop_assume!(id_a != id_b);
                let a = build_key("drivesync", &segments, &leaf, Some(&id_a));
                let b = build_key("drivesync", &segments, &leaf, Some(&id_b));
                prop_assert_ne!(a, b);
            }
        }
    }
}
