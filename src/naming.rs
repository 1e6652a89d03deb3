//! Filesystem-safe name sanitization.
//!
//! Every user-supplied name (unit names, folder names) passes through
//! [`sanitize`] before it becomes part of an on-disk path. The catalog
//! identifies entries by their filenames, so this is the single choke point
//! that keeps request input from smuggling separators or reserved characters
//! into the tree.

/// Characters that are replaced with `_`.
///
/// Path separators, the drive-letter colon, quote, pipe, wildcards, and
/// angle brackets — the union of what POSIX and Windows refuse or
/// misinterpret in a filename.
const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Maximum length of a sanitized name, in characters.
const MAX_LEN: usize = 200;

/// Fallback when sanitization leaves nothing behind.
const FALLBACK: &str = "unnamed";

/// Sanitize a user-supplied name into a filesystem-safe identifier.
///
/// Total and deterministic: never fails, always returns a non-empty string.
///
/// - `"a/b:c"` → `"a_b_c"`
/// - `"photo\u{0007}.png"` → `"photo.png"` (control characters stripped)
/// - 250 chars + `".png"` → truncated to 200 with `".png"` kept
/// - `"  spaced  "` → `"spaced"`
/// - `""` / `"\u{1}\u{2}"` → `"unnamed"`
pub fn sanitize(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if FORBIDDEN.contains(&c) { '_' } else { c })
        .filter(|c| !c.is_control())
        .collect();

    let truncated = truncate_keeping_extension(&replaced, MAX_LEN);

    let trimmed = truncated.trim();
    if trimmed.is_empty() {
        FALLBACK.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Cut `name` down to `max` characters, keeping a trailing `.ext` intact.
///
/// The extension is whatever follows the last dot, provided the dot is not
/// the first character (so `.hidden` counts as a bare name, not an
/// extension).
fn truncate_keeping_extension(name: &str, max: usize) -> String {
    if name.chars().count() <= max {
        return name.to_string();
    }

    let ext = match name.rfind('.') {
        Some(pos) if pos > 0 => &name[pos..],
        _ => "",
    };

    let ext_len = ext.chars().count();
    let keep = max.saturating_sub(ext_len);
    let stem: String = name.chars().take(keep).collect();
    format!("{stem}{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_name_unchanged() {
        assert_eq!(sanitize("blaze"), "blaze");
        assert_eq!(sanitize("My Photo 01.png"), "My Photo 01.png");
    }

    #[test]
    fn forbidden_characters_become_underscores() {
        assert_eq!(sanitize("a/b"), "a_b");
        assert_eq!(sanitize("a\\b"), "a_b");
        assert_eq!(sanitize("c:drive"), "c_drive");
        assert_eq!(sanitize("he said \"hi\""), "he said _hi_");
        assert_eq!(sanitize("a|b?c*d<e>f"), "a_b_c_d_e_f");
    }

    #[test]
    fn control_characters_stripped() {
        assert_eq!(sanitize("pho\u{0}to"), "photo");
        assert_eq!(sanitize("tab\there"), "tabhere");
        assert_eq!(sanitize("line\nbreak"), "linebreak");
    }

    #[test]
    fn surrounding_whitespace_trimmed() {
        assert_eq!(sanitize("  spaced  "), "spaced");
    }

    #[test]
    fn empty_input_falls_back() {
        assert_eq!(sanitize(""), "unnamed");
        assert_eq!(sanitize("   "), "unnamed");
        assert_eq!(sanitize("\u{1}\u{2}\u{3}"), "unnamed");
    }

    #[test]
    fn long_name_truncated_to_limit() {
        let long = "x".repeat(300);
        let out = sanitize(&long);
        assert_eq!(out.chars().count(), 200);
    }

    #[test]
    fn truncation_preserves_extension() {
        let long = format!("{}.png", "x".repeat(300));
        let out = sanitize(&long);
        assert_eq!(out.chars().count(), 200);
        assert!(out.ends_with(".png"));
    }

    #[test]
    fn short_names_not_padded_or_cut() {
        let name = format!("{}.jpg", "a".repeat(50));
        assert_eq!(sanitize(&name), name);
    }

    #[test]
    fn leading_dot_is_not_an_extension() {
        let long = format!(".{}", "h".repeat(300));
        let out = sanitize(&long);
        assert_eq!(out.chars().count(), 200);
        // The whole thing is a stem; nothing glued back on after the cut.
        assert!(out.starts_with(".h"));
    }

    #[test]
    fn unicode_names_survive() {
        assert_eq!(sanitize("火焰英雄"), "火焰英雄");
    }

    #[test]
    fn result_never_contains_forbidden_characters() {
        let nasty = "../../etc/passwd\u{0}<|>*?:\"\\";
        let out = sanitize(nasty);
        assert!(!out.is_empty());
        for c in FORBIDDEN {
            assert!(!out.contains(*c), "forbidden {c:?} leaked into {out:?}");
        }
        assert!(!out.chars().any(char::is_control));
    }
}
