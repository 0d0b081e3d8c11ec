//! Defensive text sanitization
//!
//! The drawing fonts cover printable ASCII, the printable Latin-1
//! supplement and the euro sign. Everything else is stripped before text
//! reaches a page: the general-punctuation block collapses to a plain
//! space, symbol/emoji/CJK/surrogate/control characters are dropped.
//!
//! `sanitize` is idempotent and total: it never fails, worst case it
//! returns an empty string. Callers measure text widths on the sanitized
//! string so layout math and drawing stay consistent.

/// Count of characters altered by sanitization across a merge call.
///
/// Loss is informational, never an error; the engine surfaces the counts
/// in its result metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    /// Characters deleted outright.
    pub dropped: usize,
    /// Punctuation-block characters replaced by a space.
    pub replaced: usize,
}

impl SanitizeReport {
    /// Whether any input character failed to pass through unchanged.
    pub fn lossy(&self) -> bool {
        self.dropped > 0 || self.replaced > 0
    }
}

/// Whether a character survives sanitization unchanged.
fn is_allowed(c: char) -> bool {
    matches!(c, ' '..='~') || matches!(c, '\u{00A0}'..='\u{00FF}') || c == '\u{20AC}'
}

/// Whether a character is in the general-punctuation block that maps to a
/// plain space (smart quotes, dashes, ellipses and friends).
fn is_punctuation_block(c: char) -> bool {
    matches!(c, '\u{2000}'..='\u{206F}')
}

/// Sanitize text down to the drawable repertoire, counting what changed.
pub fn sanitize_counted(text: &str, report: &mut SanitizeReport) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if is_allowed(c) {
            out.push(c);
        } else if is_punctuation_block(c) {
            out.push(' ');
            report.replaced += 1;
        } else {
            report.dropped += 1;
        }
    }

    if report.lossy() {
        log::debug!(
            "sanitize: dropped {} and replaced {} characters",
            report.dropped,
            report.replaced
        );
    }

    out
}

/// Sanitize text down to the drawable repertoire.
pub fn sanitize(text: &str) -> String {
    let mut report = SanitizeReport::default();
    sanitize_counted(text, &mut report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ascii_passes_through() {
        let input = "Acme Corp #42 (final) $1,200!";
        assert_eq!(sanitize(input), input);
    }

    #[test]
    fn test_latin1_and_euro_pass_through() {
        let input = "Café São Tomé \u{20AC}99";
        assert_eq!(sanitize(input), input);
    }

    #[test]
    fn test_punctuation_block_becomes_space() {
        assert_eq!(sanitize("Acme\u{2014}Corp"), "Acme Corp");
        assert_eq!(sanitize("\u{201C}quoted\u{201D}"), " quoted ");
    }

    #[test]
    fn test_symbols_and_cjk_dropped() {
        assert_eq!(sanitize("ok\u{1F600}"), "ok");
        assert_eq!(sanitize("\u{4E2D}\u{6587}name"), "name");
        assert_eq!(sanitize("\u{2713} done"), " done");
    }

    #[test]
    fn test_control_characters_dropped() {
        assert_eq!(sanitize("a\u{0000}b\tc\nd"), "abcd");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "plain text",
            "Acme\u{2014}Corp \u{1F680}",
            "Café \u{20AC}42 \u{201C}hi\u{201D}",
            "\u{FFFF}\u{4E2D}",
            "",
        ];
        for input in inputs {
            let once = sanitize(input);
            let twice = sanitize(&once);
            assert_eq!(once, twice, "sanitize must be idempotent for {input:?}");
        }
    }

    #[test]
    fn test_output_stays_in_allow_list() {
        let input = "mixed \u{4E2D} content\u{2026} \u{1F4A9} Café \u{20AC}";
        for c in sanitize(input).chars() {
            assert!(is_allowed(c), "char {c:?} escaped the allow-list");
        }
    }

    #[test]
    fn test_worst_case_empty() {
        assert_eq!(sanitize("\u{1F600}\u{1F601}\u{1F602}"), "");
    }

    #[test]
    fn test_counted_report() {
        let mut report = SanitizeReport::default();
        let out = sanitize_counted("a\u{2014}b\u{1F600}", &mut report);
        assert_eq!(out, "a b");
        assert_eq!(report.replaced, 1);
        assert_eq!(report.dropped, 1);
        assert!(report.lossy());
    }
}
