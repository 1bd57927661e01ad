use std::fmt;

/// Lower-cased text with every whitespace run collapsed to a single space.
///
/// Gazette PDFs wrap names across lines and print them in upper case, so both
/// the document and the names are reduced to this form before comparing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn normalize(raw: &str) -> Self {
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        Self(collapsed.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, needle: &NormalizedText) -> bool {
        !needle.is_empty() && self.0.contains(needle.as_str())
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_collapses_whitespace() {
        let text = NormalizedText::normalize("  DIÁRIO\tOFICIAL \n\n do   MUNICÍPIO ");
        assert_eq!(text.as_str(), "diário oficial do município");
    }

    #[test]
    fn test_names_wrapped_across_lines_are_joined() {
        let text = NormalizedText::normalize("...TEST USER\r\n1\nand more...");
        assert!(text.contains(&NormalizedText::normalize("Test User 1")));
    }

    #[test]
    fn test_accented_capitals_are_lowercased() {
        let text = NormalizedText::normalize("LUIZ ANTÔNIO VASCONCELLOS CARREIRA");
        assert_eq!(text.as_str(), "luiz antônio vasconcellos carreira");
    }

    #[test]
    fn test_empty_needle_never_matches() {
        let text = NormalizedText::normalize("anything at all");
        assert!(!text.contains(&NormalizedText::normalize("   \n ")));
    }

    #[test]
    fn test_whitespace_only_input_is_empty() {
        assert!(NormalizedText::normalize(" \n\t ").is_empty());
    }
}
