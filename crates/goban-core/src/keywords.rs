//! Keyword list parsing and comment matching.

/// Split a comma-separated keyword list, trimming entries and dropping blanks.
/// Order is preserved: it decides which keyword wins when several match.
pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// Return the first keyword (lowercased) contained in `text`, ignoring case.
pub fn first_match(text: &str, keywords: &[String]) -> Option<String> {
    let haystack = text.to_lowercase();
    keywords
        .iter()
        .map(|k| k.to_lowercase())
        .find(|k| haystack.contains(k.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keywords() {
        assert_eq!(parse_keywords("spam, scam ,,  "), vec!["spam", "scam"]);
        assert!(parse_keywords("").is_empty());
        assert!(parse_keywords(" , ,").is_empty());
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let kws = parse_keywords("Spam");
        assert_eq!(first_match("this is SPAM", &kws).as_deref(), Some("spam"));
        assert_eq!(first_match("hello world", &kws), None);
    }

    #[test]
    fn test_first_keyword_in_list_order_wins() {
        let kws = parse_keywords("scam,spam");
        // Both match; list order decides, not position in the text.
        assert_eq!(
            first_match("spam and a scam", &kws).as_deref(),
            Some("scam")
        );
    }

    #[test]
    fn test_substring_match_inside_words() {
        let kws = parse_keywords("广告");
        assert_eq!(first_match("看我主页有广告哦", &kws).as_deref(), Some("广告"));
    }
}
