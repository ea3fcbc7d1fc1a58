//! Helpers over course titles of the form `"CS 106A: Programming Methodology"`.

/// Maximum number of titles returned by a course search.
pub const SEARCH_LIMIT: usize = 15;

/// Longest query, spaces excluded, that is turned into a pattern. No course
/// title comes close.
pub const MAX_QUERY_CHARS: usize = 100;

/// `"CS 106A: Programming Methodology"` -> `"Programming Methodology"`.
/// Titles without a `:` are returned whole.
pub fn course_name(title: &str) -> &str {
    match title.split_once(':') {
        Some((_, name)) => name.trim(),
        None => title.trim(),
    }
}

/// Builds the case-insensitive pattern used to match course titles.
///
/// Spaces typed by the user are dropped and every remaining character may be
/// followed by an optional space, so `"cs106"` matches `"CS 106A"`.
/// Returns `None` for a blank query or one longer than [`MAX_QUERY_CHARS`].
pub fn search_pattern(text: &str) -> Option<String> {
    let compact: String = text.chars().filter(|c| *c != ' ').collect();
    if compact.is_empty() || compact.chars().count() > MAX_QUERY_CHARS {
        return None;
    }

    let mut pattern = String::from("(?i)");
    for ch in compact.chars() {
        pattern.push_str(&regex::escape(&ch.to_string()));
        pattern.push_str("(?: )?");
    }
    Some(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_the_part_after_the_colon() {
        let title = "CS 106A: Programming Methodology";
        assert_eq!(course_name(title), "Programming Methodology");
    }

    #[test]
    fn title_without_colon_is_its_own_name() {
        assert_eq!(course_name("CS106A"), "CS106A");
    }

    #[test]
    fn search_pattern_ignores_spaces_and_case() {
        let pattern = search_pattern("cs 106").unwrap();
        let re = regex::Regex::new(&pattern).unwrap();
        assert!(re.is_match("CS 106A: Programming Methodology"));
        assert!(re.is_match("CS106B: Programming Abstractions"));
        assert!(!re.is_match("MATH 51: Linear Algebra"));
    }

    #[test]
    fn search_pattern_escapes_metacharacters() {
        let pattern = search_pattern("c++").unwrap();
        let re = regex::Regex::new(&pattern).unwrap();
        assert!(re.is_match("CS 106L: Standard C++ Programming"));
        assert!(!re.is_match("CS 107: Computer Organization"));
    }

    #[test]
    fn blank_query_has_no_pattern() {
        assert_eq!(search_pattern(""), None);
        assert_eq!(search_pattern("   "), None);
    }

    #[test]
    fn oversized_query_has_no_pattern() {
        assert!(search_pattern(&"a".repeat(MAX_QUERY_CHARS)).is_some());
        assert_eq!(search_pattern(&"a".repeat(MAX_QUERY_CHARS + 1)), None);
    }
}
