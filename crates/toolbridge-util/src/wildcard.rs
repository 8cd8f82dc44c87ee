//! Wildcard pattern matching.
//!
//! Supports `*` (any sequence, including empty) and `?` (any single
//! character). All matching here is case-insensitive because it is used for
//! file name search.

/// Whether the pattern contains any wildcard characters.
pub fn has_wildcards(pattern: &str) -> bool {
    pattern.contains(['*', '?'])
}

/// Match a whole string against a wildcard pattern, ignoring case.
///
/// # Examples
///
/// ```
/// use toolbridge_util::wildcard::matches;
///
/// assert!(matches("*.java", "Main.JAVA"));
/// assert!(matches("Test?.java", "Test1.java"));
/// assert!(!matches("*.java", "Main.class"));
/// ```
pub fn matches(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let text: Vec<char> = text.to_lowercase().chars().collect();

    let (mut pi, mut ti) = (0, 0);
    // Position of the last `*` seen and the text index it is currently absorbing up to.
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < text.len() {
        if pi < pattern.len() && (pattern[pi] == '?' || pattern[pi] == text[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < pattern.len() && pattern[pi] == '*' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if let Some((star, absorbed)) = backtrack {
            pi = star + 1;
            ti = absorbed + 1;
            backtrack = Some((star, absorbed + 1));
        } else {
            return false;
        }
    }

    pattern[pi..].iter().all(|&c| c == '*')
}

/// Match a file name against a search pattern.
///
/// Patterns with wildcards must match the whole name; plain patterns match
/// as a case-insensitive substring.
pub fn name_matches(pattern: &str, name: &str) -> bool {
    if has_wildcards(pattern) {
        matches(pattern, name)
    } else {
        name.to_lowercase().contains(&pattern.to_lowercase())
    }
}
