//! Name canonicalisation applied to every imported row.

/// Lowercase the whole input, then uppercase its first character.
///
/// ```rust
/// use user_upload::normalize::format_name;
///
/// assert_eq!(format_name("jOHN"), "John");
/// assert_eq!(format_name(""), "");
/// ```
pub fn format_name(input: &str) -> String {
    let lowered = input.to_lowercase();
    let mut chars = lowered.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Drop every character outside `A-Z` and `a-z`.
pub fn alphabetic_only(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_alphabetic()).collect()
}
