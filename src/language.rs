//! Editor language identifiers and their display names.

/// Display name for a language identifier. Unknown identifiers pass through.
pub fn language_display_name(language: &str) -> String {
    match language {
        "typescript" => "TypeScript".to_string(),
        "javascript" => "JavaScript".to_string(),
        "python" => "Python".to_string(),
        "go" => "Go".to_string(),
        "ruby" => "Ruby".to_string(),
        "php" => "PHP".to_string(),
        other => other.to_string(),
    }
}
