pub const MAX_PLAYER_NAME_LENGTH: usize = 20;

/// Display name shown in join notes and the scoreboard: runs of whitespace
/// collapse to one space and the result is cut to `MAX_PLAYER_NAME_LENGTH`
/// characters. A blank name becomes `fallback`.
pub fn sanitize_player_name(name: &str, fallback: &str) -> String {
    let cleaned = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return fallback.to_string();
    }
    cleaned.chars().take(MAX_PLAYER_NAME_LENGTH).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_truncates() {
        assert_eq!(sanitize_player_name("  ana   maria ", "Player"), "ana maria");
        let long = "x".repeat(40);
        assert_eq!(sanitize_player_name(&long, "Player").len(), MAX_PLAYER_NAME_LENGTH);
    }

    #[test]
    fn blank_names_use_fallback() {
        assert_eq!(sanitize_player_name(" \t ", "Player"), "Player");
    }
}
