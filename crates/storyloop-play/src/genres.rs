//! Built-in story genres offered when no theme is given.

/// Genres, in menu order.
pub const GENRES: [&str; 22] = [
    "Fantasy",
    "Sci-Fi",
    "Mystery",
    "Thriller",
    "Horror",
    "Romance",
    "Adventure",
    "Historical Fiction",
    "Cyberpunk",
    "Steampunk",
    "Dystopian",
    "Post-Apocalyptic",
    "Superhero",
    "Urban Fantasy",
    "Space Opera",
    "Time Travel",
    "Alternate History",
    "Magical Realism",
    "Noir",
    "Western",
    "Spy Fiction",
    "Military Sci-Fi",
];

/// Case-insensitive genre lookup, returning the canonical spelling.
#[must_use]
pub fn find(name: &str) -> Option<&'static str> {
    let name = name.trim();
    GENRES
        .iter()
        .copied()
        .find(|genre| genre.eq_ignore_ascii_case(name))
}

/// Interpret a menu answer: a 1-based genre number or a free-form theme.
///
/// Returns `None` for a blank answer or an out-of-range number.
#[must_use]
pub fn parse_theme_choice(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    match input.parse::<usize>() {
        Ok(n) => n
            .checked_sub(1)
            .and_then(|i| GENRES.get(i))
            .map(|genre| (*genre).to_owned()),
        Err(_) => Some(input.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_ignores_case_and_whitespace() {
        assert_eq!(find("  space opera "), Some("Space Opera"));
        assert_eq!(find("sci-fi"), Some("Sci-Fi"));
        assert_eq!(find("Opera"), None);
    }

    #[test]
    fn test_parse_theme_choice_by_number() {
        assert_eq!(parse_theme_choice("1").as_deref(), Some("Fantasy"));
        assert_eq!(parse_theme_choice("22").as_deref(), Some("Military Sci-Fi"));
        assert_eq!(parse_theme_choice("0"), None);
        assert_eq!(parse_theme_choice("23"), None);
    }

    #[test]
    fn test_parse_theme_choice_free_text() {
        assert_eq!(
            parse_theme_choice(" A mysterious adventure ").as_deref(),
            Some("A mysterious adventure")
        );
        assert_eq!(parse_theme_choice("   "), None);
    }
}
