//! Shared text normalization and comparison utilities

/// Leading or standalone words ignored when comparing titles
const ARTICLES: &[&str] = &["the", "a", "an"];

/// Normalize a title for identity comparison.
///
/// Lower-cases, treats `.`, `_` and `-` as word separators, drops articles,
/// then strips every remaining non-alphanumeric character including spaces.
/// "The.Walking-Dead" and "walking dead" both become `walkingdead`.
pub fn normalize_for_comparison(name: &str) -> String {
    name.to_lowercase()
        .replace(['.', '_', '-'], " ")
        .split_whitespace()
        .filter(|word| !ARTICLES.contains(word))
        .flat_map(|word| word.chars().filter(|c| c.is_alphanumeric()))
        .collect()
}

/// Replace separators with spaces and collapse whitespace, keeping case.
///
/// Used to turn scene-style names ("Show.Name_2020") into display text.
pub fn spaced(name: &str) -> String {
    name.replace(['.', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trim separator characters left around an extracted name
pub fn trim_separators(name: &str) -> String {
    name.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, '-' | '.' | '_' | '(' | '[' | '{' | ',' | ':')
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_for_comparison() {
        assert_eq!(normalize_for_comparison("The Walking Dead"), "walkingdead");
        assert_eq!(normalize_for_comparison("The.Walking-Dead"), "walkingdead");
        assert_eq!(
            normalize_for_comparison("Marvel's Agents of S.H.I.E.L.D."),
            "marvelsagentsofshield"
        );
        assert_eq!(normalize_for_comparison("A Series of Events"), "seriesofevents");
        assert_eq!(normalize_for_comparison("  "), "");
    }

    #[test]
    fn test_spaced() {
        assert_eq!(spaced("Breaking.Bad"), "Breaking Bad");
        assert_eq!(spaced("Game_of__Thrones"), "Game of Thrones");
    }

    #[test]
    fn test_trim_separators() {
        assert_eq!(trim_separators(" - Show Name (- "), "Show Name");
        assert_eq!(trim_separators("Show."), "Show");
    }
}
