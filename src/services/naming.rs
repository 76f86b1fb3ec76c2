//! Path template rendering
//!
//! Turns configured naming patterns into folder and file names. Tokens are
//! `%`-prefixed and replaced literally in a single left-to-right pass, with
//! the longest token winning at each position, so a substituted value is
//! never scanned again.
//!
//! Episode file tokens:
//! - `%sn` `%s.n` `%s_n` - series name (spaces, dots, underscores)
//! - `%s` `%0s` `%00s` - season number, padded to 1/2/3 digits
//! - `%e` `%0e` `%00e` - episode number
//! - `%ed` `%0ed` `%00ed` - ending episode number (multi-episode files only)
//! - `%en` `%e.n` `%e_n` - episode name
//! - `%res` `%ext` `%fn` - resolution, extension, original name without extension
//!
//! Movie tokens: `%mn` `%m.n` `%m_n` `%my` `%res` `%e` (edition) `%ext` `%fn`.

use thiserror::Error;

use crate::services::file_utils::sanitize_for_filename;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NamingError {
    #[error("Naming pattern '{pattern}' produced an empty or invalid name")]
    EmptyName { pattern: String },
}

/// Values available to episode patterns
#[derive(Debug, Clone, Default)]
pub struct EpisodeNaming<'a> {
    pub series_name: &'a str,
    pub series_year: Option<i32>,
    pub season: u32,
    pub episode: u32,
    pub ending_episode: Option<u32>,
    pub episode_name: Option<&'a str>,
    pub resolution: &'a str,
    pub extension: &'a str,
    pub original_stem: &'a str,
}

/// Values available to movie patterns
#[derive(Debug, Clone, Default)]
pub struct MovieNaming<'a> {
    pub name: &'a str,
    pub year: Option<i32>,
    pub resolution: &'a str,
    pub edition: Option<&'a str>,
    pub extension: &'a str,
    pub original_stem: &'a str,
}

type Tokens = Vec<(&'static str, String)>;

/// Substitute tokens in one pass, longest token first at each position
fn substitute(pattern: &str, mut tokens: Tokens) -> String {
    tokens.sort_by_key(|(token, _)| std::cmp::Reverse(token.len()));

    let mut out = String::with_capacity(pattern.len() + 32);
    let mut rest = pattern;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        match tokens.iter().find(|(token, _)| candidate.starts_with(token)) {
            Some((token, value)) => {
                out.push_str(value);
                rest = &candidate[token.len()..];
            }
            None => {
                out.push('%');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Sanitize a rendered name into a single valid path component
pub fn finish(pattern: &str, rendered: &str) -> Result<String, NamingError> {
    let name = sanitize_for_filename(rendered);
    if name.trim().is_empty() {
        return Err(NamingError::EmptyName {
            pattern: pattern.to_string(),
        });
    }
    Ok(name)
}

fn name_variants(tokens: &mut Tokens, keys: [&'static str; 3], name: &str) {
    tokens.push((keys[0], name.to_string()));
    tokens.push((keys[1], name.replace(' ', ".")));
    tokens.push((keys[2], name.replace(' ', "_")));
}

fn number_variants(tokens: &mut Tokens, keys: [&'static str; 3], value: Option<u32>) {
    let [plain, two, three] = keys;
    match value {
        Some(n) => {
            tokens.push((plain, n.to_string()));
            tokens.push((two, format!("{:02}", n)));
            tokens.push((three, format!("{:03}", n)));
        }
        None => {
            tokens.push((plain, String::new()));
            tokens.push((two, String::new()));
            tokens.push((three, String::new()));
        }
    }
}

fn name_with_year(name: &str, year: Option<i32>) -> String {
    match year {
        Some(y) => format!("{} ({})", name, y),
        None => name.to_string(),
    }
}

/// Render an episode file name.
///
/// `multi_pattern` is used when the file covers an episode range.
pub fn render_episode_file(
    pattern: &str,
    multi_pattern: &str,
    naming: &EpisodeNaming<'_>,
) -> Result<String, NamingError> {
    let pattern = match naming.ending_episode {
        Some(end) if end > naming.episode => multi_pattern,
        _ => pattern,
    };

    let episode_name = naming
        .episode_name
        .filter(|n| !n.trim().is_empty())
        .map(|n| n.to_string())
        .unwrap_or_else(|| format!("Episode {}", naming.episode));

    let mut tokens: Tokens = Vec::new();
    name_variants(&mut tokens, ["%sn", "%s.n", "%s_n"], naming.series_name);
    number_variants(&mut tokens, ["%s", "%0s", "%00s"], Some(naming.season));
    number_variants(&mut tokens, ["%e", "%0e", "%00e"], Some(naming.episode));
    let ending = naming.ending_episode.filter(|end| *end > naming.episode);
    number_variants(&mut tokens, ["%ed", "%0ed", "%00ed"], ending);
    name_variants(&mut tokens, ["%en", "%e.n", "%e_n"], &episode_name);
    tokens.push(("%res", naming.resolution.to_string()));
    tokens.push(("%ext", naming.extension.trim_start_matches('.').to_string()));
    tokens.push(("%fn", naming.original_stem.to_string()));

    finish(pattern, &substitute(pattern, tokens))
}

/// Render the series folder name
pub fn render_series_folder(
    pattern: &str,
    series_name: &str,
    year: Option<i32>,
) -> Result<String, NamingError> {
    let mut tokens: Tokens = Vec::new();
    name_variants(&mut tokens, ["%sn", "%s.n", "%s_n"], series_name);
    tokens.push((
        "%sy",
        year.map(|y| y.to_string()).unwrap_or_default(),
    ));
    tokens.push(("%fn", name_with_year(series_name, year)));

    finish(pattern, &substitute(pattern, tokens))
}

/// Render the season folder name; season 0 uses `season_zero_name`
pub fn render_season_folder(
    pattern: &str,
    season_zero_name: &str,
    series_name: &str,
    season: u32,
) -> Result<String, NamingError> {
    if season == 0 {
        return finish(season_zero_name, season_zero_name);
    }

    let mut tokens: Tokens = Vec::new();
    name_variants(&mut tokens, ["%sn", "%s.n", "%s_n"], series_name);
    number_variants(&mut tokens, ["%s", "%0s", "%00s"], Some(season));

    finish(pattern, &substitute(pattern, tokens))
}

fn movie_tokens(naming: &MovieNaming<'_>) -> Tokens {
    let mut tokens: Tokens = Vec::new();
    name_variants(&mut tokens, ["%mn", "%m.n", "%m_n"], naming.name);
    tokens.push((
        "%my",
        naming.year.map(|y| y.to_string()).unwrap_or_default(),
    ));
    tokens.push(("%res", naming.resolution.to_string()));
    tokens.push(("%e", naming.edition.unwrap_or_default().to_string()));
    tokens
}

/// Render the movie folder name; `%fn` is "Name (Year)"
pub fn render_movie_folder(pattern: &str, naming: &MovieNaming<'_>) -> Result<String, NamingError> {
    let mut tokens = movie_tokens(naming);
    tokens.push(("%fn", name_with_year(naming.name, naming.year)));
    finish(pattern, &substitute(pattern, tokens))
}

/// Render the movie file name; `%fn` is the original name without extension
pub fn render_movie_file(pattern: &str, naming: &MovieNaming<'_>) -> Result<String, NamingError> {
    let mut tokens = movie_tokens(naming);
    tokens.push(("%ext", naming.extension.trim_start_matches('.').to_string()));
    tokens.push(("%fn", naming.original_stem.to_string()));
    finish(pattern, &substitute(pattern, tokens))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pilot() -> EpisodeNaming<'static> {
        EpisodeNaming {
            series_name: "Example Show",
            season: 1,
            episode: 4,
            episode_name: Some("Pilot"),
            extension: "mkv",
            original_stem: "example.show.s01e04",
            ..Default::default()
        }
    }

    #[test]
    fn test_episode_file_pattern() {
        let name = render_episode_file("%sn - %0sx%0e - %en.%ext", "", &pilot()).unwrap();
        assert_eq!(name, "Example Show - 01x04 - Pilot.mkv");
    }

    #[test]
    fn test_name_variants_and_padding() {
        let name = render_episode_file("%s.n.S%00sE%00e.%e_n.%ext", "", &pilot()).unwrap();
        assert_eq!(name, "Example.Show.S001E004.Pilot.mkv");
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let naming = EpisodeNaming {
            series_name: "100%sn Club",
            ..pilot()
        };
        let name = render_episode_file("%sn %0e", "", &naming).unwrap();
        assert_eq!(name, "100%sn Club 04");
    }

    #[test]
    fn test_multi_episode_pattern() {
        let naming = EpisodeNaming {
            ending_episode: Some(5),
            ..pilot()
        };
        let name = render_episode_file(
            "%sn - %sx%0e - %en.%ext",
            "%sn - %sx%0e-x%0ed - %en.%ext",
            &naming,
        )
        .unwrap();
        assert_eq!(name, "Example Show - 1x04-x05 - Pilot.mkv");

        // Single episodes leave the ending tokens empty
        let name = render_episode_file("%sn %0e%0ed", "", &pilot()).unwrap();
        assert_eq!(name, "Example Show 04");
    }

    #[test]
    fn test_missing_episode_name_falls_back() {
        let naming = EpisodeNaming {
            episode_name: None,
            ..pilot()
        };
        let name = render_episode_file("%0e - %en", "", &naming).unwrap();
        assert_eq!(name, "04 - Episode 4");
    }

    #[test]
    fn test_series_and_season_folders() {
        assert_eq!(
            render_series_folder("%fn", "Example Show", Some(2019)).unwrap(),
            "Example Show (2019)"
        );
        assert_eq!(
            render_series_folder("%sn [%sy]", "Example Show", None).unwrap(),
            "Example Show []"
        );
        assert_eq!(
            render_season_folder("Season %0s", "Specials", "Example Show", 3).unwrap(),
            "Season 03"
        );
        assert_eq!(
            render_season_folder("Season %0s", "Specials", "Example Show", 0).unwrap(),
            "Specials"
        );
    }

    #[test]
    fn test_movie_patterns() {
        let naming = MovieNaming {
            name: "Alien",
            year: Some(1979),
            resolution: "2160p",
            edition: Some("Director's Cut"),
            extension: "mkv",
            original_stem: "Alien.1979.2160p",
        };
        assert_eq!(render_movie_folder("%fn", &naming).unwrap(), "Alien (1979)");
        assert_eq!(
            render_movie_file("%mn (%my) - %e - %res.%ext", &naming).unwrap(),
            "Alien (1979) - Director's Cut - 2160p.mkv"
        );
        assert_eq!(
            render_movie_file("%fn.%ext", &naming).unwrap(),
            "Alien.1979.2160p.mkv"
        );
    }

    #[test]
    fn test_sanitizes_and_rejects_empty_names() {
        let naming = EpisodeNaming {
            series_name: "What If?",
            ..pilot()
        };
        assert_eq!(
            render_series_folder("%sn", naming.series_name, None).unwrap(),
            "What If"
        );
        assert_eq!(
            render_series_folder("%sn", "???", None),
            Err(NamingError::EmptyName {
                pattern: "%sn".to_string()
            })
        );
    }
}
