use common::OTHER_GENRE;

pub const TOP_GENRES: [&str; 20] = [
    "Rock",
    "Pop",
    "Hip-Hop",
    "Electronic",
    "R&B",
    "Jazz",
    "Blues",
    "Classical",
    "Country",
    "Folk",
    "Latin",
    "Reggae",
    "Metal",
    "Ambient",
    "Soundtrack",
    "Gospel",
    "Children",
    "Spoken Word",
    "World",
    OTHER_GENRE,
];

// Keys are stored in cleaned form: lowercase, "&" spelled "and", hyphens as
// spaces. Substring matching walks this table top to bottom, so the Metal
// keys are only reached by an exact match; "heavy metal" lands on Rock.
const GENRE_KEYWORDS: &[(&str, &str)] = &[
    ("singer songwriter", "Folk"),
    ("rock", "Rock"),
    ("alternative", "Rock"),
    ("metal", "Rock"),
    ("punk", "Rock"),
    ("indie", "Rock"),
    ("hard rock", "Rock"),
    ("progressive", "Rock"),
    ("grunge", "Rock"),
    ("k pop", "Pop"),
    ("j pop", "Pop"),
    ("dance pop", "Pop"),
    ("synthpop", "Pop"),
    ("pop", "Pop"),
    ("hip hop", "Hip-Hop"),
    ("hiphop", "Hip-Hop"),
    ("trap", "Hip-Hop"),
    ("rap", "Hip-Hop"),
    ("electronic", "Electronic"),
    ("edm", "Electronic"),
    ("house", "Electronic"),
    ("techno", "Electronic"),
    ("trance", "Electronic"),
    ("dubstep", "Electronic"),
    ("drum and bass", "Electronic"),
    ("randb", "R&B"),
    ("rnb", "R&B"),
    ("rhythm and blues", "R&B"),
    ("soul", "R&B"),
    ("funk", "R&B"),
    ("jazz", "Jazz"),
    ("blues", "Blues"),
    ("classical", "Classical"),
    ("opera", "Classical"),
    ("orchestral", "Classical"),
    ("country", "Country"),
    ("folk", "Folk"),
    ("reggaeton", "Latin"),
    ("latin", "Latin"),
    ("salsa", "Latin"),
    ("bachata", "Latin"),
    ("bossa nova", "Latin"),
    ("reggae", "Reggae"),
    ("ska", "Reggae"),
    ("metalcore", "Metal"),
    ("death metal", "Metal"),
    ("black metal", "Metal"),
    ("ambient", "Ambient"),
    ("chill", "Ambient"),
    ("downtempo", "Ambient"),
    ("lofi", "Ambient"),
    ("lo fi", "Ambient"),
    ("soundtrack", "Soundtrack"),
    ("score", "Soundtrack"),
    ("gospel", "Gospel"),
    ("religious", "Gospel"),
    ("children", "Children"),
    ("kids", "Children"),
    ("spoken word", "Spoken Word"),
    ("podcast", "Spoken Word"),
    ("audiobook", "Spoken Word"),
    ("world", "World"),
    ("afrobeats", "World"),
    ("afro", "World"),
    ("asian", "World"),
    ("celtic", "World"),
    ("indian", "World"),
];

/// Maps a free-text genre string onto [`TOP_GENRES`]. Blank input and
/// strings with no recognizable keyword map to "Other".
pub fn map_to_top_genre(raw: Option<&str>) -> String {
    let Some(raw) = raw.filter(|value| !value.trim().is_empty()) else {
        return OTHER_GENRE.to_string();
    };

    let cleaned = clean_genre_text(raw);
    let mut candidates: Vec<&str> = cleaned
        .split([',', '/', ';', '|'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    if candidates.is_empty() {
        candidates.push(cleaned.as_str());
    }

    for candidate in candidates {
        if let Some(label) = match_candidate(candidate) {
            return label.to_string();
        }
    }

    OTHER_GENRE.to_string()
}

pub fn is_top_genre(label: &str) -> bool {
    TOP_GENRES.contains(&label)
}

fn match_candidate(candidate: &str) -> Option<&'static str> {
    if let Some((_, label)) = GENRE_KEYWORDS.iter().find(|(key, _)| *key == candidate) {
        return Some(label);
    }
    GENRE_KEYWORDS
        .iter()
        .find(|(key, _)| candidate.contains(key))
        .map(|(_, label)| *label)
}

fn clean_genre_text(raw: &str) -> String {
    raw.to_lowercase()
        .replace('&', "and")
        .replace('-', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_input_is_other() {
        assert_eq!(map_to_top_genre(None), "Other");
        assert_eq!(map_to_top_genre(Some("")), "Other");
        assert_eq!(map_to_top_genre(Some("   ")), "Other");
    }

    #[test]
    fn first_candidate_with_a_match_wins() {
        assert_eq!(map_to_top_genre(Some("Hard Rock, Alternative")), "Rock");
        assert_eq!(map_to_top_genre(Some("Shoegaze; Jazz")), "Jazz");
        assert_eq!(map_to_top_genre(Some("Vaporwave | Nothing")), "Other");
    }

    #[test]
    fn hyphen_and_ampersand_variants() {
        assert_eq!(map_to_top_genre(Some("K-Pop")), "Pop");
        assert_eq!(map_to_top_genre(Some("Hip-Hop")), "Hip-Hop");
        assert_eq!(map_to_top_genre(Some("R&B")), "R&B");
        assert_eq!(map_to_top_genre(Some("Lo-Fi")), "Ambient");
        assert_eq!(map_to_top_genre(Some("Drum & Bass")), "Electronic");
    }

    #[test]
    fn substring_matches_follow_table_order() {
        assert_eq!(map_to_top_genre(Some("Alternative Singer-Songwriter")), "Folk");
        assert_eq!(map_to_top_genre(Some("Melodic Death Metal")), "Rock");
        assert_eq!(map_to_top_genre(Some("Southern Trap")), "Hip-Hop");
        assert_eq!(map_to_top_genre(Some("Bossa Nova")), "Latin");
        assert_eq!(map_to_top_genre(Some("Deep House")), "Electronic");
    }

    #[test]
    fn metal_only_on_exact_subgenre() {
        assert_eq!(map_to_top_genre(Some("death metal")), "Metal");
        assert_eq!(map_to_top_genre(Some("Black-Metal")), "Metal");
        assert_eq!(map_to_top_genre(Some("Metalcore")), "Metal");
        assert_eq!(map_to_top_genre(Some("Heavy Metal")), "Rock");
        assert_eq!(map_to_top_genre(Some("Metal")), "Rock");
        assert_eq!(map_to_top_genre(Some("Thrash Metal, Death Metal")), "Rock");
    }

    #[test]
    fn mapping_is_deterministic() {
        for raw in ["Folk Rock", "Indie Pop", "Soul/Funk", "Celtic"] {
            assert_eq!(map_to_top_genre(Some(raw)), map_to_top_genre(Some(raw)));
        }
    }

    #[test]
    fn every_keyword_maps_into_taxonomy() {
        for (_, label) in GENRE_KEYWORDS {
            assert!(is_top_genre(label), "{} is not a taxonomy label", label);
        }
        assert_eq!(TOP_GENRES.len(), 20);
    }
}
