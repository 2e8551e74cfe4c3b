use crate::{Card, Deck};

/// Lowercased, trimmed form of a user query. Empty output means
/// "match everything".
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Substring match across every searchable card field. `query` must already
/// be normalized via [`normalize_query`]. A missing remark is treated as an
/// empty string, so it only matches the empty query.
pub fn card_matches(card: &Card, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    card.source_word.to_lowercase().contains(query)
        || card.target_word.to_lowercase().contains(query)
        || card.source_language.to_lowercase().contains(query)
        || card.target_language.to_lowercase().contains(query)
        || card.pronunciation.to_lowercase().contains(query)
        || card
            .remark
            .as_ref()
            .map(|r| r.to_lowercase().contains(query))
            .unwrap_or(false)
}

/// Substring match across topic, description and both language names.
pub fn deck_matches(deck: &Deck, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    deck.topic.to_lowercase().contains(query)
        || deck
            .description
            .as_ref()
            .map(|d| d.to_lowercase().contains(query))
            .unwrap_or(false)
        || deck.language_from.to_lowercase().contains(query)
        || deck.language_to.to_lowercase().contains(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_card() -> Card {
        let mut card = Card::new("d1", "Dzień dobry", "Good morning");
        card.source_language = "Polish".into();
        card.target_language = "English".into();
        card.pronunciation = "/d͡ʑɛɲ ˈdɔbrɨ/".into();
        card.remark = Some("Formal greeting used until afternoon".into());
        card
    }

    #[test]
    fn matches_are_case_insensitive() {
        let card = sample_card();
        assert!(card_matches(&card, &normalize_query("dzień")));
        assert!(card_matches(&card, &normalize_query("GOOD")));
        assert!(card_matches(&card, &normalize_query("polish")));
        assert!(!card_matches(&card, &normalize_query("xyz123")));
    }

    #[test]
    fn remark_participates_in_matching() {
        let mut card = sample_card();
        assert!(card_matches(&card, "formal"));
        card.remark = None;
        assert!(!card_matches(&card, "formal"));
        // Blank query still matches a remark-less card.
        assert!(card_matches(&card, ""));
    }

    #[test]
    fn whitespace_query_normalizes_to_match_all() {
        let card = sample_card();
        let q = normalize_query("   \t ");
        assert!(q.is_empty());
        assert!(card_matches(&card, &q));
    }

    #[test]
    fn deck_fields_are_searchable() {
        let mut deck = Deck::new("Polish Common Phrases", "Polish", "English");
        deck.description = Some("Essential phrases for everyday conversation".into());
        assert!(deck_matches(&deck, "phrases"));
        assert!(deck_matches(&deck, "everyday"));
        assert!(deck_matches(&deck, "english"));
        assert!(!deck_matches(&deck, "spanish"));
    }
}
