//! Keyword ranking over note descriptions.
//!
//! Matching is case-insensitive substring containment: a term matches
//! anywhere inside the description, including inside a longer word.

use crate::models::note::NoteDocument;
use std::cmp::Reverse;

/// Score added for every query term found in a description.
pub const TERM_WEIGHT: usize = 2;

/// Split a query into lowercase, whitespace-separated terms.
pub fn normalize(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Rank `documents` against `query`.
///
/// Returns only documents matching at least one term, highest score first,
/// newest first among equal scores. A blank query matches nothing.
pub fn score<'a>(documents: &'a [NoteDocument], query: &str) -> Vec<&'a NoteDocument> {
    let terms = normalize(query);
    if terms.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, &NoteDocument)> = documents
        .iter()
        .filter_map(|doc| {
            let text = doc.description.to_lowercase();
            let score = terms
                .iter()
                .filter(|term| text.contains(term.as_str()))
                .count()
                * TERM_WEIGHT;
            (score > 0).then_some((score, doc))
        })
        .collect();

    scored.sort_by_key(|(score, doc)| (Reverse(*score), Reverse(doc.created_at)));
    scored.into_iter().map(|(_, doc)| doc).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, description: &str, created_at: i64) -> NoteDocument {
        NoteDocument {
            id: id.to_string(),
            created_at,
            description: description.to_string(),
            mime_type: "image/jpeg".to_string(),
            blob: vec![1, 2, 3],
        }
    }

    fn ids(docs: &[&NoteDocument]) -> Vec<String> {
        docs.iter().map(|d| d.id.clone()).collect()
    }

    fn sample() -> Vec<NoteDocument> {
        vec![
            doc("A", "Mueller Rueckruf", 100),
            doc("B", "Schmidt Termin", 200),
            doc("C", "mueller Notiz", 300),
        ]
    }

    #[test]
    fn normalize_lowercases_and_splits() {
        assert_eq!(normalize("  Mueller \t RUECKRUF\n"), vec!["mueller", "rueckruf"]);
    }

    #[test]
    fn normalize_blank_input_is_empty() {
        assert!(normalize("").is_empty());
        assert!(normalize("   ").is_empty());
    }

    #[test]
    fn blank_query_matches_nothing() {
        let docs = sample();
        assert!(score(&docs, "").is_empty());
        assert!(score(&docs, " \t ").is_empty());
    }

    #[test]
    fn equal_scores_fall_back_to_recency() {
        let docs = sample();
        assert_eq!(ids(&score(&docs, "mueller")), vec!["C", "A"]);
    }

    #[test]
    fn unmatched_query_is_empty() {
        let docs = sample();
        assert!(score(&docs, "xyz").is_empty());
    }

    #[test]
    fn more_matched_terms_rank_higher() {
        let docs = sample();
        // A matches both terms (4), C matches one (2) despite being newer.
        assert_eq!(ids(&score(&docs, "mueller rueckruf")), vec!["A", "C"]);
    }

    #[test]
    fn long_queries_keep_ordering_by_match_count() {
        let words: Vec<String> = (0..300).map(|i| format!("w{i:03}x")).collect();
        let docs = vec![
            doc("ALL", &words.join(" "), 1),
            doc("HALF", &words[..150].join(" "), 2),
        ];
        let query = words.join(" ");
        assert_eq!(ids(&score(&docs, &query)), vec!["ALL", "HALF"]);
    }

    #[test]
    fn terms_match_inside_words() {
        let docs = sample();
        assert_eq!(ids(&score(&docs, "ueck")), vec!["A"]);
        assert_eq!(ids(&score(&docs, "TERM")), vec!["B"]);
    }

    #[test]
    fn empty_description_never_matches() {
        let docs = vec![doc("E", "", 1), doc("F", "x", 2)];
        assert_eq!(ids(&score(&docs, "x")), vec!["F"]);
    }

    #[test]
    fn every_result_contains_a_term() {
        let docs = sample();
        let query = "notiz schmidt nothing";
        let terms = normalize(query);
        let results = score(&docs, query);
        assert_eq!(results.len(), 2);
        for result in results {
            let text = result.description.to_lowercase();
            assert!(terms.iter().any(|t| text.contains(t.as_str())));
        }
    }

    #[test]
    fn scoring_is_repeatable_and_leaves_input_untouched() {
        let docs = sample();
        let before = docs.clone();

        let first = ids(&score(&docs, "mueller termin"));
        let second = ids(&score(&docs, "mueller termin"));

        assert_eq!(first, second);
        assert_eq!(docs, before);
    }
}
