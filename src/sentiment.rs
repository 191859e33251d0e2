//! Lexicon-based sentiment scoring of customer comments on a 0-10 scale.
//!
//! Comments that plainly say "nothing to report" or "perfect" short-circuit
//! to a fixed high score. Otherwise a delivery-specific term lexicon gives a
//! raw polarity which is either rescaled on its own or, when the customer
//! left a star rating, used as a small nudge around the rating.

use crate::types::{CommentExemplar, Delivery};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentScore {
    pub score: f64,
    pub positive_terms: Vec<String>,
    pub negative_terms: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Positive,
    Negative,
}

/// Exemplars kept by `top_comments` must clear these bounds.
pub const POSITIVE_THRESHOLD: f64 = 7.0;
pub const NEGATIVE_THRESHOLD: f64 = 4.0;

static NOTHING_TO_REPORT: &[(&str, f64)] = &[
    ("rien à signaler", 9.0),
    ("nothing to report", 9.0),
    ("aucun problème", 8.5),
    ("pas de problème", 8.5),
    ("no problem", 8.5),
    ("r.a.s", 8.0),
    ("ras", 8.0),
];

static VERY_GOOD: &[&str] = &[
    "très bien",
    "parfait",
    "parfaite",
    "excellent",
    "excellente",
    "very good",
    "perfect",
];

/// A negator this many tokens or fewer before a phrase cancels it.
const NEGATION_WINDOW: usize = 3;

static NEGATORS: &[&str] = &["pas", "not", "peu", "jamais", "never"];

const VERY_GOOD_SCORE: f64 = 8.5;

/// Delivery-domain term weights; positives +2..+5, negatives -2..-5.
/// Keys are stored accent-folded, so "decu" and "déçu" hit the same entry.
static LEXICON: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    let mut m = HashMap::new();

    // Positive
    m.insert("excellent", 5);
    m.insert("parfait", 5);
    m.insert("impeccable", 4);
    m.insert("nickel", 4);
    m.insert("bravo", 4);
    m.insert("génial", 4);
    m.insert("super", 4);
    m.insert("great", 4);
    m.insert("top", 3);
    m.insert("rapide", 3);
    m.insert("ponctuel", 3);
    m.insert("ponctuelle", 3);
    m.insert("aimable", 3);
    m.insert("sympa", 3);
    m.insert("sympathique", 3);
    m.insert("souriant", 3);
    m.insert("souriante", 3);
    m.insert("professionnel", 3);
    m.insert("professionnelle", 3);
    m.insert("courtois", 3);
    m.insert("serviable", 3);
    m.insert("soigneux", 3);
    m.insert("efficace", 3);
    m.insert("agréable", 3);
    m.insert("satisfait", 3);
    m.insert("satisfaite", 3);
    m.insert("recommande", 3);
    m.insert("good", 3);
    m.insert("bien", 2);
    m.insert("bon", 2);
    m.insert("bonne", 2);
    m.insert("poli", 2);
    m.insert("polie", 2);
    m.insert("merci", 2);

    // Negative
    m.insert("inadmissible", -5);
    m.insert("inacceptable", -5);
    m.insert("scandaleux", -5);
    m.insert("horrible", -5);
    m.insert("catastrophe", -5);
    m.insert("agressif", -5);
    m.insert("cassé", -4);
    m.insert("cassée", -4);
    m.insert("abîmé", -4);
    m.insert("abîmée", -4);
    m.insert("endommagé", -4);
    m.insert("endommagée", -4);
    m.insert("damaged", -4);
    m.insert("perdu", -4);
    m.insert("impoli", -4);
    m.insert("désagréable", -4);
    m.insert("mécontent", -4);
    m.insert("mécontente", -4);
    m.insert("nul", -4);
    m.insert("rude", -4);
    m.insert("retard", -3);
    m.insert("late", -3);
    m.insert("manquant", -3);
    m.insert("manquante", -3);
    m.insert("mauvais", -3);
    m.insert("mauvaise", -3);
    m.insert("déçu", -3);
    m.insert("déçue", -3);
    m.insert("plainte", -3);
    m.insert("sale", -3);
    m.insert("tard", -2);
    m.insert("lent", -2);
    m.insert("jamais", -2);
    m.insert("absent", -2);
    m.insert("problème", -2);
    m.insert("attente", -2);
    m.insert("annulé", -2);

    m.into_iter()
        .map(|(term, weight): (&str, i32)| (fold_accents(term), weight))
        .collect()
});

fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Lowercase French accents mapped to their base letter.
fn fold_accents(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' => 'i',
            'ô' | 'ö' => 'o',
            'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ÿ' => 'y',
            other => other,
        })
        .collect()
}

// Start positions where the phrase's tokens appear consecutively, so "ras"
// never matches inside "gras" and "r.a.s" matches "R.A.S.".
fn phrase_positions(tokens: &[String], phrase: &str) -> Vec<usize> {
    let folded = fold_accents(phrase);
    let needle = tokenize(&folded);
    if needle.is_empty() || needle.len() > tokens.len() {
        return Vec::new();
    }
    tokens
        .windows(needle.len())
        .enumerate()
        .filter(|(_, window)| window.iter().zip(&needle).all(|(t, n)| t == n))
        .map(|(idx, _)| idx)
        .collect()
}

fn negated(tokens: &[String], start: usize) -> bool {
    tokens[start.saturating_sub(NEGATION_WINDOW)..start]
        .iter()
        .any(|t| NEGATORS.iter().any(|n| *n == t.as_str()))
}

// "ras le bol" is a complaint, not "rien à signaler".
fn fed_up(tokens: &[String], start: usize) -> bool {
    let at = |offset: usize| tokens.get(start + offset).map(String::as_str);
    at(0) == Some("ras") && at(1) == Some("le") && at(2) == Some("bol")
}

fn nothing_to_report(tokens: &[String]) -> Option<f64> {
    NOTHING_TO_REPORT
        .iter()
        .find(|(phrase, _)| {
            phrase_positions(tokens, phrase)
                .into_iter()
                .any(|start| !fed_up(tokens, start))
        })
        .map(|(_, score)| *score)
}

fn very_good(tokens: &[String]) -> bool {
    VERY_GOOD.iter().any(|phrase| {
        phrase_positions(tokens, phrase)
            .into_iter()
            .any(|start| !negated(tokens, start))
    })
}

/// Star rating to its base score on /10.
pub fn rating_base(rating: u8) -> Option<f64> {
    match rating {
        5 => Some(9.5),
        4 => Some(7.5),
        3 => Some(5.0),
        2 => Some(2.5),
        1 => Some(0.5),
        _ => None,
    }
}

/// Score a comment, optionally blended with the customer's star rating.
pub fn score(comment: &str, rating: Option<u8>) -> SentimentScore {
    let text = comment.trim().to_lowercase();
    let tokens = tokenize(&text);
    let folded: Vec<String> = tokens.iter().map(|t| fold_accents(t)).collect();

    let mut raw = 0i32;
    let mut positive_terms = Vec::new();
    let mut negative_terms = Vec::new();
    for (token, key) in tokens.iter().zip(&folded) {
        if let Some(weight) = LEXICON.get(key) {
            raw += weight;
            if *weight > 0 {
                positive_terms.push(token.to_string());
            } else {
                negative_terms.push(token.to_string());
            }
        }
    }

    let shortcut = nothing_to_report(&folded)
        .or_else(|| very_good(&folded).then_some(VERY_GOOD_SCORE));

    let clamped = (raw as f64).clamp(-10.0, 10.0);
    let score = match (shortcut, rating.and_then(rating_base)) {
        (Some(fixed), _) => fixed,
        (None, Some(base)) => (base + clamped / 10.0).clamp(0.0, 10.0),
        (None, None) => (clamped + 10.0) / 2.0,
    };

    SentimentScore {
        score,
        positive_terms,
        negative_terms,
    }
}

/// Best (or worst) `count` comments among `records`, scored with their rating.
pub fn top_comments(records: &[Delivery], polarity: Polarity, count: usize) -> Vec<CommentExemplar> {
    let mut scored: Vec<CommentExemplar> = records
        .iter()
        .filter_map(|d| {
            let comment = d.comment.as_deref()?.trim();
            if comment.chars().count() <= 1 {
                return None;
            }
            let s = score(comment, d.rating).score;
            let keep = match polarity {
                Polarity::Positive => s > POSITIVE_THRESHOLD,
                Polarity::Negative => s < NEGATIVE_THRESHOLD,
            };
            keep.then(|| CommentExemplar {
                comment: comment.to_string(),
                score: s,
                rating: d.rating,
                driver: d.driver.clone(),
                depot: d.depot.clone(),
                date: d.date.clone(),
            })
        })
        .collect();

    scored.sort_by(|a, b| {
        let ord = a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal);
        match polarity {
            Polarity::Positive => ord.reverse(),
            Polarity::Negative => ord,
        }
    });
    scored.truncate(count);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CompletionChannel, DeliveryStatus};

    fn with_comment(comment: &str, rating: Option<u8>) -> Delivery {
        Delivery {
            date: "2024-03-01".into(),
            status: DeliveryStatus::Delivered,
            failure_reason: None,
            task_id: String::new(),
            tour_id: String::new(),
            sequence: 0,
            delay: 0,
            comment: Some(comment.to_string()),
            rating,
            forced_no_contact: false,
            forced_on_site: false,
            completed_via: CompletionChannel::Mobile,
            warehouse: "Wissous".into(),
            driver: "Ali (Dépôt Paris)".into(),
            depot: "Dépôt Paris".into(),
            carrier: "Inconnu".into(),
        }
    }

    #[test]
    fn test_nothing_to_report_shortcuts() {
        assert!(score("Rien à signaler", None).score >= 8.0);
        assert_eq!(score("RAS", None).score, 8.0);
        assert_eq!(score("R.A.S.", Some(1)).score, 8.0);
        assert_eq!(score("aucun problème, merci", None).score, 8.5);
    }

    #[test]
    fn test_ras_needs_whole_token() {
        // "gras" must not trigger the RAS shortcut.
        let s = score("colis gras et sale", None);
        assert!(s.score < 5.0);
    }

    #[test]
    fn test_ras_le_bol_is_a_complaint() {
        assert_eq!(score("ras le bol, colis cassé et livreur impoli", None).score, 1.0);
        assert_eq!(score("ras-le-bol total", Some(1)).score, 0.5);
        assert_eq!(score("RAS, livré à l'heure", None).score, 8.0);

        let records = vec![with_comment("Ras-le-bol, encore en retard", None)];
        assert!(top_comments(&records, Polarity::Positive, 3).is_empty());
        assert_eq!(top_comments(&records, Polarity::Negative, 3).len(), 1);
    }

    #[test]
    fn test_very_good_overrides_low_rating() {
        assert_eq!(score("Parfait !", Some(1)).score, VERY_GOOD_SCORE);
        assert_eq!(score("très bien", None).score, VERY_GOOD_SCORE);
        assert!(score("pas très bien", None).score < VERY_GOOD_SCORE);
    }

    #[test]
    fn test_negation_within_a_few_tokens() {
        assert_eq!(score("pas du tout parfait, colis abîmé", None).score, 5.5);
        assert!(score("pas vraiment très bien", None).score < VERY_GOOD_SCORE);
        // Too far from the phrase to cancel it.
        assert_eq!(score("pas de retard du tout, livreur parfait", None).score, VERY_GOOD_SCORE);
    }

    #[test]
    fn test_unaccented_comments() {
        let s = score("colis abime et livreur decu", None);
        assert_eq!(s.score, 1.5);
        assert_eq!(s.negative_terms, vec!["abime", "decu"]);
        assert_eq!(score("Rien a signaler", Some(2)).score, 9.0);
        assert_eq!(score("tres bien", None).score, VERY_GOOD_SCORE);
    }

    #[test]
    fn test_lexicon_without_rating() {
        let s = score("Livreur aimable et rapide", None);
        assert_eq!(s.score, 8.0);
        assert_eq!(s.positive_terms, vec!["aimable", "rapide"]);
        assert!(s.negative_terms.is_empty());

        let s = score("Colis cassé, livraison en retard", None);
        assert_eq!(s.score, 1.5);
        assert_eq!(s.negative_terms, vec!["cassé", "retard"]);

        assert_eq!(score("colis déposé", None).score, 5.0);
    }

    #[test]
    fn test_raw_score_is_clamped() {
        let s = score("horrible inadmissible scandaleux catastrophe", None);
        assert_eq!(s.score, 0.0);
    }

    #[test]
    fn test_rating_dominates_text() {
        for text in ["Livreur aimable", "Colis cassé", "déposé chez le voisin", ""] {
            assert!(score(text, Some(5)).score > score(text, Some(1)).score, "{text}");
        }
        assert_eq!(score("colis déposé", Some(4)).score, 7.5);
        assert!((score("Livreur aimable", Some(3)).score - 5.3).abs() < 1e-9);
        assert_eq!(score("Livreur aimable super top bravo", Some(5)).score, 10.0);
    }

    #[test]
    fn test_out_of_range_rating_is_ignored() {
        assert_eq!(score("colis déposé", Some(9)).score, 5.0);
    }

    #[test]
    fn test_top_comments() {
        let records = vec![
            with_comment("Livreur aimable", Some(4)),
            with_comment("Colis cassé", Some(1)),
            with_comment("Rien à signaler", None),
            with_comment("x", Some(1)),
            with_comment("Retard et colis abîmé", None),
            with_comment("correct", Some(3)),
        ];

        let best = top_comments(&records, Polarity::Positive, 3);
        let texts: Vec<&str> = best.iter().map(|c| c.comment.as_str()).collect();
        assert_eq!(texts, vec!["Rien à signaler", "Livreur aimable"]);

        let worst = top_comments(&records, Polarity::Negative, 1);
        assert_eq!(worst.len(), 1);
        assert_eq!(worst[0].comment, "Colis cassé");
        assert_eq!(worst[0].driver, "Ali (Dépôt Paris)");
    }
}
