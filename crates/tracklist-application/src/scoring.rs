// SPDX-License-Identifier: GPL-3.0-or-later

//! Confidence scoring of catalog candidates against a requested song.

use crate::normalize::{normalize_artist, normalize_title, sorted_tokens};
use strsim::normalized_levenshtein;
use tracing::warn;
use tracklist_config::MatchingConfig;
use tracklist_domain::{Candidate, MatchBreakdown, ScoredCandidate, SongRequest, TierThresholds};

const DEFAULT_TITLE_WEIGHT: f64 = 0.7;
const DEFAULT_ARTIST_WEIGHT: f64 = 0.3;

/// Pure, deterministic scorer. Holds only normalized weights and thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityScorer {
    title_weight: f64,
    artist_weight: f64,
    thresholds: TierThresholds,
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self {
            title_weight: DEFAULT_TITLE_WEIGHT,
            artist_weight: DEFAULT_ARTIST_WEIGHT,
            thresholds: TierThresholds::default(),
        }
    }
}

impl SimilarityScorer {
    /// Build from configuration. Weights are normalized by their sum; invalid
    /// weights or thresholds are replaced or clamped with a warning.
    pub fn new(config: &MatchingConfig) -> Self {
        let (title_weight, artist_weight) =
            normalize_weights(config.title_weight, config.artist_weight);
        let thresholds = sanitize_thresholds(config.high_threshold, config.medium_threshold);

        Self {
            title_weight,
            artist_weight,
            thresholds,
        }
    }

    pub fn thresholds(&self) -> TierThresholds {
        self.thresholds
    }

    /// The confidence a candidate must reach to stop searching.
    pub fn acceptance_threshold(&self) -> f64 {
        self.thresholds.medium
    }

    pub fn score(&self, song: &SongRequest, candidate: Candidate) -> ScoredCandidate {
        let title_similarity = title_similarity(song.title(), &candidate.name);

        let (artist_similarity, confidence) = if song.has_artist() {
            let artist = artist_similarity(song.artist(), &candidate.artists);
            let combined = self.title_weight * title_similarity + self.artist_weight * artist;
            (Some(artist), combined)
        } else {
            (None, title_similarity)
        };

        ScoredCandidate {
            candidate,
            confidence: round4(confidence.clamp(0.0, 1.0)),
            match_breakdown: MatchBreakdown {
                title_similarity: round4(title_similarity),
                artist_similarity: artist_similarity.map(round4),
                title_weight: self.title_weight,
                artist_weight: if song.has_artist() {
                    self.artist_weight
                } else {
                    0.0
                },
            },
        }
    }
}

/// Normalized Levenshtein ratio of the normalized titles, taking the better
/// of the natural and the sorted token order.
pub fn title_similarity(requested: &str, candidate: &str) -> f64 {
    let requested = normalize_title(requested);
    let candidate = normalize_title(candidate);

    if requested == candidate {
        return 1.0;
    }

    let direct = normalized_levenshtein(&requested, &candidate);
    let sorted = normalized_levenshtein(&sorted_tokens(&requested), &sorted_tokens(&candidate));
    direct.max(sorted)
}

/// 1.0 when the requested artist equals or contains (or is contained in) any
/// credited artist; otherwise the best ratio against a single credit.
pub fn artist_similarity(requested: &str, credited: &[String]) -> f64 {
    let requested = normalize_artist(requested);
    if requested.is_empty() {
        return 0.0;
    }

    credited
        .iter()
        .map(|artist| normalize_artist(artist))
        .filter(|artist| !artist.is_empty())
        .map(|artist| {
            if artist == requested || artist.contains(&requested) || requested.contains(&artist) {
                1.0
            } else {
                normalized_levenshtein(&requested, &artist)
            }
        })
        .fold(0.0, f64::max)
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn normalize_weights(title: f64, artist: f64) -> (f64, f64) {
    let valid = |w: f64| w.is_finite() && w >= 0.0;
    let sum = title + artist;
    if !valid(title) || !valid(artist) || sum <= 0.0 {
        warn!(
            target: "matching",
            title_weight = title,
            artist_weight = artist,
            "invalid match weights, using defaults"
        );
        return (DEFAULT_TITLE_WEIGHT, DEFAULT_ARTIST_WEIGHT);
    }
    (title / sum, artist / sum)
}

fn sanitize_thresholds(high: f64, medium: f64) -> TierThresholds {
    if let Some(thresholds) = TierThresholds::new(high, medium) {
        return thresholds;
    }

    let defaults = TierThresholds::default();
    let clamp = |value: f64, fallback: f64| {
        if value.is_finite() {
            value.clamp(0.0, 1.0)
        } else {
            fallback
        }
    };
    let high = clamp(high, defaults.high);
    let medium = clamp(medium, defaults.medium).min(high);

    warn!(
        target: "matching",
        high,
        medium,
        "tier thresholds out of range, clamped"
    );
    TierThresholds { high, medium }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracklist_domain::ConfidenceTier;

    fn candidate(name: &str, artists: &[&str]) -> Candidate {
        Candidate {
            id: "id".to_string(),
            uri: "spotify:track:id".to_string(),
            name: name.to_string(),
            artists: artists.iter().map(|a| a.to_string()).collect(),
            album_name: String::new(),
            duration_ms: 0,
            popularity: 0,
            preview_url: None,
        }
    }

    fn song(title: &str, artist: &str) -> SongRequest {
        SongRequest::new(title, artist).expect("valid song")
    }

    #[test]
    fn exact_match_scores_one() {
        let scorer = SimilarityScorer::default();
        let scored = scorer.score(
            &song("  bohemian RHAPSODY ", "queen"),
            candidate("Bohemian Rhapsody", &["Queen"]),
        );

        assert_eq!(scored.confidence, 1.0);
        assert_eq!(scored.match_breakdown.title_similarity, 1.0);
        assert_eq!(scored.match_breakdown.artist_similarity, Some(1.0));
    }

    #[test]
    fn remaster_suffix_still_scores_one() {
        let scorer = SimilarityScorer::default();
        let scored = scorer.score(
            &song("Bohemian Rhapsody", "Queen"),
            candidate("Bohemian Rhapsody - Remastered 2011", &["Queen"]),
        );
        assert_eq!(scored.confidence, 1.0);
    }

    #[test]
    fn en_dash_qualifier_matches_hyphen_qualifier() {
        let scorer = SimilarityScorer::default();
        let scored = scorer.score(
            &song("Bohemian Rhapsody \u{2013} Live", "Queen"),
            candidate("Bohemian Rhapsody - Live", &["Queen"]),
        );
        assert_eq!(scored.confidence, 1.0);
    }

    #[test]
    fn diacritics_are_folded() {
        let scorer = SimilarityScorer::default();
        let scored = scorer.score(
            &song("Halo", "Beyonce"),
            candidate("Halo", &["Beyoncé"]),
        );
        assert_eq!(scored.confidence, 1.0);
    }

    #[test]
    fn empty_artist_drops_the_artist_term() {
        let scorer = SimilarityScorer::default();
        let scored = scorer.score(
            &song("Bohemian Rhapsody", ""),
            candidate("Bohemian Rhapsody", &["Some Cover Band"]),
        );

        assert_eq!(scored.confidence, 1.0);
        assert_eq!(scored.match_breakdown.artist_similarity, None);
        assert_eq!(scored.match_breakdown.artist_weight, 0.0);
    }

    #[test]
    fn wrong_artist_reduces_confidence() {
        let scorer = SimilarityScorer::default();
        let scored = scorer.score(
            &song("Bohemian Rhapsody", "Queen"),
            candidate("Bohemian Rhapsody", &["Panic! At The Disco"]),
        );

        assert!(scored.confidence < 0.90);
        assert!(scored.confidence >= 0.70);
    }

    #[test]
    fn artist_matches_any_credit_and_substrings() {
        let credited = vec!["Queen".to_string(), "David Bowie".to_string()];
        assert_eq!(artist_similarity("David Bowie", &credited), 1.0);
        assert_eq!(artist_similarity("Queen & David Bowie", &credited), 1.0);
        assert_eq!(artist_similarity("Beatles", &["The Beatles".to_string()]), 1.0);
        assert_eq!(artist_similarity("Queen", &[]), 0.0);
    }

    #[test]
    fn token_order_does_not_matter_for_titles() {
        assert_eq!(title_similarity("Rhapsody Bohemian", "Bohemian Rhapsody"), 1.0);
    }

    #[test]
    fn scores_stay_in_unit_interval() {
        let scorer = SimilarityScorer::default();
        for (title, artist, name, credit) in [
            ("a", "b", "zzzzzzzzzz", "yyyyyy"),
            ("Bohemian Rhapsody", "Queen", "Bohemian Rhapsody", "Queen"),
            ("xyzxyz-nonexistent-999", "nobody", "Yesterday", "The Beatles"),
        ] {
            let scored = scorer.score(&song(title, artist), candidate(name, &[credit]));
            assert!((0.0..=1.0).contains(&scored.confidence), "{scored:?}");
        }
    }

    #[test]
    fn rescoring_is_idempotent() {
        let scorer = SimilarityScorer::default();
        let request = song("Don't Stop Me Now (Live)", "The Queen");
        let first = scorer.score(&request, candidate("Don't Stop Me Now", &["Queen"]));
        let second = scorer.score(&request, candidate("Don't Stop Me Now", &["Queen"]));

        assert_eq!(first.confidence.to_bits(), second.confidence.to_bits());
        assert_eq!(first, second);
    }

    #[test]
    fn scoring_normalized_input_gives_same_confidence() {
        let scorer = SimilarityScorer::default();
        for (title, artist) in [
            ("Bohemian Rhapsody (Remastered 2011)", "Queen"),
            ("Stay (feat. Justin Bieber)", "The Kid LAROI"),
            ("Halo", "Beyoncé"),
        ] {
            let raw = song(title, artist);
            let normalized = song(&normalize_title(title), &normalize_artist(artist));
            let target = candidate("Bohemian Rhapsody", &["Queen"]);

            assert_eq!(
                scorer.score(&raw, target.clone()).confidence,
                scorer.score(&normalized, target).confidence,
                "{title} / {artist}"
            );
        }
    }

    #[test]
    fn weights_are_normalized_by_their_sum() {
        let config = MatchingConfig {
            title_weight: 7.0,
            artist_weight: 3.0,
            ..MatchingConfig::default()
        };
        let scorer = SimilarityScorer::new(&config);
        let scored = scorer.score(&song("Yesterday", "Queen"), candidate("Yesterday", &["Zzzzz"]));

        assert!((scored.match_breakdown.title_weight - 0.7).abs() < 1e-12);
        assert!(scored.confidence >= 0.7 && scored.confidence < 1.0);
    }

    #[test]
    fn invalid_weights_fall_back_to_defaults() {
        let config = MatchingConfig {
            title_weight: f64::NAN,
            artist_weight: 0.3,
            ..MatchingConfig::default()
        };
        assert_eq!(SimilarityScorer::new(&config), SimilarityScorer::default());
    }

    #[test]
    fn out_of_range_thresholds_are_clamped() {
        let config = MatchingConfig {
            high_threshold: 1.5,
            medium_threshold: f64::INFINITY,
            ..MatchingConfig::default()
        };
        let thresholds = SimilarityScorer::new(&config).thresholds();

        assert_eq!(thresholds.high, 1.0);
        assert_eq!(thresholds.medium, 0.70);
        assert_eq!(thresholds.classify(Some(1.0)), ConfidenceTier::High);
    }
}
