// SPDX-License-Identifier: GPL-3.0-or-later
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const TRACK_URI_PREFIX: &str = "spotify:track:";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("song title must not be empty")]
    EmptyTitle,

    #[error("invalid track reference: {0}")]
    InvalidTrackUri(String),

    #[error("unknown inclusion tier '{0}' (expected high, high_medium or all)")]
    UnknownInclusionTier(String),
}

// ============================================================================
// Value Objects & IDs
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId(pub Uuid);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A `spotify:track:<id>` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackUri(String);

impl TrackUri {
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        let value = value.trim();
        let id = value
            .strip_prefix(TRACK_URI_PREFIX)
            .ok_or_else(|| DomainError::InvalidTrackUri(value.to_string()))?;

        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(DomainError::InvalidTrackUri(value.to_string()));
        }

        Ok(Self(value.to_string()))
    }

    pub fn from_id(id: &str) -> Result<Self, DomainError> {
        Self::parse(&format!("{TRACK_URI_PREFIX}{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn id(&self) -> &str {
        &self.0[TRACK_URI_PREFIX.len()..]
    }
}

impl TryFrom<String> for TrackUri {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TrackUri> for String {
    fn from(value: TrackUri) -> Self {
        value.0
    }
}

impl std::fmt::Display for TrackUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Requests & Candidates
// ============================================================================

/// One free-text song description to resolve against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSongRequest")]
pub struct SongRequest {
    title: String,
    artist: String,
}

#[derive(Deserialize)]
struct RawSongRequest {
    title: String,
    #[serde(default)]
    artist: String,
}

impl TryFrom<RawSongRequest> for SongRequest {
    type Error = DomainError;

    fn try_from(raw: RawSongRequest) -> Result<Self, Self::Error> {
        Self::new(raw.title, raw.artist)
    }
}

impl SongRequest {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Result<Self, DomainError> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(DomainError::EmptyTitle);
        }

        Ok(Self {
            title,
            artist: artist.into().trim().to_string(),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn has_artist(&self) -> bool {
        !self.artist.is_empty()
    }
}

impl std::fmt::Display for SongRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.artist.is_empty() {
            write!(f, "{}", self.title)
        } else {
            write!(f, "{} - {}", self.artist, self.title)
        }
    }
}

/// Catalog track snapshot returned by a search query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub uri: String,
    pub name: String,
    pub artists: Vec<String>,
    pub album_name: String,
    pub duration_ms: u64,
    pub popularity: u8,
    pub preview_url: Option<String>,
}

impl Candidate {
    pub fn artist_line(&self) -> String {
        self.artists.join(", ")
    }
}

/// Per-field contribution to a confidence value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchBreakdown {
    pub title_similarity: f64,
    /// `None` when the request carried no artist and the term was dropped.
    pub artist_similarity: Option<f64>,
    pub title_weight: f64,
    pub artist_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub confidence: f64,
    pub match_breakdown: MatchBreakdown,
}

impl ScoredCandidate {
    pub fn confidence_percent(&self) -> f64 {
        (self.confidence * 1000.0).round() / 10.0
    }
}

// ============================================================================
// Tiers
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
    NotFound,
}

impl ConfidenceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::NotFound => "not_found",
        }
    }
}

impl std::fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower bounds of the High and Medium tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub high: f64,
    pub medium: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            high: 0.90,
            medium: 0.70,
        }
    }
}

impl TierThresholds {
    /// `None` when the values are not finite, outside `[0, 1]`, or `medium > high`.
    pub fn new(high: f64, medium: f64) -> Option<Self> {
        let in_range = |value: f64| value.is_finite() && (0.0..=1.0).contains(&value);
        if !in_range(high) || !in_range(medium) || medium > high {
            return None;
        }
        Some(Self { high, medium })
    }

    /// Tier for the best candidate's confidence; `None` means no candidate.
    ///
    /// A zero confidence shares nothing with the request and is treated the
    /// same as no candidate.
    pub fn classify(&self, confidence: Option<f64>) -> ConfidenceTier {
        match confidence {
            Some(c) if c >= self.high => ConfidenceTier::High,
            Some(c) if c >= self.medium => ConfidenceTier::Medium,
            Some(c) if c > 0.0 => ConfidenceTier::Low,
            _ => ConfidenceTier::NotFound,
        }
    }
}

/// Which tiers are turned into playlist entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InclusionTier {
    #[default]
    High,
    HighMedium,
    All,
}

impl InclusionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::HighMedium => "high_medium",
            Self::All => "all",
        }
    }

    pub fn includes(&self, tier: ConfidenceTier) -> bool {
        match (self, tier) {
            (_, ConfidenceTier::NotFound) => false,
            (_, ConfidenceTier::High) => true,
            (Self::HighMedium | Self::All, ConfidenceTier::Medium) => true,
            (Self::All, ConfidenceTier::Low) => true,
            _ => false,
        }
    }
}

impl std::str::FromStr for InclusionTier {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "high" => Ok(Self::High),
            "high_medium" | "high-medium" => Ok(Self::HighMedium),
            "all" => Ok(Self::All),
            other => Err(DomainError::UnknownInclusionTier(other.to_string())),
        }
    }
}

impl std::fmt::Display for InclusionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Resolution results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tier", rename_all = "snake_case")]
pub enum ResolutionResult {
    HighConfidence(ScoredCandidate),
    MediumConfidence(ScoredCandidate),
    LowConfidence(ScoredCandidate),
    NotFound {
        /// Set when resolution failed rather than legitimately finding nothing.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
}

impl ResolutionResult {
    pub fn classify(best: Option<ScoredCandidate>, thresholds: &TierThresholds) -> Self {
        let tier = thresholds.classify(best.as_ref().map(|c| c.confidence));
        match (tier, best) {
            (ConfidenceTier::High, Some(candidate)) => Self::HighConfidence(candidate),
            (ConfidenceTier::Medium, Some(candidate)) => Self::MediumConfidence(candidate),
            (ConfidenceTier::Low, Some(candidate)) => Self::LowConfidence(candidate),
            _ => Self::NotFound { note: None },
        }
    }

    pub fn failed(note: impl Into<String>) -> Self {
        Self::NotFound {
            note: Some(note.into()),
        }
    }

    pub fn tier(&self) -> ConfidenceTier {
        match self {
            Self::HighConfidence(_) => ConfidenceTier::High,
            Self::MediumConfidence(_) => ConfidenceTier::Medium,
            Self::LowConfidence(_) => ConfidenceTier::Low,
            Self::NotFound { .. } => ConfidenceTier::NotFound,
        }
    }

    pub fn candidate(&self) -> Option<&ScoredCandidate> {
        match self {
            Self::HighConfidence(c) | Self::MediumConfidence(c) | Self::LowConfidence(c) => Some(c),
            Self::NotFound { .. } => None,
        }
    }

    pub fn note(&self) -> Option<&str> {
        match self {
            Self::NotFound { note } => note.as_deref(),
            _ => None,
        }
    }
}

// ============================================================================
// Batch report
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    /// Zero-based position of the request in the input.
    pub index: usize,
    pub request: SongRequest,
    pub result: ResolutionResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub high_confidence: usize,
    pub medium_confidence: usize,
    pub low_confidence: usize,
    pub not_found: usize,
    pub total: usize,
}

impl BatchSummary {
    pub fn record(&mut self, tier: ConfidenceTier) {
        match tier {
            ConfidenceTier::High => self.high_confidence += 1,
            ConfidenceTier::Medium => self.medium_confidence += 1,
            ConfidenceTier::Low => self.low_confidence += 1,
            ConfidenceTier::NotFound => self.not_found += 1,
        }
        self.total += 1;
    }

    pub fn count(&self, tier: ConfidenceTier) -> usize {
        match tier {
            ConfidenceTier::High => self.high_confidence,
            ConfidenceTier::Medium => self.medium_confidence,
            ConfidenceTier::Low => self.low_confidence,
            ConfidenceTier::NotFound => self.not_found,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub id: BatchId,
    pub generated_at: DateTime<Utc>,
    pub summary: BatchSummary,
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    /// Build a report from per-song results given in input order.
    pub fn from_results(results: Vec<(SongRequest, ResolutionResult)>) -> Self {
        let mut summary = BatchSummary::default();
        let entries = results
            .into_iter()
            .enumerate()
            .map(|(index, (request, result))| {
                summary.record(result.tier());
                BatchEntry {
                    index,
                    request,
                    result,
                }
            })
            .collect();

        Self {
            id: BatchId::new(),
            generated_at: Utc::now(),
            summary,
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Matched URIs for the tiers `inclusion` admits, in input order.
    pub fn accepted_uris(&self, inclusion: InclusionTier) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| inclusion.includes(entry.result.tier()))
            .filter_map(|entry| entry.result.candidate())
            .map(|scored| scored.candidate.uri.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(uri: &str, confidence: f64) -> ScoredCandidate {
        ScoredCandidate {
            candidate: Candidate {
                id: uri.trim_start_matches(TRACK_URI_PREFIX).to_string(),
                uri: uri.to_string(),
                name: "Song".to_string(),
                artists: vec!["Artist".to_string()],
                album_name: "Album".to_string(),
                duration_ms: 200_000,
                popularity: 50,
                preview_url: None,
            },
            confidence,
            match_breakdown: MatchBreakdown {
                title_similarity: confidence,
                artist_similarity: Some(confidence),
                title_weight: 0.7,
                artist_weight: 0.3,
            },
        }
    }

    #[test]
    fn song_request_rejects_blank_title() {
        assert_eq!(SongRequest::new("   ", "Queen"), Err(DomainError::EmptyTitle));
        let song = SongRequest::new(" Bohemian Rhapsody ", "").expect("valid request");
        assert_eq!(song.title(), "Bohemian Rhapsody");
        assert!(!song.has_artist());
    }

    #[test]
    fn song_request_deserialization_validates_title() {
        let ok: SongRequest =
            serde_json::from_str(r#"{"title":"Hotel California"}"#).expect("artist is optional");
        assert_eq!(ok.artist(), "");

        let err = serde_json::from_str::<SongRequest>(r#"{"title":"","artist":"Eagles"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn tier_boundaries_partition_confidence() {
        let thresholds = TierThresholds::default();
        assert_eq!(thresholds.classify(Some(1.0)), ConfidenceTier::High);
        assert_eq!(thresholds.classify(Some(0.90)), ConfidenceTier::High);
        assert_eq!(thresholds.classify(Some(0.8999)), ConfidenceTier::Medium);
        assert_eq!(thresholds.classify(Some(0.70)), ConfidenceTier::Medium);
        assert_eq!(thresholds.classify(Some(0.6999)), ConfidenceTier::Low);
        assert_eq!(thresholds.classify(Some(0.0001)), ConfidenceTier::Low);
        assert_eq!(thresholds.classify(Some(0.0)), ConfidenceTier::NotFound);
        assert_eq!(thresholds.classify(None), ConfidenceTier::NotFound);
    }

    #[test]
    fn every_confidence_lands_in_exactly_one_tier() {
        let thresholds = TierThresholds::default();
        for step in 0..=1000 {
            let confidence = step as f64 / 1000.0;
            let tier = thresholds.classify(Some(confidence));
            let expected = [
                confidence >= 0.90,
                (0.70..0.90).contains(&confidence),
                confidence > 0.0 && confidence < 0.70,
                confidence == 0.0,
            ];
            assert_eq!(expected.iter().filter(|hit| **hit).count(), 1);
            let index = match tier {
                ConfidenceTier::High => 0,
                ConfidenceTier::Medium => 1,
                ConfidenceTier::Low => 2,
                ConfidenceTier::NotFound => 3,
            };
            assert!(expected[index], "confidence {confidence} misclassified as {tier}");
        }
    }

    #[test]
    fn thresholds_reject_inverted_or_out_of_range_values() {
        assert!(TierThresholds::new(0.7, 0.9).is_none());
        assert!(TierThresholds::new(1.2, 0.7).is_none());
        assert!(TierThresholds::new(f64::NAN, 0.7).is_none());
        assert!(TierThresholds::new(0.95, 0.75).is_some());
    }

    #[test]
    fn track_uri_parsing() {
        let uri = TrackUri::parse("spotify:track:4u7EnebtmKWzUH433cf5Qv").expect("valid uri");
        assert_eq!(uri.id(), "4u7EnebtmKWzUH433cf5Qv");
        assert!(TrackUri::parse("spotify:album:4u7EnebtmKWzUH433cf5Qv").is_err());
        assert!(TrackUri::parse("spotify:track:").is_err());
        assert!(TrackUri::parse("spotify:track:abc def").is_err());
        assert_eq!(TrackUri::from_id("A").expect("valid id").as_str(), "spotify:track:A");
    }

    #[test]
    fn inclusion_tier_parsing_and_membership() {
        assert_eq!("high".parse::<InclusionTier>(), Ok(InclusionTier::High));
        assert_eq!(" High_Medium ".parse::<InclusionTier>(), Ok(InclusionTier::HighMedium));
        assert!("most".parse::<InclusionTier>().is_err());

        assert!(!InclusionTier::High.includes(ConfidenceTier::Medium));
        assert!(InclusionTier::HighMedium.includes(ConfidenceTier::Medium));
        assert!(!InclusionTier::HighMedium.includes(ConfidenceTier::Low));
        assert!(InclusionTier::All.includes(ConfidenceTier::Low));
        assert!(!InclusionTier::All.includes(ConfidenceTier::NotFound));
    }

    #[test]
    fn report_preserves_order_and_counts_tiers() {
        let thresholds = TierThresholds::default();
        let results = vec![
            (
                SongRequest::new("A", "x").unwrap(),
                ResolutionResult::classify(Some(scored("spotify:track:A", 0.95)), &thresholds),
            ),
            (
                SongRequest::new("B", "x").unwrap(),
                ResolutionResult::classify(Some(scored("spotify:track:B", 0.75)), &thresholds),
            ),
            (SongRequest::new("C", "x").unwrap(), ResolutionResult::failed("gateway down")),
            (
                SongRequest::new("D", "x").unwrap(),
                ResolutionResult::classify(Some(scored("spotify:track:D", 0.40)), &thresholds),
            ),
        ];

        let report = BatchReport::from_results(results);
        assert_eq!(report.len(), 4);
        assert_eq!(
            report.summary,
            BatchSummary {
                high_confidence: 1,
                medium_confidence: 1,
                low_confidence: 1,
                not_found: 1,
                total: 4,
            }
        );
        let titles: Vec<_> = report.entries.iter().map(|e| e.request.title()).collect();
        assert_eq!(titles, vec!["A", "B", "C", "D"]);
        assert_eq!(report.entries[2].result.note(), Some("gateway down"));

        assert_eq!(report.accepted_uris(InclusionTier::High), vec!["spotify:track:A"]);
        assert_eq!(
            report.accepted_uris(InclusionTier::All),
            vec!["spotify:track:A", "spotify:track:B", "spotify:track:D"]
        );
    }

    #[test]
    fn resolution_result_serializes_with_tier_tag() {
        let result = ResolutionResult::classify(
            Some(scored("spotify:track:A", 0.95)),
            &TierThresholds::default(),
        );
        let value = serde_json::to_value(&result).expect("serializable");
        assert_eq!(value["tier"], "high_confidence");
        assert_eq!(value["uri"], "spotify:track:A");

        let back: ResolutionResult = serde_json::from_value(value).expect("round trip");
        assert_eq!(back.tier(), ConfidenceTier::High);
    }
}
