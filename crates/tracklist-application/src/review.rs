// SPDX-License-Identifier: GPL-3.0-or-later

//! Human review round-trip for uncertain matches.
//!
//! A batch report is exported as CSV with an empty `action` column. The
//! reviewer fills in `approve`, `reject`, or a replacement
//! `spotify:track:<id>`, and the file is imported back into a list of URIs.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use tracklist_domain::{BatchReport, ConfidenceTier, TrackUri, TRACK_URI_PREFIX};

pub const REVIEW_HEADER: [&str; 9] = [
    "row",
    "title",
    "artist",
    "matched_name",
    "matched_artist",
    "spotify_uri",
    "confidence",
    "tier",
    "action",
];

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("review CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("review CSV is missing the '{0}' column")]
    MissingColumn(&'static str),

    #[error("review CSV is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Which report entries go into the review file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReviewScope {
    /// Medium, Low and NotFound rows.
    #[default]
    NeedsReview,
    All,
}

impl ReviewScope {
    fn includes(&self, tier: ConfidenceTier) -> bool {
        match self {
            Self::NeedsReview => tier != ConfidenceTier::High,
            Self::All => true,
        }
    }
}

/// Result of reading a reviewed CSV back in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReviewOutcome {
    /// Approved and replacement URIs, in row order.
    pub accepted_uris: Vec<String>,
    pub rejected: usize,
    pub custom_replacements: usize,
    /// Rows whose action could not be understood. Each is also counted as rejected.
    pub invalid_rows: usize,
}

enum ReviewAction {
    Approve,
    Reject,
    Replace(TrackUri),
    Invalid,
}

fn parse_action(raw: &str) -> ReviewAction {
    let action = raw.trim();
    if action.is_empty() || action.eq_ignore_ascii_case("reject") {
        ReviewAction::Reject
    } else if action.eq_ignore_ascii_case("approve") {
        ReviewAction::Approve
    } else if action.starts_with(TRACK_URI_PREFIX) {
        TrackUri::parse(action)
            .map(ReviewAction::Replace)
            .unwrap_or(ReviewAction::Invalid)
    } else {
        ReviewAction::Invalid
    }
}

/// Render the report as a review CSV.
pub fn export_review(report: &BatchReport, scope: ReviewScope) -> Result<String, ReviewError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(REVIEW_HEADER)?;

    let mut rows = 0usize;
    for entry in report
        .entries
        .iter()
        .filter(|entry| scope.includes(entry.result.tier()))
    {
        let row = (entry.index + 1).to_string();
        let tier = entry.result.tier();
        let (matched_name, matched_artist, uri, confidence) = match entry.result.candidate() {
            Some(scored) => (
                scored.candidate.name.clone(),
                scored.candidate.artist_line(),
                scored.candidate.uri.clone(),
                format!("{:.1}", scored.confidence_percent()),
            ),
            None => (String::new(), String::new(), String::new(), String::new()),
        };

        writer.write_record([
            row.as_str(),
            entry.request.title(),
            entry.request.artist(),
            matched_name.as_str(),
            matched_artist.as_str(),
            uri.as_str(),
            confidence.as_str(),
            tier.as_str(),
            "",
        ])?;
        rows += 1;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;

    info!(target: "review", batch_id = %report.id, rows, ?scope, "review CSV exported");
    Ok(String::from_utf8(bytes)?)
}

/// Read a reviewed CSV. Only the `action` column is required; without a
/// `spotify_uri` column an `approve` row has nothing to approve and counts
/// as invalid.
pub fn import_review(content: &str) -> Result<ReviewOutcome, ReviewError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };
    let action_col = column("action").ok_or(ReviewError::MissingColumn("action"))?;
    let uri_col = column("spotify_uri");

    let mut outcome = ReviewOutcome::default();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let action = record.get(action_col).unwrap_or_default();

        match parse_action(action) {
            ReviewAction::Approve => {
                let uri = uri_col
                    .and_then(|col| record.get(col))
                    .unwrap_or_default()
                    .trim();
                match TrackUri::parse(uri) {
                    Ok(uri) => outcome.accepted_uris.push(uri.into()),
                    Err(_) => {
                        warn!(target: "review", line = line + 2, uri, "approved row has no valid track URI");
                        outcome.invalid_rows += 1;
                        outcome.rejected += 1;
                    }
                }
            }
            ReviewAction::Reject => outcome.rejected += 1,
            ReviewAction::Replace(uri) => {
                outcome.accepted_uris.push(uri.into());
                outcome.custom_replacements += 1;
            }
            ReviewAction::Invalid => {
                warn!(target: "review", line = line + 2, action, "unrecognized review action, treating as reject");
                outcome.invalid_rows += 1;
                outcome.rejected += 1;
            }
        }
    }

    debug!(
        target: "review",
        accepted = outcome.accepted_uris.len(),
        rejected = outcome.rejected,
        custom = outcome.custom_replacements,
        invalid = outcome.invalid_rows,
        "review CSV imported"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracklist_domain::{
        Candidate, MatchBreakdown, ResolutionResult, ScoredCandidate, SongRequest,
    };

    fn scored(id: &str, name: &str, confidence: f64) -> ScoredCandidate {
        ScoredCandidate {
            candidate: Candidate {
                id: id.to_string(),
                uri: format!("spotify:track:{}", id),
                name: name.to_string(),
                artists: vec!["Queen".to_string(), "David Bowie".to_string()],
                album_name: "Hot Space".to_string(),
                duration_ms: 248_000,
                popularity: 70,
                preview_url: None,
            },
            confidence,
            match_breakdown: MatchBreakdown {
                title_similarity: confidence,
                artist_similarity: Some(1.0),
                title_weight: 0.7,
                artist_weight: 0.3,
            },
        }
    }

    fn report() -> BatchReport {
        let song = |t: &str| SongRequest::new(t, "Queen").expect("valid song");
        BatchReport::from_results(vec![
            (
                song("Bohemian Rhapsody"),
                ResolutionResult::HighConfidence(scored("high1", "Bohemian Rhapsody", 1.0)),
            ),
            (
                song("Under Pressure, Live"),
                ResolutionResult::MediumConfidence(scored("med1", "Under Pressure", 0.8234)),
            ),
            (song("Nope"), ResolutionResult::NotFound { note: None }),
        ])
    }

    #[test]
    fn export_needs_review_skips_high_rows() {
        let csv = export_review(&report(), ReviewScope::NeedsReview).expect("export should work");
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "row,title,artist,matched_name,matched_artist,spotify_uri,confidence,tier,action"
        );
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            "2,\"Under Pressure, Live\",Queen,Under Pressure,\"Queen, David Bowie\",spotify:track:med1,82.3,medium,"
        );
        assert_eq!(lines[2], "3,Nope,Queen,,,,,not_found,");
    }

    #[test]
    fn export_all_includes_every_row() {
        let csv = export_review(&report(), ReviewScope::All).expect("export should work");
        assert_eq!(csv.lines().count(), 4);
        assert!(csv.lines().nth(1).unwrap().ends_with(",100.0,high,"));
    }

    #[test]
    fn approve_reject_and_replace() {
        let csv = "row,title,artist,matched_name,matched_artist,spotify_uri,confidence,tier,action\n\
                   1,A,X,A,X,spotify:track:aaa,95.0,high,approve\n\
                   2,B,Y,B,Y,spotify:track:zzz,75.0,medium,reject\n\
                   3,C,Z,,,,,not_found,spotify:track:bbb\n";

        let outcome = import_review(csv).expect("import should work");

        assert_eq!(
            outcome.accepted_uris,
            vec!["spotify:track:aaa".to_string(), "spotify:track:bbb".to_string()]
        );
        assert_eq!(outcome.rejected, 1);
        assert_eq!(outcome.custom_replacements, 1);
        assert_eq!(outcome.invalid_rows, 0);
    }

    #[test]
    fn actions_are_trimmed_and_case_insensitive() {
        let csv = "spotify_uri,action\nspotify:track:aaa,  APPROVE \nspotify:track:bbb, Reject\nspotify:track:ccc,\n";
        let outcome = import_review(csv).expect("import should work");

        assert_eq!(outcome.accepted_uris, vec!["spotify:track:aaa".to_string()]);
        assert_eq!(outcome.rejected, 2);
    }

    #[test]
    fn unknown_actions_count_as_invalid_and_rejected() {
        let csv = "spotify_uri,action\n\
                   spotify:track:aaa,maybe\n\
                   ,approve\n\
                   spotify:track:ccc,spotify:track:\n";
        let outcome = import_review(csv).expect("import should work");

        assert!(outcome.accepted_uris.is_empty());
        assert_eq!(outcome.invalid_rows, 3);
        assert_eq!(outcome.rejected, 3);
    }

    #[test]
    fn missing_action_column_is_an_error() {
        let error = import_review("row,spotify_uri\n1,spotify:track:a\n").unwrap_err();
        assert!(matches!(error, ReviewError::MissingColumn("action")));
    }

    #[test]
    fn action_column_alone_is_enough() {
        let csv = "action\nspotify:track:bbb\napprove\nreject\n";
        let outcome = import_review(csv).expect("import should work");

        assert_eq!(outcome.accepted_uris, vec!["spotify:track:bbb".to_string()]);
        assert_eq!(outcome.custom_replacements, 1);
        assert_eq!(outcome.invalid_rows, 1);
        assert_eq!(outcome.rejected, 2);
    }

    #[test]
    fn exported_file_imports_back() {
        let exported = export_review(&report(), ReviewScope::All).expect("export should work");
        let approved = exported.replace(",high,", ",high,approve");

        let outcome = import_review(&approved).expect("import should work");
        assert_eq!(outcome.accepted_uris, vec!["spotify:track:high1".to_string()]);
        assert_eq!(outcome.rejected, 2);
    }
}
