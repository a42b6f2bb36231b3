// SPDX-License-Identifier: GPL-3.0-or-later

//! Track resolution: primary catalog query, ranked by confidence, with an
//! ordered fallback chain when nothing acceptable comes back.
//!
//! The fallback chain:
//! 1. Title-only query
//! 2. Simplified title (brackets and trailing `- qualifier` removed) with artist
//!
//! Fallback stops as soon as an acceptable candidate is held.

use crate::gateway::{CatalogSearchGateway, GatewayError};
use crate::normalize::simplify_title;
use crate::scoring::SimilarityScorer;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};
use tracklist_config::MatchingConfig;
use tracklist_domain::{ScoredCandidate, SongRequest};

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error(
        "could not resolve \"{title}\" by \"{artist}\" (queries tried: {}): {source}",
        .attempted_queries.join(" | ")
    )]
    ResolutionFailed {
        title: String,
        artist: String,
        attempted_queries: Vec<String>,
        #[source]
        source: GatewayError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    Primary,
    TitleOnly,
    SimplifiedTitle,
}

impl SearchStrategy {
    const FALLBACKS: [SearchStrategy; 2] = [SearchStrategy::TitleOnly, SearchStrategy::SimplifiedTitle];

    /// Query text for this strategy, or `None` when it has nothing new to try.
    fn query(&self, song: &SongRequest) -> Option<String> {
        match self {
            Self::Primary => Some(track_query(song.title(), song.artist())),
            Self::TitleOnly => Some(track_query(song.title(), "")),
            Self::SimplifiedTitle => {
                let simplified = simplify_title(song.title());
                (simplified != song.title()).then(|| track_query(&simplified, song.artist()))
            }
        }
    }
}

/// One catalog query issued during resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchAttempt {
    pub strategy: SearchStrategy,
    pub query: String,
    pub returned: usize,
}

/// Ranked candidates plus the queries that produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub candidates: Vec<ScoredCandidate>,
    pub attempts: Vec<SearchAttempt>,
}

impl Resolution {
    pub fn best(&self) -> Option<&ScoredCandidate> {
        self.candidates.first()
    }

    pub fn into_best(self) -> Option<ScoredCandidate> {
        self.candidates.into_iter().next()
    }
}

/// `track:"<title>" artist:"<artist>"`, or just the track filter when the
/// artist is empty. Embedded double quotes would end the filter and are dropped.
pub fn track_query(title: &str, artist: &str) -> String {
    let title = title.replace('"', "");
    let artist = artist.replace('"', "");
    if artist.trim().is_empty() {
        format!("track:\"{}\"", title.trim())
    } else {
        format!("track:\"{}\" artist:\"{}\"", title.trim(), artist.trim())
    }
}

/// Candidates merged across queries, keyed by catalog id.
#[derive(Default)]
struct CandidatePool {
    by_id: HashMap<String, (usize, ScoredCandidate)>,
    next_order: usize,
}

impl CandidatePool {
    fn merge(&mut self, scored: ScoredCandidate) {
        let key = if scored.candidate.id.is_empty() {
            scored.candidate.uri.clone()
        } else {
            scored.candidate.id.clone()
        };

        match self.by_id.get_mut(&key) {
            Some((_, existing)) => {
                if scored.confidence > existing.confidence {
                    *existing = scored;
                }
            }
            None => {
                self.by_id.insert(key, (self.next_order, scored));
                self.next_order += 1;
            }
        }
    }

    fn best_confidence(&self) -> Option<f64> {
        self.by_id
            .values()
            .map(|(_, scored)| scored.confidence)
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
    }

    /// Confidence desc, popularity desc, then first-seen catalog order.
    fn ranked(self, limit: usize) -> Vec<ScoredCandidate> {
        let mut entries: Vec<(usize, ScoredCandidate)> = self.by_id.into_values().collect();
        entries.sort_by(|(order_a, a), (order_b, b)| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.candidate.popularity.cmp(&a.candidate.popularity))
                .then_with(|| order_a.cmp(order_b))
        });
        entries
            .into_iter()
            .take(limit)
            .map(|(_, scored)| scored)
            .collect()
    }
}

/// Resolves song requests against a catalog gateway.
#[derive(Debug, Clone)]
pub struct TrackResolver<G> {
    gateway: G,
    scorer: SimilarityScorer,
    query_limit: usize,
    fallback_query_limit: usize,
}

impl<G: CatalogSearchGateway> TrackResolver<G> {
    pub fn new(gateway: G, config: &MatchingConfig) -> Self {
        Self {
            gateway,
            scorer: SimilarityScorer::new(config),
            query_limit: config.query_limit.max(1),
            fallback_query_limit: config.fallback_query_limit.max(1),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn scorer(&self) -> &SimilarityScorer {
        &self.scorer
    }

    /// Same settings over a different gateway.
    pub fn with_gateway<H: CatalogSearchGateway>(&self, gateway: H) -> TrackResolver<H> {
        TrackResolver {
            gateway,
            scorer: self.scorer,
            query_limit: self.query_limit,
            fallback_query_limit: self.fallback_query_limit,
        }
    }

    /// Up to `limit` candidates in descending confidence.
    pub async fn resolve(
        &self,
        song: &SongRequest,
        limit: usize,
    ) -> Result<Vec<ScoredCandidate>, ResolutionError> {
        Ok(self.resolve_traced(song, limit).await?.candidates)
    }

    /// Like [`resolve`](Self::resolve), also reporting every query issued.
    pub async fn resolve_traced(
        &self,
        song: &SongRequest,
        limit: usize,
    ) -> Result<Resolution, ResolutionError> {
        self.run(song, limit, true).await
    }

    /// Run the primary query and every fallback strategy regardless of how
    /// good the early results are.
    pub async fn fuzzy_search(
        &self,
        song: &SongRequest,
        limit: usize,
    ) -> Result<Resolution, ResolutionError> {
        self.run(song, limit, false).await
    }

    async fn run(
        &self,
        song: &SongRequest,
        limit: usize,
        short_circuit: bool,
    ) -> Result<Resolution, ResolutionError> {
        let limit = limit.max(1);
        let acceptable = self.scorer.acceptance_threshold();
        let mut pool = CandidatePool::default();
        let mut attempts: Vec<SearchAttempt> = Vec::new();

        let primary_limit = limit.max(self.query_limit);
        if let Some(query) = SearchStrategy::Primary.query(song) {
            self.attempt(song, SearchStrategy::Primary, query, primary_limit, &mut pool, &mut attempts)
                .await?;
        }

        for strategy in SearchStrategy::FALLBACKS {
            if short_circuit && pool.best_confidence().is_some_and(|c| c >= acceptable) {
                break;
            }

            let Some(query) = strategy.query(song) else {
                continue;
            };
            if attempts.iter().any(|a| a.query == query) {
                debug!(target: "matching", ?strategy, query = %query, "skipping repeated query");
                continue;
            }

            let fallback_limit = limit.max(self.fallback_query_limit);
            self.attempt(song, strategy, query, fallback_limit, &mut pool, &mut attempts)
                .await?;
        }

        let candidates = pool.ranked(limit);
        debug!(
            target: "matching",
            title = %song.title(),
            artist = %song.artist(),
            queries = attempts.len(),
            best = candidates.first().map(|c| c.confidence),
            "resolution finished"
        );

        Ok(Resolution {
            candidates,
            attempts,
        })
    }

    async fn attempt(
        &self,
        song: &SongRequest,
        strategy: SearchStrategy,
        query: String,
        limit: usize,
        pool: &mut CandidatePool,
        attempts: &mut Vec<SearchAttempt>,
    ) -> Result<(), ResolutionError> {
        debug!(target: "matching", ?strategy, query = %query, limit, "searching catalog");

        match self.gateway.search(&query, limit).await {
            Ok(found) => {
                attempts.push(SearchAttempt {
                    strategy,
                    query,
                    returned: found.len(),
                });
                for candidate in found {
                    pool.merge(self.scorer.score(song, candidate));
                }
                Ok(())
            }
            Err(source) => {
                warn!(
                    target: "matching",
                    ?strategy,
                    query = %query,
                    error = %source,
                    "catalog search failed"
                );
                let mut attempted_queries: Vec<String> =
                    attempts.iter().map(|a| a.query.clone()).collect();
                attempted_queries.push(query);
                Err(ResolutionError::ResolutionFailed {
                    title: song.title().to_string(),
                    artist: song.artist().to_string(),
                    attempted_queries,
                    source,
                })
            }
        }
    }
}
