// SPDX-License-Identifier: GPL-3.0-or-later

//! Sequential batch resolution of song lists.

use crate::gateway::{CatalogSearchGateway, GatewayError};
use crate::resolver::TrackResolver;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use tracklist_domain::{BatchReport, Candidate, ResolutionResult, SongRequest};
use tracklist_spotify::RateLimiter;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchError {
    #[error("no songs to resolve")]
    EmptyInput,
}

/// Gateway wrapper that keeps at least `pacing` between the end of one
/// search and the start of the next.
pub struct PacedGateway<G> {
    inner: G,
    limiter: RateLimiter,
}

impl<G> PacedGateway<G> {
    pub fn new(inner: G, pacing: Duration) -> Self {
        Self {
            inner,
            limiter: RateLimiter::new(pacing),
        }
    }
}

#[async_trait]
impl<G: CatalogSearchGateway> CatalogSearchGateway for PacedGateway<G> {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>, GatewayError> {
        let _permit = self.limiter.acquire().await;
        self.inner.search(query, limit).await
    }
}

/// Resolves song lists one at a time, in input order.
#[derive(Debug, Clone)]
pub struct BatchEngine<G> {
    resolver: TrackResolver<G>,
    default_pacing: Duration,
}

impl<G: CatalogSearchGateway> BatchEngine<G> {
    pub fn new(resolver: TrackResolver<G>, default_pacing: Duration) -> Self {
        Self {
            resolver,
            default_pacing,
        }
    }

    pub fn default_pacing(&self) -> Duration {
        self.default_pacing
    }

    pub fn resolver(&self) -> &TrackResolver<G> {
        &self.resolver
    }

    /// Resolve every song with limit 1 and classify its best candidate.
    ///
    /// A failure on one song becomes `NotFound` with a note; the batch keeps
    /// going. Dropping the returned future abandons the remaining songs.
    pub async fn resolve_batch(
        &self,
        songs: &[SongRequest],
        pacing: Duration,
    ) -> Result<BatchReport, BatchError> {
        if songs.is_empty() {
            return Err(BatchError::EmptyInput);
        }

        let thresholds = self.resolver.scorer().thresholds();
        let paced = self
            .resolver
            .with_gateway(PacedGateway::new(self.resolver.gateway(), pacing));

        info!(
            target: "batch",
            songs = songs.len(),
            pacing_ms = pacing.as_millis() as u64,
            "starting batch resolution"
        );

        let mut results = Vec::with_capacity(songs.len());
        for (index, song) in songs.iter().enumerate() {
            let result = match paced.resolve_traced(song, 1).await {
                Ok(resolution) => ResolutionResult::classify(resolution.into_best(), &thresholds),
                Err(error) => {
                    warn!(target: "batch", index, song = %song, error = %error, "song resolution failed");
                    ResolutionResult::failed(error.to_string())
                }
            };

            debug!(
                target: "batch",
                index,
                title = %song.title(),
                tier = %result.tier(),
                confidence = result.candidate().map(|c| c.confidence),
                "song resolved"
            );
            results.push((song.clone(), result));
        }

        let report = BatchReport::from_results(results);
        info!(
            target: "batch",
            batch_id = %report.id,
            total = report.summary.total,
            high = report.summary.high_confidence,
            medium = report.summary.medium_confidence,
            low = report.summary.low_confidence,
            not_found = report.summary.not_found,
            "batch resolution complete"
        );
        Ok(report)
    }
}
