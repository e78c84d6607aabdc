//! The output service loop.

use crate::error::TxError;
use crate::platform::{EnvId, Scheduler};

use super::fragment::fragments;
use super::request::{Rejection, RequestSource};
use super::FrameSink;

// ═══════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════

/// What to do while the TX ring stays full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// Yield and retry the same chunk forever. A device that never drains
    /// hangs the service.
    #[default]
    Unbounded,
    /// Give up on the request after `max_yields` consecutive yields on one
    /// chunk.
    Bounded { max_yields: u32 },
}

/// Output service configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    /// The only environment allowed to submit packets.
    pub server: EnvId,
    pub retry: RetryPolicy,
}

impl OutputConfig {
    pub const fn new(server: EnvId) -> Self {
        Self {
            server,
            retry: RetryPolicy::Unbounded,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// OUTCOMES
// ═══════════════════════════════════════════════════════════════════════════

/// Result of serving one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    /// Every chunk was offered to the ring.
    Sent {
        /// Chunks the ring accepted.
        fragments: usize,
        /// Chunks refused with a non-retryable error.
        failed: usize,
        /// Yields spent waiting for ring space.
        yields: usize,
    },
    /// The retry bound was hit; later chunks were not sent.
    Abandoned { sent: usize, remaining: usize },
    /// The request was refused before any send.
    Rejected(Rejection),
    /// The message receive itself failed.
    ReceiveFailed,
}

/// Running counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputStats {
    pub requests: u64,
    pub fragments_sent: u64,
    pub send_errors: u64,
    pub yields: u64,
    pub rejected: u64,
    pub receive_failures: u64,
    pub abandoned: u64,
}

// ═══════════════════════════════════════════════════════════════════════════
// SERVER
// ═══════════════════════════════════════════════════════════════════════════

/// Output service.
pub struct OutputServer<R, S, Y> {
    source: R,
    sink: S,
    scheduler: Y,
    config: OutputConfig,
    stats: OutputStats,
}

impl<R, S, Y> OutputServer<R, S, Y>
where
    R: RequestSource,
    S: FrameSink,
    Y: Scheduler,
{
    pub fn new(source: R, sink: S, scheduler: Y, config: OutputConfig) -> Self {
        Self {
            source,
            sink,
            scheduler,
            config,
            stats: OutputStats::default(),
        }
    }

    /// Serve requests forever. Bad requests are logged and skipped.
    pub fn run(&mut self) -> ! {
        log::info!(target: "e1000::output", "serving packets from {}", self.config.server);
        loop {
            self.serve_one();
        }
    }

    /// Receive and handle exactly one request.
    pub fn serve_one(&mut self) -> ServeOutcome {
        let request = match self.source.receive_request() {
            Ok(request) => request,
            Err(err) => {
                log::warn!(target: "e1000::output", "receive failed: {}", err);
                self.stats.receive_failures += 1;
                return ServeOutcome::ReceiveFailed;
            }
        };
        self.stats.requests += 1;

        let payload = match request.validate(self.config.server) {
            Ok(payload) => payload,
            Err(rejection) => {
                log::warn!(target: "e1000::output", "{}", rejection);
                self.stats.rejected += 1;
                return ServeOutcome::Rejected(rejection);
            }
        };

        let mut sent = 0;
        let mut failed = 0;
        let mut total_yields = 0;
        let total = super::fragment_count(payload.len());

        for chunk in fragments(payload) {
            let mut yields = 0u32;
            loop {
                match self.sink.send_frame(chunk) {
                    Ok(_) => {
                        sent += 1;
                        self.stats.fragments_sent += 1;
                        break;
                    }
                    Err(TxError::RingFull) => {
                        if let RetryPolicy::Bounded { max_yields } = self.config.retry {
                            if yields >= max_yields {
                                let remaining = total - sent - failed;
                                log::error!(
                                    target: "e1000::output",
                                    "ring stayed full for {} yields, dropping {} of {} chunks",
                                    yields,
                                    remaining,
                                    total
                                );
                                self.stats.abandoned += 1;
                                return ServeOutcome::Abandoned { sent, remaining };
                            }
                        }
                        yields += 1;
                        total_yields += 1;
                        self.stats.yields += 1;
                        self.scheduler.yield_processor();
                    }
                    Err(err) => {
                        log::warn!(target: "e1000::output", "chunk of {} bytes not sent: {}", chunk.len(), err);
                        failed += 1;
                        self.stats.send_errors += 1;
                        break;
                    }
                }
            }
        }

        log::trace!(target: "e1000::output", "request done: {} sent, {} failed", sent, failed);
        ServeOutcome::Sent {
            fragments: sent,
            failed,
            yields: total_yields,
        }
    }

    pub fn stats(&self) -> &OutputStats {
        &self.stats
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn scheduler(&self) -> &Y {
        &self.scheduler
    }
}
