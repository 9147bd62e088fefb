//! Size-threshold planning and ordered, paced delivery of documents.

use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    drivelink_channels::{ChannelOutbound, ChannelReplyTarget},
    drivelink_common::DocumentPayload,
    drivelink_config::{FailurePolicy, OversizePolicy, RelayConfig},
    serde::Serialize,
    tracing::{debug, info, warn},
};

use crate::split::ChunkSet;

/// Thresholds and pacing that govern one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryPolicy {
    /// Largest size sent as a single document.
    pub size_limit_bytes: u64,
    /// Largest part produced when splitting.
    pub part_size_bytes: u64,
    pub oversize: OversizePolicy,
    pub pacing: Duration,
    pub on_failure: FailurePolicy,
}

impl DeliveryPolicy {
    #[must_use]
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            size_limit_bytes: config.size_limit_bytes(),
            part_size_bytes: config.part_size_bytes(),
            oversize: config.oversize_policy,
            pacing: config.pacing(),
            on_failure: config.on_part_failure,
        }
    }

    /// Decide how a resource of `declared_size` bytes is delivered.
    ///
    /// Only sizes strictly above the limit count as oversize.
    #[must_use]
    pub fn plan(&self, declared_size: u64) -> DeliveryPlan {
        if declared_size <= self.size_limit_bytes {
            return DeliveryPlan::Single;
        }
        match self.oversize {
            OversizePolicy::Reject => DeliveryPlan::Reject,
            OversizePolicy::Split => DeliveryPlan::Split {
                parts: declared_size.div_ceil(self.part_size_bytes.max(1)),
            },
        }
    }
}

/// Outcome of the size-threshold check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPlan {
    /// Send the whole artifact as one document.
    Single,
    /// Split first; `parts` is derived from the declared size.
    Split { parts: u64 },
    /// Refuse without transferring any bytes.
    Reject,
}

/// What gets handed to the scheduler after download.
#[derive(Debug, Clone)]
pub enum Deliverable {
    Single {
        path: PathBuf,
        file_name: String,
        mime_type: String,
    },
    Parts {
        /// Name of the reassembled file.
        name: String,
        chunks: ChunkSet,
        mime_type: String,
    },
}

impl Deliverable {
    /// Documents to send, in delivery order.
    #[must_use]
    pub fn into_documents(self) -> Vec<DocumentPayload> {
        match self {
            Self::Single {
                path,
                file_name,
                mime_type,
            } => vec![DocumentPayload::new(path, file_name, mime_type)],
            Self::Parts {
                name,
                chunks,
                mime_type,
            } => {
                let total = chunks.len();
                chunks
                    .into_iter()
                    .map(|chunk| {
                        let file_name = chunk.file_name();
                        DocumentPayload::new(chunk.path, file_name, mime_type.as_str())
                            .with_caption(format!("Part {}/{total} of {name}", chunk.index))
                    })
                    .collect()
            },
        }
    }
}

/// Result of sending one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    /// 1-based position in the delivery order.
    pub index: usize,
    pub file_name: String,
    pub sent: bool,
    pub error: Option<String>,
}

/// Per-document outcomes of one delivery, in index order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeliveryReport {
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DeliveryReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.sent).count()
    }

    #[must_use]
    pub fn all_sent(&self) -> bool {
        self.outcomes.iter().all(|o| o.sent)
    }

    /// Indices of documents that were not delivered.
    #[must_use]
    pub fn failed_indices(&self) -> Vec<usize> {
        self.outcomes
            .iter()
            .filter(|o| !o.sent)
            .map(|o| o.index)
            .collect()
    }
}

/// Sends documents one at a time, pausing before every send after the first.
pub struct DeliveryScheduler {
    outbound: Arc<dyn ChannelOutbound>,
    pacing: Duration,
    on_failure: FailurePolicy,
}

impl DeliveryScheduler {
    pub fn new(outbound: Arc<dyn ChannelOutbound>, policy: &DeliveryPolicy) -> Self {
        Self {
            outbound,
            pacing: policy.pacing,
            on_failure: policy.on_failure,
        }
    }

    /// Send `documents` to `target` strictly in order.
    ///
    /// Failed sends are not retried, but are followed by the same pause as
    /// a successful one. With [`FailurePolicy::Abort`] the documents after
    /// the first failure are recorded as not sent without being attempted.
    pub async fn deliver(
        &self,
        target: &ChannelReplyTarget,
        documents: Vec<DocumentPayload>,
    ) -> DeliveryReport {
        let total = documents.len();
        let mut report = DeliveryReport::default();
        let mut halted_at: Option<usize> = None;

        for (i, document) in documents.into_iter().enumerate() {
            let index = i + 1;
            if let Some(failed) = halted_at {
                report.outcomes.push(DeliveryOutcome {
                    index,
                    file_name: document.file_name,
                    sent: false,
                    error: Some(format!("not attempted after part {failed} failed")),
                });
                continue;
            }

            debug!(
                chat_id = %target.chat_id,
                part = index,
                parts = total,
                file = %document.file_name,
                "sending document"
            );
            let result = self
                .outbound
                .send_document(&target.account_id, &target.chat_id, &document)
                .await;

            match result {
                Ok(()) => {
                    report.outcomes.push(DeliveryOutcome {
                        index,
                        file_name: document.file_name,
                        sent: true,
                        error: None,
                    });
                },
                Err(e) => {
                    warn!(
                        chat_id = %target.chat_id,
                        part = index,
                        parts = total,
                        error = %e,
                        "document send failed"
                    );
                    report.outcomes.push(DeliveryOutcome {
                        index,
                        file_name: document.file_name,
                        sent: false,
                        error: Some(e.to_string()),
                    });
                    if self.on_failure == FailurePolicy::Abort {
                        halted_at = Some(index);
                    }
                },
            }

            if index < total && halted_at.is_none() && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
        }

        info!(
            chat_id = %target.chat_id,
            sent = report.sent_count(),
            parts = total,
            "delivery finished"
        );
        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        async_trait::async_trait,
        drivelink_channels::Error as ChannelError,
        std::sync::Mutex,
        tokio::time::Instant,
    };

    /// Records each document send with the (paused-clock) time it happened.
    #[derive(Default)]
    struct RecordingOutbound {
        sends: Mutex<Vec<(String, Instant)>>,
        fail_on: Vec<String>,
    }

    impl RecordingOutbound {
        fn failing_on(names: &[&str]) -> Self {
            Self {
                fail_on: names.iter().map(|n| n.to_string()).collect(),
                ..Default::default()
            }
        }

        fn sent_names(&self) -> Vec<String> {
            self.sends
                .lock()
                .unwrap()
                .iter()
                .map(|(n, _)| n.clone())
                .collect()
        }

        fn gaps(&self) -> Vec<Duration> {
            let sends = self.sends.lock().unwrap();
            sends.windows(2).map(|w| w[1].1 - w[0].1).collect()
        }
    }

    #[async_trait]
    impl ChannelOutbound for RecordingOutbound {
        async fn send_text(&self, _: &str, _: &str, _: &str) -> drivelink_channels::Result<()> {
            Ok(())
        }

        async fn send_document(
            &self,
            _: &str,
            _: &str,
            document: &DocumentPayload,
        ) -> drivelink_channels::Result<()> {
            self.sends
                .lock()
                .unwrap()
                .push((document.file_name.clone(), Instant::now()));
            if self.fail_on.contains(&document.file_name) {
                return Err(ChannelError::send_rejected("media upload failed"));
            }
            Ok(())
        }
    }

    fn policy(on_failure: FailurePolicy) -> DeliveryPolicy {
        DeliveryPolicy {
            size_limit_bytes: 95,
            part_size_bytes: 95,
            oversize: OversizePolicy::Split,
            pacing: Duration::from_millis(3000),
            on_failure,
        }
    }

    fn target() -> ChannelReplyTarget {
        ChannelReplyTarget {
            channel_type: "whatsapp-web".into(),
            account_id: "main".into(),
            chat_id: "4915112345678@s.whatsapp.net".into(),
        }
    }

    fn docs(n: usize) -> Vec<DocumentPayload> {
        (1..=n)
            .map(|i| {
                DocumentPayload::new(
                    format!("/tmp/movie.mkv.part{i}"),
                    format!("movie.mkv.part{i}"),
                    "application/octet-stream",
                )
            })
            .collect()
    }

    #[test]
    fn plan_thresholds() {
        let p = policy(FailurePolicy::Continue);
        assert_eq!(p.plan(0), DeliveryPlan::Single);
        assert_eq!(p.plan(95), DeliveryPlan::Single);
        assert_eq!(p.plan(96), DeliveryPlan::Split { parts: 2 });
        assert_eq!(p.plan(300), DeliveryPlan::Split { parts: 4 });
        assert_eq!(p.plan(285), DeliveryPlan::Split { parts: 3 });

        let reject = DeliveryPolicy {
            oversize: OversizePolicy::Reject,
            ..p
        };
        assert_eq!(reject.plan(95), DeliveryPlan::Single);
        assert_eq!(reject.plan(96), DeliveryPlan::Reject);
    }

    #[test]
    fn plan_uses_part_size_for_count() {
        let p = DeliveryPolicy {
            part_size_bytes: 50,
            ..policy(FailurePolicy::Continue)
        };
        assert_eq!(p.plan(300), DeliveryPlan::Split { parts: 6 });
    }

    #[test]
    fn policy_from_config_converts_units() {
        let p = DeliveryPolicy::from_config(&RelayConfig::default());
        assert_eq!(p.size_limit_bytes, 95 * 1024 * 1024);
        assert_eq!(p.pacing, Duration::from_secs(3));
        assert_eq!(p.plan(300_000_000), DeliveryPlan::Split { parts: 4 });
    }

    #[tokio::test(start_paused = true)]
    async fn sends_in_order_with_pacing_between() {
        let outbound = Arc::new(RecordingOutbound::default());
        let scheduler = DeliveryScheduler::new(outbound.clone(), &policy(FailurePolicy::Continue));

        let report = scheduler.deliver(&target(), docs(4)).await;

        assert!(report.all_sent());
        assert_eq!(report.total(), 4);
        assert_eq!(
            outbound.sent_names(),
            vec![
                "movie.mkv.part1",
                "movie.mkv.part2",
                "movie.mkv.part3",
                "movie.mkv.part4"
            ]
        );
        assert!(
            outbound
                .gaps()
                .iter()
                .all(|gap| *gap >= Duration::from_millis(3000))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn no_trailing_pause_after_last_send() {
        let outbound = Arc::new(RecordingOutbound::default());
        let scheduler = DeliveryScheduler::new(outbound.clone(), &policy(FailurePolicy::Continue));

        let start = Instant::now();
        scheduler.deliver(&target(), docs(1)).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn continue_policy_attempts_every_part() {
        let outbound = Arc::new(RecordingOutbound::failing_on(&["movie.mkv.part2"]));
        let scheduler = DeliveryScheduler::new(outbound.clone(), &policy(FailurePolicy::Continue));

        let report = scheduler.deliver(&target(), docs(3)).await;

        assert_eq!(outbound.sent_names().len(), 3);
        assert_eq!(report.sent_count(), 2);
        assert_eq!(report.failed_indices(), vec![2]);
        assert!(
            report.outcomes[1]
                .error
                .as_deref()
                .unwrap()
                .contains("media upload failed")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_send_is_paced_like_a_successful_one() {
        let outbound = Arc::new(RecordingOutbound::failing_on(&["movie.mkv.part2"]));
        let scheduler = DeliveryScheduler::new(outbound.clone(), &policy(FailurePolicy::Continue));

        scheduler.deliver(&target(), docs(3)).await;

        assert_eq!(outbound.gaps(), vec![
            Duration::from_millis(3000),
            Duration::from_millis(3000)
        ]);
    }

    #[tokio::test(start_paused = true)]
    async fn abort_policy_skips_remaining_parts() {
        let outbound = Arc::new(RecordingOutbound::failing_on(&["movie.mkv.part2"]));
        let scheduler = DeliveryScheduler::new(outbound.clone(), &policy(FailurePolicy::Abort));

        let report = scheduler.deliver(&target(), docs(4)).await;

        assert_eq!(outbound.sent_names(), vec!["movie.mkv.part1", "movie.mkv.part2"]);
        assert_eq!(report.total(), 4);
        assert_eq!(report.failed_indices(), vec![2, 3, 4]);
        assert_eq!(
            report.outcomes[3].error.as_deref(),
            Some("not attempted after part 2 failed")
        );
    }

    #[test]
    fn parts_become_captioned_documents() {
        let chunks = ChunkSet::default();
        let docs = Deliverable::Parts {
            name: "movie.mkv".into(),
            chunks,
            mime_type: "application/octet-stream".into(),
        }
        .into_documents();
        assert!(docs.is_empty());

        let single = Deliverable::Single {
            path: "/tmp/report.pdf".into(),
            file_name: "report.pdf".into(),
            mime_type: "application/pdf".into(),
        }
        .into_documents();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].file_name, "report.pdf");
        assert!(single[0].caption.is_none());
    }
}
