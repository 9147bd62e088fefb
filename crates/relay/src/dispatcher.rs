//! The per-request state machine: recognise, resolve, download, split,
//! deliver, summarise.

use std::{fmt, path::PathBuf, sync::Arc};

use {
    drivelink_channels::{ChannelOutbound, ChannelReplyTarget, InboundMessage},
    drivelink_config::RelayConfig,
    drivelink_delivery::{
        Deliverable, DeliveryPlan, DeliveryPolicy, DeliveryReport, DeliveryScheduler, split_file,
    },
    drivelink_drive::{ResourceMetadata, ResourceStore, download, extract_id},
    tracing::{Instrument, debug, info, info_span, warn},
    uuid::Uuid,
};

use crate::{RelayError, command::parse_command, messages, workspace::RequestWorkspace};

/// Settings the dispatcher runs with, resolved from [`RelayConfig`].
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub trigger: String,
    pub download_dir: PathBuf,
    pub policy: DeliveryPolicy,
    pub isolate_requests: bool,
    pub cleanup_after_delivery: bool,
    pub document_mime: String,
}

impl RelaySettings {
    #[must_use]
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            trigger: config.trigger.clone(),
            download_dir: config.download_dir.clone(),
            policy: DeliveryPolicy::from_config(config),
            isolate_requests: config.isolate_requests,
            cleanup_after_delivery: config.cleanup_after_delivery,
            document_mime: config.document_mime.clone(),
        }
    }
}

/// Where a request is in its lifecycle. Stages only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Recognized,
    Extracting,
    MetadataFetched,
    ThresholdChecked,
    Downloading,
    Splitting,
    Delivering,
    Completed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Recognized => "recognized",
            Self::Extracting => "extracting",
            Self::MetadataFetched => "metadata_fetched",
            Self::ThresholdChecked => "threshold_checked",
            Self::Downloading => "downloading",
            Self::Splitting => "splitting",
            Self::Delivering => "delivering",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// How a handled message ended.
#[derive(Debug)]
pub enum RequestOutcome {
    /// Not a command for us.
    Ignored,
    /// Stopped at `stage`; the sender got one failure reply.
    Aborted { stage: Stage, error: RelayError },
    /// Delivery ran; the report says which documents arrived.
    Completed { report: DeliveryReport },
}

/// One recognised command being processed.
struct Request {
    id: Uuid,
    target: ChannelReplyTarget,
    link: Option<String>,
    stage: Stage,
}

impl Request {
    fn advance(&mut self, next: Stage) {
        debug!(from = %self.stage, to = %next, "stage transition");
        self.stage = next;
    }
}

/// Turns trigger commands into delivered documents.
///
/// Requests are independent: each gets its own working directory and runs
/// to completion without touching any other request's state, so the host
/// may drive several concurrently.
pub struct Dispatcher {
    store: Arc<dyn ResourceStore>,
    outbound: Arc<dyn ChannelOutbound>,
    scheduler: DeliveryScheduler,
    settings: RelaySettings,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn ResourceStore>,
        outbound: Arc<dyn ChannelOutbound>,
        settings: RelaySettings,
    ) -> Self {
        let scheduler = DeliveryScheduler::new(Arc::clone(&outbound), &settings.policy);
        Self {
            store,
            outbound,
            scheduler,
            settings,
        }
    }

    /// Handle one inbound message.
    ///
    /// Messages from the bot itself, without text, or not starting with the
    /// trigger are ignored. Any failure ends the request with exactly one
    /// reply to the sender and is returned, never propagated.
    pub async fn handle(&self, message: &InboundMessage) -> RequestOutcome {
        if message.from_me {
            return RequestOutcome::Ignored;
        }
        let Some(text) = message.text.as_deref() else {
            return RequestOutcome::Ignored;
        };
        let Some(command) = parse_command(text, &self.settings.trigger) else {
            return RequestOutcome::Ignored;
        };

        let mut request = Request {
            id: Uuid::new_v4(),
            target: message.reply_target(),
            link: command.link.map(str::to_owned),
            stage: Stage::Recognized,
        };
        let span = info_span!(
            "relay_request",
            request_id = %request.id,
            account_id = %request.target.account_id,
            chat_id = %request.target.chat_id,
        );
        self.process(&mut request).instrument(span).await
    }

    async fn process(&self, request: &mut Request) -> RequestOutcome {
        info!(sender = %request.target.chat_id, "command recognized");
        match self.run(request).await {
            Ok(report) => RequestOutcome::Completed { report },
            Err(error) => {
                warn!(stage = %request.stage, error = %error, "request aborted");
                let reply = messages::failure(&error, &self.settings.trigger);
                self.reply(&request.target, &reply).await;
                RequestOutcome::Aborted {
                    stage: request.stage,
                    error,
                }
            },
        }
    }

    async fn run(&self, request: &mut Request) -> Result<DeliveryReport, RelayError> {
        request.advance(Stage::Extracting);
        let Some(id) = request.link.as_deref().and_then(extract_id) else {
            return Err(RelayError::InvalidIdentifier {
                link: request.link.clone(),
            });
        };

        let metadata = self
            .store
            .fetch_metadata(&id)
            .await
            .map_err(RelayError::from_lookup)?;
        request.advance(Stage::MetadataFetched);

        let policy = &self.settings.policy;
        let plan = policy.plan(metadata.size_bytes);
        request.advance(Stage::ThresholdChecked);
        match plan {
            DeliveryPlan::Reject => {
                return Err(RelayError::ThresholdRejection {
                    size_bytes: metadata.size_bytes,
                    limit_bytes: policy.size_limit_bytes,
                });
            },
            DeliveryPlan::Split { parts } => {
                let notice = messages::splitting(
                    &metadata.name,
                    metadata.size_bytes,
                    policy.size_limit_bytes,
                    parts,
                );
                self.reply(&request.target, &notice).await;
            },
            DeliveryPlan::Single => {},
        }

        request.advance(Stage::Downloading);
        self.reply(
            &request.target,
            &messages::downloading(&metadata.name, metadata.size_bytes),
        )
        .await;
        let workspace = RequestWorkspace::create(
            &self.settings.download_dir,
            request.id,
            self.settings.isolate_requests,
        )
        .await
        .map_err(|e| RelayError::io("creating working directory", e))?;
        let artifact = workspace.artifact_path(&metadata.name);
        let written = download(self.store.as_ref(), &id, &artifact)
            .await
            .map_err(RelayError::from_download)?;
        if written != metadata.size_bytes {
            warn!(
                declared = metadata.size_bytes,
                actual = written,
                "downloaded size differs from declared size"
            );
        }

        let mut files = vec![artifact.clone()];
        let deliverable = self.prepare(request, plan, &metadata, artifact).await?;
        let file_name = match &deliverable {
            Deliverable::Single { file_name, .. } => file_name.clone(),
            Deliverable::Parts { name, chunks, .. } => {
                files.extend(chunks.iter().map(|c| c.path.clone()));
                name.clone()
            },
        };

        request.advance(Stage::Delivering);
        let report = self
            .scheduler
            .deliver(&request.target, deliverable.into_documents())
            .await;

        request.advance(Stage::Completed);
        self.reply(&request.target, &messages::completed(&file_name, &report))
            .await;
        info!(
            sent = report.sent_count(),
            total = report.total(),
            "request completed"
        );

        if self.settings.cleanup_after_delivery
            && let Err(e) = workspace.cleanup(&files).await
        {
            warn!(path = %workspace.dir().display(), error = %e, "failed to clean up workspace");
        }
        Ok(report)
    }

    /// Turn the downloaded artifact into what gets delivered, splitting it
    /// when the plan calls for it.
    async fn prepare(
        &self,
        request: &mut Request,
        plan: DeliveryPlan,
        metadata: &ResourceMetadata,
        artifact: PathBuf,
    ) -> Result<Deliverable, RelayError> {
        let file_name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| metadata.name.clone());

        if !matches!(plan, DeliveryPlan::Split { .. }) {
            return Ok(Deliverable::Single {
                path: artifact,
                file_name,
                mime_type: metadata
                    .mime_type
                    .clone()
                    .unwrap_or_else(|| self.settings.document_mime.clone()),
            });
        }

        request.advance(Stage::Splitting);
        let chunks = split_file(&artifact, self.settings.policy.part_size_bytes)
            .await
            .map_err(|e| RelayError::io("splitting download", e))?;
        if chunks.is_empty() {
            return Err(RelayError::io(
                "splitting download",
                std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "downloaded file is empty"),
            ));
        }
        Ok(Deliverable::Parts {
            name: file_name,
            chunks,
            mime_type: self.settings.document_mime.clone(),
        })
    }

    /// Status replies are best effort; a failed one is logged and the
    /// request carries on.
    async fn reply(&self, target: &ChannelReplyTarget, text: &str) {
        if let Err(e) = self
            .outbound
            .send_text(&target.account_id, &target.chat_id, text)
            .await
        {
            warn!(chat_id = %target.chat_id, error = %e, "failed to send reply");
        }
    }
}
