use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::analysis::distance::histogram_distance;
use crate::analysis::extract::extract_features;
use crate::analysis::filter::{skip_reason, SkipReason};
use crate::analysis::rank::{rank_candidates, render_candidates, RankedCandidate};
use crate::model::{FeatureSet, Tag};
use crate::services::host::{AnalysisContext, CancellationToken, HostBinary};
use crate::store::{BintagConfig, OverwritePrompt, StoreResult, TagStore, WriteOutcome};

/// Result of a capture attempt.
pub type CaptureOutcome = WriteOutcome;

/// A tag ruled out by the compatibility filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedTag {
    pub tag: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Outcome of one ranking run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingReport {
    /// Candidates below the display threshold, nearest first.
    pub candidates: Vec<RankedCandidate>,
    /// Number of tags whose distance was computed.
    pub evaluated: usize,
    pub skipped: Vec<SkippedTag>,
    /// Set when the run stopped early on cancellation.
    pub cancelled: bool,
    pub current_imports: Vec<String>,
}

impl RankingReport {
    /// Text view of the ranked candidates.
    pub fn render_lines(&self) -> Vec<String> {
        render_candidates(&self.candidates, &self.current_imports)
    }

    /// Best candidate, if any survived the threshold.
    pub fn top(&self) -> Option<&RankedCandidate> {
        self.candidates.first()
    }
}

/// Events raised by the host frontend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    NewBinaryLoaded,
    ManualRun,
    CaptureTag { name: String, description: String },
}

/// What a dispatched event produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Ranked(RankingReport),
    Captured(bool),
}

/// Rank `tags` against the `current` features.
///
/// Cancellation is polled once per tag; tags left over when it fires are
/// not evaluated. The report is marked as cancelled whenever the token is
/// set by the end of the run.
pub fn rank_features(
    current: &FeatureSet,
    tags: Vec<Tag>,
    config: &BintagConfig,
    cancel: &CancellationToken,
) -> RankingReport {
    let policy = config.compatibility_policy();
    let total = tags.len();
    let mut report = RankingReport {
        current_imports: current.imports.clone(),
        ..RankingReport::default()
    };
    let mut scored = Vec::new();

    for (idx, tag) in tags.into_iter().enumerate() {
        if cancel.is_cancelled() {
            info!("ranking cancelled with {} of {total} tags left", total - idx);
            report.cancelled = true;
            break;
        }
        if let Some(reason) = skip_reason(&current.histogram, current.arch, &tag, &policy) {
            info!("skipping tag {}: {reason}", tag.name);
            report.skipped.push(SkippedTag { tag: tag.name, reason });
            continue;
        }
        let distance = histogram_distance(&current.histogram, &tag.histogram);
        debug!("tag {} at distance {distance:.4}", tag.name);
        scored.push(RankedCandidate {
            tag: tag.name,
            distance,
            description: tag.description,
            imports: tag.imports,
        });
    }

    if cancel.is_cancelled() {
        report.cancelled = true;
    }
    report.evaluated = scored.len();
    report.candidates = rank_candidates(scored, config.display_threshold);
    report
}

enum FeatureSource<'a> {
    Host(&'a dyn HostBinary),
    Features(FeatureSet),
}

/// One analysis session: the current binary (or its exported features), the
/// tag store and the matching configuration.
pub struct TagSession<'a> {
    source: FeatureSource<'a>,
    store: TagStore,
    config: BintagConfig,
    cancel: CancellationToken,
    source_sha256: Option<String>,
}

impl<'a> TagSession<'a> {
    /// Session over a live host binary.
    pub fn with_host(host: &'a dyn HostBinary, store: TagStore, config: BintagConfig) -> Self {
        Self::build(FeatureSource::Host(host), store, config)
    }

    /// Session over already extracted features.
    pub fn with_features(features: FeatureSet, store: TagStore, config: BintagConfig) -> Self {
        Self::build(FeatureSource::Features(features), store, config)
    }

    fn build(source: FeatureSource<'a>, store: TagStore, config: BintagConfig) -> Self {
        Self { source, store, config, cancel: CancellationToken::new(), source_sha256: None }
    }

    /// Use `cancel` instead of the session's own token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Record the hash of the binary behind this session in captured tags.
    pub fn with_source_sha256(mut self, sha256: Option<String>) -> Self {
        self.source_sha256 = sha256;
        self
    }

    /// Handle that cancels in-flight extraction and ranking.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn store(&self) -> &TagStore {
        &self.store
    }

    pub fn config(&self) -> &BintagConfig {
        &self.config
    }

    /// Features of the current binary, extracted fresh for host sessions.
    pub fn current_features(&self) -> FeatureSet {
        match &self.source {
            FeatureSource::Host(host) => {
                let ctx = AnalysisContext::new(*host, &self.cancel);
                extract_features(&ctx)
            }
            FeatureSource::Features(features) => features.clone(),
        }
    }

    /// Load the store, extract the current features and rank every tag.
    pub fn run_ranking(&self) -> RankingReport {
        let tags = self.store.load_tags();
        let current = self.current_features();
        let report = rank_features(&current, tags, &self.config, &self.cancel);
        info!(
            "{} candidates shown, {} evaluated, {} skipped",
            report.candidates.len(),
            report.evaluated,
            report.skipped.len()
        );
        report
    }

    /// Capture the current binary as tag `name`.
    pub fn try_capture_tag(
        &self,
        name: &str,
        description: &str,
        prompt: &mut dyn OverwritePrompt,
    ) -> StoreResult<CaptureOutcome> {
        self.store.tag_path(name)?;
        let features = self.current_features();
        if features.histogram.is_empty() {
            warn!("capturing tag {name} with an empty histogram; it will never be ranked");
        }
        let tag = Tag::from_features(name, description, features)
            .with_captured_at(Some(chrono::Utc::now().to_rfc3339()))
            .with_sha256(self.source_sha256.clone());
        self.store.write_tag(&tag, prompt)
    }

    /// Capture the current binary as tag `name`; false on decline or failure.
    pub fn capture_tag(
        &self,
        name: &str,
        description: &str,
        prompt: &mut dyn OverwritePrompt,
    ) -> bool {
        match self.try_capture_tag(name, description, prompt) {
            Ok(CaptureOutcome::Written) | Ok(CaptureOutcome::Overwritten) => true,
            Ok(CaptureOutcome::Declined) => {
                info!("capture of tag {name} declined");
                false
            }
            Err(err) => {
                error!("could not capture tag {name}: {err}");
                false
            }
        }
    }

    /// Route a host event to a ranking run or a capture.
    ///
    /// Each event starts a fresh invocation: a cancellation left over from an
    /// earlier one is cleared first.
    pub fn dispatch(&self, event: HostEvent, prompt: &mut dyn OverwritePrompt) -> SessionOutcome {
        if self.cancel.is_cancelled() {
            debug!("clearing cancellation from a previous invocation");
            self.cancel.reset();
        }
        match event {
            HostEvent::NewBinaryLoaded | HostEvent::ManualRun => {
                SessionOutcome::Ranked(self.run_ranking())
            }
            HostEvent::CaptureTag { name, description } => {
                SessionOutcome::Captured(self.capture_tag(&name, &description, prompt))
            }
        }
    }
}
