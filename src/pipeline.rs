//! Stage dispatcher (§4.1, §5): the single place that matches a candidate's
//! current `DriftState` to the handler responsible for computing the next
//! edge, feeds the outcome through `state_machine::resolve`, and persists
//! the result. Handlers are plain functions; this module owns only the
//! wiring between them, the repositories, and the outbound adapters.

use crate::adapters::{CreatePatchPrParams, DocumentAdapter, GitBackedAdapter};
use crate::claims::DocContext;
use crate::comparison;
use crate::config;
use crate::db::{
    AuditTrailRepository, DriftCandidateRepository, EvidenceBundleRepository,
    PatchProposalRepository, PolicyPackRepository, SignalEventRepository,
    SuppressionRuleRepository, WorkspaceRepository,
};
use crate::domain::drift_candidate::{ClassificationMethod, DriftCandidate, DriftState, DriftType};
use crate::domain::evidence_bundle::{EvidenceBundle, ImpactAssessment, CURRENT_EVIDENCE_SCHEMA_VERSION};
use crate::domain::patch_proposal::{PatchProposal, PatchStatus, PatchStyle};
use crate::domain::signal_event::{ExtractedPayload, SignalEvent};
use crate::domain::suppression_rule::{FingerprintLevel, SuppressionRule};
use crate::domain::{AuditTrailRow, PolicyPackStatus, Workspace};
use crate::error::{AdapterError, DriftError, LlmError};
use crate::evidence;
use crate::fingerprint;
use crate::llm::LlmClient;
use crate::notify::NotificationSink;
use crate::observability;
use crate::patch;
use crate::patch::planner::TargetSystem;
use crate::policy::comparators::{ComparatorRegistry, ComparisonContext};
use crate::policy::pack::{self as policy_pack, DecisionOnFail};
use crate::policy::{composition, evaluator};
use crate::routing;
use crate::signals;
use crate::state_machine::{self, StageResult};
use crate::writeback::{self, PatchRegenerator};
use std::collections::HashMap;

/// Bundles every repository and outbound adapter a stage handler might need.
/// Adapters are `Option` because a deployment may run the core pipeline with
/// only some of them wired (e.g. no LLM configured yet, evaluating packs
/// dry-run) — the handlers that need one surface a transient `AdapterError`
/// rather than panicking when it is missing.
pub struct PipelineContext<'a> {
    pub workspaces: &'a dyn WorkspaceRepository,
    pub signals: &'a dyn SignalEventRepository,
    pub candidates: &'a dyn DriftCandidateRepository,
    pub evidence_bundles: &'a dyn EvidenceBundleRepository,
    pub patch_proposals: &'a dyn PatchProposalRepository,
    pub policy_packs: &'a dyn PolicyPackRepository,
    pub audit_trail: &'a dyn AuditTrailRepository,
    pub suppression_rules: &'a dyn SuppressionRuleRepository,
    pub document_adapter: Option<&'a dyn DocumentAdapter>,
    pub git_adapter: Option<&'a dyn GitBackedAdapter>,
    pub llm_client: Option<&'a dyn LlmClient>,
    pub notifier: Option<&'a dyn NotificationSink>,
}

fn transient(msg: impl Into<String>) -> DriftError {
    DriftError::Adapter(AdapterError::Network(msg.into()))
}

fn not_applicable(msg: impl Into<String>) -> DriftError {
    DriftError::NotApplicable(msg.into())
}

/// Dispatches `candidate` to the handler for its current state. States with
/// no automatic handler (terminal states, `AwaitingHuman`, `Snoozed`) only
/// ever advance via a human action and are never reached here because
/// `dispatch_in_flight` filters them out before calling this.
async fn run_stage(
    ctx: &PipelineContext<'_>,
    workspace: &Workspace,
    signal: &SignalEvent,
    candidate: &mut DriftCandidate,
) -> StageResult {
    match candidate.state {
        DriftState::Ingested => handle_ingested(signal),
        DriftState::Normalized => handle_normalized(),
        DriftState::EligibilityChecked => handle_eligibility_checked(workspace, signal),
        DriftState::EvidenceBuilt => handle_evidence_built(signal, candidate),
        DriftState::DocsResolved => handle_docs_resolved(ctx, candidate, signal).await,
        DriftState::Compared => handle_compared(candidate),
        DriftState::Classified => handle_classified(ctx, workspace, signal, candidate).await,
        DriftState::PolicyEvaluated => handle_policy_evaluated(ctx, candidate).await,
        DriftState::Routed => handle_routed(workspace, candidate),
        DriftState::PatchPlanned => handle_patch_planned(candidate),
        DriftState::PatchProposed => handle_patch_proposed(ctx, candidate).await,
        other => Err(not_applicable(format!(
            "{other} only advances via a human action"
        ))),
    }
}

fn handle_ingested(signal: &SignalEvent) -> StageResult {
    signals::validate_required_fields(&signal.extracted)?;
    Ok(DriftState::Normalized)
}

fn handle_normalized() -> StageResult {
    Ok(DriftState::EligibilityChecked)
}

fn handle_eligibility_checked(workspace: &Workspace, signal: &SignalEvent) -> StageResult {
    if !workspace
        .workflow_preferences
        .enabled_input_sources
        .contains(signal.source_type.as_str())
    {
        return Err(not_applicable(format!(
            "input source {} is disabled for this workspace",
            signal.source_type
        )));
    }
    Ok(DriftState::EvidenceBuilt)
}

/// Heuristic doc-candidate resolution from the signal's repo/service, since
/// no ownership-mapping lookup exists yet (§6.4's `ownershipSourceRanking`
/// describes how to pick among *matched* candidates, not how to find them in
/// the first place — that mapping is deployment configuration out of scope
/// here).
fn resolve_doc_candidates(signal: &SignalEvent) -> Vec<String> {
    if let Some(repo) = &signal.repo {
        return vec![format!("{repo}/README.md")];
    }
    if let Some(service) = &signal.service {
        return vec![format!("runbooks/{service}.md")];
    }
    Vec::new()
}

/// Always succeeds: only records what was found. A genuinely unresolved or
/// ambiguous mapping is surfaced as a failure later, from `handle_docs_resolved`,
/// so it terminates in `FailedNeedsMapping` rather than the generic `Failed`
/// that a failure raised here would produce (`terminal_failure_state` keys on
/// the state the handler ran in, not on what the handler was trying to do).
fn handle_evidence_built(signal: &SignalEvent, candidate: &mut DriftCandidate) -> StageResult {
    let candidates = resolve_doc_candidates(signal);
    let (status, confidence) = match candidates.len() {
        0 => ("unresolved", 0.0),
        1 => ("resolved", 0.9),
        _ => ("ambiguous", 0.5),
    };
    candidate.docs_resolution_status = Some(status.to_string());
    candidate.docs_resolution_confidence = Some(confidence);
    candidate.doc_candidates = if candidates.is_empty() {
        None
    } else {
        Some(candidates)
    };
    Ok(DriftState::DocsResolved)
}

/// Representative free text pulled from the signal, used to bias the
/// comparison engine's keyword-hint confidence adjustment (§4.3).
fn source_text_of(signal: &SignalEvent) -> String {
    match &signal.extracted {
        ExtractedPayload::GithubPr {
            pr_title,
            pr_body,
            diff,
            ..
        } => format!("{pr_title}\n{}\n{diff}", pr_body.as_deref().unwrap_or("")),
        ExtractedPayload::GithubIac { diff, .. } | ExtractedPayload::GithubCodeowners { diff, .. } => {
            diff.clone()
        }
        ExtractedPayload::PagerdutyIncident { timeline, .. } => timeline
            .iter()
            .map(|t| t.description.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
        ExtractedPayload::SlackCluster {
            questions, messages, ..
        } => format!("{}\n{}", questions.join("\n"), messages.join("\n")),
        ExtractedPayload::DatadogAlert { monitor_name, .. }
        | ExtractedPayload::GrafanaAlert { monitor_name, .. } => monitor_name.clone(),
    }
}

fn source_key_of(signal: &SignalEvent) -> &str {
    signal
        .repo
        .as_deref()
        .or(signal.service.as_deref())
        .unwrap_or(&signal.id)
}

async fn handle_docs_resolved(
    ctx: &PipelineContext<'_>,
    candidate: &mut DriftCandidate,
    signal: &SignalEvent,
) -> StageResult {
    let unresolved = candidate.docs_resolution_status.as_deref() == Some("unresolved");
    let doc_ref = candidate
        .doc_candidates
        .as_ref()
        .and_then(|c| c.first())
        .cloned();
    let Some(doc_ref) = doc_ref.filter(|_| !unresolved) else {
        return Err(DriftError::Adapter(AdapterError::NotFound(
            "no documentation mapping found for this signal".to_string(),
        )));
    };

    let adapter = ctx
        .document_adapter
        .ok_or_else(|| transient("no document adapter configured"))?;
    let fetched = adapter.fetch(&doc_ref).await?;

    let source_evidence = evidence::extract_from_signal(signal);
    let target_evidence = evidence::extract_from_text(&fetched.content);
    let source_text = source_text_of(signal);
    let result = comparison::compare(&source_evidence, &target_evidence, &source_text, 0.0);

    let tokens: Vec<String> = source_evidence
        .all_tokens()
        .into_iter()
        .map(str::to_string)
        .collect();
    let drift_type = result.drift_type.unwrap_or(DriftType::Coverage);
    let fingerprints =
        fingerprint::compute_fingerprints(source_key_of(signal), &doc_ref, drift_type, &tokens);

    let assessment = ImpactAssessment {
        impact_score: result.confidence,
        impact_band: ImpactAssessment::band_for_score(result.confidence),
        fired_rules: Vec::new(),
        blast_radius: None,
    };

    let bundle_id = format!("{}-{}", candidate.id, fingerprints.strict);
    let bundle = EvidenceBundle {
        bundle_id: bundle_id.clone(),
        workspace_id: candidate.workspace_id.clone(),
        drift_candidate_id: candidate.id.clone(),
        source_evidence,
        target_evidence,
        assessment,
        fingerprints: fingerprints.clone(),
        schema_version: CURRENT_EVIDENCE_SCHEMA_VERSION,
        created_at: chrono::Utc::now(),
    };
    ctx.evidence_bundles.insert(&bundle).await?;

    candidate.evidence_bundle_id = Some(bundle_id);
    candidate.comparison_result = Some(
        serde_json::to_value(&result).expect("ComparisonResult is plain serializable data"),
    );
    candidate.drift_type = result.drift_type;
    candidate.fingerprint_strict = fingerprints.strict;
    candidate.fingerprint_medium = fingerprints.medium;
    candidate.fingerprint_broad = fingerprints.broad;

    Ok(DriftState::Compared)
}

fn handle_compared(candidate: &mut DriftCandidate) -> StageResult {
    let confidence = candidate
        .comparison_result
        .as_ref()
        .and_then(|v| v.get("confidence"))
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);
    candidate.confidence = Some(confidence);
    candidate.classification_method = Some(ClassificationMethod::Deterministic);
    Ok(DriftState::Classified)
}

fn changed_paths_of(signal: &SignalEvent) -> Vec<String> {
    match &signal.extracted {
        ExtractedPayload::GithubPr { changed_files, .. }
        | ExtractedPayload::GithubIac { changed_files, .. } => {
            changed_files.iter().map(|f| f.path.clone()).collect()
        }
        ExtractedPayload::GithubCodeowners { changed_paths, .. } => changed_paths.clone(),
        _ => Vec::new(),
    }
}

/// Builds the fact catalog the policy comparators read (§4.4). Only
/// `github_pr`/`github_iac`/`github_codeowners` signals populate any facts —
/// comparators that need facts this extraction model has no source for
/// (approval counts, check-run status, OpenAPI/artifact facts) simply
/// self-exclude via `can_compare`, which is an accepted limitation of the
/// current extraction model rather than a bug.
fn build_comparison_context(signal: &SignalEvent) -> ComparisonContext {
    let mut ctx = ComparisonContext::default();
    match &signal.extracted {
        ExtractedPayload::GithubPr {
            diff,
            changed_files,
            pr_body,
            author,
            merged,
            ..
        } => {
            ctx.facts.insert("diff.text".into(), serde_json::json!(diff));
            ctx.facts.insert(
                "diff.filesChanged.paths".into(),
                serde_json::json!(changed_files.iter().map(|f| &f.path).collect::<Vec<_>>()),
            );
            if let Some(body) = pr_body {
                ctx.facts.insert("pr.body".into(), serde_json::json!(body));
            }
            ctx.facts.insert("actor.user".into(), serde_json::json!(author));
            ctx.facts.insert("pr.merged".into(), serde_json::json!(merged));
        }
        ExtractedPayload::GithubIac { diff, changed_files, .. } => {
            ctx.facts.insert("diff.text".into(), serde_json::json!(diff));
            ctx.facts.insert(
                "diff.filesChanged.paths".into(),
                serde_json::json!(changed_files.iter().map(|f| &f.path).collect::<Vec<_>>()),
            );
        }
        ExtractedPayload::GithubCodeowners { diff, changed_paths, .. } => {
            ctx.facts.insert("diff.text".into(), serde_json::json!(diff));
            ctx.facts
                .insert("diff.filesChanged.paths".into(), serde_json::json!(changed_paths));
        }
        _ => {}
    }
    ctx
}

async fn handle_classified(
    ctx: &PipelineContext<'_>,
    workspace: &Workspace,
    signal: &SignalEvent,
    candidate: &mut DriftCandidate,
) -> StageResult {
    let confidence = candidate.confidence.unwrap_or(0.0);
    if confidence < workspace.materiality_threshold {
        return Err(not_applicable(format!(
            "confidence {confidence} is below the materiality threshold {}",
            workspace.materiality_threshold
        )));
    }

    let rows = ctx
        .policy_packs
        .find_by_status(&workspace.id, PolicyPackStatus::Published)
        .await?;
    if rows.is_empty() {
        return Ok(DriftState::PolicyEvaluated);
    }

    let parsed: Vec<_> = rows
        .iter()
        .map(|row| policy_pack::parse(&row.raw_yaml).map_err(DriftError::Schema))
        .collect::<Result<Vec<_>, _>>()?;

    let registry = ComparatorRegistry::with_defaults();
    let comparison_ctx = build_comparison_context(signal);
    let changed_paths = changed_paths_of(signal);

    let mut rule_decisions: HashMap<String, Vec<(String, DecisionOnFail)>> = HashMap::new();
    for pack in &parsed {
        let results = evaluator::evaluate_pack(pack, &comparison_ctx, &changed_paths, &registry)
            .map_err(DriftError::Policy)?;
        for rule_result in results.into_iter().filter(|r| !r.skipped) {
            rule_decisions
                .entry(rule_result.rule_id.clone())
                .or_default()
                .push((pack.metadata.id.clone(), rule_result.worst_decision()));
        }
    }

    let pack_refs: Vec<&_> = parsed.iter().collect();
    let merged = composition::merge(&pack_refs, &rule_decisions).map_err(DriftError::Policy)?;
    if merged.iter().any(|m| m.decision == DecisionOnFail::Block) {
        return Err(not_applicable("at least one policy rule resolved to BLOCK"));
    }

    Ok(DriftState::PolicyEvaluated)
}

async fn handle_policy_evaluated(
    ctx: &PipelineContext<'_>,
    candidate: &mut DriftCandidate,
) -> StageResult {
    let levels = [
        (FingerprintLevel::Strict, &candidate.fingerprint_strict),
        (FingerprintLevel::Medium, &candidate.fingerprint_medium),
        (FingerprintLevel::Broad, &candidate.fingerprint_broad),
    ];
    for (level, fingerprint) in levels {
        let matches = ctx
            .suppression_rules
            .find_matching(&candidate.workspace_id, fingerprint)
            .await?;
        if matches.iter().any(|r| r.level == level) {
            return Err(not_applicable(format!(
                "suppressed by a learned {level:?} rule"
            )));
        }
    }
    Ok(DriftState::Routed)
}

fn handle_routed(workspace: &Workspace, candidate: &mut DriftCandidate) -> StageResult {
    let confidence = candidate.confidence.unwrap_or(0.0);
    // Domain/risk-level signals and the rolling notification count both need
    // repository lookups this pipeline doesn't have yet (no per-domain risk
    // classification, no notification-log query) — routed as non-critical
    // with an empty window until those land.
    let decision = routing::route(
        workspace,
        confidence,
        workspace.default_owner_ref.as_deref(),
        None,
        None,
        0,
    );
    candidate.routing_decision = Some(format!("{decision:?}"));
    if decision.rate_limited {
        observability::pipeline_metrics().record_notification_rate_limited();
    }
    Ok(DriftState::PatchPlanned)
}

fn infer_target_system(doc_ref: &str) -> TargetSystem {
    let lower = doc_ref.to_lowercase();
    if lower.contains("openapi") || lower.contains("swagger") {
        TargetSystem::SwaggerOpenapi
    } else if lower.contains("catalog-info") || lower.contains("backstage") {
        TargetSystem::BackstageCatalog
    } else if lower.starts_with("runbooks/") || lower.contains("/wiki/") {
        TargetSystem::Wiki
    } else if lower.contains("gitbook") {
        TargetSystem::GitBook
    } else {
        TargetSystem::Readme
    }
}

/// The inputs every planning decision is re-derived from rather than
/// denormalized onto the candidate, matching `has_coverage_gap`'s pattern.
struct PlanInputs {
    drift_type: DriftType,
    doc_ref: String,
    confidence: f64,
    style: PatchStyle,
}

fn plan_inputs(candidate: &DriftCandidate) -> Result<PlanInputs, DriftError> {
    let drift_type = candidate
        .drift_type
        .ok_or_else(|| not_applicable("no drift type was classified for this candidate"))?;
    let doc_ref = candidate
        .doc_candidates
        .as_ref()
        .and_then(|c| c.first())
        .cloned()
        .ok_or_else(|| DriftError::Adapter(AdapterError::NotFound("no resolved doc_ref".to_string())))?;
    let confidence = candidate.confidence.unwrap_or(0.0);
    let target = infer_target_system(&doc_ref);
    let style = patch::planner::plan_style(drift_type, candidate.source_type, confidence, target);
    Ok(PlanInputs {
        drift_type,
        doc_ref,
        confidence,
        style,
    })
}

fn handle_patch_planned(candidate: &mut DriftCandidate) -> StageResult {
    let inputs = plan_inputs(candidate)?;
    candidate.active_plan_id = Some(format!("{}-{:?}", candidate.id, inputs.drift_type));
    candidate.active_plan_version = Some("1".to_string());
    candidate.active_plan_hash = Some(format!("{:?}", inputs.style));
    Ok(DriftState::PatchProposed)
}

async fn handle_patch_proposed(
    ctx: &PipelineContext<'_>,
    candidate: &mut DriftCandidate,
) -> StageResult {
    let inputs = plan_inputs(candidate)?;
    let adapter = ctx
        .document_adapter
        .ok_or_else(|| transient("no document adapter configured"))?;
    let llm = ctx
        .llm_client
        .ok_or_else(|| transient("no llm client configured"))?;

    let fetched = adapter.fetch(&inputs.doc_ref).await?;
    let doc = crate::claims::extract_claims(&fetched.content);

    let llm_config = config::config()
        .map(|c| c.llm.clone())
        .unwrap_or_else(|_| config::DriftWorkerConfig::default().llm);
    let doc_context = DocContext::build(
        &doc,
        &fetched.content,
        llm_config.max_doc_chars_sent_to_llm,
        llm_config.max_sections,
        llm_config.max_section_chars,
    );

    let instructions = format!(
        "Reflect the {:?} drift detected against {}",
        inputs.drift_type, candidate.source_type
    );
    let proposed_content = patch::generator::generate(
        llm,
        &fetched.content,
        &doc_context,
        inputs.style,
        &instructions,
    )
    .await
    .map_err(DriftError::Llm)?;

    let proposal = PatchProposal {
        workspace_id: candidate.workspace_id.clone(),
        drift_id: candidate.id.clone(),
        doc_ref: inputs.doc_ref,
        base_revision: fetched.revision,
        proposed_content,
        style: inputs.style,
        confidence: inputs.confidence,
        status: PatchStatus::Pending,
        slack_message_ts: None,
        rejection_reason: None,
        rejection_tags: None,
        resolved_by: None,
        resolved_at: None,
        last_notified_at: None,
    };
    ctx.patch_proposals.upsert(&proposal).await?;

    Ok(DriftState::AwaitingHuman)
}

/// Applies a stage's `StageResult` through `state_machine::resolve`,
/// persists the candidate, and appends the audit row (§4.1, §5, §3).
async fn advance_candidate(
    ctx: &PipelineContext<'_>,
    candidate: &mut DriftCandidate,
    expected_state: DriftState,
    expected_state_updated_at: chrono::DateTime<chrono::Utc>,
    actor: &str,
    stage_result: StageResult,
    duration_ms: u64,
    metadata: serde_json::Value,
) -> Result<(), DriftError> {
    let resolution = state_machine::resolve(expected_state, candidate.retry_count, stage_result);
    let from_state = expected_state.as_str().to_string();

    match resolution {
        state_machine::Resolution::Advance { next_state } => {
            candidate.state = next_state;
            candidate.state_updated_at = chrono::Utc::now();
            candidate.last_error_code = None;
            candidate.last_error_message = None;
        }
        state_machine::Resolution::RetryAfter { retry_count, .. } => {
            candidate.retry_count = retry_count;
        }
        state_machine::Resolution::Terminal {
            next_state,
            error_code,
            ref error_message,
        } => {
            candidate.state = next_state;
            candidate.state_updated_at = chrono::Utc::now();
            candidate.last_error_code = Some(error_code.to_string());
            candidate.last_error_message = Some(error_message.clone());
        }
    }

    ctx.candidates
        .advance(candidate, expected_state, expected_state_updated_at)
        .await?;

    ctx.audit_trail
        .append(&AuditTrailRow::transition(
            candidate.workspace_id.as_str(),
            candidate.id.as_str(),
            Some(from_state.as_str()),
            candidate.state.as_str(),
            actor,
            duration_ms,
            metadata,
        ))
        .await?;

    if candidate.state.is_terminal() {
        observability::pipeline_metrics().record_terminal(candidate.state.as_str());
    }

    Ok(())
}

/// Advances a single candidate by one stage, if it is currently in an
/// automatic (non-human-gated, non-terminal) state.
pub async fn dispatch_once(
    ctx: &PipelineContext<'_>,
    workspace_id: &str,
    drift_id: &str,
) -> Result<(), DriftError> {
    let Some(mut candidate) = ctx.candidates.get(workspace_id, drift_id).await? else {
        return Ok(());
    };
    if candidate.state.is_terminal()
        || matches!(candidate.state, DriftState::AwaitingHuman | DriftState::Snoozed)
    {
        return Ok(());
    }

    let workspace = ctx
        .workspaces
        .get(workspace_id)
        .await?
        .ok_or_else(|| transient(format!("unknown workspace {workspace_id}")))?;
    let signal = ctx
        .signals
        .get(workspace_id, &candidate.signal_event_id)
        .await?
        .ok_or_else(|| transient(format!("signal {} not found", candidate.signal_event_id)))?;

    let expected_state = candidate.state;
    let expected_state_updated_at = candidate.state_updated_at;
    let started = std::time::Instant::now();
    let result = run_stage(ctx, &workspace, &signal, &mut candidate).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    advance_candidate(
        ctx,
        &mut candidate,
        expected_state,
        expected_state_updated_at,
        "pipeline",
        result,
        duration_ms,
        serde_json::json!({}),
    )
    .await
}

/// Drains every in-flight candidate for a workspace, one stage each. A
/// single candidate's failure is logged and skipped rather than aborting the
/// rest of the batch.
pub async fn dispatch_in_flight(
    ctx: &PipelineContext<'_>,
    workspace_id: &str,
) -> Result<usize, DriftError> {
    let in_flight = ctx.candidates.find_in_flight(workspace_id).await?;
    let mut dispatched = 0;
    for candidate in &in_flight {
        match dispatch_once(ctx, workspace_id, &candidate.id).await {
            Ok(()) => dispatched += 1,
            Err(e) => {
                tracing::warn!(drift_id = %candidate.id, error = %e, "failed to dispatch candidate");
            }
        }
    }
    Ok(dispatched)
}

/// Regenerates a patch against a document's current revision after an
/// optimistic-concurrency conflict (§4.7), by replanning from scratch rather
/// than patching the stale proposal.
struct PatchProposalRegenerator<'a> {
    llm: &'a dyn LlmClient,
    style: PatchStyle,
    instructions: String,
}

#[async_trait::async_trait]
impl<'a> PatchRegenerator for PatchProposalRegenerator<'a> {
    async fn regenerate(
        &self,
        current_content: &str,
        _current_revision: &str,
    ) -> Result<String, AdapterError> {
        let doc = crate::claims::extract_claims(current_content);
        let llm_config = config::config()
            .map(|c| c.llm.clone())
            .unwrap_or_else(|_| config::DriftWorkerConfig::default().llm);
        let doc_context = DocContext::build(
            &doc,
            current_content,
            llm_config.max_doc_chars_sent_to_llm,
            llm_config.max_sections,
            llm_config.max_section_chars,
        );
        patch::generator::generate(self.llm, current_content, &doc_context, self.style, &self.instructions)
            .await
            .map_err(|e| match e {
                LlmError::Timeout => AdapterError::Timeout(0),
                other => AdapterError::Auth(other.to_string()),
            })
    }
}

/// Human approves a pending proposal: writes it to the target system and
/// marks the candidate `Applied`.
pub async fn approve_candidate(
    ctx: &PipelineContext<'_>,
    workspace_id: &str,
    drift_id: &str,
    doc_ref: &str,
) -> Result<(), DriftError> {
    let mut candidate = ctx
        .candidates
        .get(workspace_id, drift_id)
        .await?
        .ok_or_else(|| transient("candidate not found"))?;
    let mut proposal = ctx
        .patch_proposals
        .get(workspace_id, drift_id, doc_ref)
        .await?
        .ok_or_else(|| transient("patch proposal not found"))?;

    let started = std::time::Instant::now();
    let outcome = if let Some(git_adapter) = ctx.git_adapter {
        let pr = writeback::apply_via_pr(
            git_adapter,
            CreatePatchPrParams {
                doc_ref: proposal.doc_ref.clone(),
                new_content: proposal.proposed_content.clone(),
                branch_name: format!("drift-agent/{drift_id}"),
                title: format!("Update docs for {drift_id}"),
                body: "Automated documentation drift patch.".to_string(),
            },
        )
        .await?;
        serde_json::json!({"prNumber": pr.pr_number, "prUrl": pr.pr_url})
    } else if let Some(document_adapter) = ctx.document_adapter {
        let llm = ctx
            .llm_client
            .ok_or_else(|| transient("no llm client configured for conflict regeneration"))?;
        let regenerator = PatchProposalRegenerator {
            llm,
            style: proposal.style,
            instructions: format!("Reflect drift for {drift_id}"),
        };
        let written = writeback::apply_direct(
            document_adapter,
            &proposal.doc_ref,
            proposal.proposed_content.clone(),
            proposal.base_revision.clone(),
            &regenerator,
            3,
        )
        .await?;
        written.audit_row_metadata
    } else {
        return Err(transient("no writeback adapter configured"));
    };
    let duration_ms = started.elapsed().as_millis() as u64;

    proposal.status = PatchStatus::Applied;
    proposal.resolved_by = Some("human".to_string());
    proposal.resolved_at = Some(chrono::Utc::now());
    ctx.patch_proposals.upsert(&proposal).await?;

    let expected_state = candidate.state;
    let expected_state_updated_at = candidate.state_updated_at;
    advance_candidate(
        ctx,
        &mut candidate,
        expected_state,
        expected_state_updated_at,
        "human",
        Ok(DriftState::Applied),
        duration_ms,
        outcome,
    )
    .await?;
    Ok(())
}

/// Looks at this drift's history of human rejections at the same fingerprint
/// and, once it crosses a level's escalation threshold, upserts a broader
/// suppression rule (§4.6, §8). Counting rejections from the audit trail is
/// a proxy for "how many times has a human said this isn't real" — there is
/// no dedicated false-positive counter repository yet.
async fn maybe_escalate_suppression(
    ctx: &PipelineContext<'_>,
    candidate: &DriftCandidate,
    reason: &str,
) -> Result<(), DriftError> {
    let existing = ctx
        .suppression_rules
        .find_matching(&candidate.workspace_id, &candidate.fingerprint_strict)
        .await?;

    if !existing.iter().any(|r| r.level == FingerprintLevel::Strict) {
        ctx.suppression_rules
            .upsert(&SuppressionRule {
                workspace_id: candidate.workspace_id.clone(),
                fingerprint: candidate.fingerprint_strict.clone(),
                level: FingerprintLevel::Strict,
                reason: reason.to_string(),
                created_by: "human".to_string(),
                expires_at: None,
            })
            .await?;
        return Ok(());
    }

    let history = ctx
        .audit_trail
        .find_for_drift(&candidate.workspace_id, &candidate.id)
        .await?;
    let rejection_count = history.iter().filter(|r| r.to_state == "REJECTED").count() as u32;

    if rejection_count + 1 >= FingerprintLevel::Strict.escalation_threshold() {
        if let Some(escalated) = FingerprintLevel::Strict.escalate() {
            ctx.suppression_rules
                .upsert(&SuppressionRule {
                    workspace_id: candidate.workspace_id.clone(),
                    fingerprint: candidate.fingerprint_medium.clone(),
                    level: escalated,
                    reason: format!("escalated after {} rejections: {reason}", rejection_count + 1),
                    created_by: "human".to_string(),
                    expires_at: None,
                })
                .await?;
        }
    }
    Ok(())
}

/// Human rejects a pending proposal (§4.6, §8): marks the proposal and
/// candidate, and feeds the rejection into suppression-rule escalation.
pub async fn reject_candidate(
    ctx: &PipelineContext<'_>,
    workspace_id: &str,
    drift_id: &str,
    doc_ref: &str,
    reason: &str,
    tags: Vec<String>,
    actor: &str,
) -> Result<(), DriftError> {
    let mut candidate = ctx
        .candidates
        .get(workspace_id, drift_id)
        .await?
        .ok_or_else(|| transient("candidate not found"))?;
    let mut proposal = ctx
        .patch_proposals
        .get(workspace_id, drift_id, doc_ref)
        .await?
        .ok_or_else(|| transient("patch proposal not found"))?;

    proposal.status = PatchStatus::Rejected;
    proposal.rejection_reason = Some(reason.to_string());
    proposal.rejection_tags = Some(tags);
    proposal.resolved_by = Some(actor.to_string());
    proposal.resolved_at = Some(chrono::Utc::now());
    ctx.patch_proposals.upsert(&proposal).await?;

    maybe_escalate_suppression(ctx, &candidate, reason).await?;

    let expected_state = candidate.state;
    let expected_state_updated_at = candidate.state_updated_at;
    advance_candidate(
        ctx,
        &mut candidate,
        expected_state,
        expected_state_updated_at,
        actor,
        Ok(DriftState::Rejected),
        0,
        serde_json::json!({}),
    )
    .await
}

pub async fn snooze_candidate(
    ctx: &PipelineContext<'_>,
    workspace_id: &str,
    drift_id: &str,
    actor: &str,
) -> Result<(), DriftError> {
    let mut candidate = ctx
        .candidates
        .get(workspace_id, drift_id)
        .await?
        .ok_or_else(|| transient("candidate not found"))?;
    let expected_state = candidate.state;
    let expected_state_updated_at = candidate.state_updated_at;
    advance_candidate(
        ctx,
        &mut candidate,
        expected_state,
        expected_state_updated_at,
        actor,
        Ok(DriftState::Snoozed),
        0,
        serde_json::json!({}),
    )
    .await
}

pub async fn wake_snoozed(
    ctx: &PipelineContext<'_>,
    workspace_id: &str,
    drift_id: &str,
) -> Result<(), DriftError> {
    let mut candidate = ctx
        .candidates
        .get(workspace_id, drift_id)
        .await?
        .ok_or_else(|| transient("candidate not found"))?;
    let expected_state = candidate.state;
    let expected_state_updated_at = candidate.state_updated_at;
    advance_candidate(
        ctx,
        &mut candidate,
        expected_state,
        expected_state_updated_at,
        "pipeline",
        Ok(DriftState::AwaitingHuman),
        0,
        serde_json::json!({}),
    )
    .await
}
