//! Capability decision orchestration.
//!
//! Each surface runs the same pipeline: validate inputs, resolve the target
//! org, gather temporal facts, gather extension fields, ask the resolver once
//! per action, and assemble a fail-closed response. Client input errors are
//! raised before any store is touched.

use crate::error::{ApiError, FactError, Result};
use crate::facts::{
    ExtFieldConfig, MutationTargetEvent, OrgDirectory, OrgId, TargetEventState, TemporalFacts,
};
use crate::fields::{enabled_ext_field_keys, FieldAllowList};
use crate::input::{
    normalize_org_code, parse_effective_date, parse_target_effective_date, required,
};
use crate::resolver::{PolicyFacts, PolicyResolver, WriteCapabilityResolver};
use crate::response::{
    AppendCapabilities, AppendDecisions, CapabilitiesQuery, MutationCapabilities,
    MutationDecisions, PolicyBinding, WriteCapabilities, WriteCapabilitiesQuery,
};
use chrono::NaiveDate;
use orgcap_runtime::{
    capability_key_for_scope, capability_key_for_write_intent, PolicyActivationRuntime,
};
use orgcap_types::{
    deny_reason, ActionKey, ActionKind, CapabilityDecision, CapabilityPolicyState, OrgEventType,
    WriteIntent, ORG_ADD_VERSION_CAPABILITY, ORG_CORRECT_CAPABILITY, ORG_CREATE_CAPABILITY,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

const ORG_RESOLVE_FAILED: &str = "org_resolve_failed";
const ORG_FACTS_FAILED: &str = "org_facts_failed";
const EXT_FIELDS_FAILED: &str = "ext_fields_failed";
const MUTATION_POLICY_FAILED: &str = "mutation_policy_failed";
const APPEND_POLICY_FAILED: &str = "append_policy_failed";
const WRITE_POLICY_FAILED: &str = "write_policy_failed";

/// Who is asking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    pub tenant: String,
    pub actor: String,
    pub can_admin: bool,
}

impl CallerContext {
    pub fn new(tenant: impl Into<String>, actor: impl Into<String>, can_admin: bool) -> Self {
        Self {
            tenant: tenant.into(),
            actor: actor.into(),
            can_admin,
        }
    }
}

/// Dates an existing-org write reads at: the target event is located at
/// `target`, every other fact is read at the request's `effective` date.
#[derive(Debug, Clone, Copy)]
struct ReadDates {
    target: NaiveDate,
    effective: NaiveDate,
}

enum OrgLookup {
    Found(OrgId),
    NotFound,
}

/// Assembles capability decisions for org-unit mutations.
pub struct CapabilityOrchestrator {
    runtime: Arc<PolicyActivationRuntime>,
    orgs: Arc<dyn OrgDirectory>,
    facts: Arc<dyn TemporalFacts>,
    policy: Arc<dyn PolicyResolver>,
    write_policy: Arc<dyn WriteCapabilityResolver>,
}

impl CapabilityOrchestrator {
    pub fn new(
        runtime: Arc<PolicyActivationRuntime>,
        orgs: Arc<dyn OrgDirectory>,
        facts: Arc<dyn TemporalFacts>,
        policy: Arc<dyn PolicyResolver>,
        write_policy: Arc<dyn WriteCapabilityResolver>,
    ) -> Self {
        Self {
            runtime,
            orgs,
            facts,
            policy,
            write_policy,
        }
    }

    pub fn runtime(&self) -> &Arc<PolicyActivationRuntime> {
        &self.runtime
    }

    // ------------------------------------------------------------------
    // Mutation capabilities
    // ------------------------------------------------------------------

    /// Correct / rescind capabilities for the event in force on an org.
    pub async fn mutation_capabilities(
        &self,
        ctx: &CallerContext,
        query: &CapabilitiesQuery,
    ) -> Result<MutationCapabilities> {
        let org_code = normalize_org_code(query.org_code.as_deref().unwrap_or_default())?;
        let effective_date =
            parse_effective_date(required("effective_date", query.effective_date.as_deref())?)?;

        let policy = self.policy_binding(&ctx.tenant, ORG_CORRECT_CAPABILITY);
        let tree_initialized = self.tree_initialized(ctx).await?;

        let org_id = match self.lookup_org(ctx, &org_code).await? {
            OrgLookup::Found(id) => id,
            OrgLookup::NotFound => {
                debug!(tenant = %ctx.tenant, org_code = %org_code, "Org not found as of date");
                let denied = self.denied(ctx, deny_reason::ORG_NOT_FOUND_AS_OF);
                return Ok(MutationCapabilities {
                    org_code,
                    effective_date,
                    effective_target_event_type: None,
                    raw_target_event_type: None,
                    tree_initialized,
                    policy,
                    capabilities: MutationDecisions::all_denied(denied),
                });
            }
        };

        let target = self.target_event(ctx, org_id, effective_date).await?;
        let (correct_event, correct_status, rescind_event) = match target.state() {
            TargetEventState::Effective(event_type) => {
                let ext = self.ext_fields(ctx, effective_date).await?;
                (
                    self.resolve_correct_event(ctx, &event_type, &ext)?,
                    self.resolve_correct_status(ctx, &event_type)?,
                    self.resolve_rescind_event(ctx, &event_type)?,
                )
            }
            TargetEventState::Rescinded => {
                let denied = self.denied(ctx, deny_reason::ORG_EVENT_RESCINDED);
                (denied.clone(), denied.clone(), denied)
            }
            TargetEventState::Missing => {
                let denied = self.denied(ctx, deny_reason::ORG_EVENT_NOT_FOUND);
                (denied.clone(), denied.clone(), denied)
            }
        };
        let rescind_org = self.resolve_rescind_org(ctx, org_id, effective_date).await?;

        debug!(
            tenant = %ctx.tenant,
            org_code = %org_code,
            effective_date = %effective_date,
            correct_event = correct_event.enabled,
            correct_status = correct_status.enabled,
            rescind_event = rescind_event.enabled,
            rescind_org = rescind_org.enabled,
            "Mutation capabilities resolved"
        );

        Ok(MutationCapabilities {
            org_code,
            effective_date,
            effective_target_event_type: effective_target_event_type(&target),
            raw_target_event_type: if target.has_raw {
                target.raw_event_type.clone()
            } else {
                None
            },
            tree_initialized,
            policy,
            capabilities: MutationDecisions {
                correct_event,
                correct_status,
                rescind_event,
                rescind_org,
            },
        })
    }

    fn resolve_correct_event(
        &self,
        ctx: &CallerContext,
        target: &OrgEventType,
        ext: &[ExtFieldConfig],
    ) -> Result<CapabilityDecision> {
        let fields = FieldAllowList::for_target_event(target).with_ext_fields(ext);
        let facts = PolicyFacts {
            enabled_ext_field_keys: Some(fields.ext_field_keys()),
            ..PolicyFacts::new(ctx.can_admin)
        };
        let key = ActionKey::new(ActionKind::CorrectEvent, OrgEventType::CorrectEvent)
            .with_target(target.clone());
        let resolved = self.resolve(&key, &facts, MUTATION_POLICY_FAILED)?;
        Ok(self.finalize(ctx, fields.into_decision(resolved.enabled, resolved.deny_reasons)))
    }

    fn resolve_correct_status(
        &self,
        ctx: &CallerContext,
        target: &OrgEventType,
    ) -> Result<CapabilityDecision> {
        let facts = PolicyFacts {
            target_status_as_of: Some(target.resulting_status()),
            ..PolicyFacts::new(ctx.can_admin)
        };
        let key = ActionKey::new(ActionKind::CorrectStatus, OrgEventType::CorrectStatus)
            .with_target(target.clone());
        let resolved = self.resolve(&key, &facts, MUTATION_POLICY_FAILED)?;
        Ok(self.finalize(ctx, resolved))
    }

    fn resolve_rescind_event(
        &self,
        ctx: &CallerContext,
        target: &OrgEventType,
    ) -> Result<CapabilityDecision> {
        let key = ActionKey::new(ActionKind::RescindEvent, OrgEventType::RescindEvent)
            .with_target(target.clone());
        let facts = PolicyFacts::new(ctx.can_admin);
        let resolved = self.resolve(&key, &facts, MUTATION_POLICY_FAILED)?;
        Ok(self.finalize(ctx, resolved))
    }

    async fn resolve_rescind_org(
        &self,
        ctx: &CallerContext,
        org_id: OrgId,
        as_of: NaiveDate,
    ) -> Result<CapabilityDecision> {
        let blockers = self
            .facts
            .rescind_org_deny_reasons(&ctx.tenant, org_id, as_of)
            .await
            .map_err(|e| ApiError::internal(ORG_FACTS_FAILED, &e))?;
        let facts = PolicyFacts {
            rescind_org_deny_reasons: Some(blockers),
            ..PolicyFacts::new(ctx.can_admin)
        };
        let key = ActionKey::new(ActionKind::RescindOrg, OrgEventType::RescindOrg);
        let resolved = self.resolve(&key, &facts, MUTATION_POLICY_FAILED)?;
        Ok(self.finalize(ctx, resolved))
    }

    // ------------------------------------------------------------------
    // Append capabilities
    // ------------------------------------------------------------------

    /// Create capability plus one capability per appendable event type.
    pub async fn append_capabilities(
        &self,
        ctx: &CallerContext,
        query: &CapabilitiesQuery,
    ) -> Result<AppendCapabilities> {
        let org_code = normalize_org_code(query.org_code.as_deref().unwrap_or_default())?;
        let effective_date =
            parse_effective_date(required("effective_date", query.effective_date.as_deref())?)?;

        let create_policy = self.policy_binding(&ctx.tenant, ORG_CREATE_CAPABILITY);
        let event_update_policy = self.policy_binding(&ctx.tenant, ORG_ADD_VERSION_CAPABILITY);
        let tree_initialized = self.tree_initialized(ctx).await?;
        let lookup = self.lookup_org(ctx, &org_code).await?;

        let create_facts = PolicyFacts {
            tree_initialized: Some(tree_initialized),
            org_already_exists: Some(matches!(lookup, OrgLookup::Found(_))),
            create_as_root: Some(!tree_initialized),
            ..PolicyFacts::new(ctx.can_admin)
        };
        let create = self.resolve(
            &ActionKey::new(ActionKind::Create, OrgEventType::Create),
            &create_facts,
            APPEND_POLICY_FAILED,
        )?;
        let create = self.finalize(ctx, create);

        let event_update = match lookup {
            OrgLookup::NotFound => {
                let denied = self.denied(ctx, deny_reason::ORG_NOT_FOUND_AS_OF);
                OrgEventType::EVENT_UPDATES
                    .into_iter()
                    .map(|event_type| (event_type, denied.clone()))
                    .collect()
            }
            OrgLookup::Found(org_id) => {
                self.resolve_event_updates(ctx, org_id, effective_date, tree_initialized)
                    .await?
            }
        };

        debug!(
            tenant = %ctx.tenant,
            org_code = %org_code,
            effective_date = %effective_date,
            create = create.enabled,
            "Append capabilities resolved"
        );

        Ok(AppendCapabilities {
            org_code,
            effective_date,
            tree_initialized,
            create_policy,
            event_update_policy,
            capabilities: AppendDecisions {
                create,
                event_update,
            },
        })
    }

    async fn resolve_event_updates(
        &self,
        ctx: &CallerContext,
        org_id: OrgId,
        as_of: NaiveDate,
        tree_initialized: bool,
    ) -> Result<BTreeMap<OrgEventType, CapabilityDecision>> {
        let target = self.target_event(ctx, org_id, as_of).await?;
        let ext = self.ext_fields(ctx, as_of).await?;
        let is_root = self.is_root(ctx, org_id, as_of).await?;
        let effective = effective_target_event_type(&target);

        let facts = PolicyFacts {
            tree_initialized: Some(tree_initialized),
            target_exists_as_of: Some(effective.is_some()),
            target_status_as_of: effective.as_ref().map(OrgEventType::resulting_status),
            is_root: Some(is_root),
            enabled_ext_field_keys: Some(enabled_ext_field_keys(&ext)),
            ..PolicyFacts::new(ctx.can_admin)
        };

        let mut decisions = BTreeMap::new();
        for event_type in OrgEventType::EVENT_UPDATES {
            let mut key = ActionKey::new(ActionKind::EventUpdate, event_type.clone());
            key.target_effective_event_type = effective.clone();
            let resolved = self.resolve(&key, &facts, APPEND_POLICY_FAILED)?;
            decisions.insert(event_type, self.finalize(ctx, resolved));
        }
        Ok(decisions)
    }

    // ------------------------------------------------------------------
    // Write capabilities
    // ------------------------------------------------------------------

    /// Capability of a single write intent, with the policy version the
    /// client must echo back when it submits the write.
    pub async fn write_capabilities(
        &self,
        ctx: &CallerContext,
        query: &WriteCapabilitiesQuery,
    ) -> Result<WriteCapabilities> {
        let intent = parse_intent(required("intent", query.intent.as_deref())?)?;
        let effective_date =
            parse_effective_date(required("effective_date", query.effective_date.as_deref())?)?;
        let target_date = if intent.requires_target_effective_date() {
            Some(parse_target_effective_date(required(
                "target_effective_date",
                query.target_effective_date.as_deref(),
            )?)?)
        } else {
            None
        };
        let org_code = match query.org_code.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(normalize_org_code(raw)?),
            _ => None,
        };
        if org_code.is_none() && intent != WriteIntent::CreateOrg {
            return Err(ApiError::InvalidRequest("org_code is required".into()));
        }

        let capability_key = capability_key_for_write_intent(intent);
        let policy_version = self.runtime.active_policy_version(&ctx.tenant, capability_key);
        let (effective_policy_version, _) = self
            .runtime
            .resolve_effective_policy_version(&ctx.tenant, capability_key);
        let tree_initialized = self.tree_initialized(ctx).await?;

        // Only create_org may omit org_code.
        let decision = match org_code.as_deref() {
            Some(code) if intent != WriteIntent::CreateOrg => {
                let as_of = ReadDates {
                    target: target_date.unwrap_or(effective_date),
                    effective: effective_date,
                };
                self.resolve_existing_org_intent(ctx, intent, code, as_of, tree_initialized)
                    .await?
            }
            code => {
                self.resolve_create_intent(ctx, code, effective_date, tree_initialized)
                    .await?
            }
        };

        debug!(
            tenant = %ctx.tenant,
            intent = %intent,
            capability_key,
            policy_version = %policy_version,
            enabled = decision.enabled,
            "Write capabilities resolved"
        );

        Ok(WriteCapabilities {
            intent,
            capability_key: capability_key.to_string(),
            policy_version,
            effective_policy_version,
            tree_initialized,
            decision,
        })
    }

    async fn resolve_create_intent(
        &self,
        ctx: &CallerContext,
        org_code: Option<&str>,
        effective_date: NaiveDate,
        tree_initialized: bool,
    ) -> Result<CapabilityDecision> {
        let org_already_exists = match org_code {
            Some(code) => matches!(self.lookup_org(ctx, code).await?, OrgLookup::Found(_)),
            None => false,
        };
        let ext = self.ext_fields(ctx, effective_date).await?;
        let facts = PolicyFacts {
            tree_initialized: Some(tree_initialized),
            org_already_exists: Some(org_already_exists),
            create_as_root: Some(!tree_initialized),
            enabled_ext_field_keys: Some(enabled_ext_field_keys(&ext)),
            ..PolicyFacts::new(ctx.can_admin)
        };
        self.resolve_write(ctx, WriteIntent::CreateOrg, &facts)
    }

    async fn resolve_existing_org_intent(
        &self,
        ctx: &CallerContext,
        intent: WriteIntent,
        org_code: &str,
        as_of: ReadDates,
        tree_initialized: bool,
    ) -> Result<CapabilityDecision> {
        let org_id = match self.lookup_org(ctx, org_code).await? {
            OrgLookup::Found(id) => id,
            OrgLookup::NotFound => {
                return Ok(self.denied(ctx, deny_reason::ORG_NOT_FOUND_AS_OF));
            }
        };

        let target = self.target_event(ctx, org_id, as_of.target).await?;
        let effective = match target.state() {
            TargetEventState::Effective(event_type) => Some(event_type),
            TargetEventState::Rescinded if intent == WriteIntent::Correct => {
                return Ok(self.denied(ctx, deny_reason::ORG_EVENT_RESCINDED));
            }
            TargetEventState::Missing if intent == WriteIntent::Correct => {
                return Ok(self.denied(ctx, deny_reason::ORG_EVENT_NOT_FOUND));
            }
            TargetEventState::Rescinded | TargetEventState::Missing => None,
        };

        let ext = self.ext_fields(ctx, as_of.effective).await?;
        let is_root = self.is_root(ctx, org_id, as_of.effective).await?;
        let facts = PolicyFacts {
            tree_initialized: Some(tree_initialized),
            target_exists_as_of: Some(effective.is_some()),
            target_status_as_of: effective.as_ref().map(OrgEventType::resulting_status),
            is_root: Some(is_root),
            enabled_ext_field_keys: Some(enabled_ext_field_keys(&ext)),
            ..PolicyFacts::new(ctx.can_admin)
        };
        self.resolve_write(ctx, intent, &facts)
    }

    fn resolve_write(
        &self,
        ctx: &CallerContext,
        intent: WriteIntent,
        facts: &PolicyFacts,
    ) -> Result<CapabilityDecision> {
        let decision = self
            .write_policy
            .resolve(intent, facts)
            .map_err(|e| ApiError::internal(WRITE_POLICY_FAILED, &e))?;
        Ok(self.finalize(ctx, decision))
    }

    /// Check a client's cached policy version before accepting a write.
    pub fn ensure_write_policy_version(
        &self,
        ctx: &CallerContext,
        intent: &str,
        request_version: &str,
    ) -> Result<()> {
        let intent = parse_intent(intent)?;
        if request_version.trim().is_empty() {
            return Err(ApiError::PolicyVersionRequired);
        }
        let capability_key = capability_key_for_write_intent(intent);
        if self
            .runtime
            .accepts_policy_version(request_version, &ctx.tenant, capability_key, None)
        {
            Ok(())
        } else {
            Err(ApiError::PolicyVersionStale)
        }
    }

    // ------------------------------------------------------------------
    // Direct lookups and policy administration
    // ------------------------------------------------------------------

    /// Resolve an org code for a direct lookup. Missing orgs are a 404.
    pub async fn resolve_org(&self, ctx: &CallerContext, org_code: &str) -> Result<OrgId> {
        let org_code = normalize_org_code(org_code)?;
        match self.lookup_org(ctx, &org_code).await? {
            OrgLookup::Found(id) => Ok(id),
            OrgLookup::NotFound => Err(ApiError::OrgCodeNotFound),
        }
    }

    /// Policy binding of a UI scope such as (`FORM`, `orgunit.create_dialog`).
    pub fn policy_binding_for_scope(
        &self,
        ctx: &CallerContext,
        scope_type: &str,
        scope_key: &str,
    ) -> Result<PolicyBinding> {
        let capability_key = capability_key_for_scope(scope_type, scope_key).ok_or_else(|| {
            ApiError::InvalidRequest(format!(
                "unknown scope {}:{}",
                scope_type.trim(),
                scope_key.trim()
            ))
        })?;
        Ok(self.policy_binding(&ctx.tenant, capability_key))
    }

    pub fn policy_state(
        &self,
        ctx: &CallerContext,
        capability_key: &str,
    ) -> Result<CapabilityPolicyState> {
        Ok(self.runtime.state(&ctx.tenant, capability_key)?)
    }

    pub fn stage_policy_draft(
        &self,
        ctx: &CallerContext,
        capability_key: &str,
        version: &str,
    ) -> Result<CapabilityPolicyState> {
        require_admin(ctx)?;
        Ok(self
            .runtime
            .set_draft(&ctx.tenant, capability_key, version, &ctx.actor)?)
    }

    pub fn activate_policy(
        &self,
        ctx: &CallerContext,
        capability_key: &str,
        version: &str,
    ) -> Result<CapabilityPolicyState> {
        require_admin(ctx)?;
        Ok(self
            .runtime
            .activate(&ctx.tenant, capability_key, version, &ctx.actor)?)
    }

    /// Roll back to `version`, or to the previous version when blank.
    pub fn rollback_policy(
        &self,
        ctx: &CallerContext,
        capability_key: &str,
        version: &str,
    ) -> Result<CapabilityPolicyState> {
        require_admin(ctx)?;
        Ok(self
            .runtime
            .rollback(&ctx.tenant, capability_key, version, &ctx.actor)?)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn policy_binding(&self, tenant: &str, capability_key: &str) -> PolicyBinding {
        let (effective_policy_version, _) =
            self.runtime.resolve_effective_policy_version(tenant, capability_key);
        PolicyBinding {
            capability_key: capability_key.to_string(),
            effective_policy_version,
        }
    }

    fn resolve(
        &self,
        key: &ActionKey,
        facts: &PolicyFacts,
        failure_code: &'static str,
    ) -> Result<CapabilityDecision> {
        self.policy
            .resolve(key, facts)
            .map_err(|e| ApiError::internal(failure_code, &e))
    }

    /// Enforce fail-closed output and put `FORBIDDEN` first for non-admins.
    fn finalize(&self, ctx: &CallerContext, decision: CapabilityDecision) -> CapabilityDecision {
        let mut decision = decision.fail_closed();
        if !decision.enabled && !ctx.can_admin {
            decision.lead_with_reason(deny_reason::FORBIDDEN);
        }
        decision
    }

    fn denied(&self, ctx: &CallerContext, reason: &str) -> CapabilityDecision {
        self.finalize(ctx, CapabilityDecision::deny([reason]))
    }

    async fn lookup_org(&self, ctx: &CallerContext, org_code: &str) -> Result<OrgLookup> {
        match self.orgs.resolve_org_id(&ctx.tenant, org_code).await {
            Ok(id) => Ok(OrgLookup::Found(id)),
            Err(FactError::NotFound) => Ok(OrgLookup::NotFound),
            Err(FactError::Invalid(_)) => Err(ApiError::OrgCodeInvalid),
            Err(err @ FactError::Store(_)) => Err(ApiError::internal(ORG_RESOLVE_FAILED, &err)),
        }
    }

    async fn tree_initialized(&self, ctx: &CallerContext) -> Result<bool> {
        self.facts
            .tree_initialized(&ctx.tenant)
            .await
            .map_err(|e| ApiError::internal(ORG_FACTS_FAILED, &e))
    }

    async fn target_event(
        &self,
        ctx: &CallerContext,
        org_id: OrgId,
        as_of: NaiveDate,
    ) -> Result<MutationTargetEvent> {
        match self.facts.target_event(&ctx.tenant, org_id, as_of).await {
            Ok(target) => Ok(target),
            Err(FactError::NotFound) => Ok(MutationTargetEvent::missing()),
            Err(err) => Err(ApiError::internal(ORG_FACTS_FAILED, &err)),
        }
    }

    async fn ext_fields(
        &self,
        ctx: &CallerContext,
        as_of: NaiveDate,
    ) -> Result<Vec<ExtFieldConfig>> {
        self.facts
            .enabled_ext_fields(&ctx.tenant, as_of)
            .await
            .map_err(|e| ApiError::internal(EXT_FIELDS_FAILED, &e))
    }

    async fn is_root(&self, ctx: &CallerContext, org_id: OrgId, as_of: NaiveDate) -> Result<bool> {
        self.facts
            .is_root(&ctx.tenant, org_id, as_of)
            .await
            .map_err(|e| ApiError::internal(ORG_FACTS_FAILED, &e))
    }
}

fn effective_target_event_type(target: &MutationTargetEvent) -> Option<OrgEventType> {
    match target.state() {
        TargetEventState::Effective(event_type) => Some(event_type),
        TargetEventState::Rescinded | TargetEventState::Missing => None,
    }
}

fn parse_intent(raw: &str) -> Result<WriteIntent> {
    WriteIntent::parse(raw).ok_or_else(|| ApiError::IntentNotSupported(raw.trim().to_string()))
}

fn require_admin(ctx: &CallerContext) -> Result<()> {
    if ctx.can_admin {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}
