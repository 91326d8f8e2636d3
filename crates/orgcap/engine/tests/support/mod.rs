//! Shared fixtures: an in-memory org store and scripted resolvers.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use orgcap_engine::{
    CallerContext, CapabilityOrchestrator, ExtFieldConfig, FactError, MutationTargetEvent,
    OrgDirectory, OrgId, PolicyFacts, PolicyResolver, ResolverError, TemporalFacts,
    WriteCapabilityResolver,
};
use orgcap_runtime::{CapabilityRegistry, FixedClock, PolicyActivationRuntime};
use orgcap_types::{ActionKey, ActionKind, CapabilityDecision, TargetStatus, WriteIntent};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const TENANT: &str = "t1";

pub fn admin() -> CallerContext {
    CallerContext::new(TENANT, "alice", true)
}

pub fn member() -> CallerContext {
    CallerContext::new(TENANT, "bob", false)
}

pub fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Store calls, used to script failures and to record query dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    ResolveOrg,
    TargetEvent,
    TreeInitialized,
    ExtFields,
    RescindOrgBlockers,
    IsRoot,
}

#[derive(Default)]
pub struct InMemoryStore {
    orgs: HashMap<String, OrgId>,
    targets: HashMap<OrgId, MutationTargetEvent>,
    roots: HashSet<OrgId>,
    tree_initialized: bool,
    ext_fields: Vec<ExtFieldConfig>,
    rescind_org_blockers: Vec<String>,
    failures: HashMap<StoreOp, FactError>,
    calls: AtomicUsize,
    target_queries: Mutex<Vec<NaiveDate>>,
    fact_queries: Mutex<Vec<(StoreOp, NaiveDate)>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_org(mut self, org_code: &str, id: i64, target: MutationTargetEvent) -> Self {
        self.orgs.insert(org_code.to_string(), OrgId(id));
        self.targets.insert(OrgId(id), target);
        self.tree_initialized = true;
        self
    }

    pub fn with_root(mut self, id: i64) -> Self {
        self.roots.insert(OrgId(id));
        self
    }

    pub fn with_ext_fields(mut self, keys: &[&str]) -> Self {
        self.ext_fields = keys.iter().map(|k| ExtFieldConfig::new(*k)).collect();
        self
    }

    pub fn with_rescind_org_blockers(mut self, reasons: &[&str]) -> Self {
        self.rescind_org_blockers = reasons.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn failing(mut self, op: StoreOp, err: FactError) -> Self {
        self.failures.insert(op, err);
        self
    }

    /// Number of store calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Dates `target_event` was queried at.
    pub fn target_queries(&self) -> Vec<NaiveDate> {
        self.target_queries.lock().unwrap().clone()
    }

    /// Dates the other dated facts were queried at, in call order.
    pub fn fact_queries(&self) -> Vec<(StoreOp, NaiveDate)> {
        self.fact_queries.lock().unwrap().clone()
    }

    fn enter(&self, op: StoreOp) -> Result<(), FactError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failures.get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl OrgDirectory for InMemoryStore {
    async fn resolve_org_id(&self, _tenant: &str, org_code: &str) -> Result<OrgId, FactError> {
        self.enter(StoreOp::ResolveOrg)?;
        self.orgs.get(org_code).copied().ok_or(FactError::NotFound)
    }
}

#[async_trait]
impl TemporalFacts for InMemoryStore {
    async fn target_event(
        &self,
        _tenant: &str,
        org_id: OrgId,
        as_of: NaiveDate,
    ) -> Result<MutationTargetEvent, FactError> {
        self.enter(StoreOp::TargetEvent)?;
        self.target_queries.lock().unwrap().push(as_of);
        Ok(self.targets.get(&org_id).cloned().unwrap_or_default())
    }

    async fn tree_initialized(&self, _tenant: &str) -> Result<bool, FactError> {
        self.enter(StoreOp::TreeInitialized)?;
        Ok(self.tree_initialized)
    }

    async fn enabled_ext_fields(
        &self,
        _tenant: &str,
        as_of: NaiveDate,
    ) -> Result<Vec<ExtFieldConfig>, FactError> {
        self.enter(StoreOp::ExtFields)?;
        self.fact_queries.lock().unwrap().push((StoreOp::ExtFields, as_of));
        Ok(self.ext_fields.clone())
    }

    async fn rescind_org_deny_reasons(
        &self,
        _tenant: &str,
        _org_id: OrgId,
        _as_of: NaiveDate,
    ) -> Result<Vec<String>, FactError> {
        self.enter(StoreOp::RescindOrgBlockers)?;
        Ok(self.rescind_org_blockers.clone())
    }

    async fn is_root(
        &self,
        _tenant: &str,
        org_id: OrgId,
        as_of: NaiveDate,
    ) -> Result<bool, FactError> {
        self.enter(StoreOp::IsRoot)?;
        self.fact_queries.lock().unwrap().push((StoreOp::IsRoot, as_of));
        Ok(self.roots.contains(&org_id))
    }
}

// ---------------------------------------------------------------------------
// Scripted resolvers
// ---------------------------------------------------------------------------

type ActionRule =
    Box<dyn Fn(&ActionKey, &PolicyFacts) -> Result<CapabilityDecision, ResolverError> + Send + Sync>;

/// Action resolver driven by a closure; records every call.
pub struct ScriptedResolver {
    rule: ActionRule,
    seen: Mutex<Vec<(ActionKey, PolicyFacts)>>,
}

impl ScriptedResolver {
    pub fn new(
        rule: impl Fn(&ActionKey, &PolicyFacts) -> Result<CapabilityDecision, ResolverError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            rule: Box::new(rule),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Allows everything. Status corrections may pick either status.
    pub fn allow_all() -> Self {
        Self::new(|key, _| {
            let decision = CapabilityDecision::allow(Vec::new());
            Ok(if key.action_kind == ActionKind::CorrectStatus {
                decision.with_target_statuses(vec![TargetStatus::Active, TargetStatus::Disabled])
            } else {
                decision
            })
        })
    }

    /// Denies non-admins, leaking fields to exercise fail-closed output.
    pub fn admin_only() -> Self {
        Self::new(|_, facts| {
            if facts.can_admin {
                Ok(CapabilityDecision::allow(Vec::new()))
            } else {
                Ok(CapabilityDecision {
                    enabled: false,
                    allowed_fields: vec!["name".into()],
                    field_payload_keys: [("name".to_string(), "name".to_string())].into(),
                    deny_reasons: vec!["ORG_ADMIN_REQUIRED".into()],
                    allowed_target_statuses: vec![TargetStatus::Active],
                })
            }
        })
    }

    pub fn failing() -> Self {
        Self::new(|_, _| Err(ResolverError("rule table unavailable".into())))
    }

    pub fn seen(&self) -> Vec<(ActionKey, PolicyFacts)> {
        self.seen.lock().unwrap().clone()
    }

    pub fn seen_kinds(&self) -> Vec<ActionKind> {
        self.seen().into_iter().map(|(key, _)| key.action_kind).collect()
    }

    pub fn facts_for(&self, kind: ActionKind) -> PolicyFacts {
        self.seen()
            .into_iter()
            .find(|(key, _)| key.action_kind == kind)
            .map(|(_, facts)| facts)
            .unwrap_or_else(|| panic!("resolver never asked about {kind}"))
    }
}

impl PolicyResolver for ScriptedResolver {
    fn resolve(
        &self,
        action: &ActionKey,
        facts: &PolicyFacts,
    ) -> Result<CapabilityDecision, ResolverError> {
        self.seen
            .lock()
            .unwrap()
            .push((action.clone(), facts.clone()));
        (self.rule)(action, facts)
    }
}

type IntentRule = Box<
    dyn Fn(WriteIntent, &PolicyFacts) -> Result<CapabilityDecision, ResolverError> + Send + Sync,
>;

/// Write-intent resolver driven by a closure; records every call.
pub struct ScriptedWriteResolver {
    rule: IntentRule,
    seen: Mutex<Vec<(WriteIntent, PolicyFacts)>>,
}

impl ScriptedWriteResolver {
    pub fn new(
        rule: impl Fn(WriteIntent, &PolicyFacts) -> Result<CapabilityDecision, ResolverError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            rule: Box::new(rule),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn allow_all() -> Self {
        Self::new(|_, _| Ok(CapabilityDecision::allow(vec!["name".into()])))
    }

    pub fn admin_only() -> Self {
        Self::new(|_, facts| {
            if facts.can_admin {
                Ok(CapabilityDecision::allow(vec!["name".into()]))
            } else {
                Ok(CapabilityDecision {
                    enabled: false,
                    allowed_fields: vec!["name".into()],
                    deny_reasons: vec!["ORG_ADMIN_REQUIRED".into(), "FORBIDDEN".into()],
                    ..Default::default()
                })
            }
        })
    }

    pub fn failing() -> Self {
        Self::new(|_, _| Err(ResolverError("rule table unavailable".into())))
    }

    pub fn seen(&self) -> Vec<(WriteIntent, PolicyFacts)> {
        self.seen.lock().unwrap().clone()
    }

    pub fn last_facts(&self) -> PolicyFacts {
        self.seen()
            .pop()
            .map(|(_, facts)| facts)
            .expect("write resolver was never called")
    }
}

impl WriteCapabilityResolver for ScriptedWriteResolver {
    fn resolve(
        &self,
        intent: WriteIntent,
        facts: &PolicyFacts,
    ) -> Result<CapabilityDecision, ResolverError> {
        self.seen.lock().unwrap().push((intent, facts.clone()));
        (self.rule)(intent, facts)
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub policy: Arc<ScriptedResolver>,
    pub write_policy: Arc<ScriptedWriteResolver>,
    pub clock: Arc<FixedClock>,
    pub runtime: Arc<PolicyActivationRuntime>,
    pub orchestrator: CapabilityOrchestrator,
}

impl Harness {
    pub fn new(store: InMemoryStore) -> Self {
        Self::with_resolvers(
            store,
            ScriptedResolver::allow_all(),
            ScriptedWriteResolver::allow_all(),
        )
    }

    pub fn with_resolvers(
        store: InMemoryStore,
        policy: ScriptedResolver,
        write_policy: ScriptedWriteResolver,
    ) -> Self {
        Self::build(store, CapabilityRegistry::builtin(), policy, write_policy)
    }

    pub fn build(
        store: InMemoryStore,
        registry: CapabilityRegistry,
        policy: ScriptedResolver,
        write_policy: ScriptedWriteResolver,
    ) -> Self {
        // After the migration window closes.
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 5, 15, 9, 0, 0).unwrap(),
        ));
        let runtime = Arc::new(PolicyActivationRuntime::new(registry, clock.clone()));
        let store = Arc::new(store);
        let policy = Arc::new(policy);
        let write_policy = Arc::new(write_policy);
        let orchestrator = CapabilityOrchestrator::new(
            runtime.clone(),
            store.clone(),
            store.clone(),
            policy.clone(),
            write_policy.clone(),
        );
        Self {
            store,
            policy,
            write_policy,
            clock,
            runtime,
            orchestrator,
        }
    }
}
