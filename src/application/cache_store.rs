//! Domain cache store.
//!
//! The one shared mutable resource: every domain collection lives here and
//! every write goes through the store's actions.
//!
//! # Ordering
//!
//! Each domain has a monotonically increasing fetch sequence number. A
//! fetch result is applied only if its number is still the latest issued
//! for that domain and the session generation has not moved since it was
//! issued (last-issued-wins, not last-completed-wins). Resetting the store
//! advances every sequence, so nothing in flight survives a logout.
//!
//! # Mutations
//!
//! A successful mutation splices the server-returned record locally, then
//! refetches the domains its invalidation edge lists, concurrently and once
//! each. A failed mutation changes nothing and refetches nothing.

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

use super::gateway::{ApiCall, ApiGateway};
use super::routes::{crud_mutation, fetch_path, mutation_route, CrudOp, LocalEffect};
use super::session_context::SessionContext;
use crate::domain::catalog::{
    refetch_set, DomainCollection, DomainKind, MutationKind, Notification, Record, WashedPatch,
};
use crate::domain::foundation::{RecordId, Timestamp, ValidationError};
use crate::domain::session::SessionEvent;
use crate::ports::{ApiError, SessionListener};

/// Domains refetched after the principal switches into or out of an overlay.
const OVERLAY_REFETCH: [DomainKind; 2] = [DomainKind::Wardrobe, DomainKind::Notifications];

/// What became of a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The collection was replaced with `count` records.
    Applied { count: usize },
    /// A newer fetch or a session change superseded this one.
    Discarded,
}

/// Errors raised by store actions
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{op} is not supported for {domain}")]
    Unsupported { domain: DomainKind, op: CrudOp },

    #[error("{mutation:?} requires a record id")]
    MissingId { mutation: MutationKind },

    #[error("no trip selected for the packing list")]
    NoActiveTrip,

    #[error("unexpected {context} response: {source}")]
    InvalidResponse {
        context: String,
        #[source]
        source: ValidationError,
    },
}

impl StoreError {
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            StoreError::Api(e) => Some(e),
            _ => None,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            StoreError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }

    fn invalid(context: impl Into<String>, source: ValidationError) -> Self {
        StoreError::InvalidResponse {
            context: context.into(),
            source,
        }
    }
}

struct CacheState {
    collections: HashMap<DomainKind, DomainCollection>,
    fetch_seq: HashMap<DomainKind, u64>,
    active_trip: Option<RecordId>,
    current_outfit: Option<Value>,
    profile: Option<Value>,
}

impl CacheState {
    fn new() -> Self {
        Self {
            collections: DomainKind::ALL
                .iter()
                .map(|d| (*d, DomainCollection::new()))
                .collect(),
            fetch_seq: HashMap::new(),
            active_trip: None,
            current_outfit: None,
            profile: None,
        }
    }

    fn collection_mut(&mut self, domain: DomainKind) -> &mut DomainCollection {
        self.collections.entry(domain).or_default()
    }

    fn latest_seq(&self, domain: DomainKind) -> u64 {
        self.fetch_seq.get(&domain).copied().unwrap_or(0)
    }

    fn next_seq(&mut self, domain: DomainKind) -> u64 {
        let seq = self.fetch_seq.entry(domain).or_insert(0);
        *seq += 1;
        *seq
    }

    fn reset(&mut self) {
        for collection in self.collections.values_mut() {
            collection.reset();
        }
        for domain in DomainKind::ALL {
            self.next_seq(domain);
        }
        self.active_trip = None;
        self.current_outfit = None;
        self.profile = None;
    }

    fn apply(
        &mut self,
        effect: LocalEffect,
        record: Option<Record>,
        target: Option<&RecordId>,
        washed: &[RecordId],
    ) {
        match effect {
            LocalEffect::Upsert(domain) => {
                if let Some(record) = record {
                    self.collection_mut(domain).upsert(record);
                }
            }
            LocalEffect::Prepend(domain) => {
                if let Some(record) = record {
                    self.collection_mut(domain).prepend(record);
                }
            }
            LocalEffect::Remove(domain) => {
                if let Some(id) = target {
                    self.collection_mut(domain).remove(id);
                }
            }
            LocalEffect::Clear(domain) => self.collection_mut(domain).replace(Vec::new()),
            LocalEffect::PatchWashed => {
                let patch = WashedPatch::at(Timestamp::now());
                let wardrobe = self.collection_mut(DomainKind::Wardrobe);
                for id in washed {
                    if let Some(item) = wardrobe.get_mut(id) {
                        patch.apply(item);
                    }
                }
            }
            LocalEffect::MarkAllRead => {
                for notification in self.collection_mut(DomainKind::Notifications).iter_mut() {
                    notification.set("is_read", json!(true));
                }
            }
            LocalEffect::Nothing => {}
        }
    }
}

/// Per-domain collections, mutation actions and the invalidation cascade.
pub struct DomainCacheStore {
    gateway: Arc<ApiGateway>,
    state: RwLock<CacheState>,
    revision: watch::Sender<u64>,
}

impl DomainCacheStore {
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            gateway,
            state: RwLock::new(CacheState::new()),
            revision,
        }
    }

    fn session(&self) -> &Arc<SessionContext> {
        self.gateway.session()
    }

    fn touch(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    /// Receiver that changes whenever any collection changes.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    // ════════════════════════════════════════════════════════════════
    // Fetching
    // ════════════════════════════════════════════════════════════════

    /// Replaces a domain's collection with the server's view.
    ///
    /// On failure the existing items stay and `last_error` is set.
    ///
    /// # Errors
    ///
    /// `StoreError::NoActiveTrip` for the packing list with no trip
    /// selected, otherwise the gateway error or an invalid payload.
    pub async fn fetch(&self, domain: DomainKind) -> Result<FetchOutcome, StoreError> {
        let generation = self.session().generation().await;
        let (seq, path) = {
            let mut state = self.state.write().await;
            let path =
                fetch_path(domain, state.active_trip.as_ref()).ok_or(StoreError::NoActiveTrip)?;
            let seq = state.next_seq(domain);
            state.collection_mut(domain).mark_loading();
            (seq, path)
        };
        self.touch();
        debug!(%domain, seq, "Fetch issued");

        let result = self.gateway.get(&path).await;
        let current_generation = self.session().generation().await;

        let mut state = self.state.write().await;
        let latest = state.latest_seq(domain);
        if latest != seq {
            debug!(%domain, seq, latest, "Superseded fetch discarded");
            return Ok(FetchOutcome::Discarded);
        }
        if current_generation != generation {
            debug!(%domain, seq, "Fetch from a previous session discarded");
            state.collection_mut(domain).finish_loading();
            drop(state);
            self.touch();
            return Ok(FetchOutcome::Discarded);
        }

        let records = result
            .map_err(StoreError::from)
            .and_then(|body| {
                domain
                    .extract_records(body)
                    .map_err(|e| StoreError::invalid(domain.slug(), e))
            });

        let outcome = match records {
            Ok(records) => {
                let count = records.len();
                state.collection_mut(domain).replace(records);
                debug!(%domain, seq, count, "Fetch applied");
                Ok(FetchOutcome::Applied { count })
            }
            Err(e) => {
                warn!(%domain, seq, error = %e, "Fetch failed, keeping cached items");
                state.collection_mut(domain).record_error(e.user_message());
                Err(e)
            }
        };
        drop(state);
        self.touch();
        outcome
    }

    /// Fetches several domains concurrently.
    pub async fn fetch_many(
        &self,
        domains: &[DomainKind],
    ) -> Vec<Result<FetchOutcome, StoreError>> {
        join_all(domains.iter().map(|domain| self.fetch(*domain))).await
    }

    async fn cascade(&self, mutation: MutationKind) {
        let domains = refetch_set(mutation);
        if domains.is_empty() {
            return;
        }
        debug!(?mutation, ?domains, "Cascading refetch");
        for (domain, result) in domains.iter().zip(self.fetch_many(domains).await) {
            if let Err(e) = result {
                warn!(%domain, ?mutation, error = %e, "Cascaded fetch failed");
            }
        }
    }

    // ════════════════════════════════════════════════════════════════
    // Mutations
    // ════════════════════════════════════════════════════════════════

    /// Performs `mutation` against `target` with an optional JSON body.
    ///
    /// Returns the record the server sent back, if the route returns one.
    pub async fn perform(
        &self,
        mutation: MutationKind,
        target: Option<&RecordId>,
        body: Option<Value>,
    ) -> Result<Option<Record>, StoreError> {
        let route = mutation_route(mutation);
        let path = route
            .path(target)
            .ok_or(StoreError::MissingId { mutation })?;
        let washed: Vec<RecordId> = match (&route.effect, &body) {
            (LocalEffect::PatchWashed, Some(body)) => body
                .get("item_ids")
                .and_then(Value::as_array)
                .map(|ids| ids.iter().filter_map(RecordId::from_json).collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        let generation = self.session().generation().await;
        let mut call = ApiCall::new(route.method.clone(), path);
        call.body = body;

        let result = self
            .gateway
            .send(call)
            .await
            .map_err(StoreError::from)
            .and_then(|response| {
                route
                    .response
                    .extract(response)
                    .map_err(|e| StoreError::invalid(format!("{:?}", mutation), e))
            });

        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!(?mutation, error = %e, "Mutation failed");
                if let Some(domain) = route.effect.domain() {
                    if self.session().generation().await == generation {
                        let mut state = self.state.write().await;
                        state.collection_mut(domain).record_error(e.user_message());
                        drop(state);
                        self.touch();
                    }
                }
                return Err(e);
            }
        };

        if self.session().generation().await != generation {
            debug!(?mutation, "Session changed during mutation, skipping local update");
            return Ok(record);
        }

        {
            let mut state = self.state.write().await;
            if let Some(domain) = route.effect.domain() {
                state.collection_mut(domain).clear_error();
            }
            state.apply(route.effect, record.clone(), target, &washed);
        }
        self.touch();
        info!(?mutation, target = ?target.map(RecordId::as_str), "Mutation applied");

        self.cascade(mutation).await;
        Ok(record)
    }

    async fn crud(
        &self,
        domain: DomainKind,
        op: CrudOp,
        target: Option<&RecordId>,
        body: Option<Value>,
    ) -> Result<Option<Record>, StoreError> {
        let mutation = crud_mutation(domain, op).ok_or(StoreError::Unsupported { domain, op })?;
        self.perform(mutation, target, body).await
    }

    fn returned(domain: DomainKind, record: Option<Record>) -> Result<Record, StoreError> {
        record.ok_or_else(|| {
            StoreError::invalid(domain.slug(), ValidationError::empty_field("record"))
        })
    }

    /// Creates a record and splices the server's copy into `domain`.
    pub async fn create(&self, domain: DomainKind, data: Value) -> Result<Record, StoreError> {
        let record = self.crud(domain, CrudOp::Create, None, Some(data)).await?;
        Self::returned(domain, record)
    }

    /// Updates a record in place.
    pub async fn update(
        &self,
        domain: DomainKind,
        id: &RecordId,
        data: Value,
    ) -> Result<Record, StoreError> {
        let record = self.crud(domain, CrudOp::Update, Some(id), Some(data)).await?;
        Self::returned(domain, record)
    }

    /// Deletes a record; it is removed locally once the server confirms.
    pub async fn delete(&self, domain: DomainKind, id: &RecordId) -> Result<(), StoreError> {
        self.crud(domain, CrudOp::Delete, Some(id), None).await?;
        Ok(())
    }

    /// Flips the domain's toggle (clean state, packed state, read state).
    pub async fn toggle(&self, domain: DomainKind, id: &RecordId) -> Result<Record, StoreError> {
        let record = self.crud(domain, CrudOp::Toggle, Some(id), None).await?;
        Self::returned(domain, record)
    }

    pub async fn mark_items_washed(&self, ids: &[RecordId]) -> Result<(), StoreError> {
        let body = json!({ "item_ids": ids });
        self.perform(MutationKind::ItemsMarkedWashed, None, Some(body)).await?;
        Ok(())
    }

    pub async fn toggle_laundry_status(&self, id: &RecordId) -> Result<Record, StoreError> {
        let record = self.perform(MutationKind::LaundryStatusToggled, Some(id), None).await?;
        Self::returned(DomainKind::Wardrobe, record)
    }

    /// Saves an outfit; it goes to the front of the history.
    pub async fn save_outfit(&self, outfit: Value) -> Result<Record, StoreError> {
        let record = self.perform(MutationKind::OutfitSaved, None, Some(outfit)).await?;
        Self::returned(DomainKind::OutfitHistory, record)
    }

    /// Clears the AI outfit history.
    pub async fn reset_ai_history(&self) -> Result<(), StoreError> {
        self.perform(MutationKind::AiHistoryReset, None, None).await?;
        Ok(())
    }

    pub async fn complete_trip(&self, id: &RecordId) -> Result<(), StoreError> {
        self.perform(MutationKind::TripCompleted, Some(id), None).await?;
        Ok(())
    }

    pub async fn mark_all_notifications_read(&self) -> Result<(), StoreError> {
        self.perform(MutationKind::AllNotificationsRead, None, None).await?;
        Ok(())
    }

    // ════════════════════════════════════════════════════════════════
    // Other state
    // ════════════════════════════════════════════════════════════════

    /// Asks for an outfit suggestion and keeps it as the current outfit.
    pub async fn generate_outfit(&self, mood: &str) -> Result<Value, StoreError> {
        let outfit = self.gateway.post("/get-outfit", json!({ "mood": mood })).await?;
        self.state.write().await.current_outfit = Some(outfit.clone());
        self.touch();
        Ok(outfit)
    }

    /// Refreshes the cached profile.
    pub async fn fetch_profile(&self) -> Result<Value, StoreError> {
        let generation = self.session().generation().await;
        let profile = self.gateway.get("/profile").await?;
        if self.session().generation().await == generation {
            self.state.write().await.profile = Some(profile.clone());
            self.touch();
        }
        Ok(profile)
    }

    /// Selects the trip whose packing list is cached and fetches it.
    pub async fn open_packing_list(&self, trip_id: RecordId) -> Result<FetchOutcome, StoreError> {
        {
            let mut state = self.state.write().await;
            if state.active_trip.as_ref() != Some(&trip_id) {
                state.collection_mut(DomainKind::PackingList).reset();
            }
            state.active_trip = Some(trip_id);
        }
        self.fetch(DomainKind::PackingList).await
    }

    /// Optimistically places a pushed notification first in the list.
    pub async fn push_notification(&self, notification: Notification) -> Result<(), StoreError> {
        let record = Record::try_from(notification).map_err(|e| {
            StoreError::invalid(
                DomainKind::Notifications.slug(),
                ValidationError::invalid_format("notification", e.to_string()),
            )
        })?;
        self.state
            .write()
            .await
            .collection_mut(DomainKind::Notifications)
            .prepend(record);
        self.touch();
        Ok(())
    }

    /// Empties every collection and supersedes every in-flight fetch.
    pub async fn reset(&self) {
        self.state.write().await.reset();
        self.touch();
        info!("Cache reset");
    }

    // ════════════════════════════════════════════════════════════════
    // Reads
    // ════════════════════════════════════════════════════════════════

    pub async fn collection(&self, domain: DomainKind) -> DomainCollection {
        self.state
            .read()
            .await
            .collections
            .get(&domain)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn records(&self, domain: DomainKind) -> Vec<Record> {
        self.state
            .read()
            .await
            .collections
            .get(&domain)
            .map(DomainCollection::to_vec)
            .unwrap_or_default()
    }

    pub async fn unread_notification_count(&self) -> usize {
        let state = self.state.read().await;
        state
            .collections
            .get(&DomainKind::Notifications)
            .map(|c| {
                c.iter()
                    .filter(|n| !n.get("is_read").and_then(Value::as_bool).unwrap_or(false))
                    .count()
            })
            .unwrap_or(0)
    }

    pub async fn current_outfit(&self) -> Option<Value> {
        self.state.read().await.current_outfit.clone()
    }

    pub async fn profile(&self) -> Option<Value> {
        self.state.read().await.profile.clone()
    }

    pub async fn active_trip(&self) -> Option<RecordId> {
        self.state.read().await.active_trip.clone()
    }
}

#[async_trait]
impl SessionListener for DomainCacheStore {
    async fn on_session_event(&self, event: &SessionEvent) {
        if !event.invalidates_cache() {
            return;
        }
        self.reset().await;

        if matches!(
            event,
            SessionEvent::OverlayStarted { .. } | SessionEvent::OverlayStopped { .. }
        ) {
            let results = self.fetch_many(&OVERLAY_REFETCH).await;
            for (domain, result) in OVERLAY_REFETCH.iter().zip(results) {
                if let Err(e) = result {
                    warn!(%domain, event = event.name(), error = %e, "Refetch after principal switch failed");
                }
            }
        }
    }
}
