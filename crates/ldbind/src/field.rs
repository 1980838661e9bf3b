//! The field controller: a headless bound field.
//!
//! A [`Field`] resolves its property on mount, holds an [`EditSession`] seeded
//! from the resolved value, and persists edits through a [`SaveCoordinator`]
//! when committed. The host drives it with input and commit events.
//!
//! Commits are serialized per field. A commit requested while a save is in
//! flight is queued (at most one), and the queued commit runs against the
//! then-current value once the in-flight save completes.
//!
//! # Example
//!
//! ```rust
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! use std::sync::Arc;
//! use ldbind::{Callbacks, CommitOutcome, Contexts, DataType, Dataset, DatasetContext, Field, FieldConfig, MemoryStore, Node, PropertyId};
//!
//! let mut node = Node::new("https://pod.example/card#me");
//! node.set_string(PropertyId::from("http://schema.org/name"), "Alice");
//! let ctx = DatasetContext::new(Dataset::with_source("https://pod.example/card").with_node(node));
//!
//! let config = FieldConfig::new(DataType::String)
//!     .node_url("https://pod.example/card#me")
//!     .property("http://schema.org/name")
//!     .edit(true)
//!     .autosave(true);
//! let field = Field::mount(config, Contexts::with_dataset(ctx), Callbacks::none(), Arc::new(MemoryStore::new())).unwrap();
//!
//! field.input("Bob");
//! assert!(matches!(field.commit().await.unwrap(), CommitOutcome::Saved(_)));
//! assert_eq!(field.display_text(), "Bob");
//! # });
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{watch, Notify};
use tracing::{debug, warn};

use crate::codec::{to_field_text, FieldText};
use crate::config::FieldConfig;
use crate::context::{Contexts, DatasetContext, NodeContext};
use crate::error::{FieldError, ResolveError};
use crate::model::{Dataset, Node, PropertyId, TypedValue};
use crate::resolve::{resolve, resolve_all, reread};
use crate::save::{Callbacks, CommitResult, Liveness, LivenessToken, SaveCoordinator, SaveOutcome, SaveRequest};
use crate::session::{CommitDecision, EditSession, SessionState, SkipReason};
use crate::store::StoreClient;

/// Resolution status of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldStatus {
    /// The node is missing but the dataset is still being fetched.
    Loading,
    /// Bound to a property.
    Ready,
    /// Resolution failed and the error was routed to `on_error`.
    Error(ResolveError),
}

/// What a call to [`Field::commit`] did.
#[derive(Debug, Clone)]
pub enum CommitOutcome {
    /// Saved, re-fetched and published.
    Saved(SaveOutcome),
    /// The save failed; the typed value is kept.
    Failed,
    /// Nothing to persist.
    Skipped(SkipReason),
    /// A save is in flight; this commit runs once it completes.
    Queued,
    /// Accepted without persisting (autosave off).
    Local,
    /// The field has no resolved property.
    Unbound,
    /// The field was unmounted; the result was not applied to it.
    Discarded,
}

struct FieldState {
    status: FieldStatus,
    chosen: Option<PropertyId>,
    session: Option<EditSession>,
    node: Option<Arc<Node>>,
    /// Dataset owned by the field, when it is not following a dataset context.
    dataset: Option<Arc<Dataset>>,
    queued: bool,
}

struct FieldInner {
    config: FieldConfig,
    contexts: Contexts,
    callbacks: Callbacks,
    coordinator: SaveCoordinator,
    liveness: Liveness,
    mounted: LivenessToken,
    unmounted: Notify,
    state: Mutex<FieldState>,
}

/// Handle to a mounted field. Clones share the same field.
#[derive(Clone)]
pub struct Field {
    inner: Arc<FieldInner>,
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.state();
        f.debug_struct("Field")
            .field("data_type", &self.inner.config.data_type)
            .field("status", &st.status)
            .field("chosen", &st.chosen)
            .field("mounted", &self.inner.mounted.is_live())
            .finish()
    }
}

impl Field {
    /// Mounts a field and resolves its property.
    ///
    /// Resolution errors go to `on_error` and the field's status when an
    /// error callback is configured; otherwise they are returned. A missing
    /// node while the dataset context is loading yields [`FieldStatus::Loading`].
    pub fn mount(
        config: FieldConfig,
        contexts: Contexts,
        callbacks: Callbacks,
        store: Arc<dyn StoreClient>,
    ) -> Result<Field, FieldError> {
        let liveness = Liveness::new();
        let state = FieldState {
            status: FieldStatus::Loading,
            chosen: None,
            session: None,
            node: config.node.clone().map(Arc::new),
            dataset: config.dataset.clone().map(Arc::new),
            queued: false,
        };
        let field = Field {
            inner: Arc::new(FieldInner {
                mounted: liveness.token(),
                liveness,
                config,
                contexts,
                callbacks,
                coordinator: SaveCoordinator::new(store),
                unmounted: Notify::new(),
                state: Mutex::new(state),
            }),
        };

        let failure = {
            let mut st = field.state();
            match field.bind(&mut st) {
                Ok(()) => None,
                Err(e) => field.classify(&mut st, e),
            }
        };
        if let Some(e) = failure {
            field.report(e)?;
        }
        Ok(field)
    }

    fn state(&self) -> MutexGuard<'_, FieldState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_dataset(&self, st: &FieldState) -> Arc<Dataset> {
        st.dataset
            .clone()
            .or_else(|| self.inner.contexts.dataset.as_ref().map(DatasetContext::dataset))
            .unwrap_or_default()
    }

    fn lookup_node(&self, st: &FieldState, dataset: &Dataset) -> Option<Arc<Node>> {
        if self.inner.config.node.is_some() {
            return st.node.clone();
        }
        if let Some(node) = self.inner.contexts.node.as_ref().and_then(NodeContext::node) {
            return Some(node);
        }
        let url = self.inner.config.node_url.as_deref()?;
        dataset.get_node(url).cloned().map(Arc::new)
    }

    /// Resolves the property and starts a fresh session.
    fn bind(&self, st: &mut FieldState) -> Result<(), ResolveError> {
        let config = &self.inner.config;
        let dataset = self.current_dataset(st);
        let node = self.lookup_node(st, &dataset);
        let resolved = resolve(
            node.as_deref(),
            config.node_url.as_deref(),
            &config.candidates(),
            config.data_type,
            config.effective_locale(),
        )?;
        debug!(property = %resolved.chosen, data_type = %config.data_type, "field bound");
        st.session = Some(EditSession::new(config.data_type, resolved.value.as_ref(), config.host));
        st.chosen = Some(resolved.chosen);
        st.node = node;
        st.status = FieldStatus::Ready;
        Ok(())
    }

    /// Records a resolution error in the status. Returns it if it should be reported.
    fn classify(&self, st: &mut FieldState, err: ResolveError) -> Option<ResolveError> {
        if matches!(err, ResolveError::NodeNotFound { .. }) && self.inner.contexts.is_loading() {
            debug!(error = %err, "node not available yet, dataset still loading");
            st.status = FieldStatus::Loading;
            return None;
        }
        if st.status == FieldStatus::Error(err.clone()) {
            return None;
        }
        st.status = FieldStatus::Error(err.clone());
        Some(err)
    }

    fn report(&self, err: ResolveError) -> Result<(), FieldError> {
        let err = FieldError::from(err);
        match &self.inner.callbacks.on_error {
            Some(on_error) => {
                on_error(&err);
                Ok(())
            }
            None => Err(err),
        }
    }

    /// Whether [`unmount`](Self::unmount) has not been called.
    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.is_live()
    }

    /// Tears the field down. In-flight saves still publish to the contexts,
    /// but no longer touch this field or invoke its callbacks.
    pub fn unmount(&self) {
        if !self.is_mounted() {
            return;
        }
        self.inner.liveness.invalidate();
        self.inner.unmounted.notify_waiters();
        let mut st = self.state();
        st.session = None;
        st.queued = false;
        debug!("field unmounted");
    }

    pub fn config(&self) -> &FieldConfig {
        &self.inner.config
    }

    pub fn status(&self) -> FieldStatus {
        self.state().status.clone()
    }

    /// The property fixed at session start.
    pub fn chosen_property(&self) -> Option<PropertyId> {
        self.state().chosen.clone()
    }

    /// Whether the field renders in write mode.
    pub fn is_editable(&self) -> bool {
        self.inner.config.edit
    }

    pub fn session_state(&self) -> Option<SessionState> {
        self.state().session.as_ref().map(EditSession::state)
    }

    pub fn is_dirty(&self) -> bool {
        self.state().session.as_ref().is_some_and(EditSession::is_dirty)
    }

    /// The field text as currently typed.
    pub fn current(&self) -> Option<FieldText> {
        self.state().session.as_ref().map(|s| s.current().clone())
    }

    /// The last committed field text.
    pub fn initial(&self) -> Option<FieldText> {
        self.state().session.as_ref().map(|s| s.initial().clone())
    }

    /// What the field displays: the typed text, or empty when unbound.
    pub fn display_text(&self) -> String {
        self.state()
            .session
            .as_ref()
            .map(|s| s.current().as_text().to_string())
            .unwrap_or_default()
    }

    /// The date and time sub-fields, when datetimes are edited in two parts.
    pub fn datetime_parts(&self) -> Option<(String, String)> {
        let st = self.state();
        let session = st.session.as_ref()?;
        Some((session.date_part()?.to_string(), session.time_part()?.to_string()))
    }

    /// The stored value at the chosen property.
    pub fn value(&self) -> Option<TypedValue> {
        let st = self.state();
        let config = &self.inner.config;
        reread(st.node.as_deref()?, st.chosen.as_ref()?, config.data_type, config.effective_locale())
    }

    /// Every stored value at the chosen property, for read-only display.
    pub fn all_values(&self) -> Vec<TypedValue> {
        let st = self.state();
        let config = &self.inner.config;
        match (st.node.as_deref(), st.chosen.as_ref()) {
            (Some(node), Some(chosen)) => resolve_all(node, chosen, config.data_type, config.effective_locale()),
            _ => Vec::new(),
        }
    }

    fn edit_session(&self, f: impl FnOnce(&mut EditSession)) {
        if !self.inner.config.edit {
            debug!("ignoring input on read-only field");
            return;
        }
        if let Some(session) = self.state().session.as_mut() {
            f(session);
        }
    }

    /// Records raw input. Never persists.
    pub fn input(&self, raw: impl Into<String>) {
        let raw = raw.into();
        self.edit_session(|s| s.input(raw));
    }

    /// Sets a boolean field's toggle.
    pub fn set_checked(&self, checked: bool) {
        self.edit_session(|s| s.set_checked(checked));
    }

    /// Updates the date sub-field of a split datetime field.
    pub fn input_date_part(&self, date: impl Into<String>) {
        let date = date.into();
        self.edit_session(|s| s.input_date_part(date));
    }

    /// Updates the time sub-field of a split datetime field.
    pub fn input_time_part(&self, time: impl Into<String>) {
        let time = time.into();
        self.edit_session(|s| s.input_time_part(time));
    }

    /// Re-reads upstream after the node or dataset changed.
    ///
    /// A bound field re-reads its fixed property and re-seeds the session when
    /// the value changed. An unbound field retries resolution.
    pub fn refresh(&self) -> Result<(), FieldError> {
        if !self.is_mounted() {
            return Ok(());
        }
        let failure = {
            let mut guard = self.state();
            let st = &mut *guard;
            match st.chosen.clone() {
                Some(chosen) => {
                    self.reseed(st, &chosen);
                    None
                }
                None => match self.bind(st) {
                    Ok(()) => None,
                    Err(e) => self.classify(st, e),
                },
            }
        };
        match failure {
            Some(e) => self.report(e),
            None => Ok(()),
        }
    }

    fn reseed(&self, st: &mut FieldState, chosen: &PropertyId) {
        let config = &self.inner.config;
        let dataset = self.current_dataset(st);
        let Some(node) = self.lookup_node(st, &dataset) else {
            debug!(property = %chosen, "bound node no longer present upstream");
            return;
        };
        let value = reread(&node, chosen, config.data_type, config.effective_locale());
        st.node = Some(node);
        if let Some(session) = st.session.as_mut() {
            let text = to_field_text(config.data_type, value.as_ref(), &config.host);
            if session.initial() != &text && session.state() != SessionState::Saving {
                debug!(property = %chosen, value = text.as_text(), "upstream value changed, reseeding");
                session.reseed(value.as_ref());
            }
        }
    }

    /// Blur-equivalent: persists the edit if it is valid and dirty.
    ///
    /// Persistence failures are routed to `on_error` (or logged) and reported
    /// as [`CommitOutcome::Failed`]. A missing target location is returned as
    /// an error when no `on_error` is configured.
    pub async fn commit(&self) -> Result<CommitOutcome, FieldError> {
        let (mut outcome, mut queued) = self.commit_once().await?;
        while queued {
            debug!("running queued commit");
            (outcome, queued) = self.commit_once().await?;
        }
        Ok(outcome)
    }

    async fn commit_once(&self) -> Result<(CommitOutcome, bool), FieldError> {
        let token = self.inner.liveness.token();
        if !token.is_live() {
            return Ok((CommitOutcome::Discarded, false));
        }
        let config = &self.inner.config;

        let (value, chosen, node, dataset) = {
            let mut guard = self.state();
            let st = &mut *guard;
            // Node and dataset come from the same snapshot.
            let dataset = self.current_dataset(st);
            let node = self.lookup_node(st, &dataset).or_else(|| st.node.clone());
            let (Some(chosen), Some(node), Some(session)) = (st.chosen.clone(), node, st.session.as_mut()) else {
                return Ok((CommitOutcome::Unbound, false));
            };
            let value = match session.begin_commit() {
                CommitDecision::Skip(SkipReason::InFlight) => {
                    st.queued = true;
                    return Ok((CommitOutcome::Queued, false));
                }
                CommitDecision::Skip(reason) => return Ok((CommitOutcome::Skipped(reason), false)),
                CommitDecision::Save(value) => value,
            };
            if !config.autosave {
                session.accept_local();
                return Ok((CommitOutcome::Local, false));
            }
            (value, chosen, node, dataset)
        };

        let request = SaveRequest {
            node: &node,
            property: &chosen,
            data_type: config.data_type,
            value,
            dataset: &dataset,
            target: config.save_dataset_to.as_deref(),
            locale: config.effective_locale(),
        };
        let result = self
            .inner
            .coordinator
            .commit(request, &self.inner.contexts, &self.inner.callbacks, &token)
            .await;

        if !token.is_live() {
            debug!("discarding commit result for unmounted field");
            return result.map(|_| (CommitOutcome::Discarded, false));
        }

        let mut guard = self.state();
        let st = &mut *guard;
        let queued = std::mem::take(&mut st.queued);
        let saved = matches!(result, Ok(CommitResult::Saved(_)));
        if let Some(session) = st.session.as_mut() {
            session.finish_commit(saved);
        }
        match result {
            Ok(CommitResult::Saved(outcome)) => {
                st.node = Some(outcome.node.clone());
                if st.dataset.is_some() || self.inner.contexts.dataset.is_none() {
                    st.dataset = Some(outcome.dataset.clone());
                }
                Ok((CommitOutcome::Saved(outcome), queued))
            }
            Ok(CommitResult::Failed) => Ok((CommitOutcome::Failed, queued)),
            Err(e) => {
                if queued {
                    warn!("dropping queued commit after failed save");
                }
                Err(e)
            }
        }
    }

    /// Re-reads upstream whenever a context slot is replaced, until unmounted.
    pub async fn follow_contexts(&self) {
        let mut datasets = self.inner.contexts.dataset.as_ref().map(DatasetContext::subscribe);
        let mut nodes = self.inner.contexts.node.as_ref().map(NodeContext::subscribe);

        while datasets.is_some() || nodes.is_some() {
            let unmounted = self.inner.unmounted.notified();
            tokio::pin!(unmounted);
            unmounted.as_mut().enable();
            if !self.is_mounted() {
                break;
            }

            let wake = tokio::select! {
                _ = &mut unmounted => Wake::Unmounted,
                open = changed(&mut datasets) => Wake::Dataset(open),
                open = changed(&mut nodes) => Wake::Node(open),
            };
            match wake {
                Wake::Unmounted => break,
                Wake::Dataset(false) => datasets = None,
                Wake::Node(false) => nodes = None,
                Wake::Dataset(true) | Wake::Node(true) => {
                    if let Err(e) = self.refresh() {
                        warn!(error = %e, "refresh after context change failed");
                    }
                }
            }
        }
    }
}

enum Wake {
    Unmounted,
    Dataset(bool),
    Node(bool),
}

async fn changed<T>(rx: &mut Option<watch::Receiver<T>>) -> bool {
    match rx {
        Some(rx) => rx.changed().await.is_ok(),
        None => std::future::pending().await,
    }
}
