//! Generic CRUD manager: the state behind one admin resource page.
//!
//! The manager holds the authoritative client-side list for a session, derives
//! the filtered view and status counts from it, and drives the create/edit
//! modal. Every successful mutation is followed by a full `list()` refetch;
//! the cache is never patched locally, so what is shown always matches what
//! the backend last returned.

pub mod filter;
pub mod prompt;

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::ApiError;
use crate::resource::{CrudService, Resource};

pub use filter::{visible, StatusCounts, StatusFilter};
pub use prompt::{AssumeYes, Prompter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Create,
    Edit(String),
}

/// `Loading` until the first list settles; every other variant is a
/// sub-state of "ready".
#[derive(Debug, Clone, PartialEq)]
pub enum ManagerState<D> {
    Loading,
    Idle,
    ModalOpen { mode: Mode, draft: D },
    Submitting { mode: Mode },
    Deleting { id: String },
}

impl<D> ManagerState<D> {
    pub fn is_modal_open(&self) -> bool {
        matches!(self, Self::ModalOpen { .. })
    }
}

/// Result of an action gated by the operator or by the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Cancelled,
}

pub struct Manager<R: Resource, S> {
    service: S,
    prompter: Arc<dyn Prompter>,
    records: Vec<R::Record>,
    filter: StatusFilter<R::Status>,
    state: ManagerState<R::Draft>,
}

impl<R, S> Manager<R, S>
where
    R: Resource,
    S: CrudService<R>,
{
    pub fn new(service: S, prompter: Arc<dyn Prompter>) -> Self {
        Self {
            service,
            prompter,
            records: Vec::new(),
            filter: StatusFilter::All,
            state: ManagerState::Loading,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn state(&self) -> &ManagerState<R::Draft> {
        &self.state
    }

    pub fn records(&self) -> &[R::Record] {
        &self.records
    }

    pub fn find(&self, id: &str) -> Option<&R::Record> {
        self.records.iter().find(|r| R::id(r) == id)
    }

    pub fn filter(&self) -> StatusFilter<R::Status> {
        self.filter
    }

    pub fn visible(&self) -> Vec<&R::Record> {
        visible::<R>(&self.records, &self.filter)
    }

    pub fn counts(&self) -> StatusCounts<R::Status> {
        StatusCounts::tally::<R>(&self.records)
    }

    /// Initial load. On failure the error is acknowledged and the manager
    /// settles in `Idle` with an empty cache; there is no automatic retry.
    pub async fn mount(&mut self) -> Result<(), ApiError> {
        self.state = ManagerState::Loading;
        self.filter = StatusFilter::All;
        self.records.clear();

        let result = self.service.list().await;
        self.state = ManagerState::Idle;
        match result {
            Ok(records) => {
                info!("Loaded {} {}", records.len(), R::PLURAL);
                self.records = records;
                Ok(())
            }
            Err(err) => {
                self.report(&format!("Failed to load {}", R::PLURAL), &err);
                Err(err)
            }
        }
    }

    /// Full refetch after a mutation. A failed refetch keeps the last list.
    async fn reload(&mut self) {
        match self.service.list().await {
            Ok(records) => {
                debug!("Refetched {} {}", records.len(), R::PLURAL);
                self.records = records;
            }
            Err(err) => self.report(&format!("Failed to load {}", R::PLURAL), &err),
        }
    }

    fn report(&self, context: &str, err: &ApiError) {
        error!("{}: {}", context, err);
        self.prompter
            .acknowledge(&format!("{}: {}", context, err.user_message()));
    }

    pub fn set_filter(&mut self, filter: StatusFilter<R::Status>) {
        self.filter = filter;
    }

    pub fn open_create(&mut self) {
        self.state = ManagerState::ModalOpen {
            mode: Mode::Create,
            draft: R::Draft::default(),
        };
    }

    /// Open the edit modal for a cached record. Returns `false` if the id is
    /// not in the cache.
    pub fn open_edit(&mut self, id: &str) -> bool {
        let Some(record) = self.find(id) else {
            warn!("No {} with id {} in the current list", R::NAME, id);
            return false;
        };
        let draft = R::Draft::from(record);
        self.state = ManagerState::ModalOpen {
            mode: Mode::Edit(id.to_string()),
            draft,
        };
        true
    }

    pub fn draft(&self) -> Option<&R::Draft> {
        match &self.state {
            ManagerState::ModalOpen { draft, .. } => Some(draft),
            _ => None,
        }
    }

    pub fn draft_mut(&mut self) -> Option<&mut R::Draft> {
        match &mut self.state {
            ManagerState::ModalOpen { draft, .. } => Some(draft),
            _ => None,
        }
    }

    /// Close the modal and discard the draft.
    pub fn cancel(&mut self) {
        if self.state.is_modal_open() {
            self.state = ManagerState::Idle;
        }
    }

    /// Submit the open draft: `create` or `update` by mode, then refetch.
    ///
    /// On failure the modal stays open with the draft intact so the operator
    /// can correct it, and the cache is untouched.
    pub async fn submit(&mut self) -> Result<Outcome, ApiError> {
        let (mode, draft) = match std::mem::replace(&mut self.state, ManagerState::Idle) {
            ManagerState::ModalOpen { mode, draft } => (mode, draft),
            other => {
                warn!("Submit without an open {} form", R::NAME);
                self.state = other;
                return Ok(Outcome::Cancelled);
            }
        };

        self.state = ManagerState::Submitting { mode: mode.clone() };
        let result = match &mode {
            Mode::Create => self.service.create(&draft).await,
            Mode::Edit(id) => {
                let patch = R::Patch::from(draft.clone());
                self.service.update(id, &patch).await
            }
        };

        match result {
            Ok(saved) => {
                let verb = if mode == Mode::Create { "created" } else { "updated" };
                info!("{} {} {}", R::NAME, R::id(&saved), verb);
                self.state = ManagerState::Idle;
                self.prompter
                    .acknowledge(&format!("{} {} successfully!", title(R::NAME), verb));
                self.reload().await;
                Ok(Outcome::Applied)
            }
            Err(err) => {
                self.state = ManagerState::ModalOpen { mode, draft };
                self.report(&format!("Failed to save {}", R::NAME), &err);
                Err(err)
            }
        }
    }

    /// Delete behind a blocking confirmation; refetch on success.
    pub async fn request_delete(&mut self, id: &str) -> Result<Outcome, ApiError> {
        let question = format!("Are you sure you want to delete this {}?", R::NAME);
        if !self.prompter.confirm(&question) {
            debug!("Delete of {} {} cancelled", R::NAME, id);
            return Ok(Outcome::Cancelled);
        }

        let previous = std::mem::replace(
            &mut self.state,
            ManagerState::Deleting { id: id.to_string() },
        );
        let result = self.service.delete(id).await;
        self.state = match previous {
            ManagerState::Loading => ManagerState::Idle,
            other => other,
        };

        match result {
            Ok(()) => {
                info!("{} {} deleted", R::NAME, id);
                self.prompter
                    .acknowledge(&format!("{} deleted successfully!", title(R::NAME)));
                self.reload().await;
                Ok(Outcome::Applied)
            }
            Err(err) => {
                self.report(&format!("Failed to delete {}", R::NAME), &err);
                Err(err)
            }
        }
    }

    /// Quick status change (approve/reject and friends): confirm, send a
    /// status-only update, refetch.
    pub async fn transition(&mut self, id: &str, status: R::Status) -> Result<Outcome, ApiError> {
        let Some(record) = self.find(id) else {
            warn!("No {} with id {} in the current list", R::NAME, id);
            return Ok(Outcome::Cancelled);
        };
        let question = R::transition_prompt(record, status);
        let label = R::label(record);

        if !self.prompter.confirm(&question) {
            return Ok(Outcome::Cancelled);
        }

        let mode = Mode::Edit(id.to_string());
        let previous = std::mem::replace(&mut self.state, ManagerState::Submitting { mode });
        let result = self.service.update(id, &R::status_patch(status)).await;
        self.state = previous;

        match result {
            Ok(_) => {
                info!("{} {} -> {}", R::NAME, id, status);
                self.prompter
                    .acknowledge(&format!("{} from {} marked {}", title(R::NAME), label, status));
                self.reload().await;
                Ok(Outcome::Applied)
            }
            Err(err) => {
                self.report(&format!("Failed to update {}", R::NAME), &err);
                Err(err)
            }
        }
    }
}

fn title(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
