// Background Validator: price re-confirmation that never blocks the caller

use crate::api::FlightApi;
use crate::error::FlowError;
use crate::models::{FlightOffer, OfferKey, ValidationResult};
use crate::search::SearchParams;
use crate::session::Session;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationState {
    Pending,
    Validated(ValidationResult),
    Failed(FlowError),
    Abandoned,
}

impl ValidationState {
    pub fn is_pending(&self) -> bool {
        matches!(self, ValidationState::Pending)
    }

    pub fn result(&self) -> Option<&ValidationResult> {
        match self {
            ValidationState::Validated(result) => Some(result),
            _ => None,
        }
    }
}

// What the user selected: an offer, optionally priced at a brand tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selection {
    pub offer: OfferKey,
    pub brand: Option<String>,
}

impl Selection {
    pub fn of(offer: &FlightOffer) -> Self {
        Self {
            offer: offer.key.clone(),
            brand: offer.selected_brand.clone(),
        }
    }
}

// Shared view of one in-flight validation. Clones observe the same task.
#[derive(Debug, Clone)]
pub struct ValidationHandle {
    selection: Selection,
    state: watch::Receiver<ValidationState>,
    publisher: Arc<watch::Sender<ValidationState>>,
    abort: AbortHandle,
}

impl ValidationHandle {
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    // Snapshot of the validation; never waits.
    pub fn current(&self) -> ValidationState {
        self.state.borrow().clone()
    }

    // Waits for the in-flight task to resolve. Never starts another call.
    pub async fn wait(&self) -> ValidationState {
        let mut state = self.state.clone();
        loop {
            let snapshot = state.borrow_and_update().clone();
            if !snapshot.is_pending() {
                return snapshot;
            }
            if state.changed().await.is_err() {
                return ValidationState::Abandoned;
            }
        }
    }

    // Stops the task and marks the validation abandoned if it was still pending.
    pub fn abandon(&self) {
        self.abort.abort();
        let abandoned = self.publisher.send_if_modified(|state| {
            if state.is_pending() {
                *state = ValidationState::Abandoned;
                true
            } else {
                false
            }
        });
        if abandoned {
            debug!(offer = %self.selection.offer, "validation abandoned");
        }
    }
}

pub struct BackgroundValidator {
    api: Arc<dyn FlightApi>,
    session: Arc<Session>,
    current: Mutex<Option<ValidationHandle>>,
}

impl BackgroundValidator {
    pub fn new(api: Arc<dyn FlightApi>, session: Arc<Session>) -> Self {
        Self {
            api,
            session,
            current: Mutex::new(None),
        }
    }

    // Starts re-confirming `offer` and returns at once. Re-selecting the same
    // offer and brand while pending or validated returns the existing handle.
    // Must be called from within a tokio runtime.
    pub fn start(&self, offer: &FlightOffer, params: &SearchParams) -> ValidationHandle {
        let selection = Selection::of(offer);
        let mut current = self.current.lock();

        if let Some(existing) = current.as_ref() {
            if existing.selection == selection {
                match existing.current() {
                    ValidationState::Pending | ValidationState::Validated(_) => {
                        debug!(offer = %selection.offer, brand = ?selection.brand, "reusing validation");
                        return existing.clone();
                    }
                    ValidationState::Failed(_) | ValidationState::Abandoned => {}
                }
            } else {
                // A new selection supersedes whatever was running
                existing.abandon();
            }
        }

        let handle = self.spawn(offer.clone(), params.clone(), selection);
        *current = Some(handle.clone());
        handle
    }

    pub fn current(&self) -> Option<ValidationHandle> {
        self.current.lock().clone()
    }

    pub fn abandon(&self) {
        if let Some(handle) = self.current.lock().take() {
            handle.abandon();
        }
    }

    fn spawn(&self, offer: FlightOffer, params: SearchParams, selection: Selection) -> ValidationHandle {
        let (publisher, state) = watch::channel(ValidationState::Pending);
        let publisher = Arc::new(publisher);
        let task_publisher = Arc::clone(&publisher);
        let api = Arc::clone(&self.api);
        let session = Arc::clone(&self.session);

        info!(offer = %offer.key, brand = ?offer.selected_brand, "starting price validation");

        let task = tokio::spawn(async move {
            let start = Instant::now();
            let resolved = match api.validate(&session, &offer, &params).await {
                Ok(result) => {
                    info!(
                        offer = %offer.key,
                        search_total = offer.fare.total,
                        validated_total = result.validated_fare.total,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "price validated"
                    );
                    ValidationState::Validated(result)
                }
                Err(error) => {
                    warn!(
                        offer = %offer.key,
                        error = %error,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "price validation failed"
                    );
                    ValidationState::Failed(FlowError::validation(error))
                }
            };

            // Resolved exactly once; an abandoned validation stays abandoned
            task_publisher.send_if_modified(move |state| {
                if state.is_pending() {
                    *state = resolved;
                    true
                } else {
                    false
                }
            });
        });

        ValidationHandle {
            selection,
            state,
            publisher,
            abort: task.abort_handle(),
        }
    }
}
