// Booking Wizard: passenger details -> review -> payment -> confirmed

use crate::error::FlowError;
use crate::manifest::Manifest;
use crate::models::{Booking, Fare, FlightOffer, Passenger};
use crate::package::PackageOffer;
use crate::payment::PaymentDetails;
use crate::search::SearchParams;
use crate::submitter::{BookingSubmitter, PendingValidation, UnconfirmedReason};
use crate::validator::{BackgroundValidator, ValidationHandle, ValidationState};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum WizardStep {
    PassengerDetails,
    Review,
    Payment { booking: Booking },
    Confirmed { booking: Booking },
    Held { booking: Booking },
    Abandoned { reason: String },
}

impl WizardStep {
    pub fn name(&self) -> &'static str {
        match self {
            WizardStep::PassengerDetails => "passenger details",
            WizardStep::Review => "review",
            WizardStep::Payment { .. } => "payment",
            WizardStep::Confirmed { .. } => "confirmed",
            WizardStep::Held { .. } => "held",
            WizardStep::Abandoned { .. } => "abandoned",
        }
    }

    pub fn booking(&self) -> Option<&Booking> {
        match self {
            WizardStep::Payment { booking }
            | WizardStep::Confirmed { booking }
            | WizardStep::Held { booking } => Some(booking),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PriceStatus {
    Pending,
    Confirmed(Fare),
    Unconfirmed { fare: Fare, reason: UnconfirmedReason },
    // Package prices come from the ticket and are not re-validated
    Fixed(Fare),
}

#[derive(Debug, Clone)]
pub enum BookingSubject {
    Flight {
        offer: FlightOffer,
        search: SearchParams,
        validation: Option<ValidationHandle>,
    },
    Package(PackageOffer),
}

// Draft state of one booking attempt, owned by a single flow.
pub struct BookingWizard {
    subject: BookingSubject,
    manifest: Manifest,
    step: WizardStep,
    last_error: Option<FlowError>,
    pending_policy: PendingValidation,
    submitter: Arc<BookingSubmitter>,
}

impl BookingWizard {
    // Kicks off price validation and opens the passenger step without
    // waiting for it.
    pub fn start_flight(
        validator: &BackgroundValidator,
        submitter: Arc<BookingSubmitter>,
        offer: FlightOffer,
        search: SearchParams,
    ) -> Self {
        let validation = validator.start(&offer, &search);
        let manifest = Manifest::for_quantity(search.pax_quantity);
        info!(offer = %offer.key, passengers = manifest.len(), "booking wizard opened");
        Self::new(
            BookingSubject::Flight {
                offer,
                search,
                validation: Some(validation),
            },
            manifest,
            submitter,
        )
    }

    pub fn start_package(submitter: Arc<BookingSubmitter>, package: PackageOffer) -> Self {
        let manifest = Manifest::for_quantity(package.pax_quantity);
        info!(ticket = %package.ticket_id, passengers = manifest.len(), "package wizard opened");
        Self::new(BookingSubject::Package(package), manifest, submitter)
    }

    fn new(subject: BookingSubject, manifest: Manifest, submitter: Arc<BookingSubmitter>) -> Self {
        Self {
            subject,
            manifest,
            step: WizardStep::PassengerDetails,
            last_error: None,
            pending_policy: PendingValidation::default(),
            submitter,
        }
    }

    pub fn step(&self) -> &WizardStep {
        &self.step
    }

    pub fn subject(&self) -> &BookingSubject {
        &self.subject
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn last_error(&self) -> Option<&FlowError> {
        self.last_error.as_ref()
    }

    pub fn booking(&self) -> Option<&Booking> {
        self.step.booking()
    }

    pub fn set_pending_policy(&mut self, policy: PendingValidation) {
        self.pending_policy = policy;
    }

    pub fn update_passenger<F>(&mut self, index: usize, edit: F) -> Result<(), FlowError>
    where
        F: FnOnce(&mut Passenger),
    {
        self.require(matches!(self.step, WizardStep::PassengerDetails), "edit passengers")?;
        if self.manifest.update(index, edit) {
            Ok(())
        } else {
            Err(self.fail(FlowError::InvalidTransition {
                action: "edit a passenger outside the manifest",
                step: self.step.name(),
            }))
        }
    }

    pub fn continue_to_review(&mut self) -> Result<(), FlowError> {
        self.require(matches!(self.step, WizardStep::PassengerDetails), "continue to review")?;
        if let Some(error) = self.session_lost() {
            return Err(error);
        }
        if let Err(error) = self.manifest.ensure_complete() {
            return Err(self.fail(error));
        }
        self.advance(WizardStep::Review);
        Ok(())
    }

    pub fn back(&mut self) -> Result<(), FlowError> {
        self.require(matches!(self.step, WizardStep::Review), "go back")?;
        self.advance(WizardStep::PassengerDetails);
        Ok(())
    }

    // Review -> Payment. Stays on Review when the create-booking call fails.
    pub async fn confirm_booking(&mut self) -> Result<(), FlowError> {
        self.require(matches!(self.step, WizardStep::Review), "confirm the booking")?;
        if let Some(error) = self.session_lost() {
            return Err(error);
        }

        let result = match &self.subject {
            BookingSubject::Flight {
                offer,
                search,
                validation,
            } => {
                self.submitter
                    .submit_flight(offer, search, &self.manifest, validation.as_ref(), self.pending_policy)
                    .await
            }
            BookingSubject::Package(package) => {
                self.submitter.submit_package(package, &self.manifest).await
            }
        };

        match result {
            Ok(booking) => {
                self.advance(WizardStep::Payment { booking });
                Ok(())
            }
            Err(error) => Err(self.fail(error)),
        }
    }

    pub async fn pay(&mut self, details: &PaymentDetails) -> Result<(), FlowError> {
        let booking = self.payment_booking("pay")?;
        match self.submitter.pay(&booking, details).await {
            Ok(booking) => {
                self.advance(WizardStep::Confirmed { booking });
                Ok(())
            }
            Err(error) => Err(self.fail(error)),
        }
    }

    pub async fn hold(&mut self) -> Result<(), FlowError> {
        let booking = self.payment_booking("hold the booking")?;
        match self.submitter.hold(&booking).await {
            Ok(booking) => {
                self.advance(WizardStep::Held { booking });
                Ok(())
            }
            Err(error) => Err(self.fail(error)),
        }
    }

    // The user left the flow; a running validation is stopped
    pub fn abandon(&mut self, reason: impl Into<String>) {
        if let BookingSubject::Flight {
            validation: Some(handle),
            ..
        } = &self.subject
        {
            handle.abandon();
        }
        self.advance(WizardStep::Abandoned {
            reason: reason.into(),
        });
    }

    // Live price view; reflects a resolved validation in any step.
    pub fn price_status(&self) -> PriceStatus {
        match &self.subject {
            BookingSubject::Package(package) => {
                PriceStatus::Fixed(package.quote(self.manifest.passengers()).total_fare())
            }
            BookingSubject::Flight {
                offer, validation, ..
            } => match validation.as_ref().map(ValidationHandle::current) {
                Some(state) => price_from_state(offer, state),
                None => PriceStatus::Unconfirmed {
                    fare: offer.fare.clone(),
                    reason: UnconfirmedReason::Abandoned,
                },
            },
        }
    }

    // Waits until the validation settles, then reports the price. A validation
    // rejected for an expired session discards the draft.
    pub async fn wait_for_price(&mut self) -> PriceStatus {
        if let BookingSubject::Flight {
            validation: Some(handle),
            ..
        } = &self.subject
        {
            handle.wait().await;
            self.session_lost();
        }
        self.price_status()
    }

    // The fare to show: the booked total once a booking exists, otherwise
    // the validated fare if known, otherwise the search-time fare.
    pub fn displayed_fare(&self) -> Fare {
        if let Some(booking) = self.booking() {
            return booking.total().clone();
        }
        match self.price_status() {
            PriceStatus::Pending => match &self.subject {
                BookingSubject::Flight { offer, .. } => offer.fare.clone(),
                BookingSubject::Package(package) => {
                    package.quote(self.manifest.passengers()).total_fare()
                }
            },
            PriceStatus::Confirmed(fare)
            | PriceStatus::Fixed(fare)
            | PriceStatus::Unconfirmed { fare, .. } => fare,
        }
    }

    // Discards the draft once the background validation has seen the session expire
    fn session_lost(&mut self) -> Option<FlowError> {
        let expired = match &self.subject {
            BookingSubject::Flight {
                validation: Some(handle),
                ..
            } => matches!(handle.current(), ValidationState::Failed(FlowError::SessionExpired)),
            _ => false,
        };
        if !expired || matches!(self.step, WizardStep::Abandoned { .. }) {
            return None;
        }
        Some(self.fail(FlowError::SessionExpired))
    }

    fn payment_booking(&self, action: &'static str) -> Result<Booking, FlowError> {
        match &self.step {
            WizardStep::Payment { booking } => Ok(booking.clone()),
            _ => Err(self.invalid(action)),
        }
    }

    fn require(&self, allowed: bool, action: &'static str) -> Result<(), FlowError> {
        if allowed {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn invalid(&self, action: &'static str) -> FlowError {
        let error = FlowError::InvalidTransition {
            action,
            step: self.step.name(),
        };
        debug!(action, step = self.step.name(), "rejected wizard action");
        error
    }

    fn advance(&mut self, next: WizardStep) {
        debug!(from = self.step.name(), to = next.name(), "wizard step");
        self.step = next;
        self.last_error = None;
    }

    // Records the error; an expired session also discards the draft
    fn fail(&mut self, error: FlowError) -> FlowError {
        if error.is_session_expired() {
            warn!(step = self.step.name(), "session expired, discarding booking draft");
            self.manifest.clear();
            self.abandon("session expired");
        }
        self.last_error = Some(error.clone());
        error
    }
}

fn price_from_state(offer: &FlightOffer, state: ValidationState) -> PriceStatus {
    match state {
        ValidationState::Pending => PriceStatus::Pending,
        ValidationState::Validated(result) => PriceStatus::Confirmed(result.validated_fare),
        ValidationState::Failed(FlowError::SessionExpired) => PriceStatus::Unconfirmed {
            fare: offer.fare.clone(),
            reason: UnconfirmedReason::SessionExpired,
        },
        ValidationState::Failed(_) => PriceStatus::Unconfirmed {
            fare: offer.fare.clone(),
            reason: UnconfirmedReason::ValidationFailed,
        },
        ValidationState::Abandoned => PriceStatus::Unconfirmed {
            fare: offer.fare.clone(),
            reason: UnconfirmedReason::Abandoned,
        },
    }
}
