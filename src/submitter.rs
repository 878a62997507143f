// Booking Submitter: price resolution, create-booking calls and payment updates

use crate::api::{BookFlightRequest, BookingUpdate, FlightApi};
use crate::error::FlowError;
use crate::manifest::Manifest;
use crate::models::{Booking, Fare, FlightOffer, ValidationResult};
use crate::package::PackageOffer;
use crate::payment::{hold_update, PaymentDetails};
use crate::search::SearchParams;
use crate::session::Session;
use crate::validator::{Selection, ValidationHandle, ValidationState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

// What to do when submission finds the validation still running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PendingValidation {
    #[default]
    Await,
    ProceedUnconfirmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnconfirmedReason {
    ValidationFailed,
    // Validation hit a rejected token; the draft is about to be discarded
    SessionExpired,
    NotStarted,
    Abandoned,
    NotAwaited,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PriceSource {
    Validated(ValidationResult),
    // Search-time fare; the booking is flagged
    Unconfirmed { fare: Fare, reason: UnconfirmedReason },
}

impl PriceSource {
    pub fn fare(&self) -> &Fare {
        match self {
            PriceSource::Validated(result) => &result.validated_fare,
            PriceSource::Unconfirmed { fare, .. } => fare,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, PriceSource::Validated(_))
    }
}

// Resolves the price to book at: a resolved validation, then the in-flight
// one (awaited unless told otherwise), then the offer's own fare.
pub async fn resolve_price(
    offer: &FlightOffer,
    validation: Option<&ValidationHandle>,
    pending: PendingValidation,
) -> PriceSource {
    let unconfirmed = |reason| PriceSource::Unconfirmed {
        fare: offer.fare.clone(),
        reason,
    };

    // A handle for another offer or brand says nothing about this one
    let handle = match validation {
        Some(handle) if *handle.selection() == Selection::of(offer) => handle,
        _ => return unconfirmed(UnconfirmedReason::NotStarted),
    };

    let state = match (handle.current(), pending) {
        (ValidationState::Pending, PendingValidation::Await) => handle.wait().await,
        (state, _) => state,
    };

    match state {
        ValidationState::Validated(result) => PriceSource::Validated(result),
        ValidationState::Failed(FlowError::SessionExpired) => {
            unconfirmed(UnconfirmedReason::SessionExpired)
        }
        ValidationState::Failed(_) => unconfirmed(UnconfirmedReason::ValidationFailed),
        ValidationState::Abandoned => unconfirmed(UnconfirmedReason::Abandoned),
        ValidationState::Pending => unconfirmed(UnconfirmedReason::NotAwaited),
    }
}

// Clears the in-flight flag however the submission ends
struct SubmitGuard<'a>(&'a AtomicBool);

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct BookingSubmitter {
    api: Arc<dyn FlightApi>,
    session: Arc<Session>,
    in_flight: AtomicBool,
}

impl BookingSubmitter {
    pub fn new(api: Arc<dyn FlightApi>, session: Arc<Session>) -> Self {
        Self {
            api,
            session,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn acquire(&self) -> Result<SubmitGuard<'_>, FlowError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| SubmitGuard(&self.in_flight))
            .map_err(|_| FlowError::SubmissionInProgress)
    }

    // Creates the PNR for `offer`. The manifest is only read, so a failed
    // call leaves everything the user entered in place.
    pub async fn submit_flight(
        &self,
        offer: &FlightOffer,
        search: &SearchParams,
        manifest: &Manifest,
        validation: Option<&ValidationHandle>,
        pending: PendingValidation,
    ) -> Result<Booking, FlowError> {
        let _guard = self.acquire()?;
        manifest.ensure_complete()?;

        let price = resolve_price(offer, validation, pending).await;
        let (sealed, validation_payload) = match &price {
            PriceSource::Validated(result) => (Some(result.sealed.clone()), result.supplier_specific.clone()),
            PriceSource::Unconfirmed { fare, reason } => {
                warn!(
                    offer = %offer.key,
                    total = fare.total,
                    currency = %fare.currency,
                    reason = ?reason,
                    "booking with unconfirmed pricing"
                );
                (None, offer.supplier_specific.clone())
            }
        };

        let request = BookFlightRequest {
            offer: offer.clone(),
            sealed,
            validation_payload,
            passengers: manifest.passengers().to_vec(),
            search: search.clone(),
            total: price.fare().clone(),
            pricing_confirmed: price.is_confirmed(),
        };

        let start = Instant::now();
        let confirmation = self
            .api
            .book_flight(&self.session, &request)
            .await
            .map_err(|e| {
                warn!(offer = %offer.key, error = %e, "flight booking failed");
                FlowError::submission(e)
            })?;

        info!(
            booking_ref = %confirmation.booking_ref_id,
            pnr = %confirmation.pnr,
            total = request.total.total,
            pricing_confirmed = request.pricing_confirmed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "flight booked"
        );

        Ok(Booking::from_flight(
            &confirmation,
            request.passengers,
            request.total,
            !request.pricing_confirmed,
        ))
    }

    pub async fn submit_package(
        &self,
        package: &PackageOffer,
        manifest: &Manifest,
    ) -> Result<Booking, FlowError> {
        let _guard = self.acquire()?;
        manifest.ensure_complete()?;

        let request = package.create_request(manifest.passengers());
        let total = package.quote(manifest.passengers()).total_fare();
        let record = self
            .api
            .create_booking(&self.session, &request)
            .await
            .map_err(|e| {
                warn!(ticket = %package.ticket_id, error = %e, "package booking failed");
                FlowError::submission(e)
            })?;

        info!(
            booking_ref = %record.booking_reference,
            ticket = %package.ticket_id,
            total = total.total,
            "package booking created"
        );
        Ok(Booking::from_record(&record, manifest.passengers().to_vec(), total))
    }

    // Attaches payment; returns the updated booking and leaves `booking` as it was.
    pub async fn pay(&self, booking: &Booking, details: &PaymentDetails) -> Result<Booking, FlowError> {
        let update = details.to_update(booking.total())?;
        self.update(booking, &update, "payment submitted").await
    }

    pub async fn hold(&self, booking: &Booking) -> Result<Booking, FlowError> {
        self.update(booking, &hold_update(), "booking held").await
    }

    async fn update(
        &self,
        booking: &Booking,
        update: &BookingUpdate,
        message: &'static str,
    ) -> Result<Booking, FlowError> {
        let _guard = self.acquire()?;
        let record = self
            .api
            .update_booking(&self.session, booking.id(), update)
            .await
            .map_err(|e| {
                warn!(booking_ref = %booking.reference(), error = %e, "booking update failed");
                FlowError::submission(e)
            })?;

        let mut updated = booking.clone();
        updated.apply_update(&record);
        info!(
            booking_ref = %updated.reference(),
            status = ?updated.status(),
            payment_status = ?updated.payment_status(),
            "{}",
            message
        );
        Ok(updated)
    }
}
