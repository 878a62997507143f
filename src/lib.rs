// Flight and package booking flow for a travel-agency front office

pub mod api;
pub mod booking_detail;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod http_client;
pub mod manifest;
pub mod models;
pub mod package;
pub mod payment;
pub mod retry;
pub mod search;
pub mod session;
pub mod submitter;
pub mod validator;
pub mod wizard;

#[cfg(test)]
pub mod mock_api;

// Re-export key types for convenience
pub use api::{FlightApi, SearchResponse};
pub use booking_detail::{BookingDetail, BookingDetailService, PassportDetails};
pub use config::{ClientConfig, ClientError, RetryConfig};
pub use enrichment::{EnrichmentCategory, EnrichmentStats, OfferEnrichment, OfferPanels};
pub use error::{ApiError, FlowError};
pub use http_client::HttpFlightApi;
pub use manifest::{Manifest, MissingField, PassengerField};
pub use models::{
    Booking, BookingStatus, BrandTier, Fare, FlightOffer, OfferKey, Passenger, PaxQuantity,
    PaxType, PaymentMethod, PaymentStatus,
};
pub use package::{PackageFares, PackageOffer, PackageQuote};
pub use payment::{CashDeposit, PaymentDetails, TransferDetails};
pub use search::{ResultFilter, SearchExecutor, SearchOutcome, SearchParams, SortBy, TripType};
pub use session::{Credentials, Session};
pub use submitter::{BookingSubmitter, PendingValidation, UnconfirmedReason};
pub use validator::{BackgroundValidator, ValidationHandle, ValidationState};
pub use wizard::{BookingSubject, BookingWizard, PriceStatus, WizardStep};
