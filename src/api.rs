// Collaborator contract for the flight provider and the ticket-booking backend

use crate::booking_detail::PassportDetails;
use crate::error::ApiError;
use crate::models::{
    BaggageOption, BookingStatus, BrandTier, Fare, FareRules, FlightOffer, MealOption, Passenger,
    PaxType, PaymentMethod, PaymentStatus, Title, ValidationResult,
};
use crate::search::SearchParams;
use crate::session::Session;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub search_id: Option<String>,
    #[serde(default)]
    pub flights: Vec<FlightOffer>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookFlightRequest {
    pub offer: FlightOffer,
    // None when booking at search-time pricing
    pub sealed: Option<String>,
    pub validation_payload: Value,
    pub passengers: Vec<Passenger>,
    pub search: SearchParams,
    pub total: Fare,
    pub pricing_confirmed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightBookingConfirmation {
    pub pnr: String,
    pub booking_ref_id: String,
    #[serde(default)]
    pub airline_locator: Option<String>,
    #[serde(default)]
    pub airline_code: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

// Passenger entry as the ticket-booking backend stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackagePassenger {
    #[serde(rename = "type")]
    pub pax_type: PaxType,
    pub title: Option<Title>,
    pub first_name: String,
    pub last_name: String,
    pub passport_number: String,
    pub date_of_birth: Option<NaiveDate>,
    pub passport_issue_date: Option<NaiveDate>,
    pub passport_expiry_date: Option<NaiveDate>,
    pub country: Option<String>,
}

impl From<&Passenger> for PackagePassenger {
    fn from(passenger: &Passenger) -> Self {
        Self {
            pax_type: passenger.pax_type,
            title: passenger.title,
            first_name: passenger.first_name.clone(),
            last_name: passenger.last_name.clone(),
            passport_number: passenger.document_number.clone(),
            date_of_birth: passenger.date_of_birth,
            passport_issue_date: passenger.document_issue_date,
            passport_expiry_date: passenger.document_expiry_date,
            country: passenger.country.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateBookingRequest {
    pub ticket_id: String,
    pub booking_type: String,
    pub ticket_details: Value,
    pub passengers: Vec<PackagePassenger>,
    pub total_passengers: usize,
    pub base_price_per_person: f64,
    pub tax_per_person: f64,
    pub service_charge_per_person: f64,
    pub subtotal: f64,
    pub total_tax: f64,
    pub total_service_charge: f64,
    pub grand_total: f64,
    // Always null until the payment step
    pub payment_method: Option<PaymentMethod>,
    pub payment_status: Option<PaymentStatus>,
    pub booking_status: BookingStatus,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRecord {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub booking_reference: String,
    #[serde(default)]
    pub booking_status: Option<BookingStatus>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub paid_amount: Option<f64>,
    #[serde(default)]
    pub grand_total: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

// Partial update; absent fields are left untouched by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BookingUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_status: Option<BookingStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassportUpdate {
    pub booking_ref_id: String,
    pub supplier_specific: Value,
    pub passengers: Vec<PassportDetails>,
    pub supplier_code: u32,
}

// Every call takes the session explicitly; implementations expire it on 401
#[async_trait]
pub trait FlightApi: Send + Sync + 'static {
    async fn search(
        &self,
        session: &Session,
        params: &SearchParams,
    ) -> Result<SearchResponse, ApiError>;

    async fn validate(
        &self,
        session: &Session,
        offer: &FlightOffer,
        params: &SearchParams,
    ) -> Result<ValidationResult, ApiError>;

    async fn fare_rules(&self, session: &Session, offer: &FlightOffer)
        -> Result<FareRules, ApiError>;

    async fn meals(&self, session: &Session, offer: &FlightOffer)
        -> Result<Vec<MealOption>, ApiError>;

    async fn baggage(
        &self,
        session: &Session,
        offer: &FlightOffer,
    ) -> Result<Vec<BaggageOption>, ApiError>;

    async fn branded_fares(
        &self,
        session: &Session,
        offer: &FlightOffer,
    ) -> Result<Vec<BrandTier>, ApiError>;

    async fn book_flight(
        &self,
        session: &Session,
        request: &BookFlightRequest,
    ) -> Result<FlightBookingConfirmation, ApiError>;

    async fn create_booking(
        &self,
        session: &Session,
        request: &CreateBookingRequest,
    ) -> Result<BookingRecord, ApiError>;

    async fn update_booking(
        &self,
        session: &Session,
        booking_id: &str,
        update: &BookingUpdate,
    ) -> Result<BookingRecord, ApiError>;

    async fn booking_detail(
        &self,
        session: &Session,
        booking_ref_id: &str,
        supplier_code: u32,
    ) -> Result<Value, ApiError>;

    async fn update_passport(
        &self,
        session: &Session,
        request: &PassportUpdate,
    ) -> Result<Value, ApiError>;
}
