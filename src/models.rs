// Domain types shared by the search, validation and booking stages

use crate::api::{BookingRecord, FlightBookingConfirmation};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fare {
    pub base_fare: f64,
    pub tax: f64,
    // The amount shown to the user and charged
    pub total: f64,
    pub currency: String,
}

impl Fare {
    pub fn new(base_fare: f64, tax: f64, currency: impl Into<String>) -> Self {
        Self {
            base_fare,
            tax,
            total: base_fare + tax,
            currency: currency.into(),
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.total.is_finite() && self.total >= 0.0 && !self.currency.trim().is_empty()
    }
}

impl fmt::Display for Fare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.2}", self.currency, self.total)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leg {
    pub airline_code: String,
    pub flight_number: String,
    pub departure_location: String,
    pub arrival_location: String,
    pub departure: NaiveDateTime,
    pub arrival: NaiveDateTime,
    #[serde(default)]
    pub cabin: Option<String>,
    #[serde(default)]
    pub booking_class: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub origin: String,
    pub destination: String,
    pub legs: Vec<Leg>,
    #[serde(default)]
    pub journey_duration: Option<u32>,
}

impl Segment {
    pub fn departure(&self) -> Option<NaiveDateTime> {
        self.legs.first().map(|leg| leg.departure)
    }

    pub fn arrival(&self) -> Option<NaiveDateTime> {
        self.legs.last().map(|leg| leg.arrival)
    }

    pub fn stops(&self) -> usize {
        self.legs.len().saturating_sub(1)
    }

    // Duration in minutes, preferring the provider's figure.
    pub fn duration_minutes(&self) -> i64 {
        if let Some(minutes) = self.journey_duration {
            return minutes as i64;
        }
        match (self.departure(), self.arrival()) {
            (Some(dep), Some(arr)) => (arr - dep).num_minutes().max(0),
            _ => 0,
        }
    }
}

// A named bundle of inclusions priced as an alternative to the base fare.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandTier {
    pub code: String,
    pub name: String,
    pub fare: Fare,
    #[serde(default)]
    pub inclusions: Vec<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub supplier_specific: Value,
}

// Identity of an offer within one search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferKey {
    pub search_id: String,
    pub index: usize,
}

impl OfferKey {
    pub fn new(search_id: impl Into<String>, index: usize) -> Self {
        Self {
            search_id: search_id.into(),
            index,
        }
    }
}

impl fmt::Display for OfferKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.search_id, self.index)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaxQuantity {
    #[serde(rename = "adt")]
    pub adults: u8,
    #[serde(rename = "chd")]
    pub children: u8,
    #[serde(rename = "inf")]
    pub infants: u8,
}

impl PaxQuantity {
    pub fn new(adults: u8, children: u8, infants: u8) -> Self {
        Self {
            adults,
            children,
            infants,
        }
    }

    pub fn total(&self) -> usize {
        self.adults as usize + self.children as usize + self.infants as usize
    }

    pub fn count(&self, pax_type: PaxType) -> usize {
        match pax_type {
            PaxType::Adult => self.adults as usize,
            PaxType::Child => self.children as usize,
            PaxType::Infant => self.infants as usize,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightOffer {
    // Assigned by the search executor, never sent by the provider
    #[serde(default)]
    pub key: OfferKey,
    pub segments: Vec<Segment>,
    pub fare: Fare,
    #[serde(default)]
    pub refundable: bool,
    #[serde(default)]
    pub brands: Option<Vec<BrandTier>>,
    #[serde(default)]
    pub provider_ids: BTreeMap<String, String>,
    #[serde(default)]
    pub supplier_specific: Value,
    #[serde(default)]
    pub selected_brand: Option<String>,
}

impl FlightOffer {
    // Orders segments by departure and legs by departure within each segment.
    pub fn normalize(&mut self) {
        for segment in &mut self.segments {
            segment.legs.sort_by_key(|leg| leg.departure);
        }
        self.segments.sort_by_key(|segment| segment.departure());
    }

    pub fn is_well_formed(&self) -> bool {
        !self.segments.is_empty()
            && self.segments.iter().all(|s| !s.legs.is_empty())
            && self.fare.is_well_formed()
    }

    pub fn first_departure(&self) -> Option<NaiveDateTime> {
        self.segments.first().and_then(Segment::departure)
    }

    pub fn total_duration_minutes(&self) -> i64 {
        self.segments.iter().map(Segment::duration_minutes).sum()
    }

    pub fn max_stops(&self) -> usize {
        self.segments.iter().map(Segment::stops).max().unwrap_or(0)
    }

    pub fn inline_brands(&self) -> Option<&[BrandTier]> {
        self.brands.as_deref().filter(|brands| !brands.is_empty())
    }

    // Derived offer priced at `brand`, with the brand's supplier payload merged in.
    pub fn with_brand(&self, brand: &BrandTier) -> FlightOffer {
        let mut derived = self.clone();
        derived.fare = brand.fare.clone();
        derived.selected_brand = Some(brand.code.clone());
        derived.supplier_specific = merge_payload(&self.supplier_specific, &brand.supplier_specific);
        derived
    }
}

fn merge_payload(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            let mut merged = base.clone();
            for (key, value) in overlay {
                merged.insert(key.clone(), value.clone());
            }
            Value::Object(merged)
        }
        (base, Value::Null) => base.clone(),
        (_, overlay) => overlay.clone(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    // Opaque provider proof, required to finalize a booking
    pub sealed: String,
    pub validated_fare: Fare,
    #[serde(default)]
    pub supplier_specific: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaxType {
    #[serde(rename = "ADT")]
    Adult,
    #[serde(rename = "CHD")]
    Child,
    #[serde(rename = "INF")]
    Infant,
}

impl fmt::Display for PaxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaxType::Adult => "Adult",
            PaxType::Child => "Child",
            PaxType::Infant => "Infant",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Title {
    Mr,
    Mrs,
    Ms,
    Miss,
    Master,
    Dr,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    #[default]
    #[serde(rename = "PP")]
    Passport,
    #[serde(rename = "NIC")]
    NationalId,
    #[serde(rename = "DL")]
    DrivingLicense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passenger {
    pub pax_type: PaxType,
    #[serde(rename = "salutation")]
    pub title: Option<Title>,
    #[serde(rename = "givenName")]
    pub first_name: String,
    #[serde(rename = "surName")]
    pub last_name: String,
    #[serde(rename = "birthDate")]
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub nationality: Option<String>,
    #[serde(rename = "docType")]
    pub document_type: DocumentType,
    #[serde(rename = "docID")]
    pub document_number: String,
    #[serde(rename = "docIssueDate")]
    pub document_issue_date: Option<NaiveDate>,
    #[serde(rename = "expiryDate")]
    pub document_expiry_date: Option<NaiveDate>,
    #[serde(rename = "docIssueCountry")]
    pub country: Option<String>,
    // Only the primary passenger carries contact details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
}

impl Passenger {
    pub fn blank(pax_type: PaxType) -> Self {
        Self {
            pax_type,
            title: None,
            first_name: String::new(),
            last_name: String::new(),
            date_of_birth: None,
            gender: None,
            nationality: None,
            document_type: DocumentType::Passport,
            document_number: String::new(),
            document_issue_date: None,
            document_expiry_date: None,
            country: None,
            contact: None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[serde(rename = "underprocess")]
    UnderProcess,
    Pending,
    PendingVerification,
    Confirmed,
    Issued,
    Cancelled,
}

impl BookingStatus {
    // Maps an airline segment status to a booking status.
    pub fn from_airline_status(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "hk" | "confirmed" => BookingStatus::Confirmed,
            "issued" => BookingStatus::Issued,
            "cancelled" | "xx" => BookingStatus::Cancelled,
            _ => BookingStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[serde(rename = "bank")]
    BankTransfer,
    Cash,
    Cheque,
    Credit,
    Gateway,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentMethod::BankTransfer => "BANK",
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Cheque => "CHEQUE",
            PaymentMethod::Credit => "CREDIT",
            PaymentMethod::Gateway => "GATEWAY",
        };
        f.write_str(label)
    }
}

// A persisted booking. Passengers and total are fixed at creation; only
// status and payment fields move afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Booking {
    id: String,
    reference: String,
    pnr: Option<String>,
    airline_locator: Option<String>,
    status: BookingStatus,
    payment_method: Option<PaymentMethod>,
    payment_status: Option<PaymentStatus>,
    paid_amount: f64,
    passengers: Vec<Passenger>,
    total: Fare,
    unconfirmed_pricing: bool,
}

impl Booking {
    pub fn from_flight(
        confirmation: &FlightBookingConfirmation,
        passengers: Vec<Passenger>,
        total: Fare,
        unconfirmed_pricing: bool,
    ) -> Self {
        Self {
            id: confirmation.booking_ref_id.clone(),
            reference: confirmation.booking_ref_id.clone(),
            pnr: Some(confirmation.pnr.clone()),
            airline_locator: confirmation.airline_locator.clone(),
            status: BookingStatus::from_airline_status(
                confirmation.status.as_deref().unwrap_or_default(),
            ),
            payment_method: None,
            payment_status: None,
            paid_amount: 0.0,
            passengers,
            total,
            unconfirmed_pricing,
        }
    }

    pub fn from_record(record: &BookingRecord, passengers: Vec<Passenger>, total: Fare) -> Self {
        Self {
            id: record.id.clone(),
            reference: record.booking_reference.clone(),
            pnr: None,
            airline_locator: None,
            status: record
                .booking_status
                .clone()
                .unwrap_or(BookingStatus::UnderProcess),
            payment_method: record.payment_method,
            payment_status: record.payment_status,
            paid_amount: record.paid_amount.unwrap_or(0.0),
            passengers,
            total,
            unconfirmed_pricing: false,
        }
    }

    pub fn apply_update(&mut self, record: &BookingRecord) {
        if let Some(status) = &record.booking_status {
            self.status = status.clone();
        }
        if record.payment_method.is_some() {
            self.payment_method = record.payment_method;
        }
        if record.payment_status.is_some() {
            self.payment_status = record.payment_status;
        }
        if let Some(paid) = record.paid_amount {
            self.paid_amount = paid;
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn pnr(&self) -> Option<&str> {
        self.pnr.as_deref()
    }

    pub fn airline_locator(&self) -> Option<&str> {
        self.airline_locator.as_deref()
    }

    pub fn status(&self) -> &BookingStatus {
        &self.status
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    pub fn payment_status(&self) -> Option<PaymentStatus> {
        self.payment_status
    }

    pub fn paid_amount(&self) -> f64 {
        self.paid_amount
    }

    pub fn passengers(&self) -> &[Passenger] {
        &self.passengers
    }

    pub fn total(&self) -> &Fare {
        &self.total
    }

    pub fn unconfirmed_pricing(&self) -> bool {
        self.unconfirmed_pricing
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FareRule {
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FareRules {
    pub rules: Vec<FareRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealOption {
    pub code: String,
    pub description: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaggageOption {
    pub code: String,
    pub weight: f64,
    pub unit: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}
