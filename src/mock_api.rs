// Deterministic FlightApi used by the unit tests

use crate::api::{
    BookFlightRequest, BookingRecord, BookingUpdate, CreateBookingRequest, FlightApi,
    FlightBookingConfirmation, PassportUpdate, SearchResponse,
};
use crate::enrichment::EnrichmentCategory;
use crate::error::ApiError;
use crate::models::{
    BaggageOption, BookingStatus, BrandTier, FareRule, FareRules, FlightOffer, MealOption,
    ValidationResult,
};
use crate::search::SearchParams;
use crate::session::Session;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Default)]
pub struct MockFlightApi {
    search_calls: AtomicUsize,
    validate_calls: AtomicUsize,
    book_calls: AtomicUsize,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
    detail_calls: AtomicUsize,
    passport_calls: AtomicUsize,
    enrichment_calls: Mutex<HashMap<EnrichmentCategory, usize>>,

    reject_session: AtomicBool,
    search_result: Mutex<Option<Result<SearchResponse, ApiError>>>,

    validation_gated: AtomicBool,
    validation_gate: Notify,
    validation_delay_ms: AtomicUsize,
    validation_result: Mutex<Option<Result<ValidationResult, ApiError>>>,

    book_delay_ms: AtomicUsize,
    fail_next_bookings: AtomicUsize,
    book_requests: Mutex<Vec<BookFlightRequest>>,
    create_requests: Mutex<Vec<CreateBookingRequest>>,
    updates: Mutex<Vec<(String, BookingUpdate)>>,

    // remaining failure count per category
    category_failures: Mutex<HashMap<EnrichmentCategory, (usize, ApiError)>>,
    branded_fares: Mutex<Vec<BrandTier>>,

    booking_detail: Mutex<Option<Value>>,
    detail_requests: Mutex<Vec<(String, u32)>>,
    passport_updates: Mutex<Vec<PassportUpdate>>,
}

impl MockFlightApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub fn book_calls(&self) -> usize {
        self.book_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    pub fn passport_calls(&self) -> usize {
        self.passport_calls.load(Ordering::SeqCst)
    }

    pub fn enrichment_calls(&self, category: EnrichmentCategory) -> usize {
        self.enrichment_calls.lock().get(&category).copied().unwrap_or(0)
    }

    // Behave like a backend answering 401 to everything.
    pub fn reject_session(&self, reject: bool) {
        self.reject_session.store(reject, Ordering::SeqCst);
    }

    pub fn set_search_result(&self, result: Result<SearchResponse, ApiError>) {
        *self.search_result.lock() = Some(result);
    }

    // Validation calls block until `release_validation` is called.
    pub fn hold_validation(&self) {
        self.validation_gated.store(true, Ordering::SeqCst);
    }

    pub fn release_validation(&self) {
        self.validation_gated.store(false, Ordering::SeqCst);
        self.validation_gate.notify_waiters();
        self.validation_gate.notify_one();
    }

    pub fn set_validation_delay(&self, delay_ms: usize) {
        self.validation_delay_ms.store(delay_ms, Ordering::SeqCst);
    }

    pub fn set_validation_result(&self, result: Result<ValidationResult, ApiError>) {
        *self.validation_result.lock() = Some(result);
    }

    pub fn set_book_delay(&self, delay_ms: usize) {
        self.book_delay_ms.store(delay_ms, Ordering::SeqCst);
    }

    pub fn fail_next_bookings(&self, count: usize) {
        self.fail_next_bookings.store(count, Ordering::SeqCst);
    }

    pub fn fail_category(&self, category: EnrichmentCategory, times: usize, error: ApiError) {
        self.category_failures.lock().insert(category, (times, error));
    }

    pub fn set_branded_fares(&self, brands: Vec<BrandTier>) {
        *self.branded_fares.lock() = brands;
    }

    pub fn set_booking_detail(&self, detail: Value) {
        *self.booking_detail.lock() = Some(detail);
    }

    pub fn last_book_request(&self) -> Option<BookFlightRequest> {
        self.book_requests.lock().last().cloned()
    }

    pub fn last_create_request(&self) -> Option<CreateBookingRequest> {
        self.create_requests.lock().last().cloned()
    }

    pub fn updates(&self) -> Vec<(String, BookingUpdate)> {
        self.updates.lock().clone()
    }

    pub fn last_detail_request(&self) -> Option<(String, u32)> {
        self.detail_requests.lock().last().cloned()
    }

    pub fn last_passport_update(&self) -> Option<PassportUpdate> {
        self.passport_updates.lock().last().cloned()
    }

    fn check_session(&self, session: &Session) -> Result<(), ApiError> {
        if self.reject_session.load(Ordering::SeqCst) {
            session.expire();
            return Err(ApiError::Unauthorized);
        }
        session.bearer_token().map(|_| ())
    }

    fn take_booking_failure(&self) -> Option<ApiError> {
        let remaining = self.fail_next_bookings.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next_bookings.store(remaining - 1, Ordering::SeqCst);
            return Some(ApiError::ApiResponseError {
                status_code: 503,
                message: "booking backend unavailable".to_string(),
                is_retryable: true,
            });
        }
        None
    }

    async fn booking_delay(&self) {
        let delay = self.book_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }
    }

    fn enrichment_call(
        &self,
        session: &Session,
        category: EnrichmentCategory,
    ) -> Result<(), ApiError> {
        *self.enrichment_calls.lock().entry(category).or_insert(0) += 1;
        self.check_session(session)?;

        let mut failures = self.category_failures.lock();
        if let Some((remaining, error)) = failures.get_mut(&category) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(error.clone());
            }
        }
        Ok(())
    }

    fn record(&self, id: &str) -> BookingRecord {
        BookingRecord {
            id: id.to_string(),
            booking_reference: format!("TB-{}", id),
            booking_status: Some(BookingStatus::UnderProcess),
            payment_status: None,
            payment_method: None,
            paid_amount: None,
            grand_total: None,
            notes: None,
        }
    }
}

#[async_trait]
impl FlightApi for MockFlightApi {
    async fn search(
        &self,
        session: &Session,
        _params: &SearchParams,
    ) -> Result<SearchResponse, ApiError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.check_session(session)?;

        let configured = self.search_result.lock().clone();
        configured.unwrap_or_else(|| {
            Ok(SearchResponse {
                search_id: None,
                flights: vec![
                    fixtures::one_way_offer(185_000.0),
                    fixtures::one_way_offer(172_500.0),
                ],
            })
        })
    }

    async fn validate(
        &self,
        session: &Session,
        offer: &FlightOffer,
        _params: &SearchParams,
    ) -> Result<ValidationResult, ApiError> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        self.check_session(session)?;

        if self.validation_gated.load(Ordering::SeqCst) {
            self.validation_gate.notified().await;
        }
        let delay = self.validation_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }

        let configured = self.validation_result.lock().clone();
        configured.unwrap_or_else(|| {
            Ok(ValidationResult {
                sealed: format!("sealed-{}", offer.key),
                validated_fare: offer.fare.clone(),
                supplier_specific: offer.supplier_specific.clone(),
            })
        })
    }

    async fn fare_rules(
        &self,
        session: &Session,
        _offer: &FlightOffer,
    ) -> Result<FareRules, ApiError> {
        self.enrichment_call(session, EnrichmentCategory::FareRules)?;
        Ok(FareRules {
            rules: vec![FareRule {
                title: "Cancellation".to_string(),
                text: "PKR 15,000 before departure".to_string(),
            }],
        })
    }

    async fn meals(
        &self,
        session: &Session,
        _offer: &FlightOffer,
    ) -> Result<Vec<MealOption>, ApiError> {
        self.enrichment_call(session, EnrichmentCategory::Meals)?;
        Ok(vec![MealOption {
            code: "AVML".to_string(),
            description: "Asian vegetarian".to_string(),
            price: None,
            currency: None,
        }])
    }

    async fn baggage(
        &self,
        session: &Session,
        _offer: &FlightOffer,
    ) -> Result<Vec<BaggageOption>, ApiError> {
        self.enrichment_call(session, EnrichmentCategory::Baggage)?;
        Ok(vec![BaggageOption {
            code: "XBAG20".to_string(),
            weight: 20.0,
            unit: "KG".to_string(),
            price: Some(12_000.0),
            currency: Some("PKR".to_string()),
        }])
    }

    async fn branded_fares(
        &self,
        session: &Session,
        _offer: &FlightOffer,
    ) -> Result<Vec<BrandTier>, ApiError> {
        self.enrichment_call(session, EnrichmentCategory::BrandedFares)?;
        Ok(self.branded_fares.lock().clone())
    }

    async fn book_flight(
        &self,
        session: &Session,
        request: &BookFlightRequest,
    ) -> Result<FlightBookingConfirmation, ApiError> {
        let call = self.book_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.check_session(session)?;
        self.booking_delay().await;
        self.book_requests.lock().push(request.clone());

        if let Some(error) = self.take_booking_failure() {
            return Err(error);
        }
        Ok(FlightBookingConfirmation {
            pnr: format!("PNR{:03}", call),
            booking_ref_id: format!("BR-{}", call),
            airline_locator: Some(format!("PK{:04}", call)),
            airline_code: Some("PK".to_string()),
            status: Some("HK".to_string()),
        })
    }

    async fn create_booking(
        &self,
        session: &Session,
        request: &CreateBookingRequest,
    ) -> Result<BookingRecord, ApiError> {
        let call = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.check_session(session)?;
        self.booking_delay().await;
        self.create_requests.lock().push(request.clone());

        if let Some(error) = self.take_booking_failure() {
            return Err(error);
        }
        let mut record = self.record(&format!("pkg-{}", call));
        record.grand_total = Some(request.grand_total);
        record.notes = Some(request.notes.clone());
        Ok(record)
    }

    async fn update_booking(
        &self,
        session: &Session,
        booking_id: &str,
        update: &BookingUpdate,
    ) -> Result<BookingRecord, ApiError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.check_session(session)?;
        self.updates
            .lock()
            .push((booking_id.to_string(), update.clone()));

        if let Some(error) = self.take_booking_failure() {
            return Err(error);
        }
        let mut record = self.record(booking_id);
        record.booking_status = update.booking_status.clone();
        record.payment_status = update.payment_status;
        record.payment_method = update.payment_method;
        record.paid_amount = update.paid_amount;
        record.notes = update.notes.clone();
        Ok(record)
    }

    async fn booking_detail(
        &self,
        session: &Session,
        booking_ref_id: &str,
        supplier_code: u32,
    ) -> Result<Value, ApiError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.check_session(session)?;
        self.detail_requests
            .lock()
            .push((booking_ref_id.to_string(), supplier_code));
        let configured = self.booking_detail.lock().clone();
        Ok(configured.unwrap_or_else(fixtures::booking_detail_body))
    }

    async fn update_passport(
        &self,
        session: &Session,
        request: &PassportUpdate,
    ) -> Result<Value, ApiError> {
        self.passport_calls.fetch_add(1, Ordering::SeqCst);
        self.check_session(session)?;
        self.passport_updates.lock().push(request.clone());
        Ok(json!({ "success": true }))
    }
}

pub mod fixtures {
    use crate::models::{
        BrandTier, Contact, DocumentType, Fare, FlightOffer, Gender, Leg, Passenger, PaxQuantity,
        PaxType, Segment, Title,
    };
    use crate::search::SearchParams;
    use crate::session::{Credentials, Session};
    use chrono::{NaiveDate, NaiveDateTime};
    use serde_json::{json, Value};
    use std::collections::BTreeMap;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, min, 0))
            .unwrap()
    }

    fn leg(from: &str, to: &str, flight: &str, dep: NaiveDateTime, arr: NaiveDateTime) -> Leg {
        Leg {
            airline_code: "PK".to_string(),
            flight_number: flight.to_string(),
            departure_location: from.to_string(),
            arrival_location: to.to_string(),
            departure: dep,
            arrival: arr,
            cabin: Some("Y".to_string()),
            booking_class: None,
        }
    }

    fn fare(total: f64) -> Fare {
        let tax = (total * 0.2).round();
        Fare::new(total - tax, tax, "PKR")
    }

    pub fn signed_in_session() -> Session {
        Session::new(Credentials::new("test-token").with_agency("42", "Al Noor Travels"))
    }

    pub fn one_way_search() -> SearchParams {
        SearchParams::one_way(
            "LHE",
            "JED",
            NaiveDate::from_ymd_opt(2030, 3, 1).unwrap(),
            PaxQuantity::new(1, 0, 0),
        )
    }

    pub fn family_search() -> SearchParams {
        SearchParams::one_way(
            "LHE",
            "JED",
            NaiveDate::from_ymd_opt(2030, 3, 1).unwrap(),
            PaxQuantity::new(2, 1, 1),
        )
    }

    // Non-stop LHE-JED offer.
    pub fn one_way_offer(total: f64) -> FlightOffer {
        FlightOffer {
            key: Default::default(),
            segments: vec![Segment {
                origin: "LHE".to_string(),
                destination: "JED".to_string(),
                legs: vec![leg("LHE", "JED", "759", at(2030, 3, 1, 4, 30), at(2030, 3, 1, 8, 10))],
                journey_duration: None,
            }],
            fare: fare(total),
            refundable: false,
            brands: None,
            provider_ids: BTreeMap::from([("itineraryId".to_string(), "IT-1".to_string())]),
            supplier_specific: json!({ "fareBasis": "YOW" }),
            selected_brand: None,
        }
    }

    // LHE-JED outbound, JED-DXB-LHE return with a connection.
    pub fn round_trip_offer(total: f64) -> FlightOffer {
        let mut offer = one_way_offer(total);
        offer.segments.push(Segment {
            origin: "JED".to_string(),
            destination: "LHE".to_string(),
            legs: vec![
                leg("JED", "DXB", "EK804", at(2030, 3, 15, 10, 0), at(2030, 3, 15, 13, 0)),
                leg("DXB", "LHE", "EK622", at(2030, 3, 15, 15, 0), at(2030, 3, 15, 19, 15)),
            ],
            journey_duration: None,
        });
        offer
    }

    pub fn keyed_offer(total: f64, search_id: &str, index: usize) -> FlightOffer {
        let mut offer = one_way_offer(total);
        offer.key = crate::models::OfferKey::new(search_id, index);
        offer
    }

    pub fn brand(code: &str, name: &str, total: f64, supplier_specific: Value) -> BrandTier {
        BrandTier {
            code: code.to_string(),
            name: name.to_string(),
            fare: fare(total),
            inclusions: vec!["20kg checked bag".to_string()],
            is_default: code == "A",
            supplier_specific,
        }
    }

    pub fn complete_passenger(pax_type: PaxType) -> Passenger {
        let (title, dob) = match pax_type {
            PaxType::Adult => (Title::Mr, NaiveDate::from_ymd_opt(1985, 6, 12)),
            PaxType::Child => (Title::Master, NaiveDate::from_ymd_opt(2022, 1, 5)),
            PaxType::Infant => (Title::Miss, NaiveDate::from_ymd_opt(2029, 8, 20)),
        };
        Passenger {
            pax_type,
            title: Some(title),
            first_name: "Usman".to_string(),
            last_name: "Tariq".to_string(),
            date_of_birth: dob,
            gender: Some(Gender::Male),
            nationality: Some("PK".to_string()),
            document_type: DocumentType::Passport,
            document_number: "AB1234567".to_string(),
            document_issue_date: NaiveDate::from_ymd_opt(2026, 1, 10),
            document_expiry_date: NaiveDate::from_ymd_opt(2036, 1, 9),
            country: Some("PK".to_string()),
            contact: match pax_type {
                PaxType::Adult => Some(Contact {
                    phone: "+923001234567".to_string(),
                    email: "usman@example.com".to_string(),
                }),
                _ => None,
            },
        }
    }

    pub fn booking_detail_body() -> Value {
        json!({
            "response": {
                "content": {
                    "tripDetailRS": {
                        "tripDetailsUiData": {
                            "response": {
                                "fare": { "baseFare": 150000.0, "tax": 35000.0, "total": 185000.0, "currency": "PKR" },
                                "travelerInfo": [{
                                    "paxType": "ADT",
                                    "salutation": "Mr",
                                    "givenName": "Usman",
                                    "surName": "Tariq",
                                    "gender": "Male",
                                    "birthDate": "1985-06-12",
                                    "nationality": "PK",
                                    "docType": "1",
                                    "documentNumber": "AB1234567",
                                    "expiryDate": "2036-01-09"
                                }],
                                "ondPairs": [{
                                    "originCity": "Lahore",
                                    "destinationCity": "Jeddah",
                                    "segments": [{
                                        "mktgAirline": "PK",
                                        "flightNo": "759",
                                        "depAirport": "LHE",
                                        "arrAirport": "JED",
                                        "depDate": "2030-03-01T04:30:00",
                                        "arrDate": "2030-03-01T08:10:00",
                                        "cabin": "Y",
                                        "rbd": "V",
                                        "airlineLocator": "PK9XY",
                                        "status": "Confirmed",
                                        "statusShort": "HK"
                                    }]
                                }],
                                "costBreakuppax": [{
                                    "paxName": "Usman Tariq",
                                    "paxType": "ADT",
                                    "taxBreakup": [
                                        { "taxCode": "YQ", "amount": 21000.0 },
                                        { "taxCode": "PK", "amount": 14000.0 }
                                    ]
                                }]
                            }
                        }
                    },
                    "supplierSpecific": { "orderId": "ORD-9" }
                }
            }
        })
    }
}
