// reqwest-backed FlightApi talking to the agency backend

use crate::api::{
    BookFlightRequest, BookingRecord, BookingUpdate, CreateBookingRequest, FlightApi,
    FlightBookingConfirmation, PassportUpdate, SearchResponse,
};
use crate::config::{ClientConfig, ClientError};
use crate::error::ApiError;
use crate::models::{BaggageOption, BrandTier, FareRules, FlightOffer, MealOption, ValidationResult};
use crate::search::SearchParams;
use crate::session::Session;
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

pub const SEARCH_PATH: &str = "/api/flights/search";
pub const VALIDATE_PATH: &str = "/api/flights/validate";
pub const FARE_RULES_PATH: &str = "/api/flights/fare-rules";
pub const MEALS_PATH: &str = "/api/flights/meals";
pub const BAGGAGE_PATH: &str = "/api/flights/baggage";
pub const BRANDED_FARES_PATH: &str = "/api/flights/branded-fares";
pub const BOOK_PATH: &str = "/api/flights/book";
pub const BOOKING_DETAIL_PATH: &str = "/api/flights/booking-detail";
pub const UPDATE_PASSPORT_PATH: &str = "/api/flights/update-passport";
pub const TICKET_BOOKINGS_PATH: &str = "/api/ticket-bookings/";

pub struct HttpFlightApi {
    client: Client,
    base_url: String,
    timeout_ms: u64,
}

impl HttpFlightApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ClientError::InitError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_ms: config.timeout_ms,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<B, T>(
        &self,
        session: &Session,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let token = session.bearer_token()?;
        let url = self.url(path);
        debug!(%method, %url, "sending request");

        let response = self
            .client
            .request(method, &url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(rejected(session, &url, status, &text));
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(self.timeout_ms)
            } else {
                ApiError::MalformedResponse(e.to_string())
            }
        })
    }

    fn transport_error(&self, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout(self.timeout_ms)
        } else {
            ApiError::NetworkError(error.to_string())
        }
    }
}

// A 401 ends the session; later calls fail before reaching the network
fn rejected(session: &Session, url: &str, status: StatusCode, body: &str) -> ApiError {
    if status == StatusCode::UNAUTHORIZED {
        warn!(%url, "backend rejected the session");
        session.expire();
        return ApiError::Unauthorized;
    }
    let error = status_error(status, body);
    warn!(%url, status = status.as_u16(), error = %error, "request failed");
    error
}

// Maps a non-2xx answer to an error, preferring the backend's `detail` text
fn status_error(status: StatusCode, body: &str) -> ApiError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| v.get("detail").or_else(|| v.get("message")))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    ApiError::ApiResponseError {
        status_code: status.as_u16(),
        message,
        is_retryable: status.is_server_error()
            || status == StatusCode::TOO_MANY_REQUESTS
            || status == StatusCode::REQUEST_TIMEOUT,
    }
}

#[async_trait]
impl FlightApi for HttpFlightApi {
    async fn search(
        &self,
        session: &Session,
        params: &SearchParams,
    ) -> Result<SearchResponse, ApiError> {
        self.send(session, Method::POST, SEARCH_PATH, params).await
    }

    async fn validate(
        &self,
        session: &Session,
        offer: &FlightOffer,
        params: &SearchParams,
    ) -> Result<ValidationResult, ApiError> {
        let body = json!({ "offer": offer, "search": params });
        self.send(session, Method::POST, VALIDATE_PATH, &body).await
    }

    async fn fare_rules(
        &self,
        session: &Session,
        offer: &FlightOffer,
    ) -> Result<FareRules, ApiError> {
        self.send(session, Method::POST, FARE_RULES_PATH, &json!({ "offer": offer }))
            .await
    }

    async fn meals(
        &self,
        session: &Session,
        offer: &FlightOffer,
    ) -> Result<Vec<MealOption>, ApiError> {
        self.send(session, Method::POST, MEALS_PATH, &json!({ "offer": offer }))
            .await
    }

    async fn baggage(
        &self,
        session: &Session,
        offer: &FlightOffer,
    ) -> Result<Vec<BaggageOption>, ApiError> {
        self.send(session, Method::POST, BAGGAGE_PATH, &json!({ "offer": offer }))
            .await
    }

    async fn branded_fares(
        &self,
        session: &Session,
        offer: &FlightOffer,
    ) -> Result<Vec<BrandTier>, ApiError> {
        self.send(session, Method::POST, BRANDED_FARES_PATH, &json!({ "offer": offer }))
            .await
    }

    async fn book_flight(
        &self,
        session: &Session,
        request: &BookFlightRequest,
    ) -> Result<FlightBookingConfirmation, ApiError> {
        self.send(session, Method::POST, BOOK_PATH, request).await
    }

    async fn create_booking(
        &self,
        session: &Session,
        request: &CreateBookingRequest,
    ) -> Result<BookingRecord, ApiError> {
        self.send(session, Method::POST, TICKET_BOOKINGS_PATH, request)
            .await
    }

    async fn update_booking(
        &self,
        session: &Session,
        booking_id: &str,
        update: &BookingUpdate,
    ) -> Result<BookingRecord, ApiError> {
        let path = format!("{}{}", TICKET_BOOKINGS_PATH, booking_id);
        self.send(session, Method::PUT, &path, update).await
    }

    async fn booking_detail(
        &self,
        session: &Session,
        booking_ref_id: &str,
        supplier_code: u32,
    ) -> Result<Value, ApiError> {
        let body = json!({ "bookingRefId": booking_ref_id, "supplierCode": supplier_code });
        self.send(session, Method::POST, BOOKING_DETAIL_PATH, &body)
            .await
    }

    async fn update_passport(
        &self,
        session: &Session,
        request: &PassportUpdate,
    ) -> Result<Value, ApiError> {
        self.send(session, Method::POST, UPDATE_PASSPORT_PATH, request)
            .await
    }
}
