// Retrieval of a booked flight and passport corrections

use crate::api::{FlightApi, PassportUpdate};
use crate::config::ClientConfig;
use crate::error::FlowError;
use crate::manifest::{MissingField, PassengerField};
use crate::models::{BookingStatus, Gender, Passenger, PaxType, Title};
use crate::retry::retry_lookup;
use crate::session::Session;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

const TRIP_DETAIL_PATH: &str = "/tripDetailRS/tripDetailsUiData/response";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetailFare {
    pub base_fare: Option<f64>,
    pub tax: Option<f64>,
    pub total: Option<f64>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Traveler {
    pub pax_type: Option<String>,
    pub salutation: Option<String>,
    pub given_name: String,
    pub sur_name: String,
    pub gender: Option<String>,
    pub birth_date: Option<String>,
    pub nationality: Option<String>,
    pub doc_type: Option<String>,
    pub document_number: Option<String>,
    pub doc_issue_country: Option<String>,
    pub expiry_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetailSegment {
    pub mktg_airline: Option<String>,
    pub flight_no: Option<String>,
    pub dep_airport: Option<String>,
    pub arr_airport: Option<String>,
    pub dep_date: Option<String>,
    pub arr_date: Option<String>,
    pub cabin: Option<String>,
    pub rbd: Option<String>,
    pub airline_locator: Option<String>,
    pub status: Option<String>,
    pub status_short: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OndPair {
    pub origin_city: Option<String>,
    pub destination_city: Option<String>,
    pub segments: Vec<DetailSegment>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaxItem {
    pub tax_code: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaxCost {
    pub pax_name: Option<String>,
    pub pax_type: Option<String>,
    pub tax_breakup: Vec<TaxItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TripDetail {
    pub fare: DetailFare,
    pub traveler_info: Vec<Traveler>,
    pub ond_pairs: Vec<OndPair>,
    #[serde(rename = "costBreakuppax")]
    pub cost_breakup: Vec<PaxCost>,
}

impl TripDetail {
    // Status of the first segment, mapped from the airline's code.
    pub fn status(&self) -> BookingStatus {
        self.ond_pairs
            .iter()
            .flat_map(|ond| ond.segments.iter())
            .next()
            .and_then(|seg| seg.status_short.as_deref().or(seg.status.as_deref()))
            .map_or(BookingStatus::Pending, BookingStatus::from_airline_status)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingDetail {
    pub booking_ref_id: String,
    pub trip: TripDetail,
    // Echoed back verbatim on passport updates
    pub supplier_specific: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassportDetails {
    pub pax_type: PaxType,
    pub gender: Gender,
    pub salutation: Title,
    pub given_name: String,
    pub sur_name: String,
    pub birth_date: NaiveDate,
    pub doc_type: String,
    #[serde(rename = "docID")]
    pub doc_id: String,
    pub doc_issue_country: String,
    pub expiry_date: NaiveDate,
    pub nationality: String,
}

impl PassportDetails {
    // Corrected document details for one traveler. Missing title and gender
    // fall back to `Mr` / `Male`.
    pub fn from_passenger(passenger: &Passenger) -> Result<Self, FlowError> {
        let missing = |field| MissingField {
            passenger_index: 0,
            field,
        };
        let mut gaps = Vec::new();
        if passenger.document_number.trim().is_empty() {
            gaps.push(missing(PassengerField::DocumentNumber));
        }
        if passenger.date_of_birth.is_none() {
            gaps.push(missing(PassengerField::DateOfBirth));
        }
        if passenger.document_expiry_date.is_none() {
            gaps.push(missing(PassengerField::DocumentExpiryDate));
        }

        match (passenger.date_of_birth, passenger.document_expiry_date) {
            (Some(birth_date), Some(expiry_date)) if gaps.is_empty() => {
                let nationality = passenger.nationality.clone().unwrap_or_default();
                Ok(Self {
                    pax_type: passenger.pax_type,
                    gender: passenger.gender.unwrap_or(Gender::Male),
                    salutation: passenger.title.unwrap_or(Title::Mr),
                    given_name: passenger.first_name.clone(),
                    sur_name: passenger.last_name.clone(),
                    birth_date,
                    doc_type: "1".to_string(),
                    doc_id: passenger.document_number.clone(),
                    doc_issue_country: passenger.country.clone().unwrap_or_else(|| nationality.clone()),
                    expiry_date,
                    nationality,
                })
            }
            _ => Err(FlowError::IncompleteManifest(gaps)),
        }
    }
}

// Pulls the trip detail out of a retrieve response.
pub fn parse_retrieve_response(booking_ref_id: &str, body: &Value) -> Result<BookingDetail, FlowError> {
    let content = body.pointer("/response/content");
    let trip = content
        .and_then(|c| c.pointer(TRIP_DETAIL_PATH))
        .filter(|v| !v.is_null());

    let trip = match trip {
        Some(trip) => trip,
        None => {
            let content_keys = keys(content);
            let trip_rs_keys = keys(content.and_then(|c| c.get("tripDetailRS")));
            error!(
                booking_ref = booking_ref_id,
                content_keys = ?content_keys,
                trip_detail_rs_keys = ?trip_rs_keys,
                "could not parse trip details"
            );
            return Err(FlowError::MalformedResponse(format!(
                "trip details missing; content keys: [{}], tripDetailRS keys: [{}]",
                content_keys.join(", "),
                trip_rs_keys.join(", ")
            )));
        }
    };

    let trip: TripDetail = serde_json::from_value(trip.clone()).map_err(|e| {
        error!(booking_ref = booking_ref_id, error = %e, "trip details have an unexpected shape");
        FlowError::MalformedResponse(e.to_string())
    })?;

    Ok(BookingDetail {
        booking_ref_id: booking_ref_id.to_string(),
        trip,
        supplier_specific: content
            .and_then(|c| c.get("supplierSpecific"))
            .cloned()
            .unwrap_or(Value::Null),
    })
}

fn keys(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_object)
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default()
}

pub struct BookingDetailService {
    api: Arc<dyn FlightApi>,
    session: Arc<Session>,
    config: ClientConfig,
}

impl BookingDetailService {
    pub fn new(api: Arc<dyn FlightApi>, session: Arc<Session>, config: ClientConfig) -> Self {
        Self {
            api,
            session,
            config,
        }
    }

    pub async fn fetch(&self, booking_ref_id: &str) -> Result<BookingDetail, FlowError> {
        let (api, session) = (&self.api, &self.session);
        let supplier_code = self.config.supplier_code;
        let body = retry_lookup(&self.config.retry_config, "booking detail", move || {
            api.booking_detail(session, booking_ref_id, supplier_code)
        })
        .await
        .map_err(|e| {
            warn!(booking_ref = booking_ref_id, error = %e, "booking detail lookup failed");
            FlowError::lookup(e)
        })?;

        parse_retrieve_response(booking_ref_id, &body)
    }

    // Sends corrected documents along with the supplier payload retrieved earlier.
    pub async fn update_passport(
        &self,
        detail: &BookingDetail,
        passengers: Vec<PassportDetails>,
    ) -> Result<(), FlowError> {
        let request = PassportUpdate {
            booking_ref_id: detail.booking_ref_id.clone(),
            supplier_specific: detail.supplier_specific.clone(),
            passengers,
            supplier_code: self.config.supplier_code,
        };

        self.api
            .update_passport(&self.session, &request)
            .await
            .map_err(|e| {
                warn!(booking_ref = %detail.booking_ref_id, error = %e, "passport update failed");
                FlowError::submission(e)
            })?;

        info!(
            booking_ref = %detail.booking_ref_id,
            travelers = request.passengers.len(),
            "passport details updated"
        );
        Ok(())
    }
}
