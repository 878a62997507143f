// Search Executor: parameter rules, the provider call and result views

use crate::api::FlightApi;
use crate::config::ClientConfig;
use crate::error::FlowError;
use crate::models::{FlightOffer, OfferKey, PaxQuantity};
use crate::session::Session;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripType {
    #[serde(rename = "oneway")]
    OneWay,
    #[serde(rename = "return")]
    RoundTrip,
    MultiCity,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CabinClass {
    #[default]
    #[serde(rename = "Y")]
    Economy,
    #[serde(rename = "W")]
    PremiumEconomy,
    #[serde(rename = "C")]
    Business,
    #[serde(rename = "F")]
    First,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginDestination {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
}

impl OriginDestination {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>, departure_date: NaiveDate) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            departure_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub trip_type: TripType,
    pub origin_destinations: Vec<OriginDestination>,
    pub pax_quantity: PaxQuantity,
    pub cabin: CabinClass,
    #[serde(default)]
    pub non_stop: bool,
    #[serde(default)]
    pub preferred_airlines: Vec<String>,
}

impl SearchParams {
    pub fn one_way(
        origin: impl Into<String>,
        destination: impl Into<String>,
        departure: NaiveDate,
        pax: PaxQuantity,
    ) -> Self {
        Self::with_pairs(
            TripType::OneWay,
            vec![OriginDestination::new(origin, destination, departure)],
            pax,
        )
    }

    // Round trip with the return pair synthesized from the outbound one.
    pub fn round_trip(
        origin: impl Into<String>,
        destination: impl Into<String>,
        departure: NaiveDate,
        return_date: NaiveDate,
        pax: PaxQuantity,
    ) -> Self {
        let origin = origin.into();
        let destination = destination.into();
        let pairs = vec![
            OriginDestination::new(origin.clone(), destination.clone(), departure),
            OriginDestination::new(destination, origin, return_date),
        ];
        Self::with_pairs(TripType::RoundTrip, pairs, pax)
    }

    pub fn multi_city(pairs: Vec<OriginDestination>, pax: PaxQuantity) -> Self {
        Self::with_pairs(TripType::MultiCity, pairs, pax)
    }

    fn with_pairs(trip_type: TripType, origin_destinations: Vec<OriginDestination>, pax: PaxQuantity) -> Self {
        Self {
            trip_type,
            origin_destinations,
            pax_quantity: pax,
            cabin: CabinClass::default(),
            non_stop: false,
            preferred_airlines: Vec::new(),
        }
    }

    pub fn cabin(mut self, cabin: CabinClass) -> Self {
        self.cabin = cabin;
        self
    }

    pub fn non_stop(mut self, non_stop: bool) -> Self {
        self.non_stop = non_stop;
        self
    }

    pub fn preferred_airlines<I, S>(mut self, airlines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferred_airlines = airlines.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self, today: NaiveDate, config: &ClientConfig) -> Result<(), FlowError> {
        let pairs = &self.origin_destinations;
        if pairs.is_empty() {
            return Err(invalid("at least one origin/destination is required"));
        }

        for (i, pair) in pairs.iter().enumerate() {
            if pair.origin.trim().is_empty() || pair.destination.trim().is_empty() {
                return Err(invalid(format!("leg {} is missing an airport", i + 1)));
            }
            if pair.origin.eq_ignore_ascii_case(&pair.destination) {
                return Err(invalid(format!(
                    "leg {} has the same origin and destination",
                    i + 1
                )));
            }
            if pair.departure_date < today {
                return Err(invalid(format!("leg {} departs in the past", i + 1)));
            }
        }

        match self.trip_type {
            TripType::OneWay if pairs.len() != 1 => {
                return Err(invalid("a one-way trip has exactly one leg"));
            }
            TripType::RoundTrip => {
                if pairs.len() != 2 {
                    return Err(invalid("a round trip has an outbound and a return leg"));
                }
                if pairs[1].departure_date < pairs[0].departure_date {
                    return Err(invalid("return date is before departure"));
                }
            }
            TripType::MultiCity => {
                if pairs.len() < 2 || pairs.len() > config.max_multi_city_segments {
                    return Err(invalid(format!(
                        "a multi-city trip has between 2 and {} legs",
                        config.max_multi_city_segments
                    )));
                }
                if pairs
                    .windows(2)
                    .any(|w| w[1].departure_date < w[0].departure_date)
                {
                    return Err(invalid("multi-city dates must not go backwards"));
                }
            }
            _ => {}
        }

        let pax = &self.pax_quantity;
        if pax.adults < 1 {
            return Err(invalid("at least one adult is required"));
        }
        if pax.total() > config.max_passengers as usize {
            return Err(invalid(format!(
                "at most {} travelers per booking",
                config.max_passengers
            )));
        }
        if pax.infants > pax.adults {
            return Err(invalid("each infant must travel with an adult"));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> FlowError {
    FlowError::InvalidSearch(message.into())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultFilter {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub max_stops: Option<usize>,
    pub refundable_only: bool,
    pub non_stop_only: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    Price,
    Duration,
    Departure,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub search_id: String,
    pub params: SearchParams,
    pub offers: Vec<FlightOffer>,
}

impl SearchOutcome {
    pub fn offer(&self, index: usize) -> Option<&FlightOffer> {
        self.offers.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    // Filtered, stably sorted view over the offers.
    pub fn view(&self, filter: &ResultFilter, sort: SortBy) -> Vec<&FlightOffer> {
        let mut offers: Vec<&FlightOffer> = self
            .offers
            .iter()
            .filter(|offer| {
                filter.min_price.map_or(true, |min| offer.fare.total >= min)
                    && filter.max_price.map_or(true, |max| offer.fare.total <= max)
                    && filter.max_stops.map_or(true, |max| offer.max_stops() <= max)
                    && (!filter.refundable_only || offer.refundable)
                    && (!filter.non_stop_only || offer.max_stops() == 0)
            })
            .collect();

        match sort {
            SortBy::Price => offers.sort_by(|a, b| a.fare.total.total_cmp(&b.fare.total)),
            SortBy::Duration => offers.sort_by_key(|offer| offer.total_duration_minutes()),
            SortBy::Departure => offers.sort_by_key(|offer| offer.first_departure()),
        }
        offers
    }
}

pub struct SearchExecutor {
    api: Arc<dyn FlightApi>,
    session: Arc<Session>,
    config: ClientConfig,
}

impl SearchExecutor {
    pub fn new(api: Arc<dyn FlightApi>, session: Arc<Session>, config: ClientConfig) -> Self {
        Self {
            api,
            session,
            config,
        }
    }

    pub async fn search(&self, params: SearchParams) -> Result<SearchOutcome, FlowError> {
        let today = chrono::Local::now().date_naive();
        self.search_as_of(params, today).await
    }

    // Single attempt; a failed search waits for the user to resubmit
    pub async fn search_as_of(
        &self,
        params: SearchParams,
        today: NaiveDate,
    ) -> Result<SearchOutcome, FlowError> {
        params.validate(today, &self.config)?;

        let start = Instant::now();
        let response = self
            .api
            .search(&self.session, &params)
            .await
            .map_err(|e| {
                warn!(error = %e, "flight search failed");
                FlowError::search(e)
            })?;

        let search_id = response
            .search_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("srch-{:016x}", rand::random::<u64>()));

        let mut offers = Vec::with_capacity(response.flights.len());
        for (index, mut offer) in response.flights.into_iter().enumerate() {
            if !offer.is_well_formed() {
                warn!(search_id = %search_id, index, "provider returned a malformed offer");
                return Err(FlowError::Search(format!(
                    "offer {} in the provider response is malformed",
                    index
                )));
            }
            offer.key = OfferKey::new(search_id.clone(), index);
            offer.normalize();
            offers.push(offer);
        }

        info!(
            search_id = %search_id,
            offers = offers.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "search completed"
        );
        debug!(params = ?params, "search parameters");

        Ok(SearchOutcome {
            search_id,
            params,
            offers,
        })
    }
}
