// Package / group-ticket bookings priced per passenger type

use crate::api::{CreateBookingRequest, PackagePassenger};
use crate::models::{BookingStatus, Fare, Passenger, PaxQuantity, PaxType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Selling prices are final customer prices; tax and service are included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageFares {
    pub adult_selling: f64,
    #[serde(default)]
    pub child_selling: Option<f64>,
    #[serde(default)]
    pub infant_selling: f64,
}

impl PackageFares {
    pub fn price_for(&self, pax_type: PaxType) -> f64 {
        match pax_type {
            PaxType::Adult => self.adult_selling,
            // unset or zero child price falls back to the adult price
            PaxType::Child => self
                .child_selling
                .filter(|price| *price > 0.0)
                .unwrap_or(self.adult_selling),
            PaxType::Infant => self.infant_selling,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackageOffer {
    pub ticket_id: String,
    pub fares: PackageFares,
    pub pax_quantity: PaxQuantity,
    pub currency: String,
    // Full ticket record, sent back verbatim with the booking
    pub details: Value,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuoteLine {
    pub count: usize,
    pub unit_price: f64,
}

impl QuoteLine {
    pub fn subtotal(&self) -> f64 {
        self.count as f64 * self.unit_price
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackageQuote {
    pub adults: QuoteLine,
    pub children: QuoteLine,
    pub infants: QuoteLine,
    pub currency: String,
}

impl PackageQuote {
    pub fn passenger_count(&self) -> usize {
        self.adults.count + self.children.count + self.infants.count
    }

    pub fn grand_total(&self) -> f64 {
        self.adults.subtotal() + self.children.subtotal() + self.infants.subtotal()
    }

    pub fn per_person(&self) -> f64 {
        match self.passenger_count() {
            0 => 0.0,
            n => (self.grand_total() / n as f64).round(),
        }
    }

    pub fn total_fare(&self) -> Fare {
        Fare::new(self.grand_total(), 0.0, self.currency.clone())
    }

    pub fn notes(&self) -> String {
        format!(
            "Adults: {} @ {cur} {}, Children: {} @ {cur} {}, Infants: {} @ {cur} {}",
            self.adults.count,
            self.adults.unit_price,
            self.children.count,
            self.children.unit_price,
            self.infants.count,
            self.infants.unit_price,
            cur = self.currency,
        )
    }
}

impl PackageOffer {
    // Prices the manifest by the passenger types actually present.
    pub fn quote(&self, passengers: &[Passenger]) -> PackageQuote {
        let line = |pax_type: PaxType| QuoteLine {
            count: passengers.iter().filter(|p| p.pax_type == pax_type).count(),
            unit_price: self.fares.price_for(pax_type),
        };
        PackageQuote {
            adults: line(PaxType::Adult),
            children: line(PaxType::Child),
            infants: line(PaxType::Infant),
            currency: self.currency.clone(),
        }
    }

    pub fn create_request(&self, passengers: &[Passenger]) -> CreateBookingRequest {
        let quote = self.quote(passengers);
        let grand_total = quote.grand_total();
        CreateBookingRequest {
            ticket_id: self.ticket_id.clone(),
            booking_type: "ticket".to_string(),
            ticket_details: self.details.clone(),
            passengers: passengers.iter().map(PackagePassenger::from).collect(),
            total_passengers: quote.passenger_count(),
            base_price_per_person: quote.per_person(),
            tax_per_person: 0.0,
            service_charge_per_person: 0.0,
            subtotal: grand_total,
            total_tax: 0.0,
            total_service_charge: 0.0,
            grand_total,
            payment_method: None,
            payment_status: None,
            booking_status: BookingStatus::UnderProcess,
            notes: quote.notes(),
        }
    }
}
