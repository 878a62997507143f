// Passenger manifest sized to the offer's passenger quantity

use crate::error::FlowError;
use crate::models::{Passenger, PaxQuantity, PaxType};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassengerField {
    Title,
    FirstName,
    LastName,
    DocumentNumber,
    DateOfBirth,
    DocumentIssueDate,
    DocumentExpiryDate,
    Country,
}

impl fmt::Display for PassengerField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PassengerField::Title => "title",
            PassengerField::FirstName => "first name",
            PassengerField::LastName => "last name",
            PassengerField::DocumentNumber => "document number",
            PassengerField::DateOfBirth => "date of birth",
            PassengerField::DocumentIssueDate => "document issue date",
            PassengerField::DocumentExpiryDate => "document expiry date",
            PassengerField::Country => "country",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MissingField {
    pub passenger_index: usize,
    pub field: PassengerField,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "passenger {}: {}", self.passenger_index + 1, self.field)
    }
}

// Ordered passenger records: adults first, then children, then infants.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    passengers: Vec<Passenger>,
}

impl Manifest {
    pub fn for_quantity(quantity: PaxQuantity) -> Self {
        let passengers = [PaxType::Adult, PaxType::Child, PaxType::Infant]
            .into_iter()
            .flat_map(|pax_type| {
                std::iter::repeat(pax_type)
                    .take(quantity.count(pax_type))
                    .map(Passenger::blank)
            })
            .collect();
        Self { passengers }
    }

    pub fn len(&self) -> usize {
        self.passengers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passengers.is_empty()
    }

    pub fn passengers(&self) -> &[Passenger] {
        &self.passengers
    }

    pub fn get(&self, index: usize) -> Option<&Passenger> {
        self.passengers.get(index)
    }

    // Edits one record. The passenger type is owned by the manifest and
    // survives whatever the closure does.
    pub fn update<F>(&mut self, index: usize, edit: F) -> bool
    where
        F: FnOnce(&mut Passenger),
    {
        match self.passengers.get_mut(index) {
            Some(passenger) => {
                let pax_type = passenger.pax_type;
                edit(passenger);
                passenger.pax_type = pax_type;
                true
            }
            None => false,
        }
    }

    pub fn missing_fields(&self) -> Vec<MissingField> {
        self.passengers
            .iter()
            .enumerate()
            .flat_map(|(index, passenger)| {
                missing_for(passenger)
                    .into_iter()
                    .map(move |field| MissingField {
                        passenger_index: index,
                        field,
                    })
            })
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    pub fn ensure_complete(&self) -> Result<(), FlowError> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(FlowError::IncompleteManifest(missing))
        }
    }

    // Resets every record but keeps the slot layout
    pub fn clear(&mut self) {
        for passenger in &mut self.passengers {
            *passenger = Passenger::blank(passenger.pax_type);
        }
    }
}

fn missing_for(passenger: &Passenger) -> Vec<PassengerField> {
    let mut missing = Vec::new();
    if passenger.title.is_none() {
        missing.push(PassengerField::Title);
    }
    if passenger.first_name.trim().is_empty() {
        missing.push(PassengerField::FirstName);
    }
    if passenger.last_name.trim().is_empty() {
        missing.push(PassengerField::LastName);
    }
    if passenger.document_number.trim().is_empty() {
        missing.push(PassengerField::DocumentNumber);
    }
    if passenger.date_of_birth.is_none() {
        missing.push(PassengerField::DateOfBirth);
    }
    if passenger.document_issue_date.is_none() {
        missing.push(PassengerField::DocumentIssueDate);
    }
    if passenger.document_expiry_date.is_none() {
        missing.push(PassengerField::DocumentExpiryDate);
    }
    if passenger
        .country
        .as_deref()
        .map_or(true, |c| c.trim().is_empty())
    {
        missing.push(PassengerField::Country);
    }
    missing
}
