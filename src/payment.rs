// Payment-method sub-flow: required fields and the resulting booking update

use crate::api::BookingUpdate;
use crate::error::FlowError;
use crate::models::{BookingStatus, Fare, PaymentMethod, PaymentStatus};
use chrono::NaiveDate;
use tracing::warn;

// Bank transfer or cheque.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferDetails {
    pub amount: f64,
    pub date: Option<NaiveDate>,
    pub beneficiary_account: String,
    pub agent_account: String,
    pub slip_reference: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CashDeposit {
    pub amount: f64,
    pub date: Option<NaiveDate>,
    pub bank_name: String,
    pub depositor_name: String,
    pub depositor_cnic: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentDetails {
    BankTransfer(TransferDetails),
    Cheque(TransferDetails),
    Cash(CashDeposit),
    // Deducted from the agency's credit facility
    Credit,
    Gateway,
}

impl PaymentDetails {
    pub fn method(&self) -> PaymentMethod {
        match self {
            PaymentDetails::BankTransfer(_) => PaymentMethod::BankTransfer,
            PaymentDetails::Cheque(_) => PaymentMethod::Cheque,
            PaymentDetails::Cash(_) => PaymentMethod::Cash,
            PaymentDetails::Credit => PaymentMethod::Credit,
            PaymentDetails::Gateway => PaymentMethod::Gateway,
        }
    }

    pub fn validate(&self) -> Result<(), FlowError> {
        match self {
            PaymentDetails::BankTransfer(details) | PaymentDetails::Cheque(details) => {
                require_amount(details.amount)?;
                require(&details.beneficiary_account, "beneficiary account")?;
                require(&details.agent_account, "agent account")?;
                if details.date.is_none() {
                    return Err(FlowError::InvalidPayment("payment date is required".to_string()));
                }
                if details.slip_reference.is_none() {
                    warn!(method = %self.method(), "no payment slip attached");
                }
                Ok(())
            }
            PaymentDetails::Cash(deposit) => {
                require_amount(deposit.amount)?;
                require(&deposit.bank_name, "bank name")?;
                require(&deposit.depositor_name, "depositor name")?;
                require(&deposit.depositor_cnic, "depositor CNIC")
            }
            PaymentDetails::Credit => Ok(()),
            PaymentDetails::Gateway => Err(FlowError::InvalidPayment(
                "online payment gateway is not available".to_string(),
            )),
        }
    }

    // Builds the status/payment update for a booking priced at `total`.
    pub fn to_update(&self, total: &Fare) -> Result<BookingUpdate, FlowError> {
        self.validate()?;

        if let PaymentDetails::Credit = self {
            return Ok(BookingUpdate {
                booking_status: Some(BookingStatus::Confirmed),
                payment_status: Some(PaymentStatus::Paid),
                payment_method: Some(PaymentMethod::Credit),
                paid_amount: Some(total.total),
                notes: None,
            });
        }

        Ok(BookingUpdate {
            booking_status: Some(BookingStatus::PendingVerification),
            payment_status: Some(PaymentStatus::Pending),
            payment_method: Some(self.method()),
            paid_amount: Some(0.0),
            notes: Some(self.notes(&total.currency)),
        })
    }

    fn notes(&self, currency: &str) -> String {
        let (amount, date, note) = match self {
            PaymentDetails::BankTransfer(d) | PaymentDetails::Cheque(d) => (d.amount, d.date, &d.note),
            PaymentDetails::Cash(d) => (d.amount, d.date, &d.note),
            PaymentDetails::Credit | PaymentDetails::Gateway => return String::new(),
        };
        let date = date.map_or_else(|| "-".to_string(), |d| d.to_string());
        let note = note.as_deref().unwrap_or("No additional notes");
        let mut notes = format!(
            "Payment Method: {} | Amount: {} {} | Date: {} | {}",
            self.method(),
            currency,
            amount,
            date,
            note
        );

        match self {
            PaymentDetails::Cash(d) => notes.push_str(&format!(
                " | Bank: {} | Depositor: {} | CNIC: {}",
                d.bank_name, d.depositor_name, d.depositor_cnic
            )),
            PaymentDetails::BankTransfer(d) | PaymentDetails::Cheque(d) => notes.push_str(&format!(
                " | Beneficiary Account: {} | Agent Account: {}",
                d.beneficiary_account, d.agent_account
            )),
            _ => {}
        }
        notes
    }
}

// Defers payment; only the status moves.
pub fn hold_update() -> BookingUpdate {
    BookingUpdate {
        booking_status: Some(BookingStatus::Pending),
        ..Default::default()
    }
}

fn require_amount(amount: f64) -> Result<(), FlowError> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(FlowError::InvalidPayment("amount must be greater than zero".to_string()))
    }
}

fn require(value: &str, field: &str) -> Result<(), FlowError> {
    if value.trim().is_empty() {
        Err(FlowError::InvalidPayment(format!("{} is required", field)))
    } else {
        Ok(())
    }
}
