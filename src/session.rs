// Explicit session context threaded into every collaborator call

use crate::error::ApiError;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub user_type: Option<String>,
    pub agency_id: Option<String>,
    pub agency_name: Option<String>,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            user_type: None,
            agency_id: None,
            agency_name: None,
        }
    }

    pub fn with_agency(mut self, agency_id: impl Into<String>, agency_name: impl Into<String>) -> Self {
        self.agency_id = Some(agency_id.into());
        self.agency_name = Some(agency_name.into());
        self
    }
}

// Authentication and agency identity for one signed-in user.
// Once the backend rejects the token the credentials are dropped and every
// later call fails with `Unauthorized` until it signs in again.
#[derive(Debug, Default)]
pub struct Session {
    credentials: RwLock<Option<Credentials>>,
}

impl Session {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials: RwLock::new(Some(credentials)),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, credentials: Credentials) {
        info!(agency = ?credentials.agency_id, "session signed in");
        *self.credentials.write() = Some(credentials);
    }

    pub fn is_active(&self) -> bool {
        self.credentials.read().is_some()
    }

    pub fn bearer_token(&self) -> Result<String, ApiError> {
        self.credentials
            .read()
            .as_ref()
            .map(|c| c.access_token.clone())
            .ok_or(ApiError::Unauthorized)
    }

    pub fn agency_id(&self) -> Option<String> {
        self.credentials
            .read()
            .as_ref()
            .and_then(|c| c.agency_id.clone())
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.credentials.read().clone()
    }

    // Called when the backend answers 401
    pub fn expire(&self) {
        if self.credentials.write().take().is_some() {
            warn!("session expired, credentials discarded");
        }
    }
}
