//! Lead model and the closed set of pipeline statuses.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Pipeline stage of a lead. Stored as its display label ("In Progress", ...).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LeadStatus {
    New,
    Contacted,
    #[serde(rename = "In Progress")]
    InProgress,
    Converted,
    Lost,
}

impl LeadStatus {
    /// Display order used by the dashboard pipeline.
    pub const ALL: [LeadStatus; 5] = [
        Self::New,
        Self::Contacted,
        Self::InProgress,
        Self::Converted,
        Self::Lost,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Contacted => "Contacted",
            Self::InProgress => "In Progress",
            Self::Converted => "Converted",
            Self::Lost => "Lost",
        }
    }

    /// Exact label match; anything else is not a known status.
    pub fn from_label(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.label() == raw)
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A timestamped note entry attached to a lead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeadNote {
    pub text: String,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub source: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub lead_notes: Json<Vec<LeadNote>>,
    pub agent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLead {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: String,
    #[validate(email(message = "Email is invalid"))]
    pub email: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    pub source: Option<String>,
    #[serde(default = "default_status")]
    pub status: LeadStatus,
    pub notes: Option<String>,
    /// Only honoured for admins; agents always own the leads they create.
    pub agent_id: Option<Uuid>,
}

fn default_status() -> LeadStatus {
    LeadStatus::New
}

#[derive(Debug, Clone, Deserialize, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLead {
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "Email is invalid"))]
    pub email: Option<String>,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    pub source: Option<String>,
    pub status: Option<LeadStatus>,
    pub notes: Option<String>,
    /// Replaces the whole note list when present.
    pub lead_notes: Option<Vec<LeadNote>>,
    pub agent_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLeadNote {
    #[validate(custom(function = "validate_not_blank"))]
    pub text: String,
}

pub(crate) fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if phone.trim().is_empty() {
        return Err(ValidationError::new("phone").with_message("Phone is required".into()));
    }
    Ok(())
}

fn validate_not_blank(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::new("text").with_message("Note text is required".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_round_trip_through_serde() {
        for status in LeadStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.label()));
            assert_eq!(LeadStatus::from_label(status.label()), Some(status));
        }
    }

    #[test]
    fn unknown_labels_are_rejected() {
        assert_eq!(LeadStatus::from_label("converted"), None);
        assert_eq!(LeadStatus::from_label("InProgress"), None);
        assert_eq!(LeadStatus::from_label(""), None);
        assert!(serde_json::from_str::<LeadStatus>("\"Qualified\"").is_err());
    }

    #[test]
    fn create_lead_defaults_and_validation() {
        let input: CreateLead = serde_json::from_value(serde_json::json!({
            "name": "Ada Park",
            "email": "ada@example.com",
            "phone": "555-0100"
        }))
        .unwrap();
        assert_eq!(input.status, LeadStatus::New);
        assert!(input.source.is_none());
        assert!(input.validate().is_ok());

        let blank_phone = CreateLead {
            phone: "   ".to_string(),
            ..input
        };
        assert!(blank_phone.validate().is_err());
    }

    #[test]
    fn lead_serializes_with_client_field_names() {
        let lead = Lead {
            id: Uuid::nil(),
            name: "Ada Park".to_string(),
            email: "ada@example.com".to_string(),
            phone: "555-0100".to_string(),
            source: None,
            status: "In Progress".to_string(),
            notes: None,
            lead_notes: Json(vec![LeadNote {
                text: "Called back".to_string(),
                date: Utc::now(),
                author: None,
            }]),
            agent_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&lead).unwrap();
        assert_eq!(json["_id"], Uuid::nil().to_string());
        assert_eq!(json["status"], "In Progress");
        assert_eq!(json["leadNotes"][0]["text"], "Called back");
        assert!(json["leadNotes"][0].get("author").is_none());
        assert!(json["source"].is_null());
    }

    #[test]
    fn blank_note_is_rejected() {
        let note = CreateLeadNote {
            text: " \n".to_string(),
        };
        assert!(note.validate().is_err());
    }
}
