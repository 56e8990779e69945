//! Liability waiver — submission payload and stored record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GateError, Result};
use crate::validate::{format_phone_number, is_valid_email, is_valid_phone};

/// Waiver form as submitted by a client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaiverSubmission {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub occupation: Option<String>,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    #[serde(default)]
    pub emergency_contact_relationship: String,
    #[serde(default)]
    pub previous_injuries: Option<String>,
    #[serde(default)]
    pub current_pain: Option<String>,
    #[serde(default)]
    pub medical_conditions: Option<String>,
    #[serde(default)]
    pub pregnancy_status: Option<String>,
    #[serde(default)]
    pub fitness_level: String,
    #[serde(default)]
    pub exercise_history: Option<String>,
    #[serde(default)]
    pub pilates_experience: Option<String>,
    #[serde(default)]
    pub fitness_goals: String,
    #[serde(default)]
    pub preferred_schedule: Option<String>,
    #[serde(default)]
    pub how_did_you_hear: Option<String>,
    #[serde(default)]
    pub additional_notes: Option<String>,
    /// Client acknowledged the release of liability
    #[serde(default)]
    pub agreed: bool,
}

impl WaiverSubmission {
    pub fn validate(&self) -> Result<()> {
        if !self.agreed {
            return Err(GateError::Validation(
                "Please read and accept the waiver agreement.".into(),
            ));
        }
        if self.full_name.trim().is_empty() {
            return Err(GateError::Validation("Please enter your full name.".into()));
        }
        if !is_valid_email(self.email.trim()) {
            return Err(GateError::Validation("Please enter a valid email address.".into()));
        }
        if !is_valid_phone(&self.phone) {
            return Err(GateError::Validation("Please enter a valid phone number.".into()));
        }
        if self.emergency_contact_name.trim().is_empty() {
            return Err(GateError::Validation(
                "Please enter an emergency contact.".into(),
            ));
        }
        if !is_valid_phone(&self.emergency_contact_phone) {
            return Err(GateError::Validation(
                "Please enter a valid emergency contact phone number.".into(),
            ));
        }
        Ok(())
    }

    /// Stamp the submission for storage under `user_id`; phone numbers are normalized
    pub fn into_record(self, user_id: impl Into<String>, signed_at: DateTime<Utc>) -> WaiverRecord {
        WaiverRecord {
            user_id: user_id.into(),
            signed_at: signed_at.to_rfc3339(),
            full_name: self.full_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: format_phone_number(&self.phone),
            date_of_birth: self.date_of_birth,
            occupation: non_empty(self.occupation),
            emergency_contact_name: self.emergency_contact_name.trim().to_string(),
            emergency_contact_phone: format_phone_number(&self.emergency_contact_phone),
            emergency_contact_relationship: self.emergency_contact_relationship,
            previous_injuries: non_empty(self.previous_injuries),
            current_pain: non_empty(self.current_pain),
            medical_conditions: non_empty(self.medical_conditions),
            pregnancy_status: non_empty(self.pregnancy_status),
            fitness_level: self.fitness_level,
            exercise_history: non_empty(self.exercise_history),
            pilates_experience: non_empty(self.pilates_experience),
            fitness_goals: self.fitness_goals,
            preferred_schedule: non_empty(self.preferred_schedule),
            how_did_you_hear: non_empty(self.how_did_you_hear),
            additional_notes: non_empty(self.additional_notes),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Waiver row as stored in the `waivers` table, one per user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaiverRecord {
    pub user_id: String,
    pub signed_at: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub occupation: Option<String>,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    #[serde(default)]
    pub emergency_contact_relationship: String,
    #[serde(default)]
    pub previous_injuries: Option<String>,
    #[serde(default)]
    pub current_pain: Option<String>,
    #[serde(default)]
    pub medical_conditions: Option<String>,
    #[serde(default)]
    pub pregnancy_status: Option<String>,
    #[serde(default)]
    pub fitness_level: String,
    #[serde(default)]
    pub exercise_history: Option<String>,
    #[serde(default)]
    pub pilates_experience: Option<String>,
    #[serde(default)]
    pub fitness_goals: String,
    #[serde(default)]
    pub preferred_schedule: Option<String>,
    #[serde(default)]
    pub how_did_you_hear: Option<String>,
    #[serde(default)]
    pub additional_notes: Option<String>,
}

#[cfg(test)]
pub(crate) fn sample_submission() -> WaiverSubmission {
    WaiverSubmission {
        full_name: "Coral Reyes".into(),
        email: "coral@example.com".into(),
        phone: "386-555-0101".into(),
        date_of_birth: "1990-04-12".into(),
        occupation: Some("Marine biologist".into()),
        emergency_contact_name: "Dune Reyes".into(),
        emergency_contact_phone: "(386) 555-0199".into(),
        emergency_contact_relationship: "Spouse".into(),
        previous_injuries: Some("Left knee, 2019".into()),
        medical_conditions: Some("   ".into()),
        fitness_level: "intermediate".into(),
        pilates_experience: Some("Mat classes".into()),
        fitness_goals: "Core strength".into(),
        how_did_you_hear: Some("Friend".into()),
        agreed: true,
        ..WaiverSubmission::default()
    }
}
