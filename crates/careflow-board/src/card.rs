//! Appointment cards

use serde::{Deserialize, Serialize};

use crate::stage::PipelineStage;

/// A patient appointment on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentCard {
    /// Stable card identifier, unique within a board
    pub id: String,

    /// Display name (falls back to the patient name)
    pub name: String,

    /// Patient full name
    pub patient: String,

    /// Assigned provider or specialty label
    pub doctor: String,

    /// Service or procedure description
    pub service: String,

    /// Current pipeline stage
    #[serde(rename = "column")]
    pub stage: PipelineStage,

    /// Phone number or messenger handle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,

    /// Scheduled visit slot, free text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,

    /// Free-text note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl AppointmentCard {
    /// Create a card with the required fields
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        patient: impl Into<String>,
        doctor: impl Into<String>,
        service: impl Into<String>,
        stage: PipelineStage,
    ) -> Self {
        let patient = patient.into();
        Self {
            id: id.into(),
            name: patient.clone(),
            patient,
            doctor: doctor.into(),
            service: service.into(),
            stage,
            contact: None,
            slot: None,
            note: None,
        }
    }

    /// Set the contact
    #[must_use]
    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = Some(contact.into());
        self
    }

    /// Set the scheduled slot
    #[must_use]
    pub fn with_slot(mut self, slot: impl Into<String>) -> Self {
        self.slot = Some(slot.into());
        self
    }

    /// Set the note
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Whether the card carries a non-empty scheduled slot
    #[must_use]
    pub fn has_slot(&self) -> bool {
        self.slot.as_deref().is_some_and(|s| !s.trim().is_empty())
    }

    /// One-line summary used in the assistant instruction snapshot
    #[must_use]
    pub fn summary_line(&self) -> String {
        let mut line = format!(
            "{} • {} • stage {} • doctor {}",
            self.id, self.name, self.stage, self.doctor
        );
        if let Some(slot) = self.slot.as_deref().filter(|s| !s.is_empty()) {
            line.push_str(&format!(" • time {slot}"));
        }
        if let Some(contact) = self.contact.as_deref().filter(|s| !s.is_empty()) {
            line.push_str(&format!(" • contact {contact}"));
        }
        if let Some(note) = self.note.as_deref().filter(|s| !s.is_empty()) {
            line.push_str(&format!(" • note: {note}"));
        }
        line
    }
}

/// Keep `value` only when it holds non-whitespace text
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
