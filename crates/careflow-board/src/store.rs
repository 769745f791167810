//! Board Store
//!
//! A single list of appointment cards keyed by id, plus the projections the
//! board view derives from it. The reducer in [`crate::reducer`] is the only
//! writer.

use serde::{Deserialize, Serialize};

use crate::card::AppointmentCard;
use crate::stage::PipelineStage;

/// Default number of cards listed in the instruction snapshot
pub const DEFAULT_SNAPSHOT_LIMIT: usize = 12;

/// Card count for one pipeline column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCount {
    /// Stage
    pub stage: PipelineStage,
    /// Column title
    pub label: String,
    /// Number of cards in the stage
    pub count: usize,
}

/// The shared appointment board
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardStore {
    cards: Vec<AppointmentCard>,
}

impl BoardStore {
    /// Create an empty board
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a board from cards, keeping the first card for each id
    #[must_use]
    pub fn with_cards(cards: impl IntoIterator<Item = AppointmentCard>) -> Self {
        let mut store = Self::new();
        for card in cards {
            if !store.contains(&card.id) {
                store.cards.push(card);
            }
        }
        store
    }

    /// Board seeded with the demo appointments
    #[must_use]
    pub fn demo() -> Self {
        Self::with_cards(demo_cards())
    }

    /// Number of cards
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the board has no cards
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Cards in insertion order
    #[must_use]
    pub fn cards(&self) -> &[AppointmentCard] {
        &self.cards
    }

    /// Look up a card by id
    #[must_use]
    pub fn card(&self, id: &str) -> Option<&AppointmentCard> {
        self.cards.iter().find(|c| c.id == id)
    }

    /// Whether a card with this id exists
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.card(id).is_some()
    }

    pub(crate) fn card_mut(&mut self, id: &str) -> Option<&mut AppointmentCard> {
        self.cards.iter_mut().find(|c| c.id == id)
    }

    pub(crate) fn push(&mut self, card: AppointmentCard) {
        self.cards.push(card);
    }

    /// Cards currently in `stage`
    pub fn cards_in(&self, stage: PipelineStage) -> impl Iterator<Item = &AppointmentCard> {
        self.cards.iter().filter(move |c| c.stage == stage)
    }

    /// Number of cards in `stage`
    #[must_use]
    pub fn count(&self, stage: PipelineStage) -> usize {
        self.cards_in(stage).count()
    }

    /// Per-stage counts in pipeline order
    #[must_use]
    pub fn stage_counts(&self) -> Vec<StageCount> {
        PipelineStage::ALL
            .iter()
            .map(|stage| StageCount {
                stage: *stage,
                label: stage.label().to_string(),
                count: self.count(*stage),
            })
            .collect()
    }

    /// First card with a non-empty slot, in insertion order.
    ///
    /// Slots are free text, so no chronological ordering is attempted.
    #[must_use]
    pub fn next_scheduled(&self) -> Option<&AppointmentCard> {
        self.cards.iter().find(|c| c.has_slot())
    }

    /// Text handed to the assistant so it knows the board state and tools
    #[must_use]
    pub fn instruction_snapshot(&self, limit: usize) -> String {
        let counts = self
            .stage_counts()
            .iter()
            .map(|c| format!("- {}: {} requests", c.label, c.count))
            .collect::<Vec<_>>()
            .join("\n");

        let cards = self
            .cards
            .iter()
            .take(limit)
            .map(AppointmentCard::summary_line)
            .collect::<Vec<_>>()
            .join("\n");

        [
            "You manage the patient journal of a medical center. Use the tools create-appointment, update-appointment-stage and upsert-appointment-note for changes; they update the board instantly.".to_string(),
            "If the full name, doctor, contact or stage is missing, ask before calling a tool.".to_string(),
            "After each action tell the operator what changed and what the next step is.".to_string(),
            "Current stage summary:".to_string(),
            counts,
            format!("Active cards (up to {limit}):"),
            if cards.is_empty() {
                "- no requests yet".to_string()
            } else {
                cards
            },
        ]
        .join("\n")
    }
}

fn demo_cards() -> Vec<AppointmentCard> {
    vec![
        AppointmentCard::new(
            "appt-3201",
            "Dinara Akhmetova",
            "Cardiologist • Dr. Omarova",
            "Cardiology consultation and ECG",
            PipelineStage::New,
        )
        .with_contact("+7 700 112-45-63 (WhatsApp)")
        .with_note("Asks for a slot after 18:00, complains about blood pressure"),
        AppointmentCard::new(
            "appt-3202",
            "Ermek Baizhanov",
            "Neurologist • Dr. Kurmanov",
            "Cervical spine MRI",
            PipelineStage::Triage,
        )
        .with_contact("+7 702 555-44-11")
        .with_note("Check for metal implants, expects a call in the evening"),
        AppointmentCard::new(
            "appt-3203",
            "Anna Sidorova",
            "Pediatrician • Dr. Alieva",
            "Child vaccination",
            PipelineStage::Scheduled,
        )
        .with_contact("+7 701 908-33-22")
        .with_slot("12.02, 10:30")
        .with_note("Send the list of tests a day before the visit"),
        AppointmentCard::new(
            "appt-3204",
            "Ruslan Kim",
            "Dentist • Dr. Isabekova",
            "Surgical tooth extraction",
            PipelineStage::Scheduled,
        )
        .with_contact("ruslan.kim@example.com")
        .with_slot("13.02, 16:00")
        .with_note("Remind to pause anticoagulants 24 hours before"),
        AppointmentCard::new(
            "appt-3197",
            "Zarina Beisekova",
            "Dermatologist • Dr. Arman",
            "Laser nevus removal",
            PipelineStage::Completed,
        )
        .with_contact("+7 705 321-77-88")
        .with_note("Follow-up call in 3 days, check healing"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: &str, stage: PipelineStage) -> AppointmentCard {
        AppointmentCard::new(id, "Patient", "Doctor", "Service", stage)
    }

    #[test]
    fn test_with_cards_dedups_ids() {
        let store = BoardStore::with_cards(vec![
            card("a", PipelineStage::New),
            card("a", PipelineStage::Completed),
            card("b", PipelineStage::New),
        ]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.card("a").unwrap().stage, PipelineStage::New);
    }

    #[test]
    fn test_stage_counts() {
        let store = BoardStore::demo();
        let counts: Vec<usize> = store.stage_counts().iter().map(|c| c.count).collect();
        assert_eq!(counts, vec![1, 1, 2, 1]);
        assert_eq!(store.count(PipelineStage::Scheduled), 2);
    }

    #[test]
    fn test_next_scheduled_uses_insertion_order() {
        let store = BoardStore::with_cards(vec![
            card("x", PipelineStage::New),
            card("late", PipelineStage::Scheduled).with_slot("2025-03-01 09:00"),
            card("early", PipelineStage::Scheduled).with_slot("2025-01-01 09:00"),
        ]);
        assert_eq!(store.next_scheduled().unwrap().id, "late");
    }

    #[test]
    fn test_next_scheduled_ignores_blank_slots() {
        let store = BoardStore::with_cards(vec![
            card("blank", PipelineStage::Scheduled).with_slot("  "),
        ]);
        assert!(store.next_scheduled().is_none());
        assert!(BoardStore::new().next_scheduled().is_none());
    }

    #[test]
    fn test_instruction_snapshot() {
        let store = BoardStore::demo();
        let text = store.instruction_snapshot(2);
        assert!(text.contains("- Visit scheduled: 2 requests"));
        assert!(text.contains("appt-3201 • Dinara Akhmetova"));
        assert!(text.contains("appt-3202"));
        assert!(!text.contains("appt-3203"));
        assert!(text.contains("Active cards (up to 2):"));
    }

    #[test]
    fn test_instruction_snapshot_empty_board() {
        let text = BoardStore::new().instruction_snapshot(DEFAULT_SNAPSHOT_LIMIT);
        assert!(text.ends_with("- no requests yet"));
    }
}
