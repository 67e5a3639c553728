//! Journaling, meditation, exercise and session records
//!
//! Each record type pairs with a draft type that is validated with the same
//! rules the backend applies before anything goes over the wire.

use crate::client::ClientError;
use crate::client::resources::{Resource, Validate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn not_blank(value: &str, message: &str) -> Result<(), ClientError> {
    if value.trim().is_empty() {
        Err(ClientError::Validation(message.to_string()))
    } else {
        Ok(())
    }
}

/// A private journal entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: u64,
    pub entry_text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub user: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JournalDraft {
    pub entry_text: String,
}

impl Validate for JournalDraft {
    fn validate(&self) -> Result<(), ClientError> {
        not_blank(&self.entry_text, "Entry text cannot be empty.")
    }
}

impl Resource for JournalEntry {
    const COLLECTION: &'static str = "/journaling/";
    type Draft = JournalDraft;

    fn id(&self) -> u64 {
        self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.entry_text.as_str()]
    }
}

/// Group entries by calendar month, labelled like `"March 2025"`
///
/// Groups appear in the order their first entry appears, so a newest-first
/// list yields newest-first groups.
pub fn group_by_month(entries: &[JournalEntry]) -> Vec<(String, Vec<&JournalEntry>)> {
    let mut groups: Vec<(String, Vec<&JournalEntry>)> = Vec::new();
    for entry in entries {
        let label = entry.created_at.format("%B %Y").to_string();
        let position = groups.iter().position(|(existing, _)| *existing == label);
        match position {
            Some(index) => groups[index].1.push(entry),
            None => groups.push((label, vec![entry])),
        }
    }
    groups
}

/// A guided meditation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meditation {
    pub id: u64,
    pub title: String,
    pub description: String,
    /// Length in minutes
    pub duration: u32,
    #[serde(default)]
    pub audio_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeditationDraft {
    pub title: String,
    pub description: String,
    pub duration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

impl Validate for MeditationDraft {
    fn validate(&self) -> Result<(), ClientError> {
        not_blank(&self.title, "Title cannot be empty.")?;
        not_blank(&self.description, "Description cannot be empty.")?;
        if self.duration == 0 {
            return Err(ClientError::Validation(
                "Duration must be a positive integer.".into(),
            ));
        }
        Ok(())
    }
}

impl Resource for Meditation {
    const COLLECTION: &'static str = "/journaling/meditations/";
    type Draft = MeditationDraft;

    fn id(&self) -> u64 {
        self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.title.as_str(), self.description.as_str()]
    }
}

/// A reframing exercise with a prompt and a worked example
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CognitiveExercise {
    pub id: u64,
    pub title: String,
    pub prompt: String,
    pub example: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CognitiveExerciseDraft {
    pub title: String,
    pub prompt: String,
    pub example: String,
}

impl Validate for CognitiveExerciseDraft {
    fn validate(&self) -> Result<(), ClientError> {
        not_blank(&self.title, "Title cannot be empty.")?;
        not_blank(&self.prompt, "Prompt cannot be empty.")?;
        not_blank(&self.example, "Example cannot be empty.")
    }
}

impl Resource for CognitiveExercise {
    const COLLECTION: &'static str = "/journaling/cognitive_exercises/";
    type Draft = CognitiveExerciseDraft;

    fn id(&self) -> u64 {
        self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.title.as_str(), self.prompt.as_str(), self.example.as_str()]
    }
}

const EXERCISE_NOTE_PREFIX: &str = "Exercise: ";

/// A note on a cognitive exercise, stored as a journal entry
///
/// The entry text reads `"Exercise: <title>\n\n<note>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExerciseNote {
    pub entry_id: u64,
    pub exercise_title: String,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

/// Entry text for a note on the exercise titled `exercise_title`
pub fn compose_exercise_note(exercise_title: &str, note: &str) -> String {
    format!(
        "{EXERCISE_NOTE_PREFIX}{}\n\n{}",
        exercise_title.trim(),
        note.trim()
    )
}

/// Split exercise-note text into `(title, note)`, both non-empty
pub fn parse_exercise_note(text: &str) -> Option<(&str, &str)> {
    let (title, note) = text.strip_prefix(EXERCISE_NOTE_PREFIX)?.split_once("\n\n")?;
    let (title, note) = (title.trim(), note.trim());
    if title.is_empty() || note.is_empty() {
        None
    } else {
        Some((title, note))
    }
}

impl JournalEntry {
    /// This entry read as an exercise note, if it is one
    pub fn exercise_note(&self) -> Option<ExerciseNote> {
        parse_exercise_note(&self.entry_text).map(|(title, note)| ExerciseNote {
            entry_id: self.id,
            exercise_title: title.to_string(),
            note: note.to_string(),
            created_at: self.created_at,
        })
    }
}

/// Exercise notes among `entries`, grouped by exercise title in entry order
pub fn notes_by_exercise(entries: &[JournalEntry]) -> BTreeMap<String, Vec<ExerciseNote>> {
    let mut notes: BTreeMap<String, Vec<ExerciseNote>> = BTreeMap::new();
    for note in entries.iter().filter_map(JournalEntry::exercise_note) {
        notes
            .entry(note.exercise_title.clone())
            .or_default()
            .push(note);
    }
    notes
}

/// A scheduled block of time for working through a problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemSolvingSession {
    pub id: u64,
    #[serde(default)]
    pub user: Option<u64>,
    pub title: String,
    pub scheduled_time: DateTime<Utc>,
    #[serde(default)]
    pub notes_before: Option<String>,
    #[serde(default)]
    pub notes_after: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionDraft {
    pub title: String,
    pub scheduled_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes_before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes_after: Option<String>,
    pub completed: bool,
}

impl Validate for SessionDraft {
    fn validate(&self) -> Result<(), ClientError> {
        not_blank(&self.title, "Title cannot be empty.")?;
        if self.scheduled_time < Utc::now() {
            return Err(ClientError::Validation(
                "Scheduled time must be in the future.".into(),
            ));
        }
        Ok(())
    }
}

/// Partial update of a session; unset fields are left alone
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes_before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes_after: Option<String>,
}

impl SessionUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.scheduled_time.is_none()
            && self.notes_before.is_none()
            && self.notes_after.is_none()
    }
}

impl Validate for SessionUpdate {
    fn validate(&self) -> Result<(), ClientError> {
        if self.is_empty() {
            return Err(ClientError::Validation("Nothing to update.".into()));
        }
        if let Some(title) = &self.title {
            not_blank(title, "Title cannot be empty.")?;
        }
        Ok(())
    }
}

/// Partial update that closes a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionCompletion {
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes_after: Option<String>,
}

impl Resource for ProblemSolvingSession {
    const COLLECTION: &'static str = "/journaling/problem_solving_sessions/";
    type Draft = SessionDraft;

    fn id(&self) -> u64 {
        self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str()];
        fields.extend(self.notes_before.as_deref());
        fields.extend(self.notes_after.as_deref());
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search;
    use chrono::{Duration, TimeZone};

    fn entry(id: u64, text: &str, year: i32, month: u32) -> JournalEntry {
        JournalEntry {
            id,
            entry_text: text.to_string(),
            created_at: Utc.with_ymd_and_hms(year, month, 3, 9, 30, 0).unwrap(),
            user: Some(1),
        }
    }

    #[test]
    fn test_journal_entry_decodes_backend_payload() {
        let entry: JournalEntry = serde_json::from_str(
            r#"{"id": 7, "entry_text": "Slept well", "created_at": "2025-03-02T08:15:30.123456Z", "user": 1}"#,
        )
        .unwrap();
        assert_eq!(entry.id, 7);
        assert_eq!(entry.created_at.format("%Y-%m-%d").to_string(), "2025-03-02");
    }

    #[test]
    fn test_session_decodes_with_offset_and_nulls() {
        let session: ProblemSolvingSession = serde_json::from_str(
            r#"{
                "id": 3, "user": 1, "title": "Budget",
                "scheduled_time": "2025-06-01T10:00:00+02:00",
                "notes_before": null, "notes_after": null,
                "completed": false, "completed_at": null,
                "created_at": "2025-05-20T12:00:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(session.scheduled_time.format("%H:%M").to_string(), "08:00");
        assert!(session.notes_before.is_none());
        assert_eq!(session.search_fields(), vec!["Budget"]);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let entries = vec![
            entry(1, "Walked in the PARK", 2025, 3),
            entry(2, "Read a book", 2025, 3),
        ];
        let hits = search(&entries, "park");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);

        assert_eq!(search(&entries, "   ").len(), 2);
        assert!(search(&entries, "swim").is_empty());
    }

    #[test]
    fn test_search_meditation_description() {
        let meditations = vec![Meditation {
            id: 1,
            title: "Morning".to_string(),
            description: "Body scan for calm".to_string(),
            duration: 10,
            audio_url: None,
            created_at: Utc::now(),
        }];
        assert_eq!(search(&meditations, "scan").len(), 1);
    }

    #[test]
    fn test_group_by_month_keeps_order() {
        let entries = vec![
            entry(3, "c", 2025, 4),
            entry(2, "b", 2025, 3),
            entry(1, "a", 2025, 3),
        ];
        let groups = group_by_month(&entries);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "April 2025");
        assert_eq!(groups[1].0, "March 2025");
        assert_eq!(groups[1].1.len(), 2);
    }

    #[test]
    fn test_draft_validation() {
        assert!(
            JournalDraft {
                entry_text: "  ".into()
            }
            .validate()
            .is_err()
        );

        let meditation = MeditationDraft {
            title: "Breath".into(),
            description: "Slow breathing".into(),
            duration: 0,
            audio_url: None,
        };
        assert!(matches!(
            meditation.validate(),
            Err(ClientError::Validation(message)) if message.contains("Duration")
        ));

        let session = SessionDraft {
            title: "Plan".into(),
            scheduled_time: Utc::now() - Duration::hours(1),
            notes_before: None,
            notes_after: None,
            completed: false,
        };
        assert!(session.validate().is_err());

        let session = SessionDraft {
            scheduled_time: Utc::now() + Duration::hours(1),
            ..session
        };
        assert!(session.validate().is_ok());
    }

    #[test]
    fn test_meditation_draft_omits_missing_audio() {
        let draft = MeditationDraft {
            title: "Breath".into(),
            description: "Slow breathing".into(),
            duration: 5,
            audio_url: None,
        };
        let json = serde_json::to_value(&draft).unwrap();
        assert!(json.get("audio_url").is_none());
    }

    #[test]
    fn test_meditation_requires_description() {
        let meditation = MeditationDraft {
            title: "Breath".into(),
            description: "  ".into(),
            duration: 5,
            audio_url: None,
        };
        assert!(matches!(
            meditation.validate(),
            Err(ClientError::Validation(message)) if message == "Description cannot be empty."
        ));
    }

    #[test]
    fn test_exercise_requires_prompt_and_example() {
        let exercise = CognitiveExerciseDraft {
            title: "Reframe".into(),
            prompt: String::new(),
            example: "I failed once, not always.".into(),
        };
        assert!(matches!(
            exercise.validate(),
            Err(ClientError::Validation(message)) if message == "Prompt cannot be empty."
        ));

        let exercise = CognitiveExerciseDraft {
            prompt: "What evidence contradicts the thought?".into(),
            example: String::new(),
            ..exercise
        };
        assert!(matches!(
            exercise.validate(),
            Err(ClientError::Validation(message)) if message == "Example cannot be empty."
        ));

        let exercise = CognitiveExerciseDraft {
            example: "I failed once, not always.".into(),
            ..exercise
        };
        assert!(exercise.validate().is_ok());
    }

    #[test]
    fn test_exercise_note_text() {
        let text = compose_exercise_note(" Reframe ", "  Felt lighter afterwards\n");
        assert_eq!(text, "Exercise: Reframe\n\nFelt lighter afterwards");
        assert_eq!(
            parse_exercise_note(&text),
            Some(("Reframe", "Felt lighter afterwards"))
        );

        // Multi-paragraph notes keep their inner breaks
        assert_eq!(
            parse_exercise_note("Exercise: Reframe\n\nFirst.\n\nSecond."),
            Some(("Reframe", "First.\n\nSecond."))
        );

        assert_eq!(parse_exercise_note("Went for a run"), None);
        assert_eq!(parse_exercise_note("Exercise: Reframe"), None);
        assert_eq!(parse_exercise_note("Exercise: \n\nnote"), None);
        assert_eq!(parse_exercise_note("Exercise: Reframe\n\n   "), None);
    }

    #[test]
    fn test_notes_by_exercise() {
        let entries = vec![
            entry(5, "Exercise: Reframe\n\nSecond try went better", 2025, 4),
            entry(4, "Plain journal entry", 2025, 4),
            entry(3, "Exercise: Gratitude list\n\nThree things today", 2025, 3),
            entry(2, "Exercise: Reframe\n\nHard at first", 2025, 3),
        ];
        let notes = notes_by_exercise(&entries);

        assert_eq!(notes.len(), 2);
        let reframe: Vec<u64> = notes["Reframe"].iter().map(|n| n.entry_id).collect();
        assert_eq!(reframe, vec![5, 2]);
        assert_eq!(notes["Gratitude list"][0].note, "Three things today");
    }

    #[test]
    fn test_session_update_sends_only_given_fields() {
        let update = SessionUpdate {
            title: Some("Budget review".into()),
            ..Default::default()
        };
        assert!(update.validate().is_ok());
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({ "title": "Budget review" })
        );

        assert!(SessionUpdate::default().validate().is_err());
        let blank = SessionUpdate {
            title: Some(" ".into()),
            ..Default::default()
        };
        assert!(blank.validate().is_err());
    }
}
