//! Generic CRUD access to the paginated journaling resources

use super::{ApiRequest, AuthenticatedClient, ClientError};
use crate::models::{
    CognitiveExercise, ExerciseNote, JournalDraft, JournalEntry, Meditation, ProblemSolvingSession,
    SessionCompletion, SessionUpdate, compose_exercise_note, notes_by_exercise,
};
use std::collections::BTreeMap;
use crate::types::Page;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::marker::PhantomData;
use tracing::{debug, warn};

/// Client-side checks run before a draft is sent
pub trait Validate {
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] describing the first bad field
    fn validate(&self) -> Result<(), ClientError>;
}

/// A backend collection exposed as `<collection>` and `<collection><id>/`
pub trait Resource: DeserializeOwned + Send + Sync {
    /// Collection path, with leading and trailing slash
    const COLLECTION: &'static str;

    /// Body accepted by create and full update
    type Draft: Serialize + Validate + Send + Sync;

    /// Server-assigned identifier
    fn id(&self) -> u64;

    /// Text fields matched by [`search`]
    fn search_fields(&self) -> Vec<&str>;
}

/// Case-insensitive substring search over each item's text fields
///
/// A blank query matches everything.
pub fn search<'a, R: Resource>(items: &'a [R], query: &str) -> Vec<&'a R> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return items.iter().collect();
    }
    items
        .iter()
        .filter(|item| {
            item.search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&query))
        })
        .collect()
}

/// Handle for one resource collection
pub struct Resources<'a, R> {
    client: &'a AuthenticatedClient,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> Resources<'_, R> {
    fn item_path(id: u64) -> String {
        format!("{}{id}/", R::COLLECTION)
    }

    /// Fetch one page; `cursor` is a `next`/`previous` link from an earlier page
    pub async fn list_page(&self, cursor: Option<&str>) -> Result<Page<R>, ClientError> {
        let request = ApiRequest::get(cursor.unwrap_or(R::COLLECTION));
        self.client.execute(&request).await
    }

    /// Fetch every page, following `next` links and dropping repeated ids
    ///
    /// Stops at the first `next` link that was already fetched.
    pub async fn list_all(&self) -> Result<Vec<R>, ClientError> {
        let mut items = Vec::new();
        let mut seen = HashSet::new();
        let mut visited =
            HashSet::from([ApiRequest::get(R::COLLECTION).url(self.client.base_url())]);
        let mut cursor: Option<String> = None;

        loop {
            let page = self.list_page(cursor.as_deref()).await?;
            debug!(
                collection = R::COLLECTION,
                count = page.count,
                fetched = page.results.len(),
                "Fetched page"
            );
            for item in page.results {
                if seen.insert(item.id()) {
                    items.push(item);
                }
            }
            match page.next {
                Some(next) if visited.insert(next.clone()) => cursor = Some(next),
                Some(next) => {
                    warn!(collection = R::COLLECTION, next, "Pagination link already fetched");
                    break;
                }
                None => break,
            }
        }

        Ok(items)
    }

    /// Fetch a single item
    pub async fn get(&self, id: u64) -> Result<R, ClientError> {
        self.client.execute(&ApiRequest::get(Self::item_path(id))).await
    }

    /// Create an item
    pub async fn create(&self, draft: &R::Draft) -> Result<R, ClientError> {
        draft.validate()?;
        let request = ApiRequest::post(R::COLLECTION).json(draft)?;
        self.client.execute(&request).await
    }

    /// Replace an item
    pub async fn update(&self, id: u64, draft: &R::Draft) -> Result<R, ClientError> {
        draft.validate()?;
        let request = ApiRequest::put(Self::item_path(id)).json(draft)?;
        self.client.execute(&request).await
    }

    /// Change some fields of an item
    pub async fn patch<P: Serialize + ?Sized>(&self, id: u64, fields: &P) -> Result<R, ClientError> {
        let request = ApiRequest::patch(Self::item_path(id)).json(fields)?;
        self.client.execute(&request).await
    }

    /// Delete an item
    pub async fn delete(&self, id: u64) -> Result<(), ClientError> {
        self.client
            .execute_empty(&ApiRequest::delete(Self::item_path(id)))
            .await
    }
}

impl Resources<'_, JournalEntry> {
    /// Save a note on a cognitive exercise as a journal entry
    pub async fn add_exercise_note(
        &self,
        exercise_title: &str,
        note: &str,
    ) -> Result<JournalEntry, ClientError> {
        if note.trim().is_empty() {
            return Err(ClientError::Validation(
                "Please enter your thoughts before submitting.".into(),
            ));
        }
        self.create(&JournalDraft {
            entry_text: compose_exercise_note(exercise_title, note),
        })
        .await
    }

    /// All exercise notes, keyed by exercise title
    pub async fn exercise_notes(&self) -> Result<BTreeMap<String, Vec<ExerciseNote>>, ClientError> {
        Ok(notes_by_exercise(&self.list_all().await?))
    }

    /// Replace the note text of an exercise note, keeping its exercise title
    pub async fn edit_exercise_note(&self, id: u64, note: &str) -> Result<JournalEntry, ClientError> {
        if note.trim().is_empty() {
            return Err(ClientError::Validation("Note cannot be empty.".into()));
        }
        let entry = self.get(id).await?;
        let Some(existing) = entry.exercise_note() else {
            return Err(ClientError::Validation(format!(
                "Journal entry #{id} is not an exercise note."
            )));
        };
        self.patch(
            id,
            &JournalDraft {
                entry_text: compose_exercise_note(&existing.exercise_title, note),
            },
        )
        .await
    }
}

impl Resources<'_, ProblemSolvingSession> {
    /// Change the given fields of a session
    pub async fn edit(
        &self,
        id: u64,
        update: &SessionUpdate,
    ) -> Result<ProblemSolvingSession, ClientError> {
        update.validate()?;
        self.patch(id, update).await
    }

    /// Mark a session completed, optionally recording notes
    ///
    /// The backend stamps `completed_at` when the flag flips.
    pub async fn complete(
        &self,
        id: u64,
        notes_after: Option<String>,
    ) -> Result<ProblemSolvingSession, ClientError> {
        self.patch(
            id,
            &SessionCompletion {
                completed: true,
                notes_after,
            },
        )
        .await
    }
}

impl AuthenticatedClient {
    /// Handle for any resource collection
    pub const fn resource<R: Resource>(&self) -> Resources<'_, R> {
        Resources {
            client: self,
            _resource: PhantomData,
        }
    }

    /// Journal entries of the current user
    pub const fn journal(&self) -> Resources<'_, JournalEntry> {
        self.resource()
    }

    /// Guided meditations (readable without logging in)
    pub const fn meditations(&self) -> Resources<'_, Meditation> {
        self.resource()
    }

    /// Cognitive exercises (readable without logging in)
    pub const fn cognitive_exercises(&self) -> Resources<'_, CognitiveExercise> {
        self.resource()
    }

    /// Problem-solving sessions of the current user
    pub const fn problem_solving_sessions(&self) -> Resources<'_, ProblemSolvingSession> {
        self.resource()
    }
}
