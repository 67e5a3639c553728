//! CLI commands

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use clap::Subcommand;
use haven_core::{FileCredentialStore, HavenConfig, Navigator};
use haven_http::models::{
    CognitiveExerciseDraft, JournalDraft, MeditationDraft, SessionDraft, SessionUpdate,
    group_by_month,
};
use haven_http::types::{ProfileUpdate, RegisterRequest};
use haven_http::{AuthenticatedClient, ClientBuilder, search};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config;

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store credentials
    Login {
        username: String,

        #[arg(long, env = "HAVEN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget stored credentials
    Logout,

    /// Create an account
    Register {
        username: String,

        #[arg(long)]
        email: String,

        #[arg(long, env = "HAVEN_PASSWORD", hide_env_values = true)]
        password: String,

        /// Password confirmation (defaults to --password)
        #[arg(long)]
        confirm: Option<String>,
    },

    /// Show the current user's profile, or update it when fields are given
    Profile {
        #[arg(long)]
        username: Option<String>,

        #[arg(long)]
        email: Option<String>,
    },

    /// Password reset by email link
    PasswordReset {
        #[command(subcommand)]
        command: PasswordResetCommands,
    },

    /// Journal entries
    Journal {
        #[command(subcommand)]
        command: JournalCommands,
    },

    /// Guided meditations
    Meditations {
        #[command(subcommand)]
        command: MeditationCommands,
    },

    /// Cognitive exercises
    Exercises {
        #[command(subcommand)]
        command: ExerciseCommands,
    },

    /// Problem-solving sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// Configuration files
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum PasswordResetCommands {
    /// Email a reset link
    Request { email: String },

    /// Check that a reset link is still valid
    Verify { uid: String, token: String },

    /// Set a new password
    Confirm {
        uid: String,
        token: String,

        #[arg(long, env = "HAVEN_NEW_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Subcommand)]
pub enum JournalCommands {
    /// List entries grouped by month
    List {
        #[arg(long)]
        search: Option<String>,
    },

    /// Write a new entry
    Add { text: String },

    /// Replace the text of an entry
    Edit { id: u64, text: String },

    /// Delete an entry
    Delete { id: u64 },
}

#[derive(Subcommand)]
pub enum MeditationCommands {
    /// List meditations
    List {
        #[arg(long)]
        search: Option<String>,
    },

    /// Add a meditation
    Add {
        title: String,

        /// Length in minutes
        #[arg(long)]
        duration: u32,

        #[arg(long)]
        description: String,

        #[arg(long)]
        audio_url: Option<String>,
    },

    /// Change a meditation; unset fields keep their current value
    Edit {
        id: u64,

        #[arg(long)]
        title: Option<String>,

        /// Length in minutes
        #[arg(long)]
        duration: Option<u32>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        audio_url: Option<String>,
    },

    /// Delete a meditation
    Delete { id: u64 },
}

#[derive(Subcommand)]
pub enum ExerciseCommands {
    /// List exercises
    List {
        #[arg(long)]
        search: Option<String>,
    },

    /// Add an exercise
    Add {
        title: String,

        #[arg(long)]
        prompt: String,

        #[arg(long)]
        example: String,
    },

    /// Delete an exercise
    Delete { id: u64 },

    /// Your notes on exercises, kept in the journal
    Note {
        #[command(subcommand)]
        command: ExerciseNoteCommands,
    },
}

#[derive(Subcommand)]
pub enum ExerciseNoteCommands {
    /// Write a note on an exercise
    Add { exercise_id: u64, note: String },

    /// List notes grouped by exercise
    List {
        /// Only notes on the exercise with this title
        #[arg(long)]
        exercise: Option<String>,
    },

    /// Replace the text of a note, keeping its exercise
    Edit { entry_id: u64, note: String },
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// List sessions
    List {
        #[arg(long)]
        search: Option<String>,
    },

    /// Schedule a session
    Add {
        title: String,

        /// Start time in RFC 3339, e.g. 2025-06-01T10:00:00+02:00
        #[arg(long)]
        at: DateTime<Utc>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Change a session; unset fields keep their current value
    Edit {
        id: u64,

        #[arg(long)]
        title: Option<String>,

        /// Start time in RFC 3339
        #[arg(long)]
        at: Option<DateTime<Utc>>,

        #[arg(long)]
        notes_before: Option<String>,

        #[arg(long)]
        notes_after: Option<String>,
    },

    /// Mark a session completed
    Complete {
        id: u64,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete a session
    Delete { id: u64 },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Write the effective configuration to a file
    Init {
        /// Output file path (defaults to <state dir>/config.json)
        output: Option<PathBuf>,
    },
}

/// Tells the terminal user to log in again
struct LoginPrompt;

impl Navigator for LoginPrompt {
    fn navigate(&self, path: &str) {
        warn!(path, "Session expired");
        eprintln!("Your session has expired. Run `haven login` to sign in again.");
    }
}

fn client(settings: &HavenConfig) -> Result<AuthenticatedClient> {
    let store = FileCredentialStore::in_dir(&settings.session.state_dir);
    let client = ClientBuilder::from_config(settings)
        .credential_store(Arc::new(store))
        .navigator(Arc::new(LoginPrompt))
        .build_authenticated()?;
    Ok(client)
}

fn local_time(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

impl Commands {
    pub async fn execute(self, settings: HavenConfig) -> Result<()> {
        match self {
            Commands::Config { command } => command.execute(&settings),
            Commands::Login { username, password } => {
                client(&settings)?.login(&username, &password).await?;
                println!("Logged in as {username}");
                Ok(())
            }
            Commands::Logout => {
                client(&settings)?.logout()?;
                println!("Logged out");
                Ok(())
            }
            Commands::Register {
                username,
                email,
                password,
                confirm,
            } => {
                let client = client(&settings)?;
                let registration = RegisterRequest {
                    username,
                    email,
                    password2: confirm.unwrap_or_else(|| password.clone()),
                    password,
                };
                let profile = client.public().register(&registration).await?;
                info!(id = profile.id, "Account created");
                println!("Registered {}. Run `haven login` to sign in.", profile.username);
                Ok(())
            }
            Commands::Profile { username, email } => {
                let client = client(&settings)?;
                let profile = if username.is_none() && email.is_none() {
                    client.profile().await?
                } else {
                    client
                        .update_profile(&ProfileUpdate { username, email })
                        .await?
                };
                println!("{}", serde_json::to_string_pretty(&profile)?);
                Ok(())
            }
            Commands::PasswordReset { command } => command.execute(&client(&settings)?).await,
            Commands::Journal { command } => command.execute(&client(&settings)?).await,
            Commands::Meditations { command } => command.execute(&client(&settings)?).await,
            Commands::Exercises { command } => command.execute(&client(&settings)?).await,
            Commands::Sessions { command } => command.execute(&client(&settings)?).await,
        }
    }
}

impl PasswordResetCommands {
    pub async fn execute(self, client: &AuthenticatedClient) -> Result<()> {
        let public = client.public();
        let reply = match self {
            PasswordResetCommands::Request { email } => {
                public.request_password_reset(&email).await?
            }
            PasswordResetCommands::Verify { uid, token } => {
                public.verify_password_reset(&uid, &token).await?
            }
            PasswordResetCommands::Confirm {
                uid,
                token,
                password,
            } => public.confirm_password_reset(&uid, &token, &password).await?,
        };
        println!("{}", reply.message);
        Ok(())
    }
}

impl JournalCommands {
    pub async fn execute(self, client: &AuthenticatedClient) -> Result<()> {
        let journal = client.journal();
        match self {
            JournalCommands::List { search: query } => {
                let entries = journal.list_all().await?;
                let matches: Vec<_> = search(&entries, query.as_deref().unwrap_or(""))
                    .into_iter()
                    .cloned()
                    .collect();
                if matches.is_empty() {
                    println!("No journal entries");
                }
                for (month, group) in group_by_month(&matches) {
                    println!("{month}");
                    for entry in group {
                        println!(
                            "  #{:<5} {}  {}",
                            entry.id,
                            local_time(&entry.created_at),
                            entry.entry_text
                        );
                    }
                }
            }
            JournalCommands::Add { text } => {
                let entry = journal.create(&JournalDraft { entry_text: text }).await?;
                println!("Created entry #{}", entry.id);
            }
            JournalCommands::Edit { id, text } => {
                journal.update(id, &JournalDraft { entry_text: text }).await?;
                println!("Updated entry #{id}");
            }
            JournalCommands::Delete { id } => {
                journal.delete(id).await?;
                println!("Deleted entry #{id}");
            }
        }
        Ok(())
    }
}

impl MeditationCommands {
    pub async fn execute(self, client: &AuthenticatedClient) -> Result<()> {
        let meditations = client.meditations();
        match self {
            MeditationCommands::List { search: query } => {
                let all = meditations.list_all().await?;
                for meditation in search(&all, query.as_deref().unwrap_or("")) {
                    println!(
                        "#{:<5} {} ({} min)",
                        meditation.id, meditation.title, meditation.duration
                    );
                    if !meditation.description.is_empty() {
                        println!("       {}", meditation.description);
                    }
                }
            }
            MeditationCommands::Add {
                title,
                duration,
                description,
                audio_url,
            } => {
                let meditation = meditations
                    .create(&MeditationDraft {
                        title,
                        description,
                        duration,
                        audio_url,
                    })
                    .await?;
                println!("Created meditation #{}", meditation.id);
            }
            MeditationCommands::Edit {
                id,
                title,
                duration,
                description,
                audio_url,
            } => {
                let current = meditations.get(id).await?;
                let draft = MeditationDraft {
                    title: title.unwrap_or(current.title),
                    description: description.unwrap_or(current.description),
                    duration: duration.unwrap_or(current.duration),
                    audio_url: audio_url.or(current.audio_url),
                };
                meditations.update(id, &draft).await?;
                println!("Updated meditation #{id}");
            }
            MeditationCommands::Delete { id } => {
                meditations.delete(id).await?;
                println!("Deleted meditation #{id}");
            }
        }
        Ok(())
    }
}

impl ExerciseCommands {
    pub async fn execute(self, client: &AuthenticatedClient) -> Result<()> {
        let exercises = client.cognitive_exercises();
        match self {
            ExerciseCommands::List { search: query } => {
                let all = exercises.list_all().await?;
                for exercise in search(&all, query.as_deref().unwrap_or("")) {
                    println!("#{:<5} {}", exercise.id, exercise.title);
                    if !exercise.prompt.is_empty() {
                        println!("       Prompt:  {}", exercise.prompt);
                    }
                    if !exercise.example.is_empty() {
                        println!("       Example: {}", exercise.example);
                    }
                }
            }
            ExerciseCommands::Add {
                title,
                prompt,
                example,
            } => {
                let exercise = exercises
                    .create(&CognitiveExerciseDraft {
                        title,
                        prompt,
                        example,
                    })
                    .await?;
                println!("Created exercise #{}", exercise.id);
            }
            ExerciseCommands::Delete { id } => {
                exercises.delete(id).await?;
                println!("Deleted exercise #{id}");
            }
            ExerciseCommands::Note { command } => command.execute(client).await?,
        }
        Ok(())
    }
}

impl ExerciseNoteCommands {
    pub async fn execute(self, client: &AuthenticatedClient) -> Result<()> {
        let journal = client.journal();
        match self {
            ExerciseNoteCommands::Add { exercise_id, note } => {
                let exercise = client.cognitive_exercises().get(exercise_id).await?;
                let entry = journal.add_exercise_note(&exercise.title, &note).await?;
                println!("Saved note #{} on \"{}\"", entry.id, exercise.title);
            }
            ExerciseNoteCommands::List { exercise } => {
                let grouped = journal.exercise_notes().await?;
                let mut shown = 0;
                for (title, notes) in &grouped {
                    if exercise.as_deref().is_some_and(|wanted| wanted != title.as_str()) {
                        continue;
                    }
                    println!("{title}");
                    for note in notes {
                        println!(
                            "  #{:<5} {}  {}",
                            note.entry_id,
                            local_time(&note.created_at),
                            note.note
                        );
                    }
                    shown += 1;
                }
                if shown == 0 {
                    println!("No exercise notes");
                }
            }
            ExerciseNoteCommands::Edit { entry_id, note } => {
                journal.edit_exercise_note(entry_id, &note).await?;
                println!("Updated note #{entry_id}");
            }
        }
        Ok(())
    }
}

impl SessionCommands {
    pub async fn execute(self, client: &AuthenticatedClient) -> Result<()> {
        let sessions = client.problem_solving_sessions();
        match self {
            SessionCommands::List { search: query } => {
                let all = sessions.list_all().await?;
                for session in search(&all, query.as_deref().unwrap_or("")) {
                    let mark = if session.completed { "x" } else { " " };
                    println!(
                        "[{mark}] #{:<5} {}  {}",
                        session.id,
                        local_time(&session.scheduled_time),
                        session.title
                    );
                }
            }
            SessionCommands::Add { title, at, notes } => {
                let session = sessions
                    .create(&SessionDraft {
                        title,
                        scheduled_time: at,
                        notes_before: notes,
                        notes_after: None,
                        completed: false,
                    })
                    .await?;
                println!(
                    "Scheduled session #{} for {}",
                    session.id,
                    local_time(&session.scheduled_time)
                );
            }
            SessionCommands::Edit {
                id,
                title,
                at,
                notes_before,
                notes_after,
            } => {
                let update = SessionUpdate {
                    title,
                    scheduled_time: at,
                    notes_before,
                    notes_after,
                };
                sessions.edit(id, &update).await?;
                println!("Updated session #{id}");
            }
            SessionCommands::Complete { id, notes } => {
                sessions.complete(id, notes).await?;
                println!("Completed session #{id}");
            }
            SessionCommands::Delete { id } => {
                sessions.delete(id).await?;
                println!("Deleted session #{id}");
            }
        }
        Ok(())
    }
}

impl ConfigCommands {
    pub fn execute(self, settings: &HavenConfig) -> Result<()> {
        match self {
            ConfigCommands::Show => {
                println!("{}", serde_json::to_string_pretty(settings)?);
            }
            ConfigCommands::Init { output } => {
                let config_path = output
                    .unwrap_or_else(|| settings.session.state_dir.join(config::DEFAULT_CONFIG_FILE));
                config::write_config(settings, &config_path)?;
                println!("Generated configuration at: {}", config_path.display());
            }
        }
        Ok(())
    }
}
