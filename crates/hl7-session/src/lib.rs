//! Session management.
//!
//! A session is a named set of field-path → value locks fed to the
//! assembler so repeated generations share fixed values. Sessions are
//! persisted as one JSON store (the full set is rewritten on every
//! mutation, so state survives restarts), temporary sessions expire 24
//! hours after their last activity and are purged lazily, and all
//! mutations on one manager are serialized through an in-process mutex.
//! A concurrent writer from another process is detected via the store's
//! generation counter and resolved last-writer-wins with a warning.

mod error;
mod names;
mod store;
mod template;

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use hl7_model::FieldPath;
use hl7_standards::Registry;

pub use error::SessionError;
pub use template::SessionTemplate;

/// Environment variable overriding the session store location.
pub const SESSION_STORE_ENV_VAR: &str = "HL7_SESSION_STORE";

const TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionKind {
    Temporary { expires_at: DateTime<Utc> },
    Permanent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub name: String,
    #[serde(flatten)]
    pub kind: SessionKind,
    pub locks: BTreeMap<FieldPath, String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    pub fn is_temporary(&self) -> bool {
        matches!(self.kind, SessionKind::Temporary { .. })
    }

    fn expired(&self, now: DateTime<Utc>) -> bool {
        match self.kind {
            SessionKind::Temporary { expires_at } => expires_at <= now,
            SessionKind::Permanent => false,
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
        if let SessionKind::Temporary { ref mut expires_at } = self.kind {
            *expires_at = now + Duration::hours(TTL_HOURS);
        }
    }
}

/// Default store path: `HL7_SESSION_STORE`, else
/// `~/.hl7-workbench/sessions.json`.
pub fn default_store_path() -> PathBuf {
    if let Ok(path) = std::env::var(SESSION_STORE_ENV_VAR) {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".hl7-workbench").join("sessions.json")
}

pub struct SessionManager {
    path: PathBuf,
    state: Mutex<store::StoreFile>,
}

impl SessionManager {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let store = store::load(&path)?;
        Ok(Self {
            path,
            state: Mutex::new(store),
        })
    }

    pub fn current(&self) -> Option<Session> {
        let mut state = self.lock_state();
        self.purge(&mut state, Utc::now());
        let name = state.current.clone()?;
        state.sessions.get(&name).cloned()
    }

    /// Lock a field path, creating a temporary session implicitly when no
    /// session is current. Returns the owning session.
    pub fn lock_field(
        &self,
        path: FieldPath,
        value: impl Into<String>,
    ) -> Result<Session, SessionError> {
        let now = Utc::now();
        let mut state = self.lock_state();
        self.purge(&mut state, now);

        let name = match state.current.clone() {
            Some(name) if state.sessions.contains_key(&name) => name,
            _ => {
                let existing: BTreeSet<String> = state.sessions.keys().cloned().collect();
                let name = names::generate(&existing, now.year(), &mut rand::thread_rng());
                debug!(session = %name, "created temporary session");
                state.sessions.insert(
                    name.clone(),
                    Session {
                        name: name.clone(),
                        kind: SessionKind::Temporary {
                            expires_at: now + Duration::hours(TTL_HOURS),
                        },
                        locks: BTreeMap::new(),
                        author: None,
                        description: None,
                        created_at: now,
                        last_activity: now,
                    },
                );
                state.current = Some(name.clone());
                name
            }
        };

        let session = state
            .sessions
            .get_mut(&name)
            .ok_or_else(|| SessionError::UnknownSession(name.clone()))?;
        session.locks.insert(path, value.into());
        session.touch(now);
        let result = session.clone();
        self.persist(&mut state)?;
        Ok(result)
    }

    pub fn clear_field(&self, path: &FieldPath) -> Result<(), SessionError> {
        let now = Utc::now();
        let mut state = self.lock_state();
        self.purge(&mut state, now);
        let name = state.current.clone().ok_or(SessionError::NoCurrentSession)?;
        let session = state
            .sessions
            .get_mut(&name)
            .ok_or(SessionError::NoCurrentSession)?;
        session.locks.remove(path);
        session.touch(now);
        self.persist(&mut state)
    }

    /// Promote the current session to a permanent one under `name`.
    pub fn save(&self, name: &str) -> Result<Session, SessionError> {
        let now = Utc::now();
        let mut state = self.lock_state();
        self.purge(&mut state, now);
        if state.sessions.contains_key(name) && state.current.as_deref() != Some(name) {
            return Err(SessionError::NameTaken(name.to_string()));
        }
        let current = state.current.clone().ok_or(SessionError::NoCurrentSession)?;
        let mut session = state
            .sessions
            .remove(&current)
            .ok_or(SessionError::NoCurrentSession)?;
        session.name = name.to_string();
        session.kind = SessionKind::Permanent;
        session.touch(now);
        let result = session.clone();
        state.sessions.insert(name.to_string(), session);
        state.current = Some(name.to_string());
        self.persist(&mut state)?;
        Ok(result)
    }

    pub fn use_session(&self, name: &str) -> Result<Session, SessionError> {
        let now = Utc::now();
        let mut state = self.lock_state();
        self.purge(&mut state, now);
        let session = state
            .sessions
            .get_mut(name)
            .ok_or_else(|| SessionError::UnknownSession(name.to_string()))?;
        session.touch(now);
        let result = session.clone();
        state.current = Some(name.to_string());
        self.persist(&mut state)?;
        Ok(result)
    }

    pub fn list(&self) -> Vec<Session> {
        let mut state = self.lock_state();
        self.purge(&mut state, Utc::now());
        state.sessions.values().cloned().collect()
    }

    pub fn remove(&self, name: &str) -> Result<(), SessionError> {
        let mut state = self.lock_state();
        if state.sessions.remove(name).is_none() {
            return Err(SessionError::UnknownSession(name.to_string()));
        }
        if state.current.as_deref() == Some(name) {
            state.current = None;
        }
        self.persist(&mut state)
    }

    /// Resolve a session's locks for assembly: the named session, or the
    /// current one when no name is given.
    pub fn locks_for(
        &self,
        name: Option<&str>,
    ) -> Result<BTreeMap<FieldPath, String>, SessionError> {
        match name {
            Some(name) => {
                let session = self.use_session(name)?;
                Ok(session.locks)
            }
            None => Ok(self.current().map(|s| s.locks).unwrap_or_default()),
        }
    }

    pub fn export(&self, name: &str) -> Result<SessionTemplate, SessionError> {
        let mut state = self.lock_state();
        self.purge(&mut state, Utc::now());
        let session = state
            .sessions
            .get(name)
            .ok_or_else(|| SessionError::UnknownSession(name.to_string()))?;
        Ok(SessionTemplate {
            name: session.name.clone(),
            author: session.author.clone(),
            created_at: session.created_at,
            description: session.description.clone(),
            locks: session.locks.clone(),
        })
    }

    /// Import a template as a permanent session. Every locked value is
    /// validated against the registry first; the first violation rejects
    /// the template wholesale, leaving the store untouched.
    pub fn import(
        &self,
        template: &SessionTemplate,
        registry: &Registry,
    ) -> Result<Session, SessionError> {
        for (path, value) in &template.locks {
            hl7_validate::check_locked_value(registry, path, value).map_err(|reason| {
                SessionError::ImportValidation {
                    name: template.name.clone(),
                    reason,
                }
            })?;
        }

        let now = Utc::now();
        let mut state = self.lock_state();
        self.purge(&mut state, now);
        if state.sessions.contains_key(&template.name) {
            return Err(SessionError::NameTaken(template.name.clone()));
        }
        let session = Session {
            name: template.name.clone(),
            kind: SessionKind::Permanent,
            locks: template.locks.clone(),
            author: template.author.clone(),
            description: template.description.clone(),
            created_at: template.created_at,
            last_activity: now,
        };
        state
            .sessions
            .insert(session.name.clone(), session.clone());
        state.current = Some(session.name.clone());
        self.persist(&mut state)?;
        Ok(session)
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, store::StoreFile> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn purge(&self, state: &mut store::StoreFile, now: DateTime<Utc>) {
        let before = state.sessions.len();
        state.sessions.retain(|_, session| !session.expired(now));
        if state.sessions.len() != before {
            debug!(
                purged = before - state.sessions.len(),
                "expired sessions removed"
            );
        }
        if let Some(current) = &state.current {
            if !state.sessions.contains_key(current) {
                state.current = None;
            }
        }
    }

    /// Persist the full session set. A store generation that moved under
    /// us means another writer raced this one; last writer wins, with a
    /// warning, and no partial state either way.
    fn persist(&self, state: &mut store::StoreFile) -> Result<(), SessionError> {
        if let Some(disk) = store::disk_generation(&self.path) {
            if disk != state.generation {
                warn!(
                    store = %self.path.display(),
                    ours = state.generation,
                    theirs = disk,
                    "session store was written concurrently; keeping this write"
                );
                state.generation = disk;
            }
        }
        state.generation += 1;
        store::save(&self.path, state)
    }
}
