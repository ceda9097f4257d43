//! The engine facade.
//!
//! [`Engine`] owns the loaded registry, the configured value source, and a
//! session manager handle, and exposes the operations CLI/GUI
//! collaborators consume: generate, validate, de-identify, diff, and
//! session passthrough. Registry problems are fatal at construction;
//! per-field trouble during generation is absorbed by the provider
//! fallback; an unparseable input message fails only its own call.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, info_span};

use hl7_assemble::{AssembleOptions, Assembler};
use hl7_datagen::{EnhancedConfig, EnhancedWithFallback, FallbackSource, ValueSource};
use hl7_deident::Deidentifier;
use hl7_diff::DiffEngine;
use hl7_model::{FieldDelta, FieldPath, Message, ValidationReport};
use hl7_parse::{parse, render};
use hl7_session::{Session, SessionManager, SessionTemplate, default_store_path};
use hl7_standards::Registry;
use hl7_validate::Validator;

/// Engine construction settings, populated by the front end from flags
/// and environment variables.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Standards directory; `None` uses the discovery rules of
    /// [`hl7_standards::default_standards_root`].
    pub standards_dir: Option<PathBuf>,
    /// Session store file; `None` uses [`default_store_path`].
    pub session_store: Option<PathBuf>,
    /// Enhanced provider endpoint and timeout; no endpoint means the
    /// curated fallback datasets serve every slot.
    pub enhanced: EnhancedConfig,
}

pub struct Engine {
    registry: Arc<Registry>,
    source: Box<dyn ValueSource>,
    sessions: SessionManager,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let registry = match &config.standards_dir {
            Some(dir) => Registry::load(dir),
            None => hl7_standards::load_default_registry(),
        }
        .context("load definition registry")?;
        let summary = registry.summary();
        info!(
            standard = %summary.standard,
            version = %summary.version,
            segments = summary.segment_count,
            tables = summary.table_count,
            "definition registry loaded"
        );

        let source: Box<dyn ValueSource> = if config.enhanced.endpoint.is_some() {
            Box::new(EnhancedWithFallback::new(config.enhanced.clone()))
        } else {
            Box::new(FallbackSource::new())
        };

        let store_path = config.session_store.clone().unwrap_or_else(default_store_path);
        let sessions = SessionManager::open(store_path).context("open session store")?;

        Ok(Self {
            registry: Arc::new(registry),
            source,
            sessions,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Generate one message, honoring the named (or current) session's
    /// locks. Generation always completes, with or without a configured
    /// enhancement endpoint.
    pub fn generate_message(
        &self,
        message_type: &str,
        facility: &str,
        session: Option<&str>,
    ) -> Result<Message> {
        let span = info_span!("generate", message_type, facility);
        let _guard = span.enter();
        let locks = self
            .sessions
            .locks_for(session)
            .context("resolve session locks")?;
        self.assemble_with(message_type, facility, locks, rand::random())
    }

    /// Generate a batch for load testing; each message draws its own seed
    /// but shares the session's locked values.
    pub fn generate_batch(
        &self,
        message_type: &str,
        facility: &str,
        session: Option<&str>,
        count: usize,
    ) -> Result<Vec<Message>> {
        let locks = self
            .sessions
            .locks_for(session)
            .context("resolve session locks")?;
        let mut messages = Vec::with_capacity(count);
        for _ in 0..count {
            messages.push(self.assemble_with(
                message_type,
                facility,
                locks.clone(),
                rand::random(),
            )?);
        }
        Ok(messages)
    }

    fn assemble_with(
        &self,
        message_type: &str,
        facility: &str,
        locks: BTreeMap<FieldPath, String>,
        seed: u64,
    ) -> Result<Message> {
        let assembler = Assembler::new(&self.registry, self.source.as_ref());
        let options =
            AssembleOptions::new(facility, seed, Utc::now().naive_utc()).with_locks(locks);
        let message = assembler
            .assemble(message_type, &options)
            .with_context(|| format!("assemble {message_type}"))?;
        Ok(message)
    }

    pub fn validate_message(
        &self,
        raw: &str,
        message_type: &str,
        vendor: Option<&str>,
    ) -> Result<ValidationReport> {
        let message = parse(raw).context("parse message")?;
        let report = Validator::new(&self.registry)
            .validate(&message, message_type, vendor)
            .context("validate message")?;
        Ok(report)
    }

    pub fn deidentify(&self, raw: &str) -> Result<Message> {
        let message = parse(raw).context("parse message")?;
        Ok(Deidentifier::new(&self.registry).deidentify(
            &message,
            rand::random(),
            Utc::now().naive_utc(),
        ))
    }

    pub fn diff_messages(&self, raw_a: &str, raw_b: &str) -> Result<Vec<FieldDelta>> {
        let a = parse(raw_a).context("parse first message")?;
        let b = parse(raw_b).context("parse second message")?;
        Ok(DiffEngine::new(&self.registry).diff(&a, &b))
    }

    /// Parse ER7 wire text without further processing; used by front ends
    /// that need the declared message type before choosing an operation.
    pub fn parse_message(&self, raw: &str) -> Result<Message> {
        Ok(parse(raw).context("parse message")?)
    }

    /// Render a message back to ER7 wire text.
    pub fn render_message(&self, message: &Message) -> String {
        render(message)
    }

    // Session passthrough, so CLI commands and a settings UI act on the
    // same state with the same semantics.

    pub fn session_lock(&self, path: &str, value: &str) -> Result<Session> {
        let path: FieldPath = path.parse().context("parse field path")?;
        Ok(self.sessions.lock_field(path, value)?)
    }

    pub fn session_clear(&self, path: &str) -> Result<()> {
        let path: FieldPath = path.parse().context("parse field path")?;
        Ok(self.sessions.clear_field(&path)?)
    }

    pub fn session_save(&self, name: &str) -> Result<Session> {
        Ok(self.sessions.save(name)?)
    }

    pub fn session_use(&self, name: &str) -> Result<Session> {
        Ok(self.sessions.use_session(name)?)
    }

    pub fn session_list(&self) -> Vec<Session> {
        self.sessions.list()
    }

    pub fn session_remove(&self, name: &str) -> Result<()> {
        Ok(self.sessions.remove(name)?)
    }

    pub fn session_export(&self, name: &str) -> Result<SessionTemplate> {
        Ok(self.sessions.export(name)?)
    }

    pub fn session_import(&self, template: &SessionTemplate) -> Result<Session> {
        Ok(self.sessions.import(template, &self.registry)?)
    }
}
