#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use curricula::client::{ClientError, LinkTransport};
use curricula::models::*;
use curricula::{Database, LinkError};
use uuid::Uuid;

pub fn setup_db() -> Database {
    let db = Database::open_memory().expect("Failed to create test database");
    db.migrate().expect("Failed to migrate test database");
    db
}

pub fn create_program(db: &Database, title: &str) -> Program {
    db.create_program(CreateProgramInput {
        title: title.into(),
        total_weeks: 4,
        description: None,
    })
    .expect("Failed to create program")
}

pub fn create_template(db: &Database, week: i64, label: &str, status: TemplateStatus) -> Template {
    let mut input = CreateTemplateInput::new(week, label);
    input.status = Some(status);
    db.create_template(input).expect("Failed to create template")
}

pub fn published(db: &Database, week: i64, label: &str) -> Template {
    create_template(db, week, label, TemplateStatus::Published)
}

/// Transport that runs every call against a real database, with switches for
/// injected failures and latency.
pub struct DbTransport {
    pub db: Database,
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<Uuid>>,
    fail_reorder: Mutex<bool>,
    delay: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl DbTransport {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            fail_reorder: Mutex::new(false),
            delay: Mutex::new(Duration::ZERO),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_template(&self, template_id: Uuid) {
        self.failing.lock().unwrap().insert(template_id);
    }

    pub fn heal_template(&self, template_id: Uuid) {
        self.failing.lock().unwrap().remove(&template_id);
    }

    pub fn fail_reorder(&self, fail: bool) {
        *self.fail_reorder.lock().unwrap() = fail;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn call<T>(
        &self,
        label: String,
        template_id: Option<Uuid>,
        f: impl FnOnce(&Database) -> Result<T, LinkError>,
    ) -> Result<T, ClientError> {
        self.calls.lock().unwrap().push(label);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let injected = template_id.is_some_and(|id| self.failing.lock().unwrap().contains(&id));
        if injected {
            return Err(ClientError::Http {
                status: 503,
                code: "unavailable".into(),
                message: None,
            });
        }
        f(&self.db).map_err(|e| ClientError::Http {
            status: if e.is_not_found() { 404 } else { 400 },
            code: e.code().to_string(),
            message: Some(e.to_string()),
        })
    }
}

#[async_trait]
impl LinkTransport for DbTransport {
    async fn load_panel(&self, program_id: Uuid) -> Result<ProgramTemplates, ClientError> {
        self.call(format!("GET {program_id}"), None, |db| {
            db.list_program_templates(program_id, &ListTemplatesQuery::default())
        })
        .await
    }

    async fn attach(
        &self,
        program_id: Uuid,
        template_id: Uuid,
        overrides: &MetadataPatch,
    ) -> Result<AttachResponse, ClientError> {
        self.call(format!("POST {template_id}"), Some(template_id), |db| {
            let outcome = db.attach_template(program_id, template_id, overrides, None)?;
            Ok(AttachResponse {
                attached: true,
                already_attached: outcome.already_attached,
                template: outcome.template,
            })
        })
        .await
    }

    async fn detach(
        &self,
        program_id: Uuid,
        template_id: Uuid,
    ) -> Result<DetachResponse, ClientError> {
        self.call(format!("DELETE {template_id}"), Some(template_id), |db| {
            let outcome = db.detach_template(program_id, template_id)?;
            Ok(DetachResponse {
                detached: true,
                was_attached: outcome.was_attached,
            })
        })
        .await
    }

    async fn update_metadata(
        &self,
        program_id: Uuid,
        template_id: Uuid,
        patch: &MetadataPatch,
    ) -> Result<UpdateMetadataResponse, ClientError> {
        let label = format!(
            "PATCH {template_id} {}",
            serde_json::Value::Object(patch.to_json())
        );
        self.call(label, Some(template_id), |db| {
            let outcome = db.update_link_metadata(program_id, template_id, patch, None)?;
            Ok(UpdateMetadataResponse {
                updated: outcome.updated,
                template: outcome.template,
            })
        })
        .await
    }

    async fn reorder(
        &self,
        program_id: Uuid,
        order: &[Uuid],
    ) -> Result<ReorderResponse, ClientError> {
        if *self.fail_reorder.lock().unwrap() {
            self.calls.lock().unwrap().push("POST reorder".into());
            return Err(ClientError::Http {
                status: 503,
                code: "unavailable".into(),
                message: None,
            });
        }
        self.call("POST reorder".into(), None, |db| {
            let updated = db.reorder_links(program_id, order, None)?;
            Ok(ReorderResponse { updated })
        })
        .await
    }
}
