use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use curricula_core::models::*;
use curricula_core::LinkError;
use serde_json::{json, Value};
use uuid::Uuid;

use super::error::ApiError;
use super::identity::CurrentUser;
use super::wire::{self, AttachRequest, ListParams};
use super::AppState;
use crate::auth;

fn body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| ApiError::InvalidBody(e.body_text()))
}

fn program_id(raw: &str) -> Result<Uuid, ApiError> {
    wire::path_id(raw, LinkError::ProgramNotFound)
}

fn require_manage(state: &AppState, user: &User, program_id: Uuid) -> Result<(), ApiError> {
    if auth::can_manage(&state.db, user, program_id)? {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

pub async fn list_templates(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(raw_program): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<ProgramTemplates>, ApiError> {
    if !auth::can_read(&user, ResourceKind::Programs)
        || !auth::can_read(&user, ResourceKind::Templates)
    {
        return Err(ApiError::Forbidden);
    }
    let program_id = program_id(&raw_program)?;
    let query = params.into_query()?;
    let panel = state.db.list_program_templates(program_id, &query)?;
    Ok(Json(panel))
}

pub async fn attach_template(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(raw_program): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<AttachResponse>), ApiError> {
    let program_id = program_id(&raw_program)?;
    require_manage(&state, &user, program_id)?;
    let request = AttachRequest::from_body(body(payload)?)?;

    let outcome = state.db.attach_template(
        program_id,
        request.template_id,
        &request.overrides,
        Some(user.id),
    )?;

    if !outcome.already_attached {
        state.audit.record(AuditEntry {
            actor: user.id,
            action: AuditAction::Attach,
            program_id,
            template_id: Some(request.template_id),
            detail: json!({ "link_id": outcome.template.link_id }),
        });
    }

    let status = if outcome.already_attached {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(AttachResponse {
            attached: true,
            already_attached: outcome.already_attached,
            template: outcome.template,
        }),
    ))
}

pub async fn detach_template(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((raw_program, raw_template)): Path<(String, String)>,
) -> Result<Json<DetachResponse>, ApiError> {
    let program_id = program_id(&raw_program)?;
    require_manage(&state, &user, program_id)?;
    let template_id = wire::path_id(&raw_template, LinkError::TemplateNotFound)?;

    let outcome = state.db.detach_template(program_id, template_id)?;
    if outcome.was_attached {
        state.audit.record(AuditEntry {
            actor: user.id,
            action: AuditAction::Detach,
            program_id,
            template_id: Some(template_id),
            detail: json!({ "label": outcome.template.label }),
        });
    }

    Ok(Json(DetachResponse {
        detached: true,
        was_attached: outcome.was_attached,
    }))
}

pub async fn update_template(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((raw_program, raw_template)): Path<(String, String)>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<UpdateMetadataResponse>, ApiError> {
    let program_id = program_id(&raw_program)?;
    require_manage(&state, &user, program_id)?;
    let template_id = wire::path_id(&raw_template, LinkError::NotFound)?;
    let patch = wire::metadata_patch(body(payload)?)?;

    let outcome = state
        .db
        .update_link_metadata(program_id, template_id, &patch, Some(user.id))?;
    state.audit.record(AuditEntry {
        actor: user.id,
        action: AuditAction::UpdateMetadata,
        program_id,
        template_id: Some(template_id),
        detail: Value::Object(patch.to_json()),
    });

    Ok(Json(UpdateMetadataResponse {
        updated: outcome.updated,
        template: outcome.template,
    }))
}

pub async fn reorder_templates(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(raw_program): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ReorderResponse>, ApiError> {
    let program_id = program_id(&raw_program)?;
    require_manage(&state, &user, program_id)?;
    let order = match payload {
        Ok(Json(value)) => wire::reorder_ids(value)?,
        Err(_) => return Err(LinkError::InvalidOrder("body is not JSON".into()).into()),
    };

    let updated = state.db.reorder_links(program_id, &order, Some(user.id))?;
    state.audit.record(AuditEntry {
        actor: user.id,
        action: AuditAction::Reorder,
        program_id,
        template_id: None,
        detail: json!({ "order": order, "updated": updated }),
    });

    Ok(Json(ReorderResponse { updated }))
}
