use crate::{
    api::PageQuery,
    auth::identity::Identity,
    error::AppError,
    model::leave_request::{LeaveRequest, RequestStatus},
    policy::{
        access::{
            Capabilities, Entity, PredicateArg, RowPredicate, authorize, request_capabilities,
            row_predicate,
        },
        fields::{FieldLocks, RequestField, create_form_locks, field_locks},
    },
    utils::db_utils::{as_object, build_update_sql, execute_update, page_window},
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use sqlx::SqlitePool;
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};

const REQUEST_COLUMNS: &str =
    "id, user_id, department_id, reason, start_date, end_date, status, created_at";

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "Family trip")]
    #[serde(default)]
    pub reason: String,
    #[schema(example = "2024-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2024-01-06", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    /// Only honoured when the form leaves `status` unlocked.
    #[schema(example = "Pending", value_type = Option<String>)]
    pub status: Option<RequestStatus>,
}

#[derive(Deserialize, IntoParams)]
pub struct LeaveFilter {
    #[param(example = 3)]
    /// Only requests of this user (within what the caller may see)
    pub user_id: Option<i64>,
    #[param(example = "Pending", value_type = Option<String>)]
    /// Only requests in this status
    pub status: Option<RequestStatus>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
    pub capabilities: Capabilities,
    /// Balance of the caller.
    #[schema(example = 15)]
    pub days_left: i64,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveFormResponse {
    pub fields: FieldLocks,
    /// Current values; on the create form, the values a new request starts with.
    #[schema(value_type = Object)]
    pub values: Value,
}

/// Predicate of the caller, or 403 when no role grants any rows.
fn visible_rows(identity: &Identity) -> Result<RowPredicate, AppError> {
    authorize(Entity::Request, identity)?;
    row_predicate(identity).ok_or_else(|| AppError::forbidden("No leave requests visible"))
}

/// One row, if it exists and `predicate` lets the caller see it.
async fn fetch_visible(
    pool: &SqlitePool,
    predicate: RowPredicate,
    id: i64,
) -> Result<LeaveRequest, AppError> {
    let (clause, arg) = predicate.clause();
    let sql = format!(
        "SELECT {} FROM leave_requests WHERE id = ? AND {}",
        REQUEST_COLUMNS, clause
    );

    let mut query = sqlx::query_as::<_, LeaveRequest>(&sql).bind(id);
    if let PredicateArg::Id(v) = arg {
        query = query.bind(v);
    }

    query
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Leave request not found".into()))
}

/// Checks every key of an edit payload against the form locks and its type.
fn validate_edit(payload: &Map<String, Value>, locks: &FieldLocks) -> Result<(), AppError> {
    for (key, value) in payload {
        let field: RequestField = key
            .parse()
            .map_err(|_| AppError::Validation(format!("Unknown field `{}`", key)))?;

        if !locks.is_editable(field) {
            return Err(AppError::forbidden(format!("Field `{}` is read-only", key)));
        }

        let well_typed = match field {
            RequestField::Reason => value.is_string(),
            RequestField::StartDate | RequestField::EndDate => value
                .as_str()
                .is_some_and(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()),
            RequestField::Status => value
                .as_str()
                .is_some_and(|s| s.parse::<RequestStatus>().is_ok()),
            // never unlocked by any rule
            RequestField::Department | RequestField::User | RequestField::DaysLeft => false,
        };

        if !well_typed {
            return Err(AppError::Validation(format!("Invalid value for `{}`", key)));
        }
    }

    Ok(())
}

/// Leave requests the caller may see, newest first.
#[utoipa::path(
    get,
    path = "/admin/request",
    params(PageQuery, LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 303, description = "Not logged in, redirected to login"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Request"
)]
pub async fn leave_list(
    identity: Identity,
    pool: web::Data<SqlitePool>,
    page: web::Query<PageQuery>,
    filter: web::Query<LeaveFilter>,
) -> Result<HttpResponse, AppError> {
    let predicate = visible_rows(&identity)?;
    let (page, per_page, offset) = page_window(page.page, page.per_page);

    // -------------------------
    // WHERE clause
    // -------------------------
    let (clause, arg) = predicate.clause();
    let mut where_sql = format!(" WHERE {}", clause);

    if filter.user_id.is_some() {
        where_sql.push_str(" AND user_id = ?");
    }
    if filter.status.is_some() {
        where_sql.push_str(" AND status = ?");
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!("SELECT COUNT(*) FROM leave_requests{}", where_sql);

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    if let PredicateArg::Id(v) = arg {
        count_q = count_q.bind(v);
    }
    if let Some(user_id) = filter.user_id {
        count_q = count_q.bind(user_id);
    }
    if let Some(status) = filter.status {
        count_q = count_q.bind(status);
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count leave requests");
        AppError::from(e)
    })?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        "SELECT {} FROM leave_requests{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        REQUEST_COLUMNS, where_sql
    );
    debug!(sql = %data_sql, ?predicate, page, per_page, "Fetching leave requests");

    let mut data_q = sqlx::query_as::<_, LeaveRequest>(&data_sql);
    if let PredicateArg::Id(v) = arg {
        data_q = data_q.bind(v);
    }
    if let Some(user_id) = filter.user_id {
        data_q = data_q.bind(user_id);
    }
    if let Some(status) = filter.status {
        data_q = data_q.bind(status);
    }

    let data = data_q
        .bind(per_page as i64)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch leave list");
            AppError::from(e)
        })?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data,
        page,
        per_page,
        total,
        capabilities: request_capabilities(&identity),
        days_left: identity.days_left,
    }))
}

#[utoipa::path(
    get,
    path = "/admin/request/{leave_id}",
    params(("leave_id" = i64, Path, description = "ID of the leave request to fetch")),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not found or not visible to the caller")
    ),
    security(("bearer_auth" = [])),
    tag = "Request"
)]
pub async fn get_leave(
    identity: Identity,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let predicate = visible_rows(&identity)?;
    let leave = fetch_visible(pool.get_ref(), predicate, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(leave))
}

/// Blank create form: lock state plus the values a new request starts with.
#[utoipa::path(
    get,
    path = "/admin/request/new",
    responses(
        (status = 200, description = "Create form", body = LeaveFormResponse),
        (status = 403, description = "Caller may not create requests")
    ),
    security(("bearer_auth" = [])),
    tag = "Request"
)]
pub async fn new_leave_form(identity: Identity) -> Result<HttpResponse, AppError> {
    authorize(Entity::Request, &identity)?;

    if !request_capabilities(&identity).can_create {
        return Err(AppError::forbidden("Creating leave requests is not allowed"));
    }

    Ok(HttpResponse::Ok().json(LeaveFormResponse {
        fields: create_form_locks(&identity),
        values: json!({
            "user": identity.user_id,
            "department": identity.department_id,
            "status": RequestStatus::Pending,
            "days_left": identity.days_left,
        }),
    }))
}

/// File a leave request for the caller.
///
/// Owner and department always come from the caller; `status` is taken from
/// the payload only when the form leaves it editable.
#[utoipa::path(
    post,
    path = "/admin/request",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveRequest),
        (status = 400, description = "Bad request"),
        (status = 403, description = "Caller may not create requests or set this field")
    ),
    security(("bearer_auth" = [])),
    tag = "Request"
)]
pub async fn create_leave(
    identity: Identity,
    pool: web::Data<SqlitePool>,
    payload: web::Json<CreateLeave>,
) -> Result<HttpResponse, AppError> {
    authorize(Entity::Request, &identity)?;

    if !request_capabilities(&identity).can_create {
        return Err(AppError::forbidden("Creating leave requests is not allowed"));
    }

    let locks = create_form_locks(&identity);
    let status = match payload.status {
        Some(status) if status != RequestStatus::Pending => {
            if !locks.is_editable(RequestField::Status) {
                return Err(AppError::forbidden("Field `status` is read-only"));
            }
            status
        }
        _ => RequestStatus::Pending,
    };

    let id = sqlx::query(
        r#"
        INSERT INTO leave_requests
            (user_id, department_id, reason, start_date, end_date, status)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(identity.user_id)
    .bind(identity.department_id)
    .bind(&payload.reason)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(status)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id = identity.user_id, "Failed to create leave request");
        AppError::from(e)
    })?
    .last_insert_rowid();

    info!(leave_id = id, user_id = identity.user_id, %status, "Leave request submitted");

    let own = RowPredicate::OwnedBy(identity.user_id);
    let leave = fetch_visible(pool.get_ref(), own, id).await?;
    Ok(HttpResponse::Created().json(leave))
}

/// Edit form of an existing row.
#[utoipa::path(
    get,
    path = "/admin/request/{leave_id}/edit",
    params(("leave_id" = i64, Path, description = "ID of the leave request to edit")),
    responses(
        (status = 200, description = "Edit form", body = LeaveFormResponse),
        (status = 403, description = "Caller may not edit requests"),
        (status = 404, description = "Not found or not visible to the caller")
    ),
    security(("bearer_auth" = [])),
    tag = "Request"
)]
pub async fn edit_leave_form(
    identity: Identity,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let predicate = visible_rows(&identity)?;

    if !request_capabilities(&identity).can_edit {
        return Err(AppError::forbidden("Editing leave requests is not allowed"));
    }

    let leave = fetch_visible(pool.get_ref(), predicate, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(LeaveFormResponse {
        fields: field_locks(&identity, leave.user_id),
        values: json!({
            "user": leave.user_id,
            "department": leave.department_id,
            "reason": leave.reason,
            "start_date": leave.start_date,
            "end_date": leave.end_date,
            "status": leave.status,
            "days_left": identity.days_left,
        }),
    }))
}

async fn apply_edit(
    identity: &Identity,
    pool: &SqlitePool,
    leave_id: i64,
    payload: &Map<String, Value>,
) -> Result<LeaveRequest, AppError> {
    let predicate = visible_rows(identity)?;

    if !request_capabilities(identity).can_edit {
        return Err(AppError::forbidden("Editing leave requests is not allowed"));
    }

    let leave = fetch_visible(pool, predicate, leave_id).await?;
    let locks = field_locks(identity, leave.user_id);
    validate_edit(payload, &locks)?;

    let allowed: Vec<&str> = locks
        .editable_fields()
        .iter()
        .filter_map(|f| f.column())
        .collect();

    let update = build_update_sql("leave_requests", payload, &allowed, "id", leave_id)?;
    execute_update(pool, update).await.map_err(|e| {
        error!(error = %e, leave_id, "Failed to update leave request");
        AppError::from(e)
    })?;

    info!(
        leave_id,
        edited_by = identity.user_id,
        fields = ?payload.keys().collect::<Vec<_>>(),
        "Leave request updated"
    );

    fetch_visible(pool, predicate, leave_id).await
}

/// Partial update restricted to the fields the form leaves unlocked.
#[utoipa::path(
    put,
    path = "/admin/request/{leave_id}",
    params(("leave_id" = i64, Path, description = "ID of the leave request to update")),
    request_body(
        content = Object,
        description = "Any unlocked subset of reason, start_date, end_date, status",
        example = json!({ "status": "Approved" })
    ),
    responses(
        (status = 200, description = "Leave request updated", body = LeaveRequest),
        (status = 400, description = "Unknown field or invalid value"),
        (status = 403, description = "Caller may not edit requests or this field"),
        (status = 404, description = "Not found or not visible to the caller")
    ),
    security(("bearer_auth" = [])),
    tag = "Request"
)]
pub async fn update_leave(
    identity: Identity,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    body: web::Json<Value>,
) -> Result<HttpResponse, AppError> {
    let payload = as_object(&body)?;
    let leave = apply_edit(&identity, pool.get_ref(), path.into_inner(), payload).await?;
    Ok(HttpResponse::Ok().json(leave))
}

async fn set_status(
    identity: &Identity,
    pool: &SqlitePool,
    leave_id: i64,
    status: RequestStatus,
) -> Result<LeaveRequest, AppError> {
    let mut payload = Map::new();
    payload.insert("status".into(), Value::String(status.to_string()));
    apply_edit(identity, pool, leave_id, &payload).await
}

/// Shorthand for setting `status` to `Approved`; same rules as any edit.
#[utoipa::path(
    put,
    path = "/admin/request/{leave_id}/approve",
    params(("leave_id" = i64, Path, description = "ID of the leave request to approve")),
    responses(
        (status = 200, description = "Leave approved", body = LeaveRequest),
        (status = 403, description = "Caller may not change the status"),
        (status = 404, description = "Not found or not visible to the caller")
    ),
    security(("bearer_auth" = [])),
    tag = "Request"
)]
pub async fn approve_leave(
    identity: Identity,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let leave = set_status(
        &identity,
        pool.get_ref(),
        path.into_inner(),
        RequestStatus::Approved,
    )
    .await?;
    Ok(HttpResponse::Ok().json(leave))
}

/// Shorthand for setting `status` to `Rejected`; same rules as any edit.
#[utoipa::path(
    put,
    path = "/admin/request/{leave_id}/reject",
    params(("leave_id" = i64, Path, description = "ID of the leave request to reject")),
    responses(
        (status = 200, description = "Leave rejected", body = LeaveRequest),
        (status = 403, description = "Caller may not change the status"),
        (status = 404, description = "Not found or not visible to the caller")
    ),
    security(("bearer_auth" = [])),
    tag = "Request"
)]
pub async fn reject_leave(
    identity: Identity,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let leave = set_status(
        &identity,
        pool.get_ref(),
        path.into_inner(),
        RequestStatus::Rejected,
    )
    .await?;
    Ok(HttpResponse::Ok().json(leave))
}

#[utoipa::path(
    delete,
    path = "/admin/request/{leave_id}",
    params(("leave_id" = i64, Path, description = "ID of the leave request to delete")),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 403, description = "Caller may not delete requests"),
        (status = 404, description = "Not found or not visible to the caller")
    ),
    security(("bearer_auth" = [])),
    tag = "Request"
)]
pub async fn delete_leave(
    identity: Identity,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let predicate = visible_rows(&identity)?;

    if !request_capabilities(&identity).can_delete {
        return Err(AppError::forbidden("Deleting leave requests is not allowed"));
    }

    let leave_id = path.into_inner();
    fetch_visible(pool.get_ref(), predicate, leave_id).await?;

    sqlx::query("DELETE FROM leave_requests WHERE id = ?")
        .bind(leave_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, leave_id, "Failed to delete leave request");
            AppError::from(e)
        })?;

    info!(leave_id, deleted_by = identity.user_id, "Leave request deleted");

    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}
