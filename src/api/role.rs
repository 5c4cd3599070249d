use crate::{
    api::{
        PageQuery,
        reference_data::{self, NameReq},
    },
    auth::identity::Identity,
    error::AppError,
    model::role::Role,
    policy::access::{Entity, authorize},
    utils::db_utils::page_window,
};
use actix_web::{HttpResponse, web};
use serde::Serialize;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::info;
use utoipa::ToSchema;

const TABLE: &str = "roles";

#[derive(Serialize, ToSchema)]
pub struct RoleListResponse {
    pub data: Vec<Role>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 3)]
    pub total: i64,
}

#[utoipa::path(
    get,
    path = "/admin/role",
    params(PageQuery),
    responses(
        (status = 200, description = "Paginated role list", body = RoleListResponse),
        (status = 303, description = "Not logged in, redirected to login"),
        (status = 403, description = "Superuser only")
    ),
    security(("bearer_auth" = [])),
    tag = "Role"
)]
pub async fn list_roles(
    identity: Identity,
    pool: web::Data<SqlitePool>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    authorize(Entity::Role, &identity)?;

    let (page, per_page, offset) = page_window(query.page, query.per_page);
    let (data, total) = reference_data::list::<Role>(pool.get_ref(), TABLE, per_page, offset).await?;

    Ok(HttpResponse::Ok().json(RoleListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/admin/role/{role_id}",
    params(("role_id" = i64, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role found", body = Role),
        (status = 403, description = "Superuser only"),
        (status = 404, description = "Role not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Role"
)]
pub async fn get_role(
    identity: Identity,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    authorize(Entity::Role, &identity)?;

    let role = reference_data::fetch::<Role>(pool.get_ref(), TABLE, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(role))
}

#[utoipa::path(
    post,
    path = "/admin/role",
    request_body = NameReq,
    responses(
        (status = 201, description = "Role created", body = Role),
        (status = 403, description = "Superuser only"),
        (status = 409, description = "Role name already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Role"
)]
pub async fn create_role(
    identity: Identity,
    pool: web::Data<SqlitePool>,
    payload: web::Json<NameReq>,
) -> Result<HttpResponse, AppError> {
    authorize(Entity::Role, &identity)?;

    let name = payload.validated()?;
    let id = reference_data::insert(pool.get_ref(), TABLE, name).await?;
    info!(role_id = id, name, "Role created");

    Ok(HttpResponse::Created().json(Role {
        id,
        name: name.to_string(),
    }))
}

#[utoipa::path(
    put,
    path = "/admin/role/{role_id}",
    params(("role_id" = i64, Path, description = "Role ID")),
    request_body = NameReq,
    responses(
        (status = 200, description = "Role renamed", body = Role),
        (status = 403, description = "Superuser only"),
        (status = 404, description = "Role not found"),
        (status = 409, description = "Role name already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Role"
)]
pub async fn update_role(
    identity: Identity,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<NameReq>,
) -> Result<HttpResponse, AppError> {
    authorize(Entity::Role, &identity)?;

    let id = path.into_inner();
    let name = payload.validated()?;
    reference_data::rename(pool.get_ref(), TABLE, id, name).await?;

    Ok(HttpResponse::Ok().json(Role {
        id,
        name: name.to_string(),
    }))
}

#[utoipa::path(
    delete,
    path = "/admin/role/{role_id}",
    params(("role_id" = i64, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role deleted, memberships removed"),
        (status = 403, description = "Superuser only"),
        (status = 404, description = "Role not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Role"
)]
pub async fn delete_role(
    identity: Identity,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    authorize(Entity::Role, &identity)?;

    let id = path.into_inner();
    reference_data::delete(pool.get_ref(), TABLE, id).await?;
    info!(role_id = id, "Role deleted");

    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}
