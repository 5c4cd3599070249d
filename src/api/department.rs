use crate::{
    api::{
        PageQuery,
        reference_data::{self, NameReq},
    },
    auth::identity::Identity,
    error::AppError,
    model::department::Department,
    policy::access::{Entity, authorize},
    utils::db_utils::page_window,
};
use actix_web::{HttpResponse, web};
use serde::Serialize;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::info;
use utoipa::ToSchema;

const TABLE: &str = "departments";

#[derive(Serialize, ToSchema)]
pub struct DepartmentListResponse {
    pub data: Vec<Department>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 3)]
    pub total: i64,
}

#[utoipa::path(
    get,
    path = "/admin/department",
    params(PageQuery),
    responses(
        (status = 200, description = "Paginated department list", body = DepartmentListResponse),
        (status = 303, description = "Not logged in, redirected to login"),
        (status = 403, description = "Superuser only")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn list_departments(
    identity: Identity,
    pool: web::Data<SqlitePool>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    authorize(Entity::Department, &identity)?;

    let (page, per_page, offset) = page_window(query.page, query.per_page);
    let (data, total) =
        reference_data::list::<Department>(pool.get_ref(), TABLE, per_page, offset).await?;

    Ok(HttpResponse::Ok().json(DepartmentListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/admin/department/{department_id}",
    params(("department_id" = i64, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department found", body = Department),
        (status = 403, description = "Superuser only"),
        (status = 404, description = "Department not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn get_department(
    identity: Identity,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    authorize(Entity::Department, &identity)?;

    let department =
        reference_data::fetch::<Department>(pool.get_ref(), TABLE, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(department))
}

#[utoipa::path(
    post,
    path = "/admin/department",
    request_body = NameReq,
    responses(
        (status = 201, description = "Department created", body = Department),
        (status = 403, description = "Superuser only"),
        (status = 409, description = "Department name already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn create_department(
    identity: Identity,
    pool: web::Data<SqlitePool>,
    payload: web::Json<NameReq>,
) -> Result<HttpResponse, AppError> {
    authorize(Entity::Department, &identity)?;

    let name = payload.validated()?;
    let id = reference_data::insert(pool.get_ref(), TABLE, name).await?;
    info!(department_id = id, name, "Department created");

    Ok(HttpResponse::Created().json(Department {
        id,
        name: name.to_string(),
    }))
}

#[utoipa::path(
    put,
    path = "/admin/department/{department_id}",
    params(("department_id" = i64, Path, description = "Department ID")),
    request_body = NameReq,
    responses(
        (status = 200, description = "Department renamed", body = Department),
        (status = 403, description = "Superuser only"),
        (status = 404, description = "Department not found"),
        (status = 409, description = "Department name already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn update_department(
    identity: Identity,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<NameReq>,
) -> Result<HttpResponse, AppError> {
    authorize(Entity::Department, &identity)?;

    let id = path.into_inner();
    let name = payload.validated()?;
    reference_data::rename(pool.get_ref(), TABLE, id, name).await?;

    Ok(HttpResponse::Ok().json(Department {
        id,
        name: name.to_string(),
    }))
}

#[utoipa::path(
    delete,
    path = "/admin/department/{department_id}",
    params(("department_id" = i64, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department deleted, members and requests detached"),
        (status = 403, description = "Superuser only"),
        (status = 404, description = "Department not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Department"
)]
pub async fn delete_department(
    identity: Identity,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    authorize(Entity::Department, &identity)?;

    let id = path.into_inner();
    reference_data::delete(pool.get_ref(), TABLE, id).await?;
    info!(department_id = id, "Department deleted");

    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}
