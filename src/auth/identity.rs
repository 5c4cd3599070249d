use crate::{
    error::AppError,
    model::{
        role::{Role, RoleName},
        user::User,
    },
    models::Claims,
    policy::balance,
};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use chrono::NaiveDate;
use futures::future::LocalBoxFuture;
use sqlx::SqlitePool;

/// The acting user, rebuilt from the store on every request.
///
/// Role membership and `days_left` are never taken from the token, so a role
/// change or a new request is visible on the very next call.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub user_id: i64,
    pub email: String,
    pub department_id: Option<i64>,
    pub days: Option<i64>,
    pub days_left: i64,
    pub active: bool,
    pub roles: Vec<RoleName>,
}

impl Identity {
    pub fn has_role(&self, role: RoleName) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Roles held by `user_id`, skipping any the policy does not know.
pub async fn load_roles(pool: &SqlitePool, user_id: i64) -> Result<Vec<RoleName>, sqlx::Error> {
    let rows = sqlx::query_as::<_, Role>(
        r#"
        SELECT r.id, r.name
        FROM roles r
        JOIN roles_users ru ON ru.role_id = r.id
        WHERE ru.user_id = ?
        ORDER BY r.id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().filter_map(Role::known).collect())
}

/// Remaining balance of `user_id` given its allotment, over all of its requests.
pub async fn load_days_left(
    pool: &SqlitePool,
    user_id: i64,
    days: Option<i64>,
) -> Result<i64, sqlx::Error> {
    let ranges = sqlx::query_as::<_, (NaiveDate, NaiveDate)>(
        "SELECT start_date, end_date FROM leave_requests WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(balance::days_left(days, ranges))
}

pub async fn load_identity(pool: &SqlitePool, user_id: i64) -> Result<Option<Identity>, sqlx::Error> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, first_name, last_name, email, days, password, active, confirmed_at, department_id
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    let Some(user) = user else {
        return Ok(None);
    };

    let roles = load_roles(pool, user.id).await?;
    let days_left = load_days_left(pool, user.id, user.days).await?;

    Ok(Some(Identity {
        user_id: user.id,
        email: user.email,
        department_id: user.department_id,
        days: user.days,
        days_left,
        active: user.active,
        roles,
    }))
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<Claims>().map(|c| c.user_id);
        let pool = req.app_data::<Data<SqlitePool>>().cloned();
        let next = req.uri().to_string();

        Box::pin(async move {
            let user_id = claims.ok_or_else(|| AppError::AuthenticationRequired {
                next: next.clone(),
            })?;
            let pool = pool.ok_or_else(|| AppError::Internal("Database pool missing".into()))?;

            match load_identity(pool.get_ref(), user_id).await? {
                Some(identity) => Ok(identity),
                // token outlived its account
                None => Err(AppError::AuthenticationRequired { next }),
            }
        })
    }
}
