use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Stored by variant name, e.g. `Pending`.
#[derive(
    Debug,
    Copy,
    Clone,
    Default,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    ToSchema,
    sqlx::Type,
    AsRefStr,
    Display,
    EnumString,
)]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = 3)]
    pub user_id: i64,
    #[schema(example = 1, nullable = true)]
    pub department_id: Option<i64>,
    #[schema(example = "Family trip")]
    pub reason: String,
    #[schema(example = "2024-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2024-01-06", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Pending", value_type = String)]
    pub status: RequestStatus,
    #[schema(example = "2024-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}
