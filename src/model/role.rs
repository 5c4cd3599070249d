use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// The three permission groups the leave workflow knows about.
///
/// A user may hold any combination of them; the declaration order here is the
/// order the policy walks them in.
#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RoleName {
    Employee,
    Manager,
    Superuser,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({ "id": 1, "name": "superuser" }))]
pub struct Role {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "superuser")]
    pub name: String,
}

impl Role {
    /// `None` for roles created by an administrator that the policy does not know.
    pub fn known(&self) -> Option<RoleName> {
        self.name.parse().ok()
    }
}
