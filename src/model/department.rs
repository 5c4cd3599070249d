use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({ "id": 1, "name": "General" }))]
pub struct Department {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "General")]
    pub name: String,
}
