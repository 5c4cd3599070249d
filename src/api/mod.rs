use serde::Deserialize;
use utoipa::IntoParams;

pub mod department;
pub mod leave_request;
pub mod reference_data;
pub mod role;
pub mod user;

#[derive(Debug, Deserialize, IntoParams)]
pub struct PageQuery {
    #[param(example = 1)]
    /// Page number, starting at 1
    pub page: Option<u32>,
    #[param(example = 20)]
    /// Items per page (max 100)
    pub per_page: Option<u32>,
}
