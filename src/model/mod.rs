pub mod department;
pub mod leave_request;
pub mod role;
pub mod user;
