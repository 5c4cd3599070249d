use crate::api::department::DepartmentListResponse;
use crate::api::leave_request::{CreateLeave, LeaveFormResponse, LeaveListResponse};
use crate::api::reference_data::NameReq;
use crate::api::role::RoleListResponse;
use crate::api::user::{CreateUser, UserListResponse, UserResponse};
use crate::auth::handlers::LoginResponse;
use crate::model::department::Department;
use crate::model::leave_request::{LeaveRequest, RequestStatus};
use crate::model::role::{Role, RoleName};
use crate::models::{LoginReqDto, RegisterReq};
use crate::policy::access::Capabilities;
use crate::policy::fields::FieldLocks;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Management API",
        version = "1.0.0",
        description = r#"
## Leave Management

Employees file leave requests against a yearly allotment of days, managers
review the requests of their department, and a superuser administers
accounts, roles and departments.

### Roles
- **employee**: files requests and edits dates and reason of their own requests
- **manager**: sees the whole department and sets the status of its requests
- **superuser**: sees everything, deletes requests, manages reference data

### Security
Admin sections need a **JWT Bearer** access token from `POST /auth/login`.
Without one the server answers `303 See Other` towards `/auth/login?next=<path>`.

### Response Format
- JSON bodies, paginated list endpoints
- Request lists carry the caller's `capabilities` and `days_left`
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login_page,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::role::list_roles,
        crate::api::role::get_role,
        crate::api::role::create_role,
        crate::api::role::update_role,
        crate::api::role::delete_role,

        crate::api::department::list_departments,
        crate::api::department::get_department,
        crate::api::department::create_department,
        crate::api::department::update_department,
        crate::api::department::delete_department,

        crate::api::user::list_users,
        crate::api::user::get_user,
        crate::api::user::create_user,
        crate::api::user::update_user,
        crate::api::user::delete_user,

        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::new_leave_form,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::edit_leave_form,
        crate::api::leave_request::update_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::delete_leave
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            LoginResponse,
            NameReq,
            Role,
            RoleName,
            RoleListResponse,
            Department,
            DepartmentListResponse,
            CreateUser,
            UserResponse,
            UserListResponse,
            LeaveRequest,
            RequestStatus,
            CreateLeave,
            LeaveListResponse,
            LeaveFormResponse,
            Capabilities,
            FieldLocks
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, registration and token rotation"),
        (name = "Role", description = "Role administration"),
        (name = "Department", description = "Department administration"),
        (name = "User", description = "User administration"),
        (name = "Request", description = "Leave requests"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
