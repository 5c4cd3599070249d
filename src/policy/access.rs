use crate::{auth::identity::Identity, error::AppError, model::role::RoleName};
use serde::Serialize;
use utoipa::ToSchema;

/// Admin sections, one per table.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Entity {
    Role,
    Department,
    User,
    Request,
}

/// What the acting user may do with leave requests.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, ToSchema)]
pub struct Capabilities {
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
}

impl Capabilities {
    const fn new(can_create: bool, can_edit: bool, can_delete: bool) -> Self {
        Self {
            can_create,
            can_edit,
            can_delete,
        }
    }
}

/// Evaluated top to bottom; a later match replaces whatever an earlier one set.
/// Not a union: an employee who is also a superuser ends up with the
/// superuser row only.
const CAPABILITY_RULES: [(RoleName, Capabilities); 3] = [
    (RoleName::Employee, Capabilities::new(true, false, false)),
    (RoleName::Manager, Capabilities::new(true, true, false)),
    (RoleName::Superuser, Capabilities::new(false, false, true)),
];

pub fn request_capabilities(identity: &Identity) -> Capabilities {
    let mut caps = Capabilities::default();
    for (role, rule) in CAPABILITY_RULES {
        if identity.has_role(role) {
            caps = rule;
        }
    }

    // nobody files new leave once the balance is overdrawn
    caps.can_create = caps.can_create && identity.days_left >= 0;
    caps
}

/// Which leave-request rows a caller may see, as a reusable filter.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RowPredicate {
    All,
    OwnedBy(i64),
    /// `None` matches rows without a department.
    InDepartment(Option<i64>),
}

/// Value bound to the `?` of [`RowPredicate::clause`], if any.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PredicateArg {
    None,
    Id(Option<i64>),
}

impl RowPredicate {
    /// SQL condition over `leave_requests` columns.
    pub fn clause(&self) -> (&'static str, PredicateArg) {
        match self {
            RowPredicate::All => ("1=1", PredicateArg::None),
            RowPredicate::OwnedBy(user_id) => ("user_id = ?", PredicateArg::Id(Some(*user_id))),
            // IS compares NULL to NULL as equal
            RowPredicate::InDepartment(department_id) => {
                ("department_id IS ?", PredicateArg::Id(*department_id))
            }
        }
    }
}

/// Unlike capabilities, the first role that matches decides the row filter.
pub fn row_predicate(identity: &Identity) -> Option<RowPredicate> {
    if identity.has_role(RoleName::Employee) {
        return Some(RowPredicate::OwnedBy(identity.user_id));
    }
    if identity.has_role(RoleName::Manager) {
        return Some(RowPredicate::InDepartment(identity.department_id));
    }
    if identity.has_role(RoleName::Superuser) {
        return Some(RowPredicate::All);
    }
    None
}

pub fn is_accessible(entity: Entity, identity: &Identity) -> bool {
    // every role is gated on `active`, not only employees as in the Flask app
    if !identity.is_active() {
        return false;
    }

    match entity {
        Entity::Role | Entity::Department | Entity::User => identity.has_role(RoleName::Superuser),
        Entity::Request => [RoleName::Employee, RoleName::Manager, RoleName::Superuser]
            .into_iter()
            .any(|role| identity.has_role(role)),
    }
}

pub fn authorize(entity: Entity, identity: &Identity) -> Result<(), AppError> {
    if is_accessible(entity, identity) {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "{:?} section is not available to this account",
            entity
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;
    use actix_web::http::StatusCode;

    fn identity(user_id: i64, department_id: Option<i64>, roles: &[RoleName]) -> Identity {
        Identity {
            user_id,
            email: format!("user{}@test", user_id),
            department_id,
            days: Some(20),
            days_left: 20,
            active: true,
            roles: roles.to_vec(),
        }
    }

    #[test]
    fn capability_matrix_per_single_role() {
        let employee = identity(1, Some(1), &[RoleName::Employee]);
        let manager = identity(2, Some(1), &[RoleName::Manager]);
        let admin = identity(3, None, &[RoleName::Superuser]);

        assert_eq!(request_capabilities(&employee), Capabilities::new(true, false, false));
        assert_eq!(request_capabilities(&manager), Capabilities::new(true, true, false));
        assert_eq!(request_capabilities(&admin), Capabilities::new(false, false, true));
    }

    #[test]
    fn last_matching_role_wins_for_capabilities() {
        let both = identity(1, Some(1), &[RoleName::Superuser, RoleName::Employee]);
        assert_eq!(request_capabilities(&both), Capabilities::new(false, false, true));

        let manager_employee = identity(2, Some(1), &[RoleName::Manager, RoleName::Employee]);
        assert_eq!(
            request_capabilities(&manager_employee),
            Capabilities::new(true, true, false)
        );
    }

    #[test]
    fn superuser_without_allotment_still_cannot_create() {
        let mut admin = identity(3, None, &[RoleName::Superuser]);
        admin.days = None;
        admin.days_left = 0;
        assert!(!request_capabilities(&admin).can_create);
    }

    #[test]
    fn overdrawn_balance_denies_create_for_every_role() {
        for role in [RoleName::Employee, RoleName::Manager, RoleName::Superuser] {
            let mut user = identity(1, Some(1), &[role]);
            user.days_left = -1;
            assert!(!request_capabilities(&user).can_create, "{:?}", role);
        }

        let mut exhausted = identity(1, Some(1), &[RoleName::Employee]);
        exhausted.days_left = 0;
        assert!(request_capabilities(&exhausted).can_create);
    }

    #[test]
    fn no_role_means_no_capability() {
        let nobody = identity(9, Some(1), &[]);
        assert_eq!(request_capabilities(&nobody), Capabilities::default());
        assert_eq!(row_predicate(&nobody), None);
    }

    #[test]
    fn row_predicate_per_role() {
        assert_eq!(
            row_predicate(&identity(1, Some(4), &[RoleName::Employee])),
            Some(RowPredicate::OwnedBy(1))
        );
        assert_eq!(
            row_predicate(&identity(2, Some(4), &[RoleName::Manager])),
            Some(RowPredicate::InDepartment(Some(4)))
        );
        assert_eq!(
            row_predicate(&identity(3, None, &[RoleName::Superuser])),
            Some(RowPredicate::All)
        );
    }

    #[test]
    fn first_matching_role_decides_row_filter() {
        let both = identity(1, Some(4), &[RoleName::Superuser, RoleName::Employee]);
        assert_eq!(row_predicate(&both), Some(RowPredicate::OwnedBy(1)));
    }

    #[test]
    fn predicates_render_to_sql() {
        assert_eq!(RowPredicate::All.clause(), ("1=1", PredicateArg::None));
        assert_eq!(
            RowPredicate::OwnedBy(1).clause(),
            ("user_id = ?", PredicateArg::Id(Some(1)))
        );
        // a manager without a department sees the rows without one
        assert_eq!(
            RowPredicate::InDepartment(None).clause(),
            ("department_id IS ?", PredicateArg::Id(None))
        );
    }

    #[test]
    fn reference_data_is_superuser_only() {
        let employee = identity(1, Some(1), &[RoleName::Employee]);
        let manager = identity(2, Some(1), &[RoleName::Manager]);
        let admin = identity(3, None, &[RoleName::Superuser]);

        for entity in [Entity::Role, Entity::Department, Entity::User] {
            assert!(!is_accessible(entity, &employee));
            assert!(!is_accessible(entity, &manager));
            assert!(is_accessible(entity, &admin));
        }
        for who in [&employee, &manager, &admin] {
            assert!(is_accessible(Entity::Request, who));
        }
    }

    #[test]
    fn inactive_accounts_see_nothing() {
        let mut admin = identity(3, None, &[RoleName::Superuser]);
        admin.active = false;
        assert!(!is_accessible(Entity::Request, &admin));
        assert!(!is_accessible(Entity::User, &admin));
    }

    #[test]
    fn denied_section_is_a_403() {
        let employee = identity(1, Some(1), &[RoleName::Employee]);
        let err = authorize(Entity::User, &employee).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert!(authorize(Entity::Request, &employee).is_ok());
    }
}
