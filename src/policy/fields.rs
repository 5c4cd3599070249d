use crate::{auth::identity::Identity, model::role::RoleName};
use serde::Serialize;
use std::collections::BTreeMap;
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, EnumIter, EnumString};
use utoipa::ToSchema;

/// Inputs of the leave request form.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Serialize, AsRefStr, EnumIter, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestField {
    Department,
    User,
    Reason,
    StartDate,
    EndDate,
    Status,
    DaysLeft,
}

impl RequestField {
    /// Backing column, for the fields that are stored on the row.
    pub fn column(&self) -> Option<&'static str> {
        match self {
            RequestField::Department => Some("department_id"),
            RequestField::User => Some("user_id"),
            RequestField::Reason => Some("reason"),
            RequestField::StartDate => Some("start_date"),
            RequestField::EndDate => Some("end_date"),
            RequestField::Status => Some("status"),
            RequestField::DaysLeft => None,
        }
    }
}

/// Per-field lock state, serialized as `{"reason": {"disabled": false}, ...}`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, ToSchema)]
#[schema(value_type = Object)]
pub struct FieldLocks(BTreeMap<RequestField, WidgetArgs>);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub struct WidgetArgs {
    pub disabled: bool,
}

impl FieldLocks {
    fn editable(fields: &[RequestField]) -> Self {
        Self(
            RequestField::iter()
                .map(|f| {
                    (
                        f,
                        WidgetArgs {
                            disabled: !fields.contains(&f),
                        },
                    )
                })
                .collect(),
        )
    }

    pub fn all_locked() -> Self {
        Self::editable(&[])
    }

    pub fn is_editable(&self, field: RequestField) -> bool {
        self.0.get(&field).is_some_and(|w| !w.disabled)
    }

    pub fn editable_fields(&self) -> Vec<RequestField> {
        self.0
            .iter()
            .filter(|(_, w)| !w.disabled)
            .map(|(f, _)| *f)
            .collect()
    }
}

struct FieldRule {
    role: RoleName,
    own_row_only: bool,
    editable: &'static [RequestField],
}

const DATES_AND_REASON: &[RequestField] = &[
    RequestField::Reason,
    RequestField::StartDate,
    RequestField::EndDate,
];

/// Last matching rule wins; nothing matching leaves every field locked.
const FIELD_RULES: [FieldRule; 3] = [
    FieldRule {
        role: RoleName::Manager,
        own_row_only: false,
        editable: &[RequestField::Status],
    },
    FieldRule {
        role: RoleName::Manager,
        own_row_only: true,
        editable: &[
            RequestField::Reason,
            RequestField::StartDate,
            RequestField::EndDate,
            RequestField::Status,
        ],
    },
    FieldRule {
        role: RoleName::Employee,
        own_row_only: true,
        editable: DATES_AND_REASON,
    },
];

/// Lock state of the request form for `identity` editing a row owned by `owner_id`.
pub fn field_locks(identity: &Identity, owner_id: i64) -> FieldLocks {
    let own_row = owner_id == identity.user_id;

    let mut editable: &[RequestField] = &[];
    for rule in &FIELD_RULES {
        if identity.has_role(rule.role) && (own_row || !rule.own_row_only) {
            editable = rule.editable;
        }
    }

    FieldLocks::editable(editable)
}

/// The create form always describes a request for the acting user.
pub fn create_form_locks(identity: &Identity) -> FieldLocks {
    field_locks(identity, identity.user_id)
}
