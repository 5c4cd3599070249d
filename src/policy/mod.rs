//! Authorization and derived-state rules for the leave workflow.
//!
//! Everything here is a pure function of an explicit [`Identity`] and the
//! rows being looked at; handlers load the identity fresh per request and
//! pass it in.
//!
//! [`Identity`]: crate::auth::identity::Identity

pub mod access;
pub mod balance;
pub mod fields;
