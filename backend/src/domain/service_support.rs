//! Role guard shared by the domain services.
//!
//! Store failures convert through `From` (see `define_port_error!`).

use crate::domain::{Actor, Error, Role};

/// Fail with `Forbidden` unless the actor holds one of `roles`.
pub(super) fn require_role(actor: &Actor, roles: &[Role], action: &str) -> Result<(), Error> {
    if roles.contains(&actor.role) {
        Ok(())
    } else {
        Err(Error::forbidden(format!(
            "{} accounts may not {action}",
            actor.role.as_str().to_lowercase()
        )))
    }
}
