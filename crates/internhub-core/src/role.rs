//! Roles and the authenticated principal

use crate::error::{DomainError, DomainResult};
use crate::ids::{UniversityId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Platform operator, unrestricted
    Admin,
    /// Partner university staff, scoped to one university
    University,
    /// Host supervisor, scoped to assigned interns
    Supervisor,
    /// Intern, scoped to self
    Intern,
}

impl Role {
    /// All roles
    pub const ALL: [Role; 4] = [Role::Admin, Role::University, Role::Supervisor, Role::Intern];

    /// Wire representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::University => "UNIVERSITY",
            Role::Supervisor => "SUPERVISOR",
            Role::Intern => "INTERN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated actor of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Acting user
    pub user_id: UserId,
    /// Role at authentication time
    pub role: Role,
    /// Owning university for UNIVERSITY users
    pub university_id: Option<UniversityId>,
}

impl Principal {
    /// Create a principal without a university scope
    #[must_use]
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self {
            user_id,
            role,
            university_id: None,
        }
    }

    /// Attach a university scope
    #[must_use]
    pub fn with_university(mut self, university_id: UniversityId) -> Self {
        self.university_id = Some(university_id);
        self
    }

    #[inline]
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Route-level role guard
    pub fn require_any(&self, roles: &[Role]) -> DomainResult<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(DomainError::forbidden(format!(
                "role {} may not perform this operation",
                self.role
            )))
        }
    }

    /// Guard for admin-only operations
    pub fn require_admin(&self) -> DomainResult<()> {
        self.require_any(&[Role::Admin])
    }

    /// University scope of a UNIVERSITY principal
    pub fn scoped_university(&self) -> DomainResult<UniversityId> {
        match (self.role, self.university_id) {
            (Role::University, Some(id)) => Ok(id),
            (Role::University, None) => Err(DomainError::forbidden(
                "university account is not linked to a university",
            )),
            _ => Err(DomainError::forbidden("not a university account")),
        }
    }

    /// ADMIN always passes; UNIVERSITY passes only for its own university
    pub fn require_university_access(&self, university_id: UniversityId) -> DomainResult<()> {
        match self.role {
            Role::Admin => Ok(()),
            Role::University if self.university_id == Some(university_id) => Ok(()),
            _ => Err(DomainError::forbidden(
                "resource belongs to another university",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_passes_university_guard() {
        let admin = Principal::new(UserId::new(), Role::Admin);
        assert!(admin.require_university_access(UniversityId::new()).is_ok());
    }

    #[test]
    fn university_is_scoped_to_its_own() {
        let own = UniversityId::new();
        let p = Principal::new(UserId::new(), Role::University).with_university(own);
        assert!(p.require_university_access(own).is_ok());
        assert!(p.require_university_access(UniversityId::new()).is_err());
        assert_eq!(p.scoped_university().unwrap(), own);
    }

    #[test]
    fn unlinked_university_account_has_no_scope() {
        let p = Principal::new(UserId::new(), Role::University);
        assert!(p.scoped_university().is_err());
        assert!(p.require_university_access(UniversityId::new()).is_err());
    }

    #[test]
    fn role_guard_lists_allowed_roles() {
        let intern = Principal::new(UserId::new(), Role::Intern);
        assert!(intern.require_any(&[Role::Intern, Role::Admin]).is_ok());
        assert!(intern.require_admin().is_err());
    }
}
