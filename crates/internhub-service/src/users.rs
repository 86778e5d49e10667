//! User administration

use crate::auth::{hash_password, verify_password};
use crate::context::Context;
use chrono::Utc;
use internhub_core::validation;
use internhub_core::*;
use internhub_store::{AuditRecord, Store};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
    pub university_id: Option<UniversityId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub full_name: Option<String>,
    pub is_active: Option<bool>,
    pub university_id: Option<UniversityId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    pub role: Option<Role>,
    pub university_id: Option<UniversityId>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    /// Required unless an admin changes someone else's password
    pub current_password: Option<String>,
    pub new_password: String,
}

pub struct UserService<'a> {
    ctx: &'a Context,
}

impl<'a> UserService<'a> {
    pub(crate) fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    fn store(&self) -> &Store {
        &self.ctx.store
    }

    pub fn create(&self, p: &Principal, req: NewUser) -> DomainResult<UserView> {
        p.require_admin()?;
        if req.role == Role::Intern {
            return Err(DomainError::validation(
                "intern accounts are created from an arrived student",
            ));
        }
        let email = validation::email(&req.email)?;
        let full_name = validation::required("fullName", &req.full_name, 120)?;
        validation::password(&req.password)?;

        let store = self.store();
        let _guard = store.writer();
        ensure_email_free(store, &email)?;
        let university_id = match (req.role, req.university_id) {
            (Role::University, Some(id)) => {
                store.universities.get(id)?;
                Some(id)
            }
            (Role::University, None) => {
                return Err(DomainError::validation(
                    "university accounts need a universityId",
                ))
            }
            (_, Some(_)) => {
                return Err(DomainError::validation(
                    "only university accounts carry a universityId",
                ))
            }
            (_, None) => None,
        };

        let user = User {
            id: UserId::new(),
            email,
            password_hash: hash_password(&req.password, self.ctx.settings.password_rounds),
            full_name,
            role: req.role,
            university_id,
            is_active: true,
            last_login_at: None,
            timestamps: Timestamps::new(Utc::now()),
        };
        store.users.insert(user.clone())?;
        store.record(AuditRecord::new(EntityKind::User, user.id, "create").by(p.user_id));
        info!(user_id = %user.id, role = %user.role, "user created");
        Ok(user.view())
    }

    /// Admins see anyone, everyone else only themselves
    pub fn get(&self, p: &Principal, id: UserId) -> DomainResult<UserView> {
        if !p.is_admin() && p.user_id != id {
            return Err(DomainError::forbidden("cannot view other accounts"));
        }
        Ok(self.store().users.get(id)?.view())
    }

    pub fn list(
        &self,
        p: &Principal,
        filter: &UserFilter,
        page: PageRequest,
    ) -> DomainResult<Page<UserView>> {
        p.require_admin()?;
        let search = filter.search.as_deref().map(str::to_lowercase);
        let rows = self.store().users.list(|u| {
            filter.role.map_or(true, |r| u.role == r)
                && filter.university_id.map_or(true, |id| u.university_id == Some(id))
                && search.as_deref().map_or(true, |s| {
                    u.email.contains(s) || u.full_name.to_lowercase().contains(s)
                })
        });
        Ok(page.apply(rows).map(|u| u.view()))
    }

    pub fn update(&self, p: &Principal, id: UserId, req: UserUpdate) -> DomainResult<UserView> {
        p.require_admin()?;
        let full_name = req
            .full_name
            .as_deref()
            .map(|n| validation::required("fullName", n, 120))
            .transpose()?;
        if p.user_id == id && req.is_active == Some(false) {
            return Err(DomainError::validation("cannot deactivate your own account"));
        }

        let store = self.store();
        let _guard = store.writer();
        if let Some(uni) = req.university_id {
            store.universities.get(uni)?;
        }
        let (user, ()) = store.users.update(id, Utc::now(), |u| {
            if let Some(name) = full_name {
                u.full_name = name;
            }
            if let Some(active) = req.is_active {
                u.is_active = active;
            }
            if let Some(uni) = req.university_id {
                if u.role != Role::University {
                    return Err(DomainError::validation(
                        "only university accounts carry a universityId",
                    ));
                }
                u.university_id = Some(uni);
            }
            Ok(())
        })?;
        store.record(AuditRecord::new(EntityKind::User, id, "update").by(p.user_id));
        Ok(user.view())
    }

    pub fn change_password(
        &self,
        p: &Principal,
        id: UserId,
        req: PasswordChange,
    ) -> DomainResult<()> {
        let self_service = p.user_id == id;
        if !self_service && !p.is_admin() {
            return Err(DomainError::forbidden("cannot change another user's password"));
        }
        validation::password(&req.new_password)?;

        let store = self.store();
        let user = store.users.get(id)?;
        if self_service {
            let current = req.current_password.as_deref().unwrap_or_default();
            if !verify_password(current, &user.password_hash) {
                return Err(DomainError::validation("current password is incorrect"));
            }
        }
        let hash = hash_password(&req.new_password, self.ctx.settings.password_rounds);
        store.users.update(id, Utc::now(), |u| {
            u.password_hash = hash;
            Ok(())
        })?;
        store.record(
            AuditRecord::new(EntityKind::User, id, "change_password").by(p.user_id),
        );
        info!(user_id = %id, "password changed");
        Ok(())
    }

    pub fn delete(&self, p: &Principal, id: UserId) -> DomainResult<()> {
        p.require_admin()?;
        if p.user_id == id {
            return Err(DomainError::validation("cannot delete your own account"));
        }
        let store = self.store();
        let _guard = store.writer();
        if store
            .interns
            .any(|i| i.user_id == id && i.status == InternStatus::Active)
        {
            return Err(DomainError::precondition(
                "account belongs to an active intern; terminate or complete the placement first",
            ));
        }
        store.users.soft_delete(id, Utc::now())?;
        store.record(AuditRecord::new(EntityKind::User, id, "delete").by(p.user_id));
        info!(user_id = %id, "user deleted");
        Ok(())
    }
}

/// Caller holds the writer guard
pub(crate) fn ensure_email_free(store: &Store, email: &str) -> DomainResult<()> {
    if store.users.any(|u| u.email == email) {
        return Err(DomainError::conflict(format!("email {email} is already registered")));
    }
    Ok(())
}
