use crate::context::Context;
use chrono::Utc;
use internhub_core::validation;
use internhub_core::*;
use internhub_store::{AuditRecord, Store};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUniversity {
    pub name: String,
    pub code: String,
    pub country: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversityUpdate {
    pub name: Option<String>,
    pub code: Option<String>,
    pub country: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversityFilter {
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

pub struct UniversityService<'a> {
    ctx: &'a Context,
}

impl<'a> UniversityService<'a> {
    pub(crate) fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    fn store(&self) -> &Store {
        &self.ctx.store
    }

    pub fn create(&self, p: &Principal, req: NewUniversity) -> DomainResult<University> {
        p.require_admin()?;
        let name = validation::required("name", &req.name, 200)?;
        let code = validation::required("code", &req.code, 20)?.to_uppercase();
        let country = validation::required("country", &req.country, 80)?;
        let contact_email = validation::email(&req.contact_email)?;
        let contact_phone = validation::optional("contactPhone", req.contact_phone.as_deref(), 40)?;
        let address = validation::optional("address", req.address.as_deref(), 300)?;

        let store = self.store();
        let _guard = store.writer();
        ensure_unique(store, None, &name, &code)?;

        let university = University {
            id: UniversityId::new(),
            name,
            code,
            country,
            contact_email,
            contact_phone,
            address,
            is_active: true,
            timestamps: Timestamps::new(Utc::now()),
        };
        store.universities.insert(university.clone())?;
        store.record(
            AuditRecord::new(EntityKind::University, university.id, "create").by(p.user_id),
        );
        info!(university_id = %university.id, name = %university.name, "university created");
        Ok(university)
    }

    pub fn get(&self, p: &Principal, id: UniversityId) -> DomainResult<University> {
        p.require_any(&[Role::Admin, Role::University])?;
        p.require_university_access(id)?;
        self.store().universities.get(id)
    }

    pub fn list(
        &self,
        p: &Principal,
        filter: &UniversityFilter,
        page: PageRequest,
    ) -> DomainResult<Page<University>> {
        p.require_any(&[Role::Admin, Role::University])?;
        let scope = if p.is_admin() {
            None
        } else {
            Some(p.scoped_university()?)
        };
        let search = filter.search.as_deref().map(str::to_lowercase);
        let rows = self.store().universities.list(|u| {
            scope.map_or(true, |id| u.id == id)
                && filter.is_active.map_or(true, |a| u.is_active == a)
                && search.as_deref().map_or(true, |s| {
                    u.name.to_lowercase().contains(s) || u.code.to_lowercase().contains(s)
                })
        });
        Ok(page.apply(rows))
    }

    pub fn update(
        &self,
        p: &Principal,
        id: UniversityId,
        req: UniversityUpdate,
    ) -> DomainResult<University> {
        p.require_admin()?;
        let name = req.name.as_deref().map(|v| validation::required("name", v, 200)).transpose()?;
        let code = req
            .code
            .as_deref()
            .map(|v| validation::required("code", v, 20).map(|c| c.to_uppercase()))
            .transpose()?;
        let country = req
            .country
            .as_deref()
            .map(|v| validation::required("country", v, 80))
            .transpose()?;
        let contact_email = req.contact_email.as_deref().map(validation::email).transpose()?;
        let contact_phone = validation::optional("contactPhone", req.contact_phone.as_deref(), 40)?;
        let address = validation::optional("address", req.address.as_deref(), 300)?;

        let store = self.store();
        let _guard = store.writer();
        let current = store.universities.get(id)?;
        ensure_unique(
            store,
            Some(id),
            name.as_deref().unwrap_or(&current.name),
            code.as_deref().unwrap_or(&current.code),
        )?;

        let (university, ()) = store.universities.update(id, Utc::now(), |u| {
            if let Some(v) = name {
                u.name = v;
            }
            if let Some(v) = code {
                u.code = v;
            }
            if let Some(v) = country {
                u.country = v;
            }
            if let Some(v) = contact_email {
                u.contact_email = v;
            }
            if contact_phone.is_some() {
                u.contact_phone = contact_phone;
            }
            if address.is_some() {
                u.address = address;
            }
            if let Some(v) = req.is_active {
                u.is_active = v;
            }
            Ok(())
        })?;
        store.record(AuditRecord::new(EntityKind::University, id, "update").by(p.user_id));
        Ok(university)
    }

    /// Refused while open applications or active interns remain
    pub fn delete(&self, p: &Principal, id: UniversityId) -> DomainResult<()> {
        p.require_admin()?;
        let store = self.store();
        let _guard = store.writer();
        store.universities.get(id)?;

        if store
            .applications
            .any(|a| a.university_id == id && a.status != ApplicationStatus::Archived)
        {
            return Err(DomainError::precondition(
                "university has applications that are not archived",
            ));
        }
        if store
            .interns
            .any(|i| i.university_id == id && i.status == InternStatus::Active)
        {
            return Err(DomainError::precondition("university has active interns"));
        }

        let now = Utc::now();
        store.universities.soft_delete(id, now)?;
        // university accounts lose access with their university
        for user in store.users.list(|u| u.university_id == Some(id)) {
            store.users.update(user.id, now, |u| {
                u.is_active = false;
                Ok(())
            })?;
        }
        store.record(AuditRecord::new(EntityKind::University, id, "delete").by(p.user_id));
        info!(university_id = %id, "university deleted");
        Ok(())
    }
}

fn ensure_unique(
    store: &Store,
    except: Option<UniversityId>,
    name: &str,
    code: &str,
) -> DomainResult<()> {
    let name_lc = name.to_lowercase();
    let clash = store.universities.list(|u| {
        Some(u.id) != except && (u.name.to_lowercase() == name_lc || u.code == code)
    });
    if let Some(other) = clash.first() {
        return Err(DomainError::conflict(format!(
            "university '{}' ({}) already uses this name or code",
            other.name, other.code
        )));
    }
    Ok(())
}
