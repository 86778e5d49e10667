use crate::context::Context;
use chrono::Utc;
use internhub_core::validation;
use internhub_core::*;
use internhub_store::{AuditRecord, Store};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDepartment {
    pub name: String,
    pub description: Option<String>,
    pub supervisor_id: Option<UserId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub supervisor_id: Option<UserId>,
}

pub struct DepartmentService<'a> {
    ctx: &'a Context,
}

impl<'a> DepartmentService<'a> {
    pub(crate) fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    fn store(&self) -> &Store {
        &self.ctx.store
    }

    pub fn create(&self, p: &Principal, req: NewDepartment) -> DomainResult<Department> {
        p.require_admin()?;
        let name = validation::required("name", &req.name, 120)?;
        let description = validation::optional("description", req.description.as_deref(), 1000)?;

        let store = self.store();
        let _guard = store.writer();
        ensure_name_free(store, None, &name)?;
        if let Some(sup) = req.supervisor_id {
            require_supervisor(store, sup)?;
        }

        let department = Department {
            id: DepartmentId::new(),
            name,
            description,
            supervisor_id: req.supervisor_id,
            timestamps: Timestamps::new(Utc::now()),
        };
        store.departments.insert(department.clone())?;
        store.record(
            AuditRecord::new(EntityKind::Department, department.id, "create").by(p.user_id),
        );
        info!(department_id = %department.id, name = %department.name, "department created");
        Ok(department)
    }

    pub fn get(&self, _p: &Principal, id: DepartmentId) -> DomainResult<Department> {
        self.store().departments.get(id)
    }

    pub fn list(
        &self,
        _p: &Principal,
        search: Option<&str>,
        page: PageRequest,
    ) -> Page<Department> {
        let search = search.map(str::to_lowercase);
        let rows = self.store().departments.list(|d| {
            search
                .as_deref()
                .map_or(true, |s| d.name.to_lowercase().contains(s))
        });
        page.apply(rows)
    }

    pub fn update(
        &self,
        p: &Principal,
        id: DepartmentId,
        req: DepartmentUpdate,
    ) -> DomainResult<Department> {
        p.require_admin()?;
        let name = req.name.as_deref().map(|n| validation::required("name", n, 120)).transpose()?;
        let description = validation::optional("description", req.description.as_deref(), 1000)?;

        let store = self.store();
        let _guard = store.writer();
        if let Some(n) = &name {
            ensure_name_free(store, Some(id), n)?;
        }
        if let Some(sup) = req.supervisor_id {
            require_supervisor(store, sup)?;
        }
        let (department, ()) = store.departments.update(id, Utc::now(), |d| {
            if let Some(n) = name {
                d.name = n;
            }
            if description.is_some() {
                d.description = description;
            }
            if req.supervisor_id.is_some() {
                d.supervisor_id = req.supervisor_id;
            }
            Ok(())
        })?;
        store.record(AuditRecord::new(EntityKind::Department, id, "update").by(p.user_id));
        Ok(department)
    }

    pub fn delete(&self, p: &Principal, id: DepartmentId) -> DomainResult<()> {
        p.require_admin()?;
        let store = self.store();
        let _guard = store.writer();
        if store
            .interns
            .any(|i| i.department_id == Some(id) && i.status == InternStatus::Active)
        {
            return Err(DomainError::precondition("department has active interns"));
        }
        store.departments.soft_delete(id, Utc::now())?;
        store.record(AuditRecord::new(EntityKind::Department, id, "delete").by(p.user_id));
        info!(department_id = %id, "department deleted");
        Ok(())
    }
}

fn ensure_name_free(store: &Store, except: Option<DepartmentId>, name: &str) -> DomainResult<()> {
    let lc = name.to_lowercase();
    if store
        .departments
        .any(|d| Some(d.id) != except && d.name.to_lowercase() == lc)
    {
        return Err(DomainError::conflict(format!("department '{name}' already exists")));
    }
    Ok(())
}

/// Active SUPERVISOR account
pub(crate) fn require_supervisor(store: &Store, id: UserId) -> DomainResult<User> {
    let user = store.users.get(id)?;
    if user.role != Role::Supervisor || !user.is_active {
        return Err(DomainError::validation(format!(
            "user {id} is not an active supervisor"
        )));
    }
    Ok(user)
}
