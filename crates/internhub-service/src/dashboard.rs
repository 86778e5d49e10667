//! Aggregate counts for the landing page

use crate::context::Context;
use internhub_core::*;
use internhub_store::Store;
use serde::Serialize;
use std::collections::BTreeMap;

/// Count per status wire name; every status is present, zero included
pub type StatusCounts = BTreeMap<String, usize>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversityCounts {
    pub total: usize,
    pub active: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternCounts {
    pub by_status: StatusCounts,
    pub suspended: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingReview {
    /// Applications UNDER_REVIEW
    pub applications: usize,
    /// Submissions SUBMITTED or UNDER_REVIEW
    pub submissions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversityBreakdown {
    pub university_id: UniversityId,
    pub name: String,
    pub applications: usize,
    pub students: usize,
    pub active_interns: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    /// `None` for the global view
    pub university_id: Option<UniversityId>,
    pub universities: UniversityCounts,
    pub applications: StatusCounts,
    pub students: StatusCounts,
    pub interns: InternCounts,
    pub submissions: StatusCounts,
    pub pending_review: PendingReview,
    pub by_university: Vec<UniversityBreakdown>,
}

pub struct DashboardService<'a> {
    ctx: &'a Context,
}

impl<'a> DashboardService<'a> {
    pub(crate) fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Global for ADMIN, own university for UNIVERSITY
    pub fn summary(&self, p: &Principal) -> DomainResult<DashboardSummary> {
        p.require_any(&[Role::Admin, Role::University])?;
        let scope = if p.is_admin() {
            None
        } else {
            Some(p.scoped_university()?)
        };
        Ok(summarize(&self.ctx.store, scope))
    }
}

fn summarize(store: &Store, scope: Option<UniversityId>) -> DashboardSummary {
    let in_scope = |id: UniversityId| scope.map_or(true, |s| s == id);

    let universities = store.universities.list(|u| in_scope(u.id));
    let applications = store.applications.list(|a| in_scope(a.university_id));
    let students = store.students.list(|s| in_scope(s.university_id));
    let interns = store.interns.list(|i| in_scope(i.university_id));
    let intern_ids: Vec<InternId> = interns.iter().map(|i| i.id).collect();
    let submissions = store.submissions.list(|s| intern_ids.contains(&s.intern_id));

    let pending_review = PendingReview {
        applications: applications
            .iter()
            .filter(|a| a.status == ApplicationStatus::UnderReview)
            .count(),
        submissions: submissions
            .iter()
            .filter(|s| {
                matches!(
                    s.status,
                    SubmissionStatus::Submitted | SubmissionStatus::UnderReview
                )
            })
            .count(),
    };

    let mut by_university: Vec<UniversityBreakdown> = universities
        .iter()
        .map(|u| UniversityBreakdown {
            university_id: u.id,
            name: u.name.clone(),
            applications: applications.iter().filter(|a| a.university_id == u.id).count(),
            students: students.iter().filter(|s| s.university_id == u.id).count(),
            active_interns: interns
                .iter()
                .filter(|i| i.university_id == u.id && i.status == InternStatus::Active)
                .count(),
        })
        .collect();
    by_university.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

    DashboardSummary {
        university_id: scope,
        universities: UniversityCounts {
            total: universities.len(),
            active: universities.iter().filter(|u| u.is_active).count(),
        },
        applications: count_by_status(applications.iter().map(|a| a.status)),
        students: count_by_status(students.iter().map(|s| s.status)),
        interns: InternCounts {
            by_status: count_by_status(interns.iter().map(|i| i.status)),
            suspended: interns.iter().filter(|i| i.suspended).count(),
        },
        submissions: count_by_status(submissions.iter().map(|s| s.status)),
        pending_review,
        by_university,
    }
}

fn count_by_status<S: Workflow>(statuses: impl Iterator<Item = S>) -> StatusCounts {
    let mut counts: StatusCounts = S::all().iter().map(|s| (s.to_string(), 0)).collect();
    for status in statuses {
        *counts.entry(status.to_string()).or_default() += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_counts_are_zero_filled() {
        let counts =
            count_by_status([SubmissionStatus::Submitted, SubmissionStatus::Submitted].into_iter());
        assert_eq!(counts.len(), SubmissionStatus::all().len());
        assert_eq!(counts["SUBMITTED"], 2);
        assert_eq!(counts["APPROVED"], 0);
    }

    #[test]
    fn empty_store_summary() {
        let summary = summarize(&Store::new(), None);
        assert_eq!(summary.universities.total, 0);
        assert_eq!(summary.applications["PENDING"], 0);
        assert!(summary.by_university.is_empty());
    }
}
