//! Job board surface: postings by institutions, applications by individuals.

use chrono::Utc;
use uuid::Uuid;

use crate::db::{DbJob, DbJobApplication};
use crate::error::ServiceError;
use crate::services::notifications;
use crate::state::AppState;
use crate::types::{Actor, ApplicationStatus, JobStatus, JobWithCompany, NotificationKind};

pub struct NewJob<'a> {
    pub company_id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub job_type: Option<&'a str>,
    pub experience_level: Option<&'a str>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub specializations: Option<&'a str>,
}

pub fn post_job(state: &AppState, new_job: &NewJob) -> Result<DbJob, ServiceError> {
    if new_job.title.trim().is_empty() {
        return Err(ServiceError::Validation("job title is required".into()));
    }
    if let (Some(min), Some(max)) = (new_job.salary_min, new_job.salary_max) {
        if min > max {
            return Err(ServiceError::Validation(
                "salary minimum exceeds maximum".into(),
            ));
        }
    }
    let db = state.db.lock();
    if db.get_institution(new_job.company_id)?.is_none() {
        return Err(ServiceError::NotFound(format!(
            "institution {}",
            new_job.company_id
        )));
    }
    let job = DbJob {
        id: format!("job-{}", Uuid::new_v4()),
        company_id: new_job.company_id.to_string(),
        title: new_job.title.trim().to_string(),
        description: new_job.description.map(|s| s.to_string()),
        job_type: new_job.job_type.map(|s| s.to_string()),
        experience_level: new_job.experience_level.map(|s| s.to_string()),
        salary_min: new_job.salary_min,
        salary_max: new_job.salary_max,
        specializations: new_job.specializations.map(|s| s.to_string()),
        applications_count: 0,
        status: JobStatus::Active,
        created_at: Utc::now().to_rfc3339(),
    };
    db.insert_job(&job)?;
    Ok(job)
}

/// Job listings with the posting institution resolved. Jobs whose company
/// vanished are dropped from the page.
pub fn list_jobs(
    state: &AppState,
    status: Option<JobStatus>,
    limit: usize,
) -> Result<Vec<JobWithCompany>, ServiceError> {
    let db = state.db.lock();
    let jobs = db.list_jobs(status, limit)?;
    let mut results = Vec::with_capacity(jobs.len());
    for job in jobs {
        match db.actor_for_institution(&job.company_id)? {
            Some(company) => results.push(JobWithCompany { job, company }),
            None => log::warn!("job {} has no resolvable company", job.id),
        }
    }
    Ok(results)
}

pub fn get_job(state: &AppState, job_id: &str) -> Result<JobWithCompany, ServiceError> {
    let db = state.db.lock();
    let job = db
        .get_job(job_id)?
        .ok_or_else(|| ServiceError::NotFound(format!("job {}", job_id)))?;
    let company = db
        .actor_for_institution(&job.company_id)?
        .unwrap_or(Actor::Institution {
            id: job.company_id.clone(),
            name: "Unknown institution".to_string(),
            institution_type: None,
            logo_url: None,
        });
    Ok(JobWithCompany { job, company })
}

pub fn close_job(state: &AppState, job_id: &str) -> Result<(), ServiceError> {
    let db = state.db.lock();
    if !db.set_job_status(job_id, JobStatus::Closed)? {
        return Err(ServiceError::NotFound(format!("job {}", job_id)));
    }
    Ok(())
}

/// Apply to an active posting. One application per (job, applicant); the
/// institution's admin is notified when one exists.
pub fn apply_to_job(
    state: &AppState,
    job_id: &str,
    applicant_id: &str,
    cover_letter: Option<&str>,
) -> Result<DbJobApplication, ServiceError> {
    let db = state.db.lock();
    let job = db
        .get_job(job_id)?
        .ok_or_else(|| ServiceError::NotFound(format!("job {}", job_id)))?;
    if job.status != JobStatus::Active {
        return Err(ServiceError::Conflict(format!(
            "job is not accepting applications ({})",
            job.status.as_str()
        )));
    }
    if db.has_applied(job_id, applicant_id)? {
        return Err(ServiceError::Conflict(
            "you have already applied to this job".into(),
        ));
    }

    let application = db.insert_application(job_id, applicant_id, cover_letter)?;

    if let Some(admin_id) = db
        .get_institution(&job.company_id)?
        .and_then(|inst| inst.admin_profile_id)
    {
        let applicant = db
            .actor_for_profile(applicant_id)?
            .map(|actor| actor.display_name().to_string())
            .unwrap_or_else(|| "Someone".to_string());
        notifications::push(
            state,
            &db,
            &admin_id,
            NotificationKind::JobApplication,
            &format!("{} applied to {}", applicant, job.title),
            None,
        )?;
    }
    Ok(application)
}

pub fn my_applications(
    state: &AppState,
    applicant_id: &str,
) -> Result<Vec<DbJobApplication>, ServiceError> {
    let db = state.db.lock();
    Ok(db.applications_for_applicant(applicant_id)?)
}

pub fn applications_for_job(
    state: &AppState,
    job_id: &str,
) -> Result<Vec<DbJobApplication>, ServiceError> {
    let db = state.db.lock();
    Ok(db.applications_for_job(job_id)?)
}

pub fn review_application(
    state: &AppState,
    application_id: &str,
    status: ApplicationStatus,
) -> Result<(), ServiceError> {
    if status == ApplicationStatus::Pending {
        return Err(ServiceError::Validation(
            "cannot move an application back to pending".into(),
        ));
    }
    let db = state.db.lock();
    if !db.set_application_status(application_id, status)? {
        return Err(ServiceError::NotFound(format!(
            "application {}",
            application_id
        )));
    }
    Ok(())
}
