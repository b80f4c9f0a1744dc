//! Job board queries: postings and applications.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{DbError, DbJob, DbJobApplication, SocialDb};
use crate::types::{ApplicationStatus, JobStatus};

fn map_job(row: &Row) -> rusqlite::Result<DbJob> {
    Ok(DbJob {
        id: row.get(0)?,
        company_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        job_type: row.get(4)?,
        experience_level: row.get(5)?,
        salary_min: row.get(6)?,
        salary_max: row.get(7)?,
        specializations: row.get(8)?,
        applications_count: row.get(9)?,
        status: JobStatus::from_str_lossy(&row.get::<_, String>(10)?),
        created_at: row.get(11)?,
    })
}

const JOB_COLUMNS: &str = "id, company_id, title, description, job_type, experience_level,
     salary_min, salary_max, specializations, applications_count, status, created_at";

fn map_application(row: &Row) -> rusqlite::Result<DbJobApplication> {
    Ok(DbJobApplication {
        id: row.get(0)?,
        job_id: row.get(1)?,
        applicant_id: row.get(2)?,
        cover_letter: row.get(3)?,
        status: ApplicationStatus::from_str_lossy(&row.get::<_, String>(4)?),
        created_at: row.get(5)?,
    })
}

const APPLICATION_COLUMNS: &str = "id, job_id, applicant_id, cover_letter, status, created_at";

impl SocialDb {
    pub fn insert_job(&self, job: &DbJob) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO jobs
                (id, company_id, title, description, job_type, experience_level,
                 salary_min, salary_max, specializations, applications_count, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                job.id,
                job.company_id,
                job.title,
                job.description,
                job.job_type,
                job.experience_level,
                job.salary_min,
                job.salary_max,
                job.specializations,
                job.applications_count,
                job.status.as_str(),
                job.created_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_job(&self, id: &str) -> Result<Option<DbJob>, DbError> {
        let job = self
            .conn
            .query_row(
                &format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS),
                [id],
                map_job,
            )
            .optional()?;
        Ok(job)
    }

    /// Newest-first listing, optionally restricted to one status.
    pub fn list_jobs(
        &self,
        status: Option<JobStatus>,
        limit: usize,
    ) -> Result<Vec<DbJob>, DbError> {
        let mut results = Vec::new();
        match status {
            Some(s) => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {} FROM jobs WHERE status = ?1 ORDER BY created_at DESC LIMIT ?2",
                    JOB_COLUMNS
                ))?;
                let rows = stmt.query_map(params![s.as_str(), limit as i64], map_job)?;
                for row in rows {
                    results.push(row?);
                }
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {} FROM jobs ORDER BY created_at DESC LIMIT ?1",
                    JOB_COLUMNS
                ))?;
                let rows = stmt.query_map([limit as i64], map_job)?;
                for row in rows {
                    results.push(row?);
                }
            }
        }
        Ok(results)
    }

    pub fn jobs_for_company(&self, company_id: &str) -> Result<Vec<DbJob>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM jobs WHERE company_id = ?1 ORDER BY created_at DESC",
            JOB_COLUMNS
        ))?;
        let rows = stmt.query_map([company_id], map_job)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Transition a posting (active → closed, etc.). Returns false when the
    /// row is missing.
    pub fn set_job_status(&self, job_id: &str, status: JobStatus) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "UPDATE jobs SET status = ?2 WHERE id = ?1",
            params![job_id, status.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Create a pending application and bump the posting's counter in the
    /// same transaction. Fails on the (job, applicant) constraint for
    /// duplicates — callers check `has_applied` first for better copy.
    pub fn insert_application(
        &self,
        job_id: &str,
        applicant_id: &str,
        cover_letter: Option<&str>,
    ) -> Result<DbJobApplication, DbError> {
        let application = DbJobApplication {
            id: format!("app-{}", Uuid::new_v4()),
            job_id: job_id.to_string(),
            applicant_id: applicant_id.to_string(),
            cover_letter: cover_letter.map(|s| s.to_string()),
            status: ApplicationStatus::Pending,
            created_at: Utc::now().to_rfc3339(),
        };
        self.with_transaction(|db| {
            db.conn.execute(
                "INSERT INTO job_applications (id, job_id, applicant_id, cover_letter, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
                params![
                    application.id,
                    application.job_id,
                    application.applicant_id,
                    application.cover_letter,
                    application.created_at
                ],
            )?;
            db.conn.execute(
                "UPDATE jobs SET applications_count = applications_count + 1 WHERE id = ?1",
                [job_id],
            )?;
            Ok::<(), DbError>(())
        })?;
        Ok(application)
    }

    pub fn has_applied(&self, job_id: &str, applicant_id: &str) -> Result<bool, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT 1 FROM job_applications WHERE job_id = ?1 AND applicant_id = ?2")?;
        Ok(stmt.exists(params![job_id, applicant_id])?)
    }

    pub fn applications_for_job(&self, job_id: &str) -> Result<Vec<DbJobApplication>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM job_applications WHERE job_id = ?1 ORDER BY created_at ASC",
            APPLICATION_COLUMNS
        ))?;
        let rows = stmt.query_map([job_id], map_application)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub fn applications_for_applicant(
        &self,
        applicant_id: &str,
    ) -> Result<Vec<DbJobApplication>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM job_applications WHERE applicant_id = ?1 ORDER BY created_at DESC",
            APPLICATION_COLUMNS
        ))?;
        let rows = stmt.query_map([applicant_id], map_application)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Review-pipeline transition for an application.
    pub fn set_application_status(
        &self,
        application_id: &str,
        status: ApplicationStatus,
    ) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "UPDATE job_applications SET status = ?2 WHERE id = ?1",
            params![application_id, status.as_str()],
        )?;
        Ok(changed > 0)
    }
}
