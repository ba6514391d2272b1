use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::profile::{Education, ProfileSnapshot, UserProfile, WorkExperience};
use crate::profiles::ProfileLookup;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Deserialize)]
pub struct UserFields {
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Deserialize)]
pub struct NewWorkExperience {
    pub company: String,
    pub title: String,
    #[serde(default)]
    pub location: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct NewEducation {
    pub school: String,
    pub degree: String,
    pub field: String,
    #[serde(default)]
    pub location: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default)]
    pub description: String,
}

/// Body of POST /api/v1/users/onboarding.
#[derive(Debug, Deserialize)]
pub struct OnboardingRequest {
    pub user: UserFields,
    #[serde(default)]
    pub work_experience: Vec<NewWorkExperience>,
    #[serde(default)]
    pub education: Vec<NewEducation>,
}

fn require(value: &str, what: &str) -> Result<(), ProfileError> {
    if value.trim().is_empty() {
        return Err(ProfileError::Validation(format!("{what} is required")));
    }
    Ok(())
}

fn check_dates(start: NaiveDate, end: Option<NaiveDate>, what: &str) -> Result<(), ProfileError> {
    match end {
        Some(end) if end < start => Err(ProfileError::Validation(format!(
            "{what} ends ({end}) before it starts ({start})"
        ))),
        _ => Ok(()),
    }
}

/// Required fields shared by user creation, update and onboarding.
pub fn validate_user(user: &UserFields) -> Result<(), ProfileError> {
    require(&user.email, "email")?;
    require(&user.full_name, "full_name")
}

/// Checks an onboarding payload without touching the database.
pub fn validate_onboarding(request: &OnboardingRequest) -> Result<(), ProfileError> {
    validate_user(&request.user)?;

    for (i, exp) in request.work_experience.iter().enumerate() {
        let what = format!("work_experience[{i}]");
        require(&exp.company, &format!("{what}.company"))?;
        require(&exp.title, &format!("{what}.title"))?;
        check_dates(exp.start_date, exp.end_date, &what)?;
    }

    for (i, edu) in request.education.iter().enumerate() {
        let what = format!("education[{i}]");
        require(&edu.school, &format!("{what}.school"))?;
        require(&edu.degree, &format!("{what}.degree"))?;
        require(&edu.field, &format!("{what}.field"))?;
        check_dates(edu.start_date, edu.end_date, &what)?;
    }

    Ok(())
}

fn email_taken(email: &str) -> ProfileError {
    ProfileError::Conflict(format!("A user with email {email} already exists"))
}

/// Maps a unique-constraint violation on `users.email` to `Conflict`.
fn conflict_on_duplicate(email: &str) -> impl FnOnce(sqlx::Error) -> ProfileError + '_ {
    move |e| match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => email_taken(email),
        other => ProfileError::Database(other),
    }
}

async fn insert_user(conn: &mut PgConnection, user: &UserFields) -> Result<UserProfile, ProfileError> {
    let email = user.email.trim();

    let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(email)
        .fetch_one(&mut *conn)
        .await?;
    if taken {
        return Err(email_taken(email));
    }

    // the unique index still catches a concurrent insert of the same email
    sqlx::query_as::<_, UserProfile>(
        r#"
        INSERT INTO users (id, email, full_name, phone, location, title, summary)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(user.full_name.trim())
    .bind(&user.phone)
    .bind(&user.location)
    .bind(&user.title)
    .bind(&user.summary)
    .fetch_one(&mut *conn)
    .await
    .map_err(conflict_on_duplicate(email))
}

/// Postgres-backed profile store over `users`, `work_experiences` and `educations`.
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts the user and every entry in one transaction. Nothing is written
    /// unless all of it is.
    pub async fn create_profile(&self, request: &OnboardingRequest) -> Result<Uuid, ProfileError> {
        validate_onboarding(request)?;

        let mut tx = self.pool.begin().await?;
        let user_id = insert_user(&mut tx, &request.user).await?.id;

        for exp in &request.work_experience {
            sqlx::query(
                r#"
                INSERT INTO work_experiences
                    (id, user_id, company, title, location, start_date, end_date, is_current, description)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(&exp.company)
            .bind(&exp.title)
            .bind(&exp.location)
            .bind(exp.start_date)
            .bind(exp.end_date)
            .bind(exp.is_current)
            .bind(&exp.description)
            .execute(&mut *tx)
            .await?;
        }

        for edu in &request.education {
            sqlx::query(
                r#"
                INSERT INTO educations
                    (id, user_id, school, degree, field, location, start_date, end_date, is_current, description)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(&edu.school)
            .bind(&edu.degree)
            .bind(&edu.field)
            .bind(&edu.location)
            .bind(edu.start_date)
            .bind(edu.end_date)
            .bind(edu.is_current)
            .bind(&edu.description)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            "Onboarded user {user_id} ({} jobs, {} degrees)",
            request.work_experience.len(),
            request.education.len()
        );
        Ok(user_id)
    }

    /// Creates a user with no work history or education.
    pub async fn create_user(&self, user: &UserFields) -> Result<UserProfile, ProfileError> {
        validate_user(user)?;

        let mut tx = self.pool.begin().await?;
        let created = insert_user(&mut tx, user).await?;
        tx.commit().await?;

        info!("Created user {}", created.id);
        Ok(created)
    }

    /// Replaces the user's own fields; entries are untouched.
    pub async fn update_user(
        &self,
        user_id: Uuid,
        user: &UserFields,
    ) -> Result<UserProfile, ProfileError> {
        validate_user(user)?;
        let email = user.email.trim();

        let updated = sqlx::query_as::<_, UserProfile>(
            r#"
            UPDATE users
            SET email = $2, full_name = $3, phone = $4, location = $5,
                title = $6, summary = $7, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(email)
        .bind(user.full_name.trim())
        .bind(&user.phone)
        .bind(&user.location)
        .bind(&user.title)
        .bind(&user.summary)
        .fetch_optional(&self.pool)
        .await
        .map_err(conflict_on_duplicate(email))?
        .ok_or_else(|| ProfileError::NotFound(format!("User {user_id} not found")))?;

        info!("Updated user {user_id}");
        Ok(updated)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<UserProfile>, sqlx::Error> {
        sqlx::query_as::<_, UserProfile>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<UserProfile>, sqlx::Error> {
        sqlx::query_as::<_, UserProfile>("SELECT * FROM users WHERE email = $1")
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await
    }

    /// User plus work history and education, both newest first.
    pub async fn get_snapshot(&self, user_id: Uuid) -> Result<Option<ProfileSnapshot>, sqlx::Error> {
        let Some(user) = self.get_user(user_id).await? else {
            return Ok(None);
        };

        let work_history = sqlx::query_as::<_, WorkExperience>(
            r#"
            SELECT id, user_id, company, title, location, start_date, end_date, is_current, description
            FROM work_experiences
            WHERE user_id = $1
            ORDER BY start_date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let education = sqlx::query_as::<_, Education>(
            r#"
            SELECT id, user_id, school, degree, field, location, start_date, end_date, is_current, description
            FROM educations
            WHERE user_id = $1
            ORDER BY start_date DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(ProfileSnapshot {
            user,
            work_history,
            education,
        }))
    }
}

#[async_trait]
impl ProfileLookup for PgProfileStore {
    async fn get_profile_with_details(&self, user_id: Uuid) -> anyhow::Result<Option<ProfileSnapshot>> {
        Ok(self.get_snapshot(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: serde_json::Value) -> OnboardingRequest {
        serde_json::from_value(body).unwrap()
    }

    fn valid() -> serde_json::Value {
        json!({
            "user": { "email": "jane@example.com", "full_name": "Jane Doe" },
            "work_experience": [{
                "company": "Acme", "title": "SRE",
                "start_date": "2021-03-01", "end_date": "2023-01-01"
            }],
            "education": [{
                "school": "State University", "degree": "BSc", "field": "CS",
                "start_date": "2013-09-01", "is_current": true
            }]
        })
    }

    #[test]
    fn test_valid_payload_passes() {
        let req = request(valid());
        assert!(validate_onboarding(&req).is_ok());
        assert_eq!(req.user.phone, "");
        assert!(req.education[0].end_date.is_none());
    }

    #[test]
    fn test_lists_are_optional() {
        let req = request(json!({ "user": { "email": "a@b.c", "full_name": "A" } }));
        assert!(validate_onboarding(&req).is_ok());
        assert!(req.work_experience.is_empty());
    }

    #[test]
    fn test_blank_email_or_name_rejected() {
        let mut body = valid();
        body["user"]["email"] = json!("   ");
        let err = validate_onboarding(&request(body)).unwrap_err();
        assert!(matches!(err, ProfileError::Validation(msg) if msg.contains("email")));

        let mut body = valid();
        body["user"]["full_name"] = json!("");
        assert!(matches!(
            validate_onboarding(&request(body)),
            Err(ProfileError::Validation(_))
        ));
    }

    #[test]
    fn test_user_fields_validation() {
        let user: UserFields = serde_json::from_value(json!({
            "email": "jane@example.com", "full_name": "Jane Doe", "title": "SRE"
        }))
        .unwrap();
        assert!(validate_user(&user).is_ok());
        assert_eq!(user.summary, "");

        let user: UserFields =
            serde_json::from_value(json!({ "email": "jane@example.com", "full_name": "  " }))
                .unwrap();
        let err = validate_user(&user).unwrap_err();
        assert!(matches!(err, ProfileError::Validation(msg) if msg == "full_name is required"));
    }

    #[test]
    fn test_unique_violation_only_maps_to_conflict() {
        let err = conflict_on_duplicate("jane@example.com")(sqlx::Error::RowNotFound);
        assert!(matches!(err, ProfileError::Database(sqlx::Error::RowNotFound)));
        assert_eq!(
            email_taken("jane@example.com").to_string(),
            "A user with email jane@example.com already exists"
        );
    }

    #[test]
    fn test_entry_missing_required_field_rejected() {
        let mut body = valid();
        body["education"][0]["field"] = json!(" ");
        let err = validate_onboarding(&request(body)).unwrap_err();
        assert!(matches!(err, ProfileError::Validation(msg) if msg == "education[0].field is required"));
    }

    #[test]
    fn test_end_before_start_rejected() {
        let mut body = valid();
        body["work_experience"][0]["end_date"] = json!("2020-01-01");
        let err = validate_onboarding(&request(body)).unwrap_err();
        assert!(matches!(err, ProfileError::Validation(msg) if msg.starts_with("work_experience[0]")));
    }
}
