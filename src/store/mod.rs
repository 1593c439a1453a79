//! Persistence gateway.
//!
//! Every method is one logical unit: implementations must either apply all of
//! its writes or none of them. Methods that return `bool` or `Option` use
//! `false`/`None` for "the survey (or question) does not exist".

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    AnswerSet, EmailCode, NewResponse, Question, Survey, SurveyResponse, SurveyStatus, User,
};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} is not unique")]
    Duplicate(String),

    /// A row refers to something deleted concurrently.
    #[error("{0} does not exist")]
    MissingReference(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Survey fields rewritten by a replace-all edit.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyHeader {
    pub title: String,
    pub status: SurveyStatus,
}

/// Survey fields an owner may change in place.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveySettings {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub day_start_time: Option<chrono::NaiveTime>,
    #[serde(default)]
    pub day_end_time: Option<chrono::NaiveTime>,
    #[serde(default)]
    pub password_strategy: i32,
    #[serde(default)]
    pub passwords: Vec<String>,
    #[serde(default)]
    pub browser_limit: bool,
    #[serde(default)]
    pub ip_limit: bool,
    #[serde(default)]
    pub max_response_count: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    NotFound,
    OutOfRange { count: i32 },
    Unchanged,
    Moved,
}

#[async_trait]
pub trait SurveyStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the user name or email is taken.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    async fn find_user(&self, user_id: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_login(&self, name_or_email: &str) -> StoreResult<Option<User>>;
    /// Returns `false` when no user has the email.
    async fn update_password(&self, email: &str, password_hash: &str) -> StoreResult<bool>;

    /// Stores the code, dropping codes that have already expired.
    async fn insert_email_code(&self, code: &EmailCode) -> StoreResult<()>;
    async fn find_email_code(&self, email: &str, code: &str) -> StoreResult<Option<EmailCode>>;
    async fn delete_email_codes(&self, email: &str) -> StoreResult<()>;

    /// Inserts the survey row together with an initial question set.
    async fn insert_survey(&self, survey: &Survey, questions: &[Question]) -> StoreResult<()>;
    async fn find_survey(&self, survey_id: &str) -> StoreResult<Option<Survey>>;
    /// Returns one page of the user's non-deleted surveys, newest first, and the total.
    async fn list_surveys(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<Survey>, i64)>;
    async fn update_survey_settings(
        &self,
        survey_id: &str,
        settings: &SurveySettings,
    ) -> StoreResult<bool>;
    async fn set_survey_status(&self, survey_id: &str, status: SurveyStatus) -> StoreResult<bool>;
    /// Removes the survey with its questions, template items, responses and answers.
    async fn delete_survey(&self, survey_id: &str) -> StoreResult<bool>;

    /// Questions in position order, template items in template order.
    async fn load_questions(&self, survey_id: &str) -> StoreResult<Vec<Question>>;
    /// Drops every question and every response of the survey, resets the
    /// response counter and stores `questions` at positions `0..n`.
    async fn replace_questions(
        &self,
        survey_id: &str,
        header: &SurveyHeader,
        questions: &[Question],
    ) -> StoreResult<bool>;
    /// Returns the position the question was stored at.
    async fn append_question(&self, survey_id: &str, question: &Question)
        -> StoreResult<Option<i32>>;
    /// Deletes the question and closes the gap it leaves in the order.
    async fn delete_question(&self, survey_id: &str, question_id: &str) -> StoreResult<bool>;
    async fn move_question(
        &self,
        survey_id: &str,
        question_id: &str,
        new_position: i32,
    ) -> StoreResult<MoveOutcome>;

    /// Stores the response, its answers and bumps the response counter.
    /// A reused response id fails with [`StoreError::Duplicate`], an answer to
    /// an item that is no longer stored with [`StoreError::MissingReference`].
    async fn insert_response(&self, response: &NewResponse) -> StoreResult<bool>;
    /// Responses in submission order.
    async fn list_responses(&self, survey_id: &str) -> StoreResult<Vec<SurveyResponse>>;
    /// Answer rows in submission order.
    async fn list_answers(&self, survey_id: &str) -> StoreResult<AnswerSet>;
    async fn count_selected(&self, survey_id: &str, option_id: &str) -> StoreResult<i64>;
    async fn text_answers(&self, survey_id: &str, text_fill_in_id: &str)
        -> StoreResult<Vec<String>>;
    async fn num_answers(&self, survey_id: &str, num_fill_in_id: &str) -> StoreResult<Vec<f64>>;
}
