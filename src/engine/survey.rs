use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{new_id, require_survey};
use crate::{
    error::ApiError,
    models::{NumFillIn, Question, QuestionBody, QuestionOption, Survey, SurveyStatus, TextFillIn},
    store::{SurveySettings, SurveyStore},
};

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSurvey {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyDetail {
    #[serde(flatten)]
    pub survey: Survey,
    pub question_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveyPage {
    pub data: Vec<Survey>,
    pub length: usize,
    pub total: i64,
}

/// Loads the survey if `user_id` owns it.
pub async fn owned_survey(
    store: &dyn SurveyStore,
    survey_id: &str,
    user_id: &str,
) -> Result<Survey, ApiError> {
    let survey = require_survey(store, survey_id).await?;
    if survey.user_id != user_id {
        log::warn!("User {} tried to access survey {}", user_id, survey_id);
        return Err(ApiError::Forbidden(
            "survey belongs to another user".to_string(),
        ));
    }
    Ok(survey)
}

pub async fn create_survey(
    store: &dyn SurveyStore,
    user_id: &str,
    new_survey: NewSurvey,
) -> Result<Survey, ApiError> {
    if new_survey.title.trim().is_empty() {
        return Err(ApiError::invalid("title is empty"));
    }
    let now = Utc::now();
    let survey = Survey {
        survey_id: new_id(),
        user_id: user_id.to_string(),
        title: new_survey.title,
        description: new_survey.description,
        status: SurveyStatus::Ongoing,
        response_count: 0,
        created_at: now,
        updated_at: now,
        start_time: None,
        end_time: None,
        day_start_time: None,
        day_end_time: None,
        password_strategy: 0,
        passwords: Vec::new(),
        browser_limit: false,
        ip_limit: false,
        max_response_count: 0,
    };
    store.insert_survey(&survey, &[]).await?;
    log::info!("User {} created survey {}", user_id, survey.survey_id);
    Ok(survey)
}

pub async fn list_surveys(
    store: &dyn SurveyStore,
    user_id: &str,
    count: Option<i64>,
    skip: Option<i64>,
) -> Result<SurveyPage, ApiError> {
    let limit = count.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = skip.unwrap_or(0).max(0);
    let (data, total) = store.list_surveys(user_id, limit, offset).await?;
    Ok(SurveyPage {
        length: data.len(),
        data,
        total,
    })
}

pub async fn survey_detail(store: &dyn SurveyStore, survey: Survey) -> Result<SurveyDetail, ApiError> {
    let question_ids = store
        .load_questions(&survey.survey_id)
        .await?
        .into_iter()
        .map(|q| q.question_id)
        .collect();
    Ok(SurveyDetail {
        survey,
        question_ids,
    })
}

fn validate_settings(settings: &SurveySettings) -> Result<(), ApiError> {
    if settings.title.trim().is_empty() {
        return Err(ApiError::invalid("title is empty"));
    }
    if let (Some(start), Some(end)) = (settings.start_time, settings.end_time) {
        if start > end {
            return Err(ApiError::invalid("start time is after end time"));
        }
    }
    if settings.max_response_count < 0 {
        return Err(ApiError::invalid("max response count is negative"));
    }
    Ok(())
}

pub async fn update_settings(
    store: &dyn SurveyStore,
    survey_id: &str,
    settings: SurveySettings,
) -> Result<Survey, ApiError> {
    validate_settings(&settings)?;
    if !store.update_survey_settings(survey_id, &settings).await? {
        return Err(ApiError::not_found("no such survey"));
    }
    require_survey(store, survey_id).await
}

pub async fn set_status(
    store: &dyn SurveyStore,
    survey_id: &str,
    status: SurveyStatus,
) -> Result<(), ApiError> {
    if !store.set_survey_status(survey_id, status).await? {
        return Err(ApiError::not_found("no such survey"));
    }
    log::info!("Survey {} is now {:?}", survey_id, status);
    Ok(())
}

fn with_fresh_ids(question: Question) -> Question {
    let body = match question.body {
        QuestionBody::Choice(options) => QuestionBody::Choice(
            options
                .into_iter()
                .map(|option| QuestionOption {
                    option_id: new_id(),
                    ..option
                })
                .collect(),
        ),
        QuestionBody::TextSlots(slots) => QuestionBody::TextSlots(
            slots
                .into_iter()
                .map(|_| TextFillIn {
                    text_fill_in_id: new_id(),
                })
                .collect(),
        ),
        QuestionBody::NumSlots(slots) => QuestionBody::NumSlots(
            slots
                .into_iter()
                .map(|slot| NumFillIn {
                    num_fill_in_id: new_id(),
                    ..slot
                })
                .collect(),
        ),
    };
    Question {
        question_id: new_id(),
        body,
        ..question
    }
}

/// Copies the survey with its questions and settings. Responses are not copied.
pub async fn copy_survey(store: &dyn SurveyStore, source: &Survey) -> Result<Survey, ApiError> {
    let questions: Vec<Question> = store
        .load_questions(&source.survey_id)
        .await?
        .into_iter()
        .map(with_fresh_ids)
        .collect();
    let now = Utc::now();
    let copy = Survey {
        survey_id: new_id(),
        title: format!("{} (copy)", source.title),
        status: SurveyStatus::Ongoing,
        response_count: 0,
        created_at: now,
        updated_at: now,
        ..source.clone()
    };
    store.insert_survey(&copy, &questions).await?;
    log::info!("Copied survey {} into {}", source.survey_id, copy.survey_id);
    Ok(copy)
}

pub async fn delete_survey(store: &dyn SurveyStore, survey_id: &str) -> Result<(), ApiError> {
    if !store.delete_survey(survey_id).await? {
        return Err(ApiError::not_found("no such survey"));
    }
    log::info!("Deleted survey {}", survey_id);
    Ok(())
}
