use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{new_id, require_survey};
use crate::{
    error::ApiError,
    models::{
        AnswerKind, NumFillIn, Question, QuestionBody, QuestionOption, QuestionType, SurveyStatus,
        TextFillIn,
    },
    store::{MoveOutcome, SurveyHeader, SurveyStore},
};

/// A question as the editor and the respondent view exchange it.
///
/// Only the collection matching `question_type` may be non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionModel {
    #[serde(default)]
    pub question_id: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub label: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub least_choice: i32,
    #[serde(default)]
    pub max_choice: i32,
    #[serde(default)]
    pub options: Vec<QuestionOption>,
    #[serde(default)]
    pub text_fill_ins: Vec<TextFillIn>,
    #[serde(default)]
    pub num_fill_ins: Vec<NumFillIn>,
}

impl From<&Question> for QuestionModel {
    fn from(question: &Question) -> Self {
        let mut model = Self {
            question_id: question.question_id.clone(),
            question_type: question.question_type(),
            label: question.label.clone(),
            title: question.title.clone(),
            description: question.description.clone(),
            least_choice: question.least_choice,
            max_choice: question.max_choice,
            options: Vec::new(),
            text_fill_ins: Vec::new(),
            num_fill_ins: Vec::new(),
        };
        match &question.body {
            QuestionBody::Choice(options) => model.options = options.clone(),
            QuestionBody::TextSlots(slots) => model.text_fill_ins = slots.clone(),
            QuestionBody::NumSlots(slots) => model.num_fill_ins = slots.clone(),
        }
        model
    }
}

fn or_new_id(id: String) -> String {
    if id.trim().is_empty() {
        new_id()
    } else {
        id
    }
}

impl QuestionModel {
    /// Validates the model and assigns ids to the question and items that lack one.
    pub fn into_question(self) -> Result<Question, ApiError> {
        let question_type = self.question_type;
        let kind = question_type.kind();
        let stray = match kind {
            AnswerKind::Choice => !self.text_fill_ins.is_empty() || !self.num_fill_ins.is_empty(),
            AnswerKind::Text => !self.options.is_empty() || !self.num_fill_ins.is_empty(),
            AnswerKind::Num => !self.options.is_empty() || !self.text_fill_ins.is_empty(),
        };
        if stray {
            return Err(ApiError::invalid(format!(
                "a {question_type} question only carries its own kind of items"
            )));
        }
        if self.title.trim().is_empty() {
            return Err(ApiError::invalid("question title is empty"));
        }
        if self.least_choice < 0
            || self.max_choice < 0
            || (self.max_choice > 0 && self.least_choice > self.max_choice)
        {
            return Err(ApiError::invalid(format!(
                "invalid choice bounds {}..{}",
                self.least_choice, self.max_choice
            )));
        }

        let body = match kind {
            AnswerKind::Choice => QuestionBody::Choice(
                self.options
                    .into_iter()
                    .map(|option| QuestionOption {
                        option_id: or_new_id(option.option_id),
                        content: option.content,
                    })
                    .collect(),
            ),
            AnswerKind::Text => QuestionBody::TextSlots(
                self.text_fill_ins
                    .into_iter()
                    .map(|slot| TextFillIn {
                        text_fill_in_id: or_new_id(slot.text_fill_in_id),
                    })
                    .collect(),
            ),
            AnswerKind::Num => {
                let slots = self
                    .num_fill_ins
                    .into_iter()
                    .map(|slot| match (slot.min_value, slot.max_value) {
                        (Some(min), Some(max)) if min > max => Err(ApiError::invalid(format!(
                            "number range {min}..{max} is empty"
                        ))),
                        _ => Ok(NumFillIn {
                            num_fill_in_id: or_new_id(slot.num_fill_in_id),
                            ..slot
                        }),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                QuestionBody::NumSlots(slots)
            }
        };

        Ok(Question {
            question_id: or_new_id(self.question_id),
            arity: question_type.arity(),
            label: self.label,
            title: self.title,
            description: self.description,
            least_choice: self.least_choice,
            max_choice: self.max_choice,
            body,
        })
    }
}

/// The survey header plus its ordered questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSetModel {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default = "opening_by_default")]
    pub is_opening: bool,
    #[serde(default)]
    pub questions: Vec<QuestionModel>,
}

fn opening_by_default() -> bool {
    true
}

fn ensure_distinct_ids(questions: &[Question]) -> Result<(), ApiError> {
    let mut seen = HashSet::new();
    for question in questions {
        let ids = std::iter::once(question.question_id.as_str()).chain(question.body.item_ids());
        for id in ids {
            if !seen.insert(id) {
                return Err(ApiError::invalid(format!("id {id} is used more than once")));
            }
        }
    }
    Ok(())
}

pub async fn question_set(
    store: &dyn SurveyStore,
    survey_id: &str,
) -> Result<QuestionSetModel, ApiError> {
    let survey = require_survey(store, survey_id).await?;
    let questions = store.load_questions(survey_id).await?;
    Ok(QuestionSetModel {
        id: survey.survey_id,
        title: survey.title,
        is_opening: survey.status == SurveyStatus::Ongoing,
        questions: questions.iter().map(QuestionModel::from).collect(),
    })
}

/// Replaces every question of the survey and discards all of its responses.
///
/// Returns the stored question ids in order.
pub async fn replace_question_set(
    store: &dyn SurveyStore,
    survey_id: &str,
    model: QuestionSetModel,
) -> Result<Vec<String>, ApiError> {
    require_survey(store, survey_id).await?;
    if !model.id.is_empty() && model.id != survey_id {
        return Err(ApiError::invalid("survey id does not match the request path"));
    }
    if model.title.trim().is_empty() {
        return Err(ApiError::invalid("survey title is empty"));
    }

    let questions = model
        .questions
        .into_iter()
        .map(QuestionModel::into_question)
        .collect::<Result<Vec<_>, _>>()?;
    ensure_distinct_ids(&questions)?;

    let header = SurveyHeader {
        title: model.title,
        status: if model.is_opening {
            SurveyStatus::Ongoing
        } else {
            SurveyStatus::Suspended
        },
    };
    if !store.replace_questions(survey_id, &header, &questions).await? {
        return Err(ApiError::not_found("no such survey"));
    }
    log::info!(
        "Replaced question set of survey {} with {} questions",
        survey_id,
        questions.len()
    );
    Ok(questions.into_iter().map(|q| q.question_id).collect())
}

/// Appends a question. Returns the stored question and its position.
pub async fn insert_question(
    store: &dyn SurveyStore,
    survey_id: &str,
    model: QuestionModel,
) -> Result<(QuestionModel, i32), ApiError> {
    let question = model.into_question()?;
    ensure_distinct_ids(std::slice::from_ref(&question))?;
    let position = store
        .append_question(survey_id, &question)
        .await?
        .ok_or_else(|| ApiError::not_found("no such survey"))?;
    log::debug!(
        "Inserted question {} into survey {} at {}",
        question.question_id,
        survey_id,
        position
    );
    Ok((QuestionModel::from(&question), position))
}

pub async fn delete_question(
    store: &dyn SurveyStore,
    survey_id: &str,
    question_id: &str,
) -> Result<(), ApiError> {
    if !store.delete_question(survey_id, question_id).await? {
        return Err(ApiError::not_found("no such question"));
    }
    Ok(())
}

pub async fn move_question(
    store: &dyn SurveyStore,
    survey_id: &str,
    question_id: &str,
    new_index: i32,
) -> Result<(), ApiError> {
    match store.move_question(survey_id, question_id, new_index).await? {
        MoveOutcome::NotFound => Err(ApiError::not_found("no such question")),
        MoveOutcome::OutOfRange { count } => Err(ApiError::invalid(format!(
            "index {new_index} is outside of 0..{count}"
        ))),
        MoveOutcome::Unchanged | MoveOutcome::Moved => Ok(()),
    }
}
