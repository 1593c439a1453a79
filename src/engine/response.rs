use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use sqlx::types::ipnetwork::IpNetwork;

use super::{new_id, require_survey};
use crate::{
    error::ApiError,
    models::{
        AnswerKind, AnswerSet, NewResponse, NumAnswer, OptionAnswer, Question, QuestionBody,
        QuestionType, Survey, SurveyResponse, SurveyStatus, TextAnswer,
    },
    store::{StoreError, SurveyStore},
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseModel {
    #[serde(default)]
    pub response_id: String,
    #[serde(default)]
    pub survey_id: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub question_responses: Vec<QuestionResponseModel>,
}

/// Answers to one question. `question_type` stays a plain string so that
/// unknown types can be skipped instead of failing the whole submission.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponseModel {
    pub question_id: String,
    pub question_type: String,
    #[serde(default)]
    pub options: Vec<OptionChoice>,
    #[serde(default)]
    pub text_fill_ins: Vec<TextEntry>,
    #[serde(default)]
    pub num_fill_ins: Vec<NumEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionChoice {
    pub option_id: String,
    #[serde(default)]
    pub is_selected: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEntry {
    pub text_fill_in_id: String,
    #[serde(default)]
    pub text_content: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumEntry {
    pub num_fill_in_id: String,
    pub num_content: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDetail {
    #[serde(flatten)]
    pub response: SurveyResponse,
    pub questions: Vec<QuestionAnswers>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnswers {
    pub question_id: String,
    pub question_type: QuestionType,
    pub title: String,
    pub description: String,
    pub options: Vec<OptionAnswerDetail>,
    pub text_fill_ins: Vec<TextAnswerDetail>,
    pub num_fill_ins: Vec<NumAnswerDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionAnswerDetail {
    pub option_id: String,
    pub option_content: String,
    pub is_selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAnswerDetail {
    pub text_fill_in_id: String,
    pub text_content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NumAnswerDetail {
    pub num_fill_in_id: String,
    pub num_content: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionCount {
    pub option_id: String,
    pub content: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionCounts {
    pub question_id: String,
    pub title: String,
    pub options: Vec<OptionCount>,
}

/// Turns the submitted answers into answer rows, checking every referenced
/// question and template item against the stored survey.
fn collect_answers(
    response_id: &str,
    questions: &[Question],
    submitted: Vec<QuestionResponseModel>,
) -> Result<AnswerSet, ApiError> {
    let mut answers = AnswerSet::default();
    let mut seen: HashSet<String> = HashSet::new();

    for entry in submitted {
        let question_type = match entry.question_type.parse::<QuestionType>() {
            Ok(question_type) => question_type,
            Err(err) => {
                log::warn!("Skipping answers to question {}: {}", entry.question_id, err);
                continue;
            }
        };
        let question = questions
            .iter()
            .find(|q| q.question_id == entry.question_id)
            .ok_or_else(|| {
                ApiError::invalid(format!(
                    "question {} is not part of this survey",
                    entry.question_id
                ))
            })?;
        if question_type.kind() != question.body.kind() {
            return Err(ApiError::invalid(format!(
                "question {} is a {} question, not {}",
                question.question_id,
                question.question_type(),
                question_type
            )));
        }

        let mut claim = |item_id: &str| -> Result<(), ApiError> {
            if !question.body.contains_item(item_id) {
                return Err(ApiError::invalid(format!(
                    "{item_id} does not belong to question {}",
                    question.question_id
                )));
            }
            if !seen.insert(item_id.to_string()) {
                return Err(ApiError::invalid(format!(
                    "{item_id} is answered more than once"
                )));
            }
            Ok(())
        };

        match question_type.kind() {
            AnswerKind::Choice => {
                for choice in entry.options {
                    claim(&choice.option_id)?;
                    answers.options.push(OptionAnswer {
                        response_id: response_id.to_string(),
                        option_id: choice.option_id,
                        question_id: question.question_id.clone(),
                        is_selected: choice.is_selected,
                    });
                }
            }
            AnswerKind::Text => {
                for text in entry.text_fill_ins {
                    claim(&text.text_fill_in_id)?;
                    answers.texts.push(TextAnswer {
                        response_id: response_id.to_string(),
                        text_fill_in_id: text.text_fill_in_id,
                        question_id: question.question_id.clone(),
                        text_content: text.text_content,
                    });
                }
            }
            AnswerKind::Num => {
                for num in entry.num_fill_ins {
                    claim(&num.num_fill_in_id)?;
                    if !num.num_content.is_finite() {
                        return Err(ApiError::invalid(format!(
                            "{} is not a finite number",
                            num.num_fill_in_id
                        )));
                    }
                    answers.nums.push(NumAnswer {
                        response_id: response_id.to_string(),
                        num_fill_in_id: num.num_fill_in_id,
                        question_id: question.question_id.clone(),
                        num_content: num.num_content,
                    });
                }
            }
        }
    }
    Ok(answers)
}

/// Loads the survey for a respondent. Suspended and deleted surveys are closed.
pub async fn accepting_survey(
    store: &dyn SurveyStore,
    survey_id: &str,
) -> Result<Survey, ApiError> {
    let survey = require_survey(store, survey_id).await?;
    if survey.status != SurveyStatus::Ongoing {
        return Err(ApiError::invalid("survey is not accepting responses"));
    }
    Ok(survey)
}

/// Stores one complete submission. Returns the response id.
pub async fn submit_response(
    store: &dyn SurveyStore,
    survey_id: &str,
    model: ResponseModel,
    ip: Option<IpNetwork>,
) -> Result<String, ApiError> {
    accepting_survey(store, survey_id).await?;
    let questions = store.load_questions(survey_id).await?;

    let response_id = if model.response_id.trim().is_empty() {
        new_id()
    } else {
        model.response_id
    };
    let answers = collect_answers(&response_id, &questions, model.question_responses)?;
    let new_response = NewResponse {
        response: SurveyResponse {
            response_id: response_id.clone(),
            survey_id: survey_id.to_string(),
            source: model.source,
            ip,
            is_starred: false,
            is_invalid: false,
            submitted_at: chrono::Utc::now(),
        },
        answers,
    };

    match store.insert_response(&new_response).await {
        Ok(true) => {}
        Ok(false) => return Err(ApiError::not_found("no such survey")),
        Err(StoreError::Duplicate(_)) => {
            return Err(ApiError::AlreadyExists(format!(
                "response {response_id} was already submitted"
            )))
        }
        Err(err) => return Err(err.into()),
    }
    log::info!("Stored response {} for survey {}", response_id, survey_id);
    Ok(response_id)
}

/// Number of stored answers that selected the option. Unknown options count 0.
pub async fn option_selection_count(
    store: &dyn SurveyStore,
    survey_id: &str,
    option_id: &str,
) -> Result<i64, ApiError> {
    require_survey(store, survey_id).await?;
    Ok(store.count_selected(survey_id, option_id).await?)
}

async fn require_item(
    store: &dyn SurveyStore,
    survey_id: &str,
    kind: AnswerKind,
    item_id: &str,
) -> Result<(), ApiError> {
    require_survey(store, survey_id).await?;
    let found = store
        .load_questions(survey_id)
        .await?
        .iter()
        .any(|q| q.body.kind() == kind && q.body.contains_item(item_id));
    if found {
        Ok(())
    } else {
        Err(ApiError::not_found("no such fill-in"))
    }
}

/// Text answers to the slot in submission order.
pub async fn text_answers(
    store: &dyn SurveyStore,
    survey_id: &str,
    text_fill_in_id: &str,
) -> Result<Vec<String>, ApiError> {
    require_item(store, survey_id, AnswerKind::Text, text_fill_in_id).await?;
    Ok(store.text_answers(survey_id, text_fill_in_id).await?)
}

/// Numeric answers to the slot in submission order.
pub async fn numeric_answers(
    store: &dyn SurveyStore,
    survey_id: &str,
    num_fill_in_id: &str,
) -> Result<Vec<f64>, ApiError> {
    require_item(store, survey_id, AnswerKind::Num, num_fill_in_id).await?;
    Ok(store.num_answers(survey_id, num_fill_in_id).await?)
}

fn assemble_details(
    responses: Vec<SurveyResponse>,
    questions: &[Question],
    answers: &AnswerSet,
) -> Vec<ResponseDetail> {
    let options: HashMap<(&str, &str), &OptionAnswer> = answers
        .options
        .iter()
        .map(|a| ((a.response_id.as_str(), a.option_id.as_str()), a))
        .collect();
    let texts: HashMap<(&str, &str), &TextAnswer> = answers
        .texts
        .iter()
        .map(|a| ((a.response_id.as_str(), a.text_fill_in_id.as_str()), a))
        .collect();
    let nums: HashMap<(&str, &str), &NumAnswer> = answers
        .nums
        .iter()
        .map(|a| ((a.response_id.as_str(), a.num_fill_in_id.as_str()), a))
        .collect();

    responses
        .into_iter()
        .map(|response| {
            let rid = response.response_id.as_str();
            let questions = questions
                .iter()
                .map(|question| {
                    let mut detail = QuestionAnswers {
                        question_id: question.question_id.clone(),
                        question_type: question.question_type(),
                        title: question.title.clone(),
                        description: question.description.clone(),
                        options: Vec::new(),
                        text_fill_ins: Vec::new(),
                        num_fill_ins: Vec::new(),
                    };
                    match &question.body {
                        QuestionBody::Choice(template) => {
                            detail.options = template
                                .iter()
                                .filter_map(|option| {
                                    options.get(&(rid, option.option_id.as_str())).map(|a| {
                                        OptionAnswerDetail {
                                            option_id: option.option_id.clone(),
                                            option_content: option.content.clone(),
                                            is_selected: a.is_selected,
                                        }
                                    })
                                })
                                .collect()
                        }
                        QuestionBody::TextSlots(template) => {
                            detail.text_fill_ins = template
                                .iter()
                                .filter_map(|slot| {
                                    texts.get(&(rid, slot.text_fill_in_id.as_str())).map(|a| {
                                        TextAnswerDetail {
                                            text_fill_in_id: slot.text_fill_in_id.clone(),
                                            text_content: a.text_content.clone(),
                                        }
                                    })
                                })
                                .collect()
                        }
                        QuestionBody::NumSlots(template) => {
                            detail.num_fill_ins = template
                                .iter()
                                .filter_map(|slot| {
                                    nums.get(&(rid, slot.num_fill_in_id.as_str())).map(|a| {
                                        NumAnswerDetail {
                                            num_fill_in_id: slot.num_fill_in_id.clone(),
                                            num_content: a.num_content,
                                        }
                                    })
                                })
                                .collect()
                        }
                    }
                    detail
                })
                .collect();
            ResponseDetail {
                response,
                questions,
            }
        })
        .collect()
}

/// Every response of the survey with its answers, laid out along the
/// current question order.
pub async fn survey_responses(
    store: &dyn SurveyStore,
    survey_id: &str,
) -> Result<Vec<ResponseDetail>, ApiError> {
    require_survey(store, survey_id).await?;
    let questions = store.load_questions(survey_id).await?;
    let responses = store.list_responses(survey_id).await?;
    let answers = store.list_answers(survey_id).await?;
    Ok(assemble_details(responses, &questions, &answers))
}

/// Selected counts for every option of a choice question, in template order.
pub async fn option_counts(
    store: &dyn SurveyStore,
    survey_id: &str,
    question_id: &str,
) -> Result<QuestionCounts, ApiError> {
    require_survey(store, survey_id).await?;
    let question = store
        .load_questions(survey_id)
        .await?
        .into_iter()
        .find(|q| q.question_id == question_id)
        .ok_or_else(|| ApiError::not_found("no such question"))?;
    let QuestionBody::Choice(template) = question.body else {
        return Err(ApiError::invalid(format!(
            "question {question_id} has no options to count"
        )));
    };

    let mut options = Vec::with_capacity(template.len());
    for option in template {
        let count = store.count_selected(survey_id, &option.option_id).await?;
        options.push(OptionCount {
            option_id: option.option_id,
            content: option.content,
            count,
        });
    }
    Ok(QuestionCounts {
        question_id: question.question_id,
        title: question.title,
        options,
    })
}
