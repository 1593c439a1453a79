//! In-memory [`SurveyStore`] used by the engine and route tests.
//!
//! One mutex guards the whole state, so every method is trivially atomic.
//! Global key uniqueness (users, surveys, questions, template items,
//! responses) mirrors the primary keys of the Postgres schema.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{MoveOutcome, StoreError, StoreResult, SurveyHeader, SurveySettings, SurveyStore};
use crate::{
    engine::order,
    models::{
        AnswerSet, EmailCode, NewResponse, NumAnswer, OptionAnswer, Question, Survey, SurveyResponse,
        SurveyStatus, TextAnswer, User,
    },
};

struct StoredQuestion {
    survey_id: String,
    position: i32,
    question: Question,
}

#[derive(Default)]
struct State {
    users: Vec<User>,
    email_codes: Vec<EmailCode>,
    surveys: Vec<Survey>,
    questions: Vec<StoredQuestion>,
    responses: Vec<SurveyResponse>,
    options: Vec<(String, OptionAnswer)>,
    texts: Vec<(String, TextAnswer)>,
    nums: Vec<(String, NumAnswer)>,
    writes: usize,
}

impl State {
    fn survey_mut(&mut self, survey_id: &str) -> Option<&mut Survey> {
        self.surveys.iter_mut().find(|s| s.survey_id == survey_id)
    }

    fn has_survey(&self, survey_id: &str) -> bool {
        self.surveys.iter().any(|s| s.survey_id == survey_id)
    }

    /// Rejects ids already used by questions or template items outside `replacing`.
    fn ensure_unique(&self, replacing: Option<&str>, incoming: &[Question]) -> StoreResult<()> {
        let kept = self
            .questions
            .iter()
            .filter(|stored| Some(stored.survey_id.as_str()) != replacing);
        for stored in kept {
            for question in incoming {
                if stored.question.question_id == question.question_id {
                    return Err(StoreError::Duplicate("question".to_string()));
                }
                let stored_items = stored.question.body.item_ids();
                if question
                    .body
                    .item_ids()
                    .iter()
                    .any(|id| stored_items.contains(id))
                {
                    return Err(StoreError::Duplicate("template item".to_string()));
                }
            }
        }
        Ok(())
    }

    fn drop_responses(&mut self, survey_id: &str) {
        self.responses.retain(|r| r.survey_id != survey_id);
        self.options.retain(|(s, _)| s != survey_id);
        self.texts.retain(|(s, _)| s != survey_id);
        self.nums.retain(|(s, _)| s != survey_id);
    }

    fn push_questions(&mut self, survey_id: &str, first_position: i32, questions: &[Question]) {
        for (question, position) in questions.iter().zip(first_position..) {
            self.questions.push(StoredQuestion {
                survey_id: survey_id.to_string(),
                position,
                question: question.clone(),
            });
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// `(question_id, position)` pairs of the survey, ordered by position.
    pub fn positions(&self, survey_id: &str) -> Vec<(String, i32)> {
        let state = self.state();
        let mut positions: Vec<(String, i32)> = state
            .questions
            .iter()
            .filter(|stored| stored.survey_id == survey_id)
            .map(|stored| (stored.question.question_id.clone(), stored.position))
            .collect();
        positions.sort_by_key(|(_, position)| *position);
        positions
    }

    /// Number of mutating calls that changed state.
    pub fn writes(&self) -> usize {
        self.state().writes
    }
}

#[async_trait]
impl SurveyStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut state = self.state();
        if state
            .users
            .iter()
            .any(|u| u.user_name == user.user_name || u.email == user.email)
        {
            return Err(StoreError::Duplicate("user name or email".to_string()));
        }
        state.users.push(user.clone());
        state.writes += 1;
        Ok(())
    }

    async fn find_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        Ok(self.state().users.iter().find(|u| u.user_id == user_id).cloned())
    }

    async fn find_user_by_login(&self, name_or_email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .state()
            .users
            .iter()
            .find(|u| u.user_name == name_or_email || u.email == name_or_email)
            .cloned())
    }

    async fn update_password(&self, email: &str, password_hash: &str) -> StoreResult<bool> {
        let mut state = self.state();
        let Some(user) = state.users.iter_mut().find(|u| u.email == email) else {
            return Ok(false);
        };
        user.password_hash = password_hash.to_string();
        state.writes += 1;
        Ok(true)
    }

    async fn insert_email_code(&self, code: &EmailCode) -> StoreResult<()> {
        let mut state = self.state();
        let now = chrono::Utc::now();
        state
            .email_codes
            .retain(|c| c.expires_at >= now && !(c.email == code.email && c.code == code.code));
        state.email_codes.push(code.clone());
        state.writes += 1;
        Ok(())
    }

    async fn find_email_code(&self, email: &str, code: &str) -> StoreResult<Option<EmailCode>> {
        Ok(self
            .state()
            .email_codes
            .iter()
            .find(|c| c.email == email && c.code == code)
            .cloned())
    }

    async fn delete_email_codes(&self, email: &str) -> StoreResult<()> {
        let mut state = self.state();
        state.email_codes.retain(|c| c.email != email);
        state.writes += 1;
        Ok(())
    }

    async fn insert_survey(&self, survey: &Survey, questions: &[Question]) -> StoreResult<()> {
        let mut state = self.state();
        if state.has_survey(&survey.survey_id) {
            return Err(StoreError::Duplicate("survey".to_string()));
        }
        state.ensure_unique(None, questions)?;
        state.surveys.push(survey.clone());
        state.push_questions(&survey.survey_id, 0, questions);
        state.writes += 1;
        Ok(())
    }

    async fn find_survey(&self, survey_id: &str) -> StoreResult<Option<Survey>> {
        Ok(self
            .state()
            .surveys
            .iter()
            .find(|s| s.survey_id == survey_id)
            .cloned())
    }

    async fn list_surveys(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<Survey>, i64)> {
        let state = self.state();
        let mut surveys: Vec<Survey> = state
            .surveys
            .iter()
            .filter(|s| s.user_id == user_id && s.status != SurveyStatus::Deleted)
            .cloned()
            .collect();
        surveys.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = surveys.len() as i64;
        let page = surveys
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn update_survey_settings(
        &self,
        survey_id: &str,
        settings: &SurveySettings,
    ) -> StoreResult<bool> {
        let mut state = self.state();
        let Some(survey) = state.survey_mut(survey_id) else {
            return Ok(false);
        };
        survey.title = settings.title.clone();
        survey.description = settings.description.clone();
        survey.start_time = settings.start_time;
        survey.end_time = settings.end_time;
        survey.day_start_time = settings.day_start_time;
        survey.day_end_time = settings.day_end_time;
        survey.password_strategy = settings.password_strategy;
        survey.passwords = settings.passwords.clone();
        survey.browser_limit = settings.browser_limit;
        survey.ip_limit = settings.ip_limit;
        survey.max_response_count = settings.max_response_count;
        survey.updated_at = chrono::Utc::now();
        state.writes += 1;
        Ok(true)
    }

    async fn set_survey_status(&self, survey_id: &str, status: SurveyStatus) -> StoreResult<bool> {
        let mut state = self.state();
        let Some(survey) = state.survey_mut(survey_id) else {
            return Ok(false);
        };
        survey.status = status;
        survey.updated_at = chrono::Utc::now();
        state.writes += 1;
        Ok(true)
    }

    async fn delete_survey(&self, survey_id: &str) -> StoreResult<bool> {
        let mut state = self.state();
        if !state.has_survey(survey_id) {
            return Ok(false);
        }
        state.surveys.retain(|s| s.survey_id != survey_id);
        state.questions.retain(|q| q.survey_id != survey_id);
        state.drop_responses(survey_id);
        state.writes += 1;
        Ok(true)
    }

    async fn load_questions(&self, survey_id: &str) -> StoreResult<Vec<Question>> {
        let state = self.state();
        let mut stored: Vec<&StoredQuestion> = state
            .questions
            .iter()
            .filter(|q| q.survey_id == survey_id)
            .collect();
        stored.sort_by_key(|q| q.position);
        Ok(stored.into_iter().map(|q| q.question.clone()).collect())
    }

    async fn replace_questions(
        &self,
        survey_id: &str,
        header: &SurveyHeader,
        questions: &[Question],
    ) -> StoreResult<bool> {
        let mut state = self.state();
        if !state.has_survey(survey_id) {
            return Ok(false);
        }
        state.ensure_unique(Some(survey_id), questions)?;

        state.drop_responses(survey_id);
        state.questions.retain(|q| q.survey_id != survey_id);
        if let Some(survey) = state.survey_mut(survey_id) {
            survey.title = header.title.clone();
            survey.status = header.status;
            survey.response_count = 0;
            survey.updated_at = chrono::Utc::now();
        }
        state.push_questions(survey_id, 0, questions);
        state.writes += 1;
        Ok(true)
    }

    async fn append_question(
        &self,
        survey_id: &str,
        question: &Question,
    ) -> StoreResult<Option<i32>> {
        let mut state = self.state();
        if !state.has_survey(survey_id) {
            return Ok(None);
        }
        state.ensure_unique(None, std::slice::from_ref(question))?;

        let position = order::next_position(
            state
                .questions
                .iter()
                .filter(|q| q.survey_id == survey_id)
                .map(|q| q.position),
        );
        state.push_questions(survey_id, position, std::slice::from_ref(question));
        state.writes += 1;
        Ok(Some(position))
    }

    async fn delete_question(&self, survey_id: &str, question_id: &str) -> StoreResult<bool> {
        let mut state = self.state();
        let Some(index) = state
            .questions
            .iter()
            .position(|q| q.survey_id == survey_id && q.question.question_id == question_id)
        else {
            return Ok(false);
        };

        let removed = state.questions.remove(index);
        let shift = order::closing_gap(removed.position);
        for stored in state.questions.iter_mut().filter(|q| q.survey_id == survey_id) {
            stored.position = shift.apply(stored.position);
        }
        state.writes += 1;
        Ok(true)
    }

    async fn move_question(
        &self,
        survey_id: &str,
        question_id: &str,
        new_position: i32,
    ) -> StoreResult<MoveOutcome> {
        let mut state = self.state();
        let Some(current) = state
            .questions
            .iter()
            .find(|q| q.survey_id == survey_id && q.question.question_id == question_id)
            .map(|q| q.position)
        else {
            return Ok(MoveOutcome::NotFound);
        };
        let count = state
            .questions
            .iter()
            .filter(|q| q.survey_id == survey_id)
            .count() as i32;

        let shift = match order::plan_move(current, new_position, count) {
            Ok(Some(shift)) => shift,
            Ok(None) => return Ok(MoveOutcome::Unchanged),
            Err(out_of_range) => {
                return Ok(MoveOutcome::OutOfRange {
                    count: out_of_range.count,
                })
            }
        };

        for stored in state.questions.iter_mut().filter(|q| q.survey_id == survey_id) {
            stored.position = if stored.question.question_id == question_id {
                new_position
            } else {
                shift.apply(stored.position)
            };
        }
        state.writes += 1;
        Ok(MoveOutcome::Moved)
    }

    async fn insert_response(&self, new_response: &NewResponse) -> StoreResult<bool> {
        let response = &new_response.response;
        let mut state = self.state();
        if !state.has_survey(&response.survey_id) {
            return Ok(false);
        }
        if state
            .responses
            .iter()
            .any(|r| r.response_id == response.response_id)
        {
            return Err(StoreError::Duplicate(format!(
                "response {}",
                response.response_id
            )));
        }

        let answers = &new_response.answers;
        let answered = answers
            .options
            .iter()
            .map(|a| &a.option_id)
            .chain(answers.texts.iter().map(|a| &a.text_fill_in_id))
            .chain(answers.nums.iter().map(|a| &a.num_fill_in_id));
        for item_id in answered {
            let stored = state.questions.iter().any(|q| {
                q.survey_id == response.survey_id && q.question.body.contains_item(item_id)
            });
            if !stored {
                return Err(StoreError::MissingReference("answered item".to_string()));
            }
        }

        let survey_id = response.survey_id.clone();
        state.responses.push(response.clone());
        state.options.extend(
            answers
                .options
                .iter()
                .map(|a| (survey_id.clone(), a.clone())),
        );
        state
            .texts
            .extend(answers.texts.iter().map(|a| (survey_id.clone(), a.clone())));
        state
            .nums
            .extend(answers.nums.iter().map(|a| (survey_id.clone(), a.clone())));
        if let Some(survey) = state.survey_mut(&survey_id) {
            survey.response_count += 1;
        }
        state.writes += 1;
        Ok(true)
    }

    async fn list_responses(&self, survey_id: &str) -> StoreResult<Vec<SurveyResponse>> {
        Ok(self
            .state()
            .responses
            .iter()
            .filter(|r| r.survey_id == survey_id)
            .cloned()
            .collect())
    }

    async fn list_answers(&self, survey_id: &str) -> StoreResult<AnswerSet> {
        let state = self.state();
        Ok(AnswerSet {
            options: state
                .options
                .iter()
                .filter(|(s, _)| s == survey_id)
                .map(|(_, a)| a.clone())
                .collect(),
            texts: state
                .texts
                .iter()
                .filter(|(s, _)| s == survey_id)
                .map(|(_, a)| a.clone())
                .collect(),
            nums: state
                .nums
                .iter()
                .filter(|(s, _)| s == survey_id)
                .map(|(_, a)| a.clone())
                .collect(),
        })
    }

    async fn count_selected(&self, survey_id: &str, option_id: &str) -> StoreResult<i64> {
        Ok(self
            .state()
            .options
            .iter()
            .filter(|(s, a)| s == survey_id && a.option_id == option_id && a.is_selected)
            .count() as i64)
    }

    async fn text_answers(
        &self,
        survey_id: &str,
        text_fill_in_id: &str,
    ) -> StoreResult<Vec<String>> {
        Ok(self
            .state()
            .texts
            .iter()
            .filter(|(s, a)| s == survey_id && a.text_fill_in_id == text_fill_in_id)
            .map(|(_, a)| a.text_content.clone())
            .collect())
    }

    async fn num_answers(&self, survey_id: &str, num_fill_in_id: &str) -> StoreResult<Vec<f64>> {
        Ok(self
            .state()
            .nums
            .iter()
            .filter(|(s, a)| s == survey_id && a.num_fill_in_id == num_fill_in_id)
            .map(|(_, a)| a.num_content)
            .collect())
    }
}
