//! Fixtures shared by the engine and route tests.

use std::sync::{Arc, Mutex};

use actix_web::{cookie::Cookie, web};
use async_trait::async_trait;

use crate::{
    auth::{TokenKeys, TOKEN_COOKIE},
    engine::new_id,
    mail::Mailer,
    models::{
        AnswerSet, Arity, NewResponse, NumFillIn, Question, QuestionBody, QuestionOption, Survey,
        SurveyResponse, SurveyStatus, TextFillIn,
    },
    store::{memory::MemoryStore, SurveyStore},
    AppData,
};

pub(crate) fn choice_question(question_id: &str, options: &[(String, String)]) -> Question {
    Question {
        question_id: question_id.to_string(),
        arity: Arity::Single,
        label: String::new(),
        title: format!("Question {question_id}"),
        description: String::new(),
        least_choice: 0,
        max_choice: 0,
        body: QuestionBody::Choice(
            options
                .iter()
                .map(|(option_id, content)| QuestionOption {
                    option_id: option_id.clone(),
                    content: content.clone(),
                })
                .collect(),
        ),
    }
}

pub(crate) fn text_question(question_id: &str, slots: &[&str]) -> Question {
    Question {
        arity: Arity::Multi,
        body: QuestionBody::TextSlots(
            slots
                .iter()
                .map(|id| TextFillIn {
                    text_fill_in_id: id.to_string(),
                })
                .collect(),
        ),
        ..choice_question(question_id, &[])
    }
}

pub(crate) fn num_question(question_id: &str, slots: &[&str]) -> Question {
    Question {
        arity: Arity::Multi,
        body: QuestionBody::NumSlots(
            slots
                .iter()
                .map(|id| NumFillIn {
                    num_fill_in_id: id.to_string(),
                    min_value: None,
                    max_value: None,
                    precision: None,
                })
                .collect(),
        ),
        ..choice_question(question_id, &[])
    }
}

/// An ongoing survey row owned by `user_id`, not yet stored.
pub(crate) fn survey_row(user_id: &str) -> Survey {
    let now = chrono::Utc::now();
    Survey {
        survey_id: new_id(),
        user_id: user_id.to_string(),
        title: "Coffee Poll".to_string(),
        description: String::new(),
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
    }
}

pub(crate) async fn seed_survey(
    store: &MemoryStore,
    user_id: &str,
    questions: Vec<Question>,
) -> Survey {
    let survey = survey_row(user_id);
    store.insert_survey(&survey, &questions).await.unwrap();
    survey
}

/// A response without any answers.
pub(crate) fn simple_response(survey_id: &str, response_id: &str) -> NewResponse {
    NewResponse {
        response: SurveyResponse {
            response_id: response_id.to_string(),
            survey_id: survey_id.to_string(),
            source: String::new(),
            ip: None,
            is_starred: false,
            is_invalid: false,
            submitted_at: chrono::Utc::now(),
        },
        answers: AnswerSet::default(),
    }
}

/// Keeps every code it is asked to send.
#[derive(Default)]
pub(crate) struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    pub(crate) fn last_code(&self, to: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(recipient, _)| recipient == to)
            .map(|(_, code)| code.clone())
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_code(&self, to: &str, code: &str) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), code.to_string()));
        Ok(())
    }
}

pub(crate) fn app_data(store: Arc<MemoryStore>) -> web::Data<AppData> {
    app_data_with_mailer(store, Arc::new(RecordingMailer::default()))
}

pub(crate) fn app_data_with_mailer(
    store: Arc<MemoryStore>,
    mailer: Arc<RecordingMailer>,
) -> web::Data<AppData> {
    web::Data::new(AppData {
        store,
        mailer,
        tokens: TokenKeys::new("test secret", chrono::Duration::hours(1)),
        public_url: "http://127.0.0.1:1337".to_string(),
        secure_cookies: false,
    })
}

pub(crate) fn session(app_data: &AppData, user_id: &str) -> Cookie<'static> {
    let token = app_data.tokens.issue(user_id).unwrap();
    Cookie::new(TOKEN_COOKIE, token)
}
