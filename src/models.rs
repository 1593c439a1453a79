use std::{fmt, str::FromStr};

use serde::{ser::SerializeStruct, Deserialize, Serialize, Serializer};
use sqlx::types::ipnetwork::IpNetwork;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "survey_status", rename_all = "snake_case")]
#[serde(rename_all = "camelCase")]
pub enum SurveyStatus {
    Ongoing,
    Suspended,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "question_type", rename_all = "snake_case")]
#[serde(rename_all = "camelCase")]
pub enum QuestionType {
    SingleChoice,
    MultiChoice,
    SingleTextFillIn,
    MultiTextFillIn,
    SingleNumFillIn,
    MultiNumFillIn,
}

/// Whether a question takes one answer item or several.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Single,
    Multi,
}

/// Which template collection, and which answer table, a question uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
    Choice,
    Text,
    Num,
}

impl QuestionType {
    pub fn from_parts(arity: Arity, kind: AnswerKind) -> Self {
        match (arity, kind) {
            (Arity::Single, AnswerKind::Choice) => Self::SingleChoice,
            (Arity::Multi, AnswerKind::Choice) => Self::MultiChoice,
            (Arity::Single, AnswerKind::Text) => Self::SingleTextFillIn,
            (Arity::Multi, AnswerKind::Text) => Self::MultiTextFillIn,
            (Arity::Single, AnswerKind::Num) => Self::SingleNumFillIn,
            (Arity::Multi, AnswerKind::Num) => Self::MultiNumFillIn,
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            Self::SingleChoice | Self::SingleTextFillIn | Self::SingleNumFillIn => Arity::Single,
            Self::MultiChoice | Self::MultiTextFillIn | Self::MultiNumFillIn => Arity::Multi,
        }
    }

    pub fn kind(self) -> AnswerKind {
        match self {
            Self::SingleChoice | Self::MultiChoice => AnswerKind::Choice,
            Self::SingleTextFillIn | Self::MultiTextFillIn => AnswerKind::Text,
            Self::SingleNumFillIn | Self::MultiNumFillIn => AnswerKind::Num,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SingleChoice => "singleChoice",
            Self::MultiChoice => "multiChoice",
            Self::SingleTextFillIn => "singleTextFillIn",
            Self::MultiTextFillIn => "multiTextFillIn",
            Self::SingleNumFillIn => "singleNumFillIn",
            Self::MultiNumFillIn => "multiNumFillIn",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported question type: {0}")]
pub struct UnknownQuestionType(pub String);

impl FromStr for QuestionType {
    type Err = UnknownQuestionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::SingleChoice,
            Self::MultiChoice,
            Self::SingleTextFillIn,
            Self::MultiTextFillIn,
            Self::SingleNumFillIn,
            Self::MultiNumFillIn,
        ]
        .into_iter()
        .find(|question_type| question_type.as_str() == s)
        .ok_or_else(|| UnknownQuestionType(s.to_string()))
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub user_id: String,
    pub user_name: String,
    pub email: String,
    pub password_hash: String,
    pub registered_at: chrono::DateTime<chrono::Utc>,
}

/// A one-time code mailed to an address to prove the sender owns it.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct EmailCode {
    pub email: String,
    pub code: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    pub survey_id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub status: SurveyStatus,
    pub response_count: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
    pub day_start_time: Option<chrono::NaiveTime>,
    pub day_end_time: Option<chrono::NaiveTime>,
    pub password_strategy: i32,
    pub passwords: Vec<String>,
    pub browser_limit: bool,
    pub ip_limit: bool,
    pub max_response_count: i32,
}

// a survey is a user's ordered list of questions
// every question owns exactly one kind of template item:
//      options for choice questions,
//      text slots for text fill-ins,
//      number slots (with optional range and precision) for number fill-ins
// answers reference the template item they fill in

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOption {
    #[serde(default)]
    pub option_id: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextFillIn {
    #[serde(default)]
    pub text_fill_in_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumFillIn {
    #[serde(default)]
    pub num_fill_in_id: String,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub precision: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuestionBody {
    Choice(Vec<QuestionOption>),
    TextSlots(Vec<TextFillIn>),
    NumSlots(Vec<NumFillIn>),
}

impl QuestionBody {
    pub fn kind(&self) -> AnswerKind {
        match self {
            Self::Choice(_) => AnswerKind::Choice,
            Self::TextSlots(_) => AnswerKind::Text,
            Self::NumSlots(_) => AnswerKind::Num,
        }
    }

    pub fn item_ids(&self) -> Vec<&str> {
        match self {
            Self::Choice(options) => options.iter().map(|o| o.option_id.as_str()).collect(),
            Self::TextSlots(slots) => slots.iter().map(|s| s.text_fill_in_id.as_str()).collect(),
            Self::NumSlots(slots) => slots.iter().map(|s| s.num_fill_in_id.as_str()).collect(),
        }
    }

    pub fn contains_item(&self, item_id: &str) -> bool {
        self.item_ids().contains(&item_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub question_id: String,
    pub arity: Arity,
    pub label: String,
    pub title: String,
    pub description: String,
    pub least_choice: i32,
    pub max_choice: i32,
    pub body: QuestionBody,
}

impl Question {
    pub fn question_type(&self) -> QuestionType {
        QuestionType::from_parts(self.arity, self.body.kind())
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResponse {
    pub response_id: String,
    pub survey_id: String,
    pub source: String,
    pub ip: Option<IpNetwork>,
    pub is_starred: bool,
    pub is_invalid: bool,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct OptionAnswer {
    pub response_id: String,
    pub option_id: String,
    pub question_id: String,
    pub is_selected: bool,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct TextAnswer {
    pub response_id: String,
    pub text_fill_in_id: String,
    pub question_id: String,
    pub text_content: String,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct NumAnswer {
    pub response_id: String,
    pub num_fill_in_id: String,
    pub question_id: String,
    pub num_content: f64,
}

/// Every answer row stored for one survey.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerSet {
    pub options: Vec<OptionAnswer>,
    pub texts: Vec<TextAnswer>,
    pub nums: Vec<NumAnswer>,
}

/// One accepted submission, ready to be written in a single transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewResponse {
    pub response: SurveyResponse,
    pub answers: AnswerSet,
}

#[derive(Debug)]
pub(crate) struct Message<'a>(pub &'a str);

impl<'a> Serialize for Message<'a> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut ts = serializer.serialize_struct("message", 1)?;
        ts.serialize_field("message", self.0)?;
        ts.end()
    }
}
