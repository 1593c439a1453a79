//! Business rules. Every operation takes the store as `&dyn SurveyStore` and
//! returns an [`ApiError`] classification on failure.

use crate::{error::ApiError, models::Survey, store::SurveyStore};

pub mod account;
pub mod edit;
pub mod order;
pub mod response;
pub mod survey;

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) async fn require_survey(
    store: &dyn SurveyStore,
    survey_id: &str,
) -> Result<Survey, ApiError> {
    store
        .find_survey(survey_id)
        .await?
        .ok_or_else(|| ApiError::not_found("no such survey"))
}
