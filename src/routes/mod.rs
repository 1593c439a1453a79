use actix_web::{
    error::JsonPayloadError,
    web::{self, ServiceConfig},
    HttpRequest, HttpResponse, Scope,
};

use crate::{auth::AuthenticatedUser, engine, error::ApiError, models::Survey, AppData};

pub mod account;
pub mod question;
pub mod respondent;
pub mod response;
pub mod survey;

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiIndexResponseData {
    account: String,
    surveys: String,
    respondent: String,
}

async fn get_api_index(app_data: web::Data<AppData>) -> HttpResponse {
    let base = app_data.public_url.trim_end_matches('/');
    HttpResponse::Ok().json(ApiIndexResponseData {
        account: format!("{base}/account"),
        surveys: format!("{base}/surveys"),
        respondent: format!("{base}/respondent"),
    })
}

/// Malformed JSON bodies answer with the usual `{"message": ...}` body.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
        ApiError::invalid(err.to_string()).into()
    })
}

pub fn configure(config: &mut ServiceConfig) {
    config
        .route("/", web::get().to(get_api_index))
        .service(Scope::new("/account").configure(account::configure_routes))
        .service(
            Scope::new("/surveys")
                .configure(survey::configure_routes)
                .configure(question::configure_routes)
                .configure(response::configure_routes),
        )
        .service(Scope::new("/respondent").configure(respondent::configure_routes));
}

/// Loads the survey behind `survey_id` if the caller owns it.
async fn owned_survey(
    app_data: &AppData,
    user: &AuthenticatedUser,
    survey_id: &str,
) -> Result<Survey, ApiError> {
    engine::survey::owned_survey(app_data.store.as_ref(), survey_id, &user.user_id).await
}
