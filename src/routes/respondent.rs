//! Public routes used by people filling in a survey. No session required.

use actix_web::{
    web::{self, ServiceConfig},
    HttpRequest, HttpResponse,
};
use sqlx::types::ipnetwork::IpNetwork;

use crate::{
    engine::{
        edit,
        response::{self, ResponseModel},
    },
    error::ApiError,
    AppData,
};

async fn get_questions(
    app_data: web::Data<AppData>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    response::accepting_survey(app_data.store.as_ref(), &path).await?;
    let set = edit::question_set(app_data.store.as_ref(), &path).await?;
    Ok(HttpResponse::Ok().json(set))
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponseData {
    response_id: String,
}

async fn post_response(
    app_data: web::Data<AppData>,
    path: web::Path<String>,
    model: web::Json<ResponseModel>,
    request: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let survey_id = path.into_inner();
    let model = model.into_inner();
    if !model.survey_id.is_empty() && model.survey_id != survey_id {
        return Err(ApiError::invalid(
            "survey id does not match the request path",
        ));
    }
    let ip_address: Option<IpNetwork> = request.peer_addr().map(|addr| addr.ip().into());
    if ip_address.is_none() {
        log::warn!("peer_addr is None");
    }

    let response_id =
        response::submit_response(app_data.store.as_ref(), &survey_id, model, ip_address).await?;
    Ok(HttpResponse::Ok().json(SubmitResponseData { response_id }))
}

pub fn configure_routes(config: &mut ServiceConfig) {
    config.route("/{survey_id}/questions", web::get().to(get_questions));
    config.route("/{survey_id}/responses", web::post().to(post_response));
}
