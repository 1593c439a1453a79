use actix_web::{
    web::{self, ServiceConfig},
    HttpResponse,
};

use super::owned_survey;
use crate::{
    auth::AuthenticatedUser,
    engine::survey::{self, NewSurvey},
    error::ApiError,
    models::SurveyStatus,
    store::SurveySettings,
    AppData,
};

#[derive(serde::Deserialize)]
struct ListQuery {
    count: Option<i64>,
    skip: Option<i64>,
}

async fn get_surveys(
    app_data: web::Data<AppData>,
    user: AuthenticatedUser,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = survey::list_surveys(
        app_data.store.as_ref(),
        &user.user_id,
        query.count,
        query.skip,
    )
    .await?;
    Ok(HttpResponse::Ok().json(page))
}

async fn post_survey(
    app_data: web::Data<AppData>,
    user: AuthenticatedUser,
    new_survey: web::Json<NewSurvey>,
) -> Result<HttpResponse, ApiError> {
    let created =
        survey::create_survey(app_data.store.as_ref(), &user.user_id, new_survey.into_inner())
            .await?;
    Ok(HttpResponse::Created().json(created))
}

async fn get_survey(
    app_data: web::Data<AppData>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let found = owned_survey(&app_data, &user, &path).await?;
    let detail = survey::survey_detail(app_data.store.as_ref(), found).await?;
    Ok(HttpResponse::Ok().json(detail))
}

async fn put_survey(
    app_data: web::Data<AppData>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    settings: web::Json<SurveySettings>,
) -> Result<HttpResponse, ApiError> {
    let survey_id = path.into_inner();
    owned_survey(&app_data, &user, &survey_id).await?;
    let updated =
        survey::update_settings(app_data.store.as_ref(), &survey_id, settings.into_inner())
            .await?;
    Ok(HttpResponse::Ok().json(updated))
}

#[derive(serde::Deserialize)]
struct StatusRequestData {
    status: SurveyStatus,
}

async fn put_status(
    app_data: web::Data<AppData>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    request: web::Json<StatusRequestData>,
) -> Result<HttpResponse, ApiError> {
    let survey_id = path.into_inner();
    owned_survey(&app_data, &user, &survey_id).await?;
    survey::set_status(app_data.store.as_ref(), &survey_id, request.status).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn post_copy(
    app_data: web::Data<AppData>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let source = owned_survey(&app_data, &user, &path).await?;
    let copy = survey::copy_survey(app_data.store.as_ref(), &source).await?;
    Ok(HttpResponse::Created().json(copy))
}

async fn delete_survey(
    app_data: web::Data<AppData>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let survey_id = path.into_inner();
    owned_survey(&app_data, &user, &survey_id).await?;
    survey::delete_survey(app_data.store.as_ref(), &survey_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure_routes(config: &mut ServiceConfig) {
    config.route("", web::get().to(get_surveys));
    config.route("", web::post().to(post_survey));
    config.route("/{survey_id}", web::get().to(get_survey));
    config.route("/{survey_id}", web::put().to(put_survey));
    config.route("/{survey_id}", web::delete().to(delete_survey));
    config.route("/{survey_id}/status", web::put().to(put_status));
    config.route("/{survey_id}/copy", web::post().to(post_copy));
}
