use actix_web::{
    web::{self, ServiceConfig},
    HttpResponse,
};

use super::owned_survey;
use crate::{
    auth::AuthenticatedUser,
    engine::edit::{self, QuestionModel, QuestionSetModel},
    error::ApiError,
    AppData,
};

async fn get_questions(
    app_data: web::Data<AppData>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let survey_id = path.into_inner();
    owned_survey(&app_data, &user, &survey_id).await?;
    let set = edit::question_set(app_data.store.as_ref(), &survey_id).await?;
    Ok(HttpResponse::Ok().json(set))
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplaceResponseData {
    question_ids: Vec<String>,
}

async fn put_questions(
    app_data: web::Data<AppData>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    set: web::Json<QuestionSetModel>,
) -> Result<HttpResponse, ApiError> {
    let survey_id = path.into_inner();
    owned_survey(&app_data, &user, &survey_id).await?;
    let question_ids =
        edit::replace_question_set(app_data.store.as_ref(), &survey_id, set.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ReplaceResponseData { question_ids }))
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertResponseData {
    position: i32,
    question: QuestionModel,
}

async fn post_question(
    app_data: web::Data<AppData>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    question: web::Json<QuestionModel>,
) -> Result<HttpResponse, ApiError> {
    let survey_id = path.into_inner();
    owned_survey(&app_data, &user, &survey_id).await?;
    let (question, position) =
        edit::insert_question(app_data.store.as_ref(), &survey_id, question.into_inner()).await?;
    Ok(HttpResponse::Created().json(InsertResponseData { position, question }))
}

async fn delete_question(
    app_data: web::Data<AppData>,
    user: AuthenticatedUser,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (survey_id, question_id) = path.into_inner();
    owned_survey(&app_data, &user, &survey_id).await?;
    edit::delete_question(app_data.store.as_ref(), &survey_id, &question_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoveRequestData {
    new_index: i32,
}

async fn put_position(
    app_data: web::Data<AppData>,
    user: AuthenticatedUser,
    path: web::Path<(String, String)>,
    request: web::Json<MoveRequestData>,
) -> Result<HttpResponse, ApiError> {
    let (survey_id, question_id) = path.into_inner();
    owned_survey(&app_data, &user, &survey_id).await?;
    edit::move_question(
        app_data.store.as_ref(),
        &survey_id,
        &question_id,
        request.new_index,
    )
    .await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure_routes(config: &mut ServiceConfig) {
    config.route("/{survey_id}/questions", web::get().to(get_questions));
    config.route("/{survey_id}/questions", web::put().to(put_questions));
    config.route("/{survey_id}/questions", web::post().to(post_question));
    config.route(
        "/{survey_id}/questions/{question_id}",
        web::delete().to(delete_question),
    );
    config.route(
        "/{survey_id}/questions/{question_id}/position",
        web::put().to(put_position),
    );
}
