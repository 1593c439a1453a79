use actix_web::{
    web::{self, ServiceConfig},
    HttpResponse,
};
use anyhow::Result;
use plotters::prelude::*;

use super::owned_survey;
use crate::{
    auth::AuthenticatedUser,
    engine::response::{self, OptionCount},
    error::ApiError,
    AppData,
};

async fn get_responses(
    app_data: web::Data<AppData>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let survey_id = path.into_inner();
    owned_survey(&app_data, &user, &survey_id).await?;
    let details = response::survey_responses(app_data.store.as_ref(), &survey_id).await?;
    Ok(HttpResponse::Ok().json(details))
}

#[derive(serde::Serialize)]
struct CountResponseData {
    count: i64,
}

async fn get_option_count(
    app_data: web::Data<AppData>,
    user: AuthenticatedUser,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (survey_id, option_id) = path.into_inner();
    owned_survey(&app_data, &user, &survey_id).await?;
    let count =
        response::option_selection_count(app_data.store.as_ref(), &survey_id, &option_id).await?;
    Ok(HttpResponse::Ok().json(CountResponseData { count }))
}

#[derive(serde::Serialize)]
struct AnswersResponseData<T> {
    answers: Vec<T>,
}

async fn get_text_answers(
    app_data: web::Data<AppData>,
    user: AuthenticatedUser,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (survey_id, text_fill_in_id) = path.into_inner();
    owned_survey(&app_data, &user, &survey_id).await?;
    let answers =
        response::text_answers(app_data.store.as_ref(), &survey_id, &text_fill_in_id).await?;
    Ok(HttpResponse::Ok().json(AnswersResponseData { answers }))
}

async fn get_num_answers(
    app_data: web::Data<AppData>,
    user: AuthenticatedUser,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (survey_id, num_fill_in_id) = path.into_inner();
    owned_survey(&app_data, &user, &survey_id).await?;
    let answers =
        response::numeric_answers(app_data.store.as_ref(), &survey_id, &num_fill_in_id).await?;
    Ok(HttpResponse::Ok().json(AnswersResponseData { answers }))
}

async fn get_question_counts(
    app_data: web::Data<AppData>,
    user: AuthenticatedUser,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (survey_id, question_id) = path.into_inner();
    owned_survey(&app_data, &user, &survey_id).await?;
    let counts =
        response::option_counts(app_data.store.as_ref(), &survey_id, &question_id).await?;
    Ok(HttpResponse::Ok().json(counts))
}

const COLORS: &[&RGBColor] = &[&RED, &GREEN, &BLUE, &YELLOW, &CYAN, &MAGENTA];

const fn get_color(index: usize) -> &'static RGBColor {
    COLORS[index % COLORS.len()]
}

/// Horizontal bar chart of the option counts, one bar per option, as SVG.
fn draw_bar_graph(caption: &str, data: &[OptionCount]) -> Result<String> {
    let mut buffer = String::new();

    let data_len = data.len();

    let svg_backend = SVGBackend::with_string(&mut buffer, (600, 400));
    let root_area = svg_backend.into_drawing_area();
    root_area.fill(&WHITE)?;

    // a survey without responses still gets a visible axis
    let max_count = data.iter().map(|x| x.count).max().unwrap_or(0).max(1);

    let mut context = ChartBuilder::on(&root_area)
        .set_label_area_size(LabelAreaPosition::Left, 80)
        .set_label_area_size(LabelAreaPosition::Right, 5)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .caption(caption, ("sans-serif", 32))
        // the upper bound of a segmented range is included
        .build_cartesian_2d(0..max_count, (0..data_len - 1).into_segmented())?;

    context
        .configure_mesh()
        .y_label_formatter(&|x| match x {
            SegmentValue::CenterOf(x) => data[data_len - *x - 1].content.clone(),
            _ => "".to_string(),
        })
        .draw()?;

    let data_values = data.iter().map(|x| x.count);

    context.draw_series((0..).zip(data_values).map(|(y, x)| {
        let reversed_y = data_len - y - 1;
        let mut bar = Rectangle::new(
            [
                (0, SegmentValue::Exact(reversed_y)),
                (x, SegmentValue::Exact(reversed_y + 1)),
            ],
            get_color(y).filled(),
        );
        bar.set_margin(5, 5, 0, 0);
        bar
    }))?;

    // both still borrow the buffer
    drop(context);
    drop(root_area);

    Ok(buffer)
}

async fn get_question_graph(
    app_data: web::Data<AppData>,
    user: AuthenticatedUser,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (survey_id, question_id) = path.into_inner();
    owned_survey(&app_data, &user, &survey_id).await?;
    let counts =
        response::option_counts(app_data.store.as_ref(), &survey_id, &question_id).await?;
    if counts.options.is_empty() {
        return Err(ApiError::invalid("question has no options to draw"));
    }
    let svg_content = draw_bar_graph(&counts.title, &counts.options)?;
    Ok(HttpResponse::Ok()
        .content_type("image/svg+xml")
        .body(svg_content))
}

pub fn configure_routes(config: &mut ServiceConfig) {
    config.route("/{survey_id}/responses", web::get().to(get_responses));
    config.route(
        "/{survey_id}/options/{option_id}/count",
        web::get().to(get_option_count),
    );
    config.route(
        "/{survey_id}/text-fill-ins/{text_fill_in_id}/answers",
        web::get().to(get_text_answers),
    );
    config.route(
        "/{survey_id}/num-fill-ins/{num_fill_in_id}/answers",
        web::get().to(get_num_answers),
    );
    config.route(
        "/{survey_id}/questions/{question_id}/counts",
        web::get().to(get_question_counts),
    );
    // the same counts as an image
    config.route(
        "/{survey_id}/questions/{question_id}/graph",
        web::get().to(get_question_graph),
    );
}
