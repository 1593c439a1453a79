use actix_web::{
    web::{self, ServiceConfig},
    HttpResponse,
};

use crate::{
    auth::{self, AuthenticatedUser},
    engine::account::{
        self, Credentials, EmailCodeRequest, PasswordReset, Registration, UserInfo,
    },
    error::ApiError,
    models::Message,
    AppData,
};

async fn post_request_email_code(
    app_data: web::Data<AppData>,
    request: web::Json<EmailCodeRequest>,
) -> Result<HttpResponse, ApiError> {
    account::request_email_code(
        app_data.store.as_ref(),
        app_data.mailer.as_ref(),
        &request.email,
    )
    .await?;
    Ok(HttpResponse::Ok().json(Message("email code sent")))
}

async fn post_register(
    app_data: web::Data<AppData>,
    registration: web::Json<Registration>,
) -> Result<HttpResponse, ApiError> {
    let user = account::register(app_data.store.as_ref(), registration.into_inner()).await?;
    Ok(HttpResponse::Created().json(user))
}

async fn post_login(
    app_data: web::Data<AppData>,
    credentials: web::Json<Credentials>,
) -> Result<HttpResponse, ApiError> {
    let user = account::login(app_data.store.as_ref(), credentials.into_inner()).await?;
    let token = app_data.tokens.issue(&user.user_id)?;
    log::info!("User {} logged in", user.user_id);
    Ok(HttpResponse::Ok()
        .cookie(auth::session_cookie(
            token,
            app_data.tokens.ttl(),
            app_data.secure_cookies,
        ))
        .json(UserInfo::from(user)))
}

async fn post_reset_password(
    app_data: web::Data<AppData>,
    reset: web::Json<PasswordReset>,
) -> Result<HttpResponse, ApiError> {
    account::reset_password(app_data.store.as_ref(), reset.into_inner()).await?;
    Ok(HttpResponse::Ok().json(Message("password reset")))
}

async fn post_logout() -> HttpResponse {
    HttpResponse::NoContent()
        .cookie(auth::expired_cookie())
        .finish()
}

async fn get_me(
    app_data: web::Data<AppData>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let info = account::current_user(app_data.store.as_ref(), &user.user_id).await?;
    Ok(HttpResponse::Ok().json(info))
}

pub fn configure_routes(config: &mut ServiceConfig) {
    config.route(
        "/request-email-code",
        web::post().to(post_request_email_code),
    );
    config.route("/register", web::post().to(post_register));
    config.route("/login", web::post().to(post_login));
    config.route("/logout", web::post().to(post_logout));
    config.route("/me", web::get().to(get_me));
    config.route("/reset-password", web::post().to(post_reset_password));
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    use super::*;
    use crate::{
        routes,
        store::memory::MemoryStore,
        testing::{app_data, app_data_with_mailer, session, RecordingMailer},
    };

    #[actix_rt::test]
    async fn register_login_and_me() {
        let mailer = Arc::new(RecordingMailer::default());
        let data = app_data_with_mailer(Arc::new(MemoryStore::new()), mailer.clone());
        let app = test::init_service(
            App::new()
                .app_data(data.clone())
                .app_data(routes::json_config())
                .configure(routes::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/account/request-email-code")
            .set_json(json!({ "email": "alice@example.com" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let code = mailer.last_code("alice@example.com").unwrap();

        let req = test::TestRequest::post()
            .uri("/account/register")
            .set_json(json!({
                "userName": "alice",
                "email": "alice@example.com",
                "password": "Passw0rdX",
                "emailCode": code
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/account/login")
            .set_json(json!({ "login": "alice", "password": "Passw0rdX" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == auth::TOKEN_COOKIE)
            .expect("login sets the session cookie")
            .into_owned();
        assert_eq!(cookie.http_only(), Some(true));

        let req = test::TestRequest::get()
            .uri("/account/me")
            .cookie(cookie)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["userName"], "alice");
        assert!(body.get("passwordHash").is_none());
    }

    #[actix_rt::test]
    async fn me_requires_a_valid_session() {
        let data = app_data(Arc::new(MemoryStore::new()));
        let app = test::init_service(
            App::new()
                .app_data(data.clone())
                .configure(routes::configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/account/me").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        // valid token for a user that was never stored
        let req = test::TestRequest::get()
            .uri("/account/me")
            .cookie(session(&data, "ghost"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn wrong_password_is_unauthorized() {
        let mailer = Arc::new(RecordingMailer::default());
        let data = app_data_with_mailer(Arc::new(MemoryStore::new()), mailer.clone());
        account::request_email_code(data.store.as_ref(), mailer.as_ref(), "alice@example.com")
            .await
            .unwrap();
        account::register(
            data.store.as_ref(),
            Registration {
                user_name: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password: "Passw0rdX".to_string(),
                email_code: mailer.last_code("alice@example.com").unwrap(),
            },
        )
        .await
        .unwrap();
        let app = test::init_service(
            App::new()
                .app_data(data.clone())
                .app_data(routes::json_config())
                .configure(routes::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/account/login")
            .set_json(json!({ "login": "alice", "password": "nope" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "wrong user name or password");
    }

    #[actix_rt::test]
    async fn malformed_json_is_a_bad_request() {
        let data = app_data(Arc::new(MemoryStore::new()));
        let app = test::init_service(
            App::new()
                .app_data(data.clone())
                .app_data(routes::json_config())
                .configure(routes::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/account/register")
            .set_json(json!({ "userName": "alice" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["message"].is_string());
    }

    #[actix_rt::test]
    async fn register_without_a_mailed_code_is_rejected() {
        let data = app_data(Arc::new(MemoryStore::new()));
        let app = test::init_service(
            App::new()
                .app_data(data.clone())
                .app_data(routes::json_config())
                .configure(routes::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/account/register")
            .set_json(json!({
                "userName": "alice",
                "email": "alice@example.com",
                "password": "Passw0rdX",
                "emailCode": "123456"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "email code is wrong");
    }

    #[actix_rt::test]
    async fn reset_password_with_a_mailed_code() {
        let mailer = Arc::new(RecordingMailer::default());
        let data = app_data_with_mailer(Arc::new(MemoryStore::new()), mailer.clone());
        account::request_email_code(data.store.as_ref(), mailer.as_ref(), "alice@example.com")
            .await
            .unwrap();
        account::register(
            data.store.as_ref(),
            Registration {
                user_name: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password: "Passw0rdX".to_string(),
                email_code: mailer.last_code("alice@example.com").unwrap(),
            },
        )
        .await
        .unwrap();
        let app = test::init_service(
            App::new()
                .app_data(data.clone())
                .app_data(routes::json_config())
                .configure(routes::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/account/request-email-code")
            .set_json(json!({ "email": "alice@example.com" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let code = mailer.last_code("alice@example.com").unwrap();

        let req = test::TestRequest::post()
            .uri("/account/reset-password")
            .set_json(json!({
                "email": "alice@example.com",
                "password": "N3wPassword",
                "emailCode": code
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/account/login")
            .set_json(json!({ "login": "alice@example.com", "password": "N3wPassword" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/account/login")
            .set_json(json!({ "login": "alice", "password": "Passw0rdX" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
