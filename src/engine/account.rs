use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::new_id;
use crate::{
    auth,
    error::ApiError,
    mail::Mailer,
    models::{EmailCode, User},
    store::{StoreError, SurveyStore},
};

static USER_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]{4,64}$").expect("user name pattern is valid"));
static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid"));

const LOGIN_FAILED: &str = "wrong user name or password";

const EMAIL_CODE_TTL_MINUTES: i64 = 10;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub user_name: String,
    pub email: String,
    pub password: String,
    /// Code mailed by [`request_email_code`].
    pub email_code: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailCodeRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordReset {
    pub email: String,
    /// The new password.
    pub password: String,
    pub email_code: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// User name or email.
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: String,
    pub user_name: String,
    pub email: String,
    pub registered_at: chrono::DateTime<chrono::Utc>,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            user_name: user.user_name,
            email: user.email,
            registered_at: user.registered_at,
        }
    }
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    let long_enough = password.chars().count() >= 8;
    let lower = password.chars().any(|c| c.is_ascii_lowercase());
    let upper = password.chars().any(|c| c.is_ascii_uppercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    if long_enough && lower && upper && digit {
        Ok(())
    } else {
        Err(ApiError::invalid(
            "password needs at least 8 characters with a lowercase letter, an uppercase letter and a digit",
        ))
    }
}

fn validate_registration(registration: &Registration) -> Result<(), ApiError> {
    if !USER_NAME.is_match(&registration.user_name) {
        return Err(ApiError::invalid(
            "user name must be 4 to 64 letters, digits or underscores",
        ));
    }
    if !EMAIL.is_match(&registration.email) {
        return Err(ApiError::invalid("email address is malformed"));
    }
    validate_password(&registration.password)
}

fn generate_code() -> String {
    let value: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{value:06}")
}

/// Mails a fresh six digit code to `email`, valid for ten minutes.
pub async fn request_email_code(
    store: &dyn SurveyStore,
    mailer: &dyn Mailer,
    email: &str,
) -> Result<(), ApiError> {
    if !EMAIL.is_match(email) {
        return Err(ApiError::invalid("email address is malformed"));
    }
    let code = EmailCode {
        email: email.to_string(),
        code: generate_code(),
        expires_at: chrono::Utc::now() + chrono::Duration::minutes(EMAIL_CODE_TTL_MINUTES),
    };
    store.insert_email_code(&code).await?;
    mailer.send_code(email, &code.code).await?;
    log::info!("Sent a verification code to {}", email);
    Ok(())
}

async fn check_email_code(
    store: &dyn SurveyStore,
    email: &str,
    code: &str,
) -> Result<(), ApiError> {
    let Some(found) = store.find_email_code(email, code).await? else {
        return Err(ApiError::invalid("email code is wrong"));
    };
    if found.expires_at < chrono::Utc::now() {
        return Err(ApiError::invalid("email code has expired"));
    }
    Ok(())
}

pub async fn register(
    store: &dyn SurveyStore,
    registration: Registration,
) -> Result<UserInfo, ApiError> {
    validate_registration(&registration)?;
    check_email_code(store, &registration.email, &registration.email_code).await?;
    let user = User {
        user_id: new_id(),
        user_name: registration.user_name,
        email: registration.email,
        password_hash: auth::hash_password(&registration.password)?,
        registered_at: chrono::Utc::now(),
    };
    match store.insert_user(&user).await {
        Ok(()) => {}
        Err(StoreError::Duplicate(_)) => {
            return Err(ApiError::AlreadyExists(
                "user name or email is already registered".to_string(),
            ))
        }
        Err(err) => return Err(err.into()),
    }
    store.delete_email_codes(&user.email).await?;
    log::info!("Registered user {} ({})", user.user_name, user.user_id);
    Ok(UserInfo::from(user))
}

/// Sets a new password for the account registered with `reset.email`.
pub async fn reset_password(
    store: &dyn SurveyStore,
    reset: PasswordReset,
) -> Result<(), ApiError> {
    validate_password(&reset.password)?;
    check_email_code(store, &reset.email, &reset.email_code).await?;
    let password_hash = auth::hash_password(&reset.password)?;
    if !store.update_password(&reset.email, &password_hash).await? {
        return Err(ApiError::not_found("no account uses this email address"));
    }
    store.delete_email_codes(&reset.email).await?;
    log::info!("Password reset for {}", reset.email);
    Ok(())
}

/// Checks the credentials and returns the matching user.
pub async fn login(store: &dyn SurveyStore, credentials: Credentials) -> Result<User, ApiError> {
    let Some(user) = store.find_user_by_login(&credentials.login).await? else {
        log::debug!("Login attempt for unknown user {}", credentials.login);
        return Err(ApiError::Unauthorized(LOGIN_FAILED.to_string()));
    };
    if !auth::verify_password(&credentials.password, &user.password_hash)? {
        log::debug!("Wrong password for user {}", user.user_id);
        return Err(ApiError::Unauthorized(LOGIN_FAILED.to_string()));
    }
    Ok(user)
}

pub async fn current_user(store: &dyn SurveyStore, user_id: &str) -> Result<UserInfo, ApiError> {
    store
        .find_user(user_id)
        .await?
        .map(UserInfo::from)
        .ok_or_else(|| ApiError::Unauthorized("user no longer exists".to_string()))
}
