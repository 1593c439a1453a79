use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgConnection, PgPool, Postgres, QueryBuilder};

use super::{MoveOutcome, StoreError, StoreResult, SurveyHeader, SurveySettings, SurveyStore};
use crate::{
    engine::order::{self, Shift},
    models::{
        AnswerKind, AnswerSet, EmailCode, NewResponse, NumAnswer, NumFillIn, OptionAnswer, Question,
        QuestionBody, QuestionOption, QuestionType, Survey, SurveyResponse, SurveyStatus,
        TextAnswer, TextFillIn, User,
    },
};

const SELECT_SURVEY: &str = r#"select survey_id, user_id, title, description, status, response_count,
    created_at, updated_at, start_time, end_time, day_start_time, day_end_time,
    password_strategy, passwords, browser_limit, ip_limit, max_response_count from survey"#;

const SELECT_USER: &str =
    "select user_id, user_name, email, password_hash, registered_at from app_user";

#[derive(sqlx::FromRow)]
struct QuestionRow {
    question_id: String,
    question_type: QuestionType,
    label: String,
    title: String,
    description: String,
    least_choice: i32,
    max_choice: i32,
}

#[derive(sqlx::FromRow)]
struct OptionRow {
    question_id: String,
    option_id: String,
    content: String,
}

#[derive(sqlx::FromRow)]
struct TextFillInRow {
    question_id: String,
    text_fill_in_id: String,
}

#[derive(sqlx::FromRow)]
struct NumFillInRow {
    question_id: String,
    num_fill_in_id: String,
    min_value: Option<f64>,
    max_value: Option<f64>,
    precision: Option<i32>,
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!().run(&self.pool).await?;
        Ok(())
    }
}

fn map_unique(err: sqlx::Error, what: impl Into<String>) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::Duplicate(what.into())
        }
        _ => StoreError::Database(err),
    }
}

/// Answer rows reference template items; a concurrent replace-all removes them.
fn map_missing_item(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            StoreError::MissingReference("answered item".to_string())
        }
        _ => StoreError::Database(err),
    }
}

fn group_by_question<T>(rows: Vec<T>, key: impl Fn(&T) -> &str) -> HashMap<String, Vec<T>> {
    let mut grouped: HashMap<String, Vec<T>> = HashMap::new();
    for row in rows {
        grouped.entry(key(&row).to_string()).or_default().push(row);
    }
    grouped
}

/// Takes a row lock on the survey so edits of one survey run one at a time.
async fn lock_survey(conn: &mut PgConnection, survey_id: &str) -> StoreResult<bool> {
    let locked = sqlx::query_scalar::<_, String>(
        "select survey_id from survey where survey_id = $1 for update",
    )
    .bind(survey_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(locked.is_some())
}

async fn shift_positions(conn: &mut PgConnection, survey_id: &str, shift: Shift) -> StoreResult<()> {
    sqlx::query(
        "update question set position = position + $2 where survey_id = $1 and position between $3 and $4",
    )
    .bind(survey_id)
    .bind(shift.delta)
    .bind(shift.first)
    .bind(shift.last)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_questions(
    conn: &mut PgConnection,
    survey_id: &str,
    first_position: i32,
    questions: &[Question],
) -> StoreResult<()> {
    if questions.is_empty() {
        return Ok(());
    }

    let mut question_insert = QueryBuilder::<Postgres>::new(
        "insert into question (question_id, survey_id, position, question_type, label, title, description, least_choice, max_choice) ",
    );
    question_insert.push_values(
        questions.iter().zip(first_position..),
        |mut b, (question, position)| {
            b.push_bind(&question.question_id)
                .push_bind(survey_id)
                .push_bind(position)
                .push_bind(question.question_type())
                .push_bind(&question.label)
                .push_bind(&question.title)
                .push_bind(&question.description)
                .push_bind(question.least_choice)
                .push_bind(question.max_choice);
        },
    );
    question_insert
        .build()
        .execute(&mut *conn)
        .await
        .map_err(|e| map_unique(e, "question"))?;

    let mut options = Vec::new();
    let mut texts = Vec::new();
    let mut nums = Vec::new();
    for question in questions {
        let question_id = question.question_id.as_str();
        match &question.body {
            QuestionBody::Choice(items) => options.extend(
                items
                    .iter()
                    .zip(0_i32..)
                    .map(|(item, position)| (question_id, position, item)),
            ),
            QuestionBody::TextSlots(items) => texts.extend(
                items
                    .iter()
                    .zip(0_i32..)
                    .map(|(item, position)| (question_id, position, item)),
            ),
            QuestionBody::NumSlots(items) => nums.extend(
                items
                    .iter()
                    .zip(0_i32..)
                    .map(|(item, position)| (question_id, position, item)),
            ),
        }
    }

    if !options.is_empty() {
        let mut option_insert = QueryBuilder::<Postgres>::new(
            "insert into question_option (option_id, question_id, survey_id, position, content) ",
        );
        option_insert.push_values(options, |mut b, (question_id, position, option)| {
            b.push_bind(&option.option_id)
                .push_bind(question_id)
                .push_bind(survey_id)
                .push_bind(position)
                .push_bind(&option.content);
        });
        option_insert
            .build()
            .execute(&mut *conn)
            .await
            .map_err(|e| map_unique(e, "option"))?;
    }

    if !texts.is_empty() {
        let mut text_insert = QueryBuilder::<Postgres>::new(
            "insert into question_text_fill_in (text_fill_in_id, question_id, survey_id, position) ",
        );
        text_insert.push_values(texts, |mut b, (question_id, position, slot)| {
            b.push_bind(&slot.text_fill_in_id)
                .push_bind(question_id)
                .push_bind(survey_id)
                .push_bind(position);
        });
        text_insert
            .build()
            .execute(&mut *conn)
            .await
            .map_err(|e| map_unique(e, "text fill-in"))?;
    }

    if !nums.is_empty() {
        let mut num_insert = QueryBuilder::<Postgres>::new(
            "insert into question_num_fill_in (num_fill_in_id, question_id, survey_id, position, min_value, max_value, precision) ",
        );
        num_insert.push_values(nums, |mut b, (question_id, position, slot)| {
            b.push_bind(&slot.num_fill_in_id)
                .push_bind(question_id)
                .push_bind(survey_id)
                .push_bind(position)
                .push_bind(slot.min_value)
                .push_bind(slot.max_value)
                .push_bind(slot.precision);
        });
        num_insert
            .build()
            .execute(&mut *conn)
            .await
            .map_err(|e| map_unique(e, "number fill-in"))?;
    }

    Ok(())
}

async fn insert_answers(conn: &mut PgConnection, survey_id: &str, answers: &AnswerSet) -> StoreResult<()> {
    if !answers.options.is_empty() {
        let mut builder = QueryBuilder::<Postgres>::new(
            "insert into response_option (response_id, option_id, question_id, survey_id, is_selected) ",
        );
        builder.push_values(&answers.options, |mut b, answer| {
            b.push_bind(&answer.response_id)
                .push_bind(&answer.option_id)
                .push_bind(&answer.question_id)
                .push_bind(survey_id)
                .push_bind(answer.is_selected);
        });
        builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(map_missing_item)?;
    }

    if !answers.texts.is_empty() {
        let mut builder = QueryBuilder::<Postgres>::new(
            "insert into response_text_fill_in (response_id, text_fill_in_id, question_id, survey_id, text_content) ",
        );
        builder.push_values(&answers.texts, |mut b, answer| {
            b.push_bind(&answer.response_id)
                .push_bind(&answer.text_fill_in_id)
                .push_bind(&answer.question_id)
                .push_bind(survey_id)
                .push_bind(&answer.text_content);
        });
        builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(map_missing_item)?;
    }

    if !answers.nums.is_empty() {
        let mut builder = QueryBuilder::<Postgres>::new(
            "insert into response_num_fill_in (response_id, num_fill_in_id, question_id, survey_id, num_content) ",
        );
        builder.push_values(&answers.nums, |mut b, answer| {
            b.push_bind(&answer.response_id)
                .push_bind(&answer.num_fill_in_id)
                .push_bind(&answer.question_id)
                .push_bind(survey_id)
                .push_bind(answer.num_content);
        });
        builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(map_missing_item)?;
    }

    Ok(())
}

#[async_trait]
impl SurveyStore for PgStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            "insert into app_user (user_id, user_name, email, password_hash, registered_at) values ($1, $2, $3, $4, $5)",
        )
        .bind(&user.user_id)
        .bind(&user.user_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.registered_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, "user name or email"))?;
        Ok(())
    }

    async fn find_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("{SELECT_USER} where user_id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_login(&self, name_or_email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "{SELECT_USER} where user_name = $1 or email = $1 limit 1"
        ))
        .bind(name_or_email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update_password(&self, email: &str, password_hash: &str) -> StoreResult<bool> {
        let result = sqlx::query("update app_user set password_hash = $2 where email = $1")
            .bind(email)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_email_code(&self, code: &EmailCode) -> StoreResult<()> {
        let mut transaction = self.pool.begin().await?;
        sqlx::query("delete from email_verification where expires_at < now()")
            .execute(&mut *transaction)
            .await?;
        sqlx::query(
            r#"insert into email_verification (email, code, expires_at) values ($1, $2, $3)
            on conflict (email, code) do update set expires_at = excluded.expires_at"#,
        )
        .bind(&code.email)
        .bind(&code.code)
        .bind(code.expires_at)
        .execute(&mut *transaction)
        .await?;
        transaction.commit().await?;
        Ok(())
    }

    async fn find_email_code(&self, email: &str, code: &str) -> StoreResult<Option<EmailCode>> {
        let found = sqlx::query_as::<_, EmailCode>(
            "select email, code, expires_at from email_verification where email = $1 and code = $2",
        )
        .bind(email)
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found)
    }

    async fn delete_email_codes(&self, email: &str) -> StoreResult<()> {
        sqlx::query("delete from email_verification where email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_survey(&self, survey: &Survey, questions: &[Question]) -> StoreResult<()> {
        let mut transaction = self.pool.begin().await?;

        sqlx::query(
            r#"insert into survey (survey_id, user_id, title, description, status, response_count,
            created_at, updated_at, start_time, end_time, day_start_time, day_end_time,
            password_strategy, passwords, browser_limit, ip_limit, max_response_count)
            values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)"#,
        )
        .bind(&survey.survey_id)
        .bind(&survey.user_id)
        .bind(&survey.title)
        .bind(&survey.description)
        .bind(survey.status)
        .bind(survey.response_count)
        .bind(survey.created_at)
        .bind(survey.updated_at)
        .bind(survey.start_time)
        .bind(survey.end_time)
        .bind(survey.day_start_time)
        .bind(survey.day_end_time)
        .bind(survey.password_strategy)
        .bind(&survey.passwords)
        .bind(survey.browser_limit)
        .bind(survey.ip_limit)
        .bind(survey.max_response_count)
        .execute(&mut *transaction)
        .await
        .map_err(|e| map_unique(e, "survey"))?;

        insert_questions(&mut transaction, &survey.survey_id, 0, questions).await?;

        transaction.commit().await?;
        Ok(())
    }

    async fn find_survey(&self, survey_id: &str) -> StoreResult<Option<Survey>> {
        let survey = sqlx::query_as::<_, Survey>(&format!("{SELECT_SURVEY} where survey_id = $1"))
            .bind(survey_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(survey)
    }

    async fn list_surveys(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<Survey>, i64)> {
        let surveys = sqlx::query_as::<_, Survey>(&format!(
            "{SELECT_SURVEY} where user_id = $1 and status <> $2 order by created_at desc limit $3 offset $4"
        ))
        .bind(user_id)
        .bind(SurveyStatus::Deleted)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "select count(*) from survey where user_id = $1 and status <> $2",
        )
        .bind(user_id)
        .bind(SurveyStatus::Deleted)
        .fetch_one(&self.pool)
        .await?;

        Ok((surveys, total))
    }

    async fn update_survey_settings(
        &self,
        survey_id: &str,
        settings: &SurveySettings,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"update survey set title = $2, description = $3, start_time = $4, end_time = $5,
            day_start_time = $6, day_end_time = $7, password_strategy = $8, passwords = $9,
            browser_limit = $10, ip_limit = $11, max_response_count = $12, updated_at = now()
            where survey_id = $1"#,
        )
        .bind(survey_id)
        .bind(&settings.title)
        .bind(&settings.description)
        .bind(settings.start_time)
        .bind(settings.end_time)
        .bind(settings.day_start_time)
        .bind(settings.day_end_time)
        .bind(settings.password_strategy)
        .bind(&settings.passwords)
        .bind(settings.browser_limit)
        .bind(settings.ip_limit)
        .bind(settings.max_response_count)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_survey_status(&self, survey_id: &str, status: SurveyStatus) -> StoreResult<bool> {
        let result = sqlx::query(
            "update survey set status = $2, updated_at = now() where survey_id = $1",
        )
        .bind(survey_id)
        .bind(status)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_survey(&self, survey_id: &str) -> StoreResult<bool> {
        // questions, template items, responses and answers go with it (on delete cascade)
        let result = sqlx::query("delete from survey where survey_id = $1")
            .bind(survey_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn load_questions(&self, survey_id: &str) -> StoreResult<Vec<Question>> {
        let rows = sqlx::query_as::<_, QuestionRow>(
            r#"select question_id, question_type, label, title, description, least_choice, max_choice
            from question where survey_id = $1 order by position"#,
        )
        .bind(survey_id)
        .fetch_all(&self.pool)
        .await?;

        let options = sqlx::query_as::<_, OptionRow>(
            "select question_id, option_id, content from question_option where survey_id = $1 order by position",
        )
        .bind(survey_id)
        .fetch_all(&self.pool)
        .await?;
        let texts = sqlx::query_as::<_, TextFillInRow>(
            "select question_id, text_fill_in_id from question_text_fill_in where survey_id = $1 order by position",
        )
        .bind(survey_id)
        .fetch_all(&self.pool)
        .await?;
        let nums = sqlx::query_as::<_, NumFillInRow>(
            r#"select question_id, num_fill_in_id, min_value, max_value, precision
            from question_num_fill_in where survey_id = $1 order by position"#,
        )
        .bind(survey_id)
        .fetch_all(&self.pool)
        .await?;

        let mut options = group_by_question(options, |row| row.question_id.as_str());
        let mut texts = group_by_question(texts, |row| row.question_id.as_str());
        let mut nums = group_by_question(nums, |row| row.question_id.as_str());

        let questions = rows
            .into_iter()
            .map(|row| {
                let body = match row.question_type.kind() {
                    AnswerKind::Choice => QuestionBody::Choice(
                        options
                            .remove(&row.question_id)
                            .unwrap_or_default()
                            .into_iter()
                            .map(|option| QuestionOption {
                                option_id: option.option_id,
                                content: option.content,
                            })
                            .collect(),
                    ),
                    AnswerKind::Text => QuestionBody::TextSlots(
                        texts
                            .remove(&row.question_id)
                            .unwrap_or_default()
                            .into_iter()
                            .map(|slot| TextFillIn {
                                text_fill_in_id: slot.text_fill_in_id,
                            })
                            .collect(),
                    ),
                    AnswerKind::Num => QuestionBody::NumSlots(
                        nums.remove(&row.question_id)
                            .unwrap_or_default()
                            .into_iter()
                            .map(|slot| NumFillIn {
                                num_fill_in_id: slot.num_fill_in_id,
                                min_value: slot.min_value,
                                max_value: slot.max_value,
                                precision: slot.precision,
                            })
                            .collect(),
                    ),
                };
                Question {
                    question_id: row.question_id,
                    arity: row.question_type.arity(),
                    label: row.label,
                    title: row.title,
                    description: row.description,
                    least_choice: row.least_choice,
                    max_choice: row.max_choice,
                    body,
                }
            })
            .collect();

        Ok(questions)
    }

    async fn replace_questions(
        &self,
        survey_id: &str,
        header: &SurveyHeader,
        questions: &[Question],
    ) -> StoreResult<bool> {
        let mut transaction = self.pool.begin().await?;
        if !lock_survey(&mut transaction, survey_id).await? {
            return Ok(false);
        }

        // answers and template items are removed by on delete cascade
        sqlx::query("delete from survey_response where survey_id = $1")
            .bind(survey_id)
            .execute(&mut *transaction)
            .await?;
        sqlx::query("delete from question where survey_id = $1")
            .bind(survey_id)
            .execute(&mut *transaction)
            .await?;
        sqlx::query(
            "update survey set title = $2, status = $3, response_count = 0, updated_at = now() where survey_id = $1",
        )
        .bind(survey_id)
        .bind(&header.title)
        .bind(header.status)
        .execute(&mut *transaction)
        .await?;

        insert_questions(&mut transaction, survey_id, 0, questions).await?;

        transaction.commit().await?;
        Ok(true)
    }

    async fn append_question(
        &self,
        survey_id: &str,
        question: &Question,
    ) -> StoreResult<Option<i32>> {
        let mut transaction = self.pool.begin().await?;
        if !lock_survey(&mut transaction, survey_id).await? {
            return Ok(None);
        }

        let positions =
            sqlx::query_scalar::<_, i32>("select position from question where survey_id = $1")
                .bind(survey_id)
                .fetch_all(&mut *transaction)
                .await?;
        let position = order::next_position(positions);

        insert_questions(
            &mut transaction,
            survey_id,
            position,
            std::slice::from_ref(question),
        )
        .await?;

        transaction.commit().await?;
        Ok(Some(position))
    }

    async fn delete_question(&self, survey_id: &str, question_id: &str) -> StoreResult<bool> {
        let mut transaction = self.pool.begin().await?;
        if !lock_survey(&mut transaction, survey_id).await? {
            return Ok(false);
        }

        let removed = sqlx::query_scalar::<_, i32>(
            "delete from question where survey_id = $1 and question_id = $2 returning position",
        )
        .bind(survey_id)
        .bind(question_id)
        .fetch_optional(&mut *transaction)
        .await?;
        let Some(removed) = removed else {
            return Ok(false);
        };

        shift_positions(&mut transaction, survey_id, order::closing_gap(removed)).await?;

        transaction.commit().await?;
        Ok(true)
    }

    async fn move_question(
        &self,
        survey_id: &str,
        question_id: &str,
        new_position: i32,
    ) -> StoreResult<MoveOutcome> {
        let mut transaction = self.pool.begin().await?;
        if !lock_survey(&mut transaction, survey_id).await? {
            return Ok(MoveOutcome::NotFound);
        }

        let current = sqlx::query_scalar::<_, i32>(
            "select position from question where survey_id = $1 and question_id = $2",
        )
        .bind(survey_id)
        .bind(question_id)
        .fetch_optional(&mut *transaction)
        .await?;
        let Some(current) = current else {
            return Ok(MoveOutcome::NotFound);
        };

        let count = sqlx::query_scalar::<_, i64>("select count(*) from question where survey_id = $1")
            .bind(survey_id)
            .fetch_one(&mut *transaction)
            .await?;
        let count = i32::try_from(count).unwrap_or(i32::MAX);

        let shift = match order::plan_move(current, new_position, count) {
            Ok(Some(shift)) => shift,
            // dropping the transaction rolls it back, nothing was written
            Ok(None) => return Ok(MoveOutcome::Unchanged),
            Err(out_of_range) => {
                return Ok(MoveOutcome::OutOfRange {
                    count: out_of_range.count,
                })
            }
        };

        shift_positions(&mut transaction, survey_id, shift).await?;
        sqlx::query("update question set position = $3 where survey_id = $1 and question_id = $2")
            .bind(survey_id)
            .bind(question_id)
            .bind(new_position)
            .execute(&mut *transaction)
            .await?;

        transaction.commit().await?;
        Ok(MoveOutcome::Moved)
    }

    async fn insert_response(&self, new_response: &NewResponse) -> StoreResult<bool> {
        let response = &new_response.response;
        let mut transaction = self.pool.begin().await?;
        if !lock_survey(&mut transaction, &response.survey_id).await? {
            return Ok(false);
        }

        sqlx::query(
            r#"insert into survey_response (response_id, survey_id, source, ip, is_starred, is_invalid, submitted_at)
            values ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(&response.response_id)
        .bind(&response.survey_id)
        .bind(&response.source)
        .bind(response.ip)
        .bind(response.is_starred)
        .bind(response.is_invalid)
        .bind(response.submitted_at)
        .execute(&mut *transaction)
        .await
        .map_err(|e| map_unique(e, format!("response {}", response.response_id)))?;

        insert_answers(&mut transaction, &response.survey_id, &new_response.answers).await?;

        sqlx::query("update survey set response_count = response_count + 1 where survey_id = $1")
            .bind(&response.survey_id)
            .execute(&mut *transaction)
            .await?;

        transaction.commit().await?;
        Ok(true)
    }

    async fn list_responses(&self, survey_id: &str) -> StoreResult<Vec<SurveyResponse>> {
        let responses = sqlx::query_as::<_, SurveyResponse>(
            r#"select response_id, survey_id, source, ip, is_starred, is_invalid, submitted_at
            from survey_response where survey_id = $1 order by seq"#,
        )
        .bind(survey_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(responses)
    }

    async fn list_answers(&self, survey_id: &str) -> StoreResult<AnswerSet> {
        let options = sqlx::query_as::<_, OptionAnswer>(
            r#"select a.response_id, a.option_id, a.question_id, a.is_selected
            from response_option a join survey_response r on r.response_id = a.response_id
            where a.survey_id = $1 order by r.seq"#,
        )
        .bind(survey_id)
        .fetch_all(&self.pool)
        .await?;
        let texts = sqlx::query_as::<_, TextAnswer>(
            r#"select a.response_id, a.text_fill_in_id, a.question_id, a.text_content
            from response_text_fill_in a join survey_response r on r.response_id = a.response_id
            where a.survey_id = $1 order by r.seq"#,
        )
        .bind(survey_id)
        .fetch_all(&self.pool)
        .await?;
        let nums = sqlx::query_as::<_, NumAnswer>(
            r#"select a.response_id, a.num_fill_in_id, a.question_id, a.num_content
            from response_num_fill_in a join survey_response r on r.response_id = a.response_id
            where a.survey_id = $1 order by r.seq"#,
        )
        .bind(survey_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(AnswerSet {
            options,
            texts,
            nums,
        })
    }

    async fn count_selected(&self, survey_id: &str, option_id: &str) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "select count(*) from response_option where survey_id = $1 and option_id = $2 and is_selected",
        )
        .bind(survey_id)
        .bind(option_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn text_answers(
        &self,
        survey_id: &str,
        text_fill_in_id: &str,
    ) -> StoreResult<Vec<String>> {
        let answers = sqlx::query_scalar::<_, String>(
            r#"select a.text_content
            from response_text_fill_in a join survey_response r on r.response_id = a.response_id
            where a.survey_id = $1 and a.text_fill_in_id = $2 order by r.seq"#,
        )
        .bind(survey_id)
        .bind(text_fill_in_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(answers)
    }

    async fn num_answers(&self, survey_id: &str, num_fill_in_id: &str) -> StoreResult<Vec<f64>> {
        let answers = sqlx::query_scalar::<_, f64>(
            r#"select a.num_content
            from response_num_fill_in a join survey_response r on r.response_id = a.response_id
            where a.survey_id = $1 and a.num_fill_in_id = $2 order by r.seq"#,
        )
        .bind(survey_id)
        .bind(num_fill_in_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(answers)
    }
}
