//! Outgoing mail. Only verification codes are sent.

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::SmtpConfig;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_code(&self, to: &str, code: &str) -> anyhow::Result<()>;
}

fn code_message(from: &Mailbox, to: Mailbox, code: &str) -> anyhow::Result<Message> {
    let message = Message::builder()
        .from(from.clone())
        .to(to)
        .subject("Your verification code")
        .header(ContentType::TEXT_PLAIN)
        .body(format!(
            "Your verification code is: {code}\n\nIt expires in 10 minutes.\n"
        ))?;
    Ok(message)
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        let from: Mailbox = config
            .from
            .parse()
            .with_context(|| format!("invalid SMTP_FROM address {:?}", config.from))?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .with_context(|| format!("cannot use SMTP relay {}", config.host))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_code(&self, to: &str, code: &str) -> anyhow::Result<()> {
        let to: Mailbox = to
            .parse()
            .with_context(|| format!("invalid recipient {to:?}"))?;
        let message = code_message(&self.from, to, code)?;
        self.transport
            .send(message)
            .await
            .context("SMTP delivery failed")?;
        Ok(())
    }
}

/// Stand-in when no SMTP server is configured: codes only go to the log.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_code(&self, to: &str, code: &str) -> anyhow::Result<()> {
        log::warn!("Mail disabled, verification code for {} is {}", to, code);
        Ok(())
    }
}
