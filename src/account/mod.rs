//! Password reset flow: request a code, verify it, set the new password

use std::sync::Arc;

use crate::api::BackendClient;
use crate::error::{MeetError, Result};
use crate::token::TokenStore;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetStep {
    RequestCode,
    VerifyCode,
    SetPassword,
    Done,
}

pub struct PasswordReset {
    backend: BackendClient,
    tokens: Arc<dyn TokenStore>,
    email: String,
    code: Option<String>,
    step: ResetStep,
}

impl PasswordReset {
    pub fn new(backend: BackendClient, tokens: Arc<dyn TokenStore>, email: &str) -> Result<Self> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(MeetError::InvalidInput(format!("invalid email address: {:?}", email)));
        }
        Ok(Self {
            backend,
            tokens,
            email: email.to_string(),
            code: None,
            step: ResetStep::RequestCode,
        })
    }

    /// Resumes with a code that was already verified
    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(code.trim().to_string());
        self.step = ResetStep::SetPassword;
        self
    }

    pub fn step(&self) -> ResetStep {
        self.step
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Asks the backend to mail a reset code
    pub async fn request_code(&mut self) -> Result<()> {
        self.backend.request_password_reset(&self.email).await?;
        self.step = ResetStep::VerifyCode;
        Ok(())
    }

    pub async fn verify(&mut self, code: &str) -> Result<()> {
        let code = code.trim();
        if code.is_empty() {
            return Err(MeetError::InvalidInput("reset code is empty".to_string()));
        }
        self.backend.verify_reset_code(&self.email, code).await?;
        self.code = Some(code.to_string());
        self.step = ResetStep::SetPassword;
        tracing::info!(email = %self.email, "Reset code verified");
        Ok(())
    }

    /// Sets the new password and stores the returned auth token
    ///
    /// A confirmation mismatch fails locally without contacting the backend.
    pub async fn set_password(&mut self, password: &str, confirm: &str) -> Result<()> {
        check_new_password(password, confirm)?;
        let code = self
            .code
            .clone()
            .ok_or_else(|| MeetError::InvalidInput("verify the reset code first".to_string()))?;

        let token = self.backend.reset_password(&self.email, &code, password).await?;
        self.tokens.save(&token)?;
        self.step = ResetStep::Done;

        tracing::info!(email = %self.email, "Password reset, signed in");
        Ok(())
    }
}

pub fn check_new_password(password: &str, confirm: &str) -> Result<()> {
    if password != confirm {
        return Err(MeetError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(MeetError::InvalidInput(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}
