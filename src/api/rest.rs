use serde::de::DeserializeOwned;
use serde::Serialize;

use super::types::{
    AuthTokenResponse, CreateOrganizationRequest, EndMeetingRequest, JoinMeetingRequest,
    JoinMeetingResponse, JoiningUser, JoinOrganizationRequest, MeetingUserRequest, MetricsSample,
    OrganizationCodeResponse, PasswordResetRequest, SetPasswordRequest, VerifyResetCodeRequest,
};
use super::{check_status, BackendClient};
use crate::error::{MeetError, Result};

impl BackendClient {
    async fn send_json<B: Serialize>(&self, path: &str, body: &B, auth: bool) -> Result<reqwest::Response> {
        let mut request = self.client.post(self.config.rest_url(path)).json(body);
        if auth {
            request = self.authorized(request)?;
        }
        check_status(request.send().await?).await
    }

    async fn post_for<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B, auth: bool) -> Result<R> {
        let response = self.send_json(path, body, auth).await?;
        response
            .json()
            .await
            .map_err(|e| MeetError::UnexpectedResponse(format!("{}: {}", path, e)))
    }

    /// Posts and discards the response body
    async fn post_unit<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        self.send_json(path, body, true).await.map(|_| ())
    }

    pub async fn create_organization(&self, request: &CreateOrganizationRequest) -> Result<()> {
        self.post_unit("CreateOrganization", request).await?;
        tracing::info!(name = %request.name, "Organization created");
        Ok(())
    }

    pub async fn join_organization(&self, code: &str) -> Result<()> {
        let code = code.trim();
        if code.is_empty() {
            return Err(MeetError::InvalidInput("organization code is empty".to_string()));
        }
        self.post_unit("JoinOrganization", &JoinOrganizationRequest { code: code.to_string() })
            .await?;
        tracing::info!("Joined organization");
        Ok(())
    }

    /// Rotates the invite code of an owned organization, returning the new code
    pub async fn change_organization_code(&self, organization_id: i64) -> Result<String> {
        let path = format!(
            "changeOrganizationCode/{}",
            urlencoding::encode(&organization_id.to_string())
        );
        let request = self.authorized(self.client.get(self.config.rest_url(&path)))?;
        let response = check_status(request.send().await?).await?;
        let body: OrganizationCodeResponse = response
            .json()
            .await
            .map_err(|e| MeetError::UnexpectedResponse(format!("{}: {}", path, e)))?;

        tracing::info!(organization_id, "Organization code rotated");
        Ok(body.organization_code)
    }

    pub async fn join_meeting(&self, meeting_id: i64, user: &JoiningUser) -> Result<JoinMeetingResponse> {
        let request = JoinMeetingRequest {
            data: user.clone(),
            meeting_id,
        };
        let response: JoinMeetingResponse = self.post_for("JoinMeeting", &request, true).await?;
        tracing::info!(meeting_id, user_id = user.id, role = %user.role, "Joined meeting on backend");
        Ok(response)
    }

    pub async fn leave_meeting(&self, meeting_id: i64, user_id: i64) -> Result<()> {
        self.post_unit("leave", &MeetingUserRequest { meeting_id, user_id })
            .await
    }

    pub async fn end_meeting(&self, meeting_id: i64) -> Result<()> {
        self.post_unit("end", &EndMeetingRequest { meeting_id }).await
    }

    pub async fn camera_on(&self, meeting_id: i64, user_id: i64) -> Result<()> {
        self.post_unit("camera-on", &MeetingUserRequest { meeting_id, user_id })
            .await
    }

    pub async fn camera_off(&self, meeting_id: i64, user_id: i64) -> Result<()> {
        self.post_unit("camera-off", &MeetingUserRequest { meeting_id, user_id })
            .await
    }

    pub async fn post_metrics(&self, sample: &MetricsSample) -> Result<()> {
        self.post_unit("metrics", sample).await
    }

    // Password reset runs before sign-in, so none of these carry a token

    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        let body = PasswordResetRequest { email: email.trim().to_string() };
        self.send_json("ForgetPassword", &body, false).await?;
        tracing::info!(email = %body.email, "Password reset code requested");
        Ok(())
    }

    pub async fn verify_reset_code(&self, email: &str, code: &str) -> Result<()> {
        let body = VerifyResetCodeRequest {
            email: email.trim().to_string(),
            code: code.trim().to_string(),
        };
        self.send_json("verifyResetCode", &body, false).await?;
        Ok(())
    }

    /// Sets a new password and returns the fresh auth token
    pub async fn reset_password(&self, email: &str, code: &str, password: &str) -> Result<String> {
        let body = SetPasswordRequest {
            email: email.trim().to_string(),
            code: code.trim().to_string(),
            password: password.to_string(),
            confirm_password: password.to_string(),
        };
        let response: AuthTokenResponse = self.post_for("resetPassword", &body, false).await?;
        Ok(response.token)
    }
}
