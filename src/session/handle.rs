use serde_json::Value;

use crate::{
    error::{Error, Result},
    http::{cookies, SessionResponse},
};

use super::{SessionFunctions, SessionIdentity};

/// A verified session, as handed to request handlers.
#[derive(Debug, Clone)]
pub struct Session {
    functions: SessionFunctions,
    handle: String,
    user_id: String,
    jwt_payload: Value,
    access_token: Option<String>,
}

impl Session {
    pub(crate) fn new(
        functions: SessionFunctions,
        identity: SessionIdentity,
        access_token: Option<String>,
    ) -> Self {
        Self {
            functions,
            handle: identity.handle,
            user_id: identity.user_id,
            jwt_payload: identity.user_data_in_jwt,
            access_token,
        }
    }

    #[must_use]
    pub fn handle(&self) -> &str {
        &self.handle
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn jwt_payload(&self) -> &Value {
        &self.jwt_payload
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    async fn clear_on_unauthorised<R, T>(&self, response: &mut R, result: Result<T>) -> Result<T>
    where
        R: SessionResponse + ?Sized,
    {
        match result {
            Err(err) if err.is_unauthorised() => {
                self.functions.clear_session_cookies(response).await?;
                Err(err)
            }
            other => other,
        }
    }

    /// Revoke this session; its cookies are cleared when something was revoked.
    ///
    /// # Errors
    ///
    /// Returns a general error on transport failures.
    pub async fn revoke_session<R>(&self, response: &mut R) -> Result<bool>
    where
        R: SessionResponse + ?Sized,
    {
        let revoked = self.functions.revoke_session(&self.handle).await?;
        if revoked {
            self.functions.clear_session_cookies(response).await?;
        }
        Ok(revoked)
    }

    /// # Errors
    ///
    /// [`Error::Unauthorised`] (after clearing cookies) if the session is gone.
    pub async fn get_session_data<R>(&self, response: &mut R) -> Result<Value>
    where
        R: SessionResponse + ?Sized,
    {
        let result = self.functions.get_session_data(&self.handle).await;
        self.clear_on_unauthorised(response, result).await
    }

    /// # Errors
    ///
    /// A general error for a null payload, [`Error::Unauthorised`] (after
    /// clearing cookies) if the session is gone.
    pub async fn update_session_data<R>(&self, session_data: Value, response: &mut R) -> Result<()>
    where
        R: SessionResponse + ?Sized,
    {
        let result = self
            .functions
            .update_session_data(&self.handle, session_data)
            .await;
        self.clear_on_unauthorised(response, result).await
    }

    /// Replace the JWT payload and attach the re-issued access token.
    ///
    /// # Errors
    ///
    /// A general error on API 1.0, for a null payload or without a current
    /// access token; [`Error::Unauthorised`] (after clearing cookies) if the
    /// session is gone.
    pub async fn update_jwt_payload<R>(&mut self, jwt_payload: Value, response: &mut R) -> Result<()>
    where
        R: SessionResponse + ?Sized,
    {
        let access_token = self
            .access_token
            .clone()
            .ok_or_else(|| Error::General("session has no access token to regenerate".to_string()))?;

        let result = self
            .functions
            .regenerate_session(&access_token, jwt_payload)
            .await;
        let regenerated = self.clear_on_unauthorised(response, result).await?;

        self.jwt_payload = regenerated.session.user_data_in_jwt;
        if let Some(token) = regenerated.access_token {
            cookies::attach_access_token(response, &token, &self.functions.config().cookies);
            self.access_token = Some(token.token);
        }
        Ok(())
    }
}
