//! Request/response level session flows.

use serde_json::Value;
use tracing::{debug, instrument};

use crate::{
    error::{Error, Result},
    session::{Session, SessionFunctions},
};

use super::{
    cookies::{self, ACCESS_TOKEN_COOKIE, ID_REFRESH_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE},
    SessionRequest, SessionResponse,
};

impl SessionFunctions {
    /// Expire every session cookie on `response`.
    ///
    /// # Errors
    ///
    /// Returns an error if the handshake snapshot is not loaded and cannot be fetched.
    pub async fn clear_session_cookies<R>(&self, response: &mut R) -> Result<()>
    where
        R: SessionResponse + ?Sized,
    {
        let handshake = self.handshake().get().await?;
        cookies::clear_session(response, &handshake, &self.config().cookies);
        Ok(())
    }

    async fn clear_and_fail<R, T>(&self, response: &mut R, err: Error) -> Result<T>
    where
        R: SessionResponse + ?Sized,
    {
        debug!("clearing session cookies: {err}");
        self.clear_session_cookies(response).await?;
        Err(err)
    }

    /// Create a session and attach its tokens to `response`.
    ///
    /// # Errors
    ///
    /// See [`SessionFunctions::create_new_session`].
    #[instrument(skip(self, response, jwt_payload, session_data))]
    pub async fn create_new_session_in_response<R>(
        &self,
        response: &mut R,
        user_id: &str,
        jwt_payload: Value,
        session_data: Value,
    ) -> Result<Session>
    where
        R: SessionResponse + ?Sized,
    {
        let tokens = self
            .create_new_session(user_id, jwt_payload, session_data)
            .await?;
        cookies::attach_session(response, &tokens, &self.config().cookies);
        Ok(Session::new(
            self.clone(),
            tokens.session,
            Some(tokens.access_token.token),
        ))
    }

    /// Verify the session carried by `request`.
    ///
    /// A rotated access token is attached to `response`. When the session is
    /// gone its cookies are cleared before the error is returned.
    ///
    /// # Errors
    ///
    /// - [`Error::TryRefreshToken`] when the access token cookie is missing or not accepted.
    /// - [`Error::Unauthorised`] when the session no longer exists.
    #[instrument(skip(self, request, response))]
    pub async fn get_session_from_request<Q, R>(
        &self,
        request: &Q,
        response: &mut R,
        do_anti_csrf_check: bool,
    ) -> Result<Session>
    where
        Q: SessionRequest + ?Sized,
        R: SessionResponse + ?Sized,
    {
        cookies::save_frontend_info(request, self.querier().device_info());

        let Some(access_token) = request.cookie(ACCESS_TOKEN_COOKIE) else {
            return Err(Error::TryRefreshToken(
                "access token missing in cookies".to_string(),
            ));
        };
        let id_refresh_token = request.cookie(ID_REFRESH_TOKEN_COOKIE);
        let anti_csrf_token = cookies::anti_csrf_header(request);

        let verified = match self
            .get_session(
                &access_token,
                anti_csrf_token.as_deref(),
                do_anti_csrf_check,
                id_refresh_token.as_deref(),
            )
            .await
        {
            Ok(verified) => verified,
            Err(err) if err.is_unauthorised() => return self.clear_and_fail(response, err).await,
            Err(err) => return Err(err),
        };

        let current_token = match verified.access_token {
            Some(rotated) => {
                cookies::attach_access_token(response, &rotated, &self.config().cookies);
                rotated.token
            }
            None => access_token,
        };

        Ok(Session::new(
            self.clone(),
            verified.session,
            Some(current_token),
        ))
    }

    /// Rotate the tokens carried by `request`.
    ///
    /// # Errors
    ///
    /// - [`Error::Unauthorised`] when the refresh cookie is missing or the session is gone.
    /// - [`Error::TokenTheftDetected`] when the refresh token was already used.
    ///
    /// Cookies are cleared in all three cases.
    #[instrument(skip(self, request, response))]
    pub async fn refresh_session_from_request<Q, R>(
        &self,
        request: &Q,
        response: &mut R,
    ) -> Result<Session>
    where
        Q: SessionRequest + ?Sized,
        R: SessionResponse + ?Sized,
    {
        cookies::save_frontend_info(request, self.querier().device_info());

        let Some(refresh_token) = request.cookie(REFRESH_TOKEN_COOKIE) else {
            let err = Error::Unauthorised(
                "missing auth tokens in cookies, check the refresh API path in your frontend and core config"
                    .to_string(),
            );
            return self.clear_and_fail(response, err).await;
        };

        match self.refresh_session(&refresh_token).await {
            Ok(tokens) => {
                cookies::attach_session(response, &tokens, &self.config().cookies);
                Ok(Session::new(
                    self.clone(),
                    tokens.session,
                    Some(tokens.access_token.token),
                ))
            }
            Err(err) if err.is_unauthorised() || err.is_token_theft_detected() => {
                self.clear_and_fail(response, err).await
            }
            Err(err) => Err(err),
        }
    }

    /// Headers for an `OPTIONS` preflight on session routes.
    pub fn set_relevant_headers_for_options_api<R>(&self, response: &mut R)
    where
        R: SessionResponse + ?Sized,
    {
        cookies::set_options_api_headers(response);
    }
}
