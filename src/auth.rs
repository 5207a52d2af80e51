//! Login and signup.
//!
//! Both operations run on the auth surface: a 401 there is
//! [`Error::InvalidCredentials`], never a session teardown, so a failed
//! login cannot bounce the caller into the expired-session flow. On
//! success the received triple is published through the session store
//! (and mirrored to durable storage) before the call returns.

use serde::{Deserialize, Serialize};

use crate::client::{ApiClient, Scope};
use crate::error::Error;
use crate::types::User;

#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    /// Display name for the new account.
    pub name: String,
}

/// Session triple returned by the auth endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

impl ApiClient {
    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for locally rejected input;
    /// [`Error::InvalidCredentials`] when the backend refuses the pair;
    /// [`Error::Storage`] when the session was established but its
    /// durable mirror could not be written (the in-memory session is
    /// live regardless).
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, Error> {
        validate_credentials(email, password)?;
        let auth: AuthSession = self
            .post_json(
                "auth/login",
                &LoginRequest {
                    email: email.to_string(),
                    password: password.to_string(),
                },
                Scope::Auth,
            )
            .await?;
        self.establish(&auth)?;
        Ok(auth)
    }

    /// Create an account and sign in as it.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for locally rejected input;
    /// [`Error::Conflict`] when the email is already registered;
    /// otherwise as [`login`](Self::login).
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthSession, Error> {
        validate_credentials(email, password)?;
        if name.trim().is_empty() {
            return Err(Error::Validation("display name must not be empty".into()));
        }
        let auth: AuthSession = self
            .post_json(
                "auth/signup",
                &SignupRequest {
                    email: email.to_string(),
                    password: password.to_string(),
                    name: name.to_string(),
                },
                Scope::Auth,
            )
            .await?;
        self.establish(&auth)?;
        Ok(auth)
    }

    fn establish(&self, auth: &AuthSession) -> Result<(), Error> {
        self.session().login(
            auth.access_token.clone(),
            auth.refresh_token.clone(),
            auth.user.clone(),
        )
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<(), Error> {
    if email.trim().is_empty() {
        return Err(Error::Validation("email must not be empty".into()));
    }
    if !email.contains('@') {
        return Err(Error::Validation("email must contain '@'".into()));
    }
    if password.is_empty() {
        return Err(Error::Validation("password must not be empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;

    #[test]
    fn rejects_blank_credentials() {
        assert!(matches!(
            validate_credentials("", "pw"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            validate_credentials("   ", "pw"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            validate_credentials("not-an-email", "pw"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            validate_credentials("a@b.com", ""),
            Err(Error::Validation(_))
        ));
        assert!(validate_credentials("a@b.com", "pw").is_ok());
    }

    #[test]
    fn decodes_auth_triple() {
        let json = r#"{
            "accessToken": "acc",
            "refreshToken": "ref",
            "user": {"id": 5, "email": "a@b.com", "name": "Ami"}
        }"#;
        let auth: AuthSession = serde_json::from_str(json).unwrap();
        assert_eq!(auth.access_token, "acc");
        assert_eq!(auth.refresh_token, "ref");
        assert_eq!(auth.user.id, UserId(5));
    }

    #[test]
    fn request_wire_shapes() {
        let login = serde_json::to_string(&LoginRequest {
            email: "a@b.com".into(),
            password: "pw".into(),
        })
        .unwrap();
        assert_eq!(login, r#"{"email":"a@b.com","password":"pw"}"#);

        let signup = serde_json::to_string(&SignupRequest {
            email: "a@b.com".into(),
            password: "pw".into(),
            name: "Ami".into(),
        })
        .unwrap();
        assert_eq!(signup, r#"{"email":"a@b.com","password":"pw","name":"Ami"}"#);
    }
}
