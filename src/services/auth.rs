use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{generate_jwt, generate_reset_token, hash_password, hash_reset_token, verify_password, Claims};
use crate::database::models::User;
use crate::error::ApiError;
use crate::mail::EmailMessage;
use crate::state::AppState;
use crate::types::Role;
use crate::validation::{check_email, check_password, Violations, NAME_MAX};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDetailsInput {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordInput {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForgotPasswordInput {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResetPasswordInput {
    pub password: Option<String>,
}

/// A user together with the freshly signed session token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

pub struct AuthService<'a> {
    state: &'a AppState,
}

impl<'a> AuthService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Self-registration is limited to the `user` and `publisher` roles.
    pub async fn register(&self, input: RegisterInput) -> Result<Session, ApiError> {
        let mut v = Violations::default();
        let name = input.name.as_deref().map(str::trim).unwrap_or_default();
        v.check(!name.is_empty(), "Please add a name");
        v.check(name.chars().count() <= NAME_MAX, "Name can not be more than 50 characters");
        check_email(input.email.as_deref(), &mut v);
        check_password(input.password.as_deref(), &mut v);
        let role = match input.role.as_deref() {
            None | Some("") => Role::User,
            Some(raw) => match Role::parse(raw) {
                Some(Role::Admin) | None => {
                    v.add(format!("`{}` is not a valid role", raw));
                    Role::User
                }
                Some(role) => role,
            },
        };
        v.into_result()?;

        let password = input.password.unwrap_or_default();
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: input.email.unwrap_or_default().trim().to_string(),
            role,
            password_hash: hash_password(&password, self.state.config.auth.bcrypt_cost).await?,
            reset_password_token: None,
            reset_password_expire: None,
            created_at: Utc::now(),
        };
        self.state.store.insert_user(&user).await?;
        tracing::info!("Registered user {} as {}", user.id, user.role);
        self.session(user)
    }

    pub async fn login(&self, input: LoginInput) -> Result<Session, ApiError> {
        let (Some(email), Some(password)) = (
            input.email.as_deref().map(str::trim).filter(|e| !e.is_empty()),
            input.password.as_deref().filter(|p| !p.is_empty()),
        ) else {
            return Err(ApiError::bad_request("Please provide an email and password"));
        };

        if let Some(user) = self.state.store.find_user_by_email(email).await? {
            if verify_password(password, &user.password_hash).await {
                return self.session(user);
            }
        }
        tracing::warn!("Failed login for {}", email);
        Err(ApiError::Unauthorized("Invalid credentials".to_string()))
    }

    /// Only `name` and `email` can be changed here.
    pub async fn update_details(&self, actor: &User, input: UpdateDetailsInput) -> Result<User, ApiError> {
        let mut user = actor.clone();
        let mut v = Violations::default();
        if let Some(name) = input.name.as_deref().map(str::trim) {
            v.check(!name.is_empty(), "Please add a name");
            v.check(name.chars().count() <= NAME_MAX, "Name can not be more than 50 characters");
            user.name = name.to_string();
        }
        if input.email.is_some() {
            check_email(input.email.as_deref(), &mut v);
            user.email = input.email.unwrap_or_default().trim().to_string();
        }
        v.into_result()?;

        self.state.store.update_user(&user).await?;
        Ok(user)
    }

    pub async fn update_password(&self, actor: &User, input: UpdatePasswordInput) -> Result<Session, ApiError> {
        let current = input.current_password.unwrap_or_default();
        if !verify_password(&current, &actor.password_hash).await {
            tracing::warn!("User {} supplied a wrong current password", actor.id);
            return Err(ApiError::Unauthorized("Password is incorrect".to_string()));
        }

        let mut v = Violations::default();
        check_password(input.new_password.as_deref(), &mut v);
        v.into_result()?;

        let mut user = actor.clone();
        user.password_hash = hash_password(&input.new_password.unwrap_or_default(), self.state.config.auth.bcrypt_cost).await?;
        self.state.store.update_user(&user).await?;
        self.session(user)
    }

    /// Mails a single-use reset link. Only the token's hash is stored.
    pub async fn forgot_password(&self, input: ForgotPasswordInput, reset_url_base: &str) -> Result<(), ApiError> {
        let email = input.email.as_deref().map(str::trim).unwrap_or_default();
        let mut user = self
            .state
            .store
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| ApiError::not_found("There is no user with that email"))?;

        let token = generate_reset_token(self.state.config.auth.reset_token_ttl);
        user.reset_password_token = Some(token.hash.clone());
        user.reset_password_expire = Some(token.expires_at);
        self.state.store.update_user(&user).await?;

        let reset_url = format!("{}/{}", reset_url_base.trim_end_matches('/'), token.plain);
        let message = EmailMessage {
            to: user.email.clone(),
            subject: "Password reset token".to_string(),
            text: format!(
                "You are receiving this email because you (or someone else) has requested the reset of a password. \
                 Please make a PUT request to: \n\n {}",
                reset_url
            ),
        };

        if let Err(e) = self.state.mailer.send(&message).await {
            user.reset_password_token = None;
            user.reset_password_expire = None;
            self.state.store.update_user(&user).await?;
            return Err(e.into());
        }
        tracing::info!("Reset token mailed to user {}", user.id);
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, input: ResetPasswordInput) -> Result<Session, ApiError> {
        let mut user = self
            .state
            .store
            .find_user_by_reset_token(&hash_reset_token(token))
            .await?
            .ok_or_else(|| ApiError::bad_request("Invalid token"))?;

        let mut v = Violations::default();
        check_password(input.password.as_deref(), &mut v);
        v.into_result()?;

        user.password_hash = hash_password(&input.password.unwrap_or_default(), self.state.config.auth.bcrypt_cost).await?;
        user.reset_password_token = None;
        user.reset_password_expire = None;
        self.state.store.update_user(&user).await?;
        tracing::info!("User {} reset their password", user.id);
        self.session(user)
    }

    fn session(&self, user: User) -> Result<Session, ApiError> {
        let claims = Claims::new(user.id, &self.state.config.auth);
        let token = generate_jwt(&claims, &self.state.config.auth)?;
        Ok(Session { user, token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::validate_jwt;
    use crate::testing::{RecordingMailer, TestContext};
    use axum::http::StatusCode;

    fn register_input(email: &str, role: Option<&str>) -> RegisterInput {
        RegisterInput {
            name: Some("Jane Doe".to_string()),
            email: Some(email.to_string()),
            password: Some("123456".to_string()),
            role: role.map(str::to_string),
        }
    }

    fn login_input(email: &str, password: &str) -> LoginInput {
        LoginInput { email: Some(email.to_string()), password: Some(password.to_string()) }
    }

    #[tokio::test]
    async fn register_then_login() {
        let ctx = TestContext::new();
        let service = AuthService::new(&ctx.state);

        let session = service.register(register_input("jane@example.com", Some("publisher"))).await.unwrap();
        assert_eq!(session.user.role, Role::Publisher);
        let claims = validate_jwt(&session.token, &ctx.state.config.auth).unwrap();
        assert_eq!(claims.sub, session.user.id);

        let login = service.login(login_input("jane@example.com", "123456")).await.unwrap();
        assert_eq!(login.user.id, session.user.id);

        let wrong = service.login(login_input("jane@example.com", "nope")).await.unwrap_err();
        assert_eq!(wrong.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.message(), "Invalid credentials");

        let missing = service.login(LoginInput::default()).await.unwrap_err();
        assert_eq!(missing.message(), "Please provide an email and password");
    }

    #[tokio::test]
    async fn register_rejects_admin_and_duplicates() {
        let ctx = TestContext::new();
        let service = AuthService::new(&ctx.state);

        let admin = service.register(register_input("root@example.com", Some("admin"))).await.unwrap_err();
        assert_eq!(admin.status_code(), StatusCode::BAD_REQUEST);

        service.register(register_input("jane@example.com", None)).await.unwrap();
        let dup = service.register(register_input("jane@example.com", None)).await.unwrap_err();
        assert_eq!(dup.message(), "Duplicate field value entered");

        let invalid = service
            .register(RegisterInput { password: Some("123".to_string()), ..register_input("bad", None) })
            .await
            .unwrap_err();
        assert_eq!(invalid.message(), "Please add a valid email, Password must be at least 6 characters");
    }

    #[tokio::test]
    async fn update_password_requires_current() {
        let ctx = TestContext::new();
        let service = AuthService::new(&ctx.state);
        let session = service.register(register_input("jane@example.com", None)).await.unwrap();

        let wrong = service
            .update_password(
                &session.user,
                UpdatePasswordInput { current_password: Some("bad".into()), new_password: Some("abcdef".into()) },
            )
            .await
            .unwrap_err();
        assert_eq!(wrong.message(), "Password is incorrect");

        service
            .update_password(
                &session.user,
                UpdatePasswordInput { current_password: Some("123456".into()), new_password: Some("abcdef".into()) },
            )
            .await
            .unwrap();
        assert!(service.login(login_input("jane@example.com", "abcdef")).await.is_ok());
    }

    #[tokio::test]
    async fn forgot_and_reset_password() {
        let ctx = TestContext::new();
        let service = AuthService::new(&ctx.state);
        service.register(register_input("jane@example.com", None)).await.unwrap();

        let unknown = service
            .forgot_password(ForgotPasswordInput { email: Some("who@example.com".into()) }, "http://x/reset")
            .await
            .unwrap_err();
        assert_eq!(unknown.status_code(), StatusCode::NOT_FOUND);

        service
            .forgot_password(ForgotPasswordInput { email: Some("jane@example.com".into()) }, "http://x/reset")
            .await
            .unwrap();
        let message = ctx.mailer.sent.lock().unwrap().pop().unwrap();
        assert_eq!(message.to, "jane@example.com");
        let token = message.text.rsplit('/').next().unwrap().trim().to_string();
        assert_eq!(token.len(), 40);

        let session = service
            .reset_password(&token, ResetPasswordInput { password: Some("newpass".into()) })
            .await
            .unwrap();
        assert!(session.user.reset_password_token.is_none());
        assert!(service.login(login_input("jane@example.com", "newpass")).await.is_ok());

        let reused = service
            .reset_password(&token, ResetPasswordInput { password: Some("again1".into()) })
            .await
            .unwrap_err();
        assert_eq!(reused.message(), "Invalid token");
    }

    #[tokio::test]
    async fn mail_failure_clears_reset_token() {
        let ctx = TestContext::with_mailer(RecordingMailer { fail: true, ..RecordingMailer::default() });
        let service = AuthService::new(&ctx.state);
        service.register(register_input("jane@example.com", None)).await.unwrap();

        let err = service
            .forgot_password(ForgotPasswordInput { email: Some("jane@example.com".into()) }, "http://x/reset")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Email could not be sent");

        let user = ctx.state.store.find_user_by_email("jane@example.com").await.unwrap().unwrap();
        assert!(user.reset_password_token.is_none());
        assert!(user.reset_password_expire.is_none());
    }
}
