use std::sync::Arc;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;
use brandbot_common::models::{LoginUser, RegisterUser, User, UserProfile};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::SessionStore;
use crate::repositories::{CompanyRepository, UserRepository};
use crate::Error;

const DUPLICATE_EMAIL: &str = "User with this email already exists";

/// A user paired with the session token issued for them.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    pub user: UserProfile,
    #[serde(skip_serializing)]
    pub token: String,
}

pub struct AccountService {
    users: Arc<dyn UserRepository>,
    companies: Arc<dyn CompanyRepository>,
    sessions: Arc<SessionStore>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        companies: Arc<dyn CompanyRepository>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self { users, companies, sessions }
    }

    /// Creates the account and logs it in.
    pub async fn register(&self, req: RegisterUser) -> Result<AuthenticatedUser, Error> {
        let email = req.email.trim().to_string();
        let username = req.username.trim().to_string();
        if email.is_empty() || !email.contains('@') {
            return Err(Error::Validation("A valid email is required".into()));
        }
        if username.is_empty() {
            return Err(Error::Validation("Username is required".into()));
        }
        if req.password.is_empty() {
            return Err(Error::Validation("Password is required".into()));
        }

        if self.users.get_user_by_email(&email).await?.is_some() {
            return Err(Error::Validation(DUPLICATE_EMAIL.into()));
        }

        let company_id = match req.company_id.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                let id = Uuid::parse_str(raw)
                    .map_err(|_| Error::Validation("Invalid company ID format".into()))?;
                if self.companies.get_company(id).await?.is_none() {
                    return Err(Error::Validation("Company not found".into()));
                }
                Some(id)
            }
            _ => None,
        };

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email,
            username,
            password_hash: hash_password(&req.password)?,
            first_name: req.first_name.unwrap_or_default(),
            last_name: req.last_name.unwrap_or_default(),
            company_id,
            profile_picture_url: None,
            created_at: now,
            updated_at: now,
        };

        match self.users.create_user(&user).await {
            Ok(()) => {}
            // Lost a race with a concurrent registration of the same email.
            Err(Error::Conflict(_)) => return Err(Error::Validation(DUPLICATE_EMAIL.into())),
            Err(e) => return Err(e),
        }
        info!("Registered user={} company={:?}", user.id, user.company_id);

        Ok(self.open_session(&user))
    }

    pub async fn login(&self, req: LoginUser) -> Result<AuthenticatedUser, Error> {
        let invalid = || Error::Auth("Invalid credentials".into());

        let user = self
            .users
            .get_user_by_email(req.email.trim())
            .await?
            .ok_or_else(invalid)?;
        if !verify_password(&req.password, &user.password_hash)? {
            warn!("Failed login for user={}", user.id);
            return Err(invalid());
        }

        info!("User={} logged in", user.id);
        Ok(self.open_session(&user))
    }

    /// Unknown tokens are ignored.
    pub fn logout(&self, token: &str) {
        if self.sessions.remove(token) {
            info!("Session closed");
        }
    }

    pub async fn current_user(&self, token: Option<&str>) -> Result<User, Error> {
        let not_authenticated = || Error::Auth("Not authenticated".into());

        let session = token
            .and_then(|t| self.sessions.get(t))
            .ok_or_else(not_authenticated)?;
        match self.users.get_user(session.user_id).await? {
            Some(user) => Ok(user),
            None => {
                // The account went away with its company.
                self.sessions.remove(&session.token);
                Err(not_authenticated())
            }
        }
    }

    /// Ends every session of `user_id`.
    pub fn end_sessions_for(&self, user_id: Uuid) {
        self.sessions.remove_user(user_id);
    }

    fn open_session(&self, user: &User) -> AuthenticatedUser {
        let session = self.sessions.create(user.id);
        AuthenticatedUser {
            user: UserProfile::from(user),
            token: session.token,
        }
    }
}
