//! User service.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use chrono::Utc;
use sea_orm::{IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use validator::Validate;
use vidtube_common::{absolutize_url, AppError, AppResult, Config, IdGenerator};
use vidtube_db::{
    entities::user,
    repositories::{RefreshTokenRepository, UserRepository, VideoRepository},
};

/// Avatar assigned to every new account.
pub const DEFAULT_AVATAR: &str = "/uploads/avatars/default-avatar.png";

/// Input for registering a new account.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 3, max = 30))]
    pub username: String,

    #[validate(length(min = 6, max = 128))]
    pub password: String,

    #[validate(length(min = 1, max = 50))]
    pub first_name: String,

    #[validate(length(min = 1, max = 50))]
    pub last_name: String,

    #[serde(default)]
    pub is_creator: bool,
}

/// Input for updating the caller's profile. Absent fields are left alone.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileInput {
    #[validate(length(min = 1, max = 50))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 50))]
    pub last_name: Option<String>,

    #[validate(length(min = 3, max = 30))]
    pub username: Option<String>,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    /// Ignored for accounts that are not creators.
    #[validate(length(min = 1, max = 100))]
    pub channel_name: Option<String>,

    #[validate(length(max = 1024))]
    pub profile_picture: Option<String>,

    #[validate(length(max = 1024))]
    pub banner_image: Option<String>,
}

impl RegisterInput {
    /// Trim text fields and lowercase the email. The password is kept as typed.
    fn normalized(mut self) -> Self {
        self.email = self.email.trim().to_lowercase();
        self.username = self.username.trim().to_string();
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        self
    }
}

impl UpdateProfileInput {
    fn normalized(mut self) -> Self {
        let trim = |field: Option<String>| field.map(|v| v.trim().to_string());
        self.first_name = trim(self.first_name);
        self.last_name = trim(self.last_name);
        self.username = trim(self.username);
        self.description = trim(self.description);
        self.channel_name = trim(self.channel_name);
        self.profile_picture = trim(self.profile_picture);
        self.banner_image = trim(self.banner_image);
        self
    }
}

/// The caller's own account, including private fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: String,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: Option<String>,
    pub banner_image: Option<String>,
    pub description: Option<String>,
    pub is_creator: bool,
    pub verified: bool,
    pub channel_name: Option<String>,
    pub subscribers: i32,
    pub total_views: i64,
    pub created_at: String,
}

/// Public profile of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: Option<String>,
    pub banner_image: Option<String>,
    pub description: Option<String>,
    pub is_creator: bool,
    pub verified: bool,
    pub channel_name: Option<String>,
    pub subscribers: i32,
    pub total_views: i64,
    pub video_count: u64,
    pub created_at: String,
}

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    token_repo: RefreshTokenRepository,
    video_repo: VideoRepository,
    id_gen: IdGenerator,
    server_url: String,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub fn new(
        user_repo: UserRepository,
        token_repo: RefreshTokenRepository,
        video_repo: VideoRepository,
        config: &Config,
    ) -> Self {
        Self {
            user_repo,
            token_repo,
            video_repo,
            id_gen: IdGenerator::new(),
            server_url: config.server.url.clone(),
        }
    }

    /// Register a new account.
    pub async fn register(&self, input: RegisterInput) -> AppResult<AccountView> {
        let input = input.normalized();
        input.validate()?;

        let email = input.email;
        let username = input.username;

        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
        if self.user_repo.find_by_username(&username).await?.is_some() {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }

        let password_hash = hash_password(&input.password)?;
        let first_name = input.first_name;
        let last_name = input.last_name;
        let channel_name = input
            .is_creator
            .then(|| format!("{first_name} {last_name}"));

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            email: Set(email),
            username: Set(username),
            password: Set(password_hash),
            first_name: Set(first_name),
            last_name: Set(last_name),
            profile_picture: Set(Some(DEFAULT_AVATAR.to_string())),
            banner_image: Set(None),
            description: Set(None),
            is_creator: Set(input.is_creator),
            verified: Set(false),
            channel_name: Set(channel_name),
            subscribers: Set(0),
            total_views: Set(0),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let user = self.user_repo.create(model).await?;
        tracing::info!(user_id = %user.id, is_creator = user.is_creator, "User registered");

        Ok(self.account(&user))
    }

    /// Public profile of a user with their public video count.
    pub async fn get_profile(&self, user_id: &str) -> AppResult<ProfileView> {
        let user = self.user_repo.get_by_id(user_id).await?;
        let video_count = self.video_repo.count_public_by_user(&user.id).await?;

        Ok(ProfileView {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            profile_picture: self.media(user.profile_picture.as_deref()),
            banner_image: self.media(user.banner_image.as_deref()),
            description: user.description,
            is_creator: user.is_creator,
            verified: user.verified,
            channel_name: user.channel_name,
            subscribers: user.subscribers,
            total_views: user.total_views,
            video_count,
            created_at: user.created_at.to_rfc3339(),
        })
    }

    /// Update the caller's profile.
    pub async fn update_profile(
        &self,
        user_id: &str,
        input: UpdateProfileInput,
    ) -> AppResult<AccountView> {
        let input = input.normalized();
        input.validate()?;

        let user = self.user_repo.get_by_id(user_id).await?;

        if let Some(username) = &input.username {
            if username != &user.username {
                if let Some(other) = self.user_repo.find_by_username(username).await? {
                    if other.id != user.id {
                        return Err(AppError::Conflict("Username already taken".to_string()));
                    }
                }
            }
        }

        let is_creator = user.is_creator;
        let mut active = user.into_active_model();

        if let Some(first_name) = input.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = input.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(username) = input.username {
            active.username = Set(username);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(channel_name) = input.channel_name.filter(|_| is_creator) {
            active.channel_name = Set(Some(channel_name));
        }
        if let Some(profile_picture) = input.profile_picture {
            active.profile_picture = Set(Some(profile_picture));
        }
        if let Some(banner_image) = input.banner_image {
            active.banner_image = Set(Some(banner_image));
        }
        active.updated_at = Set(Some(Utc::now().into()));

        let updated = self.user_repo.update(active).await?;
        Ok(self.account(&updated))
    }

    /// Resolve a bearer token to its user.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        let token = self
            .token_repo
            .find_valid(token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        self.user_repo
            .find_by_id(&token.user_id)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// The caller's account as returned by `/auth/me`.
    #[must_use]
    pub fn account(&self, user: &user::Model) -> AccountView {
        AccountView {
            id: user.id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            profile_picture: self.media(user.profile_picture.as_deref()),
            banner_image: self.media(user.banner_image.as_deref()),
            description: user.description.clone(),
            is_creator: user.is_creator,
            verified: user.verified,
            channel_name: user.channel_name.clone(),
            subscribers: user.subscribers,
            total_views: user.total_views,
            created_at: user.created_at.to_rfc3339(),
        }
    }

    fn media(&self, path: Option<&str>) -> Option<String> {
        path.map(|p| absolutize_url(&self.server_url, p))
    }
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use vidtube_db::test_utils::transaction_log;
    use crate::services::video::tests::{create_test_user, empty_db, num_items_row, test_config};
    use argon2::{PasswordHash, PasswordVerifier};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;
    use vidtube_db::entities::refresh_token;

    fn build_service(
        user_db: Arc<DatabaseConnection>,
        token_db: Arc<DatabaseConnection>,
        video_db: Arc<DatabaseConnection>,
    ) -> UserService {
        UserService::new(
            UserRepository::new(user_db),
            RefreshTokenRepository::new(token_db),
            VideoRepository::new(video_db),
            &test_config(),
        )
    }

    fn register_input(is_creator: bool) -> RegisterInput {
        RegisterInput {
            email: "Ada@Example.com".to_string(),
            username: "ada".to_string(),
            password: "secret123".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            is_creator,
        }
    }

    #[test]
    fn test_hash_password_verifies() {
        let hash = hash_password("secret123").unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();

        assert!(Argon2::default()
            .verify_password(b"secret123", &parsed)
            .is_ok());
        assert!(Argon2::default().verify_password(b"wrong", &parsed).is_err());
    }

    #[tokio::test]
    async fn test_register_validation_error() {
        let service = build_service(empty_db(), empty_db(), empty_db());
        let mut input = register_input(false);
        input.email = "not-an-email".to_string();

        let result = service.register(input).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_register_short_password() {
        let service = build_service(empty_db(), empty_db(), empty_db());
        let mut input = register_input(false);
        input.password = "12345".to_string();

        let result = service.register(input).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_username_short_after_trimming() {
        let service = build_service(empty_db(), empty_db(), empty_db());
        let mut input = register_input(false);
        input.username = "  ab  ".to_string();

        let result = service.register(input).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_blank_first_name() {
        let service = build_service(empty_db(), empty_db(), empty_db());
        let mut input = register_input(false);
        input.first_name = "   ".to_string();

        let result = service.register(input).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_register_email_taken() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("existing", false)]])
                .into_connection(),
        );

        let service = build_service(user_db, empty_db(), empty_db());
        let result = service.register(register_input(false)).await;

        match result {
            Err(AppError::Conflict(msg)) => assert!(msg.contains("Email")),
            _ => panic!("Expected Conflict error"),
        }
    }

    #[tokio::test]
    async fn test_register_username_taken() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .append_query_results([[create_test_user("ada", false)]])
                .into_connection(),
        );

        let service = build_service(user_db, empty_db(), empty_db());
        let result = service.register(register_input(false)).await;

        match result {
            Err(AppError::Conflict(msg)) => assert!(msg.contains("Username")),
            _ => panic!("Expected Conflict error"),
        }
    }

    #[tokio::test]
    async fn test_register_creator_gets_channel_name() {
        let mut created = create_test_user("ada", true);
        created.channel_name = Some("Ada Lovelace".to_string());

        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .append_query_results([Vec::<user::Model>::new()])
                .append_query_results([[created]])
                .into_connection(),
        );

        let service = build_service(user_db.clone(), empty_db(), empty_db());
        let account = service.register(register_input(true)).await.unwrap();

        assert_eq!(account.channel_name.as_deref(), Some("Ada Lovelace"));

        drop(service);
        let log = transaction_log(user_db);
        assert!(log.contains("ada@example.com"), "{log}");
        assert!(log.contains(DEFAULT_AVATAR), "{log}");
        assert!(log.contains("$argon2"), "{log}");
        assert!(!log.contains("secret123"), "{log}");
    }

    #[tokio::test]
    async fn test_get_profile_includes_video_count() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("ada", true)]])
                .into_connection(),
        );
        let video_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[num_items_row(7)]])
                .into_connection(),
        );

        let service = build_service(user_db, empty_db(), video_db);
        let profile = service.get_profile("ada").await.unwrap();

        assert_eq!(profile.video_count, 7);
        assert_eq!(
            profile.profile_picture.as_deref(),
            Some("http://localhost:5001/uploads/avatars/default-avatar.png")
        );
    }

    #[tokio::test]
    async fn test_update_profile_username_taken() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("ada", false)]])
                .append_query_results([[create_test_user("grace", false)]])
                .into_connection(),
        );

        let service = build_service(user_db, empty_db(), empty_db());
        let input = UpdateProfileInput {
            username: Some("grace".to_string()),
            ..Default::default()
        };

        let result = service.update_profile("ada", input).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_profile_trims_username_before_conflict_check() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("ada", false)]])
                .append_query_results([[create_test_user("grace", false)]])
                .into_connection(),
        );

        let service = build_service(user_db.clone(), empty_db(), empty_db());
        let input = UpdateProfileInput {
            username: Some(" grace ".to_string()),
            ..Default::default()
        };

        let result = service.update_profile("ada", input).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        drop(service);
        let log = transaction_log(user_db);
        assert!(log.contains("\"grace\""), "{log}");
        assert!(!log.contains(" grace "), "{log}");
    }

    #[tokio::test]
    async fn test_update_profile_rejects_blank_username() {
        let service = build_service(empty_db(), empty_db(), empty_db());
        let input = UpdateProfileInput {
            username: Some("  a ".to_string()),
            ..Default::default()
        };

        let result = service.update_profile("ada", input).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_profile_ignores_channel_name_for_viewers() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("ada", false)]])
                .append_query_results([[create_test_user("ada", false)]])
                .into_connection(),
        );

        let service = build_service(user_db.clone(), empty_db(), empty_db());
        let input = UpdateProfileInput {
            channel_name: Some("Sneaky".to_string()),
            description: Some("Hello".to_string()),
            ..Default::default()
        };

        service.update_profile("ada", input).await.unwrap();

        drop(service);
        let log = transaction_log(user_db);
        assert!(!log.contains("Sneaky"), "{log}");
        assert!(log.contains("Hello"), "{log}");
    }

    #[tokio::test]
    async fn test_authenticate_by_token_unknown_token() {
        let token_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<refresh_token::Model>::new()])
                .into_connection(),
        );

        let service = build_service(empty_db(), token_db, empty_db());
        let result = service.authenticate_by_token("bogus").await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_authenticate_by_token_resolves_user() {
        let token = refresh_token::Model {
            id: "t1".to_string(),
            token: "valid".to_string(),
            user_id: "ada".to_string(),
            expires_at: (Utc::now() + chrono::Duration::days(1)).into(),
            created_at: Utc::now().into(),
        };
        let token_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[token]])
                .into_connection(),
        );
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("ada", false)]])
                .into_connection(),
        );

        let service = build_service(user_db, token_db, empty_db());
        let user = service.authenticate_by_token("valid").await.unwrap();

        assert_eq!(user.id, "ada");
    }
}
