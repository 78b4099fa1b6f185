use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    auth::{Role, hash_password},
    error::StoreError,
    models::{NewUser, User, UserUpdate},
};

/// IdentityStore
///
/// Read and write access to accounts for the login collaborator and for handlers downstream of
/// the gateway. The gateway itself never calls the store: a verified token is enough.
///
/// `Ok(None)` always means "no such account". Backend faults are `Err` and must never be read
/// as a missing account or a taken email.
///
/// **Send + Sync + async_trait** are required so the trait object can live in the shared
/// application state.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
    /// Inserts a new account with the role carried by `user`. A taken email is
    /// [`StoreError::EmailTaken`].
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
    /// Applies `update` to the account `id`. `Ok(None)` when the account does not exist; moving
    /// to an email another account holds is [`StoreError::EmailTaken`].
    async fn update_user(&self, id: &str, update: UserUpdate) -> Result<Option<User>, StoreError>;
}

pub type IdentityStoreState = Arc<dyn IdentityStore>;

// --- Postgres ---

/// Raw `users` row. The role column is free text and validated on the way out.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    name: String,
    role: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row.role.parse::<Role>().map_err(|e| StoreError::CorruptRecord {
            id: row.id.clone(),
            reason: e.to_string(),
        })?;

        Ok(User {
            id: row.id,
            email: row.email,
            name: row.name,
            role,
            password_hash: row.password_hash,
            created_at: row.created_at,
        })
    }
}

const USER_COLUMNS: &str = "id, email, name, role, password_hash, created_at";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// PostgresIdentityStore
///
/// The production store, backed by the `users` table.
pub struct PostgresIdentityStore {
    pool: PgPool,
}

impl PostgresIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PostgresIdentityStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(User::try_from)
        .collect()
    }

    /// ON CONFLICT DO NOTHING turns a duplicate email into "no row returned".
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (id, email, name, role, password_hash, created_at) \
             VALUES ($1, $2, $3, $4, $5, NOW()) \
             ON CONFLICT (email) DO NOTHING \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => User::try_from(row),
            None => Err(StoreError::EmailTaken),
        }
    }

    async fn update_user(&self, id: &str, update: UserUpdate) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET \
             email = COALESCE($2, email), \
             name = COALESCE($3, name), \
             role = COALESCE($4, role), \
             password_hash = COALESCE($5, password_hash) \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(update.email)
        .bind(update.name)
        .bind(update.role.map(|role| role.as_str()))
        .bind(update.password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::EmailTaken
            } else {
                StoreError::Database(e)
            }
        })?;

        row.map(User::try_from).transpose()
    }
}

// --- In-memory ---

/// Password shared by the demo accounts of [`InMemoryIdentityStore::seeded`].
pub const DEMO_PASSWORD: &str = "demo123";

/// InMemoryIdentityStore
///
/// Process-local store used by tests and by local runs without a database.
#[derive(Default)]
pub struct InMemoryIdentityStore {
    users: RwLock<Vec<User>>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            users: RwLock::new(users),
        }
    }

    /// One account per role, all using [`DEMO_PASSWORD`].
    pub fn seeded() -> Result<Self, argon2::password_hash::Error> {
        let password_hash = hash_password(DEMO_PASSWORD)?;
        let demo = [
            ("admin@example.com", "System Administrator", Role::Admin),
            ("support@example.com", "Support Staff", Role::Support),
            ("client@example.com", "John Client", Role::Client),
        ];

        let users = demo
            .into_iter()
            .map(|(email, name, role)| User {
                id: Uuid::new_v4().to_string(),
                email: email.to_string(),
                name: name.to_string(),
                role,
                password_hash: password_hash.clone(),
                created_at: Utc::now(),
            })
            .collect();

        Ok(Self::with_users(users))
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users = self.users.read().await.clone();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::EmailTaken);
        }

        let created = User {
            id: Uuid::new_v4().to_string(),
            email: user.email,
            name: user.name,
            role: user.role,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn update_user(&self, id: &str, update: UserUpdate) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        if let Some(email) = &update.email {
            if users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::EmailTaken);
            }
        }

        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(password_hash) = update.password_hash {
            user.password_hash = password_hash;
        }
        Ok(Some(user.clone()))
    }
}
