//! User Storage
//! Mission: Persist user accounts with SQLite, keyed by email

use crate::auth::models::{Role, User};
use anyhow::{Context, Result};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::{info, warn};
use uuid::Uuid;

/// User storage with SQLite backend
pub struct UserStore {
    db_path: String,
}

impl UserStore {
    /// Create a new user store and initialize database
    pub fn new(db_path: &str) -> Result<Self> {
        let store = Self {
            db_path: db_path.to_string(),
        };
        store.init_db()?;
        Ok(store)
    }

    /// Initialize database schema
    fn init_db(&self) -> Result<()> {
        let conn = Connection::open(&self.db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        self.create_default_admin(&conn)?;

        Ok(())
    }

    /// Seed an admin account on first start so /admin endpoints are usable.
    fn create_default_admin(&self, conn: &Connection) -> Result<()> {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE role = 'admin'",
                [],
                |row| row.get(0),
            )
            .context("Failed to check for admin users")?;

        if count == 0 {
            let password_hash =
                hash("Admin123!", DEFAULT_COST).context("Failed to hash password")?;

            conn.execute(
                "INSERT INTO users (id, email, password_hash, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    Uuid::new_v4().to_string(),
                    "admin@authgate.local",
                    password_hash,
                    Role::Admin.as_str(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("Failed to insert admin user")?;

            info!("🔐 Default admin user created (email: admin@authgate.local)");
            warn!("⚠️  CHANGE DEFAULT ADMIN PASSWORD IN PRODUCTION!");
        }

        Ok(())
    }

    /// Get user by email
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = Connection::open(&self.db_path)?;

        let mut stmt = conn.prepare(
            "SELECT id, email, password_hash, role, created_at
             FROM users WHERE email = ?1",
        )?;

        let user_result = stmt.query_row(params![email], |row| {
            let id_str: String = row.get(0)?;
            let role_str: String = row.get(3)?;
            Ok(User {
                id: Uuid::parse_str(&id_str).unwrap_or_default(),
                email: row.get(1)?,
                password_hash: row.get(2)?,
                role: Role::from_str(&role_str).unwrap_or(Role::User),
                created_at: row.get(4)?,
            })
        });

        match user_result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Verify email and password
    pub fn verify_password(&self, email: &str, password: &str) -> Result<bool> {
        match self.get_user_by_email(email)? {
            Some(user) => {
                let valid =
                    verify(password, &user.password_hash).context("Failed to verify password")?;
                Ok(valid)
            }
            None => Ok(false),
        }
    }

    /// Create a new user. The UNIQUE constraint on email is the backstop
    /// against concurrent duplicate registration.
    pub fn create_user(&self, email: &str, password: &str, role: Role) -> Result<User> {
        let password_hash = hash(password, DEFAULT_COST).context("Failed to hash password")?;

        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash,
            role,
            created_at: Utc::now().to_rfc3339(),
        };

        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "INSERT INTO users (id, email, password_hash, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id.to_string(),
                user.email,
                user.password_hash,
                user.role.as_str(),
                user.created_at,
            ],
        )
        .context("Failed to insert user")?;

        info!("✅ Created user: {} ({})", user.email, user.role.as_str());

        Ok(user)
    }
}
