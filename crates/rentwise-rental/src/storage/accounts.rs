use crate::domain::accounts::{Admin, NewAdmin, NewUser, User};
use crate::domain::types::{AdminId, AdminRole, UserId};
use crate::error::{RentalError, Result};
use crate::storage::{code_column, unique_violation};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, phone, \
     address, driver_license, date_of_birth, created_at, updated_at";

const ADMIN_COLUMNS: &str =
    "id, username, email, password_hash, first_name, last_name, role, created_at, updated_at";

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &NewUser) -> Result<User>;
    async fn get(&self, id: UserId) -> Result<Option<User>>;
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn list(&self) -> Result<Vec<User>>;
    /// Replace the profile fields; the password hash is left untouched.
    async fn update(&self, user: &User) -> Result<User>;
    async fn update_password_hash(&self, id: UserId, password_hash: &str) -> Result<()>;
    async fn delete(&self, id: UserId) -> Result<bool>;
    async fn username_exists(&self, username: &str) -> Result<bool>;
    async fn email_exists(&self, email: &str) -> Result<bool>;
}

#[async_trait]
pub trait AdminRepository: Send + Sync {
    async fn create(&self, admin: &NewAdmin) -> Result<Admin>;
    async fn get(&self, id: AdminId) -> Result<Option<Admin>>;
    async fn get_by_username(&self, username: &str) -> Result<Option<Admin>>;
    async fn get_by_email(&self, email: &str) -> Result<Option<Admin>>;
    async fn list(&self) -> Result<Vec<Admin>>;
    async fn list_by_role(&self, role: AdminRole) -> Result<Vec<Admin>>;
    async fn update(&self, admin: &Admin) -> Result<Admin>;
    async fn update_password_hash(&self, id: AdminId, password_hash: &str) -> Result<()>;
    async fn delete(&self, id: AdminId) -> Result<bool>;
    async fn username_exists(&self, username: &str) -> Result<bool>;
    async fn email_exists(&self, email: &str) -> Result<bool>;
    async fn count(&self) -> Result<i64>;
}

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn user_from_row(row: &SqliteRow) -> Result<User> {
        Ok(User {
            id: UserId::new(row.try_get("id")?),
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            driver_license: row.try_get("driver_license")?,
            date_of_birth: row.try_get("date_of_birth")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn fetch_one_by(&self, column: &str, value: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?");
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::user_from_row).transpose()
    }

    async fn exists_by(&self, column: &str, value: &str) -> Result<bool> {
        let sql = format!("SELECT COUNT(*) FROM users WHERE {column} = ?");
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(value)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: &NewUser) -> Result<User> {
        user.validate()?;
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO users
            (username, email, password_hash, first_name, last_name, phone, address,
             driver_license, date_of_birth, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(&user.driver_license)
        .bind(user.date_of_birth)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, || format!("user {} already exists", user.username)))?;

        let id = UserId::new(result.last_insert_rowid());
        self.get(id)
            .await?
            .ok_or_else(|| RentalError::UserNotFound { id: id.to_string() })
    }

    async fn get(&self, id: UserId) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::user_from_row).transpose()
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        self.fetch_one_by("username", username).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        self.fetch_one_by("email", email).await
    }

    async fn list(&self) -> Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(Self::user_from_row).collect()
    }

    async fn update(&self, user: &User) -> Result<User> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = ?, email = ?, first_name = ?, last_name = ?, phone = ?, address = ?,
                driver_license = ?, date_of_birth = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(&user.driver_license)
        .bind(user.date_of_birth)
        .bind(Utc::now())
        .bind(user.id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, || format!("user {} already exists", user.username)))?;

        if result.rows_affected() == 0 {
            return Err(RentalError::UserNotFound {
                id: user.id.to_string(),
            });
        }
        self.get(user.id).await?.ok_or_else(|| RentalError::UserNotFound {
            id: user.id.to_string(),
        })
    }

    async fn update_password_hash(&self, id: UserId, password_hash: &str) -> Result<()> {
        let result = sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RentalError::UserNotFound { id: id.to_string() });
        }
        Ok(())
    }

    async fn delete(&self, id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn username_exists(&self, username: &str) -> Result<bool> {
        self.exists_by("username", username).await
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        self.exists_by("email", email).await
    }
}

pub struct SqliteAdminRepository {
    pool: SqlitePool,
}

impl SqliteAdminRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn admin_from_row(row: &SqliteRow) -> Result<Admin> {
        Ok(Admin {
            id: AdminId::new(row.try_get("id")?),
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            role: code_column(row, "admins", "role")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn fetch_one_by(&self, column: &str, value: &str) -> Result<Option<Admin>> {
        let sql = format!("SELECT {ADMIN_COLUMNS} FROM admins WHERE {column} = ?");
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::admin_from_row).transpose()
    }

    async fn exists_by(&self, column: &str, value: &str) -> Result<bool> {
        let sql = format!("SELECT COUNT(*) FROM admins WHERE {column} = ?");
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(value)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }
}

#[async_trait]
impl AdminRepository for SqliteAdminRepository {
    async fn create(&self, admin: &NewAdmin) -> Result<Admin> {
        admin.validate()?;
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO admins
            (username, email, password_hash, first_name, last_name, role, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&admin.username)
        .bind(&admin.email)
        .bind(&admin.password_hash)
        .bind(&admin.first_name)
        .bind(&admin.last_name)
        .bind(admin.role.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, || format!("admin {} already exists", admin.username)))?;

        let id = AdminId::new(result.last_insert_rowid());
        self.get(id)
            .await?
            .ok_or_else(|| RentalError::AdminNotFound { id: id.to_string() })
    }

    async fn get(&self, id: AdminId) -> Result<Option<Admin>> {
        let sql = format!("SELECT {ADMIN_COLUMNS} FROM admins WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::admin_from_row).transpose()
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<Admin>> {
        self.fetch_one_by("username", username).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Admin>> {
        self.fetch_one_by("email", email).await
    }

    async fn list(&self) -> Result<Vec<Admin>> {
        let sql = format!("SELECT {ADMIN_COLUMNS} FROM admins ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(Self::admin_from_row).collect()
    }

    async fn list_by_role(&self, role: AdminRole) -> Result<Vec<Admin>> {
        let sql = format!(
            "SELECT {ADMIN_COLUMNS} FROM admins WHERE role = ? ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(role.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::admin_from_row).collect()
    }

    async fn update(&self, admin: &Admin) -> Result<Admin> {
        let result = sqlx::query(
            r#"
            UPDATE admins
            SET username = ?, email = ?, first_name = ?, last_name = ?, role = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&admin.username)
        .bind(&admin.email)
        .bind(&admin.first_name)
        .bind(&admin.last_name)
        .bind(admin.role.as_str())
        .bind(Utc::now())
        .bind(admin.id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| unique_violation(e, || format!("admin {} already exists", admin.username)))?;

        if result.rows_affected() == 0 {
            return Err(RentalError::AdminNotFound {
                id: admin.id.to_string(),
            });
        }
        self.get(admin.id).await?.ok_or_else(|| RentalError::AdminNotFound {
            id: admin.id.to_string(),
        })
    }

    async fn update_password_hash(&self, id: AdminId, password_hash: &str) -> Result<()> {
        let result = sqlx::query("UPDATE admins SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RentalError::AdminNotFound { id: id.to_string() });
        }
        Ok(())
    }

    async fn delete(&self, id: AdminId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM admins WHERE id = ?")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn username_exists(&self, username: &str) -> Result<bool> {
        self.exists_by("username", username).await
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        self.exists_by("email", email).await
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admins")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
