// User and admin repository operations

use tokio_postgres::Row;
use tracing::info;

use super::Database;
use crate::error::ApiError;
use crate::models::{Admin, User};

const USER_COLUMNS: &str = "id, name, email, password, token, image_url, created_at";
const ADMIN_COLUMNS: &str = "id, email, password, created_at";

// Advisory lock key serializing admin bootstrap
const ADMIN_BOOTSTRAP_LOCK: i64 = 0x6c696e676f;

fn user_from_row(row: &Row) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password: row.get("password"),
        token: row.get("token"),
        image_url: row.get("image_url"),
        created_at: row.get("created_at"),
    }
}

fn admin_from_row(row: &Row) -> Admin {
    Admin {
        id: row.get("id"),
        email: row.get("email"),
        password: row.get("password"),
        created_at: row.get("created_at"),
    }
}

impl Database {
    /// Case-sensitive lookup; callers pass the normalized email.
    pub async fn user_email_exists(&self, email: &str) -> Result<bool, ApiError> {
        let client = self.get_connection().await?;

        let row = client.query_one("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)", &[&email])
            .await
            .map_err(ApiError::from)?;

        Ok(row.get(0))
    }

    /// Whether a user row with this id still exists. Tokens stay valid after
    /// the account is deleted, so anything that uploads on behalf of a token
    /// checks this first.
    pub async fn user_exists(&self, id: i32) -> Result<bool, ApiError> {
        let client = self.get_connection().await?;

        let row = client.query_one("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)", &[&id])
            .await
            .map_err(ApiError::from)?;

        Ok(row.get(0))
    }

    /// Inserts a user whose password is already hashed.
    ///
    /// # Arguments
    /// * `name` - Display name, already trimmed
    /// * `email` - Normalized email
    /// * `password_hash` - bcrypt hash of the password
    /// * `image_url` - Public URL of a profile image, if one was uploaded
    ///
    /// # Returns
    /// * `Result<User, ApiError>` - The stored row, or `Conflict` when the email is taken
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        image_url: Option<&str>,
    ) -> Result<User, ApiError> {
        let client = self.get_connection().await?;

        let query = format!(
            "INSERT INTO users (name, email, password, image_url) VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        );

        let row = client.query_one(&query, &[&name, &email, &password_hash, &image_url])
            .await
            .map_err(ApiError::from)?;

        let user = user_from_row(&row);
        info!("Created user with id: {}", user.id);
        Ok(user)
    }

    /// `Ok(None)` when no account uses the email.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let client = self.get_connection().await?;

        let query = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let row = client.query_opt(&query, &[&email])
            .await
            .map_err(ApiError::from)?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// # Returns
    /// * `Result<User, ApiError>` - The user, or `NotFound`
    pub async fn get_user_by_id(&self, id: i32) -> Result<User, ApiError> {
        let client = self.get_connection().await?;

        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = client.query_opt(&query, &[&id])
            .await
            .map_err(ApiError::from)?;

        row.as_ref()
            .map(user_from_row)
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    /// Ordered by id.
    pub async fn get_all_users(&self) -> Result<Vec<User>, ApiError> {
        let client = self.get_connection().await?;

        let query = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);
        let rows = client.query(&query, &[])
            .await
            .map_err(ApiError::from)?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    pub async fn count_users(&self) -> Result<i64, ApiError> {
        let client = self.get_connection().await?;

        let row = client.query_one("SELECT COUNT(id) FROM users", &[])
            .await
            .map_err(ApiError::from)?;

        Ok(row.get(0))
    }

    /// Remembers the last token issued to the user.
    pub async fn store_user_token(&self, id: i32, token: &str) -> Result<(), ApiError> {
        let client = self.get_connection().await?;

        let updated = client.execute("UPDATE users SET token = $1 WHERE id = $2", &[&token, &id])
            .await
            .map_err(ApiError::from)?;

        if updated == 0 {
            return Err(ApiError::not_found("User not found"));
        }

        Ok(())
    }

    /// # Arguments
    /// * `id` - The user to rename
    /// * `name` - New display name, already trimmed
    ///
    /// # Returns
    /// * `Result<User, ApiError>` - The updated row, or `NotFound`
    pub async fn update_user_name(&self, id: i32, name: &str) -> Result<User, ApiError> {
        let client = self.get_connection().await?;

        let query = format!("UPDATE users SET name = $1 WHERE id = $2 RETURNING {}", USER_COLUMNS);
        let row = client.query_opt(&query, &[&name, &id])
            .await
            .map_err(ApiError::from)?;

        let user = row.as_ref()
            .map(user_from_row)
            .ok_or_else(|| ApiError::not_found("User not found"))?;

        info!("Updated name of user {}", id);
        Ok(user)
    }

    /// Points the profile at a freshly uploaded image. The previous object is
    /// left in the bucket.
    pub async fn update_user_image(&self, id: i32, image_url: &str) -> Result<User, ApiError> {
        let client = self.get_connection().await?;

        let query = format!("UPDATE users SET image_url = $1 WHERE id = $2 RETURNING {}", USER_COLUMNS);
        let row = client.query_opt(&query, &[&image_url, &id])
            .await
            .map_err(ApiError::from)?;

        let user = row.as_ref()
            .map(user_from_row)
            .ok_or_else(|| ApiError::not_found("User not found"))?;

        info!("Updated image of user {}", id);
        Ok(user)
    }

    /// History rows go with the user through `ON DELETE CASCADE`.
    pub async fn delete_user(&self, id: i32) -> Result<(), ApiError> {
        let client = self.get_connection().await?;

        let rows_affected = client.execute("DELETE FROM users WHERE id = $1", &[&id])
            .await
            .map_err(ApiError::from)?;

        if rows_affected == 0 {
            Err(ApiError::not_found("User not found"))
        } else {
            info!("Deleted user with id: {}", id);
            Ok(())
        }
    }

    // Admin accounts

    /// Inserts an admin whose password is already hashed. A taken email
    /// surfaces as `Conflict`.
    pub async fn create_admin(&self, email: &str, password_hash: &str) -> Result<Admin, ApiError> {
        let client = self.get_connection().await?;

        let query = format!(
            "INSERT INTO admins (email, password) VALUES ($1, $2) RETURNING {}",
            ADMIN_COLUMNS
        );
        let row = client.query_one(&query, &[&email, &password_hash])
            .await
            .map_err(ApiError::from)?;

        let admin = admin_from_row(&row);
        info!("Created admin with id: {}", admin.id);
        Ok(admin)
    }

    /// Creates the first admin account, but only while the table is empty.
    ///
    /// The check and the insert run in one transaction under an advisory
    /// lock, so two concurrent bootstrap requests cannot both succeed.
    ///
    /// # Arguments
    /// * `email` - Normalized email of the new admin
    /// * `password_hash` - bcrypt hash of the password
    ///
    /// # Returns
    /// * `Ok(None)` when an admin already exists
    pub async fn create_first_admin(&self, email: &str, password_hash: &str) -> Result<Option<Admin>, ApiError> {
        let mut client = self.get_connection().await?;
        let transaction = client.transaction().await.map_err(ApiError::from)?;

        transaction.execute("SELECT pg_advisory_xact_lock($1)", &[&ADMIN_BOOTSTRAP_LOCK])
            .await
            .map_err(ApiError::from)?;

        let query = format!(
            r#"
            INSERT INTO admins (email, password)
            SELECT $1, $2
            WHERE NOT EXISTS (SELECT 1 FROM admins)
            RETURNING {}
            "#,
            ADMIN_COLUMNS
        );
        let row = transaction.query_opt(&query, &[&email, &password_hash])
            .await
            .map_err(ApiError::from)?;

        transaction.commit().await.map_err(ApiError::from)?;

        let admin = row.as_ref().map(admin_from_row);
        if let Some(admin) = &admin {
            info!("Created first admin with id: {}", admin.id);
        }
        Ok(admin)
    }

    pub async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, ApiError> {
        let client = self.get_connection().await?;

        let query = format!("SELECT {} FROM admins WHERE email = $1", ADMIN_COLUMNS);
        let row = client.query_opt(&query, &[&email])
            .await
            .map_err(ApiError::from)?;

        Ok(row.as_ref().map(admin_from_row))
    }

    pub async fn get_all_admins(&self) -> Result<Vec<Admin>, ApiError> {
        let client = self.get_connection().await?;

        let query = format!("SELECT {} FROM admins ORDER BY id", ADMIN_COLUMNS);
        let rows = client.query(&query, &[])
            .await
            .map_err(ApiError::from)?;

        Ok(rows.iter().map(admin_from_row).collect())
    }

    /// Used to decide whether `/addadmin` is still open for bootstrap.
    pub async fn count_admins(&self) -> Result<i64, ApiError> {
        let client = self.get_connection().await?;

        let row = client.query_one("SELECT COUNT(id) FROM admins", &[])
            .await
            .map_err(ApiError::from)?;

        Ok(row.get(0))
    }

    pub async fn delete_admin(&self, id: i32) -> Result<(), ApiError> {
        let client = self.get_connection().await?;

        let rows_affected = client.execute("DELETE FROM admins WHERE id = $1", &[&id])
            .await
            .map_err(ApiError::from)?;

        if rows_affected == 0 {
            Err(ApiError::not_found("Admin not found"))
        } else {
            info!("Deleted admin with id: {}", id);
            Ok(())
        }
    }
}
