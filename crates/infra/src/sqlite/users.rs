use async_trait::async_trait;
use sqlx::FromRow;
use tracing::instrument;
use uuid::Uuid;

use maintops_auth::{Role, RoleRecord, UserAccount};
use maintops_core::{RoleId, UserId};

use super::rows::{RoleRow, UserRow};
use super::{SqliteStore, is_unique_violation, map_sqlx_error};
use crate::store::{StoreError, UserStore};

const SELECT_USER: &str =
    "SELECT id, login, email, password_hash, blocked, created_at FROM users";

fn login_taken(login: &str) -> StoreError {
    StoreError::Conflict(format!("login '{login}' already exists"))
}

fn role_taken(name: &Role) -> StoreError {
    StoreError::Conflict(format!("role '{name}' already exists"))
}

#[async_trait]
impl UserStore for SqliteStore {
    #[instrument(skip(self, user), fields(user_id = %user.id, login = %user.login), err)]
    async fn insert_user(&self, user: &UserAccount) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, login, email, password_hash, blocked, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.login)
        .bind(&user.email)
        .bind(user.password_hash.encode())
        .bind(user.blocked)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                login_taken(&user.login)
            } else {
                map_sqlx_error("insert_user", e)
            }
        })?;
        Ok(())
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn update_user(&self, user: &UserAccount) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET login = ?, email = ?, password_hash = ?, blocked = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.login)
        .bind(&user.email)
        .bind(user.password_hash.encode())
        .bind(user.blocked)
        .bind(user.id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                login_taken(&user.login)
            } else {
                map_sqlx_error("update_user", e)
            }
        })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("user"));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn get_user(&self, id: UserId) -> Result<Option<UserAccount>, StoreError> {
        let row = sqlx::query(&format!("{SELECT_USER} WHERE id = ?"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;
        row.map(|r| UserRow::from_row(&r).map(|u| u.0))
            .transpose()
            .map_err(|e| map_sqlx_error("decode_user", e))
    }

    #[instrument(skip(self), err)]
    async fn find_user_by_login(&self, login: &str) -> Result<Option<UserAccount>, StoreError> {
        let row = sqlx::query(&format!("{SELECT_USER} WHERE login = ?"))
            .bind(login)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_login", e))?;
        row.map(|r| UserRow::from_row(&r).map(|u| u.0))
            .transpose()
            .map_err(|e| map_sqlx_error("decode_user", e))
    }

    #[instrument(skip(self), err)]
    async fn list_users(&self) -> Result<Vec<UserAccount>, StoreError> {
        let rows = sqlx::query(&format!("{SELECT_USER} ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;
        rows.iter()
            .map(|r| UserRow::from_row(r).map(|u| u.0))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_user", e))
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn count_users(&self) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_users", e))?;
        Ok(count as usize)
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn user_roles(&self, id: UserId) -> Result<Vec<Role>, StoreError> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT r.name
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = ?
            ORDER BY ur.rowid ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("user_roles", e))?;

        names
            .iter()
            .map(|n| Role::parse(n).map_err(StoreError::from))
            .collect()
    }

    #[instrument(skip(self, roles), fields(user_id = %id, roles = roles.len()), err)]
    async fn set_user_roles(&self, id: UserId, roles: &[Role]) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM users WHERE id = ?")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("user_exists", e))?;
        if exists.is_none() {
            return Err(StoreError::NotFound("user"));
        }

        sqlx::query("DELETE FROM user_roles WHERE user_id = ?")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("clear_user_roles", e))?;

        for name in roles {
            let found: Option<Uuid> = sqlx::query_scalar("SELECT id FROM roles WHERE name = ?")
                .bind(name.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("find_role", e))?;

            let role_id = match found {
                Some(role_id) => role_id,
                None => {
                    let record = RoleRecord::new(name.clone());
                    sqlx::query("INSERT INTO roles (id, name) VALUES (?, ?)")
                        .bind(record.id.as_uuid())
                        .bind(record.name.as_str())
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| map_sqlx_error("insert_role", e))?;
                    Uuid::from(record.id)
                }
            };

            sqlx::query("INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES (?, ?)")
                .bind(id.as_uuid())
                .bind(role_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("link_role", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    #[instrument(skip(self, role), fields(role = %role.name), err)]
    async fn insert_role(&self, role: &RoleRecord) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO roles (id, name) VALUES (?, ?)")
            .bind(role.id.as_uuid())
            .bind(role.name.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    role_taken(&role.name)
                } else {
                    map_sqlx_error("insert_role", e)
                }
            })?;
        Ok(())
    }

    #[instrument(skip(self), fields(role_id = %id), err)]
    async fn get_role(&self, id: RoleId) -> Result<Option<RoleRecord>, StoreError> {
        let row = sqlx::query("SELECT id, name FROM roles WHERE id = ?")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_role", e))?;
        row.map(|r| RoleRow::from_row(&r).map(|r| r.0))
            .transpose()
            .map_err(|e| map_sqlx_error("decode_role", e))
    }

    #[instrument(skip(self), err)]
    async fn list_roles(&self) -> Result<Vec<RoleRecord>, StoreError> {
        let rows = sqlx::query("SELECT id, name FROM roles ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_roles", e))?;
        rows.iter()
            .map(|r| RoleRow::from_row(r).map(|r| r.0))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_role", e))
    }

    #[instrument(skip(self), fields(role_id = %id), err)]
    async fn rename_role(&self, id: RoleId, name: &Role) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE roles SET name = ? WHERE id = ?")
            .bind(name.as_str())
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    role_taken(name)
                } else {
                    map_sqlx_error("rename_role", e)
                }
            })?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("role"));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(role_id = %id), err)]
    async fn delete_role(&self, id: RoleId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM roles WHERE id = ?")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_role", e))?;
        Ok(result.rows_affected() > 0)
    }
}
