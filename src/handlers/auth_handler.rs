//! Registration and Login Handlers
//!
//! Registration provisions a user plus their main account in one
//! transaction. Roles are assigned explicitly: self-registration always
//! produces USER; admins come from the seed step. Login issues an opaque
//! bearer token whose sha256 hash is stored server-side.
//!
//! Password hashing is salted sha256, which is demo grade on purpose.

use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Iban, Phone};
use crate::error::AppError;
use crate::ledger::generate_account_number;

use super::{LoginCommand, LoginResult, RegisterCommand, RegisterResult, SafeUser};

const MIN_PASSWORD_LEN: usize = 8;
const MAIN_ACCOUNT_ALIAS: &str = "Main account";

/// Hash a password with its salt (hex-encoded sha256).
pub fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash a bearer token for storage and lookup.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Handler for user registration
pub struct RegisterHandler {
    pool: PgPool,
}

impl RegisterHandler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Execute the register command: create the user and their main account
    /// atomically.
    pub async fn execute(&self, command: RegisterCommand) -> Result<RegisterResult, AppError> {
        let phone = Phone::parse(&command.phone)?;

        for (value, field) in [
            (&command.name, "name"),
            (&command.surname, "surname"),
            (&command.dni, "dni"),
            (&command.password, "password"),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::InvalidRequest(format!("{} is required", field)));
            }
        }
        if !command.email.contains('@') {
            return Err(AppError::InvalidRequest("Invalid email address".to_string()));
        }
        if command.password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::InvalidRequest(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let duplicate: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE email = $1 OR dni = $2 OR phone = $3)",
        )
        .bind(&command.email)
        .bind(&command.dni)
        .bind(phone.as_str())
        .fetch_one(&self.pool)
        .await?;

        if duplicate {
            return Err(AppError::DuplicateUser(
                "email, dni or phone already registered".to_string(),
            ));
        }

        let salt = random_hex(16);
        let password_hash = hash_password(&salt, &command.password);

        let user_id = Uuid::new_v4();
        let account_id = Uuid::new_v4();
        let account_number = generate_account_number();
        let iban = Iban::generate_spanish(&account_number);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (
                id, name, surname, birth_date, dni, country, city, address,
                postal_code, email, phone, password_hash, password_salt,
                main_currency, role
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, 'USER')
            "#,
        )
        .bind(user_id)
        .bind(command.name.trim())
        .bind(command.surname.trim())
        .bind(command.birth_date)
        .bind(command.dni.trim())
        .bind(&command.country)
        .bind(&command.city)
        .bind(&command.address)
        .bind(&command.postal_code)
        .bind(&command.email)
        .bind(phone.as_str())
        .bind(&password_hash)
        .bind(&salt)
        .bind(&command.main_currency)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, owner_id, iban, account_number, currency, balance,
                alias, status, is_main
            )
            VALUES ($1, $2, $3, $4, $5, 0, $6, 'active', true)
            "#,
        )
        .bind(account_id)
        .bind(user_id)
        .bind(iban.as_str())
        .bind(&account_number)
        .bind(&command.main_currency)
        .bind(MAIN_ACCOUNT_ALIAS)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(RegisterResult {
            user_id,
            account_id,
            iban: iban.to_string(),
        })
    }
}

/// Handler for login
pub struct LoginHandler {
    pool: PgPool,
}

impl LoginHandler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Verify credentials and issue a bearer token valid for `ttl_days`.
    pub async fn execute(
        &self,
        command: LoginCommand,
        ttl_days: i64,
    ) -> Result<LoginResult, AppError> {
        let row: Option<(Uuid, String, String, String, String, String, String)> =
            sqlx::query_as(
                r#"
                SELECT id, name, surname, role, main_currency, password_hash, password_salt
                FROM users
                WHERE email = $1
                "#,
            )
            .bind(&command.email)
            .fetch_optional(&self.pool)
            .await?;

        let (user_id, name, surname, role, main_currency, password_hash, salt) =
            row.ok_or(AppError::BadCredentials)?;

        if hash_password(&salt, &command.password) != password_hash {
            return Err(AppError::BadCredentials);
        }

        let token = random_hex(32);
        let expires_at = Utc::now() + Duration::days(ttl_days);

        sqlx::query(
            "INSERT INTO auth_tokens (token_hash, user_id, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(hash_token(&token))
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(LoginResult {
            token,
            user: SafeUser {
                id: user_id,
                name,
                surname,
                email: command.email,
                role,
                main_currency,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_deterministic() {
        let a = hash_password("salt", "hunter2hunter2");
        let b = hash_password("salt", "hunter2hunter2");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_hash_password_salt_matters() {
        assert_ne!(
            hash_password("salt-a", "hunter2hunter2"),
            hash_password("salt-b", "hunter2hunter2")
        );
    }

    #[test]
    fn test_random_hex_length_and_uniqueness() {
        let a = random_hex(32);
        let b = random_hex(32);
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }
}
