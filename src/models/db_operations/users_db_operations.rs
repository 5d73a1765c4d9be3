use bcrypt::{hash, verify, BcryptError};
use rusqlite::{params, Connection, Error as RusqliteError, OptionalExtension};

use crate::helper::time_helpers;
use crate::models::User;

fn bcrypt_to_rusqlite_error(e: BcryptError) -> RusqliteError {
    RusqliteError::ToSqlConversionFailure(Box::new(e))
}

pub fn create_user(
    conn: &Connection,
    email: &str,
    password: &str,
    name: &str,
) -> Result<(), RusqliteError> {
    let password_hash = hash(password, bcrypt::DEFAULT_COST).map_err(bcrypt_to_rusqlite_error)?;
    conn.execute(
        "INSERT INTO users (email, password_hash, name) VALUES (?1, ?2, ?3)",
        params![email, password_hash, name],
    )?;
    Ok(())
}

pub fn read_user_by_id(conn: &Connection, user_id: i64) -> Option<User> {
    conn.query_row(
        "SELECT id, email, name FROM users WHERE id = ?1",
        [user_id],
        |row| {
            Ok(User {
                id: row.get(0)?,
                email: row.get(1)?,
                name: row.get(2)?,
            })
        },
    )
    .ok()
}

pub fn user_exists_by_email(conn: &Connection, email: &str) -> Result<bool, RusqliteError> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
        [email],
        |row| row.get(0),
    )
}

/// Looks up the account and compares the password hash. Returns None for both
/// an unknown email and a mismatching password so callers cannot tell which
/// check failed.
pub fn verify_credentials(
    conn: &Connection,
    email: &str,
    password: &str,
) -> Result<Option<User>, RusqliteError> {
    let row: Option<(i64, String, String, String)> = conn
        .query_row(
            "SELECT id, email, name, password_hash FROM users WHERE email = ?1",
            [email],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()?;

    Ok(match row {
        Some((id, email, name, password_hash))
            if verify(password, &password_hash).unwrap_or(false) =>
        {
            Some(User { id, email, name })
        }
        _ => None,
    })
}

pub fn update_last_login(conn: &Connection, user_id: i64) -> Result<(), RusqliteError> {
    conn.execute(
        "UPDATE users SET last_login_at = ?1 WHERE id = ?2",
        params![time_helpers::now_utc_text(), user_id],
    )?;
    Ok(())
}
