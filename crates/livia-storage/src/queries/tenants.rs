// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenants and API users.
//!
//! Users authenticate with an opaque bearer token. Only its SHA-256 digest
//! is stored.

use livia_core::{AuthenticatedUser, LiviaError, TenantId, UserId};
use rusqlite::params;
use sha2::{Digest, Sha256};

use crate::database::{Database, map_tr_err};

/// Hex-encoded SHA-256 digest of an API token.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Create a tenant.
pub async fn create_tenant(db: &Database, id: &TenantId, name: &str) -> Result<(), LiviaError> {
    let id = id.clone();
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO tenants (id, name) VALUES (?1, ?2)",
                params![id.as_str(), name],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// All tenant ids, sorted.
pub async fn list_tenant_ids(db: &Database) -> Result<Vec<TenantId>, LiviaError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM tenants ORDER BY id")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut ids = Vec::new();
            for row in rows {
                ids.push(TenantId::from(row?));
            }
            Ok(ids)
        })
        .await
        .map_err(map_tr_err)
}

/// Create a user that authenticates with `token`.
pub async fn create_user(
    db: &Database,
    user_id: &UserId,
    tenant_id: &TenantId,
    name: &str,
    token: &str,
) -> Result<(), LiviaError> {
    let user_id = user_id.clone();
    let tenant_id = tenant_id.clone();
    let name = name.to_string();
    let digest = hash_token(token);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO users (id, tenant_id, name, api_token_sha256) VALUES (?1, ?2, ?3, ?4)",
                params![user_id.as_str(), tenant_id.as_str(), name, digest],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Resolve a bearer token to its user.
pub async fn find_user_by_token(
    db: &Database,
    token: &str,
) -> Result<Option<AuthenticatedUser>, LiviaError> {
    let digest = hash_token(token);
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id, tenant_id, name FROM users WHERE api_token_sha256 = ?1",
                params![digest],
                |row| {
                    Ok(AuthenticatedUser {
                        user_id: UserId::from(row.get::<_, String>(0)?),
                        tenant_id: TenantId::from(row.get::<_, String>(1)?),
                        name: row.get(2)?,
                    })
                },
            );
            match result {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_hash_is_stable_hex() {
        let digest = hash_token("secret");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, hash_token("secret"));
        assert_ne!(digest, hash_token("Secret"));
    }

    #[tokio::test]
    async fn token_lookup_resolves_user_and_tenant() {
        let db = Database::open_in_memory().await.unwrap();
        let tenant = TenantId::from("t1");
        create_tenant(&db, &tenant, "Acme").await.unwrap();
        create_user(&db, &UserId::from("u1"), &tenant, "Ana", "tok-1")
            .await
            .unwrap();

        let user = find_user_by_token(&db, "tok-1").await.unwrap().unwrap();
        assert_eq!(user.user_id.as_str(), "u1");
        assert_eq!(user.tenant_id, tenant);
        assert_eq!(user.name, "Ana");

        assert!(find_user_by_token(&db, "wrong").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn tenant_ids_are_sorted() {
        let db = Database::open_in_memory().await.unwrap();
        create_tenant(&db, &TenantId::from("t2"), "B").await.unwrap();
        create_tenant(&db, &TenantId::from("t1"), "A").await.unwrap();
        let ids = list_tenant_ids(&db).await.unwrap();
        assert_eq!(ids, vec![TenantId::from("t1"), TenantId::from("t2")]);
    }
}
