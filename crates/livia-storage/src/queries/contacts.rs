// SPDX-FileCopyrightText: 2026 LIVIA Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact operations.

use livia_core::{Contact, ContactId, LiviaError, TenantId};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Create a contact.
pub async fn create_contact(db: &Database, contact: &Contact) -> Result<(), LiviaError> {
    let contact = contact.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO contacts (id, tenant_id, name, phone) VALUES (?1, ?2, ?3, ?4)",
                params![
                    contact.id.as_str(),
                    contact.tenant_id.as_str(),
                    contact.name,
                    contact.phone,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a contact owned by `tenant_id`.
pub async fn get_contact(
    db: &Database,
    id: &ContactId,
    tenant_id: &TenantId,
) -> Result<Option<Contact>, LiviaError> {
    let id = id.clone();
    let tenant_id = tenant_id.clone();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id, tenant_id, name, phone FROM contacts WHERE id = ?1 AND tenant_id = ?2",
                params![id.as_str(), tenant_id.as_str()],
                |row| {
                    Ok(Contact {
                        id: ContactId::from(row.get::<_, String>(0)?),
                        tenant_id: TenantId::from(row.get::<_, String>(1)?),
                        name: row.get(2)?,
                        phone: row.get(3)?,
                    })
                },
            );
            match result {
                Ok(contact) => Ok(Some(contact)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}
