//! Accounts and their bookmarked locations.

use rusqlite::{params, OptionalExtension};

use wxrelay_core::DatabaseError;

use crate::rows::{AccountRow, BookmarkRow};
use crate::store::WeatherStore;

impl WeatherStore {
    /// Create an account and its empty bookmark collection.
    ///
    /// Registering a name that already exists returns the existing account
    /// and collection unchanged.
    pub fn register_account(
        &mut self,
        user_name: &str,
    ) -> Result<(AccountRow, BookmarkRow), DatabaseError> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        tx.execute(
            "INSERT INTO accounts (user_name) VALUES (?1) ON CONFLICT (user_name) DO NOTHING",
            params![user_name],
        )?;

        let account = tx.query_row(
            "SELECT id, user_name FROM accounts WHERE user_name = ?1",
            params![user_name],
            |row| {
                Ok(AccountRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )?;

        tx.execute(
            "INSERT INTO bookmarks (id, location_ids) VALUES (?1, '[]') ON CONFLICT (id) DO NOTHING",
            params![account.id],
        )?;

        let raw: String = tx.query_row(
            "SELECT location_ids FROM bookmarks WHERE id = ?1",
            params![account.id],
            |row| row.get(0),
        )?;

        tx.commit()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        let bookmarks = BookmarkRow {
            id: account.id,
            location_ids: decode_ids(&raw)?,
        };
        Ok((account, bookmarks))
    }

    pub fn find_account(&self, user_name: &str) -> Result<Option<AccountRow>, DatabaseError> {
        let account = self
            .conn
            .query_row(
                "SELECT id, user_name FROM accounts WHERE user_name = ?1",
                params![user_name],
                |row| {
                    Ok(AccountRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(account)
    }

    pub fn bookmarks(&self, account_id: i64) -> Result<Option<BookmarkRow>, DatabaseError> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT location_ids FROM bookmarks WHERE id = ?1",
                params![account_id],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|raw| {
            Ok(BookmarkRow {
                id: account_id,
                location_ids: decode_ids(&raw)?,
            })
        })
        .transpose()
    }

    /// Append location ids to a collection, skipping ones already present.
    ///
    /// Returns `None` when the account has no collection.
    pub fn append_bookmarks(
        &mut self,
        account_id: i64,
        location_ids: &[i64],
    ) -> Result<Option<BookmarkRow>, DatabaseError> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        let raw: Option<String> = tx
            .query_row(
                "SELECT location_ids FROM bookmarks WHERE id = ?1",
                params![account_id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(raw) = raw else {
            return Ok(None);
        };

        let mut ids = decode_ids(&raw)?;
        for id in location_ids {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }

        let encoded = serde_json::to_string(&ids)
            .map_err(|e| DatabaseError::QueryFailed(format!("cannot encode bookmarks: {}", e)))?;
        tx.execute(
            "UPDATE bookmarks SET location_ids = ?1 WHERE id = ?2",
            params![encoded, account_id],
        )?;

        tx.commit()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        Ok(Some(BookmarkRow {
            id: account_id,
            location_ids: ids,
        }))
    }

    /// Ids of the named locations, in input order. Unknown names are skipped.
    pub fn location_ids_by_names(&self, names: &[String]) -> Result<Vec<i64>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM locations WHERE city_name = ?1")?;

        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            if let Some(id) = stmt.query_row(params![name], |row| row.get(0)).optional()? {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Names of the given locations, in input order. Unknown ids are skipped.
    pub fn location_names_by_ids(&self, ids: &[i64]) -> Result<Vec<String>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT city_name FROM locations WHERE id = ?1 AND city_name IS NOT NULL",
        )?;

        let mut names = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(name) = stmt.query_row(params![id], |row| row.get(0)).optional()? {
                names.push(name);
            }
        }
        Ok(names)
    }
}

fn decode_ids(raw: &str) -> Result<Vec<i64>, DatabaseError> {
    serde_json::from_str(raw)
        .map_err(|e| DatabaseError::Corruption(format!("bookmark list is not valid JSON: {}", e)))
}
