use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::Account;
use super::tables::*;

impl Database {
    // ========================================================================
    // Account operations
    // ========================================================================

    /// Store an account and maintain the username index
    pub fn put_account(&self, account: &Account) -> Result<(), DatabaseError> {
        debug_assert!(!account.id.is_empty(), "account id must not be empty");
        debug_assert!(
            !account.username.is_empty(),
            "account username must not be empty"
        );

        let write_txn = self.begin_write()?;
        {
            // A rename must not leave the old username resolving to this
            // account; drop the stale index entry first.
            let table = write_txn.open_table(ACCOUNTS)?;
            let previous_username: Option<String> = match table.get(account.id.as_str())? {
                Some(data) => {
                    let existing: Account = rmp_serde::from_slice(data.value())?;
                    Some(existing.username)
                }
                None => None,
            };
            drop(table);

            if let Some(ref old_username) = previous_username {
                if *old_username != account.username {
                    let mut username_table = write_txn.open_table(ACCOUNT_USERNAMES)?;
                    username_table.remove(old_username.as_str())?;
                }
            }

            let mut table = write_txn.open_table(ACCOUNTS)?;
            let data = rmp_serde::to_vec_named(account)?;
            table.insert(account.id.as_str(), data.as_slice())?;
            drop(table);

            let mut username_table = write_txn.open_table(ACCOUNT_USERNAMES)?;
            username_table.insert(account.username.as_str(), account.id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get an account by its id
    pub fn get_account(&self, id: &str) -> Result<Option<Account>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(ACCOUNTS)?;

        match table.get(id)? {
            Some(data) => {
                let account: Account = rmp_serde::from_slice(data.value())?;
                Ok(Some(account))
            }
            None => Ok(None),
        }
    }

    /// Get an account by username (resolves username -> id -> account)
    pub fn get_account_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Account>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let username_table = read_txn.open_table(ACCOUNT_USERNAMES)?;

        let id = match username_table.get(username)? {
            Some(data) => data.value().to_string(),
            None => return Ok(None),
        };

        let accounts_table = read_txn.open_table(ACCOUNTS)?;
        match accounts_table.get(id.as_str())? {
            Some(data) => {
                let account: Account = rmp_serde::from_slice(data.value())?;
                Ok(Some(account))
            }
            None => Ok(None),
        }
    }

    /// Check if a username is already taken
    pub fn username_exists(&self, username: &str) -> Result<bool, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(ACCOUNT_USERNAMES)?;
        Ok(table.get(username)?.is_some())
    }

    /// The owner's uploads subdirectory, `<account-id>_<random-token>`.
    /// Generated on first use and cached on the account. `None` when the
    /// account does not exist.
    pub fn ensure_storage_dir(&self, account_id: &str) -> Result<Option<String>, DatabaseError> {
        let write_txn = self.begin_write()?;

        let table = write_txn.open_table(ACCOUNTS)?;
        let mut account: Account = match table.get(account_id)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(None),
        };
        drop(table);

        if let Some(dir) = account.storage_dir.clone() {
            return Ok(Some(dir));
        }

        let dir = format!("{account_id}_{}", uuid::Uuid::new_v4().simple());
        account.storage_dir = Some(dir.clone());
        {
            let mut table = write_txn.open_table(ACCOUNTS)?;
            let data = rmp_serde::to_vec_named(&account)?;
            table.insert(account_id, data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(Some(dir))
    }

    /// Delete an account by id and clean up the username index
    pub fn delete_account(&self, id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let table = write_txn.open_table(ACCOUNTS)?;
        let username: Option<String> = match table.get(id)? {
            Some(data) => {
                let account: Account = rmp_serde::from_slice(data.value())?;
                Some(account.username)
            }
            None => None,
        };
        drop(table);

        let deleted = match username {
            Some(username) => {
                {
                    let mut table = write_txn.open_table(ACCOUNTS)?;
                    table.remove(id)?;
                }
                {
                    let mut username_table = write_txn.open_table(ACCOUNT_USERNAMES)?;
                    username_table.remove(username.as_str())?;
                }
                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(deleted)
    }

    /// Get all accounts
    pub fn get_all_accounts(&self) -> Result<Vec<Account>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(ACCOUNTS)?;

        let mut accounts = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let account: Account = rmp_serde::from_slice(value.value())?;
            accounts.push(account);
        }

        Ok(accounts)
    }
}
