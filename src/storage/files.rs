use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::FileRecord;
use super::tables::*;

impl Database {
    // ========================================================================
    // File record operations
    // ========================================================================

    /// Store a file record and maintain the owner index
    pub fn put_file(&self, file: &FileRecord) -> Result<(), DatabaseError> {
        debug_assert!(!file.id.is_empty(), "file id must not be empty");
        debug_assert!(!file.owner.is_empty(), "file owner must not be empty");

        let write_txn = self.begin_write()?;
        {
            // A record may be reassigned to a new owner on save; drop the old
            // index entry first.
            let table = write_txn.open_table(FILES)?;
            let previous_owner: Option<String> = match table.get(file.id.as_str())? {
                Some(data) => {
                    let existing: FileRecord = rmp_serde::from_slice(data.value())?;
                    Some(existing.owner)
                }
                None => None,
            };
            drop(table);

            if let Some(ref old_owner) = previous_owner {
                if *old_owner != file.owner {
                    remove_from_owner_index(&write_txn, old_owner, &file.id)?;
                }
            }

            let mut table = write_txn.open_table(FILES)?;
            let data = rmp_serde::to_vec_named(file)?;
            table.insert(file.id.as_str(), data.as_slice())?;
            drop(table);

            let mut owner_table = write_txn.open_table(OWNER_FILES)?;
            let mut file_ids: Vec<String> = owner_table
                .get(file.owner.as_str())?
                .map(|v| rmp_serde::from_slice(v.value()).unwrap_or_default())
                .unwrap_or_default();

            if !file_ids.contains(&file.id) {
                file_ids.push(file.id.clone());
                let index_data = rmp_serde::to_vec_named(&file_ids)?;
                owner_table.insert(file.owner.as_str(), index_data.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a file record by its UUID
    pub fn get_file(&self, id: &str) -> Result<Option<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(FILES)?;

        match table.get(id)? {
            Some(data) => {
                let file: FileRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(file))
            }
            None => Ok(None),
        }
    }

    /// Get all file records for an owner, newest first
    pub fn get_files_by_owner(&self, owner: &str) -> Result<Vec<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let owner_table = read_txn.open_table(OWNER_FILES)?;
        let files_table = read_txn.open_table(FILES)?;

        let file_ids: Vec<String> = match owner_table.get(owner)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut files = Vec::new();
        for file_id in file_ids {
            if let Some(data) = files_table.get(file_id.as_str())? {
                let file: FileRecord = rmp_serde::from_slice(data.value())?;
                files.push(file);
            }
        }

        files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(files)
    }

    /// Distinct creation years of an owner's files, newest first.
    /// Sources the year dropdown of the listing view.
    pub fn distinct_years(&self, owner: &str) -> Result<Vec<i32>, DatabaseError> {
        let files = self.get_files_by_owner(owner)?;
        let mut years: Vec<i32> = files.iter().map(|f| f.year()).collect();
        years.sort_unstable_by(|a, b| b.cmp(a));
        years.dedup();
        Ok(years)
    }

    /// An owner's files filtered by year and/or category slug, newest first
    pub fn list_files_by_owner(
        &self,
        owner: &str,
        year: Option<i32>,
        category: Option<&str>,
    ) -> Result<Vec<FileRecord>, DatabaseError> {
        let mut files = self.get_files_by_owner(owner)?;

        if let Some(y) = year {
            files.retain(|f| f.year() == y);
        }
        if let Some(cat) = category {
            files.retain(|f| f.categories.iter().any(|c| c == cat));
        }

        Ok(files)
    }

    /// Delete a file record and clean up the owner index
    pub fn delete_file(&self, id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let table = write_txn.open_table(FILES)?;
        let owner: Option<String> = match table.get(id)? {
            Some(data) => {
                let file: FileRecord = rmp_serde::from_slice(data.value())?;
                Some(file.owner)
            }
            None => None,
        };
        drop(table);

        let deleted = match owner {
            Some(owner) => {
                {
                    let mut table = write_txn.open_table(FILES)?;
                    table.remove(id)?;
                }
                remove_from_owner_index(&write_txn, &owner, id)?;
                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(deleted)
    }

    /// Get all file records
    pub fn get_all_files(&self) -> Result<Vec<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(FILES)?;

        let mut files = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let file: FileRecord = rmp_serde::from_slice(value.value())?;
            files.push(file);
        }

        Ok(files)
    }
}

fn remove_from_owner_index(
    write_txn: &redb::WriteTransaction,
    owner: &str,
    file_id: &str,
) -> Result<(), DatabaseError> {
    let owner_table = write_txn.open_table(OWNER_FILES)?;
    let file_ids: Option<Vec<String>> = match owner_table.get(owner)? {
        Some(data) => Some(rmp_serde::from_slice(data.value())?),
        None => None,
    };
    drop(owner_table);

    if let Some(mut ids) = file_ids {
        ids.retain(|fid| fid != file_id);
        let mut owner_table = write_txn.open_table(OWNER_FILES)?;
        if ids.is_empty() {
            owner_table.remove(owner)?;
        } else {
            let data = rmp_serde::to_vec_named(&ids)?;
            owner_table.insert(owner, data.as_slice())?;
        }
    }

    Ok(())
}
