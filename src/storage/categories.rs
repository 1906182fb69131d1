use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::Category;
use super::tables::*;

impl Database {
    // ========================================================================
    // Category taxonomy operations
    // ========================================================================

    /// Store a category, keyed by slug
    pub fn put_category(&self, category: &Category) -> Result<(), DatabaseError> {
        debug_assert!(!category.slug.is_empty(), "category slug must not be empty");

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(CATEGORIES)?;
            let data = rmp_serde::to_vec_named(category)?;
            table.insert(category.slug.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a category by slug
    pub fn get_category(&self, slug: &str) -> Result<Option<Category>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(CATEGORIES)?;

        match table.get(slug)? {
            Some(data) => {
                let category: Category = rmp_serde::from_slice(data.value())?;
                Ok(Some(category))
            }
            None => Ok(None),
        }
    }

    /// The full taxonomy, sorted by name. Sources the category dropdown of
    /// the listing view.
    pub fn get_all_categories(&self) -> Result<Vec<Category>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(CATEGORIES)?;

        let mut categories = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let category: Category = rmp_serde::from_slice(value.value())?;
            categories.push(category);
        }

        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    /// Delete a category by slug. The slug is not scrubbed from file
    /// records; stale tags simply stop matching any category.
    pub fn delete_category(&self, slug: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;
        let mut table = write_txn.open_table(CATEGORIES)?;
        let deleted = table.remove(slug)?.is_some();
        drop(table);
        write_txn.commit()?;
        Ok(deleted)
    }
}
