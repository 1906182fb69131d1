use super::db::{Database, DatabaseError};
use super::models::NotificationTemplate;
use super::tables::*;

const NOTIFICATION_TEMPLATE_KEY: &str = "notification_template";

impl Database {
    // ========================================================================
    // Settings operations
    // ========================================================================

    /// Persist the notification mail template
    pub fn put_notification_template(
        &self,
        template: &NotificationTemplate,
    ) -> Result<(), DatabaseError> {
        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(SETTINGS)?;
            let data = rmp_serde::to_vec_named(template)?;
            table.insert(NOTIFICATION_TEMPLATE_KEY, data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// The configured notification mail template, or the built-in default
    /// when none was saved yet.
    pub fn get_notification_template(&self) -> Result<NotificationTemplate, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(SETTINGS)?;

        match table.get(NOTIFICATION_TEMPLATE_KEY)? {
            Some(data) => {
                let template: NotificationTemplate = rmp_serde::from_slice(data.value())?;
                Ok(template)
            }
            None => Ok(NotificationTemplate::default()),
        }
    }
}
