mod accounts;
mod admin;
mod categories;
mod delivery;
mod files;
mod listing;
mod sessions;
mod settings;

pub use accounts::{create_account, delete_account, get_account, list_accounts};
pub use admin::{admin_purge, health};
pub use categories::{create_category, delete_category, list_categories};
pub use delivery::gate;
pub use files::{create_file, delete_file, get_file, list_files, update_file};
pub use listing::list_user_files;
pub use sessions::{current_session, login, logout};
pub use settings::{get_notification_template, put_notification_template};
