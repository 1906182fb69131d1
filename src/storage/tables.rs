use redb::TableDefinition;

/// File records: uuid -> FileRecord (msgpack)
pub const FILES: TableDefinition<&str, &[u8]> = TableDefinition::new("files");

/// Owner index: username -> msgpack Vec of file UUIDs
pub const OWNER_FILES: TableDefinition<&str, &[u8]> = TableDefinition::new("owner_files");

/// Account records: account id -> Account (msgpack)
pub const ACCOUNTS: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");

/// Username index: username -> account id (for login and owner resolution)
pub const ACCOUNT_USERNAMES: TableDefinition<&str, &str> =
    TableDefinition::new("account_usernames");

/// Category taxonomy: slug -> Category (msgpack)
pub const CATEGORIES: TableDefinition<&str, &[u8]> = TableDefinition::new("categories");

/// Service-wide settings: key -> msgpack value (notification template)
pub const SETTINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("settings");
