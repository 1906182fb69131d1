use chrono::{TimeZone, Utc};
use userfiles::storage::models::{Account, Category, FileRecord, NotificationTemplate, StoredFile};
use userfiles::storage::Database;

fn test_db() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    (dir, db)
}

fn sample_record(id: &str, owner: &str) -> FileRecord {
    let now = Utc::now();
    FileRecord {
        id: id.to_string(),
        title: format!("Title {id}"),
        owner: owner.to_string(),
        file: Some(StoredFile {
            path: format!("{owner}-dir/{id}.pdf"),
            name: format!("{id}.pdf"),
            url: format!("http://localhost:8080/uploads/{owner}-dir/{id}.pdf"),
            mime_type: "application/pdf".to_string(),
        }),
        categories: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

fn record_in_year(id: &str, owner: &str, year: i32, month: u32) -> FileRecord {
    let mut record = sample_record(id, owner);
    record.created_at = Utc.with_ymd_and_hms(year, month, 15, 12, 0, 0).unwrap();
    record.updated_at = record.created_at;
    record
}

fn sample_account(id: &str, username: &str) -> Account {
    Account {
        id: id.to_string(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: "pbkdf2-sha256$1$AA$AA".to_string(),
        admin: false,
        storage_dir: None,
        created_at: Utc::now(),
    }
}

// ============================================================================
// File records
// ============================================================================

#[test]
fn test_put_and_get_file() {
    let (_dir, db) = test_db();
    let record = sample_record("file-1", "alice");

    db.put_file(&record).unwrap();

    let retrieved = db.get_file("file-1").unwrap().expect("file should exist");
    assert_eq!(retrieved.id, "file-1");
    assert_eq!(retrieved.title, "Title file-1");
    assert_eq!(retrieved.owner, "alice");
    let stored = retrieved.file.expect("descriptor should survive");
    assert_eq!(stored.path, "alice-dir/file-1.pdf");
    assert_eq!(stored.filename(), "file-1.pdf");
    assert_eq!(stored.mime_type, "application/pdf");
}

#[test]
fn test_get_file_not_found() {
    let (_dir, db) = test_db();
    assert!(db.get_file("nonexistent").unwrap().is_none());
}

#[test]
fn test_delete_file_cleans_owner_index() {
    let (_dir, db) = test_db();
    db.put_file(&sample_record("file-1", "alice")).unwrap();
    db.put_file(&sample_record("file-2", "alice")).unwrap();

    assert!(db.delete_file("file-1").unwrap());
    assert!(db.get_file("file-1").unwrap().is_none());

    let remaining = db.get_files_by_owner("alice").unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, "file-2");
}

#[test]
fn test_delete_file_not_found() {
    let (_dir, db) = test_db();
    assert!(!db.delete_file("nonexistent").unwrap());
}

#[test]
fn test_files_by_owner_newest_first() {
    let (_dir, db) = test_db();
    db.put_file(&record_in_year("old", "alice", 2022, 3)).unwrap();
    db.put_file(&record_in_year("new", "alice", 2024, 6)).unwrap();
    db.put_file(&record_in_year("mid", "alice", 2023, 1)).unwrap();
    db.put_file(&record_in_year("other", "bob", 2024, 1)).unwrap();

    let files = db.get_files_by_owner("alice").unwrap();
    let ids: Vec<&str> = files.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["new", "mid", "old"]);
}

#[test]
fn test_files_by_owner_unknown_owner_is_empty() {
    let (_dir, db) = test_db();
    assert!(db.get_files_by_owner("nobody").unwrap().is_empty());
}

#[test]
fn test_reassigning_owner_moves_index_entry() {
    let (_dir, db) = test_db();
    db.put_file(&sample_record("file-1", "alice")).unwrap();

    let mut record = db.get_file("file-1").unwrap().unwrap();
    record.owner = "bob".to_string();
    db.put_file(&record).unwrap();

    assert!(db.get_files_by_owner("alice").unwrap().is_empty());
    let bobs = db.get_files_by_owner("bob").unwrap();
    assert_eq!(bobs.len(), 1);
    assert_eq!(bobs[0].id, "file-1");
}

#[test]
fn test_distinct_years_newest_first_deduped() {
    let (_dir, db) = test_db();
    db.put_file(&record_in_year("a", "alice", 2022, 1)).unwrap();
    db.put_file(&record_in_year("b", "alice", 2024, 2)).unwrap();
    db.put_file(&record_in_year("c", "alice", 2024, 9)).unwrap();
    db.put_file(&record_in_year("d", "alice", 2023, 5)).unwrap();

    assert_eq!(db.distinct_years("alice").unwrap(), vec![2024, 2023, 2022]);
}

#[test]
fn test_list_files_filtered_by_year_and_category() {
    let (_dir, db) = test_db();
    let mut tagged = record_in_year("tagged", "alice", 2024, 4);
    tagged.categories = vec!["invoices".to_string()];
    db.put_file(&tagged).unwrap();
    db.put_file(&record_in_year("untagged", "alice", 2024, 5)).unwrap();
    db.put_file(&record_in_year("older", "alice", 2023, 4)).unwrap();

    let by_year = db.list_files_by_owner("alice", Some(2024), None).unwrap();
    assert_eq!(by_year.len(), 2);

    let by_cat = db
        .list_files_by_owner("alice", None, Some("invoices"))
        .unwrap();
    assert_eq!(by_cat.len(), 1);
    assert_eq!(by_cat[0].id, "tagged");

    let both = db
        .list_files_by_owner("alice", Some(2023), Some("invoices"))
        .unwrap();
    assert!(both.is_empty());
}

// ============================================================================
// Accounts
// ============================================================================

#[test]
fn test_put_and_get_account() {
    let (_dir, db) = test_db();
    let account = sample_account("acct-1", "alice");
    db.put_account(&account).unwrap();

    let by_id = db.get_account("acct-1").unwrap().expect("account by id");
    assert_eq!(by_id.username, "alice");
    assert!(!by_id.admin);

    let by_name = db
        .get_account_by_username("alice")
        .unwrap()
        .expect("account by username");
    assert_eq!(by_name.id, "acct-1");

    assert!(db.username_exists("alice").unwrap());
    assert!(!db.username_exists("bob").unwrap());
}

#[test]
fn test_ensure_storage_dir_generated_once() {
    let (_dir, db) = test_db();
    db.put_account(&sample_account("acct-1", "alice")).unwrap();

    let first = db
        .ensure_storage_dir("acct-1")
        .unwrap()
        .expect("dir for existing account");
    assert!(first.starts_with("acct-1_"));

    let second = db.ensure_storage_dir("acct-1").unwrap().unwrap();
    assert_eq!(first, second);

    // Cached on the account record too.
    let account = db.get_account("acct-1").unwrap().unwrap();
    assert_eq!(account.storage_dir.as_deref(), Some(first.as_str()));
}

#[test]
fn test_renaming_account_drops_stale_username_entry() {
    let (_dir, db) = test_db();
    db.put_account(&sample_account("acct-1", "alice")).unwrap();

    let mut account = db.get_account("acct-1").unwrap().unwrap();
    account.username = "alicia".to_string();
    db.put_account(&account).unwrap();

    assert!(db.get_account_by_username("alice").unwrap().is_none());
    assert!(!db.username_exists("alice").unwrap());
    let renamed = db.get_account_by_username("alicia").unwrap().unwrap();
    assert_eq!(renamed.id, "acct-1");
}

#[test]
fn test_ensure_storage_dir_missing_account() {
    let (_dir, db) = test_db();
    assert!(db.ensure_storage_dir("ghost").unwrap().is_none());
}

#[test]
fn test_delete_account_cleans_username_index() {
    let (_dir, db) = test_db();
    db.put_account(&sample_account("acct-1", "alice")).unwrap();

    assert!(db.delete_account("acct-1").unwrap());
    assert!(db.get_account("acct-1").unwrap().is_none());
    assert!(db.get_account_by_username("alice").unwrap().is_none());
    assert!(!db.delete_account("acct-1").unwrap());
}

// ============================================================================
// Categories
// ============================================================================

#[test]
fn test_categories_sorted_by_name() {
    let (_dir, db) = test_db();
    db.put_category(&Category {
        slug: "z-reports".to_string(),
        name: "Annual Reports".to_string(),
        parent: None,
    })
    .unwrap();
    db.put_category(&Category {
        slug: "invoices".to_string(),
        name: "Invoices".to_string(),
        parent: Some("z-reports".to_string()),
    })
    .unwrap();

    let all = db.get_all_categories().unwrap();
    let names: Vec<&str> = all.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Annual Reports", "Invoices"]);
    assert_eq!(all[1].parent.as_deref(), Some("z-reports"));
}

#[test]
fn test_delete_category() {
    let (_dir, db) = test_db();
    db.put_category(&Category {
        slug: "invoices".to_string(),
        name: "Invoices".to_string(),
        parent: None,
    })
    .unwrap();

    assert!(db.delete_category("invoices").unwrap());
    assert!(db.get_category("invoices").unwrap().is_none());
    assert!(!db.delete_category("invoices").unwrap());
}

// ============================================================================
// Settings
// ============================================================================

#[test]
fn test_notification_template_defaults_until_saved() {
    let (_dir, db) = test_db();

    let template = db.get_notification_template().unwrap();
    assert_eq!(template, NotificationTemplate::default());
    assert!(template.subject.contains("%blogname%"));

    let custom = NotificationTemplate {
        subject: "New file: %filename%".to_string(),
        body: "Get it at %download_url%".to_string(),
    };
    db.put_notification_template(&custom).unwrap();
    assert_eq!(db.get_notification_template().unwrap(), custom);
}

// ============================================================================
// Purge
// ============================================================================

#[test]
fn test_purge_all() {
    let (_dir, db) = test_db();
    db.put_file(&sample_record("file-1", "alice")).unwrap();
    db.put_file(&sample_record("file-2", "bob")).unwrap();
    db.put_account(&sample_account("acct-1", "alice")).unwrap();
    db.put_category(&Category {
        slug: "invoices".to_string(),
        name: "Invoices".to_string(),
        parent: None,
    })
    .unwrap();

    let stats = db.purge_all().unwrap();
    assert_eq!(stats.files, 2);
    assert_eq!(stats.accounts, 1);
    assert_eq!(stats.categories, 1);

    assert!(db.get_all_files().unwrap().is_empty());
    assert!(db.get_files_by_owner("alice").unwrap().is_empty());
    assert!(!db.username_exists("alice").unwrap());
}
