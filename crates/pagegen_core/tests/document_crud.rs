use pagegen_core::db::{open_db_in_memory, DbError};
use pagegen_core::{
    Document, DocumentListQuery, DocumentRepository, MetaFilter, PublishStatus, RepoError,
    SqliteDocumentRepository, SqliteSettingsStore,
};
use rusqlite::Connection;

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();

    let parent = Document::new("Parent", "");
    repo.create_document(&parent).unwrap();

    let mut doc = Document::new("Acme", "<p>body</p>");
    doc.status = PublishStatus::Draft;
    doc.parent_id = Some(parent.id);
    let id = repo.create_document(&doc).unwrap();

    let loaded = repo.get_document(id, false).unwrap().unwrap();
    assert_eq!(loaded, doc);
}

#[test]
fn update_existing_document() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();

    let mut doc = Document::new("draft", "v1");
    repo.create_document(&doc).unwrap();

    doc.content = "v2".to_string();
    doc.status = PublishStatus::Private;
    repo.update_document(&doc).unwrap();

    let loaded = repo.get_document(doc.id, false).unwrap().unwrap();
    assert_eq!(loaded.content, "v2");
    assert_eq!(loaded.status, PublishStatus::Private);
}

#[test]
fn update_not_found_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();

    let doc = Document::new("missing", "");
    let err = repo.update_document(&doc).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == doc.id));
}

#[test]
fn validation_failure_blocks_create() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();

    let err = repo.create_document(&Document::new("  ", "x")).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[test]
fn soft_delete_hides_and_permanent_delete_removes() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();

    let soft = Document::new("soft", "");
    let hard = Document::new("hard", "");
    repo.create_document(&soft).unwrap();
    repo.create_document(&hard).unwrap();
    repo.add_meta(hard.id, "k", "v").unwrap();

    repo.delete_document(soft.id, false).unwrap();
    assert!(repo.get_document(soft.id, false).unwrap().is_none());
    assert!(repo.get_document(soft.id, true).unwrap().unwrap().is_deleted);

    repo.delete_document(hard.id, true).unwrap();
    assert!(repo.get_document(hard.id, true).unwrap().is_none());
    let orphaned: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM document_meta WHERE document_uuid = ?1;",
            [hard.id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(orphaned, 0);

    let err = repo.delete_document(hard.id, true).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(_)));
}

#[test]
fn add_meta_appends_and_set_meta_replaces() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();

    let doc = Document::new("meta", "");
    repo.create_document(&doc).unwrap();

    repo.add_meta(doc.id, "source", "a.csv").unwrap();
    repo.add_meta(doc.id, "source", "b.csv").unwrap();
    assert_eq!(repo.get_meta(doc.id, "source").unwrap().as_deref(), Some("a.csv"));

    repo.set_meta(doc.id, "source", "c.csv").unwrap();
    assert_eq!(repo.get_meta(doc.id, "source").unwrap().as_deref(), Some("c.csv"));
    assert_eq!(repo.get_meta(doc.id, "absent").unwrap(), None);
}

#[test]
fn meta_on_missing_document_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();

    let ghost = Document::new("ghost", "");
    let err = repo.add_meta(ghost.id, "k", "v").unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == ghost.id));
}

#[test]
fn list_filters_by_meta_and_title_in_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();

    let first = Document::new("Acme", "1");
    let second = Document::new("Acme", "2");
    let other = Document::new("Beta", "3");
    let untagged = Document::new("Acme", "4");
    for doc in [&first, &second, &other] {
        repo.create_document(doc).unwrap();
        repo.add_meta(doc.id, "flag", "1").unwrap();
    }
    repo.create_document(&untagged).unwrap();
    repo.add_meta(other.id, "source", "x.csv").unwrap();

    let acme = repo
        .list_documents(&DocumentListQuery {
            meta: Some(MetaFilter::has_key("flag")),
            title: Some("Acme".to_string()),
            ..DocumentListQuery::default()
        })
        .unwrap();
    let ids: Vec<_> = acme.iter().map(|doc| doc.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);

    let by_source = repo
        .list_documents(&DocumentListQuery {
            meta: Some(MetaFilter::equals("source", "x.csv")),
            ..DocumentListQuery::default()
        })
        .unwrap();
    assert_eq!(by_source.len(), 1);
    assert_eq!(by_source[0].id, other.id);

    let first_only = repo
        .list_documents(&DocumentListQuery {
            title: Some("Acme".to_string()),
            limit: Some(1),
            offset: 1,
            ..DocumentListQuery::default()
        })
        .unwrap();
    assert_eq!(first_only[0].id, second.id);
}

#[test]
fn title_match_is_case_sensitive() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();

    repo.create_document(&Document::new("Acme", "")).unwrap();
    let found = repo
        .list_documents(&DocumentListQuery {
            title: Some("acme".to_string()),
            ..DocumentListQuery::default()
        })
        .unwrap();
    assert!(found.is_empty());
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteDocumentRepository::try_new(&conn) {
        Err(RepoError::Db(DbError::SchemaBehind { found: 0, required })) => assert!(required > 0),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected schema behind error"),
    }
}

#[test]
fn settings_store_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    assert!(matches!(
        SqliteSettingsStore::try_new(&conn),
        Err(RepoError::Db(DbError::SchemaBehind { found: 0, .. }))
    ));
}
