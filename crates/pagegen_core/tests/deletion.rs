use pagegen_core::db::open_db_in_memory;
use pagegen_core::{
    ActionNonce, Capability, DeletionService, Document, DocumentListQuery, DocumentRepository,
    GenerateRequest, GenerationService, PageGenError, Principal, PublishStatus,
    SqliteDocumentRepository, ACTION_DELETE_BY_SOURCE,
};
use std::io::Write;
use tempfile::TempDir;

fn generate_from(
    repo: &impl DocumentRepository,
    dir: &TempDir,
    template: &Document,
    filename: &str,
    content: &str,
) -> Vec<pagegen_core::DocumentId> {
    let path = dir.path().join(filename);
    std::fs::File::create(&path)
        .unwrap()
        .write_all(content.as_bytes())
        .unwrap();
    GenerationService::new(repo)
        .generate(&GenerateRequest {
            template_id: template.id,
            csv_path: path,
            status: PublishStatus::Publish,
            source_filename: filename.to_string(),
            parent_id: None,
        })
        .unwrap()
        .created
}

fn remaining_titles(repo: &impl DocumentRepository) -> Vec<String> {
    repo.list_documents(&DocumentListQuery {
        include_deleted: true,
        ..DocumentListQuery::default()
    })
    .unwrap()
    .into_iter()
    .map(|document| document.title)
    .collect()
}

#[test]
fn delete_by_source_removes_only_matching_label() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let template = Document::new("Template", "{{title}}");
    repo.create_document(&template).unwrap();
    let dir = tempfile::tempdir().unwrap();
    generate_from(&repo, &dir, &template, "a.csv", "title\nA1\nA2\n");
    generate_from(&repo, &dir, &template, "b.csv", "title\nB1\n");

    let nonce = ActionNonce::new("secret");
    let token = nonce.issue(ACTION_DELETE_BY_SOURCE);
    let report = DeletionService::new(&repo)
        .delete_by_source(&nonce, &token, "a.csv")
        .unwrap();

    assert_eq!(report.deleted, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(report.source_label.as_deref(), Some("a.csv"));
    assert_eq!(remaining_titles(&repo), vec!["Template", "B1"]);
}

#[test]
fn delete_by_source_sanitizes_the_requested_name() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let template = Document::new("Template", "{{title}}");
    repo.create_document(&template).unwrap();
    let dir = tempfile::tempdir().unwrap();
    generate_from(&repo, &dir, &template, "my file.csv", "title\nX\n");

    let nonce = ActionNonce::new("secret");
    let report = DeletionService::new(&repo)
        .delete_by_source(&nonce, &nonce.issue(ACTION_DELETE_BY_SOURCE), "my file.csv")
        .unwrap();
    assert_eq!(report.source_label.as_deref(), Some("my-file.csv"));
    assert_eq!(report.deleted, 1);
}

#[test]
fn delete_by_source_rejects_bad_tokens_before_touching_the_store() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let template = Document::new("Template", "{{title}}");
    repo.create_document(&template).unwrap();
    let dir = tempfile::tempdir().unwrap();
    generate_from(&repo, &dir, &template, "a.csv", "title\nA1\n");

    let nonce = ActionNonce::new("secret");
    let wrong_action = nonce.issue("something_else");
    let foreign = ActionNonce::new("other").issue(ACTION_DELETE_BY_SOURCE);
    let service = DeletionService::new(&repo);

    for token in ["", "garbage", wrong_action.as_str(), foreign.as_str()] {
        let err = service.delete_by_source(&nonce, token, "a.csv").unwrap_err();
        assert!(matches!(err, PageGenError::Unauthorized(_)));
    }
    assert_eq!(remaining_titles(&repo).len(), 2);
}

#[test]
fn delete_all_requires_manage_options() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let template = Document::new("Template", "{{title}}");
    repo.create_document(&template).unwrap();
    let dir = tempfile::tempdir().unwrap();
    generate_from(&repo, &dir, &template, "a.csv", "title\nA1\n");

    let service = DeletionService::new(&repo);
    for principal in [
        Principal::anonymous(),
        Principal::with_capabilities([Capability::EditPages]),
    ] {
        let err = service.delete_all(&principal).unwrap_err();
        assert!(matches!(err, PageGenError::Unauthorized(_)));
    }
    assert_eq!(remaining_titles(&repo).len(), 2);
}

#[test]
fn delete_all_removes_every_generated_document_including_tombstoned() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let template = Document::new("Template", "{{title}}");
    let manual = Document::new("Manual", "hand written");
    repo.create_document(&template).unwrap();
    repo.create_document(&manual).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let created = generate_from(&repo, &dir, &template, "a.csv", "title\nA1\nA2\n");
    generate_from(&repo, &dir, &template, "b.csv", "title\nB1\n");
    repo.delete_document(created[0], false).unwrap();

    let admin = Principal::with_capabilities([Capability::ManageOptions]);
    let report = DeletionService::new(&repo).delete_all(&admin).unwrap();

    assert_eq!(report.deleted, 3);
    assert_eq!(report.source_label, None);
    assert!(report.summary().starts_with("All generated pages deleted"));
    assert_eq!(remaining_titles(&repo), vec!["Template", "Manual"]);
}

#[test]
fn delete_all_on_empty_store_is_a_no_op() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let admin = Principal::with_capabilities([Capability::ManageOptions]);

    let report = DeletionService::new(&repo).delete_all(&admin).unwrap();
    assert_eq!(report.deleted, 0);
    assert_eq!(report.failed, 0);
}

#[test]
fn source_labels_are_listed_once_in_first_seen_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let template = Document::new("Template", "{{title}}");
    repo.create_document(&template).unwrap();
    let dir = tempfile::tempdir().unwrap();
    generate_from(&repo, &dir, &template, "b.csv", "title\nB1\nB2\n");
    generate_from(&repo, &dir, &template, "a.csv", "title\nA1\n");

    let service = DeletionService::new(&repo);
    assert_eq!(service.list_source_filenames().unwrap(), vec!["b.csv", "a.csv"]);

    let nonce = ActionNonce::new("secret");
    service
        .delete_by_source(&nonce, &nonce.issue(ACTION_DELETE_BY_SOURCE), "b.csv")
        .unwrap();
    assert_eq!(service.list_source_filenames().unwrap(), vec!["a.csv"]);
}
