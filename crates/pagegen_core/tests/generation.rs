use pagegen_core::db::open_db_in_memory;
use pagegen_core::model::provenance::{
    META_GENERATED, META_ROW_FINGERPRINT, META_SEO_DESCRIPTION, META_SEO_TITLE,
    META_SOURCE_FILENAME,
};
use pagegen_core::{
    Document, DocumentListQuery, DocumentRepository, Fingerprint, GenerateRequest,
    GenerationService, MetaFilter, PageGenError, Preferences, PublishStatus, Row,
    SqliteDocumentRepository, SqliteSettingsStore,
};
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;
use uuid::Uuid;

fn write_csv(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content).unwrap();
    path
}

fn request(template_id: Uuid, csv_path: PathBuf) -> GenerateRequest {
    GenerateRequest {
        template_id,
        csv_path,
        status: PublishStatus::Publish,
        source_filename: "cities.csv".to_string(),
        parent_id: None,
    }
}

fn generated(repo: &impl DocumentRepository) -> Vec<Document> {
    repo.list_documents(&DocumentListQuery {
        meta: Some(MetaFilter::has_key(META_GENERATED)),
        ..DocumentListQuery::default()
    })
    .unwrap()
}

#[test]
fn two_rows_create_two_flagged_documents() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let template = Document::new("Template", "<h1>{{title}}</h1><p>{{city}}</p>");
    repo.create_document(&template).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(&dir, "in.csv", b"title,city\nAcme,Oslo\nBeta,Bergen\n");

    let service = GenerationService::new(&repo);
    let report = service.generate(&request(template.id, csv)).unwrap();

    assert_eq!(report.created.len(), 2);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.failed, 0);
    assert_eq!(report.source_label, "cities.csv");

    let docs = generated(&repo);
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].title, "Acme");
    assert_eq!(docs[0].content, "<h1>Acme</h1><p>Oslo</p>");
    assert_eq!(docs[1].content, "<h1>Beta</h1><p>Bergen</p>");
    for doc in &docs {
        assert_eq!(doc.status, PublishStatus::Publish);
        assert_eq!(repo.get_meta(doc.id, META_GENERATED).unwrap().as_deref(), Some("1"));
        assert_eq!(
            repo.get_meta(doc.id, META_SOURCE_FILENAME).unwrap().as_deref(),
            Some("cities.csv")
        );
    }

    let expected: Row = [("title", "Acme"), ("city", "Oslo")].into_iter().collect();
    assert_eq!(
        repo.get_meta(docs[0].id, META_ROW_FINGERPRINT).unwrap(),
        Some(Fingerprint::of(&expected).unwrap().as_str().to_string())
    );

    // Template body is never mutated.
    let reloaded = repo.get_document(template.id, false).unwrap().unwrap();
    assert_eq!(reloaded.content, template.content);
}

#[test]
fn column_count_mismatch_and_missing_titles_produce_nothing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let template = Document::new("Template", "{{title}}");
    repo.create_document(&template).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(&dir, "in.csv", b"title,city,price\nShort,Row\n  ,Oslo,1\nOk,Bergen,2\n");

    let report = GenerationService::new(&repo)
        .generate(&request(template.id, csv))
        .unwrap();

    assert_eq!(report.created.len(), 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(generated(&repo)[0].title, "Ok");
}

#[test]
fn csv_without_title_column_creates_nothing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let template = Document::new("Template", "{{name}}");
    repo.create_document(&template).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(&dir, "in.csv", b"name\nAnn\nBob\n");

    let report = GenerationService::new(&repo)
        .generate(&request(template.id, csv))
        .unwrap();
    assert!(report.created.is_empty());
    assert_eq!(report.skipped, 2);
}

#[test]
fn status_parent_and_seo_fields_are_applied() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let template = Document::new("Template", "{{title}}");
    let parent = Document::new("Cities", "");
    repo.create_document(&template).unwrap();
    repo.create_document(&parent).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(
        &dir,
        "in.csv",
        b"title,meta_title,meta_description\nAcme,<b>Acme</b> | Best,\"Line one\nline two\"\n",
    );

    let mut req = request(template.id, csv);
    req.status = PublishStatus::Draft;
    req.parent_id = Some(parent.id);
    req.source_filename = "My Cities (2024).csv".to_string();
    let report = GenerationService::new(&repo).generate(&req).unwrap();

    let doc = repo.get_document(report.created[0], false).unwrap().unwrap();
    assert_eq!(doc.status, PublishStatus::Draft);
    assert_eq!(doc.parent_id, Some(parent.id));
    assert_eq!(
        repo.get_meta(doc.id, META_SOURCE_FILENAME).unwrap().as_deref(),
        Some("My-Cities-2024.csv")
    );
    assert_eq!(
        repo.get_meta(doc.id, META_SEO_TITLE).unwrap().as_deref(),
        Some("Acme | Best")
    );
    // Control characters are stripped by the normalizer before the text filter.
    assert_eq!(
        repo.get_meta(doc.id, META_SEO_DESCRIPTION).unwrap().as_deref(),
        Some("Line oneline two")
    );
}

#[test]
fn latin1_and_smart_punctuation_are_cleaned_before_rendering() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let template = Document::new("Template", "<p>{{quote}}</p>");
    repo.create_document(&template).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let mut content = b"title,quote\nCaf".to_vec();
    content.push(0xE9);
    content.extend_from_slice(",ok\nSmart,\"don\u{2019}t\u{2014}stop\u{2026}\"\n".as_bytes());
    let csv = write_csv(&dir, "in.csv", &content);

    let report = GenerationService::new(&repo)
        .generate(&request(template.id, csv))
        .unwrap();
    assert_eq!(report.created.len(), 2);

    let docs = generated(&repo);
    assert_eq!(docs[0].title, "Caf\u{e9}");
    assert_eq!(docs[1].content, "<p>don't-stop...</p>");
}

#[test]
fn missing_template_aborts_before_reading_csv() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();

    let missing = Uuid::new_v4();
    let err = GenerationService::new(&repo)
        .generate(&request(missing, PathBuf::from("/definitely/not/here.csv")))
        .unwrap_err();
    assert!(matches!(err, PageGenError::TemplateNotFound(id) if id == missing));
}

#[test]
fn unreadable_csv_is_invalid_input() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let template = Document::new("Template", "{{title}}");
    repo.create_document(&template).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.csv");
    let err = GenerationService::new(&repo)
        .generate(&request(template.id, missing))
        .unwrap_err();
    assert!(matches!(err, PageGenError::InvalidInput(_)));

    let empty = write_csv(&dir, "empty.csv", b"");
    let err = GenerationService::new(&repo)
        .generate(&request(template.id, empty))
        .unwrap_err();
    assert!(matches!(err, PageGenError::InvalidInput(_)));
    assert!(generated(&repo).is_empty());
}

#[test]
fn returned_preferences_remember_the_template() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let settings = SqliteSettingsStore::try_new(&conn).unwrap();
    let template = Document::new("Template", "{{title}}");
    repo.create_document(&template).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(&dir, "in.csv", b"title\nAcme\n");
    let report = GenerationService::new(&repo)
        .generate(&request(template.id, csv))
        .unwrap();

    assert_eq!(report.preferences.last_template_id, Some(template.id));
    report.preferences.save(&settings).unwrap();
    assert_eq!(
        Preferences::load(&settings).unwrap().last_template_id,
        Some(template.id)
    );
}

#[test]
fn row_level_failure_does_not_abort_the_batch() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteDocumentRepository::try_new(&conn).unwrap();
    let template = Document::new("Template", "{{title}}");
    repo.create_document(&template).unwrap();
    conn.execute_batch(
        "CREATE TRIGGER reject_boom BEFORE INSERT ON documents
         WHEN NEW.title = 'Boom'
         BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(&dir, "in.csv", b"title\nAcme\nBoom\nBeta\n");
    let report = GenerationService::new(&repo)
        .generate(&request(template.id, csv))
        .unwrap();

    assert_eq!(report.created.len(), 2);
    assert_eq!(report.failed, 1);
    assert!(report.summary().contains("2 created"));
}
