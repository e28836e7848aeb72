//! Library controller and preview session against the in-memory store.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use docshelf_core::models::{COLOR_PDF, COLOR_TEXT};
use docshelf_core::{
    CategoryChoice, ConnectionStatus, CreateArticleRequest, Document, DocumentType, Error,
    Library, PreviewContent, PreviewState, Section, UploadFileRequest, UploadProgress,
};
use docshelf_store::MemoryDocumentStore;
use uuid::Uuid;

fn document(title: &str, doc_type: DocumentType, day: u32) -> Document {
    Document {
        id: Uuid::new_v4(),
        title: title.to_string(),
        doc_type,
        tags: Vec::new(),
        date_added: Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap(),
        favorite: false,
        category: None,
        background_color: doc_type.default_color().to_string(),
        content: None,
        storage_path: None,
    }
}

fn article(title: &str, day: u32, body: &str) -> Document {
    Document {
        content: Some(body.to_string()),
        ..document(title, DocumentType::Article, day)
    }
}

fn stored(title: &str, doc_type: DocumentType, day: u32, path: &str) -> Document {
    Document {
        storage_path: Some(path.to_string()),
        ..document(title, doc_type, day)
    }
}

async fn library_with(store: Arc<MemoryDocumentStore>) -> Library {
    let mut lib = Library::new(store);
    lib.refresh().await.expect("refresh");
    lib
}

#[tokio::test]
async fn test_refresh_loads_newest_first_and_derives_panels() {
    let mut report = stored("Report", DocumentType::Pdf, 1, "r/report.pdf");
    report.category = Some("Work".to_string());
    report.tags = vec!["q3".to_string(), "finance".to_string()];
    let mut notes = article("Notes", 3, "hello");
    notes.tags = vec!["finance".to_string(), "ideas".to_string()];
    let store = Arc::new(MemoryDocumentStore::new().with_documents([report, notes]));

    let lib = library_with(store).await;

    assert_eq!(*lib.status(), ConnectionStatus::Connected);
    let titles: Vec<_> = lib.documents().iter().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, vec!["Notes", "Report"]);
    assert_eq!(
        lib.available_categories(),
        &[
            CategoryChoice::All,
            CategoryChoice::Named("Work".to_string()),
            CategoryChoice::Uncategorized
        ]
    );
    assert_eq!(lib.available_tags(), &["finance", "ideas", "q3"]);
    assert_eq!(lib.counts().articles, 1);
}

#[tokio::test]
async fn test_offline_refresh_keeps_previous_collection() {
    let store = Arc::new(MemoryDocumentStore::new().with_documents([article("A", 1, "a")]));
    let mut lib = library_with(store.clone()).await;

    store.set_online(false);
    assert!(lib.refresh().await.unwrap_err().is_connection());
    assert!(matches!(lib.status(), ConnectionStatus::Disconnected(_)));
    assert_eq!(lib.documents().len(), 1);

    assert!(lib.retry().await.is_err());
    store.set_online(true);
    lib.retry().await.unwrap();
    assert_eq!(*lib.status(), ConnectionStatus::Connected);
}

#[tokio::test]
async fn test_favorite_toggle_failure_leaves_state_unchanged() {
    let doc = article("A", 1, "a");
    let id = doc.id;
    let store = Arc::new(MemoryDocumentStore::new().with_documents([doc]));
    let mut lib = library_with(store.clone()).await;

    store.set_online(false);
    assert!(lib.toggle_favorite(id).await.is_err());
    assert!(!lib.document(id).unwrap().favorite);
    assert_eq!(lib.counts().favorites, 0);

    store.set_online(true);
    assert!(lib.toggle_favorite(id).await.unwrap());
    assert!(lib.document(id).unwrap().favorite);

    lib.filters_mut().set_section(Section::Favorites);
    assert_eq!(lib.visible().len(), 1);
}

#[tokio::test]
async fn test_delete_removes_document_blob_and_open_preview() {
    let doc = stored("Notes", DocumentType::Text, 1, "n/notes.txt");
    let id = doc.id;
    let store = Arc::new(MemoryDocumentStore::new().with_documents([doc]));
    store.put_blob("n/notes.txt", "plain words");
    let mut lib = library_with(store.clone()).await;

    assert!(lib.open_preview(id).await.unwrap());
    assert_eq!(lib.preview().state().document_id(), Some(id));

    lib.delete(id).await.unwrap();
    assert!(lib.documents().is_empty());
    assert_eq!(store.blob_count(), 0);
    assert_eq!(lib.preview().state(), PreviewState::Closed);
}

#[tokio::test]
async fn test_pdf_upload_gets_red_tint_and_goes_first() {
    let store = Arc::new(MemoryDocumentStore::new().with_documents([article("Old", 1, "x")]));
    let mut lib = library_with(store.clone()).await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let progress = UploadProgress::new(move |p| sink.lock().unwrap().push(p));

    let doc = lib
        .upload(
            UploadFileRequest {
                data: b"%PDF-1.4 quarterly numbers".to_vec(),
                filename: "report.pdf".to_string(),
                title: "Q3 Report".to_string(),
                content_type: Some("application/pdf".to_string()),
                category: Some("Work".to_string()),
                ..Default::default()
            },
            progress,
        )
        .await
        .unwrap();
    assert_eq!(doc.doc_type, DocumentType::Pdf);
    assert_eq!(doc.background_color, COLOR_PDF);

    assert_eq!(lib.documents()[0].title, "Q3 Report");
    assert!(lib
        .available_categories()
        .contains(&CategoryChoice::Named("Work".to_string())));
    assert_eq!(seen.lock().unwrap().last(), Some(&100));
    assert_eq!(store.blob_count(), 1);
}

#[tokio::test]
async fn test_oversized_upload_never_reaches_store() {
    let store = Arc::new(MemoryDocumentStore::new());
    let mut lib = Library::new(store.clone());

    let err = lib
        .upload(
            UploadFileRequest {
                data: vec![0u8; 11 * 1024 * 1024],
                filename: "huge.bin".to_string(),
                title: "Huge".to_string(),
                ..Default::default()
            },
            UploadProgress::noop(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::SizeLimit { .. }));
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_failed_insert_cleans_up_blob() {
    let store = Arc::new(MemoryDocumentStore::new());
    let mut lib = Library::new(store.clone());
    store.fail_next_insert();

    let result = lib
        .upload(
            UploadFileRequest {
                data: b"some text".to_vec(),
                filename: "notes.txt".to_string(),
                title: "Notes".to_string(),
                ..Default::default()
            },
            UploadProgress::noop(),
        )
        .await;

    assert!(result.is_err());
    assert!(lib.documents().is_empty());
    assert_eq!(store.blob_count(), 0);
}

#[tokio::test]
async fn test_article_creation_and_inline_preview() {
    let store = Arc::new(MemoryDocumentStore::new());
    let mut lib = Library::new(store);

    let id = lib
        .create_article(CreateArticleRequest {
            title: "Essay".to_string(),
            content: "Long form thoughts".to_string(),
            tags: vec!["writing".to_string()],
            background_color: Some(COLOR_TEXT.to_string()),
            ..Default::default()
        })
        .await
        .unwrap()
        .id;

    assert_eq!(lib.document(id).unwrap().background_color, COLOR_TEXT);
    assert_eq!(lib.available_tags(), &["writing"]);

    assert!(lib.open_preview(id).await.unwrap());
    match lib.preview().state() {
        PreviewState::Ready {
            content: PreviewContent::Article { text },
            ..
        } => assert_eq!(text, "Long form thoughts"),
        other => panic!("unexpected state: {:?}", other),
    }
}

#[tokio::test]
async fn test_pdf_preview_carries_view_state() {
    let doc = stored("Manual", DocumentType::Pdf, 2, "m/manual.pdf");
    let id = doc.id;
    let store = Arc::new(MemoryDocumentStore::new().with_documents([doc]));
    store.put_blob("m/manual.pdf", b"%PDF-1.4".to_vec());
    let lib = library_with(store).await;

    assert!(lib.open_preview(id).await.unwrap());
    assert!(lib.preview().update_pdf_view(|view| {
        view.set_page_count(3);
        view.next_page();
    }));
    match lib.preview().state() {
        PreviewState::Ready {
            content: PreviewContent::Pdf { url, view },
            ..
        } => {
            assert_eq!(url, "memory://m/manual.pdf");
            assert_eq!(view.page, 2);
        }
        other => panic!("unexpected state: {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_blob_shows_failure() {
    let doc = stored("Gone", DocumentType::Markdown, 2, "g/gone.md");
    let id = doc.id;
    let store = Arc::new(MemoryDocumentStore::new().with_documents([doc]));
    let lib = library_with(store).await;

    assert!(lib.open_preview(id).await.unwrap());
    assert!(matches!(
        lib.preview().state(),
        PreviewState::Failed { document_id, .. } if document_id == id
    ));
}

#[tokio::test(start_paused = true)]
async fn test_slow_preview_does_not_overwrite_newer_one() {
    let slow = article("Slow", 1, "slow body");
    let fast = article("Fast", 2, "fast body");
    let (slow_id, fast_id) = (slow.id, fast.id);
    let store = Arc::new(MemoryDocumentStore::new().with_documents([slow, fast]));
    store.set_latency(slow_id, Duration::from_millis(500));
    let lib = library_with(store).await;

    let (slow_committed, fast_committed) =
        tokio::join!(lib.open_preview(slow_id), lib.open_preview(fast_id));

    assert!(!slow_committed.unwrap());
    assert!(fast_committed.unwrap());
    match lib.preview().state() {
        PreviewState::Ready {
            document_id,
            content: PreviewContent::Article { text },
        } => {
            assert_eq!(document_id, fast_id);
            assert_eq!(text, "fast body");
        }
        other => panic!("unexpected state: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_close_discards_in_flight_preview() {
    let doc = article("Slow", 1, "body");
    let id = doc.id;
    let store = Arc::new(MemoryDocumentStore::new().with_documents([doc]));
    store.set_latency(id, Duration::from_millis(500));
    let lib = library_with(store).await;

    let (committed, _) = tokio::join!(lib.open_preview(id), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        lib.close_preview();
    });

    assert!(!committed.unwrap());
    assert_eq!(lib.preview().state(), PreviewState::Closed);
}

#[tokio::test]
async fn test_filtering_through_library_state() {
    let mut a = stored("Design spec", DocumentType::Pdf, 1, "a/spec.pdf");
    a.tags = vec!["design".to_string()];
    let mut b = article("Design notes", 2, "n");
    b.category = Some("Work".to_string());
    let c = stored("Holiday photo", DocumentType::Image, 3, "c/photo.png");
    let store = Arc::new(MemoryDocumentStore::new().with_documents([a, b, c]));
    let mut lib = library_with(store).await;

    lib.filters_mut().set_query("design");
    assert_eq!(lib.visible().len(), 2);

    lib.filters_mut().toggle_category(CategoryChoice::Uncategorized);
    let titles: Vec<_> = lib.visible().iter().map(|d| d.title.clone()).collect();
    assert_eq!(titles, vec!["Design spec"]);

    lib.filters_mut().reset_filters();
    lib.filters_mut().clear_search();
    lib.filters_mut().set_section(Section::Articles);
    assert_eq!(lib.visible().len(), 1);
}
