//! End-to-end document lifecycle through the engine services

use docsign_core::*;
use docsign_engine::test_utils::{sample_pdf, TestServices};
use lopdf::Document as PdfDocument;

#[tokio::test]
async fn register_upload_sign_download() {
    let svc = TestServices::new();

    // Register and log in
    let user_id = svc.credentials.register("a@x.com", "pw1").unwrap();
    let (_, token) = svc.login("a@x.com", "pw1").unwrap();
    let header = format!("Bearer {}", token.access_token);
    let principal = svc.guard.resolve(Some(&header)).unwrap();
    assert_eq!(principal.id, user_id);

    // Upload
    let original = sample_pdf();
    let id = svc
        .registry
        .upload(&principal.id, "report.pdf", original.as_slice())
        .unwrap();

    let listed = svc.registry.list_for(&principal.id).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, id);
    assert_eq!(listed[0].status, DocumentStatus::Pending);

    // Sign
    let signed = svc.signer.sign(&principal.id, &id).unwrap();
    assert_eq!(signed.status, DocumentStatus::Signed);

    let listed = svc.registry.list_for(&principal.id).unwrap();
    assert_eq!(listed[0].status, DocumentStatus::Signed);
    assert_eq!(
        svc.registry.get(&principal.id, &id).unwrap().status,
        DocumentStatus::Signed
    );

    // Download the transformed artifact
    let artifact = svc.registry.download(&principal.id, &id).unwrap();
    assert_ne!(artifact.bytes, original);
    assert_eq!(artifact.filename.as_str(), "report.pdf");
    assert_eq!(artifact.content_type, "application/pdf");

    let pdf = PdfDocument::load_mem(&artifact.bytes).unwrap();
    let page_id = pdf.get_pages()[&1];
    let content = pdf.get_page_content(page_id).unwrap();
    assert!(String::from_utf8_lossy(&content).contains("(SIGNED) Tj"));
}

#[tokio::test]
async fn cross_user_access_is_not_found() {
    let svc = TestServices::new();
    let alice = svc.user("alice@x.com");
    let bob = svc.user("bob@x.com");

    let id = svc
        .registry
        .upload(&alice, "alice.pdf", sample_pdf().as_slice())
        .unwrap();

    assert!(matches!(svc.registry.get(&bob, &id), Err(DocSignError::NotFound)));
    assert!(matches!(svc.registry.download(&bob, &id), Err(DocSignError::NotFound)));
    assert!(matches!(svc.signer.sign(&bob, &id), Err(DocSignError::NotFound)));

    // A foreign id and a missing id give the same error
    let missing = DocumentId::from_ulid(ulid::Ulid::new());
    let foreign_err = svc.registry.get(&bob, &id).unwrap_err().to_string();
    let missing_err = svc.registry.get(&bob, &missing).unwrap_err().to_string();
    assert_eq!(foreign_err, missing_err);

    // Alice's document is untouched
    assert_eq!(
        svc.registry.get(&alice, &id).unwrap().status,
        DocumentStatus::Pending
    );
}

#[tokio::test]
async fn reopened_keyspace_keeps_users_and_documents() {
    let temp = tempfile::tempdir().unwrap();
    let config = docsign_engine::test_utils::test_config(temp.path());
    let key = docsign_core::auth::TokenKey::from_seed(&[1u8; 32]);

    let (user_id, doc_id, token) = {
        let svc = docsign_engine::DocSignServices::open(&config, &key).unwrap();
        let user_id = svc.credentials.register("a@x.com", "pw1").unwrap();
        let doc_id = svc
            .registry
            .upload(&user_id, "a.pdf", sample_pdf().as_slice())
            .unwrap();
        svc.signer.sign(&user_id, &doc_id).unwrap();
        let (_, token) = svc.login("a@x.com", "pw1").unwrap();
        svc.engine.persist().unwrap();
        (user_id, doc_id, token)
    };

    let svc = docsign_engine::DocSignServices::open(&config, &key).unwrap();
    let header = format!("Bearer {}", token.access_token);
    assert_eq!(svc.guard.resolve(Some(&header)).unwrap().id, user_id);
    assert_eq!(
        svc.registry.get(&user_id, &doc_id).unwrap().status,
        DocumentStatus::Signed
    );
}
