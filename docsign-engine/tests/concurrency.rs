//! Concurrent access to one document

use docsign_core::*;
use docsign_engine::test_utils::{sample_pdf, TestServices};
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_signs_apply_exactly_once() {
    let svc = Arc::new(TestServices::new());
    let owner = svc.user("a@x.com");
    let id = svc
        .registry
        .upload(&owner, "report.pdf", sample_pdf().as_slice())
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let svc = svc.clone();
        handles.push(tokio::task::spawn_blocking(move || svc.signer.sign(&owner, &id)));
    }

    let mut signed = 0;
    let mut already = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(doc) => {
                assert_eq!(doc.status, DocumentStatus::Signed);
                signed += 1;
            }
            Err(DocSignError::AlreadySigned) => already += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(signed, 1);
    assert_eq!(already, 7);

    // Exactly one mark was applied
    let bytes = svc.registry.download(&owner, &id).unwrap().bytes;
    let pdf = lopdf::Document::load_mem(&bytes).unwrap();
    let content = pdf.get_page_content(pdf.get_pages()[&1]).unwrap();
    assert_eq!(String::from_utf8_lossy(&content).matches("(SIGNED) Tj").count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_uploads_get_distinct_ids() {
    let svc = Arc::new(TestServices::new());
    let owner = svc.user("a@x.com");

    let mut handles = Vec::new();
    for i in 0..16 {
        let svc = svc.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            svc.registry
                .upload(&owner, "same.pdf", format!("payload {}", i).as_bytes())
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap());
    }

    let listed = svc.registry.list_for(&owner).unwrap();
    assert_eq!(listed.len(), 16);

    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 16);
}
