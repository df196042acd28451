//! Test fixtures: throwaway service stacks and generated PDFs

use crate::{CredentialStore, DocSignServices, StorageEngine};
use docsign_core::auth::TokenKey;
use docsign_core::*;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::ops::Deref;

/// Config with cheap password hashing rooted at `dir`
pub fn test_config(dir: impl Into<std::path::PathBuf>) -> ServiceConfig {
    let mut config = ServiceConfig::new(dir);
    config.password = PasswordParams::insecure_fast();
    config
}

/// A full service stack over a temporary keyspace
pub struct TestServices {
    services: DocSignServices,
    _temp: tempfile::TempDir,
}

impl TestServices {
    pub fn new() -> Self {
        Self::with_max_upload(DEFAULT_MAX_UPLOAD_BYTES)
    }

    pub fn with_max_upload(max_upload_bytes: u64) -> Self {
        let (engine, temp) = StorageEngine::temp().expect("temp storage");
        let mut config = test_config(temp.path());
        config.max_upload_bytes = max_upload_bytes;

        let services = DocSignServices::with_engine(engine, &config, &TokenKey::generate())
            .expect("services");

        TestServices {
            services,
            _temp: temp,
        }
    }

    /// Register a user with a throwaway password
    pub fn user(&self, email: &str) -> UserId {
        self.services
            .credentials
            .register(email, "password")
            .expect("register test user")
    }
}

impl Default for TestServices {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for TestServices {
    type Target = DocSignServices;

    fn deref(&self) -> &Self::Target {
        &self.services
    }
}

pub fn credential_store() -> (CredentialStore, tempfile::TempDir) {
    let (engine, temp) = StorageEngine::temp().expect("temp storage");
    let store = CredentialStore::new(engine, PasswordParams::insecure_fast()).expect("store");
    (store, temp)
}

fn hello_content() -> Vec<u8> {
    Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![100.into(), 600.into()]),
            Operation::new("Tj", vec![Object::string_literal("Hello")]),
            Operation::new("ET", vec![]),
        ],
    }
    .encode()
    .expect("encode content")
}

fn save(mut doc: Document) -> Vec<u8> {
    doc.compress();
    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save pdf");
    out
}

/// One-page letter PDF; font resources and MediaBox live on the page tree root
pub fn sample_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let content_id = doc.add_object(Stream::new(dictionary! {}, hello_content()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    save(doc)
}

/// One-page A4 PDF with resources set directly on the page
pub fn sample_pdf_with_page_resources() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Times-Roman",
    });

    let content_id = doc.add_object(Stream::new(dictionary! {}, hello_content()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => vec![Object::Reference(content_id)],
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        },
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    save(doc)
}
