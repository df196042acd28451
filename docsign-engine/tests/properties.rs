//! Property-based tests for owner isolation and artifact integrity

use docsign_core::*;
use docsign_engine::test_utils::TestServices;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn props_upload_then_download_returns_same_bytes(
        data in prop::collection::vec(any::<u8>(), 0..200_000),
        name in "[a-zA-Z0-9_-]{1,24}\\.pdf"
    ) {
        let svc = TestServices::new();
        let owner = svc.user("a@x.com");

        let id = svc.registry.upload(&owner, &name, data.as_slice()).unwrap();
        let artifact = svc.registry.download(&owner, &id).unwrap();

        prop_assert_eq!(artifact.bytes, data);
        prop_assert_eq!(artifact.filename.as_str(), name.as_str());
    }

    #[test]
    fn props_owners_only_see_their_own_documents(
        uploads in prop::collection::vec(0usize..3, 1..12)
    ) {
        let svc = TestServices::new();
        let owners: Vec<UserId> = (0..3)
            .map(|i| svc.user(&format!("user{}@x.com", i)))
            .collect();

        let mut expected: Vec<Vec<DocumentId>> = vec![Vec::new(); owners.len()];
        for (n, owner_idx) in uploads.iter().enumerate() {
            let owner = &owners[*owner_idx];
            let id = svc
                .registry
                .upload(owner, &format!("doc{}.pdf", n), format!("body {}", n).as_bytes())
                .unwrap();
            expected[*owner_idx].push(id);
        }

        for (i, owner) in owners.iter().enumerate() {
            let listed: Vec<DocumentId> = svc
                .registry
                .list_for(owner)
                .unwrap()
                .iter()
                .map(|d| d.id)
                .collect();
            prop_assert_eq!(&listed, &expected[i]);

            for (j, other_ids) in expected.iter().enumerate() {
                if i == j {
                    continue;
                }
                for id in other_ids {
                    prop_assert!(matches!(
                        svc.registry.get(owner, id),
                        Err(DocSignError::NotFound)
                    ));
                }
            }
        }
    }
}
