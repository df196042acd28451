//! Record keys and JSON record access

use docsign_core::*;
use fjall::Partition;
use serde::de::DeserializeOwned;

pub(crate) fn user_key(id: &UserId) -> String {
    id.to_string()
}

pub(crate) fn document_key(id: &DocumentId) -> String {
    id.to_string()
}

/// Owner index entry; a prefix scan on `<owner>/` lists the owner's documents
pub(crate) fn owner_index_key(owner: &UserId, id: &DocumentId) -> String {
    format!("{}/{}", owner, id)
}

pub(crate) fn owner_prefix(owner: &UserId) -> String {
    format!("{}/", owner)
}

pub(crate) fn get_raw(partition: &Partition, key: impl AsRef<[u8]>) -> Result<Option<Vec<u8>>> {
    match partition.get(key.as_ref()) {
        Ok(Some(data)) => Ok(Some(data.to_vec())),
        Ok(None) => Ok(None),
        Err(e) => Err(DocSignError::Storage(e.to_string())),
    }
}

pub(crate) fn get_json<T: DeserializeOwned>(
    partition: &Partition,
    key: impl AsRef<[u8]>,
) -> Result<Option<T>> {
    match get_raw(partition, key)? {
        Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
        None => Ok(None),
    }
}

pub(crate) fn contains(partition: &Partition, key: impl AsRef<[u8]>) -> Result<bool> {
    partition
        .contains_key(key.as_ref())
        .map_err(|e| DocSignError::Storage(e.to_string()))
}

/// Values stored under `prefix`, in key order
pub(crate) fn scan_values(partition: &Partition, prefix: &str) -> Result<Vec<Vec<u8>>> {
    let mut values = Vec::new();

    for item in partition.prefix(prefix.as_bytes()) {
        match item {
            Ok((_key, value)) => values.push(value.to_vec()),
            Err(e) => return Err(DocSignError::Storage(format!("scan error: {}", e))),
        }
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_keys_share_prefix() {
        let owner = UserId::from_ulid(ulid::Ulid::new());
        let doc = DocumentId::from_ulid(ulid::Ulid::new());

        let key = owner_index_key(&owner, &doc);
        assert!(key.starts_with(&owner_prefix(&owner)));
        assert_eq!(key.len(), 26 + 1 + 26);
    }

    #[test]
    fn prefix_of_one_owner_excludes_another() {
        let a = UserId::from_ulid(ulid::Ulid::from_parts(1, 1));
        let b = UserId::from_ulid(ulid::Ulid::from_parts(1, 2));
        let doc = DocumentId::from_ulid(ulid::Ulid::new());

        assert!(!owner_index_key(&b, &doc).starts_with(&owner_prefix(&a)));
    }
}
