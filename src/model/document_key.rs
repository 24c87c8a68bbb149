use crate::error::{internal_error, invalid_argument, FirestoreResult};
use crate::model::{DatabaseId, ResourcePath};

/// Path of a single document: alternating collection and document segments.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    path: ResourcePath,
}

impl DocumentKey {
    pub fn from_path(path: ResourcePath) -> FirestoreResult<Self> {
        if path.len() < 2 || path.len() % 2 != 0 {
            return Err(invalid_argument(format!(
                "Document path '{path}' must point to a document (even number of segments)"
            )));
        }
        Ok(Self { path })
    }

    pub fn from_string(path: &str) -> FirestoreResult<Self> {
        Self::from_path(ResourcePath::from_string(path)?)
    }

    /// Parses a fully qualified resource name as returned by the REST API
    /// (`projects/p/databases/d/documents/users/u1`).
    pub fn from_name(database_id: &DatabaseId, name: &str) -> FirestoreResult<Self> {
        let prefix = format!("{}/documents/", database_id.database_name());
        let relative = name.strip_prefix(&prefix).ok_or_else(|| {
            internal_error(format!("Unexpected document name '{name}' returned by Firestore"))
        })?;
        Self::from_string(relative)
    }

    pub fn collection_path(&self) -> ResourcePath {
        self.path.without_last()
    }

    pub fn collection_id(&self) -> &str {
        self.path.get(self.path.len() - 2).unwrap_or_default()
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    pub fn id(&self) -> &str {
        self.path.last_segment().unwrap_or_default()
    }
}
