use crate::constants::DEFAULT_DATABASE_ID;
use crate::error::{missing_project_id, FirestoreResult};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DatabaseId {
    project_id: String,
    database: String,
}

impl DatabaseId {
    pub fn new(project_id: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database: database.into(),
        }
    }

    pub fn default(project_id: impl Into<String>) -> Self {
        Self::new(project_id, DEFAULT_DATABASE_ID)
    }

    /// Builds an id from optional settings values, falling back to `(default)`
    /// when no database is named.
    pub fn from_parts(project_id: Option<&str>, database: Option<&str>) -> FirestoreResult<Self> {
        let project_id = project_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(missing_project_id)?;
        let database = database
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_DATABASE_ID);
        Ok(Self::new(project_id, database))
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// `projects/{project}/databases/{database}`
    pub fn database_name(&self) -> String {
        format!("projects/{}/databases/{}", self.project_id, self.database)
    }

    pub fn with_database(&self, database: impl Into<String>) -> Self {
        Self::new(self.project_id.clone(), database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_parts_with_default_database() {
        let db = DatabaseId::from_parts(Some("project"), None).unwrap();
        assert_eq!(db.project_id(), "project");
        assert_eq!(db.database(), DEFAULT_DATABASE_ID);
        assert_eq!(db.database_name(), "projects/project/databases/(default)");
    }

    #[test]
    fn blank_database_falls_back_to_default() {
        let db = DatabaseId::from_parts(Some("project"), Some("  ")).unwrap();
        assert_eq!(db.database(), DEFAULT_DATABASE_ID);
        assert_eq!(db.with_database("audit").database(), "audit");
    }

    #[test]
    fn missing_project_id_errors() {
        let err = DatabaseId::from_parts(None, Some("(default)")).unwrap_err();
        assert_eq!(err.code_str(), "firestore/configuration");
        let err = DatabaseId::from_parts(Some(""), None).unwrap_err();
        assert_eq!(err.code_str(), "firestore/configuration");
    }
}
