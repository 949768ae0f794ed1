/// Backend primary keys are numeric.
pub type EntityId = i64;

/// All timestamps exchanged with the backend are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
