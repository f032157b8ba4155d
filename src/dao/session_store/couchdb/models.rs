use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dao::models::SessionEntity;

pub const SESSION_PREFIX: &str = "session:";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Session document as stored in CouchDB: the entity plus CouchDB bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchSessionDocument {
    #[serde(rename = "_id")]
    pub doc_id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub session: SessionEntity,
}

impl CouchSessionDocument {
    pub fn new(session: SessionEntity, rev: Option<String>) -> Self {
        Self {
            doc_id: session_doc_id(&session.id),
            rev,
            session,
        }
    }
}

pub fn session_doc_id(code: &str) -> String {
    format!("{SESSION_PREFIX}{code}")
}
