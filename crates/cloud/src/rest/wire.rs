//! Serde shapes for the document store's JSON dialect.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One stored document: server-assigned id and timestamps plus caller fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEnvelope {
    pub id: String,
    #[serde(rename = "createTimeMs")]
    pub create_time_ms: i64,
    #[serde(rename = "updateTimeMs", default)]
    pub update_time_ms: Option<i64>,
    pub fields: Value,
}

impl DocumentEnvelope {
    /// Last-write time, falling back to creation for never-patched documents.
    pub fn last_write_ms(&self) -> i64 {
        self.update_time_ms.unwrap_or(self.create_time_ms)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateDocumentRequest {
    pub fields: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatchDocumentRequest {
    pub fields: Value,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FieldFilter>,
    #[serde(rename = "orderBy", skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderBy>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl FieldFilter {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Equal,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub enum FilterOp {
    #[serde(rename = "EQUAL")]
    Equal,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: OrderDirection,
}

impl OrderBy {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Ascending,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub enum OrderDirection {
    #[serde(rename = "ASCENDING")]
    Ascending,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub documents: Vec<DocumentEnvelope>,
}

/// Field payload for the `chatSessions` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionFields {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub title: String,
    #[serde(rename = "lastMessage", default)]
    pub last_message: String,
}

/// Field payload for the `messages` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageFields {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub content: String,
    #[serde(rename = "isUser")]
    pub is_user: bool,
}

/// Field payload for the `globalMessages` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalMessageFields {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(rename = "userPhoto", default)]
    pub user_photo: Option<String>,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_query_serializes_with_wire_field_names() {
        let request = QueryRequest {
            filters: vec![FieldFilter::equals("sessionId", "s-1")],
            order_by: Some(OrderBy::ascending("createTimeMs")),
        };

        let payload = serde_json::to_value(&request).expect("serialize query");
        assert_eq!(payload["filters"][0]["field"], "sessionId");
        assert_eq!(payload["filters"][0]["op"], "EQUAL");
        assert_eq!(payload["filters"][0]["value"], "s-1");
        assert_eq!(payload["orderBy"]["field"], "createTimeMs");
        assert_eq!(payload["orderBy"]["direction"], "ASCENDING");
    }

    #[test]
    fn envelope_last_write_prefers_update_time() {
        let mut envelope: DocumentEnvelope = serde_json::from_str(
            r#"{"id":"d-1","createTimeMs":100,"fields":{"content":"halo"}}"#,
        )
        .expect("decode envelope");
        assert_eq!(envelope.last_write_ms(), 100);

        envelope.update_time_ms = Some(250);
        assert_eq!(envelope.last_write_ms(), 250);
    }
}
