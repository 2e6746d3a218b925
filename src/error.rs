//! Structured error types for engine operations.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,
    InvalidPosition,
    ParentMismatch,
    CrossWorkspaceMove,
    CrossBoardMove,
    CycleDetected,
    DepthExceeded,
    NotAList,
    BoardExists,
    NestedSubtask,
    AlreadyMember,

    // Not found errors
    UserNotFound,
    WorkspaceNotFound,
    MemberNotFound,
    CollectionNotFound,
    FolderNotFound,
    ItemNotFound,
    BoardNotFound,
    ColumnNotFound,
    TaskNotFound,
    BrokenAncestorChain,

    // Permission errors
    AccessDenied,
    OwnerOnly,

    // Internal errors
    DatabaseError,
    InternalError,
}

/// Coarse failure class a caller can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    BadRequest,
    Internal,
}

impl ErrorCode {
    pub fn kind(self) -> ErrorKind {
        use ErrorCode::*;
        match self {
            MissingRequiredField | InvalidFieldValue | InvalidPosition | ParentMismatch
            | CrossWorkspaceMove | CrossBoardMove | CycleDetected | DepthExceeded | NotAList | BoardExists
            | NestedSubtask | AlreadyMember => ErrorKind::BadRequest,
            UserNotFound | WorkspaceNotFound | MemberNotFound | CollectionNotFound
            | FolderNotFound | ItemNotFound | BoardNotFound | ColumnNotFound | TaskNotFound
            | BrokenAncestorChain => ErrorKind::NotFound,
            AccessDenied | OwnerOnly => ErrorKind::Forbidden,
            DatabaseError | InternalError => ErrorKind::Internal,
        }
    }
}

/// Structured error returned by every engine operation.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn invalid_position(position: i64, len: usize) -> Self {
        Self::new(
            ErrorCode::InvalidPosition,
            format!("Invalid position {} (group has {} slots)", position, len),
        )
        .with_field("position")
    }

    pub fn parent_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParentMismatch, message).with_field("parentFolderId")
    }

    pub fn cross_workspace_move(kind: &str) -> Self {
        Self::new(
            ErrorCode::CrossWorkspaceMove,
            format!("Cannot move {} to different workspace", kind),
        )
    }

    pub fn cross_board_move() -> Self {
        Self::new(
            ErrorCode::CrossBoardMove,
            "Cannot move task to different board",
        )
    }

    pub fn cycle(folder_id: &str) -> Self {
        Self::new(
            ErrorCode::CycleDetected,
            format!("Folder {} cannot be moved under itself or a descendant", folder_id),
        )
    }

    pub fn depth_exceeded(max_depth: usize) -> Self {
        Self::new(
            ErrorCode::DepthExceeded,
            format!("Folder nesting is limited to {} levels", max_depth),
        )
    }

    pub fn not_found(code: ErrorCode, what: &str, id: &str) -> Self {
        Self::new(code, format!("{} not found: {}", what, id))
    }

    pub fn broken_chain(node_id: &str) -> Self {
        Self::new(
            ErrorCode::BrokenAncestorChain,
            format!("Could not determine workspace for {}", node_id),
        )
    }

    pub fn access_denied(workspace_id: &str) -> Self {
        Self::new(
            ErrorCode::AccessDenied,
            format!("Access denied to workspace {}", workspace_id),
        )
    }

    pub fn owner_only(action: &str) -> Self {
        Self::new(
            ErrorCode::OwnerOnly,
            format!("Only workspace owners can {}", action),
        )
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        ApiError::database(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::internal(err)
    }
}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ApiError>() {
            Ok(api_err) => api_err,
            Err(err) => ApiError::internal(err),
        }
    }
}

/// Result type for engine operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_distinct_kinds() {
        assert_eq!(ErrorCode::FolderNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(ErrorCode::BrokenAncestorChain.kind(), ErrorKind::NotFound);
        assert_eq!(ErrorCode::AccessDenied.kind(), ErrorKind::Forbidden);
        assert_eq!(ErrorCode::CrossWorkspaceMove.kind(), ErrorKind::BadRequest);
        assert_eq!(ErrorCode::DepthExceeded.kind(), ErrorKind::BadRequest);
        assert_eq!(ErrorCode::DatabaseError.kind(), ErrorKind::Internal);
    }

    #[test]
    fn serializes_code_in_screaming_snake_case() {
        let err = ApiError::invalid_position(7, 3);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "INVALID_POSITION");
        assert_eq!(json["field"], "position");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn anyhow_roundtrip_preserves_code() {
        let err: anyhow::Error = ApiError::cross_board_move().into();
        let back = ApiError::from(err);
        assert_eq!(back.code, ErrorCode::CrossBoardMove);
    }
}
