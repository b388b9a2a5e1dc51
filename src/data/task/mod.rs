use serde::{Deserialize, Serialize};

pub mod db;

pub static TASK_ASSIGNMENT_COLLECTION_NAME: &str = "taskAssignments";

pub static CLASS_ID_FIELD: &str = "classId";
pub static TASK_IDS_FIELD: &str = "taskIds";

/// Tasks assigned to a class. Stored under the class id, which is repeated
/// in `classId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAssignment {
    pub class_id: String,
    #[serde(default)]
    pub task_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl TaskAssignment {
    pub fn new(class_id: impl ToString) -> TaskAssignment {
        TaskAssignment {
            class_id: class_id.to_string(),
            task_ids: vec![],
            user_id: None,
        }
    }
}

/// Result of removing a task from a class assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRemoval {
    Removed,
    /// The task wasn't assigned, nothing changed.
    NotAssigned,
    /// The class has no assignment document.
    MissingAssignment,
}
