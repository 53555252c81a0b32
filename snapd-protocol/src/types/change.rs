use serde::Deserialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::timestamp::deserialize_optional;

/// Status of a change or one of its tasks.
///
/// Statuses this crate does not know yet decode as [`ChangeStatus::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, derive_more::Display)]
pub enum ChangeStatus {
    #[default]
    Do,
    Doing,
    Done,
    Abort,
    Undo,
    Undoing,
    Hold,
    Error,
    Wait,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct TaskProgress {
    #[serde(default)]
    pub done: u64,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub status: ChangeStatus,
    #[serde(default)]
    pub progress: TaskProgress,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub spawn_time: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub ready_time: Option<OffsetDateTime>,
    #[serde(default)]
    pub data: Option<Value>,
}

/// A snapshot of an asynchronous operation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Change {
    pub id: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub status: ChangeStatus,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub ready: bool,
    #[serde(default)]
    pub err: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub spawn_time: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "deserialize_optional")]
    pub ready_time: Option<OffsetDateTime>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl Change {
    /// Finished without error.
    pub fn succeeded(&self) -> bool {
        self.ready
            && self.err.is_none()
            && !matches!(self.status, ChangeStatus::Error | ChangeStatus::Hold)
    }

    /// Finished with an error.
    pub fn failed(&self) -> bool {
        self.ready && !self.succeeded()
    }

    /// `data.snap-names`, filled in by multi-snap changes such as refresh-all.
    pub fn snap_names(&self) -> Vec<String> {
        self.data
            .as_ref()
            .and_then(|data| data.get("snap-names"))
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}
