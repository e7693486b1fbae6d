use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::*;

/// The lifecycle action currently being driven against a deployment.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    Build,
    Delete,
    Scale,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Build => "BUILD",
            Self::Delete => "DELETE",
            Self::Scale => "SCALE",
        };
        write!(f, "{}", s)
    }
}

#[derive(
    Default, Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    #[default]
    New,
    InProgress,
    Complete,
    Error,
}

/// One lifecycle action (BUILD/DELETE/SCALE) and its aggregate progress.
/// A deployment has at most one active operation; finished ones rotate into
/// its history.
#[derive(Builder, Debug, Clone, Serialize, Deserialize)]
#[builder(build_fn(error = "OperationBuildError"))]
pub struct Operation {
    kind: OperationKind,

    #[builder(default)]
    status: OperationStatus,

    created_at: DateTime<Utc>,

    /// Total number of provisioning tasks the workflow engine will run.
    #[builder(default)]
    tasks: usize,

    #[builder(default)]
    complete: usize,

    #[builder(default)]
    errors: Vec<String>,
}

impl Operation {
    pub fn builder() -> OperationBuilder {
        Default::default()
    }

    pub fn build_operation(tasks: usize) -> Self {
        Operation::builder()
            .kind(OperationKind::Build)
            .created_at(Utc::now())
            .tasks(tasks)
            .build()
            .unwrap()
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn status(&self) -> OperationStatus {
        self.status
    }

    pub fn set_status(&mut self, status: OperationStatus) {
        self.status = status;
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn tasks(&self) -> usize {
        self.tasks
    }

    pub fn complete(&self) -> usize {
        self.complete
    }

    pub fn set_complete(&mut self, complete: usize) {
        self.complete = complete;
    }

    pub fn errors(&self) -> &[String] {
        self.errors.as_ref()
    }

    pub fn push_error<S: Into<String>>(&mut self, error: S) {
        let error = error.into();
        if !self.errors.iter().any(|e| *e == error) {
            self.errors.push(error);
        }
    }
}

#[derive(Error, Debug)]
pub enum OperationBuildError {
    #[error("Attempted to build an Operation while missing fields: {0:?}")]
    BuilderError(derive_builder::UninitializedFieldError),
}

impl From<derive_builder::UninitializedFieldError> for OperationBuildError {
    fn from(value: derive_builder::UninitializedFieldError) -> Self {
        OperationBuildError::BuilderError(value)
    }
}
