use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::*;

/// Lifecycle status of a single resource, as reported by the provisioning
/// layer through postbacks.
#[derive(
    Default, Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResourceStatus {
    #[default]
    New,
    Planned,
    Build,
    Configure,
    Active,
    Error,
    Deleting,
    Deleted,
}

/// Aggregate lifecycle status of a deployment. Derived from its resources'
/// statuses, except ERROR which is sticky until explicitly reset.
#[derive(
    Default, Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeploymentStatus {
    #[default]
    New,
    Planned,
    Build,
    Configure,
    Active,
    Error,
    Deleting,
    Deleted,
}

#[derive(Error, Debug)]
pub enum StatusError {
    #[error("Unknown status {0}. Valid statuses are: NEW, PLANNED, BUILD, CONFIGURE, ACTIVE, ERROR, DELETING, and DELETED.")]
    UnknownStatus(String),
}

impl ResourceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResourceStatus::Deleted)
    }
}

impl DeploymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentStatus::Deleted)
    }
}

impl FromStr for ResourceStatus {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "PLANNED" => Ok(Self::Planned),
            "BUILD" => Ok(Self::Build),
            "CONFIGURE" => Ok(Self::Configure),
            "ACTIVE" => Ok(Self::Active),
            "ERROR" => Ok(Self::Error),
            "DELETING" => Ok(Self::Deleting),
            "DELETED" => Ok(Self::Deleted),
            other => Err(StatusError::UnknownStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::New => "NEW",
            Self::Planned => "PLANNED",
            Self::Build => "BUILD",
            Self::Configure => "CONFIGURE",
            Self::Active => "ACTIVE",
            Self::Error => "ERROR",
            Self::Deleting => "DELETING",
            Self::Deleted => "DELETED",
        };
        write!(f, "{}", s)
    }
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::New => "NEW",
            Self::Planned => "PLANNED",
            Self::Build => "BUILD",
            Self::Configure => "CONFIGURE",
            Self::Active => "ACTIVE",
            Self::Error => "ERROR",
            Self::Deleting => "DELETING",
            Self::Deleted => "DELETED",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl quickcheck::Arbitrary for ResourceStatus {
        fn arbitrary(g: &mut quickcheck::Gen) -> Self {
            *g.choose(&[
                Self::New,
                Self::Planned,
                Self::Build,
                Self::Configure,
                Self::Active,
                Self::Error,
                Self::Deleting,
                Self::Deleted,
            ])
            .unwrap()
        }
    }

    #[quickcheck]
    fn resource_statuses_round_trip_through_their_wire_form(status: ResourceStatus) {
        let parsed: ResourceStatus = status.to_string().parse().unwrap();
        assert_eq!(parsed, status);
    }

    #[test]
    fn unknown_statuses_are_rejected() {
        assert_matches!(
            "PROVISIONING".parse::<ResourceStatus>(),
            Err(StatusError::UnknownStatus(s)) if s == "PROVISIONING"
        );
    }
}
