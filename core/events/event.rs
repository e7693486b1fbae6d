use crate::model::{DeploymentStatus, OperationKind, ResourceStatus};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResolverEvent {
    ComponentResolved {
        service: String,
        component: String,
        provider: String,
    },
    AmbiguousComponentMatch {
        service: String,
        component: String,
        match_count: usize,
    },
    RelationResolved {
        service: String,
        relation: String,
        target: String,
    },
    RequirementAutoResolved {
        service: String,
        requirement: String,
        component: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PlannerEvent {
    PlanningStarted {
        deployment: String,
    },
    ResourceMaterialized {
        resource: String,
        service: String,
    },
    StaticResourceMaterialized {
        resource: String,
    },
    PlanningCompleted {
        deployment: String,
        resource_count: usize,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum OperationEvent {
    OperationOpened {
        deployment: String,
        kind: OperationKind,
    },
    PostbackApplied {
        deployment: String,
        target_count: usize,
    },
    ResourceStatusChanged {
        resource: String,
        status: ResourceStatus,
    },
    DeploymentStatusChanged {
        deployment: String,
        from: DeploymentStatus,
        to: DeploymentStatus,
    },
}

#[derive(Default, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Event {
    /// The "nothing happened" event.
    #[default]
    Noop,
    ResolverEvent(ResolverEvent),
    PlannerEvent(PlannerEvent),
    OperationEvent(OperationEvent),
}

impl From<ResolverEvent> for Event {
    fn from(value: ResolverEvent) -> Self {
        Event::ResolverEvent(value)
    }
}

impl From<PlannerEvent> for Event {
    fn from(value: PlannerEvent) -> Self {
        Event::PlannerEvent(value)
    }
}

impl From<OperationEvent> for Event {
    fn from(value: OperationEvent) -> Self {
        Event::OperationEvent(value)
    }
}
