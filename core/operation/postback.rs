use super::{check_and_set_dep_status, OperationError};
use crate::events::event::OperationEvent;
use crate::events::EventChannel;
use crate::model::{Deployment, JsonMap, ResourceId, ResourceStatus};
use crate::sync::Arc;
use serde_json::Value;
use tracing::*;

/// Where one postback entry lands. Parsed once at the boundary; anything
/// outside the two supported namespaces rejects the whole payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostbackTarget {
    Instance(ResourceId),
    Connection(String),
}

impl PostbackTarget {
    pub fn parse(key: &str) -> Result<Self, OperationError> {
        if let Some(id) = key.strip_prefix("instance:") {
            return Ok(PostbackTarget::Instance(id.into()));
        }
        if let Some(name) = key.strip_prefix("connection:") {
            return Ok(PostbackTarget::Connection(name.to_string()));
        }
        Err(OperationError::UnsupportedPostbackKey {
            key: key.to_string(),
        })
    }
}

/// Merge `src` into `dest`, recursing into nested maps instead of replacing
/// them. Merging the same map twice yields the same result, which is what
/// makes duplicated postbacks safe.
pub fn deep_merge(dest: &mut JsonMap, src: &JsonMap) {
    for (key, value) in src {
        match (dest.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming)
            }
            _ => {
                dest.insert(key.clone(), value.clone());
            }
        }
    }
}

// One fully validated postback entry, ready to apply.
enum ApplyOp {
    Instance {
        id: ResourceId,
        status: Option<ResourceStatus>,
        error_message: Option<String>,
        data: JsonMap,
    },
    Connection {
        key: String,
        interface: Option<String>,
        data: JsonMap,
    },
}

/// Applies resource postbacks from the provisioning layer onto a deployment.
///
/// The whole payload is validated before anything is written: an unsupported
/// key, unknown target, or malformed value rejects the postback without a
/// partial apply. Aggregate status is re-derived after every apply.
pub struct PostbackHandler {
    event_channel: Arc<EventChannel>,
}

impl PostbackHandler {
    pub fn new(config: &crate::Config) -> Self {
        Self {
            event_channel: config.event_channel(),
        }
    }

    #[instrument(name = "PostbackHandler::apply_postback", skip(self, deployment, contents))]
    pub fn apply_postback(
        &self,
        deployment: &mut Deployment,
        contents: &JsonMap,
    ) -> Result<(), OperationError> {
        let ops = Self::validate(deployment, contents)?;
        let target_count = ops.len();
        let previous_status = deployment.status();

        for op in ops {
            match op {
                ApplyOp::Instance {
                    id,
                    status,
                    error_message,
                    data,
                } => {
                    let resource = deployment.resource_mut(&id).unwrap();
                    deep_merge(resource.instance_mut(), &data);
                    if let Some(message) = error_message {
                        resource.set_error_message(message);
                    }
                    if let Some(status) = status {
                        resource.set_status(status);
                        self.event_channel
                            .send(OperationEvent::ResourceStatusChanged {
                                resource: id.to_string(),
                                status,
                            });
                    }
                }
                ApplyOp::Connection {
                    key,
                    interface,
                    data,
                } => {
                    let connection = deployment.connection_mut(&key).unwrap();
                    if let Some(interface) = interface {
                        connection.interface = interface;
                    }
                    deep_merge(&mut connection.extra, &data);
                }
            }
        }

        let status = check_and_set_dep_status(deployment);
        if status != previous_status {
            self.event_channel
                .send(OperationEvent::DeploymentStatusChanged {
                    deployment: deployment.id().to_string(),
                    from: previous_status,
                    to: status,
                });
        }
        self.event_channel.send(OperationEvent::PostbackApplied {
            deployment: deployment.id().to_string(),
            target_count,
        });
        debug!(
            "Applied postback with {} targets to deployment {}",
            target_count,
            deployment.id()
        );
        Ok(())
    }

    fn validate(
        deployment: &Deployment,
        contents: &JsonMap,
    ) -> Result<Vec<ApplyOp>, OperationError> {
        let mut ops = vec![];
        for (key, value) in contents {
            let target = PostbackTarget::parse(key)?;
            let map = value
                .as_object()
                .ok_or_else(|| OperationError::InvalidPayload { key: key.clone() })?;

            match target {
                PostbackTarget::Instance(id) => {
                    if deployment.resource(&id).is_none() {
                        return Err(OperationError::UnknownResource { id: id.to_string() });
                    }
                    let mut status = None;
                    let mut error_message = None;
                    let mut data = JsonMap::new();
                    for (field, field_value) in map {
                        match field.as_str() {
                            "status" => {
                                let raw = field_value.as_str().ok_or_else(|| {
                                    OperationError::InvalidPayload { key: key.clone() }
                                })?;
                                status = Some(raw.parse::<ResourceStatus>()?);
                            }
                            "error-message" | "error_message" => {
                                error_message =
                                    field_value.as_str().map(String::from).or(error_message);
                            }
                            _ => {
                                data.insert(field.clone(), field_value.clone());
                            }
                        }
                    }
                    ops.push(ApplyOp::Instance {
                        id,
                        status,
                        error_message,
                        data,
                    });
                }
                PostbackTarget::Connection(connection_key) => {
                    if deployment.connections().get(&connection_key).is_none() {
                        return Err(OperationError::UnknownConnection {
                            key: connection_key,
                        });
                    }
                    let mut interface = None;
                    let mut data = JsonMap::new();
                    for (field, field_value) in map {
                        if field == "interface" {
                            interface = field_value.as_str().map(String::from);
                        } else {
                            data.insert(field.clone(), field_value.clone());
                        }
                    }
                    ops.push(ApplyOp::Connection {
                        key: connection_key,
                        interface,
                        data,
                    });
                }
            }
        }
        Ok(ops)
    }
}
