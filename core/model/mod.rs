mod blueprint;
mod component;
mod connection;
mod deployment;
mod operation;
mod relation;
mod resource;
mod resource_id;
mod selector;
mod status;

pub use blueprint::*;
pub use component::*;
pub use connection::*;
pub use deployment::*;
pub use operation::*;
pub use relation::*;
pub use resource::*;
pub use resource_id::*;
pub use selector::*;
pub use status::*;

/// JSON object type used wherever provisioning data is free-form by contract
/// (resource `instance` blocks, postback payloads, input scopes).
pub type JsonMap = serde_json::Map<String, serde_json::Value>;
