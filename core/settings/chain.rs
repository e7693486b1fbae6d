use super::{parse_constraints, SettingsError};
use crate::model::{Deployment, ResourceId};
use serde_json::Value;
use tracing::*;

/// The prioritized lookup every effective configuration value goes through.
///
/// The order is load-bearing: deployment inputs always beat
/// blueprint-declared constraints, which always beat environment-declared
/// constraints, which always beat raw stored data. Blueprint authors rely on
/// being able to override environment defaults from deployment inputs.
pub struct SettingsChain<'a> {
    deployment: &'a Deployment,
}

impl<'a> SettingsChain<'a> {
    pub fn new(deployment: &'a Deployment) -> Self {
        SettingsChain { deployment }
    }

    #[instrument(name = "SettingsChain::get_setting", skip(self, default))]
    pub fn get_setting(
        &self,
        name: &str,
        resource_type: Option<&str>,
        service_name: Option<&str>,
        provider_key: Option<&str>,
        default: Option<Value>,
    ) -> Result<Option<Value>, SettingsError> {
        let inputs = self.deployment.inputs();

        // 1. input override scoped to the service
        if let (Some(service), Some(rt)) = (service_name, resource_type) {
            if let Some(value) = inputs.service_setting(service, rt, name) {
                return Ok(Some(value.clone()));
            }
        }

        // 2. blueprint service constraints
        if let (Some(service), Some(blueprint)) = (service_name, self.deployment.blueprint()) {
            if let Some(service_def) = blueprint.services.get(service) {
                for constraint in parse_constraints(&service_def.constraints)? {
                    if constraint.applies_to(name, resource_type, service_name) {
                        if let Some(value) =
                            constraint.apply(name, None, None, None, inputs)?
                        {
                            return Ok(Some(value));
                        }
                    }
                }
            }
        }

        // 3. input override scoped to the provider
        if let (Some(provider), Some(rt)) = (provider_key, resource_type) {
            if let Some(value) = inputs.provider_setting(provider, rt, name) {
                return Ok(Some(value.clone()));
            }
        }

        // 4. static-resource constraints in the blueprint
        if let Some(blueprint) = self.deployment.blueprint() {
            for (key, resource_def) in &blueprint.resources {
                for constraint in parse_constraints(&resource_def.constrains)? {
                    if !constraint.applies_to(name, resource_type, service_name) {
                        continue;
                    }
                    // The constrained value is the resource itself: prefer
                    // the materialized form, fall back to the declaration.
                    let resource = self
                        .deployment
                        .resource(&ResourceId::Static(key.clone()))
                        .and_then(|r| serde_json::to_value(r).ok())
                        .unwrap_or_else(|| {
                            serde_json::to_value(resource_def).unwrap_or(Value::Null)
                        });
                    if let Some(value) =
                        constraint.apply(name, None, Some(&resource), None, inputs)?
                    {
                        return Ok(Some(value));
                    }
                }
            }
        }

        // 5. blueprint option constraints
        if let Some(blueprint) = self.deployment.blueprint() {
            for (option_key, option) in &blueprint.options {
                for constraint in parse_constraints(&option.constrains)? {
                    if !constraint.applies_to(name, resource_type, service_name) {
                        continue;
                    }
                    if let Some(value) =
                        constraint.apply(name, Some(option), None, Some(option_key), inputs)?
                    {
                        return Ok(Some(value));
                    }
                }
            }
        }

        // 6. simple blueprint-scoped input
        if let Some(value) = inputs.blueprint(name) {
            return Ok(Some(value.clone()));
        }

        // 7. global input
        if let Some(value) = inputs.global(name) {
            return Ok(Some(value.clone()));
        }

        // 8. environment provider constraints
        if let Some(provider) = provider_key {
            if let Some(value) =
                self.provider_constraint(provider, name, resource_type, service_name)?
            {
                return Ok(Some(value));
            }
        }

        // 9. environment constraints shared by every provider
        if let Some(value) =
            self.provider_constraint("common", name, resource_type, service_name)?
        {
            return Ok(Some(value));
        }

        // 10. stored resource data
        if let Some(value) = self.deployment.resource_path(name) {
            return Ok(Some(value));
        }

        // 11. stored deployment data
        if let Some(value) = self.deployment.extra_path(name) {
            return Ok(Some(value));
        }

        if default.is_none() {
            debug!("No value found for setting {}", name);
        }
        Ok(default)
    }

    fn provider_constraint(
        &self,
        provider_key: &str,
        name: &str,
        resource_type: Option<&str>,
        service_name: Option<&str>,
    ) -> Result<Option<Value>, SettingsError> {
        let Some(provider) = self.deployment.environment().provider(provider_key) else {
            return Ok(None);
        };
        for constraint in parse_constraints(&provider.constraints)? {
            if constraint.applies_to(name, resource_type, service_name) {
                if let Some(value) =
                    constraint.apply(name, None, None, None, self.deployment.inputs())?
                {
                    return Ok(Some(value));
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Blueprint, Deployment, EnvironmentDef};
    use serde_json::json;

    fn deployment(blueprint: Value, environment: Value) -> Deployment {
        let blueprint: Blueprint = serde_json::from_value(blueprint).unwrap();
        let environment: EnvironmentDef = serde_json::from_value(environment).unwrap();
        Deployment::new(blueprint, environment)
    }

    #[test]
    fn inputs_beat_environment_constraints() {
        let mut deployment = deployment(
            json!({"services": {}}),
            json!({"providers": {"common": {"constraints": [{"domain": "b.com"}]}}}),
        );
        deployment
            .inputs_mut()
            .set_blueprint("domain", "a.com".into());

        let chain = SettingsChain::new(&deployment);
        let value = chain
            .get_setting("domain", None, None, None, None)
            .unwrap();
        assert_eq!(value, Some(json!("a.com")));
    }

    #[test]
    fn common_constraints_answer_when_nothing_overrides_them() {
        let deployment = deployment(
            json!({"services": {}}),
            json!({"providers": {"common": {"constraints": [{"domain": "b.com"}]}}}),
        );

        let chain = SettingsChain::new(&deployment);
        let value = chain
            .get_setting("domain", None, None, None, None)
            .unwrap();
        assert_eq!(value, Some(json!("b.com")));
    }

    #[test]
    fn service_scoped_inputs_beat_service_constraints() {
        let mut deployment = deployment(
            json!({"services": {"web": {
                "component": {"type": "compute"},
                "constraints": [{"count": 3}]
            }}}),
            json!({"providers": {}}),
        );

        let chain = SettingsChain::new(&deployment);
        let value = chain
            .get_setting("count", Some("compute"), Some("web"), None, None)
            .unwrap();
        assert_eq!(value, Some(json!(3)));

        deployment
            .inputs_mut()
            .set_service_setting("web", "compute", "count", 5.into());
        let chain = SettingsChain::new(&deployment);
        let value = chain
            .get_setting("count", Some("compute"), Some("web"), None, None)
            .unwrap();
        assert_eq!(value, Some(json!(5)));
    }

    #[test]
    fn service_constraints_only_apply_to_their_service() {
        let deployment = deployment(
            json!({"services": {"web": {
                "component": {"type": "compute"},
                "constraints": [{"setting": "os", "value": "ubuntu", "service": "web"}]
            }}}),
            json!({"providers": {}}),
        );

        let chain = SettingsChain::new(&deployment);
        let value = chain
            .get_setting("os", None, Some("web"), None, None)
            .unwrap();
        assert_eq!(value, Some(json!("ubuntu")));
    }

    #[test]
    fn option_constraints_objectify_url_defaults() {
        let deployment = deployment(
            json!({
                "services": {},
                "options": {
                    "my_url": {
                        "type": "url",
                        "default": "git://fqdn:1000/path",
                        "constrains": [{"setting": "protocol", "attribute": "protocol"}]
                    }
                }
            }),
            json!({"providers": {}}),
        );

        let chain = SettingsChain::new(&deployment);
        let value = chain
            .get_setting("protocol", None, None, None, None)
            .unwrap();
        assert_eq!(value, Some(json!("git")));
    }

    #[test]
    fn provider_constraints_beat_common_ones() {
        let deployment = deployment(
            json!({"services": {}}),
            json!({"providers": {
                "test-cloud": {"constraints": [{"region": "DFW"}]},
                "common": {"constraints": [{"region": "ORD"}]}
            }}),
        );

        let chain = SettingsChain::new(&deployment);
        let value = chain
            .get_setting("region", None, None, Some("test-cloud"), None)
            .unwrap();
        assert_eq!(value, Some(json!("DFW")));

        let value = chain
            .get_setting("region", None, None, None, None)
            .unwrap();
        assert_eq!(value, Some(json!("ORD")));
    }

    #[test]
    fn missing_settings_fall_back_to_the_default() {
        let deployment = deployment(json!({"services": {}}), json!({"providers": {}}));
        let chain = SettingsChain::new(&deployment);
        let value = chain
            .get_setting("count", None, Some("web"), None, Some(json!(1)))
            .unwrap();
        assert_eq!(value, Some(json!(1)));
    }
}
