use super::DeploymentDoc;
use crate::flags::Flags;
use rollout_core::catalog::RequestContext;
use rollout_core::DefaultPlanner;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt, Debug, Clone)]
#[structopt(
    name = "plan",
    setting = structopt::clap::AppSettings::ColoredHelp,
    about = "Resolve a deployment's blueprint into a concrete resource map"
)]
pub struct PlanCommand {
    #[structopt(help = "path to a deployment document (JSON)")]
    file: PathBuf,

    #[structopt(long, help = "write the planned deployment back to the document")]
    write: bool,

    #[structopt(flatten)]
    flags: Flags,
}

impl PlanCommand {
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let mut doc = DeploymentDoc::load(&self.file)?;
        let environment = doc.environment();
        let planner = DefaultPlanner::new(self.flags.clone().into(), environment);

        let ctx = RequestContext::for_deployment(&doc.deployment);
        let resources = planner.plan(&mut doc.deployment, &ctx).await?;
        let task_graph = planner.task_graph(&doc.deployment)?;

        println!("{}", serde_json::to_string_pretty(&resources)?);
        println!();
        println!("Provisioning order:");
        for task in task_graph.tasks() {
            if task.depends_on.is_empty() {
                println!("  {}", task.resource);
            } else {
                let deps: Vec<String> =
                    task.depends_on.iter().map(|d| d.to_string()).collect();
                println!("  {} (after {})", task.resource, deps.join(", "));
            }
        }

        if self.write {
            doc.save(&self.file)?;
        }

        Ok(())
    }
}
