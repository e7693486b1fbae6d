use super::DeploymentDoc;
use rollout_core::operation::get_status;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt, Debug, Clone)]
#[structopt(
    name = "status",
    setting = structopt::clap::AppSettings::ColoredHelp,
    about = "Report a deployment's aggregate and per-resource status"
)]
pub struct StatusCommand {
    #[structopt(help = "path to a deployment document (JSON)")]
    file: PathBuf,
}

impl StatusCommand {
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let doc = DeploymentDoc::load(&self.file)?;
        let report = get_status(&doc.deployment);
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}
