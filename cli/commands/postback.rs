use super::DeploymentDoc;
use rollout_core::model::JsonMap;
use rollout_core::operation::{get_status, PostbackHandler};
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt, Debug, Clone)]
#[structopt(
    name = "postback",
    setting = structopt::clap::AppSettings::ColoredHelp,
    about = "Apply a provisioning postback payload to a deployment"
)]
pub struct PostbackCommand {
    #[structopt(help = "path to a deployment document (JSON)")]
    file: PathBuf,

    #[structopt(help = "path to the postback payload (JSON map)")]
    payload: PathBuf,

    #[structopt(long, help = "write the updated deployment back to the document")]
    write: bool,
}

impl PostbackCommand {
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let mut doc = DeploymentDoc::load(&self.file)?;
        let raw = std::fs::read_to_string(&self.payload)?;
        let contents: JsonMap = serde_json::from_str(&raw)?;

        let handler = PostbackHandler::new(&rollout_core::Config::default());
        handler.apply_postback(&mut doc.deployment, &contents)?;

        let report = get_status(&doc.deployment);
        println!("{}", serde_json::to_string_pretty(&report)?);

        if self.write {
            doc.save(&self.file)?;
        }

        Ok(())
    }
}
