mod commands;
pub mod flags;

use commands::*;
use structopt::StructOpt;
use tracing::{error, log};

#[derive(StructOpt, Debug, Clone)]
#[structopt(
    name = "rollout",
    setting = structopt::clap::AppSettings::ColoredHelp,
    about = "Plan blueprint deployments and track their provisioning lifecycle"
)]
struct Rollout {
    #[structopt(subcommand, help = "the command to run")]
    cmd: Command,
}

impl Rollout {
    async fn run(self) -> Result<(), anyhow::Error> {
        human_panic::setup_panic!(Metadata {
            name: "rollout".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            authors: "".into(),
            homepage: "".into(),
        });

        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .format_timestamp_micros()
            .format_module_path(false)
            .parse_env("ROLLOUT_LOG")
            .try_init()
            .unwrap();

        let result = self.cmd.run().await;

        if let Err(ref err) = result {
            error!("{:?}", &err);
        };

        result
    }
}

#[derive(StructOpt, Debug, Clone)]
enum Command {
    Plan(PlanCommand),
    Status(StatusCommand),
    Postback(PostbackCommand),
}

impl Command {
    async fn run(self) -> Result<(), anyhow::Error> {
        match self {
            Command::Plan(x) => x.run().await,
            Command::Postback(x) => x.run().await,
            Command::Status(x) => x.run().await,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), anyhow::Error> {
    Rollout::from_args().run().await
}
