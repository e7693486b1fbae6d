use structopt::StructOpt;

#[derive(StructOpt, Debug, Clone, Default)]
pub struct Flags {
    #[structopt(
        long = "strict-matches",
        help = "fail planning when a component selector matches more than one catalog entry"
    )]
    pub strict_matches: bool,

    #[structopt(
        long = "max-depth",
        help = "upper bound on auto-resolution steps before planning gives up"
    )]
    pub max_depth: Option<usize>,
}

impl From<Flags> for rollout_core::Config {
    fn from(flags: Flags) -> Self {
        let mut builder = rollout_core::Config::builder();
        builder.strict_ambiguous_matches(flags.strict_matches);
        if let Some(max_depth) = flags.max_depth {
            builder.max_resolution_depth(max_depth);
        }
        builder.build().unwrap()
    }
}
