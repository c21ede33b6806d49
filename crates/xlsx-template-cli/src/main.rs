use clap::Parser;

use xlsx_template_cli::cli::{run_with_args, Args};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
    run_with_args(args)
}
