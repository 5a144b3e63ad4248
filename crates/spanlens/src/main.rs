use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = spanlens::cli::Cli::parse();
    spanlens::cli::run(cli)
}
