mod cli;
// Capability surface for embedding hosts; the standalone binary only uses
// the detached defaults.
#[allow(dead_code)]
mod host;
mod run;
mod scroll;

use anyhow::Result;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();
    run::run(cli)
}
