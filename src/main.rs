use registry_janitor::cli::{Args, Runner};
use std::process;

#[tokio::main]
async fn main() {
    let args = Args::parse_args();
    let runner = Runner::new(args);

    if let Err(e) = runner.run().await {
        runner.output().error(&e.to_string());
        process::exit(e.exit_code());
    }
}
