use std::{env, process};

use careportal::{cli, init};

#[tokio::main]
async fn main() {
    init();

    if let Err(err) = cli::run_cli(env::args().skip(1)).await {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}
