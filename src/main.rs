use clap::Parser;
use inkstat::{app::App, cli::RunOptions, Result};

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let opts = RunOptions::parse();
    let app = App::from_options(opts)?;
    app.run()
}
