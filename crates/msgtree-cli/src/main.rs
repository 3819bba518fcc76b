mod cli;
mod input;
mod render;

use cli::commands::check::CheckFailed;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{e:#}"); // pretty anyhow chain
        if e.downcast_ref::<CheckFailed>().is_some() {
            std::process::exit(2);
        }
        std::process::exit(1);
    }
}
