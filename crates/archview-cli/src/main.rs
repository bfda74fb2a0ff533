//! `archview`: command-line front end for architecture diagrams.
//!
//! ```text
//! archview parse FILE
//! archview fmt FILE [--indent N]
//! archview resolve NAME --registry FILE [--arch FILE] [--fill]
//! archview lint --registry FILE [--json]
//! ```
//!
//! `FILE` may be `-` to read stdin. Logging goes to stderr and is controlled
//! by `RUST_LOG` (e.g. `RUST_LOG=archview_core=debug`).

mod commands;

use commands::Command;

const USAGE: &str = "\
usage:
  archview parse FILE
  archview fmt FILE [--indent N]
  archview resolve NAME --registry FILE [--arch FILE] [--fill]
  archview lint --registry FILE [--json]";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::from_args(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("archview: {e}");
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    };

    log::debug!("running {command:?}");
    match commands::run(&command) {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("archview {} error: {e}", command.name());
            std::process::exit(1);
        }
    }
}
