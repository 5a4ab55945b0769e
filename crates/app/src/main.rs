use std::process;

mod headless;
mod logging;
mod script;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let parsed = match headless::parse_headless_args(&args) {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("argument error: {err}");
            process::exit(2);
        }
    };

    logging::setup_tracing(parsed.log_level);
    tracing::info!("morphsculpt starting");

    if let Err(err) = headless::run_headless(&parsed) {
        tracing::error!("headless error: {err}");
        eprintln!("headless error: {err}");
        process::exit(1);
    }
}
