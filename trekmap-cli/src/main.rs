//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

#[expect(clippy::print_stderr, reason = "fatal errors are reported on stderr")]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = trekmap_cli::run() {
        eprintln!("trekmap: {err}");
        std::process::exit(1);
    }
}
