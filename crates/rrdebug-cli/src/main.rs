#![forbid(unsafe_code)]

fn main() {
    if let Err(error) = rrdebug_cli::run_from_env() {
        eprintln!("rrdebug: {error}");
        std::process::exit(error.exit_code());
    }
}
