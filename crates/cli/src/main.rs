use std::process::ExitCode;

fn main() -> ExitCode {
    patron_cli::run()
}
