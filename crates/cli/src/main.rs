use std::process::ExitCode;

fn main() -> ExitCode {
    apex_cli::run()
}
