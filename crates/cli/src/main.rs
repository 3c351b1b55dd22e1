use std::process::ExitCode;

fn main() -> ExitCode {
    danswer_cli::run()
}
