use std::process::ExitCode;

fn main() -> ExitCode {
    memberdesk_cli::run()
}
