use std::process::ExitCode;

fn main() -> ExitCode {
    leavedesk_cli::run()
}
