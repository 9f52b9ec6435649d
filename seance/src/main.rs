use seance::App;
use std::process::ExitCode;

fn main() -> ExitCode {
    App::run()
}
