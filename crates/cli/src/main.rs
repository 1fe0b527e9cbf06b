fn main() -> std::process::ExitCode {
    chinook_cli::run()
}
