/// Entry point for the `git-rockstar` binary.
///
/// Sets up logging from `RUST_LOG` (default `warn`), delegates to the CLI
/// entry function and exits with its code, or 1 on error.
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match git_rockstar::cli::entry() {
        Ok(code) => std::process::exit(code),
        Err(_) => std::process::exit(1),
    }
}
