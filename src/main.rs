use clap::{Arg, Command}; // Builder API for command-line parsing
use std::path::PathBuf;

use keygate::utils::logging::initialize_logging;
use keygate::{http, AuthConfig};

fn cli() -> Command {
    Command::new("keygate")
        .about("Account registration and session token service")
        .subcommand_required(true)
        .subcommand(
            Command::new("serve")
                .about("Run the HTTP service")
                .arg(
                    Arg::new("port")
                        .long("port")
                        .help("Port to listen on (overrides KEYGATE_PORT)")
                        .value_parser(clap::value_parser!(u16)),
                )
                .arg(
                    Arg::new("users-file")
                        .long("users-file")
                        .help("JSON file holding registered users (overrides KEYGATE_USERS_FILE)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("secret")
                        .long("secret")
                        .help("Token signing secret (overrides KEYGATE_SECRET)"),
                )
                .arg(
                    Arg::new("log-level")
                        .long("log-level")
                        .help("Default log level when RUST_LOG is unset")
                        .default_value("info"),
                )
                .arg(
                    Arg::new("log-file")
                        .long("log-file")
                        .help("Append logs to this file instead of stderr")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = cli().get_matches();

    // Handle the "serve" subcommand
    if let Some(sub_matches) = matches.subcommand_matches("serve") {
        // Environment first, then explicit flags win
        let mut config = AuthConfig::from_env()?;
        if let Some(port) = sub_matches.get_one::<u16>("port") {
            config.port = *port;
        }
        if let Some(path) = sub_matches.get_one::<PathBuf>("users-file") {
            config.users_file = path.clone();
        }
        if let Some(secret) = sub_matches.get_one::<String>("secret") {
            config.secret = secret.clone();
        }
        if let Some(path) = sub_matches.get_one::<PathBuf>("log-file") {
            config.log_file = Some(path.clone());
        }

        let level = sub_matches
            .get_one::<String>("log-level")
            .map(String::as_str)
            .unwrap_or("info");
        initialize_logging(level, config.log_file.as_deref())?;

        config.validate()?;
        http::serve(config).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        cli().debug_assert();
    }

    #[test]
    fn test_serve_arguments() {
        let matches = cli()
            .try_get_matches_from([
                "keygate",
                "serve",
                "--port",
                "9000",
                "--users-file",
                "/tmp/users.json",
            ])
            .unwrap();
        let serve = matches.subcommand_matches("serve").unwrap();

        assert_eq!(serve.get_one::<u16>("port"), Some(&9000));
        assert_eq!(
            serve.get_one::<PathBuf>("users-file"),
            Some(&PathBuf::from("/tmp/users.json"))
        );
        assert_eq!(serve.get_one::<String>("log-level").map(String::as_str), Some("info"));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(cli().try_get_matches_from(["keygate"]).is_err());
    }
}
