use super::*;
use clap::CommandFactory;

#[test]
fn verify_cli_args() {
    // Validates the entire command tree: short flag conflicts,
    // duplicate args, and other clap definition errors.
    Cli::command().debug_assert();
}

#[test]
fn global_flags_parse_after_subcommand() {
    let cli = Cli::try_parse_from([
        "keel",
        "install",
        "--timeout",
        "30",
        "-p",
        "proj",
        "-d",
        ":memory:",
        "-v",
    ])
    .unwrap();

    assert!(cli.global.verbose);
    assert_eq!(cli.global.project_dir, "proj");
    assert_eq!(cli.global.database.as_deref(), Some(":memory:"));
    match cli.command {
        Commands::Install(args) => assert_eq!(args.timeout, Some(30)),
        other => panic!("expected install, got {other:?}"),
    }
}

#[test]
fn reporting_commands_accept_json() {
    for name in ["status", "plan", "history"] {
        let cli = Cli::try_parse_from(["keel", name, "--json"]).unwrap();
        let json = match cli.command {
            Commands::Status(args) | Commands::Plan(args) | Commands::History(args) => args.json,
            other => panic!("unexpected command {other:?}"),
        };
        assert!(json, "{name} should accept --json");
    }
}

#[test]
fn unlock_takes_no_arguments() {
    assert!(Cli::try_parse_from(["keel", "unlock", "--json"]).is_err());
    assert!(matches!(
        Cli::try_parse_from(["keel", "unlock"]).unwrap().command,
        Commands::Unlock
    ));
}

#[test]
fn zero_timeout_is_rejected() {
    assert!(Cli::try_parse_from(["keel", "update", "--timeout", "0"]).is_err());
}
