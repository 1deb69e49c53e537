use std::path::PathBuf;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ArgAction, ColorChoice, Command,
};

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("usergate")
        .about("Sign in, check your session and administer users")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .help("Base URL of the users API (overrides config and USERGATE_API_URL)")
                .global(true),
        )
        .arg(
            Arg::new("ephemeral")
                .long("ephemeral")
                .help("Keep the session in memory only; nothing is written to disk")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .help("Write logs to this file instead of stderr")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level, repeat for more (-vv)")
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(
            Command::new("login")
                .about("Sign in and store the session")
                .arg(Arg::new("email").long("email").short('e').help("Account email")),
        )
        .subcommand(
            Command::new("signup")
                .about("Create an account and store the session")
                .arg(Arg::new("name").long("name").short('n').help("Display name"))
                .arg(Arg::new("email").long("email").short('e').help("Account email")),
        )
        .subcommand(Command::new("logout").about("Forget the stored session"))
        .subcommand(Command::new("status").about("Show whether the stored session is valid"))
        .subcommand(Command::new("admin").about("Check admin access and show the dashboard summary"))
        .subcommand(
            Command::new("users")
                .about("Administer users")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(Command::new("list").about("List all users"))
                .subcommand(
                    Command::new("show")
                        .about("Show one user's profile")
                        .arg(Arg::new("id").required(true).help("User id")),
                )
                .subcommand(
                    Command::new("find")
                        .about("Find a user by exact name (case-insensitive)")
                        .arg(Arg::new("name").required(true).help("User name")),
                )
                .subcommand(
                    Command::new("edit")
                        .about("Change a user's name or email")
                        .arg(Arg::new("id").required(true).help("User id"))
                        .arg(Arg::new("name").long("name").short('n').help("New name"))
                        .arg(Arg::new("email").long("email").short('e').help("New email")),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Delete a user")
                        .arg(Arg::new("id").required(true).help("User id"))
                        .arg(
                            Arg::new("yes")
                                .long("yes")
                                .short('y')
                                .help("Do not ask for confirmation")
                                .action(ArgAction::SetTrue),
                        ),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_is_well_formed() {
        new().debug_assert();
    }

    #[test]
    fn test_parse_users_edit() {
        let matches = new()
            .try_get_matches_from(["usergate", "-vv", "users", "edit", "42", "--name", "Ana"])
            .expect("parse");
        assert_eq!(matches.get_count("verbosity"), 2);

        let (_, users) = matches.subcommand().expect("users");
        let (name, edit) = users.subcommand().expect("edit");
        assert_eq!(name, "edit");
        assert_eq!(edit.get_one::<String>("id").map(String::as_str), Some("42"));
        assert_eq!(edit.get_one::<String>("name").map(String::as_str), Some("Ana"));
        assert_eq!(edit.get_one::<String>("email"), None);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let matches = new()
            .try_get_matches_from(["usergate", "status", "--ephemeral", "--api-url", "http://x"])
            .expect("parse");
        assert!(matches.get_flag("ephemeral"));
        assert_eq!(
            matches.get_one::<String>("api-url").map(String::as_str),
            Some("http://x")
        );
    }

    #[test]
    fn test_users_requires_subcommand() {
        assert!(new().try_get_matches_from(["usergate", "users"]).is_err());
    }
}
