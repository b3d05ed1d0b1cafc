pub mod client;
pub mod logging;

use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ARG_EMAIL: &str = "email";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_NAME: &str = "name";
pub const ARG_PATH: &str = "path";
pub const ARG_ADMIN: &str = "admin";

fn email_arg() -> Arg {
    Arg::new(ARG_EMAIL)
        .short('e')
        .long(ARG_EMAIL)
        .help("Account email")
        .env("LINGO_EMAIL")
}

fn password_arg() -> Arg {
    Arg::new(ARG_PASSWORD)
        .short('p')
        .long(ARG_PASSWORD)
        .help("Account password")
        .env("LINGO_PASSWORD")
        .hide_env_values(true)
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("lingo")
        .about("Lingo account session client")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("status")
                .about("Validate the stored credential and show who is signed in"),
        )
        .subcommand(
            Command::new("login")
                .about("Sign in and store the credential")
                .arg(email_arg().required(true))
                .arg(password_arg().required(true)),
        )
        .subcommand(
            Command::new("register")
                .about("Create an account and sign in")
                .arg(email_arg().required(true))
                .arg(password_arg().required(true))
                .arg(
                    Arg::new(ARG_NAME)
                        .short('n')
                        .long(ARG_NAME)
                        .help("Display name"),
                ),
        )
        .subcommand(Command::new("logout").about("Forget the stored credential"))
        .subcommand(
            Command::new("visit")
                .about("Open a protected route and report what it renders")
                .arg(
                    Arg::new(ARG_PATH)
                        .help("Route path, e.g. /vocab?page=2")
                        .required(true),
                )
                .arg(
                    Arg::new(ARG_ADMIN)
                        .long(ARG_ADMIN)
                        .help("Treat the route as admin-only")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    email_arg()
                        .help("Sign in with this email if the route redirects to login")
                        .requires(ARG_PASSWORD),
                )
                .arg(password_arg().requires(ARG_EMAIL)),
        );

    let command = client::with_args(command);
    logging::with_args(command)
}
