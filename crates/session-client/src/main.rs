use anyhow::{Context, Result};
use session_client::{AuthState, Config, ProfileState, Session};
use session_shared::api::UpdateProfileRequest;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "\
Usage: session-cli <COMMAND>

Commands:
  login <USERNAME> <PASSWORD>            Sign in and remember the token
  register <USERNAME> <EMAIL> <PASSWORD> Create an account and sign in
  logout                                 Forget the remembered token
  status [--verify]                      Show the session; --verify asks the server
  profile                                Show your profile
  profile-edit [--display-name <NAME>] [--bio <TEXT>] [--avatar-url <URL>]
                                         Update your profile

Environment:
  SESSION_API_URL     API base URL (default http://localhost:3000)
  SESSION_CONFIG_DIR  Where the token is stored";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Login {
        username: String,
        password: String,
    },
    Register {
        username: String,
        email: String,
        password: String,
    },
    Logout,
    Status {
        verify: bool,
    },
    Profile,
    ProfileEdit(UpdateProfileRequest),
    Help,
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let Some(command) = args.first() else {
        return Ok(Command::Help);
    };
    let rest = &args[1..];

    match command.as_str() {
        "login" => match rest {
            [username, password] => Ok(Command::Login {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => Err("login requires <USERNAME> <PASSWORD>".to_string()),
        },
        "register" => match rest {
            [username, email, password] => Ok(Command::Register {
                username: username.clone(),
                email: email.clone(),
                password: password.clone(),
            }),
            _ => Err("register requires <USERNAME> <EMAIL> <PASSWORD>".to_string()),
        },
        "logout" if rest.is_empty() => Ok(Command::Logout),
        "status" => match rest {
            [] => Ok(Command::Status { verify: false }),
            [flag] if flag == "--verify" => Ok(Command::Status { verify: true }),
            _ => Err("status accepts only --verify".to_string()),
        },
        "profile" if rest.is_empty() => Ok(Command::Profile),
        "profile-edit" => parse_profile_edit(rest).map(Command::ProfileEdit),
        "--help" | "-h" | "help" => Ok(Command::Help),
        other => Err(format!("Unknown argument: {}", other)),
    }
}

fn parse_profile_edit(args: &[String]) -> Result<UpdateProfileRequest, String> {
    let mut patch = UpdateProfileRequest::default();

    let mut i = 0;
    while i < args.len() {
        let value = args
            .get(i + 1)
            .cloned()
            .ok_or_else(|| format!("{} requires a value", args[i]))?;
        match args[i].as_str() {
            "--display-name" => patch.display_name = Some(value),
            "--bio" => patch.bio = Some(value),
            "--avatar-url" => patch.avatar_url = Some(value),
            other => return Err(format!("Unknown argument: {}", other)),
        }
        i += 2;
    }

    if patch.is_empty() {
        return Err("profile-edit needs at least one field to change".to_string());
    }

    Ok(patch)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "session_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            eprintln!();
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };

    if command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = Config::from_env()?;
    let session = Session::from_config(&config).context("Could not open token storage")?;
    session.initialize();

    if !run(&session, command).await {
        std::process::exit(1);
    }

    Ok(())
}

/// Execute one command. Returns false when the relevant form or container
/// ends in an error state.
async fn run(session: &Session, command: Command) -> bool {
    match command {
        Command::Login { username, password } => {
            session.login(&username, &password).await;
            match session.login_form().get().error {
                Some(error) => {
                    eprintln!("Login failed: {}", error);
                    false
                }
                None => {
                    print_auth(&session.auth().get());
                    true
                }
            }
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            session.register(&username, &email, &password).await;
            match session.register_form().get().error {
                Some(error) => {
                    eprintln!("Registration failed: {}", error);
                    false
                }
                None => {
                    print_auth(&session.auth().get());
                    true
                }
            }
        }
        Command::Logout => {
            session.logout();
            println!("Signed out.");
            true
        }
        Command::Status { verify } => {
            if verify {
                session.verify_auth().await;
            }
            print_auth(&session.auth().get());
            true
        }
        Command::Profile => {
            session.fetch_profile().await;
            report_profile(session)
        }
        Command::ProfileEdit(patch) => {
            session.update_profile(patch).await;
            report_profile(session)
        }
        Command::Help => true,
    }
}

fn report_profile(session: &Session) -> bool {
    if session.auth().get().is_empty() {
        eprintln!("Not signed in. Run `session-cli login` first.");
        return false;
    }

    let state = session.profile().get();
    print_profile(&state);
    state.error.is_none()
}

fn print_auth(state: &AuthState) {
    match (&state.user, &state.token) {
        (Some(user), Some(_)) => {
            println!("Signed in as {} <{}>", user.username, user.email);
            println!("  user id: {}", user.id);
        }
        (None, Some(_)) => {
            println!("Token remembered, user not verified (run `session-cli status --verify`).");
        }
        _ => println!("Not signed in."),
    }
}

fn print_profile(state: &ProfileState) {
    if let Some(profile) = &state.profile {
        println!("{}", profile.display_name);
        if let Some(bio) = &profile.bio {
            println!("  bio:     {}", bio);
        }
        if let Some(avatar_url) = &profile.avatar_url {
            println!("  avatar:  {}", avatar_url);
        }
        println!("  updated: {}", profile.updated_at.format("%Y-%m-%d %H:%M"));
    }
    if let Some(error) = &state.error {
        eprintln!("Error: {}", error);
    }
}
