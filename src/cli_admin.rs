use anyhow::{bail, Context, Result};
use clap::builder::styling::{AnsiColor, Color, Style, Styles};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use soundshare_server::config::DEFAULT_STORE_TIMEOUT_MS;
use soundshare_server::social::ServiceError;
use soundshare_server::store::{SocialStore, SqliteStore, UserRole, UserStore};
use soundshare_server::user::{new_user_from_signup, password_credentials};

const DB_FILE_NAME: &str = "soundshare.db";

fn get_styles() -> Styles {
    Styles::styled()
        .usage(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .header(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .literal(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .error(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser)]
#[command(styles = get_styles(), about = "Administration of a soundshare database")]
struct CliArgs {
    /// Directory holding the SQLite database.
    #[clap(long, value_parser = parse_path)]
    db_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RoleArg {
    Regular,
    Admin,
}

impl From<RoleArg> for UserRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Regular => UserRole::Regular,
            RoleArg::Admin => UserRole::Admin,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Creates a user with a password login.
    AddUser {
        email: String,
        name: String,
        password: String,

        /// Grants the admin role right away.
        #[clap(long)]
        admin: bool,
    },

    /// Replaces the password of the user with the given email.
    SetPassword { email: String, password: String },

    /// Changes the role of the user with the given email.
    SetRole { email: String, role: RoleArg },

    /// Lists every user with its role.
    ListUsers,

    /// Reports posts whose likes counter disagrees with their like records.
    Audit,
}

fn run(store: &SqliteStore, command: Command) -> Result<()> {
    match command {
        Command::AddUser {
            email,
            name,
            password,
            admin,
        } => {
            let role = if admin {
                UserRole::Admin
            } else {
                UserRole::Regular
            };
            let new_user = new_user_from_signup(&email, &name, &password, role)
                .map_err(|e| anyhow::anyhow!("{}", describe(&e)))?;
            match store.create_user(&new_user)? {
                Some(user_id) => println!("Created user {} ({})", user_id, new_user.email),
                None => bail!("A user with email {} already exists", new_user.email),
            }
        }
        Command::SetPassword { email, password } => {
            let email = email.trim().to_lowercase();
            let user = store
                .get_user_by_email(&email)?
                .with_context(|| format!("User {} not found", email))?;
            let credentials = password_credentials(user.id, &password)
                .map_err(|e| anyhow::anyhow!("{}", describe(&e)))?;
            if !store.set_password_credentials(&credentials)? {
                bail!("User {} disappeared while setting the password", email);
            }
            println!("Password of {} updated", email);
        }
        Command::SetRole { email, role } => {
            let email = email.trim().to_lowercase();
            let user = store
                .get_user_by_email(&email)?
                .with_context(|| format!("User {} not found", email))?;
            let role: UserRole = role.into();
            store.set_user_role(user.id, role)?;
            println!("User {} is now {:?}", email, role);
        }
        Command::ListUsers => {
            let users = store.get_all_users()?;
            if users.is_empty() {
                println!("No users.");
            }
            for user in users {
                println!(
                    "{:>6}  {:<8}  {:<32}  {}",
                    user.id,
                    format!("{:?}", user.role),
                    user.email,
                    user.name
                );
            }
        }
        Command::Audit => {
            let mismatches = store.audit_like_counters()?;
            if mismatches.is_empty() {
                println!("All like counters are consistent.");
            }
            for mismatch in mismatches {
                println!(
                    "Post {}: likes={} likedBy={} inLibraries={}",
                    mismatch.post_id, mismatch.likes, mismatch.liked_by, mismatch.in_libraries
                );
            }
        }
    }
    Ok(())
}

fn describe(error: &ServiceError) -> String {
    match error {
        ServiceError::Validation(errors) => errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    if !cli_args.db_dir.is_dir() {
        bail!("Database directory does not exist: {:?}", cli_args.db_dir);
    }
    let store = SqliteStore::new(
        cli_args.db_dir.join(DB_FILE_NAME),
        Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
    )?;
    run(&store, cli_args.command)
}
