//! mood - command-line client for the Mood social network

mod presenter;

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use libmood::logging::{self, LogFormat};
use libmood::screens::{PostForm, SignInForm, Submission};
use libmood::types::ImageAttachment;
use libmood::{Config, MoodError, MoodService, UserProfile};

use crate::presenter::TerminalPresenter;

#[derive(Parser, Debug)]
#[command(name = "mood")]
#[command(about = "Sign in, post and search on Mood from the terminal", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format (text, json, pretty)
    #[arg(long, global = true, env = "MOOD_LOG_FORMAT")]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in with email and password
    Signin {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Password (prompted for when omitted)
        #[arg(short, long, env = "MOOD_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Remember the session for later invocations
        #[arg(short, long)]
        remember: bool,
    },

    /// Create a post (reads content from stdin if not provided)
    Post {
        /// Text content, up to 280 characters
        content: Option<String>,

        /// JPEG image to attach
        #[arg(short, long)]
        image: Option<PathBuf>,
    },

    /// Search users by name or nick
    Search {
        /// Search text (case-insensitive)
        query: String,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the signed-in user
    Whoami,

    /// Sign out
    Logout {
        /// Also delete the remembered session
        #[arg(long)]
        forget: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut log_config = logging::config_from_env();
    if let Some(format) = cli.log_format {
        log_config.format = format;
    }
    log_config.verbose = cli.verbose;
    log_config.init();

    let presenter = TerminalPresenter::new();
    if let Err(e) = run(cli.command, &presenter).await {
        let mood_error = e.downcast_ref::<MoodError>();
        // Controllers already showed request failures as notifications
        if !presenter.reported_error() {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(mood_error.map_or(1, MoodError::exit_code));
    }
}

async fn run(command: Commands, presenter: &TerminalPresenter) -> Result<()> {
    let config = Config::load_or_default()?;
    let service = MoodService::from_config(config)?;
    service.restore_session();

    match command {
        Commands::Signin {
            email,
            password,
            remember,
        } => sign_in(&service, presenter, email, password, remember).await,
        Commands::Post { content, image } => post(&service, presenter, content, image).await,
        Commands::Search { query, json } => search(&service, presenter, query, json).await,
        Commands::Whoami => {
            whoami(&service);
            Ok(())
        }
        Commands::Logout { forget } => logout(&service, forget),
    }
}

async fn sign_in(
    service: &MoodService,
    presenter: &TerminalPresenter,
    email: String,
    password: Option<String>,
    remember: bool,
) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => rpassword::prompt_password("Password: ").context("Failed to read password")?,
    };

    // Whatever `run` restored came from the remembered record
    let remembered = service.session().session().user().cloned();

    service.sign_in().set_remember(remember);
    let outcome = service
        .sign_in()
        .submit(service.session(), presenter, SignInForm::new(email, password))
        .await;

    let user = settle(outcome)?;
    println!("Signed in as {}", user.display_name());
    if remember {
        tracing::info!(
            "Session remembered in {} storage",
            service.session().vault().backend_name()
        );
    } else if let Some(hint) = not_remembered_hint(remembered.as_ref(), &user) {
        eprintln!("{}", hint);
    }
    Ok(())
}

/// Each invocation is a fresh process, so an unremembered sign-in ends here
fn not_remembered_hint(remembered: Option<&UserProfile>, user: &UserProfile) -> Option<String> {
    match remembered {
        Some(previous) if previous.id != user.id => Some(format!(
            "Warning: session not remembered; later commands will run as {} (use --remember to replace it)",
            previous.display_name()
        )),
        Some(_) => None,
        None => Some(
            "Note: session not remembered; use --remember to stay signed in".to_string(),
        ),
    }
}

async fn post(
    service: &MoodService,
    presenter: &TerminalPresenter,
    content: Option<String>,
    image: Option<PathBuf>,
) -> Result<()> {
    let content = match content {
        Some(content) => Some(content),
        None if image.is_none() && !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read content from stdin")?;
            Some(buffer.trim_end().to_string())
        }
        None => None,
    };

    let mut form = PostForm {
        content,
        image: None,
    };
    form.validate().map_err(MoodError::Validation)?;

    if !service.session().is_authenticated() {
        return Err(MoodError::NotSignedIn.into());
    }

    if let Some(path) = image {
        form.image = Some(ImageAttachment::from_path(&path).await?);
    }

    settle(service.post().submit(service.session(), presenter, form).await)?;
    Ok(())
}

async fn search(
    service: &MoodService,
    presenter: &TerminalPresenter,
    query: String,
    json: bool,
) -> Result<()> {
    service.search().set_query(query);
    let results = settle(service.search().submit(service.session(), presenter).await)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else if results.is_empty() {
        println!("No users found");
    } else {
        for user in &results {
            print_user(user);
        }
    }
    Ok(())
}

fn whoami(service: &MoodService) {
    match service.session().session().user() {
        Some(user) => print_user(user),
        None => println!("Not signed in"),
    }
}

fn logout(service: &MoodService, forget: bool) -> Result<()> {
    if forget {
        service.session().logout_and_forget()?;
        println!("Signed out and forgot the remembered session");
    } else {
        service.session().logout();
        println!("Signed out (remembered session kept; use --forget to remove it)");
    }
    Ok(())
}

fn print_user(user: &UserProfile) {
    println!(
        "{}\t{}\t{}",
        user.id,
        user.nick.as_deref().unwrap_or("-"),
        user.name.as_deref().unwrap_or("-")
    );
}

/// A one-shot CLI run never overlaps submissions or unmounts
fn settle<T>(outcome: Submission<T>) -> Result<T> {
    match outcome {
        Submission::Completed(value) => Ok(value),
        Submission::Failed(e) => Err(e.into()),
        Submission::Busy | Submission::Discarded => {
            anyhow::bail!("Operation did not complete")
        }
    }
}
