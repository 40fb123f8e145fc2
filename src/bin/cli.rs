use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use dotenvy::dotenv;
use taskhub::cli::{create_admin, format_stats, parse_revocation_reason};
use taskhub::state::init_sessions_from_env;
use taskhub_models::RegisterRequest;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "taskhub-cli")]
#[command(about = "Taskhub CLI - Administrative tools for Taskhub", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a verified administrator account
    CreateAdmin {
        /// Username
        #[arg(short = 'u', long)]
        username: Option<String>,

        /// Email address
        #[arg(short = 'e', long)]
        email: Option<String>,

        /// First name
        #[arg(short = 'f', long)]
        first_name: Option<String>,

        /// Last name
        #[arg(short = 'l', long)]
        last_name: Option<String>,

        /// Password (will be prompted securely if not provided)
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
    /// Delete expired refresh tokens and blacklist entries
    Cleanup,
    /// Show refresh token and blacklist statistics
    Stats,
    /// Revoke every session of a user
    RevokeSessions {
        /// ID of the user
        #[arg(long)]
        user_id: Uuid,

        /// forced_logout or security_breach
        #[arg(short = 'r', long, default_value = "forced_logout")]
        reason: String,
    },
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command).await {
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> anyhow::Result<()> {
    let sessions = init_sessions_from_env().await?;

    match command {
        Commands::CreateAdmin {
            username,
            email,
            first_name,
            last_name,
            password,
        } => {
            let request = RegisterRequest {
                username: prompt_if_missing(username, "Username")?,
                email: prompt_if_missing(email, "Email address")?,
                first_name: prompt_if_missing(first_name, "First name")?,
                last_name: prompt_if_missing(last_name, "Last name")?,
                password: match password {
                    Some(password) => password,
                    None => Password::new()
                        .with_prompt("Password")
                        .with_confirmation("Confirm password", "Passwords don't match")
                        .interact()?,
                },
                role: None,
            };

            let admin = create_admin(&sessions, request).await?;
            println!("\n✅ Admin created successfully!");
            println!("   ID: {}", admin.id);
            println!("   Email: {}", admin.email);
            println!("   Name: {} {}", admin.first_name, admin.last_name);
        }
        Commands::Cleanup => {
            let removed = sessions.cleanup_expired().await?;
            println!("\n✅ Cleanup finished");
            println!("   Refresh tokens removed: {}", removed.refresh_tokens_removed);
            println!(
                "   Blacklist entries removed: {}",
                removed.blacklist_entries_removed
            );
        }
        Commands::Stats => {
            let stats = sessions.stats().await?;
            println!("\n{}", format_stats(&stats));
        }
        Commands::RevokeSessions { user_id, reason } => {
            let reason = parse_revocation_reason(&reason)?;
            let revoked = sessions.force_logout(user_id, reason).await?;
            println!("\n✅ Sessions of {} revoked ({})", user_id, reason);
            println!("   Refresh tokens revoked: {}", revoked);
        }
    }

    Ok(())
}

fn prompt_if_missing(value: Option<String>, prompt: &str) -> anyhow::Result<String> {
    match value {
        Some(value) => Ok(value),
        None => Ok(Input::new().with_prompt(prompt).interact_text()?),
    }
}
