//! cloudnotes - command-line client for a cloudnotes server.
//!
//! Usage:
//!   cloudnotes signup --username alice --email alice@x.com --password pw1
//!   cloudnotes login --email alice@x.com --password pw1
//!   cloudnotes add --title Groceries --content "Milk, eggs" [--file list.pdf]
//!   cloudnotes list
//!   cloudnotes edit <ID> [--title T] [--content C]
//!   cloudnotes delete <ID>
//!   cloudnotes download <FILENAME> [-o PATH]
//!
//! Environment variables:
//!   CLOUDNOTES_URL - Server base URL (default: http://localhost:5000)
//!   CLOUDNOTES_PASSWORD - Password for signup/login when --password is omitted

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use cloudnotes::attachments::sanitize_file_name;
use cloudnotes::client::NotesClient;
use cloudnotes::models::Note;
use cloudnotes::session::{self, SavedSession};
use std::path::PathBuf;

/// Command-line client for the cloudnotes server
#[derive(Parser)]
#[command(name = "cloudnotes", about = "Command-line client for the cloudnotes server")]
struct Args {
    #[arg(
        long,
        env = "CLOUDNOTES_URL",
        default_value = "http://localhost:5000",
        help = "Server base URL"
    )]
    server: String,

    #[arg(long, help = "Act as this user instead of the logged-in one")]
    user: Option<String>,

    #[arg(long, value_name = "PATH", help = "Session file (default: ~/.cloudnotes/session.json)")]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account
    Signup {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "CLOUDNOTES_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log in and remember the account
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CLOUDNOTES_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the remembered account
    Logout,
    /// Add a note, optionally with an attachment
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
    },
    /// List your notes
    List {
        #[arg(long, help = "List every user's notes")]
        all: bool,
    },
    /// Change a note's title and/or content
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
    },
    /// Delete a note and its attachment
    Delete { id: String },
    /// Save a note's attachment locally
    Download {
        filename: String,
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let client = NotesClient::new(&args.server)?;
    let session_path = args
        .session_file
        .clone()
        .unwrap_or_else(session::default_session_path);

    match &args.command {
        Command::Signup { username, email, password } => {
            let message = client.signup(username, email, password).await?;
            println!("{}", message);
        }

        Command::Login { email, password } => {
            let username = client.login(email, password).await?;
            session::save_session(
                &session_path,
                &SavedSession {
                    username: username.clone(),
                    server: args.server.clone(),
                },
            )?;
            println!("Logged in as {}", username);
        }

        Command::Logout => {
            if session::clear_session(&session_path)? {
                println!("Logged out");
            } else {
                println!("Not logged in");
            }
        }

        Command::Add { title, content, file } => {
            let username = current_user(&args, &session_path)?;
            let note = client
                .add_note(&username, title, content, file.as_deref())
                .await?;
            println!("Note added!");
            print_note(&client, &note);
        }

        Command::List { all } => {
            let notes = if *all {
                client.list_notes(None).await?
            } else {
                let username = current_user(&args, &session_path)?;
                client.list_notes(Some(&username)).await?
            };

            if notes.is_empty() {
                println!("No notes found.");
            }
            for note in &notes {
                print_note(&client, note);
            }
        }

        Command::Edit { id, title, content } => {
            let username = current_user(&args, &session_path)?;
            let (title, content) = match (title, content) {
                (Some(title), Some(content)) => (title.clone(), content.clone()),
                _ => {
                    let notes = client.list_notes(Some(&username)).await?;
                    let current = notes
                        .into_iter()
                        .find(|n| &n.id == id)
                        .ok_or_else(|| anyhow!("Note {} not found", id))?;
                    (
                        title.clone().unwrap_or(current.title),
                        content.clone().unwrap_or(current.content),
                    )
                }
            };
            let message = client.edit_note(&username, id, &title, &content).await?;
            println!("{}", message);
        }

        Command::Delete { id } => {
            let username = current_user(&args, &session_path)?;
            let message = client.delete_note(&username, id).await?;
            println!("{}", message);
        }

        Command::Download { filename, output } => {
            let bytes = client.download(filename).await?;
            let output = output
                .clone()
                .unwrap_or_else(|| PathBuf::from(sanitize_file_name(filename)));
            tokio::fs::write(&output, &bytes)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Saved {} ({} bytes)", output.display(), bytes.len());
        }
    }

    Ok(())
}

/// The acting user: `--user`, else the saved login
fn current_user(args: &Args, session_path: &std::path::Path) -> Result<String> {
    if let Some(user) = &args.user {
        return Ok(user.clone());
    }
    match session::load_session(session_path)? {
        Some(saved) => {
            if saved.server != args.server {
                eprintln!(
                    "[cloudnotes] Note: logged in against {}, talking to {}",
                    saved.server, args.server
                );
            }
            Ok(saved.username)
        }
        None => Err(anyhow!("Not logged in. Run `cloudnotes login` first or pass --user")),
    }
}

fn print_note(client: &NotesClient, note: &Note) {
    println!();
    println!("[{}] {}", note.id, note.title);
    println!("{}", note.content);
    if let Some(file) = &note.file {
        let base = client.base_url().as_str().trim_end_matches('/');
        println!("Attachment: {}/uploads/{}", base, file);
    }
    println!("{}", note.date);
}
