use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use docsum::{
    auth::{generate_token, hash_token},
    config, logging,
    processing::{DocumentService, UploadError, UploadSubmission, UploadedFile},
    store::User,
};
use serde_json::json;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "docsum-admin", about = "Administrative tasks for Docsum")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a user and print its bearer token.
    CreateUser {
        #[arg(long)]
        username: String,
    },
    /// Upload every file under a directory as a new document set.
    Import {
        #[arg(long)]
        user: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        dir: PathBuf,
    },
    /// List a user's document sets.
    ListSets {
        #[arg(long)]
        user: String,
    },
    /// List the documents of a set with their stored sizes.
    ListDocuments {
        #[arg(long)]
        user: String,
        #[arg(long)]
        set: i64,
    },
    /// Delete a document set and its stored files.
    DeleteSet {
        #[arg(long)]
        user: String,
        #[arg(long)]
        set: i64,
    },
    /// Summarize a document set and print the result.
    Summarize {
        #[arg(long)]
        user: String,
        #[arg(long)]
        set: i64,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = config::init_config().context("failed to load configuration")?;
    logging::init_tracing(config);
    let service = DocumentService::from_config(config)
        .await
        .context("failed to open document service")?;

    match cli.command {
        Command::CreateUser { username } => create_user(&service, &username).await,
        Command::Import { user, name, dir } => {
            let user = resolve_user(&service, &user).await?;
            import_directory(&service, &user, &name, &dir).await
        }
        Command::ListSets { user } => {
            let user = resolve_user(&service, &user).await?;
            let sets = service.store().list_by_owner(user.id).await?;
            if sets.is_empty() {
                println!("No document sets for {}", user.username);
            }
            for set in sets {
                println!(
                    "{id}\t{name}\t{count} documents\t{created}",
                    id = set.id,
                    name = set.name,
                    count = set.document_count,
                    created = set.created_at
                );
            }
            Ok(())
        }
        Command::ListDocuments { user, set } => {
            let user = resolve_user(&service, &user).await?;
            let store = service.store();
            if store.find_owned(user.id, set).await?.is_none() {
                bail!("document set {set} not found for {}", user.username);
            }
            for document in store.documents(set).await? {
                let bytes = store
                    .blobs()
                    .read(&document.file_path)
                    .await
                    .with_context(|| format!("failed to read blob for {}", document.title))?;
                println!(
                    "{id}\t{title}\t{size} bytes\t{uploaded}",
                    id = document.id,
                    title = document.title,
                    size = bytes.len(),
                    uploaded = document.uploaded_at
                );
            }
            Ok(())
        }
        Command::DeleteSet { user, set } => {
            let user = resolve_user(&service, &user).await?;
            if !service.store().delete_set(user.id, set).await? {
                bail!("document set {set} not found for {}", user.username);
            }
            println!("Deleted document set {set}");
            Ok(())
        }
        Command::Summarize { user, set } => {
            let user = resolve_user(&service, &user).await?;
            let outcome = service
                .summarize(&user, Some(json!(set)))
                .await
                .with_context(|| format!("failed to summarize document set {set}"))?;
            for notice in &outcome.notices {
                eprintln!("{:?}: {}", notice.level, notice.text);
            }
            println!("{}", outcome.summary);
            Ok(())
        }
    }
}

async fn create_user(service: &DocumentService, username: &str) -> Result<()> {
    let username = username.trim();
    if username.is_empty() {
        bail!("username must not be empty");
    }
    let token = generate_token();
    let user = service
        .store()
        .create_user(username, &hash_token(&token))
        .await
        .with_context(|| format!("failed to create user {username}"))?;
    println!("Created user {} (id {})", user.username, user.id);
    println!("Token: {token}");
    Ok(())
}

async fn resolve_user(service: &DocumentService, username: &str) -> Result<User> {
    service
        .store()
        .find_user_by_name(username)
        .await?
        .ok_or_else(|| anyhow!("unknown user {username}"))
}

async fn import_directory(
    service: &DocumentService,
    user: &User,
    name: &str,
    dir: &Path,
) -> Result<()> {
    let mut documents = Vec::new();
    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        let bytes = tokio::fs::read(entry.path())
            .await
            .with_context(|| format!("failed to read {}", entry.path().display()))?;
        documents.push(UploadedFile {
            filename: Some(entry.file_name().to_string_lossy().into_owned()),
            bytes,
        });
    }

    let submission = UploadSubmission {
        set_name: Some(name.to_string()),
        documents,
    };
    match service.upload_documents(user, submission).await {
        Ok(outcome) => {
            println!(
                "Imported {} documents into set {} ({})",
                outcome.document_set.document_count,
                outcome.document_set.id,
                outcome.document_set.name
            );
            Ok(())
        }
        Err(UploadError::Invalid(errors)) => bail!(
            "import rejected: {}",
            serde_json::to_string(&errors).unwrap_or_default()
        ),
        Err(UploadError::Store(err)) => {
            Err(err).with_context(|| format!("failed to import {}", dir.display()))
        }
    }
}
