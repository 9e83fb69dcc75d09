//! Memo CLI - Command-line front end for Memo
//!
//! Drives the same screen state machines the app clients use, against a
//! local libSQL-backed document store.

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use memo_core::auth::{AuthContext, AuthUser};
use memo_core::screens::{DetailScreen, EditorScreen, ListScreen, SaveOutcome};
use memo_core::store::{DocumentStore, LibSqlStore};
use memo_core::Memo;
use serde::Serialize;
use thiserror::Error;

#[derive(Parser)]
#[command(name = "memo")]
#[command(about = "Browse and edit tagged memos from the command line")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Optional path to local database file
    #[arg(long, value_name = "PATH")]
    db_path: Option<PathBuf>,

    /// User profile to operate on (defaults to $MEMO_USER, then "local")
    #[arg(long, value_name = "NAME")]
    user: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new memo
    #[command(alias = "new")]
    Add {
        /// Memo body
        body: Vec<String>,
        /// Tag to attach (repeatable)
        #[arg(short, long = "tag", value_name = "TAG")]
        tags: Vec<String>,
    },
    /// List memos, newest first
    List {
        /// Only memos carrying every given tag (repeatable)
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a single memo
    Show {
        /// Memo ID or unique ID prefix
        id: String,
    },
    /// Edit an existing memo
    Edit {
        /// Memo ID or unique ID prefix
        id: String,
        /// Replace the memo body
        #[arg(long, value_name = "TEXT")]
        body: Option<String>,
        /// Tag to add (repeatable)
        #[arg(long = "add-tag", value_name = "TAG")]
        add_tags: Vec<String>,
        /// Tag to remove (repeatable)
        #[arg(long = "remove-tag", value_name = "TAG")]
        remove_tags: Vec<String>,
    },
    /// Delete an existing memo
    Delete {
        /// Memo ID or unique ID prefix
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// List all tags in use
    Tags,
    /// Watch the memo list and print every pushed snapshot
    Watch,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] memo_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No memo body provided")]
    EmptyBody,
    #[error("Memo not found for id/prefix: {0}")]
    MemoNotFound(String),
    #[error("{0}")]
    AmbiguousMemoId(String),
    #[error("{0}")]
    StoreRejected(&'static str),
    #[error("Not signed in")]
    NotSignedIn,
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("memo=info".parse().expect("valid directive")),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);
    let user = resolve_user(cli.user, env::var("MEMO_USER").ok());
    tracing::debug!("using database at {} as {user}", db_path.display());

    let store = LibSqlStore::open(&db_path).await?;
    let auth = AuthContext::signed_in(AuthUser::new(user));

    match cli.command {
        Commands::Add { body, tags } => run_add(&store, &auth, &body, &tags).await?,
        Commands::List { tags, json } => run_list(&store, &auth, &tags, json).await?,
        Commands::Show { id } => run_show(&store, &auth, &id).await?,
        Commands::Edit {
            id,
            body,
            add_tags,
            remove_tags,
        } => run_edit(&store, &auth, &id, body, &add_tags, &remove_tags).await?,
        Commands::Delete { id, yes } => run_delete(&store, &auth, &id, yes).await?,
        Commands::Tags => run_tags(&store, &auth).await?,
        Commands::Watch => run_watch(store, auth).await?,
    }

    Ok(())
}

fn resolve_db_path(override_path: Option<PathBuf>) -> PathBuf {
    override_path.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from(".memo"))
            .join("memo")
            .join("memo.db")
    })
}

fn resolve_user(flag: Option<String>, env_value: Option<String>) -> String {
    flag.or(env_value)
        .map(|user| user.trim().to_string())
        .filter(|user| !user.is_empty())
        .unwrap_or_else(|| "local".to_string())
}

async fn run_add<S: DocumentStore>(
    store: &S,
    auth: &AuthContext,
    body_parts: &[String],
    tags: &[String],
) -> Result<(), CliError> {
    let body = body_parts.join(" ");
    if body.trim().is_empty() {
        return Err(CliError::EmptyBody);
    }

    let mut editor = EditorScreen::create();
    editor.set_body_text(body);
    for tag in tags {
        editor.set_tag_input(tag);
        editor.add_tag();
    }

    match editor.save(store, auth).await {
        SaveOutcome::Saved { id } => {
            println!("{id}");
            Ok(())
        }
        SaveOutcome::Failed => Err(alert_error(&mut editor)),
        SaveOutcome::SkippedUnauthenticated => Err(CliError::NotSignedIn),
    }
}

async fn run_list<S: DocumentStore + Clone>(
    store: &S,
    auth: &AuthContext,
    tags: &[String],
    as_json: bool,
) -> Result<(), CliError> {
    let mut screen = ListScreen::activate(store.clone(), auth.clone()).await?;
    for tag in tags {
        screen.toggle_tag(tag);
    }

    let memos = screen.memos();
    if as_json {
        let items: Vec<MemoListItem> = memos.iter().map(memo_to_list_item).collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for line in format_memo_lines(&memos) {
            println!("{line}");
        }
    }

    screen.deactivate();
    Ok(())
}

async fn run_show<S: DocumentStore + Clone>(
    store: &S,
    auth: &AuthContext,
    id: &str,
) -> Result<(), CliError> {
    let id = resolve_memo_id(store, auth, id).await?;
    let screen = DetailScreen::activate(store, auth, &id).await?;
    let display = screen.display();
    screen.deactivate();

    println!("{}", display.title);
    if !display.date.is_empty() {
        println!("{}", display.date);
    }
    println!();
    println!("{}", display.body);
    if !display.tags.is_empty() {
        let tags: Vec<String> = display.tags.iter().map(|tag| format!("#{tag}")).collect();
        println!();
        println!("{}", tags.join(" "));
    }
    Ok(())
}

async fn run_edit<S: DocumentStore + Clone>(
    store: &S,
    auth: &AuthContext,
    id: &str,
    body: Option<String>,
    add_tags: &[String],
    remove_tags: &[String],
) -> Result<(), CliError> {
    let id = resolve_memo_id(store, auth, id).await?;
    let mut editor = EditorScreen::edit(store, auth, id).await?;

    if let Some(body) = body {
        editor.set_body_text(body);
    }
    for tag in remove_tags {
        editor.remove_tag(tag);
    }
    for tag in add_tags {
        editor.set_tag_input(tag);
        editor.add_tag();
    }

    match editor.save(store, auth).await {
        SaveOutcome::Saved { id } => {
            println!("{id}");
            Ok(())
        }
        SaveOutcome::Failed => Err(alert_error(&mut editor)),
        SaveOutcome::SkippedUnauthenticated => Err(CliError::NotSignedIn),
    }
}

async fn run_delete<S: DocumentStore + Clone>(
    store: &S,
    auth: &AuthContext,
    id: &str,
    skip_confirmation: bool,
) -> Result<(), CliError> {
    let id = resolve_memo_id(store, auth, id).await?;
    let mut screen = ListScreen::activate(store.clone(), auth.clone()).await?;
    screen.request_delete(&id);

    if !skip_confirmation && !confirm_on_stdin(&id)? {
        screen.cancel_delete();
        screen.deactivate();
        println!("Cancelled");
        return Ok(());
    }

    screen.confirm_delete().await;
    let alerts = screen.take_alerts();
    screen.deactivate();

    if let Some(alert) = alerts.first() {
        return Err(CliError::StoreRejected(alert.message()));
    }
    println!("{id}");
    Ok(())
}

async fn run_tags<S: DocumentStore + Clone>(store: &S, auth: &AuthContext) -> Result<(), CliError> {
    let screen = ListScreen::activate(store.clone(), auth.clone()).await?;
    for tag in screen.tag_universe() {
        println!("{tag}");
    }
    screen.deactivate();
    Ok(())
}

async fn run_watch<S: DocumentStore>(store: S, auth: AuthContext) -> Result<(), CliError> {
    let mut screen = ListScreen::activate(store, auth).await?;
    print_snapshot(&screen.memos());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = screen.next_change() => {
                if !changed {
                    break;
                }
                print_snapshot(&screen.memos());
            }
        }
    }

    screen.deactivate();
    Ok(())
}

fn print_snapshot(memos: &[Memo]) {
    println!("-- {} memo(s) --", memos.len());
    for line in format_memo_lines(memos) {
        println!("{line}");
    }
}

/// Resolve an exact memo id or a unique id prefix against the current
/// snapshot.
async fn resolve_memo_id<S: DocumentStore + Clone>(
    store: &S,
    auth: &AuthContext,
    input: &str,
) -> Result<String, CliError> {
    let screen = ListScreen::activate(store.clone(), auth.clone()).await?;
    let result = resolve_id_against(screen.all_memos(), input);
    screen.deactivate();
    result
}

fn resolve_id_against(memos: &[Memo], input: &str) -> Result<String, CliError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::MemoNotFound(String::new()));
    }

    if memos.iter().any(|memo| memo.id.as_str() == input) {
        return Ok(input.to_string());
    }

    let matches: Vec<&Memo> = memos
        .iter()
        .filter(|memo| memo.id.as_str().starts_with(input))
        .collect();
    match matches.as_slice() {
        [] => Err(CliError::MemoNotFound(input.to_string())),
        [memo] => Ok(memo.id.as_str().to_string()),
        many => Err(CliError::AmbiguousMemoId(format!(
            "Prefix '{input}' matches {} memos; provide more characters",
            many.len()
        ))),
    }
}

fn confirm_on_stdin(id: &str) -> Result<bool, CliError> {
    print!("Delete memo {id}? [y/N] ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

fn alert_error(editor: &mut EditorScreen) -> CliError {
    let message = editor
        .take_alerts()
        .first()
        .map_or("Save rejected by the store", |alert| alert.message());
    CliError::StoreRejected(message)
}

#[derive(Debug, Serialize)]
struct MemoListItem {
    id: String,
    title: String,
    body_text: String,
    updated_at: Option<i64>,
    tags: Vec<String>,
}

fn memo_to_list_item(memo: &Memo) -> MemoListItem {
    MemoListItem {
        id: memo.id.to_string(),
        title: memo.title_preview(60),
        body_text: memo.body_text.clone(),
        updated_at: memo.updated_at,
        tags: memo.tags.clone(),
    }
}

fn format_memo_lines(memos: &[Memo]) -> Vec<String> {
    memos
        .iter()
        .map(|memo| {
            let id = memo.id.as_str();
            let short_id: String = id.chars().take(8).collect();
            let mut line = format!("{short_id}  {}  {}", memo.updated_at_display(), memo.title_preview(60));
            if !memo.tags.is_empty() {
                let tags: Vec<String> = memo.tags.iter().map(|tag| format!("#{tag}")).collect();
                line.push_str("  ");
                line.push_str(&tags.join(" "));
            }
            line
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use memo_core::MemoId;
    use pretty_assertions::assert_eq;

    fn memo(id: &str, tags: &[&str]) -> Memo {
        Memo {
            id: MemoId::new(id),
            body_text: format!("memo {id}"),
            updated_at: Some(1_700_000_000_000),
            tags: tags.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn resolve_user_prefers_flag_then_env_then_default() {
        assert_eq!(
            resolve_user(Some("alice".to_string()), Some("bob".to_string())),
            "alice"
        );
        assert_eq!(resolve_user(None, Some("bob".to_string())), "bob");
        assert_eq!(resolve_user(None, None), "local");
        assert_eq!(resolve_user(Some("  ".to_string()), None), "local");
    }

    #[test]
    fn resolve_id_accepts_exact_match() {
        let memos = vec![memo("abcd-1", &[]), memo("abce-2", &[])];
        assert_eq!(resolve_id_against(&memos, "abcd-1").unwrap(), "abcd-1");
    }

    #[test]
    fn resolve_id_accepts_unique_prefix() {
        let memos = vec![memo("abcd-1", &[]), memo("abce-2", &[])];
        assert_eq!(resolve_id_against(&memos, "abcd").unwrap(), "abcd-1");
    }

    #[test]
    fn resolve_id_rejects_ambiguous_prefix() {
        let memos = vec![memo("abcd-1", &[]), memo("abce-2", &[])];
        assert!(matches!(
            resolve_id_against(&memos, "abc"),
            Err(CliError::AmbiguousMemoId(_))
        ));
    }

    #[test]
    fn resolve_id_rejects_unknown_id() {
        let memos = vec![memo("abcd-1", &[])];
        assert!(matches!(
            resolve_id_against(&memos, "zzz"),
            Err(CliError::MemoNotFound(_))
        ));
    }

    #[test]
    fn format_memo_lines_includes_tags() {
        let lines = format_memo_lines(&[memo("abcdefgh-123", &["work", "urgent"])]);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("abcdefgh"));
        assert!(lines[0].contains("#work #urgent"));
    }
}
