use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::Timelike;
use clap::{Parser, Subcommand};

use crate::auth;
use crate::controller::{NoticeKind, Presenter, TaskListController};
use crate::greeting;
use crate::models::{
    Filter, Identity, Owner, Settings, SettingsFile, Task, SCHEMA_VERSION,
};
use crate::remote::RemoteStore;
use crate::shell;
use crate::state::TaskView;
use crate::storage::Storage;
use crate::store::{LocalStore, MemoryStore, TaskStore};

#[derive(Parser, Debug)]
#[command(name = "donext", version, about = "DoNext - personal to-do list with optional cloud sync")]
pub struct Cli {
    /// Data directory override.
    #[arg(long, env = "DONEXT_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Keep tasks in memory only; nothing is persisted.
    #[arg(long, global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a task.
    Add {
        /// Task text; multiple words are joined.
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// List tasks.
    List {
        /// View filter: all, active, or completed.
        #[arg(long, default_value = "all")]
        filter: Filter,
    },
    /// Flip a task between active and completed.
    Toggle {
        /// Task id or unique id prefix.
        id: String,
    },
    /// Delete a task.
    Delete {
        /// Task id or unique id prefix.
        id: String,
    },
    /// Delete every task for the current owner.
    Clear {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Record a signed-in identity so tasks sync to the cloud store.
    Login {
        uid: String,
        /// Display name supplied by the identity provider.
        #[arg(long)]
        name: Option<String>,
    },
    /// Sign out and return to the local task list.
    Logout,
    /// Store the display name used in greetings.
    Name { name: String },
    /// Show the welcome greeting.
    Greet,
    /// Set the colour theme (light or dark), or toggle it when no value is given.
    Theme { theme: Option<String> },
    /// Print a motivational quote.
    Quote,
    /// Print the contact address.
    Contact,
}

#[derive(Debug)]
pub enum CommandError {
    /// Already surfaced to the user through a notice.
    Reported,
    Message(String),
}

impl From<String> for CommandError {
    fn from(value: String) -> Self {
        CommandError::Message(value)
    }
}

/// CLI presenter: notices go straight to the terminal; views are printed on
/// demand by the commands below rather than on every optimistic re-render.
pub struct CliPresenter;

impl Presenter for CliPresenter {
    fn render(&self, _view: &TaskView) {}

    fn notify(&self, kind: NoticeKind, text: &str) {
        match kind {
            NoticeKind::Info => println!("{text}"),
            NoticeKind::Error => eprintln!("{text}"),
        }
    }
}

fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

/// Renders a task view as terminal lines, ending with the stats bar.
pub fn format_view(view: &TaskView) -> String {
    let mut out = String::new();
    if view.tasks.is_empty() {
        match view.filter {
            Filter::All => out.push_str("No tasks.\n"),
            filter => out.push_str(&format!("No {} tasks.\n", filter.as_str())),
        }
    }
    for task in &view.tasks {
        let mark = if task.completed { 'x' } else { ' ' };
        out.push_str(&format!("[{mark}] {}  {}\n", short_id(&task.id), task.text));
    }
    out.push_str(&format!(
        "Total: {} \u{2022} Active: {} \u{2022} Completed: {}\n",
        view.summary.total, view.summary.active, view.summary.completed
    ));
    out
}

/// Maps a user-typed id (or unique prefix) to a full task id.
pub fn resolve_task_id(tasks: &[Task], needle: &str) -> Result<String, String> {
    if tasks.iter().any(|task| task.id == needle) {
        return Ok(needle.to_string());
    }
    let matches: Vec<&Task> = tasks
        .iter()
        .filter(|task| task.id.starts_with(needle))
        .collect();
    match matches.as_slice() {
        [task] => Ok(task.id.clone()),
        [] => Err("No such task.".to_string()),
        _ => Err(format!("Id prefix '{needle}' is ambiguous.")),
    }
}

/// True on the first run: no stored display name and none supplied by the
/// identity provider, so the greeting flow must ask for one first.
fn needs_name_prompt(settings: &Settings, identity: Option<&Identity>) -> bool {
    settings.display_name.is_none()
        && identity
            .and_then(|identity| identity.display_name.as_deref())
            .is_none()
}

/// Validates a user-entered display name.
fn parse_name(input: &str) -> Result<String, String> {
    let name = input.trim();
    if name.is_empty() {
        return Err("Please enter your name.".to_string());
    }
    Ok(name.to_string())
}

fn resolve_data_dir(flag: Option<PathBuf>) -> Result<PathBuf, CommandError> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    dirs::data_dir()
        .map(|dir| dir.join("donext"))
        .ok_or_else(|| CommandError::Message("could not determine a data directory".to_string()))
}

fn save_settings(storage: &Storage, settings: &Settings) -> Result<(), CommandError> {
    storage
        .save_settings(&SettingsFile {
            schema_version: SCHEMA_VERSION,
            settings: settings.clone(),
        })
        .map_err(|err| CommandError::Message(format!("could not save settings: {err}")))
}

/// Picks the store backend and owner for this run: a signed-in session with
/// sync configured gets the remote per-owner collection; everything else
/// falls back to the local pseudo-owner.
fn select_store(
    data_dir: &Path,
    settings: &Settings,
    identity: Option<Identity>,
    ephemeral: bool,
) -> Result<(TaskStore, Owner), CommandError> {
    if ephemeral {
        let owner = identity.map(Owner::User).unwrap_or(Owner::Local);
        return Ok((TaskStore::Memory(MemoryStore::new()), owner));
    }
    match (identity, settings.sync.as_ref()) {
        (Some(identity), Some(sync)) => {
            let store = RemoteStore::new(sync)
                .map_err(|err| CommandError::Message(format!("sync unavailable: {err}")))?;
            Ok((TaskStore::Remote(store), Owner::User(identity)))
        }
        (Some(identity), None) => {
            log::warn!(
                "signed in as {} but sync is not configured; using local tasks",
                identity.uid
            );
            Ok((local_store(data_dir), Owner::Local))
        }
        (None, _) => Ok((local_store(data_dir), Owner::Local)),
    }
}

fn local_store(data_dir: &Path) -> TaskStore {
    TaskStore::Local(LocalStore::new(Storage::new(data_dir.to_path_buf())))
}

async fn build_controller(
    data_dir: &Path,
    settings: &Settings,
    identity: Option<Identity>,
    ephemeral: bool,
) -> Result<TaskListController<CliPresenter>, CommandError> {
    let (store, owner) = select_store(data_dir, settings, identity, ephemeral)?;
    let controller = TaskListController::new(store, CliPresenter);
    controller
        .load(Some(owner))
        .await
        .map_err(|_| CommandError::Reported)?;
    Ok(controller)
}

fn prompt_line(prompt: &str) -> Result<String, CommandError> {
    print!("{prompt}");
    std::io::stdout()
        .flush()
        .map_err(|err| CommandError::Message(format!("terminal error: {err}")))?;
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .map_err(|err| CommandError::Message(format!("terminal error: {err}")))?;
    Ok(line)
}

fn confirm(prompt: &str) -> Result<bool, CommandError> {
    let answer = prompt_line(prompt)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

pub async fn run(cli: Cli) -> Result<(), CommandError> {
    let data_dir = resolve_data_dir(cli.data_dir)?;
    if !cli.ephemeral {
        if let Err(err) = crate::logging::init_logging(&data_dir) {
            eprintln!("warning: file logging unavailable: {err}");
        }
    }

    let storage = Storage::new(data_dir.clone());
    storage
        .ensure_dirs()
        .map_err(|err| CommandError::Message(format!("cannot prepare data directory: {err}")))?;
    let mut settings = storage
        .load_settings()
        .map(|file| file.settings)
        .unwrap_or_default();
    let identity = auth::current_identity(&storage);

    match cli.command {
        Command::Add { text } => {
            let controller =
                build_controller(&data_dir, &settings, identity, cli.ephemeral).await?;
            let text = text.join(" ");
            match controller.add(&text).await {
                Ok(task) => println!("Added {} ({})", task.text, short_id(&task.id)),
                Err(_) => return Err(CommandError::Reported),
            }
        }
        Command::List { filter } => {
            let controller =
                build_controller(&data_dir, &settings, identity, cli.ephemeral).await?;
            controller.set_filter(filter);
            print!("{}", format_view(&controller.view()));
        }
        Command::Toggle { id } => {
            let controller =
                build_controller(&data_dir, &settings, identity, cli.ephemeral).await?;
            let id = resolve_task_id(&controller.state().tasks(), &id)
                .map_err(CommandError::Message)?;
            match controller.toggle_completion(&id).await {
                Ok(true) => println!("Completed {}.", short_id(&id)),
                Ok(false) => println!("Reopened {}.", short_id(&id)),
                Err(_) => return Err(CommandError::Reported),
            }
        }
        Command::Delete { id } => {
            let controller =
                build_controller(&data_dir, &settings, identity, cli.ephemeral).await?;
            let id = resolve_task_id(&controller.state().tasks(), &id)
                .map_err(CommandError::Message)?;
            match controller.delete(&id).await {
                Ok(()) => println!("Deleted {}.", short_id(&id)),
                Err(_) => return Err(CommandError::Reported),
            }
        }
        Command::Clear { yes } => {
            let controller =
                build_controller(&data_dir, &settings, identity, cli.ephemeral).await?;
            if controller.view().summary.total == 0 {
                println!("Nothing to clear.");
                return Ok(());
            }
            if !yes && !confirm("Delete all tasks? [y/N] ")? {
                println!("Cancelled.");
                return Ok(());
            }
            controller
                .clear_all()
                .await
                .map_err(|_| CommandError::Reported)?;
        }
        Command::Login { uid, name } => {
            let uid = uid.trim().to_string();
            if uid.is_empty() {
                return Err(CommandError::Message("uid must not be empty".to_string()));
            }
            auth::sign_in(
                &storage,
                Identity {
                    uid: uid.clone(),
                    display_name: name,
                },
            )
            .map_err(|err| CommandError::Message(format!("could not record session: {err}")))?;
            println!("Signed in as {uid}.");
            if settings.sync.is_none() {
                println!("Note: sync is not configured; tasks stay local until it is.");
            }
        }
        Command::Logout => {
            auth::sign_out(&storage)
                .map_err(|err| CommandError::Message(format!("could not clear session: {err}")))?;
            // Signing out also forgets the stored display name.
            settings.display_name = None;
            save_settings(&storage, &settings)?;
            println!("You are signed out.");
        }
        Command::Name { name } => {
            let name = parse_name(&name).map_err(CommandError::Message)?;
            settings.display_name = Some(name.clone());
            save_settings(&storage, &settings)?;
            println!("Nice to meet you, {name}!");
        }
        Command::Greet => {
            if needs_name_prompt(&settings, identity.as_ref()) {
                let input = prompt_line("What should we call you? ")?;
                let name = parse_name(&input).map_err(CommandError::Message)?;
                settings.display_name = Some(name);
                save_settings(&storage, &settings)?;
            }

            let name =
                greeting::resolve_display_name(settings.display_name.as_deref(), identity.as_ref());
            let hour = chrono::Local::now().hour();
            let text = greeting::compose_greeting(&settings.greeting, &name, hour).await;
            println!("{text}");

            // Overlay semantics: hold until the display duration elapses or
            // the user hits Enter.
            let (tx, rx) = tokio::sync::oneshot::channel();
            std::thread::spawn(move || {
                let mut line = String::new();
                let _ = std::io::stdin().read_line(&mut line);
                let _ = tx.send(());
            });
            greeting::present(settings.greeting.display_ms, rx).await;
        }
        Command::Theme { theme } => {
            match theme {
                Some(theme) => {
                    shell::set_theme(&mut settings, &theme).map_err(CommandError::Message)?;
                }
                // Bare `theme` flips between light and dark, like the UI toggle.
                None => {
                    shell::toggle_theme(&mut settings);
                }
            }
            save_settings(&storage, &settings)?;
            println!("Theme set to {}.", settings.theme);
        }
        Command::Quote => println!("{}", shell::random_quote()),
        Command::Contact => {
            println!("Questions or feedback? Write to {}.", shell::CONTACT_EMAIL);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SyncSettings;
    use crate::state::Summary;

    fn make_task(id: &str, text: &str, completed: bool) -> Task {
        Task {
            id: id.to_string(),
            text: text.to_string(),
            completed,
            created_at: Some(1),
        }
    }

    #[test]
    fn resolve_task_id_matches_exact_then_unique_prefix() {
        let tasks = vec![
            make_task("abc-1234", "a", false),
            make_task("abd-5678", "b", false),
        ];
        assert_eq!(resolve_task_id(&tasks, "abc-1234").unwrap(), "abc-1234");
        assert_eq!(resolve_task_id(&tasks, "abd").unwrap(), "abd-5678");
        assert!(resolve_task_id(&tasks, "ab").unwrap_err().contains("ambiguous"));
        assert_eq!(resolve_task_id(&tasks, "zzz").unwrap_err(), "No such task.");
    }

    #[test]
    fn format_view_ends_with_the_stats_bar() {
        let view = TaskView {
            filter: Filter::All,
            tasks: vec![
                make_task("abcdefgh-rest", "buy milk", false),
                make_task("ijklmnop-rest", "call mom", true),
            ],
            summary: Summary {
                total: 2,
                active: 1,
                completed: 1,
            },
        };
        let text = format_view(&view);
        assert!(text.contains("[ ] abcdefgh  buy milk"));
        assert!(text.contains("[x] ijklmnop  call mom"));
        assert!(text.ends_with("Total: 2 \u{2022} Active: 1 \u{2022} Completed: 1\n"));
    }

    #[test]
    fn format_view_notes_an_empty_filtered_view() {
        let view = TaskView {
            filter: Filter::Active,
            tasks: Vec::new(),
            summary: Summary {
                total: 1,
                active: 0,
                completed: 1,
            },
        };
        let text = format_view(&view);
        assert!(text.starts_with("No active tasks.\n"));

        // The unfiltered empty list reads as a plain sentence.
        let view = TaskView {
            filter: Filter::All,
            tasks: Vec::new(),
            summary: Summary {
                total: 0,
                active: 0,
                completed: 0,
            },
        };
        assert!(format_view(&view).starts_with("No tasks.\n"));
    }

    #[test]
    fn name_prompt_fires_only_when_no_name_is_available() {
        let with_name = |name: Option<&str>| {
            let mut settings = Settings::default();
            settings.display_name = name.map(str::to_string);
            settings
        };
        let identity = |name: Option<&str>| Identity {
            uid: "uid-1".to_string(),
            display_name: name.map(str::to_string),
        };

        assert!(needs_name_prompt(&with_name(None), None));
        assert!(needs_name_prompt(
            &with_name(None),
            Some(&identity(None))
        ));
        assert!(!needs_name_prompt(
            &with_name(None),
            Some(&identity(Some("Priya")))
        ));
        assert!(!needs_name_prompt(&with_name(Some("Sam")), None));
        assert!(!needs_name_prompt(
            &with_name(Some("Sam")),
            Some(&identity(Some("Priya")))
        ));
    }

    #[test]
    fn parse_name_trims_and_rejects_blank_input() {
        assert_eq!(parse_name("  Sam \n").unwrap(), "Sam");
        assert_eq!(parse_name("").unwrap_err(), "Please enter your name.");
        assert_eq!(parse_name("   \n").unwrap_err(), "Please enter your name.");
    }

    #[test]
    fn select_store_prefers_remote_for_signed_in_sync() {
        let dir = Path::new("/tmp/donext-test");
        let mut settings = Settings::default();
        settings.sync = Some(SyncSettings {
            base_url: "https://sync.example/api".to_string(),
            api_key: None,
        });
        let identity = Identity {
            uid: "uid-1".to_string(),
            display_name: None,
        };

        let (store, owner) =
            select_store(dir, &settings, Some(identity.clone()), false).expect("select");
        assert!(matches!(store, TaskStore::Remote(_)));
        assert_eq!(owner, Owner::User(identity.clone()));

        // Signed in without sync configured: stay on the local pseudo-owner.
        settings.sync = None;
        let (store, owner) =
            select_store(dir, &settings, Some(identity.clone()), false).expect("select");
        assert!(matches!(store, TaskStore::Local(_)));
        assert_eq!(owner, Owner::Local);

        // Ephemeral wins over everything and keeps the identity as owner.
        let (store, owner) =
            select_store(dir, &settings, Some(identity.clone()), true).expect("select");
        assert!(matches!(store, TaskStore::Memory(_)));
        assert_eq!(owner, Owner::User(identity));

        let (store, owner) = select_store(dir, &settings, None, false).expect("select");
        assert!(matches!(store, TaskStore::Local(_)));
        assert_eq!(owner, Owner::Local);
    }
}
