use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueHint};
use todo_store::{Draft, FileStore, Item, Priority, TodoService, http};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Main verb. If omitted, `list` is default action.
    #[command(subcommand)]
    verb: Option<Verb>,

    /// Backing JSON file, shared by all verbs.
    #[arg(short, long, env = "TODO_FILE", value_hint = ValueHint::FilePath, default_value = "./todo.json")]
    file: PathBuf,
}

/// Fields of a full item, used by both `add` and `update`.
#[derive(clap::Args, Debug)]
struct Fields {
    title: String,

    #[arg(short, long, default_value = "")]
    description: String,

    #[arg(short, long, default_value = "medium")]
    priority: Priority,

    /// Free-form due date, e.g. 2025-06-01.
    #[arg(long)]
    due: Option<String>,
}

impl Fields {
    fn into_draft(self, completed: bool) -> Draft {
        Draft::builder()
            .title(self.title)
            .description(self.description)
            .priority(self.priority)
            .due(self.due)
            .completed(completed)
            .build()
    }
}

#[derive(Subcommand, Debug)]
enum Verb {
    /// Serve the JSON API and index page.
    Serve {
        #[arg(short, long, env = "TODO_BIND", default_value = "127.0.0.1:8000")]
        bind: SocketAddr,
    },
    List {
        /// Only show items with this completion state.
        #[arg(short, long)]
        completed: Option<bool>,
    },
    Add {
        #[command(flatten)]
        fields: Fields,
    },
    /// Replace an item wholesale; omitted optional fields reset to defaults.
    Update {
        id: u64,

        #[command(flatten)]
        fields: Fields,

        #[arg(short = 'c', long)]
        completed: bool,
    },
    Remove {
        id: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs on stderr; stdout is for listings.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let service = TodoService::new(FileStore::new(&cli.file));

    match cli.verb.unwrap_or(Verb::List { completed: None }) {
        Verb::Serve { bind } => serve(service, bind).await?,
        Verb::List { completed } => {
            let items = service.list(completed).context("Listing tasks")?;
            print_table(&items);
        }
        Verb::Add { fields } => {
            let item = service
                .create(fields.into_draft(false))
                .context("Adding task")?;
            print_table(&[item]);
        }
        Verb::Update {
            id,
            fields,
            completed,
        } => {
            let item = service
                .update(id, fields.into_draft(completed))
                .with_context(|| format!("Updating task {id}"))?;
            print_table(&[item]);
        }
        Verb::Remove { id } => {
            service
                .delete(id)
                .with_context(|| format!("Removing task {id}"))?;
            println!("removed {id}");
        }
    }
    Ok(())
}

async fn serve(service: TodoService<FileStore>, bind: SocketAddr) -> Result<()> {
    let path = service.store().path().display().to_string();
    let app = http::router(Arc::new(service));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!(%bind, file = %path, "serving to-do API");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            // Ctrl-C only ever fails if no handler can be installed; then just run.
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
            info!("shutting down");
        })
        .await
        .context("HTTP server")
}

fn print_table(items: &[Item]) {
    println!("{:>5} | {:<6} | {:<4} | {:<10} | Title", "ID", "Pri", "Done", "Due");
    println!("------+--------+------+------------+----------------");
    for t in items {
        println!(
            "{:>5} | {:<6} | {:<4} | {:<10} | {}",
            t.id,
            t.priority,
            if t.completed { "x" } else { "" },
            t.due_date.as_deref().unwrap_or("-"),
            t.title
        );
    }
}
