//! `pagegen` command-line front end.
//!
//! # Responsibility
//! - Map subcommands onto the core services against one SQLite file.
//! - Print a one-line banner per batch; exit non-zero on failure.

use clap::{Parser, Subcommand};
use log::info;
use pagegen_core::db::open_db;
use pagegen_core::{
    default_log_level, init_logging, resolve_head_meta, ActionNonce, Capability, DeletionService,
    Document, DocumentRepository, GenerateRequest, GenerationService, MetaKeySeoSource,
    NoSeoSource, Preferences, Principal, PublishStatus, ReconcileService,
    SqliteDocumentRepository, SqliteSettingsStore, UpdateRequest, ACTION_DELETE_BY_SOURCE,
};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "pagegen", version, about = "Generate pages from CSV rows and a template")]
struct Cli {
    /// SQLite database file.
    #[arg(long, env = "PAGEGEN_DB", default_value = "pagegen.db", global = true)]
    db: PathBuf,

    /// Defaults to `debug` in debug builds and `info` otherwise.
    #[arg(long, env = "PAGEGEN_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files. Logging is off when unset.
    #[arg(long, env = "PAGEGEN_LOG_DIR", global = true)]
    log_dir: Option<String>,

    /// Comma separated capabilities granted to this invocation.
    #[arg(long, env = "PAGEGEN_CAPABILITIES", default_value = "", global = true)]
    grant: String,

    /// Secret used to issue and verify anti-forgery tokens.
    #[arg(long, env = "PAGEGEN_NONCE_SECRET", hide_env_values = true, global = true)]
    nonce_secret: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Store an HTML file as a template document.
    ImportTemplate {
        #[arg(long)]
        title: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Create one page per CSV row.
    Generate {
        /// Template id; defaults to the last template used.
        #[arg(long)]
        template: Option<Uuid>,
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = "publish")]
        status: PublishStatus,
        #[arg(long)]
        parent: Option<Uuid>,
        /// Source label; defaults to the CSV file name.
        #[arg(long)]
        label: Option<String>,
    },
    /// Re-render previously generated pages whose title matches a row.
    Update {
        #[arg(long)]
        template: Option<Uuid>,
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        parent: Option<Uuid>,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        skip_unchanged: bool,
    },
    /// Permanently delete every generated page.
    DeleteAll,
    /// Print the anti-forgery token for an action.
    IssueNonce {
        #[arg(long, default_value = ACTION_DELETE_BY_SOURCE)]
        action: String,
    },
    /// Permanently delete pages generated from one source label.
    DeleteBySource {
        #[arg(long)]
        filename: String,
        #[arg(long)]
        nonce: String,
    },
    /// List stored source labels.
    ListSources,
    /// Print the head tags for a page.
    HeadMeta {
        #[arg(long)]
        id: Uuid,
        /// Metadata key of an external SEO title, checked before the stored one.
        #[arg(long)]
        seo_title_key: Option<String>,
        #[arg(long)]
        seo_description_key: Option<String>,
    },
    /// Show stored preferences.
    Prefs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli
            .log_level
            .clone()
            .unwrap_or_else(|| default_log_level().to_string());
        init_logging(&level, log_dir)?;
    }
    let conn = open_db(&cli.db).map_err(|err| err.to_string())?;
    info!(
        "event=cli_start module=cli status=ok command={}",
        command_name(&cli.command)
    );

    match cli.command {
        Command::ImportTemplate { title, file } => {
            authorize(&cli.grant, Capability::EditPages)?;
            import_template(&conn, &title, &file)
        }
        Command::Generate {
            template,
            csv,
            status,
            parent,
            label,
        } => {
            authorize(&cli.grant, Capability::EditPages)?;
            let template_id = resolve_template(&conn, template)?;
            let repo = open_repo(&conn)?;
            let request = GenerateRequest {
                template_id,
                source_filename: label.unwrap_or_else(|| file_label(&csv)),
                csv_path: csv,
                status,
                parent_id: parent,
            };
            let report = GenerationService::new(&repo)
                .generate(&request)
                .map_err(|err| err.to_string())?;
            report
                .preferences
                .save(&open_settings(&conn)?)
                .map_err(|err| err.to_string())?;
            println!("{}", report.summary());
            Ok(())
        }
        Command::Update {
            template,
            csv,
            parent,
            label,
            skip_unchanged,
        } => {
            authorize(&cli.grant, Capability::EditPages)?;
            let template_id = resolve_template(&conn, template)?;
            let repo = open_repo(&conn)?;
            let request = UpdateRequest {
                template_id,
                source_filename: label.unwrap_or_else(|| file_label(&csv)),
                csv_path: csv,
                parent_id: parent,
                skip_unchanged,
            };
            let report = ReconcileService::new(&repo)
                .update(&request)
                .map_err(|err| err.to_string())?;
            println!("{}", report.summary());
            Ok(())
        }
        Command::DeleteAll => {
            let principal = parse_grant(&cli.grant)?;
            let repo = open_repo(&conn)?;
            let report = DeletionService::new(&repo)
                .delete_all(&principal)
                .map_err(|err| err.to_string())?;
            println!("{}", report.summary());
            Ok(())
        }
        Command::IssueNonce { action } => {
            let nonce = action_nonce(cli.nonce_secret.as_deref())?;
            println!("{}", nonce.issue(&action));
            Ok(())
        }
        Command::DeleteBySource {
            filename,
            nonce: token,
        } => {
            let verifier = action_nonce(cli.nonce_secret.as_deref())?;
            let repo = open_repo(&conn)?;
            let report = DeletionService::new(&repo)
                .delete_by_source(&verifier, &token, &filename)
                .map_err(|err| err.to_string())?;
            println!("{}", report.summary());
            Ok(())
        }
        Command::ListSources => {
            let repo = open_repo(&conn)?;
            let labels = DeletionService::new(&repo)
                .list_source_filenames()
                .map_err(|err| err.to_string())?;
            if labels.is_empty() {
                println!("No generated pages.");
            }
            for label in labels {
                println!("{label}");
            }
            Ok(())
        }
        Command::HeadMeta {
            id,
            seo_title_key,
            seo_description_key,
        } => {
            let repo = open_repo(&conn)?;
            let head = if seo_title_key.is_some() || seo_description_key.is_some() {
                let external = MetaKeySeoSource::new(
                    &repo,
                    seo_title_key.unwrap_or_default(),
                    seo_description_key.unwrap_or_default(),
                );
                resolve_head_meta(&repo, &external, id)
            } else {
                resolve_head_meta(&repo, &NoSeoSource, id)
            }
            .map_err(|err| err.to_string())?;
            print!("{}", head.render());
            Ok(())
        }
        Command::Prefs => {
            let preferences =
                Preferences::load(&open_settings(&conn)?).map_err(|err| err.to_string())?;
            match preferences.last_template_id {
                Some(id) => println!("last_template={id}"),
                None => println!("last_template=<unset>"),
            }
            Ok(())
        }
    }
}

fn import_template(conn: &Connection, title: &str, file: &Path) -> Result<(), String> {
    let content = std::fs::read_to_string(file)
        .map_err(|err| format!("cannot read template `{}`: {err}", file.display()))?;
    let repo = open_repo(conn)?;
    let id = repo
        .create_document(&Document::new(title, content))
        .map_err(|err| err.to_string())?;
    println!("Template imported: {id}");
    Ok(())
}

fn resolve_template(conn: &Connection, explicit: Option<Uuid>) -> Result<Uuid, String> {
    if let Some(id) = explicit {
        return Ok(id);
    }
    Preferences::load(&open_settings(conn)?)
        .map_err(|err| err.to_string())?
        .last_template_id
        .ok_or_else(|| "no --template given and no template used before".to_string())
}

fn open_repo(conn: &Connection) -> Result<SqliteDocumentRepository<'_>, String> {
    SqliteDocumentRepository::try_new(conn).map_err(|err| err.to_string())
}

fn open_settings(conn: &Connection) -> Result<SqliteSettingsStore<'_>, String> {
    SqliteSettingsStore::try_new(conn).map_err(|err| err.to_string())
}

fn parse_grant(grant: &str) -> Result<Principal, String> {
    Principal::from_list(grant).map_err(|err| format!("invalid --grant: {err}"))
}

/// Parses the granted capabilities and fails unless `capability` is among them.
fn authorize(grant: &str, capability: Capability) -> Result<Principal, String> {
    let principal = parse_grant(grant)?;
    principal
        .require(capability)
        .map_err(|err| err.to_string())?;
    Ok(principal)
}

fn action_nonce(secret: Option<&str>) -> Result<ActionNonce, String> {
    match secret {
        Some(secret) if !secret.is_empty() => Ok(ActionNonce::new(secret)),
        _ => Err("--nonce-secret (or PAGEGEN_NONCE_SECRET) is required".to_string()),
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::ImportTemplate { .. } => "import-template",
        Command::Generate { .. } => "generate",
        Command::Update { .. } => "update",
        Command::DeleteAll => "delete-all",
        Command::IssueNonce { .. } => "issue-nonce",
        Command::DeleteBySource { .. } => "delete-by-source",
        Command::ListSources => "list-sources",
        Command::HeadMeta { .. } => "head-meta",
        Command::Prefs => "prefs",
    }
}
