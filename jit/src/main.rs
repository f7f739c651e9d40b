mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jit_core::{Author, DirectoryForest, ObjectId, ObjectKind, Repository, TreeBuilder, Workspace};
use output::{CommitOutput, HashObjectOutput, InitOutput, OutputWriter, WriteTreeOutput};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Result code for any failure other than lock contention.
const EXIT_FAILURE: u8 = 1;

/// Result code when another process holds the HEAD lock.
const EXIT_LOCKED: u8 = 2;

/// jit - A minimal git-style version store
#[derive(Parser)]
#[command(name = "jit")]
#[command(about = "Snapshot a work tree into git-format loose objects", long_about = None)]
#[command(version)]
struct Cli {
    /// Repository root (defaults to JIT_ROOT env var or the current directory)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new repository
    Init {
        /// Directory to initialize (defaults to the repository root)
        path: Option<PathBuf>,
    },

    /// Snapshot the work tree and advance HEAD
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: String,
    },

    /// Snapshot the work tree without committing
    WriteTree,

    /// Compute the object id of a file
    HashObject {
        /// Store the object as well
        #[arg(short, long)]
        write: bool,

        /// Object kind to hash the content as
        #[arg(short = 't', long = "type", default_value = "blob")]
        kind: String,

        /// Accept tree and commit content without checking it
        #[arg(long)]
        literally: bool,

        /// File to hash
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = OutputWriter::new(cli.json);

    // Determine repository root: CLI arg > JIT_ROOT env var > current directory
    let root = cli
        .root
        .or_else(|| std::env::var("JIT_ROOT").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    debug!(root = %root.display(), "resolved repository root");

    let result = match cli.command {
        Commands::Init { path } => cmd_init(path.as_deref().unwrap_or(&root), &output),
        Commands::Commit { message } => cmd_commit(&root, &message, &output),
        Commands::WriteTree => cmd_write_tree(&root, &output),
        Commands::HashObject {
            write,
            kind,
            literally,
            file,
        } => cmd_hash_object(&root, &file, &kind, write, literally, &output),
    };

    if let Err(e) = result {
        let code = result_code(&e);
        output.write_error(&e, code);
        std::process::exit(i32::from(code));
    }
}

/// Install the stderr log subscriber.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn result_code(error: &anyhow::Error) -> u8 {
    let locked = error
        .chain()
        .filter_map(|cause| cause.downcast_ref::<jit_core::Error>())
        .any(jit_core::Error::is_lock_contention);

    if locked { EXIT_LOCKED } else { EXIT_FAILURE }
}

fn open_repo(root: &Path) -> Result<Repository> {
    Repository::open(root)
        .with_context(|| format!("Failed to open repository at {}", root.display()))
}

/// Read the commit author from the environment.
fn author_from_env() -> Result<Author> {
    let name = std::env::var("GIT_AUTHOR_NAME").context("GIT_AUTHOR_NAME is not set")?;
    let email = std::env::var("GIT_AUTHOR_EMAIL").context("GIT_AUTHOR_EMAIL is not set")?;

    Author::now(name, email).context("Invalid author identity")
}

/// Store the work tree's blobs and trees, returning the root tree and file count.
fn snapshot(repo: &Repository) -> Result<(ObjectId, usize)> {
    let files = Workspace::new(repo.root())
        .list_files()
        .with_context(|| format!("Failed to scan {}", repo.root().display()))?;

    let forest = DirectoryForest::from_files(repo.root(), &files)
        .context("Failed to group work tree files")?;

    let tree = TreeBuilder::new(repo)
        .build(&forest)
        .context("Failed to store work tree")?;

    Ok((tree, files.len()))
}

fn cmd_init(path: &Path, output: &OutputWriter) -> Result<()> {
    let repo = Repository::init(path)
        .with_context(|| format!("Failed to initialize repository at {}", path.display()))?;

    let data = InitOutput {
        success: true,
        result_code: 0,
        root: repo.root().display().to_string(),
        git_dir: repo.git_dir().display().to_string(),
    };

    output.write(&data, || {
        format!(
            "Initialized empty jit repository in {}\n",
            repo.git_dir().display()
        )
    })
}

fn cmd_commit(root: &Path, message: &str, output: &OutputWriter) -> Result<()> {
    if message.trim().is_empty() {
        anyhow::bail!("Aborting commit due to empty commit message");
    }

    let repo = open_repo(root)?;
    let author = author_from_env()?;

    let (tree, files) = snapshot(&repo)?;
    let commit = repo
        .head()
        .advance(&tree, &author, message)
        .context("Failed to advance HEAD")?;

    let data = CommitOutput {
        success: true,
        result_code: 0,
        tree,
        commit,
        files,
    };

    output.write(&data, || {
        let summary = message.lines().next().unwrap_or_default();
        format!(
            "[{}] {}\n tree {}\n {} file(s)\n",
            &commit.to_hex()[..7],
            summary,
            tree,
            files
        )
    })
}

fn cmd_write_tree(root: &Path, output: &OutputWriter) -> Result<()> {
    let repo = open_repo(root)?;
    let (tree, files) = snapshot(&repo)?;

    let data = WriteTreeOutput {
        success: true,
        result_code: 0,
        tree,
        files,
    };

    output.write(&data, || format!("{}\n", tree))
}

/// Parse the `-t` argument.
///
/// Tree and commit kinds require `--literally`; the file's bytes are not checked.
fn hash_kind(kind: &str, literally: bool) -> Result<ObjectKind> {
    let parsed = ObjectKind::parse(kind).with_context(|| format!("Unsupported type: {}", kind))?;
    if parsed != ObjectKind::Blob && !literally {
        anyhow::bail!(
            "Refusing to hash a file as a {} object without --literally",
            parsed
        );
    }
    Ok(parsed)
}

fn cmd_hash_object(
    root: &Path,
    file: &Path,
    kind: &str,
    write: bool,
    literally: bool,
    output: &OutputWriter,
) -> Result<()> {
    let kind = hash_kind(kind, literally)?;
    let content =
        fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let (id, outcome) = if write {
        let repo = open_repo(root)?;
        let stored = repo
            .put(kind, &content)
            .with_context(|| format!("Failed to store {}", file.display()))?;
        (stored.id, Some(stored.outcome))
    } else {
        (jit_core::hash_object(kind, &content), None)
    };

    let data = HashObjectOutput {
        success: true,
        result_code: 0,
        id,
        kind,
        path: file.display().to_string(),
        outcome,
    };

    output.write(&data, || format!("{}\n", id))
}
