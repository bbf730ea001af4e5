use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use bugtrail::{Bug, BugtrailConfig, LamportClock, Operation, Person, Status};
use bugtrail_git::{GitRepo, GixRepo};
use clap::{Parser, Subcommand};

mod telemetry;

/// Bug threads stored as mergeable histories in a git repository
///
/// Bugs live under refs/bugs/<id>. Bugs fetched from a remote into
/// refs/remote/<remote>/bugs/<id> are folded in with 'bugtrail merge'.
///
/// Commands that take a <PREFIX> accept any unique prefix of a bug id.
///
/// LOGGING:
///
///   BUGTRAIL_LOG=debug bugtrail ls
///   BUGTRAIL_LOG_FORMAT=json bugtrail merge
#[derive(Parser)]
#[command(name = "bugtrail")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Path of the git repository
    #[arg(long, global = true, default_value = ".", env = "BUGTRAIL_REPO")]
    repo: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a new bug
    New {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        message: String,
    },

    /// Comment on a bug
    Comment {
        prefix: String,
        #[arg(long, short)]
        message: String,
    },

    /// Close a bug
    Close { prefix: String },

    /// Reopen a closed bug
    Reopen { prefix: String },

    /// Add or remove labels
    Label {
        prefix: String,
        #[arg(long = "add")]
        add: Vec<String>,
        #[arg(long = "remove")]
        remove: Vec<String>,
    },

    /// List local bugs
    Ls,

    /// Check that a bug's history is valid
    Check { prefix: String },

    /// Merge the bugs fetched from a remote
    Merge {
        /// Remote to merge (default: [sync] remote from the config)
        remote: Option<String>,
    },
}

struct Session {
    repo: GixRepo,
    config: BugtrailConfig,
    clock: LamportClock,
}

impl Session {
    fn open(path: &Path) -> Result<Self> {
        let repo = GixRepo::open(path)
            .with_context(|| format!("failed to open git repository at {}", path.display()))?;
        let root = repo.workdir().unwrap_or_else(|| repo.git_dir()).to_path_buf();
        let config = BugtrailConfig::load(&root)?;
        Ok(Self {
            repo,
            config,
            clock: LamportClock::new(),
        })
    }

    fn author(&self) -> Result<Person> {
        self.config.author(&self.repo).context(
            "no author identity: set [user] name in .bugtrail/config.toml or git config user.name",
        )
    }

    fn find(&self, prefix: &str) -> Result<Bug> {
        Bug::find_by_prefix(&self.repo, prefix).with_context(|| format!("bug {prefix}"))
    }

    /// Append one operation to the bug matching `prefix` and commit it.
    fn edit(&self, prefix: &str, make: impl FnOnce(Person, i64) -> Operation) -> Result<()> {
        let mut bug = self.find(prefix)?;
        let op = make(self.author()?, now()?);
        if !op.is_valid() {
            bail!("invalid edit for bug {}", bug.human_id());
        }
        bug.append(op);
        bug.commit(&self.repo)
            .with_context(|| format!("failed to commit bug {}", bug.human_id()))?;
        println!("{}", bug.human_id());
        Ok(())
    }
}

fn main() -> Result<()> {
    telemetry::init();
    let cli = Cli::parse();
    let ctx = Session::open(&cli.repo)?;

    match cli.command {
        Commands::New { title, message } => {
            let mut bug = Bug::new(&ctx.clock);
            bug.append(Operation::create(ctx.author()?, now()?, &title, &message));
            if !bug.is_valid() {
                bail!("invalid bug: the title must be a single non-empty line");
            }
            bug.commit(&ctx.repo).context("failed to commit new bug")?;
            println!("{}", bug.human_id());
        }
        Commands::Comment { prefix, message } => {
            ctx.edit(&prefix, |author, t| Operation::add_comment(author, t, &message))?;
        }
        Commands::Close { prefix } => {
            ctx.edit(&prefix, |author, t| {
                Operation::set_status(author, t, Status::Closed)
            })?;
        }
        Commands::Reopen { prefix } => {
            ctx.edit(&prefix, |author, t| Operation::set_status(author, t, Status::Open))?;
        }
        Commands::Label {
            prefix,
            add,
            remove,
        } => {
            ctx.edit(&prefix, |author, t| {
                Operation::label_change(author, t, add, remove)
            })?;
        }
        Commands::Ls => list(&ctx.repo)?,
        Commands::Check { prefix } => {
            let bug = ctx.find(&prefix)?;
            if !bug.is_valid() {
                bail!("bug {} is invalid", bug.human_id());
            }
            println!("{}: ok ({} packs)", bug.human_id(), bug.packs().len());
        }
        Commands::Merge { remote } => {
            let remote = remote.unwrap_or_else(|| ctx.config.sync.remote.clone());
            let results = bugtrail::merge_all(&ctx.repo, &remote)
                .with_context(|| format!("failed to merge bugs from {remote}"))?;
            for result in results {
                println!("{result}");
            }
        }
    }

    Ok(())
}

fn list(repo: &dyn GitRepo) -> Result<()> {
    for id in bugtrail::list_local_ids(repo)? {
        let snapshot = Bug::read_local(repo, id)
            .with_context(|| format!("failed to read bug {id}"))?
            .compile();
        println!(
            "{} {:<6} {}",
            snapshot.human_id().unwrap_or_default(),
            snapshot.status.to_string(),
            snapshot.title
        );
    }
    Ok(())
}

fn now() -> Result<i64> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before the Unix epoch")?;
    i64::try_from(elapsed.as_secs()).context("system clock out of range")
}
