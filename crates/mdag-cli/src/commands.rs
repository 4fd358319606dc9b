use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context as _};
use colored::Colorize;
use mdag_crypto::HashAlgorithm;
use mdag_dag::{DagBuilder, DagConfig, DagError, Entry, Resolver};
use mdag_fs::{Node, WalkOptions};
use mdag_store::FsKvStore;
use serde_json::json;

use crate::cli::{AddArgs, Cli, Command, OutputFormat, PathArgs, VerifyArgs};
use crate::config::{FileConfig, StoreFormat};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        command,
        store,
        config,
        format,
        ..
    } = cli;
    let config = FileConfig::load(config.as_deref())?;
    let ctx = Session {
        store: &store,
        config,
        format,
    };
    dispatch(&ctx, command, &mut std::io::stdout().lock())
}

fn dispatch(ctx: &Session<'_>, command: Command, out: &mut dyn Write) -> anyhow::Result<()> {
    match command {
        Command::Add(args) => cmd_add(ctx, args, out),
        Command::Cat(args) => cmd_cat(ctx, args, out),
        Command::Ls(args) => cmd_ls(ctx, args, out),
        Command::Stat(args) => cmd_stat(ctx, args, out),
        Command::Verify(args) => cmd_verify(ctx, args, out),
    }
}

struct Session<'a> {
    store: &'a Path,
    config: FileConfig,
    format: OutputFormat,
}

impl Session<'_> {
    fn open_store(&self) -> anyhow::Result<FsKvStore> {
        FsKvStore::open(self.store, self.config.store.clone())
            .with_context(|| format!("opening store {}", self.store.display()))
    }

    /// Read-side config: the store's recorded hash overrides `[dag]`.
    fn read_config(&self) -> anyhow::Result<DagConfig> {
        let mut dag = self.config.dag.clone();
        if let Some(format) = StoreFormat::load(self.store)? {
            dag.hash = format.hash;
        }
        Ok(dag)
    }

    fn resolver(&self) -> anyhow::Result<Resolver<FsKvStore>> {
        let dag = self.read_config()?;
        let store = FsKvStore::open_read_only(self.store, self.config.store.clone())
            .with_context(|| format!("opening store {}", self.store.display()))?;
        Ok(Resolver::new(store, &dag))
    }
}

/// Settle the hash for an add into `store`, recording it on first use.
fn bind_hash(
    store: &Path,
    requested: Option<HashAlgorithm>,
    default: HashAlgorithm,
) -> anyhow::Result<HashAlgorithm> {
    match (StoreFormat::load(store)?, requested) {
        (Some(format), Some(hash)) if format.hash != hash => bail!(
            "store {} uses {}; cannot add with --hash {hash}",
            store.display(),
            format.hash
        ),
        (Some(format), _) => Ok(format.hash),
        (None, requested) => {
            let hash = requested.unwrap_or(default);
            StoreFormat { hash }.save(store)?;
            Ok(hash)
        }
    }
}

fn cmd_add(ctx: &Session<'_>, args: AddArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let mut dag: DagConfig = ctx.config.dag.clone();
    if let Some(n) = args.chunk_size {
        dag.chunk_size = n;
    }
    if let Some(n) = args.workers {
        dag.workers = n;
    }

    let options = WalkOptions {
        follow_links: args.follow_links,
    };
    let node = Node::from_path_with(&args.path, options)
        .with_context(|| format!("opening {}", args.path.display()))?;
    let store = ctx.open_store()?;
    dag.hash = bind_hash(ctx.store, args.hash, dag.hash)?;
    let builder = DagBuilder::new(store, dag)?;
    let built = builder
        .build(&node)
        .with_context(|| format!("adding {}", args.path.display()))?;

    match ctx.format {
        OutputFormat::Text => {
            writeln!(out, "{}", built.root)?;
            eprintln!(
                "{} {} {} ({} bytes, {} files, {} directories, {} objects)",
                "✓".green().bold(),
                "added".green(),
                args.path.display().to_string().bold(),
                built.size,
                built.stats.files,
                built.stats.directories,
                built.stats.objects,
            );
        }
        OutputFormat::Json => {
            let value = json!({
                "root": built.root,
                "kind": built.kind,
                "hash": builder.config().hash,
                "size": built.size,
                "files": built.stats.files,
                "directories": built.stats.directories,
                "objects": built.stats.objects,
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?;
        }
    }
    Ok(())
}

fn cmd_cat(ctx: &Session<'_>, args: PathArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let data = ctx.resolver()?.resolve(&args.digest, &args.path)?;
    out.write_all(&data)?;
    out.flush()?;
    Ok(())
}

fn cmd_ls(ctx: &Session<'_>, args: PathArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let resolver = ctx.resolver()?;
    let entries = match resolver.entries(&args.digest, &args.path) {
        Err(DagError::NotADirectory { .. }) => vec![resolver.stat(&args.digest, &args.path)?],
        other => other?,
    };

    match ctx.format {
        OutputFormat::Text => {
            for e in &entries {
                writeln!(out, "{} {:>12} {} {}", kind_label(e), e.size, e.digest, e.name)?;
            }
        }
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&entries)?)?,
    }
    Ok(())
}

fn cmd_stat(ctx: &Session<'_>, args: PathArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let entry = ctx.resolver()?.stat(&args.digest, &args.path)?;
    match ctx.format {
        OutputFormat::Text => {
            writeln!(out, "{:>7} {}", "kind:".bold(), kind_label(&entry))?;
            writeln!(out, "{:>7} {}", "size:".bold(), entry.size)?;
            writeln!(out, "{:>7} {}", "digest:".bold(), entry.digest.to_string().yellow())?;
        }
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&entry)?)?,
    }
    Ok(())
}

fn cmd_verify(ctx: &Session<'_>, args: VerifyArgs, out: &mut dyn Write) -> anyhow::Result<()> {
    let report = ctx
        .resolver()?
        .verify(&args.digest)
        .with_context(|| format!("verifying {}", args.digest.short_hex()))?;
    match ctx.format {
        OutputFormat::Text => {
            writeln!(
                out,
                "{} {} objects ({} chunks, {} lists, {} trees), {} bytes, {} stored",
                "✓".green().bold(),
                report.objects,
                report.chunks,
                report.lists,
                report.trees,
                report.logical_bytes,
                report.stored_bytes,
            )?;
        }
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?,
    }
    Ok(())
}

fn kind_label(entry: &Entry) -> colored::ColoredString {
    let label = format!("{:<5}", entry.kind.to_string());
    if entry.kind.is_file() {
        label.normal()
    } else {
        label.blue().bold()
    }
}
