use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use mdag_crypto::HashAlgorithm;
use mdag_types::Digest;

#[derive(Parser)]
#[command(
    name = "mdag",
    about = "Content-addressed Merkle DAGs of files and directories",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Object store directory
    #[arg(long, global = true, default_value = ".mdag/objects")]
    pub store: PathBuf,

    /// TOML file with [dag] and [store] sections
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Add a file or directory and print its root digest
    Add(AddArgs),
    /// Write the content of a file to stdout
    Cat(PathArgs),
    /// List a directory
    Ls(PathArgs),
    /// Show kind, size and digest of an entry
    Stat(PathArgs),
    /// Check every object reachable from a digest
    Verify(VerifyArgs),
}

#[derive(Args)]
pub struct AddArgs {
    pub path: PathBuf,
    #[arg(long)]
    pub chunk_size: Option<usize>,
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,
    #[arg(long)]
    pub hash: Option<HashAlgorithm>,
    /// Follow symbolic links instead of skipping them
    #[arg(short = 'L', long)]
    pub follow_links: bool,
}

#[derive(Args)]
pub struct PathArgs {
    pub digest: Digest,
    /// Slash-separated path below the digest
    #[arg(default_value = "")]
    pub path: String,
}

#[derive(Args)]
pub struct VerifyArgs {
    pub digest: Digest,
}
