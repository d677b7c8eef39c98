use std::{
    env,
    ffi::OsString,
    io::{self, Write},
    path::PathBuf,
};

use crate::{
    config::{ConfigOverrides, ProctreeConfig},
    prelude::*,
    process::{self, LookupPolicy, ProcessSource, ProcessStore},
    tree::{INIT_PID, ProcessTree, RenderOptions, SortOrder, render},
};
use clap::{
    Parser,
    builder::{Styles, styling},
    error::ErrorKind,
};

pub const ACCENT_U8_COLOR_CODE: u8 = 108;

fn create_styles() -> Styles {
    styling::Styles::styled()
        .header(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .usage(styling::AnsiColor::Green.on_default() | styling::Effects::BOLD)
        .literal(styling::Ansi256Color(ACCENT_U8_COLOR_CODE).on_default() | styling::Effects::BOLD)
        .placeholder(styling::AnsiColor::Cyan.on_default())
}

#[derive(Parser, Debug, Default)]
#[command(
    name = "proctree",
    version,
    about = "Display the running processes as a tree rooted at init",
    styles = create_styles()
)]
pub struct Cli {
    /// Show the pid of every process after its name
    #[arg(short = 'p', long, overrides_with = "no_show_pids")]
    pub show_pids: bool,

    /// Hide pids even when the config file enables them
    #[arg(long, overrides_with = "show_pids")]
    pub no_show_pids: bool,

    /// Sort the children of every process by pid instead of discovery order
    #[arg(short = 'n', long, overrides_with = "no_numeric_sort")]
    pub numeric_sort: bool,

    /// Keep discovery order even when the config file enables numeric sort
    #[arg(long, overrides_with = "numeric_sort")]
    pub no_numeric_sort: bool,

    /// Mount point of the proc filesystem to read processes from
    #[arg(long, env = "PROCTREE_PROC_ROOT", hide = true)]
    pub proc_root: Option<PathBuf>,

    /// Abort when a process exits while the snapshot is being taken
    #[arg(
        long,
        env = "PROCTREE_STRICT",
        hide = true,
        overrides_with = "no_strict"
    )]
    pub strict: bool,

    #[arg(long, hide = true, overrides_with = "strict")]
    pub no_strict: bool,
}

/// `Some(true)` for `--flag`, `Some(false)` for `--no-flag`, `None` when neither is given
fn flag_override(enabled: bool, disabled: bool) -> Option<bool> {
    match (enabled, disabled) {
        (true, _) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    }
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            show_pids: flag_override(self.show_pids, self.no_show_pids),
            numeric_sort: flag_override(self.numeric_sort, self.no_numeric_sort),
            proc_root: self.proc_root.clone(),
            strict: flag_override(self.strict, self.no_strict),
        }
    }
}

pub fn usage_line(program: &str) -> String {
    format!("usage: {program} [-p | --show-pids] [-n | --numeric-sort] [-V | --version]")
}

/// Outcome of parsing the command line
#[derive(Debug)]
pub enum ParsedArgs {
    Run(Cli),
    /// Help or version was requested, clap prints it and exits successfully
    Informational(clap::Error),
    /// Unrecognized flag or bad value
    Usage { program: String, error: clap::Error },
}

pub fn parse_args<I, T>(args: I) -> ParsedArgs
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let program = args
        .first()
        .map(|arg| arg.to_string_lossy().into_owned())
        .unwrap_or_else(|| "proctree".to_owned());

    match Cli::try_parse_from(&args) {
        Ok(cli) => ParsedArgs::Run(cli),
        Err(error)
            if matches!(
                error.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
            ) =>
        {
            ParsedArgs::Informational(error)
        }
        Err(error) => ParsedArgs::Usage { program, error },
    }
}

pub fn run() -> Result<()> {
    let cli = match parse_args(env::args_os()) {
        ParsedArgs::Run(cli) => cli,
        ParsedArgs::Informational(error) => error.exit(),
        ParsedArgs::Usage { program, error } => {
            debug!("Invalid arguments: {error}");
            println!("{}", usage_line(&program));
            std::process::exit(1);
        }
    };

    let config = ProctreeConfig::load()?.with_overrides(cli.overrides());
    debug!("Effective configuration: {config:?}");

    let source = process::default_source(config.proc_root())?;
    let mut stdout = io::stdout().lock();
    print_tree(source.as_ref(), &config, &mut stdout)
}

/// Snapshot `source`, build the tree and render it to `out`
pub fn print_tree<W: Write>(
    source: &dyn ProcessSource,
    config: &ProctreeConfig,
    out: &mut W,
) -> Result<()> {
    let policy = LookupPolicy::from_strict(config.snapshot.strict);
    let store = ProcessStore::snapshot(source, policy)?;

    let order = SortOrder::from_numeric_sort(config.display.numeric_sort);
    let Some(tree) = ProcessTree::build(store, order) else {
        bail!("No process with pid {INIT_PID} found, cannot build the process tree");
    };

    let options = RenderOptions {
        show_pids: config.display.show_pids,
    };
    match render(&tree, &options, out) {
        Ok(()) => Ok(()),
        // The reader went away, e.g. `proctree | head`
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        Err(e) => Err(e).context("Failed to write the process tree"),
    }
}
