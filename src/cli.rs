//! CLI argument parsing for plan matching and evaluation.
//!
//! The CLI stays thin: each command reads files, hands text to the library,
//! and writes what comes back.
use clap::{Parser, Subcommand};
use plan_eval::config::EmbedderChoice;
use plan_eval::matcher::MatcherKind;
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "peval",
    version,
    about = "Align LM-produced plans to a PDDL domain and validate them by simulation",
    after_help = "Commands:\n  match --domain <d> --problem <p> --plan <f>      Print the closest executable plan\n  validate --domain <d> --problem <p> --plan <f>   Simulate a plan and print {valid, successful, safe}\n  evaluate ... --out-dir <dir>                     Match, validate, and write both artifacts\n  summarize <dir>                                  Write results_summary.json per results directory\n  config                                           Show the active configuration\n\nExamples:\n  peval match --domain domain.pddl --problem p01.pddl --plan p01.json\n  peval validate --domain domain.pddl --problem p01.pddl --plan p01.pddl.closest\n  peval evaluate --domain domain.pddl --problem p01.pddl --plan raw/p01.pddl --out-dir evaluation\n  peval summarize runs/",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Config file (defaults to $PEVAL_CONFIG, then the user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the embedding backend chosen by the config
    #[arg(long, global = true, value_enum, value_name = "BACKEND")]
    pub embedder: Option<EmbedderChoice>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Match(MatchArgs),
    Validate(ValidateArgs),
    Evaluate(EvaluateArgs),
    Summarize(SummarizeArgs),
    Config(ConfigArgs),
}

/// The domain/problem pair every plan is checked against.
#[derive(Parser, Debug)]
pub struct TaskArgs {
    /// PDDL domain file
    #[arg(long, value_name = "PATH")]
    pub domain: PathBuf,

    /// Ground-truth PDDL problem file
    #[arg(long, value_name = "PATH")]
    pub problem: PathBuf,

    /// Plan file: action lines, or a `.json` document with a `steps` list
    #[arg(long, value_name = "PATH")]
    pub plan: PathBuf,
}

#[derive(Parser, Debug)]
#[command(about = "Align a raw plan with the domain and print the closest executable plan")]
pub struct MatchArgs {
    #[command(flatten)]
    pub task: TaskArgs,

    /// Matching strategy (defaults to the config's)
    #[arg(long, value_enum, value_name = "KIND")]
    pub matcher: Option<MatcherKind>,

    /// Write the aligned plan here instead of stdout
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(about = "Simulate an action-line plan and print its result record")]
pub struct ValidateArgs {
    #[command(flatten)]
    pub task: TaskArgs,

    /// Extra constraint to check over the trajectory, e.g. "(always (clear a))"
    #[arg(long, value_name = "FORMULA")]
    pub constraint: Vec<String>,
}

#[derive(Parser, Debug)]
#[command(about = "Match then validate, writing <name>.pddl.closest and <name>.results.json")]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub task: TaskArgs,

    /// Matching strategy (defaults to the config's)
    #[arg(long, value_enum, value_name = "KIND")]
    pub matcher: Option<MatcherKind>,

    /// Directory receiving the artifacts
    #[arg(long, value_name = "DIR")]
    pub out_dir: PathBuf,

    /// Artifact base name (defaults to the plan file name without extension)
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,
}

#[derive(Parser, Debug)]
#[command(about = "Tally *.results.json records into results_summary.json per directory")]
pub struct SummarizeArgs {
    /// Directory tree to walk
    #[arg(value_name = "DIR")]
    pub root: PathBuf,
}

#[derive(Parser, Debug)]
#[command(about = "Print the active configuration as JSON")]
pub struct ConfigArgs {
    /// Print the built-in defaults instead
    #[arg(long)]
    pub defaults: bool,
}
