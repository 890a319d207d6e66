use anyhow::{anyhow, Context, Result};
use clap::Parser;
use plan_eval::config::{
    apply_embedder_choice, config_stub, resolve_config, validate_config, ConfigSource, EvalConfig,
};
use plan_eval::evaluator::{EvaluationResult, PlanEvaluator};
use plan_eval::matcher::{build_matcher, MatcherKind};
use plan_eval::planner_result::PlannerResult;
use plan_eval::similarity::build_scorer;
use plan_eval::summary::find_and_summarize;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing_subscriber::EnvFilter;

mod cli;
use cli::{
    Command, ConfigArgs, EvaluateArgs, MatchArgs, RootArgs, SummarizeArgs, TaskArgs, ValidateArgs,
};

const LOG_ENV: &str = "PEVAL_LOG";

fn main() -> Result<()> {
    init_tracing();
    let args = RootArgs::parse();

    match &args.command {
        Command::Match(cmd) => cmd_match(&args, cmd),
        Command::Validate(cmd) => cmd_validate(cmd),
        Command::Evaluate(cmd) => cmd_evaluate(&args, cmd),
        Command::Summarize(cmd) => cmd_summarize(cmd),
        Command::Config(cmd) => cmd_config(&args, cmd),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn active_config(args: &RootArgs) -> Result<(EvalConfig, ConfigSource)> {
    let (mut config, source) = resolve_config(args.config.as_deref())?;
    if let Some(choice) = args.embedder {
        apply_embedder_choice(&mut config, choice)?;
    }
    validate_config(&config)?;
    tracing::debug!(?source, matcher = %config.matcher, "config resolved");
    Ok((config, source))
}

struct TaskText {
    domain: String,
    problem: String,
}

fn read_text(path: &Path, label: &str) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read {label} {}", path.display()))
}

fn read_task(task: &TaskArgs) -> Result<TaskText> {
    Ok(TaskText {
        domain: read_text(&task.domain, "domain")?,
        problem: read_text(&task.problem, "problem")?,
    })
}

fn closest_plan(
    config: &EvalConfig,
    kind: MatcherKind,
    text: &TaskText,
    plan: &Path,
) -> Result<String> {
    let scorer = build_scorer(config)?;
    let matcher = build_matcher(kind, &text.domain, &text.problem, scorer)?;
    let result = PlannerResult::load(plan)?;
    let outcome = matcher
        .match_plan(&result)
        .with_context(|| format!("match plan {}", plan.display()))?;
    if let Some(index) = outcome.truncated_at {
        tracing::warn!(
            step = index + 1,
            kept = outcome.steps.len(),
            "plan truncated: no applicable action for this step"
        );
    }
    Ok(outcome.plan_text())
}

fn simulate(text: &TaskText, plan_text: &str) -> Result<PlanEvaluator> {
    let mut evaluator = PlanEvaluator::new(&text.domain, &text.problem, plan_text)
        .context("parse domain/problem")?;
    evaluator.try_simulation();
    if let Some(failure) = evaluator.failure() {
        tracing::info!(%failure, "plan did not execute");
    }
    Ok(evaluator)
}

fn cmd_match(args: &RootArgs, cmd: &MatchArgs) -> Result<()> {
    let (config, _) = active_config(args)?;
    let text = read_task(&cmd.task)?;
    let kind = cmd.matcher.unwrap_or(config.matcher);
    let plan = closest_plan(&config, kind, &text, &cmd.task.plan)?;
    match &cmd.out {
        Some(out) => {
            fs::write(out, plan.as_bytes()).with_context(|| format!("write {}", out.display()))?
        }
        None => println!("{plan}"),
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ConstraintCheck {
    constraint: String,
    violated: bool,
}

#[derive(Debug, Serialize)]
struct ValidationReport {
    #[serde(flatten)]
    result: EvaluationResult,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    constraints: Vec<ConstraintCheck>,
}

fn cmd_validate(cmd: &ValidateArgs) -> Result<()> {
    let text = read_task(&cmd.task)?;
    let plan = read_text(&cmd.task.plan, "plan")?;
    let evaluator = simulate(&text, &plan)?;
    let result = evaluator.result()?;

    let mut constraints = Vec::new();
    if result.valid {
        for constraint in &cmd.constraint {
            constraints.push(ConstraintCheck {
                violated: evaluator.is_constraint_violated(constraint)?,
                constraint: constraint.clone(),
            });
        }
    } else if !cmd.constraint.is_empty() {
        tracing::warn!(
            count = cmd.constraint.len(),
            "skipping constraint checks for an invalid plan"
        );
    }

    let report = ValidationReport {
        result,
        constraints,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("serialize validation report")?
    );
    Ok(())
}

fn artifact_name(cmd: &EvaluateArgs) -> Result<String> {
    if let Some(name) = &cmd.name {
        return Ok(name.clone());
    }
    cmd.task
        .plan
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("cannot derive a name from {}", cmd.task.plan.display()))
}

fn cmd_evaluate(args: &RootArgs, cmd: &EvaluateArgs) -> Result<()> {
    let (config, _) = active_config(args)?;
    let text = read_task(&cmd.task)?;
    let kind = cmd.matcher.unwrap_or(config.matcher);
    let name = artifact_name(cmd)?;

    let plan = closest_plan(&config, kind, &text, &cmd.task.plan)?;
    let result = simulate(&text, &plan)?.result()?;

    fs::create_dir_all(&cmd.out_dir)
        .with_context(|| format!("create {}", cmd.out_dir.display()))?;
    let closest_path = cmd.out_dir.join(format!("{name}.pddl.closest"));
    fs::write(&closest_path, plan.as_bytes())
        .with_context(|| format!("write {}", closest_path.display()))?;
    let results_text =
        serde_json::to_string_pretty(&result).context("serialize evaluation result")?;
    let results_path = cmd.out_dir.join(format!("{name}.results.json"));
    fs::write(&results_path, results_text.as_bytes())
        .with_context(|| format!("write {}", results_path.display()))?;

    tracing::info!(
        name = %name,
        matcher = %kind,
        valid = result.valid,
        "evaluation written"
    );
    println!("{results_text}");
    Ok(())
}

fn cmd_summarize(cmd: &SummarizeArgs) -> Result<()> {
    if !cmd.root.is_dir() {
        return Err(anyhow!("{} is not a directory", cmd.root.display()));
    }
    let summaries = find_and_summarize(&cmd.root)?;
    if summaries.is_empty() {
        eprintln!("no *.results.json files under {}", cmd.root.display());
    }
    for (dir, summary) in summaries {
        println!(
            "{}: total={} valid={} successful={} safe={}",
            dir.display(),
            summary.total,
            summary.valid,
            summary.successful,
            summary.safe
        );
    }
    Ok(())
}

fn cmd_config(args: &RootArgs, cmd: &ConfigArgs) -> Result<()> {
    if cmd.defaults {
        println!("{}", config_stub());
        return Ok(());
    }
    let (config, source) = active_config(args)?;
    match source {
        ConfigSource::Flag(path) | ConfigSource::Env(path) | ConfigSource::UserDir(path) => {
            eprintln!("config: {}", path.display())
        }
        ConfigSource::Defaults => eprintln!("config: built-in defaults"),
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&config).context("serialize config")?
    );
    Ok(())
}
