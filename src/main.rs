//! Entry point: parse args, install the signal coordinator, init logging,
//! dispatch to an engine, and map the result to stdout/stderr + exit code.

mod cli;

use std::path::PathBuf;
use std::process;

use clap::{CommandFactory, FromArgMatches};
use serde_json::json;

use cli::{Cli, Commands};
use wt::error::{self, WtError};
use wt::{config, create, git, info, list, merge, remove, shell_init, signal};

fn main() {
    let matches = cli::build_command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    init_logging();

    let coordinator = match signal::install() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: failed to install signal handler: {e}");
            process::exit(1);
        }
    };
    let cancelled = coordinator.cancelled();

    // A relative `-C`/`--cwd` resolves against the process's own CWD.
    let cwd = match resolve_cwd(cli.cwd.as_deref()) {
        Ok(cwd) => cwd,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    let result = run(&cwd, cli.config.as_deref(), cli.command, &cancelled);

    match result {
        Ok(()) => {}
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(error::exit_code(&e));
        }
    }
}

fn resolve_cwd(explicit: Option<&std::path::Path>) -> std::io::Result<PathBuf> {
    let base = std::env::current_dir()?;
    Ok(match explicit {
        Some(path) => base.join(path),
        None => base,
    })
}

fn init_logging() {
    let level = std::env::var("WT_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(&level);
    builder.init();
}

fn run(
    cwd: &std::path::Path,
    config_path: Option<&std::path::Path>,
    command: Commands,
    cancelled: &std::sync::Arc<std::sync::atomic::AtomicBool>,
) -> anyhow::Result<()> {
    // `init` generates a static shell snippet and needs neither a git
    // repository nor a config file, so it's handled before either is
    // resolved.
    if let Commands::Init { shell } = command {
        println!("{}", shell_init::generate(shell));
        return Ok(());
    }

    let main_repo_root = git::main_repo_root(cwd)?;
    let config = config::load(config_path, &main_repo_root)?;

    match command {
        Commands::Init { .. } => unreachable!("returned above"),
        Commands::Create { name, from_branch, with_changes, json, switch } => {
            let outcome = create::run(
                cwd,
                &config,
                create::CreateRequest { custom_name: name, from_branch, with_changes },
                cancelled,
            )?;
            print_create_outcome(&outcome, json, switch);
            Ok(())
        }
        Commands::List { json } => {
            let records = list::run(cwd, &config)?;
            print_list(&records, json);
            Ok(())
        }
        Commands::Info { identifier, field, json } => {
            let record = info::find(cwd, &config, &identifier)?;
            print_info(&record, field.as_deref(), json)?;
            Ok(())
        }
        Commands::Remove { identifier, force, with_branch } => {
            let outcome = remove::run(
                cwd,
                &config,
                remove::RemoveRequest { name: identifier, force, with_branch },
                cancelled,
            )?;
            print_remove_outcome(&outcome)
        }
        Commands::Merge { into, keep, dry_run } => {
            let outcome = merge::run(cwd, &config, merge::MergeRequest { into, keep, dry_run }, cancelled)?;
            print_merge_outcome(&outcome)
        }
    }
}

fn print_create_outcome(outcome: &create::CreateOutcome, json: bool, switch: bool) {
    if switch {
        println!("{}", outcome.path.display());
        return;
    }
    if json {
        println!(
            "{}",
            json!({
                "id": outcome.metadata.id,
                "name": outcome.metadata.name,
                "agent_id": outcome.metadata.agent_id,
                "base_branch": outcome.metadata.base_branch,
                "path": outcome.path,
                "created": outcome.metadata.created,
            })
        );
        return;
    }
    println!("id:          {}", outcome.metadata.id);
    println!("name:        {}", outcome.metadata.name);
    println!("agent_id:    {}", outcome.metadata.agent_id);
    println!("from:        {}", outcome.metadata.base_branch);
    println!("path:        {}", outcome.path.display());
}

fn print_list(records: &[wt::metadata::WorktreeRecord], json: bool) {
    if json {
        let rows: Vec<_> = records
            .iter()
            .map(|r| {
                json!({
                    "id": r.metadata.id,
                    "name": r.metadata.name,
                    "agent_id": r.metadata.agent_id,
                    "base_branch": r.metadata.base_branch,
                    "path": r.path,
                })
            })
            .collect();
        println!("{}", serde_json::Value::Array(rows));
        return;
    }
    for record in records {
        println!(
            "{:<4} {:<20} {:<16} {}",
            record.metadata.id,
            record.metadata.name,
            record.metadata.agent_id,
            record.path.display()
        );
    }
}

fn print_info(record: &wt::metadata::WorktreeRecord, field: Option<&str>, json: bool) -> anyhow::Result<()> {
    if let Some(field_name) = field {
        let value = info::field(record, field_name)
            .ok_or_else(|| WtError::Other(format!("unknown field '{field_name}'")))?;
        println!("{value}");
        return Ok(());
    }
    if json {
        println!(
            "{}",
            json!({
                "id": record.metadata.id,
                "name": record.metadata.name,
                "agent_id": record.metadata.agent_id,
                "base_branch": record.metadata.base_branch,
                "path": record.path,
                "created": record.metadata.created,
            })
        );
        return Ok(());
    }
    println!("id:          {}", record.metadata.id);
    println!("name:        {}", record.metadata.name);
    println!("agent_id:    {}", record.metadata.agent_id);
    println!("base_branch: {}", record.metadata.base_branch);
    println!("path:        {}", record.path.display());
    Ok(())
}

fn print_remove_outcome(outcome: &remove::RemoveOutcome) -> anyhow::Result<()> {
    println!("Removed worktree: {}", outcome.path.display());
    let mut warnings = Vec::new();
    if let Some(e) = &outcome.branch_delete_error {
        warnings.push(format!("branch delete failed: {e}"));
    }
    if let Some(e) = &outcome.prune_error {
        warnings.push(format!("worktree prune failed: {e}"));
    }
    if warnings.is_empty() {
        Ok(())
    } else {
        for warning in &warnings {
            eprintln!("warning: {warning}");
        }
        Err(WtError::Other(warnings.join("; ")).into())
    }
}

fn print_merge_outcome(outcome: &merge::MergeOutcome) -> anyhow::Result<()> {
    match outcome {
        merge::MergeOutcome::DryRun(plan) => {
            println!("feature:      {}", plan.feature);
            println!("target:       {}", plan.target);
            println!("commits:      {}", plan.commits_ahead);
            match &plan.target_checked_out_at {
                Some(path) => println!("target at:    {} (checked out)", path.display()),
                None => println!("target at:    not checked out elsewhere"),
            }
            println!("will cleanup: {}", plan.will_cleanup);
            Ok(())
        }
        merge::MergeOutcome::Merged(merged) => {
            println!("Merged {} into {}", merged.feature, merged.target);
            if merged.kept {
                println!("Worktree kept: {}", merged.worktree_path.display());
            }
            if let Some(warning) = &merged.cleanup_warning {
                eprintln!("warning: {warning}");
            }
            Ok(())
        }
    }
}
