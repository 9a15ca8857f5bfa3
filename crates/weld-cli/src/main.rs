mod config;
#[cfg(feature = "incremental")]
mod resume;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use weld_dag::Plan;
use weld_exec::{ExecOptions, Executor, Verifier};
use weld_model::Document;
use weld_plugin::PluginContext;

use config::CliConfig;

#[derive(Parser)]
#[command(name = "weld", version, about = "Declarative configuration convergence engine")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Converge a document: evaluate every step and apply whatever drifted.
    Apply {
        document: PathBuf,

        /// Directory relative paths in the document resolve against. Defaults
        /// to the document's own parent directory.
        #[arg(long)]
        workdir: Option<PathBuf>,

        /// Override or add a template variable, `key=value`. Repeatable.
        #[arg(long = "var", value_parser = parse_key_val)]
        vars: Vec<(String, String)>,

        /// Evaluate every step without applying anything.
        #[arg(long)]
        dry_run: bool,

        /// Keep running unrelated steps after a failure instead of cutting
        /// the run short at the next level boundary.
        #[arg(long)]
        continue_on_error: bool,

        /// Override the document's worker-pool size for this run.
        #[arg(long)]
        parallel: Option<u32>,

        /// Skip steps whose declared `dest` already matches the checksum
        /// recorded from a previous run. Requires the `incremental` feature.
        #[arg(long)]
        resume: bool,
    },

    /// Walk a document read-only and report how far it is from converged.
    Verify {
        document: PathBuf,

        #[arg(long)]
        workdir: Option<PathBuf>,

        #[arg(long = "var", value_parser = parse_key_val)]
        vars: Vec<(String, String)>,
    },

    /// Parse a document and print it back out, without touching anything.
    Show { document: PathBuf },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) => Ok((k.to_string(), v.to_string())),
        None => Err(format!("expected `key=value`, got `{s}`")),
    }
}

fn load_document(path: &PathBuf) -> Result<Document> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading document {}", path.display()))?;
    if path.extension().and_then(|e| e.to_str()) == Some("json") {
        Document::from_json(&text).with_context(|| format!("parsing {}", path.display()))
    } else {
        Document::from_yaml(&text).with_context(|| format!("parsing {}", path.display()))
    }
}

fn resolve_workdir(document: &PathBuf, workdir: Option<PathBuf>) -> PathBuf {
    workdir.unwrap_or_else(|| {
        document
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Merges vars with precedence config file < CLI `--var` flags.
fn build_vars(config: &CliConfig, pairs: Vec<(String, String)>) -> BTreeMap<String, String> {
    let mut vars = config.vars.clone();
    vars.extend(pairs);
    vars
}

#[cfg(feature = "incremental")]
fn resume_filter(doc: Document, workdir: &Path, enabled: bool) -> Result<(Document, Option<weld_dag::ArtifactStore>)> {
    if !enabled {
        return Ok((doc, None));
    }
    let store = resume::load(workdir)?;
    let skip = resume::skippable(&doc, workdir, &store);
    if !skip.is_empty() {
        eprintln!("resume: skipping {} step(s) with unchanged output", skip.len());
    }
    Ok((resume::disable(doc, &skip), Some(store)))
}

#[cfg(not(feature = "incremental"))]
fn resume_filter(doc: Document, _workdir: &Path, enabled: bool) -> Result<(Document, Option<()>)> {
    if enabled {
        anyhow::bail!("--resume requires weld-cli to be built with the `incremental` feature");
    }
    Ok((doc, None))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let cli = Cli::parse();
    let cli_config = config::load().context("loading ~/.config/weld/config.toml")?;

    match cli.cmd {
        Cmd::Show { document } => {
            let doc = load_document(&document)?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
            Ok(())
        }

        Cmd::Verify { document, workdir, vars } => {
            let doc = load_document(&document)?;
            let registry = weld_plugins::registry();
            weld_validate::validate(&doc, &registry)
                .map_err(|errs| anyhow::anyhow!(format_errors(&errs)))?;

            let plan = Plan::build(&doc).context("building execution plan")?;
            let ctx = PluginContext::new(resolve_workdir(&document, workdir), true)
                .with_vars(build_vars(&cli_config, vars));

            let outcome = Verifier::new(&registry)
                .verify(&doc, &plan, &ctx, &CancellationToken::new(), Duration::from_secs(30))
                .context("verifying document")?;

            println!("{}", serde_json::to_string_pretty(&outcome.summary)?);

            if let Some(err) = &outcome.error {
                eprintln!("verification aborted: {err}");
                std::process::exit(1);
            }

            let postrun_ok = report_postrun(&doc);
            if outcome.summary.is_converged() && postrun_ok {
                Ok(())
            } else {
                std::process::exit(1);
            }
        }

        Cmd::Apply { document, workdir, vars, dry_run, continue_on_error, parallel, resume } => {
            let doc = load_document(&document)?;
            let registry = Arc::new(weld_plugins::registry());
            weld_validate::validate(&doc, &registry)
                .map_err(|errs| anyhow::anyhow!(format_errors(&errs)))?;

            let run_dry_run = dry_run || doc.settings.dry_run;
            let run_workdir = resolve_workdir(&document, workdir);

            let (doc, artifact_store) = resume_filter(doc, &run_workdir, resume && !run_dry_run)?;

            let plan = Plan::build(&doc).context("building execution plan")?;
            let ctx = PluginContext::new(run_workdir.clone(), run_dry_run)
                .with_vars(build_vars(&cli_config, vars));

            let opts = ExecOptions {
                parallel: parallel.or(cli_config.parallel).unwrap_or(doc.settings.parallel),
                continue_on_error: continue_on_error || doc.settings.continue_on_error,
                dry_run: run_dry_run,
            };

            let executor = Executor::new(registry);
            let report = executor
                .apply(&doc, &plan, ctx, opts, CancellationToken::new())
                .await
                .context("applying document")?;

            println!("{}", serde_json::to_string_pretty(&report)?);

            #[cfg(feature = "incremental")]
            if let Some(mut store) = artifact_store {
                resume::record_results(&doc, &run_workdir, &report, &mut store);
                resume::save(&run_workdir, &store)?;
            }
            #[cfg(not(feature = "incremental"))]
            let _ = artifact_store;

            if !run_dry_run {
                let manifest_path = run_workdir.join("run.json");
                std::fs::write(&manifest_path, serde_json::to_vec_pretty(&report)?)
                    .with_context(|| format!("writing {}", manifest_path.display()))?;
                eprintln!("wrote {}", manifest_path.display());
            }

            let postrun_ok = if run_dry_run { true } else { report_postrun(&doc) };
            if report.is_success() && postrun_ok {
                Ok(())
            } else {
                std::process::exit(1);
            }
        }
    }
}

/// Runs a document's post-run validations (if any) and prints each result.
/// Returns whether every one of them passed.
fn report_postrun(doc: &Document) -> bool {
    let Some(validations) = &doc.validations else {
        return true;
    };
    if validations.is_empty() {
        return true;
    }

    let results = weld_validate::run_postrun(validations);
    for r in &results {
        let mark = if r.passed { "ok" } else { "FAIL" };
        eprintln!("[{mark}] {}: {}", r.description, r.message);
    }
    weld_validate::all_passed(&results)
}

fn format_errors(errors: &[weld_validate::ValidationError]) -> String {
    let mut out = String::from("document failed validation:\n");
    for e in errors {
        out.push_str(&format!("  - {e}\n"));
    }
    out
}
