use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use pagecheck_browser::session::find_chrome;
use pagecheck_browser::{RunOptions, run_with_chromium};
use pagecheck_core::config::Config;
use pagecheck_core::report::{RunReport, write_reports};
use pagecheck_core::scenario::{Scenario, ScenarioSet};

#[derive(Parser)]
#[command(
    name = "pagecheck",
    about = "Visual verification of a locally running web app in headless Chrome",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one or more scenarios
    Run {
        /// Scenario names (see `pagecheck list`)
        scenarios: Vec<String>,

        /// Run every known scenario
        #[arg(long, conflicts_with = "scenarios")]
        all: bool,

        /// Override the target origin (default: http://localhost:3000)
        #[arg(long)]
        base_url: Option<String>,

        /// Directory screenshot paths are resolved against
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Show the browser window
        #[arg(long)]
        headed: bool,

        /// Write a JSON run report to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// List known scenarios
    List,

    /// Check the browser executable and the target app
    Doctor {
        /// Override the target origin
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Validate the configuration file
    Validate,
}

fn init_logging(config: &Config, verbose: bool) {
    let level = if verbose {
        "debug".to_string()
    } else {
        config
            .logging
            .as_ref()
            .and_then(|l| l.level.clone())
            .unwrap_or_else(|| "info".into())
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let json = config.logging.as_ref().is_some_and(|l| l.json);
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn scenario_set(config: &Config) -> anyhow::Result<ScenarioSet> {
    let mut set = ScenarioSet::new();
    set.extend(config.scenarios.iter().cloned())?;
    Ok(set)
}

/// Pick the scenarios to run, rebased onto `base_url`.
fn select_scenarios(
    set: &ScenarioSet,
    names: &[String],
    all: bool,
    base_url: Option<&str>,
) -> anyhow::Result<Vec<Scenario>> {
    let chosen: Vec<Scenario> = if all {
        set.list().to_vec()
    } else if names.is_empty() {
        anyhow::bail!(
            "No scenario given. Known scenarios: {}",
            set.names().join(", ")
        );
    } else {
        names
            .iter()
            .map(|name| {
                set.get(name).cloned().ok_or_else(|| {
                    anyhow::anyhow!(
                        "Unknown scenario '{name}'. Known scenarios: {}",
                        set.names().join(", ")
                    )
                })
            })
            .collect::<anyhow::Result<_>>()?
    };

    match base_url {
        Some(base) => chosen
            .into_iter()
            .map(|s| s.with_base_url(base).map_err(Into::into))
            .collect(),
        None => Ok(chosen),
    }
}

/// Run every scenario in turn. A scenario whose browser fails to launch is
/// recorded as a failed report and the remaining scenarios still run.
async fn run_all<F, Fut>(selected: &[Scenario], mut run: F) -> Vec<RunReport>
where
    F: FnMut(Scenario) -> Fut,
    Fut: Future<Output = pagecheck_core::error::Result<RunReport>>,
{
    let mut reports = Vec::with_capacity(selected.len());
    for scenario in selected {
        let report = match run(scenario.clone()).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(scenario = %scenario.name, error = %e, "Scenario aborted");
                RunReport::aborted(&scenario.name, &scenario.url, e)
            }
        };
        println!("{}", report.summary());
        if let Some(err) = &report.error {
            println!("  {err}");
        }
        reports.push(report);
    }
    reports
}

async fn doctor(config: &Config, base_url: &str) -> bool {
    let mut ok = true;

    match find_chrome(&config.browser()) {
        Some(path) => println!("[ok]   Browser: {}", path.display()),
        None => {
            ok = false;
            println!("[fail] Browser: no Chrome/Chromium found (set browser.chrome_path)");
        }
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build();
    match client {
        Ok(client) => match client.get(base_url).send().await {
            Ok(resp) => println!("[ok]   Target: {base_url} answered {}", resp.status()),
            Err(e) => {
                ok = false;
                println!("[fail] Target: {base_url} unreachable ({e})");
            }
        },
        Err(e) => {
            ok = false;
            println!("[fail] HTTP client: {e}");
        }
    }

    let (warnings, errors) = config.validate();
    for w in &warnings {
        println!("[warn] {w}");
    }
    for e in &errors {
        ok = false;
        println!("[fail] {e}");
    }

    ok
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config
    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(Config::config_path);

    let config = Config::load(&config_path)?;

    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Run {
            scenarios,
            all,
            base_url,
            out_dir,
            headed,
            report,
        } => {
            let set = scenario_set(&config)?;
            let base_url = base_url.or_else(|| config.target.as_ref().map(|t| t.base_url.clone()));
            let selected = select_scenarios(&set, &scenarios, all, base_url.as_deref())?;

            let mut browser = config.browser();
            if headed {
                browser.headless = false;
            }
            let options = RunOptions {
                output_dir: out_dir.unwrap_or_else(|| config.output_dir()),
                expect_timeout: config.expect_timeout(),
            };

            let reports = run_all(&selected, |scenario| {
                let browser = browser.clone();
                let options = options.clone();
                async move { run_with_chromium(&browser, &scenario, &options).await }
            })
            .await;

            if let Some(path) = report {
                write_reports(&path, &reports)?;
                tracing::info!(path = %path.display(), "Run report written");
            }

            let failed = reports.iter().filter(|r| !r.passed()).count();
            if failed > 0 {
                anyhow::bail!("{failed} of {} scenario(s) failed", reports.len());
            }
        }
        Commands::List => {
            let set = scenario_set(&config)?;
            for s in set.list() {
                println!("{:<20} {:<40} {}", s.name, s.url, s.description);
            }
        }
        Commands::Doctor { base_url } => {
            tracing::info!("Running diagnostics");
            let base_url = base_url.unwrap_or_else(|| config.base_url());
            println!("pagecheck v{}", env!("CARGO_PKG_VERSION"));
            println!("Config: {}", config_path.display());
            if !doctor(&config, &base_url).await {
                anyhow::bail!("Diagnostics found problems");
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let json = serde_json::to_string_pretty(&config)?;
                println!("{json}");
            }
            ConfigAction::Validate => {
                let (warnings, errors) = config.validate();
                for w in &warnings {
                    tracing::warn!("{w}");
                }
                if !errors.is_empty() {
                    anyhow::bail!("Invalid config:\n  {}", errors.join("\n  "));
                }
                println!("Config OK: {}", config_path.display());
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "pagecheck",
            "run",
            "verify-changes",
            "--base-url",
            "http://127.0.0.1:5173",
            "--headed",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                scenarios,
                base_url,
                headed,
                all,
                ..
            } => {
                assert_eq!(scenarios, vec!["verify-changes"]);
                assert_eq!(base_url.as_deref(), Some("http://127.0.0.1:5173"));
                assert!(headed);
                assert!(!all);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_cli_all_conflicts_with_names() {
        assert!(Cli::try_parse_from(["pagecheck", "run", "--all", "verify-changes"]).is_err());
    }

    #[test]
    fn test_cli_parses_config_validate() {
        let cli = Cli::try_parse_from(["pagecheck", "-c", "/tmp/pc.json", "config", "validate"])
            .unwrap();
        assert_eq!(cli.config.as_deref(), Some("/tmp/pc.json"));
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Validate
            }
        ));
    }

    #[tokio::test]
    async fn test_run_all_continues_after_launch_failure() {
        let selected = Scenario::builtins();
        let mut calls = 0;
        let reports = run_all(&selected, |scenario| {
            calls += 1;
            let first = calls == 1;
            async move {
                if first {
                    Err(pagecheck_core::error::PagecheckError::Launch(
                        "chrome not found".into(),
                    ))
                } else {
                    Ok(RunReport::new(&scenario.name, &scenario.url))
                }
            }
        })
        .await;

        assert_eq!(calls, 2);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].scenario, "verify-changes");
        assert!(!reports[0].passed());
        assert!(reports[0].steps.is_empty());
        assert!(reports[0].error.as_deref().unwrap().contains("chrome not found"));
        assert_eq!(reports[1].scenario, "changelog-light");
        assert!(reports[1].passed());
    }

    #[tokio::test]
    async fn test_run_all_reports_can_be_written_after_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("reports/run.json");
        let reports = run_all(&Scenario::builtins(), |scenario| async move {
            Err::<RunReport, _>(pagecheck_core::error::PagecheckError::Launch(format!(
                "no browser for {}",
                scenario.name
            )))
        })
        .await;
        write_reports(&path, &reports).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);
        assert!(parsed[1]["error"].as_str().unwrap().contains("changelog-light"));
    }

    #[test]
    fn test_select_requires_a_scenario() {
        let set = ScenarioSet::new();
        let err = select_scenarios(&set, &[], false, None).unwrap_err();
        assert!(err.to_string().contains("verify-changes"));
    }

    #[test]
    fn test_select_unknown_scenario() {
        let set = ScenarioSet::new();
        let err = select_scenarios(&set, &["nope".into()], false, None).unwrap_err();
        assert!(err.to_string().contains("Unknown scenario 'nope'"));
    }

    #[test]
    fn test_select_all_rebased() {
        let set = ScenarioSet::new();
        let chosen = select_scenarios(&set, &[], true, Some("http://127.0.0.1:8080")).unwrap();
        let urls: Vec<&str> = chosen.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["http://127.0.0.1:8080", "http://127.0.0.1:8080/changelog"]);
    }
}
