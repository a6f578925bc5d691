use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use authprobe::config::SuiteConfig;
use authprobe::driver::{build_driver, DriverKind, LaunchOptions};
use authprobe::runner::{wait_until_ready, SuiteRunner};
use authprobe::scenarios;
use authprobe::utils::binary_resolver;

#[derive(Parser)]
#[command(name = "authprobe")]
#[command(version = "0.1.0")]
#[command(about = "Browser-based login flow test suite", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the login suite against a target
    Run {
        /// Base URL of the application under test (overrides config)
        #[arg(short, long)]
        url: Option<String>,

        /// Path to a YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Run only these scenario slugs (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        scenario: Option<Vec<String>>,

        /// Driver backend (playwright, simulated)
        #[arg(short, long, default_value = "playwright")]
        driver: String,

        /// Browser for the playwright driver (chromium, firefox, webkit)
        #[arg(short, long, default_value = "chromium")]
        browser: String,

        /// Show the browser window instead of running headless
        #[arg(long, default_value = "false")]
        headed: bool,

        /// Output directory for report sinks and artifacts
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stop at the first scenario with failures
        #[arg(long, default_value = "false")]
        fail_fast: bool,
    },

    /// List the available scenarios
    Scenarios,

    /// Check that node and the playwright package are available
    Doctor,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {:#}", "✗".red().bold(), err);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Commands::Run {
            url,
            config,
            scenario,
            driver,
            browser,
            headed,
            output,
            fail_fast,
        } => {
            let mut suite_config = match config {
                Some(ref path) => SuiteConfig::load(path)?,
                None => SuiteConfig::default(),
            };
            suite_config.apply_env();
            if let Some(url) = url {
                suite_config.base_url = url;
            }
            if let Some(output) = output {
                suite_config.report_dir = output.to_string_lossy().into_owned();
            }

            let kind: DriverKind = driver.parse()?;
            let launch = LaunchOptions {
                browser: browser.parse()?,
                headless: !headed,
            };
            let selected = scenarios::by_slugs(&scenario.unwrap_or_default())?;

            println!(
                "{} Running login suite against: {}",
                "▶".green().bold(),
                suite_config.base_url.cyan()
            );
            println!("  Driver: {}", kind.as_str().cyan());
            if kind == DriverKind::Playwright {
                println!("  Browser: {}", launch.browser.as_str().cyan());
            }
            println!(
                "  Scenarios: {}",
                selected
                    .iter()
                    .map(|s| s.slug())
                    .collect::<Vec<_>>()
                    .join(", ")
                    .cyan()
            );
            println!("  Output: {}", suite_config.report_dir.cyan());

            // The simulated driver has no server to wait for.
            if kind == DriverKind::Playwright {
                wait_until_ready(&suite_config.base_url, Duration::from_secs(30)).await?;
            }

            let mut driver = build_driver(kind, &launch, &suite_config).await?;

            let suite = SuiteRunner::new(suite_config).continue_on_failure(!fail_fast);
            let interrupt = suite.interrupt_flag();
            ctrlc::set_handler(move || {
                println!(
                    "\n{} Interrupt requested, finishing the current scenario...",
                    "⏹".yellow()
                );
                interrupt.store(true, std::sync::atomic::Ordering::SeqCst);
            })?;

            let run_result = suite.run(driver.as_mut(), &selected).await;
            let close_result = driver.close().await;
            let outcome = run_result?;
            close_result?;

            if outcome.all_passed() && !outcome.interrupted {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(1))
            }
        }

        Commands::Scenarios => {
            println!("{} Available scenarios:", "▶".green().bold());
            for scenario in scenarios::all() {
                println!("  {:<14} {}", scenario.slug().cyan(), scenario.name());
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Doctor => {
            println!("{} Checking suite prerequisites...", "▶".green().bold());

            let node = binary_resolver::find_node();
            match &node {
                Ok(path) => println!("  {} node: {}", "✓".green(), path.display()),
                Err(err) => println!("  {} node: {:#}", "✗".red(), err),
            }

            let playwright_ok = match node {
                Ok(path) => match binary_resolver::check_playwright(&path) {
                    Ok(resolved) => {
                        println!("  {} playwright: {}", "✓".green(), resolved);
                        true
                    }
                    Err(err) => {
                        println!("  {} playwright: {:#}", "✗".red(), err);
                        false
                    }
                },
                Err(_) => false,
            };

            if playwright_ok {
                println!("\n{} Ready to drive a real browser", "✓".green().bold());
                Ok(ExitCode::SUCCESS)
            } else {
                println!(
                    "\n{} Browser runs unavailable; the simulated driver still works (--driver simulated)",
                    "⚠".yellow()
                );
                Ok(ExitCode::from(1))
            }
        }
    }
}
