use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use testmedic::cli::{Cli, Commands, OutputFormat};
use testmedic::core::CancelToken;
use testmedic::{report, AnalysisOptions, Analyzer, AnalyzerConfig};

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            path,
            format,
            output,
            fix,
            validate,
            test_timeout_secs,
            config,
            backup_dir,
        } => {
            let mut analyzer_config = match config {
                Some(path) => AnalyzerConfig::load(&path)?,
                None => AnalyzerConfig::default(),
            };
            if backup_dir.is_some() {
                analyzer_config.fixes.backup_dir = backup_dir;
            }

            let options = AnalysisOptions {
                apply_fixes: fix,
                validate,
                test_timeout: test_timeout_secs.map(Duration::from_secs),
            };
            let analyzer = Analyzer::new(analyzer_config, CancelToken::new());
            let report = analyzer.run(&path, &options)?;

            let rendered = match format {
                OutputFormat::Terminal => report::render_terminal(&report),
                OutputFormat::Json => report::render_json(&report)?,
            };
            match output {
                Some(path) => fs::write(&path, rendered)
                    .with_context(|| format!("writing report to {}", path.display()))?,
                None => print!("{rendered}"),
            }

            if report.fixes_failed > 0 {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Init { force } => init_config(force),
    }
}

fn init_config(force: bool) -> Result<()> {
    let path = PathBuf::from("testmedic.toml");
    if path.exists() && !force {
        bail!("testmedic.toml already exists (use --force to overwrite)");
    }
    let content = toml::to_string_pretty(&AnalyzerConfig::default())
        .context("serializing default configuration")?;
    fs::write(&path, content).context("writing testmedic.toml")?;
    println!("wrote {}", path.display());
    Ok(())
}
