use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use log::info;

use bead_qc::PipelineConfig;
use bead_qc::data::{loader, writer};
use bead_qc::drift::{sweep, write_reports};

const USAGE: &str = "usage: bead-qc <process|report> [--config FILE] [--dir ROOT]";

enum Command {
    Process,
    Report,
}

struct Args {
    command: Command,
    config: Option<PathBuf>,
    root: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    let command = match args.next().as_deref() {
        Some("process") => Command::Process,
        Some("report") => Command::Report,
        _ => bail!(USAGE),
    };
    let mut parsed = Args {
        command,
        config: None,
        root: None,
    };
    while let Some(flag) = args.next() {
        let value = args.next().with_context(|| format!("{flag} needs a value"))?;
        match flag.as_str() {
            "-c" | "--config" => parsed.config = Some(PathBuf::from(value)),
            "-d" | "--dir" => parsed.root = Some(PathBuf::from(value)),
            _ => bail!("unknown option {flag}\n{USAGE}"),
        }
    }
    Ok(parsed)
}

fn main() -> Result<()> {
    env_logger::init();

    let args = parse_args()?;
    let mut config = PipelineConfig::load(args.config.as_deref())?;
    if let Some(root) = args.root {
        config.root_dir = root;
    }

    match args.command {
        Command::Process => {
            let output = bead_qc::build_dataset(&config);
            writer::write_artifacts(&output, &config)?;
            println!(
                "Finished data processing: {} records, {} dataless, {} unprocessed",
                output.dataset.len(),
                output.dataless.len(),
                output.unprocessed.len()
            );
        }
        Command::Report => {
            let dataset = loader::load_file(&config.records_csv())?;
            info!("loaded {} records", dataset.len());
            let reports = sweep(&dataset, &config);
            write_reports(&reports, &config.drift_report())?;
            let flagged = reports.iter().filter(|r| r.warning).count();
            println!(
                "Wrote {} drift reports ({flagged} flagged) to {}",
                reports.len(),
                config.drift_report().display()
            );
        }
    }
    Ok(())
}
