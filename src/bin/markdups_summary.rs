//! MarkDups QC Summary Tool
//!
//! Multi-sample duplication metrics summary from Picard MarkDuplicates or
//! biobambam2 bamsormadup logs

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use env_logger::Env;
use markdups_qc::config::{DataFormat, ModuleConfig};
use markdups_qc::naming::{ExtensionCleaner, IgnorePatterns};
use markdups_qc::output::{DataSources, DirDataWriter};
use markdups_qc::parser::{parse_reports, Collaborators};
use markdups_qc::reporting::DuplicationReporter;
use markdups_qc::sources::find_log_files;
use std::path::PathBuf;

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let matches = Command::new("markdups-summary")
        .version("0.1.0")
        .about("Multi-sample duplication metrics summary")
        .author("Megan Johnson")
        .arg(
            Arg::new("input_dir")
                .short('i')
                .long("input-dir")
                .value_name("DIRECTORY")
                .help("Directory searched recursively for duplication metrics logs")
                .required(true),
        )
        .arg(
            Arg::new("output_dir")
                .short('o')
                .long("output-dir")
                .value_name("DIRECTORY")
                .help("Directory for the data file, sources listing and report")
                .default_value("markdups_qc_data"),
        )
        .arg(
            Arg::new("tool")
                .short('t')
                .long("tool")
                .value_name("TOOL")
                .help("Log flavour: picard or biobambam2")
                .default_value("picard"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("JSON")
                .help("JSON configuration overriding the tool defaults"),
        )
        .arg(
            Arg::new("ignore")
                .long("ignore")
                .value_name("GLOB")
                .help("Sample name pattern to exclude (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("data_format")
                .long("data-format")
                .value_name("FORMAT")
                .help("Data file format: tsv or json"),
        )
        .get_matches();

    // Parse arguments
    let input_dir = PathBuf::from(
        matches
            .get_one::<String>("input_dir")
            .context("missing --input-dir")?,
    );
    let output_dir = PathBuf::from(
        matches
            .get_one::<String>("output_dir")
            .context("missing --output-dir")?,
    );
    let tool = matches
        .get_one::<String>("tool")
        .context("missing --tool")?;

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => ModuleConfig::from_json_file(path)?,
        None => ModuleConfig::for_tool(tool)
            .with_context(|| format!("Unknown tool '{}': expected picard or biobambam2", tool))?,
    };
    if let Some(patterns) = matches.get_many::<String>("ignore") {
        config.ignore_samples.extend(patterns.cloned());
    }
    if let Some(format) = matches.get_one::<String>("data_format") {
        config.data_format = match format.to_lowercase().as_str() {
            "tsv" => DataFormat::Tsv,
            "json" => DataFormat::Json,
            other => anyhow::bail!("Unknown data format '{}': expected tsv or json", other),
        };
    }

    println!("📊 MarkDups QC Summary Tool");
    println!("Input directory: {}", input_dir.display());
    println!("Output directory: {}", output_dir.display());
    println!("Section: {}", config.section_name);

    // Validate input directory exists
    if !input_dir.exists() || !input_dir.is_dir() {
        anyhow::bail!("Input directory does not exist: {}", input_dir.display());
    }

    let cleaner = ExtensionCleaner::from_config(&config);
    let filter = IgnorePatterns::new(&config.ignore_samples)?;
    let mut registry = DataSources::new(&config.log_key);
    let mut writer = DirDataWriter::new(&output_dir, config.data_format);

    println!("🔍 Searching for {} logs...", config.log_key);
    let sources = find_log_files(&input_dir, &config, &cleaner)?;
    println!("   - Candidate logs: {}", sources.len());

    println!("📈 Parsing duplication metrics...");
    let report = parse_reports(
        sources,
        &config,
        Collaborators {
            cleaner: &cleaner,
            registry: &mut registry,
            filter: &filter,
            writer: &mut writer,
        },
    )?;

    if report.is_empty() {
        println!("⚠️  No duplication metrics found");
        return Ok(());
    }

    registry.retain_samples(&report.samples);
    registry.write_tsv(output_dir.join("multiqc_sources.txt"))?;

    let report_path = output_dir.join(format!("{}.json", config.section_anchor));
    DuplicationReporter::from_config(&config).export_json(&report, &report_path)?;

    println!("✅ Duplication summary complete!");
    println!("📊 Summary Statistics:");
    println!("  Samples: {}", report.sample_count);
    for (s_name, stats) in &report.general_stats {
        for value in stats.values() {
            println!(
                "  {}: {}",
                s_name,
                report.general_stats_header.format_value(*value)
            );
        }
    }
    for path in writer.written() {
        println!("💾 Data saved to: {}", path.display());
    }
    println!("💾 Report saved to: {}", report_path.display());

    Ok(())
}
