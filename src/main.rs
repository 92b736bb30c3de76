use clap::Parser;
use colored::Colorize;
use miette::{IntoDiagnostic, Result};
use serde_json::json;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::info;

use dexkeep::{
    collect_layout_classes_and_attributes, get_manifest_class_info, get_native_classes, Config,
    ONCLICK_ATTRIBUTE,
};

/// dexkeep - inspect the reachability roots an application package pins
///
/// Runs the manifest, layout and native-library collectors against an
/// unpacked package directory and prints everything the seeding phase
/// would consume from it.
#[derive(Parser, Debug)]
#[command(name = "dexkeep")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the unpacked application package directory
    #[arg(default_value = ".")]
    apk_dir: PathBuf,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "terminal")]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - only output results
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug, Default)]
enum OutputFormat {
    #[default]
    Terminal,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_default_locations(&cli.apk_dir)?,
    };

    run_inspection(&cli, &config)
}

fn run_inspection(cli: &Cli, config: &Config) -> Result<()> {
    let apk_dir = &cli.apk_dir;
    info!("Inspecting package at {}", apk_dir.display());

    let manifest_info = if config.compute_xml_reachability {
        Some(get_manifest_class_info(&apk_dir.join("AndroidManifest.xml")).into_diagnostic()?)
    } else {
        None
    };

    let attrs: HashSet<String> = [ONCLICK_ATTRIBUTE.to_string()].into_iter().collect();
    let (layout_classes, attribute_values) = if config.compute_xml_reachability {
        collect_layout_classes_and_attributes(apk_dir, &attrs).into_diagnostic()?
    } else {
        Default::default()
    };

    let native_classes = if config.analyze_native_lib_reachability {
        get_native_classes(apk_dir)
    } else {
        Vec::new()
    };

    match cli.format {
        OutputFormat::Json => {
            let mut layout_classes: Vec<_> = layout_classes.into_iter().collect();
            layout_classes.sort();
            let output = json!({
                "manifest": manifest_info,
                "layout_classes": layout_classes,
                "attribute_values": attribute_values,
                "native_classes": native_classes,
            });
            println!("{}", serde_json::to_string_pretty(&output).into_diagnostic()?);
        }
        OutputFormat::Terminal => {
            if let Some(info) = &manifest_info {
                println!("{}", "Manifest".bold());
                for class in &info.application_classes {
                    println!("  application  {}", class.cyan());
                }
                for class in &info.instrumentation_classes {
                    println!("  instrumentation  {}", class.cyan());
                }
                for tag in &info.component_tags {
                    let mut notes = Vec::new();
                    if tag.is_exported {
                        notes.push("exported");
                    }
                    if tag.has_intent_filters {
                        notes.push("intent-filters");
                    }
                    println!(
                        "  {:?}  {}  {}",
                        tag.tag,
                        tag.classname.cyan(),
                        notes.join(" ").dimmed()
                    );
                    for authority in &tag.authority_classes {
                        println!("    authority  {}", authority.cyan());
                    }
                }
            }

            if !layout_classes.is_empty() {
                println!("{}", "Layout classes".bold());
                let mut sorted: Vec<_> = layout_classes.iter().collect();
                sorted.sort();
                for class in sorted {
                    println!("  {}", class.cyan());
                }
            }

            for (attr, values) in &attribute_values {
                println!("{}", format!("Attribute {attr}").bold());
                for value in values {
                    println!("  {}", value);
                }
            }

            if !native_classes.is_empty() {
                println!("{}", "Native library classnames".bold());
                for class in &native_classes {
                    println!("  {}", class.cyan());
                }
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();
}
