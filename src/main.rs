//! OCIF SOAP mapper binary.
//!
//! Run with: `ocif-soap-mapper --config mapper.yaml render --template amendInvolvedParty.xml --payload request.json`

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ocif_soap_mapper::{
    MapperConfig, PayloadAssembler, RequestControl, ResponseNormalizer, SoapRequest,
    TemplateCache,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, info_span, Instrument, Level};
use tracing_subscriber::FmtSubscriber;

/// Maps JSON payloads to OCIF SOAP requests and SOAP responses back to JSON.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a complete SOAP request from a template and a JSON payload
    Render {
        /// Template file name, relative to the template directory
        #[arg(short, long)]
        template: String,

        /// JSON body payload
        #[arg(short, long)]
        payload: PathBuf,

        /// JSON header payload
        #[arg(long)]
        header: Option<PathBuf>,
    },

    /// Print the namespaced payload, namespaces and operation element as JSON
    Assemble {
        #[arg(short, long)]
        template: String,

        #[arg(short, long)]
        payload: PathBuf,
    },

    /// Normalize a SOAP response received with the given HTTP status
    Normalize {
        /// HTTP status code of the response
        #[arg(short, long)]
        status: u16,

        /// SOAP response document
        #[arg(short, long)]
        response: PathBuf,
    },

    /// Check that a request-control object asks for at least one section
    Validate {
        #[arg(short, long)]
        payload: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = args.log_level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    // Load configuration
    let config = if args.config.exists() {
        MapperConfig::load(&args.config)
            .await
            .with_context(|| format!("Failed to load config file {}", args.config.display()))?
    } else {
        info!("Config file not found, using defaults");
        MapperConfig::default()
    };

    info!(
        templates = %config.templates.directory.display(),
        reject_doctype = config.xml.reject_doctype,
        strip_prefixes = config.response.strip_prefixes,
        "Configuration loaded"
    );

    let correlation_id = uuid::Uuid::new_v4();
    let span = info_span!("mapper", correlation_id = %correlation_id);
    run(args.command, config).instrument(span).await
}

async fn run(command: Command, config: MapperConfig) -> Result<()> {
    match command {
        Command::Render {
            template,
            payload,
            header,
        } => {
            let mut request = SoapRequest::new(read_json(&payload).await?);
            if let Some(header) = header {
                request = request.with_header(read_json(&header).await?);
            }

            let xml = assembler(&config)
                .render_request(&template, &request)
                .await
                .context("Failed to render SOAP request")?;
            println!("{xml}");
        }

        Command::Assemble { template, payload } => {
            let payload = read_json(&payload).await?;
            let assembled = assembler(&config)
                .assemble(&template, &payload)
                .await
                .context("Failed to assemble payload")?;
            println!("{}", serde_json::to_string_pretty(&assembled)?);
        }

        Command::Normalize { status, response } => {
            let raw = tokio::fs::read_to_string(&response)
                .await
                .with_context(|| format!("Failed to read {}", response.display()))?;
            let normalizer = ResponseNormalizer::new(config.response.clone(), config.parse_options());
            let normalized = normalizer
                .normalize(&raw, status)
                .context("Failed to normalize response")?;
            println!("{}", serde_json::to_string_pretty(&normalized)?);
        }

        Command::Validate { payload } => {
            let control: RequestControl = serde_json::from_value(read_json(&payload).await?)
                .context("Invalid request-control object")?;
            match control.validate() {
                Ok(()) => {
                    info!(sections = ?control.requested_sections(), "Request control accepted");
                }
                Err(failure) => {
                    println!("{}", serde_json::to_string_pretty(&failure)?);
                    anyhow::bail!("{}", failure.body.detail);
                }
            }
        }
    }

    Ok(())
}

fn assembler(config: &MapperConfig) -> PayloadAssembler {
    let cache = TemplateCache::new(Arc::new(config.template_source()))
        .with_options(config.parse_options());
    PayloadAssembler::new(Arc::new(cache))
}

async fn read_json(path: &Path) -> Result<Value> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}
