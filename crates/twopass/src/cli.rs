//! Command-line definition and command handlers.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use twopass_render::{FuncMap, MetaData, PageMeta, ServiceConfig, TemplateService};

/// List and render two-pass page templates
#[derive(Debug, Parser)]
#[command(name = "twopass")]
#[command(version)]
pub struct Cli {
    /// Service configuration file (YAML)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Templates root, overriding the configured one
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Log discovery and compilation steps
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print discovered template names, one per line
    List(ListArgs),
    /// Render a page to stdout
    Render(RenderArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Kind {
    Pages,
    Layouts,
    Includes,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// What to list
    #[arg(value_enum, default_value_t = Kind::Pages)]
    pub kind: Kind,

    /// Include hidden pages
    #[arg(short, long)]
    pub all: bool,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Page name, as printed by `twopass list`
    pub page: String,

    /// Layout to wrap the page with
    #[arg(short, long, conflicts_with = "raw")]
    pub layout: Option<String>,

    /// Print the page content without a layout
    #[arg(long)]
    pub raw: bool,

    /// Initial page title
    #[arg(short, long)]
    pub title: Option<String>,
}

/// Outcome of a command that completed without a fatal error.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Output was written, but the page recorded an error.
    PageError(String),
}

impl Cli {
    /// Loads the configuration file (if any) and applies flag overrides.
    pub fn service_config(&self) -> Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ServiceConfig::default(),
        };
        if let Some(root) = &self.root {
            config.lookup.root = root.clone();
        }
        Ok(config)
    }

    pub fn run(&self, out: &mut impl Write) -> Result<Outcome> {
        let config = self.service_config()?;
        let service = TemplateService::from_config(&config)
            .parse()
            .context("loading templates")?;

        match &self.command {
            Command::List(args) => list(&service, args, out),
            Command::Render(args) => render(&service, args, out),
        }
    }
}

fn list(service: &TemplateService, args: &ListArgs, out: &mut impl Write) -> Result<Outcome> {
    let names = match args.kind {
        Kind::Pages => service.page_names(!args.all),
        Kind::Layouts => service.layout_names(),
        Kind::Includes => service.include_names(),
    };
    for name in names {
        writeln!(out, "{}", name)?;
    }
    Ok(Outcome::Success)
}

fn render(service: &TemplateService, args: &RenderArgs, out: &mut impl Write) -> Result<Outcome> {
    let meta = PageMeta::new();
    if args.raw {
        meta.set_layout("");
    } else if let Some(layout) = &args.layout {
        meta.set_layout(layout.as_str());
    }
    if let Some(title) = &args.title {
        meta.set_title(title.as_str());
    }

    service
        .execute(&mut *out, &args.page, &FuncMap::new(), &meta)
        .with_context(|| format!("rendering {}", args.page))?;

    Ok(match meta.error() {
        Some(err) => Outcome::PageError(err.to_string()),
        None => Outcome::Success,
    })
}
