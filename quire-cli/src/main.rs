//! Quire CLI - paginated layout inspection tool
//!
//! Reads a JSON description of a styled box tree, lays it out on pages and
//! prints the positioned boxes of every page.
//!
//! Usage:
//!   quire <file.json>                 Print the page trees
//!   quire <file.json> --json          Print the pages as JSON
//!   quire - < doc.json                Read the description from stdin
//!   quire <file.json> -vv             Log layout decisions

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};
use owo_colors::OwoColorize;
use quire_layout::layout::{EdgeSizes, FragmentSummary};
use quire_layout::{
    BoxDescription, LayoutOptions, MonospaceShaper, PageSetup, PageSummary, build_box_tree,
    layout_document,
};

/// Quire - lay a styled box tree out on pages
#[derive(Parser, Debug)]
#[command(name = "quire")]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"EXAMPLES:
    # Paginate on A4 pages
    quire document.json

    # Small pages without margins, as JSON
    quire document.json --page-width 400 --page-height 300 --margin 0 --json

    # Show page breaks and backtracking
    quire document.json -vv
"#)]
struct Cli {
    /// JSON box tree description, `-` for stdin
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Page width in CSS pixels (default: A4)
    #[arg(long)]
    page_width: Option<f32>,

    /// Page height in CSS pixels (default: A4)
    #[arg(long)]
    page_height: Option<f32>,

    /// Margin on all four sides of the page in CSS pixels (default: 75)
    #[arg(long)]
    margin: Option<f32>,

    /// Stop after this many pages
    #[arg(long, default_value = "500")]
    max_pages: usize,

    /// Print the pages as JSON instead of a tree
    #[arg(long)]
    json: bool,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn options(&self) -> LayoutOptions {
        let defaults = PageSetup::default();
        let margin = self.margin.map_or(defaults.margin, |margin| EdgeSizes {
            top: margin,
            right: margin,
            bottom: margin,
            left: margin,
        });
        LayoutOptions {
            page: PageSetup {
                width: self.page_width.unwrap_or(defaults.width),
                height: self.page_height.unwrap_or(defaults.height),
                margin,
                ..defaults
            },
            max_pages: Some(self.max_pages),
        }
    }

    fn read_input(&self) -> Result<String> {
        if self.input.as_os_str() == "-" {
            let mut source = String::new();
            let _ = io::stdin()
                .read_to_string(&mut source)
                .context("reading the description from stdin")?;
            Ok(source)
        } else {
            fs::read_to_string(&self.input)
                .with_context(|| format!("reading '{}'", self.input.display()))
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let source = cli.read_input()?;
    let description: BoxDescription = serde_json::from_str(&source)
        .with_context(|| format!("decoding the box tree in '{}'", cli.input.display()))?;
    let root = build_box_tree(&description).context("building the box tree")?;
    let pages = layout_document(root, &MonospaceShaper, cli.options())
        .context("checking the page setup")?;

    let summaries: Vec<PageSummary> = pages.map(|page| page.summary()).collect();
    info!("{} pages", summaries.len());

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summaries).context("encoding the pages")?
        );
    } else {
        for page in &summaries {
            print_page(page);
        }
    }
    Ok(())
}

fn print_page(page: &PageSummary) {
    let name = page.name
        .as_deref()
        .map(|name| format!(" :{name}"))
        .unwrap_or_default();
    println!(
        "{} {:?}{} {}x{}",
        format!("=== Page {} ===", page.number).bold(),
        page.side,
        name.cyan(),
        page.width,
        page.height
    );
    if page.blank {
        println!("  {}", "(blank)".dimmed());
    }
    if let Some(content) = &page.content {
        print_fragment(content, 1);
    }
    if !page.footnotes.is_empty() {
        println!("  {}", "footnotes:".yellow());
        for footnote in &page.footnotes {
            print_fragment(footnote, 2);
        }
    }
    println!();
}

/// Recursively print a fragment with its border box
fn print_fragment(fragment: &FragmentSummary, depth: usize) {
    let indent = "  ".repeat(depth);
    let rect = &fragment.border_box;
    let geometry = format!(
        "x={:.1} y={:.1} w={:.1} h={:.1}",
        rect.x, rect.y, rect.width, rect.height
    );
    match &fragment.text {
        Some(text) => {
            let preview: String = text.chars().take(30).collect();
            let suffix = if text.chars().count() > 30 { "..." } else { "" };
            println!(
                "{indent}{} {}",
                format!("\"{}{suffix}\"", preview.replace('\n', "\\n")).green(),
                geometry.dimmed()
            );
        }
        None => println!("{indent}[{}] {}", fragment.label.bold(), geometry.dimmed()),
    }
    for child in &fragment.children {
        print_fragment(child, depth + 1);
    }
}
