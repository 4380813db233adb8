// Entry point and high-level CLI flow.
//
// Two datasets are served from one binary:
// - the trade remedy country reference (one CSV, continents resolved), and
// - the yearly duty refund port statistics (many CSV/XLSX files).
//
// With a subcommand the selected view is printed once. Without one the
// program runs an interactive menu; loaded datasets stay cached between
// menu choices and are rebuilt only when the source files change.
mod cache;
mod config;
mod discovery;
mod error;
mod filter;
mod loader;
mod output;
mod reports;
mod table;
mod types;
mod util;

use clap::{Parser, Subcommand};
use config::{ColumnLayout, NumberPolicy, PortOptions, COUNTRY_FILE_MARKER, PORT_FILE_MARKER};
use filter::{
    available_continents, available_ports, CountryFilter, PortFilter, PortSelection, UsageFilter,
};
use loader::{CountryDataset, PortDataset};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Trade statistics reports: country reference and duty refund port statistics
#[derive(Parser, Debug)]
#[command(name = "trade_report")]
#[command(version = "0.1.0")]
#[command(about = "Country reference and duty refund port statistics reports", long_about = None)]
struct Args {
    /// Directory holding the source files
    #[arg(short, long, default_value = ".")]
    data_dir: PathBuf,

    /// Country reference CSV (default: newest matching file in the data directory)
    #[arg(long)]
    country_file: Option<PathBuf>,

    /// File name token identifying the yearly port statistics files
    #[arg(long, default_value = PORT_FILE_MARKER)]
    port_marker: String,

    /// What a numeric cell that cannot be parsed becomes
    #[arg(long, value_enum, default_value_t = NumberPolicy::Missing)]
    on_bad_number: NumberPolicy,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Country reference with continent resolution
    Countries(CountryArgs),
    /// Yearly port statistics
    Ports(PortArgs),
}

#[derive(clap::Args, Debug)]
struct CountryArgs {
    /// Case-insensitive search over name, English name and code
    #[arg(short, long)]
    search: Option<String>,

    /// Only countries of this continent
    #[arg(short, long)]
    continent: Option<String>,

    /// Usage flag filter
    #[arg(short, long, value_enum, default_value_t = UsageFilter::All)]
    usage: UsageFilter,

    /// Export the filtered rows as BOM-prefixed CSV
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Rows shown in the preview table
    #[arg(long, default_value = "20")]
    rows: usize,
}

#[derive(clap::Args, Debug)]
struct PortArgs {
    /// Port names to keep (repeatable; default: all ports)
    #[arg(short, long = "port")]
    ports: Vec<String>,

    /// First year to include
    #[arg(long)]
    from_year: Option<u16>,

    /// Last year to include
    #[arg(long)]
    to_year: Option<u16>,

    /// Ports listed in the ranking
    #[arg(long, default_value = "10")]
    top: usize,

    /// Export the filtered rows as BOM-prefixed CSV
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Write a JSON summary of the load and the filtered rows
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Rows shown in the preview table
    #[arg(long, default_value = "20")]
    rows: usize,
}

/// Output settings shared by both views.
struct ViewOptions {
    rows: usize,
    top: usize,
    export: Option<PathBuf>,
    summary: Option<PathBuf>,
}

fn port_options(args: &Args) -> PortOptions {
    PortOptions {
        marker: args.port_marker.clone(),
        layout: ColumnLayout::DUTY_REFUND,
        number_policy: args.on_bad_number,
    }
}

/// Print `label` and read one trimmed line of input.
fn prompt(label: &str) -> String {
    print!("{}", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn optional(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Ask the user whether to go back to the dataset selection menu.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        match prompt("Back to Dataset Selection (Y/N): ").to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Load (or reuse) the country reference.
///
/// A missing or unreadable file is reported and yields `None`; the menu
/// keeps running.
fn load_country_data(args: &Args) -> Option<Arc<CountryDataset>> {
    let path = match &args.country_file {
        Some(p) => p.clone(),
        None => match discovery::find_country_file(&args.data_dir) {
            Some(p) => p,
            None => {
                println!(
                    "No country reference file matching '{}' in {}.\n",
                    COUNTRY_FILE_MARKER,
                    args.data_dir.display()
                );
                return None;
            }
        },
    };
    match cache::countries(&path) {
        Ok(data) => {
            println!(
                "Processing country reference... ({} rows loaded, {} skipped)",
                util::format_int(data.total_rows),
                util::format_int(data.parse_errors)
            );
            Some(data)
        }
        Err(e) => {
            eprintln!("Failed to load {}: {}\n", path.display(), e);
            None
        }
    }
}

fn render_countries(data: &CountryDataset, filter: &CountryFilter, view: &ViewOptions) {
    let filtered = filter.apply(&data.records);
    let kpis = reports::country_kpis(&data.records, filtered.len());
    println!(
        "Entries: {} | Countries: {} | Continent rows: {} | Unmapped: {} | Filtered: {}\n",
        util::format_int(kpis.total_entries),
        util::format_int(kpis.countries),
        util::format_int(kpis.continent_markers),
        util::format_int(kpis.unmapped),
        util::format_int(kpis.filtered)
    );

    println!("Countries per Continent\n");
    output::preview_table_rows(&reports::continent_distribution(&data.records), usize::MAX);

    println!("Usage Flag Share\n");
    output::preview_table_rows(&reports::usage_share(&data.records), usize::MAX);

    let rows = reports::country_rows(&filtered);
    println!("Country Reference List\n");
    output::preview_table_rows(&rows, view.rows);

    if let Some(path) = &view.export {
        let export = reports::country_export_rows(&filtered);
        match output::write_export_csv(path, &export) {
            Ok(()) => println!("(Filtered rows exported to {})\n", path.display()),
            Err(e) => eprintln!("Write error: {}", e),
        }
    }
}

/// Load (or reuse) the port statistics and report how the load went.
fn load_port_data(args: &Args) -> Option<Arc<PortDataset>> {
    let options = port_options(args);
    let data = cache::port_stats(&args.data_dir, &options);
    let report = &data.report;
    if report.files_found == 0 {
        println!(
            "No port statistics files matching '{}' in {}.\n",
            options.marker,
            args.data_dir.display()
        );
        return None;
    }

    println!(
        "Processing port statistics... ({} of {} files loaded, {} rows, {} subtotal/blank rows dropped)",
        util::format_int(report.files_loaded),
        util::format_int(report.files_found),
        util::format_int(data.records.len()),
        util::format_int(report.excluded_rows)
    );
    for skipped in &report.skipped {
        println!("Warning: skipped {} ({})", skipped.path.display(), skipped.reason);
    }
    if report.coercion_failures > 0 {
        let treated = match options.number_policy {
            NumberPolicy::Missing => "missing",
            NumberPolicy::Zero => "zero",
        };
        println!(
            "Note: {} numeric cells could not be parsed and were treated as {}.",
            util::format_int(report.coercion_failures),
            treated
        );
    }
    if !report.duplicate_years.is_empty() {
        let years: Vec<String> = report.duplicate_years.iter().map(|y| y.to_string()).collect();
        println!(
            "Note: years {} come from more than one file; their totals are counted twice.",
            years.join(", ")
        );
    }
    println!();
    Some(data)
}

fn render_ports(data: &PortDataset, filter: &PortFilter, view: &ViewOptions) {
    let selected = match filter.apply(&data.records) {
        PortSelection::NothingSelected => {
            println!("Nothing selected: none of the requested ports exist in the loaded data.\n");
            return;
        }
        PortSelection::Rows(rows) => rows,
    };

    println!("Annual Totals by Year\n");
    output::preview_table_rows(&reports::yearly_totals(&selected), usize::MAX);

    println!("Top Ports by Amount\n");
    output::preview_table_rows(&reports::port_ranking(&selected, view.top), view.top);

    let rows = reports::port_rows(&selected);
    println!("Port Records\n");
    output::preview_table_rows(&rows, view.rows);

    if let Some(path) = &view.export {
        match output::write_export_csv(path, &rows) {
            Ok(()) => println!("(Filtered rows exported to {})\n", path.display()),
            Err(e) => eprintln!("Write error: {}", e),
        }
    }
    if let Some(path) = &view.summary {
        let summary = reports::port_summary(&selected, &data.report);
        match output::write_json(path, &summary) {
            Ok(()) => println!("(Summary written to {})\n", path.display()),
            Err(e) => eprintln!("Write error: {}", e),
        }
    }
}

/// Menu option [1]: prompt for country filters and show the view.
fn interactive_countries(args: &Args) {
    let Some(data) = load_country_data(args) else {
        return;
    };
    println!("Continents: {}", available_continents(&data.records).join(", "));
    let filter = CountryFilter {
        search: optional(prompt("Search name or code (blank for all): ")),
        continent: optional(prompt("Continent (blank for all): ")),
        usage: match prompt("In use Y/N (blank for all): ").to_uppercase().as_str() {
            "Y" => UsageFilter::InUse,
            "N" => UsageFilter::NotInUse,
            _ => UsageFilter::All,
        },
    };
    let view = ViewOptions {
        rows: 20,
        top: 10,
        export: optional(prompt("Export CSV path (blank to skip): ")).map(PathBuf::from),
        summary: None,
    };
    println!();
    render_countries(&data, &filter, &view);
}

fn parse_year(s: String) -> Option<u16> {
    let s = optional(s)?;
    match s.parse::<u16>() {
        Ok(y) => Some(y),
        Err(_) => {
            println!("Ignoring invalid year '{}'.", s);
            None
        }
    }
}

/// Menu option [2]: prompt for port filters and show the view.
fn interactive_ports(args: &Args) {
    let Some(data) = load_port_data(args) else {
        return;
    };
    let ports = available_ports(&data.records);
    println!("Ports: {}", ports.join(", "));
    let selection = prompt("Ports, comma separated (blank for all): ");
    let filter = PortFilter {
        ports: optional(selection).map(|s| {
            s.split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect()
        }),
        from_year: parse_year(prompt("From year (blank for all): ")),
        to_year: parse_year(prompt("To year (blank for all): ")),
    };
    let view = ViewOptions {
        rows: 20,
        top: 10,
        export: optional(prompt("Export CSV path (blank to skip): ")).map(PathBuf::from),
        summary: optional(prompt("Summary JSON path (blank to skip): ")).map(PathBuf::from),
    };
    println!();
    render_ports(&data, &filter, &view);
}

fn run_interactive(args: &Args) {
    loop {
        println!("Select Dataset:");
        println!("[1] Trade remedy country reference");
        println!("[2] Duty refund port statistics");
        println!("[3] Reload source files");
        println!("[0] Exit\n");
        match prompt("Enter choice: ").as_str() {
            "1" => {
                println!();
                interactive_countries(args);
            }
            "2" => {
                println!();
                interactive_ports(args);
            }
            "3" => {
                cache::invalidate_all();
                println!("Cached datasets dropped; the next view reloads from disk.\n");
                continue;
            }
            "0" => {
                println!("Exiting the program.");
                break;
            }
            _ => {
                println!("Invalid choice. Please enter 0, 1, 2 or 3.\n");
                continue;
            }
        }
        if !prompt_back_to_menu() {
            println!("Exiting the program.");
            break;
        }
    }
}

fn run_countries(args: &Args, cmd: &CountryArgs) {
    let Some(data) = load_country_data(args) else {
        return;
    };
    let filter = CountryFilter {
        search: cmd.search.clone(),
        continent: cmd.continent.clone(),
        usage: cmd.usage,
    };
    let view = ViewOptions {
        rows: cmd.rows,
        top: 0,
        export: cmd.export.clone(),
        summary: None,
    };
    render_countries(&data, &filter, &view);
}

fn run_ports(args: &Args, cmd: &PortArgs) {
    let Some(data) = load_port_data(args) else {
        return;
    };
    let filter = PortFilter {
        ports: if cmd.ports.is_empty() {
            None
        } else {
            Some(cmd.ports.clone())
        },
        from_year: cmd.from_year,
        to_year: cmd.to_year,
    };
    let view = ViewOptions {
        rows: cmd.rows,
        top: cmd.top,
        export: cmd.export.clone(),
        summary: cmd.summary.clone(),
    };
    render_ports(&data, &filter, &view);
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    if !args.data_dir.is_dir() {
        println!(
            "Data directory {} does not exist; views will be empty.\n",
            args.data_dir.display()
        );
    }

    match &args.command {
        Some(Command::Countries(cmd)) => run_countries(&args, cmd),
        Some(Command::Ports(cmd)) => run_ports(&args, cmd),
        None => run_interactive(&args),
    }
}
