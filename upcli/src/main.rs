use clap::error::ErrorKind;
use clap::Parser;
use console::style;
use libhttp_pulse::{load_endpoints, CycleReport, Monitor, MonitorConfig, ProbeResult, Tally};
use serde::Serialize;
use std::{
    collections::BTreeMap,
    io::{self, Write},
    path::PathBuf,
    time::Duration,
};
use tokio::sync::watch;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "up")]
#[command(about = "Cyclic HTTP endpoint availability monitor", long_about = None)]
struct Args {
    /// Path to the YAML file describing the endpoints to monitor
    config: Option<PathBuf>,

    /// Output one JSON object per cycle (NDJSON) instead of the text report
    #[arg(long, short = 'j')]
    ndjson: bool,

    /// Run a single cycle, report it, and exit
    #[arg(long)]
    once: bool,

    /// Seconds between cycle starts
    #[arg(long)]
    interval: Option<u64>,

    /// Print a sample endpoint config to stdout and exit
    #[arg(long)]
    print_sample_config: bool,
}

fn get_sample_config_yaml() -> String {
    r#"# Endpoint monitor configuration: a YAML list of probe targets.
#
# Only `url` is required. `name` defaults to the URL, `method` to GET,
# `headers` to none. When `body` is set and no content-type header is
# given, `Content-Type: application/json` is sent automatically.

- name: homepage
  url: https://www.example.com/

- name: checkout api
  url: https://api.example.com/v1/checkout/health

- name: order submit
  url: https://api.example.com/v1/orders
  method: POST
  headers:
    Authorization: Bearer changeme
  body: '{"smoke": true}'
"#
    .to_string()
}

fn format_status(status_code: Option<u16>) -> String {
    match status_code {
        Some(code) => code.to_string(),
        None => "N/A".to_string(),
    }
}

fn format_elapsed(elapsed_ms: Option<f64>) -> String {
    match elapsed_ms {
        Some(ms) => format!("{:.1}ms", ms),
        None => "N/A".to_string(),
    }
}

fn format_percent(tally: &Tally) -> String {
    format!("{:.1}% ({}/{})", tally.percent(), tally.up, tally.total)
}

fn styled_bool(up: bool) -> console::StyledObject<bool> {
    if up {
        style(true).green()
    } else {
        style(false).red()
    }
}

fn print_text_report(report: &CycleReport) {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");

    println!("\n[{}] Endpoint Results:", timestamp);
    for result in &report.results {
        println!(
            "  - {} ({}): status={} elapsed={} available={}",
            result.name,
            result.domain.as_deref().unwrap_or("N/A"),
            format_status(result.status_code),
            format_elapsed(result.elapsed_ms),
            styled_bool(result.available)
        );
    }
    println!("Domain Availability:");
    for (domain, up) in &report.domain_availability {
        println!("  - {}: {}", domain, styled_bool(*up));
    }

    println!("\nCumulative Endpoint Availability:");
    for (name, tally) in &report.endpoint_stats {
        println!("  - {}: {}", name, format_percent(tally));
    }

    println!("Cumulative Domain Availability:");
    for (domain, tally) in &report.domain_stats {
        println!("  - {}: {}", domain, format_percent(tally));
    }
    println!("---");
}

#[derive(Serialize)]
struct CycleRecord<'a> {
    timestamp: String,
    cycle: u64,
    results: &'a [ProbeResult],
    domain_availability: &'a BTreeMap<String, bool>,
    cumulative_endpoints: &'a BTreeMap<String, Tally>,
    cumulative_domains: &'a BTreeMap<String, Tally>,
}

fn print_ndjson_report(report: &CycleReport) {
    let record = CycleRecord {
        timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        cycle: report.cycle,
        results: &report.results,
        domain_availability: &report.domain_availability,
        cumulative_endpoints: &report.endpoint_stats,
        cumulative_domains: &report.domain_stats,
    };

    if let Ok(json) = serde_json::to_string(&record) {
        println!("{}", json);
        let _ = io::stdout().flush();
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return Ok(());
        }
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    if args.print_sample_config {
        println!("{}", get_sample_config_yaml());
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let config_path = match args.config {
        Some(path) => path,
        None => {
            eprintln!("Error: missing path to the endpoint config file (see --help)");
            std::process::exit(1);
        }
    };

    let endpoints = match load_endpoints(&config_path) {
        Ok(endpoints) => endpoints,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        endpoints = endpoints.len(),
        config = %config_path.display(),
        "configuration loaded"
    );

    let mut config = MonitorConfig::default();
    if let Some(secs) = args.interval {
        config.interval = Duration::from_secs(secs);
    }

    let ndjson = args.ndjson;
    let render = move |report: &CycleReport| {
        if ndjson {
            print_ndjson_report(report);
        } else {
            print_text_report(report);
        }
    };
    let once = args.once;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let mut monitor = Monitor::with_config(endpoints, config);

        if once {
            let report = monitor.run_cycle().await;
            render(&report);
            return Ok(());
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            let _ = shutdown_tx.send(true);
        });

        monitor.run(shutdown_rx, render).await;
        if ndjson {
            // Keep stdout a pure JSON stream.
            eprintln!("\nMonitoring stopped by user.");
        } else {
            println!("\nMonitoring stopped by user.");
        }

        Ok(())
    })
}
