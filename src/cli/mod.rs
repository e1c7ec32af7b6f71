/*
* Twin Dashboard Command Line Interface
* -------------------------------------
*
* twin-dashboard
* ├── serve [--port]                 start the HTTP API and pages
* ├── init [--force]                 write config/default.toml
* ├── twin <machine_id>              print a machine's twin state from the seed store
* ├── generate                       write a synthetic hourly energy CSV
* ├── forecast --input <csv>         project daily consumption
* ├── report --input <csv>           summary report, optional filters and CSV export
* └── calc
*     ├── appliance                  cost of running one appliance
*     └── bill                       monthly bill estimate for a household
*
* Global: --config <file> replaces the layered config directory with one file.
*
* Examples:
*   twin-dashboard serve --port 8080
*   twin-dashboard generate --days 60 --seed 7 --output usage.csv
*   twin-dashboard forecast --input usage.csv --days 14 --model polynomial
*   twin-dashboard calc bill --household-size 4 --home-type house --climate-zone hot
*/

use anyhow::Context;
use chrono::{NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::config::Settings;
use crate::energy::calculator::{
    appliance_cost, estimate_bill, ApplianceUsage, BillRequest, ClimateZone, HomeType, TariffRates,
};
use crate::energy::forecast::{ForecastEngine, ForecastModel, ForecastRequest};
use crate::energy::generator::{self, SampleDataGenerator};
use crate::energy::import::{export_csv, import_file};
use crate::energy::reports::{export_filtered, summary_report, ReportFilter, ReportOutcome};
use crate::twin::DigitalTwinService;

#[derive(Parser)]
#[command(name = "twin-dashboard")]
#[command(about = "CNC digital twin and energy analytics toolkit", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Generate default configuration
    Init {
        #[arg(short, long)]
        force: bool,
    },
    /// Print the twin state of one machine from the configured seed data
    Twin { machine_id: String },
    /// Write synthetic hourly energy data as CSV
    Generate {
        #[arg(short, long, default_value_t = generator::DEFAULT_DAYS)]
        days: u32,
        #[arg(short, long, default_value_t = generator::DEFAULT_SEED)]
        seed: u64,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Forecast daily consumption from an energy CSV
    Forecast {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long, default_value_t = 30)]
        days: u32,
        #[arg(short, long, value_enum, default_value_t = ForecastModel::Linear)]
        model: ForecastModel,
        #[arg(long)]
        confidence: Option<f64>,
    },
    /// Summarize an energy CSV
    Report {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long)]
        category: Vec<String>,
        #[arg(long)]
        location: Vec<String>,
        /// Write the filtered records to this CSV file
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Energy cost calculators
    Calc {
        #[command(subcommand)]
        command: CalcCommands,
    },
}

#[derive(Subcommand)]
enum CalcCommands {
    /// Cost of running a single appliance
    Appliance {
        #[arg(short, long)]
        name: String,
        #[arg(long, default_value_t = 8.0)]
        hours: f64,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
        /// Power draw in kW, defaults to the catalog value
        #[arg(long)]
        power: Option<f64>,
        #[arg(short, long, default_value_t = 30)]
        days: u32,
        #[arg(short, long)]
        rate: Option<f64>,
    },
    /// Estimate a monthly bill
    Bill {
        #[arg(long)]
        household_size: u8,
        #[arg(long, value_enum)]
        home_type: HomeType,
        #[arg(long, value_enum)]
        climate_zone: ClimateZone,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::new_from_file(path)?,
        None => Settings::new()?,
    };

    match cli.command {
        Commands::Serve { port } => {
            let server_port = port.unwrap_or(settings.server.port);
            info!(port = server_port, "Starting server");
            crate::run_server(settings, server_port).await?;
        }
        Commands::Init { force } => handle_init_command(force)?,
        Commands::Twin { machine_id } => handle_twin_command(&machine_id, settings).await?,
        Commands::Generate { days, seed, output } => handle_generate_command(days, seed, &output)?,
        Commands::Forecast {
            input,
            days,
            model,
            confidence,
        } => {
            let mut request = ForecastRequest::new(days, model);
            request.confidence_level = confidence;
            handle_forecast_command(&input, &request, &settings)?;
        }
        Commands::Report {
            input,
            start,
            end,
            category,
            location,
            export,
        } => {
            let filter = ReportFilter {
                start,
                end,
                categories: category,
                locations: location,
            };
            handle_report_command(&input, &filter, export.as_deref())?;
        }
        Commands::Calc { command } => handle_calc_command(command, &settings)?,
    }

    Ok(())
}

async fn handle_twin_command(machine_id: &str, settings: Settings) -> anyhow::Result<()> {
    if settings.store.seed_path.is_none() {
        error!("No store.seed_path configured; the twin has no data to read");
    }
    let store = crate::open_store(&settings).await?;
    let service = DigitalTwinService::new(std::sync::Arc::new(store), settings.twin);
    let state = service.twin_state(machine_id).await?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

fn handle_generate_command(days: u32, seed: u64, output: &Path) -> anyhow::Result<()> {
    let start = (Utc::now() - chrono::Duration::days(i64::from(days)))
        .date_naive()
        .and_time(NaiveTime::MIN);
    let dataset = SampleDataGenerator::new(seed, days).generate(start);
    std::fs::write(output, export_csv(dataset.records())?)
        .with_context(|| format!("writing {}", output.display()))?;

    println!(
        "{} Wrote {} records to {}",
        "✓".green(),
        dataset.len(),
        output.display()
    );
    Ok(())
}

fn handle_forecast_command(
    input: &Path,
    request: &ForecastRequest,
    settings: &Settings,
) -> anyhow::Result<()> {
    let dataset = import_file(input)?;
    let forecast = ForecastEngine::new(settings.energy.forecast_max_days)
        .forecast(dataset.records(), request)?;

    let Some(summary) = &forecast.summary else {
        println!("{}", "No timestamped records to forecast from".yellow());
        return Ok(());
    };

    println!("{}", format!("Forecast - {}", forecast.model).bold());
    for point in &forecast.points {
        println!("  {}  {:>10.2} kWh", point.date, point.predicted_consumption);
    }
    println!("Avg daily forecast: {:.2} kWh", summary.avg_daily_forecast);
    println!("Total forecast:     {:.2} kWh", summary.total_forecast);
    if let Some(change) = summary.change_pct {
        let label = format!("{:+.1}%", change);
        let colored = if change > 0.0 { label.red() } else { label.green() };
        println!("Change from historical: {}", colored);
    }
    Ok(())
}

fn handle_report_command(
    input: &Path,
    filter: &ReportFilter,
    export: Option<&Path>,
) -> anyhow::Result<()> {
    let dataset = import_file(input)?;

    match summary_report(dataset.records(), filter) {
        ReportOutcome::Empty { warning } => println!("{}", warning.yellow()),
        ReportOutcome::Ready(report) => {
            println!("{}", "Energy Consumption Summary".bold());
            println!("Total consumption:     {:.2} kWh", report.metrics.total_consumption);
            println!("Total cost:            ${:.2}", report.metrics.total_cost);
            println!("Avg daily consumption: {:.2} kWh", report.metrics.avg_daily_consumption);
            println!("Average rate:          ${:.4}/kWh", report.metrics.avg_rate);
            if let Some(peak) = report.peak_usage {
                println!(
                    "Peak hour {}:00 ({:.2} kWh), lowest hour {}:00",
                    peak.peak_hour, peak.peak_consumption, peak.lowest_hour
                );
            }
            for group in &report.category_breakdown {
                println!("  {:<12} {:>10.2} kWh", group.key, group.total_consumption);
            }
        }
    }

    if let Some(path) = export {
        std::fs::write(path, export_filtered(dataset.records(), filter)?)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("{} Exported to {}", "✓".green(), path.display());
    }
    Ok(())
}

fn handle_calc_command(command: CalcCommands, settings: &Settings) -> anyhow::Result<()> {
    match command {
        CalcCommands::Appliance {
            name,
            hours,
            quantity,
            power,
            days,
            rate,
        } => {
            let usage = ApplianceUsage {
                appliance: name,
                power_kw: power,
                hours_per_day: hours,
                quantity,
            };
            let cost = appliance_cost(
                &usage,
                days,
                rate.unwrap_or(settings.energy.default_rate_per_kwh),
            )?;
            println!("{}", cost.appliance.bold());
            println!("Daily:  {:.2} kWh  ${:.2}", cost.daily_consumption, cost.daily_cost);
            println!("Total:  {:.2} kWh  ${:.2}", cost.total_consumption, cost.total_cost);
        }
        CalcCommands::Bill {
            household_size,
            home_type,
            climate_zone,
        } => {
            let estimate = estimate_bill(&BillRequest {
                household_size,
                home_type,
                climate_zone,
                rates: TariffRates::default(),
            })?;
            println!("{}", "Estimated Monthly Bill".bold());
            println!("Consumption: {:.0} kWh", estimate.estimated_monthly_kwh);
            println!("Bill:        ${:.2}", estimate.estimated_bill);
            for band in &estimate.breakdown {
                println!("  {:<15} {:>8.1} kWh  ${:.2}", band.rate_type, band.consumption_kwh, band.cost);
            }
            for (i, tip) in estimate.recommendations.iter().enumerate() {
                println!("Tip {}: {} (${:.2}/month)", i + 1, tip.tip, tip.potential_monthly_savings);
            }
            println!(
                "{}",
                format!("Potential annual savings: ${:.2}", estimate.annual_savings).green()
            );
        }
    }
    Ok(())
}

fn handle_init_command(force: bool) -> anyhow::Result<()> {
    let config_dir = PathBuf::from("config");
    let target = config_dir.join("default.toml");
    if target.exists() && !force {
        error!("Configuration already exists. Use --force to overwrite.");
        return Ok(());
    }

    std::fs::create_dir_all(&config_dir)?;
    let default_config = crate::config::generate_default_config();
    let config_str = toml::to_string_pretty(&default_config)?;
    std::fs::write(&target, config_str)?;

    println!("{} Default configuration generated", "✓".green());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_forecast_arguments() {
        let cli = Cli::try_parse_from([
            "twin-dashboard",
            "forecast",
            "--input",
            "usage.csv",
            "--model",
            "moving-average",
            "--days",
            "7",
        ])
        .unwrap();
        match cli.command {
            Commands::Forecast { model, days, .. } => {
                assert_eq!(model, ForecastModel::MovingAverage);
                assert_eq!(days, 7);
            }
            _ => panic!("expected forecast command"),
        }
    }

    #[test]
    fn test_parse_bill_arguments() {
        let cli = Cli::try_parse_from([
            "twin-dashboard",
            "calc",
            "bill",
            "--household-size",
            "3",
            "--home-type",
            "condo",
            "--climate-zone",
            "cold",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Calc {
                command: CalcCommands::Bill {
                    home_type: HomeType::Condo,
                    climate_zone: ClimateZone::Cold,
                    ..
                }
            }
        ));
    }
}
