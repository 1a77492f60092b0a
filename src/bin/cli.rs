//! IronLog CLI
//!
//! Command-line client for a running IronLog API:
//! - Log and complete workouts
//! - See today's scheduled workout and personal records
//! - Record body measurements
//! - Export and import data
//!
//! `one-rep-max`, `convert` and `config` work without a server.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

use ironlog::analytics::{convert, OneRepMaxFormula, Unit};
use ironlog::store::{BodyMeasurement, Exercise, Workout};

#[derive(Parser)]
#[command(name = "ironlog")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Personal fitness tracker")]
#[command(long_about = "IronLog tracks workouts, templates, routines and body metrics.\nThis client talks to a running ironlog-api server.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL
    #[arg(long, default_value = "http://localhost:8090", global = true)]
    pub api_url: String,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log a workout
    Log {
        /// Workout name
        name: String,
        /// Exercises as NAME:REPSxWEIGHT[,REPSxWEIGHT...], e.g. "Squat:5x100,5x100"
        #[arg(short, long = "exercise")]
        exercises: Vec<String>,
        /// Date (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
        /// Mark as completed right away
        #[arg(short, long)]
        completed: bool,
    },

    /// List workouts
    Workouts {
        /// active, completed or all
        #[arg(short, long, default_value = "all")]
        status: String,
    },

    /// Toggle a workout's completion
    Complete {
        /// Workout id
        id: String,
    },

    /// Show what the active routine schedules
    Today {
        /// Date (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Show personal records
    Prs {
        /// epley or brzycki
        #[arg(long)]
        formula: Option<String>,
    },

    /// Record a body measurement
    Measure {
        /// Body weight
        #[arg(short, long)]
        weight: Option<f64>,
        /// Body fat percentage
        #[arg(short, long)]
        body_fat: Option<f64>,
        /// Waist circumference
        #[arg(long)]
        waist: Option<f64>,
        /// Date (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Show server and sync status
    Status,

    /// Export data
    Export {
        /// json or csv
        #[arg(long, default_value = "json")]
        as_format: String,
        /// CSV only: workouts or measurements
        #[arg(short, long)]
        collection: Option<String>,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace all data with a JSON export
    Import {
        /// Path to the export file
        path: PathBuf,
    },

    /// Estimate a one-rep max
    OneRepMax {
        weight: f64,
        reps: i64,
        /// epley or brzycki
        #[arg(long, default_value = "epley")]
        formula: String,
    },

    /// Convert between kg/lbs or cm/in
    Convert {
        value: f64,
        from: String,
        to: String,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let api = format!("{}/api/v1", cli.api_url.trim_end_matches('/'));

    match cli.command {
        Commands::Log {
            name,
            exercises,
            date,
            completed,
        } => {
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let mut workout = Workout::new(&name, date);
            for input in &exercises {
                workout = workout.exercise(parse_exercise(input)?);
            }
            workout.completed = completed;

            let created: Workout = send(client.post(format!("{}/workouts", api)).json(&workout))
                .await?
                .json()
                .await?;
            println!(
                "Logged {} on {} ({} sets) id={}",
                created.name,
                created.date,
                created.set_count(),
                created.id
            );
        }

        Commands::Workouts { status } => {
            let data: Value = send(client.get(format!("{}/workouts?status={}", api, status)))
                .await?
                .json()
                .await?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                print_workouts(&data);
            }
        }

        Commands::Complete { id } => {
            let workout: Workout = send(client.post(format!("{}/workouts/{}/complete", api, id)))
                .await?
                .json()
                .await?;
            let state = if workout.completed { "completed" } else { "active" };
            println!("{} is now {}", workout.name, state);
        }

        Commands::Today { date } => {
            let mut url = format!("{}/schedule/today", api);
            if let Some(date) = date {
                url.push_str(&format!("?date={}", date));
            }
            let data: Value = send(client.get(url)).await?.json().await?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else if data.is_null() {
                println!("Nothing scheduled. Rest day.");
            } else {
                println!(
                    "{} ({}): {}",
                    data["routine_name"].as_str().unwrap_or("-"),
                    data["day"].as_str().unwrap_or("-"),
                    data["template"]["name"].as_str().unwrap_or("missing template")
                );
                if let Some(exercises) = data["template"]["exercises"].as_array() {
                    for exercise in exercises {
                        let sets = exercise["sets"].as_array().map(Vec::len).unwrap_or(0);
                        println!("  {} x{}", exercise["name"].as_str().unwrap_or("-"), sets);
                    }
                }
            }
        }

        Commands::Prs { formula } => {
            let mut url = format!("{}/analytics/prs", api);
            if let Some(formula) = formula {
                url.push_str(&format!("?formula={}", formula));
            }
            let data: Value = send(client.get(url)).await?.json().await?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                print_prs(&data);
            }
        }

        Commands::Measure {
            weight,
            body_fat,
            waist,
            date,
        } => {
            if weight.is_none() && body_fat.is_none() && waist.is_none() {
                bail!("Give at least one of --weight, --body-fat or --waist");
            }
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let mut measurement = BodyMeasurement::new(date);
            measurement.weight = weight;
            measurement.body_fat = body_fat;
            measurement.waist = waist;

            let created: BodyMeasurement =
                send(client.post(format!("{}/measurements", api)).json(&measurement))
                    .await?
                    .json()
                    .await?;
            println!("Recorded measurement for {} id={}", created.date, created.id);
        }

        Commands::Status => {
            let response = client.get(format!("{}/health", cli.api_url)).send().await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let health: Value = resp.json().await?;

                    println!("IronLog v{}", env!("CARGO_PKG_VERSION"));
                    println!();
                    println!("API Status: {}", health["status"].as_str().unwrap_or("unknown"));
                    println!("Cache: {}", health["cache"].as_str().unwrap_or("unknown"));
                    println!(
                        "Signed in: {}",
                        if health["signed_in"] == true { "yes" } else { "no" }
                    );

                    if let Some(records) = health["store"]["total_records"].as_u64() {
                        println!();
                        println!("Records: {}", records);
                        if let Some(counts) = health["store"]["counts"].as_object() {
                            for (name, count) in counts {
                                if count.as_u64().unwrap_or(0) > 0 {
                                    println!("  {:<20} {}", name, count);
                                }
                            }
                        }
                    }

                    if let Some(uptime) = health["uptime_seconds"].as_u64() {
                        println!();
                        println!("Uptime: {}", format_duration(uptime));
                    }
                }
                Ok(resp) => bail!("API returned error: {}", resp.status()),
                Err(e) => {
                    eprintln!("Cannot connect to IronLog API at {}", cli.api_url);
                    eprintln!();
                    eprintln!("Make sure the IronLog API server is running:");
                    eprintln!("  cargo run --bin ironlog-api");
                    return Err(e.into());
                }
            }
        }

        Commands::Export {
            as_format,
            collection,
            output,
        } => {
            let mut url = format!("{}/export?format={}", api, as_format);
            if let Some(collection) = collection {
                url.push_str(&format!("&collection={}", collection));
            }
            let data = send(client.get(url)).await?.text().await?;

            match output {
                Some(path) => {
                    std::fs::write(&path, &data)
                        .with_context(|| format!("writing export to {}", path.display()))?;
                    println!("Exported to {}", path.display());
                }
                None => print!("{}", data),
            }
        }

        Commands::Import { path } => {
            let body = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let result: Value = send(
                client
                    .post(format!("{}/import", api))
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(body),
            )
            .await?
            .json()
            .await?;
            println!("Imported {} records", result["records"].as_u64().unwrap_or(0));
        }

        Commands::OneRepMax {
            weight,
            reps,
            formula,
        } => {
            let formula: OneRepMaxFormula = formula.parse().map_err(anyhow::Error::msg)?;
            println!("{:.1}", formula.estimate(weight, reps));
        }

        Commands::Convert { value, from, to } => {
            let from_unit: Unit = from.parse().map_err(anyhow::Error::msg)?;
            let to_unit: Unit = to.parse().map_err(anyhow::Error::msg)?;
            match convert(value, from_unit, to_unit) {
                Some(result) => println!("{:.2} {}", result, to),
                None => bail!("Cannot convert {} to {}", from, to),
            }
        }

        Commands::Config { output } => {
            let config = ironlog::config::generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)
                        .with_context(|| format!("writing config to {}", path.display()))?;
                    println!("Config written to {}", path.display());
                }
                None => print!("{}", config),
            }
        }
    }

    Ok(())
}

/// Send a request and turn non-2xx responses into errors carrying the API message
async fn send(request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
    let response = request.send().await.context("request to IronLog API failed")?;
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or(text);
    bail!("Request failed ({}): {}", status, message)
}

/// Parse `NAME:REPSxWEIGHT[,REPSxWEIGHT...]`
fn parse_exercise(input: &str) -> Result<Exercise> {
    let (name, sets) = input
        .split_once(':')
        .with_context(|| format!("expected NAME:REPSxWEIGHT, got {:?}", input))?;

    let mut exercise = Exercise::new(name.trim());
    for set in sets.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (reps, weight) = set
            .split_once(['x', 'X'])
            .with_context(|| format!("expected REPSxWEIGHT, got {:?}", set))?;
        let reps: u32 = reps.trim().parse().with_context(|| format!("bad reps in {:?}", set))?;
        let weight: f64 = weight
            .trim()
            .parse()
            .with_context(|| format!("bad weight in {:?}", set))?;
        exercise = exercise.set(reps, weight);
    }
    Ok(exercise)
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}

fn print_workouts(data: &Value) {
    let items = match data["items"].as_array() {
        Some(items) if !items.is_empty() => items,
        _ => {
            println!("No workouts yet.");
            println!();
            println!("Log your first one with:");
            println!("  ironlog log \"Leg Day\" -e \"Squat:5x100,5x100\"");
            return;
        }
    };

    println!("{:<12} {:<24} {:<10} {:<6} {}", "Date", "Name", "Status", "Sets", "ID");
    println!("{}", "-".repeat(80));
    for workout in items {
        let sets: usize = workout["exercises"]
            .as_array()
            .map(|ex| {
                ex.iter()
                    .map(|e| e["sets"].as_array().map(Vec::len).unwrap_or(0))
                    .sum()
            })
            .unwrap_or(0);
        let status = if workout["completed"] == true { "done" } else { "active" };
        println!(
            "{:<12} {:<24} {:<10} {:<6} {}",
            workout["date"].as_str().unwrap_or("-"),
            workout["name"].as_str().unwrap_or("-"),
            status,
            sets,
            workout["id"].as_str().unwrap_or("-")
        );
    }
}

fn print_prs(data: &Value) {
    let records = match data.as_array() {
        Some(records) if !records.is_empty() => records,
        _ => {
            println!("No personal records yet. Complete a workout first.");
            return;
        }
    };

    println!("{:<24} {:>8} {:>5} {:>8} {}", "Exercise", "Weight", "Reps", "e1RM", "Date");
    println!("{}", "-".repeat(60));
    for pr in records {
        println!(
            "{:<24} {:>8.1} {:>5} {:>8.1} {}",
            pr["exercise"].as_str().unwrap_or("-"),
            pr["weight"].as_f64().unwrap_or(0.0),
            pr["reps"].as_u64().unwrap_or(0),
            pr["estimated_one_rep_max"].as_f64().unwrap_or(0.0),
            pr["date"].as_str().unwrap_or("-")
        );
    }
}
