use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::application::{ExpenseUpdate, TripService};
use crate::domain::{
    balance_of, format_cents, parse_cents, ActivityKind, Expense, Settlement, Trip,
};

/// Tripsplit - shared trip expenses, settled
#[derive(Parser)]
#[command(name = "tripsplit")]
#[command(about = "Record shared trip expenses and work out who owes whom")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "TRIPSPLIT_DB", default_value = "tripsplit.db", global = true)]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Trip management commands
    #[command(subcommand)]
    Trip(TripCommands),

    /// Itinerary commands
    #[command(subcommand)]
    Activity(ActivityCommands),

    /// Show the day-by-day plan of a trip
    Itinerary {
        /// Trip title
        trip: String,
    },

    /// Expense commands
    #[command(subcommand)]
    Expense(ExpenseCommands),

    /// Show balances and the reimbursements that settle a trip
    Settle {
        /// Trip title
        trip: String,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Export data to CSV or JSON
    Export {
        /// What to export: expenses, settlement
        export_type: String,

        /// Trip title
        #[arg(long)]
        trip: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Format: csv, json (settlement only)
        #[arg(short, long, default_value = "csv")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum TripCommands {
    /// Create a new trip
    Create {
        /// Trip title (must be unique)
        title: String,

        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        end: String,

        /// Participant usernames, comma separated
        #[arg(short, long, value_delimiter = ',')]
        participants: Vec<String>,
    },

    /// List all trips
    List,

    /// Show detailed trip information
    Show {
        /// Trip title
        title: String,
    },

    /// Add a participant to a trip
    AddParticipant {
        /// Trip title
        title: String,

        /// Participant username
        name: String,
    },
}

#[derive(Subcommand)]
pub enum ActivityCommands {
    /// Plan an activity
    Add {
        /// Activity name
        name: String,

        /// Trip title
        #[arg(long)]
        trip: String,

        /// Day of the activity (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Kind: transport, lodging, activity, meal
        #[arg(short, long, default_value = "activity")]
        kind: String,

        /// Planned cost (e.g., "25.00")
        #[arg(short, long)]
        cost: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Record an expense
    Add {
        /// Expense title
        title: String,

        /// Trip title
        #[arg(long)]
        trip: String,

        /// Amount paid (e.g., "50.00" or "50")
        #[arg(short, long)]
        amount: String,

        /// Participant who paid
        #[arg(long)]
        payer: String,

        /// Beneficiaries, comma separated (everyone if omitted)
        #[arg(long = "for", value_delimiter = ',')]
        beneficiaries: Vec<String>,
    },

    /// List a trip's expenses
    List {
        /// Trip title
        trip: String,

        /// Only expenses this participant paid for or shares in
        #[arg(short, long)]
        participant: Option<String>,
    },

    /// Replace fields of an expense
    Edit {
        /// Expense ID
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long)]
        amount: Option<String>,

        #[arg(long)]
        payer: Option<String>,

        /// Beneficiaries, comma separated
        #[arg(long = "for", value_delimiter = ',')]
        beneficiaries: Option<Vec<String>>,
    },

    /// Delete an expense
    Delete {
        /// Expense ID
        id: String,
    },
}

impl Cli {
    /// Route tracing output to stderr. RUST_LOG overrides the verbose flag.
    fn init_tracing(&self) {
        let default_level = if self.verbose { "debug" } else { "warn" };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    }

    pub async fn run(self) -> Result<()> {
        self.init_tracing();

        match self.command {
            Commands::Init => {
                TripService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Trip(trip_cmd) => {
                let service = TripService::connect(&self.database).await?;
                run_trip_command(&service, trip_cmd).await?;
            }

            Commands::Activity(activity_cmd) => {
                let service = TripService::connect(&self.database).await?;
                run_activity_command(&service, activity_cmd).await?;
            }

            Commands::Itinerary { trip } => {
                let service = TripService::connect(&self.database).await?;
                run_itinerary_command(&service, &trip).await?;
            }

            Commands::Expense(expense_cmd) => {
                let service = TripService::connect(&self.database).await?;
                run_expense_command(&service, expense_cmd).await?;
            }

            Commands::Settle { trip, format } => {
                let service = TripService::connect(&self.database).await?;
                run_settle_command(&service, &trip, &format).await?;
            }

            Commands::Export {
                export_type,
                trip,
                output,
                format,
            } => {
                let service = TripService::connect(&self.database).await?;
                run_export_command(&service, &export_type, &trip, output.as_deref(), &format)
                    .await?;
            }
        }

        Ok(())
    }
}

async fn run_trip_command(service: &TripService, cmd: TripCommands) -> Result<()> {
    match cmd {
        TripCommands::Create {
            title,
            start,
            end,
            participants,
        } => {
            let start_date = parse_date(&start)?;
            let end_date = parse_date(&end)?;
            let trip = service
                .create_trip(title, start_date, end_date, participants)
                .await?;
            println!(
                "Created trip: {} ({} to {}, {} participant(s))",
                trip.title,
                trip.start_date,
                trip.end_date,
                trip.participants.len()
            );
        }

        TripCommands::List => {
            let trips = service.list_trips().await?;
            if trips.is_empty() {
                println!("No trips found.");
            } else {
                println!("{:<24} {:<12} {:<12} {}", "TITLE", "START", "END", "PARTICIPANTS");
                println!("{}", "-".repeat(70));
                for trip in trips {
                    println!(
                        "{:<24} {:<12} {:<12} {}",
                        truncate(&trip.title, 24),
                        trip.start_date.to_string(),
                        trip.end_date.to_string(),
                        trip.participants.join(", ")
                    );
                }
            }
        }

        TripCommands::Show { title } => {
            let info = service.get_trip_info(&title).await?;
            let trip = &info.trip;

            println!("Trip: {}", trip.title);
            println!("  ID:           {}", trip.id);
            println!(
                "  Dates:        {} to {} ({} days)",
                trip.start_date,
                trip.end_date,
                trip.duration_days()
            );
            println!("  Participants: {}", trip.participants.join(", "));
            println!("  Activities:   {}", info.activity_count);
            println!("  Expenses:     {}", info.expense_count);
            println!("  Total spent:  {}", format_cents(info.total_spent));
        }

        TripCommands::AddParticipant { title, name } => {
            let trip = service.add_participant(&title, &name).await?;
            println!(
                "Added {} to {} ({} participant(s))",
                name.trim(),
                trip.title,
                trip.participants.len()
            );
        }
    }
    Ok(())
}

async fn run_activity_command(service: &TripService, cmd: ActivityCommands) -> Result<()> {
    match cmd {
        ActivityCommands::Add {
            name,
            trip,
            date,
            kind,
            cost,
        } => {
            let date = parse_date(&date)?;
            let kind: ActivityKind = kind.parse().map_err(|e| {
                anyhow::anyhow!(
                    "{}. Valid kinds: transport, lodging, activity, meal",
                    e
                )
            })?;
            let cost_cents = cost
                .map(|c| parse_cents(&c))
                .transpose()
                .context("Invalid cost format. Use '25.00' or '25'")?;

            let activity = service
                .add_activity(&trip, name, date, kind, cost_cents)
                .await?;
            println!(
                "Planned {} ({}) on {}",
                activity.name, activity.kind, activity.date
            );
        }
    }
    Ok(())
}

async fn run_itinerary_command(service: &TripService, title: &str) -> Result<()> {
    let (trip, days) = service.get_itinerary(title).await?;

    println!("Itinerary: {}", trip.title);
    for day in days {
        println!();
        println!("{}", day.date.format("%a %Y-%m-%d"));
        if day.activities.is_empty() {
            println!("  (nothing planned)");
            continue;
        }
        for activity in &day.activities {
            let cost = activity
                .cost_cents
                .map(format_cents)
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {:<10} {:<30} {:>10}",
                activity.kind.as_str(),
                truncate(&activity.name, 30),
                cost
            );
        }
        if day.planned_cost > 0 {
            println!("  {:<41} {:>10}", "planned", format_cents(day.planned_cost));
        }
    }
    Ok(())
}

async fn run_expense_command(service: &TripService, cmd: ExpenseCommands) -> Result<()> {
    match cmd {
        ExpenseCommands::Add {
            title,
            trip,
            amount,
            payer,
            beneficiaries,
        } => {
            let amount_cents =
                parse_cents(&amount).context("Invalid amount format. Use '50.00' or '50'")?;
            let expense = service
                .record_expense(&trip, title, amount_cents, &payer, beneficiaries)
                .await?;
            println!(
                "Recorded expense: {} {} paid by {} ({})",
                expense.title,
                format_cents(expense.amount_cents),
                expense.payer,
                expense.id
            );
        }

        ExpenseCommands::List { trip, participant } => {
            let expenses = match participant {
                Some(name) => service.list_expenses_for_participant(&trip, &name).await?,
                None => service.list_expenses(&trip).await?,
            };
            print_expenses(&expenses);
        }

        ExpenseCommands::Edit {
            id,
            title,
            amount,
            payer,
            beneficiaries,
        } => {
            let expense_id = parse_expense_id(&id)?;
            let amount_cents = amount
                .map(|a| parse_cents(&a))
                .transpose()
                .context("Invalid amount format. Use '50.00' or '50'")?;

            let update = ExpenseUpdate {
                title,
                amount_cents,
                payer,
                beneficiaries,
            };
            let expense = service.update_expense(expense_id, update).await?;
            println!(
                "Updated expense: {} {} paid by {}",
                expense.title,
                format_cents(expense.amount_cents),
                expense.payer
            );
        }

        ExpenseCommands::Delete { id } => {
            let expense_id = parse_expense_id(&id)?;
            let expense = service.delete_expense(expense_id).await?;
            println!("Deleted expense: {}", expense.title);
        }
    }
    Ok(())
}

fn print_expenses(expenses: &[Expense]) {
    if expenses.is_empty() {
        println!("No expenses found.");
        return;
    }

    println!(
        "{:<36}  {:<10}  {:<20}  {:>10}  {:<12}  {}",
        "ID", "DATE", "TITLE", "AMOUNT", "PAID BY", "FOR"
    );
    println!("{}", "-".repeat(110));
    for expense in expenses {
        let beneficiaries: Vec<&str> = expense.beneficiaries.iter().map(String::as_str).collect();
        println!(
            "{:<36}  {:<10}  {:<20}  {:>10}  {:<12}  {}",
            expense.id,
            expense.created_at.format("%Y-%m-%d"),
            truncate(&expense.title, 20),
            format_cents(expense.amount_cents),
            truncate(&expense.payer, 12),
            beneficiaries.join(", ")
        );
    }
}

async fn run_settle_command(service: &TripService, title: &str, format: &str) -> Result<()> {
    match format {
        "table" => {
            let (trip, settlement) = service.settle_trip(title).await?;
            print_settlement(&trip, &settlement);
        }
        "json" => {
            use crate::io::Exporter;
            Exporter::new(service)
                .export_settlement_json(title, std::io::stdout())
                .await?;
        }
        _ => anyhow::bail!("Invalid format '{}'. Valid formats: table, json", format),
    }
    Ok(())
}

fn print_settlement(trip: &Trip, settlement: &Settlement) {
    println!("Settlement: {}", trip.title);
    println!();

    if settlement.balances.is_empty() {
        println!("No expenses recorded.");
        return;
    }

    println!("{:<20} {:>12} {:>12}", "PARTICIPANT", "BALANCE", "TRANSFERS");
    println!("{}", "-".repeat(46));
    for participant in &trip.participants {
        println!(
            "{:<20} {:>12} {:>12}",
            truncate(participant, 20),
            format_cents(balance_of(&settlement.balances, participant)),
            format_cents(settlement.net_transferred(participant))
        );
    }
    println!();

    if settlement.is_square() {
        println!("All square.");
        return;
    }

    println!("Reimbursements:");
    for r in &settlement.reimbursements {
        println!("  {} pays {} to {}", r.from, format_cents(r.amount_cents), r.to);
    }
}

async fn run_export_command(
    service: &TripService,
    export_type: &str,
    trip: &str,
    output: Option<&str>,
    format: &str,
) -> Result<()> {
    use std::fs::File;
    use std::io::{stdout, Write};

    // Nothing touches the output file until the export has been rendered
    let (buffer, summary) = render_export(service, export_type, trip, format).await?;

    match output {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            file.write_all(&buffer)
                .with_context(|| format!("Failed to write output file: {}", path))?;
            eprintln!("{}", summary);
        }
        None => stdout().write_all(&buffer)?,
    }

    Ok(())
}

/// Render an export into memory, returning the bytes and a one-line summary.
async fn render_export(
    service: &TripService,
    export_type: &str,
    trip: &str,
    format: &str,
) -> Result<(Vec<u8>, String)> {
    use crate::io::Exporter;

    let exporter = Exporter::new(service);
    let mut buffer = Vec::new();

    let summary = match (export_type, format) {
        ("expenses", "csv") => {
            let count = exporter.export_expenses_csv(trip, &mut buffer).await?;
            format!("Exported {} expenses", count)
        }
        ("settlement", "csv") => {
            let count = exporter.export_settlement_csv(trip, &mut buffer).await?;
            format!("Exported {} reimbursements", count)
        }
        ("settlement", "json") => {
            let report = exporter.export_settlement_json(trip, &mut buffer).await?;
            format!(
                "Exported settlement: {} balances, {} reimbursements",
                report.balances.len(),
                report.reimbursements.len()
            )
        }
        ("expenses", _) | ("settlement", _) => {
            anyhow::bail!(
                "Unsupported format '{}' for {}. Use csv (or json for settlement)",
                format,
                export_type
            );
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: expenses, settlement",
                export_type
            );
        }
    };

    Ok((buffer, summary))
}

fn parse_expense_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).context("Invalid expense ID format (expected UUID)")
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .with_context(|| format!("Invalid date format '{}'. Use YYYY-MM-DD", date_str))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Lisbon", 10), "Lisbon");
        assert_eq!(truncate("A very long trip title", 10), "A very ...");
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-06-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
        assert!(parse_date("01/06/2024").is_err());
    }

    #[test]
    fn test_cli_parses_expense_add() {
        let cli = Cli::try_parse_from([
            "tripsplit",
            "--database",
            "t.db",
            "expense",
            "add",
            "Dinner",
            "--trip",
            "Lisbon",
            "--amount",
            "42.50",
            "--payer",
            "ana",
            "--for",
            "ana,ben",
        ])
        .unwrap();

        match cli.command {
            Commands::Expense(ExpenseCommands::Add {
                title,
                beneficiaries,
                ..
            }) => {
                assert_eq!(title, "Dinner");
                assert_eq!(beneficiaries, vec!["ana", "ben"]);
            }
            _ => panic!("expected expense add"),
        }
        assert_eq!(cli.database, "t.db");
    }

    #[test]
    fn test_cli_parses_expense_list_filter() {
        let cli =
            Cli::try_parse_from(["tripsplit", "expense", "list", "Lisbon", "--participant", "ben"])
                .unwrap();

        match cli.command {
            Commands::Expense(ExpenseCommands::List { trip, participant }) => {
                assert_eq!(trip, "Lisbon");
                assert_eq!(participant.as_deref(), Some("ben"));
            }
            _ => panic!("expected expense list"),
        }
    }

    #[tokio::test]
    async fn test_failed_export_leaves_output_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let service = TripService::init(db_path.to_str().unwrap()).await.unwrap();
        service
            .create_trip(
                "Lisbon".into(),
                parse_date("2024-06-01").unwrap(),
                parse_date("2024-06-03").unwrap(),
                vec!["ana".into(), "ben".into()],
            )
            .await
            .unwrap();

        let out_path = temp_dir.path().join("report.csv");
        std::fs::write(&out_path, "previous report").unwrap();
        let out = out_path.to_str().unwrap();

        let unknown_trip = run_export_command(&service, "expenses", "Lisbn", Some(out), "csv").await;
        assert!(unknown_trip.is_err());

        let bad_format = run_export_command(&service, "expenses", "Lisbon", Some(out), "xml").await;
        assert!(bad_format.is_err());

        assert_eq!(std::fs::read_to_string(&out_path).unwrap(), "previous report");

        run_export_command(&service, "settlement", "Lisbon", Some(out), "csv")
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&out_path).unwrap(), "from,to,amount\n");
    }
}
