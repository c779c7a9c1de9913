use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use powerguard_cli::{init_tracing, App, Overrides, Settings, UreqTransport};
use powerguard_core::{PowerGenFilter, ProductionFilter};
use tracing::debug;

#[derive(Parser)]
#[command(name = "powerguard", version, about = "Admin client for the PowerGuard monitoring API")]
struct Cli {
    /// API root, e.g. http://localhost:8000
    #[arg(long, env = "POWERGUARD_BASE_URL", global = true)]
    base_url: Option<String>,

    #[arg(long, env = "POWERGUARD_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// TOML file with base_url, token and timeout_secs
    #[arg(long, env = "POWERGUARD_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Power plant details
    #[command(subcommand)]
    Plants(PlantsCommand),
    /// Logger power-generation readings
    #[command(subcommand)]
    PowerGen(PowerGenCommand),
    /// Utility daily production figures
    #[command(subcommand)]
    Production(ProductionCommand),
    /// Logger/plant groups
    #[command(subcommand)]
    Groups(GroupsCommand),
    /// Logger categories
    #[command(subcommand)]
    Categories(CategoriesCommand),
    /// Plant identifiers known to the utility
    #[command(subcommand)]
    UtilityPlants(UtilityPlantsCommand),
    /// Resource types a plant can have
    Choices,
}

#[derive(Subcommand)]
enum PlantsCommand {
    List,
    /// Create a plant from field=value pairs
    Add {
        #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment)]
        fields: Vec<(String, String)>,
    },
    /// Change fields of the plant on display row ROW
    Edit {
        row: usize,
        #[arg(long = "set", value_name = "FIELD=VALUE", required = true, value_parser = parse_assignment)]
        fields: Vec<(String, String)>,
    },
}

#[derive(Args)]
struct PowerGenArgs {
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Repeat to match several loggers
    #[arg(long = "logger", value_name = "NAME")]
    loggers: Vec<String>,
}

impl From<PowerGenArgs> for PowerGenFilter {
    fn from(args: PowerGenArgs) -> Self {
        PowerGenFilter {
            date: args.date,
            loggers: args.loggers,
        }
    }
}

#[derive(Subcommand)]
enum PowerGenCommand {
    List {
        #[command(flatten)]
        filter: PowerGenArgs,
    },
    /// Set the generation of display row ROW
    Update {
        row: usize,
        value: String,
        #[command(flatten)]
        filter: PowerGenArgs,
    },
}

#[derive(Args)]
struct ProductionArgs {
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Repeat to match several plants
    #[arg(long = "plant", value_name = "PLANT_ID")]
    plant_ids: Vec<String>,
}

impl From<ProductionArgs> for ProductionFilter {
    fn from(args: ProductionArgs) -> Self {
        ProductionFilter {
            date: args.date,
            plant_ids: args.plant_ids,
        }
    }
}

#[derive(Subcommand)]
enum ProductionCommand {
    List {
        #[command(flatten)]
        filter: ProductionArgs,
    },
    /// Set the production of display row ROW
    Update {
        row: usize,
        value: String,
        #[command(flatten)]
        filter: ProductionArgs,
    },
}

#[derive(Subcommand)]
enum GroupsCommand {
    List,
    Add { name: String },
}

#[derive(Subcommand)]
enum CategoriesCommand {
    List,
    Add { name: String },
}

#[derive(Subcommand)]
enum UtilityPlantsCommand {
    List,
    Add { plant_id: String },
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got `{raw}`"))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("missing field name in `{raw}`"));
    }
    Ok((field.to_string(), value.to_string()))
}

fn run(cli: Cli) -> anyhow::Result<String> {
    let settings = Settings::load(Overrides {
        base_url: cli.base_url,
        token: cli.token,
        config: cli.config,
    })?;
    debug!(base_url = %settings.base_url, "settings loaded");
    let app = App::new(settings.client()?, UreqTransport::new(settings.timeout));

    match cli.command {
        Command::Plants(PlantsCommand::List) => app.plants(),
        Command::Plants(PlantsCommand::Add { fields }) => app.add_plant(&fields),
        Command::Plants(PlantsCommand::Edit { row, fields }) => app.edit_plant(row, fields),
        Command::PowerGen(PowerGenCommand::List { filter }) => app.power_gen(&filter.into()),
        Command::PowerGen(PowerGenCommand::Update { row, value, filter }) => {
            app.update_power_gen(&filter.into(), row, value)
        }
        Command::Production(ProductionCommand::List { filter }) => app.productions(&filter.into()),
        Command::Production(ProductionCommand::Update { row, value, filter }) => {
            app.update_production(&filter.into(), row, value)
        }
        Command::Groups(GroupsCommand::List) => app.groups(),
        Command::Groups(GroupsCommand::Add { name }) => app.add_group(&name),
        Command::Categories(CategoriesCommand::List) => app.categories(),
        Command::Categories(CategoriesCommand::Add { name }) => app.add_category(&name),
        Command::UtilityPlants(UtilityPlantsCommand::List) => app.utility_plants(),
        Command::UtilityPlants(UtilityPlantsCommand::Add { plant_id }) => {
            app.add_utility_plant(&plant_id)
        }
        Command::Choices => app.choices(),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn assignments_split_on_first_equals() {
        assert_eq!(
            parse_assignment("location=a=b").unwrap(),
            ("location".to_string(), "a=b".to_string())
        );
        assert!(parse_assignment("tilt").is_err());
        assert!(parse_assignment("=5").is_err());
    }

    #[test]
    fn power_gen_update_parses_filters() {
        let cli = Cli::try_parse_from([
            "powerguard", "power-gen", "update", "2", "150", "--date", "2024-05-01", "--logger", "L1",
            "--logger", "L2",
        ])
        .unwrap();
        let Command::PowerGen(PowerGenCommand::Update { row, value, filter }) = cli.command else {
            panic!("wrong subcommand");
        };
        assert_eq!((row, value.as_str()), (2, "150"));
        let filter = PowerGenFilter::from(filter);
        assert_eq!(filter.loggers, vec!["L1", "L2"]);
        assert_eq!(filter.date, NaiveDate::from_ymd_opt(2024, 5, 1));
    }

    #[test]
    fn categories_add_takes_a_name() {
        let cli = Cli::try_parse_from(["powerguard", "categories", "add", "Inverter"]).unwrap();
        let Command::Categories(CategoriesCommand::Add { name }) = cli.command else {
            panic!("wrong subcommand");
        };
        assert_eq!(name, "Inverter");
        assert!(Cli::try_parse_from(["powerguard", "categories", "add"]).is_err());
    }

    #[test]
    fn plant_edit_requires_assignments() {
        assert!(Cli::try_parse_from(["powerguard", "plants", "edit", "1"]).is_err());
        let cli = Cli::try_parse_from(["powerguard", "plants", "edit", "1", "--set", "tilt=30"]).unwrap();
        assert!(matches!(cli.command, Command::Plants(PlantsCommand::Edit { row: 1, .. })));
    }
}
