#![forbid(unsafe_code)]
use anyhow::{anyhow, bail, Result};
use giliran::{
    io,
    model::Period,
    report::{LoadReport, ReportRenderer, TextReport},
    rules::{export_rules_json, load_rules_from_file, RuleTable},
    scheduler::{GenerateOptions, Scheduler, Sources},
    storage::{JsonScheduleRepository, JsonStorage, ScheduleRepository},
};
use clap::{Args, Parser, Subcommand};
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// CLI de jadual de tugas (fichiers JSON/CSV, sans base de données)
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    /// Fichier JSON des personnels et indisponibilités
    #[arg(long, global = true, default_value = "registry.json")]
    registry: String,

    /// Fichier JSON des lignes de jadual
    #[arg(long, global = true, default_value = "schedule.json")]
    schedule: String,

    #[command(subcommand)]
    cmd: Commands,
}

/// Période ciblée : un mois ou une semaine
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
struct PeriodArgs {
    /// Mois `YYYY-MM`
    #[arg(long)]
    month: Option<String>,
    /// Premier jour de la semaine `YYYY-MM-DD`
    #[arg(long)]
    week: Option<String>,
}

impl PeriodArgs {
    fn period(&self) -> Result<Period> {
        match (&self.month, &self.week) {
            (Some(m), None) => Period::parse_month(m).map_err(anyhow::Error::msg),
            (None, Some(w)) => Period::parse_week(w).map_err(anyhow::Error::msg),
            _ => bail!("exactly one of --month or --week is required"),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Importer des personnels depuis un CSV
    ImportPeople {
        #[arg(long)]
        csv: String,
    },

    /// Importer des indisponibilités depuis un CSV
    ImportExceptions {
        #[arg(long)]
        csv: String,
    },

    /// Générer le jadual d'une période
    Generate {
        #[command(flatten)]
        period: PeriodArgs,
        /// Table prédéfinie (monthly, weekly) ; par défaut selon la période
        #[arg(long, conflicts_with = "rules")]
        preset: Option<String>,
        /// Table de règles JSON
        #[arg(long)]
        rules: Option<String>,
        /// Force la prise en compte des indisponibilités (true/false)
        #[arg(long)]
        check_availability: Option<bool>,
        #[arg(long)]
        created_by: String,
        /// Remplace les lignes existantes de la période (seulement si la génération réussit)
        #[arg(long)]
        replace: bool,
    },

    /// Supprimer les lignes d'une période
    Clear {
        #[command(flatten)]
        period: PeriodArgs,
    },

    /// Lister et optionnellement exporter
    List {
        #[arg(long)]
        out_json: Option<String>,
        #[arg(long)]
        out_csv: Option<String>,
    },

    /// Charge par rôle sur une période
    Report {
        #[command(flatten)]
        period: PeriodArgs,
    },

    /// Exporter une table prédéfinie en JSON (base de personnalisation)
    RulesExport {
        #[arg(long, default_value = "weekly")]
        preset: String,
        #[arg(long)]
        out: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    let storage = JsonStorage::open(&cli.registry)?;
    let mut registry = storage.load_registry()?;
    let mut repository = JsonScheduleRepository::open(&cli.schedule)?;

    let code = match cli.cmd {
        Commands::ImportPeople { csv } => {
            let people = io::import_people_csv(csv)?;
            let n = people.len();
            registry.upsert_people(people);
            storage.save_registry(&registry)?;
            println!("Imported {n} person(s)");
            0
        }
        Commands::ImportExceptions { csv } => {
            let exceptions = io::import_exceptions_csv(csv)?;
            for exc in &exceptions {
                if registry.find_person_by_id(&exc.person_id).is_none() {
                    bail!("unknown person id in exceptions: {}", exc.person_id);
                }
            }
            let n = exceptions.len();
            registry.add_exceptions(exceptions);
            storage.save_registry(&registry)?;
            println!("Imported {n} exception(s)");
            0
        }
        Commands::Generate {
            period,
            preset,
            rules,
            check_availability,
            created_by,
            replace,
        } => {
            let period = period.period()?;
            let table = match (rules, preset) {
                (Some(path), _) => load_rules_from_file(path)?,
                (None, Some(name)) => RuleTable::preset(&name)?,
                (None, None) if period.is_weekly() => RuleTable::weekly(),
                (None, None) => RuleTable::monthly(),
            };
            let mut opts = GenerateOptions::for_period(&period);
            if let Some(flag) = check_availability {
                opts.check_availability = flag;
            }
            let scheduler = Scheduler::new(table, opts);
            let sources = Sources::new(&registry, &registry);
            let records = if replace {
                scheduler.regenerate(&period, &created_by, sources, &mut repository)?
            } else {
                scheduler.generate(&period, &created_by, sources, &mut repository)?
            };
            let unfilled = records.iter().filter(|r| r.is_unfilled()).count();
            println!(
                "Generated {} record(s) for {period} ({unfilled} unfilled)",
                records.len()
            );
            // Code 2 = WARNING/INCOMPLETE
            if unfilled > 0 {
                2
            } else {
                0
            }
        }
        Commands::Clear { period } => {
            let period = period.period()?;
            repository.delete_for_period(&period)?;
            println!("Cleared {period}");
            0
        }
        Commands::List { out_json, out_csv } => {
            let records = repository.records()?;
            if let Some(path) = out_json {
                io::export_records_json(path, &records)?;
            }
            if let Some(path) = out_csv {
                io::export_records_csv(path, &records, &registry)?;
            }
            // impression compacte
            for r in &records {
                let assigned = r
                    .person_id
                    .as_ref()
                    .and_then(|pid| registry.find_person_by_id(pid))
                    .map(|p| p.name.as_str())
                    .unwrap_or("-");
                println!(
                    "{} | {} {} | {} | {}",
                    r.date,
                    r.slot_type,
                    r.slot_label.as_deref().unwrap_or(""),
                    r.role,
                    assigned
                );
            }
            0
        }
        Commands::Report { period } => {
            let period = period.period()?;
            let records = repository.records_for(&period)?;
            if records.is_empty() {
                return Err(anyhow!("no records for {period}"));
            }
            let report = LoadReport::from_records(&records);
            print!("{}", TextReport.render(&report));
            0
        }
        Commands::RulesExport { preset, out } => {
            let table = RuleTable::preset(&preset)?;
            export_rules_json(&out, &table)?;
            println!("Rules {} written to {out}", table.id);
            0
        }
    };

    std::process::exit(code);
}
