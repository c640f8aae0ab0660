use std::process::ExitCode;

use dotenvy::dotenv;
use models::lead::NewLead;
use service::{runtime::open_lead_store, LeadStore};
use tracing::{error, info};
use uuid::Uuid;

const USAGE: &str = "usage:
  leads add fullName=.. phoneNumber=.. propertyType=.. budget=.. city=.. preference=..
  leads list
  leads month <month0> <year>
  leads stats";

enum Command {
    Add(NewLead),
    List,
    Month { month0: u32, year: i32 },
    Stats,
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    match args.first().map(String::as_str) {
        Some("add") => {
            let mut lead = NewLead::default();
            for pair in &args[1..] {
                let (name, value) = pair
                    .split_once('=')
                    .ok_or_else(|| format!("expected field=value, got `{pair}`"))?;
                if !lead.set_field(name, value.to_string()) {
                    return Err(format!("unknown field `{name}`"));
                }
            }
            Ok(Command::Add(lead))
        }
        Some("list") => Ok(Command::List),
        Some("month") => {
            let month0 = args
                .get(1)
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|m| *m < 12)
                .ok_or("month must be 0..=11")?;
            let year = args
                .get(2)
                .and_then(|v| v.parse::<i32>().ok())
                .ok_or("year must be an integer")?;
            Ok(Command::Month { month0, year })
        }
        Some("stats") => Ok(Command::Stats),
        Some(other) => Err(format!("unknown command `{other}`")),
        None => Err("missing command".to_string()),
    }
}

async fn execute(store: &LeadStore, command: Command) -> anyhow::Result<String> {
    let out = match command {
        Command::Add(fields) => {
            fields.validate()?;
            let lead = store.append(fields).await?;
            if !store.is_persistent() {
                info!(id = %lead.id, "storage disabled; lead was not saved");
            }
            serde_json::to_string_pretty(&lead)?
        }
        Command::List => serde_json::to_string_pretty(&store.read_all().await)?,
        Command::Month { month0, year } => {
            serde_json::to_string_pretty(&store.filter_by_month(month0, year).await)?
        }
        Command::Stats => serde_json::to_string_pretty(&store.aggregate_by_month().await)?,
    };
    Ok(out)
}

fn main() -> ExitCode {
    // 提前加载 .env，使得 RUST_LOG / CONFIG_PATH 等环境变量生效
    dotenv().ok();

    let cfg = match configs::AppConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            common::utils::logging::init_logging_default();
            error!(service = "leads", event = "config_invalid", error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    common::utils::logging::init_logging(&cfg.logging.format);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    let run_id = Uuid::new_v4();
    info!(service = "leads", event = "start", %run_id, version = env!("CARGO_PKG_VERSION"), backend = %cfg.storage.backend, "leads command starting");

    // 单线程运行时即可：所有操作均为顺序执行
    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "leads", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    rt.block_on(async move {
        let store = match open_lead_store(&cfg.storage).await {
            Ok(store) => store,
            Err(e) => {
                error!(service = "leads", event = "store_open_failed", %run_id, error = %e, "cannot open lead store");
                return ExitCode::FAILURE;
            }
        };
        match execute(&store, command).await {
            Ok(out) => {
                println!("{out}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(service = "leads", event = "command_failed", %run_id, error = %e, "command failed");
                ExitCode::FAILURE
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_add_fields() {
        match parse_args(&args(&["add", "fullName=Sara Ali", "city=Dubai"])) {
            Ok(Command::Add(lead)) => {
                assert_eq!(lead.full_name, "Sara Ali");
                assert_eq!(lead.city, "Dubai");
            }
            _ => panic!("expected add"),
        }
        assert!(parse_args(&args(&["add", "name=Old"])).is_err());
        assert!(parse_args(&args(&["add", "fullName"])).is_err());
    }

    #[test]
    fn parses_month_bounds() {
        assert!(matches!(
            parse_args(&args(&["month", "0", "2024"])),
            Ok(Command::Month { month0: 0, year: 2024 })
        ));
        assert!(parse_args(&args(&["month", "12", "2024"])).is_err());
        assert!(parse_args(&args(&["month", "1"])).is_err());
        assert!(parse_args(&args(&[])).is_err());
    }

    #[tokio::test]
    async fn add_rejects_blank_fields_before_storing() -> Result<(), anyhow::Error> {
        let kv = std::sync::Arc::new(service::storage::MemoryKv::new());
        let store = LeadStore::new(kv.clone());
        let partial = NewLead { full_name: "Only name".into(), ..Default::default() };

        assert!(execute(&store, Command::Add(partial)).await.is_err());
        assert!(kv.is_empty().await);
        Ok(())
    }
}
