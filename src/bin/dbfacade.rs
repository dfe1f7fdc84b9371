use dbfacade::config::{default_config_path, load_config};
use dbfacade::{ConnectionFacade, FacadeError, OrExit, Result, StatementKind};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
Usage: dbfacade [--config PATH] [--database NAME] [SQL ...]

Connects with the settings in PATH (TOML with host, username, passwd, dbname),
optionally switches to database NAME, then runs each SQL statement in order.

Connection, database selection and disconnect failures end the process with
exit status 1. Failed statements are reported and the next one still runs.";

#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    database: Option<String>,
    statements: Vec<String>,
}

#[derive(Debug, PartialEq)]
enum Command {
    Run(Args),
    Help,
}

fn parse_args<I: IntoIterator<Item = String>>(raw: I) -> Result<Command> {
    let mut args = Args::default();
    let mut raw = raw.into_iter();

    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-c" | "--config" => {
                let path = raw
                    .next()
                    .ok_or_else(|| FacadeError::Config("--config needs a path".to_string()))?;
                args.config = Some(PathBuf::from(path));
            }
            "-d" | "--database" => {
                let name = raw
                    .next()
                    .ok_or_else(|| FacadeError::Config("--database needs a name".to_string()))?;
                args.database = Some(name);
            }
            flag if flag.starts_with("--") => {
                return Err(FacadeError::Config(format!("unknown option {}", flag)));
            }
            _ => args.statements.push(arg),
        }
    }

    Ok(Command::Run(args))
}

fn run_statement(facade: &mut ConnectionFacade, sql: &str) {
    let kind = match facade.execute_query(sql) {
        Ok(kind) => kind,
        Err(_) => {
            eprintln!("Query failed: {}", facade.last_error().unwrap_or_default());
            return;
        }
    };

    match kind {
        StatementKind::Read => {
            println!("{} row(s) returned", facade.returned_rows().unwrap_or(0));
            if let Some(row) = facade.last_result().and_then(|r| r.row_as_json(0)) {
                println!("{}", row);
            }
        }
        StatementKind::Write => {
            println!("{} row(s) affected", facade.affected_rows().unwrap_or(0));
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    info!("Starting dbfacade...");

    let args = match parse_args(std::env::args().skip(1)).or_exit() {
        Command::Help => {
            println!("{}", USAGE);
            return;
        }
        Command::Run(args) => args,
    };

    let config_path = args
        .config
        .or_else(default_config_path)
        .ok_or_else(|| FacadeError::Config("no configuration file given".to_string()))
        .or_exit();
    let config = load_config(&config_path).or_exit();

    let mut facade = ConnectionFacade::instance()
        .lock()
        .map_err(|_| FacadeError::App("database facade lock poisoned".to_string()))
        .or_exit();

    facade.connect(config).or_exit();
    if let Some(name) = &args.database {
        facade.select_database(name).or_exit();
    }
    for sql in &args.statements {
        run_statement(&mut facade, sql);
    }
    facade.disconnect().or_exit();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        let parsed = parse_args(strings(&["--config", "db.toml", "-d", "shop", "SELECT 1", "DELETE FROM t"])).unwrap();
        assert_eq!(
            parsed,
            Command::Run(Args {
                config: Some(PathBuf::from("db.toml")),
                database: Some("shop".to_string()),
                statements: strings(&["SELECT 1", "DELETE FROM t"]),
            })
        );
    }

    #[test]
    fn test_parse_args_help_and_errors() {
        assert_eq!(parse_args(strings(&["SELECT 1", "--help"])).unwrap(), Command::Help);
        assert!(parse_args(strings(&["--config"])).is_err());
        assert!(parse_args(strings(&["--verbose"])).is_err());
    }
}
