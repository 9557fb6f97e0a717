use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tasklane::backend::factory;
use tasklane::buckets::{self, SortOrder};
use tasklane::cache::LocalCache;
use tasklane::config::Config;
use tasklane::constants::{
    HEADER_COMPLETED_TODAY, HEADER_FUTURE, HEADER_OVERDUE, HEADER_TODAY, SYNC_COMPLETED, SYNC_FAILED,
};
use tasklane::logger;
use tasklane::model::{CalendarDate, ClockTime, Task};
use tasklane::sync::{SyncGate, SyncService};
use tasklane::utils::datetime;

const USAGE: &str = "\
Usage: tasklane [COMMAND]

Commands:
  today               Show overdue, today, upcoming and completed-today tasks (default)
  date YYYY/MM/DD     Show the tasks occurring on a date
  sync                Reconcile with the remote store once
  watch               Keep syncing and reprint on every change
  init-config [PATH]  Write a default configuration file";

enum Command {
    Today,
    Date(String),
    Sync,
    Watch,
    InitConfig(Option<PathBuf>),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Command> {
    let command = match args.next().as_deref() {
        None | Some("today") => Command::Today,
        Some("date") => match args.next() {
            Some(date) => Command::Date(date),
            None => bail!("`date` needs a YYYY/MM/DD argument"),
        },
        Some("sync") => Command::Sync,
        Some("watch") => Command::Watch,
        Some("init-config") => Command::InitConfig(args.next().map(PathBuf::from)),
        Some("-h") | Some("--help") | Some("help") => Command::Help,
        Some(other) => bail!("Unknown command '{}'\n\n{}", other, USAGE),
    };
    Ok(command)
}

#[tokio::main]
async fn main() -> Result<()> {
    let command = parse_args(std::env::args().skip(1))?;

    match &command {
        Command::Help => {
            println!("{}", USAGE);
            return Ok(());
        }
        Command::InitConfig(path) => {
            let path = match path {
                Some(path) => path.clone(),
                None => Config::get_default_config_path()?,
            };
            return Config::generate_default_config(path);
        }
        _ => {}
    }

    let config = Config::load()?;
    let _logger = logger::init(&config.logging).context("Failed to initialize logging")?;

    let service = build_service(&config).await?;
    if !service.gate().should_sync() {
        eprintln!("💡 Sync is disabled: set [sync] enabled = true and a user_id to see your tasks.");
    }
    if let Err(e) = service.initial_load().await {
        eprintln!("⚠️ Could not load remote tasks ({}), starting offline", e);
        service.cache().load(Vec::new());
    }

    match command {
        Command::Today => print_buckets(service.cache(), &config),
        Command::Date(raw) => print_date(service.cache(), &config, &raw)?,
        Command::Sync => run_sync(&service).await,
        Command::Watch => watch(&service, &config).await?,
        Command::Help | Command::InitConfig(_) => {}
    }

    Ok(())
}

async fn build_service(config: &Config) -> Result<SyncService> {
    let cache = Arc::new(LocalCache::new());
    let store = factory::create_store(config).await?;
    let gate = Arc::new(SyncGate::from_config(&config.sync));
    Ok(SyncService::new(cache, store, gate).with_merge_policy(config.merge_policy()))
}

async fn run_sync(service: &SyncService) {
    match service.sync().await {
        Ok(report) => {
            println!(
                "{}: {} pushed, {} pulled, {} deleted",
                SYNC_COMPLETED, report.pushed, report.pulled, report.deleted
            );
            if report.is_partial() {
                println!("⚠️ Failed items: {}", report.failed_ids().join(", "));
            }
        }
        Err(e) if e.is_retriable() => eprintln!("{}: {} (try again later)", SYNC_FAILED, e),
        Err(e) => eprintln!("{}: {}", SYNC_FAILED, e),
    }
}

async fn watch(service: &SyncService, config: &Config) -> Result<()> {
    let (listener, mut events) = service.cache().subscribe_channel();

    let minutes = config.sync.auto_sync_interval_minutes;
    let auto_sync = (minutes > 0).then(|| service.spawn_auto_sync(Duration::from_secs(minutes * 60)));

    print_buckets(service.cache(), config);
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(_) => {
                    println!();
                    print_buckets(service.cache(), config);
                }
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    if let Some(handle) = auto_sync {
        handle.abort();
    }
    service.cancel_all();
    service.cache().unsubscribe(&listener);
    Ok(())
}

fn print_buckets(cache: &LocalCache, config: &Config) {
    let order = config.sort_order();
    let buckets = cache.buckets(datetime::today()).sorted(order);

    print_section(HEADER_OVERDUE, &buckets.overdue, cache, config);
    print_section(HEADER_TODAY, &buckets.today, cache, config);
    print_section(HEADER_FUTURE, &buckets.future, cache, config);
    print_section(HEADER_COMPLETED_TODAY, &buckets.completed_today, cache, config);
}

fn print_date(cache: &LocalCache, config: &Config, raw: &str) -> Result<()> {
    let date = datetime::parse_date(raw).with_context(|| format!("Invalid date '{}', expected YYYY/MM/DD", raw))?;
    let mut tasks = cache.query_date(date);
    buckets::sort_tasks(&mut tasks, SortOrder::DateTime);

    let header = format!("📅 {}", date.format(&config.display.date_format));
    print_section(&header, &tasks, cache, config);
    Ok(())
}

fn print_section(header: &str, tasks: &[Task], cache: &LocalCache, config: &Config) {
    println!("{} ({})", header, tasks.len());
    for task in tasks {
        println!("  {}", render_task(task, cache, config));
    }
}

fn render_task(task: &Task, cache: &LocalCache, config: &Config) -> String {
    let mut line = format!("[{}] {}", if task.is_completed { "x" } else { " " }, task.title);

    match &task.due_date {
        Some(CalendarDate::Day(date)) => line.push_str(&format!("  {}", date.format(&config.display.date_format))),
        Some(CalendarDate::Unparsed(raw)) => line.push_str(&format!("  {}", raw)),
        None => {}
    }
    match &task.due_time {
        Some(ClockTime::At(time)) => line.push_str(&format!(" {}", time.format(&config.display.time_format))),
        Some(ClockTime::Unparsed(raw)) => line.push_str(&format!(" {}", raw)),
        None => {}
    }
    if buckets::is_time_overdue(task, datetime::today(), chrono::Local::now().time()) {
        line.push_str("  ⏰");
    }
    if task.is_repeating() {
        line.push_str(&format!("  🔁 {}", task.repeat_type.as_str().to_lowercase()));
    }
    if task.is_important {
        line.push_str("  ⭐");
    }
    if let Some(category) = cache.category_for(task) {
        line.push_str(&format!("  #{}", category.name));
    }
    line
}
