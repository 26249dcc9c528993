use async_trait::async_trait;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use recur_cli::cli::{Cli, Command, build_overrides};
use recur_core::config::{Config, load_config_with_fallback, merge_overrides};
use recur_core::error::AppError;
use recur_core::interval::describe_interval;
use recur_core::list_identity::{EntryPoint, ListIdentity, NamePrompt};
use recur_core::model::{NewTask, Task};
use recur_core::remote::{MemoryRemote, PocketBaseRemote, RemoteTasks};
use recur_core::scheduler::TickReport;
use recur_core::session::{Intent, Outcome, Session, SyncState, TaskLine, TaskView};
use recur_core::storage::local_state::state_path;
use std::io::Write;
use time::OffsetDateTime;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, warn};

type InputLines = Lines<BufReader<Stdin>>;

enum Flow {
    Continue,
    Exit,
}

struct StdinPrompt<'a> {
    lines: &'a mut InputLines,
}

impl<'a> StdinPrompt<'a> {
    fn new(lines: &'a mut InputLines) -> Self {
        Self { lines }
    }
}

#[async_trait]
impl<'a> NamePrompt for StdinPrompt<'a> {
    async fn prompt_for_name(&mut self) -> Result<String, AppError> {
        eprint!("List name: ");
        std::io::stderr()
            .flush()
            .map_err(|err| AppError::io(err.to_string()))?;

        match self.lines.next_line().await {
            Ok(Some(line)) => Ok(line),
            Ok(None) => Err(AppError::invalid_input("list name is required")),
            Err(err) => Err(AppError::io(err.to_string())),
        }
    }
}

fn init_tracing(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

fn print_task_plain(line: &TaskLine, marker: &str) {
    match line.every.as_deref() {
        Some(every) => println!(
            "  [{marker}] {} | {} | every {every}",
            line.id, line.description
        ),
        None => println!("  [{marker}] {} | {}", line.id, line.description),
    }
}

fn print_view_plain(view: &TaskView) {
    println!("List: {}", view.list_name.as_deref().unwrap_or("-"));

    println!("Pending:");
    if view.pending.is_empty() {
        println!("  (none)");
    }
    for line in &view.pending {
        print_task_plain(line, " ");
    }

    println!("Completed:");
    if view.completed.is_empty() {
        println!("  (none)");
    }
    for line in &view.completed {
        print_task_plain(line, "x");
    }
}

fn print_view_json(view: &TaskView) -> Result<(), AppError> {
    let json = serde_json::to_string(view).map_err(|err| AppError::invalid_data(err.to_string()))?;
    println!("{json}");
    Ok(())
}

fn print_view(view: &TaskView, json: bool) -> Result<(), AppError> {
    if json {
        print_view_json(view)
    } else {
        print_view_plain(view);
        Ok(())
    }
}

fn print_task_json(task: &Task) {
    let json = serde_json::json!({
        "id": task.id,
        "list_name": task.list_name,
        "description": task.description,
        "done": task.done,
        "every": task.recurrence,
        "every_label": task.recurrence.as_deref().map(describe_interval),
        "last_completed_at": task.last_completed_at,
    });
    println!("{}", json);
}

fn print_task(task: &Task, verb: &str, json: bool) {
    if json {
        print_task_json(task);
    } else {
        println!("{verb} task: {} ({})", task.description, task.id);
    }
}

fn print_lists(identity: &ListIdentity, json: bool) {
    let active = identity.active_list_name();

    if json {
        let json = serde_json::json!({
            "active": active,
            "lists": identity.list_visited(),
        });
        println!("{}", json);
        return;
    }

    if identity.list_visited().is_empty() {
        println!("No lists opened yet");
        return;
    }

    for name in identity.list_visited() {
        let marker = if Some(name.as_str()) == active { "*" } else { " " };
        println!("{marker} {name}");
    }
}

fn print_tick_report(report: &TickReport, sync: &SyncState, json: bool) {
    if json {
        let reopened: Vec<&str> = report
            .reopened
            .iter()
            .map(|task| task.id.as_str())
            .collect();
        let failures: Vec<serde_json::Value> = report
            .failures
            .iter()
            .map(|failure| {
                serde_json::json!({ "id": failure.task_id, "error": failure.error.to_string() })
            })
            .collect();
        let malformed: Vec<serde_json::Value> = report
            .malformed
            .iter()
            .map(|entry| serde_json::json!({ "id": entry.task_id, "every": entry.token }))
            .collect();
        let json = serde_json::json!({
            "reopened": reopened,
            "failures": failures,
            "malformed": malformed,
        });
        println!("{}", json);
        return;
    }

    for task in &report.reopened {
        println!("Due again: {} ({})", task.description, task.id);
    }
    for failure in &report.failures {
        eprintln!("WARNING: could not reopen {}: {}", failure.task_id, failure.error);
    }
    if let SyncState::Failed(reason) = sync {
        eprintln!("WARNING: sync failed, will retry: {reason}");
    }
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

/// List commands that never reach the remote collection.
fn run_local_command(
    identity: &mut ListIdentity,
    command: Command,
    json: bool,
) -> Result<(), AppError> {
    match command {
        Command::Lists => {}
        Command::Switch { name } => {
            let name = identity.switch_to(&name)?;
            if !json {
                println!("Switched to list: {name}");
            }
        }
        Command::New => {
            identity.clear_active()?;
            if !json {
                println!("The next run asks for a list name");
            }
        }
        Command::Forget { name } => {
            let forgotten = identity.forget_visited(&name)?;
            if !json {
                if forgotten {
                    println!("Forgot list: {name}");
                } else {
                    println!("No list named {name}");
                }
            }
        }
        other => {
            return Err(AppError::invalid_input(format!(
                "{other:?} needs a loaded list"
            )));
        }
    }

    print_lists(identity, json);
    Ok(())
}

async fn open_list(
    session: &mut Session,
    lines: &mut InputLines,
    json: bool,
) -> Result<(), AppError> {
    let name = session.reload(&mut StdinPrompt::new(lines)).await?;
    if !json {
        println!("Opened list: {name}");
    }
    print_view(&session.view(), json)
}

async fn run_task_intent(
    session: &mut Session,
    intent: Intent,
    verb: &str,
    json: bool,
) -> Result<(), AppError> {
    let id = match &intent {
        Intent::CompleteTask(id) | Intent::ReopenTask(id) | Intent::DeleteTask(id) => {
            Some(id.clone())
        }
        _ => None,
    };

    match session.dispatch(intent, OffsetDateTime::now_utc()).await? {
        Outcome::Added(task) | Outcome::Updated(task) | Outcome::Removed(task) => {
            print_task(&task, verb, json);
        }
        Outcome::Unchanged | Outcome::Reload => {
            if !json {
                println!("No task with id {}", id.as_deref().unwrap_or("-"));
            }
        }
    }

    Ok(())
}

async fn run_command(
    session: &mut Session,
    lines: &mut InputLines,
    command: Command,
    config: &Config,
    json: bool,
) -> Result<(), AppError> {
    match command {
        Command::Session => {
            println!("Already in a session");
        }
        Command::List => print_view(&session.view(), json)?,
        Command::Add { description, every } => {
            let new_task = NewTask::new(&description, every.as_deref())?;
            run_task_intent(session, Intent::AddTask(new_task), "Added", json).await?;
        }
        Command::Done { id } => {
            run_task_intent(session, Intent::CompleteTask(id), "Completed", json).await?;
        }
        Command::Undo { id } => {
            run_task_intent(session, Intent::ReopenTask(id), "Reopened", json).await?;
        }
        Command::Delete { id } => {
            run_task_intent(session, Intent::DeleteTask(id), "Deleted", json).await?;
        }
        Command::Tick => {
            let report = session.tick(OffsetDateTime::now_utc()).await;
            if !json && report.is_quiet() {
                println!("Nothing is due");
            } else {
                print_tick_report(&report, session.sync_state(), json);
            }
        }
        Command::Lists => print_lists(session.identity(), json),
        Command::Switch { name } => {
            if let Outcome::Reload = session
                .dispatch(Intent::SwitchList(name), OffsetDateTime::now_utc())
                .await?
            {
                open_list(session, lines, json).await?;
            }
        }
        Command::New => {
            if let Outcome::Reload = session
                .dispatch(Intent::NewList, OffsetDateTime::now_utc())
                .await?
            {
                open_list(session, lines, json).await?;
            }
        }
        Command::Forget { name } => {
            let outcome = session
                .dispatch(Intent::ForgetList(name), OffsetDateTime::now_utc())
                .await?;
            print_lists(session.identity(), json);
            if let Outcome::Reload = outcome {
                open_list(session, lines, json).await?;
            }
        }
        Command::Share => {
            let public_url = config
                .public_url
                .as_deref()
                .ok_or_else(|| AppError::invalid_input("public_url is not configured"))?;
            let link = session
                .share_link(public_url)
                .ok_or_else(|| AppError::invalid_input("no list is open"))?;
            if json {
                let json = serde_json::json!({
                    "list_name": session.store().list_name(),
                    "link": link,
                });
                println!("{}", json);
            } else {
                println!("{link}");
            }
        }
    }

    Ok(())
}

async fn handle_line(
    session: &mut Session,
    lines: &mut InputLines,
    line: &str,
    config: &Config,
    json: bool,
) -> Result<Flow, AppError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Flow::Continue);
    }

    if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        return Ok(Flow::Exit);
    }

    if line == "help" || line == "?" {
        print_help();
        return Ok(Flow::Continue);
    }

    let args = split_command_line(line)?;
    if args.is_empty() {
        return Ok(Flow::Continue);
    }

    let mut argv = Vec::with_capacity(args.len() + 1);
    argv.push("recur".to_string());
    argv.extend(args);

    let cli = Cli::try_parse_from(argv).map_err(normalize_parse_error)?;
    if let Some(command) = cli.command {
        run_command(session, lines, command, config, json || cli.json).await?;
    }

    Ok(Flow::Continue)
}

/// Reads commands from stdin while the scheduler reopens due tasks. Both
/// run on one task, so manual and automatic updates never interleave.
async fn run_interactive(
    session: &mut Session,
    lines: &mut InputLines,
    config: &Config,
    json: bool,
) -> Result<(), AppError> {
    print_view(&session.view(), json)?;
    let mut ticker = session.scheduler().ticker();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = session.tick(OffsetDateTime::now_utc()).await;
                if !report.reopened.is_empty() || !report.failures.is_empty() {
                    print_tick_report(&report, session.sync_state(), json);
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.map_err(|err| AppError::io(err.to_string()))? else {
                    break;
                };

                match handle_line(session, lines, &line, config, json).await {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Exit) => break,
                    Err(err) => eprintln!("ERROR: {}", err),
                }
            }
        }
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let overrides = build_overrides(&cli.config_override).map_err(AppError::invalid_input)?;
    let loaded = load_config_with_fallback();
    let config = merge_overrides(&loaded.config, &overrides);
    init_tracing(&config.log_level);
    if let Some(err) = loaded.error {
        warn!(error = %err, "config could not be read, using defaults");
    }

    let mut identity = ListIdentity::open(&state_path()?)?;
    let mut entry = cli
        .open
        .as_deref()
        .map(EntryPoint::new)
        .unwrap_or_else(EntryPoint::root);
    let command = cli.command.unwrap_or(Command::Session);

    if command.is_local() {
        identity.adopt_shared_list_name(&mut entry)?;
        return run_local_command(&mut identity, command, cli.json);
    }

    let remote: Box<dyn RemoteTasks> = if cli.offline {
        info!("offline: tasks are kept in memory for this run");
        Box::new(MemoryRemote::new())
    } else {
        Box::new(PocketBaseRemote::new(
            &config.base_url,
            &config.collection_name,
            config.remote_timeout(),
        )?)
    };

    let mut session = Session::from_config(&config, identity, remote);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    session
        .start(&mut entry, &mut StdinPrompt::new(&mut lines))
        .await?;

    match command {
        Command::Session => run_interactive(&mut session, &mut lines, &config, cli.json).await,
        command => run_command(&mut session, &mut lines, command, &config, cli.json).await,
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("ERROR: {}", AppError::io(err.to_string()));
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(run(cli)) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
