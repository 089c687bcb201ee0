//! gworkspace CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use gworkspace_cli::cli::{
    BooksAction, Cli, Command, ConfigAction, ContactsAction, DocsAction, DriveAction, TasksAction,
};
use gworkspace_cli::commands;
use gworkspace_cli::config::CliConfig;
use gworkspace_cli::error::CliResult;
use gworkspace_core::tracing::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::cli()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(CliConfig::default_path);
    let config = CliConfig::load(cli.config.as_deref())?;
    let token = cli.token.as_deref();

    match cli.command {
        Command::Auth { logout: true, .. } => commands::auth::logout(&config),
        Command::Auth { force, .. } => commands::auth::login(&config, force).await,
        Command::Config { action } => match action {
            ConfigAction::Path => commands::config::path(&config_path),
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
        },
        Command::Calendars { json } => {
            commands::calendar::calendars(commands::transport(&config, token)?, &config.calendar, json)
                .await
        }
        Command::Events {
            calendars,
            days,
            no_expand,
            json,
        } => {
            commands::calendar::events(
                commands::transport(&config, token)?,
                &config.calendar,
                calendars,
                days,
                !no_expand,
                json,
            )
            .await
        }
        Command::Sheet { id, sheet, cell } => {
            commands::sheets::show(
                commands::transport(&config, token)?,
                &id,
                sheet.as_deref(),
                cell.as_deref(),
            )
            .await
        }
        Command::Tasks { action } => {
            let transport = commands::transport(&config, token)?;
            match action {
                TasksAction::Lists => commands::tasks::lists(transport).await,
                TasksAction::Show { title } => commands::tasks::show(transport, &title).await,
                TasksAction::Add { list, task } => commands::tasks::add(transport, &list, &task).await,
                TasksAction::Clear { title } => commands::tasks::clear(transport, &title).await,
            }
        }
        Command::Drive {
            action:
                DriveAction::Ls {
                    parent,
                    folders,
                    fields,
                },
        } => commands::drive::ls(commands::transport(&config, token)?, parent, folders, fields).await,
        Command::Drive {
            action: DriveAction::Upload { path, name, parent },
        } => {
            commands::drive::upload(
                commands::transport(&config, token)?,
                &path,
                name.as_deref(),
                parent.as_deref(),
            )
            .await
        }
        Command::Drive {
            action: DriveAction::Mkdir { name, parent },
        } => {
            commands::drive::mkdir(commands::transport(&config, token)?, &name, parent.as_deref())
                .await
        }
        Command::Drive {
            action:
                DriveAction::Share {
                    file_id,
                    email,
                    role,
                    quiet,
                },
        } => {
            commands::drive::share(
                commands::transport(&config, token)?,
                &file_id,
                &email,
                &role,
                !quiet,
            )
            .await
        }
        Command::Contacts {
            action: ContactsAction::Group { name },
        } => commands::contacts::group(commands::transport(&config, token)?, &name).await,
        Command::Books {
            action: BooksAction::Search { query, max_results },
        } => commands::books::search(commands::transport(&config, token)?, &query, max_results).await,
        Command::Docs {
            action: DocsAction::Title { id },
        } => commands::docs::title(commands::transport(&config, token)?, &id).await,
    }
}
