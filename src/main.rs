#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

use folio_client::config::{CaseStudyCommand, Command, Config, NotificationCommand, ProjectCommand};
use folio_client::domain::portfolio::CaseStudyQuery;
use folio_client::domain::user::{Credentials, Registration};
use folio_client::{FolioClient, GatewayError, telemetry};
use serde::Serialize;
use serde_json::json;
use tracing::Instrument;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();
    let telemetry_guard = telemetry::init_telemetry(&config.telemetry)?;

    let client = FolioClient::from_config(&config)?;
    let span = tracing::info_span!("command", base_url = %config.api.base_url);
    let result = run(&client, config.command).instrument(span).await;

    telemetry_guard.shutdown();

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.requires_login() => {
            tracing::error!("Session expired. Run `folio login` again.");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

async fn run(client: &FolioClient, command: Command) -> Result<(), GatewayError> {
    match command {
        Command::Login { email, password } => {
            print_json(&client.identity.login(&Credentials::new(email, password)).await?)?;
        }
        Command::Register { name, email, password } => {
            print_json(&client.identity.register(&Registration { name, email, password }).await?)?;
        }
        Command::Logout => client.identity.logout().await?,
        Command::Whoami => print_json(&client.identity.current_user().await?)?,
        Command::Status => {
            let logged_in = client.identity.is_logged_in().await?;
            let valid = logged_in && client.gateway.check_auth_status().await?;
            print_json(&json!({ "loggedIn": logged_in, "valid": valid }))?;
        }
        Command::Projects(command) => run_projects(client, command).await?,
        Command::CaseStudies(command) => run_case_studies(client, command).await?,
        Command::Notifications(command) => run_notifications(client, command).await?,
    }
    Ok(())
}

async fn run_projects(client: &FolioClient, command: ProjectCommand) -> Result<(), GatewayError> {
    match command {
        ProjectCommand::List => print_json(&client.projects.list().await?.items),
        ProjectCommand::Recent => print_json(&client.projects.recent().await?),
        ProjectCommand::Get { id } => print_json(&client.projects.get(&id).await?),
        ProjectCommand::Publish { id } => print_json(&client.projects.toggle_publish(&id).await?),
        ProjectCommand::Delete { id } => client.projects.delete(&id).await,
    }
}

async fn run_case_studies(client: &FolioClient, command: CaseStudyCommand) -> Result<(), GatewayError> {
    match command {
        CaseStudyCommand::List { page, limit, project } => {
            let query = CaseStudyQuery { page, limit, project, ..CaseStudyQuery::default() };
            let page = client.case_studies.list(&query).await?;
            print_json(&json!({ "count": page.count, "hasNext": page.has_next(), "items": page.items }))
        }
        CaseStudyCommand::Get { id } => print_json(&client.case_studies.get(&id).await?),
        CaseStudyCommand::Delete { id } => client.case_studies.delete(&id).await,
    }
}

async fn run_notifications(client: &FolioClient, command: NotificationCommand) -> Result<(), GatewayError> {
    match command {
        NotificationCommand::List => print_json(&client.notifications.list().await?.items),
        NotificationCommand::Recent => print_json(&client.notifications.recent().await?),
        NotificationCommand::Read { all: true, .. } => client.notifications.mark_all_read().await,
        NotificationCommand::Read { id: Some(id), .. } => print_json(&client.notifications.mark_read(&id).await?),
        NotificationCommand::Read { id: None, .. } => {
            Err(GatewayError::InvalidRequest("a notification id or --all is required".into()))
        }
        NotificationCommand::Delete { id } => client.notifications.delete(&id).await,
    }
}

#[allow(clippy::print_stdout)]
fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), GatewayError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
