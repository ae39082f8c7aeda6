use crate::api::ApiServer;
use crate::cli::JoinCliArgs;
use crate::config::Config;
use crate::meeting::{JoinMachine, JoinOutcome};
use crate::page::{MeetingPage, WebDriverPage};
use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};

/// Wire up a join session and run it to completion.
pub async fn run_join(args: JoinCliArgs) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(name) = args.name {
        config.meeting.display_name = name;
    }
    if args.headless {
        config.browser.headless = true;
    }

    let page: Arc<dyn MeetingPage> = Arc::new(WebDriverPage::connect(&config.browser).await?);
    let machine = JoinMachine::new(Arc::clone(&page), config.meeting.join_options());

    if config.api.enabled {
        let api_server = ApiServer::new(machine.status(), machine.roster(), config.api.port);
        tokio::spawn(async move {
            if let Err(e) = api_server.start().await {
                error!("API server failed: {}", e);
            }
        });
    }

    let outcome = match machine.run(&args.meeting_id, &args.passcode).await {
        Ok(outcome) => outcome,
        Err(e) => {
            let _ = page.close().await;
            return Err(e.into());
        }
    };

    match outcome {
        JoinOutcome::Ended => {
            info!("Meeting is already over, nothing to track");
        }
        JoinOutcome::Joined => {
            info!("Tracking attendance. Press Ctrl-C to leave.");
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Leaving meeting");
            machine.shutdown().await;

            let participants = machine.roster().snapshot().await;
            info!(
                "Attendance: {} participants seen, {} still present",
                participants.len(),
                participants.iter().filter(|p| p.present).count()
            );
        }
    }

    page.close().await?;
    Ok(())
}
