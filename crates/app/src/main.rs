use std::sync::Arc;

use client::{
    Repository, Session,
    transport::{HttpTransport, StaticToken, TokenProvider},
};
use ledger::Group;
use tracing_subscriber::EnvFilter;

mod error;
mod settings;

#[tokio::main]
async fn main() -> error::Result<()> {
    let settings = settings::Settings::load()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "splitledger={level},client={level},ledger={level}",
            level = settings.app.level
        ))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
    tracing::debug!("loaded settings: {settings:?}");

    let credentials = settings
        .api
        .token
        .clone()
        .map(|token| Arc::new(StaticToken::new(token)) as Arc<dyn TokenProvider>);
    if credentials.is_none() {
        tracing::warn!("no api.token configured, requests are sent without credentials");
    }
    let transport = HttpTransport::new(&settings.api.base_url, settings.api.timeout(), credentials)?;
    let repository = Repository::new(Arc::new(transport));
    let mut session = Session::new(settings.session_config()?, repository);

    if settings.sync.refresh_groups_on_start
        && let Err(err) = report_groups(&mut session).await
    {
        tracing::error!("failed to load groups: {}", err.user_message());
    }

    session.start();
    let mut notifications = session.subscribe_notifications();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result?;
                tracing::info!("Shutting down...");
                break;
            }
            changed = notifications.changed() => {
                if changed.is_err() {
                    break;
                }
                let cache = notifications.borrow_and_update().clone();
                if let Some(err) = cache.last_error {
                    tracing::debug!("notification sync has {} failures, last: {err}", cache.failures);
                }
                if cache.has_pending_change {
                    report_notifications(&session).await;
                }
            }
        }
    }

    session.shutdown().await;
    Ok(())
}

/// Loads every group of the user and logs who owes what.
async fn report_groups(session: &mut Session) -> client::Result<()> {
    session.refresh_groups().await?;
    let ids: Vec<i64> = session.groups().iter().map(Group::id).collect();
    tracing::info!("Found {} groups", ids.len());

    for id in ids {
        let group = session.open_group(id).await?;
        for balance in group.balances()? {
            let who = group
                .member(balance.member)
                .map_or_else(|| balance.member.to_string(), |m| m.display_name().to_string());
            if balance.is_settled() {
                tracing::info!("[{}] {who} is settled up", group.name());
            } else if balance.owes() {
                tracing::info!(
                    "[{}] {who} owes {} {}",
                    group.name(),
                    balance.net_amount,
                    group.currency()
                );
            } else {
                tracing::info!(
                    "[{}] {who} is owed {} {}",
                    group.name(),
                    -balance.net_amount,
                    group.currency()
                );
            }
        }
    }
    Ok(())
}

async fn report_notifications(session: &Session) {
    match session.unread_notifications().await {
        Ok(notifications) => {
            for notification in notifications {
                tracing::info!(
                    "Notification {} ({}): {}",
                    notification.id,
                    notification.created_at,
                    notification.message
                );
            }
        }
        Err(err) => tracing::warn!("failed to pull notifications: {}", err.user_message()),
    }
}
