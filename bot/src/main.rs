use std::sync::Arc;

use close_stale_bot::{
    api::{prometheus::PrometheusClient, GithubClient, GithubItem},
    config::{Env, Repository},
    mungers::{self, BotIdentity, MungeObject, Munger, MungerRegistry},
};
use futures::future::join_all;
use rocket::routes;
use tokio::signal;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

#[derive(Clone)]
struct Context {
    github: Arc<GithubClient>,
    prometheus: Arc<PrometheusClient>,
    mungers: Arc<Vec<Arc<dyn Munger>>>,
    repositories: Arc<Vec<Repository>>,
    dry_run: bool,
}

#[rocket::get("/metrics")]
async fn metrics(
    state: &rocket::State<Context>,
) -> Option<(
    rocket::http::ContentType,
    rocket::response::content::RawHtml<String>,
)> {
    let rate_limits = state.github.get_rate_limits().await.ok()?;
    state
        .prometheus
        .set_read_requests(rate_limits.resources.core.used as i64);
    let metrics = state.prometheus.encode().ok()?;
    Some((
        rocket::http::ContentType::new(
            "application/openmetrics-text",
            " version=1.0.0; charset=utf-8",
        ),
        rocket::response::content::RawHtml(metrics),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let env = envy::from_env::<Env>()?;

    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer());
    tracing::subscriber::set_global_default(subscriber)?;

    let repositories = env.repositories()?;
    let prometheus: Arc<PrometheusClient> = Default::default();
    let github = GithubClient::new(env.github_token.clone(), prometheus.clone()).await?;
    let identity = BotIdentity::new(github.user_handle.clone(), env.ci_bot_name.clone());
    let registry = MungerRegistry::with_defaults(identity)?;
    let mungers = registry.select(&env.mungers(), &env.features())?;

    info!(
        "Running as {} with mungers [{}] over {} repositories{}",
        github.user_handle,
        mungers.iter().map(|m| m.name()).collect::<Vec<_>>().join(", "),
        repositories.len(),
        if env.dry_run { " (dry run)" } else { "" }
    );

    let context = Context {
        github: github.into(),
        prometheus,
        mungers: mungers.into(),
        repositories: repositories.into(),
        dry_run: env.dry_run,
    };

    tokio::select! {
        _ = run(context.clone(), env.period()) => {
        }
        _ = signal::ctrl_c() => {
            tracing::warn!("Received SIGINT. Exiting.");
        }
        _ = rocket::build()
            .mount("/", routes![metrics])
            .manage(context)
            .launch() => {

            }
    }
    tracing::warn!("Exiting bot...");

    Ok(())
}

async fn run(context: Context, period: std::time::Duration) {
    tracing::warn!("Starting bot...");

    let mut interval: tokio::time::Interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        munge_loop(&context).await;
    }
}

#[instrument(skip(context))]
async fn munge_loop(context: &Context) {
    let started = chrono::Utc::now();

    for munger in context.mungers.iter() {
        if let Err(e) = munger.each_loop().await {
            error!("Loop hook of {} failed: {e:#}", munger.name());
        }
    }

    let listings = join_all(context.repositories.iter().map(|repository| async move {
        let items = context
            .github
            .list_open_items(&repository.owner, &repository.repo)
            .await;
        (repository, items)
    }))
    .await;

    for (repository, items) in listings {
        let items = match items {
            Ok(items) => items,
            Err(e) => {
                error!("Failed to list open items of {repository}: {e:#}");
                continue;
            }
        };

        let repository = repository.to_string();
        for item in items {
            let obj = GithubItem::new(context.github.clone(), item, context.dry_run);
            let now = chrono::Utc::now();

            for (munger, result) in mungers::munge_item(&obj, &context.mungers, now).await {
                match &result {
                    Ok(outcome) => debug!(
                        "{munger} on {}: {outcome:?}",
                        obj.item().repo_info.full_id
                    ),
                    Err(e) => error!(
                        "{munger} failed on {}, skipping until next loop: {e:#}",
                        obj.item().repo_info.full_id
                    ),
                }
                context.prometheus.record(munger, &repository, &result);
            }
        }
    }

    context.prometheus.observe_loop(started);
    info!("Munge loop finished");
}
