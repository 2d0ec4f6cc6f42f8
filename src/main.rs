use std::{process, sync::Arc, time::Duration};

use campus::{
    cache::CacheConfig,
    client::{HttpResourceClient, Resource},
    config::{self, Command, ListArgs, Settings, ShowArgs, WatchArgs},
    domain::ListQuery,
    hooks::{HookContext, use_item, use_list},
    infra::{error::AppError, telemetry},
    list::{ListController, ListView},
};
use campus_api_types::{AcademicYear, Blog, Domain, Formation, Mention, Offering, Tag, Writer};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

mod output;

const TARGET: &str = "campus::cli";

/// Binds `$entity` to the wire type of `$resource` for the body.
macro_rules! with_entity {
    ($resource:expr, $entity:ident => $body:expr) => {
        match $resource {
            Resource::Blogs => {
                type $entity = Blog;
                $body
            }
            Resource::Tags => {
                type $entity = Tag;
                $body
            }
            Resource::Writers => {
                type $entity = Writer;
                $body
            }
            Resource::Domains => {
                type $entity = Domain;
                $body
            }
            Resource::Mentions => {
                type $entity = Mention;
                $body
            }
            Resource::Formations => {
                type $entity = Formation;
                $body
            }
            Resource::AcademicYears => {
                type $entity = AcademicYear;
                $body
            }
            Resource::Offerings => {
                type $entity = Offering;
                $body
            }
        }
    };
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(target: TARGET, error = %error, "command failed");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(target: TARGET, error = %error, "command failed");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;

    let ctx = build_context(&settings)?;
    let janitor = ctx.store().spawn_janitor();

    let result = match cli_args.command {
        Command::List(args) => run_list(&ctx, &settings, args).await,
        Command::Show(args) => run_show(&ctx, args).await,
        Command::Watch(args) => run_watch(&ctx, &settings, args).await,
    };

    janitor.abort();
    let _ = janitor.await;

    result
}

fn build_context(settings: &Settings) -> Result<HookContext, AppError> {
    let base_url = settings.api.require_base_url()?;
    let client = HttpResourceClient::new(
        base_url.as_str(),
        settings.api.token.clone(),
        settings.api.timeout,
    )?;
    info!(
        target: TARGET,
        base_url = %client.base_url(),
        authenticated = settings.api.token.is_some(),
        "api client ready"
    );
    Ok(HookContext::from_client(
        Arc::new(client),
        CacheConfig::from(&settings.cache),
    ))
}

async fn run_list(ctx: &HookContext, settings: &Settings, args: ListArgs) -> Result<(), AppError> {
    let query = args
        .filters
        .to_query(settings.list.per_page)
        .map_err(AppError::usage)?;
    with_entity!(args.resource, E => list_page::<E>(ctx, args.resource, query).await)
}

async fn list_page<T>(ctx: &HookContext, resource: Resource, query: ListQuery) -> Result<(), AppError>
where
    T: DeserializeOwned + Serialize + Send + Sync + 'static,
{
    let hook = use_list::<T>(ctx, resource, query);
    let page = hook.resolve().await?;
    output::print_json(page.as_ref())
}

async fn run_show(ctx: &HookContext, args: ShowArgs) -> Result<(), AppError> {
    with_entity!(args.resource, E => show_item::<E>(ctx, args.resource, &args.id).await)
}

async fn show_item<T>(ctx: &HookContext, resource: Resource, id: &str) -> Result<(), AppError>
where
    T: DeserializeOwned + Serialize + Send + Sync + 'static,
{
    let hook = use_item::<T>(ctx, resource, id);
    let item = hook.resolve().await?;
    output::print_json(item.as_ref())
}

async fn run_watch(
    ctx: &HookContext,
    settings: &Settings,
    args: WatchArgs,
) -> Result<(), AppError> {
    if args.interval_secs == 0 {
        return Err(AppError::usage("--interval-secs must be greater than zero"));
    }
    let query = args
        .filters
        .to_query(settings.list.per_page)
        .map_err(AppError::usage)?;
    let controller = ListController::new(query, settings.list.search_debounce());
    let interval = Duration::from_secs(args.interval_secs);
    with_entity!(args.resource, E => {
        let view = ListView::<E>::mount(ctx, args.resource, controller);
        watch_view(view, interval, args.iterations).await
    })
}

/// Prints the first page, then revalidates every `interval` and prints
/// whenever the page content changes.
async fn watch_view<T>(
    view: ListView<T>,
    interval: Duration,
    iterations: Option<u32>,
) -> Result<(), AppError>
where
    T: DeserializeOwned + Serialize + Send + Sync + 'static,
{
    let first = view.resolve().await?;
    output::print_json(first.as_ref())?;
    let mut last_printed = serde_json::to_value(first.as_ref())
        .map_err(|e| AppError::unexpected(e.to_string()))?;

    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await; // Skip the first immediate tick
    let mut round: u32 = 0;
    while iterations.is_none_or(|limit| round < limit) {
        ticker.tick().await;
        round += 1;

        let state = view.hook().mutate().await;
        if let Some(error) = state.error.as_ref() {
            warn!(
                target: TARGET,
                round,
                error = %error,
                kept_data = state.data.is_some(),
                "revalidation failed"
            );
            continue;
        }
        let Some(data) = state.data else {
            continue;
        };
        view.controller().observe(data.as_ref());
        let current = serde_json::to_value(data.as_ref())
            .map_err(|e| AppError::unexpected(e.to_string()))?;
        if current != last_printed {
            output::print_json(&current)?;
            last_printed = current;
        } else {
            info!(target: TARGET, round, "no changes");
        }
    }
    Ok(())
}
