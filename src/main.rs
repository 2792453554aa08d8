use std::process;

use bacheca::{
    api::ApiClient,
    config::{self, Command},
    domain::posts::{NewPost, PostPage},
    error::AppError,
    infra::telemetry,
    query::{QueryClient, QueryConfig, QueryData, QuerySnapshot},
    shell::Shell,
    views::{render_post_detail, render_post_list, render_post_page},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(error.exit_code());
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(Command::Browse(config::BrowseArgs::default()));

    telemetry::init(&settings.logging)?;

    let api = ApiClient::new(&settings.api)?;

    match command {
        Command::Browse(_) => run_browse(api, &settings).await,
        Command::List(args) => run_list(api, args.page, args.json).await,
        Command::Show(args) => run_show(api, args.id, args.json).await,
        Command::Create(args) => run_create(api, &args.title, &args.body, args.json).await,
    }
}

async fn run_browse(api: ApiClient, settings: &config::Settings) -> Result<(), AppError> {
    let queries = QueryClient::new(&QueryConfig::from(&settings.query));
    info!(base_url = %settings.api.base_url, "Starting interactive shell");
    let mut shell = Shell::new(api, queries, settings.query.keep_previous_data);
    shell.run().await
}

async fn run_list(api: ApiClient, page: Option<u32>, json: bool) -> Result<(), AppError> {
    match page {
        Some(page) => {
            let slice = api.list_posts_page(page).await?;
            let data = PostPage::from_slice(page, api.page_size(), slice);
            if json {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                let snapshot = QuerySnapshot::success(QueryData::Page(data));
                println!("{}", render_post_page(&snapshot));
            }
        }
        None => {
            let posts = api.list_posts().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&posts)?);
            } else {
                let snapshot = QuerySnapshot::success(QueryData::Posts(posts));
                println!("{}", render_post_list(&snapshot));
            }
        }
    }
    Ok(())
}

async fn run_show(api: ApiClient, id: i64, json: bool) -> Result<(), AppError> {
    let post = api.get_post(id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&post)?);
    } else {
        let snapshot = QuerySnapshot::success(QueryData::Post(post));
        println!("{}", render_post_detail(&snapshot));
    }
    Ok(())
}

async fn run_create(api: ApiClient, title: &str, body: &str, json: bool) -> Result<(), AppError> {
    let draft = NewPost::new(title, body)?;
    let post = api.create_post(&draft).await?;
    info!(id = post.id, "Created post");
    if json {
        println!("{}", serde_json::to_string_pretty(&post)?);
    } else {
        let snapshot = QuerySnapshot::success(QueryData::Post(post));
        println!("{}", render_post_detail(&snapshot));
    }
    Ok(())
}
