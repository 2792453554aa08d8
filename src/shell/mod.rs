//! Interactive browsing shell.
//!
//! Owns the screen state machine and one observer per listing surface, and
//! turns parsed commands into rendered frames. Commands that fetch emit up
//! to two frames: a provisional one (loading line, placeholder, or retained
//! previous data) and the settled one.

mod command;

pub use command::{ParseError, ShellCommand, parse_command};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::domain::posts::{DEMO_AUTHOR_ID, NewPost, Post, PostPage};
use crate::error::AppError;
use crate::query::{
    KeyPrefix, Mutation, MutationState, QueryClient, QueryData, QueryKey, QueryObserver,
    QuerySnapshot,
};
use crate::views::{
    ComposeForm, render_cache_overview, render_compose, render_post_detail, render_post_feed,
    render_post_list, render_post_page,
};

/// Which surface the shell is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    List,
    Paginated { page: u32 },
    Infinite { loaded: u32 },
    Detail { id: i64 },
    Compose,
}

/// Result of dispatching one command.
#[derive(Debug)]
pub enum Outcome {
    /// Frames to print, in order.
    Frames(Vec<String>),
    Quit,
}

pub struct Shell {
    api: ApiClient,
    queries: QueryClient,
    list: QueryObserver,
    pages: QueryObserver,
    detail: QueryObserver,
    screen: Screen,
    compose: ComposeForm,
}

impl Shell {
    pub fn new(api: ApiClient, queries: QueryClient, keep_previous_data: bool) -> Self {
        let list = QueryObserver::new(queries.clone(), false).with_placeholder(QueryData::Posts(
            vec![Post {
                id: 123,
                title: String::from("Loading real posts"),
                body: String::new(),
                user_id: DEMO_AUTHOR_ID,
            }],
        ));
        let pages = QueryObserver::new(queries.clone(), keep_previous_data);
        let detail = QueryObserver::new(queries.clone(), false);
        Self {
            api,
            queries,
            list,
            pages,
            detail,
            screen: Screen::List,
            compose: ComposeForm::new(),
        }
    }

    /// Read commands from stdin until `quit` or end of input.
    pub async fn run(&mut self) -> Result<(), AppError> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        loop {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            match parse_command(&line) {
                Ok(command) => match self.dispatch(command).await {
                    Outcome::Quit => break,
                    Outcome::Frames(frames) => {
                        for frame in frames {
                            stdout.write_all(frame.as_bytes()).await?;
                            stdout.write_all(b"\n").await?;
                        }
                    }
                },
                Err(ParseError::Empty) => {}
                Err(error) => {
                    let hint = format!("{error} (type `help` for commands)\n");
                    stdout.write_all(hint.as_bytes()).await?;
                }
            }
        }
        Ok(())
    }

    pub async fn dispatch(&mut self, command: ShellCommand) -> Outcome {
        match command {
            ShellCommand::List => Outcome::Frames(self.show_list().await),
            ShellCommand::Pages => {
                let page = match self.screen {
                    Screen::Paginated { page } => page,
                    _ => 1,
                };
                Outcome::Frames(self.show_page(page).await)
            }
            ShellCommand::Next => self.flip_page(PageFlip::Next).await,
            ShellCommand::Prev => self.flip_page(PageFlip::Prev).await,
            ShellCommand::More => {
                let loaded = match self.screen {
                    Screen::Infinite { loaded } => {
                        let tail = self.queries.snapshot(&QueryKey::PostsPage { page: loaded });
                        let next = tail
                            .data
                            .as_ref()
                            .and_then(QueryData::as_page)
                            .and_then(|page| page.next_page);
                        match next {
                            Some(_) => loaded + 1,
                            None => {
                                return Outcome::Frames(vec![String::from("(no more pages)")]);
                            }
                        }
                    }
                    _ => 1,
                };
                Outcome::Frames(self.show_feed(loaded).await)
            }
            ShellCommand::Open { id } => Outcome::Frames(self.show_detail(id).await),
            ShellCommand::Peek { id } => {
                let key = QueryKey::Post { id };
                let api = &self.api;
                self.queries
                    .prefetch(&key, move || async move {
                        api.get_post(id).await.map(QueryData::Post)
                    })
                    .await;
                let notice = if self.queries.snapshot(&key).data.is_some() {
                    format!("(warmed cache for post {id})")
                } else {
                    format!("(could not warm post {id})")
                };
                Outcome::Frames(vec![notice])
            }
            ShellCommand::Compose => {
                self.screen = Screen::Compose;
                Outcome::Frames(vec![render_compose(&self.compose)])
            }
            ShellCommand::Title { text } => {
                self.screen = Screen::Compose;
                self.compose.title = text;
                self.compose.error = None;
                Outcome::Frames(vec![render_compose(&self.compose)])
            }
            ShellCommand::Body { text } => {
                self.screen = Screen::Compose;
                self.compose.body = text;
                self.compose.error = None;
                Outcome::Frames(vec![render_compose(&self.compose)])
            }
            ShellCommand::Submit => self.submit().await,
            ShellCommand::Cancel => {
                self.compose = ComposeForm::new();
                self.screen = Screen::List;
                Outcome::Frames(vec![String::from("(draft discarded)")])
            }
            ShellCommand::Refresh => self.refresh().await,
            ShellCommand::Cache => {
                Outcome::Frames(vec![render_cache_overview(&self.queries.overview())])
            }
            ShellCommand::Help => Outcome::Frames(vec![usage()]),
            ShellCommand::Quit => Outcome::Quit,
        }
    }

    async fn show_list(&mut self) -> Vec<String> {
        self.screen = Screen::List;
        self.list.set_key(QueryKey::Posts);

        let mut frames = Vec::new();
        let provisional = self.list.snapshot();
        if provisional.is_provisional() {
            frames.push(render_post_list(&provisional));
        }
        let api = &self.api;
        let settled = self
            .list
            .refresh(move || async move { api.list_posts().await.map(QueryData::Posts) })
            .await;
        frames.push(render_post_list(&settled));
        frames
    }

    async fn show_page(&mut self, page: u32) -> Vec<String> {
        self.screen = Screen::Paginated { page };
        self.pages.set_key(QueryKey::PostsPage { page });

        let mut frames = Vec::new();
        let provisional = self.pages.snapshot();
        if provisional.is_provisional() {
            frames.push(render_post_page(&provisional));
        }
        let api = &self.api;
        let settled = self.pages.refresh(move || fetch_page(api, page)).await;
        frames.push(render_post_page(&settled));

        // Warm the next page so the flip lands instantly.
        let next = settled
            .data
            .as_ref()
            .and_then(QueryData::as_page)
            .and_then(|data| data.next_page);
        if let Some(next) = next {
            let key = QueryKey::PostsPage { page: next };
            self.queries
                .prefetch(&key, move || fetch_page(api, next))
                .await;
        }
        frames
    }

    async fn show_feed(&mut self, loaded: u32) -> Vec<String> {
        self.screen = Screen::Infinite { loaded };
        let keys: Vec<QueryKey> = (1..=loaded)
            .map(|page| QueryKey::PostsPage { page })
            .collect();

        let mut frames = Vec::new();
        let provisional: Vec<QuerySnapshot> =
            keys.iter().map(|key| self.queries.snapshot(key)).collect();
        if provisional.iter().any(QuerySnapshot::is_provisional) {
            frames.push(render_post_feed(&provisional));
        }

        let api = &self.api;
        let mut settled = Vec::with_capacity(keys.len());
        for (index, key) in keys.iter().enumerate() {
            let page = index as u32 + 1;
            settled.push(
                self.queries
                    .fetch(key, move || fetch_page(api, page))
                    .await,
            );
        }
        frames.push(render_post_feed(&settled));
        frames
    }

    async fn show_detail(&mut self, id: i64) -> Vec<String> {
        self.screen = Screen::Detail { id };
        self.detail.set_key(QueryKey::Post { id });

        let mut frames = Vec::new();
        let provisional = self.detail.snapshot();
        if provisional.is_provisional() {
            frames.push(render_post_detail(&provisional));
        }
        let api = &self.api;
        let settled = self
            .detail
            .refresh(move || async move { api.get_post(id).await.map(QueryData::Post) })
            .await;
        frames.push(render_post_detail(&settled));
        frames
    }

    async fn flip_page(&mut self, direction: PageFlip) -> Outcome {
        let Screen::Paginated { .. } = self.screen else {
            return Outcome::Frames(vec![String::from(
                "(not on the pages screen; type `pages`)",
            )]);
        };
        let current = self.pages.snapshot();
        let target = current
            .data
            .as_ref()
            .and_then(QueryData::as_page)
            .and_then(|page| match direction {
                PageFlip::Next => page.next_page,
                PageFlip::Prev => page.previous_page,
            });
        match target {
            Some(page) => Outcome::Frames(self.show_page(page).await),
            None => {
                let notice = match direction {
                    PageFlip::Next => "(no next page)",
                    PageFlip::Prev => "(no previous page)",
                };
                Outcome::Frames(vec![String::from(notice)])
            }
        }
    }

    async fn submit(&mut self) -> Outcome {
        if self.compose.submitting {
            return Outcome::Frames(vec![String::from("(a submission is already in flight)")]);
        }
        let draft = match self.compose.draft() {
            Ok(draft) => draft,
            Err(error) => {
                self.compose.error = Some(error.to_string());
                return Outcome::Frames(vec![render_compose(&self.compose)]);
            }
        };

        self.compose.error = None;
        self.compose.submitting = true;
        let mut frames = vec![render_compose(&self.compose)];

        let mut mutation: Mutation<NewPost, Post, ()> = Mutation::new()
            .on_mutate(|vars: &NewPost| {
                debug!(title = %vars.title, "Submitting draft");
            })
            .on_success({
                let queries = self.queries.clone();
                move |post: &Post, _vars: &NewPost, _ctx: &()| {
                    info!(id = post.id, "Post created; invalidating listings");
                    queries.invalidate(&KeyPrefix::Posts);
                }
            })
            .on_error(|error: &ApiError, _vars: &NewPost, _ctx: &()| {
                warn!(error = %error, "Post submission failed");
            })
            .on_settled(|_value, _error, _vars, _ctx| {
                debug!("Submission settled");
            });

        let api = &self.api;
        let outcome = mutation
            .run(draft, move |vars| async move {
                api.create_post(&vars).await
            })
            .await;

        self.compose.submitting = false;
        match outcome.state {
            MutationState::Success(post) => {
                self.compose = ComposeForm::new();
                frames.push(format!("Created post {}", post.id));
                frames.extend(self.show_detail(post.id).await);
            }
            MutationState::Error(error) => {
                self.compose.error = Some(error.to_string());
                frames.push(render_compose(&self.compose));
            }
        }
        Outcome::Frames(frames)
    }

    async fn refresh(&mut self) -> Outcome {
        match self.screen {
            Screen::List => {
                self.queries.invalidate(&KeyPrefix::Posts);
                Outcome::Frames(self.show_list().await)
            }
            Screen::Paginated { page } => {
                self.queries.invalidate(&KeyPrefix::Posts);
                Outcome::Frames(self.show_page(page).await)
            }
            Screen::Infinite { loaded } => {
                self.queries.invalidate(&KeyPrefix::Posts);
                Outcome::Frames(self.show_feed(loaded).await)
            }
            Screen::Detail { id } => {
                self.queries.invalidate(&KeyPrefix::Post(id));
                Outcome::Frames(self.show_detail(id).await)
            }
            Screen::Compose => {
                Outcome::Frames(vec![String::from("(nothing to refresh while composing)")])
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum PageFlip {
    Next,
    Prev,
}

async fn fetch_page(api: &ApiClient, page: u32) -> Result<QueryData, ApiError> {
    let slice = api.list_posts_page(page).await?;
    Ok(QueryData::Page(PostPage::from_slice(
        page,
        api.page_size(),
        slice,
    )))
}

fn usage() -> String {
    [
        "Commands:",
        "  list              show all posts",
        "  pages             paginated browsing (next / prev to flip)",
        "  more              load one more feed page",
        "  open <id>         show one post",
        "  peek <id>         warm the cache for one post",
        "  compose           start a draft (title <text>, body <text>)",
        "  submit / cancel   send or discard the draft",
        "  refresh           invalidate and refetch the current screen",
        "  cache             dump cache entries",
        "  help              this text",
        "  quit              leave",
    ]
    .join("\n")
}
