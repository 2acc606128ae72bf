//! Public blog pages
//!
//! Each handler gathers its data through the services, shapes it with the
//! serializers in `api::responses`, and renders one template.

use axum::{
    extract::{Path, State},
    http::Uri,
    response::Html,
};
use tera::Context as TeraContext;

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::{
    serialize_post, serialize_post_detail, serialize_post_short, serialize_post_short_index,
    serialize_tag, PostShortResponse, TagResponse,
};
use crate::theme::StandardTemplateVars;

/// Posts in the "most popular" blocks
pub const POPULAR_LIMIT: usize = 5;
/// Fresh posts on the front page
pub const FRESH_LIMIT: usize = 5;
/// Tags in the "popular tags" block
pub const POPULAR_TAGS_LIMIT: usize = 5;
/// Posts listed on a tag page
pub const TAG_POSTS_LIMIT: usize = 20;

/// GET / - most liked posts, freshest posts and popular tags
pub async fn index(State(state): State<AppState>, uri: Uri) -> Result<Html<String>, ApiError> {
    let media_url = state.media.url.as_str();

    let most_popular: Vec<_> = state
        .post_service
        .popular(POPULAR_LIMIT)
        .await?
        .iter()
        .map(|p| serialize_post_short_index(p, media_url))
        .collect();
    let page_posts: Vec<_> = state
        .post_service
        .latest(FRESH_LIMIT)
        .await?
        .iter()
        .map(|p| serialize_post(p, media_url))
        .collect();

    let mut context = TeraContext::new();
    context.insert("most_popular_posts", &most_popular);
    context.insert("page_posts", &page_posts);
    context.insert("popular_tags", &popular_tags(&state).await?);

    render(&state, "index.html", &context, &uri)
}

/// GET /post/{slug} - a single post with its comments
pub async fn post_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    uri: Uri,
) -> Result<Html<String>, ApiError> {
    let post = state
        .post_service
        .get_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No post with slug '{}'", slug)))?;
    let comments = state.comment_service.list_for_post(post.post.id).await?;

    let mut context = TeraContext::new();
    context.insert(
        "post",
        &serialize_post_detail(&post, &comments, &state.media.url),
    );
    context.insert("popular_tags", &popular_tags(&state).await?);
    context.insert("most_popular_posts", &most_popular_short(&state).await?);

    render(&state, "post-details.html", &context, &uri)
}

/// GET /tag/{tag_title} - posts carrying a tag
pub async fn tag_filter(
    State(state): State<AppState>,
    Path(tag_title): Path<String>,
    uri: Uri,
) -> Result<Html<String>, ApiError> {
    let tag = state
        .tag_service
        .get_by_title(&tag_title)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No tag titled '{}'", tag_title)))?;

    let posts: Vec<_> = state
        .post_service
        .list_by_tag(tag.id, TAG_POSTS_LIMIT)
        .await?
        .iter()
        .map(|p| serialize_post(p, &state.media.url))
        .collect();

    let mut context = TeraContext::new();
    context.insert("tag", &tag.title);
    context.insert("popular_tags", &popular_tags(&state).await?);
    context.insert("posts", &posts);
    context.insert("most_popular_posts", &most_popular_short(&state).await?);

    render(&state, "posts-list.html", &context, &uri)
}

/// GET /contacts
pub async fn contacts(State(state): State<AppState>, uri: Uri) -> Result<Html<String>, ApiError> {
    render(&state, "contacts.html", &TeraContext::new(), &uri)
}

async fn popular_tags(state: &AppState) -> Result<Vec<TagResponse>, ApiError> {
    let tags = state.tag_service.popular(POPULAR_TAGS_LIMIT).await?;
    Ok(tags.iter().map(serialize_tag).collect())
}

async fn most_popular_short(state: &AppState) -> Result<Vec<PostShortResponse>, ApiError> {
    let posts = state.post_service.popular(POPULAR_LIMIT).await?;
    Ok(posts.iter().map(serialize_post_short).collect())
}

fn render(
    state: &AppState,
    template: &str,
    context: &TeraContext,
    uri: &Uri,
) -> Result<Html<String>, ApiError> {
    let vars = StandardTemplateVars::new(state.site.name.clone(), uri.path());
    let html = state
        .theme_engine
        .render_with_standard_vars(template, context, &vars)?;
    Ok(Html(html))
}
