//! Walkthrough binary: drives the client core against the in-memory store.
//!
//! Registers an author, drafts and publishes a post, then reads it back
//! anonymously. Every step is reported through `tracing`.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};
use ortho_config::OrthoConfig;
use tracing::{info, warn};

use blog_client::config::ClientSettings;
use blog_client::domain::{
    AccountService, Error, PostFields, PostListing, PostService, ProfileForm, ProfileService,
    SessionCache, SessionStore, SignUpForm, SignUpOutcome, SlugField, ViewScope,
};
use blog_client::outbound::memory::InMemoryBlogStore;
use blog_client::telemetry::init_tracing;

const AUTHOR_EMAIL: &str = "ada@example.test";

#[tokio::main]
async fn main() -> Result<(), Error> {
    let (settings, load_error) = match ClientSettings::load_from_iter(std::env::args_os()) {
        Ok(settings) => (settings, None),
        Err(err) => (ClientSettings::default(), Some(err.to_string())),
    };
    if let Err(e) = init_tracing(&settings) {
        warn!(error = %e, "tracing init failed");
    }
    if let Some(error) = load_error {
        warn!(%error, "configuration failed to load; using defaults");
    }

    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let store = Arc::new(
        InMemoryBlogStore::new(Arc::clone(&clock))
            .with_email_confirmation(settings.require_email_confirmation),
    );
    let cache = Arc::new(SessionCache::new());
    let sessions = Arc::new(SessionStore::new(Arc::clone(&store), Arc::clone(&cache)));
    let _listener = sessions.spawn_change_listener();
    let accounts = AccountService::new(Arc::clone(&sessions), Arc::clone(&store))
        .with_min_password_length(settings.min_password_length());
    let profiles = ProfileService::new(Arc::clone(&store), Arc::clone(&cache));
    let posts = PostService::new(Arc::clone(&store), Arc::clone(&store), Arc::clone(&cache));

    let initial = sessions.initialize().await;
    info!(session = %initial, "session resolved");

    let form = SignUpForm {
        email: AUTHOR_EMAIL.to_owned(),
        password: "correct horse".to_owned(),
        confirm_password: "correct horse".to_owned(),
        username: "ada".to_owned(),
    };
    match accounts.sign_up(&form).await? {
        SignUpOutcome::SignedIn(session) => info!(user_id = %session.user_id, "signed up"),
        SignUpOutcome::ConfirmationRequired { user_id } => {
            info!(%user_id, "confirming e-mail");
            let session = store
                .confirm_email(AUTHOR_EMAIL)
                .map_err(|err| Error::transient("confirming e-mail", err.to_string()))?;
            sessions.apply_external(Some(session)).await;
        }
    }
    let author = sessions.settled().await;

    let own = profiles.load_own_profile(&author).await?;
    let mut profile_form = ProfileForm::from(&own);
    profile_form.bio = "Writes about analytical engines.".to_owned();
    profiles
        .update_profile(&author, &own.id, &profile_form)
        .await?;

    let title = "我的第一篇";
    let mut slug = SlugField::new();
    slug.title_changed(title, clock.as_ref());
    let draft = posts
        .create_post(
            &author,
            &PostFields {
                title: title.to_owned(),
                content: "Hello, world.".to_owned(),
                slug: slug.value().to_owned(),
                is_published: false,
            },
        )
        .await?;
    info!(slug = %draft.slug, "draft saved");

    let mut listing = PostListing::default();
    listing.refresh(&posts, &author).await?;
    let published = listing.toggle_publish(&posts, &author, &draft.id).await?;
    info!(
        post_id = %published.id,
        is_published = published.is_published,
        rows = listing.posts().len(),
        "managed listing updated"
    );

    accounts.sign_out().await?;
    let visitor = sessions.current();

    let scope = ViewScope::open();
    let detail = scope
        .token()
        .run(posts.get_post_by_slug(&visitor, published.slug.as_ref()))
        .await;
    if let Some(view) = detail.transpose()? {
        info!(
            title = %view.post.title,
            author = ?view.author_username.as_ref().map(ToString::to_string),
            "visitor opened post"
        );
    }
    scope.close();

    let blog = posts.list_posts_by_username(&visitor, "ada").await?;
    info!(author = %blog.profile.username, posts = blog.posts.len(), "visitor listed blog");
    Ok(())
}
