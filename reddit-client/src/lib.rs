pub mod api;
pub mod auth;
pub mod callback;
pub mod content;
pub mod deleter;

pub use api::{ContentPage, RedditApiClient, RedditSession, RedditUserData, UserContentApi};
pub use auth::{AuthState, Authenticator, RedditClient, RedditOAuth2Config, RedditToken};
pub use callback::{CallbackListener, CallbackPayload};
pub use content::{ContentItem, Deletable, RedditCommentData, RedditPostData};
pub use deleter::{ContentDeleter, ContentPager, DeleterConfig};
