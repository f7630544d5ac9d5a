//! Infrastructure layer: persistence backends and outbound mail.

pub mod mail;
pub mod store;

pub use mail::{EmailMessage, LogMailer, MailError, Mailer, OutboxMailer};
pub use store::{
    CommentStore, Constraint, InMemoryStore, Page, Pagination, PostgresStore, ReferenceFilter,
    ReferenceStore, ReviewStore, Store, StoreError, TitleFilter, TitleStore, UserFilter, UserStore,
};
