use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use yamdb_auth::{NewUser, User};
use yamdb_core::{
    score, AuthorRef, Comment, CommentId, Email, NewComment, NewReference, NewReview, NewTitle,
    RatedTitle, ReferenceEntry, ReferenceId, ReferenceKind, ReleaseYear, Review, ReviewId, Score,
    Title, TitleId, UserId,
};

use super::query::contains_ci;
use super::{
    CommentStore, Constraint, Page, Pagination, ReferenceFilter, ReferenceStore, ReviewStore,
    StoreError, TitleFilter, TitleStore, UserFilter, UserStore,
};

#[derive(Debug, Clone)]
struct ReferenceRow {
    kind: ReferenceKind,
    entry: ReferenceEntry,
}

#[derive(Debug, Clone)]
struct TitleRow {
    id: TitleId,
    name: String,
    year: ReleaseYear,
    description: String,
    category: Option<ReferenceId>,
    genres: Vec<ReferenceId>,
}

#[derive(Debug, Clone)]
struct ReviewRow {
    id: ReviewId,
    title_id: TitleId,
    author_id: UserId,
    score: Score,
    text: Option<String>,
    pub_date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct CommentRow {
    id: CommentId,
    review_id: Option<ReviewId>,
    author_id: UserId,
    text: String,
    pub_date: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    last_id: i64,
    users: BTreeMap<UserId, User>,
    references: BTreeMap<ReferenceId, ReferenceRow>,
    titles: BTreeMap<TitleId, TitleRow>,
    reviews: BTreeMap<ReviewId, ReviewRow>,
    comments: BTreeMap<CommentId, CommentRow>,
}

impl Tables {
    /// One sequence for all tables; ids only need to be unique per table.
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn email_taken(&self, email: &Email, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| &u.email == email && Some(u.id) != except)
    }

    fn username_taken(&self, username: &str, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| u.username.as_str() == username && Some(u.id) != except)
    }

    fn reference(&self, kind: ReferenceKind, id: ReferenceId) -> Option<&ReferenceEntry> {
        self.references
            .get(&id)
            .filter(|row| row.kind == kind)
            .map(|row| &row.entry)
    }

    fn reference_by_slug(&self, kind: ReferenceKind, slug: &str) -> Option<&ReferenceEntry> {
        self.references
            .values()
            .find(|row| row.kind == kind && row.entry.slug.as_str() == slug)
            .map(|row| &row.entry)
    }

    fn author(&self, id: UserId) -> AuthorRef {
        AuthorRef {
            id,
            username: self
                .users
                .get(&id)
                .map(|u| u.username.as_str().to_string())
                .unwrap_or_default(),
        }
    }

    fn check_title_refs(&self, new: &NewTitle) -> Result<(), StoreError> {
        if let Some(category) = new.category {
            if self.reference(ReferenceKind::Category, category).is_none() {
                return Err(StoreError::MissingReference("category"));
            }
        }
        if new
            .genres
            .iter()
            .any(|g| self.reference(ReferenceKind::Genre, *g).is_none())
        {
            return Err(StoreError::MissingReference("genre"));
        }
        Ok(())
    }

    fn hydrate_title(&self, row: &TitleRow) -> Title {
        Title {
            id: row.id,
            name: row.name.clone(),
            year: row.year,
            description: row.description.clone(),
            genres: row
                .genres
                .iter()
                .filter_map(|g| self.reference(ReferenceKind::Genre, *g).cloned())
                .collect(),
            category: row
                .category
                .and_then(|c| self.reference(ReferenceKind::Category, c).cloned()),
        }
    }

    fn rate_title(&self, row: &TitleRow) -> RatedTitle {
        let rating = score::average(
            self.reviews
                .values()
                .filter(|r| r.title_id == row.id)
                .map(|r| r.score),
        );
        RatedTitle {
            title: self.hydrate_title(row),
            rating,
        }
    }

    fn hydrate_review(&self, row: &ReviewRow) -> Review {
        Review {
            id: row.id,
            title_id: row.title_id,
            author: self.author(row.author_id),
            score: row.score,
            text: row.text.clone(),
            pub_date: row.pub_date,
        }
    }

    fn hydrate_comment(&self, row: &CommentRow) -> Comment {
        Comment {
            id: row.id,
            review_id: row.review_id,
            author: self.author(row.author_id),
            text: row.text.clone(),
            pub_date: row.pub_date,
        }
    }

    fn remove_review(&mut self, id: ReviewId) -> bool {
        let existed = self.reviews.remove(&id).is_some();
        if existed {
            self.comments.retain(|_, c| c.review_id != Some(id));
        }
        existed
    }
}

/// In-memory store for tests/dev.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let mut t = self.write()?;
        if t.email_taken(&new.email, None) {
            return Err(StoreError::Unique(Constraint::UserEmail));
        }
        if t.username_taken(new.username.as_str(), None) {
            return Err(StoreError::Unique(Constraint::UserUsername));
        }
        let id = UserId::new(t.next_id());
        let user = User {
            id,
            email: new.email,
            username: new.username,
            first_name: new.first_name,
            last_name: new.last_name,
            bio: new.bio,
            role: new.role,
            is_active: true,
            is_staff: new.is_staff,
            is_superuser: new.is_superuser,
            password_hash: new.password_hash,
            last_login: None,
            date_joined: Utc::now(),
        };
        t.users.insert(id, user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.values().find(|u| &u.email == email).cloned())
    }

    async fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.username.as_str() == username)
            .cloned())
    }

    async fn list_users(&self, filter: &UserFilter, page: Pagination) -> Result<Page<User>, StoreError> {
        let t = self.read()?;
        let rows: Vec<User> = t
            .users
            .values()
            .rev()
            .filter(|u| filter.username.as_deref().is_none_or(|name| u.username.as_str() == name))
            .filter(|u| filter.search.as_deref().is_none_or(|s| contains_ci(u.username.as_str(), s)))
            .cloned()
            .collect();
        Ok(Page::slice(rows, page))
    }

    async fn update_user(&self, user: &User) -> Result<User, StoreError> {
        let mut t = self.write()?;
        let last_login = t.users.get(&user.id).ok_or(StoreError::NotFound)?.last_login;
        if t.email_taken(&user.email, Some(user.id)) {
            return Err(StoreError::Unique(Constraint::UserEmail));
        }
        if t.username_taken(user.username.as_str(), Some(user.id)) {
            return Err(StoreError::Unique(Constraint::UserUsername));
        }
        let updated = User {
            last_login,
            ..user.clone()
        };
        t.users.insert(user.id, updated.clone());
        Ok(updated)
    }

    async fn record_login(
        &self,
        id: UserId,
        expected: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut t = self.write()?;
        match t.users.get_mut(&id) {
            Some(user) if user.last_login == expected => {
                user.last_login = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        let mut t = self.write()?;
        if t.users.remove(&id).is_none() {
            return Ok(false);
        }
        let authored: Vec<ReviewId> = t
            .reviews
            .values()
            .filter(|r| r.author_id == id)
            .map(|r| r.id)
            .collect();
        for review in authored {
            t.remove_review(review);
        }
        t.comments.retain(|_, c| c.author_id != id);
        Ok(true)
    }
}

#[async_trait]
impl ReferenceStore for InMemoryStore {
    async fn create_reference(&self, kind: ReferenceKind, new: NewReference) -> Result<ReferenceEntry, StoreError> {
        let mut t = self.write()?;
        if t.reference_by_slug(kind, new.slug.as_str()).is_some() {
            return Err(StoreError::Unique(Constraint::ReferenceSlug));
        }
        let entry = ReferenceEntry {
            id: ReferenceId::new(t.next_id()),
            name: new.name,
            slug: new.slug,
        };
        t.references.insert(
            entry.id,
            ReferenceRow {
                kind,
                entry: entry.clone(),
            },
        );
        Ok(entry)
    }

    async fn list_references(
        &self,
        kind: ReferenceKind,
        filter: &ReferenceFilter,
        page: Pagination,
    ) -> Result<Page<ReferenceEntry>, StoreError> {
        let t = self.read()?;
        let rows: Vec<ReferenceEntry> = t
            .references
            .values()
            .rev()
            .filter(|row| row.kind == kind)
            .map(|row| &row.entry)
            .filter(|e| filter.name.as_deref().is_none_or(|n| e.name == n))
            .filter(|e| filter.search.as_deref().is_none_or(|s| contains_ci(&e.name, s)))
            .cloned()
            .collect();
        Ok(Page::slice(rows, page))
    }

    async fn reference_by_slug(&self, kind: ReferenceKind, slug: &str) -> Result<Option<ReferenceEntry>, StoreError> {
        Ok(self.read()?.reference_by_slug(kind, slug).cloned())
    }

    async fn delete_reference(&self, kind: ReferenceKind, slug: &str) -> Result<bool, StoreError> {
        let mut t = self.write()?;
        let Some(id) = t.reference_by_slug(kind, slug).map(|e| e.id) else {
            return Ok(false);
        };
        t.references.remove(&id);
        for title in t.titles.values_mut() {
            match kind {
                ReferenceKind::Category => {
                    if title.category == Some(id) {
                        title.category = None;
                    }
                }
                ReferenceKind::Genre => title.genres.retain(|g| *g != id),
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl TitleStore for InMemoryStore {
    async fn create_title(&self, new: NewTitle) -> Result<Title, StoreError> {
        let mut t = self.write()?;
        t.check_title_refs(&new)?;
        let id = TitleId::new(t.next_id());
        let row = TitleRow {
            id,
            genres: new.unique_genres(),
            name: new.name,
            year: new.year,
            description: new.description,
            category: new.category,
        };
        let title = t.hydrate_title(&row);
        t.titles.insert(id, row);
        Ok(title)
    }

    async fn title_by_id(&self, id: TitleId) -> Result<Option<RatedTitle>, StoreError> {
        let t = self.read()?;
        Ok(t.titles.get(&id).map(|row| t.rate_title(row)))
    }

    async fn list_titles(&self, filter: &TitleFilter, page: Pagination) -> Result<Page<RatedTitle>, StoreError> {
        let t = self.read()?;
        let category = filter.category.as_deref();
        let genre = filter.genre.as_deref();

        let mut rows: Vec<&TitleRow> = t
            .titles
            .values()
            .filter(|row| {
                category.is_none_or(|slug| {
                    row.category
                        .and_then(|c| t.reference(ReferenceKind::Category, c))
                        .is_some_and(|c| c.slug.as_str() == slug)
                })
            })
            .filter(|row| {
                genre.is_none_or(|slug| {
                    row.genres.iter().any(|g| {
                        t.reference(ReferenceKind::Genre, *g)
                            .is_some_and(|e| e.slug.as_str() == slug)
                    })
                })
            })
            .filter(|row| filter.name.as_deref().is_none_or(|n| contains_ci(&row.name, n)))
            .filter(|row| filter.year.is_none_or(|y| i64::from(row.year.get()) == y))
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        let rated = rows.into_iter().map(|row| t.rate_title(row)).collect();
        Ok(Page::slice(rated, page))
    }

    async fn replace_title(&self, id: TitleId, new: NewTitle) -> Result<Title, StoreError> {
        let mut t = self.write()?;
        if !t.titles.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        t.check_title_refs(&new)?;
        let row = TitleRow {
            id,
            genres: new.unique_genres(),
            name: new.name,
            year: new.year,
            description: new.description,
            category: new.category,
        };
        let title = t.hydrate_title(&row);
        t.titles.insert(id, row);
        Ok(title)
    }

    async fn delete_title(&self, id: TitleId) -> Result<bool, StoreError> {
        let mut t = self.write()?;
        if t.titles.remove(&id).is_none() {
            return Ok(false);
        }
        let reviews: Vec<ReviewId> = t
            .reviews
            .values()
            .filter(|r| r.title_id == id)
            .map(|r| r.id)
            .collect();
        for review in reviews {
            t.remove_review(review);
        }
        Ok(true)
    }
}

#[async_trait]
impl ReviewStore for InMemoryStore {
    async fn create_review(&self, new: NewReview) -> Result<Review, StoreError> {
        let mut t = self.write()?;
        if !t.titles.contains_key(&new.title_id) {
            return Err(StoreError::MissingReference("title"));
        }
        if !t.users.contains_key(&new.author_id) {
            return Err(StoreError::MissingReference("author"));
        }
        if t
            .reviews
            .values()
            .any(|r| r.title_id == new.title_id && r.author_id == new.author_id)
        {
            return Err(StoreError::Unique(Constraint::ReviewAuthorTitle));
        }
        let row = ReviewRow {
            id: ReviewId::new(t.next_id()),
            title_id: new.title_id,
            author_id: new.author_id,
            score: new.score,
            text: new.text,
            pub_date: Utc::now(),
        };
        let review = t.hydrate_review(&row);
        t.reviews.insert(row.id, row);
        Ok(review)
    }

    async fn review_in_title(&self, title_id: TitleId, review_id: ReviewId) -> Result<Option<Review>, StoreError> {
        let t = self.read()?;
        Ok(t.reviews
            .get(&review_id)
            .filter(|r| r.title_id == title_id)
            .map(|r| t.hydrate_review(r)))
    }

    async fn review_by_author(&self, title_id: TitleId, author_id: UserId) -> Result<Option<Review>, StoreError> {
        let t = self.read()?;
        Ok(t.reviews
            .values()
            .find(|r| r.title_id == title_id && r.author_id == author_id)
            .map(|r| t.hydrate_review(r)))
    }

    async fn list_reviews(&self, title_id: TitleId, page: Pagination) -> Result<Page<Review>, StoreError> {
        let t = self.read()?;
        let mut rows: Vec<&ReviewRow> = t.reviews.values().filter(|r| r.title_id == title_id).collect();
        rows.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        let reviews = rows.into_iter().map(|r| t.hydrate_review(r)).collect();
        Ok(Page::slice(reviews, page))
    }

    async fn update_review(&self, id: ReviewId, score: Score, text: Option<String>) -> Result<Review, StoreError> {
        let mut t = self.write()?;
        let row = t.reviews.get_mut(&id).ok_or(StoreError::NotFound)?;
        row.score = score;
        row.text = text;
        let row = row.clone();
        Ok(t.hydrate_review(&row))
    }

    async fn delete_review(&self, id: ReviewId) -> Result<bool, StoreError> {
        Ok(self.write()?.remove_review(id))
    }
}

#[async_trait]
impl CommentStore for InMemoryStore {
    async fn create_comment(&self, new: NewComment) -> Result<Comment, StoreError> {
        let mut t = self.write()?;
        if !t.reviews.contains_key(&new.review_id) {
            return Err(StoreError::MissingReference("review"));
        }
        if !t.users.contains_key(&new.author_id) {
            return Err(StoreError::MissingReference("author"));
        }
        let row = CommentRow {
            id: CommentId::new(t.next_id()),
            review_id: Some(new.review_id),
            author_id: new.author_id,
            text: new.text,
            pub_date: Utc::now(),
        };
        let comment = t.hydrate_comment(&row);
        t.comments.insert(row.id, row);
        Ok(comment)
    }

    async fn comment_in_review(&self, review_id: ReviewId, comment_id: CommentId) -> Result<Option<Comment>, StoreError> {
        let t = self.read()?;
        Ok(t.comments
            .get(&comment_id)
            .filter(|c| c.review_id == Some(review_id))
            .map(|c| t.hydrate_comment(c)))
    }

    async fn list_comments(&self, review_id: ReviewId, page: Pagination) -> Result<Page<Comment>, StoreError> {
        let t = self.read()?;
        let mut rows: Vec<&CommentRow> = t
            .comments
            .values()
            .filter(|c| c.review_id == Some(review_id))
            .collect();
        rows.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        let comments = rows.into_iter().map(|c| t.hydrate_comment(c)).collect();
        Ok(Page::slice(comments, page))
    }

    async fn update_comment(&self, id: CommentId, text: String) -> Result<Comment, StoreError> {
        let mut t = self.write()?;
        let row = t.comments.get_mut(&id).ok_or(StoreError::NotFound)?;
        row.text = text;
        let row = row.clone();
        Ok(t.hydrate_comment(&row))
    }

    async fn delete_comment(&self, id: CommentId) -> Result<bool, StoreError> {
        Ok(self.write()?.comments.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yamdb_auth::Username;

    async fn user(store: &InMemoryStore, name: &str) -> User {
        let email = Email::parse(&format!("{name}@example.com")).unwrap();
        let username = Username::parse(name).unwrap();
        store
            .create_user(NewUser::with_random_password(email, username))
            .await
            .unwrap()
    }

    async fn reference(store: &InMemoryStore, kind: ReferenceKind, slug: &str) -> ReferenceEntry {
        store
            .create_reference(kind, NewReference::new(slug, slug).unwrap())
            .await
            .unwrap()
    }

    fn new_title(name: &str, category: Option<ReferenceId>, genres: Vec<ReferenceId>) -> NewTitle {
        NewTitle {
            name: name.to_string(),
            year: ReleaseYear::new(2000).unwrap(),
            description: String::new(),
            category,
            genres,
        }
    }

    fn review(title_id: TitleId, author_id: UserId, score: i64) -> NewReview {
        NewReview {
            title_id,
            author_id,
            score: Score::new(score).unwrap(),
            text: None,
        }
    }

    #[tokio::test]
    async fn duplicate_email_and_username_are_rejected() {
        let store = InMemoryStore::new();
        user(&store, "alice").await;

        let same_email = NewUser::with_random_password(
            Email::parse("alice@example.com").unwrap(),
            Username::parse("other").unwrap(),
        );
        assert!(matches!(
            store.create_user(same_email).await,
            Err(StoreError::Unique(Constraint::UserEmail))
        ));

        let same_name = NewUser::with_random_password(
            Email::parse("other@example.com").unwrap(),
            Username::parse("alice").unwrap(),
        );
        assert!(matches!(
            store.create_user(same_name).await,
            Err(StoreError::Unique(Constraint::UserUsername))
        ));
    }

    #[tokio::test]
    async fn deleting_category_detaches_titles() {
        let store = InMemoryStore::new();
        let films = reference(&store, ReferenceKind::Category, "films").await;
        let title = store
            .create_title(new_title("Heat", Some(films.id), vec![]))
            .await
            .unwrap();
        assert_eq!(title.category.as_ref().map(|c| c.slug.as_str()), Some("films"));

        assert!(store.delete_reference(ReferenceKind::Category, "films").await.unwrap());

        let reloaded = store.title_by_id(title.id).await.unwrap().unwrap();
        assert_eq!(reloaded.title.category, None);
    }

    #[tokio::test]
    async fn deleting_genre_unlinks_it() {
        let store = InMemoryStore::new();
        let drama = reference(&store, ReferenceKind::Genre, "drama").await;
        let crime = reference(&store, ReferenceKind::Genre, "crime").await;
        let title = store
            .create_title(new_title("Heat", None, vec![drama.id, crime.id]))
            .await
            .unwrap();

        store.delete_reference(ReferenceKind::Genre, "drama").await.unwrap();
        let reloaded = store.title_by_id(title.id).await.unwrap().unwrap();
        let slugs: Vec<&str> = reloaded.title.genres.iter().map(|g| g.slug.as_str()).collect();
        assert_eq!(slugs, vec!["crime"]);
    }

    #[tokio::test]
    async fn slugs_are_unique_per_kind_only() {
        let store = InMemoryStore::new();
        reference(&store, ReferenceKind::Genre, "drama").await;
        reference(&store, ReferenceKind::Category, "drama").await;
        let again = store
            .create_reference(ReferenceKind::Genre, NewReference::new("Drama", "drama").unwrap())
            .await;
        assert!(matches!(again, Err(StoreError::Unique(Constraint::ReferenceSlug))));
    }

    #[tokio::test]
    async fn unknown_references_are_rejected() {
        let store = InMemoryStore::new();
        let genre = reference(&store, ReferenceKind::Genre, "drama").await;
        // A genre id is not a valid category id.
        let res = store.create_title(new_title("Heat", Some(genre.id), vec![])).await;
        assert!(matches!(res, Err(StoreError::MissingReference("category"))));
    }

    #[tokio::test]
    async fn one_review_per_author_and_title() {
        let store = InMemoryStore::new();
        let alice = user(&store, "alice").await;
        let title = store.create_title(new_title("Heat", None, vec![])).await.unwrap();

        store.create_review(review(title.id, alice.id, 7)).await.unwrap();
        let second = store.create_review(review(title.id, alice.id, 9)).await;
        assert!(matches!(second, Err(StoreError::Unique(Constraint::ReviewAuthorTitle))));
    }

    #[tokio::test]
    async fn rating_is_average_or_none() {
        let store = InMemoryStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let rated = store.create_title(new_title("Alien", None, vec![])).await.unwrap();
        let unrated = store.create_title(new_title("Brazil", None, vec![])).await.unwrap();

        store.create_review(review(rated.id, alice.id, 8)).await.unwrap();
        store.create_review(review(rated.id, bob.id, 10)).await.unwrap();

        let page = store
            .list_titles(&TitleFilter::default(), Pagination::default())
            .await
            .unwrap();
        assert_eq!(page.items[0].title.id, rated.id);
        assert_eq!(page.items[0].rating, Some(9.0));
        assert_eq!(page.items[1].title.id, unrated.id);
        assert_eq!(page.items[1].rating, None);
    }

    #[tokio::test]
    async fn title_filters() {
        let store = InMemoryStore::new();
        let films = reference(&store, ReferenceKind::Category, "films").await;
        let drama = reference(&store, ReferenceKind::Genre, "drama").await;
        store
            .create_title(new_title("The Godfather", Some(films.id), vec![drama.id]))
            .await
            .unwrap();
        store.create_title(new_title("Godzilla", None, vec![])).await.unwrap();

        let by_name = TitleFilter {
            name: Some("GODF".into()),
            ..Default::default()
        };
        let page = store.list_titles(&by_name, Pagination::default()).await.unwrap();
        assert_eq!(page.total, 1);

        let by_genre = TitleFilter {
            genre: Some("drama".into()),
            ..Default::default()
        };
        assert_eq!(store.list_titles(&by_genre, Pagination::default()).await.unwrap().total, 1);

        let by_category = TitleFilter {
            category: Some("films".into()),
            year: Some(2000),
            ..Default::default()
        };
        assert_eq!(store.list_titles(&by_category, Pagination::default()).await.unwrap().total, 1);

        let wrong_year = TitleFilter {
            year: Some(1999),
            ..Default::default()
        };
        assert_eq!(store.list_titles(&wrong_year, Pagination::default()).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn deleting_review_cascades_to_comments() {
        let store = InMemoryStore::new();
        let alice = user(&store, "alice").await;
        let title = store.create_title(new_title("Heat", None, vec![])).await.unwrap();
        let r = store.create_review(review(title.id, alice.id, 7)).await.unwrap();
        let c = store
            .create_comment(NewComment {
                review_id: r.id,
                author_id: alice.id,
                text: "agreed".into(),
            })
            .await
            .unwrap();

        assert!(store.delete_review(r.id).await.unwrap());
        assert_eq!(store.comment_in_review(r.id, c.id).await.unwrap(), None);
        assert_eq!(store.list_comments(r.id, Pagination::default()).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn deleting_user_cascades_to_feedback() {
        let store = InMemoryStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let title = store.create_title(new_title("Heat", None, vec![])).await.unwrap();
        let r = store.create_review(review(title.id, bob.id, 5)).await.unwrap();
        store
            .create_comment(NewComment {
                review_id: r.id,
                author_id: alice.id,
                text: "hm".into(),
            })
            .await
            .unwrap();

        assert!(store.delete_user(alice.id).await.unwrap());
        assert_eq!(store.list_comments(r.id, Pagination::default()).await.unwrap().total, 0);
        assert!(store.review_in_title(title.id, r.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn review_lookup_is_scoped_to_title() {
        let store = InMemoryStore::new();
        let alice = user(&store, "alice").await;
        let heat = store.create_title(new_title("Heat", None, vec![])).await.unwrap();
        let other = store.create_title(new_title("Ronin", None, vec![])).await.unwrap();
        let r = store.create_review(review(heat.id, alice.id, 7)).await.unwrap();

        assert!(store.review_in_title(heat.id, r.id).await.unwrap().is_some());
        assert!(store.review_in_title(other.id, r.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn profile_write_keeps_stored_last_login() {
        let store = InMemoryStore::new();
        let stale = user(&store, "alice").await;
        let at = Utc::now();
        assert!(store.record_login(stale.id, None, at).await.unwrap());

        let mut edited = stale.clone();
        edited.bio = "hi".to_string();
        let saved = store.update_user(&edited).await.unwrap();
        assert_eq!(saved.last_login, Some(at));
        assert_eq!(saved.bio, "hi");
        let reloaded = store.user_by_id(stale.id).await.unwrap().unwrap();
        assert_eq!(reloaded.last_login, Some(at));
    }

    #[tokio::test]
    async fn record_login_requires_the_previous_stamp() {
        let store = InMemoryStore::new();
        let alice = user(&store, "alice").await;
        let first = Utc::now();
        assert!(store.record_login(alice.id, None, first).await.unwrap());
        assert!(!store.record_login(alice.id, None, Utc::now()).await.unwrap());
        assert!(store.record_login(alice.id, Some(first), Utc::now()).await.unwrap());
        assert!(!store.record_login(UserId::new(999), None, first).await.unwrap());
    }

    #[tokio::test]
    async fn update_user_checks_uniqueness() {
        let store = InMemoryStore::new();
        user(&store, "alice").await;
        let mut bob = user(&store, "bob").await;
        bob.username = Username::parse("alice").unwrap();
        assert!(matches!(
            store.update_user(&bob).await,
            Err(StoreError::Unique(Constraint::UserUsername))
        ));
    }
}
