//! Persistence of [`ProgressState`] per itinerary and identity.

use std::{
    error::Error,
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use model::{itinerary::Itinerary, progress::ProgressState};
use utility::id::Id;

pub mod guest;
pub mod scoped;
pub mod writer;

pub use guest::GuestProgressStore;
pub use scoped::ScopedProgressStore;
pub use writer::ProgressWriter;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Credentials {
    pub token: String,
}

impl Credentials {
    pub fn new<S: Into<String>>(token: S) -> Self {
        Self {
            token: token.into(),
        }
    }
}

/// A guest session on this device. Its progress is forgotten when it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GuestSession(u64);

impl GuestSession {
    pub fn new() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for GuestSession {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GuestSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "guest-{}", self.0)
    }
}

/// Who progress belongs to. The variant selects where it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    Authenticated(Credentials),
    Guest(GuestSession),
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // never print the token
            Self::Authenticated(_) => write!(f, "authenticated user"),
            Self::Guest(session) => write!(f, "{}", session),
        }
    }
}

#[derive(Debug)]
pub enum StoreError {
    NotFound,
    Unauthorized,
    Remote(Box<dyn Error + Send + Sync>),
    Malformed(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "itinerary not found"),
            Self::Unauthorized => write!(f, "not authorized for this progress scope"),
            Self::Remote(why) => write!(f, "remote store failed: {}", why),
            Self::Malformed(why) => write!(f, "malformed progress record: {}", why),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Remote(why) => Some(why.as_ref()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(why: serde_json::Error) -> Self {
        Self::Malformed(why.to_string())
    }
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// `None` when nothing was ever saved for this pair.
    async fn load(
        &self,
        itinerary: &Id<Itinerary>,
        identity: &Identity,
    ) -> Result<Option<ProgressState>, StoreError>;

    async fn save(
        &self,
        itinerary: &Id<Itinerary>,
        identity: &Identity,
        state: &ProgressState,
    ) -> Result<(), StoreError>;

    async fn clear(&self, itinerary: &Id<Itinerary>, identity: &Identity)
        -> Result<(), StoreError>;
}

/// Server side progress of authenticated users.
#[async_trait]
pub trait RemoteProgress: Send + Sync {
    async fn fetch(
        &self,
        itinerary: &Id<Itinerary>,
        credentials: &Credentials,
    ) -> Result<Option<ProgressState>, StoreError>;

    async fn upsert(
        &self,
        itinerary: &Id<Itinerary>,
        credentials: &Credentials,
        state: &ProgressState,
    ) -> Result<(), StoreError>;
}
