/// Speaks instructions to the user. One instance per navigation session.
pub trait Announcer: Send + Sync {
    fn announce(&self, text: &str);

    /// Drops whatever is still queued, e.g. when the session ends.
    fn cancel(&self) {}
}
