/// Optional collaborator notified with every resolved media link so an asset
/// cache can pre-warm them.
///
/// Notification is fire-and-forget: `warm` must return promptly and may not
/// fail the caller. Delivery is best effort.
pub trait MediaWarmer: Send + Sync {
    fn warm(&self, urls: Vec<String>);
}
