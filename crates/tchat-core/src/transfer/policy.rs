//! Receiver-side policy hooks.

/// Decides whether an incoming offer is accepted.
///
/// Called with the sanitized filename and the declared size, after the
/// session has already applied its busy and size-limit checks.
pub trait AcceptPolicy: Send + Sync {
    fn should_accept(&self, filename: &str, size: u64) -> bool;
}

impl<F> AcceptPolicy for F
where
    F: Fn(&str, u64) -> bool + Send + Sync,
{
    fn should_accept(&self, filename: &str, size: u64) -> bool {
        self(filename, size)
    }
}

/// Accept every offer.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoAccept;

impl AcceptPolicy for AutoAccept {
    fn should_accept(&self, _filename: &str, _size: u64) -> bool {
        true
    }
}

/// Decline every offer.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectAll;

impl AcceptPolicy for RejectAll {
    fn should_accept(&self, _filename: &str, _size: u64) -> bool {
        false
    }
}

/// Accept offers up to and including the given size.
#[derive(Debug, Clone, Copy)]
pub struct MaxSize(pub u64);

impl AcceptPolicy for MaxSize {
    fn should_accept(&self, _filename: &str, size: u64) -> bool {
        size <= self.0
    }
}

/// What to do when the destination name already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// Write to `name (n).ext` with the first free `n`.
    #[default]
    Rename,
    /// Truncate the existing file.
    Overwrite,
}

/// What happens to a partially written file when its transfer aborts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartialFilePolicy {
    #[default]
    Delete,
    Keep,
}
