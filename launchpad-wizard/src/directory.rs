//! Remote directory browsing.
//!
//! [`DirectoryBrowser`] is stateless: one call, one listing. Where the user
//! is in the tree lives in a [`Navigator`], which hands out a ticket per
//! request and only accepts the listing for the newest ticket, so a slow
//! response for an earlier click can never overwrite a later one.

use std::sync::Arc;

use launchpad_backend::Backend;
use launchpad_core::{AuthToken, DirectoryNode, HostingId};

use crate::context::WizardContext;
use crate::error::WizardError;

pub struct DirectoryBrowser {
    backend: Arc<dyn Backend>,
    token: AuthToken,
}

impl DirectoryBrowser {
    pub fn new(ctx: &WizardContext) -> Self {
        Self {
            backend: ctx.backend.clone(),
            token: ctx.token.clone(),
        }
    }

    /// Subdirectories of `path` (`""` is the root), in server order.
    pub async fn list(&self, hosting: &HostingId, path: &str) -> Result<Vec<DirectoryNode>, WizardError> {
        let nodes = self
            .backend
            .browse_directory(&self.token, hosting, path)
            .await?;
        tracing::debug!(hosting = %hosting, path, count = nodes.len(), "listed directory");
        Ok(nodes)
    }
}

// ---------------------------------------------------------------------------
// Navigator
// ---------------------------------------------------------------------------

/// A pending browse: where it goes and the breadcrumbs it would produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseTicket {
    pub seq: u64,
    pub path: String,
    pub breadcrumbs: Vec<String>,
}

/// Browsing position inside one hosting target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Navigator {
    listing: Vec<DirectoryNode>,
    breadcrumbs: Vec<String>,
    current_path: String,
    /// Breadcrumbs of the newest issued ticket.
    heading: Vec<String>,
    issued: u64,
    settled: u64,
}

impl Navigator {
    pub fn listing(&self) -> &[DirectoryNode] {
        &self.listing
    }

    pub fn breadcrumbs(&self) -> &[String] {
        &self.breadcrumbs
    }

    /// Path of the last applied listing; `""` at the root.
    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    /// Whether the newest ticket is still unanswered.
    pub fn is_browsing(&self) -> bool {
        self.issued != self.settled
    }

    /// Value for the root-path field: the displayed path, `/` at the root.
    pub fn selected_root(&self) -> String {
        if self.current_path.is_empty() {
            "/".to_string()
        } else {
            self.current_path.clone()
        }
    }

    fn issue(&mut self, path: String, breadcrumbs: Vec<String>) -> BrowseTicket {
        self.issued += 1;
        self.heading = breadcrumbs.clone();
        BrowseTicket {
            seq: self.issued,
            path,
            breadcrumbs,
        }
    }

    pub fn root(&mut self) -> BrowseTicket {
        self.issue(String::new(), Vec::new())
    }

    /// Descend into `node`.
    pub fn open(&mut self, node: &DirectoryNode) -> BrowseTicket {
        let mut crumbs = self.breadcrumbs.clone();
        crumbs.push(node.name.clone());
        self.issue(node.full_path.clone(), crumbs)
    }

    /// Jump to breadcrumb `index`, keeping segments `0..=index`.
    pub fn breadcrumb(&mut self, index: usize) -> Option<BrowseTicket> {
        if index >= self.breadcrumbs.len() {
            return None;
        }
        let crumbs = self.breadcrumbs[..=index].to_vec();
        Some(self.issue(join_path(&crumbs), crumbs))
    }

    /// Parent of the directory being shown or, while a browse is pending,
    /// of the one being opened. `None` at the root.
    pub fn up(&mut self) -> Option<BrowseTicket> {
        if self.heading.is_empty() {
            return None;
        }
        let mut crumbs = self.heading.clone();
        crumbs.pop();
        Some(self.issue(join_path(&crumbs), crumbs))
    }

    /// Apply a successful listing. Returns false for a superseded ticket.
    pub fn apply(&mut self, ticket: BrowseTicket, listing: Vec<DirectoryNode>) -> bool {
        if ticket.seq != self.issued {
            return false;
        }
        self.settled = ticket.seq;
        self.listing = listing;
        self.breadcrumbs = ticket.breadcrumbs;
        self.current_path = ticket.path;
        true
    }

    /// Record that `ticket` failed. Returns false for a superseded ticket.
    pub fn fail(&mut self, ticket: &BrowseTicket) -> bool {
        if ticket.seq != self.issued {
            return false;
        }
        self.settled = ticket.seq;
        self.heading = self.breadcrumbs.clone();
        true
    }
}

/// `/a/b` for `["a", "b"]`, `""` for no segments.
fn join_path(segments: &[String]) -> String {
    segments.iter().fold(String::new(), |mut acc, s| {
        acc.push('/');
        acc.push_str(s);
        acc
    })
}
