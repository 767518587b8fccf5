//! Link rewriting — replaces trackable hrefs in campaign markup with
//! click-tracking indirection URLs.
//!
//! The rewriter sits behind the `MarkupRewriter` capability trait so the
//! markup-specific implementation can be swapped without touching dispatch
//! logic. The default implementation matches anchor hrefs with a regex and
//! leaves everything it cannot make sense of untouched — a campaign never
//! fails because of template HTML quirks.

use chrono::Utc;
use regex::{Captures, Regex};
use uuid::Uuid;

use crate::model::TrackedLink;

/// Output of a rewrite pass: the rewritten markup plus the link registry
/// (ids already assigned, click counts at zero, not yet persisted).
#[derive(Debug, Clone)]
pub struct RewrittenMarkup {
    pub markup: String,
    pub links: Vec<TrackedLink>,
}

/// Capability seam for markup rewriting.
pub trait MarkupRewriter: Send + Sync {
    /// Rewrite trackable links in `markup` for one campaign. Must be
    /// structurally idempotent when nothing is trackable.
    fn rewrite(&self, campaign_id: Uuid, markup: &str) -> RewrittenMarkup;
}

/// Policy hook deciding whether an href is trackable.
pub type LinkPolicy = dyn Fn(&str) -> bool + Send + Sync;

/// Regex-based anchor-href rewriter.
pub struct HrefRewriter {
    click_base_url: String,
    pattern: Regex,
    policy: Box<LinkPolicy>,
}

impl HrefRewriter {
    /// Rewriter tracking every non-empty href (the default policy).
    pub fn new(click_base_url: impl Into<String>) -> Self {
        Self {
            click_base_url: click_base_url.into(),
            // Anchor tags with a quoted href. Unquoted or otherwise
            // malformed hrefs simply don't match and pass through.
            pattern: Regex::new(
                r#"(?is)(<a\b[^>]*?\bhref\s*=\s*)(?:"([^"]*)"|'([^']*)')"#,
            )
            .expect("href pattern is valid"),
            policy: Box::new(|_| true),
        }
    }

    /// Replace the trackability policy.
    pub fn with_policy<F>(mut self, policy: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.policy = Box::new(policy);
        self
    }
}

impl MarkupRewriter for HrefRewriter {
    fn rewrite(&self, campaign_id: Uuid, markup: &str) -> RewrittenMarkup {
        let now = Utc::now();
        let mut links = Vec::new();

        let rewritten = self.pattern.replace_all(markup, |caps: &Captures| {
            let (href, quote) = match (caps.get(2), caps.get(3)) {
                (Some(m), _) => (m.as_str(), '"'),
                (_, Some(m)) => (m.as_str(), '\''),
                _ => ("", '"'),
            };

            if href.is_empty() || !(self.policy)(href) {
                return caps[0].to_string();
            }

            let id = Uuid::new_v4();
            links.push(TrackedLink {
                id,
                campaign_id,
                original_href: href.to_string(),
                click_count: 0,
                created_at: now,
                updated_at: now,
            });

            format!(
                "{}{quote}{}{id}{quote}",
                &caps[1], self.click_base_url
            )
        });

        RewrittenMarkup {
            markup: rewritten.into_owned(),
            links,
        }
    }
}
