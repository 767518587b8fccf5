//! Campaign dispatch pipeline — resolution, consent, quota, link rewrite,
//! chunked sending and delivery logging.

pub mod consent;
pub mod delivery_log;
pub mod dispatcher;
pub mod quota;
pub mod resolver;
pub mod rewrite;

pub use consent::{ConsentFilter, ConsentRegistry, HttpConsentRegistry, Partition};
pub use delivery_log::{AppendOutcome, DeliveryLog};
pub use dispatcher::{BatchDispatcher, DispatchOutcome, DispatchSummary, DispatcherDeps};
pub use quota::{QuotaGuard, Reservation};
pub use resolver::RecipientResolver;
pub use rewrite::{HrefRewriter, MarkupRewriter, RewrittenMarkup};
