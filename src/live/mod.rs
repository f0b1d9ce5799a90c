//! # Live Updates
//!
//! The update feed poller keeps a shared `ProductId -> ProductUpdate` map fresh, and
//! the merge engine overlays it on product views right before they are rendered.
//!
//! ```text
//! UpdateFeed ──refresh──> UpdateFeedPoller ──watch<Arc<LiveMap>>──> LiveUpdates
//!                                                                       │
//!                               ProductView ──────────── merge() ◄──────┘
//! ```

pub mod error;
pub mod merge;
pub mod poller;

pub use error::*;
pub use merge::*;
pub use poller::*;
