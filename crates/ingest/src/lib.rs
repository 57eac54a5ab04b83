//! MeterHub Ingestion
//!
//! The write and read paths behind the dispatch layer: the aggregator that
//! turns flushed batches into grouped store writes, the totals query
//! service, and the event-handler adapters that connect both to the router.

mod aggregator;
mod handlers;
mod totals;

pub use aggregator::BandwidthAggregator;
pub use handlers::{InboundBandwidthHandler, TotalsRequestHandler};
pub use totals::TotalsQueryService;
