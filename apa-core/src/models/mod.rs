pub mod expression;
pub mod genome;
pub mod site_table;
pub mod strand;
pub mod track;

// re-export for cleaner imports
pub use self::expression::{ExpressionTable, OverlayStats, ReferenceSites};
pub use self::genome::{Genome, SequenceSource};
pub use self::site_table::SiteTable;
pub use self::strand::Strand;
pub use self::track::CountTrack;
