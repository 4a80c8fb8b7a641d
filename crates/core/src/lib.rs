pub mod money;
pub mod period;
pub mod transaction;

pub use money::{AmountParseError, Money};
pub use period::PeriodKey;
pub use transaction::{CanonicalTransaction, EnrichedTransaction, SourceFormat};
