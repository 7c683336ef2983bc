//! Current-balance oracle backed by the holdings view.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, instrument};

use crate::domain::{AppError, Holding, HoldingsReader};

/// Computes a subject's live balance from current holdings, independently
/// of the event ledger.
pub struct CurrentBalanceOracle {
    holdings: Arc<dyn HoldingsReader>,
}

impl CurrentBalanceOracle {
    #[must_use]
    pub fn new(holdings: Arc<dyn HoldingsReader>) -> Self {
        Self { holdings }
    }

    /// Sum of all held amounts; zero when the subject holds nothing.
    #[instrument(skip(self))]
    pub async fn current_balance(&self, subject_id: &str) -> Result<Decimal, AppError> {
        let holdings = self.holdings.fetch_current_holdings(subject_id).await?;
        Ok(total_held(&holdings))
    }

    /// Holdings and their total in one read
    #[instrument(skip(self))]
    pub async fn holdings_with_total(
        &self,
        subject_id: &str,
    ) -> Result<(Vec<Holding>, Decimal), AppError> {
        let holdings = self.holdings.fetch_current_holdings(subject_id).await?;
        let total = total_held(&holdings);
        debug!(count = holdings.len(), total = %total, "Summed current holdings");
        Ok((holdings, total))
    }
}

fn total_held(holdings: &[Holding]) -> Decimal {
    holdings.iter().map(|h| h.amount).sum()
}
