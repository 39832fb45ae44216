use async_trait::async_trait;

use crate::domain::MergedEntry;
use crate::pipeline::audit::AuditTrail;

/// One candidate returned by a star-identification service
#[derive(Clone, Debug, PartialEq)]
pub struct ResolverHit {
    /// Identifier string or coordinate-query key this hit answers
    pub input_key: String,
    pub main_id: String,
    pub ra: Option<f64>,
    pub dec: Option<f64>,
    pub cross_ids: Vec<String>,
}

/// A cone-search request; `key` comes back as `ResolverHit::input_key`
#[derive(Clone, Debug, PartialEq)]
pub struct CoordinateQuery {
    pub key: String,
    pub ra: f64,
    pub dec: f64,
}

/// External name/coordinate resolution service (star database or survey catalog)
///
/// Implementations answer whole batches in one round-trip. An `Err` means the
/// batch failed; callers treat it as "no match" rather than aborting.
#[async_trait]
pub trait StarResolverPort: Send + Sync {
    fn service_name(&self) -> &str;

    /// Cheap connectivity probe
    async fn ping(&self) -> Result<(), String>;

    async fn resolve_by_name(&self, identifiers: &[String]) -> Result<Vec<ResolverHit>, String>;

    /// Every match within `radius_deg` of each query, in service order
    async fn resolve_by_coordinates(
        &self,
        queries: &[CoordinateQuery],
        radius_deg: f64,
    ) -> Result<Vec<ResolverHit>, String>;

    /// Nearest match within `radius_deg` of a single position
    async fn resolve_by_coordinate(&self, ra: f64, dec: f64, radius_deg: f64) -> Result<Option<ResolverHit>, String> {
        let query = CoordinateQuery {
            key: format!("{} {}", ra, dec),
            ra,
            dec,
        };
        let hits = self.resolve_by_coordinates(std::slice::from_ref(&query), radius_deg).await?;
        let nearest = hits
            .into_iter()
            .filter_map(|hit| {
                let sep = crate::pipeline::processing::coordinates::separation((Some(ra), Some(dec)), (hit.ra, hit.dec))?;
                Some((sep, hit))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, hit)| hit);
        Ok(nearest)
    }
}

/// Destination for the merged table and its companions
#[async_trait]
pub trait CatalogOutputPort: Send + Sync {
    /// Row fingerprints and update dates from the most recent previous run
    async fn previous_row_updates(&self) -> Result<Vec<(String, chrono::NaiveDate)>, String>;

    async fn write_catalog(&self, entries: &[MergedEntry]) -> Result<(), String>;

    async fn write_removed_brown_dwarfs(&self, entries: &[MergedEntry]) -> Result<(), String>;
}

/// Destination for per-concern audit files
#[async_trait]
pub trait AuditOutputPort: Send + Sync {
    async fn write_audit(&self, trail: &AuditTrail) -> Result<(), String>;
}
